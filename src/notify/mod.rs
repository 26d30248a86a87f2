//! Notifier: posts the status text and chart image.

use std::path::Path;

use crate::error::AppError;

pub mod webhook;

pub use webhook::{WEBHOOK_ENV, WebhookPublisher};

/// Somewhere a status plus one image can be posted.
pub trait Publisher {
    /// Check credentials before uploading anything.
    fn verify(&self) -> Result<(), AppError>;

    fn publish(&self, text: &str, image: &Path) -> Result<(), AppError>;
}

/// Verify, then publish. A failed credential check aborts before the upload.
pub fn send_status<P: Publisher + ?Sized>(publisher: &P, text: &str, image: &Path) -> Result<(), AppError> {
    if let Err(e) = publisher.verify() {
        tracing::error!(message = "publisher authentication failed", error = %e);
        return Err(e);
    }
    publisher.publish(text, image)
}

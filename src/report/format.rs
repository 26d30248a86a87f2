//! Status text formatting.
//!
//! All formatting lives here so the wording of the posted message can change
//! without touching the pipeline.

use super::DailySummary;

/// Closing line of every post.
pub const ATTRIBUTION: &str = "Data from Johns Hopkins University.";

/// One region's block, including the trailing blank line.
///
/// ```text
/// King County, 14 Mar:
/// Cases Reported: 1,234 (+56 from 13 Mar)
/// Total Deaths:   1,450 (+2 from 13 Mar)
/// ```
pub fn format_region_block(summary: &DailySummary) -> String {
    let day = summary.date.format("%d %b");
    let prior = summary.prior_date.format("%d %b");
    let mut out = String::new();
    out.push_str(&format!("{}, {day}:\n", summary.label));
    out.push_str(&format!(
        "Cases Reported: {} ({} from {prior})\n",
        group_thousands(summary.cases_reported),
        signed(summary.cases_delta),
    ));
    out.push_str(&format!(
        "Total Deaths:   {} ({} from {prior})\n",
        group_thousands(summary.total_deaths as i64),
        signed(summary.deaths_delta),
    ));
    out.push('\n');
    out
}

/// Full post: one block per region, then the attribution line.
pub fn format_status(summaries: &[DailySummary]) -> String {
    let mut out = String::new();
    for s in summaries {
        out.push_str(&format_region_block(s));
    }
    out.push_str(ATTRIBUTION);
    out
}

/// `+` for zero and positive values; negatives keep their `-`.
pub fn signed(v: i64) -> String {
    if v >= 0 {
        format!("+{v}")
    } else {
        v.to_string()
    }
}

/// `1234567` -> `1,234,567`.
pub fn group_thousands(v: i64) -> String {
    let digits = v.unsigned_abs().to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    if v < 0 {
        out.push('-');
    }
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

//! Time-command parsing for free-text activity notes.
//!
//! The tracker records time bookkeeping as system notes such as
//! `"added 2d 4h of time spent at 2025-03-10"`. A note is treated as a time
//! command only when it carries the relevant key phrase; anything else
//! parses to zero. Parsing never fails: malformed numeric substrings simply
//! contribute nothing.

use std::sync::LazyLock;

use regex::Regex;

/// Key phrase marking a "time spent" command.
const SPENT_MARKER: &str = "time spent";

/// Key phrase marking a "changed time estimate" command.
const ESTIMATE_MARKER: &str = "time estimate";

/// Working hours per tracker day.
const HOURS_PER_DAY: f64 = 8.0;

/// Working days per tracker week.
const DAYS_PER_WEEK: f64 = 5.0;

/// Weeks per tracker month.
const WEEKS_PER_MONTH: f64 = 4.0;

/// Unit suffixes and their value in hours, longest suffix first so that
/// `mo` is matched before `m`.
const UNITS: [(&str, f64); 6] = [
    ("mo", WEEKS_PER_MONTH * DAYS_PER_WEEK * HOURS_PER_DAY),
    ("w", DAYS_PER_WEEK * HOURS_PER_DAY),
    ("d", HOURS_PER_DAY),
    ("h", 1.0),
    ("m", 1.0 / 60.0),
    ("s", 1.0 / 3600.0),
];

/// One compiled `[0-9]+<suffix>` pattern per unit. The word boundary keeps
/// `30m` from matching inside `30mo`.
static UNIT_PATTERNS: LazyLock<Vec<(Regex, f64)>> = LazyLock::new(|| {
    UNITS
        .iter()
        .map(|&(suffix, hours)| {
            let pattern =
                Regex::new(&format!(r"([0-9]+){suffix}\b")).expect("unit pattern is valid");
            (pattern, hours)
        })
        .collect()
});

/// Extracts the signed hour quantity from a "time spent" note.
///
/// Returns 0.0 for notes that are not time-spent commands.
#[must_use]
pub fn parse_spent(text: &str) -> f64 {
    parse_command(text, SPENT_MARKER)
}

/// Extracts the signed hour quantity from a "changed time estimate" note.
///
/// Returns 0.0 for notes that are not estimate commands.
#[must_use]
pub fn parse_estimate(text: &str) -> f64 {
    parse_command(text, ESTIMATE_MARKER)
}

fn parse_command(text: &str, marker: &str) -> f64 {
    if !text.contains(marker) {
        return 0.0;
    }
    let sign = if text.contains("added") {
        1.0
    } else if text.contains("subtracted") {
        -1.0
    } else {
        // Neither direction word: the command is ignored, not an error.
        return 0.0;
    };
    sign * unit_hours(text)
}

/// Sums the hour value of every recognized unit token in the text.
#[allow(clippy::cast_precision_loss)]
fn unit_hours(text: &str) -> f64 {
    let mut hours = 0.0;
    for (pattern, unit_hours) in UNIT_PATTERNS.iter() {
        for capture in pattern.captures_iter(text) {
            // Digits that overflow u64 are swallowed to zero.
            let Ok(count) = capture[1].parse::<u64>() else {
                continue;
            };
            hours += count as f64 * unit_hours;
        }
    }
    hours
}

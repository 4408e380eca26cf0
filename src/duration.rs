/// ISO-8601 relative duration parsing for video lengths (`PT1H2M3S`)
use regex::Regex;
use std::sync::OnceLock;
use tracing::warn;

/// Prefix every parseable video duration starts with
const TIME_PREFIX: &str = "PT";

/// Reported for videos without a length, e.g. upcoming live stream placeholders
pub const NO_DURATION_SENTINEL: &str = "P0D";

fn token_regex() -> &'static Regex {
    static TOKEN: OnceLock<Regex> = OnceLock::new();
    TOKEN.get_or_init(|| Regex::new(r"(\d+)(\D)").expect("static duration token pattern"))
}

/// Convert a duration string into total elapsed seconds.
///
/// Returns `None` for the no-duration sentinel, for strings without the `PT`
/// prefix and for strings that carry no `(count, unit)` token at all. Callers
/// exclude such records instead of treating them as zero-length videos.
/// Tokens with a unit other than `H`, `M` or `S` are logged and skipped.
pub fn parse_duration(value: &str) -> Option<u64> {
    if value == NO_DURATION_SENTINEL {
        return None;
    }

    let Some(body) = value.strip_prefix(TIME_PREFIX) else {
        warn!("Unparseable duration (expected {} prefix): {}", TIME_PREFIX, value);
        return None;
    };

    let mut total = 0u64;
    let mut matched = false;
    for caps in token_regex().captures_iter(body) {
        matched = true;
        let Ok(count) = caps[1].parse::<u64>() else {
            warn!("Duration component out of range in {}: {}", value, &caps[0]);
            continue;
        };
        match &caps[2] {
            "H" => total = total.saturating_add(count.saturating_mul(3600)),
            "M" => total = total.saturating_add(count.saturating_mul(60)),
            "S" => total = total.saturating_add(count),
            unit => warn!("Unhandled duration unit {} in {}", unit, value),
        }
    }

    if !matched {
        warn!("Unparseable duration (no components): {}", value);
        return None;
    }

    Some(total)
}

//! Duration parsing utilities.

use super::ConfigError;
use std::time::Duration;

/// Parse a duration string like "250ms", "2s", "30m", "1h" or "5".
/// Supports:
/// - Plain numbers (interpreted as seconds): "5"
/// - Milliseconds suffix: "250ms"
/// - Seconds suffix: "2s"
/// - Minutes suffix: "30m"
/// - Hours suffix: "1h"
pub fn parse_duration(s: &str) -> Result<Duration, ConfigError> {
    let s = s.trim();
    if s.is_empty() {
        return Err(invalid(s, "empty duration string"));
    }

    // "ms" must be checked before "m" and "s".
    if let Some(num_str) = s.strip_suffix("ms") {
        return Ok(Duration::from_millis(parse_number(s, num_str, "milliseconds")?));
    }
    if let Some(num_str) = s.strip_suffix('h') {
        return Ok(Duration::from_secs(
            parse_number(s, num_str, "hours")?.saturating_mul(3600),
        ));
    }
    if let Some(num_str) = s.strip_suffix('m') {
        return Ok(Duration::from_secs(
            parse_number(s, num_str, "minutes")?.saturating_mul(60),
        ));
    }
    if let Some(num_str) = s.strip_suffix('s') {
        return Ok(Duration::from_secs(parse_number(s, num_str, "seconds")?));
    }

    // No suffix - treat as seconds
    Ok(Duration::from_secs(parse_number(s, s, "seconds")?))
}

/// Render a duration in the largest unit that represents it exactly.
pub fn format_duration(d: &Duration) -> String {
    let millis = d.as_millis();
    if millis == 0 || d.subsec_nanos() % 1_000_000 != 0 {
        return format!("{}ms", millis);
    }
    if millis % 3_600_000 == 0 {
        format!("{}h", millis / 3_600_000)
    } else if millis % 60_000 == 0 {
        format!("{}m", millis / 60_000)
    } else if millis % 1000 == 0 {
        format!("{}s", millis / 1000)
    } else {
        format!("{millis}ms")
    }
}

fn parse_number(value: &str, num_str: &str, unit: &str) -> Result<u64, ConfigError> {
    num_str
        .trim()
        .parse::<u64>()
        .map_err(|e| invalid(value, &format!("invalid {unit} value '{num_str}': {e}")))
}

fn invalid(value: &str, reason: &str) -> ConfigError {
    ConfigError::InvalidDuration {
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

/// Serde adapter storing durations as human-readable strings.
pub mod serde_format {
    use super::{format_duration, parse_duration};
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&format_duration(d))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let s = String::deserialize(deserializer)?;
        parse_duration(&s).map_err(serde::de::Error::custom)
    }
}

//! Entry model for the TTL store.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// One stored value with its expiration metadata.
///
/// `value` is the textual representation of any scalar kind, so the
/// TTL store holds all kinds uniformly. `duration` preserves the
/// originally requested lifetime for audit and reconstruction;
/// `expires_at` is the wall-clock deadline in milliseconds since the
/// epoch, computed at commit time. `None` means the entry never
/// expires.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TtlEntry {
    pub key: String,
    pub value: String,
    /// Originally requested lifetime; ISO-8601 duration on the wire.
    #[serde(default, with = "iso8601")]
    pub duration: Option<Duration>,
    /// Expiry instant in milliseconds since the epoch, or null.
    #[serde(rename = "expiresAt")]
    pub expires_at: Option<i64>,
    /// Whether `value` is base64-wrapped ciphertext.
    #[serde(default)]
    pub encrypted: bool,
}

/// ISO-8601 duration encoding for `Option<Duration>` serde fields.
///
/// Emits the `PT…S` form with millisecond precision (`PT2.1S`,
/// `PT90S`); accepts the day/hour/minute designators on read.
mod iso8601 {
    use std::time::Duration;

    use serde::de::Error as _;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(
        duration: &Option<Duration>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match duration {
            Some(d) => serializer.serialize_str(&super::format_duration(*d)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<Duration>, D::Error> {
        match Option::<String>::deserialize(deserializer)? {
            Some(text) => super::parse_duration(&text)
                .map(Some)
                .ok_or_else(|| D::Error::custom(format!("invalid ISO-8601 duration: {text}"))),
            None => Ok(None),
        }
    }
}

/// Render a duration as an ISO-8601 string with millisecond precision.
pub(crate) fn format_duration(duration: Duration) -> String {
    let secs = duration.as_secs();
    let millis = duration.subsec_millis();
    if millis == 0 {
        format!("PT{secs}S")
    } else {
        let fraction = format!("{millis:03}");
        format!("PT{secs}.{}S", fraction.trim_end_matches('0'))
    }
}

/// Parse an ISO-8601 duration of the form `P[nD][T[nH][nM][n[.n]S]]`.
///
/// Returns `None` for anything outside that subset (weeks, months, and
/// years have no fixed length and are rejected).
pub(crate) fn parse_duration(text: &str) -> Option<Duration> {
    let rest = text.strip_prefix('P')?;
    if rest.is_empty() {
        return None;
    }

    let (date_part, time_part) = match rest.split_once('T') {
        Some((date, time)) => (date, Some(time)),
        None => (rest, None),
    };

    let mut total_ms: u64 = 0;

    if !date_part.is_empty() {
        let days_text = date_part.strip_suffix('D')?;
        let days: u64 = days_text.parse().ok()?;
        total_ms = total_ms.checked_add(days.checked_mul(86_400_000)?)?;
    }

    if let Some(time_part) = time_part {
        if time_part.is_empty() {
            return None;
        }
        let mut rest = time_part;
        for (designator, ms_per_unit) in [('H', 3_600_000u64), ('M', 60_000u64)] {
            if let Some(idx) = rest.find(designator) {
                let units: u64 = rest[..idx].parse().ok()?;
                total_ms = total_ms.checked_add(units.checked_mul(ms_per_unit)?)?;
                rest = &rest[idx + 1..];
            }
        }
        if !rest.is_empty() {
            let secs_text = rest.strip_suffix('S')?;
            let secs: f64 = secs_text.parse().ok()?;
            if !secs.is_finite() || secs < 0.0 {
                return None;
            }
            total_ms = total_ms.checked_add((secs * 1000.0).round() as u64)?;
        }
    }

    Some(Duration::from_millis(total_ms))
}

//! Human durations: `10m`/`2h`/`3d` in, `1d 2h 3m 4s` out.

use crate::error::{Error, Result};

const MINUTE: u64 = 60;
const HOUR: u64 = 60 * MINUTE;
const DAY: u64 = 24 * HOUR;

/// Parse `<integer><unit>` into seconds, where unit is `m`, `h` or `d` (any case).
pub fn parse_duration(input: &str) -> Result<u64> {
    let input = input.trim();
    let unit = input.chars().last().ok_or(Error::InvalidDuration)?;

    let scale = match unit.to_ascii_lowercase() {
        'm' => MINUTE,
        'h' => HOUR,
        'd' => DAY,
        _ => return Err(Error::InvalidDuration),
    };

    let count = &input[..input.len() - unit.len_utf8()];
    if count.is_empty() || !count.bytes().all(|b| b.is_ascii_digit()) {
        return Err(Error::InvalidDuration);
    }

    count
        .parse::<u64>()
        .ok()
        .and_then(|count| count.checked_mul(scale))
        .ok_or(Error::InvalidDuration)
}

/// Render seconds as a countdown, skipping zero components.  Zero is `0s`.
pub fn format_countdown(seconds: u64) -> String {
    let components = [
        (seconds / DAY, 'd'),
        (seconds % DAY / HOUR, 'h'),
        (seconds % HOUR / MINUTE, 'm'),
        (seconds % MINUTE, 's'),
    ];

    let parts: Vec<String> = components
        .iter()
        .filter(|(value, _)| *value > 0)
        .map(|(value, unit)| format!("{}{}", value, unit))
        .collect();

    if parts.is_empty() {
        "0s".to_owned()
    } else {
        parts.join(" ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_each_unit() {
        assert_eq!(parse_duration("1m"), Ok(60));
        assert_eq!(parse_duration("10m"), Ok(600));
        assert_eq!(parse_duration("2h"), Ok(7200));
        assert_eq!(parse_duration("3d"), Ok(259_200));
    }

    #[test]
    fn unit_is_case_insensitive() {
        assert_eq!(parse_duration("2H"), Ok(7200));
        assert_eq!(parse_duration("1D"), Ok(86_400));
        assert_eq!(parse_duration(" 5M "), Ok(300));
    }

    #[test]
    fn rejects_malformed_input() {
        for input in ["", "m", "10", "10s", "ten m", "1.5h", "-5m", "+5m", "5 m", "5mm", "5é"] {
            assert_eq!(parse_duration(input), Err(Error::InvalidDuration), "{input:?}");
        }
    }

    #[test]
    fn rejects_overflow() {
        assert_eq!(
            parse_duration("999999999999999999d"),
            Err(Error::InvalidDuration)
        );
    }

    #[test]
    fn formats_countdowns() {
        assert_eq!(format_countdown(0), "0s");
        assert_eq!(format_countdown(59), "59s");
        assert_eq!(format_countdown(60), "1m");
        assert_eq!(format_countdown(3661), "1h 1m 1s");
        assert_eq!(format_countdown(90061), "1d 1h 1m 1s");
        assert_eq!(format_countdown(86_400 + 5), "1d 5s");
        assert_eq!(format_countdown(2 * 86_400 + 3 * 3600), "2d 3h");
    }

    #[test]
    fn parsed_durations_format_back() {
        assert_eq!(format_countdown(parse_duration("90m").unwrap()), "1h 30m");
        assert_eq!(format_countdown(parse_duration("36h").unwrap()), "1d 12h");
    }
}

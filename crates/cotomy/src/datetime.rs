//! Date-time helpers shared by the fillers, renderers and form data

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, TimeZone};

const NAIVE_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y/%m/%d %H:%M:%S",
    "%Y/%m/%d %H:%M",
];

/// Ends with `±hh:mm`
pub(crate) fn has_offset(text: &str) -> bool {
    let bytes = text.as_bytes();
    if bytes.len() < 6 {
        return false;
    }
    let tail = &bytes[bytes.len() - 6..];
    matches!(tail[0], b'+' | b'-')
        && tail[1].is_ascii_digit()
        && tail[2].is_ascii_digit()
        && tail[3] == b':'
        && tail[4].is_ascii_digit()
        && tail[5].is_ascii_digit()
}

/// Parse a date-time without zone information
pub(crate) fn parse_naive(text: &str) -> Option<NaiveDateTime> {
    let text = text.trim();
    NAIVE_FORMATS
        .iter()
        .find_map(|f| NaiveDateTime::parse_from_str(text, f).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(text, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
}

/// Parse a server timestamp; one without an offset or `Z` is taken as UTC
pub(crate) fn parse_utc(text: &str) -> Option<DateTime<FixedOffset>> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }
    let (naive, offset) = if let Some(rest) = text.strip_suffix('Z').or_else(|| text.strip_suffix('z')) {
        (rest, FixedOffset::east_opt(0)?)
    } else if has_offset(text) {
        let (rest, zone) = text.split_at(text.len() - 6);
        (rest, parse_offset(zone)?)
    } else {
        (text, FixedOffset::east_opt(0)?)
    };
    let naive = parse_naive(naive)?;
    offset.from_local_datetime(&naive).single()
}

/// Parse `±hh:mm`
pub(crate) fn parse_offset(zone: &str) -> Option<FixedOffset> {
    let sign = match zone.as_bytes().first()? {
        b'+' => 1,
        b'-' => -1,
        _ => return None,
    };
    let (hours, minutes) = zone.get(1..)?.split_once(':')?;
    let seconds = hours.parse::<i32>().ok()? * 3600 + minutes.parse::<i32>().ok()? * 60;
    FixedOffset::east_opt(sign * seconds)
}

/// Format with day.js style tokens (`YYYY`, `MM`, `DD`, `HH`, `hh`, `mm`, `ss`, `A`, `Z`)
pub(crate) fn format_tokens(value: &DateTime<FixedOffset>, pattern: &str) -> String {
    value.format(&to_strftime(pattern)).to_string()
}

fn to_strftime(pattern: &str) -> String {
    const TOKENS: &[(&str, &str)] = &[
        ("YYYY", "%Y"),
        ("YY", "%y"),
        ("MM", "%m"),
        ("DD", "%d"),
        ("HH", "%H"),
        ("hh", "%I"),
        ("mm", "%M"),
        ("ss", "%S"),
        ("SSS", "%3f"),
        ("A", "%p"),
        ("Z", "%:z"),
    ];
    let mut out = String::with_capacity(pattern.len() * 2);
    let mut rest = pattern;
    'outer: while !rest.is_empty() {
        for (token, directive) in TOKENS {
            if let Some(tail) = rest.strip_prefix(token) {
                out.push_str(directive);
                rest = tail;
                continue 'outer;
            }
        }
        let mut chars = rest.chars();
        if let Some(c) = chars.next() {
            if c == '%' {
                out.push_str("%%");
            } else {
                out.push(c);
            }
        }
        rest = chars.as_str();
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_has_offset() {
        assert!(has_offset("2024-01-02T03:04:05+09:00"));
        assert!(has_offset("2024-01-02T03:04-05:30"));
        assert!(!has_offset("2024-01-02T03:04:05"));
        assert!(!has_offset("2024-01-02T03:04:05Z"));
    }

    #[test]
    fn test_parse_utc() {
        let value = parse_utc("2024-01-02T03:04:05").unwrap();
        assert_eq!(value.offset().local_minus_utc(), 0);
        assert_eq!(value.format("%H:%M").to_string(), "03:04");

        let value = parse_utc("2024-01-02T03:04+09:00").unwrap();
        assert_eq!(value.offset().local_minus_utc(), 9 * 3600);

        assert!(parse_utc("2024-01-02T03:04:05.123Z").is_some());
        assert!(parse_utc("not a date").is_none());
        assert!(parse_utc("").is_none());
    }

    #[test]
    fn test_format_tokens() {
        let value = parse_utc("2024-03-09T07:05:00Z").unwrap();
        assert_eq!(format_tokens(&value, "YYYY/MM/DD HH:mm"), "2024/03/09 07:05");
        assert_eq!(format_tokens(&value, "YYYY-MM-DDTHH:mmZ"), "2024-03-09T07:05+00:00");
        assert_eq!(format_tokens(&value, "100%"), "100%");
    }
}

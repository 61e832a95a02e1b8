//! Text cleanup and numeric-token coercion for extracted field values.
//!
//! Listing markup mixes visible text with icon glyphs, bidi marks, and
//! non-breaking spaces; everything here tolerates that noise and returns
//! `None` rather than failing.

use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;

static DECIMAL_TOKEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d+(?:[.,]\d+)?").expect("valid decimal regex"));

// Either a grouped integer ("1,024", "1.024", "1 024") or a plain number with
// an optional fraction, followed by an optional thousands suffix.
static COUNT_TOKEN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(\d{1,3}(?:[,.\u{a0}\u{202f} ]\d{3})+|\d+(?:[.,]\d+)?)\s*([kK])?\b")
        .expect("valid count regex")
});

/// Collapses runs of whitespace to single spaces and drops control, format,
/// and private-use characters. Returns `None` when nothing visible remains.
#[must_use]
pub fn normalize_text(raw: &str) -> Option<String> {
    let cleaned: String = raw
        .chars()
        .map(|c| if c.is_whitespace() { ' ' } else { c })
        .filter(|c| !is_invisible(*c))
        .collect();
    let collapsed = cleaned.split_whitespace().collect::<Vec<_>>().join(" ");
    if collapsed.is_empty() {
        None
    } else {
        Some(collapsed)
    }
}

fn is_invisible(c: char) -> bool {
    c.is_control()
        || matches!(c, '\u{200b}'..='\u{200f}' | '\u{2060}'..='\u{2064}' | '\u{feff}')
        || matches!(c, '\u{e000}'..='\u{f8ff}')
}

/// Returns the first decimal number in `text`, accepting `,` as the decimal
/// separator (`"4,5"` → `4.5`).
#[must_use]
pub fn parse_decimal_token(text: &str) -> Option<Decimal> {
    let token = DECIMAL_TOKEN.find(text)?.as_str().replace(',', ".");
    Decimal::from_str(&token).ok()
}

/// Returns the first whole-number count in `text`.
///
/// Accepts thousands separators (`"1,024"`, `"1.024"`, `"1 024"`) and a `K`
/// suffix (`"1.2K"` → 1200). Fractional numbers without a suffix are not
/// counts and are skipped, so `"4.5 (1,024)"` yields 1024.
#[must_use]
pub fn parse_count_token(text: &str) -> Option<u64> {
    COUNT_TOKEN.captures_iter(text).find_map(|caps| {
        let number = caps.get(1)?.as_str();
        let has_suffix = caps.get(2).is_some();
        let grouped = number.chars().filter(char::is_ascii_digit).count() > 3
            && number.contains([',', '.', ' ', '\u{a0}', '\u{202f}'])
            && !is_fraction(number);

        if has_suffix {
            let value = Decimal::from_str(&number.replace(',', ".")).ok()?;
            return (value * Decimal::from(1000)).trunc().to_u64();
        }
        if grouped {
            let digits: String = number.chars().filter(char::is_ascii_digit).collect();
            return digits.parse::<u64>().ok();
        }
        if is_fraction(number) {
            return None;
        }
        number.parse::<u64>().ok()
    })
}

/// `true` for tokens like `"4.5"` or `"4,5"`: a separator followed by a
/// group that is not exactly three digits. `"1,240,000"` is not a fraction.
fn is_fraction(number: &str) -> bool {
    let mut groups = number.split([',', '.', ' ', '\u{a0}', '\u{202f}']);
    groups.next();
    let mut tails = groups.peekable();
    tails.peek().is_some()
        && !tails.all(|group| group.len() == 3 && group.chars().all(|c| c.is_ascii_digit()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_collapses_whitespace() {
        assert_eq!(
            normalize_text("  Café\n\t  Lune   Paris ").as_deref(),
            Some("Café Lune Paris")
        );
    }

    #[test]
    fn normalize_strips_control_and_icon_glyphs() {
        assert_eq!(
            normalize_text("\u{e0c8}\u{200e}12 Rue de Rivoli\u{0007}").as_deref(),
            Some("12 Rue de Rivoli")
        );
    }

    #[test]
    fn normalize_treats_nbsp_as_space() {
        assert_eq!(normalize_text("4.5\u{a0}★").as_deref(), Some("4.5 ★"));
    }

    #[test]
    fn normalize_blank_is_none() {
        assert!(normalize_text(" \n \u{200b} ").is_none());
        assert!(normalize_text("").is_none());
    }

    #[test]
    fn decimal_from_star_rating() {
        assert_eq!(parse_decimal_token("4.5 ★ (1,024)"), Some(Decimal::new(45, 1)));
    }

    #[test]
    fn decimal_accepts_comma_separator() {
        assert_eq!(parse_decimal_token("Noté 4,2 sur 5"), Some(Decimal::new(42, 1)));
    }

    #[test]
    fn decimal_absent_without_digits() {
        assert!(parse_decimal_token("No reviews").is_none());
    }

    #[test]
    fn count_with_thousands_separator() {
        assert_eq!(parse_count_token("(1,024)"), Some(1024));
        assert_eq!(parse_count_token("1.024 avis"), Some(1024));
        assert_eq!(parse_count_token("2\u{a0}048 reviews"), Some(2048));
    }

    #[test]
    fn count_skips_leading_rating() {
        assert_eq!(parse_count_token("4.5 ★ (1,024)"), Some(1024));
    }

    #[test]
    fn count_with_several_thousands_groups() {
        assert_eq!(
            parse_count_token("About 1,240,000 results (0.52 seconds)"),
            Some(1_240_000)
        );
        assert_eq!(parse_count_token("(1,234,567)"), Some(1_234_567));
        assert_eq!(parse_count_token("1.024.000 avis"), Some(1_024_000));
        assert_eq!(parse_count_token("3\u{a0}500\u{a0}000 reviews"), Some(3_500_000));
    }

    #[test]
    fn fraction_check_looks_at_every_group() {
        assert!(is_fraction("4.5"));
        assert!(is_fraction("1,240,00"));
        assert!(!is_fraction("1,240,000"));
        assert!(!is_fraction("1024"));
    }

    #[test]
    fn count_plain_integer() {
        assert_eq!(parse_count_token("(87)"), Some(87));
        assert_eq!(parse_count_token("12345 reviews"), Some(12345));
    }

    #[test]
    fn count_with_k_suffix() {
        assert_eq!(parse_count_token("1.2K reviews"), Some(1200));
        assert_eq!(parse_count_token("(3k)"), Some(3000));
    }

    #[test]
    fn count_absent_when_only_a_fraction() {
        assert!(parse_count_token("4.5").is_none());
        assert!(parse_count_token("no reviews yet").is_none());
    }
}

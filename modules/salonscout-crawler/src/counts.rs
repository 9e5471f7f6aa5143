/// Parse a locale-formatted count like `"12,345"`, `"8.9K"` or `"60.3萬"`.
///
/// One trailing multiplier is recognised: K (thousand), M (million), case
/// insensitive, and 萬/万 (ten thousand). Anything that doesn't parse to a
/// non-negative number yields 0.
pub fn parse_count(text: &str) -> u64 {
    let cleaned: String = text
        .chars()
        .filter(|c| *c != ',' && !c.is_whitespace())
        .collect();

    let Some(last) = cleaned.chars().last() else {
        return 0;
    };

    let (mantissa, multiplier) = match last {
        'k' | 'K' => (&cleaned[..cleaned.len() - 1], 1_000.0),
        'm' | 'M' => (&cleaned[..cleaned.len() - 1], 1_000_000.0),
        '萬' | '万' => (&cleaned[..cleaned.len() - last.len_utf8()], 10_000.0),
        _ => (cleaned.as_str(), 1.0),
    };

    match mantissa.parse::<f64>() {
        Ok(value) if value.is_finite() && value >= 0.0 => (value * multiplier).round() as u64,
        _ => 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_and_grouped_numbers() {
        assert_eq!(parse_count("0"), 0);
        assert_eq!(parse_count("987"), 987);
        assert_eq!(parse_count("12,345"), 12_345);
        assert_eq!(parse_count(" 1,234,567 "), 1_234_567);
    }

    #[test]
    fn test_latin_suffixes_any_case() {
        assert_eq!(parse_count("8.9K"), 8_900);
        assert_eq!(parse_count("8.9k"), 8_900);
        assert_eq!(parse_count("1.25M"), 1_250_000);
        assert_eq!(parse_count("2m"), 2_000_000);
    }

    #[test]
    fn test_ten_thousand_suffix() {
        assert_eq!(parse_count("60.3萬"), 603_000);
        assert_eq!(parse_count("1.2万"), 12_000);
        assert_eq!(parse_count("3 萬"), 30_000);
    }

    #[test]
    fn test_rounds_to_nearest() {
        assert_eq!(parse_count("1.2346K"), 1_235);
        assert_eq!(parse_count("10.5"), 11);
    }

    #[test]
    fn test_garbage_degrades_to_zero() {
        assert_eq!(parse_count(""), 0);
        assert_eq!(parse_count("   "), 0);
        assert_eq!(parse_count("K"), 0);
        assert_eq!(parse_count("萬"), 0);
        assert_eq!(parse_count("lots"), 0);
        assert_eq!(parse_count("-5"), 0);
        assert_eq!(parse_count("1.2.3K"), 0);
        assert_eq!(parse_count("NaN"), 0);
        assert_eq!(parse_count("inf"), 0);
    }
}

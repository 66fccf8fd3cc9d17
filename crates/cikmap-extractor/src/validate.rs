//! Candidate validation
//!
//! Shape checks, the modulus-10 check digit and the contextual denylist that
//! weeds out ZIP codes, tax ids and file numbers sitting next to a marker.

use regex::Regex;
use std::sync::LazyLock;

/// Check-digit verdict for a candidate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckDigitStatus {
    /// The ninth character matches the computed check digit
    Valid,

    /// The ninth character differs from the computed check digit
    Mismatch,

    /// No check digit to verify (8-character candidate)
    NotApplicable,
}

impl CheckDigitStatus {
    /// Multiplier applied to the base confidence
    pub fn confidence_factor(&self) -> f32 {
        match self {
            CheckDigitStatus::Valid => 1.0,
            CheckDigitStatus::NotApplicable => 0.85,
            CheckDigitStatus::Mismatch => 0.5,
        }
    }
}

/// Characters of look-behind used by the contextual denylist
pub const CONTEXT_CHARS: usize = 24;

static DENIED_CONTEXT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)(?:\bI\.?R\.?S\b|\bFILE\s+(?:NO\b|NUMBER\b)|\bACCESSION\b|\bP\.?\s?O\.?\s+BOX\b)",
    )
    .unwrap()
});

static STATE_BEFORE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concat!(
        r"(?:^|[^A-Za-z])(?:AL|AK|AZ|AR|CA|CO|CT|DE|DC|FL|GA|HI|ID|IL|IN|IA|KS|KY|LA|ME|MD|",
        r"MA|MI|MN|MS|MO|MT|NE|NV|NH|NJ|NM|NY|NC|ND|OH|OK|OR|PA|RI|SC|SD|TN|TX|UT|VT|VA|",
        r"WA|WV|WI|WY|PR)[\s,.]*$",
    ))
    .unwrap()
});

static ADDRESS_BEFORE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concat!(
        r"(?i)(?:^|[^A-Za-z])(?:ALABAMA|ALASKA|ARIZONA|ARKANSAS|CALIFORNIA|COLORADO|CONNECTICUT|",
        r"DELAWARE|DISTRICT\s+OF\s+COLUMBIA|FLORIDA|GEORGIA|HAWAII|IDAHO|ILLINOIS|INDIANA|IOWA|",
        r"KANSAS|KENTUCKY|LOUISIANA|MAINE|MARYLAND|MASSACHUSETTS|MICHIGAN|MINNESOTA|",
        r"MISSISSIPPI|MISSOURI|MONTANA|NEBRASKA|NEVADA|NEW\s+HAMPSHIRE|NEW\s+JERSEY|",
        r"NEW\s+MEXICO|NEW\s+YORK|NORTH\s+CAROLINA|NORTH\s+DAKOTA|OHIO|OKLAHOMA|OREGON|",
        r"PENNSYLVANIA|RHODE\s+ISLAND|SOUTH\s+CAROLINA|SOUTH\s+DAKOTA|TENNESSEE|TEXAS|UTAH|",
        r"VERMONT|VIRGINIA|WASHINGTON|WISCONSIN|WYOMING|PUERTO\s+RICO|",
        r"ZIP(?:\s*CODE)?|POSTAL\s+CODE)[\s,.:#]*$",
    ))
    .unwrap()
});

/// Numeric value of one identifier character in the check-digit sum
fn char_value(c: char) -> Option<u32> {
    match c {
        '0'..='9' => c.to_digit(10),
        'A'..='Z' => Some(c as u32 - 'A' as u32 + 10),
        '*' => Some(36),
        '@' => Some(37),
        '#' => Some(38),
        _ => None,
    }
}

/// Compute the check digit over the first eight characters
///
/// Characters at even positions (1-based) are doubled and the decimal
/// digits of every value are summed.
///
/// # Examples
///
/// ```
/// use cikmap_extractor::compute_check_digit;
///
/// assert_eq!(compute_check_digit("037833100"), Some(0));
/// assert_eq!(compute_check_digit("68389X105"), Some(5));
/// assert_eq!(compute_check_digit("123"), None);
/// ```
pub fn compute_check_digit(candidate: &str) -> Option<u32> {
    let mut chars = candidate.chars();
    let mut total = 0;
    for i in 0..8 {
        let mut v = char_value(chars.next()?.to_ascii_uppercase())?;
        if i % 2 == 1 {
            v *= 2;
        }
        total += v / 10 + v % 10;
    }
    Some((10 - total % 10) % 10)
}

/// Verify the ninth character of a candidate
pub fn check_digit_status(candidate: &str) -> CheckDigitStatus {
    if candidate.chars().count() != 9 {
        return CheckDigitStatus::NotApplicable;
    }
    let expected = compute_check_digit(candidate);
    let actual = candidate.chars().nth(8).and_then(|c| c.to_digit(10));
    match (expected, actual) {
        (Some(e), Some(a)) if e == a => CheckDigitStatus::Valid,
        _ => CheckDigitStatus::Mismatch,
    }
}

fn is_sequential_run(candidate: &str) -> bool {
    let digits: Vec<i32> = candidate
        .bytes()
        .map(|b| i32::from(b) - i32::from(b'0'))
        .collect();
    let ascending = digits.windows(2).all(|w| w[1] - w[0] == 1);
    let descending = digits.windows(2).all(|w| w[0] - w[1] == 1);
    ascending || descending
}

/// Decide whether a token is plausibly an identifier
///
/// Lenient checks apply always. Strict mode additionally rejects numeric
/// shapes that are usually dates, phone or file numbers.
///
/// # Examples
///
/// ```
/// use cikmap_extractor::is_valid;
///
/// assert!(is_valid("68389X105", true));
/// assert!(is_valid("037833100", true));
/// assert!(!is_valid("000000000", false));
/// assert!(!is_valid("20230115", true));
/// ```
pub fn is_valid(candidate: &str, strict: bool) -> bool {
    let len = candidate.len();
    if !(8..=9).contains(&len) {
        return false;
    }
    if !candidate
        .bytes()
        .all(|b| b.is_ascii_uppercase() || b.is_ascii_digit())
    {
        return false;
    }

    let digit_count = candidate.bytes().filter(u8::is_ascii_digit).count();
    if digit_count < 5 {
        return false;
    }
    if candidate.bytes().all(|b| b == b'0') {
        return false;
    }
    if ["FILE", "PAGE", "TABLE"]
        .iter()
        .any(|word| candidate.contains(word))
    {
        return false;
    }

    let all_digits = digit_count == len;
    if all_digits && is_sequential_run(candidate) {
        return false;
    }
    // ZIP+4 written without the hyphen
    if all_digits && len == 9 && check_digit_status(candidate) == CheckDigitStatus::Mismatch {
        return false;
    }

    if strict && all_digits {
        if len == 8 {
            return false;
        }
        if candidate.starts_with("19") || candidate.starts_with("20") {
            return false;
        }
        let mut distinct: Vec<u8> = candidate.bytes().collect();
        distinct.sort_unstable();
        distinct.dedup();
        if distinct.len() < 4 {
            return false;
        }
    }

    true
}

/// Whether the text just before a token marks it as something else
///
/// All-digit tokens following a state (code or full name) or a ZIP label
/// are treated as postal codes.
///
/// `start` is the byte offset of the token within `text`.
pub fn is_denied_by_context(text: &str, start: usize, candidate: &str) -> bool {
    let context_start = text[..start]
        .char_indices()
        .rev()
        .nth(CONTEXT_CHARS - 1)
        .map(|(i, _)| i)
        .unwrap_or(0);
    let context = &text[context_start..start];

    if DENIED_CONTEXT_RE.is_match(context) {
        return true;
    }
    candidate.bytes().all(|b| b.is_ascii_digit())
        && (STATE_BEFORE_RE.is_match(context) || ADDRESS_BEFORE_RE.is_match(context))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_digit_known_identifiers() {
        assert_eq!(check_digit_status("037833100"), CheckDigitStatus::Valid);
        assert_eq!(check_digit_status("68389X105"), CheckDigitStatus::Valid);
        assert_eq!(check_digit_status("594918104"), CheckDigitStatus::Valid);
        assert_eq!(check_digit_status("68389X106"), CheckDigitStatus::Mismatch);
        assert_eq!(check_digit_status("68389X10"), CheckDigitStatus::NotApplicable);
    }

    #[test]
    fn test_confidence_factors() {
        assert_eq!(CheckDigitStatus::Valid.confidence_factor(), 1.0);
        assert!(
            CheckDigitStatus::Mismatch.confidence_factor()
                < CheckDigitStatus::NotApplicable.confidence_factor()
        );
    }

    #[test]
    fn test_lenient_rules() {
        assert!(is_valid("68389X105", false));
        assert!(is_valid("68389X106", false));
        assert!(!is_valid("68389x105", false));
        assert!(!is_valid("6838X", false));
        assert!(!is_valid("68389X1050", false));
        assert!(!is_valid("ABCD1234", false));
        assert!(!is_valid("FILE12345", false));
        assert!(!is_valid("123456789", false));
        assert!(!is_valid("98765432", false));
    }

    #[test]
    fn test_zip_plus_four_rejected() {
        assert_eq!(check_digit_status("100171234"), CheckDigitStatus::Mismatch);
        assert!(!is_valid("100171234", false));
    }

    #[test]
    fn test_strict_rules() {
        assert!(is_valid("20230115", false));
        assert!(!is_valid("20230115", true));
        assert!(!is_valid("12345670", true));
        assert!(is_valid("68389X10", true));
        assert!(!is_valid("111111110", true));
    }

    #[test]
    fn test_context_denylist() {
        let text = "IRS Identification No. 68389X105";
        let start = text.find("68389X105").unwrap();
        assert!(is_denied_by_context(text, start, "68389X105"));

        let text = "Commission File Number 68389X105";
        let start = text.find("68389X105").unwrap();
        assert!(is_denied_by_context(text, start, "68389X105"));

        let text = "First Street 68389X105";
        let start = text.find("68389X105").unwrap();
        assert!(!is_denied_by_context(text, start, "68389X105"));
    }

    #[test]
    fn test_state_abbreviation_marks_zip() {
        let text = "New York, NY 100171234";
        let start = text.find("100171234").unwrap();
        assert!(is_denied_by_context(text, start, "100171234"));

        let text = "Chicago, Illinois 606011005";
        let start = text.find("606011005").unwrap();
        assert!(is_denied_by_context(text, start, "606011005"));

        let text = "Zip Code: 100171008";
        let start = text.find("100171008").unwrap();
        assert!(is_denied_by_context(text, start, "100171008"));

        let text = "Chicago, Illinois 68389X105";
        let start = text.find("68389X105").unwrap();
        assert!(!is_denied_by_context(text, start, "68389X105"));

        let text = "Redmond, WA 98052-6399 CUSIP 594918104";
        let start = text.find("594918104").unwrap();
        assert!(!is_denied_by_context(text, start, "594918104"));
    }

    mod prop {
        use super::super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn test_valid_candidates_have_identifier_shape(s in "[A-Z0-9]{6,11}", strict in any::<bool>()) {
                if is_valid(&s, strict) {
                    prop_assert!(s.len() == 8 || s.len() == 9);
                    prop_assert!(s.bytes().filter(u8::is_ascii_digit).count() >= 5);
                }
            }

            #[test]
            fn test_strict_implies_lenient(s in "[A-Z0-9]{8,9}") {
                if is_valid(&s, true) {
                    prop_assert!(is_valid(&s, false));
                }
            }

            #[test]
            fn test_lowercase_never_valid(s in "[a-z][a-z0-9]{7,8}") {
                prop_assert!(!is_valid(&s, false));
            }
        }
    }
}

//! Text normalisation for values scraped from the pesi portal.
//!
//! The portal mixes Devanagari and ASCII digits, pads cells with
//! non-breaking spaces and line breaks, and writes dates with whichever
//! separator the clerk used. These helpers bring all of that into one shape
//! before records are written.
//!
//! # Conventions
//!
//! - Whitespace: any run of Unicode whitespace becomes one ASCII space
//! - Digits: Devanagari ० to ९ (U+0966..U+096F) map to 0-9
//! - Dates: `2081/9/7`, `२०८१-०९-०७`, `2081.09.07` all become `2081-09-07`

/// Collapse whitespace runs into single spaces and trim the ends.
pub fn normalize_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Replace Devanagari digits with their ASCII counterparts.
pub fn devanagari_to_ascii_digits(s: &str) -> String {
    s.chars()
        .map(|c| match c {
            '\u{0966}'..='\u{096F}' => {
                char::from(b'0' + (c as u32 - 0x0966) as u8)
            }
            _ => c,
        })
        .collect()
}

/// Normalise a three-part numeric date to `yyyy-mm-dd`.
///
/// Accepts `/`, `-` or `.` as separators and Devanagari digits. Anything
/// that is not three numeric parts is returned whitespace-normalised but
/// otherwise untouched, so unusual values survive for a human to inspect.
pub fn normalize_date(s: &str) -> String {
    let cleaned = devanagari_to_ascii_digits(&normalize_whitespace(s));
    let parts: Vec<&str> = cleaned.split(['/', '-', '.']).map(str::trim).collect();

    if let [y, m, d] = parts.as_slice()
        && let (Ok(y), Ok(m), Ok(d)) = (y.parse::<u32>(), m.parse::<u32>(), d.parse::<u32>())
    {
        return format!("{y:04}-{m:02}-{d:02}");
    }
    cleaned
}

/// Strip parenthesised annotations from a case number.
///
/// "081-CR-0123 (पुरानो 079-CR-0456)" becomes "081-CR-0123".
pub fn clean_case_number(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut depth = 0usize;
    for c in s.chars() {
        match c {
            '(' => depth += 1,
            ')' if depth > 0 => depth -= 1,
            _ if depth == 0 => out.push(c),
            _ => {}
        }
    }
    normalize_whitespace(&out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn whitespace_collapsed() {
        assert_eq!(normalize_whitespace("  a \n\t b\u{00A0}c  "), "a b c");
        assert_eq!(normalize_whitespace(""), "");
    }

    #[test]
    fn devanagari_digits() {
        assert_eq!(devanagari_to_ascii_digits("१२३"), "123");
        assert_eq!(devanagari_to_ascii_digits("इजलास नं. ४"), "इजलास नं. 4");
        assert_eq!(devanagari_to_ascii_digits("०९८७६५४३२१"), "0987654321");
        assert_eq!(devanagari_to_ascii_digits("abc 12"), "abc 12");
    }

    #[test]
    fn dates_normalised() {
        assert_eq!(normalize_date("2081/9/7"), "2081-09-07");
        assert_eq!(normalize_date("२०८१-०९-०७"), "2081-09-07");
        assert_eq!(normalize_date(" 2081.09.07 "), "2081-09-07");
    }

    #[test]
    fn unusual_dates_pass_through() {
        assert_eq!(normalize_date("**** ** **"), "**** ** **");
        assert_eq!(normalize_date("2081/09"), "2081/09");
        assert_eq!(normalize_date(""), "");
    }

    #[test]
    fn case_number_annotations_removed() {
        assert_eq!(clean_case_number("081-CR-0123 (पुरानो 079-CR-0456)"), "081-CR-0123");
        assert_eq!(clean_case_number("081-CR-0123"), "081-CR-0123");
        assert_eq!(clean_case_number("(x) 081-WO-0001 (y (z))"), "081-WO-0001");
    }
}

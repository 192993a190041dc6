// Text normalization shared by the extractors and the price matcher
use once_cell::sync::Lazy;
use regex::Regex;

static DIGIT_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"[0-9]+").unwrap());

const ZWNJ: char = '\u{200c}';

/// Replaces Persian (۰–۹) and Arabic-Indic (٠–٩) digits with ASCII digits and
/// Arabic separators with their ASCII counterparts. Everything else is kept.
pub fn normalize_digits(text: &str) -> String {
    text.chars().map(normalize_char).collect()
}

fn normalize_char(c: char) -> char {
    match c {
        '۰'..='۹' => ascii_digit(c as u32 - '۰' as u32),
        '٠'..='٩' => ascii_digit(c as u32 - '٠' as u32),
        '٬' | '،' => ',',
        '٫' => '.',
        _ => c,
    }
}

fn ascii_digit(offset: u32) -> char {
    char::from_digit(offset, 10).unwrap_or('0')
}

/// Normalized digits with every thousands separator removed.
pub fn strip_separators(text: &str) -> String {
    normalize_digits(text).replace(',', "")
}

/// First maximal run of digits in `text` as an integer.
///
/// Absence of digits (or a run too long for `u64`) is `None`, not an error.
pub fn extract_first_integer(text: &str) -> Option<u64> {
    let normalized = normalize_digits(text);
    DIGIT_RUN
        .find(&normalized)
        .and_then(|m| m.as_str().parse().ok())
}

/// Integer from a structured numeric column such as `۱۲۰٬۰۰۰ کیلومتر`.
pub fn parse_number_field(text: &str) -> Option<u64> {
    extract_first_integer(&strip_separators(text))
}

/// Canonical form used for every keyword comparison: lowercase, ASCII digits,
/// Persian letter forms, ZWNJ replaced by a space and whitespace collapsed.
pub fn fold_text(text: &str) -> String {
    let mapped: String = text
        .chars()
        .map(|c| match normalize_char(c) {
            'ي' | 'ى' => 'ی',
            'ك' => 'ک',
            'ة' => 'ه',
            ZWNJ => ' ',
            other => other,
        })
        .collect::<String>()
        .to_lowercase();
    mapped.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Splits folded text into word tokens. A Persian word glued to a number
/// (`پژو207`) yields two tokens; Latin codes such as `x5` stay whole.
pub fn tokenize(text: &str) -> Vec<&str> {
    let mut tokens = Vec::new();
    let mut start: Option<usize> = None;
    let mut prev: Option<char> = None;
    for (i, c) in text.char_indices() {
        if is_separator(c) {
            if let Some(s) = start.take() {
                tokens.push(&text[s..i]);
            }
        } else {
            match (start, prev) {
                (Some(s), Some(p)) if script_boundary(p, c) => {
                    tokens.push(&text[s..i]);
                    start = Some(i);
                }
                (None, _) => start = Some(i),
                _ => {}
            }
        }
        prev = Some(c);
    }
    if let Some(s) = start {
        tokens.push(&text[s..]);
    }
    tokens
}

fn is_separator(c: char) -> bool {
    c.is_whitespace() || matches!(c, '-' | '_' | '/' | '(' | ')' | ',' | '.' | '|' | '+' | ':')
}

fn script_boundary(a: char, b: char) -> bool {
    (a.is_ascii_digit() && !b.is_ascii() && b.is_alphabetic())
        || (b.is_ascii_digit() && !a.is_ascii() && a.is_alphabetic())
}

/// Keyword containment on folded text. Short single-word keywords (`kia`,
/// `x5`, `بنز`) must match a whole token so they do not fire inside longer
/// words such as `بنزین`.
pub fn contains_term(haystack: &str, term: &str) -> bool {
    if term.is_empty() {
        return false;
    }
    let short = term.chars().count() <= 3 && !term.contains(char::is_whitespace);
    if short {
        tokenize(haystack).iter().any(|t| *t == term)
    } else {
        haystack.contains(term)
    }
}

/// All maximal ASCII digit runs of already-normalized text, as strings.
pub fn digit_tokens(text: &str) -> Vec<&str> {
    DIGIT_RUN.find_iter(text).map(|m| m.as_str()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn converts_persian_and_arabic_digits() {
        assert_eq!(normalize_digits("۱۴۰۱"), "1401");
        assert_eq!(normalize_digits("٢٠٧"), "207");
        assert_eq!(normalize_digits("۸۰٬۰۰۰"), "80,000");
        assert_eq!(normalize_digits("۱٫۵ میلیارد"), "1.5 میلیارد");
    }

    #[test]
    fn normalize_digits_is_idempotent() {
        let samples = [
            "پژو ۲۰۷ مدل ۱۴۰۱، کارکرد ۸۰٬۰۰۰",
            "plain ascii 123",
            "",
            "٠١٢٣٤٥٦٧٨٩ ۰۱۲۳۴۵۶۷۸۹",
        ];
        for s in samples {
            let once = normalize_digits(s);
            assert_eq!(normalize_digits(&once), once);
        }
    }

    #[test]
    fn extracts_first_integer_or_none() {
        assert_eq!(extract_first_integer("کارکرد ۱۲۰ هزار"), Some(120));
        assert_eq!(extract_first_integer("abc 12 and 34"), Some(12));
        assert_eq!(extract_first_integer("بدون عدد"), None);
        assert_eq!(extract_first_integer(""), None);
    }

    #[test]
    fn number_field_strips_separators() {
        assert_eq!(parse_number_field("۱۲۰٬۰۰۰ کیلومتر"), Some(120_000));
        assert_eq!(parse_number_field("80,000"), Some(80_000));
        assert_eq!(parse_number_field("نامشخص"), None);
    }

    #[test]
    fn fold_text_unifies_forms() {
        assert_eq!(fold_text("رنگ\u{200c}شدگی  در ۲ ناحیه"), "رنگ شدگی در 2 ناحیه");
        assert_eq!(fold_text("Peugeot  207 TU5"), "peugeot 207 tu5");
        assert_eq!(fold_text("كيا"), "کیا");
        let once = fold_text("تمام‌رنگ ۱۴۰۰");
        assert_eq!(fold_text(&once), once);
    }

    #[test]
    fn short_terms_match_whole_tokens_only() {
        assert!(contains_term("bmw x5 2015", "x5"));
        assert!(!contains_term("mercedes benz", "es"));
        assert!(contains_term("کیا سراتو", "کیا"));
        assert!(contains_term("peugeot 207", "peugeot"));
        assert!(!contains_term("anything", ""));
        assert!(!contains_term("دوگانه سوز بنزین", "بنز"));
        assert!(contains_term("پژو207 مدل 1401", "پژو"));
    }

    #[test]
    fn tokenize_splits_persian_from_digits() {
        assert_eq!(tokenize("پژو207 tu5"), vec!["پژو", "207", "tu5"]);
        assert_eq!(tokenize("bmw x5, (2015)"), vec!["bmw", "x5", "2015"]);
        assert!(tokenize(" - ").is_empty());
    }

    #[test]
    fn digit_tokens_are_maximal_runs() {
        assert_eq!(digit_tokens("peugeot 2008 model 1405"), vec!["2008", "1405"]);
    }
}

//! Canonical forms for free text, names and phone numbers.
//!
//! Every comparison in the importer, the scoring engine and the contact
//! reconciler goes through these functions, so two sources agree on a key
//! exactly when their canonical forms are equal.

use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

/// Lower-case, strip diacritics, turn every non-alphanumeric character
/// (underscore included) into a separator and collapse separators.
///
/// Idempotent: `normalize_text(&normalize_text(x)) == normalize_text(x)`.
pub fn normalize_text(s: &str) -> String {
    let folded: String = s
        .nfkd()
        .flat_map(char::to_lowercase)
        .filter(|c| !is_combining_mark(*c))
        .collect();

    let mut out = String::with_capacity(folded.len());
    let mut pending_space = false;
    for c in folded.chars() {
        if c.is_alphanumeric() {
            if pending_space && !out.is_empty() {
                out.push(' ');
            }
            pending_space = false;
            out.push(c);
        } else {
            pending_space = true;
        }
    }
    out
}

/// Digits only. With `international`, a leading `+` on the input is kept.
pub fn normalize_phone(s: &str, international: bool) -> String {
    let trimmed = s.trim();
    let digits: String = trimmed.chars().filter(|c| c.is_ascii_digit()).collect();
    if international && trimmed.starts_with('+') && !digits.is_empty() {
        format!("+{digits}")
    } else {
        digits
    }
}

/// Suffix comparison of two phone numbers, tolerant of country codes that
/// only one side carries. Empty numbers never match.
pub fn phones_match(a: &str, b: &str) -> bool {
    let a = normalize_phone(a, false);
    let b = normalize_phone(b, false);
    if a.is_empty() || b.is_empty() {
        return false;
    }
    a.ends_with(&b) || b.ends_with(&a)
}

/// Last `n` digits of a phone number (all of them when shorter).
pub fn phone_suffix(s: &str, n: usize) -> String {
    let digits = normalize_phone(s, false);
    let skip = digits.len().saturating_sub(n);
    digits[skip..].to_string()
}

/// `D[D]/M[M]/YY[YY]` to `DD/MM/YYYY`. Two-digit years are read as 20YY.
pub fn normalize_date(date: &str) -> Option<String> {
    let mut parts = date.trim().split('/');
    let day = parts.next()?.trim();
    let month = parts.next()?.trim();
    let year = parts.next()?.trim();
    if parts.next().is_some() {
        return None;
    }
    let all_digits = |p: &str| !p.is_empty() && p.chars().all(|c| c.is_ascii_digit());
    if !(all_digits(day) && all_digits(month) && all_digits(year)) {
        return None;
    }
    let year = if year.len() == 2 {
        format!("20{year}")
    } else {
        year.to_string()
    };
    Some(format!("{day:0>2}/{month:0>2}/{year}"))
}

/// Drop the running-number prefix some address books prepend ("001 JUAN").
pub fn strip_numeric_prefix(name: &str) -> String {
    let trimmed = name.trim();
    let rest = trimmed.trim_start_matches(|c: char| c.is_ascii_digit());
    rest.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Comparison key for person names, shared by archives and address books.
pub fn name_key(name: &str) -> String {
    normalize_text(&strip_numeric_prefix(name))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_text_accents_and_case() {
        assert_eq!(normalize_text("CÁLLATE "), "callate");
        assert_eq!(normalize_text("  Instalación   GRATIS!! "), "instalacion gratis");
        assert_eq!(normalize_text("mañana"), "manana");
    }

    #[test]
    fn test_normalize_text_punctuation_and_underscore() {
        assert_eq!(normalize_text("no_me_interesa, cancelar."), "no me interesa cancelar");
        assert_eq!(normalize_text("¿cuánto sale?"), "cuanto sale");
        assert_eq!(normalize_text("..."), "");
    }

    #[test]
    fn test_normalize_text_idempotent() {
        for input in [
            "CÁLLATE ",
            "Fibra Óptica — 300 MB/s",
            "ｆｕｌｌｗｉｄｔｈ ①",
            "İstanbul _x_",
            "",
        ] {
            let once = normalize_text(input);
            assert_eq!(normalize_text(&once), once, "not idempotent for {input:?}");
        }
    }

    #[test]
    fn test_normalize_phone() {
        assert_eq!(normalize_phone("+54 9 261 276-7072", false), "5492612767072");
        assert_eq!(normalize_phone("+54 9 261 276-7072", true), "+5492612767072");
        assert_eq!(normalize_phone("(261) 276 7072", true), "2612767072");
        assert_eq!(normalize_phone("desconocido", true), "");
    }

    #[test]
    fn test_phones_match_suffix() {
        assert!(phones_match("+5492612767072", "2612767072"));
        assert!(phones_match("261 276 7072", "+54 9 261 276-7072"));
        assert!(!phones_match("123", "456"));
        assert!(!phones_match("", "2612767072"));
        assert!(!phones_match("desconocido", "desconocido"));
    }

    #[test]
    fn test_phone_suffix() {
        assert_eq!(phone_suffix("+54 9 261 276-7072", 8), "12767072");
        assert_eq!(phone_suffix("12345", 8), "12345");
    }

    #[test]
    fn test_normalize_date() {
        assert_eq!(normalize_date("5/1/26").as_deref(), Some("05/01/2026"));
        assert_eq!(normalize_date("05/01/2026").as_deref(), Some("05/01/2026"));
        assert_eq!(normalize_date("31/12/99").as_deref(), Some("31/12/2099"));
        assert_eq!(normalize_date("5-1-26"), None);
        assert_eq!(normalize_date("a/b/c"), None);
    }

    #[test]
    fn test_name_key_strips_prefix() {
        assert_eq!(strip_numeric_prefix("001 Juan  Perez"), "Juan Perez");
        assert_eq!(strip_numeric_prefix("149LUIS"), "LUIS");
        assert_eq!(name_key("001 JUAN PÉREZ"), "juan perez");
        assert_eq!(name_key("Juan Perez"), name_key("001 juan perez"));
    }
}

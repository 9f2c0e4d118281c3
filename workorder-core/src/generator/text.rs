//! Text preparation for renderers without Unicode fonts.

/// Replace Turkish letters with their closest ASCII form.
pub fn transliterate(text: &str) -> String {
    text.chars()
        .map(|c| match c {
            'ğ' => 'g',
            'Ğ' => 'G',
            'ü' => 'u',
            'Ü' => 'U',
            'ş' => 's',
            'Ş' => 'S',
            'ı' => 'i',
            'İ' => 'I',
            'ö' => 'o',
            'Ö' => 'O',
            'ç' => 'c',
            'Ç' => 'C',
            other => other,
        })
        .collect()
}

/// Transliterate, then replace anything still outside printable ASCII.
pub fn to_ascii(text: &str) -> String {
    transliterate(text)
        .chars()
        .map(|c| if c == ' ' || c.is_ascii_graphic() { c } else { '?' })
        .collect()
}

/// Cut `text` to exactly `max` characters, marking the cut with `...`.
///
/// Widths below the marker's length are cut without it.
pub fn truncate_chars(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    if max < 3 {
        return text.chars().take(max).collect();
    }
    let kept: String = text.chars().take(max - 3).collect();
    format!("{}...", kept)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transliterate_turkish() {
        assert_eq!(transliterate("Taşlı altın küpe"), "Tasli altin kupe");
        assert_eq!(transliterate("İŞ EMRİ ĞÜÇÖ"), "IS EMRI GUCO");
        assert_eq!(transliterate("plain"), "plain");
    }

    #[test]
    fn test_to_ascii_replaces_remaining() {
        assert_eq!(to_ascii("Ağırlık → 3g"), "Agirlik ? 3g");
    }

    #[test]
    fn test_truncate_chars() {
        assert_eq!(truncate_chars("kısa", 10), "kısa");
        assert_eq!(truncate_chars("Dokulu altın halka küpe", 12), "Dokulu al...");
        assert_eq!(truncate_chars("abcdef", 6), "abcdef");
    }

    #[test]
    fn test_truncate_keeps_exact_width() {
        let cut = truncate_chars("Dokulu altın küpe", 10);
        assert_eq!(cut, "Dokulu ...");
        assert_eq!(cut.chars().count(), 10);
        assert_eq!(truncate_chars("abcdef", 3), "...");
        assert_eq!(truncate_chars("abcdef", 2), "ab");
        assert_eq!(truncate_chars("abcdef", 0), "");
    }
}

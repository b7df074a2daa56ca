/// Canonical form of a Russian mobile number, `+7XXXXXXXXXX`.
///
/// Spaces, parentheses and dashes are ignored. Exactly three shapes are
/// accepted: `+7` followed by 10 digits, `8` followed by 10 digits and `7`
/// followed by 10 digits. Anything else yields `None`.
pub fn normalize_phone(input: &str) -> Option<String> {
    let compact: String = input
        .chars()
        .filter(|c| !c.is_whitespace() && !matches!(c, '(' | ')' | '-'))
        .collect();

    let national = compact
        .strip_prefix("+7")
        .or_else(|| compact.strip_prefix('8'))
        .or_else(|| compact.strip_prefix('7'))?;

    if national.len() == 10 && national.bytes().all(|b| b.is_ascii_digit()) {
        Some(format!("+7{national}"))
    } else {
        None
    }
}

/// Cyrillic letters (including Ё/ё) and spaces, with at least one letter.
pub fn is_valid_name(input: &str) -> bool {
    let name = input.trim();
    !name.is_empty() && name.chars().all(|c| c == ' ' || is_cyrillic_letter(c))
}

fn is_cyrillic_letter(c: char) -> bool {
    matches!(c, 'А'..='я' | 'Ё' | 'ё')
}

/// ASCII letters and digits only. Used for device and box serials.
pub fn is_valid_serial(input: &str) -> bool {
    let serial = input.trim();
    !serial.is_empty() && serial.bytes().all(|b| b.is_ascii_alphanumeric())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn phone_shapes() {
        assert_eq!(normalize_phone("89991234567").as_deref(), Some("+79991234567"));
        assert_eq!(normalize_phone("+79991234567").as_deref(), Some("+79991234567"));
        assert_eq!(normalize_phone("79991234567").as_deref(), Some("+79991234567"));
        assert_eq!(
            normalize_phone(" 8 (999) 123-45-67 ").as_deref(),
            Some("+79991234567")
        );
    }

    #[test]
    fn phone_rejects() {
        for input in [
            "123",
            "+1 999 123 4567",
            "",
            "8999123456",
            "899912345678",
            "+89991234567",
            "8999abc4567",
            "+7999123456７",
            "9991234567",
        ] {
            assert_eq!(normalize_phone(input), None, "{input:?}");
        }
    }

    #[test]
    fn names() {
        assert!(is_valid_name("Иван Петров"));
        assert!(is_valid_name("Ёлка"));
        assert!(is_valid_name("  анна  "));
        assert!(!is_valid_name("John Smith"));
        assert!(!is_valid_name(""));
        assert!(!is_valid_name("   "));
        assert!(!is_valid_name("Иван-Петров"));
        assert!(!is_valid_name("Иван2"));
    }

    #[test]
    fn serials() {
        assert!(is_valid_serial("SN12345"));
        assert!(is_valid_serial("12345"));
        assert!(is_valid_serial(" abc123 "));
        assert!(!is_valid_serial("СН12345"));
        assert!(!is_valid_serial("SN-12345"));
        assert!(!is_valid_serial("SN 12345"));
        assert!(!is_valid_serial(""));
    }
}

use std::borrow::Cow;

/// Strip control characters from user-controlled text (navigation labels,
/// imported translations, profile names).
///
/// Removes ASCII control chars 0x00-0x08, 0x0B-0x0C, 0x0E-0x1F and 0x7F.
/// Preserves tab, newline and carriage return.
///
/// Returns `Cow::Borrowed` when the input is already clean (common case).
pub fn strip_control_chars(s: &str) -> Cow<'_, str> {
    let is_stripped = |c: char| {
        c == '\u{7f}' || (c < '\u{20}' && c != '\t' && c != '\n' && c != '\r')
    };

    if !s.chars().any(is_stripped) {
        return Cow::Borrowed(s);
    }

    Cow::Owned(s.chars().filter(|&c| !is_stripped(c)).collect())
}

/// Fold a single character to its ASCII slug form.
///
/// Turkish letters are transliterated explicitly since they are the primary
/// site language; other Latin-1 accents fold to their base letter.
fn fold_char(c: char) -> Option<&'static str> {
    let folded = match c {
        'ç' | 'Ç' => "c",
        'ğ' | 'Ğ' => "g",
        'ı' | 'I' | 'İ' | 'i' => "i",
        'ö' | 'Ö' => "o",
        'ş' | 'Ş' => "s",
        'ü' | 'Ü' => "u",
        'â' | 'Â' | 'à' | 'á' | 'ä' | 'å' | 'À' | 'Á' | 'Ä' | 'Å' => "a",
        'î' | 'Î' | 'ì' | 'í' | 'ï' => "i",
        'û' | 'Û' | 'ù' | 'ú' => "u",
        'é' | 'è' | 'ê' | 'ë' | 'É' | 'È' => "e",
        'ó' | 'ò' | 'ô' => "o",
        'ñ' | 'Ñ' => "n",
        'ß' => "ss",
        _ => return None,
    };
    Some(folded)
}

/// Convert free text into a URL-safe slug.
///
/// Lowercases, transliterates Turkish and common accented letters, maps every
/// other non-alphanumeric run to a single `-` and trims leading/trailing
/// separators. The result may be empty (e.g. for `"???"`).
///
/// Slugification is idempotent: `slugify(&slugify(s)) == slugify(s)`.
///
/// ```
/// use haber::util::slugify;
///
/// assert_eq!(slugify("Haber Listesi"), "haber-listesi");
/// assert_eq!(slugify("Kullanıcılar & Roller"), "kullanicilar-roller");
/// assert_eq!(slugify("news_list"), "news-list");
/// ```
pub fn slugify(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut pending_sep = false;

    for c in s.chars() {
        let piece: Option<Cow<'static, str>> = if let Some(folded) = fold_char(c) {
            Some(Cow::Borrowed(folded))
        } else if c.is_ascii_alphanumeric() {
            Some(Cow::Owned(c.to_ascii_lowercase().to_string()))
        } else {
            None
        };

        match piece {
            Some(p) => {
                if pending_sep && !out.is_empty() {
                    out.push('-');
                }
                pending_sep = false;
                out.push_str(&p);
            }
            None => pending_sep = true,
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_strip_control_chars_clean_input_borrowed() {
        let result = strip_control_chars("Gündem");
        assert!(matches!(result, Cow::Borrowed(_)));
        assert_eq!(result, "Gündem");
    }

    #[test]
    fn test_strip_control_chars_removes_nul_and_del() {
        assert_eq!(strip_control_chars("Spor\x00\x7f"), "Spor");
    }

    #[test]
    fn test_strip_control_chars_preserves_whitespace() {
        assert_eq!(strip_control_chars("a\tb\nc\r"), "a\tb\nc\r");
    }

    #[test]
    fn test_slugify_turkish() {
        assert_eq!(slugify("Genel Bakış"), "genel-bakis");
        assert_eq!(slugify("Haber Düzenle"), "haber-duzenle");
        assert_eq!(slugify("İlçeler"), "ilceler");
        assert_eq!(slugify("ÇAĞRI"), "cagri");
    }

    #[test]
    fn test_slugify_collapses_separators() {
        assert_eq!(slugify("  Roles -- & Permissions  "), "roles-permissions");
    }

    #[test]
    fn test_slugify_raw_ids() {
        assert_eq!(slugify("edit_post"), "edit-post");
        assert_eq!(slugify("overview"), "overview");
    }

    #[test]
    fn test_slugify_empty_results() {
        assert_eq!(slugify(""), "");
        assert_eq!(slugify("???"), "");
        assert_eq!(slugify("—"), "");
    }

    proptest! {
        #[test]
        fn prop_slugify_idempotent(s in "\\PC{0,40}") {
            let once = slugify(&s);
            prop_assert_eq!(slugify(&once), once.clone());
        }

        #[test]
        fn prop_slugify_is_url_safe(s in "\\PC{0,40}") {
            let slug = slugify(&s);
            prop_assert!(slug.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-'));
            prop_assert!(!slug.starts_with('-') && !slug.ends_with('-'));
            prop_assert!(!slug.contains("--"));
        }
    }
}

use std::borrow::Cow;

use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

const ELLIPSIS: char = '…';

/// Display width of `s` in terminal columns.
///
/// ```
/// use portal::util::display_width;
///
/// assert_eq!(display_width("Rick"), 4);
/// assert_eq!(display_width("リック"), 6);
/// ```
pub fn display_width(s: &str) -> usize {
    UnicodeWidthStr::width(s)
}

/// Truncate `s` so it occupies at most `max_width` columns.
///
/// A trailing `…` marks a cut. Strings that already fit are returned
/// borrowed. Card cells are narrow, so this runs for every name on
/// every frame.
///
/// ```
/// use portal::util::truncate_to_width;
///
/// assert_eq!(truncate_to_width("Morty Smith", 20), "Morty Smith");
/// assert_eq!(truncate_to_width("Morty Smith", 6), "Morty…");
/// ```
pub fn truncate_to_width(s: &str, max_width: usize) -> Cow<'_, str> {
    if display_width(s) <= max_width {
        return Cow::Borrowed(s);
    }
    if max_width == 0 {
        return Cow::Borrowed("");
    }

    // Reserve one column for the ellipsis.
    let budget = max_width - 1;
    let mut used = 0;
    let mut out = String::with_capacity(s.len().min(max_width * 4));
    for c in s.chars() {
        let w = UnicodeWidthChar::width(c).unwrap_or(0);
        if used + w > budget {
            break;
        }
        used += w;
        out.push(c);
    }
    out.push(ELLIPSIS);
    Cow::Owned(out)
}

/// Drop control characters (including ESC) from API-supplied text before it
/// reaches the terminal. Returns the input borrowed when it is already clean.
pub fn sanitize(s: &str) -> Cow<'_, str> {
    if !s.chars().any(char::is_control) {
        return Cow::Borrowed(s);
    }
    Cow::Owned(s.chars().filter(|c| !c.is_control()).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_fits_is_borrowed() {
        assert!(matches!(truncate_to_width("Rick", 4), Cow::Borrowed("Rick")));
    }

    #[test]
    fn test_truncate_adds_ellipsis() {
        assert_eq!(truncate_to_width("Rick Sanchez", 5), "Rick…");
    }

    #[test]
    fn test_truncate_zero_width() {
        assert_eq!(truncate_to_width("Rick", 0), "");
    }

    #[test]
    fn test_truncate_width_one() {
        assert_eq!(truncate_to_width("Rick", 1), "…");
    }

    #[test]
    fn test_truncate_wide_chars() {
        // Each kana is two columns; budget of 4 leaves room for one plus ellipsis.
        assert_eq!(truncate_to_width("リック", 4), "リ…");
    }

    #[test]
    fn test_sanitize_strips_escape() {
        assert_eq!(sanitize("Evil\x1b[31mMorty"), "Evil[31mMorty");
        assert!(matches!(sanitize("Summer"), Cow::Borrowed(_)));
    }

    proptest! {
        #[test]
        fn prop_truncate_never_exceeds_width(s in "[a-zA-Z0-9 ぁ-ゖ]{0,40}", w in 0usize..30) {
            prop_assert!(display_width(&truncate_to_width(&s, w)) <= w);
        }
    }
}

use std::borrow::Cow;

/// Whether `c` may appear in an XML 1.0 document.
///
/// `Char ::= #x9 | #xA | #xD | [#x20-#xD7FF] | [#xE000-#xFFFD] | [#x10000-#x10FFFF]`
fn is_xml_char(c: char) -> bool {
    matches!(c,
        '\u{9}' | '\u{A}' | '\u{D}'
        | '\u{20}'..='\u{D7FF}'
        | '\u{E000}'..='\u{FFFD}'
        | '\u{10000}'..='\u{10FFFF}')
}

/// Strips characters that XML 1.0 forbids even when escaped.
///
/// Upstream feeds occasionally carry raw control characters (form feeds,
/// vertical tabs, stray `\x1b`) in titles and descriptions. Escaping cannot
/// represent them, so they are dropped before the text reaches the writer.
///
/// Returns `Cow::Borrowed` when the input is already clean (common case).
pub fn strip_invalid_xml_chars(s: &str) -> Cow<'_, str> {
    if s.chars().all(is_xml_char) {
        return Cow::Borrowed(s);
    }
    Cow::Owned(s.chars().filter(|&c| is_xml_char(c)).collect())
}

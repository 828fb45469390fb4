//! Entity substitution for payload text
//!
//! Markup producers escape control characters and XML specials; they are
//! turned back into literal characters right before emission.

/// Replacement table, applied top to bottom.
///
/// `&amp;` stays last so an ampersand produced by it is never re-read as
/// the start of another entity.
const ENTITIES: [(&str, &str); 9] = [
    ("&#9;", "\t"),
    ("&#x9;", "\t"),
    ("&#10;", "\n"),
    ("&#xA;", "\n"),
    ("&apos;", "'"),
    ("&quot;", "\""),
    ("&gt;", ">"),
    ("&lt;", "<"),
    ("&amp;", "&"),
];

/// Replace every entity token in `text` with its literal character
pub fn substitute_entities(text: &str) -> String {
    let mut out = text.to_string();
    for (token, literal) in ENTITIES {
        if out.contains(token) {
            out = out.replace(token, literal);
        }
    }
    out
}

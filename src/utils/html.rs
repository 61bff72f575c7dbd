// src/utils/html.rs

/// Escapes user-supplied text for placement inside HTML element content or
/// attribute values.
///
/// Stored values (emails, names) are rendered as text, never as markup, so this
/// uses ammonia's entity escaping rather than whitelist sanitization.
pub fn escape_text(input: &str) -> String {
    ammonia::clean_text(input)
}

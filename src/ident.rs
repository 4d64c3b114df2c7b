//! Identifier helpers shared by preset parsing and artifact naming

/// Lowercase and drop separators so `RadioBooth`, `radio-booth` and
/// `radio_booth` compare equal
pub fn normalize_key(name: &str) -> String {
    name.chars()
        .filter(|c| !matches!(c, '-' | '_' | ' '))
        .flat_map(char::to_lowercase)
        .collect()
}

/// Lowercase ASCII slug: alphanumeric runs joined by `_`, at most `max_len` bytes
pub fn slugify(text: &str, max_len: usize) -> String {
    let mut slug = String::with_capacity(max_len);
    let mut pending_sep = false;
    for c in text.chars() {
        if c.is_ascii_alphanumeric() {
            if pending_sep && !slug.is_empty() {
                if slug.len() + 1 >= max_len {
                    break;
                }
                slug.push('_');
            }
            pending_sep = false;
            if slug.len() >= max_len {
                break;
            }
            slug.push(c.to_ascii_lowercase());
        } else {
            pending_sep = true;
        }
    }
    slug
}

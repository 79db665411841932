// Slug derivation for resource names.

/// Lowercase a name and collapse everything that isn't ASCII alphanumeric
/// into single hyphens. Falls back to "resource" for names with no usable
/// characters.
pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    let mut pending_hyphen = false;

    for ch in name.chars() {
        if ch.is_ascii_alphanumeric() {
            if pending_hyphen && !slug.is_empty() {
                slug.push('-');
            }
            pending_hyphen = false;
            slug.push(ch.to_ascii_lowercase());
        } else {
            pending_hyphen = true;
        }
    }

    if slug.is_empty() {
        "resource".to_string()
    } else {
        slug
    }
}

/// The candidate slug for the nth attempt: the base itself first, then
/// numeric suffixes starting at 2 ("my-mod", "my-mod-2", "my-mod-3", ...).
pub fn with_suffix(base: &str, attempt: u32) -> String {
    if attempt == 0 {
        base.to_string()
    } else {
        format!("{}-{}", base, attempt + 1)
    }
}

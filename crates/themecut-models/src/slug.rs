//! Theme slug derivation: themes are addressed on disk by a filesystem-safe
//! slug rather than the free-form name.

use sha2::{Digest, Sha256};

/// Derive a slug from a theme name.
///
/// Lowercases, collapses non-alphanumeric runs to `_` and trims leading and
/// trailing underscores. A name with no usable characters falls back to a
/// stable digest-based slug so distinct themes never collide on disk.
pub fn slugify(text: &str) -> String {
    let mut slug = String::with_capacity(text.len());
    let mut pending_sep = false;
    for ch in text.trim().to_lowercase().chars() {
        if ch.is_ascii_alphanumeric() {
            if pending_sep && !slug.is_empty() {
                slug.push('_');
            }
            pending_sep = false;
            slug.push(ch);
        } else {
            pending_sep = true;
        }
    }
    if slug.is_empty() {
        let digest = Sha256::digest(text.as_bytes());
        return format!("theme_{:02x}{:02x}{:02x}{:02x}", digest[0], digest[1], digest[2], digest[3]);
    }
    slug
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slugify_basic() {
        assert_eq!(slugify("Sunset Surfing"), "sunset_surfing");
        assert_eq!(slugify("  Big--Wave!  "), "big_wave");
        assert_eq!(slugify("already_clean"), "already_clean");
    }

    #[test]
    fn slugify_empty_falls_back_to_digest() {
        let slug = slugify("竜巻");
        assert!(slug.starts_with("theme_"));
        assert_eq!(slug.len(), "theme_".len() + 8);
        // Stable across calls
        assert_eq!(slug, slugify("竜巻"));
        // Distinct inputs stay distinct
        assert_ne!(slug, slugify("火山"));
    }
}

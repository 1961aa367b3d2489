use std::collections::HashSet;

/// Fallback when a title has no ASCII letters or digits at all
const EMPTY_SLUG: &str = "game";

/// Derive a URL-safe slug from a title
///
/// ASCII letters and digits are kept (lower-cased); every other run of
/// characters becomes a single `-`.
pub fn slugify(title: &str) -> String {
    let mut slug = String::with_capacity(title.len());
    let mut pending_dash = false;

    for c in title.chars() {
        if c.is_ascii_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.push(c.to_ascii_lowercase());
        } else {
            pending_dash = true;
        }
    }

    if slug.is_empty() {
        EMPTY_SLUG.to_string()
    } else {
        slug
    }
}

/// Return `base` if nobody holds it, otherwise the first free `base-N` (N >= 2)
pub fn unique_slug(base: &str, taken: &HashSet<String>) -> String {
    if !taken.contains(base) {
        return base.to_string();
    }
    (2..)
        .map(|n| format!("{}-{}", base, n))
        .find(|candidate| !taken.contains(candidate))
        .unwrap_or_else(|| base.to_string())
}

/// True when `slug` is `base` itself or `base-N` for a positive number N
pub fn is_variant_of(base: &str, slug: &str) -> bool {
    match slug.strip_prefix(base) {
        Some("") => true,
        Some(rest) => rest
            .strip_prefix('-')
            .is_some_and(|n| !n.is_empty() && n.bytes().all(|b| b.is_ascii_digit())),
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slugify_basic_title() {
        assert_eq!(slugify("The Legend of Zelda"), "the-legend-of-zelda");
    }

    #[test]
    fn test_slugify_collapses_punctuation_runs() {
        assert_eq!(
            slugify("Zelda II: The Adventure of Link"),
            "zelda-ii-the-adventure-of-link"
        );
        assert_eq!(slugify("  Pac--Man!!  "), "pac-man");
        assert_eq!(slugify("Super Mario Bros."), "super-mario-bros");
    }

    #[test]
    fn test_slugify_drops_non_ascii() {
        assert_eq!(slugify("Pokémon Rouge"), "pok-mon-rouge");
        assert_eq!(slugify("ゼルダの伝説"), EMPTY_SLUG);
    }

    #[test]
    fn test_slugify_is_deterministic() {
        let title = "Street Fighter 2 Turbo";
        assert_eq!(slugify(title), slugify(title));
        assert_eq!(slugify(title), "street-fighter-2-turbo");
    }

    #[test]
    fn test_unique_slug_without_collision() {
        let taken = HashSet::new();
        assert_eq!(unique_slug("tetris", &taken), "tetris");
    }

    #[test]
    fn test_unique_slug_appends_first_free_suffix() {
        let taken: HashSet<String> = ["tetris", "tetris-2", "tetris-4"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        assert_eq!(unique_slug("tetris", &taken), "tetris-3");
    }

    #[test]
    fn test_is_variant_of() {
        assert!(is_variant_of("tetris", "tetris"));
        assert!(is_variant_of("tetris", "tetris-2"));
        assert!(is_variant_of("tetris", "tetris-15"));
        assert!(!is_variant_of("tetris", "tetris-attack"));
        assert!(!is_variant_of("tetris", "tetris-"));
        assert!(!is_variant_of("tetris", "tetris2"));
        assert!(!is_variant_of("tetris", "super-tetris"));
    }

    #[test]
    fn test_longer_titles_sharing_a_prefix_do_not_bump_the_suffix() {
        // "tetris-attack" matches the LIKE prefix but is not a variant
        let stored = ["tetris", "tetris-attack", "tetris-2"];
        let taken: HashSet<String> = stored
            .iter()
            .filter(|slug| is_variant_of("tetris", slug))
            .map(|s| s.to_string())
            .collect();

        assert_eq!(taken.len(), 2);
        assert_eq!(unique_slug("tetris", &taken), "tetris-3");
    }
}

/// Normalize a species common name for use in object-store paths.
///
/// Lowercases and replaces whitespace runs with single underscores, so
/// "Northern Cardinal" becomes "northern_cardinal".
pub fn species_slug(common_name: &str) -> String {
    common_name
        .trim()
        .split_whitespace()
        .map(|part| part.to_lowercase())
        .collect::<Vec<_>>()
        .join("_")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slug_lowercases_and_underscores() {
        assert_eq!(species_slug("Northern Cardinal"), "northern_cardinal");
        assert_eq!(species_slug("American Robin"), "american_robin");
    }

    #[test]
    fn slug_collapses_extra_whitespace() {
        assert_eq!(species_slug("  Wood   Thrush "), "wood_thrush");
    }

    #[test]
    fn slug_single_word() {
        assert_eq!(species_slug("Veery"), "veery");
    }
}

//! Name canonicalization
//!
//! Every name that takes part in matching or ends up in a filename goes
//! through [`normalize_name`], so equality of normalized keys is what drives
//! sprite naming.

/// Canonicalize a free-text name into a matching key.
///
/// Lowercases, drops every character outside `[a-z0-9]`, then removes a
/// single trailing `s` unless the key ends in `ss`, `us` or `is`.
///
/// # Examples
///
/// ```
/// use spritesplit::naming::normalize_name;
///
/// assert_eq!(normalize_name("Hospital Beds"), "hospitalbed");
/// assert_eq!(normalize_name("Glass"), "glass");
/// ```
pub fn normalize_name(name: &str) -> String {
    let mut key: String = name
        .to_lowercase()
        .chars()
        .filter(|c| c.is_ascii_lowercase() || c.is_ascii_digit())
        .collect();

    if key.ends_with('s') && !(key.ends_with("ss") || key.ends_with("us") || key.ends_with("is")) {
        key.pop();
    }

    key
}

/// Returns true if either normalized key contains the other.
pub fn keys_overlap(a: &str, b: &str) -> bool {
    a.contains(b) || b.contains(a)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_plural() {
        assert_eq!(normalize_name("Beds"), "bed");
    }

    #[test]
    fn test_normalize_keeps_double_s() {
        assert_eq!(normalize_name("Glass"), "glass");
    }

    #[test]
    fn test_normalize_keeps_us_and_is() {
        assert_eq!(normalize_name("Bus"), "bus");
        assert_eq!(normalize_name("Analysis"), "analysis");
    }

    #[test]
    fn test_normalize_strips_punctuation_and_spaces() {
        assert_eq!(normalize_name("IV-Drip Stand #2"), "ivdripstand2");
    }

    #[test]
    fn test_normalize_drops_non_ascii() {
        assert_eq!(normalize_name("Café Tables"), "caftable");
    }

    #[test]
    fn test_normalize_single_s() {
        // A lone "s" is not ss/us/is, so it is stripped to nothing
        assert_eq!(normalize_name("S"), "");
    }

    #[test]
    fn test_normalize_is_idempotent_for_plain_keys() {
        let once = normalize_name("Wheel Chairs");
        assert_eq!(once, "wheelchair");
        assert_eq!(normalize_name(&once), once);
    }

    #[test]
    fn test_keys_overlap() {
        assert!(keys_overlap("bed", "hospitalbed"));
        assert!(keys_overlap("hospitalbed", "bed"));
        assert!(!keys_overlap("chair", "bed"));
        assert!(keys_overlap("", "anything"));
    }
}

/// Compare a caller-supplied admin key against the configured one.
///
/// Runs in time independent of where the first mismatch is. An empty
/// configured key never matches.
pub fn verify_api_key(provided: &str, expected: &str) -> bool {
    let (provided, expected) = (provided.as_bytes(), expected.as_bytes());

    if expected.is_empty() || provided.len() != expected.len() {
        return false;
    }

    provided
        .iter()
        .zip(expected)
        .fold(0u8, |diff, (a, b)| diff | (a ^ b))
        == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_matching_key() {
        assert!(verify_api_key("clinic-admin-key", "clinic-admin-key"));
    }

    #[test]
    fn test_mismatch_and_length() {
        assert!(!verify_api_key("clinic-admin-kez", "clinic-admin-key"));
        assert!(!verify_api_key("clinic", "clinic-admin-key"));
        assert!(!verify_api_key("Clinic-Admin-Key", "clinic-admin-key"));
    }

    #[test]
    fn test_empty_configured_key_never_matches() {
        assert!(!verify_api_key("", ""));
    }
}

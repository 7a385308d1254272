#[cfg(test)]
mod tests {
    use crate::fingerprint::ClientFingerprint;

    #[test]
    fn same_triple_produces_the_same_fingerprint() {
        let a = ClientFingerprint::derive("203.0.113.7", "Bearer tok", "curl/8.5");
        let b = ClientFingerprint::derive("203.0.113.7", "Bearer tok", "curl/8.5");
        assert_eq!(a, b);
        assert_eq!(a.to_string(), b.to_string());
    }

    #[test]
    fn any_field_change_changes_the_fingerprint() {
        let base = ClientFingerprint::derive("203.0.113.7", "Bearer tok", "curl/8.5");
        assert_ne!(
            base,
            ClientFingerprint::derive("203.0.113.8", "Bearer tok", "curl/8.5")
        );
        assert_ne!(
            base,
            ClientFingerprint::derive("203.0.113.7", "Bearer other", "curl/8.5")
        );
        assert_ne!(
            base,
            ClientFingerprint::derive("203.0.113.7", "Bearer tok", "curl/8.6")
        );
    }

    #[test]
    fn renders_as_32_lowercase_hex_chars() {
        let rendered = ClientFingerprint::derive("10.0.0.1", "", "agent").to_string();
        assert_eq!(rendered.len(), 32);
        assert!(rendered
            .chars()
            .all(|ch| ch.is_ascii_hexdigit() && !ch.is_ascii_uppercase()));
    }

    #[test]
    fn empty_fields_still_separate_positions() {
        // the separator keeps ("a","","") distinct from ("","a","")
        assert_ne!(
            ClientFingerprint::derive("a", "", ""),
            ClientFingerprint::derive("", "a", "")
        );
    }
}

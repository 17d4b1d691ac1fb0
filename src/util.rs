//! Small text/path helpers shared across the export pipeline (grounded on
//! `original_source/src/engine.cpp`'s `Utils::sanitizeUtf8` /
//! `Utils::getCidFromGlobalID`).

/// Replaces invalid UTF-8 byte sequences with the Unicode replacement
/// character, guaranteeing the result is valid UTF-8 for concatenation into
/// the catalog body buffer (spec.md §4.7 step 2, §8 property 5).
pub fn sanitize_utf8(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes).into_owned()
}

/// Extracts the plain component id (`cid`) from a `gcid`: its first path
/// segment (spec.md GLOSSARY).
pub fn cid_from_gcid(gcid: &str) -> Option<&str> {
    gcid.split('/').next().filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitize_utf8_passes_through_valid_text() {
        assert_eq!(sanitize_utf8("héllo".as_bytes()), "héllo");
    }

    #[test]
    fn sanitize_utf8_replaces_invalid_bytes() {
        let invalid = [0x68, 0x65, 0xff, 0x6c, 0x6c, 0x6f];
        let sanitized = sanitize_utf8(&invalid);
        assert!(sanitized.is_char_boundary(0));
        assert!(sanitized.contains('\u{FFFD}'));
    }

    #[test]
    fn cid_from_gcid_takes_first_segment() {
        assert_eq!(cid_from_gcid("org.example.Foo/1.0/amd64"), Some("org.example.Foo"));
        assert_eq!(cid_from_gcid(""), None);
    }
}

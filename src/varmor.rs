//! Versioned text armoring for containers
//!
//! A container is binary. For channels that only carry text (clipboard,
//! chat, shell arguments) it can be wrapped as `veilbox1:` followed by
//! unpadded base64url. The armored form contains no whitespace and needs
//! no escaping in URLs or a POSIX shell. Armoring changes only the
//! transport encoding; the bytes inside are the same container.

use crate::error::{ErrorCategory, ErrorKind, Result, VeilboxError};
use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};

/// Magic prefix shared by every armor version
const MAGIC_PREFIX: &str = "veilbox";

/// Version 1 magic marker
const V1_MAGIC: &str = "veilbox1:";

/// Wrap container bytes, returning `veilbox1:{base64url-no-padding}`.
pub fn wrap(container: &[u8]) -> String {
    let mut armored = String::with_capacity(V1_MAGIC.len() + container.len().div_ceil(3) * 4);
    armored.push_str(V1_MAGIC);
    URL_SAFE_NO_PAD.encode_string(container, &mut armored);
    armored
}

/// Whether `data` looks like armored text rather than a binary container.
///
/// A binary container starts with a little-endian version number, so its
/// first bytes can never spell the magic prefix.
pub fn is_armored(data: &[u8]) -> bool {
    data.starts_with(MAGIC_PREFIX.as_bytes())
}

/// Unwrap an armored string, returning the container bytes.
///
/// Surrounding whitespace (a trailing newline from an editor, say) is
/// ignored.
pub fn unwrap(armored: &str) -> Result<Vec<u8>> {
    let armored = armored.trim();
    if armored.len() < V1_MAGIC.len() {
        return Err(VeilboxError::with_kind(
            ErrorCategory::User,
            ErrorKind::ArmoringInvalid,
            "input size smaller than magic marker; likely truncated",
        ));
    }

    if let Some(encoded) = armored.strip_prefix(V1_MAGIC) {
        URL_SAFE_NO_PAD.decode(encoded).map_err(|e| {
            VeilboxError::with_kind_and_source(
                ErrorCategory::User,
                ErrorKind::ArmoringDecode,
                format!("base64 decoding failed: {}", e),
                e,
            )
        })
    } else if armored.starts_with(MAGIC_PREFIX) {
        Err(VeilboxError::with_kind(
            ErrorCategory::User,
            ErrorKind::ArmoringFromFuture,
            "input claims to be armored veilbox data, but not a version we support",
        ))
    } else {
        Err(VeilboxError::with_kind(
            ErrorCategory::User,
            ErrorKind::ArmoringInvalid,
            "input unrecognized as armored veilbox data",
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wrap_known_output() {
        assert_eq!(wrap(b""), "veilbox1:");
        assert_eq!(wrap(b"test"), "veilbox1:dGVzdA");
        assert_eq!(wrap(&[0xFB, 0xFF]), "veilbox1:-_8");
    }

    #[test]
    fn test_unwrap_reverses_wrap() {
        let bytes: Vec<u8> = (0..=255).collect();
        assert_eq!(unwrap(&wrap(&bytes)).unwrap(), bytes);
    }

    #[test]
    fn test_trailing_newline_tolerated() {
        let armored = format!("{}\n", wrap(b"hello"));
        assert_eq!(unwrap(&armored).unwrap(), b"hello");
    }

    #[test]
    fn test_is_armored() {
        assert!(is_armored(wrap(b"abc").as_bytes()));
        assert!(!is_armored(&[1, 0, 0, 0, 0, 0, 0, 0]));
        assert!(!is_armored(b""));
    }

    #[test]
    fn test_truncated_input() {
        let err = unwrap("").expect_err("expected truncated input error");
        assert_eq!(err.kind, Some(ErrorKind::ArmoringInvalid));
    }

    #[test]
    fn test_wrong_version() {
        let err = unwrap("veilbox2:AAAA").expect_err("expected unsupported version error");
        assert_eq!(err.kind, Some(ErrorKind::ArmoringFromFuture));
    }

    #[test]
    fn test_not_veilbox() {
        let err = unwrap("something else entirely").expect_err("expected non-veilbox error");
        assert_eq!(err.kind, Some(ErrorKind::ArmoringInvalid));
    }

    #[test]
    fn test_bad_base64() {
        let err = unwrap("veilbox1:bad$$").expect_err("expected base64 decode error");
        assert_eq!(err.kind, Some(ErrorKind::ArmoringDecode));
    }

    #[test]
    fn test_url_and_shell_safe() {
        let armored = wrap(&[0xFFu8; 100]);
        for c in ['+', '/', '=', ' ', '\n', '\t'] {
            assert!(!armored.contains(c), "found {:?}", c);
        }
    }
}

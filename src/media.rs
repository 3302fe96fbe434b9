//! Media-type registry
//!
//! Containers store the original media type as a small integer. The
//! registry maps between the two; only `application/octet-stream -> 0`
//! is built in and every unknown string or id collapses onto it.

use std::collections::HashMap;
use std::path::Path;

use crate::error::{Result, VeilboxError};

/// The generic fallback media type.
pub const OCTET_STREAM: &str = "application/octet-stream";

/// Id of [`OCTET_STREAM`]. Reserved; cannot be re-registered.
pub const OCTET_STREAM_ID: u32 = 0;

/// Bidirectional `media type <-> id` mapping.
#[derive(Debug, Clone)]
pub struct MediaTypeRegistry {
    by_name: HashMap<String, u32>,
    by_id: HashMap<u32, String>,
}

impl Default for MediaTypeRegistry {
    fn default() -> Self {
        let mut registry = Self {
            by_name: HashMap::new(),
            by_id: HashMap::new(),
        };
        registry
            .by_name
            .insert(OCTET_STREAM.to_string(), OCTET_STREAM_ID);
        registry
            .by_id
            .insert(OCTET_STREAM_ID, OCTET_STREAM.to_string());
        registry
    }
}

impl MediaTypeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a mapping. Media types are compared case-insensitively; the
    /// spelling given here (trimmed) is what id lookups hand back.
    ///
    /// Re-registering an identical pair is a no-op. Reusing either side
    /// of an existing pair with a different partner is `InvalidParameter`,
    /// since that would make already-written containers decode differently.
    pub fn register(&mut self, media_type: &str, id: u32) -> Result<()> {
        let spelling = media_type.trim();
        let media_type = normalize(media_type);
        if media_type.is_empty() {
            return Err(VeilboxError::invalid_parameter("media type must not be empty"));
        }

        match (self.by_name.get(&media_type), self.by_id.get(&id)) {
            (Some(&existing), _) if existing == id => Ok(()),
            (Some(&existing), _) => Err(VeilboxError::invalid_parameter(format!(
                "media type {} is already registered with id {}",
                media_type, existing
            ))),
            (None, Some(existing)) => Err(VeilboxError::invalid_parameter(format!(
                "media type id {} is already taken by {}",
                id, existing
            ))),
            (None, None) => {
                self.by_id.insert(id, spelling.to_string());
                self.by_name.insert(media_type, id);
                Ok(())
            }
        }
    }

    /// Id for `media_type`, or `None` when unregistered.
    pub fn lookup_id(&self, media_type: &str) -> Option<u32> {
        self.by_name.get(&normalize(media_type)).copied()
    }

    /// Id for `media_type`, falling back to the octet-stream id.
    pub fn id_for(&self, media_type: &str) -> u32 {
        self.lookup_id(media_type).unwrap_or(OCTET_STREAM_ID)
    }

    /// Media type for `id`, or `None` when unregistered.
    pub fn lookup_name(&self, id: u32) -> Option<&str> {
        self.by_id.get(&id).map(String::as_str)
    }

    /// Media type for `id`, falling back to octet-stream for unknown ids.
    pub fn name_for(&self, id: u32) -> &str {
        self.lookup_name(id).unwrap_or(OCTET_STREAM)
    }

    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }
}

fn normalize(media_type: &str) -> String {
    media_type.trim().to_ascii_lowercase()
}

/// Best-effort media type from a file extension.
///
/// The result is only a label; whether it survives into a container
/// depends on the registry it is mapped through.
pub fn guess_from_path(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());
    match ext.as_deref() {
        Some("txt") | Some("text") | Some("log") => "text/plain",
        Some("md") => "text/markdown",
        Some("csv") => "text/csv",
        Some("html") | Some("htm") => "text/html",
        Some("json") => "application/json",
        Some("xml") => "application/xml",
        Some("pdf") => "application/pdf",
        Some("zip") => "application/zip",
        Some("png") => "image/png",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        _ => OCTET_STREAM,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn test_builtin_entry() {
        let registry = MediaTypeRegistry::new();
        assert_eq!(registry.id_for(OCTET_STREAM), 0);
        assert_eq!(registry.name_for(0), OCTET_STREAM);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_unknown_falls_back() {
        let registry = MediaTypeRegistry::new();
        assert_eq!(registry.lookup_id("text/plain"), None);
        assert_eq!(registry.id_for("text/plain"), OCTET_STREAM_ID);
        assert_eq!(registry.name_for(42), OCTET_STREAM);
        assert_eq!(registry.name_for(u32::MAX), OCTET_STREAM);
    }

    #[test]
    fn test_register_is_bidirectional() {
        let mut registry = MediaTypeRegistry::new();
        registry.register("Text/Plain", 1).unwrap();
        assert_eq!(registry.id_for("text/plain"), 1);
        assert_eq!(registry.id_for(" TEXT/PLAIN "), 1);
        assert_eq!(registry.name_for(1), "Text/Plain");
    }

    #[test]
    fn test_register_keeps_spelling() {
        let mut registry = MediaTypeRegistry::new();
        registry.register("  application/VND.Example+json ", 7).unwrap();
        assert_eq!(registry.lookup_name(7), Some("application/VND.Example+json"));
        // A differently cased duplicate is the same entry.
        registry.register("application/vnd.example+json", 7).unwrap();
        assert_eq!(registry.name_for(7), "application/VND.Example+json");
    }

    #[test]
    fn test_register_same_pair_twice() {
        let mut registry = MediaTypeRegistry::new();
        registry.register("image/png", 3).unwrap();
        registry.register("image/png", 3).unwrap();
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_register_conflicts() {
        let mut registry = MediaTypeRegistry::new();
        registry.register("image/png", 3).unwrap();

        let err = registry.register("image/png", 4).unwrap_err();
        assert_eq!(err.kind, Some(ErrorKind::InvalidParameter));

        let err = registry.register("image/gif", 3).unwrap_err();
        assert_eq!(err.kind, Some(ErrorKind::InvalidParameter));

        let err = registry.register("text/plain", OCTET_STREAM_ID).unwrap_err();
        assert_eq!(err.kind, Some(ErrorKind::InvalidParameter));

        let err = registry.register("  ", 9).unwrap_err();
        assert_eq!(err.kind, Some(ErrorKind::InvalidParameter));
    }

    #[test]
    fn test_guess_from_path() {
        assert_eq!(guess_from_path(Path::new("note.txt")), "text/plain");
        assert_eq!(guess_from_path(Path::new("dir/PHOTO.JPG")), "image/jpeg");
        assert_eq!(guess_from_path(Path::new("archive")), OCTET_STREAM);
        assert_eq!(guess_from_path(Path::new("weird.xyz")), OCTET_STREAM);
    }
}

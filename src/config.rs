//! Tool configuration
//!
//! Settings come from an optional TOML file:
//!
//! ```toml
//! cipher = "aes-256-cbc"
//! armor = false
//! password_env = "VEILBOX_PASSWORD"
//!
//! [kdf]
//! iterations = 100000
//! prf = "hmac-sha256"
//!
//! [media_types]
//! "text/plain" = 1
//! "application/pdf" = 2
//! ```
//!
//! Every key is optional. Without a file the built-in defaults apply.

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::debug;

use crate::algo::CipherChoice;
use crate::container::Codec;
use crate::error::{ErrorCategory, ErrorKind, Result, VeilboxError};
use crate::kdf::KdfParams;
use crate::media::MediaTypeRegistry;

/// Environment variable naming the configuration file.
pub const CONFIG_ENV: &str = "VEILBOX_CONFIG";

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Cipher used when the command line does not pick one.
    pub cipher: CipherChoice,
    /// Write armored text instead of binary containers by default.
    pub armor: bool,
    /// Read the password from this environment variable when set.
    pub password_env: Option<String>,
    pub kdf: KdfParams,
    /// Extra media types on top of the built-in octet-stream entry.
    pub media_types: BTreeMap<String, u32>,
}

impl Config {
    /// Parse TOML text.
    pub fn from_toml(text: &str) -> Result<Self> {
        toml::from_str(text).map_err(|e| {
            VeilboxError::with_kind_and_source(
                ErrorCategory::User,
                ErrorKind::Config,
                format!("invalid configuration: {}", e),
                e,
            )
        })
    }

    /// Load configuration from `explicit`, else from `$VEILBOX_CONFIG`.
    ///
    /// An explicitly named file must exist. A missing file named by the
    /// environment variable, or no file at all, yields the defaults.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::from_file(path);
        }
        match std::env::var_os(CONFIG_ENV).map(PathBuf::from) {
            Some(path) if path.exists() => Self::from_file(&path),
            Some(path) => {
                debug!(path = %path.display(), "configuration file not found; using defaults");
                Ok(Self::default())
            }
            None => Ok(Self::default()),
        }
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path).map_err(|e| {
            let category = if e.kind() == io::ErrorKind::NotFound {
                ErrorCategory::User
            } else {
                ErrorCategory::Internal
            };
            VeilboxError::with_kind_and_source(
                category,
                ErrorKind::Config,
                format!("failed to read configuration {}", path.display()),
                e,
            )
        })?;
        let config = Self::from_toml(&text)
            .map_err(|e| e.with_context(format!("in {}", path.display())))?;
        debug!(path = %path.display(), cipher = %config.cipher, "loaded configuration");
        Ok(config)
    }

    /// Build the media type registry described by this configuration.
    pub fn registry(&self) -> Result<MediaTypeRegistry> {
        let mut registry = MediaTypeRegistry::new();
        for (media_type, &id) in &self.media_types {
            registry.register(media_type, id).map_err(|e| {
                VeilboxError::with_kind_and_source(
                    ErrorCategory::User,
                    ErrorKind::Config,
                    format!("invalid [media_types] entry {:?}", media_type),
                    e,
                )
            })?;
        }
        Ok(registry)
    }

    /// A codec using this configuration's key derivation and media types.
    pub fn codec(&self) -> Result<Codec> {
        if self.kdf.iterations == 0 {
            return Err(VeilboxError::with_kind(
                ErrorCategory::User,
                ErrorKind::Config,
                "kdf.iterations must be positive",
            ));
        }
        Ok(Codec::new(self.kdf, self.registry()?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kdf::Prf;
    use tempfile::TempDir;

    #[test]
    fn test_empty_is_default() {
        let config = Config::from_toml("").unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.cipher, CipherChoice::Aes256Cbc);
        assert_eq!(config.kdf.iterations, 100_000);
        assert!(!config.armor);
    }

    #[test]
    fn test_full_file() {
        let config = Config::from_toml(
            r#"
            cipher = "aes-128-cbc"
            armor = true
            password_env = "MY_PW"

            [kdf]
            iterations = 250000
            prf = "hmac-sha512"

            [media_types]
            "text/plain" = 1
            "application/pdf" = 2
            "#,
        )
        .unwrap();

        assert_eq!(config.cipher, CipherChoice::Aes128Cbc);
        assert!(config.armor);
        assert_eq!(config.password_env.as_deref(), Some("MY_PW"));
        assert_eq!(config.kdf, KdfParams::new(250_000, Prf::HmacSha512));

        let codec = config.codec().unwrap();
        assert_eq!(codec.registry().id_for("text/plain"), 1);
        assert_eq!(codec.registry().name_for(2), "application/pdf");
        assert_eq!(codec.kdf().iterations, 250_000);
    }

    #[test]
    fn test_partial_kdf_table() {
        let config = Config::from_toml("[kdf]\niterations = 5000\n").unwrap();
        assert_eq!(config.kdf.iterations, 5000);
        assert_eq!(config.kdf.prf, Prf::HmacSha256);
    }

    #[test]
    fn test_bad_cipher_rejected() {
        let err = Config::from_toml(r#"cipher = "aes-256-gcm""#).unwrap_err();
        assert_eq!(err.kind, Some(ErrorKind::Config));
    }

    #[test]
    fn test_unknown_key_rejected() {
        let err = Config::from_toml("ciphr = \"aes-128-cbc\"").unwrap_err();
        assert_eq!(err.kind, Some(ErrorKind::Config));
    }

    #[test]
    fn test_reserved_media_id_rejected() {
        let config = Config::from_toml("[media_types]\n\"text/plain\" = 0\n").unwrap();
        let err = config.codec().unwrap_err();
        assert_eq!(err.kind, Some(ErrorKind::Config));
    }

    #[test]
    fn test_zero_iterations_rejected() {
        let config = Config::from_toml("[kdf]\niterations = 0\n").unwrap();
        let err = config.codec().unwrap_err();
        assert_eq!(err.kind, Some(ErrorKind::Config));
    }

    #[test]
    fn test_load_explicit_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("veilbox.toml");
        fs::write(&path, "cipher = \"aes-192-cbc\"\n").unwrap();

        let config = Config::load(Some(&path)).unwrap();
        assert_eq!(config.cipher, CipherChoice::Aes192Cbc);
    }

    #[test]
    fn test_load_missing_explicit_file() {
        let dir = TempDir::new().unwrap();
        let err = Config::load(Some(&dir.path().join("nope.toml"))).unwrap_err();
        assert_eq!(err.kind, Some(ErrorKind::Config));
        assert_eq!(err.category, ErrorCategory::User);
    }
}

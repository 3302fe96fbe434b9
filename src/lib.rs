//! veilbox - password-based encryption into self-describing AES-CBC containers
//!
//! The core is [`container::Codec`]: it derives a key from a password
//! with PBKDF2 ([`kdf`]), encrypts with AES-CBC ([`algo`]) and frames the
//! result behind a fixed header ([`header`]) recording the original name
//! and media type ([`media`]). The remaining modules wrap the core for
//! files, passwords, text transport and configuration.

#![forbid(unsafe_code)]

pub mod algo;
pub mod config;
pub mod container;
pub mod error;
pub mod file_ops;
pub mod header;
pub mod kdf;
pub mod media;
pub mod password;
pub mod varmor;

pub use algo::CipherChoice;
pub use container::{Codec, ContainerInfo, Decrypted, decrypt, encrypt, inspect};
pub use error::{ErrorCategory, ErrorKind, Result, VeilboxError};

//! Container codec: password-based encryption into a self-describing envelope
//!
//! This module implements encryption using:
//! - PBKDF2 (HMAC-SHA256, 100,000 iterations by default) for key derivation
//! - AES-128/192/256 in CBC mode with PKCS#7 padding
//!
//! The binary format is:
//! - header: 64 bytes (see [`crate::header`])
//! - salt: 16 bytes
//! - iv: 16 bytes
//! - ciphertext: variable length, equal to the header's length field
//!
//! The format carries no authentication tag. A wrong password is usually
//! caught by the padding check but can occasionally decrypt to garbage.

use rand::TryRngCore;
use rand::rngs::OsRng;
use tracing::{debug, warn};

use crate::algo::{BLOCK_LEN, CipherChoice, IV_LEN};
use crate::error::{ErrorCategory, ErrorKind, Result, VeilboxError};
use crate::header::{HEADER_LEN, Header, truncate_name};
use crate::kdf::{KdfParams, SALT_LEN};
use crate::media::MediaTypeRegistry;

/// Smallest possible container: header, salt and IV with no ciphertext.
pub const MIN_CONTAINER_LEN: usize = HEADER_LEN + SALT_LEN + IV_LEN;

const SALT_OFFSET: usize = HEADER_LEN;
const IV_OFFSET: usize = SALT_OFFSET + SALT_LEN;
const CIPHERTEXT_OFFSET: usize = IV_OFFSET + IV_LEN;

/// Result of a successful decryption.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decrypted {
    pub payload: Vec<u8>,
    /// The stored id as spelled at registration, or octet-stream when the
    /// registry does not know the id.
    pub media_type: String,
    pub original_name: String,
}

/// Header metadata readable without a password.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerInfo {
    pub version: u32,
    pub media_type_id: u32,
    pub media_type: String,
    pub original_name: String,
    pub payload_len: u32,
}

/// Encryption engine bundling key derivation parameters and the media
/// type registry.
///
/// A `Codec` holds no per-call state and may be shared across threads.
#[derive(Debug, Clone, Default)]
pub struct Codec {
    kdf: KdfParams,
    registry: MediaTypeRegistry,
}

impl Codec {
    pub fn new(kdf: KdfParams, registry: MediaTypeRegistry) -> Self {
        Self { kdf, registry }
    }

    pub fn kdf(&self) -> &KdfParams {
        &self.kdf
    }

    pub fn registry(&self) -> &MediaTypeRegistry {
        &self.registry
    }

    /// Registry access for adding media types before use.
    pub fn registry_mut(&mut self) -> &mut MediaTypeRegistry {
        &mut self.registry
    }

    /// Encrypt `payload` with a fresh random salt and IV.
    ///
    /// Returns header(64) + salt(16) + iv(16) + ciphertext(variable).
    pub fn encrypt(
        &self,
        payload: &[u8],
        password: &[u8],
        cipher: CipherChoice,
        media_type: &str,
        original_name: &str,
    ) -> Result<Vec<u8>> {
        check_encrypt_inputs(payload, password)?;

        let mut salt = [0u8; SALT_LEN];
        let mut iv = [0u8; IV_LEN];
        fill_random(&mut salt)?;
        fill_random(&mut iv)?;

        self.encrypt_with(payload, password, cipher, media_type, original_name, &salt, &iv)
    }

    /// Encrypt with a caller-provided salt and IV.
    ///
    /// This function is ONLY for generating deterministic output in tests.
    /// NEVER use it for real data; reusing an IV with the same key leaks
    /// plaintext structure. Use [`Codec::encrypt`] instead.
    #[allow(clippy::too_many_arguments)]
    pub fn encrypt_with(
        &self,
        payload: &[u8],
        password: &[u8],
        cipher: CipherChoice,
        media_type: &str,
        original_name: &str,
        salt: &[u8; SALT_LEN],
        iv: &[u8; IV_LEN],
    ) -> Result<Vec<u8>> {
        let media_type_id = match self.registry.lookup_id(media_type) {
            Some(id) => id,
            None => {
                warn!(media_type, "unregistered media type; storing as octet-stream");
                self.registry.id_for(media_type)
            }
        };
        self.seal(payload, password, cipher, media_type_id, original_name, salt, iv)
    }

    /// Encrypt recording `media_type_id` as is, registered or not.
    ///
    /// Used when re-sealing a container whose stored id must survive even
    /// if this codec's registry has never heard of it.
    pub(crate) fn encrypt_with_media_id(
        &self,
        payload: &[u8],
        password: &[u8],
        cipher: CipherChoice,
        media_type_id: u32,
        original_name: &str,
    ) -> Result<Vec<u8>> {
        check_encrypt_inputs(payload, password)?;

        let mut salt = [0u8; SALT_LEN];
        let mut iv = [0u8; IV_LEN];
        fill_random(&mut salt)?;
        fill_random(&mut iv)?;

        self.seal(payload, password, cipher, media_type_id, original_name, &salt, &iv)
    }

    #[allow(clippy::too_many_arguments)]
    fn seal(
        &self,
        payload: &[u8],
        password: &[u8],
        cipher: CipherChoice,
        media_type_id: u32,
        original_name: &str,
        salt: &[u8; SALT_LEN],
        iv: &[u8; IV_LEN],
    ) -> Result<Vec<u8>> {
        check_encrypt_inputs(payload, password)?;

        // PKCS#7 always pads, so the ciphertext is one block longer than
        // the payload rounded down to whole blocks.
        let ciphertext_len = (payload.len() / BLOCK_LEN + 1) * BLOCK_LEN;
        let payload_len = u32::try_from(ciphertext_len).map_err(|_| {
            VeilboxError::with_kind(
                ErrorCategory::User,
                ErrorKind::EncryptionFailure,
                format!(
                    "payload of {} bytes is too large for the container length field",
                    payload.len()
                ),
            )
        })?;

        if truncate_name(original_name).len() < original_name.len() {
            warn!(
                name_len = original_name.len(),
                "original name longer than the header field; truncating"
            );
        }

        let key = self.kdf.derive(password, salt, cipher.key_bits())?;
        let ciphertext = cipher
            .seal(&key, iv, payload)
            .map_err(|e| e.with_context("encryption failed"))?;
        if ciphertext.len() != ciphertext_len {
            return Err(VeilboxError::with_kind(
                ErrorCategory::Internal,
                ErrorKind::EncryptionFailure,
                format!(
                    "cipher produced {} bytes, expected {}",
                    ciphertext.len(),
                    ciphertext_len
                ),
            ));
        }

        let header = Header::new(media_type_id, original_name, payload_len);
        let mut output = Vec::with_capacity(MIN_CONTAINER_LEN + ciphertext.len());
        output.extend_from_slice(&header.to_bytes());
        output.extend_from_slice(salt);
        output.extend_from_slice(iv);
        output.extend_from_slice(&ciphertext);

        debug!(
            %cipher,
            payload_len = payload.len(),
            container_len = output.len(),
            media_type_id,
            "sealed container"
        );
        Ok(output)
    }

    /// Decrypt a container produced by [`Codec::encrypt`].
    ///
    /// `cipher` must match the choice used when sealing; the container
    /// does not record it.
    pub fn decrypt(
        &self,
        container: &[u8],
        password: &[u8],
        cipher: CipherChoice,
    ) -> Result<Decrypted> {
        let (header, body) = self.split(container)?;

        if password.is_empty() {
            return Err(VeilboxError::invalid_parameter("password must not be empty"));
        }

        let key = self.kdf.derive(password, body.salt, cipher.key_bits())?;
        let payload = cipher
            .open(&key, body.iv, body.ciphertext)
            .map_err(|e| e.with_context("corrupt input, wrong algorithm, or bad password"))?;

        let media_type = self.registry.name_for(header.media_type_id).to_string();
        debug!(
            %cipher,
            payload_len = payload.len(),
            media_type = media_type.as_str(),
            "opened container"
        );

        Ok(Decrypted {
            payload,
            media_type,
            original_name: header.name,
        })
    }

    /// Read header metadata without deriving a key.
    ///
    /// Applies the same structural checks as [`Codec::decrypt`].
    pub fn inspect(&self, container: &[u8]) -> Result<ContainerInfo> {
        let (header, _) = self.split(container)?;
        debug!(
            version = header.version,
            media_type_id = header.media_type_id,
            payload_len = header.payload_len,
            "inspected container"
        );
        Ok(ContainerInfo {
            version: header.version,
            media_type_id: header.media_type_id,
            media_type: self.registry.name_for(header.media_type_id).to_string(),
            original_name: header.name,
            payload_len: header.payload_len,
        })
    }

    fn split<'a>(&self, container: &'a [u8]) -> Result<(Header, Body<'a>)> {
        if container.len() < MIN_CONTAINER_LEN {
            return Err(VeilboxError::malformed(format!(
                "input likely truncated: {} bytes, a container needs at least {}",
                container.len(),
                MIN_CONTAINER_LEN
            )));
        }

        let header = Header::parse(container)?;
        if self.registry.lookup_name(header.media_type_id).is_none() {
            debug!(
                media_type_id = header.media_type_id,
                "unknown media type id; reporting octet-stream"
            );
        }

        let payload_len = header.payload_len as usize;
        let end = CIPHERTEXT_OFFSET
            .checked_add(payload_len)
            .ok_or_else(|| VeilboxError::malformed("ciphertext length overflows"))?;
        if container.len() < end {
            return Err(VeilboxError::malformed(
                "truncated or corrupt input; claimed length greater than available input",
            ));
        }
        if container.len() > end {
            return Err(VeilboxError::malformed(
                "invalid input: unexpected data after ciphertext",
            ));
        }
        if payload_len == 0 || payload_len % BLOCK_LEN != 0 {
            return Err(VeilboxError::malformed(format!(
                "ciphertext length {} is not a positive multiple of the {}-byte block size",
                payload_len, BLOCK_LEN
            )));
        }

        let salt: &[u8; SALT_LEN] = container[SALT_OFFSET..IV_OFFSET]
            .try_into()
            .map_err(|_| VeilboxError::malformed("failed to read salt"))?;
        let iv: &[u8; IV_LEN] = container[IV_OFFSET..CIPHERTEXT_OFFSET]
            .try_into()
            .map_err(|_| VeilboxError::malformed("failed to read iv"))?;

        Ok((
            header,
            Body {
                salt,
                iv,
                ciphertext: &container[CIPHERTEXT_OFFSET..end],
            },
        ))
    }
}

struct Body<'a> {
    salt: &'a [u8; SALT_LEN],
    iv: &'a [u8; IV_LEN],
    ciphertext: &'a [u8],
}

fn check_encrypt_inputs(payload: &[u8], password: &[u8]) -> Result<()> {
    if password.is_empty() {
        return Err(VeilboxError::invalid_parameter("password must not be empty"));
    }
    if payload.is_empty() {
        return Err(VeilboxError::with_kind(
            ErrorCategory::User,
            ErrorKind::EmptyInput,
            "refusing to encrypt an empty payload",
        ));
    }
    Ok(())
}

fn fill_random(buf: &mut [u8]) -> Result<()> {
    OsRng.try_fill_bytes(buf).map_err(|e| {
        VeilboxError::with_kind_and_source(
            ErrorCategory::Internal,
            ErrorKind::EncryptionFailure,
            format!("secure random source failed: {}", e),
            e,
        )
    })
}

/// Encrypt with default key derivation parameters and registry.
pub fn encrypt(
    payload: &[u8],
    password: &[u8],
    cipher: CipherChoice,
    media_type: &str,
    original_name: &str,
) -> Result<Vec<u8>> {
    Codec::default().encrypt(payload, password, cipher, media_type, original_name)
}

/// Decrypt with default key derivation parameters and registry.
pub fn decrypt(container: &[u8], password: &[u8], cipher: CipherChoice) -> Result<Decrypted> {
    Codec::default().decrypt(container, password, cipher)
}

/// Inspect with the default registry.
pub fn inspect(container: &[u8]) -> Result<ContainerInfo> {
    Codec::default().inspect(container)
}

//! Cipher selection and the raw AES-CBC/PKCS#7 layer

use std::fmt;
use std::str::FromStr;

use aes::cipher::block_padding::Pkcs7;
use aes::cipher::{BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use aes::{Aes128, Aes192, Aes256};
use serde::Deserialize;

use crate::error::{ErrorCategory, ErrorKind, Result, VeilboxError};

/// AES block size; also the IV length.
pub const BLOCK_LEN: usize = 16;

/// Length of the IV stored in every container.
pub const IV_LEN: usize = BLOCK_LEN;

/// The closed set of ciphers a container can be sealed with.
///
/// The choice is not recorded inside the container; decryption must be
/// told the same variant out of band.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Deserialize)]
#[serde(try_from = "String")]
pub enum CipherChoice {
    Aes128Cbc,
    Aes192Cbc,
    #[default]
    Aes256Cbc,
}

impl CipherChoice {
    pub const ALL: [CipherChoice; 3] = [
        CipherChoice::Aes128Cbc,
        CipherChoice::Aes192Cbc,
        CipherChoice::Aes256Cbc,
    ];

    /// Derived key length in bits.
    pub fn key_bits(self) -> u32 {
        match self {
            CipherChoice::Aes128Cbc => 128,
            CipherChoice::Aes192Cbc => 192,
            CipherChoice::Aes256Cbc => 256,
        }
    }

    pub fn key_len(self) -> usize {
        (self.key_bits() / 8) as usize
    }

    pub fn name(self) -> &'static str {
        match self {
            CipherChoice::Aes128Cbc => "aes-128-cbc",
            CipherChoice::Aes192Cbc => "aes-192-cbc",
            CipherChoice::Aes256Cbc => "aes-256-cbc",
        }
    }

    /// Encrypt `plaintext` under CBC with PKCS#7 padding.
    ///
    /// The output is always a non-empty multiple of [`BLOCK_LEN`].
    pub(crate) fn seal(self, key: &[u8], iv: &[u8; IV_LEN], plaintext: &[u8]) -> Result<Vec<u8>> {
        let ciphertext = match self {
            CipherChoice::Aes128Cbc => cbc::Encryptor::<Aes128>::new_from_slices(key, iv)
                .map_err(|_| self.bad_key_len(key.len()))?
                .encrypt_padded_vec_mut::<Pkcs7>(plaintext),
            CipherChoice::Aes192Cbc => cbc::Encryptor::<Aes192>::new_from_slices(key, iv)
                .map_err(|_| self.bad_key_len(key.len()))?
                .encrypt_padded_vec_mut::<Pkcs7>(plaintext),
            CipherChoice::Aes256Cbc => cbc::Encryptor::<Aes256>::new_from_slices(key, iv)
                .map_err(|_| self.bad_key_len(key.len()))?
                .encrypt_padded_vec_mut::<Pkcs7>(plaintext),
        };
        Ok(ciphertext)
    }

    /// Decrypt and unpad. A padding failure is reported as `DecryptionFailure`.
    pub(crate) fn open(self, key: &[u8], iv: &[u8; IV_LEN], ciphertext: &[u8]) -> Result<Vec<u8>> {
        let result = match self {
            CipherChoice::Aes128Cbc => cbc::Decryptor::<Aes128>::new_from_slices(key, iv)
                .map_err(|_| self.bad_key_len(key.len()))?
                .decrypt_padded_vec_mut::<Pkcs7>(ciphertext),
            CipherChoice::Aes192Cbc => cbc::Decryptor::<Aes192>::new_from_slices(key, iv)
                .map_err(|_| self.bad_key_len(key.len()))?
                .decrypt_padded_vec_mut::<Pkcs7>(ciphertext),
            CipherChoice::Aes256Cbc => cbc::Decryptor::<Aes256>::new_from_slices(key, iv)
                .map_err(|_| self.bad_key_len(key.len()))?
                .decrypt_padded_vec_mut::<Pkcs7>(ciphertext),
        };
        result.map_err(|_| {
            VeilboxError::with_kind(
                ErrorCategory::User,
                ErrorKind::DecryptionFailure,
                "bad padding after decryption: wrong password, wrong algorithm, or corrupt input",
            )
        })
    }

    fn bad_key_len(self, got: usize) -> VeilboxError {
        VeilboxError::with_kind(
            ErrorCategory::Internal,
            ErrorKind::InvalidParameter,
            format!(
                "{} needs a {}-byte key, got {} bytes",
                self.name(),
                self.key_len(),
                got
            ),
        )
    }
}

impl fmt::Display for CipherChoice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for CipherChoice {
    type Err = VeilboxError;

    fn from_str(s: &str) -> Result<Self> {
        CipherChoice::ALL
            .into_iter()
            .find(|c| c.name().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| {
                VeilboxError::invalid_parameter(format!(
                    "unsupported algorithm {:?} (expected aes-128-cbc, aes-192-cbc or aes-256-cbc)",
                    s
                ))
            })
    }
}

impl TryFrom<String> for CipherChoice {
    type Error = VeilboxError;

    fn try_from(s: String) -> Result<Self> {
        s.parse()
    }
}

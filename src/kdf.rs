//! Password-based key derivation (PBKDF2)
//!
//! Keys are derived with PBKDF2 over an HMAC pseudorandom function. The
//! parameters live in [`KdfParams`]; the container does not record them,
//! so whoever decrypts must use the same parameters that sealed it.

use crate::error::{Result, VeilboxError};
use pbkdf2::pbkdf2_hmac;
use serde::Deserialize;
use sha2::{Sha256, Sha512};
use zeroize::Zeroizing;

/// Length of the salt stored in every container.
pub const SALT_LEN: usize = 16;

/// Iteration count used for every container unless configured otherwise.
pub const DEFAULT_ITERATIONS: u32 = 100_000;

/// Key sizes, in bits, the derivation accepts.
pub const SUPPORTED_KEY_BITS: [u32; 3] = [128, 192, 256];

/// Pseudorandom function driving PBKDF2.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Prf {
    #[default]
    HmacSha256,
    HmacSha512,
}

/// Key derivation parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct KdfParams {
    pub iterations: u32,
    pub prf: Prf,
}

impl Default for KdfParams {
    fn default() -> Self {
        Self {
            iterations: DEFAULT_ITERATIONS,
            prf: Prf::HmacSha256,
        }
    }
}

impl KdfParams {
    pub fn new(iterations: u32, prf: Prf) -> Self {
        Self { iterations, prf }
    }

    /// Derive `key_bits / 8` bytes of key material from `password` and `salt`.
    ///
    /// Deterministic over its inputs. Fails with `InvalidParameter` on an
    /// empty password, a zero iteration count, or a key size outside
    /// [`SUPPORTED_KEY_BITS`].
    pub fn derive(&self, password: &[u8], salt: &[u8], key_bits: u32) -> Result<Zeroizing<Vec<u8>>> {
        if password.is_empty() {
            return Err(VeilboxError::invalid_parameter("password must not be empty"));
        }
        if !SUPPORTED_KEY_BITS.contains(&key_bits) {
            return Err(VeilboxError::invalid_parameter(format!(
                "unsupported key size: {} bits (expected 128, 192 or 256)",
                key_bits
            )));
        }
        if self.iterations == 0 {
            return Err(VeilboxError::invalid_parameter(
                "key derivation iteration count must be positive",
            ));
        }

        let mut key = Zeroizing::new(vec![0u8; (key_bits / 8) as usize]);
        match self.prf {
            Prf::HmacSha256 => pbkdf2_hmac::<Sha256>(password, salt, self.iterations, &mut key),
            Prf::HmacSha512 => pbkdf2_hmac::<Sha512>(password, salt, self.iterations, &mut key),
        }
        Ok(key)
    }
}

/// Derive a key with the default parameters (PBKDF2-HMAC-SHA256, 100,000 iterations).
pub fn derive(password: &[u8], salt: &[u8], key_bits: u32) -> Result<Zeroizing<Vec<u8>>> {
    KdfParams::default().derive(password, salt, key_bits)
}

//! Password sources

use crate::error::{ErrorCategory, ErrorKind, Result, VeilboxError};
use std::io::{self, IsTerminal, Read, Write};
use zeroize::Zeroizing;

/// Trait for obtaining the password used to seal or open a container
pub trait PasswordReader {
    /// Read a password as arbitrary bytes (not necessarily UTF-8).
    ///
    /// The result is wrapped in `Zeroizing` so it is wiped from memory
    /// when dropped. Emptiness is not checked here; the codec rejects
    /// empty passwords itself.
    fn read_password(&mut self) -> Result<Zeroizing<Vec<u8>>>;
}

/// Returns a fixed password (for testing and library callers that
/// already hold one)
pub struct ConstantPasswordReader {
    password: Zeroizing<Vec<u8>>,
}

impl ConstantPasswordReader {
    pub fn new(password: impl Into<Vec<u8>>) -> Self {
        Self {
            password: Zeroizing::new(password.into()),
        }
    }
}

impl PasswordReader for ConstantPasswordReader {
    fn read_password(&mut self) -> Result<Zeroizing<Vec<u8>>> {
        Ok(self.password.clone())
    }
}

/// Reads the password from any io::Read source, verbatim
///
/// Everything up to EOF is the password, including any trailing newline.
pub struct StreamPasswordReader {
    reader: Box<dyn Read>,
}

impl StreamPasswordReader {
    pub fn new(reader: Box<dyn Read>) -> Self {
        Self { reader }
    }
}

impl PasswordReader for StreamPasswordReader {
    fn read_password(&mut self) -> Result<Zeroizing<Vec<u8>>> {
        let mut data = Zeroizing::new(Vec::new());
        self.reader.read_to_end(&mut data).map_err(|e| {
            VeilboxError::with_kind_and_source(
                ErrorCategory::Internal,
                ErrorKind::Io,
                format!("error reading password: {}", e),
                e,
            )
        })?;
        Ok(data)
    }
}

/// Reads the password from an environment variable
pub struct EnvPasswordReader {
    var: String,
}

impl EnvPasswordReader {
    pub fn new(var: impl Into<String>) -> Self {
        Self { var: var.into() }
    }
}

impl PasswordReader for EnvPasswordReader {
    fn read_password(&mut self) -> Result<Zeroizing<Vec<u8>>> {
        match std::env::var_os(&self.var) {
            Some(value) => Ok(Zeroizing::new(value.into_encoded_bytes())),
            None => Err(VeilboxError::with_kind(
                ErrorCategory::User,
                ErrorKind::PasswordUnavailable,
                format!("environment variable {} is not set", self.var),
            )),
        }
    }
}

/// Reads the password from the terminal with no echo
#[derive(Default)]
pub struct TerminalPasswordReader;

impl TerminalPasswordReader {
    pub fn new() -> Self {
        Self
    }
}

impl PasswordReader for TerminalPasswordReader {
    /// Terminal input is limited to UTF-8 by rpassword. For non-UTF-8
    /// passwords, use --password-stdin instead.
    fn read_password(&mut self) -> Result<Zeroizing<Vec<u8>>> {
        if !io::stdin().is_terminal() {
            return Err(VeilboxError::with_kind(
                ErrorCategory::User,
                ErrorKind::PasswordUnavailable,
                "cannot read password from terminal - stdin is not a terminal",
            ));
        }

        let mut stderr = io::stderr();
        stderr
            .write_all(b"Password (veilbox): ")
            .and_then(|_| stderr.flush())
            .map_err(|e| {
                VeilboxError::with_kind_and_source(
                    ErrorCategory::Internal,
                    ErrorKind::Io,
                    format!("failed to write prompt: {}", e),
                    e,
                )
            })?;

        // rpassword hands back a plain String; move it into a zeroizing
        // buffer right away.
        let password = rpassword::read_password().map_err(|e| {
            VeilboxError::with_kind_and_source(
                ErrorCategory::Internal,
                ErrorKind::PasswordUnavailable,
                format!("failure reading password: {}", e),
                e,
            )
        })?;

        Ok(Zeroizing::new(password.into_bytes()))
    }
}

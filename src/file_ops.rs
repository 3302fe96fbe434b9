//! File encryption/decryption operations
//!
//! High-level operations for sealing files into containers, opening them
//! again, and replacing the content of an existing container.

use crate::algo::CipherChoice;
use crate::container::{Codec, ContainerInfo};
use crate::error::{ErrorCategory, ErrorKind, Result, VeilboxError};
use crate::media;
use crate::password::PasswordReader;
use crate::varmor;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tracing::info;

/// Knobs for [`encrypt_file`].
#[derive(Debug, Clone, Default)]
pub struct EncryptOptions {
    pub cipher: CipherChoice,
    /// Write `veilbox1:` armored text instead of raw container bytes.
    pub armor: bool,
    /// Name to record instead of the input's file name.
    pub name: Option<String>,
    /// Media type to record instead of one guessed from the extension.
    pub media_type: Option<String>,
}

/// Encrypt a file with a password
///
/// Reads the payload from `input_path`, seals it with a password from
/// `password_reader`, and writes the container to `output_path`. The
/// input's file name and guessed media type are recorded in the header
/// unless overridden in `options`.
///
/// The output is written atomically with mode 0o600 (read/write for owner
/// only) on Unix systems.
pub fn encrypt_file(
    codec: &Codec,
    input_path: &Path,
    output_path: &Path,
    password_reader: &mut dyn PasswordReader,
    options: &EncryptOptions,
) -> Result<()> {
    let payload = fs::read(input_path).map_err(|e| read_error(input_path, e))?;
    let name = match &options.name {
        Some(name) => name.clone(),
        None => input_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default(),
    };
    // A guess the registry can't store is not worth a warning.
    let media_type = match options.media_type.as_deref() {
        Some(media_type) => media_type,
        None => {
            let guessed = media::guess_from_path(input_path);
            if codec.registry().lookup_id(guessed).is_some() {
                guessed
            } else {
                media::OCTET_STREAM
            }
        }
    };

    let password = password_reader.read_password()?;
    let container = codec
        .encrypt(&payload, &password, options.cipher, media_type, &name)
        .map_err(|e| e.with_context("encryption failed"))?;

    let output = if options.armor {
        varmor::wrap(&container).into_bytes()
    } else {
        container
    };
    write_file_atomic(output_path, &output)
        .map_err(|e| e.with_context(format!("failed to write to {}", output_path.display())))?;

    info!(
        input = %input_path.display(),
        output = %output_path.display(),
        cipher = %options.cipher,
        armor = options.armor,
        "encrypted file"
    );
    Ok(())
}

/// Decrypt a file with a password
///
/// Reads a binary or armored container from `input_path` and opens it.
/// If `output_path` is an existing directory, the plaintext is written
/// inside it under the name recorded in the container; otherwise it is
/// written to `output_path` itself. Returns the path written.
///
/// Nothing is written unless decryption fully succeeds, and the output
/// is replaced atomically, so a failed write leaves no partial plaintext.
/// The output file gets mode 0o600 on Unix systems.
pub fn decrypt_file(
    codec: &Codec,
    input_path: &Path,
    output_path: &Path,
    password_reader: &mut dyn PasswordReader,
    cipher: CipherChoice,
) -> Result<PathBuf> {
    let (container, _) = read_container(input_path)?;
    let password = password_reader.read_password()?;
    let decrypted = codec
        .decrypt(&container, &password, cipher)
        .map_err(|e| e.with_context("failed to decrypt"))?;

    let target = if output_path.is_dir() {
        output_path.join(stored_file_name(&decrypted.original_name)?)
    } else {
        output_path.to_path_buf()
    };
    write_file_atomic(&target, &decrypted.payload)
        .map_err(|e| e.with_context(format!("failed to write to {}", target.display())))?;

    info!(
        input = %input_path.display(),
        output = %target.display(),
        media_type = decrypted.media_type.as_str(),
        "decrypted file"
    );
    Ok(target)
}

/// Update an encrypted file with new content using the same password
///
/// This function:
/// 1. Decrypts the existing container at `crypt_path` to validate the password
/// 2. Reads new content from `plain_path`
/// 3. Seals the new content with the validated password, keeping the
///    recorded name, media type and armoring of the existing file
/// 4. Atomically writes to `crypt_path` (tempfile + fsync + rename)
///
/// Either the old file or the new file exists afterwards, never a partial one.
///
/// Validation catches most accidental password changes; without an
/// authentication tag it cannot catch all of them.
pub fn update_file(
    codec: &Codec,
    plain_path: &Path,
    crypt_path: &Path,
    password_reader: &mut dyn PasswordReader,
    cipher: CipherChoice,
) -> Result<()> {
    let (container, armored) = read_container(crypt_path)?;
    let password = password_reader.read_password()?;

    let existing = codec
        .decrypt(&container, &password, cipher)
        .map_err(|e| e.with_context("failed to decrypt"))?;
    // The raw id, since this codec's registry may not know it.
    let media_type_id = codec.inspect(&container)?.media_type_id;

    let new_payload = fs::read(plain_path).map_err(|e| read_error(plain_path, e))?;
    let new_container = codec
        .encrypt_with_media_id(
            &new_payload,
            &password,
            cipher,
            media_type_id,
            &existing.original_name,
        )
        .map_err(|e| e.with_context("failed to encrypt"))?;
    let output = if armored {
        varmor::wrap(&new_container).into_bytes()
    } else {
        new_container
    };

    // Great, let's re-write it (atomically).
    write_file_atomic(crypt_path, &output)?;

    info!(
        input = %plain_path.display(),
        output = %crypt_path.display(),
        "updated encrypted file"
    );
    Ok(())
}

/// Read a container's header metadata. No password needed.
pub fn inspect_file(codec: &Codec, input_path: &Path) -> Result<ContainerInfo> {
    let (container, _) = read_container(input_path)?;
    codec
        .inspect(&container)
        .map_err(|e| e.with_context(format!("failed to inspect {}", input_path.display())))
}

/// Read a container file, unwrapping armor when present.
///
/// The flag reports whether the file was armored.
fn read_container(path: &Path) -> Result<(Vec<u8>, bool)> {
    let data = fs::read(path).map_err(|e| read_error(path, e))?;
    if !varmor::is_armored(&data) {
        return Ok((data, false));
    }
    let text = String::from_utf8(data).map_err(|e| {
        VeilboxError::with_kind_and_source(
            ErrorCategory::User,
            ErrorKind::ArmoringInvalid,
            "armored input is not valid UTF-8",
            e,
        )
    })?;
    let container = varmor::unwrap(&text).map_err(|e| e.with_context("failed to unarmor"))?;
    Ok((container, true))
}

/// The recorded name reduced to a single path component, so a crafted
/// container cannot direct output outside the chosen directory.
fn stored_file_name(original_name: &str) -> Result<PathBuf> {
    Path::new(original_name)
        .file_name()
        .map(PathBuf::from)
        .ok_or_else(|| {
            VeilboxError::invalid_parameter(format!(
                "container records no usable file name ({:?}); give an output file path",
                original_name
            ))
        })
}

/// Write `contents` to `path` via a tempfile in the same directory,
/// fsync, then rename over the target. Mode 0o600 on Unix.
///
/// Either the old file (or none) or the complete new one exists
/// afterwards, never a partial one.
fn write_file_atomic(path: &Path, contents: &[u8]) -> Result<()> {
    let dir = match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        Some(_) => Path::new("."),
        None => {
            return Err(VeilboxError::with_kind(
                ErrorCategory::User,
                ErrorKind::Io,
                format!("{} has no parent directory", path.display()),
            ));
        }
    };
    let mut temp_file = tempfile::NamedTempFile::new_in(dir).map_err(|e| {
        io_error(
            ErrorCategory::User,
            format!("failed to create tempfile in {}", dir.display()),
            e,
        )
    })?;
    temp_file
        .write_all(contents)
        .map_err(|e| io_error(ErrorCategory::Internal, "failed to write to tempfile", e))?;
    // Flush and fsync() such that the rename later, if it succeeds, will
    // always point to a valid file.
    temp_file
        .flush()
        .map_err(|e| io_error(ErrorCategory::Internal, "failed to flush tempfile", e))?;
    temp_file.as_file().sync_all().map_err(|e| {
        io_error(ErrorCategory::Internal, "failed to sync file prior to rename", e)
    })?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let mut perms = temp_file
            .as_file()
            .metadata()
            .map_err(|e| io_error(ErrorCategory::Internal, "failed to get tempfile metadata", e))?
            .permissions();
        perms.set_mode(0o600);
        temp_file.as_file().set_permissions(perms).map_err(|e| {
            io_error(ErrorCategory::Internal, "failed to set tempfile permissions", e)
        })?;
    }
    temp_file.persist(path).map_err(|e| {
        VeilboxError::with_kind_and_source(
            ErrorCategory::Internal,
            ErrorKind::Io,
            format!("failed to rename to target file {}", path.display()),
            e,
        )
    })?;
    Ok(())
}

fn io_error(category: ErrorCategory, msg: impl Into<String>, err: io::Error) -> VeilboxError {
    VeilboxError::with_kind_and_source(category, ErrorKind::Io, msg, err)
}

fn read_error(path: &Path, err: io::Error) -> VeilboxError {
    let category = if err.kind() == io::ErrorKind::NotFound {
        ErrorCategory::User
    } else {
        ErrorCategory::Internal
    };
    io_error(category, format!("failed to read from {}", path.display()), err)
}

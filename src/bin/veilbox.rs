//! veilbox CLI - password-based file encryption
//!
//! Command-line interface for sealing files into AES-CBC containers with
//! PBKDF2 key derivation, and for opening them again.

use clap::{Parser, Subcommand};
use std::error::Error as StdError;
use std::path::PathBuf;
use std::process;
use tracing_subscriber::EnvFilter;

use veilbox::config::Config;
use veilbox::file_ops::{self, EncryptOptions};
use veilbox::password::{
    EnvPasswordReader, PasswordReader, StreamPasswordReader, TerminalPasswordReader,
};
use veilbox::{CipherChoice, Result, VeilboxError};

/// Environment variable holding the log filter.
const LOG_ENV: &str = "VEILBOX_LOG";

#[derive(Parser)]
#[command(name = "veilbox")]
#[command(version)]
#[command(about = "Password-based file encryption.", long_about = None)]
struct Cli {
    /// Configuration file (defaults to $VEILBOX_CONFIG when set)
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Read password from stdin instead of from terminal
    #[arg(long, global = true, conflicts_with = "password_env")]
    password_stdin: bool,

    /// Read password from the named environment variable
    #[arg(long, global = true, value_name = "VAR")]
    password_env: Option<String>,

    /// Log details to stderr (-v for debug, -vv for trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Encrypt a file
    #[command(alias = "e")]
    Encrypt {
        /// Path to the file whose contents is to be encrypted
        #[arg(short, long, value_name = "FILE")]
        input: PathBuf,

        /// Path to the file to write the container to
        #[arg(short, long, value_name = "FILE")]
        output: PathBuf,

        /// aes-128-cbc, aes-192-cbc or aes-256-cbc
        #[arg(short, long, value_name = "ALGORITHM")]
        algorithm: Option<CipherChoice>,

        /// Write armored text instead of a binary container
        #[arg(long)]
        armor: bool,

        /// Name to record instead of the input file name
        #[arg(long)]
        name: Option<String>,

        /// Media type to record instead of guessing from the extension
        #[arg(long)]
        media_type: Option<String>,
    },

    /// Decrypt a file
    #[command(alias = "d")]
    Decrypt {
        /// Path to the container to decrypt (binary or armored)
        #[arg(short, long, value_name = "FILE")]
        input: PathBuf,

        /// File to write to, or a directory to restore the recorded name into
        #[arg(short, long, value_name = "PATH")]
        output: PathBuf,

        /// Algorithm the container was encrypted with
        #[arg(short, long, value_name = "ALGORITHM")]
        algorithm: Option<CipherChoice>,
    },

    /// Update an encrypted file with new content, while validating
    /// that the password is not accidentally changed.
    #[command(alias = "u")]
    Update {
        /// Path to the file whose contents is to be encrypted
        #[arg(short, long, value_name = "FILE")]
        input: PathBuf,

        /// Path to the existing container to replace
        #[arg(short, long, value_name = "FILE")]
        output: PathBuf,

        /// Algorithm the container was encrypted with
        #[arg(short, long, value_name = "ALGORITHM")]
        algorithm: Option<CipherChoice>,
    },

    /// Show the metadata recorded in a container header
    Inspect {
        /// Path to the container (binary or armored)
        #[arg(short, long, value_name = "FILE")]
        input: PathBuf,
    },
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    if let Err(e) = run(cli) {
        eprintln!("Error: {}", error_chain(&e));
        process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    let config = Config::load(cli.config.as_deref())?;
    let codec = config.codec()?;
    let get_reader = || -> Box<dyn PasswordReader> {
        if cli.password_stdin {
            Box::new(StreamPasswordReader::new(Box::new(std::io::stdin())))
        } else if let Some(var) = cli.password_env.as_ref().or(config.password_env.as_ref()) {
            Box::new(EnvPasswordReader::new(var.clone()))
        } else {
            Box::new(TerminalPasswordReader)
        }
    };

    match cli.command {
        Commands::Encrypt {
            input,
            output,
            algorithm,
            armor,
            name,
            media_type,
        } => {
            let options = EncryptOptions {
                cipher: algorithm.unwrap_or(config.cipher),
                armor: armor || config.armor,
                name,
                media_type,
            };
            let mut reader = get_reader();
            file_ops::encrypt_file(&codec, &input, &output, &mut *reader, &options)
        }
        Commands::Decrypt {
            input,
            output,
            algorithm,
        } => {
            let mut reader = get_reader();
            let cipher = algorithm.unwrap_or(config.cipher);
            file_ops::decrypt_file(&codec, &input, &output, &mut *reader, cipher).map(|_| ())
        }
        Commands::Update {
            input,
            output,
            algorithm,
        } => {
            let mut reader = get_reader();
            let cipher = algorithm.unwrap_or(config.cipher);
            file_ops::update_file(&codec, &input, &output, &mut *reader, cipher)
        }
        Commands::Inspect { input } => {
            let info = file_ops::inspect_file(&codec, &input)?;
            println!("version:      {}", info.version);
            println!("media type:   {} (id {})", info.media_type, info.media_type_id);
            println!("name:         {}", info.original_name);
            println!("payload size: {} bytes (encrypted)", info.payload_len);
            Ok(())
        }
    }
}

/// Logs go to stderr. `VEILBOX_LOG` takes an `EnvFilter` directive and
/// wins over `-v`.
fn init_logging(verbose: u8) {
    let filter = EnvFilter::try_from_env(LOG_ENV)
        .unwrap_or_else(|_| EnvFilter::new(default_log_level(verbose)));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

/// Filter used when `VEILBOX_LOG` is unset: `warn`, `debug` with `-v`,
/// `trace` with `-vv`.
fn default_log_level(verbose: u8) -> &'static str {
    match verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    }
}

/// The error's message followed by each distinct source message.
fn error_chain(err: &VeilboxError) -> String {
    let mut out = err.to_string();
    let mut source: Option<&(dyn StdError + 'static)> = err.source();
    while let Some(e) = source {
        let msg = e.to_string();
        if !out.ends_with(&msg) {
            out.push_str(": ");
            out.push_str(&msg);
        }
        source = e.source();
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verbosity_levels() {
        assert_eq!(default_log_level(0), "warn");
        assert_eq!(default_log_level(1), "debug");
        assert_eq!(default_log_level(2), "trace");
        assert_eq!(default_log_level(9), "trace");
    }

    #[test]
    fn test_verbose_flag_counts() {
        let cli = Cli::try_parse_from(["veilbox", "-v", "inspect", "-i", "x.veil"]).unwrap();
        assert_eq!(default_log_level(cli.verbose), "debug");
        let cli = Cli::try_parse_from(["veilbox", "inspect", "-vv", "-i", "x.veil"]).unwrap();
        assert_eq!(default_log_level(cli.verbose), "trace");
    }
}

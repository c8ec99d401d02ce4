//! Keyseal CLI - file encryption with a generated companion key
//!
//! Command-line interface for encrypting a file under a fresh
//! XSalsa20Poly1305 key written to `<output>.key`, and decrypting it again
//! with the key found at `<input>.key`.

use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;
use std::process;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

use keyseal::error::KeysealError;
use keyseal::file_ops::{self, OutputFormat};
use keyseal::keystore::{CompanionFileKeyStore, DEFAULT_KEY_SUFFIX};

#[derive(Parser)]
#[command(name = "keyseal")]
#[command(version)]
#[command(about = "Encrypt files under a generated key stored beside the ciphertext.", long_about = None)]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace). The RUST_LOG
    /// environment variable, the only one keyseal reads, overrides this.
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    /// Suffix appended to the ciphertext path to name its key file
    #[arg(
        long,
        value_name = "SUFFIX",
        default_value = DEFAULT_KEY_SUFFIX,
        value_parser = parse_key_suffix,
        global = true
    )]
    key_suffix: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Encrypt a file, writing its key to <OUTPUT> plus the key suffix
    #[command(alias = "e")]
    Encrypt {
        /// Path to the file whose contents is to be encrypted
        #[arg(value_name = "INPUT")]
        input: PathBuf,

        /// Path to the file to write the encrypted contents to
        #[arg(value_name = "OUTPUT")]
        output: PathBuf,

        /// Write the ciphertext as base64url text instead of raw bytes
        #[arg(long)]
        armor: bool,
    },

    /// Decrypt a file using the key at <INPUT> plus the key suffix
    #[command(alias = "d")]
    Decrypt {
        /// Path to the file whose contents is to be decrypted
        #[arg(value_name = "INPUT")]
        input: PathBuf,

        /// Path to the file to write the decrypted contents to
        #[arg(value_name = "OUTPUT")]
        output: PathBuf,
    },
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if let Err(e) = run(cli) {
        eprintln!("Error: {}", e.display_chain());
        process::exit(1);
    }
}

fn run(cli: Cli) -> Result<(), KeysealError> {
    let mut store = CompanionFileKeyStore::with_suffix(cli.key_suffix)?;

    match cli.command {
        Commands::Encrypt {
            input,
            output,
            armor,
        } => {
            let format = if armor {
                OutputFormat::Armored
            } else {
                OutputFormat::Raw
            };
            file_ops::encrypt_file_as(&input, &output, format, &mut store)
                .map_err(|e| e.with_context("encryption failed"))?;
            tracing::info!(
                output = %output.display(),
                key = %store.key_path(&output).display(),
                "encrypted"
            );
        }
        Commands::Decrypt { input, output } => {
            file_ops::decrypt_file(&input, &output, &mut store)
                .map_err(|e| e.with_context("decryption failed"))?;
            tracing::info!(output = %output.display(), "decrypted");
        }
    }

    Ok(())
}

fn parse_key_suffix(raw: &str) -> Result<String, String> {
    if raw.is_empty() {
        return Err("key suffix must not be empty".to_string());
    }
    Ok(raw.to_string())
}

/// Install a stderr subscriber. `RUST_LOG` wins over `-v` when set.
fn init_tracing(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    // Fails only if a global subscriber is already set.
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false),
        )
        .try_init();
}

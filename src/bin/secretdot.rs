//! SecretDot command-line tool
//!
//! Generates key pairs and seals or opens envelopes by hand, without a
//! ledger or blob store.

use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing::debug;
use tracing_subscriber::EnvFilter;
use zeroize::Zeroizing;

use secretdot::{
    decode_hex_key, decrypt_message, encrypt_message, Envelope, EnvelopeFormat, KeyPair, Result,
    SecretDotError,
};

/// SecretDot envelope tool
#[derive(Parser, Debug)]
#[command(name = "secretdot")]
#[command(version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Generate an encryption key pair
    Keygen {
        /// Derive the key pair from a 32-byte hex seed instead of randomly
        #[arg(long)]
        seed: Option<String>,
    },

    /// Encrypt a message for a recipient public key
    Encrypt {
        /// Recipient public key (hex, optional 0x prefix)
        public_key: String,

        /// Message text
        message: String,

        /// Print the JSON form instead of hex
        #[arg(long)]
        json: bool,
    },

    /// Decrypt an envelope with a private key
    Decrypt {
        /// Recipient private key (hex, optional 0x prefix)
        private_key: String,

        /// Envelope as hex or JSON
        envelope: String,
    },
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    match run(args.command) {
        Ok(output) => {
            println!("{}", output);
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(command: Command) -> Result<String> {
    match command {
        Command::Keygen { seed } => {
            let keys = match seed {
                Some(seed) => {
                    let seed = Zeroizing::new(decode_hex_key(&seed)?);
                    KeyPair::from_seed(&seed)?
                }
                None => KeyPair::generate(),
            };
            let secret = Zeroizing::new(keys.secret().to_bytes());
            Ok(format!(
                "private key: 0x{}\npublic key:  {}",
                hex::encode(*secret),
                keys.public_key_hex()
            ))
        }

        Command::Encrypt {
            public_key,
            message,
            json,
        } => {
            let recipient = decode_hex_key(&public_key)?;
            let envelope = encrypt_message(message.as_bytes(), &recipient)?;
            debug!(bytes = message.len(), json, "message encrypted");

            if json {
                Ok(envelope.to_json())
            } else {
                Ok(format!("0x{}", hex::encode(envelope.to_bytes(EnvelopeFormat::Binary))))
            }
        }

        Command::Decrypt {
            private_key,
            envelope,
        } => {
            let keys = KeyPair::from_secret_hex(&private_key)?;
            let envelope = parse_envelope_arg(&envelope)?;
            let plaintext = decrypt_message(&envelope, keys.secret())?;

            String::from_utf8(plaintext)
                .map_err(|_| SecretDotError::MalformedEnvelope("plaintext is not UTF-8".to_string()))
        }
    }
}

fn parse_envelope_arg(arg: &str) -> Result<Envelope> {
    let trimmed = arg.trim();
    if trimmed.starts_with('{') {
        return Envelope::from_json(trimmed.as_bytes());
    }

    let bytes = decode_hex_key(trimmed)
        .map_err(|_| SecretDotError::MalformedEnvelope("envelope is neither hex nor JSON".to_string()))?;
    Envelope::decode(&bytes)
}

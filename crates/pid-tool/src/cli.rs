//! CLI command definitions and argument parsing

use std::path::{Path, PathBuf};

use base64::{engine::general_purpose::STANDARD, Engine as _};
use clap::{Parser, Subcommand};
use pid_crypto::{Identity, IdentityError};
use thiserror::Error;
use zeroize::Zeroizing;

use crate::config::Config;
use crate::input::{self, InputError};
use crate::keyfile::{self, KeyFileError};
use crate::output::{IdentityInfo, OutputFormat, OutputFormatter};
use crate::ExitCode;

/// pid-tool - peer identity tool
#[derive(Parser, Debug)]
#[command(name = "pid-tool")]
#[command(version, about = "Generate, validate and use peer identities")]
pub struct Cli {
    /// Command to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Output format: table, json, quiet (overrides config)
    #[arg(long, global = true)]
    pub output: Option<OutputFormat>,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Debug logging
    #[arg(long, global = true)]
    pub debug: bool,

    /// Config file path
    #[arg(long, global = true, env = "PID_TOOL_CONFIG")]
    pub config: Option<PathBuf>,

    /// Largest input accepted, in bytes (overrides config)
    #[arg(long, global = true)]
    pub max_input_bytes: Option<u64>,
}

/// Identity arguments are a literal identity or a path to a file holding one.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Generate a new identity
    ///
    /// The secret identity is written to <SECRET_FILE>, or to stdout when
    /// omitted.
    Generate {
        secret_file: Option<PathBuf>,
    },
    /// Check that an identity is well formed and internally consistent
    Validate {
        identity: String,
    },
    /// Print the public part of an identity
    #[command(name = "getpublic")]
    GetPublic {
        identity: String,
    },
    /// Sign a file, printing a base64 signature
    Sign {
        /// Secret identity
        identity: String,
        file: PathBuf,
    },
    /// Verify a base64 signature over a file
    Verify {
        identity: String,
        file: PathBuf,
        signature: String,
    },
    /// Encrypt a message to a recipient (stdin/stdout when paths are omitted)
    Encrypt {
        /// Sender's secret identity
        secret: String,
        /// Recipient's identity
        recipient: String,
        input: Option<PathBuf>,
        outfile: Option<PathBuf>,
    },
    /// Decrypt a message from a sender (stdin/stdout when paths are omitted)
    Decrypt {
        /// Recipient's secret identity
        secret: String,
        /// Sender's identity
        sender: String,
        input: Option<PathBuf>,
        outfile: Option<PathBuf>,
    },
}

/// A failed command: the message to report and the exit code to return.
#[derive(Debug, Error)]
#[error("{message}")]
pub struct CommandError {
    pub code: ExitCode,
    pub message: String,
}

impl CommandError {
    fn new(code: ExitCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl From<InputError> for CommandError {
    fn from(e: InputError) -> Self {
        let code = match e {
            InputError::InvalidIdentity(_)
            | InputError::Unreadable { .. }
            | InputError::TooLarge { .. } => ExitCode::InvalidInput,
            InputError::Unwritable { .. } | InputError::Io(_) => ExitCode::GeneralError,
        };
        Self::new(code, e.to_string())
    }
}

impl From<KeyFileError> for CommandError {
    fn from(e: KeyFileError) -> Self {
        Self::new(ExitCode::GeneralError, e.to_string())
    }
}

impl From<IdentityError> for CommandError {
    fn from(e: IdentityError) -> Self {
        match e {
            IdentityError::MissingPrivate => {
                Self::new(ExitCode::MissingPrivateKey, "Identity has no private key")
            }
            IdentityError::Decrypt => Self::new(ExitCode::AuthenticationFailed, "Decryption failed"),
            IdentityError::Malformed(reason) => {
                Self::new(ExitCode::InvalidInput, format!("Malformed identity: {reason}"))
            }
            other => Self::new(ExitCode::GeneralError, other.to_string()),
        }
    }
}

type CommandResult = Result<ExitCode, CommandError>;

impl Cli {
    /// Execute the CLI command with a pre-loaded configuration.
    ///
    /// Command failures are reported through the formatter and turned into
    /// exit codes, as is a configuration that fails validation once CLI
    /// overrides are applied. Only unexpected errors are returned as `Err`.
    pub async fn execute_with_config(self, config: Config) -> anyhow::Result<ExitCode> {
        if let Err(e) = config.validate() {
            let fallback = OutputFormatter::new(OutputFormat::default(), false);
            fallback.error(&e.to_string(), ExitCode::InvalidInput);
            return Ok(ExitCode::InvalidInput);
        }
        let format = config
            .output
            .format
            .parse::<OutputFormat>()
            .map_err(anyhow::Error::msg)?;
        let formatter = OutputFormatter::new(format, config.output.verbose);
        let max_bytes = config.input.max_bytes;

        let result = match self.command {
            Commands::Generate { secret_file } => {
                generate(&formatter, &config, secret_file.as_deref())
            }
            Commands::Validate { identity } => validate(&formatter, &config, &identity).await,
            Commands::GetPublic { identity } => get_public(&formatter, &identity).await,
            Commands::Sign { identity, file } => sign(&formatter, &identity, &file, max_bytes).await,
            Commands::Verify {
                identity,
                file,
                signature,
            } => verify(&formatter, &identity, &file, &signature, max_bytes).await,
            Commands::Encrypt {
                secret,
                recipient,
                input,
                outfile,
            } => {
                encrypt(
                    &formatter,
                    &secret,
                    &recipient,
                    input.as_deref(),
                    outfile.as_deref(),
                    max_bytes,
                )
                .await
            }
            Commands::Decrypt {
                secret,
                sender,
                input,
                outfile,
            } => {
                decrypt(
                    &formatter,
                    &secret,
                    &sender,
                    input.as_deref(),
                    outfile.as_deref(),
                    max_bytes,
                )
                .await
            }
        };

        match result {
            Ok(code) => Ok(code),
            Err(e) => {
                tracing::debug!(code = e.code.name(), "Command failed");
                formatter.error(&e.message, e.code);
                Ok(e.code)
            }
        }
    }
}

fn generate(formatter: &OutputFormatter, config: &Config, secret_file: Option<&Path>) -> CommandResult {
    formatter.progress("Generating identity...");
    let identity = Identity::generate()?;
    tracing::info!(address = %identity.address(), "Generated identity");

    match secret_file {
        Some(path) => {
            keyfile::write_secret(path, &identity, config.identity.secret_file_mode)?;
            formatter.success(&format!("Secret identity written to {}", path.display()));
            println!("{}", formatter.format_public(&IdentityInfo::new(&identity)));
        }
        None => {
            let secret = identity.to_text(true);
            let rendered = Zeroizing::new(formatter.format_secret(&identity, &secret));
            println!("{}", rendered.as_str());
        }
    }
    Ok(ExitCode::Success)
}

async fn validate(formatter: &OutputFormatter, config: &Config, arg: &str) -> CommandResult {
    let identity = input::load_identity(arg).await?;
    let thorough = config.identity.thorough_validation;
    formatter.progress(if thorough {
        "Validating identity (thorough)..."
    } else {
        "Validating identity..."
    });

    let valid = identity.locally_validate(thorough);
    tracing::info!(address = %identity.address(), valid, thorough, "Validated identity");

    let output = formatter.format_identity(&IdentityInfo::new(&identity).with_validity(valid));
    if !output.is_empty() {
        println!("{output}");
    }
    if valid {
        Ok(ExitCode::Success)
    } else {
        Err(CommandError::new(
            ExitCode::InvalidInput,
            format!("{} FAILED validation", input::describe_identity_arg(arg)),
        ))
    }
}

async fn get_public(formatter: &OutputFormatter, arg: &str) -> CommandResult {
    let identity = input::load_identity(arg).await?;
    println!("{}", formatter.format_public(&IdentityInfo::new(&identity)));
    Ok(ExitCode::Success)
}

async fn sign(formatter: &OutputFormatter, arg: &str, file: &Path, max_bytes: u64) -> CommandResult {
    let identity = input::load_identity(arg).await?;
    if !identity.has_private() {
        return Err(IdentityError::MissingPrivate.into());
    }
    let message = input::read_input(Some(file), max_bytes).await?;

    let signature = identity.sign(&message)?;
    tracing::info!(address = %identity.address(), bytes = message.len(), "Signed file");

    let encoded = STANDARD.encode(signature.as_bytes());
    println!(
        "{}",
        formatter.format_signature(&identity.address().to_string(), &encoded)
    );
    Ok(ExitCode::Success)
}

async fn verify(
    formatter: &OutputFormatter,
    arg: &str,
    file: &Path,
    signature: &str,
    max_bytes: u64,
) -> CommandResult {
    let identity = input::load_identity(arg).await?;
    let signature = STANDARD
        .decode(signature.trim())
        .map_err(|_| CommandError::new(ExitCode::InvalidInput, "Signature is not valid base64"))?;
    let message = input::read_input(Some(file), max_bytes).await?;

    let valid = identity.verify_signature(&message, &signature);
    tracing::info!(address = %identity.address(), valid, "Verified signature");

    let output = formatter.format_verification(&identity.address().to_string(), valid);
    if !output.is_empty() {
        println!("{output}");
    }
    if valid {
        Ok(ExitCode::Success)
    } else {
        Ok(ExitCode::AuthenticationFailed)
    }
}

async fn encrypt(
    formatter: &OutputFormatter,
    secret: &str,
    recipient: &str,
    input_path: Option<&Path>,
    outfile: Option<&Path>,
    max_bytes: u64,
) -> CommandResult {
    let sender = input::load_identity(secret).await?;
    if !sender.has_private() {
        return Err(IdentityError::MissingPrivate.into());
    }
    let recipient = input::load_identity(recipient).await?;
    let plaintext = Zeroizing::new(input::read_input(input_path, max_bytes).await?);

    formatter.progress(&format!("Encrypting {} bytes...", plaintext.len()));
    let sealed = sender.encrypt(&recipient, &plaintext)?;
    tracing::info!(
        sender = %sender.address(),
        recipient = %recipient.address(),
        bytes = plaintext.len(),
        "Encrypted message"
    );

    input::write_output(outfile, &sealed).await?;
    if let Some(path) = outfile {
        formatter.success(&format!("Encrypted message written to {}", path.display()));
    }
    Ok(ExitCode::Success)
}

async fn decrypt(
    formatter: &OutputFormatter,
    secret: &str,
    sender: &str,
    input_path: Option<&Path>,
    outfile: Option<&Path>,
    max_bytes: u64,
) -> CommandResult {
    let recipient = input::load_identity(secret).await?;
    if !recipient.has_private() {
        return Err(IdentityError::MissingPrivate.into());
    }
    let sender = input::load_identity(sender).await?;
    let sealed = input::read_input(input_path, max_bytes).await?;

    formatter.progress(&format!("Decrypting {} bytes...", sealed.len()));
    let plaintext = Zeroizing::new(recipient.decrypt(&sender, &sealed)?);
    tracing::info!(
        sender = %sender.address(),
        recipient = %recipient.address(),
        bytes = plaintext.len(),
        "Decrypted message"
    );

    input::write_output(outfile, &plaintext).await?;
    if let Some(path) = outfile {
        formatter.success(&format!("Decrypted message written to {}", path.display()));
    }
    Ok(ExitCode::Success)
}

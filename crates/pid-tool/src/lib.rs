//! pid-tool - command-line front end for peer identities
//!
//! This crate provides a command-line interface for:
//! - Generating identities and writing secret files
//! - Validating identities and extracting their public part
//! - Signing and verifying files
//! - Encrypting and decrypting messages between two identities

pub mod cli;
pub mod config;
pub mod input;
pub mod keyfile;
pub mod output;

pub use cli::Cli;
pub use config::{CliOverrides, Config};
pub use output::{IdentityInfo, JsonResponse, OutputFormat, OutputFormatter};

/// Exit codes for CLI operations
///
/// - 0: Success
/// - 1: General error
/// - 2: Authentication failed - bad signature or undecryptable message
/// - 3: Invalid input - bad identity, bad encoding or unreadable file
/// - 4: Missing private key - the operation needs a secret identity
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum ExitCode {
    /// Operation completed successfully (exit code 0)
    Success = 0,
    /// General error (exit code 1)
    GeneralError = 1,
    /// Authentication failed (exit code 2)
    AuthenticationFailed = 2,
    /// Invalid input provided (exit code 3)
    InvalidInput = 3,
    /// Private key required (exit code 4)
    MissingPrivateKey = 4,
}

impl From<ExitCode> for i32 {
    fn from(code: ExitCode) -> Self {
        code as i32
    }
}

impl ExitCode {
    /// Convert to process exit code
    pub fn to_exit_code(self) -> std::process::ExitCode {
        std::process::ExitCode::from(self as u8)
    }

    pub fn name(&self) -> &'static str {
        match self {
            ExitCode::Success => "SUCCESS",
            ExitCode::GeneralError => "GENERAL_ERROR",
            ExitCode::AuthenticationFailed => "AUTH_FAILED",
            ExitCode::InvalidInput => "INVALID_INPUT",
            ExitCode::MissingPrivateKey => "MISSING_PRIVATE_KEY",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            ExitCode::Success => "Operation completed successfully",
            ExitCode::GeneralError => "An unspecified error occurred",
            ExitCode::AuthenticationFailed => "Signature or message authentication failed",
            ExitCode::InvalidInput => "Invalid arguments or data provided",
            ExitCode::MissingPrivateKey => "The identity has no private key",
        }
    }
}

#[cfg(test)]
mod exit_code_tests {
    use super::*;

    const ALL: [ExitCode; 5] = [
        ExitCode::Success,
        ExitCode::GeneralError,
        ExitCode::AuthenticationFailed,
        ExitCode::InvalidInput,
        ExitCode::MissingPrivateKey,
    ];

    #[test]
    fn test_exit_code_values() {
        assert_eq!(ExitCode::Success as i32, 0);
        assert_eq!(ExitCode::GeneralError as i32, 1);
        assert_eq!(ExitCode::AuthenticationFailed as i32, 2);
        assert_eq!(ExitCode::InvalidInput as i32, 3);
        assert_eq!(ExitCode::MissingPrivateKey as i32, 4);
    }

    #[test]
    fn test_exit_code_from_i32() {
        assert_eq!(i32::from(ExitCode::Success), 0);
        assert_eq!(i32::from(ExitCode::MissingPrivateKey), 4);
    }

    #[test]
    fn test_exit_code_names_unique() {
        let mut names: Vec<_> = ALL.iter().map(|c| c.name()).collect();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), ALL.len());
    }

    #[test]
    fn test_exit_code_descriptions() {
        for code in ALL {
            assert!(!code.description().is_empty());
            let _ = code.to_exit_code();
        }
    }
}

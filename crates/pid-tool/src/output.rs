//! Output formatting for CLI results
//!
//! Three formats are supported:
//! - Table: human-readable tables (default)
//! - JSON: structured JSON for scripting
//! - Quiet: data only, status through the exit code
//!
//! Command results go to stdout. Status lines go to stderr so that piped
//! payloads from `encrypt` and `decrypt` stay clean.

use std::str::FromStr;

use comfy_table::{presets::UTF8_FULL, Table};
use pid_crypto::Identity;
use serde::Serialize;

use crate::ExitCode;

/// Output format options
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable table format
    #[default]
    Table,
    /// JSON format for scripting
    Json,
    /// Minimal output
    Quiet,
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "table" => Ok(Self::Table),
            "json" => Ok(Self::Json),
            "quiet" => Ok(Self::Quiet),
            _ => Err(format!("Unknown output format: {s}")),
        }
    }
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Table => write!(f, "table"),
            Self::Json => write!(f, "json"),
            Self::Quiet => write!(f, "quiet"),
        }
    }
}

/// Standard JSON response wrapper
#[derive(Serialize)]
pub struct JsonResponse<T: Serialize> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// RFC 3339 timestamp
    pub timestamp: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,
}

impl<T: Serialize> JsonResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            timestamp: chrono::Utc::now().to_rfc3339(),
            command: None,
        }
    }

    pub fn success_with_command(data: T, command: &str) -> Self {
        Self {
            command: Some(command.to_string()),
            ..Self::success(data)
        }
    }
}

/// Public facts about an identity, safe to print
#[derive(Debug, Clone, Serialize)]
pub struct IdentityInfo {
    pub address: String,
    pub public: String,
    pub has_private: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub valid: Option<bool>,
}

impl IdentityInfo {
    pub fn new(identity: &Identity) -> Self {
        Self {
            address: identity.address().to_string(),
            public: identity.to_text(false).to_string(),
            has_private: identity.has_private(),
            valid: None,
        }
    }

    pub fn with_validity(mut self, valid: bool) -> Self {
        self.valid = Some(valid);
        self
    }
}

#[derive(Serialize)]
struct SignatureOutput<'a> {
    address: &'a str,
    signature: &'a str,
}

#[derive(Serialize)]
struct VerifyOutput<'a> {
    address: &'a str,
    valid: bool,
}

#[derive(Serialize)]
struct SecretOutput<'a> {
    address: &'a str,
    public: &'a str,
    secret: &'a str,
}

/// Formats output for different modes
pub struct OutputFormatter {
    format: OutputFormat,
    verbose: bool,
}

impl OutputFormatter {
    pub fn new(format: OutputFormat, verbose: bool) -> Self {
        Self { format, verbose }
    }

    pub fn format(&self) -> OutputFormat {
        self.format
    }

    /// Identity summary for `validate`
    pub fn format_identity(&self, info: &IdentityInfo) -> String {
        match self.format {
            OutputFormat::Table => identity_table(info),
            OutputFormat::Json => to_json_response(info, "validate"),
            OutputFormat::Quiet => String::new(),
        }
    }

    /// Public text for `getpublic`. Quiet mode still prints the text.
    pub fn format_public(&self, info: &IdentityInfo) -> String {
        match self.format {
            OutputFormat::Json => to_json_response(info, "getpublic"),
            OutputFormat::Table | OutputFormat::Quiet => info.public.clone(),
        }
    }

    /// Secret text for `generate` writing to stdout
    pub fn format_secret(&self, identity: &Identity, secret: &str) -> String {
        match self.format {
            OutputFormat::Json => {
                let address = identity.address().to_string();
                let public = identity.to_text(false);
                to_json_response(
                    &SecretOutput {
                        address: &address,
                        public: &public,
                        secret,
                    },
                    "generate",
                )
            }
            OutputFormat::Table | OutputFormat::Quiet => secret.to_string(),
        }
    }

    /// Base64 signature for `sign`. Quiet mode still prints the signature.
    pub fn format_signature(&self, address: &str, signature: &str) -> String {
        match self.format {
            OutputFormat::Json => to_json_response(&SignatureOutput { address, signature }, "sign"),
            OutputFormat::Table | OutputFormat::Quiet => signature.to_string(),
        }
    }

    /// Result of `verify`
    pub fn format_verification(&self, address: &str, valid: bool) -> String {
        match self.format {
            OutputFormat::Table => {
                if valid {
                    format!("Signature by {address} is valid")
                } else {
                    format!("Signature check against {address} FAILED")
                }
            }
            OutputFormat::Json => to_json_response(&VerifyOutput { address, valid }, "verify"),
            OutputFormat::Quiet => String::new(),
        }
    }

    /// Error with exit code context
    pub fn format_error_with_code(&self, error: &str, code: ExitCode) -> String {
        match self.format {
            OutputFormat::Table => format!("Error: {error}"),
            OutputFormat::Json => {
                let output = serde_json::json!({
                    "success": false,
                    "error": error,
                    "timestamp": chrono::Utc::now().to_rfc3339(),
                    "exit_code": code as i32,
                    "exit_code_name": code.name(),
                });
                to_json(&output)
            }
            OutputFormat::Quiet => String::new(),
        }
    }

    /// Progress message (verbose table mode only)
    pub fn progress(&self, message: &str) {
        if self.verbose && self.format == OutputFormat::Table {
            eprintln!("... {message}");
        }
    }

    pub fn success(&self, message: &str) {
        if self.format == OutputFormat::Table {
            eprintln!("✓ {message}");
        }
    }

    /// Report a failed command on stderr
    pub fn error(&self, message: &str, code: ExitCode) {
        let output = self.format_error_with_code(message, code);
        if !output.is_empty() {
            eprintln!("{output}");
        }
    }
}

fn to_json<T: Serialize>(value: &T) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|e| format!("{{\"error\": \"{e}\"}}"))
}

fn to_json_response<T: Serialize>(value: &T, command: &str) -> String {
    to_json(&JsonResponse::success_with_command(value, command))
}

fn identity_table(info: &IdentityInfo) -> String {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_header(vec!["Property", "Value"]);
    table.add_row(vec!["Address", info.address.as_str()]);
    table.add_row(vec!["Key Type", "c25519"]);
    table.add_row(vec!["Private Key", if info.has_private { "present" } else { "absent" }]);
    if let Some(valid) = info.valid {
        table.add_row(vec!["Valid", if valid { "yes" } else { "NO" }]);
    }
    table.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_output_format_parsing() {
        assert_eq!(OutputFormat::from_str("table").unwrap(), OutputFormat::Table);
        assert_eq!(OutputFormat::from_str("json").unwrap(), OutputFormat::Json);
        assert_eq!(OutputFormat::from_str("quiet").unwrap(), OutputFormat::Quiet);
        assert_eq!(OutputFormat::from_str("JSON").unwrap(), OutputFormat::Json);
        assert!(OutputFormat::from_str("invalid").is_err());
    }

    #[test]
    fn test_output_format_display() {
        assert_eq!(OutputFormat::Table.to_string(), "table");
        assert_eq!(OutputFormat::Json.to_string(), "json");
        assert_eq!(OutputFormat::Quiet.to_string(), "quiet");
    }

    #[test]
    fn test_identity_info_never_contains_secret() {
        let id = Identity::generate().unwrap();
        let secret = id.to_text(true);
        let info = IdentityInfo::new(&id).with_validity(true);
        assert!(info.has_private);

        for format in [OutputFormat::Table, OutputFormat::Json] {
            let formatter = OutputFormatter::new(format, false);
            let rendered = formatter.format_identity(&info);
            assert!(rendered.contains(&id.address().to_string()));
            assert!(!rendered.contains(secret.as_str()));
        }
    }

    #[test]
    fn test_format_public_json() {
        let id = Identity::generate().unwrap();
        let formatter = OutputFormatter::new(OutputFormat::Json, false);
        let output = formatter.format_public(&IdentityInfo::new(&id));

        let value: serde_json::Value = serde_json::from_str(&output).unwrap();
        assert_eq!(value["success"], true);
        assert_eq!(value["command"], "getpublic");
        assert_eq!(value["data"]["public"], id.to_text(false).as_str());
        assert!(value["data"].get("valid").is_none());
    }

    #[test]
    fn test_quiet_mode_keeps_data() {
        let formatter = OutputFormatter::new(OutputFormat::Quiet, false);
        assert_eq!(formatter.format(), OutputFormat::Quiet);
        assert_eq!(formatter.format_error_with_code("bad", ExitCode::InvalidInput), "");
        assert_eq!(formatter.format_signature("0123456789", "c2ln"), "c2ln");
        assert_eq!(formatter.format_verification("0123456789", true), "");
    }

    #[test]
    fn test_format_error_with_code_json() {
        let formatter = OutputFormatter::new(OutputFormat::Json, false);
        let output = formatter.format_error_with_code("bad", ExitCode::InvalidInput);
        let value: serde_json::Value = serde_json::from_str(&output).unwrap();
        assert_eq!(value["exit_code"], 3);
        assert_eq!(value["exit_code_name"], "INVALID_INPUT");
    }
}

//! Exit codes of the config extraction script.
//!
//! The numbering is a contract with the script and must not change. New
//! outcomes are appended.

use serde_json::{Map, Value};

/// Outcome of one extraction run, as reported by the script's exit code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigExitCode {
    Success = 0,
    UnhandledError = 1,
    ImportError = 2,
    NoConfig = 3,
    InvalidExport = 4,
    RuntimeError = 5,
    SerializationError = 6,
    InvalidDefaultExport = 7,
}

impl ConfigExitCode {
    /// All codes in numeric order.
    pub const ALL: [ConfigExitCode; 8] = [
        ConfigExitCode::Success,
        ConfigExitCode::UnhandledError,
        ConfigExitCode::ImportError,
        ConfigExitCode::NoConfig,
        ConfigExitCode::InvalidExport,
        ConfigExitCode::RuntimeError,
        ConfigExitCode::SerializationError,
        ConfigExitCode::InvalidDefaultExport,
    ];

    /// Maps a process exit code to a protocol outcome.
    pub fn from_code(code: i32) -> Option<Self> {
        Self::ALL.iter().copied().find(|c| c.code() == code)
    }

    /// Returns the numeric exit code.
    pub fn code(self) -> i32 {
        self as i32
    }

    /// Returns the name the script uses for this code.
    pub fn name(self) -> &'static str {
        match self {
            ConfigExitCode::Success => "Success",
            ConfigExitCode::UnhandledError => "UnhandledError",
            ConfigExitCode::ImportError => "ImportError",
            ConfigExitCode::NoConfig => "NoConfig",
            ConfigExitCode::InvalidExport => "InvalidExport",
            ConfigExitCode::RuntimeError => "RuntimeError",
            ConfigExitCode::SerializationError => "SerializationError",
            ConfigExitCode::InvalidDefaultExport => "InvalidDefaultExport",
        }
    }

    /// The name-to-code table passed to the script as an argument.
    pub fn protocol_json() -> String {
        let table: Map<String, Value> = Self::ALL
            .iter()
            .map(|c| (c.name().to_string(), Value::from(c.code())))
            .collect();
        Value::Object(table).to_string()
    }
}

//! Error type shared by the library and the `dmx` binary.
//!
//! Every variant carries a human-readable message. The binary maps variants to
//! process exit codes via [`DmxError::exit_code`]:
//!
//! - `2`: unreadable or malformed input (files, CSV rows, JSON)
//! - `3`: nothing to work on (no DMX parameters, invalid settings)
//! - `4`: internal consistency failures

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum DmxError {
    /// The caller asked for something the inputs cannot support.
    #[error("{0}")]
    Configuration(String),

    /// Counts or names that must agree did not.
    #[error("{0}")]
    Consistency(String),

    /// A parameter name did not follow any known `<prefix><index>` pattern.
    #[error("Unrecognized prefix name pattern '{0}'.")]
    Prefix(String),

    #[error("{0}")]
    Io(String),

    #[error("{0}")]
    Parse(String),
}

impl DmxError {
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }

    pub fn consistency(message: impl Into<String>) -> Self {
        Self::Consistency(message.into())
    }

    pub fn io(message: impl Into<String>) -> Self {
        Self::Io(message.into())
    }

    pub fn parse(message: impl Into<String>) -> Self {
        Self::Parse(message.into())
    }

    pub fn exit_code(&self) -> u8 {
        match self {
            DmxError::Io(_) | DmxError::Parse(_) => 2,
            DmxError::Configuration(_) => 3,
            DmxError::Consistency(_) | DmxError::Prefix(_) => 4,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_codes_follow_error_class() {
        assert_eq!(DmxError::io("x").exit_code(), 2);
        assert_eq!(DmxError::configuration("x").exit_code(), 3);
        assert_eq!(DmxError::consistency("x").exit_code(), 4);
        assert_eq!(DmxError::Prefix("PEPOCH".into()).exit_code(), 4);
    }

    #[test]
    fn prefix_error_names_the_parameter() {
        let err = DmxError::Prefix("PEPOCH".to_string());
        assert_eq!(err.to_string(), "Unrecognized prefix name pattern 'PEPOCH'.");
    }
}

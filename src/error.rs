/*!
 * Error types for Skinguard
 */

use skinguard_host::HostError;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, GuardError>;

#[derive(Error, Debug)]
pub enum GuardError {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Ledger file could not be read or written
    #[error("Ledger I/O failed for {}: {source}", path.display())]
    Ledger {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Failed to parse configuration: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("Failed to serialize configuration: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    /// Error reported by the game host
    #[error("Host error: {0}")]
    Host(#[from] HostError),
}

impl GuardError {
    /// Check if this error is likely to go away on its own
    ///
    /// Host errors (disconnects, lookup hiccups) and ledger writes are retried
    /// on the next tick or debounce cycle; configuration errors are not.
    pub fn is_transient(&self) -> bool {
        match self {
            GuardError::Host(_) => true,
            GuardError::Ledger { .. } => true,
            GuardError::Io(io_err) => Self::is_io_transient(io_err),
            GuardError::Config(_) | GuardError::TomlParse(_) | GuardError::TomlSerialize(_) => {
                false
            }
        }
    }

    fn is_io_transient(io_err: &io::Error) -> bool {
        use io::ErrorKind::*;
        matches!(
            io_err.kind(),
            Interrupted | WouldBlock | TimedOut
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ledger_error_display() {
        let err = GuardError::Ledger {
            path: PathBuf::from("/data/first_join_players.txt"),
            source: io::Error::new(io::ErrorKind::PermissionDenied, "denied"),
        };
        assert_eq!(
            err.to_string(),
            "Ledger I/O failed for /data/first_join_players.txt: denied"
        );
        assert!(err.is_transient());
    }

    #[test]
    fn test_host_errors_are_transient() {
        let err: GuardError = HostError::Disconnected(7).into();
        assert!(err.is_transient());
        assert!(err.to_string().contains("Entity 7"));
    }

    #[test]
    fn test_config_errors_are_not_transient() {
        assert!(!GuardError::Config("bad".to_string()).is_transient());

        let parse = toml::from_str::<toml::Value>("= nope").unwrap_err();
        assert!(!GuardError::from(parse).is_transient());
    }

    #[test]
    fn test_io_transience() {
        let timed_out = GuardError::Io(io::Error::new(io::ErrorKind::TimedOut, "slow"));
        assert!(timed_out.is_transient());

        let missing = GuardError::Io(io::Error::new(io::ErrorKind::NotFound, "gone"));
        assert!(!missing.is_transient());
    }
}

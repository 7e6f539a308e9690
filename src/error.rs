/*
 * error.rs
 *
 * Configuration errors are fatal at startup (exit 1, diagnostic to stderr).
 * Everything else the supervisor encounters once it's running is recoverable:
 * log it and keep looping. See spec §7 for the taxonomy this mirrors.
 */

use std::fmt;

/// Everything that can go wrong while parsing flags or setting up the supervisor.
///
/// These are the only errors that ever reach `main` and cause a non-zero exit.
/// Runtime faults (a bad `read()`, a stray reap) are logged from inside the
/// loop and never become a `SupervisorError`; see `src/supervisor.rs`.
#[derive(Debug)]
pub enum SupervisorError {
    /// Bad flag, bad interval suffix, or missing command.
    InvalidArgument(String),
    /// `pipe()`, `fork()`, daemonization, or syslog setup failed.
    Setup(String),
}

impl fmt::Display for SupervisorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidArgument(s) => write!(f, "{s}"),
            Self::Setup(s) => write!(f, "{s}"),
        }
    }
}

impl std::error::Error for SupervisorError {}

impl SupervisorError {
    /// Exit code per spec §6: 1 on any startup failure, 0 otherwise (the
    /// supervisor never fails after it starts supervising).
    #[must_use]
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::InvalidArgument(_) | Self::Setup(_) => 1,
        }
    }
}

pub type Result<T> = std::result::Result<T, SupervisorError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_code_is_always_one() {
        assert_eq!(
            SupervisorError::InvalidArgument("x".into()).exit_code(),
            1
        );
        assert_eq!(SupervisorError::Setup("x".into()).exit_code(), 1);
    }

    #[test]
    fn display_passes_through_message() {
        let e = SupervisorError::InvalidArgument("missing command".into());
        assert_eq!(e.to_string(), "missing command");
    }
}

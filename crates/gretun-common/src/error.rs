//! Error types for gretun operations.
//!
//! Protocol outcomes on the coordinator (conflict, exhaustion, ...) live in
//! `gretun-server`; this module covers everything that can go wrong while
//! talking to the host or to the other side of the tunnel.

use std::io;
use thiserror::Error;

/// Result type alias for gretun operations.
pub type GretunResult<T> = Result<T, GretunError>;

/// Errors that can occur while provisioning tunnels or driving the
/// control plane.
#[derive(Debug, Error)]
pub enum GretunError {
    /// Failed to execute a shell command (spawn error).
    #[error("Failed to execute shell command '{command}': {source}")]
    ShellExec {
        /// The command that failed to execute.
        command: String,
        /// The underlying IO error.
        #[source]
        source: io::Error,
    },

    /// Shell command returned non-zero exit code.
    #[error("Shell command failed: '{command}' (exit code {exit_code}): {output}")]
    ShellCommandFailed {
        /// The command that failed.
        command: String,
        /// The exit code.
        exit_code: i32,
        /// Combined stdout/stderr output.
        output: String,
    },

    /// Bad or missing input (CLI argument, unparseable address).
    #[error("Invalid {field}: {message}")]
    Validation {
        /// The field that failed validation.
        field: String,
        /// Error message.
        message: String,
    },

    /// Configuration file could not be loaded or is inconsistent.
    #[error("Configuration error: {message}")]
    Config {
        /// Error message.
        message: String,
    },

    /// No usable local address could be determined.
    #[error("Cannot determine local address: {message}")]
    Discovery {
        /// Error message.
        message: String,
    },

    /// A control-plane request could not be completed.
    #[error("Control plane request to {endpoint} failed: {message}")]
    Transport {
        /// The endpoint that was contacted.
        endpoint: String,
        /// Error message.
        message: String,
    },

    /// The coordinator answered, but not with the expected outcome.
    #[error("Coordinator refused to {intent} (status {status}): {message}")]
    Refused {
        /// The intent that was refused ("register", "unregister").
        intent: String,
        /// The status code returned.
        status: u16,
        /// The response body.
        message: String,
    },

    /// A tunnel interface could not be created or destroyed.
    #[error("Provisioning of {interface} failed: {message}")]
    Provisioning {
        /// The interface name (e.g. "gre1").
        interface: String,
        /// Error message.
        message: String,
    },
}

impl GretunError {
    /// Creates a validation error.
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Creates a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Creates a discovery error.
    pub fn discovery(message: impl Into<String>) -> Self {
        Self::Discovery {
            message: message.into(),
        }
    }

    /// Creates a transport error.
    pub fn transport(endpoint: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Transport {
            endpoint: endpoint.into(),
            message: message.into(),
        }
    }

    /// Creates a refusal error.
    pub fn refused(intent: impl Into<String>, status: u16, message: impl Into<String>) -> Self {
        Self::Refused {
            intent: intent.into(),
            status,
            message: message.into(),
        }
    }

    /// Creates a provisioning error.
    pub fn provisioning(interface: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Provisioning {
            interface: interface.into(),
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = GretunError::validation("action", "expected reg, unreg or destroy");
        assert_eq!(
            err.to_string(),
            "Invalid action: expected reg, unreg or destroy"
        );
    }

    #[test]
    fn test_transport_error() {
        let err = GretunError::transport("http://10.5.0.18:8080/reg", "connection refused");
        assert_eq!(
            err.to_string(),
            "Control plane request to http://10.5.0.18:8080/reg failed: connection refused"
        );
    }

    #[test]
    fn test_refused_error() {
        let err = GretunError::refused("register", 503, "No IP addresses left, sorry!");
        assert_eq!(
            err.to_string(),
            "Coordinator refused to register (status 503): No IP addresses left, sorry!"
        );
    }

    #[test]
    fn test_shell_command_failed() {
        let err = GretunError::ShellCommandFailed {
            command: "ip tunnel del gre1".to_string(),
            exit_code: 1,
            output: "Cannot find device".to_string(),
        };
        assert!(err.to_string().contains("ip tunnel del"));
        assert!(err.to_string().contains("exit code 1"));
    }
}

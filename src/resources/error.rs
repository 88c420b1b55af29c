//! Typed error variants for resource operations.
//!
//! These are component-local: the engine records them against the component
//! being processed and moves on to the next one.

use thiserror::Error;

/// Errors that arise from resource checks and apply operations.
#[derive(Error, Debug)]
pub enum ResourceError {
    /// The bundled source file for a deployment does not exist.
    #[error("payload missing: {path}")]
    MissingPayload {
        /// Absolute path of the expected payload file.
        path: String,
    },

    /// An external command exited non-zero.
    #[error("'{command}' failed (exit {exit_code}); re-run manually: {command}")]
    ExternalCommand {
        /// The full command line, as the operator would type it.
        command: String,
        /// Exit code returned by the process (`-1` when killed by a signal).
        exit_code: i32,
    },

    /// A required program or file was not found.
    #[error("resource not found: {resource}")]
    NotFound {
        /// Description of the missing resource.
        resource: String,
    },

    /// A resource exists but is in a state the engine will not touch.
    #[error("invalid state for '{resource}': {reason}")]
    InvalidState {
        /// Name or description of the resource in the invalid state.
        resource: String,
        /// Human-readable explanation of why the state is invalid.
        reason: String,
    },

    /// The requested operation is not supported for this resource type.
    #[error("operation '{operation}' is not supported for resource '{resource}'")]
    UnsupportedOperation {
        /// Name of the unsupported operation (e.g. `"remove"`).
        operation: String,
        /// Name or description of the resource.
        resource: String,
    },
}

impl ResourceError {
    /// Build an [`ExternalCommand`](Self::ExternalCommand) error from a program
    /// and its arguments.
    #[must_use]
    pub fn external(program: &str, args: &[&str], code: Option<i32>) -> Self {
        let mut command = program.to_string();
        for arg in args {
            command.push(' ');
            command.push_str(arg);
        }
        Self::ExternalCommand {
            command,
            exit_code: code.unwrap_or(-1),
        }
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn missing_payload_display() {
        let e = ResourceError::MissingPayload {
            path: "/opt/cybex/payload/cfg.txt".to_string(),
        };
        assert_eq!(e.to_string(), "payload missing: /opt/cybex/payload/cfg.txt");
    }

    #[test]
    fn external_command_names_manual_rerun() {
        let e = ResourceError::external("sudo", &["pacman", "-S", "fish"], Some(1));
        let msg = e.to_string();
        assert!(msg.contains("exit 1"));
        assert!(msg.contains("re-run manually: sudo pacman -S fish"));
    }

    #[test]
    fn external_command_without_code_uses_minus_one() {
        let e = ResourceError::external("waybar", &[], None);
        assert!(e.to_string().contains("exit -1"));
    }

    #[test]
    fn invalid_state_display() {
        let e = ResourceError::InvalidState {
            resource: "~/.config/fish".to_string(),
            reason: "destination is a directory".to_string(),
        };
        assert!(e.to_string().contains("~/.config/fish"));
        assert!(e.to_string().contains("destination is a directory"));
    }

    #[test]
    fn unsupported_operation_display() {
        let e = ResourceError::UnsupportedOperation {
            operation: "remove".to_string(),
            resource: "restart waybar".to_string(),
        };
        assert!(e.to_string().contains("remove"));
        assert!(e.to_string().contains("restart waybar"));
    }

    #[test]
    fn resource_error_converts_to_anyhow() {
        let e = ResourceError::NotFound {
            resource: "pgrep".to_string(),
        };
        let err: anyhow::Error = e.into();
        assert!(err.downcast_ref::<ResourceError>().is_some());
    }

    fn assert_send_sync<T: Send + Sync>() {}

    #[test]
    fn resource_error_is_send_sync() {
        assert_send_sync::<ResourceError>();
    }
}

use std::fmt;

/// Where a remote failure originated.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FailureCause {
    /// The backend ran (or refused to run) the function and reported an error.
    Backend,
    /// The native communication layer could not reach the backend.
    Transport,
}

impl fmt::Display for FailureCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Backend => f.write_str("backend"),
            Self::Transport => f.write_str("transport"),
        }
    }
}

/// Typed error hierarchy for session and dispatch operations.
#[derive(Clone, Debug, PartialEq, thiserror::Error)]
pub enum ClientError {
    #[error("session accessed before init")]
    UninitializedSession,
    #[error("failed to open session to {address}: {message}")]
    SessionOpen { address: String, message: String },

    // Local, never reaches the native layer
    #[error("cannot encode argument `{key}`: {reason}")]
    ArgumentEncoding { key: String, reason: String },
    #[error("cannot decode argument `{key}`: {reason}")]
    ArgumentDecoding { key: String, reason: String },

    // Surfaced from the native layer or backend
    #[error("{cause} error: {message}")]
    RemoteInvocation {
        message: String,
        payload: Option<String>,
        cause: FailureCause,
    },
}

impl ClientError {
    pub fn backend(message: impl Into<String>, payload: Option<String>) -> Self {
        Self::RemoteInvocation {
            message: message.into(),
            payload,
            cause: FailureCause::Backend,
        }
    }

    pub fn transport(message: impl Into<String>) -> Self {
        Self::RemoteInvocation {
            message: message.into(),
            payload: None,
            cause: FailureCause::Transport,
        }
    }

    /// True when the failure came from connectivity rather than the backend.
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            Self::RemoteInvocation {
                cause: FailureCause::Transport,
                ..
            } | Self::SessionOpen { .. }
        )
    }

    /// True when the call was rejected before crossing into the native layer.
    pub fn is_local(&self) -> bool {
        matches!(
            self,
            Self::UninitializedSession | Self::ArgumentEncoding { .. } | Self::ArgumentDecoding { .. }
        )
    }

    /// Application payload attached by the backend, if any.
    pub fn payload(&self) -> Option<&str> {
        match self {
            Self::RemoteInvocation { payload, .. } => payload.as_deref(),
            _ => None,
        }
    }

    /// Short classification string for logging.
    pub fn error_kind(&self) -> &'static str {
        match self {
            Self::UninitializedSession => "uninitialized_session",
            Self::SessionOpen { .. } => "session_open",
            Self::ArgumentEncoding { .. } => "argument_encoding",
            Self::ArgumentDecoding { .. } => "argument_decoding",
            Self::RemoteInvocation {
                cause: FailureCause::Backend,
                ..
            } => "remote_invocation",
            Self::RemoteInvocation {
                cause: FailureCause::Transport,
                ..
            } => "native_transport",
        }
    }
}

/// An error pushed on a live subscription. Non-terminal: the subscription
/// may resume delivering updates afterwards.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("{cause} push error: {message}")]
pub struct PushError {
    pub message: String,
    pub payload: Option<String>,
    pub cause: FailureCause,
}

impl PushError {
    pub fn backend(message: impl Into<String>, payload: Option<String>) -> Self {
        Self {
            message: message.into(),
            payload,
            cause: FailureCause::Backend,
        }
    }

    pub fn transport(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            payload: None,
            cause: FailureCause::Transport,
        }
    }

    pub fn is_transport(&self) -> bool {
        self.cause == FailureCause::Transport
    }
}

pub type Result<T> = std::result::Result<T, ClientError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transport_classification() {
        assert!(ClientError::transport("socket closed").is_transport());
        assert!(ClientError::SessionOpen {
            address: "https://x".into(),
            message: "dns".into()
        }
        .is_transport());
        assert!(!ClientError::backend("boom", None).is_transport());
        assert!(!ClientError::UninitializedSession.is_transport());
    }

    #[test]
    fn local_classification() {
        assert!(ClientError::UninitializedSession.is_local());
        assert!(ClientError::ArgumentEncoding {
            key: "x".into(),
            reason: "nan".into()
        }
        .is_local());
        assert!(!ClientError::backend("boom", None).is_local());
    }

    #[test]
    fn payload_only_on_remote() {
        let err = ClientError::backend("validation", Some(r#"{"field":"limit"}"#.into()));
        assert_eq!(err.payload(), Some(r#"{"field":"limit"}"#));
        assert_eq!(ClientError::UninitializedSession.payload(), None);
    }

    #[test]
    fn error_kind_strings() {
        assert_eq!(ClientError::UninitializedSession.error_kind(), "uninitialized_session");
        assert_eq!(ClientError::backend("x", None).error_kind(), "remote_invocation");
        assert_eq!(ClientError::transport("x").error_kind(), "native_transport");
    }

    #[test]
    fn encoding_error_names_key() {
        let err = ClientError::ArgumentEncoding {
            key: "ratio".into(),
            reason: "non-finite number".into(),
        };
        assert_eq!(err.to_string(), "cannot encode argument `ratio`: non-finite number");
    }

    #[test]
    fn push_error_display() {
        let err = PushError::backend("query failed", None);
        assert_eq!(err.to_string(), "backend push error: query failed");
        assert!(!err.is_transport());
        assert!(PushError::transport("offline").is_transport());
    }
}

//! Boundary to the native communication layer.
//!
//! The native layer owns sockets, framing and reconnection. This crate only
//! needs the five primitives below; everything else stays on the other side.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::errors::{ClientError, PushError};
use crate::ids::NativeToken;
use crate::marshal::WireArgs;
use crate::security::Credential;

/// Backend execution semantics of a one-shot call.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FunctionKind {
    /// Read-only.
    Query,
    /// Transactional write.
    Mutation,
    /// May have external side effects.
    Action,
}

impl fmt::Display for FunctionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Query => f.write_str("query"),
            Self::Mutation => f.write_str("mutation"),
            Self::Action => f.write_str("action"),
        }
    }
}

/// Outcome of a remote function as reported by the native layer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FunctionResult {
    /// Serialized return value.
    Value(String),
    /// The function failed with a plain server-side message.
    ErrorMessage(String),
    /// The function raised an application error carrying serialized data.
    ApplicationError { message: String, data: String },
}

impl FunctionResult {
    pub fn into_result(self) -> Result<String, ClientError> {
        match self {
            Self::Value(v) => Ok(v),
            Self::ErrorMessage(message) => Err(ClientError::backend(message, None)),
            Self::ApplicationError { message, data } => Err(ClientError::backend(message, Some(data))),
        }
    }

    pub fn into_push(self) -> Result<String, PushError> {
        match self {
            Self::Value(v) => Ok(v),
            Self::ErrorMessage(message) => Err(PushError::backend(message, None)),
            Self::ApplicationError { message, data } => Err(PushError::backend(message, Some(data))),
        }
    }
}

/// Failure of a native primitive itself (as opposed to a failed function).
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum NativeError {
    #[error("transport: {0}")]
    Transport(String),
    #[error("rejected: {message}")]
    Rejected {
        message: String,
        payload: Option<String>,
    },
}

impl From<NativeError> for ClientError {
    fn from(err: NativeError) -> Self {
        match err {
            NativeError::Transport(message) => ClientError::transport(message),
            NativeError::Rejected { message, payload } => ClientError::backend(message, payload),
        }
    }
}

impl From<NativeError> for PushError {
    fn from(err: NativeError) -> Self {
        match err {
            NativeError::Transport(message) => PushError::transport(message),
            NativeError::Rejected { message, payload } => PushError::backend(message, payload),
        }
    }
}

/// One item pushed by the native layer on a subscription channel.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Push {
    Result(FunctionResult),
    /// Connectivity problem reported on the channel; non-terminal.
    Transport(String),
}

/// Handed to the native layer on `open_subscription`. Dropping every clone
/// tells the core that the native layer terminated the channel.
#[derive(Clone, Debug)]
pub struct PushSink {
    tx: mpsc::UnboundedSender<Push>,
}

impl PushSink {
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<Push>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    /// Returns false once the core side is gone.
    pub fn push(&self, push: Push) -> bool {
        self.tx.send(push).is_ok()
    }

    pub fn update(&self, value: impl Into<String>) -> bool {
        self.push(Push::Result(FunctionResult::Value(value.into())))
    }

    pub fn error(&self, message: impl Into<String>, data: Option<String>) -> bool {
        let result = match data {
            Some(data) => FunctionResult::ApplicationError {
                message: message.into(),
                data,
            },
            None => FunctionResult::ErrorMessage(message.into()),
        };
        self.push(Push::Result(result))
    }

    pub fn transport_error(&self, message: impl Into<String>) -> bool {
        self.push(Push::Transport(message.into()))
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// Entry point of the native layer.
#[async_trait]
pub trait NativeLayer: Send + Sync {
    /// Open a session. The core does not validate address syntax.
    async fn open_session(&self, address: &str, client_id: &str) -> Result<Arc<dyn NativeSession>, NativeError>;
}

/// An open native session.
#[async_trait]
pub trait NativeSession: Send + Sync {
    async fn invoke(&self, kind: FunctionKind, name: &str, args: WireArgs) -> Result<FunctionResult, NativeError>;

    /// Register a subscription. The native layer pushes at least the current
    /// value once registration succeeds, then one push per result change.
    async fn open_subscription(&self, name: &str, args: WireArgs, sink: PushSink) -> Result<NativeToken, NativeError>;

    async fn close_subscription(&self, token: &NativeToken);

    /// `None` clears any previously set credential.
    async fn set_credential(&self, credential: Option<Credential>);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::FailureCause;

    #[test]
    fn value_result_passes_through() {
        assert_eq!(FunctionResult::Value("[]".into()).into_result().unwrap(), "[]");
    }

    #[test]
    fn error_message_has_no_payload() {
        let err = FunctionResult::ErrorMessage("unknown function".into())
            .into_result()
            .unwrap_err();
        assert_eq!(err, ClientError::backend("unknown function", None));
    }

    #[test]
    fn application_error_keeps_data() {
        let push = FunctionResult::ApplicationError {
            message: "limit too large".into(),
            data: r#"{"max":100}"#.into(),
        }
        .into_push()
        .unwrap_err();
        assert_eq!(push.payload.as_deref(), Some(r#"{"max":100}"#));
        assert_eq!(push.cause, FailureCause::Backend);
    }

    #[test]
    fn native_transport_maps_to_transport_cause() {
        let err: ClientError = NativeError::Transport("connection reset".into()).into();
        assert!(err.is_transport());
        let push: PushError = NativeError::Transport("connection reset".into()).into();
        assert!(push.is_transport());
    }

    #[tokio::test]
    async fn sink_reports_closed_receiver() {
        let (sink, mut rx) = PushSink::channel();
        assert!(sink.update("1"));
        assert!(sink.error("bad", Some("{}".into())));
        assert_eq!(rx.recv().await, Some(Push::Result(FunctionResult::Value("1".into()))));
        assert!(matches!(
            rx.recv().await,
            Some(Push::Result(FunctionResult::ApplicationError { .. }))
        ));
        drop(rx);
        assert!(sink.is_closed());
        assert!(!sink.update("2"));
    }

    #[test]
    fn kind_display() {
        assert_eq!(FunctionKind::Query.to_string(), "query");
        assert_eq!(FunctionKind::Mutation.to_string(), "mutation");
        assert_eq!(FunctionKind::Action.to_string(), "action");
    }
}

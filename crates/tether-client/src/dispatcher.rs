use std::sync::Arc;

use tether_core::{marshal, Args, FunctionKind, NativeSession, Result};
use tracing::{debug, instrument};

/// Forwards one-shot calls to the native session.
///
/// Stateless apart from the session reference, so clones may be used from
/// any number of tasks at once. Each call is attempted exactly once.
#[derive(Clone)]
pub struct Dispatcher {
    native: Arc<dyn NativeSession>,
}

impl Dispatcher {
    pub fn new(native: Arc<dyn NativeSession>) -> Self {
        Self { native }
    }

    pub async fn query(&self, name: &str, args: &Args) -> Result<String> {
        self.invoke(FunctionKind::Query, name, args).await
    }

    pub async fn mutation(&self, name: &str, args: &Args) -> Result<String> {
        self.invoke(FunctionKind::Mutation, name, args).await
    }

    pub async fn action(&self, name: &str, args: &Args) -> Result<String> {
        self.invoke(FunctionKind::Action, name, args).await
    }

    /// Marshal `args`, invoke `name`, and return the raw serialized result.
    #[instrument(skip_all, fields(kind = %kind, function = %name))]
    pub async fn invoke(&self, kind: FunctionKind, name: &str, args: &Args) -> Result<String> {
        let wire = marshal(args)?;
        debug!(arg_count = wire.len(), "dispatching");
        let result = self.native.invoke(kind, name, wire).await?.into_result();
        match &result {
            Ok(value) => debug!(result_len = value.len(), "call succeeded"),
            Err(e) => debug!(error_kind = e.error_kind(), error = %e, "call failed"),
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockSession;
    use tether_core::{ClientError, FunctionResult, NativeError, Value};

    fn limit_args() -> Args {
        Args::from([("limit".to_string(), Value::Int(10))])
    }

    #[tokio::test]
    async fn query_marshals_and_returns_raw_result() {
        let native = Arc::new(MockSession::new());
        native.respond(Ok(FunctionResult::Value("[]".into())));
        let dispatcher = Dispatcher::new(native.clone());

        let result = dispatcher.query("messages:list", &limit_args()).await.unwrap();

        assert_eq!(result, "[]");
        let calls = native.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].kind, FunctionKind::Query);
        assert_eq!(calls[0].name, "messages:list");
        assert_eq!(calls[0].args.get("limit").map(String::as_str), Some("10"));
    }

    #[tokio::test]
    async fn each_entry_point_uses_its_kind() {
        let native = Arc::new(MockSession::new());
        let dispatcher = Dispatcher::new(native.clone());

        dispatcher.mutation("messages:send", &Args::new()).await.unwrap();
        dispatcher.action("ai:summarize", &Args::new()).await.unwrap();

        let kinds: Vec<_> = native.calls().iter().map(|c| c.kind).collect();
        assert_eq!(kinds, vec![FunctionKind::Mutation, FunctionKind::Action]);
    }

    #[tokio::test]
    async fn application_error_carries_payload() {
        let native = Arc::new(MockSession::new());
        native.respond(Ok(FunctionResult::ApplicationError {
            message: "body too long".into(),
            data: r#"{"max":280}"#.into(),
        }));
        let dispatcher = Dispatcher::new(native);

        let err = dispatcher.mutation("messages:send", &Args::new()).await.unwrap_err();
        assert_eq!(err, ClientError::backend("body too long", Some(r#"{"max":280}"#.into())));
    }

    #[tokio::test]
    async fn transport_failure_is_marked() {
        let native = Arc::new(MockSession::new());
        native.respond(Err(NativeError::Transport("connection reset".into())));
        let dispatcher = Dispatcher::new(native.clone());

        let err = dispatcher.query("messages:list", &Args::new()).await.unwrap_err();
        assert!(err.is_transport());
        assert_eq!(native.calls().len(), 1, "no automatic retry");
    }

    #[tokio::test]
    async fn encoding_failure_never_reaches_native() {
        let native = Arc::new(MockSession::new());
        let dispatcher = Dispatcher::new(native.clone());
        let args = Args::from([("ratio".to_string(), Value::Float(f64::NAN))]);

        let err = dispatcher.query("stats:get", &args).await.unwrap_err();
        assert!(matches!(err, ClientError::ArgumentEncoding { ref key, .. } if key == "ratio"));
        assert!(native.calls().is_empty());
    }
}

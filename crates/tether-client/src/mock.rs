//! Scripted in-process native layer for deterministic tests without a backend.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use tether_core::{
    unmarshal, Credential, FunctionKind, FunctionResult, NativeError, NativeLayer, NativeSession, NativeToken,
    PushSink, WireArgs,
};

/// A one-shot call as the native layer saw it.
#[derive(Clone, Debug)]
pub struct RecordedCall {
    pub kind: FunctionKind,
    pub name: String,
    pub args: WireArgs,
    /// Credential attached when the call was made.
    pub credential: Option<String>,
}

/// A subscription registered with the mock.
#[derive(Clone, Debug)]
pub struct MockSubscription {
    pub token: NativeToken,
    pub name: String,
    pub args: WireArgs,
    pub sink: PushSink,
}

/// Native session that returns pre-programmed results in sequence.
///
/// Calls with no programmed result succeed with `"null"`.
#[derive(Default)]
pub struct MockSession {
    responses: Mutex<VecDeque<Result<FunctionResult, NativeError>>>,
    calls: Mutex<Vec<RecordedCall>>,
    credential: Mutex<Option<Credential>>,
    credential_updates: AtomicUsize,
    initial_values: Mutex<HashMap<String, String>>,
    subscribe_failures: Mutex<HashMap<String, NativeError>>,
    subscriptions: Mutex<Vec<MockSubscription>>,
    closed: Mutex<Vec<NativeToken>>,
}

impl MockSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue the result for the next `invoke`.
    pub fn respond(&self, result: Result<FunctionResult, NativeError>) {
        self.responses.lock().push_back(result);
    }

    /// Push `value` as soon as a subscription to `name` is registered.
    pub fn with_initial_value(&self, name: &str, value: &str) {
        self.initial_values.lock().insert(name.to_owned(), value.to_owned());
    }

    /// Reject subscriptions to `name`.
    pub fn fail_subscriptions(&self, name: &str, error: NativeError) {
        self.subscribe_failures.lock().insert(name.to_owned(), error);
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().clone()
    }

    pub fn credential(&self) -> Option<String> {
        self.credential.lock().as_ref().map(|c| c.expose().to_owned())
    }

    pub fn credential_updates(&self) -> usize {
        self.credential_updates.load(Ordering::SeqCst)
    }

    pub fn subscriptions(&self) -> Vec<MockSubscription> {
        self.subscriptions.lock().clone()
    }

    /// Sink of the most recent subscription to `name`.
    pub fn sink(&self, name: &str) -> Option<PushSink> {
        self.subscriptions
            .lock()
            .iter()
            .rev()
            .find(|s| s.name == name)
            .map(|s| s.sink.clone())
    }

    /// Forget the stored sinks so the channel closes once the core drops
    /// its side, as when the native layer terminates a subscription.
    pub fn terminate(&self, name: &str) {
        self.subscriptions.lock().retain(|s| s.name != name);
    }

    pub fn closed_tokens(&self) -> Vec<NativeToken> {
        self.closed.lock().clone()
    }
}

#[async_trait]
impl NativeSession for MockSession {
    async fn invoke(&self, kind: FunctionKind, name: &str, args: WireArgs) -> Result<FunctionResult, NativeError> {
        let decoded = unmarshal(&args);
        self.calls.lock().push(RecordedCall {
            kind,
            name: name.to_owned(),
            args,
            credential: self.credential(),
        });
        if let Err(e) = decoded {
            return Err(NativeError::Rejected {
                message: e.to_string(),
                payload: None,
            });
        }
        self.responses
            .lock()
            .pop_front()
            .unwrap_or_else(|| Ok(FunctionResult::Value("null".into())))
    }

    async fn open_subscription(&self, name: &str, args: WireArgs, sink: PushSink) -> Result<NativeToken, NativeError> {
        if let Some(err) = self.subscribe_failures.lock().get(name) {
            return Err(err.clone());
        }
        let token = NativeToken::new();
        if let Some(value) = self.initial_values.lock().get(name) {
            sink.update(value.clone());
        }
        self.subscriptions.lock().push(MockSubscription {
            token: token.clone(),
            name: name.to_owned(),
            args,
            sink,
        });
        Ok(token)
    }

    async fn close_subscription(&self, token: &NativeToken) {
        self.subscriptions.lock().retain(|s| &s.token != token);
        self.closed.lock().push(token.clone());
    }

    async fn set_credential(&self, credential: Option<Credential>) {
        *self.credential.lock() = credential;
        self.credential_updates.fetch_add(1, Ordering::SeqCst);
    }
}

/// Native layer that hands out one shared [`MockSession`].
pub struct MockNative {
    session: Arc<MockSession>,
    opened: Mutex<Vec<(String, String)>>,
    open_failures: Mutex<VecDeque<NativeError>>,
}

impl MockNative {
    pub fn new() -> Self {
        Self {
            session: Arc::new(MockSession::new()),
            opened: Mutex::new(Vec::new()),
            open_failures: Mutex::new(VecDeque::new()),
        }
    }

    pub fn session(&self) -> Arc<MockSession> {
        Arc::clone(&self.session)
    }

    /// Fail the next `open_session` with `error`.
    pub fn fail_next_open(&self, error: NativeError) {
        self.open_failures.lock().push_back(error);
    }

    /// `(address, client_id)` of every successful `open_session`.
    pub fn opened(&self) -> Vec<(String, String)> {
        self.opened.lock().clone()
    }
}

impl Default for MockNative {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl NativeLayer for MockNative {
    async fn open_session(&self, address: &str, client_id: &str) -> Result<Arc<dyn NativeSession>, NativeError> {
        if let Some(err) = self.open_failures.lock().pop_front() {
            return Err(err);
        }
        self.opened.lock().push((address.to_owned(), client_id.to_owned()));
        let session: Arc<dyn NativeSession> = self.session.clone();
        Ok(session)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn responses_in_sequence_then_default() {
        let mock = MockSession::new();
        mock.respond(Ok(FunctionResult::Value("1".into())));
        mock.respond(Ok(FunctionResult::ErrorMessage("nope".into())));

        let first = mock.invoke(FunctionKind::Query, "a", WireArgs::new()).await;
        let second = mock.invoke(FunctionKind::Query, "a", WireArgs::new()).await;
        let third = mock.invoke(FunctionKind::Query, "a", WireArgs::new()).await;

        assert_eq!(first, Ok(FunctionResult::Value("1".into())));
        assert_eq!(second, Ok(FunctionResult::ErrorMessage("nope".into())));
        assert_eq!(third, Ok(FunctionResult::Value("null".into())));
        assert_eq!(mock.calls().len(), 3);
    }

    #[tokio::test]
    async fn invalid_wire_json_is_rejected() {
        let mock = MockSession::new();
        let args = WireArgs::from([("x".to_string(), "{oops".to_string())]);
        let result = mock.invoke(FunctionKind::Mutation, "a", args).await;
        assert!(matches!(result, Err(NativeError::Rejected { .. })));
    }

    #[tokio::test]
    async fn credential_recorded_per_call() {
        let mock = MockSession::new();
        mock.set_credential(Some(Credential::new("tok"))).await;
        let _ = mock.invoke(FunctionKind::Query, "a", WireArgs::new()).await;
        mock.set_credential(None).await;
        let _ = mock.invoke(FunctionKind::Query, "a", WireArgs::new()).await;

        let calls = mock.calls();
        assert_eq!(calls[0].credential.as_deref(), Some("tok"));
        assert_eq!(calls[1].credential, None);
        assert_eq!(mock.credential_updates(), 2);
    }

    #[tokio::test]
    async fn open_failure_consumed_once() {
        let native = MockNative::new();
        native.fail_next_open(NativeError::Transport("unreachable".into()));
        assert!(native.open_session("https://a", "c").await.is_err());
        assert!(native.open_session("https://a", "c").await.is_ok());
        assert_eq!(native.opened(), vec![("https://a".to_string(), "c".to_string())]);
    }
}

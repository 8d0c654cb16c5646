//! Session lifecycle: one native session per registry, opened on first `init`.

use std::fmt;
use std::sync::{Arc, OnceLock};

use parking_lot::RwLock;
use tether_core::{Args, ClientError, Credential, NativeLayer, NativeSession, Result, SubscriptionId};
use tokio::sync::{Mutex, OnceCell};
use tracing::{debug, info, warn};

use crate::config::ClientConfig;
use crate::dispatcher::Dispatcher;
use crate::subscription::{Multiplexer, QuerySubscriber, SubscriptionHandle, SubscriptionStream};
use crate::telemetry;

/// A connection to one backend deployment.
///
/// Immutable after creation except for the credential slot.
pub struct Session {
    address: String,
    client_id: String,
    native: Arc<dyn NativeSession>,
    dispatcher: Dispatcher,
    subscriptions: Multiplexer,
    credential: RwLock<Option<Credential>>,
    // Serializes credential writes so the native slot and `credential` agree.
    credential_writer: Mutex<()>,
}

impl Session {
    fn new(address: &str, client_id: &str, native: Arc<dyn NativeSession>) -> Self {
        Self {
            address: address.to_owned(),
            client_id: client_id.to_owned(),
            dispatcher: Dispatcher::new(Arc::clone(&native)),
            subscriptions: Multiplexer::new(Arc::clone(&native)),
            native,
            credential: RwLock::new(None),
            credential_writer: Mutex::new(()),
        }
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    pub fn subscriptions(&self) -> &Multiplexer {
        &self.subscriptions
    }

    pub async fn query(&self, name: &str, args: &Args) -> Result<String> {
        self.dispatcher.query(name, args).await
    }

    pub async fn mutation(&self, name: &str, args: &Args) -> Result<String> {
        self.dispatcher.mutation(name, args).await
    }

    pub async fn action(&self, name: &str, args: &Args) -> Result<String> {
        self.dispatcher.action(name, args).await
    }

    pub async fn subscribe(
        &self,
        name: &str,
        args: &Args,
        listener: impl QuerySubscriber + 'static,
    ) -> Result<SubscriptionHandle> {
        self.subscriptions.subscribe(name, args, listener).await
    }

    pub async fn subscribe_stream(&self, name: &str, args: &Args) -> Result<SubscriptionStream> {
        self.subscriptions.subscribe_stream(name, args).await
    }

    pub fn cancel_subscription(&self, id: &SubscriptionId) -> bool {
        self.subscriptions.cancel_subscription(id)
    }

    /// Set or clear (`None`) the credential used by subsequent operations.
    ///
    /// Not validated locally. Calls already in flight keep whatever
    /// credential they started with. Concurrent updates apply one at a time;
    /// the last to complete wins.
    pub async fn set_credential(&self, token: Option<String>) {
        let credential = token.map(Credential::new);
        let present = credential.is_some();
        let _writer = self.credential_writer.lock().await;
        self.native.set_credential(credential.clone()).await;
        *self.credential.write() = credential;
        debug!(present, "credential updated");
    }

    pub fn has_credential(&self) -> bool {
        self.credential.read().is_some()
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("address", &self.address)
            .field("client_id", &self.client_id)
            .field("has_credential", &self.has_credential())
            .field("subscriptions", &self.subscriptions.active_count())
            .finish()
    }
}

/// Holds at most one [`Session`].
///
/// The first successful `init` wins. Later calls return the same session and
/// ignore their arguments; there is no way to reconfigure a live registry.
pub struct SessionRegistry {
    native: Arc<dyn NativeLayer>,
    session: OnceCell<Arc<Session>>,
}

impl SessionRegistry {
    pub fn new(native: Arc<dyn NativeLayer>) -> Self {
        Self {
            native,
            session: OnceCell::new(),
        }
    }

    /// Open the session on first call; afterwards return the existing one.
    ///
    /// If opening fails the registry stays uninitialised and a later call may retry.
    pub async fn init(&self, address: &str, client_id: &str) -> Result<Arc<Session>> {
        let session = self
            .session
            .get_or_try_init(|| async {
                let native = self
                    .native
                    .open_session(address, client_id)
                    .await
                    .map_err(|e| ClientError::SessionOpen {
                        address: address.to_owned(),
                        message: e.to_string(),
                    })?;
                info!(address, client_id, "session opened");
                Ok::<_, ClientError>(Arc::new(Session::new(address, client_id, native)))
            })
            .await?;

        if session.address != address || session.client_id != client_id {
            warn!(
                requested_address = address,
                requested_client_id = client_id,
                address = %session.address,
                client_id = %session.client_id,
                "session already initialised, ignoring new configuration"
            );
        }
        Ok(Arc::clone(session))
    }

    /// Install logging if configured, then `init` with the configured address.
    pub async fn init_from_config(&self, config: &ClientConfig) -> Result<Arc<Session>> {
        if config.logging.enabled && telemetry::init_logging(&config.logging) {
            debug!("logging initialised from client config");
        }
        self.init(&config.deployment_url, &config.client_id).await
    }

    pub fn current(&self) -> Result<Arc<Session>> {
        self.session.get().cloned().ok_or(ClientError::UninitializedSession)
    }

    pub fn is_initialized(&self) -> bool {
        self.session.initialized()
    }
}

static GLOBAL: OnceLock<SessionRegistry> = OnceLock::new();

/// Install the process-wide registry.
///
/// Returns the registry back if one was already installed.
pub fn install_global(registry: SessionRegistry) -> std::result::Result<(), SessionRegistry> {
    GLOBAL.set(registry)
}

/// The process-wide registry, if installed.
pub fn global() -> Option<&'static SessionRegistry> {
    GLOBAL.get()
}

//! Live subscriptions: registration, push routing and teardown.

mod handle;
mod listener;
mod stream;

use std::sync::Arc;

use dashmap::DashMap;
use tether_core::{marshal, Args, NativeSession, PushSink, Result, SubscriptionId};
use tracing::{debug, info, instrument};

pub use handle::{SubscriptionHandle, SubscriptionState, CHANNEL_CLOSED};
pub use listener::{CallbackSubscriber, QuerySubscriber};
pub use stream::SubscriptionStream;

use handle::{dispose_entry, Entry, LiveSet};
use listener::ChannelSubscriber;

struct PendingGuard<'a> {
    entry: &'a Entry,
    live: &'a LiveSet,
}

impl Drop for PendingGuard<'_> {
    fn drop(&mut self) {
        if dispose_entry(self.entry, self.live) {
            debug!(subscription_id = %self.entry.id(), "pending subscription abandoned");
        }
    }
}

/// Owns the set of live subscriptions for one session.
#[derive(Clone)]
pub struct Multiplexer {
    native: Arc<dyn NativeSession>,
    live: Arc<LiveSet>,
}

impl Multiplexer {
    pub fn new(native: Arc<dyn NativeSession>) -> Self {
        Self {
            native,
            live: Arc::new(DashMap::new()),
        }
    }

    /// Subscribe with a listener. The first push is the current value.
    pub async fn subscribe(
        &self,
        name: &str,
        args: &Args,
        listener: impl QuerySubscriber + 'static,
    ) -> Result<SubscriptionHandle> {
        self.subscribe_shared(name, args, Arc::new(listener)).await
    }

    #[instrument(skip_all, fields(function = %name))]
    pub async fn subscribe_shared(
        &self,
        name: &str,
        args: &Args,
        listener: Arc<dyn QuerySubscriber>,
    ) -> Result<SubscriptionHandle> {
        let wire = marshal(args)?;
        let entry = Arc::new(Entry::new(name, listener));
        let id = entry.id().clone();
        self.live.insert(id.clone(), Arc::clone(&entry));
        // Disposes the entry if this future is dropped or registration fails.
        let guard = PendingGuard {
            entry: &entry,
            live: &self.live,
        };

        let (sink, rx) = PushSink::channel();
        let token = match self.native.open_subscription(name, wire, sink).await {
            Ok(token) => token,
            Err(e) => {
                debug!(subscription_id = %id, error = %e, "native subscription rejected");
                return Err(e.into());
            }
        };
        std::mem::forget(guard);

        // Cancelled while registering: release straight away.
        if !entry.activate() {
            self.native.close_subscription(&token).await;
            debug!(subscription_id = %id, "subscription disposed before activation");
            return Ok(SubscriptionHandle::new(entry, Arc::clone(&self.live)));
        }

        tokio::spawn(handle::pump(Arc::clone(&entry), Arc::clone(&self.native), token, rx));
        info!(subscription_id = %id, "subscription active");
        Ok(SubscriptionHandle::new(entry, Arc::clone(&self.live)))
    }

    /// Subscribe and consume results as a stream.
    pub async fn subscribe_stream(&self, name: &str, args: &Args) -> Result<SubscriptionStream> {
        let (listener, rx) = ChannelSubscriber::new();
        let handle = self.subscribe_shared(name, args, Arc::new(listener)).await?;
        Ok(SubscriptionStream::new(handle, rx))
    }

    /// Dispose by id. False if no live subscription has that id.
    pub fn cancel_subscription(&self, id: &SubscriptionId) -> bool {
        let Some((_, entry)) = self.live.remove(id) else {
            return false;
        };
        let disposed = dispose_entry(&entry, &self.live);
        if disposed {
            info!(subscription_id = %id, "subscription cancelled");
        }
        disposed
    }

    /// Number of subscriptions not yet disposed.
    pub fn active_count(&self) -> usize {
        self.live.len()
    }

    pub fn is_live(&self, id: &SubscriptionId) -> bool {
        self.live.contains_key(id)
    }
}

use std::cell::RefCell;
use std::fmt;
use std::sync::Arc;

use dashmap::DashMap;
use parking_lot::ReentrantMutex;
use tether_core::{NativeSession, NativeToken, Push, PushError, SubscriptionId};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::listener::QuerySubscriber;

/// Lifecycle of a subscription.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SubscriptionState {
    /// Native registration in flight.
    Pending,
    /// Registered and receiving pushes.
    Active,
    /// Terminal. No listener is ever invoked again.
    Disposed,
}

struct Slot {
    state: SubscriptionState,
    listener: Option<Arc<dyn QuerySubscriber>>,
}

pub(crate) type LiveSet = DashMap<SubscriptionId, Arc<Entry>>;

/// Shared by the caller's handle, the live set and the pump task.
///
/// Every listener call and every state transition goes through `slot`. The
/// mutex is reentrant so a listener may dispose its own subscription.
pub(crate) struct Entry {
    id: SubscriptionId,
    function: String,
    slot: ReentrantMutex<RefCell<Slot>>,
    cancel: CancellationToken,
}

impl Entry {
    pub(crate) fn new(function: &str, listener: Arc<dyn QuerySubscriber>) -> Self {
        Self {
            id: SubscriptionId::new(),
            function: function.to_owned(),
            slot: ReentrantMutex::new(RefCell::new(Slot {
                state: SubscriptionState::Pending,
                listener: Some(listener),
            })),
            cancel: CancellationToken::new(),
        }
    }

    pub(crate) fn id(&self) -> &SubscriptionId {
        &self.id
    }

    pub(crate) fn state(&self) -> SubscriptionState {
        self.slot.lock().borrow().state
    }

    /// Pending -> Active. False if the entry was disposed meanwhile.
    pub(crate) fn activate(&self) -> bool {
        let guard = self.slot.lock();
        let mut slot = guard.borrow_mut();
        match slot.state {
            SubscriptionState::Pending => {
                slot.state = SubscriptionState::Active;
                true
            }
            SubscriptionState::Active => true,
            SubscriptionState::Disposed => false,
        }
    }

    /// Invoke the listener if the subscription is still live.
    ///
    /// The lock is held for the whole call, so a concurrent `dispose` either
    /// waits for this delivery to finish or suppresses it entirely.
    pub(crate) fn deliver(&self, push: Result<String, PushError>) -> bool {
        let guard = self.slot.lock();
        let listener = {
            let slot = guard.borrow();
            if slot.state != SubscriptionState::Active {
                return false;
            }
            match &slot.listener {
                Some(listener) => Arc::clone(listener),
                None => return false,
            }
        };
        match push {
            Ok(value) => listener.on_update(value),
            Err(error) => listener.on_error(error),
        }
        drop(guard);
        true
    }

    /// Transition to Disposed. Returns false if already disposed.
    pub(crate) fn dispose(&self) -> bool {
        let listener = {
            let guard = self.slot.lock();
            let mut slot = guard.borrow_mut();
            if slot.state == SubscriptionState::Disposed {
                return false;
            }
            slot.state = SubscriptionState::Disposed;
            slot.listener.take()
        };
        self.cancel.cancel();
        drop(listener);
        true
    }

    /// Drop the listener after the native layer closed the channel. The
    /// state is left alone; only the owner disposes.
    fn release_listener(&self) {
        let listener = {
            let guard = self.slot.lock();
            let mut slot = guard.borrow_mut();
            slot.listener.take()
        };
        drop(listener);
    }
}

/// Final error delivered when the native layer ends a subscription on its own.
pub const CHANNEL_CLOSED: &str = "subscription closed by native layer";

/// Drains native pushes into the entry until it is disposed or the native
/// layer closes the channel, then releases the native token exactly once.
pub(crate) async fn pump(
    entry: Arc<Entry>,
    native: Arc<dyn NativeSession>,
    token: NativeToken,
    mut rx: mpsc::UnboundedReceiver<Push>,
) {
    loop {
        tokio::select! {
            biased;
            () = entry.cancel.cancelled() => break,
            push = rx.recv() => match push {
                Some(Push::Result(result)) => {
                    let _ = entry.deliver(result.into_push());
                }
                Some(Push::Transport(message)) => {
                    let _ = entry.deliver(Err(PushError::transport(message)));
                }
                None => {
                    warn!(
                        subscription_id = %entry.id,
                        function = %entry.function,
                        "native layer closed subscription channel"
                    );
                    let _ = entry.deliver(Err(PushError::transport(CHANNEL_CLOSED)));
                    entry.release_listener();
                    break;
                }
            }
        }
    }
    native.close_subscription(&token).await;
    debug!(subscription_id = %entry.id, token = %token, "native subscription released");
}

/// Caller-side reference to a live subscription.
///
/// Dropping a handle does not cancel anything; call [`dispose`](Self::dispose).
#[derive(Clone)]
pub struct SubscriptionHandle {
    entry: Arc<Entry>,
    live: Arc<LiveSet>,
}

impl SubscriptionHandle {
    pub(crate) fn new(entry: Arc<Entry>, live: Arc<LiveSet>) -> Self {
        Self { entry, live }
    }

    pub fn id(&self) -> &SubscriptionId {
        &self.entry.id
    }

    /// Remote query function this subscription watches.
    pub fn function(&self) -> &str {
        &self.entry.function
    }

    pub fn state(&self) -> SubscriptionState {
        self.entry.state()
    }

    pub fn is_disposed(&self) -> bool {
        self.state() == SubscriptionState::Disposed
    }

    /// Stop delivery and release the native subscription. Idempotent; returns
    /// true only for the call that performed the transition.
    pub fn dispose(&self) -> bool {
        let disposed = dispose_entry(&self.entry, &self.live);
        if disposed {
            info!(subscription_id = %self.entry.id, function = %self.entry.function, "subscription disposed");
        }
        disposed
    }
}

impl fmt::Debug for SubscriptionHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SubscriptionHandle")
            .field("id", &self.entry.id)
            .field("function", &self.entry.function)
            .field("state", &self.state())
            .finish()
    }
}

pub(crate) fn dispose_entry(entry: &Entry, live: &LiveSet) -> bool {
    let disposed = entry.dispose();
    let _ = live.remove(&entry.id);
    disposed
}

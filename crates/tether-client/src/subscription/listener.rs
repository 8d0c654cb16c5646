use tether_core::PushError;
use tokio::sync::mpsc;

/// Receives pushes for one subscription.
///
/// Calls happen on the runtime's worker threads, one at a time and in the
/// order the native layer emitted them.
pub trait QuerySubscriber: Send + Sync {
    fn on_update(&self, value: String);
    fn on_error(&self, error: PushError);
}

/// Adapts a pair of closures into a [`QuerySubscriber`].
pub struct CallbackSubscriber {
    on_update: Box<dyn Fn(String) + Send + Sync>,
    on_error: Box<dyn Fn(PushError) + Send + Sync>,
}

impl CallbackSubscriber {
    pub fn new(
        on_update: impl Fn(String) + Send + Sync + 'static,
        on_error: impl Fn(PushError) + Send + Sync + 'static,
    ) -> Self {
        Self {
            on_update: Box::new(on_update),
            on_error: Box::new(on_error),
        }
    }
}

impl QuerySubscriber for CallbackSubscriber {
    fn on_update(&self, value: String) {
        (self.on_update)(value);
    }

    fn on_error(&self, error: PushError) {
        (self.on_error)(error);
    }
}

/// Forwards pushes into a channel; backs [`super::SubscriptionStream`].
pub(crate) struct ChannelSubscriber {
    tx: mpsc::UnboundedSender<Result<String, PushError>>,
}

impl ChannelSubscriber {
    pub(crate) fn new() -> (Self, mpsc::UnboundedReceiver<Result<String, PushError>>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl QuerySubscriber for ChannelSubscriber {
    fn on_update(&self, value: String) {
        let _ = self.tx.send(Ok(value));
    }

    fn on_error(&self, error: PushError) {
        let _ = self.tx.send(Err(error));
    }
}

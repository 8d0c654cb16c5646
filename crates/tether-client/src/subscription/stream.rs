use std::pin::Pin;
use std::task::{Context, Poll};

use futures::Stream;
use tether_core::{PushError, SubscriptionId};
use tokio::sync::mpsc;

use super::handle::SubscriptionHandle;

/// A subscription consumed as an async stream of full results.
///
/// Dropping the stream disposes the subscription. Items still buffered when
/// the subscription is disposed are discarded.
pub struct SubscriptionStream {
    handle: SubscriptionHandle,
    rx: mpsc::UnboundedReceiver<Result<String, PushError>>,
}

impl SubscriptionStream {
    pub(crate) fn new(handle: SubscriptionHandle, rx: mpsc::UnboundedReceiver<Result<String, PushError>>) -> Self {
        Self { handle, rx }
    }

    pub fn id(&self) -> &SubscriptionId {
        self.handle.id()
    }

    pub fn handle(&self) -> &SubscriptionHandle {
        &self.handle
    }
}

impl Stream for SubscriptionStream {
    type Item = Result<String, PushError>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        if self.handle.is_disposed() {
            return Poll::Ready(None);
        }
        self.rx.poll_recv(cx)
    }
}

impl Drop for SubscriptionStream {
    fn drop(&mut self) {
        self.handle.dispose();
    }
}

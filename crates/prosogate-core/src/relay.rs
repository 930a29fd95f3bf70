use crate::types::{RelayItem, ResultEvent};
use tokio::sync::mpsc;

/// Create the handoff channel between a session worker and the streaming
/// drain loop. Unbounded FIFO: pushes never block the producer, the
/// consumer blocks on `recv` instead of polling.
pub fn result_relay() -> (RelayProducer, RelayConsumer) {
    let (tx, rx) = mpsc::unbounded_channel();
    (RelayProducer { tx }, RelayConsumer { rx })
}

/// Producer half, owned by the session worker. Not cloneable: one logical
/// producer per session, and `finish` consumes it so the terminal marker
/// can only be pushed once.
#[derive(Debug)]
pub struct RelayProducer {
    tx: mpsc::UnboundedSender<RelayItem>,
}

impl RelayProducer {
    pub fn push(&self, event: ResultEvent) {
        // Send fails only when the consumer is gone (client disconnected);
        // the worker keeps running to completion regardless.
        let _ = self.tx.send(RelayItem::Event(event));
    }

    /// Push the terminal marker and close the channel.
    pub fn finish(self) {
        let _ = self.tx.send(RelayItem::Done);
    }
}

/// Consumer half, owned by the streaming endpoint.
#[derive(Debug)]
pub struct RelayConsumer {
    rx: mpsc::UnboundedReceiver<RelayItem>,
}

impl RelayConsumer {
    /// Wait for the next item. `None` means the producer was dropped
    /// without finishing, which a well-behaved worker never does.
    pub async fn recv(&mut self) -> Option<RelayItem> {
        self.rx.recv().await
    }

    /// Non-blocking variant for callers that poll.
    pub fn try_recv(&mut self) -> Option<RelayItem> {
        self.rx.try_recv().ok()
    }
}

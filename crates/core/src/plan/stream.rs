use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use futures::Stream;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Default number of planned items buffered ahead of the consumer
pub const DEFAULT_CAPACITY: usize = 64;

/// A lazily produced sequence of planned transfers
///
/// One spawned task produces into a bounded channel and suspends while it is
/// full; the owner pulls with [`PlanStream::next`] or as a [`Stream`].
/// Dropping the stream aborts the producer.
pub struct PlanStream<T> {
    rx: mpsc::Receiver<T>,
    producer: JoinHandle<()>,
}

/// Producer half handed to the task behind a [`PlanStream`]
pub struct PlanSender<T> {
    tx: mpsc::Sender<T>,
}

impl<T: Send + 'static> PlanStream<T> {
    /// Spawn `producer` on the current runtime
    pub fn spawn<F, Fut>(capacity: usize, producer: F) -> Self
    where
        F: FnOnce(PlanSender<T>) -> Fut,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        let producer = tokio::spawn(producer(PlanSender { tx }));
        Self { rx, producer }
    }

    /// Next item, or `None` once the producer is done
    pub async fn next(&mut self) -> Option<T> {
        self.rx.recv().await
    }

    /// Drain the whole sequence
    pub async fn collect_all(mut self) -> Vec<T> {
        let mut items = Vec::new();
        while let Some(item) = self.next().await {
            items.push(item);
        }
        items
    }
}

impl<T> Drop for PlanStream<T> {
    fn drop(&mut self) {
        self.producer.abort();
    }
}

impl<T> Stream for PlanStream<T> {
    type Item = T;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<T>> {
        self.rx.poll_recv(cx)
    }
}

impl<T> PlanSender<T> {
    /// Send one item; `false` once the consumer has gone away
    pub async fn send(&self, item: T) -> bool {
        self.tx.send(item).await.is_ok()
    }
}

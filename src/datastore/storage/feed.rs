use std::task::{Context, Poll};
use tokio::sync::mpsc;

use super::error::StorageError;
use crate::model::Task;

pub type SnapshotSender = mpsc::UnboundedSender<Result<Vec<Task>, StorageError>>;

/// Receiving end of a live query. Every item is the full matching set.
///
/// Closing or dropping the feed tells the storage to stop delivering.
#[derive(Debug)]
pub struct SnapshotFeed {
    rx: mpsc::UnboundedReceiver<Result<Vec<Task>, StorageError>>,
}

impl SnapshotFeed {
    pub fn channel() -> (SnapshotSender, SnapshotFeed) {
        let (tx, rx) = mpsc::unbounded_channel();
        (tx, SnapshotFeed { rx })
    }

    pub fn poll_recv(
        &mut self,
        cx: &mut Context<'_>,
    ) -> Poll<Option<Result<Vec<Task>, StorageError>>> {
        self.rx.poll_recv(cx)
    }

    pub async fn recv(&mut self) -> Option<Result<Vec<Task>, StorageError>> {
        self.rx.recv().await
    }

    pub fn close(&mut self) {
        self.rx.close();
    }
}

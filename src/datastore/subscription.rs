use futures::Stream;
use parking_lot::Mutex;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use tracing::{debug, error};

use super::error::DataStoreError;
use super::list::TaskList;
use super::storage::SnapshotFeed;
use crate::model::{sort_newest_first, OwnerId, Task};

/// Live feed of an owner's task list.
///
/// Each item is a snapshot that has already replaced the store's list,
/// newest first. The most recent snapshot wins over optimistic changes still
/// in flight. Nothing is applied unless the stream is polled.
///
/// Releasing the subscription, by [`Subscription::unsubscribe`] or by drop,
/// closes the remote feed.
pub struct Subscription {
    owner: OwnerId,
    feed: Option<SnapshotFeed>,
    list: Arc<Mutex<TaskList>>,
}

impl Subscription {
    pub(crate) fn remote(owner: OwnerId, feed: SnapshotFeed, list: Arc<Mutex<TaskList>>) -> Self {
        Self {
            owner,
            feed: Some(feed),
            list,
        }
    }

    /// Local sessions have nothing to listen to; the stream ends at once.
    pub(crate) fn inert(owner: OwnerId, list: Arc<Mutex<TaskList>>) -> Self {
        Self {
            owner,
            feed: None,
            list,
        }
    }

    pub fn owner(&self) -> &OwnerId {
        &self.owner
    }

    pub fn is_active(&self) -> bool {
        self.feed.is_some()
    }

    /// Stops delivery. Calling it again is a no-op.
    pub fn unsubscribe(&mut self) {
        if let Some(mut feed) = self.feed.take() {
            feed.close();
            debug!(owner = %self.owner, "Subscription released.");
        }
    }
}

impl Stream for Subscription {
    type Item = Result<Vec<Task>, DataStoreError>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        let feed = match this.feed.as_mut() {
            Some(feed) => feed,
            None => return Poll::Ready(None),
        };

        match feed.poll_recv(cx) {
            Poll::Pending => Poll::Pending,
            Poll::Ready(None) => {
                this.feed = None;
                Poll::Ready(None)
            }
            Poll::Ready(Some(Err(source))) => {
                error!(owner = %this.owner, reason = %source, "Snapshot feed failed.");
                Poll::Ready(Some(Err(DataStoreError::SubscriptionFailed {
                    owner: this.owner.clone(),
                    source,
                })))
            }
            Poll::Ready(Some(Ok(mut snapshot))) => {
                sort_newest_first(&mut snapshot);
                let applied = this.list.lock().replace_for(&this.owner, snapshot.clone());
                if !applied {
                    // the store moved on to another owner
                    this.unsubscribe();
                    return Poll::Ready(None);
                }
                debug!(owner = %this.owner, tasks = snapshot.len(), "Snapshot applied.");
                Poll::Ready(Some(Ok(snapshot)))
            }
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.unsubscribe();
    }
}

use futures::StreamExt;
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, info_span, warn};
use tracing_futures::Instrument;

use crate::datastore::{DataStoreError, Subscription, TaskStorage, TaskStore};
use crate::model::{OwnerId, Task};
use crate::notes::{NoteStorage, NotesStore};

/// Identity reported by authentication; `None` while signed out.
pub type IdentityFeed = watch::Receiver<Option<String>>;

enum SessionEvent {
    IdentityChanged,
    IdentityClosed,
    Snapshot(Result<Vec<Task>, DataStoreError>),
    FeedEnded,
}

/// Keeps the stores pointed at whoever is signed in.
///
/// Every identity change releases the current task subscription, switches both
/// stores to the new owner and opens a fresh subscription. The loop ends when
/// the identity sender is dropped.
pub struct SessionService<S, N>
where
    S: TaskStorage,
    N: NoteStorage,
{
    tasks: Arc<TaskStore<S>>,
    notes: Arc<NotesStore<N>>,
    identity: IdentityFeed,
}

impl<S, N> SessionService<S, N>
where
    S: TaskStorage,
    N: NoteStorage,
{
    pub fn new(tasks: Arc<TaskStore<S>>, notes: Arc<NotesStore<N>>, identity: IdentityFeed) -> Self {
        Self {
            tasks,
            notes,
            identity,
        }
    }

    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(self.start().instrument(info_span!("session")))
    }

    pub async fn start(mut self) {
        info!("Starting session loop.");
        let mut subscription = self.open().await;
        loop {
            match next_event(&mut self.identity, &mut subscription).await {
                SessionEvent::IdentityChanged => {
                    if let Some(mut current) = subscription.take() {
                        current.unsubscribe();
                    }
                    subscription = self.open().await;
                }
                SessionEvent::Snapshot(Ok(tasks)) => {
                    debug!(tasks = tasks.len(), "Task list refreshed.");
                }
                SessionEvent::Snapshot(Err(err)) => {
                    warn!(reason = %err, "Task feed reported an error.");
                }
                SessionEvent::FeedEnded => {
                    debug!("Task feed ended, waiting for the next identity change.");
                    subscription = None;
                }
                SessionEvent::IdentityClosed => break,
            }
        }
        if let Some(mut current) = subscription {
            current.unsubscribe();
        }
        info!("Finishing session loop.");
    }

    async fn open(&self) -> Option<Subscription> {
        let identity = self.identity.borrow().clone();
        let owner = OwnerId::from_identity(identity.as_deref()).unwrap_or_else(|err| {
            warn!(reason = %err, "Unusable identity, falling back to the local session.");
            OwnerId::local()
        });
        info!(owner = %owner, "Session owner resolved.");

        if self.notes.owner() != owner {
            self.notes.switch_owner(owner.clone());
        }
        if let Err(err) = self.notes.load().await {
            error!(reason = %err, "Unable to load notes.");
        }

        match self.tasks.subscribe(owner).await {
            Ok(subscription) => {
                debug!(
                    owner = %subscription.owner(),
                    active = subscription.is_active(),
                    "Task feed opened."
                );
                Some(subscription)
            }
            Err(err) => {
                error!(reason = %err, "Unable to open the task feed.");
                None
            }
        }
    }
}

async fn next_event(identity: &mut IdentityFeed, subscription: &mut Option<Subscription>) -> SessionEvent {
    match subscription {
        Some(feed) => tokio::select! {
            changed = identity.changed() => match changed {
                Ok(()) => SessionEvent::IdentityChanged,
                Err(_) => SessionEvent::IdentityClosed,
            },
            next = feed.next() => match next {
                Some(snapshot) => SessionEvent::Snapshot(snapshot),
                None => SessionEvent::FeedEnded,
            },
        },
        None => match identity.changed().await {
            Ok(()) => SessionEvent::IdentityChanged,
            Err(_) => SessionEvent::IdentityClosed,
        },
    }
}

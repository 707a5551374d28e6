//! Derived name lists (genres, artists) used to populate filters and the
//! track editor.

use crate::error::AppError;
use crate::query::Refetch;
use crate::resource::ResourceClient;
use crate::transport::Outcome;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

pub const GENRES_RESOURCE: &str = "genres";
pub const ARTISTS_RESOURCE: &str = "artists";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VocabularyStatus {
    Idle,
    Loading,
    Ready,
    Errored(AppError),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VocabularyView {
    pub status: VocabularyStatus,
    /// Latest successfully loaded names; kept across failed reloads
    pub items: Vec<String>,
}

impl VocabularyView {
    pub fn is_loading(&self) -> bool {
        self.status == VocabularyStatus::Loading
    }
}

struct LoadState {
    generation: u64,
    in_flight: Option<CancellationToken>,
}

struct Inner {
    client: ResourceClient<String>,
    state: Mutex<LoadState>,
    view: watch::Sender<VocabularyView>,
}

/// Latest list of names for one vocabulary resource.
///
/// A reload cancels the one in flight; only the newest load may commit.
#[derive(Clone)]
pub struct VocabularyList {
    inner: Arc<Inner>,
}

impl fmt::Debug for VocabularyList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VocabularyList")
            .field("resource", &self.inner.client.resource())
            .field("items", &self.items().len())
            .finish()
    }
}

impl VocabularyList {
    pub fn new(client: ResourceClient<String>) -> Self {
        let (view, _) = watch::channel(VocabularyView {
            status: VocabularyStatus::Idle,
            items: Vec::new(),
        });
        Self {
            inner: Arc::new(Inner {
                client,
                state: Mutex::new(LoadState {
                    generation: 0,
                    in_flight: None,
                }),
                view,
            }),
        }
    }

    pub fn resource(&self) -> &str {
        self.inner.client.resource()
    }

    pub fn subscribe(&self) -> watch::Receiver<VocabularyView> {
        self.inner.view.subscribe()
    }

    pub fn snapshot(&self) -> VocabularyView {
        self.inner.view.borrow().clone()
    }

    pub fn items(&self) -> Vec<String> {
        self.inner.view.borrow().items.clone()
    }

    /// Start a load, superseding any load in flight. Must run inside a Tokio runtime.
    pub fn load(&self) {
        let mut state = self.inner.lock();
        if let Some(previous) = state.in_flight.take() {
            previous.cancel();
        }
        state.generation += 1;
        let generation = state.generation;
        let token = CancellationToken::new();
        state.in_flight = Some(token.clone());
        self.inner
            .view
            .send_modify(|view| view.status = VocabularyStatus::Loading);
        drop(state);

        debug!(resource = self.resource(), generation, "Loading vocabulary");
        let inner = Arc::clone(&self.inner);
        tokio::spawn(async move {
            let outcome = inner.client.list(Vec::new(), Some(&token)).await;
            inner.commit(generation, outcome);
        });
    }

    /// Wait for the current load to finish.
    pub async fn settled(&self) -> VocabularyView {
        let mut rx = self.subscribe();
        let settled = rx
            .wait_for(|view| !view.is_loading())
            .await
            .map(|view| view.clone());
        settled.unwrap_or_else(|_| self.snapshot())
    }
}

impl Refetch for VocabularyList {
    fn refetch(&self) {
        self.load();
    }
}

impl Inner {
    fn lock(&self) -> MutexGuard<'_, LoadState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn commit(&self, generation: u64, outcome: Outcome<Vec<String>>) {
        let mut state = self.lock();
        if state.generation != generation {
            return;
        }
        let Some(result) = outcome.settled() else {
            return;
        };
        state.in_flight = None;

        match result {
            Ok(items) => {
                debug!(resource = self.client.resource(), count = items.len(), "Vocabulary loaded");
                self.view.send_replace(VocabularyView {
                    status: VocabularyStatus::Ready,
                    items,
                });
            }
            Err(err) => {
                warn!(resource = self.client.resource(), error = %err, "Vocabulary load failed");
                self.view
                    .send_modify(|view| view.status = VocabularyStatus::Errored(err));
            }
        }
    }
}

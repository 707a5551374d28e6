//! # Mutation Coordinator
//!
//! Runs create, update, delete, upload, file removal and bulk delete against
//! [`TrackApi`], then keeps the rest of the view consistent:
//!
//! - every attempt ends with exactly one notification on the [`EventBus`]
//! - successful changes publish a [`TrackEvent`] and refresh the track list
//!   along with the lists derived from item fields
//! - the active dialog is closed once the attempt completes, whatever the result
//!
//! Drafts are validated and normalized locally before any request is sent.

use crate::draft::{normalize_draft, validate_draft};
use crate::error::Result;
use crate::models::{BulkDeleteOutcome, Track, TrackDraft, TrackFile};
use crate::query::Refetch;
use crate::tracks::TrackApi;
use core_runtime::events::{EventBus, Notification, NotificationLevel, TrackEvent};
use std::fmt;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{info, instrument, warn};

/// Editor or confirmation surface the host currently shows.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum ActiveDialog {
    #[default]
    None,
    Create,
    Edit { track_id: String },
    Delete { track_id: String },
    Upload { track_id: String },
    BulkDelete { count: usize },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateOutcome {
    Updated(Track),
    /// Draft matched the stored track; nothing was sent
    Unchanged,
}

/// Lists a successful mutation may have made stale.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RefreshScope {
    Nothing,
    /// Track list and the lists derived from item fields
    RowsAndDerived,
}

/// What to tell the host after a successful attempt.
struct Report {
    level: NotificationLevel,
    message: String,
    event: Option<TrackEvent>,
    scope: RefreshScope,
}

impl Report {
    fn new(level: NotificationLevel, message: impl Into<String>) -> Self {
        Self {
            level,
            message: message.into(),
            event: None,
            scope: RefreshScope::Nothing,
        }
    }

    fn success(message: impl Into<String>) -> Self {
        Self::new(NotificationLevel::Success, message)
    }

    fn with_event(mut self, event: TrackEvent) -> Self {
        self.event = Some(event);
        self
    }

    fn refreshing(mut self, scope: RefreshScope) -> Self {
        self.scope = scope;
        self
    }
}

pub struct MutationCoordinator {
    api: Arc<dyn TrackApi>,
    events: EventBus,
    primary: Arc<dyn Refetch>,
    derived: Vec<Arc<dyn Refetch>>,
    dialog: watch::Sender<ActiveDialog>,
}

impl fmt::Debug for MutationCoordinator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MutationCoordinator")
            .field("derived_lists", &self.derived.len())
            .field("dialog", &*self.dialog.borrow())
            .finish()
    }
}

impl MutationCoordinator {
    /// `primary` is the track list; `derived` are lists computed from item
    /// fields (the distinct-artist list). The genre vocabulary is not one of them.
    pub fn new(
        api: Arc<dyn TrackApi>,
        events: EventBus,
        primary: Arc<dyn Refetch>,
        derived: Vec<Arc<dyn Refetch>>,
    ) -> Self {
        let (dialog, _) = watch::channel(ActiveDialog::None);
        Self {
            api,
            events,
            primary,
            derived,
            dialog,
        }
    }

    pub fn open_dialog(&self, dialog: ActiveDialog) {
        self.dialog.send_replace(dialog);
    }

    pub fn close_dialog(&self) {
        self.dialog.send_replace(ActiveDialog::None);
    }

    pub fn active_dialog(&self) -> ActiveDialog {
        self.dialog.borrow().clone()
    }

    pub fn subscribe_dialog(&self) -> watch::Receiver<ActiveDialog> {
        self.dialog.subscribe()
    }

    #[instrument(skip(self, draft))]
    pub async fn create(&self, draft: TrackDraft) -> Result<Track> {
        let result = match validate_draft(&draft) {
            Ok(()) => self.api.create(&normalize_draft(draft)).await,
            Err(err) => Err(err),
        };
        self.finish(&result, |track| {
            Report::success(format!("Track \"{}\" created", track.title))
                .with_event(TrackEvent::Created {
                    track_id: track.id.clone(),
                    title: track.title.clone(),
                    artist: track.artist.clone(),
                })
                .refreshing(RefreshScope::RowsAndDerived)
        });
        result
    }

    /// Save an edited draft of `original`.
    ///
    /// Returns [`UpdateOutcome::Unchanged`] without a request when every
    /// editable field equals the stored track, either as submitted or after
    /// normalization. The stored track itself is never normalized.
    #[instrument(skip(self, original, draft), fields(track_id = %original.id))]
    pub async fn update(&self, original: &Track, draft: TrackDraft) -> Result<UpdateOutcome> {
        let mut changed = Vec::new();
        let result = match validate_draft(&draft) {
            Err(err) => Err(err),
            Ok(()) => {
                let submitted_unchanged = draft.changed_fields(original).is_empty();
                let draft = normalize_draft(draft);
                changed = draft.changed_fields(original);
                if submitted_unchanged || changed.is_empty() {
                    info!("Draft unchanged, skipping update");
                    Ok(UpdateOutcome::Unchanged)
                } else {
                    self.api
                        .update(&original.id, &draft)
                        .await
                        .map(UpdateOutcome::Updated)
                }
            }
        };

        self.finish(&result, |outcome| match outcome {
            UpdateOutcome::Unchanged => Report::new(NotificationLevel::Info, "No changes to save"),
            UpdateOutcome::Updated(track) => {
                Report::success(format!("Track \"{}\" updated", track.title))
                    .with_event(TrackEvent::Updated {
                        track_id: track.id.clone(),
                        updated_fields: changed.clone(),
                    })
                    .refreshing(RefreshScope::RowsAndDerived)
            }
        });
        result
    }

    #[instrument(skip(self))]
    pub async fn delete(&self, track_id: &str) -> Result<()> {
        let result = self.api.delete(track_id).await;
        self.finish(&result, |_| {
            Report::success("Track deleted")
                .with_event(TrackEvent::Deleted {
                    track_id: track_id.to_string(),
                })
                .refreshing(RefreshScope::RowsAndDerived)
        });
        result
    }

    #[instrument(skip(self, file), fields(file_name = %file.file_name))]
    pub async fn upload_file(&self, track_id: &str, file: TrackFile) -> Result<Track> {
        let result = self.api.upload_file(track_id, file).await;
        self.finish(&result, |track| {
            Report::success(format!("File uploaded for \"{}\"", track.title))
                .with_event(TrackEvent::FileAttached {
                    track_id: track.id.clone(),
                    file: track.audio_file.clone(),
                })
                .refreshing(RefreshScope::RowsAndDerived)
        });
        result
    }

    #[instrument(skip(self))]
    pub async fn remove_file(&self, track_id: &str) -> Result<Track> {
        let result = self.api.remove_file(track_id).await;
        self.finish(&result, |track| {
            Report::success(format!("File removed from \"{}\"", track.title))
                .with_event(TrackEvent::FileRemoved {
                    track_id: track.id.clone(),
                })
                .refreshing(RefreshScope::RowsAndDerived)
        });
        result
    }

    /// Delete many tracks in one request. An empty id list sends nothing.
    #[instrument(skip(self, ids), fields(count = ids.len()))]
    pub async fn bulk_delete(&self, ids: Vec<String>) -> Result<BulkDeleteOutcome> {
        if ids.is_empty() {
            self.close_dialog();
            return Ok(BulkDeleteOutcome::default());
        }

        let result = self.api.bulk_delete(&ids).await;
        self.finish(&result, |outcome| {
            let report = if outcome.is_complete_success() {
                Report::success(format!("Deleted {} track(s)", outcome.succeeded.len()))
            } else {
                Report::new(
                    NotificationLevel::Warning,
                    format!(
                        "Deleted {} of {} track(s); {} failed",
                        outcome.succeeded.len(),
                        outcome.total(),
                        outcome.failed.len()
                    ),
                )
            };
            report
                .with_event(TrackEvent::BulkDeleted {
                    succeeded: outcome.succeeded.clone(),
                    failed: outcome.failed.clone(),
                })
                .refreshing(RefreshScope::RowsAndDerived)
        });
        result
    }

    /// Close the dialog, then notify, publish and refresh according to `result`.
    fn finish<T, F>(&self, result: &Result<T>, report: F)
    where
        F: FnOnce(&T) -> Report,
    {
        self.close_dialog();

        match result {
            Ok(value) => {
                let report = report(value);
                info!(message = %report.message, "Mutation finished");
                self.events
                    .notify(Notification::new(report.level, report.message));
                if let Some(event) = report.event {
                    self.events.publish_track(event);
                }
                self.refresh(report.scope);
            }
            Err(err) => {
                warn!(kind = err.kind(), error = %err, "Mutation failed");
                self.events.notify(Notification::error(err.user_message()));
            }
        }
    }

    fn refresh(&self, scope: RefreshScope) {
        if scope == RefreshScope::Nothing {
            return;
        }
        self.primary.refetch();
        for list in &self.derived {
            list.refetch();
        }
    }
}

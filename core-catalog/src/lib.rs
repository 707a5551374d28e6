//! # Core Catalog Module
//!
//! Client-side state for browsing and editing a remote track catalog.
//!
//! ## Overview
//!
//! - [`transport`]: request construction, status-to-error mapping and
//!   cancellation on top of the `HttpClient` bridge
//! - [`resource`] and [`tracks`]: typed endpoints for the catalog resources
//! - [`query`]: paging, sorting, filtering and debounced search for the
//!   track list, with stale results discarded
//! - [`mutation`]: create, edit, delete, file upload and removal, each
//!   followed by a notification and a refresh of the affected lists
//! - [`selection`]: cross-page selection and bulk delete
//! - [`vocabulary`]: genre and artist name lists
//!
//! Everything that changes over time is published as a snapshot on a
//! `tokio::sync::watch` channel, so a host only needs to subscribe and render.

pub mod draft;
pub mod error;
pub mod models;
pub mod mutation;
pub mod query;
pub mod resource;
pub mod selection;
pub mod tracks;
pub mod transport;
pub mod vocabulary;

#[cfg(test)]
mod test_support;

pub use error::{AppError, FieldErrors, Result};
pub use models::{BulkDeleteOutcome, Meta, Page, Track, TrackDraft, TrackFile};
pub use mutation::{ActiveDialog, MutationCoordinator, UpdateOutcome};
pub use query::{
    FetchStatus, ListView, QueryController, QueryState, Refetch, SortField, SortMode, SortOrder,
};
pub use resource::ResourceClient;
pub use selection::{SelectionManager, SelectionView, VisibleRows};
pub use tracks::{TrackApi, TrackClient};
pub use transport::{ApiRequest, Outcome, Transport};
pub use vocabulary::{VocabularyList, VocabularyStatus, VocabularyView};

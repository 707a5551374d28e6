//! # Query Controller
//!
//! Owns the query state of one list view and keeps the displayed page in
//! step with it.
//!
//! ## Lifecycle
//!
//! `Idle → Fetching → Ready | Errored`, published as a [`ListView`] snapshot
//! on a `tokio::sync::watch` channel. Each change to page, limit, sort or a
//! filter cancels the fetch in flight and issues a new one. Search input is
//! debounced and applied once the user stops typing.
//!
//! ## Ordering guarantees
//!
//! Every issued fetch gets a generation number. A result commits only if its
//! generation is still the latest; anything older is dropped, even when it
//! resolves after a newer fetch has committed.
//!
//! ## Sorting
//!
//! [`SortField::mode`] decides where a column is sorted. Server columns are
//! sent as `sort`/`order` and the returned order is kept. The genres column
//! is sorted locally over the loaded page, so switching to it does not hit
//! the network.
//!
//! All mutating methods spawn onto the current Tokio runtime and must be
//! called from within one.

use crate::error::{AppError, Result};
use crate::models::{Meta, Page, Track};
use crate::tracks::TrackApi;
use crate::transport::Outcome;
use core_runtime::config::{CatalogConfig, DEFAULT_PAGE_SIZE, DEFAULT_SEARCH_DEBOUNCE, MAX_PAGE_SIZE};
use std::cmp::Reverse;
use std::fmt;
use std::str::FromStr;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

/// Re-issue the current request of a list. Implemented by every list that
/// mutations may invalidate.
pub trait Refetch: Send + Sync {
    fn refetch(&self);
}

/// Where ordering for a column is computed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortMode {
    /// Sent to the server; rows are shown in the order returned
    Server,
    /// Applied locally to the loaded page
    Client,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SortField {
    Title,
    Artist,
    Album,
    CreatedAt,
    Genres,
}

impl SortField {
    pub const ALL: [SortField; 5] = [
        SortField::Title,
        SortField::Artist,
        SortField::Album,
        SortField::CreatedAt,
        SortField::Genres,
    ];

    /// Wire name of the column.
    pub fn as_str(&self) -> &'static str {
        match self {
            SortField::Title => "title",
            SortField::Artist => "artist",
            SortField::Album => "album",
            SortField::CreatedAt => "createdAt",
            SortField::Genres => "genres",
        }
    }

    pub fn mode(&self) -> SortMode {
        match self {
            SortField::Genres => SortMode::Client,
            SortField::Title | SortField::Artist | SortField::Album | SortField::CreatedAt => {
                SortMode::Server
            }
        }
    }
}

impl fmt::Display for SortField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SortField {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        SortField::ALL
            .into_iter()
            .find(|field| field.as_str() == s)
            .ok_or_else(|| {
                let mut fields = crate::error::FieldErrors::new();
                fields.insert("sort".into(), format!("Unknown sort column '{}'", s));
                AppError::validation(fields, "Unknown sort column")
            })
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

impl SortOrder {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortOrder::Asc => "asc",
            SortOrder::Desc => "desc",
        }
    }

    pub fn reversed(&self) -> Self {
        match self {
            SortOrder::Asc => SortOrder::Desc,
            SortOrder::Desc => SortOrder::Asc,
        }
    }
}

/// Parameters governing one list fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryState {
    /// 1-based
    pub page: u32,
    pub limit: u32,
    pub sort_field: SortField,
    pub sort_order: SortOrder,
    pub genre_filter: Option<String>,
    pub artist_filter: Option<String>,
    pub search_term: Option<String>,
}

impl Default for QueryState {
    fn default() -> Self {
        Self {
            page: 1,
            limit: DEFAULT_PAGE_SIZE,
            sort_field: SortField::Title,
            sort_order: SortOrder::Asc,
            genre_filter: None,
            artist_filter: None,
            search_term: None,
        }
    }
}

impl QueryState {
    pub fn with_limit(limit: u32) -> Self {
        Self {
            limit: clamp_limit(limit),
            ..Self::default()
        }
    }

    /// Query parameters for `GET /api/tracks`. Empty filters are omitted and
    /// client-sorted columns send no `sort`/`order`.
    pub fn to_params(&self) -> Vec<(String, String)> {
        let mut params = vec![
            ("page".to_string(), self.page.to_string()),
            ("limit".to_string(), self.limit.to_string()),
        ];
        if self.sort_field.mode() == SortMode::Server {
            params.push(("sort".to_string(), self.sort_field.as_str().to_string()));
            params.push(("order".to_string(), self.sort_order.as_str().to_string()));
        }
        let filters = [
            ("genre", &self.genre_filter),
            ("artist", &self.artist_filter),
            ("search", &self.search_term),
        ];
        for (key, value) in filters {
            if let Some(value) = value {
                params.push((key.to_string(), value.clone()));
            }
        }
        params
    }
}

fn clamp_limit(limit: u32) -> u32 {
    limit.clamp(1, MAX_PAGE_SIZE)
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchStatus {
    /// Nothing requested yet, or the pending fetch was abandoned
    Idle,
    Fetching,
    Ready,
    /// Last fetch failed; the previous rows are still shown
    Errored(AppError),
}

impl FetchStatus {
    pub fn is_settled(&self) -> bool {
        !matches!(self, FetchStatus::Fetching)
    }

    pub fn error(&self) -> Option<&AppError> {
        match self {
            FetchStatus::Errored(err) => Some(err),
            _ => None,
        }
    }
}

/// Snapshot of a list view as the host should render it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListView {
    pub query: QueryState,
    pub status: FetchStatus,
    /// Rows in display order
    pub rows: Vec<Track>,
    pub meta: Meta,
    /// Search input waiting for the debounce to elapse
    pub pending_search: Option<String>,
}

impl ListView {
    fn initial(query: QueryState) -> Self {
        let meta = Meta::empty(query.limit);
        Self {
            query,
            status: FetchStatus::Idle,
            rows: Vec::new(),
            meta,
            pending_search: None,
        }
    }

    /// No fetch in flight and no search waiting to be applied.
    pub fn is_settled(&self) -> bool {
        self.status.is_settled() && self.pending_search.is_none()
    }

    pub fn row_ids(&self) -> Vec<String> {
        self.rows.iter().map(|t| t.id.clone()).collect()
    }
}

struct ControllerState {
    query: QueryState,
    /// Rows in the order the server returned them
    rows: Vec<Track>,
    meta: Meta,
    status: FetchStatus,
    generation: u64,
    in_flight: Option<CancellationToken>,
    search_generation: u64,
    pending_search: Option<String>,
}

impl ControllerState {
    fn display_rows(&self) -> Vec<Track> {
        let mut rows = self.rows.clone();
        if self.query.sort_field.mode() == SortMode::Client {
            sort_locally(&mut rows, self.query.sort_field, self.query.sort_order);
        }
        rows
    }
}

/// Stable ordering of a loaded page that ignores case and accents.
pub fn sort_locally(rows: &mut [Track], field: SortField, order: SortOrder) {
    let key = |track: &Track| -> String {
        match field {
            SortField::Title => collation_key(&track.title),
            SortField::Artist => collation_key(&track.artist),
            SortField::Album => collation_key(track.album.as_deref().unwrap_or_default()),
            SortField::CreatedAt => track.created_at.to_rfc3339(),
            SortField::Genres => collation_key(&track.genre_key()),
        }
    };
    match order {
        SortOrder::Asc => rows.sort_by_cached_key(key),
        SortOrder::Desc => rows.sort_by_cached_key(|t| Reverse(key(t))),
    }
}

/// Comparison form of a display string: decomposed, combining marks
/// removed, lowercased. `Électro` and `electro` compare equal.
pub fn collation_key(value: &str) -> String {
    value
        .nfd()
        .filter(|c| !is_combining_mark(*c))
        .flat_map(char::to_lowercase)
        .collect()
}

struct Inner {
    api: Arc<dyn TrackApi>,
    debounce: Duration,
    state: Mutex<ControllerState>,
    view: watch::Sender<ListView>,
}

/// Cheap to clone; clones drive the same view.
#[derive(Clone)]
pub struct QueryController {
    inner: Arc<Inner>,
}

impl fmt::Debug for QueryController {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueryController")
            .field("query", &self.query())
            .field("debounce", &self.inner.debounce)
            .finish()
    }
}

impl QueryController {
    /// Create an idle controller. Nothing is fetched until the first change
    /// or [`refetch`](Self::refetch).
    pub fn new(api: Arc<dyn TrackApi>, initial: QueryState, debounce: Duration) -> Self {
        let initial = QueryState {
            page: initial.page.max(1),
            limit: clamp_limit(initial.limit),
            ..initial
        };
        let (view, _) = watch::channel(ListView::initial(initial.clone()));
        let state = ControllerState {
            meta: Meta::empty(initial.limit),
            query: initial,
            rows: Vec::new(),
            status: FetchStatus::Idle,
            generation: 0,
            in_flight: None,
            search_generation: 0,
            pending_search: None,
        };

        Self {
            inner: Arc::new(Inner {
                api,
                debounce,
                state: Mutex::new(state),
                view,
            }),
        }
    }

    pub fn from_config(api: Arc<dyn TrackApi>, config: &CatalogConfig) -> Self {
        Self::new(
            api,
            QueryState::with_limit(config.page_size),
            config.search_debounce,
        )
    }

    pub fn with_defaults(api: Arc<dyn TrackApi>) -> Self {
        Self::new(api, QueryState::default(), DEFAULT_SEARCH_DEBOUNCE)
    }

    pub fn subscribe(&self) -> watch::Receiver<ListView> {
        self.inner.view.subscribe()
    }

    pub fn snapshot(&self) -> ListView {
        self.inner.view.borrow().clone()
    }

    pub fn query(&self) -> QueryState {
        self.inner.lock().query.clone()
    }

    /// Ids of the rows currently displayed, in display order.
    pub fn visible_ids(&self) -> Vec<String> {
        self.inner.view.borrow().row_ids()
    }

    /// Wait until no fetch is in flight and no search is pending.
    pub async fn settled(&self) -> ListView {
        let mut rx = self.subscribe();
        let settled = rx.wait_for(ListView::is_settled).await.map(|view| view.clone());
        settled.unwrap_or_else(|_| self.snapshot())
    }

    pub fn set_page(&self, page: u32) {
        let page = page.max(1);
        self.inner.update(|query| {
            if query.page == page {
                return false;
            }
            query.page = page;
            true
        });
    }

    /// Change the page size; returns to page 1.
    pub fn set_limit(&self, limit: u32) {
        let limit = clamp_limit(limit);
        self.inner.update(|query| {
            if query.limit == limit {
                return false;
            }
            query.limit = limit;
            query.page = 1;
            true
        });
    }

    /// Exact-match genre filter; `None` or blank clears it. Returns to page 1.
    pub fn set_genre_filter(&self, genre: Option<String>) {
        let genre = non_blank(genre);
        self.inner.update(|query| {
            if query.genre_filter == genre {
                return false;
            }
            query.genre_filter = genre;
            query.page = 1;
            true
        });
    }

    /// Exact-match artist filter; `None` or blank clears it. Returns to page 1.
    pub fn set_artist_filter(&self, artist: Option<String>) {
        let artist = non_blank(artist);
        self.inner.update(|query| {
            if query.artist_filter == artist {
                return false;
            }
            query.artist_filter = artist;
            query.page = 1;
            true
        });
    }

    /// Select the sort column and direction.
    ///
    /// Client-sorted columns reorder the loaded rows in place; server columns
    /// trigger a fetch.
    pub fn set_sort(&self, field: SortField, order: SortOrder) {
        let mut state = self.inner.lock();
        if state.query.sort_field == field && state.query.sort_order == order {
            return;
        }
        state.query.sort_field = field;
        state.query.sort_order = order;

        match field.mode() {
            SortMode::Client => debug!(sort = %field, "Sorting loaded rows locally"),
            SortMode::Server => self.inner.issue_fetch(&mut state),
        }
        self.inner.publish(&state);
    }

    /// Header-click behavior: the active column flips direction, another
    /// column starts ascending.
    pub fn toggle_sort(&self, field: SortField) {
        let current = self.query();
        let order = if current.sort_field == field {
            current.sort_order.reversed()
        } else {
            SortOrder::Asc
        };
        self.set_sort(field, order);
    }

    /// Record search input. The term is applied after the debounce interval
    /// passes without further input; only the last value is fetched.
    pub fn set_search(&self, input: impl Into<String>) {
        let input = input.into();
        let mut state = self.inner.lock();
        state.search_generation += 1;
        let generation = state.search_generation;
        state.pending_search = Some(input);
        self.inner.publish(&state);
        drop(state);

        let inner = Arc::clone(&self.inner);
        tokio::spawn(async move {
            tokio::time::sleep(inner.debounce).await;
            inner.commit_search(generation);
        });
    }

    /// Re-issue the current query.
    pub fn refetch(&self) {
        let mut state = self.inner.lock();
        self.inner.issue_fetch(&mut state);
        self.inner.publish(&state);
    }

    /// Abandon the fetch in flight and any pending search.
    pub fn cancel(&self) {
        let mut state = self.inner.lock();
        state.generation += 1;
        state.search_generation += 1;
        state.pending_search = None;
        if let Some(token) = state.in_flight.take() {
            token.cancel();
        }
        if state.status == FetchStatus::Fetching {
            state.status = FetchStatus::Idle;
        }
        self.inner.publish(&state);
    }
}

impl Refetch for QueryController {
    fn refetch(&self) {
        QueryController::refetch(self);
    }
}

impl Inner {
    fn lock(&self) -> MutexGuard<'_, ControllerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Apply a change to the query; fetch when `change` reports a difference.
    fn update<F>(self: &Arc<Self>, change: F)
    where
        F: FnOnce(&mut QueryState) -> bool,
    {
        let mut state = self.lock();
        if change(&mut state.query) {
            self.issue_fetch(&mut state);
            self.publish(&state);
        }
    }

    fn issue_fetch(self: &Arc<Self>, state: &mut ControllerState) {
        if let Some(previous) = state.in_flight.take() {
            previous.cancel();
        }
        state.generation += 1;
        state.status = FetchStatus::Fetching;

        let generation = state.generation;
        let token = CancellationToken::new();
        state.in_flight = Some(token.clone());
        let query = state.query.clone();
        debug!(generation, page = query.page, limit = query.limit, "Fetch issued");

        let inner = Arc::clone(self);
        tokio::spawn(async move {
            let outcome = inner.api.fetch_page(&query, &token).await;
            inner.commit(generation, outcome);
        });
    }

    fn commit(self: &Arc<Self>, generation: u64, outcome: Outcome<Page<Track>>) {
        let mut state = self.lock();
        if state.generation != generation {
            debug!(generation, latest = state.generation, "Discarding superseded result");
            return;
        }

        match outcome {
            Outcome::Cancelled => {
                debug!(generation, "Fetch cancelled");
            }
            Outcome::Settled(Ok(page)) => {
                let last_page = page.meta.last_page();
                if state.query.page > last_page {
                    debug!(
                        requested = state.query.page,
                        last_page, "Requested page out of range, clamping"
                    );
                    state.query.page = last_page;
                    self.issue_fetch(&mut state);
                } else {
                    debug!(generation, rows = page.items.len(), "Fetch committed");
                    state.in_flight = None;
                    state.rows = page.items;
                    state.meta = page.meta;
                    state.status = FetchStatus::Ready;
                }
                self.publish(&state);
            }
            Outcome::Settled(Err(err)) => {
                warn!(generation, error = %err, "Fetch failed");
                state.in_flight = None;
                state.status = FetchStatus::Errored(err);
                self.publish(&state);
            }
        }
    }

    fn commit_search(self: &Arc<Self>, generation: u64) {
        let mut state = self.lock();
        if state.search_generation != generation {
            return;
        }
        let term = non_blank(state.pending_search.take());
        if term != state.query.search_term {
            debug!(search = ?term, "Applying search");
            state.query.search_term = term;
            state.query.page = 1;
            self.issue_fetch(&mut state);
        }
        self.publish(&state);
    }

    fn publish(&self, state: &ControllerState) {
        self.view.send_replace(ListView {
            query: state.query.clone(),
            status: state.status.clone(),
            rows: state.display_rows(),
            meta: state.meta,
            pending_search: state.pending_search.clone(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support;

    fn track(id: &str, genres: &[&str]) -> Track {
        test_support::track(id, &format!("Track {}", id), genres)
    }

    #[test]
    fn test_sort_modes() {
        assert_eq!(SortField::Genres.mode(), SortMode::Client);
        for field in [SortField::Title, SortField::Artist, SortField::Album, SortField::CreatedAt] {
            assert_eq!(field.mode(), SortMode::Server);
        }
        assert_eq!("createdAt".parse::<SortField>().unwrap(), SortField::CreatedAt);
        assert!("year".parse::<SortField>().is_err());
    }

    #[test]
    fn test_params_omit_client_sort_and_empty_filters() {
        let query = QueryState {
            sort_field: SortField::Genres,
            search_term: Some("blue".into()),
            ..QueryState::default()
        };
        let params = query.to_params();
        let keys: Vec<&str> = params.iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(keys, vec!["page", "limit", "search"]);
    }

    #[test]
    fn test_genre_sort_orders_case_insensitively() {
        let mut rows = vec![
            track("1", &["Rock"]),
            track("2", &["Jazz", "Blues"]),
            track("3", &["ambient"]),
        ];
        sort_locally(&mut rows, SortField::Genres, SortOrder::Asc);
        let ids: Vec<&str> = rows.iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids, vec!["3", "2", "1"]);

        sort_locally(&mut rows, SortField::Genres, SortOrder::Desc);
        let ids: Vec<&str> = rows.iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids, vec!["1", "2", "3"]);
    }

    #[test]
    fn test_genre_sort_ignores_accents() {
        let mut rows = vec![
            track("1", &["Zouk"]),
            track("2", &["Électro"]),
            track("3", &["Ambient"]),
        ];
        sort_locally(&mut rows, SortField::Genres, SortOrder::Asc);
        let ids: Vec<&str> = rows.iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids, vec!["3", "2", "1"]);
    }

    #[test]
    fn test_collation_key() {
        assert_eq!(collation_key("Électro, Jazz"), "electro, jazz");
        assert_eq!(collation_key("Sigur Rós"), collation_key("sigur ros"));
        assert_eq!(collation_key("Ambient"), "ambient");
    }

    #[test]
    fn test_genre_sort_is_stable_for_ties() {
        let mut rows = vec![track("a", &["Pop"]), track("b", &["pop"]), track("c", &["POP"])];
        sort_locally(&mut rows, SortField::Genres, SortOrder::Desc);
        let ids: Vec<&str> = rows.iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_limit_is_clamped() {
        assert_eq!(QueryState::with_limit(0).limit, 1);
        assert_eq!(QueryState::with_limit(500).limit, MAX_PAGE_SIZE);
    }
}

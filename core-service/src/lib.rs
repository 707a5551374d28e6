//! Core service façade and bootstrap helpers.
//!
//! This crate wires a host-provided HTTP bridge into the catalog core and
//! hands out ready-to-use views. Desktop apps typically enable the
//! `desktop-shims` feature, which supplies a reqwest-backed bridge when the
//! configuration does not name one.
//!
//! ```ignore
//! use core_service::CatalogService;
//! use core_runtime::config::CatalogConfig;
//!
//! let config = CatalogConfig::builder().base_url("http://localhost:8000").build()?;
//! let service = CatalogService::new(config)?;
//! let view = service.open_tracks_view();
//! let rows = view.query.settled().await.rows;
//! ```

pub mod error;

pub use error::{CoreError, Result};

use std::fmt;
use std::sync::Arc;

use core_catalog::query::Refetch;
use core_catalog::resource::ResourceClient;
use core_catalog::vocabulary::{ARTISTS_RESOURCE, GENRES_RESOURCE};
use core_catalog::{
    MutationCoordinator, QueryController, SelectionManager, Track, TrackApi, TrackClient,
    Transport, VocabularyList,
};
use core_runtime::config::CatalogConfig;
use core_runtime::events::{EventBus, EventStream};
use tracing::info;

/// Primary façade exposed to host applications.
#[derive(Clone)]
pub struct CatalogService {
    config: CatalogConfig,
    transport: Arc<Transport>,
    tracks: Arc<dyn TrackApi>,
    events: EventBus,
}

impl fmt::Debug for CatalogService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CatalogService")
            .field("config", &self.config)
            .finish()
    }
}

impl CatalogService {
    /// Create a service from a validated configuration.
    pub fn new(config: CatalogConfig) -> Result<Self> {
        config.validate()?;
        let transport = Arc::new(Transport::from_config(&config));
        let tracks = Arc::new(TrackClient::new(Arc::clone(&transport)));
        Ok(Self::with_track_api(config, transport, tracks))
    }

    /// Use a custom [`TrackApi`] in place of the HTTP one. The transport is
    /// still used for the vocabulary lists.
    pub fn with_track_api(
        config: CatalogConfig,
        transport: Arc<Transport>,
        tracks: Arc<dyn TrackApi>,
    ) -> Self {
        info!(base_url = %config.base_url, "Catalog service ready");
        let events = EventBus::new(config.event_buffer_size);
        Self {
            config,
            transport,
            tracks,
            events,
        }
    }

    pub fn config(&self) -> &CatalogConfig {
        &self.config
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    /// Subscribe to notifications and track change events.
    pub fn subscribe(&self) -> EventStream {
        EventStream::new(self.events.subscribe())
    }

    pub fn tracks(&self) -> Arc<dyn TrackApi> {
        Arc::clone(&self.tracks)
    }

    /// Load one track for a detail page.
    pub async fn track_by_slug(&self, slug: &str) -> Result<Track> {
        Ok(self.tracks.get_by_slug(slug).await?)
    }

    pub fn genres(&self) -> VocabularyList {
        VocabularyList::new(ResourceClient::new(Arc::clone(&self.transport), GENRES_RESOURCE))
    }

    pub fn artists(&self) -> VocabularyList {
        VocabularyList::new(ResourceClient::new(Arc::clone(&self.transport), ARTISTS_RESOURCE))
    }

    /// Assemble the track list view and start loading it along with the
    /// genre and artist lists. Must be called inside a Tokio runtime.
    pub fn open_tracks_view(&self) -> TracksView {
        let query = QueryController::from_config(self.tracks(), &self.config);
        let genres = self.genres();
        let artists = self.artists();

        let mutations = Arc::new(MutationCoordinator::new(
            self.tracks(),
            self.events.clone(),
            Arc::new(query.clone()),
            vec![Arc::new(artists.clone()) as Arc<dyn Refetch>],
        ));
        let selection = SelectionManager::new(Arc::new(query.clone()), Arc::clone(&mutations));

        query.refetch();
        genres.load();
        artists.load();

        TracksView {
            query,
            mutations,
            selection,
            genres,
            artists,
        }
    }
}

/// Everything a track list screen binds to.
#[derive(Debug)]
pub struct TracksView {
    pub query: QueryController,
    pub mutations: Arc<MutationCoordinator>,
    pub selection: SelectionManager,
    pub genres: VocabularyList,
    pub artists: VocabularyList,
}

impl TracksView {
    /// Reload the rows and both name lists.
    pub fn refresh(&self) {
        self.query.refetch();
        self.genres.load();
        self.artists.load();
    }

    /// Wait until the rows and both name lists have settled.
    pub async fn settled(&self) {
        self.query.settled().await;
        self.genres.settled().await;
        self.artists.settled().await;
    }
}

/// Build a service against `base_url` with the default desktop HTTP bridge.
#[cfg(feature = "desktop-shims")]
pub fn bootstrap_desktop(base_url: impl Into<String>) -> Result<CatalogService> {
    let config = CatalogConfig::builder().base_url(base_url).build()?;
    CatalogService::new(config)
}

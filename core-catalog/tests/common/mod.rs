//! In-memory catalog server shared by the integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{Duration as ChronoDuration, TimeZone, Utc};
use core_catalog::query::SortMode;
use core_catalog::{
    AppError, BulkDeleteOutcome, Meta, Outcome, Page, QueryState, Result, SortField, SortOrder,
    Track, TrackApi, TrackDraft, TrackFile,
};
use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

pub fn track(id: &str, title: &str, genres: &[&str]) -> Track {
    Track {
        id: id.to_string(),
        slug: title.to_lowercase().replace(' ', "-"),
        title: title.to_string(),
        artist: "Artist".to_string(),
        album: None,
        genres: genres.iter().map(|g| g.to_string()).collect(),
        cover_image: None,
        created_at: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
            + ChronoDuration::minutes(id.parse().unwrap_or(0)),
        audio_file: None,
    }
}

/// `count` tracks with ids `1..=count` and zero-padded titles, so title
/// order matches id order.
pub fn numbered(count: usize) -> Vec<Track> {
    (1..=count)
        .map(|n| track(&n.to_string(), &format!("Track {:03}", n), &["Rock"]))
        .collect()
}

/// Behaves like the catalog backend: filters, sorts and paginates the
/// tracks it holds, and applies mutations to them.
pub struct FakeCatalog {
    tracks: Mutex<Vec<Track>>,
    fetches: Mutex<Vec<QueryState>>,
    delays: Mutex<VecDeque<Duration>>,
    failures: Mutex<VecDeque<AppError>>,
    honor_cancellation: bool,
    next_id: Mutex<u32>,
}

impl FakeCatalog {
    pub fn new(tracks: Vec<Track>) -> Self {
        Self {
            next_id: Mutex::new(tracks.len() as u32 + 1000),
            tracks: Mutex::new(tracks),
            fetches: Mutex::new(Vec::new()),
            delays: Mutex::new(VecDeque::new()),
            failures: Mutex::new(VecDeque::new()),
            honor_cancellation: true,
        }
    }

    /// Keep answering after the caller gave up on a fetch.
    pub fn ignoring_cancellation(mut self) -> Self {
        self.honor_cancellation = false;
        self
    }

    /// Delay the next fetches by the given durations, in call order.
    pub fn delay_fetches(&self, delays: impl IntoIterator<Item = Duration>) {
        self.delays.lock().unwrap().extend(delays);
    }

    pub fn fail_next_fetch(&self, err: AppError) {
        self.failures.lock().unwrap().push_back(err);
    }

    pub fn fetches(&self) -> Vec<QueryState> {
        self.fetches.lock().unwrap().clone()
    }

    pub fn fetch_count(&self) -> usize {
        self.fetches.lock().unwrap().len()
    }

    pub fn ids(&self) -> Vec<String> {
        self.tracks.lock().unwrap().iter().map(|t| t.id.clone()).collect()
    }

    fn find(&self, id: &str) -> Result<Track> {
        self.tracks
            .lock()
            .unwrap()
            .iter()
            .find(|t| t.id == id)
            .cloned()
            .ok_or_else(|| AppError::not_found("tracks", "Track not found"))
    }

    fn modify(&self, id: &str, change: impl FnOnce(&mut Track)) -> Result<Track> {
        let mut tracks = self.tracks.lock().unwrap();
        let track = tracks
            .iter_mut()
            .find(|t| t.id == id)
            .ok_or_else(|| AppError::not_found("tracks", "Track not found"))?;
        change(track);
        Ok(track.clone())
    }

    fn page_for(&self, query: &QueryState) -> Page<Track> {
        let mut rows: Vec<Track> = self
            .tracks
            .lock()
            .unwrap()
            .iter()
            .filter(|t| {
                query
                    .genre_filter
                    .as_ref()
                    .map_or(true, |g| t.genres.contains(g))
            })
            .filter(|t| query.artist_filter.as_ref().map_or(true, |a| &t.artist == a))
            .filter(|t| {
                query.search_term.as_ref().map_or(true, |s| {
                    let s = s.to_lowercase();
                    t.title.to_lowercase().contains(&s) || t.artist.to_lowercase().contains(&s)
                })
            })
            .cloned()
            .collect();

        if query.sort_field.mode() == SortMode::Server {
            rows.sort_by_key(|t| match query.sort_field {
                SortField::Artist => t.artist.to_lowercase(),
                SortField::Album => t.album.clone().unwrap_or_default().to_lowercase(),
                SortField::CreatedAt => t.created_at.to_rfc3339(),
                _ => t.title.to_lowercase(),
            });
            if query.sort_order == SortOrder::Desc {
                rows.reverse();
            }
        }

        let total = rows.len() as u64;
        let limit = query.limit.max(1);
        let total_pages = (total as u32).div_ceil(limit);
        let start = ((query.page - 1) * limit) as usize;
        let items = rows.into_iter().skip(start).take(limit as usize).collect();
        Page::new(
            items,
            Meta {
                total,
                page: query.page,
                limit,
                total_pages,
            },
        )
    }
}

#[async_trait]
impl TrackApi for FakeCatalog {
    async fn fetch_page(
        &self,
        query: &QueryState,
        cancel: &CancellationToken,
    ) -> Outcome<Page<Track>> {
        self.fetches.lock().unwrap().push(query.clone());
        let delay = self.delays.lock().unwrap().pop_front().unwrap_or_default();
        if self.honor_cancellation {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => return Outcome::Cancelled,
                _ = tokio::time::sleep(delay) => {}
            }
        } else {
            tokio::time::sleep(delay).await;
        }

        if let Some(err) = self.failures.lock().unwrap().pop_front() {
            return Outcome::Settled(Err(err));
        }
        Outcome::Settled(Ok(self.page_for(query)))
    }

    async fn get_by_slug(&self, slug: &str) -> Result<Track> {
        self.tracks
            .lock()
            .unwrap()
            .iter()
            .find(|t| t.slug == slug)
            .cloned()
            .ok_or_else(|| AppError::not_found("tracks", "Track not found"))
    }

    async fn get_by_id(&self, id: &str) -> Result<Track> {
        self.find(id)
    }

    async fn create(&self, draft: &TrackDraft) -> Result<Track> {
        let id = {
            let mut next = self.next_id.lock().unwrap();
            *next += 1;
            next.to_string()
        };
        let mut created = track(&id, &draft.title, &[]);
        created.artist = draft.artist.clone();
        created.album = draft.album.clone();
        created.genres = draft.genres.clone();
        created.cover_image = draft.cover_image.clone();
        self.tracks.lock().unwrap().push(created.clone());
        Ok(created)
    }

    async fn update(&self, id: &str, draft: &TrackDraft) -> Result<Track> {
        let draft = draft.clone();
        self.modify(id, move |t| {
            t.title = draft.title;
            t.artist = draft.artist;
            t.album = draft.album;
            t.genres = draft.genres;
            t.cover_image = draft.cover_image;
        })
    }

    async fn delete(&self, id: &str) -> Result<()> {
        let mut tracks = self.tracks.lock().unwrap();
        let before = tracks.len();
        tracks.retain(|t| t.id != id);
        if tracks.len() == before {
            return Err(AppError::not_found("tracks", "Track not found"));
        }
        Ok(())
    }

    async fn upload_file(&self, id: &str, file: TrackFile) -> Result<Track> {
        self.modify(id, |t| t.audio_file = Some(file.file_name))
    }

    async fn remove_file(&self, id: &str) -> Result<Track> {
        self.modify(id, |t| t.audio_file = None)
    }

    async fn bulk_delete(&self, ids: &[String]) -> Result<BulkDeleteOutcome> {
        let mut tracks = self.tracks.lock().unwrap();
        let mut outcome = BulkDeleteOutcome::default();
        for id in ids {
            let before = tracks.len();
            tracks.retain(|t| &t.id != id);
            if tracks.len() < before {
                outcome.succeeded.push(id.clone());
            } else {
                outcome.failed.push(id.clone());
            }
        }
        Ok(outcome)
    }
}

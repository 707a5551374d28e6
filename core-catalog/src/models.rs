//! Catalog data model and its wire representation.

use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// A catalog item as returned by the API.
///
/// `id` and `slug` are assigned by the server and never change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Track {
    pub id: String,
    pub slug: String,
    pub title: String,
    pub artist: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub album: Option<String>,
    #[serde(default)]
    pub genres: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cover_image: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audio_file: Option<String>,
}

impl Track {
    /// Editable fields of this track, as an editor would be prefilled.
    pub fn draft(&self) -> TrackDraft {
        TrackDraft {
            title: self.title.clone(),
            artist: self.artist.clone(),
            album: self.album.clone().filter(|a| !a.is_empty()),
            genres: self.genres.clone(),
            cover_image: self.cover_image.clone().filter(|c| !c.is_empty()),
        }
    }

    pub fn has_audio(&self) -> bool {
        self.audio_file.as_deref().is_some_and(|f| !f.is_empty())
    }

    /// Comma-joined genre list used for client-side ordering.
    pub fn genre_key(&self) -> String {
        self.genres.join(", ")
    }
}

/// Editable field set submitted on create and update.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackDraft {
    pub title: String,
    pub artist: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub album: Option<String>,
    #[serde(default)]
    pub genres: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cover_image: Option<String>,
}

impl TrackDraft {
    pub fn new(title: impl Into<String>, artist: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            artist: artist.into(),
            ..Self::default()
        }
    }

    pub fn with_album(mut self, album: impl Into<String>) -> Self {
        self.album = Some(album.into());
        self
    }

    pub fn with_genres<I, S>(mut self, genres: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.genres = genres.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_cover_image(mut self, url: impl Into<String>) -> Self {
        self.cover_image = Some(url.into());
        self
    }

    /// Names (wire spelling) of the fields whose value differs from `track`.
    pub fn changed_fields(&self, track: &Track) -> Vec<String> {
        let original = track.draft();
        let mut changed = Vec::new();
        if self.title != original.title {
            changed.push("title".to_string());
        }
        if self.artist != original.artist {
            changed.push("artist".to_string());
        }
        if self.album != original.album {
            changed.push("album".to_string());
        }
        if self.genres != original.genres {
            changed.push("genres".to_string());
        }
        if self.cover_image != original.cover_image {
            changed.push("coverImage".to_string());
        }
        changed
    }
}

/// Pagination metadata as reported by the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Meta {
    pub total: u64,
    pub page: u32,
    pub limit: u32,
    pub total_pages: u32,
}

impl Meta {
    /// Metadata for a list that has not been loaded yet.
    pub fn empty(limit: u32) -> Self {
        Self {
            total: 0,
            page: 1,
            limit,
            total_pages: 1,
        }
    }

    /// Highest page the UI may show; never below 1.
    pub fn last_page(&self) -> u32 {
        self.total_pages.max(1)
    }
}

/// One page of a paginated listing (`{ data, meta }` on the wire).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page<T> {
    #[serde(rename = "data")]
    pub items: Vec<T>,
    pub meta: Meta,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, meta: Meta) -> Self {
        Self { items, meta }
    }

    pub fn has_next(&self) -> bool {
        self.meta.page < self.meta.total_pages
    }

    pub fn has_previous(&self) -> bool {
        self.meta.page > 1
    }

    pub fn map<U, F>(self, f: F) -> Page<U>
    where
        F: FnMut(T) -> U,
    {
        Page {
            items: self.items.into_iter().map(f).collect(),
            meta: self.meta,
        }
    }
}

/// Partition of a bulk delete request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BulkDeleteOutcome {
    #[serde(rename = "success", default)]
    pub succeeded: Vec<String>,
    #[serde(default)]
    pub failed: Vec<String>,
}

impl BulkDeleteOutcome {
    /// Align a server answer with the ids that were requested.
    ///
    /// Result: every requested id appears exactly once, in request order, in
    /// either `succeeded` or `failed`. Ids the server did not report as
    /// deleted count as failed; ids it reported but nobody asked for are
    /// dropped.
    pub fn reconcile(requested: &[String], reported: BulkDeleteOutcome) -> Self {
        let deleted: HashSet<&str> = reported
            .succeeded
            .iter()
            .map(String::as_str)
            .collect();
        let rejected: HashSet<&str> = reported.failed.iter().map(String::as_str).collect();

        let mut seen = HashSet::new();
        let mut outcome = BulkDeleteOutcome::default();
        for id in requested {
            if !seen.insert(id.as_str()) {
                continue;
            }
            if deleted.contains(id.as_str()) && !rejected.contains(id.as_str()) {
                outcome.succeeded.push(id.clone());
            } else {
                outcome.failed.push(id.clone());
            }
        }
        outcome
    }

    pub fn total(&self) -> usize {
        self.succeeded.len() + self.failed.len()
    }

    pub fn is_complete_success(&self) -> bool {
        self.failed.is_empty()
    }
}

/// A picked audio file ready to be uploaded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackFile {
    pub file_name: String,
    pub content_type: Option<String>,
    pub data: Bytes,
}

impl TrackFile {
    pub fn new(file_name: impl Into<String>, data: impl Into<Bytes>) -> Self {
        Self {
            file_name: file_name.into(),
            content_type: None,
            data: data.into(),
        }
    }

    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    pub fn size(&self) -> usize {
        self.data.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(values: &[&str]) -> Vec<String> {
        values.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_track_wire_format() {
        let json = r#"{
            "id": "1",
            "slug": "blue-monday",
            "title": "Blue Monday",
            "artist": "New Order",
            "genres": ["Electronic", "Synth-pop"],
            "coverImage": "https://img.example.com/bm.jpg",
            "createdAt": "2024-03-01T12:00:00.000Z"
        }"#;

        let track: Track = serde_json::from_str(json).unwrap();
        assert_eq!(track.slug, "blue-monday");
        assert_eq!(track.album, None);
        assert_eq!(track.audio_file, None);
        assert!(!track.has_audio());
        assert_eq!(track.genre_key(), "Electronic, Synth-pop");

        let out = serde_json::to_value(&track).unwrap();
        assert_eq!(out["coverImage"], "https://img.example.com/bm.jpg");
        assert!(out.get("audioFile").is_none());
    }

    #[test]
    fn test_page_wire_format() {
        let json = r#"{"data": [], "meta": {"total": 41, "page": 5, "limit": 10, "totalPages": 5}}"#;
        let page: Page<Track> = serde_json::from_str(json).unwrap();
        assert!(page.items.is_empty());
        assert_eq!(page.meta.total_pages, 5);
        assert!(page.has_previous());
        assert!(!page.has_next());
    }

    #[test]
    fn test_meta_last_page_never_zero() {
        let meta = Meta {
            total: 0,
            page: 1,
            limit: 10,
            total_pages: 0,
        };
        assert_eq!(meta.last_page(), 1);
    }

    #[test]
    fn test_changed_fields() {
        let track: Track = serde_json::from_str(
            r#"{"id":"1","slug":"s","title":"A","artist":"B","album":"","genres":["Rock"],"createdAt":"2024-01-01T00:00:00Z"}"#,
        )
        .unwrap();

        assert!(track.draft().changed_fields(&track).is_empty());

        let edited = track.draft().with_genres(["Rock", "Jazz"]).with_album("Live");
        assert_eq!(edited.changed_fields(&track), vec!["album", "genres"]);
    }

    #[test]
    fn test_bulk_outcome_reconcile_partition() {
        let requested = ids(&["a", "b", "c", "a", "d"]);
        let reported = BulkDeleteOutcome {
            succeeded: ids(&["a", "c", "zzz"]),
            failed: ids(&["b"]),
        };

        let outcome = BulkDeleteOutcome::reconcile(&requested, reported);
        assert_eq!(outcome.succeeded, ids(&["a", "c"]));
        assert_eq!(outcome.failed, ids(&["b", "d"]));
        assert_eq!(outcome.total(), 4);
        assert!(!outcome.is_complete_success());
    }

    #[test]
    fn test_bulk_outcome_wire_names() {
        let outcome: BulkDeleteOutcome =
            serde_json::from_str(r#"{"success": ["1"], "failed": []}"#).unwrap();
        assert_eq!(outcome.succeeded, ids(&["1"]));
        assert!(outcome.is_complete_success());
    }
}

//! Local validation and normalization of track drafts.
//!
//! Create and update run these before any request is sent, so an invalid
//! editor submission never costs a round trip.

use crate::error::{AppError, FieldErrors, Result};
use crate::models::TrackDraft;
use url::Url;

/// Check the editable fields of a draft.
///
/// Rules: title and artist are required, at least one genre is selected, and
/// the cover image is either empty or an absolute http(s) URL.
pub fn validate_draft(draft: &TrackDraft) -> Result<()> {
    let mut errors = FieldErrors::new();

    if draft.title.trim().is_empty() {
        errors.insert("title".into(), "Title is required".into());
    }
    if draft.artist.trim().is_empty() {
        errors.insert("artist".into(), "Artist is required".into());
    }
    if draft.genres.iter().all(|g| g.trim().is_empty()) {
        errors.insert("genres".into(), "Select at least one genre".into());
    }
    if let Some(cover) = draft.cover_image.as_deref().map(str::trim) {
        if !cover.is_empty() && !is_web_url(cover) {
            errors.insert("coverImage".into(), "Invalid URL".into());
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(AppError::validation(errors, "Please fix the highlighted fields"))
    }
}

fn is_web_url(value: &str) -> bool {
    Url::parse(value)
        .map(|url| matches!(url.scheme(), "http" | "https") && url.has_host())
        .unwrap_or(false)
}

/// Canonical form of a draft as submitted to the server.
///
/// Title and album are trimmed, the artist is title-cased, genres are trimmed
/// and de-duplicated in order, and blank optional fields become `None`.
pub fn normalize_draft(draft: TrackDraft) -> TrackDraft {
    let mut genres: Vec<String> = Vec::with_capacity(draft.genres.len());
    for genre in draft.genres {
        let genre = genre.trim();
        if !genre.is_empty() && !genres.iter().any(|g| g == genre) {
            genres.push(genre.to_string());
        }
    }

    TrackDraft {
        title: draft.title.trim().to_string(),
        artist: to_title_case(&draft.artist),
        album: non_blank(draft.album),
        genres,
        cover_image: non_blank(draft.cover_image),
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Collapse whitespace and capitalize every word.
///
/// ```
/// use core_catalog::draft::to_title_case;
///
/// assert_eq!(to_title_case("  gUnS   n’   rOsEs  "), "Guns N’ Roses");
/// ```
pub fn to_title_case(input: &str) -> String {
    input
        .split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first
                    .to_uppercase()
                    .chain(chars.as_str().to_lowercase().chars())
                    .collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<String>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid() -> TrackDraft {
        TrackDraft::new("Blue Monday", "New Order").with_genres(["Electronic"])
    }

    #[test]
    fn test_valid_draft_passes() {
        assert!(validate_draft(&valid()).is_ok());
        assert!(validate_draft(&valid().with_cover_image("")).is_ok());
        assert!(validate_draft(&valid().with_cover_image("https://img.example.com/a.png")).is_ok());
    }

    #[test]
    fn test_missing_required_fields() {
        let err = validate_draft(&TrackDraft::new("  ", "")).unwrap_err();
        let AppError::Validation { field_errors, .. } = &err else {
            panic!("expected validation error, got {:?}", err);
        };
        assert_eq!(field_errors.len(), 3);
        assert_eq!(field_errors["title"], "Title is required");
        assert_eq!(field_errors["artist"], "Artist is required");
        assert_eq!(field_errors["genres"], "Select at least one genre");
        assert_eq!(
            err.user_message(),
            "artist: Artist is required; genres: Select at least one genre; title: Title is required"
        );
    }

    #[test]
    fn test_cover_image_must_be_web_url() {
        for bad in ["not a url", "ftp://host/a.png", "/relative.png"] {
            let err = validate_draft(&valid().with_cover_image(bad)).unwrap_err();
            assert!(
                matches!(&err, AppError::Validation { field_errors, .. } if field_errors.contains_key("coverImage")),
                "{} should be rejected",
                bad
            );
        }
    }

    #[test]
    fn test_normalize_draft() {
        let draft = TrackDraft::new("  Blue Monday ", "  nEW   oRDER ")
            .with_album("   ")
            .with_genres([" Electronic", "Electronic", "", "Synth-pop"])
            .with_cover_image("");

        let normalized = normalize_draft(draft);
        assert_eq!(normalized.title, "Blue Monday");
        assert_eq!(normalized.artist, "New Order");
        assert_eq!(normalized.album, None);
        assert_eq!(normalized.genres, vec!["Electronic", "Synth-pop"]);
        assert_eq!(normalized.cover_image, None);
    }

    #[test]
    fn test_title_case() {
        assert_eq!(to_title_case("the BEATLES"), "The Beatles");
        assert_eq!(to_title_case("ÉDITH piaf"), "Édith Piaf");
        assert_eq!(to_title_case("   "), "");
    }
}

//! Playlist document parsing
//!
//! Accepts the published `{"items": [...]}` document or a bare array and
//! normalizes each entry into a [`SlideRecord`]. Undisplayable entries are
//! dropped with a warning; the rest keep their order.

use crate::error::Result;
use crate::record::{RawSlide, SlideRecord};
use serde::Deserialize;
use std::collections::HashSet;
use tracing::{debug, warn};
use url::Url;

#[derive(Deserialize)]
#[serde(untagged)]
enum PlaylistDocument {
    Wrapped { items: Vec<RawSlide> },
    Bare(Vec<RawSlide>),
}

/// Parse and normalize a playlist document
///
/// Duplicate ids are disambiguated with the entry position so every record
/// stays uniquely addressable.
pub fn parse_playlist(json: &str, base: Option<&Url>) -> Result<Vec<SlideRecord>> {
    let items = match serde_json::from_str::<PlaylistDocument>(json)? {
        PlaylistDocument::Wrapped { items } | PlaylistDocument::Bare(items) => items,
    };

    let total = items.len();
    let mut seen = HashSet::new();
    let mut records = Vec::with_capacity(total);

    for (position, raw) in items.into_iter().enumerate() {
        let label = raw.id.clone().unwrap_or_else(|| format!("#{position}"));
        let Some(mut record) = SlideRecord::from_raw(raw, position, base) else {
            warn!(entry = %label, "Dropping playlist entry with unresolved kind or locator");
            continue;
        };

        if !seen.insert(record.id.clone()) {
            let unique = format!("{}-{}", record.id, position);
            warn!(id = %record.id, renamed = %unique, "Duplicate slide id");
            record.id = unique;
            seen.insert(record.id.clone());
        }

        records.push(record);
    }

    debug!(total, kept = records.len(), "Playlist normalized");
    Ok(records)
}

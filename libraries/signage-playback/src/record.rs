//! Slide records and kind classification
//!
//! A [`SlideRecord`] is the canonical, immutable description of one playlist
//! entry. Loose upstream entries ([`RawSlide`]) are normalized once, so the
//! scheduler never re-infers a slide's kind.

use crate::media::HLS_MIME_TYPES;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use url::Url;

const IMAGE_EXTENSIONS: [&str; 9] = [
    "png", "jpg", "jpeg", "gif", "webp", "bmp", "svg", "avif", "ico",
];

/// Kind of content a slide shows
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SlideKind {
    Image,
    Video,
    Text,
}

/// Rendering policy for the slide's visual
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Fit {
    /// Letterbox: whole asset visible
    #[default]
    Contain,

    /// Fill the stage, cropping overflow
    Cover,
}

impl Fit {
    fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "contain" => Some(Fit::Contain),
            "cover" => Some(Fit::Cover),
            _ => None,
        }
    }

    /// Fit for a decoded image
    ///
    /// Portrait assets are always contained so nothing gets cropped off
    /// the top and bottom of a landscape display.
    pub fn for_image(requested: Option<Fit>, width: u32, height: u32) -> Fit {
        if height > width {
            Fit::Contain
        } else {
            requested.unwrap_or_default()
        }
    }

    /// Fit for a video once its intrinsic size is known
    ///
    /// An explicit fit on the record wins; otherwise portrait video is
    /// contained and landscape video covers the stage.
    pub fn for_video(requested: Option<Fit>, size: Option<(u32, u32)>) -> Fit {
        if let Some(fit) = requested {
            return fit;
        }
        match size {
            Some((width, height)) if width > 0 && height > 0 && height > width => Fit::Contain,
            _ => Fit::Cover,
        }
    }
}

/// One playlist entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SlideRecord {
    /// Unique identifier
    pub id: String,

    /// Display label (may be empty)
    pub title: String,

    pub kind: SlideKind,

    /// Absolute resource locator (empty only for inline text slides)
    pub src: String,

    /// Raw MIME type, kept for streaming detection
    pub media_type: Option<String>,

    /// Preview locator (image fallback, video poster frame)
    pub poster: Option<String>,

    /// Display time in seconds for image/text slides
    pub duration: Option<f64>,

    pub fit: Option<Fit>,

    /// Inline payload for text slides
    pub text: Option<String>,
}

impl SlideRecord {
    fn new(id: impl Into<String>, kind: SlideKind, src: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: String::new(),
            kind,
            src: src.into(),
            media_type: None,
            poster: None,
            duration: None,
            fit: None,
            text: None,
        }
    }

    pub fn image(id: impl Into<String>, src: impl Into<String>) -> Self {
        Self::new(id, SlideKind::Image, src)
    }

    pub fn video(id: impl Into<String>, src: impl Into<String>) -> Self {
        Self::new(id, SlideKind::Video, src)
    }

    pub fn text(id: impl Into<String>, text: impl Into<String>) -> Self {
        let mut record = Self::new(id, SlideKind::Text, String::new());
        record.text = Some(text.into());
        record
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    /// Set the display duration; non-positive or non-finite values are discarded
    pub fn with_duration(mut self, seconds: f64) -> Self {
        self.duration = sanitize_duration(Some(seconds));
        self
    }

    pub fn with_fit(mut self, fit: Fit) -> Self {
        self.fit = Some(fit);
        self
    }

    pub fn with_media_type(mut self, media_type: impl Into<String>) -> Self {
        self.media_type = Some(media_type.into());
        self
    }

    pub fn with_poster(mut self, poster: impl Into<String>) -> Self {
        self.poster = Some(poster.into());
        self
    }

    /// How long an image/text slide stays up
    ///
    /// Durations beyond what `Duration` can hold saturate.
    pub fn display_duration(&self, default: Duration) -> Duration {
        sanitize_duration(self.duration)
            .map(|seconds| Duration::try_from_secs_f64(seconds).unwrap_or(Duration::MAX))
            .unwrap_or(default)
    }

    /// Locator to render for an image slide (src, falling back to poster)
    pub fn display_src(&self) -> Option<&str> {
        if self.src.is_empty() {
            self.poster.as_deref().filter(|p| !p.is_empty())
        } else {
            Some(&self.src)
        }
    }

    /// Whether the source is an HLS manifest
    pub fn is_hls(&self) -> bool {
        let by_type = self.media_type.as_deref().is_some_and(|t| {
            let t = t.trim();
            HLS_MIME_TYPES.iter().any(|hls| t.eq_ignore_ascii_case(hls))
        });
        by_type || path_extension(&self.src).as_deref() == Some("m3u8")
    }

    /// Normalize a loose upstream entry
    ///
    /// `position` seeds the id when the entry has none. Relative locators are
    /// resolved against `base`. Returns `None` when the entry cannot be
    /// displayed: unknown kind, or no usable locator.
    pub fn from_raw(raw: RawSlide, position: usize, base: Option<&Url>) -> Option<Self> {
        let src = raw
            .src
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .and_then(|s| resolve_locator(s, base));
        let poster = raw
            .poster
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .and_then(|s| resolve_locator(s, base));

        let hint = raw.kind.as_deref().or(raw.media_type.as_deref());
        let probe = src.as_deref().or(poster.as_deref()).unwrap_or_default();
        let kind = classify(hint, probe)?;

        let src = match kind {
            SlideKind::Video => src?,
            SlideKind::Image => {
                if src.is_none() && poster.is_none() {
                    return None;
                }
                src.unwrap_or_default()
            }
            SlideKind::Text => {
                let has_text = raw.text.as_deref().is_some_and(|t| !t.is_empty());
                if src.is_none() && !has_text {
                    return None;
                }
                src.unwrap_or_default()
            }
        };

        let seconds = raw
            .duration
            .as_ref()
            .and_then(serde_json::Value::as_f64)
            .or_else(|| {
                raw.duration_ms
                    .as_ref()
                    .and_then(serde_json::Value::as_f64)
                    .map(|ms| ms / 1000.0)
            });

        Some(Self {
            id: raw
                .id
                .filter(|id| !id.is_empty())
                .unwrap_or_else(|| format!("slide-{position}")),
            title: raw.title.unwrap_or_default(),
            kind,
            src,
            media_type: raw.media_type,
            poster,
            duration: sanitize_duration(seconds),
            fit: raw.fit.as_deref().and_then(Fit::parse),
            text: raw.text,
        })
    }
}

/// Playlist entry as published upstream, before normalization
///
/// Numeric fields are kept as raw JSON so one malformed entry does not
/// reject the whole document.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawSlide {
    pub id: Option<String>,
    pub title: Option<String>,
    #[serde(rename = "type")]
    pub media_type: Option<String>,
    /// Explicit kind hint ("image", "video", "text")
    pub kind: Option<String>,
    pub src: Option<String>,
    pub poster: Option<String>,
    pub duration: Option<serde_json::Value>,
    pub duration_ms: Option<serde_json::Value>,
    pub fit: Option<String>,
    pub text: Option<String>,
}

/// Classify a loose type hint plus locator into a slide kind
///
/// Accepts MIME types ("image/png"), wildcards ("image/*") and bare
/// families ("video"). HLS manifest types count as video. Without a usable
/// hint, an image file extension on the locator classifies as image;
/// anything else is unresolved.
pub fn classify(type_hint: Option<&str>, src: &str) -> Option<SlideKind> {
    if let Some(hint) = type_hint {
        let essence = hint
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase();
        let family = essence.split('/').next().unwrap_or_default();

        match family {
            "image" => return Some(SlideKind::Image),
            "video" => return Some(SlideKind::Video),
            "text" => return Some(SlideKind::Text),
            _ => {}
        }

        if HLS_MIME_TYPES.contains(&essence.as_str()) {
            return Some(SlideKind::Video);
        }
    }

    let extension = path_extension(src)?;
    IMAGE_EXTENSIONS
        .contains(&extension.as_str())
        .then_some(SlideKind::Image)
}

/// Keep a duration only if it is finite and positive
pub fn sanitize_duration(seconds: Option<f64>) -> Option<f64> {
    seconds.filter(|s| s.is_finite() && *s > 0.0)
}

/// Lowercased extension of the locator's last path segment
fn path_extension(src: &str) -> Option<String> {
    let path = src.split(['?', '#']).next().unwrap_or_default();
    let segment = path.rsplit('/').next().unwrap_or_default();
    let (stem, extension) = segment.rsplit_once('.')?;
    if stem.is_empty() || extension.is_empty() {
        return None;
    }
    Some(extension.to_ascii_lowercase())
}

fn resolve_locator(locator: &str, base: Option<&Url>) -> Option<String> {
    if Url::parse(locator).is_ok() {
        return Some(locator.to_string());
    }
    base?.join(locator).ok().map(String::from)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn raw(value: serde_json::Value) -> RawSlide {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn classify_mime_families() {
        assert_eq!(classify(Some("image/png"), ""), Some(SlideKind::Image));
        assert_eq!(classify(Some("image/*"), ""), Some(SlideKind::Image));
        assert_eq!(classify(Some("IMAGE"), ""), Some(SlideKind::Image));
        assert_eq!(
            classify(Some("video/mp4; codecs=\"avc1\""), ""),
            Some(SlideKind::Video)
        );
        assert_eq!(classify(Some("video"), ""), Some(SlideKind::Video));
        assert_eq!(classify(Some("text/plain"), ""), Some(SlideKind::Text));
        assert_eq!(
            classify(Some("application/vnd.apple.mpegurl"), ""),
            Some(SlideKind::Video)
        );
        assert_eq!(
            classify(Some("application/x-mpegURL"), ""),
            Some(SlideKind::Video)
        );
    }

    #[test]
    fn classify_falls_back_to_image_extension() {
        assert_eq!(
            classify(None, "https://cdn.example/a/photo.JPG?v=2"),
            Some(SlideKind::Image)
        );
        assert_eq!(
            classify(Some("application/octet-stream"), "https://cdn.example/p.webp#x"),
            Some(SlideKind::Image)
        );
        assert_eq!(classify(None, "https://cdn.example/clip.mp4"), None);
        assert_eq!(classify(None, "https://cdn.example/noext"), None);
        assert_eq!(classify(None, ""), None);
    }

    #[test]
    fn sanitize_discards_invalid_durations() {
        assert_eq!(sanitize_duration(Some(7.0)), Some(7.0));
        assert_eq!(sanitize_duration(Some(0.0)), None);
        assert_eq!(sanitize_duration(Some(-3.0)), None);
        assert_eq!(sanitize_duration(Some(f64::NAN)), None);
        assert_eq!(sanitize_duration(Some(f64::INFINITY)), None);
        assert_eq!(sanitize_duration(None), None);
    }

    #[test]
    fn display_duration_uses_default_when_absent() {
        let default = Duration::from_secs(5);
        let image = SlideRecord::image("a", "https://x/a.png");
        assert_eq!(image.display_duration(default), default);
        assert_eq!(
            image.clone().with_duration(7.0).display_duration(default),
            Duration::from_secs(7)
        );
        assert_eq!(image.with_duration(-1.0).display_duration(default), default);
    }

    #[test]
    fn display_duration_saturates_huge_values() {
        let default = Duration::from_secs(5);
        let image = SlideRecord::image("a", "https://x/a.png").with_duration(1e20);
        assert_eq!(image.duration, Some(1e20));
        assert_eq!(image.display_duration(default), Duration::MAX);
    }

    #[test]
    fn from_raw_normalizes_entry() {
        let record = SlideRecord::from_raw(
            raw(json!({
                "id": "local-slide",
                "title": "Local Slide",
                "src": "slide-offline.png",
                "type": "image/png",
                "duration": 5,
                "fit": "Cover"
            })),
            0,
            Some(&Url::parse("file:///srv/signage/").unwrap()),
        )
        .unwrap();

        assert_eq!(record.id, "local-slide");
        assert_eq!(record.kind, SlideKind::Image);
        assert_eq!(record.src, "file:///srv/signage/slide-offline.png");
        assert_eq!(record.duration, Some(5.0));
        assert_eq!(record.fit, Some(Fit::Cover));
    }

    #[test]
    fn from_raw_accepts_duration_ms_and_drops_bad_values() {
        let with_ms = SlideRecord::from_raw(
            raw(json!({"src": "https://x/a.png", "durationMs": 2500})),
            3,
            None,
        )
        .unwrap();
        assert_eq!(with_ms.id, "slide-3");
        assert_eq!(with_ms.duration, Some(2.5));

        let bad = SlideRecord::from_raw(
            raw(json!({"src": "https://x/a.png", "duration": "soon"})),
            0,
            None,
        )
        .unwrap();
        assert_eq!(bad.duration, None);

        let negative = SlideRecord::from_raw(
            raw(json!({"src": "https://x/a.png", "duration": -4})),
            0,
            None,
        )
        .unwrap();
        assert_eq!(negative.duration, None);
    }

    #[test]
    fn from_raw_drops_undisplayable_entries() {
        // Unknown type, no image extension
        assert!(SlideRecord::from_raw(
            raw(json!({"src": "https://x/clip.bin", "type": "application/zip"})),
            0,
            None
        )
        .is_none());

        // Relative locator with no base
        assert!(SlideRecord::from_raw(
            raw(json!({"src": "clip.mp4", "type": "video/mp4"})),
            0,
            None
        )
        .is_none());

        // Text without payload or locator
        assert!(SlideRecord::from_raw(raw(json!({"kind": "text"})), 0, None).is_none());
    }

    #[test]
    fn from_raw_image_falls_back_to_poster() {
        let record = SlideRecord::from_raw(
            raw(json!({"type": "image/*", "poster": "https://x/poster.jpg"})),
            0,
            None,
        )
        .unwrap();
        assert!(record.src.is_empty());
        assert_eq!(record.display_src(), Some("https://x/poster.jpg"));
    }

    #[test]
    fn explicit_kind_hint_wins_over_type() {
        let record = SlideRecord::from_raw(
            raw(json!({"kind": "text", "type": "image/png", "text": "Welcome"})),
            0,
            None,
        )
        .unwrap();
        assert_eq!(record.kind, SlideKind::Text);
        assert_eq!(record.text.as_deref(), Some("Welcome"));
    }

    #[test]
    fn hls_detection() {
        assert!(SlideRecord::video("v", "https://x/live/index.m3u8?token=1").is_hls());
        assert!(SlideRecord::video("v", "https://x/live")
            .with_media_type("application/vnd.apple.mpegurl")
            .is_hls());
        assert!(!SlideRecord::video("v", "https://x/clip.mp4")
            .with_media_type("video/mp4")
            .is_hls());
    }

    #[test]
    fn image_fit_portrait_override() {
        assert_eq!(Fit::for_image(Some(Fit::Cover), 1080, 1920), Fit::Contain);
        assert_eq!(Fit::for_image(Some(Fit::Cover), 1920, 1080), Fit::Cover);
        assert_eq!(Fit::for_image(None, 1920, 1080), Fit::Contain);
    }

    #[test]
    fn video_fit_from_size() {
        assert_eq!(Fit::for_video(None, Some((720, 1280))), Fit::Contain);
        assert_eq!(Fit::for_video(None, Some((1280, 720))), Fit::Cover);
        assert_eq!(Fit::for_video(None, None), Fit::Cover);
        assert_eq!(Fit::for_video(Some(Fit::Contain), Some((1280, 720))), Fit::Contain);
    }
}

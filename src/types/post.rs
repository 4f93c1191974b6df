//! Post records as produced by the offline ingestion step.
//!
//! Posts are trusted input and never mutated after loading.

use std::collections::HashMap;

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};

/// A latitude/longitude pair in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lng: f64,
}

impl GeoPoint {
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }
}

/// The single interactive map a post may carry in place of a legacy iframe.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmbeddedMap {
    /// `[lat, lng]`, matching the ingestion output.
    pub center: (f64, f64),
    pub zoom: u8,
    #[serde(default)]
    pub title: String,
}

impl EmbeddedMap {
    pub fn center_point(&self) -> GeoPoint {
        GeoPoint::new(self.center.0, self.center.1)
    }
}

/// A reader comment carried over from the original blog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comment {
    pub author: String,
    #[serde(default)]
    pub date: String,
    pub text: String,
}

/// One blog post.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    pub id: String,
    pub title: String,

    /// Legacy HTML body.
    pub content: String,

    /// RFC 3339 publish timestamp, used for chronological ordering.
    #[serde(default)]
    pub published: Option<String>,

    /// Pre-formatted display date, when ingestion supplied one.
    #[serde(default)]
    pub formatted_date: Option<String>,

    #[serde(default)]
    pub author: Option<String>,

    /// Image paths, addressed by `ContentBlock::ImageRef` occurrence index.
    #[serde(default)]
    pub images: Vec<String>,

    #[serde(default)]
    pub videos: Vec<String>,

    #[serde(default)]
    pub video_captions: HashMap<String, String>,

    #[serde(default)]
    pub embedded_map: Option<EmbeddedMap>,

    #[serde(default)]
    pub comments: Vec<Comment>,
}

impl Post {
    /// Create a post with only the fields the segmenter looks at.
    pub fn new(id: impl Into<String>, title: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            content: content.into(),
            published: None,
            formatted_date: None,
            author: None,
            images: Vec::new(),
            videos: Vec::new(),
            video_captions: HashMap::new(),
            embedded_map: None,
            comments: Vec::new(),
        }
    }

    /// Builder: set image paths.
    pub fn with_images<I, S>(mut self, images: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.images = images.into_iter().map(Into::into).collect();
        self
    }

    /// Builder: set video paths.
    pub fn with_videos<I, S>(mut self, videos: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.videos = videos.into_iter().map(Into::into).collect();
        self
    }

    /// Builder: attach the embedded map.
    pub fn with_map(mut self, map: EmbeddedMap) -> Self {
        self.embedded_map = Some(map);
        self
    }

    /// Builder: set the publish timestamp.
    pub fn published(mut self, timestamp: impl Into<String>) -> Self {
        self.published = Some(timestamp.into());
        self
    }

    pub fn has_videos(&self) -> bool {
        !self.videos.is_empty()
    }

    pub fn has_embedded_map(&self) -> bool {
        self.embedded_map.is_some()
    }

    /// Parsed publish timestamp, if present and well-formed.
    pub fn published_at(&self) -> Option<DateTime<FixedOffset>> {
        self.published
            .as_deref()
            .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
    }

    /// Long display date, e.g. `Saturday, August 2, 2008`.
    pub fn display_date(&self) -> Option<String> {
        if let Some(date) = &self.formatted_date {
            return Some(date.clone());
        }
        self.published_at()
            .map(|dt| dt.format("%A, %B %-d, %Y").to_string())
    }

    /// Short date used to group posts into chapters, e.g. `Aug 2`.
    pub fn short_date(&self) -> Option<String> {
        self.published_at().map(|dt| dt.format("%b %-d").to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserializes_ingestion_record() {
        let json = r#"{
            "id": "2443287259016875260",
            "title": "The CAR",
            "content": "<p>Veggie oil</p>",
            "published": "2008-08-02T10:15:00-04:00",
            "images": ["/media/car.jpg"],
            "videoCaptions": {"/videos/a.mov": "Loading up"},
            "embeddedMap": {"center": [46.1, -60.2], "zoom": 9, "title": "Day one"}
        }"#;
        let post: Post = serde_json::from_str(json).unwrap();

        assert_eq!(post.images, vec!["/media/car.jpg"]);
        assert!(post.videos.is_empty());
        assert_eq!(post.video_captions["/videos/a.mov"], "Loading up");
        let map = post.embedded_map.unwrap();
        assert_eq!(map.center_point(), GeoPoint::new(46.1, -60.2));
        assert_eq!(map.zoom, 9);
    }

    #[test]
    fn display_date_prefers_formatted() {
        let mut post = Post::new("1", "t", "").published("2008-08-02T10:15:00-04:00");
        assert_eq!(post.display_date().as_deref(), Some("Saturday, August 2, 2008"));
        assert_eq!(post.short_date().as_deref(), Some("Aug 2"));

        post.formatted_date = Some("Early August".into());
        assert_eq!(post.display_date().as_deref(), Some("Early August"));
    }

    #[test]
    fn malformed_date_is_absent() {
        let post = Post::new("1", "t", "").published("last tuesday");
        assert!(post.published_at().is_none());
        assert!(post.display_date().is_none());
    }
}

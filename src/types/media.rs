//! Gallery entries derived from post blocks.

use serde::Serialize;

use super::GeoPoint;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum MediaKind {
    Image,
    Video,
    Map,
    /// Synthetic title card opening each post's run in the global index.
    PostHeader,
}

/// One slot in the cross-post gallery.
///
/// Paths are stored as they appear in the post metadata; the deployment
/// base path is applied by whoever emits URLs.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaItem {
    pub kind: MediaKind,

    /// Empty for maps and headers.
    pub source_path: String,
    pub alt_text: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub caption: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub map_center: Option<GeoPoint>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub map_zoom: Option<u8>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub post_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub post_title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub post_date: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub photo_locations: Vec<GeoPoint>,

    /// Video only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub poster_image: Option<String>,
}

impl MediaItem {
    fn empty(kind: MediaKind) -> Self {
        Self {
            kind,
            source_path: String::new(),
            alt_text: String::new(),
            caption: None,
            map_center: None,
            map_zoom: None,
            post_id: None,
            post_title: None,
            post_date: None,
            photo_locations: Vec::new(),
            poster_image: None,
        }
    }

    pub fn image(path: impl Into<String>, alt: impl Into<String>, caption: impl Into<String>) -> Self {
        Self {
            source_path: path.into(),
            alt_text: alt.into(),
            caption: Some(caption.into()),
            ..Self::empty(MediaKind::Image)
        }
    }

    pub fn video(path: impl Into<String>, caption: impl Into<String>) -> Self {
        let caption = caption.into();
        Self {
            source_path: path.into(),
            alt_text: caption.clone(),
            caption: Some(caption),
            ..Self::empty(MediaKind::Video)
        }
    }

    pub fn map(center: GeoPoint, zoom: u8, alt: impl Into<String>, caption: Option<String>) -> Self {
        Self {
            alt_text: alt.into(),
            caption,
            map_center: Some(center),
            map_zoom: Some(zoom),
            ..Self::empty(MediaKind::Map)
        }
    }

    pub fn post_header(
        post_id: impl Into<String>,
        title: impl Into<String>,
        date: Option<String>,
        photo_locations: Vec<GeoPoint>,
    ) -> Self {
        let title = title.into();
        Self {
            alt_text: title.clone(),
            post_id: Some(post_id.into()),
            post_title: Some(title),
            post_date: date,
            photo_locations,
            ..Self::empty(MediaKind::PostHeader)
        }
    }

    /// Builder: record the owning post.
    pub fn owned_by(mut self, post_id: impl Into<String>) -> Self {
        self.post_id = Some(post_id.into());
        self
    }

    /// Builder: attach a video poster frame.
    pub fn with_poster(mut self, poster: Option<String>) -> Self {
        self.poster_image = poster;
        self
    }

    #[inline]
    pub fn is_header(&self) -> bool {
        self.kind == MediaKind::PostHeader
    }
}

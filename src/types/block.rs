//! Typed content blocks produced by the segmenter.

use serde::Serialize;

/// One unit of a post body, in original document order.
///
/// Media variants carry indices into the post's side lists rather than
/// paths, so a block may point past the end of its list. Such references
/// are dangling and are dropped by consumers.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ContentBlock {
    /// Cleaned HTML fragment. Never blank.
    Text {
        html: String,
        #[serde(rename = "isHeading")]
        is_heading: bool,
    },

    /// Index into `Post::images`.
    ImageRef {
        #[serde(rename = "imageIndex")]
        image_index: usize,
    },

    /// Index into `Post::videos`.
    VideoRef {
        #[serde(rename = "videoIndex")]
        video_index: usize,
    },

    /// The post's `embedded_map`, if it has one.
    MapRef,
}

impl ContentBlock {
    pub fn text(html: impl Into<String>) -> Self {
        Self::Text {
            html: html.into(),
            is_heading: false,
        }
    }

    pub fn heading(html: impl Into<String>) -> Self {
        Self::Text {
            html: html.into(),
            is_heading: true,
        }
    }

    pub fn is_media(&self) -> bool {
        !matches!(self, Self::Text { .. })
    }
}

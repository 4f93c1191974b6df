//! Data model shared by the segmenter, the indexer and the renderer.

mod block;
mod html_safe;
mod media;
mod post;

pub use block::ContentBlock;
pub use html_safe::{EscapeHtml, HtmlSafe};
pub use media::{MediaItem, MediaKind};
pub use post::{Comment, EmbeddedMap, GeoPoint, Post};

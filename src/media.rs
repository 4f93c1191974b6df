//! Cross-post gallery index.
//!
//! Every post's media, in document order, concatenated in post order into
//! one flat list. Each post with at least one item is opened by a synthetic
//! header entry, and `post_offsets` records where each post's run begins so
//! that a `(post id, local index)` pair resolves to an absolute slot.

use std::collections::HashMap;
use std::ops::Range;

use serde::Serialize;

use crate::segment::SegmentCache;
use crate::tables::{DEFAULT_IMAGE_CAPTION, MediaTables};
use crate::types::{ContentBlock, MediaItem, Post};

/// Flat gallery list plus per-post starting offsets.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GlobalMediaIndex {
    pub items: Vec<MediaItem>,
    pub post_offsets: HashMap<String, usize>,
}

impl GlobalMediaIndex {
    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&MediaItem> {
        self.items.get(index)
    }

    pub fn offset_of(&self, post_id: &str) -> Option<usize> {
        self.post_offsets.get(post_id).copied()
    }

    /// Slots owned by a post, header included. Empty for a post with no media.
    pub fn post_range(&self, post_id: &str) -> Option<Range<usize>> {
        let start = self.offset_of(post_id)?;
        let is_own_header = self
            .items
            .get(start)
            .is_some_and(|item| item.is_header() && item.post_id.as_deref() == Some(post_id));
        if !is_own_header {
            return Some(start..start);
        }

        let end = self.items[start + 1..]
            .iter()
            .position(MediaItem::is_header)
            .map_or(self.items.len(), |n| start + 1 + n);
        Some(start..end)
    }

    /// Absolute slot of a post's `local_index`-th media item.
    pub fn resolve(&self, post_id: &str, local_index: usize) -> Option<usize> {
        let range = self.post_range(post_id)?;
        let index = range.start + 1 + local_index;
        range.contains(&index).then_some(index)
    }

    /// Next slot, wrapping from the last entry to the first.
    pub fn next(&self, index: usize) -> Option<usize> {
        match self.items.len() {
            0 => None,
            len => Some((index + 1) % len),
        }
    }

    /// Previous slot, wrapping from the first entry to the last.
    pub fn previous(&self, index: usize) -> Option<usize> {
        match self.items.len() {
            0 => None,
            len => Some((index % len + len - 1) % len),
        }
    }

    /// The header introducing the run that contains `index`.
    pub fn header_for(&self, index: usize) -> Option<&MediaItem> {
        self.items
            .get(..=index.min(self.items.len().checked_sub(1)?))?
            .iter()
            .rev()
            .find(|item| item.is_header())
    }
}

/// Whether a media block points at something the post actually has.
pub fn resolves(post: &Post, block: &ContentBlock) -> bool {
    match block {
        ContentBlock::Text { .. } => false,
        ContentBlock::ImageRef { image_index } => *image_index < post.images.len(),
        ContentBlock::VideoRef { video_index } => *video_index < post.videos.len(),
        ContentBlock::MapRef => post.embedded_map.is_some(),
    }
}

/// Project a post's blocks into gallery items, in block order.
///
/// References past the end of the post's image or video list are skipped,
/// as is a map reference on a post without a map.
pub fn media_items(post: &Post, blocks: &[ContentBlock], tables: &MediaTables) -> Vec<MediaItem> {
    blocks
        .iter()
        .filter_map(|block| media_item(post, block, tables))
        .collect()
}

fn media_item(post: &Post, block: &ContentBlock, tables: &MediaTables) -> Option<MediaItem> {
    let item = match block {
        ContentBlock::Text { .. } => return None,
        ContentBlock::ImageRef { image_index } => {
            let path = post.images.get(*image_index)?;
            let caption = tables.image_caption(path);
            let alt = caption.map_or_else(|| format!("Photo from {}", post.title), str::to_string);
            MediaItem::image(path, alt, caption.unwrap_or(DEFAULT_IMAGE_CAPTION))
        }
        ContentBlock::VideoRef { video_index } => {
            let path = post.videos.get(*video_index)?;
            MediaItem::video(path, tables.video_caption(post, path))
                .with_poster(tables.poster_for(path).map(str::to_string))
        }
        ContentBlock::MapRef => {
            let map = post.embedded_map.as_ref()?;
            let (alt, caption) = if map.title.trim().is_empty() {
                ("Route map".to_string(), None)
            } else {
                (map.title.clone(), Some(map.title.clone()))
            };
            MediaItem::map(map.center_point(), map.zoom, alt, caption)
        }
    };
    Some(item.owned_by(&post.id))
}

/// Segment a post and project its media.
pub fn extract_post_media(post: &Post, tables: &MediaTables) -> Vec<MediaItem> {
    media_items(post, &crate::segment::segment_post(post), tables)
}

/// Build the gallery index over posts in chronological order.
pub fn build_global_index(posts: &[Post], tables: &MediaTables) -> GlobalMediaIndex {
    build_global_index_with(posts, tables, &mut SegmentCache::new())
}

/// As [`build_global_index`], reusing segmentation results from `cache`.
pub fn build_global_index_with(
    posts: &[Post],
    tables: &MediaTables,
    cache: &mut SegmentCache,
) -> GlobalMediaIndex {
    let mut index = GlobalMediaIndex::default();

    for post in posts {
        // Recorded even for posts without media, where it points at the
        // next post's first slot.
        index.post_offsets.insert(post.id.clone(), index.items.len());

        let media = media_items(post, cache.get_or_segment(post), tables);
        if media.is_empty() {
            continue;
        }

        index.items.push(MediaItem::post_header(
            &post.id,
            &post.title,
            post.display_date(),
            tables.photo_locations(post),
        ));
        index.items.extend(media);
    }

    index
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;
    use crate::tables::{DEFAULT_VIDEO_CAPTION, ImageMatch};
    use crate::types::{EmbeddedMap, GeoPoint, MediaKind};

    fn kinds(index: &GlobalMediaIndex) -> Vec<MediaKind> {
        index.items.iter().map(|i| i.kind).collect()
    }

    fn three_posts() -> Vec<Post> {
        vec![
            Post::new("A", "Berry Heaven", "<p>x</p><img src=1><p>y</p><img src=2>")
                .with_images(["/media/a0.jpg", "/media/a1.jpg"]),
            Post::new("B", "Resettlement", "<p>No pictures today.</p>"),
            Post::new("C", "Cooking", "<object><embed src=old></object>")
                .with_videos(["/videos/cooking1.mov"]),
        ]
    }

    #[test]
    fn headers_and_offsets_across_posts() {
        let index = build_global_index(&three_posts(), &MediaTables::new());

        assert_eq!(
            kinds(&index),
            vec![
                MediaKind::PostHeader,
                MediaKind::Image,
                MediaKind::Image,
                MediaKind::PostHeader,
                MediaKind::Video,
            ]
        );
        assert_eq!(index.offset_of("A"), Some(0));
        assert_eq!(index.offset_of("B"), Some(3));
        assert_eq!(index.offset_of("C"), Some(3));
        assert_eq!(index.items[3].post_id.as_deref(), Some("C"));
        assert_eq!(index.items[4].source_path, "/videos/cooking1.mov");
    }

    #[test]
    fn offset_for_empty_post_points_at_next_run() {
        let posts = vec![
            Post::new("A", "a", "<img src=1>").with_images(["/media/a0.jpg"]),
            Post::new("B", "b", "<p>text</p>"),
            Post::new("C", "c", "<img src=1>").with_images(["/media/c0.jpg"]),
        ];
        let index = build_global_index(&posts, &MediaTables::new());
        assert_eq!(index.offset_of("A"), Some(0));
        assert_eq!(index.offset_of("B"), Some(2));
        assert_eq!(index.offset_of("C"), Some(2));
        assert_eq!(index.post_range("B"), Some(2..2));
        assert_eq!(index.post_range("C"), Some(2..4));
    }

    #[test]
    fn every_run_starts_with_its_header_and_is_contiguous() {
        let index = build_global_index(&three_posts(), &MediaTables::new());
        for id in ["A", "C"] {
            let range = index.post_range(id).unwrap();
            let header = &index.items[range.start];
            assert!(header.is_header());
            assert_eq!(header.post_id.as_deref(), Some(id));
            for item in &index.items[range.start + 1..range.end] {
                assert!(!item.is_header());
                assert_eq!(item.post_id.as_deref(), Some(id));
            }
        }
    }

    #[test]
    fn dangling_references_are_dropped() {
        let post = Post::new("p", "Scenery", "<img src=1><img src=2><object></object>")
            .with_images(["/media/only.jpg"]);
        let media = extract_post_media(&post, &MediaTables::new());
        assert_eq!(media.len(), 1);
        assert_eq!(media[0].source_path, "/media/only.jpg");
    }

    #[test]
    fn resolves_matches_projection() {
        let post = Post::new("p", "t", "").with_images(["/media/a.jpg"]);
        let blocks = [
            ContentBlock::text("x"),
            ContentBlock::ImageRef { image_index: 0 },
            ContentBlock::ImageRef { image_index: 1 },
            ContentBlock::VideoRef { video_index: 0 },
            ContentBlock::MapRef,
        ];
        let resolved = blocks.iter().filter(|b| resolves(&post, b)).count();
        assert_eq!(resolved, 1);
        assert_eq!(media_items(&post, &blocks, &MediaTables::new()).len(), resolved);
    }

    #[test]
    fn missing_captions_fall_back() {
        let post = Post::new("p", "Heading South", "<img src=1><object></object><img src=2>")
            .with_images(["/media/a.jpg", "/media/b.jpg"])
            .with_videos(["/videos/v.mp4"]);
        let tables = MediaTables::new()
            .image_captions(HashMap::from([("/media/b.jpg".to_string(), "Gas bar".to_string())]));

        let media = extract_post_media(&post, &tables);
        assert_eq!(media[0].caption.as_deref(), Some(DEFAULT_IMAGE_CAPTION));
        assert_eq!(media[0].alt_text, "Photo from Heading South");
        assert_eq!(media[1].caption.as_deref(), Some(DEFAULT_VIDEO_CAPTION));
        assert_eq!(media[1].alt_text, DEFAULT_VIDEO_CAPTION);
        assert_eq!(media[2].caption.as_deref(), Some("Gas bar"));
        assert_eq!(media[2].alt_text, "Gas bar");
    }

    #[test]
    fn map_and_video_details() {
        let post = Post::new("p", "The Choice Was Clear", "<iframe src=g></iframe><object></object>")
            .with_videos(["/videos/ferry.mp4"])
            .with_map(EmbeddedMap {
                center: (47.57, -59.13),
                zoom: 8,
                title: String::new(),
            });
        let tables = MediaTables::new().video_thumbnails(HashMap::from([(
            "/videos/ferry.mp4".to_string(),
            "/video-thumbs/ferry.jpg".to_string(),
        )]));

        let media = extract_post_media(&post, &tables);
        assert_eq!(media[0].kind, MediaKind::Map);
        assert_eq!(media[0].alt_text, "Route map");
        assert_eq!(media[0].caption, None);
        assert_eq!(media[0].map_center, Some(GeoPoint::new(47.57, -59.13)));
        assert_eq!(media[0].map_zoom, Some(8));
        assert_eq!(media[1].poster_image.as_deref(), Some("/video-thumbs/ferry.jpg"));
        assert!(media.iter().all(|m| m.post_id.as_deref() == Some("p")));
    }

    #[test]
    fn header_carries_title_date_and_locations() {
        let post = Post::new("p", "Grand Bruit", "<img src=1>")
            .with_images(["/media/g.jpg"])
            .published("2008-09-08T12:00:00-02:30");
        let tables = MediaTables::new().image_matches(HashMap::from([(
            "/media/g.jpg".to_string(),
            ImageMatch {
                latitude: 47.67,
                longitude: -58.2,
                geotagged_path: None,
                date_time: None,
            },
        )]));

        let index = build_global_index(&[post], &tables);
        let header = &index.items[0];
        assert_eq!(header.post_title.as_deref(), Some("Grand Bruit"));
        assert_eq!(header.alt_text, "Grand Bruit");
        assert_eq!(header.post_date.as_deref(), Some("Monday, September 8, 2008"));
        assert_eq!(header.photo_locations, vec![GeoPoint::new(47.67, -58.2)]);
    }

    #[test]
    fn resolve_skips_header() {
        let index = build_global_index(&three_posts(), &MediaTables::new());
        assert_eq!(index.resolve("A", 0), Some(1));
        assert_eq!(index.resolve("A", 1), Some(2));
        assert_eq!(index.resolve("A", 2), None);
        assert_eq!(index.resolve("C", 0), Some(4));
        assert_eq!(index.resolve("B", 0), None);
        assert_eq!(index.resolve("missing", 0), None);
    }

    #[test]
    fn navigation_wraps_at_both_ends() {
        let index = build_global_index(&three_posts(), &MediaTables::new());
        assert_eq!(index.next(2), Some(3));
        assert_eq!(index.next(4), Some(0));
        assert_eq!(index.previous(0), Some(4));
        assert_eq!(index.previous(3), Some(2));
        assert_eq!(GlobalMediaIndex::default().next(0), None);
    }

    #[test]
    fn header_for_finds_governing_post() {
        let index = build_global_index(&three_posts(), &MediaTables::new());
        assert_eq!(index.header_for(2).and_then(|h| h.post_id.as_deref()), Some("A"));
        assert_eq!(index.header_for(4).and_then(|h| h.post_id.as_deref()), Some("C"));
        assert_eq!(index.header_for(99).and_then(|h| h.post_id.as_deref()), Some("C"));
        assert!(GlobalMediaIndex::default().header_for(0).is_none());
    }

    #[test]
    fn cached_and_uncached_builds_agree() {
        let posts = three_posts();
        let tables = MediaTables::new();
        let mut cache = SegmentCache::new();
        cache.warm(&posts);
        assert_eq!(
            build_global_index_with(&posts, &tables, &mut cache),
            build_global_index(&posts, &tables)
        );
    }
}

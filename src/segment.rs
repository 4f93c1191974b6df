//! Content segmentation: legacy post HTML into ordered typed blocks.
//!
//! The body is rewritten by a fixed sequence of string passes. Media tags
//! are swapped for comment placeholders carrying an occurrence index, the
//! markup is cleaned, and the result is split on paragraph boundaries into
//! [`ContentBlock`]s. Each pass is a total function over strings; malformed
//! markup falls through as text.
//!
//! Pass order matters. The image pass runs after iframes and objects are
//! gone so that it never numbers an image inside a stale embed, and the
//! structural cleanup runs after the image pass so that anchors emptied by
//! it can be removed.

use std::collections::HashMap;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::LazyLock;

use rayon::prelude::*;
use regex::{Captures, Regex};

use crate::types::{ContentBlock, Post};

/// Inline marker left where an old video embed has nothing to point at.
pub const VIDEO_UNAVAILABLE: &str = "<p><em>[Video no longer available]</em></p>";

/// Inline marker left where an iframe is dropped from a post with no other media.
pub const EMBEDDED_CONTENT: &str = "<p><em>[Embedded content]</em></p>";

const MAP_PLACEHOLDER: &str = "<!--EMBEDDED_MAP_PLACEHOLDER-->";

static OBJECT_EMBED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)<object[^>]*>[\s\S]*?</object>").unwrap());

static EMBED_TAG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)<embed[^>]*>").unwrap());

static IFRAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)<iframe[^>]*>[\s\S]*?</iframe>").unwrap());

static LARGER_MAP_LINK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)<small[^>]*>[\s\S]*?View Larger Map[\s\S]*?</small>").unwrap()
});

// One alternation so that wrapped and bare images are numbered in a single
// left-to-right scan. The wrapped form may not cross a closing anchor before
// reaching its image.
static IMAGE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)<a(?:\s[^>]*)?>(?:[^<]|<[^/]|</[^a])*?<img[^>]*>[\s\S]*?</a>|<img[^>]*>")
        .unwrap()
});

static EMPTY_ANCHOR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)<a(?:\s[^>]*)?>\s*</a>").unwrap());

static EMPTY_DIV: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)<div[^>]*>\s*</div>").unwrap());

static TABLE_TAG: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)</?(?:table|thead|tbody|tfoot|tr|td|th)(?:\s[^>]*)?>").unwrap()
});

static BREAK_RUN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)(?:<br\s*/?>\s*){3,}").unwrap());

static WHITESPACE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());

static PARAGRAPH: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)</?p(?:\s[^>]*)?>").unwrap());

static PLACEHOLDER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"<!--(?:IMG_PLACEHOLDER_(\d+)|VIDEO_PLACEHOLDER_(\d+)|(EMBEDDED_MAP_PLACEHOLDER))-->")
        .unwrap()
});

static HEADING: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)<h[1-6](?:\s[^>]*)?>").unwrap());

static BREAK: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)<br\s*/?>").unwrap());

static NBSP: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)&nbsp;").unwrap());

fn image_placeholder(index: usize) -> String {
    format!("<!--IMG_PLACEHOLDER_{index}-->")
}

fn video_placeholder(index: usize) -> String {
    format!("<!--VIDEO_PLACEHOLDER_{index}-->")
}

/// Segment a post body into blocks.
pub fn segment(content: &str, has_videos: bool, has_embedded_map: bool) -> Vec<ContentBlock> {
    let html = normalize_video_embeds(content, has_videos);
    let html = normalize_map_embeds(&html, has_embedded_map, has_videos);
    let html = strip_dead_links(&html);
    let html = substitute_images(&html);
    let html = structural_cleanup(&html);
    filter_empty(split_paragraphs(&html))
}

/// Segment a post using its own video and map metadata.
pub fn segment_post(post: &Post) -> Vec<ContentBlock> {
    segment(&post.content, post.has_videos(), post.has_embedded_map())
}

/// Stage 1: `<object>` video embeds.
///
/// Each becomes a video placeholder numbered in document order when the post
/// has videos attached, otherwise a "no longer available" marker. Stray
/// `<embed>` tags are dropped.
pub fn normalize_video_embeds(html: &str, has_videos: bool) -> String {
    let mut next = 0;
    let replaced = OBJECT_EMBED.replace_all(html, |_: &Captures<'_>| {
        if has_videos {
            let placeholder = video_placeholder(next);
            next += 1;
            placeholder
        } else {
            VIDEO_UNAVAILABLE.to_string()
        }
    });
    EMBED_TAG.replace_all(&replaced, "").into_owned()
}

/// Stage 2: `<iframe>` embeds.
///
/// With a map attached, the first iframe becomes the map placeholder and any
/// later ones are removed. Without a map, iframes are removed when the post
/// has videos and replaced by an "embedded content" marker when it has none.
pub fn normalize_map_embeds(html: &str, has_embedded_map: bool, has_videos: bool) -> String {
    let mut map_placed = false;
    IFRAME
        .replace_all(html, |_: &Captures<'_>| {
            if has_embedded_map {
                if map_placed {
                    ""
                } else {
                    map_placed = true;
                    MAP_PLACEHOLDER
                }
            } else if has_videos {
                ""
            } else {
                EMBEDDED_CONTENT
            }
        })
        .into_owned()
}

/// Stage 3: "View Larger Map" remnants of old map embeds.
pub fn strip_dead_links(html: &str) -> String {
    LARGER_MAP_LINK.replace_all(html, "").into_owned()
}

/// Stage 4: images, bare or wrapped in an anchor, numbered by occurrence.
pub fn substitute_images(html: &str) -> String {
    let mut next = 0;
    IMAGE
        .replace_all(html, |_: &Captures<'_>| {
            let placeholder = image_placeholder(next);
            next += 1;
            placeholder
        })
        .into_owned()
}

/// Stage 5: drop formatting artifacts and collapse whitespace.
pub fn structural_cleanup(html: &str) -> String {
    let mut html = EMPTY_ANCHOR.replace_all(html, "").into_owned();

    // Emptying an inner div can empty its parent.
    loop {
        let next = EMPTY_DIV.replace_all(&html, "");
        if next.len() == html.len() {
            break;
        }
        html = next.into_owned();
    }

    let html = TABLE_TAG.replace_all(&html, " ");
    let html = BREAK_RUN.replace_all(&html, "<br><br>");
    WHITESPACE.replace_all(&html, " ").trim().to_string()
}

/// Stage 6: split on paragraph tags and resolve placeholders into blocks.
pub fn split_paragraphs(html: &str) -> Vec<ContentBlock> {
    let mut blocks = Vec::new();

    for part in PARAGRAPH.split(html) {
        let part = part.trim();
        if part.is_empty() {
            continue;
        }

        let mut last = 0;
        for caps in PLACEHOLDER.captures_iter(part) {
            let Some(whole) = caps.get(0) else { continue };
            push_text(&mut blocks, &part[last..whole.start()]);
            if let Some(block) = placeholder_block(&caps) {
                blocks.push(block);
            }
            last = whole.end();
        }
        push_text(&mut blocks, &part[last..]);
    }

    blocks
}

/// Stage 7: discard text blocks that carry no visible content.
pub fn filter_empty(blocks: Vec<ContentBlock>) -> Vec<ContentBlock> {
    blocks
        .into_iter()
        .filter(|block| match block {
            ContentBlock::Text { html, .. } => !is_blank(html),
            _ => true,
        })
        .collect()
}

fn placeholder_block(caps: &Captures<'_>) -> Option<ContentBlock> {
    if let Some(index) = caps.get(1) {
        // Out-of-range digits are not a placeholder we produced.
        return index
            .as_str()
            .parse()
            .ok()
            .map(|image_index| ContentBlock::ImageRef { image_index });
    }
    if let Some(index) = caps.get(2) {
        return index
            .as_str()
            .parse()
            .ok()
            .map(|video_index| ContentBlock::VideoRef { video_index });
    }
    caps.get(3).map(|_| ContentBlock::MapRef)
}

fn push_text(blocks: &mut Vec<ContentBlock>, fragment: &str) {
    let fragment = fragment.trim();
    if is_blank(fragment) {
        return;
    }
    blocks.push(ContentBlock::Text {
        html: fragment.to_string(),
        is_heading: HEADING.is_match(fragment),
    });
}

/// True when a fragment is empty once line breaks and `&nbsp;` are removed.
pub fn is_blank(html: &str) -> bool {
    let stripped = BREAK.replace_all(html, "");
    NBSP.replace_all(&stripped, "").trim().is_empty()
}

/// Rebuild markup from blocks, with media blocks as placeholders.
///
/// Segmenting the result with the same post flags yields the same media
/// blocks in the same order.
pub fn reassemble(blocks: &[ContentBlock]) -> String {
    let mut html = String::new();
    for block in blocks {
        match block {
            ContentBlock::Text { html: text, .. } => {
                html.push_str("<p>");
                html.push_str(text);
                html.push_str("</p>");
            }
            ContentBlock::ImageRef { image_index } => html.push_str(&image_placeholder(*image_index)),
            ContentBlock::VideoRef { video_index } => html.push_str(&video_placeholder(*video_index)),
            ContentBlock::MapRef => html.push_str(MAP_PLACEHOLDER),
        }
    }
    html
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct CacheKey {
    post_id: String,
    content_hash: u64,
    has_videos: bool,
    has_embedded_map: bool,
}

impl CacheKey {
    fn for_post(post: &Post) -> Self {
        let mut hasher = DefaultHasher::new();
        post.content.hash(&mut hasher);
        Self {
            post_id: post.id.clone(),
            content_hash: hasher.finish(),
            has_videos: post.has_videos(),
            has_embedded_map: post.has_embedded_map(),
        }
    }
}

/// Memoized segmentation keyed by post id and a hash of the body.
///
/// An edited body or a change in the post's video/map flags misses the
/// cache, so a stale entry is never served.
#[derive(Debug, Default)]
pub struct SegmentCache {
    entries: HashMap<CacheKey, Vec<ContentBlock>>,
}

impl SegmentCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, post: &Post) -> Option<&[ContentBlock]> {
        self.entries.get(&CacheKey::for_post(post)).map(Vec::as_slice)
    }

    pub fn get_or_segment(&mut self, post: &Post) -> &[ContentBlock] {
        self.entries
            .entry(CacheKey::for_post(post))
            .or_insert_with(|| segment_post(post))
    }

    /// Segment every post not already cached, in parallel.
    pub fn warm(&mut self, posts: &[Post]) {
        let missing: Vec<(CacheKey, Vec<ContentBlock>)> = posts
            .par_iter()
            .map(|post| (CacheKey::for_post(post), post))
            .filter(|(key, _)| !self.entries.contains_key(key))
            .map(|(key, post)| (key, segment_post(post)))
            .collect();
        self.entries.extend(missing);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn media(blocks: &[ContentBlock]) -> Vec<ContentBlock> {
        blocks.iter().filter(|b| b.is_media()).cloned().collect()
    }

    #[test]
    fn image_between_paragraphs() {
        let blocks = segment("<p>Hello</p><img src='a.jpg'><p>World</p>", false, false);
        assert_eq!(
            blocks,
            vec![
                ContentBlock::text("Hello"),
                ContentBlock::ImageRef { image_index: 0 },
                ContentBlock::text("World"),
            ]
        );
    }

    #[test]
    fn wrapped_and_bare_images_keep_visual_order() {
        let html = r#"<p>a</p><img src="1.jpg"><a href="2.jpg"><img src="2s.jpg"></a><img src="3.jpg">
            <a href="4.jpg">
              <img src="4s.jpg" />
            </a>"#;
        let blocks = segment(html, false, false);
        let indices: Vec<_> = blocks
            .iter()
            .filter_map(|b| match b {
                ContentBlock::ImageRef { image_index } => Some(*image_index),
                _ => None,
            })
            .collect();
        assert_eq!(indices, vec![0, 1, 2, 3]);
    }

    #[test]
    fn text_link_before_bare_image_is_not_swallowed() {
        let html = r#"<p>See <a href="http://x">the route</a> and then <img src="a.jpg"> done</p>"#;
        let blocks = segment(html, false, false);
        assert_eq!(
            blocks,
            vec![
                ContentBlock::text(r#"See <a href="http://x">the route</a> and then"#),
                ContentBlock::ImageRef { image_index: 0 },
                ContentBlock::text("done"),
            ]
        );
    }

    #[test]
    fn uppercase_tags_are_matched() {
        let blocks = segment("<P>Hi</P><IMG SRC='a.jpg'><A HREF='b'><IMG SRC='b'></A>", false, false);
        assert_eq!(
            media(&blocks),
            vec![
                ContentBlock::ImageRef { image_index: 0 },
                ContentBlock::ImageRef { image_index: 1 },
            ]
        );
    }

    #[test]
    fn object_becomes_video_ref_when_videos_attached() {
        let html = "<p>one</p><object width=1><embed src=x></object><p>two</p><object></object>";
        let blocks = segment(html, true, false);
        assert_eq!(
            blocks,
            vec![
                ContentBlock::text("one"),
                ContentBlock::VideoRef { video_index: 0 },
                ContentBlock::text("two"),
                ContentBlock::VideoRef { video_index: 1 },
            ]
        );
    }

    #[test]
    fn object_without_videos_leaves_marker() {
        let blocks = segment("<object><param name=movie></object>", false, false);
        assert_eq!(blocks, vec![ContentBlock::text("<em>[Video no longer available]</em>")]);
    }

    #[test]
    fn stray_embed_removed() {
        assert_eq!(normalize_video_embeds("a<embed src=x>b", true), "ab");
    }

    #[test]
    fn first_iframe_becomes_map() {
        let html = "<iframe src=m1></iframe><p>mid</p><iframe src=m2></iframe>";
        let blocks = segment(html, false, true);
        assert_eq!(blocks, vec![ContentBlock::MapRef, ContentBlock::text("mid")]);
    }

    #[test]
    fn iframe_fallbacks_depend_on_videos() {
        let html = "<p>x</p><iframe src=m></iframe>";
        assert_eq!(normalize_map_embeds(html, false, true), "<p>x</p>");
        assert_eq!(
            normalize_map_embeds(html, false, false),
            format!("<p>x</p>{EMBEDDED_CONTENT}")
        );
    }

    #[test]
    fn larger_map_link_stripped() {
        let html = r#"<p>Route</p><small><a href="http://maps.google.com">View Larger Map</a></small>"#;
        assert_eq!(segment(html, false, false), vec![ContentBlock::text("Route")]);
    }

    #[test]
    fn table_wrappers_removed_but_image_kept() {
        let html = r#"<table class="tr-caption-container"><tbody><tr><td><a href="big.jpg"><img src="a.jpg"></a></td></tr>
            <tr><td class="tr-caption">Ferry at dawn</td></tr></tbody></table>"#;
        let blocks = segment(html, false, false);
        assert_eq!(
            blocks,
            vec![
                ContentBlock::ImageRef { image_index: 0 },
                ContentBlock::text("Ferry at dawn"),
            ]
        );
    }

    #[test]
    fn cleanup_collapses_breaks_and_whitespace() {
        let out = structural_cleanup("a<br><br/>\n<br />  <BR>b   c<div> <div></div> </div><a href=x> </a>");
        assert_eq!(out, "a<br><br>b c");
    }

    #[test]
    fn heading_paragraph_is_flagged() {
        let blocks = segment("<p><h3>Day Two</h3></p><p>We rode.</p>", false, false);
        assert_eq!(
            blocks,
            vec![ContentBlock::heading("<h3>Day Two</h3>"), ContentBlock::text("We rode.")]
        );
    }

    #[test]
    fn blank_fragments_dropped() {
        let blocks = segment("<p>&nbsp;</p><p><br><br></p><p> &NBSP; <br/> </p><img src=a>", false, false);
        assert_eq!(blocks, vec![ContentBlock::ImageRef { image_index: 0 }]);
    }

    #[test]
    fn filter_keeps_media_and_drops_blank_text() {
        let blocks = vec![
            ContentBlock::text("<br>&nbsp;"),
            ContentBlock::MapRef,
            ContentBlock::text("kept"),
        ];
        assert_eq!(
            filter_empty(blocks),
            vec![ContentBlock::MapRef, ContentBlock::text("kept")]
        );
    }

    #[test]
    fn no_text_block_is_blank() {
        let inputs = [
            "<p> </p><p>&nbsp;<br></p>",
            "text<br><br><br><br>",
            "<div></div><p><a href=x></a></p>",
            "<p>a<img src=x>&nbsp;<br></p>",
            "",
            "<p",
            "<img",
        ];
        for input in inputs {
            for block in segment(input, false, false) {
                if let ContentBlock::Text { html, .. } = block {
                    assert!(!is_blank(&html), "blank block from {input:?}");
                }
            }
        }
    }

    #[test]
    fn malformed_markup_passes_through() {
        let blocks = segment("<p>unclosed <b>bold <object>never closed", true, true);
        assert_eq!(blocks, vec![ContentBlock::text("unclosed <b>bold <object>never closed")]);
    }

    #[test]
    fn reassembled_output_segments_to_same_media() {
        let html = r#"<p>Start</p><object></object><iframe></iframe><p>x<img src=a>y</p>
            <table><tr><td><img src=b></td></tr></table><p><h3>End</h3></p>"#;
        let first = segment(html, true, true);
        let second = segment(&reassemble(&first), true, true);
        assert_eq!(media(&first), media(&second));
        assert_eq!(first, second);
    }

    #[test]
    fn cache_hits_until_content_changes() {
        let mut cache = SegmentCache::new();
        let mut post = Post::new("p1", "t", "<p>a</p><img src=x>");
        assert_eq!(cache.get_or_segment(&post).len(), 2);
        assert!(cache.get(&post).is_some());

        post.content.push_str("<img src=y>");
        assert!(cache.get(&post).is_none());
        assert_eq!(cache.get_or_segment(&post).len(), 3);
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn warm_segments_every_post() {
        let posts = vec![
            Post::new("a", "A", "<p>one</p>"),
            Post::new("b", "B", "<img src=x>").with_images(["/media/x.jpg"]),
        ];
        let mut cache = SegmentCache::new();
        cache.warm(&posts);
        assert_eq!(cache.len(), 2);
        assert_eq!(cache.get(&posts[1]), Some(&[ContentBlock::ImageRef { image_index: 0 }][..]));
    }
}

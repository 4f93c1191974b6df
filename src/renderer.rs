//! HTML rendering of segmented posts and the page around them.

use std::fmt::Write as _;
use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

use crate::config::Config;
use crate::data::Chapter;
use crate::error::BuildError;
use crate::media::{GlobalMediaIndex, resolves};
use crate::tables::MediaTables;
use crate::types::{Comment, ContentBlock, EmbeddedMap, EscapeHtml, HtmlSafe, Post};

static BLOCK_MARKUP: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)<(?:ul|ol|div|table|blockquote|pre|h[1-6])\b").unwrap()
});

static HEADING_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)</?h[1-6](?:\s[^>]*)?>").unwrap());

static OPTIMIZED_DIR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^/(geotagged|geotagged2|media)/").unwrap());

static OPTIMIZED_EXT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\.(?:jpeg|png)$").unwrap());

/// Half-height and half-width of the embedded map viewport, in degrees.
const MAP_LAT_SPAN: f64 = 0.3;
const MAP_LNG_SPAN: f64 = 0.5;

/// Everything a post needs beyond its own record.
pub struct RenderContext<'a> {
    pub config: &'a Config,
    pub tables: &'a MediaTables,
    pub index: &'a GlobalMediaIndex,
    pub inline_css: Option<&'a str>,
}

impl<'a> RenderContext<'a> {
    pub fn new(config: &'a Config, tables: &'a MediaTables, index: &'a GlobalMediaIndex) -> Self {
        Self {
            config,
            tables,
            index,
            inline_css: None,
        }
    }

    pub fn with_css(mut self, css: &'a str) -> Self {
        self.inline_css = Some(css);
        self
    }

    fn asset(&self, path: &str) -> HtmlSafe {
        self.config.asset_path(path).escape_html()
    }

    fn inline_image(&self, path: &str) -> HtmlSafe {
        if self.config.optimized_images {
            self.asset(&optimized_image_path(path))
        } else {
            self.asset(path)
        }
    }
}

/// Path of the downsized copy of an image, for inline display.
///
/// `/media/a.png` becomes `/images-optimized/media/a.jpg`. Paths outside
/// the optimized trees are returned unchanged.
pub fn optimized_image_path(path: &str) -> String {
    if !OPTIMIZED_DIR.is_match(path) {
        return path.to_string();
    }
    let moved = OPTIMIZED_DIR.replace(path, "/images-optimized/$1/");
    OPTIMIZED_EXT.replace(&moved, ".jpg").into_owned()
}

/// Media blocks whose index has no file behind it.
pub fn dangling_references(post: &Post, blocks: &[ContentBlock]) -> Vec<BuildError> {
    blocks
        .iter()
        .filter(|block| block.is_media() && !resolves(post, block))
        .filter_map(|block| {
            let (kind, index) = match block {
                ContentBlock::ImageRef { image_index } => ("image", *image_index),
                ContentBlock::VideoRef { video_index } => ("video", *video_index),
                _ => return None,
            };
            Some(BuildError::DanglingReference {
                post_id: post.id.clone(),
                kind,
                index,
            })
        })
        .collect()
}

/// Render a post body from its blocks.
///
/// Dangling media references render nothing. Every rendered media element
/// carries its absolute slot in the gallery index.
pub fn render_post_body(post: &Post, blocks: &[ContentBlock], ctx: &RenderContext<'_>) -> String {
    let mut html = String::new();
    let mut local = 0;
    let mut videos_shown = vec![false; post.videos.len()];

    for block in blocks {
        if block.is_media() && !resolves(post, block) {
            continue;
        }

        let slot = if block.is_media() {
            let slot = ctx.index.resolve(&post.id, local);
            local += 1;
            slot
        } else {
            None
        };

        match block {
            ContentBlock::Text { html: text, is_heading } => {
                html.push_str(&render_text(text, *is_heading));
            }
            ContentBlock::ImageRef { image_index } => {
                html.push_str(&render_image(post, &post.images[*image_index], slot, ctx));
            }
            ContentBlock::VideoRef { video_index } => {
                videos_shown[*video_index] = true;
                html.push_str(&render_video(post, &post.videos[*video_index], slot, ctx));
            }
            ContentBlock::MapRef => {
                if let Some(map) = &post.embedded_map {
                    html.push_str(&render_map(map, slot));
                }
            }
        }
    }

    // Attached videos the body never placed go after it.
    let trailing: Vec<&String> = post
        .videos
        .iter()
        .zip(&videos_shown)
        .filter(|(_, shown)| !**shown)
        .map(|(video, _)| video)
        .collect();
    if !trailing.is_empty() {
        html.push_str(r#"<div class="post-videos">"#);
        for video in trailing {
            html.push_str(&render_video(post, video, None, ctx));
        }
        html.push_str("</div>");
    }

    html
}

fn render_text(text: &str, is_heading: bool) -> String {
    if is_heading {
        format!(
            r#"<h3 class="post-heading">{}</h3>"#,
            HEADING_TAG.replace_all(text, "")
        )
    } else if BLOCK_MARKUP.is_match(text) {
        // Block-level markup may not nest inside <p>.
        format!(r#"<div class="post-block">{text}</div>"#)
    } else {
        format!("<p>{text}</p>")
    }
}

fn gallery_attr(slot: Option<usize>) -> String {
    slot.map(|n| format!(r#" data-gallery-index="{n}""#))
        .unwrap_or_default()
}

fn render_image(post: &Post, path: &str, slot: Option<usize>, ctx: &RenderContext<'_>) -> String {
    let caption = ctx.tables.image_caption(path);
    let alt = caption
        .map(str::to_string)
        .unwrap_or_else(|| format!("Photo from {}", post.title));
    let figcaption = caption
        .map(|c| format!("<figcaption>{}</figcaption>", c.escape_html()))
        .unwrap_or_default();

    format!(
        r#"<figure class="post-image"{}><img src="{}" data-full="{}" alt="{}" loading="lazy" decoding="async">{}</figure>"#,
        gallery_attr(slot),
        ctx.inline_image(path),
        ctx.asset(path),
        alt.escape_html(),
        figcaption,
    )
}

fn render_video(post: &Post, path: &str, slot: Option<usize>, ctx: &RenderContext<'_>) -> String {
    let caption = ctx.tables.video_caption(post, path);
    let poster = ctx
        .tables
        .poster_for(path)
        .map(|p| format!(r#" poster="{}""#, ctx.asset(p)))
        .unwrap_or_default();

    format!(
        r#"<figure class="post-video"{}><video src="{}"{} controls preload="metadata">Your browser does not support the video tag.</video><figcaption>{}</figcaption></figure>"#,
        gallery_attr(slot),
        ctx.asset(path),
        poster,
        caption.escape_html(),
    )
}

/// OpenStreetMap bounding box `west,south,east,north` around the map center.
pub fn map_bbox(map: &EmbeddedMap) -> String {
    let (lat, lng) = map.center;
    format!(
        "{:.5},{:.5},{:.5},{:.5}",
        lng - MAP_LNG_SPAN,
        lat - MAP_LAT_SPAN,
        lng + MAP_LNG_SPAN,
        lat + MAP_LAT_SPAN
    )
}

fn render_map(map: &EmbeddedMap, slot: Option<usize>) -> String {
    format!(
        r#"<div class="post-map"{}><iframe src="https://www.openstreetmap.org/export/embed.html?bbox={}&amp;layer=mapnik" width="100%" height="400" title="{}"></iframe><p class="map-hint">Hint: follow the dotted lines.</p></div>"#,
        gallery_attr(slot),
        map_bbox(map),
        map.title.escape_html(),
    )
}

/// Comments from the original blog, collapsed by default.
pub fn render_comments(comments: &[Comment]) -> String {
    if comments.is_empty() {
        return String::new();
    }

    let plural = if comments.len() == 1 { "" } else { "s" };
    let mut html = format!(
        r#"<details class="comments"><summary>{} Comment{}</summary>"#,
        comments.len(),
        plural
    );
    for comment in comments {
        let _ = write!(
            html,
            r#"<div class="comment"><span class="comment-author">{}</span> <span class="comment-date">{}</span><p>{}</p></div>"#,
            comment.author.escape_html(),
            comment.date.escape_html(),
            comment.text.escape_html(),
        );
    }
    html.push_str("</details>");
    html
}

/// Render one post as an article.
pub fn render_post(post: &Post, blocks: &[ContentBlock], ctx: &RenderContext<'_>) -> String {
    let byline = post
        .display_date()
        .map(|d| format!(r#"<p class="byline">{}</p>"#, d.escape_html()))
        .unwrap_or_default();
    let id = post.id.escape_html();

    format!(
        r#"<article id="post-{id}" class="post">{byline}<h2 id="title-{id}">{}</h2><div class="post-content">{}{}</div></article>"#,
        post.title.escape_html(),
        render_post_body(post, blocks, ctx),
        render_comments(&post.comments),
    )
}

/// Table of contents linking every post, grouped by chapter.
pub fn render_navigation(chapters: &[Chapter<'_>]) -> String {
    let mut html = String::from(r#"<nav class="toc">"#);
    for chapter in chapters {
        let _ = write!(
            html,
            r#"<div class="nav-section"><span class="nav-header">{}</span>"#,
            chapter.date.escape_html()
        );
        for post in &chapter.posts {
            let _ = write!(
                html,
                r##"<a href="#post-{}" class="nav-link">{}</a>"##,
                post.id.escape_html(),
                post.title.escape_html()
            );
        }
        html.push_str("</div>");
    }
    html.push_str("</nav>");
    html
}

/// Divider opening each chapter.
pub fn render_chapter_divider(chapter: &Chapter<'_>) -> String {
    format!(
        r#"<div class="chapter-divider"><span>{}</span></div>"#,
        chapter.date.escape_html()
    )
}

/// Render the HTML page template.
pub fn template(title: &HtmlSafe, nav: &str, content: &str, ctx: &RenderContext<'_>) -> String {
    let css_block = match ctx.inline_css {
        Some(css) => format!("<style>{css}</style>"),
        None => format!(r#"<link rel="stylesheet" href="{}">"#, ctx.asset("/style.css")),
    };
    let manifest = ctx.asset("/media-index.json");

    format!(
r##"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>{title}</title>
    {css_block}
</head>
<body data-gallery="{manifest}">
    <header>
        <span class="brand">{title}</span>
        {nav}
    </header>
    <main>
        {content}
    </main>
</body>
</html>"##
    )
}

/// Gallery manifest written next to the page for the lightbox script.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GalleryManifest<'a> {
    pub base_path: &'a str,
    #[serde(flatten)]
    pub index: &'a GlobalMediaIndex,
}

impl<'a> GalleryManifest<'a> {
    pub fn new(config: &'a Config, index: &'a GlobalMediaIndex) -> Self {
        Self {
            base_path: &config.base_path,
            index,
        }
    }

    pub fn to_json(&self) -> Result<String, BuildError> {
        serde_json::to_string_pretty(self)
            .map_err(|e| BuildError::Internal(format!("gallery manifest: {e}")))
    }
}

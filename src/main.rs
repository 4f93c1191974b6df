//! Site build entry point.
//!
//! Loads the ingested post data and lookup tables, segments every post,
//! builds the cross-post gallery index and writes the page and manifest.

use std::borrow::Cow;
use std::fs;
use std::path::Path;

use rayon::prelude::*;

use travelogue::config::Config;
use travelogue::data::SiteData;
use travelogue::error::{BuildError, BuildResult};
use travelogue::media::build_global_index_with;
use travelogue::renderer::{
    GalleryManifest, RenderContext, dangling_references, render_chapter_divider,
    render_navigation, render_post, template,
};
use travelogue::segment::{SegmentCache, segment_post};
use travelogue::tables::MediaTables;
use travelogue::types::{ContentBlock, HtmlSafe};

fn main() -> Result<(), BuildError> {
    let start_time = std::time::Instant::now();
    println!("Building travelogue...");

    let config = Config::from_env();
    let mut build_result = BuildResult::new();

    fs::create_dir_all(&config.public_dir).map_err(|e| BuildError::OutputNotWritable {
        path: config.public_dir.clone(),
        source: e,
    })?;

    // Phase 1: Load post data and side tables (IO-bound, sequential)
    let site = SiteData::load(&config.posts_file())?;
    println!("Found {} posts ({} images).", site.posts.len(), site.total_images());

    let (tables, table_warnings) = MediaTables::load(&config.data_dir);
    let tables = tables.with_post_video_captions(&site.posts);
    build_result.record_failures(table_warnings);

    let css = match fs::read_to_string(config.data_dir.join("style.css")) {
        Ok(css) => {
            println!("  → CSS will be inlined ({} bytes)", css.len());
            Some(css)
        }
        Err(_) => {
            eprintln!("  ⚠ style.css not found in data dir, using external link");
            None
        }
    };

    // Phase 2: Segment post bodies (CPU-bound, parallel)
    let mut cache = SegmentCache::new();
    cache.warm(&site.posts);

    // Phase 3: Build the gallery index (sequential, order-dependent)
    let index = build_global_index_with(&site.posts, &tables, &mut cache);
    build_result.record_media(index.items.iter().filter(|i| !i.is_header()).count());
    println!("Indexed {} gallery slots.", index.len());

    // Phase 4: Render posts (CPU-bound, parallel, order preserved)
    let mut ctx = RenderContext::new(&config, &tables, &index);
    if let Some(css) = css.as_deref() {
        ctx = ctx.with_css(css);
    }

    let rendered: Vec<(String, Vec<BuildError>)> = site
        .posts
        .par_iter()
        .map(|post| {
            let blocks: Cow<'_, [ContentBlock]> = match cache.get(post) {
                Some(blocks) => Cow::Borrowed(blocks),
                None => Cow::Owned(segment_post(post)),
            };
            (
                render_post(post, &blocks, &ctx),
                dangling_references(post, &blocks),
            )
        })
        .collect();

    let mut articles: Vec<String> = Vec::with_capacity(rendered.len());
    for (html, warnings) in rendered {
        articles.push(html);
        build_result.record_failures(warnings);
        build_result.record_post();
    }

    // Phase 5: Assemble chapters and write output (sequential)
    let chapters = site.chapters();
    let mut content = String::new();
    let mut next_article = articles.into_iter();
    for chapter in &chapters {
        content.push_str(&render_chapter_divider(chapter));
        for _ in &chapter.posts {
            if let Some(article) = next_article.next() {
                content.push_str(&article);
            }
        }
    }

    let title = HtmlSafe::escape(site.title.as_deref().unwrap_or(&config.site_title));
    let page = template(&title, &render_navigation(&chapters), &content, &ctx);
    if let Err(e) = write_output(&config.index_html(), &page) {
        build_result.record_failure(e);
    }

    match GalleryManifest::new(&config, &index).to_json() {
        Ok(json) => {
            if let Err(e) = write_output(&config.media_manifest(), &json) {
                build_result.record_failure(e);
            }
        }
        Err(e) => build_result.record_failure(e),
    }

    let duration = start_time.elapsed();

    match build_result.finalize() {
        Ok(summary) => {
            summary.print_report();
            println!("Done! Built in {duration:.2?}");
            Ok(())
        }
        Err(e) => {
            eprintln!("Build failed: {}", e);
            Err(e)
        }
    }
}

fn write_output(path: &Path, contents: &str) -> Result<(), BuildError> {
    fs::write(path, contents).map_err(|e| BuildError::OutputNotWritable {
        path: path.to_path_buf(),
        source: e,
    })
}

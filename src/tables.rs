//! Side tables keyed by media path: captions, GPS matches, video posters.
//!
//! All tables are produced by offline tools and treated as trusted. A
//! missing table is simply empty.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use serde::Deserialize;
use serde::de::DeserializeOwned;

use crate::error::BuildError;
use crate::types::{GeoPoint, Post};

/// Default caption for an image with no entry in the caption table.
pub const DEFAULT_IMAGE_CAPTION: &str = "Photo from the trip";

/// Default caption for a video with no entry in either caption table.
pub const DEFAULT_VIDEO_CAPTION: &str = "Video from the trip";

/// A post image matched to a geotagged original.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageMatch {
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default)]
    pub geotagged_path: Option<String>,
    #[serde(default)]
    pub date_time: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct MatchesFile {
    #[serde(default)]
    matches: HashMap<String, ImageMatch>,
}

/// Read-only lookup tables passed to the indexer and the renderer.
#[derive(Debug, Clone, Default)]
pub struct MediaTables {
    pub image_captions: HashMap<String, String>,
    pub video_captions: HashMap<String, String>,
    pub image_matches: HashMap<String, ImageMatch>,
    pub video_thumbnails: HashMap<String, String>,
}

impl MediaTables {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder: set the image caption table.
    pub fn image_captions(mut self, captions: HashMap<String, String>) -> Self {
        self.image_captions = captions;
        self
    }

    /// Builder: set the global video caption table.
    pub fn video_captions(mut self, captions: HashMap<String, String>) -> Self {
        self.video_captions = captions;
        self
    }

    /// Builder: set the GPS match table.
    pub fn image_matches(mut self, matches: HashMap<String, ImageMatch>) -> Self {
        self.image_matches = matches;
        self
    }

    /// Builder: set the video poster table.
    pub fn video_thumbnails(mut self, thumbnails: HashMap<String, String>) -> Self {
        self.video_thumbnails = thumbnails;
        self
    }

    /// Merge the per-post video captions of every post into the global table.
    /// Entries already in the table win.
    pub fn with_post_video_captions(mut self, posts: &[Post]) -> Self {
        for post in posts {
            for (path, caption) in &post.video_captions {
                self.video_captions
                    .entry(path.clone())
                    .or_insert_with(|| caption.clone());
            }
        }
        self
    }

    /// Explicit caption for an image, if one was written.
    pub fn image_caption(&self, path: &str) -> Option<&str> {
        self.image_captions
            .get(path)
            .map(String::as_str)
            .filter(|c| !c.trim().is_empty())
    }

    /// Caption for a video: the global table, then the post's own captions,
    /// then the default.
    pub fn video_caption<'a>(&'a self, post: &'a Post, path: &str) -> &'a str {
        self.video_captions
            .get(path)
            .or_else(|| post.video_captions.get(path))
            .map(String::as_str)
            .filter(|c| !c.trim().is_empty())
            .unwrap_or(DEFAULT_VIDEO_CAPTION)
    }

    pub fn poster_for(&self, video_path: &str) -> Option<&str> {
        self.video_thumbnails.get(video_path).map(String::as_str)
    }

    /// Coordinates of the post's geotagged images, in image order.
    pub fn photo_locations(&self, post: &Post) -> Vec<GeoPoint> {
        post.images
            .iter()
            .filter_map(|path| self.image_matches.get(path))
            // A zero coordinate marks a match with no usable GPS fix.
            .filter(|m| m.latitude != 0.0 && m.longitude != 0.0)
            .map(|m| GeoPoint::new(m.latitude, m.longitude))
            .collect()
    }

    /// Load every table under `data_dir`. Missing files yield empty tables;
    /// unreadable or malformed ones are reported and yield empty tables too.
    pub fn load(data_dir: &Path) -> (Self, Vec<BuildError>) {
        let mut warnings = Vec::new();

        let image_captions = load_table(&data_dir.join("image-captions.json"), &mut warnings);
        let video_captions = load_table(&data_dir.join("video-captions.json"), &mut warnings);
        let video_thumbnails = load_table(&data_dir.join("video-thumbnails.json"), &mut warnings);
        let matches: MatchesFile = load_table(&data_dir.join("image-matches.json"), &mut warnings);

        let tables = Self {
            image_captions,
            video_captions,
            image_matches: matches.matches,
            video_thumbnails,
        };
        (tables, warnings)
    }
}

fn load_table<T>(path: &Path, warnings: &mut Vec<BuildError>) -> T
where
    T: DeserializeOwned + Default,
{
    if !path.exists() {
        return T::default();
    }

    let parsed = fs::read_to_string(path)
        .map_err(|e| e.to_string())
        .and_then(|text| serde_json::from_str(&text).map_err(|e| e.to_string()));

    match parsed {
        Ok(table) => table,
        Err(message) => {
            warnings.push(BuildError::TableUnusable {
                path: path.to_path_buf(),
                message,
            });
            T::default()
        }
    }
}

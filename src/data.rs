//! Site data loading: the ingested `posts.json` document.

use std::fs;
use std::path::Path;

use serde::Deserialize;

use crate::error::BuildError;
use crate::types::Post;

/// Top-level `posts.json` document.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SiteData {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub subtitle: Option<String>,
    pub posts: Vec<Post>,
}

/// Posts published on the same day, rendered under one divider.
#[derive(Debug, Clone, PartialEq)]
pub struct Chapter<'a> {
    /// Short date label, e.g. `Aug 2`. Empty for undated posts.
    pub date: String,
    pub posts: Vec<&'a Post>,
}

impl SiteData {
    /// Load and chronologically order the posts in `path`.
    pub fn load(path: &Path) -> Result<Self, BuildError> {
        let text = fs::read_to_string(path).map_err(|e| BuildError::DataNotReadable {
            path: path.to_path_buf(),
            source: e,
        })?;
        let mut data: SiteData =
            serde_json::from_str(&text).map_err(|e| BuildError::DataMalformed {
                path: path.to_path_buf(),
                source: e,
            })?;

        if data.posts.is_empty() {
            return Err(BuildError::NoPosts {
                path: path.to_path_buf(),
            });
        }

        sort_chronologically(&mut data.posts);
        Ok(data)
    }

    pub fn total_images(&self) -> usize {
        self.posts.iter().map(|p| p.images.len()).sum()
    }

    /// Group consecutive posts sharing a short date.
    pub fn chapters(&self) -> Vec<Chapter<'_>> {
        let mut chapters: Vec<Chapter<'_>> = Vec::new();
        for post in &self.posts {
            let date = post.short_date().unwrap_or_default();
            if let Some(chapter) = chapters.last_mut().filter(|c| c.date == date) {
                chapter.posts.push(post);
                continue;
            }
            chapters.push(Chapter {
                date,
                posts: vec![post],
            });
        }
        chapters
    }
}

/// Stable sort by publish time. Undated posts keep their relative order
/// after every dated one.
pub fn sort_chronologically(posts: &mut [Post]) {
    posts.sort_by_key(|post| match post.published_at() {
        Some(at) => (false, Some(at)),
        None => (true, None),
    });
}

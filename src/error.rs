//! Error types for loading site data and writing output.
//!
//! The segmenter and indexer never fail; everything here comes from the
//! filesystem, from malformed metadata, or from inconsistencies worth
//! reporting without stopping the build.

use std::io;
use std::path::PathBuf;

/// All possible errors during a site build.
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    // ══════════════════════════════════════════════════════════════════════
    // RECOVERABLE: Report and continue
    // ══════════════════════════════════════════════════════════════════════

    /// A media block points past the end of its post's image or video list.
    /// The renderer drops it.
    #[error("Post {post_id}: {kind} reference #{index} has no matching file")]
    DanglingReference {
        post_id: String,
        kind: &'static str,
        index: usize,
    },

    /// An optional lookup table (captions, matches, thumbnails) is unreadable.
    /// The build continues with an empty table.
    #[error("Lookup table {path:?} ignored: {message}")]
    TableUnusable { path: PathBuf, message: String },

    // ══════════════════════════════════════════════════════════════════════
    // NON-RECOVERABLE: Must abort entire build
    // ══════════════════════════════════════════════════════════════════════

    /// Cannot read the post data file.
    #[error("Data file not readable: {path:?}")]
    DataNotReadable {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The post data file is not valid JSON of the expected shape.
    #[error("Data file malformed: {path:?}")]
    DataMalformed {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// Cannot write to output directory.
    #[error("Output not writable: {path:?}")]
    OutputNotWritable {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The data file holds no posts.
    #[error("No posts found in {path:?}")]
    NoPosts { path: PathBuf },

    // ══════════════════════════════════════════════════════════════════════
    // INTERNAL: Should never happen (indicates bug)
    // ══════════════════════════════════════════════════════════════════════

    #[error("Internal error: {0}")]
    Internal(String),
}

impl BuildError {
    /// Returns true if the build can carry on past this error.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::DanglingReference { .. } | Self::TableUnusable { .. }
        )
    }

    /// Returns true if this indicates a bug in the generator.
    pub fn is_internal(&self) -> bool {
        matches!(self, Self::Internal(_))
    }
}

/// Outcome of a build that may carry warnings.
#[derive(Debug, Default)]
pub struct BuildResult {
    pub posts_rendered: usize,
    pub media_indexed: usize,
    pub failures: Vec<BuildError>,
}

impl BuildResult {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_post(&mut self) {
        self.posts_rendered += 1;
    }

    pub fn record_media(&mut self, count: usize) {
        self.media_indexed += count;
    }

    pub fn record_failure(&mut self, error: BuildError) {
        self.failures.push(error);
    }

    pub fn record_failures(&mut self, errors: impl IntoIterator<Item = BuildError>) {
        self.failures.extend(errors);
    }

    /// Returns Err on the first non-recoverable error, or if nothing rendered.
    pub fn finalize(self) -> Result<BuildSummary, BuildError> {
        let (warnings, mut fatal): (Vec<_>, Vec<_>) = self
            .failures
            .into_iter()
            .partition(BuildError::is_recoverable);

        if !fatal.is_empty() {
            return Err(fatal.swap_remove(0));
        }

        if self.posts_rendered == 0 {
            return Err(BuildError::NoPosts {
                path: PathBuf::from("posts.json"),
            });
        }

        Ok(BuildSummary {
            posts_rendered: self.posts_rendered,
            media_indexed: self.media_indexed,
            warnings,
        })
    }
}

/// Summary of a successful build.
#[derive(Debug)]
pub struct BuildSummary {
    pub posts_rendered: usize,
    pub media_indexed: usize,
    pub warnings: Vec<BuildError>,
}

impl BuildSummary {
    pub fn print_report(&self) {
        println!(
            "✓ Rendered {} posts, {} gallery entries",
            self.posts_rendered, self.media_indexed
        );
        if !self.warnings.is_empty() {
            eprintln!("⚠ {} warnings:", self.warnings.len());
            for warn in &self.warnings {
                eprintln!("  - {}", warn);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dangling() -> BuildError {
        BuildError::DanglingReference {
            post_id: "42".into(),
            kind: "image",
            index: 3,
        }
    }

    #[test]
    fn classification() {
        assert!(dangling().is_recoverable());
        assert!(!BuildError::NoPosts { path: "x".into() }.is_recoverable());
        assert!(BuildError::Internal("oops".into()).is_internal());
    }

    #[test]
    fn warnings_do_not_fail_the_build() {
        let mut result = BuildResult::new();
        result.record_post();
        result.record_media(4);
        result.record_failure(dangling());

        let summary = result.finalize().unwrap();
        assert_eq!(summary.posts_rendered, 1);
        assert_eq!(summary.media_indexed, 4);
        assert_eq!(summary.warnings.len(), 1);
    }

    #[test]
    fn first_fatal_error_wins() {
        let mut result = BuildResult::new();
        result.record_post();
        result.record_failure(dangling());
        result.record_failure(BuildError::OutputNotWritable {
            path: "public/index.html".into(),
            source: io::Error::new(io::ErrorKind::PermissionDenied, "denied"),
        });
        result.record_failure(BuildError::Internal("later".into()));

        let err = result.finalize().unwrap_err();
        assert!(matches!(err, BuildError::OutputNotWritable { .. }));
    }

    #[test]
    fn empty_build_is_an_error() {
        let err = BuildResult::new().finalize().unwrap_err();
        assert!(matches!(err, BuildError::NoPosts { .. }));
    }

    #[test]
    fn dangling_message_names_post() {
        assert_eq!(
            dangling().to_string(),
            "Post 42: image reference #3 has no matching file"
        );
    }
}

//! File-system sink: one directory per artifact plus a JSON metadata index.
//!
//! Layout under the sink root:
//!
//! ```text
//! image_<frame_id>/image_<frame_id>.jpg
//! data/esp32.json      (latest capture, rewritten on every artifact)
//! ```

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::fs;
use tracing::info;

use super::{ArtifactSink, SinkError};
use crate::fragment::{CompletedArtifact, FrameId};

/// Metadata file used when none is configured, relative to the sink root.
pub const DEFAULT_METADATA_FILE: &str = "data/esp32.json";

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// A fixed capture location recorded alongside each artifact.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    /// Latitude in decimal degrees.
    pub lat: f64,
    /// Longitude in decimal degrees.
    pub lon: f64,
}

/// One record of the metadata index.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MetadataEntry {
    /// Image path relative to the sink root, `/` separated.
    pub image: String,
    /// Latitude of the capture, when known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lat: Option<f64>,
    /// Longitude of the capture, when known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lon: Option<f64>,
    /// Local wall-clock time of persistence, `YYYY-MM-DD HH:MM:SS`.
    pub time: String,
}

/// Where a persisted artifact ended up.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PersistedArtifact {
    /// Frame the artifact arrived as.
    pub frame_id: FrameId,
    /// Absolute or root-relative path of the written image.
    pub image_path: PathBuf,
    /// Path of the metadata index that now references the image.
    pub metadata_path: PathBuf,
    /// Number of bytes written.
    pub len: usize,
}

/// Writes artifacts beneath a root directory.
///
/// # Examples
///
/// ```
/// use chunkcast::sink::{FileSink, GeoPoint};
///
/// let sink = FileSink::new("/var/lib/chunkcast").with_location(GeoPoint {
///     lat: 28.6141,
///     lon: 77.2092,
/// });
/// assert!(sink.metadata_path().ends_with("data/esp32.json"));
/// ```
#[derive(Clone, Debug)]
pub struct FileSink {
    root: PathBuf,
    metadata_path: PathBuf,
    location: Option<GeoPoint>,
    extension: String,
}

impl FileSink {
    /// Create a sink rooted at `root` writing `.jpg` images and the default
    /// metadata file.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        Self {
            metadata_path: root.join(DEFAULT_METADATA_FILE),
            root,
            location: None,
            extension: "jpg".to_owned(),
        }
    }

    /// Record the metadata index at `path` instead of the default location.
    #[must_use]
    pub fn with_metadata_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.metadata_path = path.into();
        self
    }

    /// Tag every artifact with a fixed capture location.
    #[must_use]
    pub fn with_location(mut self, location: GeoPoint) -> Self {
        self.location = Some(location);
        self
    }

    /// Write images with `extension` instead of `jpg`.
    #[must_use]
    pub fn with_extension(mut self, extension: impl Into<String>) -> Self {
        self.extension = extension.into();
        self
    }

    /// Return the sink root.
    #[must_use]
    pub fn root(&self) -> &Path { &self.root }

    /// Return the metadata index path.
    #[must_use]
    pub fn metadata_path(&self) -> &Path { &self.metadata_path }

    /// Image path relative to the root for `frame_id`.
    #[must_use]
    pub fn relative_image_path(&self, frame_id: FrameId) -> String {
        format!("image_{frame_id}/image_{frame_id}.{}", self.extension)
    }

    fn entry_for(&self, relative_image: String) -> MetadataEntry {
        MetadataEntry {
            image: relative_image,
            lat: self.location.map(|l| l.lat),
            lon: self.location.map(|l| l.lon),
            time: chrono::Local::now().format(TIMESTAMP_FORMAT).to_string(),
        }
    }
}

#[async_trait]
impl ArtifactSink for FileSink {
    async fn persist(&self, artifact: &CompletedArtifact) -> Result<PersistedArtifact, SinkError> {
        let relative = self.relative_image_path(artifact.frame_id());
        let image_path = self.root.join(&relative);
        write_file(&image_path, artifact.payload()).await?;

        let entries = [self.entry_for(relative)];
        let json = serde_json::to_vec_pretty(&entries)?;
        write_file(&self.metadata_path, &json).await?;

        info!(
            frame_id = %artifact.frame_id(),
            path = %image_path.display(),
            len = artifact.payload().len(),
            "artifact saved and metadata updated"
        );
        Ok(PersistedArtifact {
            frame_id: artifact.frame_id(),
            image_path,
            metadata_path: self.metadata_path.clone(),
            len: artifact.payload().len(),
        })
    }
}

/// Write `contents` to `path`, creating parent directories. The file is
/// staged next to its destination and renamed into place so readers never
/// observe a partial write.
async fn write_file(path: &Path, contents: &[u8]) -> Result<(), SinkError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .await
            .map_err(|source| SinkError::CreateDir {
                path: parent.to_path_buf(),
                source,
            })?;
    }

    let mut staging = path.as_os_str().to_owned();
    staging.push(".part");
    let staging = PathBuf::from(staging);
    let write_err = |source| SinkError::Write {
        path: path.to_path_buf(),
        source,
    };
    fs::write(&staging, contents).await.map_err(write_err)?;
    fs::rename(&staging, path).await.map_err(write_err)
}

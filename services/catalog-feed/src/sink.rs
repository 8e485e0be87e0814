use std::{fs, path::{Path, PathBuf}};

use crate::errors::FeedError;
use crate::types::Track;

/// Keeps the last emitted catalog on disk as zstd-compressed json
pub struct SnapshotSink {
    root: PathBuf,
    level: i32
}

impl SnapshotSink {
    pub fn new(root: impl AsRef<Path>, level: i32) -> Self {
        Self { root: root.as_ref().to_path_buf(), level: level.clamp(0, 21)}
    }

    pub fn latest_path(&self) -> PathBuf {
        self.root.join("catalog").join("latest.json.zst")
    }

    pub fn write(&self, tracks: &[Track]) -> Result<PathBuf, FeedError> {
        let path = self.latest_path();
        let parent = path.parent()
            .ok_or_else(|| FeedError::Sink(format!("no parent for {}", path.display())))?;

        fs::create_dir_all(parent).map_err(|e|
            FeedError::Sink(format!("create dir {}: {e}", parent.display())))?;

        let temp = tempfile::NamedTempFile::new_in(parent).map_err(|e|
            FeedError::Sink(format!("tempfile in {}: {e}", parent.display())))?;

        {
            let mut enc = zstd::stream::write::Encoder::new(temp.as_file(), self.level)
                .map_err(|e| FeedError::Sink(format!("zstd encoder: {e}")))?;

            serde_json::to_writer(&mut enc, tracks)
                .map_err(|e| FeedError::Sink(format!("serialize json: {e}")))?;
            enc.finish().map_err(|e| FeedError::Sink(format!("zstd finish: {e}")))?;
        }

        temp.persist(&path).map_err(|e|
            FeedError::Sink(format!("persist {}: {e}", path.display())))?;

        Ok(path)
    }

    /// None when no snapshot was written yet
    pub fn read_latest(&self) -> Result<Option<Vec<Track>>, FeedError> {
        let path = self.latest_path();
        let file = match fs::File::open(&path) {
            Ok(f) => f,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let dec = zstd::stream::read::Decoder::new(file)
            .map_err(|e| FeedError::Sink(format!("zstd decoder: {e}")))?;
        let tracks = serde_json::from_reader(dec)?;
        Ok(Some(tracks))
    }
}

use crate::domain::records::VideoRecord;
use regex::Regex;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tracing::warn;

/// Public path under which the output directory is served.
pub const OUTPUTS_ROUTE: &str = "/outputs";

/// Local filesystem access for upload and output media.
#[derive(Debug, Clone)]
pub struct FsAdapter {
    output_dir: PathBuf,
}

impl FsAdapter {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Public reference of an output file: `/outputs/<file name>`.
    pub fn public_ref(path: &Path) -> String {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        format!("{}/{}", OUTPUTS_ROUTE, name)
    }

    /// Removes a file; an already missing file is not an error.
    pub async fn remove_if_exists(path: &Path) -> std::io::Result<bool> {
        if path.as_os_str().is_empty() {
            return Ok(false);
        }
        match tokio::fs::remove_file(path).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Public reference of a record's processed video, or an empty string.
    ///
    /// Records without usable `output_path` fall back to the most recently
    /// modified `processed_*<stem>*.mp4` in the output directory. That match is
    /// a best guess: several files can fit.
    pub fn resolve_processed_video(&self, record: &VideoRecord) -> String {
        let output_path = Path::new(&record.output_path);
        if !record.output_path.is_empty() && output_path.exists() {
            return Self::public_ref(output_path);
        }

        let stem = Path::new(&record.video_name)
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        if stem.is_empty() {
            return String::new();
        }

        self.newest_matching_output(&stem)
            .map(|path| Self::public_ref(&path))
            .unwrap_or_default()
    }

    fn newest_matching_output(&self, stem: &str) -> Option<PathBuf> {
        let pattern = format!(r"^processed_.*{}.*\.mp4$", regex::escape(stem));
        let matcher = Regex::new(&pattern).ok()?;

        let entries = match std::fs::read_dir(&self.output_dir) {
            Ok(entries) => entries,
            Err(e) => {
                warn!(dir = %self.output_dir.display(), error = %e, "cannot scan output directory");
                return None;
            }
        };

        entries
            .filter_map(Result::ok)
            .filter(|entry| matcher.is_match(&entry.file_name().to_string_lossy()))
            .filter_map(|entry| {
                let modified = entry
                    .metadata()
                    .and_then(|m| m.modified())
                    .unwrap_or(SystemTime::UNIX_EPOCH);
                Some((modified, entry.path()))
            })
            .max_by_key(|(modified, _)| *modified)
            .map(|(_, path)| path)
    }
}

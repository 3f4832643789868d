use std::path::{Path, PathBuf};
use uuid::Uuid;

pub const DEFAULT_UPLOAD_NAME: &str = "upload_video.mp4";

pub const UNSUPPORTED_UPLOAD_MESSAGE: &str =
    "Unsupported file type. Please upload a common video format such as MP4, AVI, MOV, MKV, WEBM, FLV, WMV, or MPEG.";

const SUPPORTED_VIDEO_EXTENSIONS: [&str; 13] = [
    "mp4", "avi", "mov", "mkv", "webm", "flv", "wmv", "m4v", "mpg", "mpeg", "3gp", "ts", "m2ts",
];

/// Display name of an upload: the base name of whatever the client sent.
pub fn display_name(file_name: Option<&str>) -> String {
    file_name
        .and_then(|name| name.rsplit(|c: char| c == '/' || c == '\\').next())
        .filter(|name| !name.is_empty() && *name != "." && *name != "..")
        .unwrap_or(DEFAULT_UPLOAD_NAME)
        .to_string()
}

pub fn is_supported_video(file_name: Option<&str>, content_type: Option<&str>) -> bool {
    let by_type = content_type
        .map(|ct| ct.to_ascii_lowercase().starts_with("video/"))
        .unwrap_or(false);
    if by_type {
        return true;
    }

    let name = display_name(file_name);
    Path::new(&name)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| {
            let ext = ext.to_ascii_lowercase();
            SUPPORTED_VIDEO_EXTENSIONS.contains(&ext.as_str())
        })
        .unwrap_or(false)
}

/// Collision-free destination for an upload inside `upload_dir`.
pub fn unique_input_path(upload_dir: &Path, display_name: &str) -> PathBuf {
    upload_dir.join(format!("{}_{}", Uuid::new_v4().simple(), display_name))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_name_strips_directories() {
        assert_eq!(display_name(Some("../../etc/passwd.mp4")), "passwd.mp4");
        assert_eq!(display_name(Some("C:\\videos\\lobby.MOV")), "lobby.MOV");
        assert_eq!(display_name(Some("")), DEFAULT_UPLOAD_NAME);
        assert_eq!(display_name(Some("dir/")), DEFAULT_UPLOAD_NAME);
        assert_eq!(display_name(None), DEFAULT_UPLOAD_NAME);
    }

    #[test]
    fn test_supported_by_extension_or_content_type() {
        assert!(is_supported_video(Some("clip.MKV"), None));
        assert!(is_supported_video(Some("clip.m2ts"), Some("application/octet-stream")));
        assert!(is_supported_video(Some("blob"), Some("Video/Quicktime")));
        assert!(!is_supported_video(Some("notes.txt"), Some("text/plain")));
        assert!(!is_supported_video(Some("noext"), None));
    }

    #[test]
    fn test_unique_input_paths_differ() {
        let dir = Path::new("uploads");
        let a = unique_input_path(dir, "lobby.mp4");
        let b = unique_input_path(dir, "lobby.mp4");

        assert_ne!(a, b);
        assert!(a.starts_with(dir));
        assert!(a.to_string_lossy().ends_with("_lobby.mp4"));
    }
}

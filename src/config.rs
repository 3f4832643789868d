//! Configuration loaded from the environment (and `.env`, when present).

use std::env;
use std::path::PathBuf;

/// File holding every video record, inside the output directory.
pub const RECORD_STORE_FILE: &str = "analytics_data.json";

#[derive(Clone, Debug)]
pub struct AppConfig {
    /// HTTP server bind address
    pub addr: String,
    /// HTTP server port
    pub port: String,
    /// Directory receiving uploaded videos
    pub upload_dir: PathBuf,
    /// Directory receiving processed videos, served at `/outputs`
    pub output_dir: PathBuf,
    /// Source frames between two analysed frames, at least 1
    pub frame_stride: u32,
    /// Allowed CORS origins; `["*"]` allows any
    pub cors_allow_origins: Vec<String>,
    pub detection_model_path: PathBuf,
    pub detection_confidence: f32,
    pub label_font_path: Option<PathBuf>,
    /// Executable used for the final browser-compatible transcode
    pub ffmpeg_bin: String,
    /// Videos processed at the same time
    pub max_concurrent_jobs: usize,
}

impl AppConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        dotenv::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(var: impl Fn(&str) -> Option<String>) -> Self {
        let or = |key: &str, default: &str| var(key).unwrap_or_else(|| default.to_string());

        Self {
            addr: or("ADDR", "127.0.0.1"),
            port: or("PORT", "8000"),
            upload_dir: absolute(or("VIDEO_UPLOAD_DIR", "uploads")),
            output_dir: absolute(or("VIDEO_OUTPUT_DIR", "outputs")),
            frame_stride: var("VIDEO_FRAME_STRIDE")
                .and_then(|v| v.trim().parse::<i64>().ok())
                .map(|v| v.clamp(1, i64::from(u32::MAX)) as u32)
                .unwrap_or(3),
            cors_allow_origins: parse_origins(&or("CORS_ALLOW_ORIGINS", "*")),
            detection_model_path: PathBuf::from(or("DETECTION_MODEL_PATH", "models/yolo11n.onnx")),
            detection_confidence: var("DETECTION_CONFIDENCE")
                .and_then(|v| v.trim().parse().ok())
                .unwrap_or(0.25),
            label_font_path: var("LABEL_FONT_PATH")
                .filter(|v| !v.trim().is_empty())
                .map(PathBuf::from),
            ffmpeg_bin: or("FFMPEG_BIN", "ffmpeg"),
            max_concurrent_jobs: var("MAX_CONCURRENT_JOBS")
                .and_then(|v| v.trim().parse::<usize>().ok())
                .unwrap_or(2)
                .max(1),
        }
    }

    pub fn record_store_path(&self) -> PathBuf {
        self.output_dir.join(RECORD_STORE_FILE)
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.addr, self.port)
    }
}

fn absolute(dir: String) -> PathBuf {
    let path = PathBuf::from(dir);
    if path.is_absolute() {
        return path;
    }
    env::current_dir()
        .map(|cwd| cwd.join(&path))
        .unwrap_or(path)
}

fn parse_origins(raw: &str) -> Vec<String> {
    let origins: Vec<String> = raw
        .split(',')
        .map(str::trim)
        .filter(|o| !o.is_empty())
        .map(str::to_string)
        .collect();
    if origins.is_empty() {
        vec!["*".to_string()]
    } else {
        origins
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)]) -> AppConfig {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AppConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = config(&[]);

        assert_eq!(config.bind_address(), "127.0.0.1:8000");
        assert_eq!(config.frame_stride, 3);
        assert_eq!(config.cors_allow_origins, vec!["*"]);
        assert_eq!(config.max_concurrent_jobs, 2);
        assert!(config.upload_dir.is_absolute());
        assert!(config.record_store_path().ends_with("outputs/analytics_data.json"));
        assert_eq!(config.label_font_path, None);
    }

    #[test]
    fn test_stride_is_clamped_and_garbage_ignored() {
        assert_eq!(config(&[("VIDEO_FRAME_STRIDE", "0")]).frame_stride, 1);
        assert_eq!(config(&[("VIDEO_FRAME_STRIDE", "-4")]).frame_stride, 1);
        assert_eq!(config(&[("VIDEO_FRAME_STRIDE", " 5 ")]).frame_stride, 5);
        assert_eq!(config(&[("VIDEO_FRAME_STRIDE", "fast")]).frame_stride, 3);
    }

    #[test]
    fn test_origins() {
        let config = config(&[("CORS_ALLOW_ORIGINS", "http://a.test, ,http://b.test")]);
        assert_eq!(config.cors_allow_origins, vec!["http://a.test", "http://b.test"]);

        assert_eq!(parse_origins(" , "), vec!["*"]);
    }

    #[test]
    fn test_absolute_dirs_are_kept() {
        let config = config(&[("VIDEO_OUTPUT_DIR", "/srv/out"), ("MAX_CONCURRENT_JOBS", "0")]);
        assert_eq!(config.output_dir, PathBuf::from("/srv/out"));
        assert_eq!(config.max_concurrent_jobs, 1);
    }
}

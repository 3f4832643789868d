//! Adapters - Concrete implementations of ports.

pub mod http;
pub mod local;

#[cfg(feature = "ffmpeg")]
pub mod ffmpeg;

#[cfg(feature = "onnx")]
pub mod onnx;

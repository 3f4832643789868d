use crate::error::VideoError;
use crate::ports::video::FrameSink;
use ffmpeg_next as ffmpeg;
use ffmpeg::format::Pixel;
use ffmpeg::software::scaling::{context::Context as Scaler, flag::Flags};
use ffmpeg::util::frame::Video as VideoFrame;
use ffmpeg::Rational;
use image::RgbImage;
use std::path::Path;

/// Millisecond time base used for frame timestamps.
const TIME_BASE: Rational = Rational(1, 1000);

/// MPEG-4 Part 2 writer for the intermediate container.
pub struct FfmpegSink {
    output: ffmpeg::format::context::Output,
    encoder: ffmpeg::encoder::video::Encoder,
    scaler: Scaler,
    stream_time_base: Rational,
    width: u32,
    height: u32,
    fps: f64,
    frames_written: u64,
    finished: bool,
}

// Owned by a single pipeline run and only touched from the thread driving it.
unsafe impl Send for FfmpegSink {}

fn encode_err(e: ffmpeg::Error) -> VideoError {
    VideoError::Encode(e.to_string())
}

impl FfmpegSink {
    pub fn create(path: &Path, fps: f64, width: u32, height: u32) -> Result<Self, VideoError> {
        let mut output = ffmpeg::format::output(&path).map_err(encode_err)?;
        let codec = ffmpeg::encoder::find(ffmpeg::codec::Id::MPEG4)
            .ok_or_else(|| VideoError::Encode("MPEG-4 encoder not available".to_string()))?;
        let global_header = output
            .format()
            .flags()
            .contains(ffmpeg::format::Flags::GLOBAL_HEADER);

        let mut stream = output.add_stream(codec).map_err(encode_err)?;
        let mut encoder = ffmpeg::codec::context::Context::new_with_codec(codec)
            .encoder()
            .video()
            .map_err(encode_err)?;
        encoder.set_width(width);
        encoder.set_height(height);
        encoder.set_format(Pixel::YUV420P);
        encoder.set_time_base(TIME_BASE);
        encoder.set_frame_rate(Some(Rational::new((fps * 1000.0).round() as i32, 1000)));
        if global_header {
            encoder.set_flags(ffmpeg::codec::Flags::GLOBAL_HEADER);
        }

        let encoder = encoder.open_as(codec).map_err(encode_err)?;
        stream.set_parameters(&encoder);
        stream.set_time_base(TIME_BASE);

        output.write_header().map_err(encode_err)?;
        let stream_time_base = output
            .stream(0)
            .map(|s| s.time_base())
            .unwrap_or(TIME_BASE);

        let scaler = Scaler::get(
            Pixel::RGB24,
            width,
            height,
            Pixel::YUV420P,
            width,
            height,
            Flags::BILINEAR,
        )
        .map_err(encode_err)?;

        Ok(Self {
            output,
            encoder,
            scaler,
            stream_time_base,
            width,
            height,
            fps,
            frames_written: 0,
            finished: false,
        })
    }

    fn write_pending_packets(&mut self) -> Result<(), VideoError> {
        let mut packet = ffmpeg::Packet::empty();
        while self.encoder.receive_packet(&mut packet).is_ok() {
            packet.set_stream(0);
            packet.rescale_ts(TIME_BASE, self.stream_time_base);
            packet
                .write_interleaved(&mut self.output)
                .map_err(encode_err)?;
        }
        Ok(())
    }
}

impl FrameSink for FfmpegSink {
    fn write_frame(&mut self, frame: &RgbImage) -> Result<(), VideoError> {
        if frame.dimensions() != (self.width, self.height) {
            return Err(VideoError::Encode(format!(
                "frame is {}x{}, writer expects {}x{}",
                frame.width(),
                frame.height(),
                self.width,
                self.height
            )));
        }

        let mut rgb = VideoFrame::new(Pixel::RGB24, self.width, self.height);
        let row = self.width as usize * 3;
        let stride = rgb.stride(0);
        let data = rgb.data_mut(0);
        for (y, src) in frame.as_raw().chunks_exact(row).enumerate() {
            data[y * stride..y * stride + row].copy_from_slice(src);
        }

        let mut yuv = VideoFrame::empty();
        self.scaler.run(&rgb, &mut yuv).map_err(encode_err)?;
        let pts = (self.frames_written as f64 * 1000.0 / self.fps).round() as i64;
        yuv.set_pts(Some(pts));

        self.encoder.send_frame(&yuv).map_err(encode_err)?;
        self.frames_written += 1;
        self.write_pending_packets()
    }

    fn finish(&mut self) -> Result<(), VideoError> {
        if self.finished {
            return Ok(());
        }
        self.finished = true;
        self.encoder.send_eof().map_err(encode_err)?;
        self.write_pending_packets()?;
        self.output.write_trailer().map_err(encode_err)
    }
}

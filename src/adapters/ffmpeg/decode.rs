use crate::error::VideoError;
use crate::ports::video::{FrameSource, StreamInfo};
use ffmpeg_next as ffmpeg;
use ffmpeg::format::Pixel;
use ffmpeg::software::scaling::{context::Context as Scaler, flag::Flags};
use ffmpeg::util::frame::Video as VideoFrame;
use image::RgbImage;
use std::path::Path;

/// Sequential decoder of the best video stream of a container.
pub struct FfmpegSource {
    input: ffmpeg::format::context::Input,
    decoder: ffmpeg::decoder::Video,
    stream_index: usize,
    scaler: Option<Scaler>,
    decoded: VideoFrame,
    info: StreamInfo,
    eof_sent: bool,
}

// Owned by a single pipeline run and only touched from the thread driving it.
unsafe impl Send for FfmpegSource {}

impl FfmpegSource {
    pub fn open(path: &Path) -> Result<Self, VideoError> {
        let open_err = |e: ffmpeg::Error| VideoError::Open {
            path: path.to_path_buf(),
            reason: e.to_string(),
        };

        let input = ffmpeg::format::input(&path).map_err(open_err)?;
        let stream = input
            .streams()
            .best(ffmpeg::media::Type::Video)
            .ok_or(ffmpeg::Error::StreamNotFound)
            .map_err(open_err)?;
        let stream_index = stream.index();

        let rate = stream.avg_frame_rate();
        let fps = if rate.numerator() > 0 && rate.denominator() > 0 {
            f64::from(rate.numerator()) / f64::from(rate.denominator())
        } else {
            0.0
        };
        let total_frames = u64::try_from(stream.frames()).unwrap_or(0);

        let context = ffmpeg::codec::context::Context::from_parameters(stream.parameters())
            .map_err(open_err)?;
        let decoder = context.decoder().video().map_err(open_err)?;

        let info = StreamInfo {
            fps,
            total_frames,
            width: decoder.width(),
            height: decoder.height(),
        };

        Ok(Self {
            input,
            decoder,
            stream_index,
            scaler: None,
            decoded: VideoFrame::empty(),
            info,
            eof_sent: false,
        })
    }

    /// Decodes the next frame into `self.decoded`. Returns false at end of stream.
    fn decode_next(&mut self) -> Result<bool, VideoError> {
        loop {
            match self.decoder.receive_frame(&mut self.decoded) {
                Ok(()) => return Ok(true),
                Err(ffmpeg::Error::Eof) => return Ok(false),
                Err(e) if self.eof_sent => return Err(VideoError::Decode(e.to_string())),
                // needs more input
                Err(_) => {}
            }
            self.feed_decoder()?;
        }
    }

    fn feed_decoder(&mut self) -> Result<(), VideoError> {
        loop {
            let mut packet = ffmpeg::Packet::empty();
            match packet.read(&mut self.input) {
                Ok(()) if packet.stream() == self.stream_index => {
                    return self
                        .decoder
                        .send_packet(&packet)
                        .map_err(|e| VideoError::Decode(e.to_string()));
                }
                Ok(()) => continue,
                Err(ffmpeg::Error::Eof) => {
                    self.eof_sent = true;
                    return self
                        .decoder
                        .send_eof()
                        .map_err(|e| VideoError::Decode(e.to_string()));
                }
                Err(e) => return Err(VideoError::Decode(e.to_string())),
            }
        }
    }

    fn to_rgb(&mut self) -> Result<RgbImage, VideoError> {
        let (width, height) = (self.decoded.width(), self.decoded.height());
        if self.scaler.is_none() {
            let scaler = Scaler::get(
                self.decoded.format(),
                width,
                height,
                Pixel::RGB24,
                width,
                height,
                Flags::BILINEAR,
            )
            .map_err(|e| VideoError::Decode(e.to_string()))?;
            self.scaler = Some(scaler);
        }

        let mut rgb = VideoFrame::empty();
        if let Some(scaler) = self.scaler.as_mut() {
            scaler
                .run(&self.decoded, &mut rgb)
                .map_err(|e| VideoError::Decode(e.to_string()))?;
        }

        // Rows may be padded; copy only the visible part of each.
        let row = width as usize * 3;
        let stride = rgb.stride(0);
        let data = rgb.data(0);
        let mut pixels = Vec::with_capacity(row * height as usize);
        for y in 0..height as usize {
            pixels.extend_from_slice(&data[y * stride..y * stride + row]);
        }
        RgbImage::from_raw(width, height, pixels)
            .ok_or_else(|| VideoError::Decode("frame buffer size mismatch".to_string()))
    }
}

impl FrameSource for FfmpegSource {
    fn info(&self) -> StreamInfo {
        self.info
    }

    fn next_frame(&mut self) -> Result<Option<RgbImage>, VideoError> {
        if !self.decode_next()? {
            return Ok(None);
        }
        self.to_rgb().map(Some)
    }

    fn skip_frame(&mut self) -> Result<bool, VideoError> {
        self.decode_next()
    }
}

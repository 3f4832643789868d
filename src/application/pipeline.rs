//! Pipeline orchestrator: one uploaded video in, one annotated browser-playable video out.
//!
//! The run is synchronous and CPU bound; callers drive it from a blocking task.

use crate::domain::aggregate::SecondBuckets;
use crate::domain::annotate::Annotator;
use crate::domain::detection::persons;
use crate::domain::progress::{Progress, ProgressTracker};
use crate::domain::records::ProcessingDetails;
use crate::error::PipelineError;
use crate::ports::detector::Detector;
use crate::ports::video::{FrameSink, FrameSource, Transcoder, VideoBackend};
use chrono::Utc;
use image::RgbImage;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Frame rate assumed when the container reports none.
pub const FALLBACK_FPS: f64 = 25.0;

/// Result of a successful run.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineOutput {
    pub output_path: PathBuf,
    pub peak_person_count: u32,
    pub details: ProcessingDetails,
}

#[derive(Default)]
struct FrameLoopStats {
    frames_read: u64,
    sampled_frames: u64,
    peak_person_count: u32,
    buckets: SecondBuckets,
}

pub struct Pipeline {
    video: Arc<dyn VideoBackend>,
    detector: Arc<dyn Detector>,
    transcoder: Arc<dyn Transcoder>,
    annotator: Annotator,
}

impl Pipeline {
    pub fn new(
        video: Arc<dyn VideoBackend>,
        detector: Arc<dyn Detector>,
        transcoder: Arc<dyn Transcoder>,
        annotator: Annotator,
    ) -> Self {
        Self {
            video,
            detector,
            transcoder,
            annotator,
        }
    }

    /// Counts people in `input`, writing the annotated result into `output_dir`.
    ///
    /// `on_progress` receives strictly increasing percentages while the source
    /// frame count is known, then exactly one final `(100, total, total)` after
    /// a successful run.
    pub fn run(
        &self,
        input: &Path,
        output_dir: &Path,
        frame_stride: u32,
        on_progress: &mut dyn FnMut(Progress),
    ) -> Result<PipelineOutput, PipelineError> {
        if frame_stride < 1 {
            return Err(PipelineError::InvalidStride);
        }

        let mut source =
            self.video
                .open_source(input)
                .map_err(|source| PipelineError::OpenInput {
                    path: input.to_path_buf(),
                    source,
                })?;
        let info = source.info();
        if info.width == 0 || info.height == 0 {
            return Err(PipelineError::InvalidDimensions);
        }

        let fps = effective_fps(info.fps);
        let output_fps = (fps / f64::from(frame_stride)).max(1.0);
        let (raw_path, final_path) = output_paths(input, output_dir, Utc::now().timestamp());

        std::fs::create_dir_all(output_dir).map_err(|e| PipelineError::Writer(e.into()))?;
        let mut sink = self
            .video
            .create_sink(&raw_path, output_fps, info.width, info.height)
            .map_err(PipelineError::Writer)?;

        debug!(
            input = %input.display(),
            fps,
            output_fps,
            total_frames = info.total_frames,
            frame_stride,
            "frame loop starting"
        );

        let frame_loop = self.process_frames(
            source.as_mut(),
            sink.as_mut(),
            fps,
            frame_stride,
            info.total_frames,
            on_progress,
        );
        let closed = sink.finish().map_err(PipelineError::Write);
        drop(source);

        let stats = match frame_loop.and_then(|stats| closed.map(|()| stats)) {
            Ok(stats) => stats,
            Err(e) => {
                discard(&raw_path);
                return Err(e);
            }
        };

        if let Err(e) = self.transcoder.transcode(&raw_path, &final_path) {
            discard(&raw_path);
            discard(&final_path);
            return Err(PipelineError::Encode(e));
        }
        discard(&raw_path);

        let processed_frames = if info.total_frames > 0 {
            info.total_frames
        } else {
            stats.frames_read
        };
        let details = ProcessingDetails {
            fps: Some(fps),
            total_frames: Some(processed_frames),
            sampled_frames: Some(stats.sampled_frames),
            frame_stride: Some(frame_stride),
            duration_seconds: Some(round_2(processed_frames as f64 / fps)),
            counts_per_second: stats.buckets.finalize(),
            peak_count: Some(stats.peak_person_count),
            error: None,
        };

        on_progress(ProgressTracker::finished(processed_frames));

        info!(
            output = %final_path.display(),
            sampled_frames = stats.sampled_frames,
            peak = stats.peak_person_count,
            "video processed"
        );

        Ok(PipelineOutput {
            output_path: final_path,
            peak_person_count: stats.peak_person_count,
            details,
        })
    }

    fn process_frames(
        &self,
        source: &mut dyn FrameSource,
        sink: &mut dyn FrameSink,
        fps: f64,
        frame_stride: u32,
        total_frames: u64,
        on_progress: &mut dyn FnMut(Progress),
    ) -> Result<FrameLoopStats, PipelineError> {
        let stride = u64::from(frame_stride);
        let mut tracker = ProgressTracker::new(total_frames);
        let mut stats = FrameLoopStats::default();
        let mut index: u64 = 0;

        loop {
            if index % stride == 0 {
                let Some(mut frame) = source.next_frame().map_err(PipelineError::Decode)? else {
                    break;
                };
                let person_count = self.count_and_annotate(&mut frame)?;
                sink.write_frame(&frame).map_err(PipelineError::Write)?;

                stats.sampled_frames += 1;
                stats.peak_person_count = stats.peak_person_count.max(person_count);
                stats
                    .buckets
                    .record(SecondBuckets::second_of(index, fps), person_count);
            } else if !source.skip_frame().map_err(PipelineError::Decode)? {
                break;
            }

            index += 1;
            if let Some(progress) = tracker.observe(index) {
                on_progress(progress);
            }
        }

        stats.frames_read = index;
        Ok(stats)
    }

    fn count_and_annotate(&self, frame: &mut RgbImage) -> Result<u32, PipelineError> {
        let people = persons(self.detector.detect(frame)?);
        self.annotator.annotate(frame, &people, people.len());
        Ok(u32::try_from(people.len()).unwrap_or(u32::MAX))
    }
}

fn effective_fps(reported: f64) -> f64 {
    if reported > 0.0 {
        reported
    } else {
        FALLBACK_FPS
    }
}

fn round_2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Intermediate and final output locations for `input`.
pub fn output_paths(input: &Path, output_dir: &Path, timestamp: i64) -> (PathBuf, PathBuf) {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    (
        output_dir.join(format!("processed_{}_{}_raw.mp4", stem, timestamp)),
        output_dir.join(format!("processed_{}_{}.mp4", stem, timestamp)),
    )
}

fn discard(path: &Path) {
    if let Err(e) = std::fs::remove_file(path) {
        if e.kind() != ErrorKind::NotFound {
            warn!(path = %path.display(), error = %e, "cannot remove output file");
        }
    }
}

#[cfg(test)]
pub(crate) mod testing {
    //! In-process video backend producing synthetic frames.
    //!
    //! Every frame carries its source index in pixel (0, 0): red = low byte,
    //! green = high byte.

    use crate::domain::detection::{BBox, Detection};
    use crate::error::{DetectionError, VideoError};
    use crate::ports::detector::Detector;
    use crate::ports::video::{FrameSink, FrameSource, StreamInfo, VideoBackend};
    use image::{Rgb, RgbImage};
    use std::path::Path;
    use std::sync::{Arc, Mutex};

    pub const SIDE: u32 = 8;

    pub fn frame_index(frame: &RgbImage) -> u64 {
        let px = frame.get_pixel(0, 0);
        u64::from(px[0]) + 256 * u64::from(px[1])
    }

    #[derive(Debug, Default)]
    pub struct SinkLog {
        pub fps: Option<f64>,
        pub written: Vec<u64>,
        pub finished: bool,
    }

    pub struct SyntheticVideo {
        pub info: StreamInfo,
        /// Frames actually present, independent of what `info` claims.
        pub frames: u64,
        pub fail_open: bool,
        pub fail_sink: bool,
        pub sink: Arc<Mutex<SinkLog>>,
    }

    impl SyntheticVideo {
        pub fn new(fps: f64, total_frames: u64, frames: u64) -> Self {
            Self {
                info: StreamInfo {
                    fps,
                    total_frames,
                    width: SIDE,
                    height: SIDE,
                },
                frames,
                fail_open: false,
                fail_sink: false,
                sink: Arc::new(Mutex::new(SinkLog::default())),
            }
        }
    }

    struct SyntheticSource {
        info: StreamInfo,
        frames: u64,
        next: u64,
    }

    impl FrameSource for SyntheticSource {
        fn info(&self) -> StreamInfo {
            self.info
        }

        fn next_frame(&mut self) -> Result<Option<RgbImage>, VideoError> {
            if self.next >= self.frames {
                return Ok(None);
            }
            let index = self.next;
            self.next += 1;
            Ok(Some(RgbImage::from_pixel(
                SIDE,
                SIDE,
                Rgb([(index % 256) as u8, (index / 256) as u8, 0]),
            )))
        }
    }

    struct RecordingSink {
        log: Arc<Mutex<SinkLog>>,
    }

    impl FrameSink for RecordingSink {
        fn write_frame(&mut self, frame: &RgbImage) -> Result<(), VideoError> {
            self.log.lock().unwrap().written.push(frame_index(frame));
            Ok(())
        }

        fn finish(&mut self) -> Result<(), VideoError> {
            self.log.lock().unwrap().finished = true;
            Ok(())
        }
    }

    impl VideoBackend for SyntheticVideo {
        fn open_source(&self, path: &Path) -> Result<Box<dyn FrameSource>, VideoError> {
            if self.fail_open {
                return Err(VideoError::Open {
                    path: path.to_path_buf(),
                    reason: "No such file or directory".into(),
                });
            }
            Ok(Box::new(SyntheticSource {
                info: self.info,
                frames: self.frames,
                next: 0,
            }))
        }

        fn create_sink(
            &self,
            path: &Path,
            fps: f64,
            _width: u32,
            _height: u32,
        ) -> Result<Box<dyn FrameSink>, VideoError> {
            if self.fail_sink {
                return Err(VideoError::Encode("mpeg4 encoder unavailable".into()));
            }
            std::fs::write(path, b"raw")?;
            self.sink.lock().unwrap().fps = Some(fps);
            Ok(Box::new(RecordingSink {
                log: self.sink.clone(),
            }))
        }
    }

    /// Detector returning `people(index)` persons plus one non-person per frame.
    pub struct CountingDetector {
        pub people: fn(u64) -> usize,
        pub seen: Mutex<Vec<u64>>,
    }

    impl CountingDetector {
        pub fn new(people: fn(u64) -> usize) -> Self {
            Self {
                people,
                seen: Mutex::new(Vec::new()),
            }
        }
    }

    impl Detector for CountingDetector {
        fn detect(&self, frame: &RgbImage) -> Result<Vec<Detection>, DetectionError> {
            let index = frame_index(frame);
            self.seen.lock().unwrap().push(index);
            let bbox = BBox {
                x1: 4.0,
                y1: 4.0,
                x2: 6.0,
                y2: 6.0,
            };
            let mut detections: Vec<Detection> = (0..(self.people)(index))
                .map(|_| Detection {
                    class_id: 0,
                    confidence: 0.9,
                    bbox,
                })
                .collect();
            detections.push(Detection {
                class_id: 2,
                confidence: 0.95,
                bbox,
            });
            Ok(detections)
        }
    }
}

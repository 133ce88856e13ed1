//! JSONL frame sources
//!
//! Reads one JSON object per line, each describing a landmark frame.
//! Two layouts are accepted: a positional array of landmarks (index is
//! the array position) or records carrying an explicit `idx`, which are
//! scattered into a full-body frame. File replay is paced by the
//! `ts_ms` deltas between frames; stdin is assumed live and never paced.

use super::{AcquisitionError, FrameEvent, FrameSource};
use crate::types::{landmark_ids, Landmark, LandmarkFrame};
use async_trait::async_trait;
use serde::Deserialize;
use std::path::Path;
use tokio::fs::File;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader, Stdin};
use tokio::time::{sleep, Duration};
use tracing::warn;

/// Spacing assumed between frames that carry no timestamp.
const DEFAULT_FRAME_INTERVAL_MS: u64 = 100;

#[derive(Debug, Deserialize)]
struct FrameRecord {
    #[serde(default)]
    ts_ms: Option<u64>,
    landmarks: Vec<LandmarkRecord>,
}

#[derive(Debug, Deserialize)]
struct LandmarkRecord {
    #[serde(default)]
    idx: Option<usize>,
    x: f64,
    y: f64,
    #[serde(default)]
    z: Option<f64>,
    #[serde(default = "default_visibility")]
    v: f64,
}

fn default_visibility() -> f64 {
    1.0
}

fn landmark(rec: &LandmarkRecord) -> Landmark {
    let mut point = Landmark::new(rec.x, rec.y, rec.v);
    point.z = rec.z.unwrap_or(0.0);
    point
}

/// Build a frame from wire records.
///
/// Records with any explicit `idx` are scattered into a full-body frame,
/// leaving unlisted points invisible at the origin. Out-of-range indices
/// are dropped. Purely positional records keep their own length, so
/// partial frames stay partial.
fn frame_from_record(record: &FrameRecord) -> LandmarkFrame {
    let indexed = record.landmarks.iter().any(|rec| rec.idx.is_some());
    if !indexed {
        return LandmarkFrame::new(record.landmarks.iter().map(landmark).collect());
    }

    let mut points = vec![Landmark::new(0.0, 0.0, 0.0); landmark_ids::FULL_BODY_COUNT];
    for (position, rec) in record.landmarks.iter().enumerate() {
        let idx = rec.idx.unwrap_or(position);
        if let Some(slot) = points.get_mut(idx) {
            *slot = landmark(rec);
        }
    }
    LandmarkFrame::new(points)
}

/// Frame source reading JSONL from any buffered async reader.
pub struct JsonlSource<R> {
    reader: R,
    line_buffer: String,
    speed: f64,
    paced: bool,
    last_ts_ms: Option<u64>,
    yielded_first: bool,
    name: &'static str,
}

impl JsonlSource<BufReader<Stdin>> {
    /// Live frames on stdin. Arrival timing is the producer's problem,
    /// so no pacing is applied.
    pub fn stdin() -> Self {
        Self::with_reader(BufReader::new(tokio::io::stdin()), 1.0, false, "stdin")
    }
}

impl JsonlSource<BufReader<File>> {
    /// Replay a recorded frame file, paced by its `ts_ms` deltas scaled
    /// by `speed` (2.0 replays twice as fast).
    pub async fn open(path: &Path, speed: f64) -> Result<Self, AcquisitionError> {
        let file = File::open(path).await.map_err(|e| AcquisitionError::Open {
            path: path.to_owned(),
            source: e,
        })?;
        Ok(Self::with_reader(
            BufReader::new(file),
            speed,
            true,
            "jsonl file",
        ))
    }
}

impl<R: AsyncBufRead + Unpin + Send + 'static> JsonlSource<R> {
    fn with_reader(reader: R, speed: f64, paced: bool, name: &'static str) -> Self {
        let speed = if speed > 0.0 { speed } else { 1.0 };
        Self {
            reader,
            line_buffer: String::new(),
            speed,
            paced,
            last_ts_ms: None,
            yielded_first: false,
            name,
        }
    }

    async fn pace(&mut self, ts_ms: Option<u64>) {
        if !self.paced {
            return;
        }
        if !self.yielded_first {
            self.yielded_first = true;
            self.last_ts_ms = ts_ms;
            return;
        }
        let delta_ms = match (self.last_ts_ms, ts_ms) {
            (Some(prev), Some(cur)) => cur.saturating_sub(prev),
            _ => DEFAULT_FRAME_INTERVAL_MS,
        };
        self.last_ts_ms = ts_ms;
        sleep(Duration::from_secs_f64(
            delta_ms as f64 / 1000.0 / self.speed,
        ))
        .await;
    }
}

#[async_trait]
impl<R: AsyncBufRead + Unpin + Send + 'static> FrameSource for JsonlSource<R> {
    async fn next_frame(&mut self) -> Result<FrameEvent, AcquisitionError> {
        loop {
            self.line_buffer.clear();
            let bytes = self.reader.read_line(&mut self.line_buffer).await?;
            if bytes == 0 {
                return Ok(FrameEvent::Eof);
            }

            let line = self.line_buffer.trim();
            if line.is_empty() {
                continue;
            }

            let record: FrameRecord = match serde_json::from_str(line) {
                Ok(record) => record,
                Err(e) => {
                    warn!(error = %e, "Skipping malformed frame line");
                    continue;
                }
            };

            self.pace(record.ts_ms).await;
            return Ok(FrameEvent::Frame(frame_from_record(&record)));
        }
    }

    fn source_name(&self) -> &str {
        self.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::Instant;

    fn reader(data: &'static str) -> BufReader<&'static [u8]> {
        BufReader::new(data.as_bytes())
    }

    async fn collect(source: &mut JsonlSource<BufReader<&'static [u8]>>) -> Vec<LandmarkFrame> {
        let mut frames = Vec::new();
        loop {
            match source.next_frame().await.unwrap() {
                FrameEvent::Frame(frame) => frames.push(frame),
                FrameEvent::Eof => return frames,
            }
        }
    }

    #[tokio::test]
    async fn positional_records_preserve_partial_frames() {
        let data = r#"{"landmarks":[{"x":0.5,"y":0.3},{"x":0.6,"y":0.4,"z":0.2,"v":0.8}]}"#;
        let mut source = JsonlSource::with_reader(reader(data), 1.0, false, "test");

        let frames = collect(&mut source).await;
        assert_eq!(frames.len(), 1);
        let frame = &frames[0];
        assert_eq!(frame.len(), 2);
        assert!(!frame.is_full_body());

        let first = frame.point(0).unwrap();
        assert_eq!(first.x, 0.5);
        assert_eq!(first.visibility, 1.0);

        let second = frame.point(1).unwrap();
        assert_eq!(second.z, 0.2);
        assert_eq!(second.visibility, 0.8);
    }

    #[tokio::test]
    async fn indexed_records_scatter_into_a_full_body_frame() {
        let data = concat!(
            r#"{"landmarks":[{"idx":0,"x":0.5,"y":0.3},"#,
            r#"{"idx":28,"x":0.47,"y":0.88},"#,
            r#"{"idx":99,"x":0.1,"y":0.1}]}"#,
        );
        let mut source = JsonlSource::with_reader(reader(data), 1.0, false, "test");

        let frames = collect(&mut source).await;
        let frame = &frames[0];
        assert_eq!(frame.len(), landmark_ids::FULL_BODY_COUNT);

        let nose = frame.point(landmark_ids::NOSE).unwrap();
        assert_eq!(nose.y, 0.3);
        assert_eq!(nose.visibility, 1.0);

        let ankle = frame.point(landmark_ids::RIGHT_ANKLE).unwrap();
        assert_eq!(ankle.x, 0.47);

        // Unlisted points stay invisible, out-of-range records vanish.
        let hip = frame.point(landmark_ids::LEFT_HIP).unwrap();
        assert_eq!(hip.visibility, 0.0);
    }

    #[tokio::test]
    async fn malformed_and_blank_lines_are_skipped() {
        let data = "not json at all\n\n{\"landmarks\":[{\"x\":0.5,\"y\":0.3}]}\n";
        let mut source = JsonlSource::with_reader(reader(data), 1.0, false, "test");

        let frames = collect(&mut source).await;
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn replay_paces_by_timestamp_deltas() {
        let data = concat!(
            r#"{"ts_ms":0,"landmarks":[{"x":0.5,"y":0.3}]}"#,
            "\n",
            r#"{"ts_ms":100,"landmarks":[{"x":0.5,"y":0.3}]}"#,
            "\n",
            r#"{"ts_ms":400,"landmarks":[{"x":0.5,"y":0.3}]}"#,
            "\n",
        );
        let mut source = JsonlSource::with_reader(reader(data), 2.0, true, "test");
        let start = Instant::now();

        source.next_frame().await.unwrap();
        assert_eq!(start.elapsed(), Duration::ZERO);

        source.next_frame().await.unwrap();
        assert_eq!(start.elapsed(), Duration::from_millis(50));

        source.next_frame().await.unwrap();
        assert_eq!(start.elapsed(), Duration::from_millis(200));
    }

    #[tokio::test(start_paused = true)]
    async fn missing_timestamps_fall_back_to_a_default_interval() {
        let data = concat!(
            r#"{"landmarks":[{"x":0.5,"y":0.3}]}"#,
            "\n",
            r#"{"landmarks":[{"x":0.5,"y":0.3}]}"#,
            "\n",
        );
        let mut source = JsonlSource::with_reader(reader(data), 1.0, true, "test");
        let start = Instant::now();

        source.next_frame().await.unwrap();
        assert_eq!(start.elapsed(), Duration::ZERO);

        source.next_frame().await.unwrap();
        assert_eq!(start.elapsed(), Duration::from_millis(100));
    }

    #[tokio::test(start_paused = true)]
    async fn stdin_layout_is_never_paced() {
        let data = concat!(
            r#"{"ts_ms":0,"landmarks":[{"x":0.5,"y":0.3}]}"#,
            "\n",
            r#"{"ts_ms":5000,"landmarks":[{"x":0.5,"y":0.3}]}"#,
            "\n",
        );
        let mut source = JsonlSource::with_reader(reader(data), 1.0, false, "test");
        let start = Instant::now();

        let frames = collect(&mut source).await;
        assert_eq!(frames.len(), 2);
        assert_eq!(start.elapsed(), Duration::ZERO);
    }
}

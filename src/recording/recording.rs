use chrono::Utc;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, info};

use crate::codec::PackingSchema;
use crate::core::{lerp_vec3, Frame};
use crate::error::Result;
use crate::recording::format::{ExportFormat, RecordingPayload, COMPRESSED_EXTENSION};
use crate::recording::metadata::{Metadata, DEFAULT_GENERATED_BY, PACKED_FORMAT_VERSION};

/// Pause inserted when playback wraps from the crop end back to its start
pub const DEFAULT_TIME_BETWEEN_LOOPS: Duration = Duration::from_millis(50);

const DEFAULT_FILE_NAME: &str = "leap-playback-recording";

const HAND_LERP_PROPS: [&str; 6] = [
    "palmPosition",
    "stabilizedPalmPosition",
    "sphereCenter",
    "direction",
    "palmNormal",
    "palmVelocity",
];

const POINTABLE_LERP_PROPS: [&str; 5] = [
    "mcpPosition",
    "pipPosition",
    "dipPosition",
    "tipPosition",
    "direction",
];

/// Options a recording is created with
#[derive(Debug, Clone)]
pub struct RecordingOptions {
    /// Wrap from the crop end back to the crop start instead of stopping
    pub loop_playback: bool,
    /// Substituted for the negative delay at the loop seam
    pub time_between_loops: Duration,
    pub generated_by: String,
    pub protocol_version: Option<Value>,
    pub service_version: Option<Value>,
    pub schema: PackingSchema,
}

impl Default for RecordingOptions {
    fn default() -> Self {
        Self {
            loop_playback: true,
            time_between_loops: DEFAULT_TIME_BETWEEN_LOOPS,
            generated_by: DEFAULT_GENERATED_BY.to_string(),
            protocol_version: None,
            service_version: None,
            schema: PackingSchema::leap_default(),
        }
    }
}

/// An editable sequence of frames with a crop window and a playback cursor.
///
/// The crop window is `[left_crop, right_crop)` in frame indices. Cropping
/// never discards frames; exports only include the window.
#[derive(Debug, Clone)]
pub struct Recording {
    options: RecordingOptions,
    frames: Vec<Frame>,
    frame_index: usize,
    left_crop: usize,
    right_crop: usize,
    metadata: Metadata,
    source: Option<String>,
    loading: bool,
}

impl Default for Recording {
    fn default() -> Self {
        Self::new(RecordingOptions::default())
    }
}

impl Recording {
    pub fn new(options: RecordingOptions) -> Self {
        let mut recording = Self {
            options,
            frames: Vec::new(),
            frame_index: 0,
            left_crop: 0,
            right_crop: 0,
            metadata: Metadata::default(),
            source: None,
            loading: false,
        };
        recording.set_metadata();
        recording
    }

    pub fn with_frames(options: RecordingOptions, frames: Vec<Frame>) -> Self {
        let mut recording = Self::new(options);
        recording.set_frames(frames);
        recording
    }

    /// Replace the frames, resetting the cursor and the crop window
    pub fn set_frames(&mut self, frames: Vec<Frame>) {
        self.frames = frames;
        self.frame_index = 0;
        self.left_crop = 0;
        self.right_crop = self.frames.len();
        self.set_metadata();
        debug!(frames = self.frames.len(), "recording frames set");
    }

    pub fn add_frame(&mut self, frame: Frame) {
        self.frames.push(frame);
    }

    pub fn frames(&self) -> &[Frame] {
        &self.frames
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// True when the recording holds no frames
    pub fn blank(&self) -> bool {
        self.frames.is_empty()
    }

    /// True when frames are present and no load is in flight
    pub fn loaded(&self) -> bool {
        !self.loading && !self.frames.is_empty()
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub(crate) fn set_loading(&mut self, loading: bool) {
        self.loading = loading;
    }

    pub fn options(&self) -> &RecordingOptions {
        &self.options
    }

    pub fn set_loop(&mut self, loop_playback: bool) {
        self.options.loop_playback = loop_playback;
    }

    pub fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    pub fn metadata_mut(&mut self) -> &mut Metadata {
        &mut self.metadata
    }

    pub fn source(&self) -> Option<&str> {
        self.source.as_deref()
    }

    /// Remember where the recording came from; names an untitled recording
    /// after the location
    pub fn set_source(&mut self, location: &str) {
        self.source = Some(location.to_string());
        if self.metadata.title.is_none() {
            self.metadata.title = Some(title_from_location(location));
        }
    }

    // ---- cursor ----

    pub fn frame_index(&self) -> usize {
        self.frame_index
    }

    /// Move the cursor, clamped to the frames present
    pub fn set_frame_index(&mut self, index: usize) {
        self.frame_index = index.min(self.frames.len().saturating_sub(1));
    }

    pub fn current_frame(&self) -> Option<&Frame> {
        self.frames.get(self.frame_index)
    }

    /// The frame playback shows after the current one, wrapping inside the
    /// crop window
    pub fn next_frame(&self) -> Option<&Frame> {
        self.frames.get(self.wrapped(self.frame_index + 1))
    }

    /// Step the cursor forward inside the crop window.
    ///
    /// Returns false, leaving the cursor on the last frame of the window, when
    /// the window is exhausted and looping is off.
    pub fn advance_frame(&mut self) -> bool {
        let next = self.frame_index + 1;
        if next >= self.right_crop && !self.options.loop_playback {
            return false;
        }
        self.frame_index = self.wrapped(next);
        true
    }

    /// Move the cursor to the crop start if it sits on the window's last
    /// frame or outside the window
    pub fn ready_play(&mut self) {
        if self.frame_index < self.left_crop || self.frame_index + 1 >= self.right_crop {
            self.frame_index = self.left_crop;
        }
    }

    /// Delay between the current frame and the next one.
    ///
    /// At the loop seam the timestamps run backwards; the configured
    /// `time_between_loops` is used instead.
    pub fn time_to_next_frame(&self) -> Duration {
        let delta = match (
            self.current_frame().and_then(Frame::timestamp),
            self.next_frame().and_then(Frame::timestamp),
        ) {
            (Some(current), Some(next)) => next - current,
            _ => -1,
        };

        if delta < 0 {
            self.options.time_between_loops
        } else {
            Duration::from_micros(delta as u64)
        }
    }

    pub fn clone_current_frame(&self) -> Option<Frame> {
        self.current_frame().cloned()
    }

    /// Copy of the current frame with hand and finger positions moved a
    /// fraction `t` of the way toward the next frame
    pub fn lerp_frame(&self, t: f64) -> Option<Frame> {
        let mut out = self.clone_current_frame()?;
        let next = self.next_frame()?;

        lerp_collection(&mut out, next, "hands", &HAND_LERP_PROPS, t);
        lerp_collection(&mut out, next, "pointables", &POINTABLE_LERP_PROPS, t);
        Some(out)
    }

    fn wrapped(&self, index: usize) -> usize {
        let index = index % self.right_crop.max(1);
        index.max(self.left_crop)
    }

    // ---- crop ----

    pub fn left_crop_position(&self) -> usize {
        self.left_crop
    }

    pub fn right_crop_position(&self) -> usize {
        self.right_crop
    }

    /// Pin the crop start to the cursor.
    ///
    /// Ordering against the right bound is not enforced here.
    pub fn left_crop(&mut self) {
        self.left_crop = self.frame_index;
    }

    /// Pin the crop end to the cursor.
    ///
    /// Ordering against the left bound is not enforced here.
    pub fn right_crop(&mut self) {
        self.right_crop = self.frame_index;
    }

    /// Set both crop bounds directly, clamped to the frames present
    pub fn set_crop(&mut self, left: usize, right: usize) {
        let len = self.frames.len();
        self.left_crop = left.min(len);
        self.right_crop = right.min(len);
    }

    pub fn cropped_frame_data(&self) -> &[Frame] {
        let end = self.right_crop.min(self.frames.len());
        let start = self.left_crop.min(end);
        &self.frames[start..end]
    }

    /// Keep one frame out of every `factor + 1`, dropping the rest
    pub fn cull_frames(&mut self, factor: usize) {
        let factor = factor.max(1);
        let before = self.frames.len();
        self.frames = std::mem::take(&mut self.frames)
            .into_iter()
            .enumerate()
            .filter(|(i, _)| i % (factor + 1) == factor)
            .map(|(_, frame)| frame)
            .collect();

        let len = self.frames.len();
        self.right_crop = self.right_crop.min(len);
        self.left_crop = self.left_crop.min(len);
        self.frame_index = self.frame_index.min(len.saturating_sub(1));
        self.set_metadata();
        debug!(before, after = len, "culled frames");
    }

    // ---- statistics and metadata ----

    /// Average frames per second over all frames
    pub fn frame_rate(&self) -> f64 {
        let (Some(first), Some(last)) = (
            self.frames.first().and_then(Frame::timestamp),
            self.frames.last().and_then(Frame::timestamp),
        ) else {
            return 0.0;
        };

        let duration = last - first;
        if self.frames.len() < 2 || duration <= 0 {
            return 0.0;
        }
        (self.frames.len() - 1) as f64 / duration as f64 * 1_000_000.0
    }

    /// Refresh the derived metadata fields; title and foreign keys are kept
    pub fn set_metadata(&mut self) {
        self.metadata = self.fresh_metadata();
    }

    fn fresh_metadata(&self) -> Metadata {
        let mut metadata = self.metadata.clone();
        metadata.format_version = Some(PACKED_FORMAT_VERSION);
        metadata.generated_by = self.options.generated_by.clone();
        metadata.frames = self.right_crop.saturating_sub(self.left_crop);
        metadata.frame_rate = self.frame_rate();
        metadata.modified = Some(Utc::now().to_rfc3339());
        if self.options.protocol_version.is_some() {
            metadata.protocol_version = self.options.protocol_version.clone();
        }
        if self.options.service_version.is_some() {
            metadata.service_version = self.options.service_version.clone();
        }
        if metadata.title.is_none() {
            metadata.title = self.source.as_deref().map(title_from_location);
        }
        metadata
    }

    // ---- import / export ----

    /// Metadata plus the packed crop window
    pub fn to_payload(&self) -> Result<RecordingPayload> {
        RecordingPayload::packed(
            self.fresh_metadata(),
            &self.options.schema,
            self.cropped_frame_data(),
        )
    }

    /// Serialize the crop window
    pub fn export(&self, format: ExportFormat) -> Result<String> {
        let text = self.to_payload()?.encode(format)?;
        info!(
            frames = self.cropped_frame_data().len(),
            bytes = text.len(),
            ?format,
            "exported recording"
        );
        Ok(text)
    }

    /// Replace this recording with serialized data.
    ///
    /// `hint` is a file name or location; a `.lz` suffix selects the
    /// compressed encoding.
    pub fn read_file_data(&mut self, text: &str, hint: &str) -> Result<()> {
        let payload = RecordingPayload::decode(text, ExportFormat::from_hint(hint))?;
        let frames = payload.decode_frames()?;

        self.metadata = payload.metadata;
        self.set_frames(frames);
        self.loading = false;
        info!(frames = self.frames.len(), hint, "loaded recording");
        Ok(())
    }

    /// File name for saving: the title without whitespace, the rounded
    /// frame rate, and the extension for `format`
    pub fn suggested_file_name(&self, format: ExportFormat) -> String {
        let mut name: String = match &self.metadata.title {
            Some(title) => title.split_whitespace().collect(),
            None => String::new(),
        };
        if name.is_empty() {
            name = DEFAULT_FILE_NAME.to_string();
        }

        if self.metadata.frame_rate > 0.0 {
            name.push_str(&format!("-{}fps", self.metadata.frame_rate.round() as i64));
        }

        name.push_str(format.extension());
        name
    }
}

fn title_from_location(location: &str) -> String {
    let name = location.rsplit(['/', '\\']).next().unwrap_or(location);
    let name = name.strip_suffix(COMPRESSED_EXTENSION).unwrap_or(name);
    let name = name.strip_suffix(".json").unwrap_or(name);
    name.to_string()
}

fn lerp_collection(out: &mut Frame, next: &Frame, key: &str, props: &[&str], t: f64) {
    let next_items = match next.get(key) {
        Some(Value::Array(items)) => items,
        _ => return,
    };
    let Some(Value::Array(items)) = out.fields_mut().get_mut(key) else {
        return;
    };

    for (item, next_item) in items.iter_mut().zip(next_items) {
        for prop in props {
            let Some(target) = next_item.get(*prop) else {
                continue;
            };
            let Some(current) = item.get(*prop) else {
                continue;
            };
            if let Some(value) = lerp_vec3(current, target, t) {
                item[*prop] = value;
            }
        }
    }
}

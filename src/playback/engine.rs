use std::time::Duration;
use tracing::{debug, info, warn};

use crate::config::EngineConfig;
use crate::core::{EngineEvents, Frame, FrameBuffer};
use crate::error::{Result, SpyError};
use crate::input::RecordingSource;
use crate::playback::{FrameSink, LiveGate, PlaybackOptions, PlayerState, RepeatingTask};
use crate::recording::Recording;

/// Capture and playback engine for motion frames.
///
/// Live frames come in through [`push`](Self::push); everything the engine
/// emits, live or played back, goes to the sink it was built with. Playback
/// is driven by the host calling [`tick`](Self::tick) with its clock.
pub struct PlaybackEngine {
    config: EngineConfig,
    recording: Recording,
    capture: Option<FrameBuffer>,
    state: PlayerState,
    sink: Box<dyn FrameSink>,
    live_gate: Option<LiveGate>,
    task: RepeatingTask,
    next_due: Option<Duration>,
    paused_by_live: bool,
    events: EngineEvents,
}

impl PlaybackEngine {
    pub fn new(config: EngineConfig, sink: impl FrameSink + 'static) -> Self {
        let live_gate = if config.pause_on_hand {
            Some(crate::playback::pause_on_hand())
        } else {
            None
        };

        Self {
            recording: Recording::new(config.recording_options()),
            config,
            capture: None,
            state: PlayerState::Idle,
            sink: Box::new(sink),
            live_gate,
            task: RepeatingTask::new(),
            next_due: None,
            paused_by_live: false,
            events: EngineEvents::default(),
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn state(&self) -> PlayerState {
        self.state
    }

    pub fn is_playing(&self) -> bool {
        self.state == PlayerState::Playing
    }

    pub fn recording(&self) -> &Recording {
        &self.recording
    }

    pub fn recording_mut(&mut self) -> &mut Recording {
        &mut self.recording
    }

    /// Replace the current recording
    pub fn set_recording(&mut self, recording: Recording) -> Result<()> {
        if self.state != PlayerState::Idle {
            return Err(SpyError::state("replace the recording", self.state));
        }
        self.recording = recording;
        self.paused_by_live = false;
        Ok(())
    }

    pub fn loaded(&self) -> bool {
        self.recording.loaded()
    }

    pub fn events(&self) -> &EngineEvents {
        &self.events
    }

    pub fn events_mut(&mut self) -> &mut EngineEvents {
        &mut self.events
    }

    /// Install (or remove) the predicate that lets live frames interrupt playback
    pub fn set_live_gate(&mut self, gate: Option<LiveGate>) {
        self.live_gate = gate;
    }

    /// Ring buffer of the capture in progress
    pub fn capture(&self) -> Option<&FrameBuffer> {
        self.capture.as_ref()
    }

    // ---- capture ----

    pub fn record(&mut self) -> Result<()> {
        match self.state {
            PlayerState::Playing => Err(SpyError::state("record", self.state)),
            PlayerState::Recording => Ok(()),
            PlayerState::Idle => {
                self.capture = Some(FrameBuffer::new(self.config.max_frames)?);
                self.paused_by_live = false;
                self.state = PlayerState::Recording;
                info!(max_frames = self.config.max_frames, "recording started");
                Ok(())
            }
        }
    }

    /// Recording, but no frame has arrived yet
    pub fn record_pending(&self) -> bool {
        self.state == PlayerState::Recording
            && self.capture.as_ref().map_or(true, FrameBuffer::is_empty)
    }

    /// Turn the capture into the current recording; returns its frame count.
    ///
    /// An empty capture is dropped and the current recording is kept.
    pub fn finish_recording(&mut self) -> Result<usize> {
        if self.state != PlayerState::Recording {
            return Err(SpyError::state("finish recording", self.state));
        }
        Ok(self.complete_capture())
    }

    fn complete_capture(&mut self) -> usize {
        let snapshot = match self.capture.take() {
            Some(capture) if !capture.is_empty() => capture.snapshot(),
            _ => {
                self.state = PlayerState::Idle;
                info!("empty capture abandoned");
                return 0;
            }
        };

        let count = snapshot.frames.len();
        self.recording = Recording::new(self.config.recording_options());
        self.recording.set_frames(snapshot.frames);
        self.state = PlayerState::Idle;

        info!(
            frames = count,
            first_frame_ordinal = snapshot.first_frame_ordinal,
            "recording finished"
        );
        self.events.recording_finished.emit(&count);
        count
    }

    /// Leave the current mode.
    ///
    /// A capture with frames becomes the recording, an empty one is dropped.
    /// Playback stops with the cursor back at the crop start.
    pub fn stop(&mut self) {
        match self.state {
            PlayerState::Recording => {
                self.complete_capture();
            }
            PlayerState::Playing => {
                self.halt_playback();
                let left = self.recording.left_crop_position();
                self.recording.set_frame_index(left);
                info!("playback stopped");
            }
            PlayerState::Idle => {}
        }
        self.paused_by_live = false;
    }

    // ---- playback ----

    pub fn play(&mut self, options: impl Into<PlaybackOptions>) -> Result<()> {
        if self.state == PlayerState::Recording {
            return Err(SpyError::state("play", self.state));
        }

        let options = options.into();
        self.recording.set_loop(options.loop_playback);
        if self.recording.cropped_frame_data().is_empty() {
            debug!(
                left = self.recording.left_crop_position(),
                right = self.recording.right_crop_position(),
                "nothing to play in the crop window"
            );
            return Ok(());
        }

        self.recording.ready_play();
        self.start_playback();
        info!(
            frame = self.recording.frame_index(),
            loop_playback = options.loop_playback,
            "playback started"
        );
        Ok(())
    }

    /// Stop playback and keep the cursor where it is
    pub fn pause(&mut self) -> Result<()> {
        match self.state {
            PlayerState::Recording => Err(SpyError::state("pause", self.state)),
            PlayerState::Playing => {
                self.halt_playback();
                info!(frame = self.recording.frame_index(), "playback paused");
                Ok(())
            }
            PlayerState::Idle => {
                self.paused_by_live = false;
                Ok(())
            }
        }
    }

    /// Play when idle, pause when playing
    pub fn toggle(&mut self) -> Result<()> {
        match self.state {
            PlayerState::Recording => Err(SpyError::state("toggle playback", self.state)),
            PlayerState::Playing => self.pause(),
            PlayerState::Idle => self.play(self.config.loop_playback),
        }
    }

    fn start_playback(&mut self) {
        self.paused_by_live = false;
        self.next_due = None;
        self.task.arm();
        self.state = PlayerState::Playing;
    }

    fn halt_playback(&mut self) {
        self.task.cancel();
        self.next_due = None;
        self.state = PlayerState::Idle;
    }

    /// Run the playback task for host time `now`.
    ///
    /// Delivers the frame under the cursor once the recorded delay since the
    /// previous delivery has passed, then advances. Returns true when a
    /// frame was delivered.
    pub fn tick(&mut self, now: Duration) -> bool {
        let Some(generation) = self.task.fire() else {
            return false;
        };

        if matches!(self.next_due, Some(due) if now < due) {
            self.task.rearm(generation);
            return false;
        }

        let Some(frame) = self.recording.clone_current_frame() else {
            warn!(frame = self.recording.frame_index(), "cursor outside the recording");
            self.halt_playback();
            return false;
        };

        self.next_due = Some(now + self.recording.time_to_next_frame());
        self.sink.deliver(&frame);

        if !self.recording.advance_frame() {
            self.halt_playback();
            info!("playback finished");
            self.events.playback_finished.emit(&());
            return true;
        }

        self.task.rearm(generation);
        true
    }

    /// Deliver a single frame to the sink outside of playback
    pub fn send_frame(&mut self, frame: &Frame) {
        self.sink.deliver(frame);
    }

    // ---- live source ----

    /// Hand the engine a frame from the live device
    pub fn push(&mut self, frame: Frame) {
        match self.state {
            PlayerState::Idle => {
                if self.paused_by_live && !self.gate_matches(&frame) {
                    debug!("live source idle, resuming playback");
                    self.start_playback();
                    return;
                }
                self.sink.deliver(&frame);
            }
            PlayerState::Recording => {
                self.sink.deliver(&frame);
                let Some(capture) = self.capture.as_mut() else {
                    return;
                };
                if capture.add(frame) {
                    let capacity = capture.capacity();
                    debug!(capacity, "capture buffer wrapped");
                    self.events.max_frames.emit(&capacity);
                    if self.config.finish_on_max_frames {
                        self.complete_capture();
                    }
                }
            }
            PlayerState::Playing => {
                if self.gate_matches(&frame) {
                    debug!("live frame interrupts playback");
                    self.halt_playback();
                    self.paused_by_live = true;
                    self.sink.deliver(&frame);
                }
            }
        }
    }

    fn gate_matches(&mut self, frame: &Frame) -> bool {
        self.live_gate.as_mut().map_or(false, |gate| gate(frame))
    }

    // ---- import ----

    /// Replace the recording with one fetched from `source`.
    ///
    /// Returns whether the load succeeded. Fetch and decode failures are
    /// logged and raised on the `load_failed` channel; the engine keeps an
    /// empty, unloaded recording.
    pub async fn load(&mut self, source: &dyn RecordingSource, location: &str) -> Result<bool> {
        if self.state != PlayerState::Idle {
            return Err(SpyError::state("load a recording", self.state));
        }

        self.recording = Recording::new(self.config.recording_options());
        self.recording.set_loading(true);
        debug!(location, "loading recording");

        let outcome = match source.fetch(location).await {
            Ok(text) => self
                .recording
                .read_file_data(&text, location)
                .map_err(anyhow::Error::from),
            Err(e) => Err(e),
        };

        match outcome {
            Ok(()) => {
                self.recording.set_loading(false);
                self.recording.set_source(location);
                Ok(true)
            }
            Err(e) => {
                let message = format!("{:#}", e.context(format!("Failed to load {}", location)));
                warn!("{}", message);
                self.recording = Recording::new(self.config.recording_options());
                self.events.load_failed.emit(&message);
                Ok(false)
            }
        }
    }
}

impl std::fmt::Debug for PlaybackEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlaybackEngine")
            .field("state", &self.state)
            .field("frames", &self.recording.len())
            .field("frame_index", &self.recording.frame_index())
            .field("paused_by_live", &self.paused_by_live)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::FileSource;
    use crate::playback::pause_on_hand;
    use serde_json::json;
    use std::sync::mpsc::{channel, Receiver};

    const MS: Duration = Duration::from_millis(1);

    fn engine_with(config: EngineConfig) -> (PlaybackEngine, Receiver<Frame>) {
        let (tx, rx) = channel();
        (PlaybackEngine::new(config, tx), rx)
    }

    fn engine() -> (PlaybackEngine, Receiver<Frame>) {
        engine_with(EngineConfig::default())
    }

    /// Frames `0..n`, 10ms apart
    fn frames(n: i64) -> Vec<Frame> {
        (0..n).map(|i| Frame::new(i, i * 10_000)).collect()
    }

    fn hand_frame(id: i64) -> Frame {
        Frame::new(id, 0).with("hands", json!([{"id": 1}]))
    }

    fn loaded_engine(n: i64) -> (PlaybackEngine, Receiver<Frame>) {
        let (mut engine, rx) = engine();
        let recording = Recording::with_frames(engine.config().recording_options(), frames(n));
        engine.set_recording(recording).unwrap();
        (engine, rx)
    }

    fn ids(rx: &Receiver<Frame>) -> Vec<i64> {
        rx.try_iter().filter_map(|f| f.id()).collect()
    }

    /// Tick far enough apart that every tick is due
    fn run_ticks(engine: &mut PlaybackEngine, count: u64) {
        for i in 0..count {
            engine.tick(Duration::from_secs(i + 1));
        }
    }

    #[test]
    fn test_record_and_stop() {
        let (mut engine, rx) = engine();
        let (done_tx, done_rx) = channel();
        engine
            .events_mut()
            .recording_finished
            .on(move |n| done_tx.send(*n).unwrap());

        engine.record().unwrap();
        assert!(engine.record_pending());

        for frame in frames(4) {
            engine.push(frame);
        }
        assert!(!engine.record_pending());
        // live frames still reach the sink while capturing
        assert_eq!(ids(&rx), vec![0, 1, 2, 3]);

        engine.stop();
        assert_eq!(engine.state(), PlayerState::Idle);
        assert_eq!(engine.recording().len(), 4);
        assert!(engine.loaded());
        assert_eq!(done_rx.try_iter().collect::<Vec<_>>(), vec![4]);
    }

    #[test]
    fn test_stop_while_pending_keeps_recording() {
        let (mut engine, _rx) = loaded_engine(3);
        engine.record().unwrap();
        engine.stop();

        assert_eq!(engine.state(), PlayerState::Idle);
        assert_eq!(engine.recording().len(), 3);
        assert!(engine.capture().is_none());
    }

    #[test]
    fn test_capture_ring_overflow() {
        let (mut engine, _rx) = engine_with(EngineConfig {
            max_frames: 3,
            ..EngineConfig::default()
        });
        let (tx, laps) = channel();
        engine.events_mut().max_frames.on(move |cap| tx.send(*cap).unwrap());

        engine.record().unwrap();
        for frame in frames(5) {
            engine.push(frame);
        }
        assert_eq!(laps.try_iter().collect::<Vec<_>>(), vec![3]);
        assert_eq!(engine.state(), PlayerState::Recording);

        assert_eq!(engine.finish_recording().unwrap(), 3);
        let kept: Vec<_> = engine.recording().frames().iter().filter_map(Frame::id).collect();
        assert_eq!(kept, vec![2, 3, 4]);
    }

    #[test]
    fn test_finish_on_max_frames() {
        let (mut engine, _rx) = engine_with(EngineConfig {
            max_frames: 2,
            finish_on_max_frames: true,
            ..EngineConfig::default()
        });
        engine.record().unwrap();
        for frame in frames(3) {
            engine.push(frame);
        }
        assert_eq!(engine.state(), PlayerState::Idle);
        assert_eq!(engine.recording().len(), 2);
    }

    #[test]
    fn test_zero_capacity_rejected() {
        let (mut engine, _rx) = engine_with(EngineConfig {
            max_frames: 0,
            ..EngineConfig::default()
        });
        assert!(matches!(engine.record(), Err(SpyError::Capacity(0))));
        assert_eq!(engine.state(), PlayerState::Idle);
    }

    #[test]
    fn test_state_errors() {
        let (mut engine, _rx) = loaded_engine(3);
        engine.record().unwrap();
        assert!(matches!(engine.play(true), Err(SpyError::State { .. })));
        assert!(engine.pause().is_err());
        assert!(engine.toggle().is_err());
        assert!(engine.set_recording(Recording::default()).is_err());
        engine.stop();

        engine.play(true).unwrap();
        let err = engine.record().unwrap_err();
        assert_eq!(err.to_string(), "cannot record while playing");
        assert!(engine.finish_recording().is_err());
    }

    #[test]
    fn test_play_without_loop_finishes() {
        let (mut engine, rx) = loaded_engine(3);
        let (tx, finished) = channel();
        engine.events_mut().playback_finished.on(move |_| tx.send(()).unwrap());

        engine.play(false).unwrap();
        run_ticks(&mut engine, 5);

        assert_eq!(ids(&rx), vec![0, 1, 2]);
        assert_eq!(engine.state(), PlayerState::Idle);
        assert_eq!(engine.recording().frame_index(), 2);
        assert_eq!(finished.try_iter().count(), 1);

        // playing again restarts the window
        engine.play(false).unwrap();
        run_ticks(&mut engine, 1);
        assert_eq!(ids(&rx), vec![0]);
    }

    #[test]
    fn test_looping_playback_within_crop() {
        let (mut engine, rx) = loaded_engine(6);
        let recording = engine.recording_mut();
        recording.set_frame_index(1);
        recording.left_crop();
        recording.set_frame_index(4);
        recording.right_crop();
        recording.set_frame_index(1);

        engine.play(true).unwrap();
        run_ticks(&mut engine, 7);
        assert_eq!(ids(&rx), vec![1, 2, 3, 1, 2, 3, 1]);
        assert!(engine.is_playing());
    }

    #[test]
    fn test_tick_waits_for_recorded_delay() {
        let (mut engine, rx) = loaded_engine(3);
        engine.play(true).unwrap();

        assert!(engine.tick(Duration::ZERO));
        assert!(!engine.tick(5 * MS));
        assert!(engine.tick(10 * MS));
        assert!(!engine.tick(15 * MS));
        assert!(engine.tick(20 * MS));
        // loop seam uses the configured pause
        assert!(!engine.tick(60 * MS));
        assert!(engine.tick(70 * MS));

        assert_eq!(ids(&rx), vec![0, 1, 2, 0]);
    }

    #[test]
    fn test_pause_resumes_at_cursor() {
        let (mut engine, rx) = loaded_engine(5);
        engine.play(true).unwrap();
        run_ticks(&mut engine, 2);
        engine.pause().unwrap();

        // a cancelled task delivers nothing
        assert!(!engine.tick(Duration::from_secs(60)));
        assert_eq!(engine.recording().frame_index(), 2);

        engine.toggle().unwrap();
        run_ticks(&mut engine, 1);
        assert_eq!(ids(&rx), vec![0, 1, 2]);
    }

    #[test]
    fn test_stop_rewinds_to_crop_start() {
        let (mut engine, _rx) = loaded_engine(5);
        engine.play(true).unwrap();
        run_ticks(&mut engine, 3);
        engine.stop();
        assert_eq!(engine.state(), PlayerState::Idle);
        assert_eq!(engine.recording().frame_index(), 0);
    }

    #[test]
    fn test_play_blank_recording_is_noop() {
        let (mut engine, _rx) = engine();
        engine.play(true).unwrap();
        assert_eq!(engine.state(), PlayerState::Idle);
    }

    #[test]
    fn test_play_moves_cursor_into_crop_window() {
        let (mut engine, rx) = loaded_engine(8);
        engine.recording_mut().set_crop(3, 6);
        assert_eq!(engine.recording().frame_index(), 0);

        engine.play(false).unwrap();
        run_ticks(&mut engine, 10);
        assert_eq!(ids(&rx), vec![3, 4, 5]);
    }

    #[test]
    fn test_play_empty_crop_window_stays_idle() {
        let (mut engine, rx) = loaded_engine(8);
        engine.recording_mut().set_frame_index(3);
        engine.recording_mut().set_crop(3, 3);

        engine.play(true).unwrap();
        assert_eq!(engine.state(), PlayerState::Idle);
        run_ticks(&mut engine, 5);
        assert!(ids(&rx).is_empty());
    }

    #[test]
    fn test_play_after_right_crop_keeps_first_frame() {
        let (mut engine, rx) = loaded_engine(8);
        let recording = engine.recording_mut();
        recording.set_frame_index(5);
        recording.right_crop();

        engine.play(false).unwrap();
        run_ticks(&mut engine, 10);
        assert_eq!(ids(&rx), vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn test_finish_empty_capture_keeps_recording() {
        let (mut engine, _rx) = loaded_engine(3);
        let (tx, done) = channel();
        engine
            .events_mut()
            .recording_finished
            .on(move |n| tx.send(*n).unwrap());

        engine.record().unwrap();
        assert_eq!(engine.finish_recording().unwrap(), 0);

        assert_eq!(engine.state(), PlayerState::Idle);
        assert_eq!(engine.recording().len(), 3);
        assert!(engine.capture().is_none());
        assert_eq!(done.try_iter().count(), 0);
    }

    #[test]
    fn test_live_frames_suppressed_during_playback() {
        let (mut engine, rx) = loaded_engine(3);
        engine.play(true).unwrap();
        engine.push(hand_frame(99));
        assert!(engine.is_playing());
        assert!(ids(&rx).is_empty());
    }

    #[test]
    fn test_live_gate_pauses_and_resumes() {
        let (mut engine, rx) = loaded_engine(3);
        engine.set_live_gate(Some(pause_on_hand()));
        engine.play(true).unwrap();
        run_ticks(&mut engine, 1);

        engine.push(hand_frame(99));
        assert_eq!(engine.state(), PlayerState::Idle);
        engine.push(hand_frame(98));
        assert_eq!(ids(&rx), vec![0, 99, 98]);

        // hand gone: playback picks up where it left off
        engine.push(Frame::new(97, 0));
        assert!(engine.is_playing());
        run_ticks(&mut engine, 1);
        assert_eq!(ids(&rx), vec![1]);
    }

    #[test]
    fn test_idle_passthrough_and_send_frame() {
        let (mut engine, rx) = engine();
        engine.push(Frame::new(1, 0));
        engine.send_frame(&Frame::new(2, 0));
        assert_eq!(ids(&rx), vec![1, 2]);
    }

    #[tokio::test]
    async fn test_load_from_source() {
        let dir = tempfile::tempdir().unwrap();
        let recording = Recording::with_frames(Default::default(), frames(4));
        crate::input::save_file(&recording, dir.path().join("wave.json.lz")).unwrap();

        let (mut engine, _rx) = engine();
        let source = FileSource::with_base_dir(dir.path());
        assert!(engine.load(&source, "wave.json.lz").await.unwrap());
        assert!(engine.loaded());
        assert_eq!(engine.recording().len(), 4);
        assert_eq!(engine.recording().metadata().title.as_deref(), Some("wave"));
    }

    #[tokio::test]
    async fn test_load_failure_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let (mut engine, _rx) = loaded_engine(2);
        let (tx, failures) = channel();
        engine.events_mut().load_failed.on(move |msg: &String| tx.send(msg.clone()).unwrap());

        let source = FileSource::with_base_dir(dir.path());
        assert!(!engine.load(&source, "missing.json").await.unwrap());
        assert!(!engine.loaded());
        assert!(!engine.recording().is_loading());

        let messages: Vec<String> = failures.try_iter().collect();
        assert_eq!(messages.len(), 1);
        assert!(messages[0].contains("missing.json"));
    }
}

//! Tracking and recording lifecycle orchestration
//!
//! One worker thread owns the capture/processing cycle and never blocks on
//! disk; session logging runs behind a bounded queue on its own thread.
//! The front end talks to the `Orchestrator` only: lifecycle controls plus
//! read-only access to the latest record.

use crate::clock::MonotonicClock;
use crate::config::PipelineConfig;
use crate::perf::{PerformanceMonitor, PerformanceSample};
use crate::record::FrameRecord;
use crate::PipelineError;
use eye_metrics::{extract_regions, eye_aspect_ratio, EyeSide, EyeStateTracker};
use landmark_tracker::LandmarkTracker;
use pupil_detect::{CalibrationManager, PupilLocator};
use safety_monitor::{SafetyMonitor, SafetyState};
use session_log::{Session, SessionSummary};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;
use std::time::Instant;
use tokio::sync::watch;
use tracing::{error, info, warn};
use video_frame::{FrameSource, VideoFrame};

/// Lifecycle state visible to the front end
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    Idle,
    Tracking,
    Recording,
}

/// State shared between the orchestrator and its worker thread
struct Shared {
    running: AtomicBool,
    recalibrate: AtomicBool,
    session: Mutex<Option<Session>>,
    latest: watch::Sender<Option<FrameRecord>>,
}

/// Pipeline lifecycle controller
pub struct Orchestrator {
    config: PipelineConfig,
    shared: Arc<Shared>,
    latest_rx: watch::Receiver<Option<FrameRecord>>,
    worker: Option<JoinHandle<()>>,
}

impl Orchestrator {
    pub fn new(config: PipelineConfig) -> Self {
        let (latest_tx, latest_rx) = watch::channel(None);
        Self {
            config,
            shared: Arc::new(Shared {
                running: AtomicBool::new(false),
                recalibrate: AtomicBool::new(false),
                session: Mutex::new(None),
                latest: latest_tx,
            }),
            latest_rx,
            worker: None,
        }
    }

    /// Begin pulling frames through the measurement chain
    ///
    /// Re-entrant calls while tracking are no-ops.
    pub fn start_tracking(
        &mut self,
        source: Box<dyn FrameSource>,
        tracker: Box<dyn LandmarkTracker>,
    ) -> Result<(), PipelineError> {
        if self.shared.running.load(Ordering::Acquire) {
            info!("start_tracking ignored: already tracking");
            return Ok(());
        }
        // Reap a worker that stopped on its own (source exhausted).
        if let Some(handle) = self.worker.take() {
            let _ = handle.join();
        }

        self.shared.latest.send_replace(None);
        self.shared.running.store(true, Ordering::Release);

        let worker = Worker::new(self.config.clone(), Arc::clone(&self.shared), source, tracker);
        let handle = std::thread::Builder::new()
            .name("gaze-pipeline".into())
            .spawn(move || worker.run())
            .map_err(|e| {
                self.shared.running.store(false, Ordering::Release);
                PipelineError::Config(e.to_string())
            })?;
        self.worker = Some(handle);

        info!(
            "Tracking started at {:.0} Hz target",
            self.config.perf.target_frame_rate_hz
        );
        Ok(())
    }

    /// Begin tracking with the backend selected by configuration
    pub fn start_tracking_configured(
        &mut self,
        source: Box<dyn FrameSource>,
    ) -> Result<(), PipelineError> {
        let tracker = landmark_tracker::create_tracker(&self.config.tracker)?;
        self.start_tracking(source, tracker)
    }

    /// Halt the processing cycle; stops any active recording first
    pub fn stop_tracking(&mut self) -> Result<Option<SessionSummary>, PipelineError> {
        let summary = self.stop_recording()?;

        self.shared.running.store(false, Ordering::Release);
        if let Some(handle) = self.worker.take() {
            if handle.join().is_err() {
                error!("Processing worker panicked");
            }
        }
        Ok(summary)
    }

    /// Open a new recording session
    ///
    /// Fails recoverably if one is already active; tracking is unaffected
    /// either way.
    pub fn start_recording(&self) -> Result<(), PipelineError> {
        if !self.is_tracking() {
            return Err(PipelineError::NotTracking);
        }
        let mut guard = self
            .shared
            .session
            .lock()
            .map_err(|_| PipelineError::Config("session lock poisoned".into()))?;
        if guard.is_some() {
            return Err(PipelineError::RecordingActive);
        }
        *guard = Some(Session::create(
            &self.config.log.log_dir,
            self.config.log.queue_capacity,
        )?);
        Ok(())
    }

    /// Flush pending rows and close the active session
    ///
    /// Idempotent: returns `Ok(None)` when no session is active.
    pub fn stop_recording(&self) -> Result<Option<SessionSummary>, PipelineError> {
        let taken = {
            let mut guard = self
                .shared
                .session
                .lock()
                .map_err(|_| PipelineError::Config("session lock poisoned".into()))?;
            guard.take()
        };
        match taken {
            Some(session) => Ok(Some(session.finish()?)),
            None => Ok(None),
        }
    }

    /// Reset the calibration profile to collecting on the next frame
    pub fn recalibrate(&self) {
        self.shared.recalibrate.store(true, Ordering::Release);
    }

    /// Latest assembled record; the cell holds only the freshest value
    pub fn latest(&self) -> Option<FrameRecord> {
        self.latest_rx.borrow().clone()
    }

    /// Watch the latest-record cell directly
    pub fn subscribe(&self) -> watch::Receiver<Option<FrameRecord>> {
        self.shared.latest.subscribe()
    }

    /// Current alarm state
    pub fn safety_state(&self) -> SafetyState {
        self.latest().map(|r| r.safety).unwrap_or_default()
    }

    /// Current performance figures
    pub fn performance(&self) -> PerformanceSample {
        self.latest().map(|r| r.perf).unwrap_or_default()
    }

    pub fn is_tracking(&self) -> bool {
        self.shared.running.load(Ordering::Acquire)
    }

    pub fn is_recording(&self) -> bool {
        self.shared
            .session
            .lock()
            .map(|g| g.is_some())
            .unwrap_or(false)
    }

    pub fn state(&self) -> PipelineState {
        if !self.is_tracking() {
            PipelineState::Idle
        } else if self.is_recording() {
            PipelineState::Recording
        } else {
            PipelineState::Tracking
        }
    }
}

impl Drop for Orchestrator {
    fn drop(&mut self) {
        let _ = self.stop_tracking();
    }
}

/// The per-frame measurement worker
struct Worker {
    config: PipelineConfig,
    shared: Arc<Shared>,
    source: Box<dyn FrameSource>,
    tracker: Box<dyn LandmarkTracker>,
    clock: MonotonicClock,
    calibration: CalibrationManager,
    locator: PupilLocator,
    left_eye: EyeStateTracker,
    right_eye: EyeStateTracker,
    safety: SafetyMonitor,
    perf: PerformanceMonitor,
}

impl Worker {
    fn new(
        config: PipelineConfig,
        shared: Arc<Shared>,
        source: Box<dyn FrameSource>,
        tracker: Box<dyn LandmarkTracker>,
    ) -> Self {
        Self {
            calibration: CalibrationManager::new(config.calibration.clone()),
            locator: PupilLocator::new(config.locator.clone()),
            left_eye: EyeStateTracker::new(EyeSide::Left, config.eye_state.clone()),
            right_eye: EyeStateTracker::new(EyeSide::Right, config.eye_state.clone()),
            safety: SafetyMonitor::new(config.safety.clone()),
            perf: PerformanceMonitor::new(config.perf.clone()),
            clock: MonotonicClock::new(),
            config,
            shared,
            source,
            tracker,
        }
    }

    fn run(mut self) {
        let interval = self.perf.target_interval();

        while self.shared.running.load(Ordering::Acquire) {
            let started = self.perf.start_frame();

            if self.shared.recalibrate.swap(false, Ordering::AcqRel) {
                self.calibration.recalibrate();
                self.left_eye.reset();
                self.right_eye.reset();
                self.safety.reset();
            }

            let frame = match self.source.next_frame() {
                Ok(Some(frame)) => frame,
                Ok(None) => {
                    info!("Frame source exhausted; stopping tracking");
                    break;
                }
                Err(e) => {
                    warn!("Frame acquisition failed: {}", e);
                    std::thread::sleep(interval);
                    continue;
                }
            };

            // A slow frame is still completed and recorded; only the rate
            // estimate reflects the slowdown.
            let record = self.process_frame(&frame, started);
            self.log_record(&record);
            self.shared.latest.send_replace(Some(record));

            let elapsed = started.elapsed();
            if elapsed < interval {
                std::thread::sleep(interval - elapsed);
            }
        }

        self.shared.running.store(false, Ordering::Release);
        info!("Processing cycle stopped");
    }

    /// Run steps 4.1-4.6 of the measurement chain on one frame
    fn process_frame(&mut self, frame: &VideoFrame, started: Instant) -> FrameRecord {
        let timestamp_us = self.clock.now_us();

        let landmarks = match self.tracker.landmarks(frame) {
            Ok(set) => set,
            Err(e) => {
                // Inference faults degrade to a face-absent frame.
                warn!("Landmark inference failed: {}", e);
                None
            }
        };
        let face_detected = landmarks.is_some();

        let mut left_pupil = None;
        let mut right_pupil = None;
        let mut crop_brightness = Vec::with_capacity(2);

        if let Some(set) = &landmarks {
            let regions = extract_regions(set, frame.width, frame.height, &self.config.region);
            let params = self.calibration.params();

            for (region, slot) in [
                (&regions.left, &mut left_pupil),
                (&regions.right, &mut right_pupil),
            ] {
                if let Some(region) = region {
                    if let Some(crop) = frame.crop(region.x, region.y, region.width, region.height)
                    {
                        crop_brightness.push(crop.mean_brightness());
                    }
                    *slot = self.locator.locate(frame, region, &params);
                }
            }

            // Eye state comes from landmark geometry alone, so blink
            // detection keeps working when pupil extraction fails.
            match eye_aspect_ratio(set, EyeSide::Left) {
                Some(ear) => {
                    self.left_eye.update(ear, timestamp_us);
                }
                None => self.left_eye.mark_unobserved(),
            }
            match eye_aspect_ratio(set, EyeSide::Right) {
                Some(ear) => {
                    self.right_eye.update(ear, timestamp_us);
                }
                None => self.right_eye.mark_unobserved(),
            }
        } else {
            self.left_eye.mark_unobserved();
            self.right_eye.mark_unobserved();
        }

        let brightness = if crop_brightness.is_empty() {
            None
        } else {
            Some(crop_brightness.iter().sum::<f32>() / crop_brightness.len() as f32)
        };
        let diameter = match (&left_pupil, &right_pupil) {
            (Some(l), Some(r)) => Some((l.diameter + r.diameter) / 2.0),
            (Some(l), None) => Some(l.diameter),
            (None, Some(r)) => Some(r.diameter),
            (None, None) => None,
        };
        self.calibration.observe(brightness, diameter);

        let both_closed = !self.left_eye.is_open() && !self.right_eye.is_open();
        // Transitions are logged inside the monitor; state rides the record.
        let _events = self.safety.update(face_detected, both_closed, timestamp_us);

        let perf = self.perf.end_frame(started);

        FrameRecord {
            timestamp_us,
            tracker_method: self.tracker.id(),
            face_detected,
            left_pupil,
            right_pupil,
            left_eye: self.left_eye.snapshot(timestamp_us),
            right_eye: self.right_eye.snapshot(timestamp_us),
            safety: self.safety.state(),
            perf,
        }
    }

    /// Hand the record to the logger queue when a session is active
    fn log_record(&self, record: &FrameRecord) {
        let Ok(mut guard) = self.shared.session.lock() else {
            return;
        };
        if let Some(session) = guard.as_mut() {
            if let Err(e) = session.append(record.to_log_row()) {
                // An I/O failure ends the session, not the tracking cycle.
                error!("Recording session terminated: {}", e);
                *guard = None;
            }
        }
    }
}

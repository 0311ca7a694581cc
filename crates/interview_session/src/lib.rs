use std::sync::Arc;

use media_capture::{CaptureConstraints, MediaDevices, MediaStream, TrackKind};
use shared::domain::{InterviewId, InterviewPhase};
use thiserror::Error;
use tokio::sync::{broadcast, watch, Mutex};
use tracing::{debug, info, warn};

pub mod timer;

pub use timer::{format_remaining, urgency, CountdownTimer, Urgency};

/// Fixed interview length: 30 minutes.
pub const SESSION_LENGTH_SECONDS: u64 = 1800;

#[derive(Debug, Error)]
pub enum InterviewError {
    #[error("operation requires phase {expected:?}, session is in {actual:?}")]
    InvalidPhase {
        expected: InterviewPhase,
        actual: InterviewPhase,
    },
}

#[derive(Debug, Clone)]
pub enum InterviewEvent {
    PhaseChanged(InterviewPhase),
    CaptureDegraded { reason: String },
    TrackToggled { kind: TrackKind, enabled: bool },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InterviewSnapshot {
    pub interview_id: InterviewId,
    pub phase: InterviewPhase,
    pub muted: bool,
    pub camera_off: bool,
    pub remaining_seconds: u64,
}

struct ControllerState {
    phase: InterviewPhase,
    muted: bool,
    camera_off: bool,
    stream: Option<Arc<dyn MediaStream>>,
    timer: Option<CountdownTimer>,
}

/// One interview page visit: NotStarted → Live → Assessment, terminal at
/// Assessment. Capture and timer are acquired on entering Live and moved
/// out of the state under the lock on the way out, so every exit path
/// releases them exactly once.
pub struct InterviewController {
    interview_id: InterviewId,
    media: Arc<dyn MediaDevices>,
    session_length: u64,
    inner: Mutex<ControllerState>,
    events: broadcast::Sender<InterviewEvent>,
}

impl InterviewController {
    pub fn new(interview_id: InterviewId, media: Arc<dyn MediaDevices>) -> Arc<Self> {
        Self::with_session_length(interview_id, media, SESSION_LENGTH_SECONDS)
    }

    pub fn with_session_length(
        interview_id: InterviewId,
        media: Arc<dyn MediaDevices>,
        session_length: u64,
    ) -> Arc<Self> {
        let (events, _) = broadcast::channel(64);
        Arc::new(Self {
            interview_id,
            media,
            session_length,
            inner: Mutex::new(ControllerState {
                phase: InterviewPhase::NotStarted,
                muted: false,
                camera_off: false,
                stream: None,
                timer: None,
            }),
            events,
        })
    }

    pub fn interview_id(&self) -> &InterviewId {
        &self.interview_id
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<InterviewEvent> {
        self.events.subscribe()
    }

    pub async fn phase(&self) -> InterviewPhase {
        self.inner.lock().await.phase
    }

    pub async fn snapshot(&self) -> InterviewSnapshot {
        let inner = self.inner.lock().await;
        let remaining_seconds = match (&inner.timer, inner.phase) {
            (Some(timer), _) => timer.remaining_seconds(),
            (None, InterviewPhase::NotStarted) => self.session_length,
            (None, _) => 0,
        };
        InterviewSnapshot {
            interview_id: self.interview_id.clone(),
            phase: inner.phase,
            muted: inner.muted,
            camera_off: inner.camera_off,
            remaining_seconds,
        }
    }

    /// Remaining-seconds feed of the running timer; `None` outside Live.
    pub async fn subscribe_remaining(&self) -> Option<watch::Receiver<u64>> {
        self.inner
            .lock()
            .await
            .timer
            .as_ref()
            .map(CountdownTimer::subscribe_remaining)
    }

    /// Enters Live: starts the countdown, then acquires capture scoped by
    /// the current mute/camera flags. A capture failure degrades to a
    /// streamless live session rather than blocking the transition.
    pub async fn start(self: &Arc<Self>) -> Result<(), InterviewError> {
        let constraints = {
            let mut inner = self.inner.lock().await;
            if inner.phase != InterviewPhase::NotStarted {
                return Err(InterviewError::InvalidPhase {
                    expected: InterviewPhase::NotStarted,
                    actual: inner.phase,
                });
            }
            inner.phase = InterviewPhase::Live;

            let weak = Arc::downgrade(self);
            inner.timer = Some(CountdownTimer::start(self.session_length, move || {
                if let Some(controller) = weak.upgrade() {
                    tokio::spawn(async move { controller.timer_elapsed().await });
                }
            }));

            CaptureConstraints {
                video: !inner.camera_off,
                audio: !inner.muted,
            }
        };
        self.emit(InterviewEvent::PhaseChanged(InterviewPhase::Live));
        info!(interview_id = %self.interview_id, "interview started");

        match self.media.acquire(constraints).await {
            Ok(stream) => {
                let stale = {
                    let mut inner = self.inner.lock().await;
                    if inner.phase == InterviewPhase::Live {
                        inner.stream = Some(stream);
                        None
                    } else {
                        Some(stream)
                    }
                };
                if let Some(stream) = stale {
                    debug!(
                        interview_id = %self.interview_id,
                        "capture settled after the live phase ended; releasing immediately"
                    );
                    stream.release().await;
                }
            }
            Err(error) => {
                warn!(
                    interview_id = %self.interview_id,
                    %error,
                    "capture unavailable; continuing live without a local stream"
                );
                self.emit(InterviewEvent::CaptureDegraded {
                    reason: error.to_string(),
                });
            }
        }

        Ok(())
    }

    pub async fn toggle_mute(&self) -> Result<bool, InterviewError> {
        let (muted, stream) = {
            let mut inner = self.inner.lock().await;
            if inner.phase != InterviewPhase::Live {
                return Err(InterviewError::InvalidPhase {
                    expected: InterviewPhase::Live,
                    actual: inner.phase,
                });
            }
            inner.muted = !inner.muted;
            (inner.muted, inner.stream.clone())
        };
        if let Some(stream) = stream {
            stream.set_track_enabled(TrackKind::Audio, !muted);
        }
        self.emit(InterviewEvent::TrackToggled {
            kind: TrackKind::Audio,
            enabled: !muted,
        });
        Ok(muted)
    }

    pub async fn toggle_camera(&self) -> Result<bool, InterviewError> {
        let (camera_off, stream) = {
            let mut inner = self.inner.lock().await;
            if inner.phase != InterviewPhase::Live {
                return Err(InterviewError::InvalidPhase {
                    expected: InterviewPhase::Live,
                    actual: inner.phase,
                });
            }
            inner.camera_off = !inner.camera_off;
            (inner.camera_off, inner.stream.clone())
        };
        if let Some(stream) = stream {
            stream.set_track_enabled(TrackKind::Video, !camera_off);
        }
        self.emit(InterviewEvent::TrackToggled {
            kind: TrackKind::Video,
            enabled: !camera_off,
        });
        Ok(camera_off)
    }

    /// Manually ends the live session and hands off to the assessment.
    pub async fn end(&self) -> Result<(), InterviewError> {
        match self.try_leave_live().await {
            Some(resources) => {
                self.release_live_resources(resources).await;
                info!(interview_id = %self.interview_id, "interview ended");
                Ok(())
            }
            None => Err(InterviewError::InvalidPhase {
                expected: InterviewPhase::Live,
                actual: self.phase().await,
            }),
        }
    }

    /// Countdown completion path; forces the same transition as `end`. A
    /// fire that lands outside Live is stale and is ignored.
    pub async fn timer_elapsed(&self) {
        match self.try_leave_live().await {
            Some(resources) => {
                self.release_live_resources(resources).await;
                info!(interview_id = %self.interview_id, "interview time elapsed");
            }
            None => {
                debug!(
                    interview_id = %self.interview_id,
                    "countdown fired outside the live phase; ignoring"
                );
            }
        }
    }

    /// Atomically leaves Live, taking ownership of the scoped resources.
    /// The phase check and the take-out happen under one lock so no two
    /// exit paths can both claim them.
    async fn try_leave_live(&self) -> Option<LiveResources> {
        let mut inner = self.inner.lock().await;
        if inner.phase != InterviewPhase::Live {
            return None;
        }
        inner.phase = InterviewPhase::Assessment;
        Some(LiveResources {
            stream: inner.stream.take(),
            timer: inner.timer.take(),
        })
    }

    async fn release_live_resources(&self, resources: LiveResources) {
        if let Some(timer) = resources.timer {
            timer.cancel();
        }
        if let Some(stream) = resources.stream {
            stream.release().await;
        }
        self.emit(InterviewEvent::PhaseChanged(InterviewPhase::Assessment));
    }

    fn emit(&self, event: InterviewEvent) {
        let _ = self.events.send(event);
    }
}

struct LiveResources {
    stream: Option<Arc<dyn MediaStream>>,
    timer: Option<CountdownTimer>,
}

#[cfg(test)]
#[path = "tests/controller_tests.rs"]
mod tests;

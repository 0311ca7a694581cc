use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CaptureConstraints {
    pub video: bool,
    pub audio: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackKind {
    Audio,
    Video,
}

#[derive(Debug, Error)]
pub enum MediaError {
    #[error("permission to access capture devices was denied")]
    PermissionDenied,
    #[error("no capture device available for the requested constraints")]
    DeviceUnavailable,
    #[error("capture backend failed: {0}")]
    Backend(String),
}

/// A live local capture stream. Track toggles flip the enabled state in
/// place without re-acquiring the device; `release` stops every track and
/// frees the underlying device handles.
#[async_trait]
pub trait MediaStream: Send + Sync + std::fmt::Debug {
    fn set_track_enabled(&self, kind: TrackKind, enabled: bool);
    async fn release(&self);
}

#[async_trait]
pub trait MediaDevices: Send + Sync {
    async fn acquire(
        &self,
        constraints: CaptureConstraints,
    ) -> Result<Arc<dyn MediaStream>, MediaError>;
}

pub struct MissingMediaDevices;

#[async_trait]
impl MediaDevices for MissingMediaDevices {
    async fn acquire(
        &self,
        _constraints: CaptureConstraints,
    ) -> Result<Arc<dyn MediaStream>, MediaError> {
        Err(MediaError::DeviceUnavailable)
    }
}

/// Local always-succeeding capture backend for demos and tests: no real
/// devices, just the track-enable and release bookkeeping.
pub struct LoopbackMediaDevices;

#[async_trait]
impl MediaDevices for LoopbackMediaDevices {
    async fn acquire(
        &self,
        constraints: CaptureConstraints,
    ) -> Result<Arc<dyn MediaStream>, MediaError> {
        info!(
            video = constraints.video,
            audio = constraints.audio,
            "loopback capture acquired"
        );
        Ok(Arc::new(LoopbackStream::new(constraints)))
    }
}

#[derive(Debug)]
pub struct LoopbackStream {
    audio_enabled: AtomicBool,
    video_enabled: AtomicBool,
    released: Mutex<bool>,
}

impl LoopbackStream {
    fn new(constraints: CaptureConstraints) -> Self {
        Self {
            audio_enabled: AtomicBool::new(constraints.audio),
            video_enabled: AtomicBool::new(constraints.video),
            released: Mutex::new(false),
        }
    }

    pub fn is_track_enabled(&self, kind: TrackKind) -> bool {
        match kind {
            TrackKind::Audio => self.audio_enabled.load(Ordering::SeqCst),
            TrackKind::Video => self.video_enabled.load(Ordering::SeqCst),
        }
    }
}

#[async_trait]
impl MediaStream for LoopbackStream {
    fn set_track_enabled(&self, kind: TrackKind, enabled: bool) {
        let track = match kind {
            TrackKind::Audio => &self.audio_enabled,
            TrackKind::Video => &self.video_enabled,
        };
        track.store(enabled, Ordering::SeqCst);
        debug!(?kind, enabled, "loopback track toggled");
    }

    async fn release(&self) {
        let mut released = self.released.lock().await;
        *released = true;
        info!("loopback capture released");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn missing_devices_fail_with_device_unavailable() {
        let err = MissingMediaDevices
            .acquire(CaptureConstraints {
                video: true,
                audio: true,
            })
            .await
            .expect_err("must fail");
        assert!(matches!(err, MediaError::DeviceUnavailable));
    }

    #[tokio::test]
    async fn loopback_stream_starts_with_constraint_flags() {
        let stream = LoopbackStream::new(CaptureConstraints {
            video: false,
            audio: true,
        });
        assert!(stream.is_track_enabled(TrackKind::Audio));
        assert!(!stream.is_track_enabled(TrackKind::Video));
    }

    #[tokio::test]
    async fn loopback_track_toggle_flips_only_that_track() {
        let stream = LoopbackStream::new(CaptureConstraints {
            video: true,
            audio: true,
        });
        stream.set_track_enabled(TrackKind::Audio, false);
        assert!(!stream.is_track_enabled(TrackKind::Audio));
        assert!(stream.is_track_enabled(TrackKind::Video));
    }
}

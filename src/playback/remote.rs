// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::sync::{Arc, Mutex};

use url::Url;

use crate::playback::PlaybackEngine;

/// Fixed skip interval for the forward/backward media keys
pub const SKIP_INTERVAL_SECS: f64 = 15.0;

/// System media-key and lock-screen commands
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RemoteCommand {
    Play,
    Pause,
    TogglePlayPause,
    SkipForward,
    SkipBackward,
    /// Scrub to an absolute position in seconds
    SeekTo(f64),
}

/// The metadata blob published for lock-screen display
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NowPlayingInfo {
    pub title: Option<String>,
    pub artist: Option<String>,
    pub artwork_url: Option<Url>,
    pub duration: Option<f64>,
    pub elapsed: Option<f64>,
    pub rate: Option<f32>,
}

/// One-way bridge from system media commands to the playback engine
///
/// Each handled command calls into the engine and then refreshes the
/// published now-playing metadata. Engine state never flows back through
/// here; observers use the engine's own broadcast.
pub struct RemoteCommandBridge {
    engine: Arc<PlaybackEngine>,
    now_playing: Mutex<NowPlayingInfo>,
}

impl RemoteCommandBridge {
    pub fn new(engine: Arc<PlaybackEngine>) -> Self {
        Self {
            engine,
            now_playing: Mutex::new(NowPlayingInfo::default()),
        }
    }

    /// Handle one system command
    pub fn handle(&self, command: RemoteCommand) {
        match command {
            RemoteCommand::Play => {
                if !self.engine.is_playing() {
                    self.engine.toggle();
                }
            }
            RemoteCommand::Pause => {
                if self.engine.is_playing() {
                    self.engine.pause();
                }
            }
            RemoteCommand::TogglePlayPause => self.engine.toggle(),
            RemoteCommand::SkipForward => self.engine.skip_forward(SKIP_INTERVAL_SECS),
            RemoteCommand::SkipBackward => self.engine.skip_backward(SKIP_INTERVAL_SECS),
            RemoteCommand::SeekTo(position) => self.engine.seek(position),
        }
        self.refresh();
    }

    /// Merge static item metadata into the published blob
    ///
    /// Only fields passed as `Some` are overwritten, mirroring how the
    /// lock-screen metadata dictionary is updated in place.
    pub fn set_metadata(
        &self,
        title: Option<String>,
        artist: Option<String>,
        artwork_url: Option<Url>,
    ) {
        let mut info = self.lock();
        if title.is_some() {
            info.title = title;
        }
        if artist.is_some() {
            info.artist = artist;
        }
        if artwork_url.is_some() {
            info.artwork_url = artwork_url;
        }
        drop(info);
        self.refresh();
    }

    /// Re-read playback timing from the engine into the published blob
    pub fn refresh(&self) {
        let mut info = self.lock();
        info.duration = Some(self.engine.duration());
        info.elapsed = Some(self.engine.position());
        info.rate = Some(self.engine.rate());
    }

    /// The currently published metadata
    pub fn now_playing(&self) -> NowPlayingInfo {
        self.lock().clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, NowPlayingInfo> {
        self.now_playing.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::playback::SimulatedBackend;

    fn bridge() -> (Arc<PlaybackEngine>, RemoteCommandBridge) {
        let engine = Arc::new(PlaybackEngine::new(SimulatedBackend::new()));
        let bridge = RemoteCommandBridge::new(Arc::clone(&engine));
        (engine, bridge)
    }

    fn url() -> Url {
        Url::parse("https://example.com/a.mp3").unwrap()
    }

    #[tokio::test]
    async fn play_command_resumes_only_when_paused() {
        let (engine, bridge) = bridge();
        engine.play(&url());
        engine.pause();
        engine.seek(3.0);

        bridge.handle(RemoteCommand::Play);
        assert!(engine.is_playing());

        // Play while already playing leaves the position alone
        let before = engine.position();
        bridge.handle(RemoteCommand::Play);
        assert!(engine.position() >= before);
        assert!(engine.is_playing());
    }

    #[tokio::test]
    async fn pause_command_is_a_no_op_when_paused() {
        let (engine, bridge) = bridge();
        engine.play(&url());

        bridge.handle(RemoteCommand::Pause);
        assert!(!engine.is_playing());

        bridge.handle(RemoteCommand::Pause);
        assert!(!engine.is_playing());
    }

    #[tokio::test]
    async fn skip_backward_near_start_clamps_to_zero() {
        let (engine, bridge) = bridge();
        engine.play(&url());
        engine.pause();
        engine.seek(4.0);

        bridge.handle(RemoteCommand::SkipBackward);

        assert_eq!(engine.position(), 0.0);
    }

    #[tokio::test]
    async fn handled_commands_refresh_now_playing_timing() {
        let (engine, bridge) = bridge();
        engine.play(&url());
        engine.pause();

        bridge.handle(RemoteCommand::SeekTo(120.0));

        let info = bridge.now_playing();
        assert_eq!(info.elapsed, Some(120.0));
        assert_eq!(info.duration, Some(3600.0));
        assert_eq!(info.rate, Some(0.0));
    }

    #[tokio::test]
    async fn metadata_merge_keeps_existing_fields() {
        let (_engine, bridge) = bridge();

        bridge.set_metadata(Some("Episode 1".to_string()), Some("Show".to_string()), None);
        bridge.set_metadata(None, Some("Renamed Show".to_string()), None);

        let info = bridge.now_playing();
        assert_eq!(info.title.as_deref(), Some("Episode 1"));
        assert_eq!(info.artist.as_deref(), Some("Renamed Show"));
    }
}

// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

mod remote;

pub use remote::{NowPlayingInfo, RemoteCommand, RemoteCommandBridge, SKIP_INTERVAL_SECS};

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::debug;
use url::Url;

/// Snapshot of the engine's state, sent on every state change
#[derive(Debug, Clone, PartialEq)]
pub struct PlaybackState {
    pub url: Option<Url>,
    pub is_playing: bool,
    pub position: f64,
    pub rate: f32,
}

/// A media player opened for one audio URL
///
/// The platform player is external to this crate; this trait is the
/// narrow interface the engine consumes from it.
pub trait PlayerHandle: Send {
    fn play(&mut self);
    fn pause(&mut self);
    fn is_playing(&self) -> bool;
    /// Current position in seconds
    fn position(&self) -> f64;
    /// Total duration in seconds
    fn duration(&self) -> f64;
    /// Seek; the player clamps to its own bounds
    fn seek(&mut self, seconds: f64);
    fn rate(&self) -> f32;
    fn set_rate(&mut self, rate: f32);
}

/// Opens players for audio URLs
pub trait PlayerBackend: Send + Sync {
    fn open(&self, url: &Url) -> Box<dyn PlayerHandle>;
}

struct EngineInner {
    handle: Option<Box<dyn PlayerHandle>>,
    current_url: Option<Url>,
    observer: Option<JoinHandle<()>>,
}

/// Audio playback engine: at most one active item at a time
///
/// `play` unconditionally tears down any existing player and starts a new
/// one; skipping the call when the URL is already active is the caller's
/// check, not enforced here. Every state-changing operation broadcasts a
/// [`PlaybackState`] to all subscribers.
pub struct PlaybackEngine {
    inner: Arc<Mutex<EngineInner>>,
    events: broadcast::Sender<PlaybackState>,
    backend: Box<dyn PlayerBackend>,
}

impl PlaybackEngine {
    pub fn new(backend: impl PlayerBackend + 'static) -> Self {
        let (events, _) = broadcast::channel(16);
        Self {
            inner: Arc::new(Mutex::new(EngineInner {
                handle: None,
                current_url: None,
                observer: None,
            })),
            events,
            backend: Box::new(backend),
        }
    }

    fn lock(&self) -> MutexGuard<'_, EngineInner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Subscribe to state-change broadcasts
    pub fn subscribe(&self) -> broadcast::Receiver<PlaybackState> {
        self.events.subscribe()
    }

    fn broadcast(&self) {
        let _ = self.events.send(self.state());
    }

    /// Current state snapshot
    pub fn state(&self) -> PlaybackState {
        let inner = self.lock();
        PlaybackState {
            url: inner.current_url.clone(),
            is_playing: inner.handle.as_ref().is_some_and(|h| h.is_playing()),
            position: inner.handle.as_ref().map_or(0.0, |h| h.position()),
            rate: inner.handle.as_ref().map_or(1.0, |h| h.rate()),
        }
    }

    /// Start playing the given URL, replacing any active player
    pub fn play(&self, url: &Url) {
        debug!(%url, "starting playback");
        {
            let mut inner = self.lock();
            let mut handle = self.backend.open(url);
            handle.play();
            inner.handle = Some(handle);
            inner.current_url = Some(url.clone());
        }
        self.broadcast();
    }

    pub fn pause(&self) {
        {
            let mut inner = self.lock();
            if let Some(handle) = inner.handle.as_mut() {
                handle.pause();
            }
        }
        self.broadcast();
    }

    /// Pause if playing, resume otherwise; no-op without a player beyond
    /// the broadcast
    pub fn toggle(&self) {
        {
            let mut inner = self.lock();
            if let Some(handle) = inner.handle.as_mut() {
                if handle.is_playing() {
                    handle.pause();
                } else {
                    handle.play();
                }
            }
        }
        self.broadcast();
    }

    /// Tear down the active player, if any
    pub fn stop(&self) {
        {
            let mut inner = self.lock();
            inner.handle = None;
            inner.current_url = None;
        }
        self.broadcast();
    }

    pub fn is_playing(&self) -> bool {
        self.lock().handle.as_ref().is_some_and(|h| h.is_playing())
    }

    pub fn current_url(&self) -> Option<Url> {
        self.lock().current_url.clone()
    }

    /// Current position in seconds (0 without a player)
    pub fn position(&self) -> f64 {
        self.lock().handle.as_ref().map_or(0.0, |h| h.position())
    }

    /// Duration in seconds (0 without a player)
    pub fn duration(&self) -> f64 {
        self.lock().handle.as_ref().map_or(0.0, |h| h.duration())
    }

    pub fn seek(&self, seconds: f64) {
        {
            let mut inner = self.lock();
            if let Some(handle) = inner.handle.as_mut() {
                handle.seek(seconds);
            }
        }
        self.broadcast();
    }

    pub fn skip_forward(&self, seconds: f64) {
        let position = self.position();
        self.seek(position + seconds);
    }

    /// Skip backwards, clamped to position zero
    pub fn skip_backward(&self, seconds: f64) {
        let position = self.position();
        self.seek((position - seconds).max(0.0));
    }

    /// Playback rate (1.0 without a player)
    pub fn rate(&self) -> f32 {
        self.lock().handle.as_ref().map_or(1.0, |h| h.rate())
    }

    /// Set the playback rate
    ///
    /// While paused the stored rate becomes 0; the requested rate only
    /// takes visible effect while playing. A documented quirk of the
    /// original behavior, preserved deliberately.
    pub fn set_rate(&self, rate: f32) {
        {
            let mut inner = self.lock();
            if let Some(handle) = inner.handle.as_mut() {
                let effective = if handle.is_playing() { rate } else { 0.0 };
                handle.set_rate(effective);
            }
        }
        self.broadcast();
    }

    /// Register a periodic position callback, replacing any previous one
    ///
    /// Registration is a no-op while no player exists. The callback keeps
    /// firing until it is removed or the registration is replaced; nothing
    /// unregisters it automatically.
    pub fn add_periodic_observer<F>(&self, interval: Duration, callback: F)
    where
        F: Fn(f64) + Send + 'static,
    {
        self.remove_periodic_observer();

        let mut inner = self.lock();
        if inner.handle.is_none() {
            return;
        }

        let shared = Arc::clone(&self.inner);
        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            // Consume the immediate first tick
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let position = {
                    let inner = shared.lock().unwrap_or_else(|e| e.into_inner());
                    inner.handle.as_ref().map(|h| h.position())
                };
                match position {
                    Some(position) => callback(position),
                    None => break,
                }
            }
        });
        inner.observer = Some(task);
    }

    /// Remove the periodic position callback, if registered
    pub fn remove_periodic_observer(&self) {
        if let Some(task) = self.lock().observer.take() {
            task.abort();
        }
    }
}

impl Drop for PlaybackEngine {
    fn drop(&mut self) {
        if let Some(task) = self.lock().observer.take() {
            task.abort();
        }
    }
}

/// Clock-driven player used for tests and the CLI demo
///
/// Position advances with wall-clock time scaled by the rate while
/// playing, with no audio output.
pub struct SimulatedBackend {
    duration: f64,
}

impl SimulatedBackend {
    pub fn new() -> Self {
        Self { duration: 3600.0 }
    }

    pub fn with_duration(duration: f64) -> Self {
        Self { duration }
    }
}

impl Default for SimulatedBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl PlayerBackend for SimulatedBackend {
    fn open(&self, _url: &Url) -> Box<dyn PlayerHandle> {
        Box::new(SimulatedHandle {
            playing: false,
            rate: 1.0,
            base: 0.0,
            anchor: Instant::now(),
            duration: self.duration,
        })
    }
}

struct SimulatedHandle {
    playing: bool,
    rate: f32,
    base: f64,
    anchor: Instant,
    duration: f64,
}

impl SimulatedHandle {
    fn clock_position(&self) -> f64 {
        if self.playing {
            let elapsed = self.anchor.elapsed().as_secs_f64() * self.rate as f64;
            (self.base + elapsed).min(self.duration)
        } else {
            self.base
        }
    }

    fn rebase(&mut self) {
        self.base = self.clock_position();
        self.anchor = Instant::now();
    }
}

impl PlayerHandle for SimulatedHandle {
    fn play(&mut self) {
        self.rebase();
        self.playing = true;
        // Resuming resets a zero rate to normal speed
        if self.rate == 0.0 {
            self.rate = 1.0;
        }
    }

    fn pause(&mut self) {
        self.rebase();
        self.playing = false;
    }

    fn is_playing(&self) -> bool {
        self.playing && self.rate > 0.0
    }

    fn position(&self) -> f64 {
        self.clock_position()
    }

    fn duration(&self) -> f64 {
        self.duration
    }

    fn seek(&mut self, seconds: f64) {
        self.base = seconds.clamp(0.0, self.duration);
        self.anchor = Instant::now();
    }

    fn rate(&self) -> f32 {
        // A paused player reports rate 0, like the platform players do
        if self.playing {
            self.rate
        } else {
            0.0
        }
    }

    fn set_rate(&mut self, rate: f32) {
        self.rebase();
        self.rate = rate;
    }
}

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Instant;

use crate::audio::engine::AudioEngine;
use crate::audio::sounds::SoundId;
use crate::events::{EngineEvent, EngineEventQueue};

/// Volume assumed for a sound the user has never adjusted.
pub const DEFAULT_VOLUME: f32 = 0.7;

/// Declarative mirror of playback state, the thing UI widgets render from.
/// After every call through [`PlaybackSync`] this matches what the engine
/// reports; nothing else may write to it.
#[derive(Debug, Clone, Default)]
pub struct PlaybackStore {
    /// Active sound ids in activation order.
    pub active: Vec<SoundId>,
    /// Last set volume per sound, surviving toggles off.
    pub volumes: HashMap<SoundId, f32>,
    /// Countdown minutes; 0.0 means no timer.
    pub timer_minutes: f32,
    pub is_playing: bool,
    /// When the first sound of the session started.
    pub started_at: Option<Instant>,
}

impl PlaybackStore {
    pub fn volume(&self, id: SoundId) -> f32 {
        self.volumes.get(&id).copied().unwrap_or(DEFAULT_VOLUME)
    }
}

/// A render panic cannot leave the engine in a state worse than an audio
/// glitch, so recover the inner value instead of poisoning the whole UI.
fn lock_engine(engine: &Mutex<AudioEngine>) -> MutexGuard<'_, AudioEngine> {
    match engine.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

/// The playback-state sync layer: the only component that calls both the
/// engine and the store, so the two can never disagree about what is
/// currently making sound. Every mutation goes engine-first, then the store
/// update is derived from the result, never the reverse.
pub struct PlaybackSync {
    engine: Arc<Mutex<AudioEngine>>,
    store: PlaybackStore,
    events: EngineEventQueue,
}

impl PlaybackSync {
    pub fn new(engine: Arc<Mutex<AudioEngine>>) -> Self {
        Self {
            engine,
            store: PlaybackStore::default(),
            events: EngineEventQueue::new(),
        }
    }

    pub fn store(&self) -> &PlaybackStore {
        &self.store
    }

    /// Toggle `id` on or off, at its stored volume.
    pub fn toggle_sound(&mut self, id: SoundId) {
        let volume = self.store.volume(id);
        let mut engine = lock_engine(&self.engine);

        if engine.is_sound_playing(id) {
            engine.stop_ambient_sound(id);
            self.store.active.retain(|&s| s != id);
            self.store.is_playing = !self.store.active.is_empty();
            if self.store.active.is_empty() {
                // Last sound of the session: engine already dropped the
                // shared timer with the registry; mirror that
                engine.clear_timer();
                self.store.timer_minutes = 0.0;
                self.store.started_at = None;
            }
        } else {
            engine.start_ambient(id, volume);
            self.store.active.push(id);
            self.store.volumes.insert(id, volume);
            self.store.is_playing = true;
            if self.store.started_at.is_none() {
                self.store.started_at = Some(Instant::now());
            }
            if self.store.timer_minutes > 0.0 {
                let sender = self.events.sender();
                engine.set_timer(
                    self.store.timer_minutes,
                    Box::new(move || sender.send(EngineEvent::TimerFired)),
                );
            }
        }
    }

    /// Always record the volume; only drive the engine if that sound is
    /// currently playing (there is no channel to drive otherwise).
    pub fn set_sound_volume(&mut self, id: SoundId, volume: f32) {
        let volume = volume.clamp(0.0, 1.0);
        self.store.volumes.insert(id, volume);
        let mut engine = lock_engine(&self.engine);
        if engine.is_sound_playing(id) {
            engine.set_ambient_volume(id, volume);
        }
    }

    /// Always record the minutes; only (re)register or clear the engine
    /// timer if something is playing. `minutes <= 0` means no timer.
    pub fn set_timer_minutes(&mut self, minutes: f32) {
        self.store.timer_minutes = minutes.max(0.0);
        let mut engine = lock_engine(&self.engine);
        if !engine.is_playing() {
            return;
        }
        if self.store.timer_minutes > 0.0 {
            let sender = self.events.sender();
            engine.set_timer(
                self.store.timer_minutes,
                Box::new(move || sender.send(EngineEvent::TimerFired)),
            );
        } else {
            engine.clear_timer();
        }
    }

    /// Unconditional teardown of engine and store playback fields.
    pub fn stop_all(&mut self) {
        lock_engine(&self.engine).stop_ambient();
        self.reset_session();
    }

    /// Drain engine events. Timer expiry happens on the audio thread; this
    /// is where the store catches up with it.
    pub fn poll_events(&mut self) {
        let mut timer_fired = false;
        self.events.drain(|event| match event {
            EngineEvent::TimerFired => timer_fired = true,
        });
        if timer_fired {
            log::info!("sleep timer fired, session ended");
            self.reset_session();
        }
    }

    fn reset_session(&mut self) {
        self.store.active.clear();
        self.store.is_playing = false;
        self.store.timer_minutes = 0.0;
        self.store.started_at = None;
    }

    /// Seconds left on the shared timer, for display.
    pub fn timer_remaining_secs(&self) -> Option<f32> {
        lock_engine(&self.engine).timer_remaining_secs()
    }
}

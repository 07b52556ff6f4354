use crate::audio::channel::{Channel, DisposeOutcome};
use crate::audio::sounds::{build_channel, SoundId};
use crate::audio::DEFAULT_SAMPLE_RATE;

/// Invoked once when the shared shutdown timer expires, after every channel
/// has been stopped. Runs on whichever thread is rendering audio.
pub type TimerCallback = Box<dyn FnMut() + Send>;

struct ShutdownTimer {
    remaining: u64,
    on_end: TimerCallback,
}

/// The ambient audio engine: an insertion-ordered registry of live channels
/// plus the single shared shutdown timer. Constructed explicitly once at
/// application start and shared behind a mutex; it is not a module
/// singleton. Time advances as frames are rendered, so the timer is exact
/// with respect to audible output.
///
/// No operation here raises a user-visible error: stops and volume sets on
/// absent channels are no-ops, and double teardown is a normal outcome.
pub struct AudioEngine {
    channels: Vec<Channel>,
    timer: Option<ShutdownTimer>,
    sample_rate: f32,
    clock: u64,
}

impl AudioEngine {
    pub fn new(sample_rate: f32) -> Self {
        Self {
            channels: Vec::new(),
            timer: None,
            sample_rate,
            clock: 0,
        }
    }

    fn channel_index(&self, id: SoundId) -> Option<usize> {
        self.channels.iter().position(|c| c.id() == id)
    }

    /// Start `id` at `volume` (clamped to [0, 1]). If a channel for `id`
    /// already exists this is a volume set, not a restart: the underlying
    /// graph keeps playing untouched.
    pub fn start_ambient(&mut self, id: SoundId, volume: f32) {
        if let Some(i) = self.channel_index(id) {
            self.channels[i].set_gain(volume);
            return;
        }
        log::debug!("starting channel {:?} at volume {}", id, volume);
        let channel = build_channel(id, volume, self.sample_rate, self.clock);
        self.channels.push(channel);
    }

    /// Stop and dispose the channel for `id`. No-op when absent. If this
    /// empties the registry the shared shutdown timer is cancelled too.
    pub fn stop_ambient_sound(&mut self, id: SoundId) {
        let Some(i) = self.channel_index(id) else {
            return;
        };
        let mut channel = self.channels.remove(i);
        if channel.dispose() == DisposeOutcome::AlreadyDisposed {
            log::debug!("channel {:?} was already disposed", id);
        }
        if self.channels.is_empty() {
            self.clear_timer();
        }
    }

    /// Single-active-sound mode: stop everything, then start only `id`.
    pub fn play_ambient(&mut self, id: SoundId, volume: f32) {
        self.stop_ambient();
        self.start_ambient(id, volume);
    }

    /// Tear down every channel and cancel the shared timer. Safe to call
    /// when nothing is playing.
    pub fn stop_ambient(&mut self) {
        for channel in &mut self.channels {
            channel.dispose();
        }
        self.channels.clear();
        self.clear_timer();
    }

    /// Per-channel volume set, clamped; no-op when the channel is absent.
    pub fn set_ambient_volume(&mut self, id: SoundId, volume: f32) {
        if let Some(i) = self.channel_index(id) {
            self.channels[i].set_gain(volume);
        }
    }

    pub fn get_ambient_volume(&self, id: SoundId) -> Option<f32> {
        self.channel_index(id).map(|i| self.channels[i].gain())
    }

    /// Broadcast one volume to every active channel.
    pub fn set_volume(&mut self, volume: f32) {
        for channel in &mut self.channels {
            channel.set_gain(volume);
        }
    }

    /// Install the shared shutdown timer. Exactly one may be pending;
    /// setting a new one replaces any existing one. On expiry every channel
    /// is stopped, then `on_end` runs exactly once. Non-positive minutes
    /// are accepted and fire on the next rendered frame.
    pub fn set_timer(&mut self, minutes: f32, on_end: TimerCallback) {
        let remaining = (minutes.max(0.0) * 60.0 * self.sample_rate) as u64;
        self.timer = Some(ShutdownTimer { remaining, on_end });
    }

    pub fn clear_timer(&mut self) {
        self.timer = None;
    }

    pub fn timer_remaining_secs(&self) -> Option<f32> {
        self.timer
            .as_ref()
            .map(|t| t.remaining as f32 / self.sample_rate)
    }

    pub fn is_playing(&self) -> bool {
        !self.channels.is_empty()
    }

    pub fn is_sound_playing(&self, id: SoundId) -> bool {
        self.channel_index(id).is_some()
    }

    /// Active sound ids in activation order.
    pub fn playing_sounds(&self) -> Vec<SoundId> {
        self.channels.iter().map(|c| c.id()).collect()
    }

    /// First sound in activation order, if any.
    pub fn current_sound(&self) -> Option<SoundId> {
        self.channels.first().map(|c| c.id())
    }

    fn tick_timer(&mut self) {
        let expired = match &mut self.timer {
            Some(timer) => {
                if timer.remaining > 0 {
                    timer.remaining -= 1;
                }
                timer.remaining == 0
            }
            None => return,
        };
        if expired {
            // Take the timer out first: stop_ambient clears self.timer,
            // and the callback must run exactly once.
            if let Some(mut timer) = self.timer.take() {
                log::debug!("shutdown timer expired, stopping all channels");
                self.stop_ambient();
                (timer.on_end)();
            }
        }
    }

    /// Render one stereo frame and advance the engine clock.
    pub fn next_sample(&mut self) -> (f32, f32) {
        self.tick_timer();
        self.clock += 1;

        let mut left = 0.0;
        let mut right = 0.0;
        for channel in &mut self.channels {
            let (l, r) = channel.next_frame(self.clock);
            left += l;
            right += r;
        }
        (left, right)
    }

    /// Render into an interleaved stereo buffer.
    pub fn generate(&mut self, data: &mut [f32]) {
        for frame in data.chunks_mut(2) {
            let (l, r) = self.next_sample();
            frame[0] = l;
            if frame.len() > 1 {
                frame[1] = r;
            }
        }
    }

    pub fn sample_rate(&self) -> f32 {
        self.sample_rate
    }

    pub fn set_sample_rate(&mut self, sample_rate: f32) {
        // Rescale the pending countdown so the timer keeps its wall meaning
        if let Some(timer) = &mut self.timer {
            let secs = timer.remaining as f32 / self.sample_rate;
            timer.remaining = (secs * sample_rate) as u64;
        }
        self.sample_rate = sample_rate;
        for channel in &mut self.channels {
            channel.set_sample_rate(sample_rate);
        }
    }
}

impl Default for AudioEngine {
    fn default() -> Self {
        Self::new(DEFAULT_SAMPLE_RATE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    const SR: f32 = 1000.0; // Small rate keeps rendered advances cheap

    fn advance(engine: &mut AudioEngine, frames: u64) {
        for _ in 0..frames {
            engine.next_sample();
        }
    }

    #[test]
    fn test_start_is_idempotent_and_updates_volume() {
        let mut engine = AudioEngine::new(SR);
        engine.start_ambient(SoundId::Rain, 0.4);
        engine.start_ambient(SoundId::Rain, 0.8);
        assert_eq!(engine.playing_sounds(), vec![SoundId::Rain]);
        assert_eq!(engine.get_ambient_volume(SoundId::Rain), Some(0.8));
    }

    #[test]
    fn test_multi_sound_accumulation_keeps_activation_order() {
        let mut engine = AudioEngine::new(SR);
        engine.start_ambient(SoundId::Ocean, 0.5);
        engine.start_ambient(SoundId::Rain, 0.5);
        engine.start_ambient(SoundId::Wind, 0.5);
        assert_eq!(
            engine.playing_sounds(),
            vec![SoundId::Ocean, SoundId::Rain, SoundId::Wind]
        );
        assert_eq!(engine.current_sound(), Some(SoundId::Ocean));
    }

    #[test]
    fn test_exclusive_mode_replaces_everything() {
        let mut engine = AudioEngine::new(SR);
        engine.play_ambient(SoundId::Rain, 0.5);
        engine.play_ambient(SoundId::Ocean, 0.5);
        assert_eq!(engine.playing_sounds(), vec![SoundId::Ocean]);
    }

    #[test]
    fn test_volume_clamping() {
        let mut engine = AudioEngine::new(SR);
        engine.start_ambient(SoundId::Cafe, 0.5);
        engine.set_ambient_volume(SoundId::Cafe, 1.5);
        assert_eq!(engine.get_ambient_volume(SoundId::Cafe), Some(1.0));
        engine.set_ambient_volume(SoundId::Cafe, -1.0);
        assert_eq!(engine.get_ambient_volume(SoundId::Cafe), Some(0.0));
    }

    #[test]
    fn test_volume_ops_on_absent_channel_are_noops() {
        let mut engine = AudioEngine::new(SR);
        engine.set_ambient_volume(SoundId::Night, 0.5);
        assert_eq!(engine.get_ambient_volume(SoundId::Night), None);
        engine.stop_ambient_sound(SoundId::Night);
        assert!(!engine.is_playing());
    }

    #[test]
    fn test_global_volume_broadcast() {
        let mut engine = AudioEngine::new(SR);
        engine.start_ambient(SoundId::Rain, 0.1);
        engine.start_ambient(SoundId::Ocean, 0.9);
        engine.set_volume(0.6);
        assert_eq!(engine.get_ambient_volume(SoundId::Rain), Some(0.6));
        assert_eq!(engine.get_ambient_volume(SoundId::Ocean), Some(0.6));
    }

    #[test]
    fn test_partial_stop_preserves_siblings() {
        let mut engine = AudioEngine::new(SR);
        engine.start_ambient(SoundId::Rain, 0.5);
        engine.start_ambient(SoundId::Ocean, 0.5);
        engine.stop_ambient_sound(SoundId::Rain);
        assert!(!engine.is_sound_playing(SoundId::Rain));
        assert!(engine.is_sound_playing(SoundId::Ocean));
        assert_eq!(engine.playing_sounds(), vec![SoundId::Ocean]);
    }

    #[test]
    fn test_full_stop_clears_everything() {
        let mut engine = AudioEngine::new(SR);
        engine.start_ambient(SoundId::Rain, 0.5);
        engine.start_ambient(SoundId::Forest, 0.5);
        engine.stop_ambient();
        assert!(!engine.is_playing());
        assert!(engine.playing_sounds().is_empty());
        assert_eq!(engine.current_sound(), None);

        // Safe to call again with nothing playing
        engine.stop_ambient();
        assert!(!engine.is_playing());
    }

    #[test]
    fn test_timer_fires_once_and_stops_all_sounds() {
        let mut engine = AudioEngine::new(SR);
        engine.start_ambient(SoundId::Rain, 0.5);

        let fired = Arc::new(AtomicUsize::new(0));
        let fired_in_cb = Arc::clone(&fired);
        engine.set_timer(0.01, Box::new(move || {
            fired_in_cb.fetch_add(1, Ordering::SeqCst);
        }));
        // 0.01 min = 0.6 s = 600 frames at SR
        assert!(engine.timer_remaining_secs().unwrap() > 0.5);

        advance(&mut engine, 2000);
        assert_eq!(fired.load(Ordering::SeqCst), 1, "callback fires exactly once");
        assert!(!engine.is_playing());
        assert_eq!(engine.timer_remaining_secs(), None);
    }

    #[test]
    fn test_setting_a_new_timer_replaces_the_old_one() {
        let mut engine = AudioEngine::new(SR);
        engine.start_ambient(SoundId::Wind, 0.5);

        let first = Arc::new(AtomicUsize::new(0));
        let first_cb = Arc::clone(&first);
        engine.set_timer(0.01, Box::new(move || {
            first_cb.fetch_add(1, Ordering::SeqCst);
        }));

        let second = Arc::new(AtomicUsize::new(0));
        let second_cb = Arc::clone(&second);
        engine.set_timer(0.02, Box::new(move || {
            second_cb.fetch_add(1, Ordering::SeqCst);
        }));

        advance(&mut engine, 5000);
        assert_eq!(first.load(Ordering::SeqCst), 0, "replaced timer must never fire");
        assert_eq!(second.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_stopping_last_sound_cancels_the_timer() {
        let mut engine = AudioEngine::new(SR);
        engine.start_ambient(SoundId::Rain, 0.5);
        engine.start_ambient(SoundId::Ocean, 0.5);
        engine.set_timer(1.0, Box::new(|| {}));

        engine.stop_ambient_sound(SoundId::Rain);
        assert!(engine.timer_remaining_secs().is_some(), "siblings keep the timer");

        engine.stop_ambient_sound(SoundId::Ocean);
        assert_eq!(engine.timer_remaining_secs(), None, "empty registry cancels it");
    }

    #[test]
    fn test_non_positive_timer_fires_immediately() {
        let mut engine = AudioEngine::new(SR);
        engine.start_ambient(SoundId::Night, 0.5);
        let fired = Arc::new(AtomicUsize::new(0));
        let fired_cb = Arc::clone(&fired);
        engine.set_timer(-1.0, Box::new(move || {
            fired_cb.fetch_add(1, Ordering::SeqCst);
        }));
        engine.next_sample();
        assert_eq!(fired.load(Ordering::SeqCst), 1);
        assert!(!engine.is_playing());
    }

    #[test]
    fn test_active_channels_produce_audio() {
        let mut engine = AudioEngine::new(44100.0);
        engine.start_ambient(SoundId::Ocean, 1.0);
        let mut energy = 0.0f64;
        for _ in 0..44100 {
            let (l, r) = engine.next_sample();
            energy += (l * l + r * r) as f64;
        }
        assert!(energy > 0.0, "an active channel must be audible");

        engine.stop_ambient();
        let mut silent_energy = 0.0f64;
        for _ in 0..1000 {
            let (l, r) = engine.next_sample();
            silent_energy += (l * l + r * r) as f64;
        }
        assert_eq!(silent_energy, 0.0, "a stopped engine renders silence");
    }

    #[test]
    fn test_generate_fills_interleaved_stereo() {
        let mut engine = AudioEngine::new(44100.0);
        engine.start_ambient(SoundId::Rain, 1.0);
        let mut data = vec![0.0f32; 512];
        engine.generate(&mut data);
        assert!(data.iter().any(|&s| s != 0.0));
    }
}

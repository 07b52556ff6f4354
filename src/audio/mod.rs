pub mod channel;
pub mod engine;
pub mod envelopes;
pub mod filters;
pub mod noise;
pub mod oscillators;
pub mod sounds;
pub mod transients;

pub const PI: f32 = std::f32::consts::PI;
pub const TWO_PI: f32 = 2.0 * PI;

/// Sample rate assumed until the audio backend reports the real one.
pub const DEFAULT_SAMPLE_RATE: f32 = 44100.0;

pub fn sec_to_samples(seconds: f32, sample_rate: f32) -> u64 {
    (seconds.max(0.0) * sample_rate) as u64
}

// Basic trait for audio generators that produce a single sample output
pub trait AudioGenerator {
    fn next_sample(&mut self) -> f32;
    fn set_sample_rate(&mut self, sample_rate: f32);
}

pub trait AudioProcessor {
    fn process(&mut self, input: f32) -> f32;
    fn set_sample_rate(&mut self, sample_rate: f32);
}

/// Stereo generators are what channels render; they cross the audio-thread
/// boundary, hence `Send`.
pub trait StereoAudioGenerator: Send {
    fn next_sample(&mut self) -> (f32, f32);
    fn set_sample_rate(&mut self, sample_rate: f32);
}

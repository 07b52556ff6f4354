use crate::audio::{AudioGenerator, StereoAudioGenerator};

/// Frequency-energy distribution of a noise signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoiseColor {
    /// Flat spectrum.
    White,
    /// 1/f slope.
    Pink,
    /// 1/f^2 slope (red).
    Brown,
}

/// Per-sample white noise source for transient bursts.
pub struct WhiteNoise {
    rng: fastrand::Rng,
}

impl WhiteNoise {
    pub fn new() -> Self {
        Self {
            rng: fastrand::Rng::new(),
        }
    }

    pub fn with_seed(seed: u64) -> Self {
        Self {
            rng: fastrand::Rng::with_seed(seed),
        }
    }
}

impl Default for WhiteNoise {
    fn default() -> Self {
        Self::new()
    }
}

impl AudioGenerator for WhiteNoise {
    fn next_sample(&mut self) -> f32 {
        self.rng.f32() * 2.0 - 1.0
    }

    fn set_sample_rate(&mut self, _sample_rate: f32) {
        // Noise does not depend on sample rate
    }
}

/// Paul Kellett's 6-pole pink noise approximation. Each pole smooths the
/// current white sample at a different decay constant; their sum has a
/// 1/f slope across the audible band.
struct PinkFilter {
    b: [f32; 6],
}

impl PinkFilter {
    fn new() -> Self {
        Self { b: [0.0; 6] }
    }

    fn process(&mut self, white: f32) -> f32 {
        self.b[0] = 0.99886 * self.b[0] + white * 0.0555179;
        self.b[1] = 0.99332 * self.b[1] + white * 0.0750759;
        self.b[2] = 0.96900 * self.b[2] + white * 0.1538520;
        self.b[3] = 0.86650 * self.b[3] + white * 0.3104856;
        self.b[4] = 0.55000 * self.b[4] + white * 0.5329522;
        self.b[5] = -0.7616 * self.b[5] - white * 0.0168980;
        let sum = self.b.iter().sum::<f32>() + white * 0.5362;
        sum * 0.11
    }
}

/// Leaky integration of white noise: out[n] = (out[n-1] + k*white[n]) / (1+k).
struct BrownFilter {
    last: f32,
}

impl BrownFilter {
    const K: f32 = 0.02;

    fn new() -> Self {
        Self { last: 0.0 }
    }

    fn process(&mut self, white: f32) -> f32 {
        self.last = (self.last + Self::K * white) / (1.0 + Self::K);
        self.last * 3.5
    }
}

fn fill_channel(color: NoiseColor, frames: usize, rng: &mut fastrand::Rng) -> Vec<f32> {
    let mut pink = PinkFilter::new();
    let mut brown = BrownFilter::new();
    let mut out = Vec::with_capacity(frames);
    for _ in 0..frames {
        let white = rng.f32() * 2.0 - 1.0;
        let sample = match color {
            NoiseColor::White => white * 0.5,
            // Pink and brown recursions are unbounded in principle; clamp
            // at fill time so channel gain math stays honest downstream.
            NoiseColor::Pink => pink.process(white).clamp(-1.0, 1.0),
            NoiseColor::Brown => brown.process(white).clamp(-1.0, 1.0),
        };
        out.push(sample);
    }
    out
}

/// A fixed-length two-channel noise buffer, looped during playback so the
/// texture never reallocates. Every construction draws fresh random content.
pub struct NoiseBuffer {
    left: Vec<f32>,
    right: Vec<f32>,
    pos: usize,
}

impl NoiseBuffer {
    pub fn new(color: NoiseColor, seconds: f32, sample_rate: f32) -> Self {
        Self::with_rng(color, seconds, sample_rate, &mut fastrand::Rng::new())
    }

    pub fn with_rng(
        color: NoiseColor,
        seconds: f32,
        sample_rate: f32,
        rng: &mut fastrand::Rng,
    ) -> Self {
        // At least one frame regardless of how small seconds * rate gets;
        // next_sample indexes unconditionally.
        let frames = ((seconds.max(0.1) * sample_rate) as usize).max(1);
        Self {
            left: fill_channel(color, frames, rng),
            right: fill_channel(color, frames, rng),
            pos: 0,
        }
    }

    pub fn frames(&self) -> usize {
        self.left.len()
    }
}

impl StereoAudioGenerator for NoiseBuffer {
    fn next_sample(&mut self) -> (f32, f32) {
        let out = (self.left[self.pos], self.right[self.pos]);
        self.pos += 1;
        if self.pos >= self.left.len() {
            self.pos = 0;
        }
        out
    }

    fn set_sample_rate(&mut self, _sample_rate: f32) {
        // Buffer content is fixed once filled; a rate change only alters
        // playback pitch, which is acceptable for broadband noise.
    }
}

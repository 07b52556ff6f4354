use crate::audio::{AudioProcessor, TWO_PI};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterMode {
    Lowpass,
    Highpass,
    Bandpass,
}

/// RBJ cookbook biquad. Coefficients are recomputed lazily when the cutoff
/// moves, so LFO-driven sweeps only pay for the trig at control rate.
pub struct BiquadFilter {
    mode: FilterMode,
    frequency: f32,
    q: f32,
    sample_rate: f32,

    b0: f32,
    b1: f32,
    b2: f32,
    a1: f32,
    a2: f32,

    x1: f32,
    x2: f32,
    y1: f32,
    y2: f32,

    coeffs_dirty: bool,
}

impl BiquadFilter {
    pub fn new(mode: FilterMode, frequency: f32, q: f32, sample_rate: f32) -> Self {
        let mut filter = Self {
            mode,
            frequency,
            q: q.max(0.05),
            sample_rate,
            b0: 0.0,
            b1: 0.0,
            b2: 0.0,
            a1: 0.0,
            a2: 0.0,
            x1: 0.0,
            x2: 0.0,
            y1: 0.0,
            y2: 0.0,
            coeffs_dirty: true,
        };
        filter.update_coefficients();
        filter
    }

    pub fn lowpass(frequency: f32, sample_rate: f32) -> Self {
        Self::new(FilterMode::Lowpass, frequency, std::f32::consts::FRAC_1_SQRT_2, sample_rate)
    }

    pub fn highpass(frequency: f32, sample_rate: f32) -> Self {
        Self::new(FilterMode::Highpass, frequency, std::f32::consts::FRAC_1_SQRT_2, sample_rate)
    }

    pub fn bandpass(frequency: f32, q: f32, sample_rate: f32) -> Self {
        Self::new(FilterMode::Bandpass, frequency, q, sample_rate)
    }

    fn update_coefficients(&mut self) {
        if !self.coeffs_dirty {
            return;
        }
        // Keep the cutoff below Nyquist with margin; the sweep LFOs never
        // reach this in practice.
        let frequency = self.frequency.clamp(10.0, self.sample_rate * 0.45);
        let w = TWO_PI * frequency / self.sample_rate;
        let cos_w = w.cos();
        let sin_w = w.sin();
        let alpha = sin_w / (2.0 * self.q);

        let (b0, b1, b2) = match self.mode {
            FilterMode::Lowpass => {
                let b1 = 1.0 - cos_w;
                (b1 / 2.0, b1, b1 / 2.0)
            }
            FilterMode::Highpass => {
                let b1 = -(1.0 + cos_w);
                (-b1 / 2.0, b1, -b1 / 2.0)
            }
            FilterMode::Bandpass => (alpha, 0.0, -alpha),
        };
        let a0 = 1.0 + alpha;
        self.b0 = b0 / a0;
        self.b1 = b1 / a0;
        self.b2 = b2 / a0;
        self.a1 = -2.0 * cos_w / a0;
        self.a2 = (1.0 - alpha) / a0;
        self.coeffs_dirty = false;
    }

    pub fn set_frequency(&mut self, frequency: f32) {
        if (self.frequency - frequency).abs() > f32::EPSILON {
            self.frequency = frequency;
            self.coeffs_dirty = true;
        }
    }

    pub fn reset(&mut self) {
        self.x1 = 0.0;
        self.x2 = 0.0;
        self.y1 = 0.0;
        self.y2 = 0.0;
    }
}

impl AudioProcessor for BiquadFilter {
    fn process(&mut self, input: f32) -> f32 {
        self.update_coefficients();
        let output = self.b0 * input + self.b1 * self.x1 + self.b2 * self.x2
            - self.a1 * self.y1
            - self.a2 * self.y2;
        self.x2 = self.x1;
        self.x1 = input;
        self.y2 = self.y1;
        self.y1 = output;
        output
    }

    fn set_sample_rate(&mut self, sample_rate: f32) {
        self.sample_rate = sample_rate;
        self.coeffs_dirty = true;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OnePoleMode {
    Lowpass,
    Highpass,
}

pub struct OnePoleFilter {
    state: f32,
    cutoff: f32,
    mode: OnePoleMode,
    sample_rate: f32,
    a0: f32,
    b1: f32,
    coeffs_dirty: bool,
}

impl OnePoleFilter {
    pub fn new(cutoff: f32, mode: OnePoleMode, sample_rate: f32) -> Self {
        let mut filter = Self {
            state: 0.0,
            cutoff,
            mode,
            sample_rate,
            a0: 0.0,
            b1: 0.0,
            coeffs_dirty: true,
        };
        filter.update_coefficients();
        filter
    }

    fn update_coefficients(&mut self) {
        if self.coeffs_dirty {
            let omega = TWO_PI * self.cutoff / self.sample_rate;
            self.b1 = (-omega).exp();
            self.a0 = 1.0 - self.b1;
            self.coeffs_dirty = false;
        }
    }

    pub fn set_cutoff_frequency(&mut self, cutoff: f32) {
        if (self.cutoff - cutoff).abs() > f32::EPSILON {
            self.cutoff = cutoff;
            self.coeffs_dirty = true;
        }
    }
}

impl AudioProcessor for OnePoleFilter {
    fn process(&mut self, input: f32) -> f32 {
        self.update_coefficients();
        let lowpass = self.b1 * self.state + self.a0 * input;
        self.state = lowpass;
        match self.mode {
            OnePoleMode::Lowpass => lowpass,
            OnePoleMode::Highpass => input - lowpass,
        }
    }

    fn set_sample_rate(&mut self, sample_rate: f32) {
        self.sample_rate = sample_rate;
        self.coeffs_dirty = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::AudioGenerator;
    use crate::audio::oscillators::SineOscillator;

    fn rms(samples: &[f32]) -> f32 {
        (samples.iter().map(|s| s * s).sum::<f32>() / samples.len() as f32).sqrt()
    }

    fn run_tone_through(filter: &mut BiquadFilter, freq: f32, sample_rate: f32) -> f32 {
        let mut osc = SineOscillator::new(freq, sample_rate);
        let mut out = Vec::with_capacity(8192);
        // Skip the transient, then measure
        for _ in 0..2048 {
            filter.process(osc.next_sample());
        }
        for _ in 0..8192 {
            out.push(filter.process(osc.next_sample()));
        }
        rms(&out)
    }

    #[test]
    fn test_lowpass_attenuates_high_frequencies() {
        let sample_rate = 44100.0;
        let mut filter = BiquadFilter::lowpass(500.0, sample_rate);
        let low = run_tone_through(&mut filter, 100.0, sample_rate);
        filter.reset();
        let high = run_tone_through(&mut filter, 8000.0, sample_rate);
        assert!(
            high < low * 0.1,
            "8kHz ({}) should be strongly attenuated vs 100Hz ({})",
            high,
            low
        );
    }

    #[test]
    fn test_highpass_attenuates_low_frequencies() {
        let sample_rate = 44100.0;
        let mut filter = BiquadFilter::highpass(2000.0, sample_rate);
        let high = run_tone_through(&mut filter, 8000.0, sample_rate);
        filter.reset();
        let low = run_tone_through(&mut filter, 100.0, sample_rate);
        assert!(
            low < high * 0.1,
            "100Hz ({}) should be strongly attenuated vs 8kHz ({})",
            low,
            high
        );
    }

    #[test]
    fn test_bandpass_passes_center_frequency() {
        let sample_rate = 44100.0;
        let mut filter = BiquadFilter::bandpass(1000.0, 2.0, sample_rate);
        let center = run_tone_through(&mut filter, 1000.0, sample_rate);
        filter.reset();
        let below = run_tone_through(&mut filter, 100.0, sample_rate);
        filter.reset();
        let above = run_tone_through(&mut filter, 10000.0, sample_rate);
        assert!(center > below * 3.0, "center {} vs below {}", center, below);
        assert!(center > above * 3.0, "center {} vs above {}", center, above);
    }

    #[test]
    fn test_one_pole_lowpass_smooths() {
        let mut filter = OnePoleFilter::new(10.0, OnePoleMode::Lowpass, 44100.0);
        // Step input settles toward 1.0 without overshoot
        let mut last = 0.0;
        for _ in 0..44100 {
            let out = filter.process(1.0);
            assert!(out >= last - 1e-6, "one-pole step response must be monotonic");
            assert!(out <= 1.0 + 1e-6);
            last = out;
        }
        assert!(last > 0.9, "should settle near 1.0, got {}", last);
    }
}

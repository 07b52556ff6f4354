use crate::audio::{AudioGenerator, TWO_PI};
use once_cell::sync::Lazy;

const SINE_TABLE_SIZE: usize = 4096;

static SINE_TABLE: Lazy<Vec<f32>> = Lazy::new(|| {
    (0..SINE_TABLE_SIZE)
        .map(|i| (i as f32 * TWO_PI / SINE_TABLE_SIZE as f32).sin())
        .collect()
});

pub struct PhaseGenerator {
    phase: f32,
    phase_increment: f32,
    frequency: f32,
    sample_rate: f32,
}

impl PhaseGenerator {
    pub fn new(frequency: f32, sample_rate: f32) -> Self {
        Self {
            phase: 0.0,
            frequency,
            sample_rate,
            phase_increment: frequency / sample_rate,
        }
    }

    pub fn set_frequency(&mut self, frequency: f32) {
        self.frequency = frequency;
        self.phase_increment = frequency / self.sample_rate;
    }

    pub fn set_sample_rate(&mut self, sample_rate: f32) {
        self.sample_rate = sample_rate;
        self.phase_increment = self.frequency / sample_rate;
    }

    pub fn next_sample(&mut self) -> f32 {
        let sample = self.phase;
        self.phase += self.phase_increment;
        if self.phase >= 1.0 {
            self.phase -= self.phase.floor();
        }
        sample
    }
}

pub struct SineOscillator {
    phase_gen: PhaseGenerator,
}

impl SineOscillator {
    pub fn new(frequency: f32, sample_rate: f32) -> Self {
        Self {
            phase_gen: PhaseGenerator::new(frequency, sample_rate),
        }
    }

    pub fn set_frequency(&mut self, frequency: f32) {
        self.phase_gen.set_frequency(frequency);
    }
}

impl AudioGenerator for SineOscillator {
    fn next_sample(&mut self) -> f32 {
        let phase = self.phase_gen.next_sample();
        let table_index = ((phase * SINE_TABLE_SIZE as f32) as usize) % SINE_TABLE_SIZE;
        SINE_TABLE[table_index]
    }

    fn set_sample_rate(&mut self, sample_rate: f32) {
        self.phase_gen.set_sample_rate(sample_rate);
    }
}

/// Slow oscillator mapped onto a parameter range: center +/- depth.
/// Sound builders use these to add organic drift to filter cutoffs and
/// channel amplitude. Modulation targets only read it at control rate, so
/// it advances in blocks rather than per sample.
pub struct Lfo {
    phase: f32,
    rate_hz: f32,
    sample_rate: f32,
    center: f32,
    depth: f32,
}

impl Lfo {
    pub fn new(rate_hz: f32, center: f32, depth: f32, sample_rate: f32) -> Self {
        Self {
            phase: 0.0,
            rate_hz,
            sample_rate,
            center,
            depth,
        }
    }

    pub fn value(&self) -> f32 {
        self.center + (self.phase * TWO_PI).sin() * self.depth
    }

    /// Advance the phase by `samples` frames and return the value there.
    pub fn advance(&mut self, samples: u32) -> f32 {
        self.phase += self.rate_hz / self.sample_rate * samples as f32;
        self.phase -= self.phase.floor();
        self.value()
    }

    pub fn set_sample_rate(&mut self, sample_rate: f32) {
        self.sample_rate = sample_rate;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sine_oscillator_period() {
        let sample_rate = 1000.0;
        let mut osc = SineOscillator::new(10.0, sample_rate); // 100-sample period
        let mut samples = Vec::new();
        for _ in 0..100 {
            samples.push(osc.next_sample());
        }
        let max = samples.iter().fold(f32::NEG_INFINITY, |a, &b| a.max(b));
        let min = samples.iter().fold(f32::INFINITY, |a, &b| a.min(b));
        assert!(max > 0.95, "sine should approach +1 within one period, max {}", max);
        assert!(min < -0.95, "sine should approach -1 within one period, min {}", min);
        // Next period starts back near zero
        let restart = osc.next_sample();
        assert!(restart.abs() < 0.1, "phase should wrap, got {}", restart);
    }

    #[test]
    fn test_lfo_stays_within_mapped_range() {
        let mut lfo = Lfo::new(2.0, 500.0, 100.0, 44100.0);
        let mut min = f32::INFINITY;
        let mut max = f32::NEG_INFINITY;
        for _ in 0..10_000 {
            let v = lfo.advance(64);
            assert!((400.0..=600.0).contains(&v), "LFO value {} out of range", v);
            min = min.min(v);
            max = max.max(v);
        }
        assert!(min < 420.0 && max > 580.0, "LFO should sweep most of its range ({}..{})", min, max);
    }
}

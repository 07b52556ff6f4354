use crate::audio::{sec_to_samples, AudioGenerator};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CurveType {
    Linear,
    Exponential,
    Logarithmic,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EnvelopeState {
    Idle,
    Attack,
    Release,
}

/// Attack-release envelope gating transient bursts. One trigger runs the
/// whole attack then release; there is no sustain stage.
pub struct AREnvelope {
    attack_time: f32,
    release_time: f32,
    attack_curve: CurveType,
    release_curve: CurveType,
    sample_rate: f32,

    state: EnvelopeState,
    current_level: f32,
    attack_samples: u32,
    release_samples: u32,
    current_sample: u32,
}

impl AREnvelope {
    pub fn new(sample_rate: f32) -> Self {
        Self {
            attack_time: 0.01,
            release_time: 0.1,
            attack_curve: CurveType::Logarithmic,
            release_curve: CurveType::Exponential,
            sample_rate,
            state: EnvelopeState::Idle,
            current_level: 0.0,
            attack_samples: 0,
            release_samples: 0,
            current_sample: 0,
        }
    }

    pub fn set_attack_time(&mut self, time: f32) {
        self.attack_time = time.max(0.001);
    }

    pub fn set_release_time(&mut self, time: f32) {
        self.release_time = time.max(0.001);
    }

    pub fn set_attack_curve(&mut self, curve: CurveType) {
        self.attack_curve = curve;
    }

    pub fn set_release_curve(&mut self, curve: CurveType) {
        self.release_curve = curve;
    }

    pub fn trigger(&mut self) {
        self.state = EnvelopeState::Attack;
        self.current_sample = 0;
        self.attack_samples = sec_to_samples(self.attack_time, self.sample_rate) as u32;
        self.release_samples = sec_to_samples(self.release_time, self.sample_rate) as u32;
    }

    pub fn is_active(&self) -> bool {
        self.state != EnvelopeState::Idle
    }

    fn apply_curve(&self, progress: f32, curve: CurveType) -> f32 {
        match curve {
            CurveType::Linear => progress,
            CurveType::Exponential => progress * progress,
            CurveType::Logarithmic => 1.0 - (1.0 - progress).powi(2),
        }
    }
}

impl AudioGenerator for AREnvelope {
    fn next_sample(&mut self) -> f32 {
        match self.state {
            EnvelopeState::Idle => 0.0,

            EnvelopeState::Attack => {
                if self.current_sample >= self.attack_samples {
                    self.state = EnvelopeState::Release;
                    self.current_sample = 0;
                    self.current_level = 1.0;
                } else {
                    let progress = self.current_sample as f32 / self.attack_samples as f32;
                    self.current_level = self.apply_curve(progress, self.attack_curve);
                    self.current_sample += 1;
                }
                self.current_level
            }

            EnvelopeState::Release => {
                if self.current_sample >= self.release_samples {
                    self.state = EnvelopeState::Idle;
                    self.current_level = 0.0;
                } else {
                    let progress = self.current_sample as f32 / self.release_samples as f32;
                    self.current_level = 1.0 - self.apply_curve(progress, self.release_curve);
                    self.current_sample += 1;
                }
                self.current_level
            }
        }
    }

    fn set_sample_rate(&mut self, sample_rate: f32) {
        self.sample_rate = sample_rate;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_envelope_runs_attack_then_release_then_idle() {
        let sample_rate = 44100.0;
        let mut env = AREnvelope::new(sample_rate);
        env.set_attack_time(0.01);
        env.set_release_time(0.02);

        assert_eq!(env.next_sample(), 0.0);
        assert!(!env.is_active());

        env.trigger();
        assert!(env.is_active());

        let mut levels = Vec::new();
        let mut guard = 0;
        while env.is_active() {
            levels.push(env.next_sample());
            guard += 1;
            assert!(guard < 10_000, "envelope must terminate");
        }

        let expected = ((0.01 + 0.02) * sample_rate) as i32;
        assert!(
            (levels.len() as i32 - expected).abs() <= 2,
            "envelope length {} should be ~{} samples",
            levels.len(),
            expected
        );

        let max = levels.iter().fold(0.0f32, |a, &b| a.max(b));
        let min = levels.iter().fold(f32::INFINITY, |a, &b| a.min(b));
        assert!((max - 1.0).abs() < 0.01, "peak should reach 1.0, got {}", max);
        assert!(min >= 0.0, "level should never go negative, got {}", min);
        assert_eq!(env.next_sample(), 0.0, "idle level is 0.0");
    }

    #[test]
    fn test_retrigger_restarts_attack() {
        let mut env = AREnvelope::new(44100.0);
        env.set_attack_time(0.05);
        env.set_release_time(0.05);
        env.trigger();
        for _ in 0..1000 {
            env.next_sample();
        }
        let mid = env.next_sample();
        env.trigger();
        let restarted = env.next_sample();
        assert!(
            restarted < mid,
            "retrigger should restart from the bottom of the attack ({} vs {})",
            restarted,
            mid
        );
    }
}

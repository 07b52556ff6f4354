use crate::audio::envelopes::{AREnvelope, CurveType};
use crate::audio::filters::BiquadFilter;
use crate::audio::noise::WhiteNoise;
use crate::audio::oscillators::SineOscillator;
use crate::audio::{AudioGenerator, AudioProcessor, PI};

/// A short, randomly-timed discrete sound layered onto a continuous texture.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransientKind {
    /// Bird call: pitch-swept tone burst.
    Chirp,
    /// Fire pop: impulse-shaped filtered noise burst.
    Crackle,
    /// Cup/cutlery ping: high tone with a fast decay.
    Clink,
    /// Water drip: short downward tone sweep.
    Drip,
    /// Cricket: amplitude-modulated high tone.
    Cricket,
}

enum Source {
    Tone {
        osc: SineOscillator,
        frequency: f32,
        // Per-sample multiplicative sweep; 1.0 holds pitch.
        sweep: f32,
    },
    Burst {
        noise: WhiteNoise,
        filter: BiquadFilter,
    },
}

/// One in-flight transient. Voices are created by a channel's scheduled
/// tasks, mixed on top of the bed, and dropped once the envelope finishes.
pub struct TransientVoice {
    source: Source,
    env: AREnvelope,
    amp_mod: Option<SineOscillator>,
    level: f32,
    pan: f32,
}

impl TransientVoice {
    pub fn new(kind: TransientKind, sample_rate: f32, rng: &mut fastrand::Rng) -> Self {
        let mut env = AREnvelope::new(sample_rate);
        let mut amp_mod = None;

        let (source, level) = match kind {
            TransientKind::Chirp => {
                let frequency = 2200.0 + rng.f32() * 2000.0;
                env.set_attack_time(0.005);
                env.set_release_time(0.06 + rng.f32() * 0.08);
                env.set_release_curve(CurveType::Exponential);
                (
                    Source::Tone {
                        osc: SineOscillator::new(frequency, sample_rate),
                        frequency,
                        sweep: 0.99994 - rng.f32() * 0.00004,
                    },
                    0.10 + rng.f32() * 0.08,
                )
            }
            TransientKind::Crackle => {
                env.set_attack_time(0.001);
                env.set_release_time(0.008 + rng.f32() * 0.025);
                env.set_attack_curve(CurveType::Logarithmic);
                let center = 1800.0 + rng.f32() * 2600.0;
                (
                    Source::Burst {
                        noise: WhiteNoise::with_seed(rng.u64(..)),
                        filter: BiquadFilter::bandpass(center, 1.2, sample_rate),
                    },
                    0.18 + rng.f32() * 0.15,
                )
            }
            TransientKind::Clink => {
                let frequency = 2600.0 + rng.f32() * 2400.0;
                env.set_attack_time(0.001);
                env.set_release_time(0.04 + rng.f32() * 0.05);
                env.set_release_curve(CurveType::Exponential);
                (
                    Source::Tone {
                        osc: SineOscillator::new(frequency, sample_rate),
                        frequency,
                        sweep: 1.0,
                    },
                    0.05 + rng.f32() * 0.05,
                )
            }
            TransientKind::Drip => {
                let frequency = 900.0 + rng.f32() * 500.0;
                env.set_attack_time(0.002);
                env.set_release_time(0.03 + rng.f32() * 0.05);
                (
                    Source::Tone {
                        osc: SineOscillator::new(frequency, sample_rate),
                        frequency,
                        // Steep drop gives the characteristic "bloop"
                        sweep: 0.9996,
                    },
                    0.08 + rng.f32() * 0.06,
                )
            }
            TransientKind::Cricket => {
                let frequency = 4100.0 + rng.f32() * 700.0;
                env.set_attack_time(0.02);
                env.set_release_time(0.15 + rng.f32() * 0.2);
                amp_mod = Some(SineOscillator::new(
                    22.0 + rng.f32() * 8.0,
                    sample_rate,
                ));
                (
                    Source::Tone {
                        osc: SineOscillator::new(frequency, sample_rate),
                        frequency,
                        sweep: 1.0,
                    },
                    0.04 + rng.f32() * 0.03,
                )
            }
        };

        env.trigger();

        Self {
            source,
            env,
            amp_mod,
            level,
            pan: rng.f32(),
        }
    }

    pub fn is_finished(&self) -> bool {
        !self.env.is_active()
    }

    pub fn next_frame(&mut self) -> (f32, f32) {
        let raw = match &mut self.source {
            Source::Tone { osc, frequency, sweep } => {
                if *sweep != 1.0 {
                    *frequency *= *sweep;
                    osc.set_frequency(*frequency);
                }
                osc.next_sample()
            }
            Source::Burst { noise, filter } => filter.process(noise.next_sample()),
        };

        let mut sample = raw * self.env.next_sample() * self.level;
        if let Some(modulator) = &mut self.amp_mod {
            // Unipolar tremolo so the tone pulses rather than rings
            sample *= 0.5 + 0.5 * modulator.next_sample();
        }

        // Equal-power pan
        let angle = self.pan * PI / 2.0;
        (sample * angle.cos(), sample * angle.sin())
    }

    pub fn set_sample_rate(&mut self, sample_rate: f32) {
        self.env.set_sample_rate(sample_rate);
        if let Some(modulator) = &mut self.amp_mod {
            modulator.set_sample_rate(sample_rate);
        }
        match &mut self.source {
            Source::Tone { osc, .. } => osc.set_sample_rate(sample_rate),
            Source::Burst { filter, .. } => filter.set_sample_rate(sample_rate),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_kind_finishes_and_stays_bounded() {
        let sample_rate = 44100.0;
        let mut rng = fastrand::Rng::with_seed(42);
        for kind in [
            TransientKind::Chirp,
            TransientKind::Crackle,
            TransientKind::Clink,
            TransientKind::Drip,
            TransientKind::Cricket,
        ] {
            let mut voice = TransientVoice::new(kind, sample_rate, &mut rng);
            assert!(!voice.is_finished(), "{:?} should start active", kind);

            let mut peak = 0.0f32;
            let mut frames = 0u32;
            while !voice.is_finished() {
                let (l, r) = voice.next_frame();
                peak = peak.max(l.abs()).max(r.abs());
                frames += 1;
                assert!(frames < 44100, "{:?} should finish within a second", kind);
            }
            assert!(peak > 0.0, "{:?} should produce audible output", kind);
            assert!(peak <= 1.0, "{:?} peak {} exceeds full scale", kind, peak);
        }
    }

    #[test]
    fn test_finished_voice_is_silent() {
        let mut rng = fastrand::Rng::with_seed(9);
        let mut voice = TransientVoice::new(TransientKind::Clink, 44100.0, &mut rng);
        while !voice.is_finished() {
            voice.next_frame();
        }
        let (l, r) = voice.next_frame();
        assert_eq!((l, r), (0.0, 0.0));
    }
}

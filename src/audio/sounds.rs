use serde::de::{self, Deserialize, Deserializer};
use serde::{Serialize, Serializer};

use crate::audio::channel::{Channel, ScheduledTask};
use crate::audio::filters::BiquadFilter;
use crate::audio::noise::{NoiseBuffer, NoiseColor};
use crate::audio::oscillators::Lfo;
use crate::audio::transients::TransientKind;
use crate::audio::{AudioProcessor, StereoAudioGenerator};

/// The fixed set of ambient sounds. Defined at process start; display
/// metadata only, no behavior of its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SoundId {
    Rain,
    Ocean,
    Forest,
    Campfire,
    Wind,
    Cafe,
    Night,
}

impl SoundId {
    pub const ALL: [SoundId; 7] = [
        SoundId::Rain,
        SoundId::Ocean,
        SoundId::Forest,
        SoundId::Campfire,
        SoundId::Wind,
        SoundId::Cafe,
        SoundId::Night,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            SoundId::Rain => "Rain",
            SoundId::Ocean => "Ocean waves",
            SoundId::Forest => "Forest birds",
            SoundId::Campfire => "Campfire",
            SoundId::Wind => "Wind",
            SoundId::Cafe => "Cafe murmur",
            SoundId::Night => "Night crickets",
        }
    }

    /// Stable identifier used in settings files and on the command line.
    pub fn key(&self) -> &'static str {
        match self {
            SoundId::Rain => "rain",
            SoundId::Ocean => "ocean",
            SoundId::Forest => "forest",
            SoundId::Campfire => "campfire",
            SoundId::Wind => "wind",
            SoundId::Cafe => "cafe",
            SoundId::Night => "night",
        }
    }

    pub fn from_key(key: &str) -> Option<SoundId> {
        SoundId::ALL.iter().copied().find(|id| id.key() == key)
    }
}

impl std::fmt::Display for SoundId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

// Sounds persist as plain strings, including as TOML map keys, so serde
// goes through `key`/`from_key` rather than derive.
impl Serialize for SoundId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.key())
    }
}

impl<'de> Deserialize<'de> for SoundId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let key = String::deserialize(deserializer)?;
        SoundId::from_key(&key)
            .ok_or_else(|| de::Error::custom(format!("unknown sound id '{}'", key)))
    }
}

/// How often modulation targets are re-read, in frames.
const CONTROL_INTERVAL: u32 = 64;

/// Length of each looped noise bed. Long enough that the loop seam is
/// inaudible under the filters.
const BED_SECONDS: f32 = 3.0;

/// A continuous noise texture: looped noise buffer, one shaping filter per
/// side, and optional slow drift on amplitude and filter cutoff.
pub struct TextureBed {
    buf: NoiseBuffer,
    filter_l: BiquadFilter,
    filter_r: BiquadFilter,
    rumble_l: Option<BiquadFilter>,
    rumble_r: Option<BiquadFilter>,
    amp_lfo: Option<Lfo>,
    cutoff_lfo: Option<Lfo>,
    level: f32,
    amp: f32,
    control_counter: u32,
}

impl TextureBed {
    fn new(
        color: NoiseColor,
        filter: impl Fn() -> BiquadFilter,
        level: f32,
        sample_rate: f32,
    ) -> Self {
        Self {
            buf: NoiseBuffer::new(color, BED_SECONDS, sample_rate),
            filter_l: filter(),
            filter_r: filter(),
            rumble_l: None,
            rumble_r: None,
            amp_lfo: None,
            cutoff_lfo: None,
            level,
            amp: 1.0,
            control_counter: 0,
        }
    }

    fn with_amp_lfo(mut self, lfo: Lfo) -> Self {
        self.amp = lfo.value();
        self.amp_lfo = Some(lfo);
        self
    }

    fn with_cutoff_lfo(mut self, lfo: Lfo) -> Self {
        self.cutoff_lfo = Some(lfo);
        self
    }

    /// Highpass stage after the shaping filter, cutting sub-bass wander
    /// out of brown-noise beds.
    fn with_rumble_cut(mut self, frequency: f32, sample_rate: f32) -> Self {
        self.rumble_l = Some(BiquadFilter::highpass(frequency, sample_rate));
        self.rumble_r = Some(BiquadFilter::highpass(frequency, sample_rate));
        self
    }

    fn update_modulation(&mut self) {
        if let Some(lfo) = &mut self.amp_lfo {
            self.amp = lfo.advance(CONTROL_INTERVAL);
        }
        if let Some(lfo) = &mut self.cutoff_lfo {
            let cutoff = lfo.advance(CONTROL_INTERVAL);
            self.filter_l.set_frequency(cutoff);
            self.filter_r.set_frequency(cutoff);
        }
    }
}

impl StereoAudioGenerator for TextureBed {
    fn next_sample(&mut self) -> (f32, f32) {
        if self.control_counter == 0 {
            self.update_modulation();
        }
        self.control_counter = (self.control_counter + 1) % CONTROL_INTERVAL;

        let (l, r) = self.buf.next_sample();
        let mut l = self.filter_l.process(l);
        let mut r = self.filter_r.process(r);
        if let Some(hp) = &mut self.rumble_l {
            l = hp.process(l);
        }
        if let Some(hp) = &mut self.rumble_r {
            r = hp.process(r);
        }
        (l * self.level * self.amp, r * self.level * self.amp)
    }

    fn set_sample_rate(&mut self, sample_rate: f32) {
        self.filter_l.set_sample_rate(sample_rate);
        self.filter_r.set_sample_rate(sample_rate);
        if let Some(hp) = &mut self.rumble_l {
            hp.set_sample_rate(sample_rate);
        }
        if let Some(hp) = &mut self.rumble_r {
            hp.set_sample_rate(sample_rate);
        }
        if let Some(lfo) = &mut self.amp_lfo {
            lfo.set_sample_rate(sample_rate);
        }
        if let Some(lfo) = &mut self.cutoff_lfo {
            lfo.set_sample_rate(sample_rate);
        }
    }
}

/// Build a live channel for `id`, immediately audible: the bed starts
/// looping right away and the first transient tasks are already queued.
/// Builders hold no state of their own; everything lands on the channel.
pub fn build_channel(id: SoundId, gain: f32, sample_rate: f32, now: u64) -> Channel {
    let sr = sample_rate;
    let (bed, transients): (TextureBed, Option<(TransientKind, f32, f32)>) = match id {
        SoundId::Rain => (
            TextureBed::new(NoiseColor::Pink, || BiquadFilter::lowpass(3200.0, sr), 0.9, sr)
                .with_amp_lfo(Lfo::new(0.05, 0.9, 0.1, sr)),
            // Sparse drips on top of the steady wash
            Some((TransientKind::Drip, 0.8, 3.5)),
        ),
        SoundId::Ocean => (
            TextureBed::new(NoiseColor::Brown, || BiquadFilter::lowpass(900.0, sr), 1.0, sr)
                // Swell period of ~12s reads as incoming waves
                .with_amp_lfo(Lfo::new(0.08, 0.65, 0.35, sr)),
            None,
        ),
        SoundId::Forest => (
            TextureBed::new(NoiseColor::Pink, || BiquadFilter::lowpass(2400.0, sr), 0.35, sr)
                .with_amp_lfo(Lfo::new(0.03, 0.9, 0.1, sr)),
            Some((TransientKind::Chirp, 1.5, 7.0)),
        ),
        SoundId::Campfire => (
            TextureBed::new(NoiseColor::Brown, || BiquadFilter::lowpass(500.0, sr), 0.8, sr)
                .with_amp_lfo(Lfo::new(0.11, 0.85, 0.15, sr)),
            Some((TransientKind::Crackle, 0.15, 1.2)),
        ),
        SoundId::Wind => (
            TextureBed::new(NoiseColor::Pink, || BiquadFilter::bandpass(650.0, 0.8, sr), 1.1, sr)
                // Gusts: the band itself wanders
                .with_cutoff_lfo(Lfo::new(0.07, 650.0, 350.0, sr)),
            None,
        ),
        SoundId::Cafe => (
            TextureBed::new(NoiseColor::Brown, || BiquadFilter::lowpass(1100.0, sr), 0.7, sr)
                // Keep the murmur band; brown noise alone booms below it
                .with_rumble_cut(150.0, sr)
                .with_amp_lfo(Lfo::new(0.17, 0.8, 0.2, sr)),
            Some((TransientKind::Clink, 2.0, 9.0)),
        ),
        SoundId::Night => (
            TextureBed::new(NoiseColor::Pink, || BiquadFilter::lowpass(1500.0, sr), 0.2, sr),
            Some((TransientKind::Cricket, 0.7, 2.5)),
        ),
    };

    let mut channel = Channel::new(id, gain, Box::new(bed), sample_rate);
    if let Some((kind, min_gap, max_gap)) = transients {
        // First firing lands somewhere inside the first gap window
        let first = now + crate::audio::sec_to_samples(min_gap, sample_rate).max(1);
        channel.schedule(ScheduledTask::new(first, kind, min_gap, max_gap));
    }
    channel
}

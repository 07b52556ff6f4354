//! Ambient soundscape engine: procedurally synthesized noise textures
//! (rain, ocean, wind, ...), an insertion-ordered channel mixer with a
//! shared sleep timer, and a sync layer keeping a declarative playback
//! store in lockstep with the engine.

pub mod audio;
pub mod events;
pub mod output;
pub mod settings;
pub mod sync;

pub use audio::engine::AudioEngine;
pub use audio::sounds::SoundId;
pub use output::AudioOutput;
pub use settings::Settings;
pub use sync::{PlaybackStore, PlaybackSync, DEFAULT_VOLUME};

use std::sync::{Arc, Mutex};

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Sample, SampleFormat};

use crate::audio::engine::AudioEngine;

#[derive(Debug, thiserror::Error)]
pub enum OutputError {
    #[error("no audio output device available")]
    NoDevice,
    #[error("could not query default stream config: {0}")]
    DefaultConfig(#[from] cpal::DefaultStreamConfigError),
    #[error("could not build audio stream: {0}")]
    BuildStream(#[from] cpal::BuildStreamError),
    #[error("could not start audio stream: {0}")]
    Play(#[from] cpal::PlayStreamError),
    #[error("unsupported sample format {0:?}")]
    UnsupportedFormat(SampleFormat),
}

/// Host audio backend: pulls frames from the shared engine into a cpal
/// stream. Owning the value keeps the stream alive; dropping it stops
/// audible output without touching engine state.
pub struct AudioOutput {
    _stream: cpal::Stream,
}

impl AudioOutput {
    pub fn new(engine: Arc<Mutex<AudioEngine>>) -> Result<Self, OutputError> {
        let host = cpal::default_host();
        let device = host.default_output_device().ok_or(OutputError::NoDevice)?;
        Self::on_device(&device, engine)
    }

    pub fn on_device(
        device: &cpal::Device,
        engine: Arc<Mutex<AudioEngine>>,
    ) -> Result<Self, OutputError> {
        let config = device.default_output_config()?;

        // The engine assumed a default rate until now; align it with the
        // device before the first callback.
        {
            let mut engine = match engine.lock() {
                Ok(guard) => guard,
                Err(poisoned) => poisoned.into_inner(),
            };
            engine.set_sample_rate(config.sample_rate().0 as f32);
        }

        let stream = match config.sample_format() {
            SampleFormat::F32 => Self::run::<f32>(device, &config.into(), engine)?,
            SampleFormat::I16 => Self::run::<i16>(device, &config.into(), engine)?,
            SampleFormat::U16 => Self::run::<u16>(device, &config.into(), engine)?,
            other => return Err(OutputError::UnsupportedFormat(other)),
        };

        stream.play()?;

        Ok(AudioOutput { _stream: stream })
    }

    fn run<T>(
        device: &cpal::Device,
        config: &cpal::StreamConfig,
        engine: Arc<Mutex<AudioEngine>>,
    ) -> Result<cpal::Stream, cpal::BuildStreamError>
    where
        T: Sample + cpal::SizedSample + cpal::FromSample<f32>,
    {
        let channels = config.channels as usize;

        let stream = device.build_output_stream(
            config,
            move |data: &mut [T], _: &cpal::OutputCallbackInfo| {
                for frame in data.chunks_mut(channels) {
                    let (left, right) = if let Ok(mut engine) = engine.try_lock() {
                        engine.next_sample()
                    } else {
                        (0.0, 0.0)
                    };

                    // Limiting and NaN protection before it reaches the DAC
                    let left = if left.is_finite() {
                        left.clamp(-0.95, 0.95)
                    } else {
                        0.0
                    };
                    let right = if right.is_finite() {
                        right.clamp(-0.95, 0.95)
                    } else {
                        0.0
                    };

                    if channels >= 2 {
                        frame[0] = T::from_sample(left);
                        frame[1] = T::from_sample(right);
                    } else {
                        frame[0] = T::from_sample((left + right) * 0.5);
                    }

                    for sample in frame.iter_mut().skip(2) {
                        *sample = T::from_sample(0.0);
                    }
                }
            },
            |err| log::error!("audio stream error: {}", err),
            None,
        )?;

        Ok(stream)
    }
}

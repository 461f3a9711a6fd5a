//! Wave file input and output

// SPDX-FileCopyrightText: © 2024 The BarrVerb authors
//
// SPDX-License-Identifier: ISC

use std::path::Path;

use hound::{SampleFormat, WavReader, WavSpec, WavWriter};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum WavError {
    #[error("{0}")]
    Hound(#[from] hound::Error),

    #[error("only mono and stereo wave files are supported (file has {0} channels)")]
    UnsupportedChannels(u16),

    #[error("unsupported sample format: {0} bit {1:?}")]
    UnsupportedFormat(u16, SampleFormat),
}

pub enum Channels {
    Mono(Vec<f32>),
    Stereo(Vec<f32>, Vec<f32>),
}

pub struct WaveFile {
    pub sample_rate: u32,
    pub channels: Channels,
}

impl WaveFile {
    pub fn n_frames(&self) -> usize {
        match &self.channels {
            Channels::Mono(s) => s.len(),
            Channels::Stereo(l, _) => l.len(),
        }
    }
}

fn int_to_f32(sample: i32, bits_per_sample: u16) -> f32 {
    let max = (1_i64 << (bits_per_sample - 1)) as f32;
    sample as f32 / max
}

fn deinterleave(samples: Vec<f32>, n_channels: u16) -> Channels {
    match n_channels {
        1 => Channels::Mono(samples),
        _ => {
            let (left, right) = samples
                .chunks_exact(2)
                .map(|frame| (frame[0], frame[1]))
                .unzip();
            Channels::Stereo(left, right)
        }
    }
}

/// Reads a mono or stereo wave file (integer PCM or 32 bit float).
pub fn read_wave_file(path: &Path) -> Result<WaveFile, WavError> {
    let reader = WavReader::open(path)?;
    let spec = reader.spec();

    if !matches!(spec.channels, 1 | 2) {
        return Err(WavError::UnsupportedChannels(spec.channels));
    }

    let samples = match (spec.sample_format, spec.bits_per_sample) {
        (SampleFormat::Int, bits @ 8..=32) => reader
            .into_samples::<i32>()
            .map(|s| s.map(|s| int_to_f32(s, bits)))
            .collect::<Result<Vec<f32>, _>>()?,
        (SampleFormat::Float, 32) => reader
            .into_samples::<f32>()
            .collect::<Result<Vec<f32>, _>>()?,
        (format, bits) => return Err(WavError::UnsupportedFormat(bits, format)),
    };

    Ok(WaveFile {
        sample_rate: spec.sample_rate,
        channels: deinterleave(samples, spec.channels),
    })
}

fn f32_to_i16(sample: f32) -> i16 {
    (sample.clamp(-1.0, 1.0) * f32::from(i16::MAX)) as i16
}

/// Writes a 16 bit stereo wave file.
pub fn write_stereo_wave_file(
    path: &Path,
    sample_rate: u32,
    left: &[f32],
    right: &[f32],
) -> Result<(), WavError> {
    let spec = WavSpec {
        channels: 2,
        sample_rate,
        bits_per_sample: 16,
        sample_format: SampleFormat::Int,
    };

    let mut writer = WavWriter::create(path, spec)?;

    for (&l, &r) in left.iter().zip(right) {
        writer.write_sample(f32_to_i16(l))?;
        writer.write_sample(f32_to_i16(r))?;
    }

    writer.finalize()?;

    Ok(())
}

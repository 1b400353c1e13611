//! WAV container glue and sample-rate conversion
//!
//! The codec works on raw f32 mono PCM; everything about files
//! lives here. Reading normalizes any common WAV sample format
//! to `[-1.0, 1.0]` and keeps channel 0 of multichannel audio.

use std::path::Path;

use anyhow::{bail, Context};
use hound::{SampleFormat, WavReader, WavSpec, WavWriter};
use log::info;

/// Read a WAV file into normalized mono f32 samples
///
/// Returns the samples and their sampling rate.
pub fn read_wav(path: &Path) -> Result<(Vec<f32>, u32), anyhow::Error> {
    let mut reader = WavReader::open(path)
        .with_context(|| format!("unable to open \"{}\"", path.display()))?;
    let spec = reader.spec();

    if spec.channels == 0 {
        bail!("\"{}\" declares zero audio channels", path.display());
    }

    info!(
        "reading \"{}\": {} Hz, {} ch, {}-bit {}",
        path.display(),
        spec.sample_rate,
        spec.channels,
        spec.bits_per_sample,
        match spec.sample_format {
            SampleFormat::Int => "int",
            SampleFormat::Float => "float",
        }
    );

    let step = spec.channels as usize;
    let samples: Vec<f32> = match spec.sample_format {
        SampleFormat::Float => reader
            .samples::<f32>()
            .step_by(step)
            .collect::<Result<_, _>>()
            .context("malformed WAV sample data")?,
        SampleFormat::Int => {
            let scale = 1.0f32 / (1u32 << (spec.bits_per_sample - 1)) as f32;
            reader
                .samples::<i32>()
                .step_by(step)
                .map(|sa| sa.map(|sa| sa as f32 * scale))
                .collect::<Result<_, _>>()
                .context("malformed WAV sample data")?
        }
    };

    if samples.is_empty() {
        bail!("\"{}\" contains no audio samples", path.display());
    }

    Ok((samples, spec.sample_rate))
}

/// Write mono f32 samples as a 16-bit PCM WAV file
pub fn write_wav(path: &Path, samples: &[f32], rate: u32) -> Result<(), anyhow::Error> {
    let spec = WavSpec {
        channels: 1,
        sample_rate: rate,
        bits_per_sample: 16,
        sample_format: SampleFormat::Int,
    };

    let mut writer = WavWriter::create(path, spec)
        .with_context(|| format!("unable to create \"{}\"", path.display()))?;
    for sa in samecodec::samples_to_i16(samples) {
        writer.write_sample(sa)?;
    }
    writer.finalize().context("unable to finish WAV file")?;

    info!(
        "wrote \"{}\": {} samples at {} Hz",
        path.display(),
        samples.len(),
        rate
    );
    Ok(())
}

/// Linear-interpolation resampler
///
/// Quality glue, not a designed filter: adequate for shifting
/// clean SAME audio onto the decoder's rate, where both tones sit
/// far below either Nyquist frequency.
pub fn resample_linear(input: &[f32], from_rate: u32, to_rate: u32) -> Vec<f32> {
    if from_rate == to_rate || input.is_empty() {
        return input.to_vec();
    }

    let ratio = from_rate as f64 / to_rate as f64;
    let out_len = (input.len() as f64 / ratio).floor() as usize;

    (0..out_len)
        .map(|n| {
            let pos = n as f64 * ratio;
            let left = pos as usize;
            let frac = (pos - left as f64) as f32;
            let a = input[left];
            let b = *input.get(left + 1).unwrap_or(&a);
            a + (b - a) * frac
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resample_identity() {
        let input = vec![0.0f32, 0.5, -0.5, 1.0];
        assert_eq!(input, resample_linear(&input, 22050, 22050));
    }

    #[test]
    fn test_resample_halves_length() {
        let input: Vec<f32> = (0..1000).map(|n| n as f32).collect();
        let out = resample_linear(&input, 44100, 22050);
        assert_eq!(500, out.len());
        // a linear ramp survives linear interpolation exactly
        assert_eq!(0.0, out[0]);
        assert_eq!(2.0, out[1]);
        assert_eq!(998.0, out[499]);
    }

    #[test]
    fn test_resample_upsamples() {
        let input = vec![0.0f32, 1.0];
        let out = resample_linear(&input, 11025, 22050);
        assert_eq!(4, out.len());
        assert_eq!(0.5, out[1]);
    }
}

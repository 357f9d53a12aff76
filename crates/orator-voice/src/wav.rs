//! WAV persistence of synthesized audio.

use std::path::Path;

use crate::error::SpeechError;

/// Write mono f32 samples as a 16-bit PCM WAV file.
pub fn write_wav(path: &Path, samples: &[f32], sample_rate: u32) -> Result<(), SpeechError> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let mut writer = hound::WavWriter::create(path, spec).map_err(to_io)?;

    #[allow(clippy::cast_possible_truncation)]
    for &sample in samples {
        let amplitude = (sample.clamp(-1.0, 1.0) * f32::from(i16::MAX)) as i16;
        writer.write_sample(amplitude).map_err(to_io)?;
    }

    writer.finalize().map_err(to_io)?;
    Ok(())
}

/// Collision-safe output file name for a finished request.
#[must_use]
pub fn output_file_name(voice: &str) -> String {
    let tag = uuid::Uuid::new_v4().simple().to_string();
    format!("tts_{voice}_{}.wav", &tag[..8])
}

fn to_io(err: hound::Error) -> SpeechError {
    SpeechError::Io(std::io::Error::other(err))
}

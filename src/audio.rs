use std::path::Path;

use hound::WavReader;

pub fn wav_duration_seconds(path: impl AsRef<Path>) -> anyhow::Result<f64> {
    let reader = WavReader::open(path)?;
    let spec = reader.spec();
    let samples = reader.len();
    let frames = samples as f64 / spec.channels as f64;
    Ok(frames / spec.sample_rate as f64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn measures_one_second_of_mono_audio() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tone.wav");
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate: 22050,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut writer = hound::WavWriter::create(&path, spec).unwrap();
        for _ in 0..22050 {
            writer.write_sample(0i16).unwrap();
        }
        writer.finalize().unwrap();

        let dur = wav_duration_seconds(&path).unwrap();
        assert!((dur - 1.0).abs() < 1e-9);
    }

    #[test]
    fn missing_file_is_an_error() {
        assert!(wav_duration_seconds("/no/such/file.wav").is_err());
    }
}

use log::{debug, warn};
use room_core::Error;
use std::path::{Path, PathBuf};
use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::DecoderOptions;
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;

/// A fully decoded mono clip, looped by the output stream.
#[derive(Debug, Clone, PartialEq)]
pub struct Clip {
    samples: Vec<f32>,
    sample_rate: u32,
}

impl Clip {
    pub fn new(samples: Vec<f32>, sample_rate: u32) -> Result<Self, Error> {
        if samples.is_empty() {
            return Err(Error::Decode("clip has no samples".to_string()));
        }
        if sample_rate == 0 {
            return Err(Error::Decode("clip sample rate is zero".to_string()));
        }
        Ok(Self {
            samples,
            sample_rate,
        })
    }

    /// Decode a whole file, downmixing every channel to mono.
    pub fn decode(path: &Path) -> Result<Self, Error> {
        let file = std::fs::File::open(path)?;
        let mss = MediaSourceStream::new(Box::new(file), Default::default());

        let mut hint = Hint::new();
        if let Some(ext) = path.extension().and_then(|ext| ext.to_str()) {
            hint.with_extension(ext);
        }

        let probed = symphonia::default::get_probe()
            .format(
                &hint,
                mss,
                &FormatOptions::default(),
                &MetadataOptions::default(),
            )
            .map_err(|e| Error::Decode(format!("{}: {}", path.display(), e)))?;

        let mut format = probed.format;
        let track = format
            .default_track()
            .ok_or_else(|| Error::Decode(format!("{}: no default track", path.display())))?;
        let track_id = track.id;
        let sample_rate = track
            .codec_params
            .sample_rate
            .ok_or_else(|| Error::Decode(format!("{}: unknown sample rate", path.display())))?;
        let mut decoder = symphonia::default::get_codecs()
            .make(&track.codec_params, &DecoderOptions::default())
            .map_err(|e| Error::Decode(format!("{}: {}", path.display(), e)))?;

        let mut samples = Vec::new();
        loop {
            let packet = match format.next_packet() {
                Ok(packet) => packet,
                Err(SymphoniaError::IoError(ref e))
                    if e.kind() == std::io::ErrorKind::UnexpectedEof =>
                {
                    break;
                }
                Err(SymphoniaError::ResetRequired) => break,
                Err(e) => return Err(Error::Decode(format!("{}: {}", path.display(), e))),
            };

            if packet.track_id() != track_id {
                continue;
            }

            match decoder.decode(&packet) {
                Ok(decoded) => {
                    let spec = *decoded.spec();
                    let channels = spec.channels.count().max(1);
                    let mut buffer = SampleBuffer::<f32>::new(decoded.capacity() as u64, spec);
                    buffer.copy_interleaved_ref(decoded);
                    samples.extend(
                        buffer
                            .samples()
                            .chunks(channels)
                            .map(|frame| frame.iter().sum::<f32>() / channels as f32),
                    );
                }
                Err(SymphoniaError::DecodeError(e)) => {
                    warn!("Skipping corrupt packet in {}: {}", path.display(), e);
                }
                Err(e) => return Err(Error::Decode(format!("{}: {}", path.display(), e))),
            }
        }

        debug!(
            "Decoded {} ({} samples at {} Hz)",
            path.display(),
            samples.len(),
            sample_rate
        );
        Self::new(samples, sample_rate)
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn duration_secs(&self) -> f64 {
        self.samples.len() as f64 / self.sample_rate as f64
    }

    /// Linearly interpolated sample at fractional `cursor`, wrapping at the end.
    pub(crate) fn sample_at(&self, cursor: f64) -> f32 {
        let len = self.samples.len();
        let index = cursor.floor() as usize % len;
        let next = (index + 1) % len;
        let frac = (cursor - cursor.floor()) as f32;
        self.samples[index] + (self.samples[next] - self.samples[index]) * frac
    }
}

/// Turn a source locator into a local file path.
///
/// Plain paths and `file://` URIs are accepted. Anything with another scheme
/// (remote URLs, browser blob references) cannot be opened by this backend.
pub fn resolve_local_path(src: &str) -> Result<PathBuf, Error> {
    if let Some(path) = src.strip_prefix("file://") {
        return Ok(PathBuf::from(path));
    }
    if src.contains("://") || src.starts_with("blob:") || src.starts_with("data:") {
        return Err(Error::Audio(format!("unsupported source locator: {}", src)));
    }
    if src.is_empty() {
        return Err(Error::Audio("empty source locator".to_string()));
    }
    Ok(PathBuf::from(src))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    /// Minimal 16-bit PCM WAV writer for test fixtures.
    fn write_wav(path: &Path, sample_rate: u32, channels: u16, samples: &[i16]) {
        let data_len = (samples.len() * 2) as u32;
        let byte_rate = sample_rate * channels as u32 * 2;
        let mut bytes = Vec::new();
        bytes.extend_from_slice(b"RIFF");
        bytes.extend_from_slice(&(36 + data_len).to_le_bytes());
        bytes.extend_from_slice(b"WAVE");
        bytes.extend_from_slice(b"fmt ");
        bytes.extend_from_slice(&16u32.to_le_bytes());
        bytes.extend_from_slice(&1u16.to_le_bytes());
        bytes.extend_from_slice(&channels.to_le_bytes());
        bytes.extend_from_slice(&sample_rate.to_le_bytes());
        bytes.extend_from_slice(&byte_rate.to_le_bytes());
        bytes.extend_from_slice(&(channels * 2).to_le_bytes());
        bytes.extend_from_slice(&16u16.to_le_bytes());
        bytes.extend_from_slice(b"data");
        bytes.extend_from_slice(&data_len.to_le_bytes());
        for s in samples {
            bytes.extend_from_slice(&s.to_le_bytes());
        }
        std::fs::File::create(path)
            .unwrap()
            .write_all(&bytes)
            .unwrap();
    }

    #[test_log::test]
    fn decodes_stereo_wav_to_mono() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tone.wav");
        // Four stereo frames: left at half scale, right silent
        let frames: Vec<i16> = (0..4).flat_map(|_| [16384i16, 0]).collect();
        write_wav(&path, 8000, 2, &frames);

        let clip = Clip::decode(&path).unwrap();
        assert_eq!(clip.sample_rate(), 8000);
        assert_eq!(clip.len(), 4);
        for i in 0..4 {
            assert!((clip.sample_at(i as f64) - 0.25).abs() < 1e-3);
        }
    }

    #[test]
    fn missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(Clip::decode(&dir.path().join("nope.wav")).is_err());
    }

    #[test]
    fn sample_at_interpolates_and_wraps() {
        let clip = Clip::new(vec![0.0, 1.0], 10).unwrap();
        assert_eq!(clip.sample_at(0.0), 0.0);
        assert!((clip.sample_at(0.5) - 0.5).abs() < 1e-6);
        // Between the last and first sample
        assert!((clip.sample_at(1.5) - 0.5).abs() < 1e-6);
        assert_eq!(clip.sample_at(2.0), 0.0);
        assert_eq!(clip.duration_secs(), 0.2);
    }

    #[test]
    fn empty_clip_rejected() {
        assert!(Clip::new(Vec::new(), 44100).is_err());
        assert!(Clip::new(vec![0.0], 0).is_err());
    }

    #[test]
    fn resolves_local_locators_only() {
        assert_eq!(
            resolve_local_path("file:///tmp/a.wav").unwrap(),
            PathBuf::from("/tmp/a.wav")
        );
        assert_eq!(
            resolve_local_path("audio/white_noise.wav").unwrap(),
            PathBuf::from("audio/white_noise.wav")
        );
        assert!(resolve_local_path("https://example.com/a.mp3").is_err());
        assert!(resolve_local_path("blob:http://localhost/1234").is_err());
        assert!(resolve_local_path("").is_err());
    }
}

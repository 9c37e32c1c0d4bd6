use crate::clip::{resolve_local_path, Clip};
use crate::device::find_output_device;
use audio::{MuteSwitch, PlaybackBackend, Voice};
use cpal::traits::{DeviceTrait, StreamTrait};
use cpal::{FromSample, Sample, SampleFormat, SizedSample};
use log::{debug, error, info, warn};
use room_core::Error;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{mpsc, Arc, Mutex};

/// A decoded clip being looped by the output stream.
struct Slot {
    key: u64,
    clip: Arc<Clip>,
    /// Fractional read position in clip samples
    cursor: f64,
    /// f32 bits, written by the voice handle
    gain: Arc<AtomicU32>,
}

type SharedSlots = Arc<Mutex<Vec<Slot>>>;

/// Playback backend that mixes every looping voice into one cpal stream.
///
/// The stream lives on a dedicated thread for the life of the backend.
/// Opening a voice returns immediately; decoding happens on a loader thread
/// and the voice becomes audible once its clip is ready. A clip that fails
/// to load is logged and the voice stays silent.
pub struct CpalBackend {
    slots: SharedSlots,
    next_key: u64,
    output_rate: u32,
    /// Dropping this sender stops the stream thread
    _shutdown: mpsc::Sender<()>,
}

impl CpalBackend {
    /// Open the named output device (or the default one) and start the stream.
    pub fn new(device_name: Option<&str>, mute: MuteSwitch) -> Result<Self, Error> {
        let slots: SharedSlots = Arc::new(Mutex::new(Vec::new()));
        let (ready_tx, ready_rx) = mpsc::channel::<Result<u32, Error>>();
        let (shutdown_tx, shutdown_rx) = mpsc::channel::<()>();

        let thread_slots = slots.clone();
        let device_name = device_name.map(str::to_string);
        std::thread::Builder::new()
            .name("echofield-output".to_string())
            .spawn(move || {
                let stream = match start_stream(device_name.as_deref(), thread_slots, mute) {
                    Ok((stream, rate)) => {
                        let _ = ready_tx.send(Ok(rate));
                        stream
                    }
                    Err(e) => {
                        let _ = ready_tx.send(Err(e));
                        return;
                    }
                };
                // Blocks until the backend is dropped
                let _ = shutdown_rx.recv();
                drop(stream);
                debug!("Output stream stopped");
            })?;

        let output_rate = ready_rx
            .recv()
            .map_err(|_| Error::Audio("output thread exited before starting".to_string()))??;
        info!("Audio output running at {} Hz", output_rate);

        Ok(Self {
            slots,
            next_key: 0,
            output_rate,
            _shutdown: shutdown_tx,
        })
    }

    pub fn output_rate(&self) -> u32 {
        self.output_rate
    }
}

impl PlaybackBackend for CpalBackend {
    fn open(&mut self, src: &str) -> Result<Box<dyn Voice>, Error> {
        let path = resolve_local_path(src)?;
        let key = self.next_key;
        self.next_key += 1;

        let gain = Arc::new(AtomicU32::new(0f32.to_bits()));
        let released = Arc::new(AtomicBool::new(false));

        let loader_slots = self.slots.clone();
        let loader_gain = gain.clone();
        let loader_released = released.clone();
        let label = src.to_string();
        std::thread::Builder::new()
            .name(format!("echofield-load-{}", key))
            .spawn(move || match Clip::decode(&path) {
                Ok(clip) => {
                    let Ok(mut slots) = loader_slots.lock() else {
                        return;
                    };
                    if loader_released.load(Ordering::Acquire) {
                        return;
                    }
                    slots.push(Slot {
                        key,
                        clip: Arc::new(clip),
                        cursor: 0.0,
                        gain: loader_gain,
                    });
                    debug!("Voice {} ready ({})", key, label);
                }
                Err(e) => warn!("Could not load {}, voice stays silent: {}", label, e),
            })?;

        Ok(Box::new(CpalVoice {
            key,
            gain,
            released,
            slots: self.slots.clone(),
        }))
    }
}

struct CpalVoice {
    key: u64,
    gain: Arc<AtomicU32>,
    released: Arc<AtomicBool>,
    slots: SharedSlots,
}

impl Voice for CpalVoice {
    fn set_gain(&mut self, gain: f32) {
        self.gain.store(gain.to_bits(), Ordering::Relaxed);
    }
}

impl Drop for CpalVoice {
    fn drop(&mut self) {
        self.released.store(true, Ordering::Release);
        if let Ok(mut slots) = self.slots.lock() {
            slots.retain(|slot| slot.key != self.key);
        }
    }
}

fn start_stream(
    device_name: Option<&str>,
    slots: SharedSlots,
    mute: MuteSwitch,
) -> Result<(cpal::Stream, u32), Error> {
    let device = find_output_device(device_name)?;
    let config = device
        .default_output_config()
        .map_err(|e| Error::Audio(format!("Default output config not supported: {}", e)))?;
    let sample_format = config.sample_format();
    let stream_config: cpal::StreamConfig = config.into();
    let rate = stream_config.sample_rate.0;

    let stream = match sample_format {
        SampleFormat::F32 => build_stream::<f32>(&device, &stream_config, slots, mute),
        SampleFormat::I16 => build_stream::<i16>(&device, &stream_config, slots, mute),
        SampleFormat::U16 => build_stream::<u16>(&device, &stream_config, slots, mute),
        other => {
            return Err(Error::Audio(format!(
                "Unsupported sample format: {:?}",
                other
            )))
        }
    }
    .map_err(|e| Error::Audio(format!("Failed to build output stream: {}", e)))?;

    stream
        .play()
        .map_err(|e| Error::Audio(format!("Failed to start output stream: {}", e)))?;

    Ok((stream, rate))
}

fn build_stream<T>(
    device: &cpal::Device,
    config: &cpal::StreamConfig,
    slots: SharedSlots,
    mute: MuteSwitch,
) -> Result<cpal::Stream, cpal::BuildStreamError>
where
    T: SizedSample + FromSample<f32>,
{
    let channels = config.channels.max(1) as usize;
    let output_rate = config.sample_rate.0 as f64;

    device.build_output_stream(
        config,
        move |data: &mut [T], _: &cpal::OutputCallbackInfo| {
            let muted = mute.is_muted();
            // Never wait on the audio thread; a contended tick plays silence
            let mut guard = slots.try_lock().ok();
            for frame in data.chunks_mut(channels) {
                let value = match guard.as_mut() {
                    Some(slots) => mix_frame(slots, output_rate, muted),
                    None => 0.0,
                };
                let sample = <T as Sample>::from_sample(value);
                for out in frame.iter_mut() {
                    *out = sample;
                }
            }
        },
        |err| error!("Output stream error: {}", err),
        None,
    )
}

/// Produce one mono output sample and advance every voice.
///
/// Voices keep advancing while muted so unmuting resumes mid-loop.
fn mix_frame(slots: &mut [Slot], output_rate: f64, muted: bool) -> f32 {
    let mut sum = 0.0;
    for slot in slots.iter_mut() {
        let gain = f32::from_bits(slot.gain.load(Ordering::Relaxed));
        sum += slot.clip.sample_at(slot.cursor) * gain;
        let step = slot.clip.sample_rate() as f64 / output_rate;
        slot.cursor = (slot.cursor + step) % slot.clip.len() as f64;
    }
    if muted {
        0.0
    } else {
        sum.clamp(-1.0, 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn slot(key: u64, samples: Vec<f32>, rate: u32, gain: f32) -> Slot {
        Slot {
            key,
            clip: Arc::new(Clip::new(samples, rate).unwrap()),
            cursor: 0.0,
            gain: Arc::new(AtomicU32::new(gain.to_bits())),
        }
    }

    #[test]
    fn mixes_with_gain_and_loops() {
        let mut slots = vec![
            slot(0, vec![0.5, -0.5], 100, 1.0),
            slot(1, vec![0.2, 0.2], 100, 0.5),
        ];

        assert!((mix_frame(&mut slots, 100.0, false) - 0.6).abs() < 1e-6);
        assert!((mix_frame(&mut slots, 100.0, false) - (-0.4)).abs() < 1e-6);
        // Wrapped back to the first sample
        assert!((mix_frame(&mut slots, 100.0, false) - 0.6).abs() < 1e-6);
    }

    #[test]
    fn muted_output_is_silent_but_advances() {
        let mut slots = vec![slot(0, vec![0.5, -0.5, 0.25], 100, 1.0)];
        assert_eq!(mix_frame(&mut slots, 100.0, true), 0.0);
        assert_eq!(slots[0].cursor, 1.0);
        assert!((mix_frame(&mut slots, 100.0, false) - (-0.5)).abs() < 1e-6);
    }

    #[test]
    fn output_is_clamped() {
        let mut slots = vec![
            slot(0, vec![0.9], 100, 1.0),
            slot(1, vec![0.9], 100, 1.0),
        ];
        assert_eq!(mix_frame(&mut slots, 100.0, false), 1.0);
    }

    #[test]
    fn resamples_by_rate_ratio() {
        let mut slots = vec![slot(0, vec![0.0, 1.0, 0.0, 1.0], 200, 1.0)];
        mix_frame(&mut slots, 100.0, false);
        assert_eq!(slots[0].cursor, 2.0);
    }

    #[test]
    fn dropping_voice_removes_its_slot() {
        let slots: SharedSlots = Arc::new(Mutex::new(vec![slot(7, vec![0.1], 100, 1.0)]));
        let voice = CpalVoice {
            key: 7,
            gain: Arc::new(AtomicU32::new(0)),
            released: Arc::new(AtomicBool::new(false)),
            slots: slots.clone(),
        };
        let released = voice.released.clone();
        drop(voice);

        assert!(released.load(Ordering::Acquire));
        assert!(slots.lock().unwrap().is_empty());
    }

    #[test]
    fn voice_gain_is_shared_with_slot() {
        let gain = Arc::new(AtomicU32::new(0));
        let mut voice = CpalVoice {
            key: 1,
            gain: gain.clone(),
            released: Arc::new(AtomicBool::new(false)),
            slots: Arc::new(Mutex::new(Vec::new())),
        };
        voice.set_gain(0.75);
        assert_eq!(f32::from_bits(gain.load(Ordering::Relaxed)), 0.75);
    }
}

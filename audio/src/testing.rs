//! Backend that records what the registry asks of it.

use crate::{PlaybackBackend, Voice};
use room_core::Error;
use std::sync::{Arc, Mutex};

#[derive(Debug, Default)]
pub struct Recorded {
    /// Every `src` passed to `open`, in call order
    pub opened: Vec<String>,
    /// Gain history per opened voice, indexed like `opened`
    pub gains: Vec<Vec<f32>>,
    /// Indices of voices that have been dropped
    pub dropped: Vec<usize>,
}

#[derive(Clone, Default)]
pub struct RecordingBackend {
    pub log: Arc<Mutex<Recorded>>,
}

impl RecordingBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn opened(&self) -> Vec<String> {
        self.log.lock().unwrap().opened.clone()
    }

    pub fn last_gain(&self, voice: usize) -> Option<f32> {
        self.log.lock().unwrap().gains[voice].last().copied()
    }

    pub fn dropped(&self) -> Vec<usize> {
        self.log.lock().unwrap().dropped.clone()
    }
}

struct RecordingVoice {
    index: usize,
    log: Arc<Mutex<Recorded>>,
}

impl Voice for RecordingVoice {
    fn set_gain(&mut self, gain: f32) {
        self.log.lock().unwrap().gains[self.index].push(gain);
    }
}

impl Drop for RecordingVoice {
    fn drop(&mut self) {
        self.log.lock().unwrap().dropped.push(self.index);
    }
}

impl PlaybackBackend for RecordingBackend {
    fn open(&mut self, src: &str) -> Result<Box<dyn Voice>, Error> {
        let mut log = self.log.lock().unwrap();
        let index = log.opened.len();
        log.opened.push(src.to_string());
        log.gains.push(Vec::new());
        Ok(Box::new(RecordingVoice {
            index,
            log: self.log.clone(),
        }))
    }
}

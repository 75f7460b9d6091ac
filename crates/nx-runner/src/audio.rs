//! Audio output through cpal.
//!
//! Submitted PCM blocks are converted to f32 and pushed into a ring buffer
//! that the cpal callback drains. The callback also counts every sample it
//! hands to the device, which is what `samples_played` reports.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{SampleRate, Stream, StreamConfig};
use nx_port::audio::{CHANNELS, SAMPLE_RATE, SUBMIT_SAMPLES};
use nx_port::host::{AudioOut, AudioOutBuffer, HostError, ReleasedBuffer};
use ringbuf::{
    HeapRb,
    traits::{Consumer, Producer, Split},
};
use tracing::{debug, error};

/// Room for two submitted blocks.
const RING_CAPACITY: usize = SUBMIT_SAMPLES * 2;

/// Decode 16-bit little-endian PCM into f32 samples in [-1, 1).
pub fn pcm_to_f32(data: &[u8]) -> impl Iterator<Item = f32> + '_ {
    data.chunks_exact(2)
        .map(|pair| f32::from(i16::from_le_bytes([pair[0], pair[1]])) / 32_768.0)
}

#[derive(Default)]
pub struct CpalAudioOut {
    stream: Option<Stream>,
    producer: Option<ringbuf::HeapProd<f32>>,
    played: Arc<AtomicU64>,
    blocks: u64,
}

impl CpalAudioOut {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl AudioOut for CpalAudioOut {
    fn initialize(&mut self) -> Result<(), HostError> {
        let host = cpal::default_host();
        let device = host
            .default_output_device()
            .ok_or_else(|| HostError::new("no audio output device"))?;

        let config = StreamConfig {
            channels: CHANNELS,
            sample_rate: SampleRate(SAMPLE_RATE),
            buffer_size: cpal::BufferSize::Default,
        };

        let ring = HeapRb::<f32>::new(RING_CAPACITY);
        let (producer, mut consumer) = ring.split();
        let played = Arc::clone(&self.played);

        let stream = device
            .build_output_stream(
                &config,
                move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                    for sample in data.iter_mut() {
                        // Silence on underrun.
                        *sample = consumer.try_pop().unwrap_or(0.0);
                    }
                    played.fetch_add(data.len() as u64, Ordering::Relaxed);
                },
                |err| error!("audio stream error: {err}"),
                None,
            )
            .map_err(|e| HostError::new(e.to_string()))?;

        debug!(device = ?device.name().ok(), "audio device opened");
        self.stream = Some(stream);
        self.producer = Some(producer);
        Ok(())
    }

    fn start(&mut self) -> Result<(), HostError> {
        let stream = self
            .stream
            .as_ref()
            .ok_or_else(|| HostError::new("start before initialize"))?;
        stream.play().map_err(|e| HostError::new(e.to_string()))
    }

    /// Blocks until the ring has room, like the console's queue.
    fn play_buffer(&mut self, buffer: &AudioOutBuffer<'_>) -> Option<ReleasedBuffer> {
        let producer = self.producer.as_mut()?;
        for sample in pcm_to_f32(buffer.data) {
            while producer.try_push(sample).is_err() {
                std::thread::yield_now();
            }
        }
        self.blocks += 1;
        (self.blocks > 1).then(|| ReleasedBuffer {
            id: self.blocks - 2,
        })
    }

    fn samples_played(&self) -> Option<u64> {
        self.stream
            .as_ref()
            .map(|_| self.played.load(Ordering::Relaxed))
    }

    fn stop(&mut self) {
        if let Some(stream) = self.stream.take() {
            if let Err(e) = stream.pause() {
                error!("audio pause failed: {e}");
            }
        }
        self.producer = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pcm_decodes_little_endian() {
        let bytes = [0x00, 0x40, 0x00, 0xC0, 0xFF, 0x7F];
        let samples: Vec<f32> = pcm_to_f32(&bytes).collect();
        assert_eq!(samples.len(), 3);
        assert!((samples[0] - 0.5).abs() < 1e-6);
        assert!((samples[1] + 0.5).abs() < 1e-6);
        assert!(samples[2] < 1.0);
    }

    #[test]
    fn odd_trailing_byte_is_dropped() {
        assert_eq!(pcm_to_f32(&[1, 2, 3]).count(), 1);
    }

    #[test]
    fn unopened_output_reports_nothing() {
        let mut out = CpalAudioOut::new();
        assert_eq!(out.samples_played(), None);
        assert!(out.start().is_err());
        assert!(out.play_buffer(&AudioOutBuffer { data: &[0; 4] }).is_none());
        out.stop();
    }
}

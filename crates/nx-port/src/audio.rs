//! PCM ring submission.
//!
//! The engine mixes 16-bit mono samples at 48 kHz into a 16 KiB ring,
//! indexing it by the playback cursor this module reports. On the host loop's
//! cadence the submitter copies one fifth of a second of audio out of the ring
//! and hands it to the hardware output queue.

use thiserror::Error;
use tracing::{debug, trace, warn};

use crate::host::{AudioOut, AudioOutBuffer, HostError, TickSource};
use crate::sys::{SysError, try_alloc};
use crate::timing::{Ticks, ticks_to_samples};

/// Output sample rate in Hz.
pub const SAMPLE_RATE: u32 = 48_000;

/// Bits per sample.
pub const SAMPLE_BITS: u16 = 16;

/// Mono output.
pub const CHANNELS: u16 = 1;

/// Size of the PCM ring in bytes.
pub const RING_BYTES: usize = 16 * 1024;

/// Bytes per (mono) sample.
pub const BYTES_PER_SAMPLE: usize = SAMPLE_BITS as usize / 8;

/// Samples the ring holds.
pub const RING_SAMPLES: usize = RING_BYTES / BYTES_PER_SAMPLE;

/// Samples in one submitted block: a fifth of a second.
pub const SUBMIT_SAMPLES: usize = SAMPLE_RATE as usize / 5;

/// Bytes in one submitted block.
pub const SUBMIT_BYTES: usize = SUBMIT_SAMPLES * BYTES_PER_SAMPLE;

/// Description of the ring shared with the engine's mixer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DmaInfo {
    pub channels: u16,
    pub sample_bits: u16,
    pub speed: u32,
    /// Ring length in samples.
    pub samples: usize,
    /// Mixer granularity in samples.
    pub submission_chunk: usize,
    /// Last reported playback cursor, in samples since start.
    pub sample_pos: u64,
}

impl Default for DmaInfo {
    fn default() -> Self {
        Self {
            channels: CHANNELS,
            sample_bits: SAMPLE_BITS,
            speed: SAMPLE_RATE,
            samples: RING_SAMPLES,
            submission_chunk: 1,
            sample_pos: 0,
        }
    }
}

#[derive(Debug, Error)]
pub enum AudioError {
    #[error(transparent)]
    Alloc(#[from] SysError),

    #[error("audio output failed: {0}")]
    Host(#[from] HostError),

    #[error("audio stream is not running")]
    NotRunning,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StreamState {
    Uninitialized,
    Running { baseline: Ticks },
    Stopped,
}

/// Outcome of one [`AudioSubmitter::submit`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubmitReport {
    /// Bytes handed to the hardware queue.
    pub bytes: usize,
    /// Whether the engine wrote to the ring since the previous submission.
    pub fresh: bool,
}

/// Engine-facing view of the ring for one frame.
///
/// Any mutable access marks the ring fresh for the next submission.
pub struct PcmRing<'a> {
    bytes: &'a mut [u8],
    fresh: &'a mut bool,
    dma: DmaInfo,
}

impl PcmRing<'_> {
    #[must_use]
    pub fn dma(&self) -> &DmaInfo {
        &self.dma
    }

    #[must_use]
    pub fn bytes(&self) -> &[u8] {
        self.bytes
    }

    pub fn bytes_mut(&mut self) -> &mut [u8] {
        *self.fresh = true;
        self.bytes
    }

    /// Write `samples` starting at absolute sample index `start`, wrapping
    /// around the ring.
    pub fn write_samples(&mut self, start: u64, samples: &[i16]) {
        *self.fresh = true;
        let ring_samples = self.bytes.len() / BYTES_PER_SAMPLE;
        if ring_samples == 0 {
            return;
        }
        let mut index = (start % ring_samples as u64) as usize;
        for sample in samples {
            let offset = index * BYTES_PER_SAMPLE;
            self.bytes[offset..offset + BYTES_PER_SAMPLE].copy_from_slice(&sample.to_le_bytes());
            index = (index + 1) % ring_samples;
        }
    }
}

pub struct AudioSubmitter<A: AudioOut> {
    out: A,
    ring: Vec<u8>,
    block: Vec<u8>,
    dma: DmaInfo,
    state: StreamState,
    fresh: bool,
    blocks_submitted: u64,
}

impl<A: AudioOut> AudioSubmitter<A> {
    /// Wrap a host output queue. Nothing is allocated until `initialize`.
    pub fn new(out: A) -> Self {
        Self {
            out,
            ring: Vec::new(),
            block: Vec::new(),
            dma: DmaInfo::default(),
            state: StreamState::Uninitialized,
            fresh: false,
            blocks_submitted: 0,
        }
    }

    /// Allocate the ring, start the hardware stream and record the tick
    /// baseline for the playback cursor.
    ///
    /// On failure the submitter stays uninitialized: position queries return
    /// zero and `submit` is refused.
    pub fn initialize<T: TickSource>(&mut self, ticks: &T) -> Result<(), AudioError> {
        self.state = StreamState::Uninitialized;

        self.ring = try_alloc(RING_BYTES, "pcm ring")?;
        self.block = try_alloc(SUBMIT_BYTES, "pcm submit block")?;
        self.dma = DmaInfo::default();
        self.fresh = false;

        self.out.initialize()?;
        self.out.start()?;

        let baseline = ticks.system_tick();
        self.state = StreamState::Running { baseline };
        debug!(
            sample_rate = SAMPLE_RATE,
            ring_bytes = RING_BYTES,
            baseline = baseline.get(),
            "audio initialized"
        );
        Ok(())
    }

    #[must_use]
    pub fn is_running(&self) -> bool {
        matches!(self.state, StreamState::Running { .. })
    }

    /// Current playback cursor in samples since the stream started.
    ///
    /// Uses the hardware's consumed-sample counter when the host reports
    /// one; otherwise estimates from ticks elapsed since `initialize`.
    /// Returns 0 unless the stream is running.
    pub fn playback_position<T: TickSource>(&mut self, ticks: &T) -> u64 {
        let StreamState::Running { baseline } = self.state else {
            return 0;
        };
        let position = self.out.samples_played().unwrap_or_else(|| {
            ticks_to_samples(ticks.system_tick().since(baseline), SAMPLE_RATE)
        });
        self.dma.sample_pos = position;
        position
    }

    /// Engine access to the ring for this frame, with the cursor refreshed.
    pub fn pcm_ring<T: TickSource>(&mut self, ticks: &T) -> Option<PcmRing<'_>> {
        if !self.is_running() {
            return None;
        }
        self.playback_position(ticks);
        Some(PcmRing {
            bytes: &mut self.ring,
            fresh: &mut self.fresh,
            dma: self.dma,
        })
    }

    /// Hand one block of [`SUBMIT_BYTES`] to the hardware queue.
    ///
    /// The block always starts at the head of the ring and wraps back to it
    /// once the ring is exhausted. The ring is sent whether or not the engine
    /// refreshed it; the report says which.
    pub fn submit(&mut self) -> Result<SubmitReport, AudioError> {
        if !self.is_running() {
            return Err(AudioError::NotRunning);
        }

        for chunk in self.block.chunks_mut(self.ring.len()) {
            chunk.copy_from_slice(&self.ring[..chunk.len()]);
        }

        let fresh = std::mem::replace(&mut self.fresh, false);
        if !fresh {
            debug!(block = self.blocks_submitted, "submitting stale pcm ring");
        }

        // The released block is recycled by the host; nothing to do with it.
        let _released = self.out.play_buffer(&AudioOutBuffer { data: &self.block });
        self.blocks_submitted += 1;
        trace!(block = self.blocks_submitted, bytes = SUBMIT_BYTES, fresh, "submitted");

        Ok(SubmitReport {
            bytes: SUBMIT_BYTES,
            fresh,
        })
    }

    /// Stop the hardware stream. The tick baseline is discarded, so position
    /// queries return 0 afterwards.
    pub fn shutdown(&mut self) {
        if self.is_running() {
            self.out.stop();
            self.state = StreamState::Stopped;
            debug!(blocks = self.blocks_submitted, "audio shut down");
        } else if self.state == StreamState::Uninitialized {
            warn!("audio shutdown before a successful initialize");
        }
    }

    #[must_use]
    pub fn dma(&self) -> &DmaInfo {
        &self.dma
    }

    #[must_use]
    pub fn blocks_submitted(&self) -> u64 {
        self.blocks_submitted
    }

    /// The wrapped host output queue.
    #[must_use]
    pub fn output(&self) -> &A {
        &self.out
    }

    pub fn output_mut(&mut self) -> &mut A {
        &mut self.out
    }
}

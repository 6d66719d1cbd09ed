//! Fixed-format PCM frame stream for keyword detection
//!
//! The cpal callback slices incoming audio into frames of exactly
//! `frame_length` 16-bit samples and hands them to the reader over a
//! bounded channel. When the reader falls behind, frames are dropped
//! rather than blocking the audio thread.

use std::time::Duration;

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::Stream;
use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, TrySendError, bounded};

use super::capture::{f32_to_i16, mono_input_config};
use crate::{Error, Result};

/// Frames buffered between the audio callback and the reader (~2s at 16kHz/512)
const FRAME_QUEUE: usize = 64;

/// A read that sees no audio for this long is treated as a dead device
const READ_TIMEOUT: Duration = Duration::from_secs(3);

/// Blocking source of fixed-length PCM frames
pub trait AudioInput {
    /// Block until the next frame is available
    ///
    /// # Errors
    ///
    /// Returns [`Error::StreamFailure`] if the device stops delivering audio
    fn read_frame(&mut self) -> Result<Vec<i16>>;

    /// Drop frames that queued up while nobody was reading
    fn discard_pending(&mut self) {}
}

type FrameResult = std::result::Result<Vec<i16>, String>;

/// Live microphone stream producing mono i16 frames
pub struct MicrophoneStream {
    // Held for its Drop: releasing the stream closes the device
    _stream: Stream,
    frames: Receiver<FrameResult>,
    frame_length: usize,
}

impl MicrophoneStream {
    /// Open the default input device at `sample_rate`, framing by `frame_length`
    ///
    /// # Errors
    ///
    /// Returns [`Error::StreamFailure`] if the device or format is unavailable
    pub fn open(sample_rate: u32, frame_length: usize) -> Result<Self> {
        if frame_length == 0 {
            return Err(Error::StreamFailure("frame length must be non-zero".to_string()));
        }

        let device = cpal::default_host()
            .default_input_device()
            .ok_or_else(|| Error::StreamFailure("no input device available".to_string()))?;

        let config = mono_input_config(&device, sample_rate)
            .map_err(|e| Error::StreamFailure(e.to_string()))?;

        let (tx, rx) = bounded::<FrameResult>(FRAME_QUEUE);
        let err_tx = tx.clone();
        let mut framer = Framer::new(frame_length, tx);

        let stream = device
            .build_input_stream(
                &config,
                move |data: &[f32], _: &cpal::InputCallbackInfo| framer.push(data),
                move |err| {
                    tracing::error!(error = %err, "microphone stream error");
                    let _ = err_tx.try_send(Err(err.to_string()));
                },
                None,
            )
            .map_err(|e| Error::StreamFailure(e.to_string()))?;

        stream
            .play()
            .map_err(|e| Error::StreamFailure(e.to_string()))?;

        tracing::debug!(
            device = device.name().unwrap_or_default(),
            sample_rate,
            frame_length,
            "microphone stream opened"
        );

        Ok(Self {
            _stream: stream,
            frames: rx,
            frame_length,
        })
    }

    /// Samples per frame
    #[must_use]
    pub const fn frame_length(&self) -> usize {
        self.frame_length
    }
}

impl AudioInput for MicrophoneStream {
    fn read_frame(&mut self) -> Result<Vec<i16>> {
        match self.frames.recv_timeout(READ_TIMEOUT) {
            Ok(Ok(frame)) => Ok(frame),
            Ok(Err(e)) => Err(Error::StreamFailure(e)),
            Err(RecvTimeoutError::Timeout) => Err(Error::StreamFailure(format!(
                "no audio received for {}s",
                READ_TIMEOUT.as_secs()
            ))),
            Err(RecvTimeoutError::Disconnected) => {
                Err(Error::StreamFailure("audio stream closed".to_string()))
            }
        }
    }

    fn discard_pending(&mut self) {
        let dropped = self.frames.try_iter().filter(std::result::Result::is_ok).count();
        if dropped > 0 {
            tracing::trace!(dropped, "discarded stale frames");
        }
    }
}

impl Drop for MicrophoneStream {
    fn drop(&mut self) {
        tracing::debug!("microphone stream released");
    }
}

/// Accumulates float samples into fixed-size PCM frames
struct Framer {
    frame_length: usize,
    pending: Vec<i16>,
    out: Sender<FrameResult>,
}

impl Framer {
    fn new(frame_length: usize, out: Sender<FrameResult>) -> Self {
        Self {
            frame_length,
            pending: Vec::with_capacity(frame_length),
            out,
        }
    }

    fn push(&mut self, data: &[f32]) {
        for &sample in data {
            self.pending.push(f32_to_i16(sample));
            if self.pending.len() == self.frame_length {
                let frame =
                    std::mem::replace(&mut self.pending, Vec::with_capacity(self.frame_length));
                match self.out.try_send(Ok(frame)) {
                    Ok(()) | Err(TrySendError::Disconnected(_)) => {}
                    Err(TrySendError::Full(_)) => {
                        tracing::trace!("frame queue full, dropping frame");
                    }
                }
            }
        }
    }
}

//! Gap-free playback scheduling for streamed PCM.
//!
//! Chunks arrive asynchronously and must be heard back-to-back. All
//! scheduling funnels through one `next_start` value: each chunk is
//! scheduled at `max(next_start, now)` and `next_start` advances by
//! the chunk's duration, so start times are non-decreasing and never
//! overlap regardless of arrival timing.

/// Where scheduled samples go: an audio output device in production, a
/// recording stub in tests.
pub trait AudioSink: Send {
    /// Schedule `samples` (mono, [-1, 1)) to start at `start` seconds
    /// on the sink's clock.
    fn play(&mut self, samples: Vec<f32>, start: f64);

    /// Release the underlying output resource.
    fn close(&mut self);
}

/// Monotonic clock of the output device, in seconds.
pub trait Clock: Send {
    fn now(&self) -> f64;
}

/// Default output sample rate (Hz) for provider voice responses.
pub const DEFAULT_OUTPUT_RATE: u32 = 24_000;

/// Playback queue for raw PCM16 mono chunks.
pub struct PcmPlayback {
    sink: Box<dyn AudioSink>,
    clock: Box<dyn Clock>,
    sample_rate: u32,
    next_start: f64,
    /// Maximum seconds the schedule may run ahead of the clock.
    /// `None` means unbounded; with a bound set, chunks arriving past
    /// it are dropped.
    max_lead: Option<f64>,
}

impl PcmPlayback {
    pub fn new(sink: Box<dyn AudioSink>, clock: Box<dyn Clock>, sample_rate: u32) -> Self {
        Self {
            sink,
            clock,
            sample_rate,
            next_start: 0.0,
            max_lead: None,
        }
    }

    /// Bound the queue depth in seconds of scheduled-ahead audio.
    pub fn with_max_lead(mut self, seconds: f64) -> Self {
        self.max_lead = Some(seconds);
        self
    }

    /// Interpret `bytes` as signed 16-bit little-endian mono samples
    /// and schedule them after everything already queued. Returns true
    /// when the chunk was scheduled, false when it was dropped by the
    /// lead bound. A trailing odd byte is ignored.
    pub fn play_pcm(&mut self, bytes: &[u8]) -> bool {
        let now = self.clock.now();
        if self.next_start < now {
            self.next_start = now;
        }
        if let Some(max_lead) = self.max_lead {
            if self.next_start - now > max_lead {
                tracing::warn!(
                    lead = self.next_start - now,
                    "playback queue over lead bound, dropping chunk"
                );
                return false;
            }
        }

        let samples: Vec<f32> = bytes
            .chunks_exact(2)
            .map(|pair| f32::from(i16::from_le_bytes([pair[0], pair[1]])) / 32_768.0)
            .collect();
        let duration = samples.len() as f64 / f64::from(self.sample_rate);

        self.sink.play(samples, self.next_start);
        self.next_start += duration;
        true
    }

    /// Release the output resource. Callers must stop calling
    /// [`Self::play_pcm`] afterwards.
    pub fn close(&mut self) {
        self.sink.close();
    }
}

/// Convert floating-point capture samples to signed 16-bit little
/// endian, clamped to the representable range. The microphone side of
/// the voice session.
pub fn pcm16_from_f32(samples: &[f32]) -> Vec<u8> {
    let mut out = Vec::with_capacity(samples.len() * 2);
    for &s in samples {
        let scaled = (f64::from(s) * 32_768.0).clamp(-32_768.0, 32_767.0) as i16;
        out.extend_from_slice(&scaled.to_le_bytes());
    }
    out
}

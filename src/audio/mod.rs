//! Audio plumbing for the realtime voice session: a self-contained
//! base64 codec for shipping raw PCM frames over a text transport, and
//! a gap-free playback scheduler for the return path.

pub mod base64;
pub mod playback;

pub use playback::{pcm16_from_f32, AudioSink, Clock, PcmPlayback};

//! Speed-reading playback
//!
//! A session pairs one reader with one book's word sequence and paces
//! words (or phrases) onto a frame stream at the configured speed. The
//! pure state machine lives in [`engine`]; [`session`] wraps it in an
//! actor task that owns the tick timer; [`registry`] tracks the live
//! sessions; [`sink`] is where positions get persisted.

pub mod engine;
pub mod registry;
pub mod session;
pub mod sink;
pub mod types;

pub use engine::PlaybackEngine;
pub use registry::SessionRegistry;
pub use session::{SessionEvent, SessionHandle};
pub use sink::{DbProgressSink, ProgressSink};
pub use types::{
    ControlCommand, PlaybackConfig, PlaybackError, PlaybackFrame, PlaybackMode, PlaybackSnapshot,
    PlaybackStatus, DEFAULT_PHRASE_SIZE, DEFAULT_WPM, MAX_WPM, MIN_WPM,
};

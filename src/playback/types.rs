//! Playback types for the speed-reading protocol

use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ============================================================================
// Constants
// ============================================================================

/// Slowest allowed reading speed
pub const MIN_WPM: u32 = 100;

/// Fastest allowed reading speed
pub const MAX_WPM: u32 = 1000;

/// Reading speed for sessions that do not ask for one
pub const DEFAULT_WPM: u32 = 300;

/// Phrase length for sessions that do not ask for one
pub const DEFAULT_PHRASE_SIZE: usize = 3;

/// Milliseconds in a minute, the basis of tick scheduling
pub const MS_PER_MINUTE: u64 = 60_000;

// ============================================================================
// Configuration
// ============================================================================

/// What playback emits per tick
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlaybackMode {
    /// One word per tick
    Single,
    /// A run of words per tick
    Phrase,
}

/// Pacing configuration for one session
///
/// Setters clamp rather than reject, so a stored or requested value
/// outside the supported range degrades to the nearest legal one.
/// Changes apply from the next tick onward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaybackConfig {
    /// Reading speed in words per minute, always within [MIN_WPM, MAX_WPM]
    pub words_per_minute: u32,

    /// Words per phrase in phrase mode, always at least 1
    pub phrase_size: usize,

    /// Current display mode
    pub mode: PlaybackMode,
}

impl PlaybackConfig {
    pub fn new(words_per_minute: u32, phrase_size: usize, mode: PlaybackMode) -> Self {
        Self {
            words_per_minute: words_per_minute.clamp(MIN_WPM, MAX_WPM),
            phrase_size: phrase_size.max(1),
            mode,
        }
    }

    pub fn set_speed(&mut self, words_per_minute: u32) {
        self.words_per_minute = words_per_minute.clamp(MIN_WPM, MAX_WPM);
    }

    pub fn set_phrase_size(&mut self, phrase_size: usize) {
        self.phrase_size = phrase_size.max(1);
    }

    pub fn set_mode(&mut self, mode: PlaybackMode) {
        self.mode = mode;
    }
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            words_per_minute: DEFAULT_WPM,
            phrase_size: DEFAULT_PHRASE_SIZE,
            mode: PlaybackMode::Single,
        }
    }
}

// ============================================================================
// Session State
// ============================================================================

/// Lifecycle of a playback session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlaybackStatus {
    /// Created but never started
    Idle,
    /// Ticking and emitting display units
    Running,
    /// Suspended; position retained
    Paused,
    /// Cursor reached the end of the book
    Completed,
}

/// One emitted display unit
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaybackFrame {
    /// The word or phrase to show
    pub display_unit: String,

    /// Cursor after this frame was consumed
    pub cursor: usize,

    /// Session state after this frame
    pub state: PlaybackStatus,
}

/// Full view of a session, returned by control and snapshot calls
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaybackSnapshot {
    pub session_id: Uuid,

    pub book_id: String,

    pub state: PlaybackStatus,

    /// Index of the next word to be shown
    pub cursor: usize,

    /// Token count of the whole book
    pub word_count: usize,

    pub config: PlaybackConfig,
}

// ============================================================================
// Control Commands
// ============================================================================

/// Commands accepted by a live session
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ControlCommand {
    /// Begin ticking, optionally from an explicit position
    Start {
        #[serde(default)]
        position: Option<i64>,
    },

    /// Suspend ticking; the current position is persisted
    Pause,

    /// Continue from where the session paused
    Resume,

    /// Jump to a position; clamped to the book length
    Seek { position: i64 },

    /// Change reading speed; clamped to [MIN_WPM, MAX_WPM]
    #[serde(rename_all = "camelCase")]
    SetSpeed { words_per_minute: u32 },

    /// Change phrase length; floored at 1
    #[serde(rename_all = "camelCase")]
    SetPhraseSize { phrase_size: usize },

    /// Switch between single-word and phrase display
    SetMode { mode: PlaybackMode },
}

// ============================================================================
// Error Types
// ============================================================================

/// Playback error types
#[derive(Debug, thiserror::Error)]
pub enum PlaybackError {
    #[error("Playback session not found: {0}")]
    SessionNotFound(Uuid),

    #[error("Invalid position: {0}")]
    InvalidPosition(i64),

    #[error("Book has no readable text")]
    EmptyBook,

    #[error("Session was already started")]
    AlreadyStarted,

    #[error("Playback session is closed")]
    SessionClosed,
}

impl PlaybackError {
    /// Get HTTP status code for this error
    pub fn status_code(&self) -> axum::http::StatusCode {
        use axum::http::StatusCode;
        match self {
            Self::SessionNotFound(_) => StatusCode::NOT_FOUND,
            Self::InvalidPosition(_) => StatusCode::BAD_REQUEST,
            Self::EmptyBook => StatusCode::BAD_REQUEST,
            Self::AlreadyStarted => StatusCode::CONFLICT,
            Self::SessionClosed => StatusCode::GONE,
        }
    }

    /// Stable machine-readable tag for error responses
    pub fn error_type(&self) -> &'static str {
        match self {
            Self::SessionNotFound(_) => "not_found",
            Self::InvalidPosition(_) => "invalid_position",
            Self::EmptyBook => "invalid_position",
            Self::AlreadyStarted => "already_started",
            Self::SessionClosed => "session_closed",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_clamps_speed() {
        let mut config = PlaybackConfig::default();
        config.set_speed(1500);
        assert_eq!(config.words_per_minute, 1000);
        config.set_speed(50);
        assert_eq!(config.words_per_minute, 100);
        config.set_speed(450);
        assert_eq!(config.words_per_minute, 450);
    }

    #[test]
    fn test_config_floors_phrase_size() {
        let mut config = PlaybackConfig::default();
        config.set_phrase_size(0);
        assert_eq!(config.phrase_size, 1);
        config.set_phrase_size(8);
        assert_eq!(config.phrase_size, 8);
    }

    #[test]
    fn test_new_clamps_out_of_range_values() {
        let config = PlaybackConfig::new(2000, 0, PlaybackMode::Phrase);
        assert_eq!(config.words_per_minute, MAX_WPM);
        assert_eq!(config.phrase_size, 1);
    }

    #[test]
    fn test_control_command_wire_format() {
        let cmd: ControlCommand =
            serde_json::from_str(r#"{"type":"setSpeed","wordsPerMinute":600}"#).unwrap();
        assert_eq!(cmd, ControlCommand::SetSpeed { words_per_minute: 600 });

        let cmd: ControlCommand = serde_json::from_str(r#"{"type":"start"}"#).unwrap();
        assert_eq!(cmd, ControlCommand::Start { position: None });

        let cmd: ControlCommand =
            serde_json::from_str(r#"{"type":"seek","position":42}"#).unwrap();
        assert_eq!(cmd, ControlCommand::Seek { position: 42 });

        let cmd: ControlCommand =
            serde_json::from_str(r#"{"type":"setMode","mode":"phrase"}"#).unwrap();
        assert_eq!(
            cmd,
            ControlCommand::SetMode {
                mode: PlaybackMode::Phrase
            }
        );
    }

    #[test]
    fn test_frame_serializes_camel_case() {
        let frame = PlaybackFrame {
            display_unit: "The quick".to_string(),
            cursor: 2,
            state: PlaybackStatus::Running,
        };
        let json = serde_json::to_value(&frame).unwrap();
        assert_eq!(json["displayUnit"], "The quick");
        assert_eq!(json["cursor"], 2);
        assert_eq!(json["state"], "running");
    }
}

//! Playback state machine
//!
//! Pure, synchronous core of a reading session. The engine owns the
//! cursor and lifecycle state and computes what each tick displays and
//! how long it stays on screen; the session task around it owns timers
//! and channels. Keeping the engine free of I/O makes the pacing rules
//! directly testable.

use std::sync::Arc;
use std::time::Duration;

use crate::ingest::WordSequence;

use super::types::{
    PlaybackConfig, PlaybackError, PlaybackFrame, PlaybackMode, PlaybackStatus, MS_PER_MINUTE,
};

pub struct PlaybackEngine {
    words: Arc<WordSequence>,
    config: PlaybackConfig,
    cursor: usize,
    status: PlaybackStatus,
}

impl PlaybackEngine {
    /// Create an idle engine positioned at `initial_position`, clamped
    /// to the book length.
    pub fn new(words: Arc<WordSequence>, config: PlaybackConfig, initial_position: usize) -> Self {
        let cursor = initial_position.min(words.len());
        Self {
            words,
            config: PlaybackConfig::new(config.words_per_minute, config.phrase_size, config.mode),
            cursor,
            status: PlaybackStatus::Idle,
        }
    }

    pub fn status(&self) -> PlaybackStatus {
        self.status
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn word_count(&self) -> usize {
        self.words.len()
    }

    pub fn config(&self) -> PlaybackConfig {
        self.config
    }

    fn is_running(&self) -> bool {
        self.status == PlaybackStatus::Running
    }

    /// Begin playback. Fails on an empty book and on any session that
    /// already left the idle state. A start position at or past the end
    /// means there is nothing left to read, so the session completes
    /// without emitting.
    pub fn start(&mut self, position: Option<usize>) -> Result<(), PlaybackError> {
        if self.words.is_empty() {
            return Err(PlaybackError::EmptyBook);
        }
        if self.status != PlaybackStatus::Idle {
            return Err(PlaybackError::AlreadyStarted);
        }
        if let Some(position) = position {
            self.cursor = position.min(self.words.len());
        }
        self.status = if self.cursor >= self.words.len() {
            PlaybackStatus::Completed
        } else {
            PlaybackStatus::Running
        };
        Ok(())
    }

    /// Suspend a running session. No-op in any other state.
    pub fn pause(&mut self) {
        if self.is_running() {
            self.status = PlaybackStatus::Paused;
        }
    }

    /// Continue a paused session. No-op in any other state, including
    /// completed sessions, which stay terminal until a seek moves the
    /// cursor back.
    pub fn resume(&mut self) {
        if self.status == PlaybackStatus::Paused {
            self.status = PlaybackStatus::Running;
        }
    }

    /// Move the cursor, clamped to the book length.
    ///
    /// Seeking never toggles between running and paused. It does cross
    /// the completion boundary in both directions: a completed session
    /// seeked before the end becomes paused, and a started session
    /// seeked to the end completes.
    pub fn seek(&mut self, position: usize) {
        self.cursor = position.min(self.words.len());
        match self.status {
            PlaybackStatus::Idle => {}
            PlaybackStatus::Completed if self.cursor < self.words.len() => {
                self.status = PlaybackStatus::Paused;
            }
            _ if self.cursor >= self.words.len() && !self.words.is_empty() => {
                self.status = PlaybackStatus::Completed;
            }
            _ => {}
        }
    }

    pub fn set_speed(&mut self, words_per_minute: u32) {
        self.config.set_speed(words_per_minute);
    }

    pub fn set_phrase_size(&mut self, phrase_size: usize) {
        self.config.set_phrase_size(phrase_size);
    }

    pub fn set_mode(&mut self, mode: PlaybackMode) {
        self.config.set_mode(mode);
    }

    /// Number of words the next tick would emit.
    fn upcoming_len(&self) -> usize {
        let remaining = self.words.len().saturating_sub(self.cursor);
        match self.config.mode {
            PlaybackMode::Single => remaining.min(1),
            PlaybackMode::Phrase => remaining.min(self.config.phrase_size),
        }
    }

    /// The display unit the next tick would emit, without advancing.
    pub fn peek_unit(&self) -> Option<String> {
        let len = self.upcoming_len();
        if len == 0 {
            return None;
        }
        Some(self.words.phrase(self.cursor, self.cursor + len))
    }

    /// How long the next display unit stays on screen: one word earns
    /// `60000 / wpm` milliseconds, a phrase earns that per word emitted.
    /// `None` when the session is not running or nothing remains.
    pub fn next_interval(&self) -> Option<Duration> {
        if !self.is_running() {
            return None;
        }
        let len = self.upcoming_len() as u64;
        if len == 0 {
            return None;
        }
        Some(Duration::from_millis(
            MS_PER_MINUTE * len / u64::from(self.config.words_per_minute),
        ))
    }

    /// Emit the next display unit and advance the cursor. Returns `None`
    /// unless the session is running with words remaining. Reaching the
    /// end of the book completes the session on the same tick.
    pub fn tick(&mut self) -> Option<PlaybackFrame> {
        if !self.is_running() {
            return None;
        }
        let len = self.upcoming_len();
        if len == 0 {
            return None;
        }

        let display_unit = self.words.phrase(self.cursor, self.cursor + len);
        self.cursor += len;
        if self.cursor >= self.words.len() {
            self.status = PlaybackStatus::Completed;
        }

        Some(PlaybackFrame {
            display_unit,
            cursor: self.cursor,
            state: self.status,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn engine(text: &str, config: PlaybackConfig, position: usize) -> PlaybackEngine {
        PlaybackEngine::new(WordSequence::shared(text), config, position)
    }

    fn single(wpm: u32) -> PlaybackConfig {
        PlaybackConfig::new(wpm, 1, PlaybackMode::Single)
    }

    fn phrase(wpm: u32, size: usize) -> PlaybackConfig {
        PlaybackConfig::new(wpm, size, PlaybackMode::Phrase)
    }

    #[test]
    fn test_single_mode_visits_every_word_once() {
        let mut engine = engine("The quick brown fox", single(600), 0);
        engine.start(None).unwrap();

        let expected = ["The", "quick", "brown", "fox"];
        for (i, word) in expected.iter().enumerate() {
            assert_eq!(engine.next_interval(), Some(Duration::from_millis(100)));
            let frame = engine.tick().unwrap();
            assert_eq!(frame.display_unit, *word);
            assert_eq!(frame.cursor, i + 1);
        }

        assert_eq!(engine.status(), PlaybackStatus::Completed);
        assert!(engine.tick().is_none());
        assert!(engine.next_interval().is_none());
    }

    #[test]
    fn test_phrase_mode_emits_clamped_slices() {
        let mut engine = engine("The quick brown fox", phrase(600, 2), 0);
        engine.start(None).unwrap();

        assert_eq!(engine.next_interval(), Some(Duration::from_millis(200)));
        let frame = engine.tick().unwrap();
        assert_eq!(frame.display_unit, "The quick");
        assert_eq!(frame.cursor, 2);
        assert_eq!(frame.state, PlaybackStatus::Running);

        assert_eq!(engine.next_interval(), Some(Duration::from_millis(200)));
        let frame = engine.tick().unwrap();
        assert_eq!(frame.display_unit, "brown fox");
        assert_eq!(frame.cursor, 4);
        assert_eq!(frame.state, PlaybackStatus::Completed);
    }

    #[test]
    fn test_final_partial_phrase_is_shorter_and_faster() {
        let mut engine = engine("one two three four five", phrase(600, 3), 0);
        engine.start(None).unwrap();

        assert_eq!(engine.next_interval(), Some(Duration::from_millis(300)));
        assert_eq!(engine.tick().unwrap().display_unit, "one two three");

        // Two words remain, so the last unit earns two words of time.
        assert_eq!(engine.next_interval(), Some(Duration::from_millis(200)));
        let frame = engine.tick().unwrap();
        assert_eq!(frame.display_unit, "four five");
        assert_eq!(frame.state, PlaybackStatus::Completed);
    }

    #[test]
    fn test_phrase_lengths_sum_to_words_remaining() {
        for phrase_size in 1..=7 {
            let mut engine = engine(
                "a b c d e f g h i j k l m",
                phrase(300, phrase_size),
                4,
            );
            engine.start(None).unwrap();

            let mut emitted = 0;
            while let Some(frame) = engine.tick() {
                emitted += frame.display_unit.split_whitespace().count();
            }
            assert_eq!(emitted, 13 - 4, "phrase_size {}", phrase_size);
            assert_eq!(engine.status(), PlaybackStatus::Completed);
        }
    }

    #[test]
    fn test_elapsed_time_is_mode_independent() {
        let word_count = 12u64;
        let text = "w ".repeat(word_count as usize);

        for config in [single(600), phrase(600, 2), phrase(600, 5)] {
            let mut engine = engine(&text, config, 0);
            engine.start(None).unwrap();

            let mut elapsed = Duration::ZERO;
            while let Some(interval) = engine.next_interval() {
                elapsed += interval;
                engine.tick().unwrap();
            }
            assert_eq!(
                elapsed,
                Duration::from_millis(MS_PER_MINUTE * word_count / 600),
                "mode {:?}",
                config.mode
            );
        }
    }

    #[test]
    fn test_start_fails_on_empty_book() {
        let mut engine = engine("", single(300), 0);
        assert!(matches!(engine.start(None), Err(PlaybackError::EmptyBook)));
        assert_eq!(engine.status(), PlaybackStatus::Idle);
    }

    #[test]
    fn test_start_twice_is_rejected() {
        let mut engine = engine("one two", single(300), 0);
        engine.start(None).unwrap();
        assert!(matches!(
            engine.start(None),
            Err(PlaybackError::AlreadyStarted)
        ));

        engine.pause();
        assert!(matches!(
            engine.start(Some(0)),
            Err(PlaybackError::AlreadyStarted)
        ));
    }

    #[test]
    fn test_start_position_is_clamped() {
        let mut engine = engine("one two three", single(300), 0);
        engine.start(Some(99)).unwrap();
        assert_eq!(engine.cursor(), 3);
        assert_eq!(engine.status(), PlaybackStatus::Completed);

        let mut engine = self::engine("one two three", single(300), 0);
        engine.start(Some(1)).unwrap();
        assert_eq!(engine.tick().unwrap().display_unit, "two");
    }

    #[test]
    fn test_initial_position_survives_plain_start() {
        let mut engine = engine("one two three", single(300), 2);
        engine.start(None).unwrap();
        assert_eq!(engine.tick().unwrap().display_unit, "three");
    }

    #[test]
    fn test_pause_and_resume_preserve_cursor() {
        let mut engine = engine("one two three", single(300), 0);
        engine.start(None).unwrap();
        engine.tick().unwrap();

        engine.pause();
        assert_eq!(engine.status(), PlaybackStatus::Paused);
        assert_eq!(engine.cursor(), 1);
        assert!(engine.tick().is_none());
        assert!(engine.next_interval().is_none());

        // Pausing again changes nothing.
        engine.pause();
        assert_eq!(engine.status(), PlaybackStatus::Paused);

        engine.resume();
        assert_eq!(engine.status(), PlaybackStatus::Running);
        assert_eq!(engine.tick().unwrap().display_unit, "two");
    }

    #[test]
    fn test_resume_is_noop_outside_paused() {
        let mut engine = engine("one two", single(300), 0);
        engine.resume();
        assert_eq!(engine.status(), PlaybackStatus::Idle);

        engine.start(None).unwrap();
        engine.resume();
        assert_eq!(engine.status(), PlaybackStatus::Running);
    }

    #[test]
    fn test_completed_is_terminal_for_resume_and_tick() {
        let mut engine = engine("one", single(300), 0);
        engine.start(None).unwrap();
        engine.tick().unwrap();
        assert_eq!(engine.status(), PlaybackStatus::Completed);

        engine.resume();
        assert_eq!(engine.status(), PlaybackStatus::Completed);
        assert!(engine.tick().is_none());
    }

    #[test]
    fn test_seek_back_from_completed_pauses() {
        let mut engine = engine("The quick brown fox", single(600), 0);
        engine.start(None).unwrap();
        while engine.tick().is_some() {}
        assert_eq!(engine.status(), PlaybackStatus::Completed);

        engine.seek(2);
        assert_eq!(engine.status(), PlaybackStatus::Paused);
        assert_eq!(engine.cursor(), 2);

        engine.resume();
        assert_eq!(engine.tick().unwrap().display_unit, "brown");
    }

    #[test]
    fn test_seek_does_not_toggle_running() {
        let mut engine = engine("one two three four", single(300), 0);
        engine.start(None).unwrap();
        engine.seek(2);
        assert_eq!(engine.status(), PlaybackStatus::Running);

        engine.pause();
        engine.seek(1);
        assert_eq!(engine.status(), PlaybackStatus::Paused);
        assert_eq!(engine.cursor(), 1);
    }

    #[test]
    fn test_seek_past_end_clamps_and_completes() {
        let mut engine = engine("one two three", single(300), 0);
        engine.start(None).unwrap();
        engine.seek(50);
        assert_eq!(engine.cursor(), 3);
        assert_eq!(engine.status(), PlaybackStatus::Completed);
    }

    #[test]
    fn test_seek_on_idle_moves_cursor_only() {
        let mut engine = engine("one two three", single(300), 0);
        engine.seek(99);
        assert_eq!(engine.cursor(), 3);
        assert_eq!(engine.status(), PlaybackStatus::Idle);
    }

    #[test]
    fn test_config_changes_apply_on_next_tick() {
        let mut engine = engine("a b c d e f", phrase(600, 2), 0);
        engine.start(None).unwrap();
        assert_eq!(engine.tick().unwrap().display_unit, "a b");

        engine.set_phrase_size(3);
        assert_eq!(engine.next_interval(), Some(Duration::from_millis(300)));
        assert_eq!(engine.tick().unwrap().display_unit, "c d e");

        engine.set_mode(PlaybackMode::Single);
        assert_eq!(engine.next_interval(), Some(Duration::from_millis(100)));
        assert_eq!(engine.tick().unwrap().display_unit, "f");
    }

    #[test]
    fn test_speed_change_rescales_interval() {
        let mut engine = engine("a b c d", single(300), 0);
        engine.start(None).unwrap();
        assert_eq!(engine.next_interval(), Some(Duration::from_millis(200)));

        engine.set_speed(600);
        assert_eq!(engine.next_interval(), Some(Duration::from_millis(100)));

        engine.set_speed(5000);
        assert_eq!(engine.next_interval(), Some(Duration::from_millis(60)));
        assert_eq!(engine.config().words_per_minute, 1000);
    }

    #[test]
    fn test_peek_does_not_advance() {
        let mut engine = engine("one two three", phrase(300, 2), 0);
        engine.start(None).unwrap();
        assert_eq!(engine.peek_unit().as_deref(), Some("one two"));
        assert_eq!(engine.cursor(), 0);
        assert_eq!(engine.tick().unwrap().display_unit, "one two");
        assert_eq!(engine.peek_unit().as_deref(), Some("three"));
    }
}

//! Playback session actor
//!
//! One task owns each live session. Control commands and snapshot reads
//! are serialized through a message channel, the tick timer lives inside
//! the same task, and emitted frames fan out over a broadcast channel to
//! any number of event-stream subscribers. A session never has more than
//! one pending tick; speed and mode changes replace the deadline.

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::time::Instant;
use uuid::Uuid;

use crate::ingest::WordSequence;

use super::engine::PlaybackEngine;
use super::sink::ProgressSink;
use super::types::{
    ControlCommand, PlaybackConfig, PlaybackError, PlaybackFrame, PlaybackSnapshot, PlaybackStatus,
};

/// Frames buffered per subscriber before a slow consumer starts lagging
const FRAME_BUFFER: usize = 64;

/// Command channel depth; commands are small and handled one at a time
const COMMAND_BUFFER: usize = 16;

pub(crate) enum SessionMsg {
    Control(
        ControlCommand,
        oneshot::Sender<Result<PlaybackSnapshot, PlaybackError>>,
    ),
    Snapshot(oneshot::Sender<PlaybackSnapshot>),
    Shutdown,
}

/// What a session broadcasts to its event-stream subscribers
#[derive(Debug, Clone)]
pub enum SessionEvent {
    /// A display frame from a tick or a state-changing command
    Frame(PlaybackFrame),
    /// The session task stopped; no further events will arrive
    Ended,
}

// ============================================================================
// Session Handle
// ============================================================================

/// Cheap cloneable handle to a live session task
#[derive(Clone)]
pub struct SessionHandle {
    id: Uuid,
    user_id: String,
    book_id: String,
    commands: mpsc::Sender<SessionMsg>,
    frames: broadcast::Sender<SessionEvent>,
    last_active: Arc<AtomicI64>,
}

impl SessionHandle {
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    pub fn book_id(&self) -> &str {
        &self.book_id
    }

    /// Apply a control command and return the resulting session view.
    pub async fn control(
        &self,
        command: ControlCommand,
    ) -> Result<PlaybackSnapshot, PlaybackError> {
        let (reply, response) = oneshot::channel();
        self.commands
            .send(SessionMsg::Control(command, reply))
            .await
            .map_err(|_| PlaybackError::SessionClosed)?;
        response.await.map_err(|_| PlaybackError::SessionClosed)?
    }

    /// Read the session state without changing it.
    pub async fn snapshot(&self) -> Result<PlaybackSnapshot, PlaybackError> {
        let (reply, response) = oneshot::channel();
        self.commands
            .send(SessionMsg::Snapshot(reply))
            .await
            .map_err(|_| PlaybackError::SessionClosed)?;
        response.await.map_err(|_| PlaybackError::SessionClosed)
    }

    /// Subscribe to the events this session emits: display frames while
    /// it lives, then a single `Ended` when its task stops.
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.frames.subscribe()
    }

    /// Ask the session task to persist and stop. Safe to call on a task
    /// that already exited.
    pub async fn shutdown(&self) {
        let _ = self.commands.send(SessionMsg::Shutdown).await;
    }

    /// Whether the session has seen no commands or ticks for `timeout_secs`.
    pub fn is_idle(&self, timeout_secs: i64) -> bool {
        Utc::now().timestamp() - self.last_active.load(Ordering::Relaxed) >= timeout_secs
    }
}

// ============================================================================
// Session Actor
// ============================================================================

pub(crate) struct SessionParams {
    pub user_id: String,
    pub book_id: String,
    pub words: Arc<WordSequence>,
    pub config: PlaybackConfig,
    pub initial_position: usize,
    pub sink: Arc<dyn ProgressSink>,
    pub flush_every: Duration,
}

/// Spawn a session task and return its handle.
pub(crate) fn spawn(params: SessionParams) -> SessionHandle {
    let id = Uuid::new_v4();
    let (commands, command_rx) = mpsc::channel(COMMAND_BUFFER);
    let (frames, _) = broadcast::channel(FRAME_BUFFER);
    let last_active = Arc::new(AtomicI64::new(Utc::now().timestamp()));

    let actor = SessionActor {
        id,
        user_id: params.user_id.clone(),
        book_id: params.book_id.clone(),
        engine: PlaybackEngine::new(params.words, params.config, params.initial_position),
        frames: frames.clone(),
        sink: params.sink,
        flush_every: params.flush_every,
        next_tick: None,
        dirty: false,
        last_flush: Instant::now(),
        last_active: last_active.clone(),
    };
    tokio::spawn(actor.run(command_rx));

    SessionHandle {
        id,
        user_id: params.user_id,
        book_id: params.book_id,
        commands,
        frames,
        last_active,
    }
}

struct SessionActor {
    id: Uuid,
    user_id: String,
    book_id: String,
    engine: PlaybackEngine,
    frames: broadcast::Sender<SessionEvent>,
    sink: Arc<dyn ProgressSink>,
    flush_every: Duration,
    next_tick: Option<Instant>,
    dirty: bool,
    last_flush: Instant,
    last_active: Arc<AtomicI64>,
}

impl SessionActor {
    async fn run(mut self, mut commands: mpsc::Receiver<SessionMsg>) {
        tracing::debug!(session_id = %self.id, book_id = %self.book_id, "Playback session started");

        loop {
            // Dummy deadline when no tick is pending; the branch below is
            // disabled then, so the timer is never polled or registered.
            let deadline = self
                .next_tick
                .unwrap_or_else(|| Instant::now() + Duration::from_secs(86_400));

            tokio::select! {
                msg = commands.recv() => match msg {
                    Some(SessionMsg::Control(command, reply)) => {
                        let result = self.apply(command).await;
                        let _ = reply.send(result);
                    }
                    Some(SessionMsg::Snapshot(reply)) => {
                        self.touch();
                        let _ = reply.send(self.snapshot());
                    }
                    Some(SessionMsg::Shutdown) | None => break,
                },
                _ = tokio::time::sleep_until(deadline), if self.next_tick.is_some() => {
                    self.on_tick().await;
                }
            }
        }

        self.flush_progress(true).await;
        let _ = self.frames.send(SessionEvent::Ended);
        tracing::debug!(session_id = %self.id, "Playback session stopped");
    }

    fn snapshot(&self) -> PlaybackSnapshot {
        PlaybackSnapshot {
            session_id: self.id,
            book_id: self.book_id.clone(),
            state: self.engine.status(),
            cursor: self.engine.cursor(),
            word_count: self.engine.word_count(),
            config: self.engine.config(),
        }
    }

    fn touch(&self) {
        self.last_active
            .store(Utc::now().timestamp(), Ordering::Relaxed);
    }

    /// Arm the tick timer from the engine's view of the next unit.
    fn schedule_tick(&mut self) {
        self.next_tick = self
            .engine
            .next_interval()
            .map(|interval| Instant::now() + interval);
    }

    async fn apply(
        &mut self,
        command: ControlCommand,
    ) -> Result<PlaybackSnapshot, PlaybackError> {
        self.touch();

        match command {
            ControlCommand::Start { position } => {
                let position = position.map(to_position).transpose()?;
                self.engine.start(position)?;
                self.dirty = true;
                self.schedule_tick();
                if self.engine.status() == PlaybackStatus::Completed {
                    self.flush_progress(true).await;
                }
            }
            ControlCommand::Pause => {
                self.engine.pause();
                self.next_tick = None;
                self.flush_progress(true).await;
            }
            ControlCommand::Resume => {
                self.engine.resume();
                if self.engine.status() == PlaybackStatus::Running && self.next_tick.is_none() {
                    self.schedule_tick();
                }
            }
            ControlCommand::Seek { position } => {
                self.engine.seek(to_position(position)?);
                self.dirty = true;
                if self.engine.status() != PlaybackStatus::Running {
                    self.next_tick = None;
                }
                self.flush_progress(true).await;
            }
            ControlCommand::SetSpeed { words_per_minute } => {
                self.engine.set_speed(words_per_minute);
                if self.engine.status() == PlaybackStatus::Running {
                    self.schedule_tick();
                }
            }
            ControlCommand::SetPhraseSize { phrase_size } => {
                self.engine.set_phrase_size(phrase_size);
            }
            ControlCommand::SetMode { mode } => {
                self.engine.set_mode(mode);
                if self.engine.status() == PlaybackStatus::Running {
                    self.schedule_tick();
                }
            }
        }

        self.emit_resync();
        Ok(self.snapshot())
    }

    /// Broadcast a non-advancing frame after a command so connected
    /// clients see the new cursor and state without waiting for a tick.
    fn emit_resync(&self) {
        let frame = PlaybackFrame {
            display_unit: self.engine.peek_unit().unwrap_or_default(),
            cursor: self.engine.cursor(),
            state: self.engine.status(),
        };
        let _ = self.frames.send(SessionEvent::Frame(frame));
    }

    async fn on_tick(&mut self) {
        self.next_tick = None;

        let Some(frame) = self.engine.tick() else {
            return;
        };
        self.touch();
        self.dirty = true;

        let completed = frame.state == PlaybackStatus::Completed;
        let _ = self.frames.send(SessionEvent::Frame(frame));

        if completed {
            self.flush_progress(true).await;
        } else {
            self.schedule_tick();
            self.flush_progress(false).await;
        }
    }

    /// Persist the position if it changed. Unforced calls are rate
    /// limited to one write per flush interval. On failure the position
    /// stays dirty and the next boundary retries; playback is unaffected.
    async fn flush_progress(&mut self, force: bool) {
        if !self.dirty {
            return;
        }
        if !force && self.last_flush.elapsed() < self.flush_every {
            return;
        }

        match self
            .sink
            .save_position(&self.user_id, &self.book_id, self.engine.cursor(), Utc::now())
            .await
        {
            Ok(()) => {
                self.dirty = false;
                self.last_flush = Instant::now();
            }
            Err(e) => {
                tracing::warn!(
                    session_id = %self.id,
                    book_id = %self.book_id,
                    "Failed to persist reading position: {}", e
                );
            }
        }
    }
}

fn to_position(position: i64) -> Result<usize, PlaybackError> {
    usize::try_from(position).map_err(|_| PlaybackError::InvalidPosition(position))
}

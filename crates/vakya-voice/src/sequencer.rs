//! Speech sequencer: one active session, strictly ordered playback.
//!
//! ```text
//!   speak(text, kind) ─► select ─► Local     ─► device voice (one utterance)
//!                               └► Networked ─► chunk ─► synthesize ─► encode ─► play ─► wait ─┐
//!                                                  ▲                                           │
//!                                                  └──────────────── next chunk ◄──────────────┘
//! ```
//!
//! Every [`speak`](SpeechSequencer::speak) and [`stop`](SpeechSequencer::stop)
//! advances a generation counter. A session captures the generation it was
//! started under and re-checks it before every effect: a superseded session
//! may finish the request it has in flight, but it never starts audio,
//! changes the status, or emits events again.
//!
//! Locking: the generation and the status live under one short-lived mutex
//! that is never held across an `.await`. Starting a clip happens while that
//! mutex is held, so a clip can only start if its session is still current.
//! `speak` and `stop` are additionally serialized against each other.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock, Weak};

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use vakya_core::{SettingsError, SpeechSynthesizer, VoiceSettings, VoiceSettingsUpdate};

use crate::local::{LocalSpeech, LocalSpeechCallback, LocalSpeechEvent, LocalUtterance};
use crate::player::{AudioPlayer, PlaybackEnd};
use crate::resource::AudioStore;
use crate::selector::{AudioKind, SpeechBackend, select_with_threshold};
use crate::text_utils;

// ── Status ─────────────────────────────────────────────────────────

/// What the UI shows about speech playback.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaybackStatus {
    /// Whether a session is currently producing (or about to produce) audio.
    pub is_speaking: bool,

    /// Caller-supplied id of the item being spoken locally, so the UI can
    /// highlight it. Networked sessions leave it unset.
    pub active_marker_id: Option<String>,
}

impl PlaybackStatus {
    /// Nothing is playing.
    #[must_use]
    pub const fn idle() -> Self {
        Self {
            is_speaking: false,
            active_marker_id: None,
        }
    }

    /// A session is speaking.
    #[must_use]
    pub fn speaking(active_marker_id: Option<String>) -> Self {
        Self {
            is_speaking: true,
            active_marker_id,
        }
    }
}

/// Voice parameters captured when a session starts.
///
/// Later [`set_speed`](SpeechSequencer::set_speed) calls do not affect a
/// session that is already running.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VoiceParameters {
    /// Playback rate multiplier, already clamped.
    pub rate: f32,
}

impl VoiceParameters {
    fn from_settings(settings: &VoiceSettings) -> Self {
        Self {
            rate: settings.effective_speed(),
        }
    }
}

// ── Events ─────────────────────────────────────────────────────────

/// Events emitted by the sequencer to the UI / application layer.
#[derive(Debug, Clone, PartialEq)]
pub enum VoiceEvent {
    /// The playback status changed.
    StatusChanged(PlaybackStatus),

    /// A new session superseded whatever was playing.
    SessionStarted {
        generation: u64,
        backend: SpeechBackend,
    },

    /// A networked chunk started playing.
    ChunkStarted {
        generation: u64,
        /// Zero-based chunk index.
        index: usize,
        total: usize,
    },

    /// A networked chunk produced no audio and was skipped.
    ChunkSkipped {
        generation: u64,
        index: usize,
        reason: String,
    },

    /// A session ran to its natural end (or gave up) without being superseded.
    SessionFinished { generation: u64 },

    /// Local speech was requested but the system has no speech facility.
    ///
    /// Emitted at most once per sequencer.
    LocalSpeechUnsupported,
}

// ── Collaborators ──────────────────────────────────────────────────

/// The three collaborators a sequencer drives.
#[derive(Clone)]
pub struct SpeechBackends {
    /// Networked synthesizer (text → base64 PCM).
    pub synthesizer: Arc<dyn SpeechSynthesizer>,

    /// Device voice.
    pub local: Arc<dyn LocalSpeech>,

    /// The single audio output used for networked clips.
    pub player: Arc<dyn AudioPlayer>,
}

// ── Sequencer ──────────────────────────────────────────────────────

/// Owns the single speech session of the application.
///
/// Dropping the sequencer stops playback.
pub struct SpeechSequencer {
    shared: Arc<Shared>,
}

impl SpeechSequencer {
    /// Create a new sequencer.
    ///
    /// Returns the sequencer and a receiver for [`VoiceEvent`]s.
    #[must_use]
    pub fn new(
        settings: VoiceSettings,
        backends: SpeechBackends,
    ) -> (Self, mpsc::UnboundedReceiver<VoiceEvent>) {
        let (event_tx, event_rx) = mpsc::unbounded_channel();

        let shared = Arc::new(Shared {
            state: Mutex::new(SessionState {
                generation: 0,
                status: PlaybackStatus::idle(),
            }),
            dispatch: Mutex::new(()),
            settings: RwLock::new(settings),
            backends,
            store: AudioStore::new(),
            event_tx,
            unsupported_notified: AtomicBool::new(false),
        });

        (Self { shared }, event_rx)
    }

    /// Speak `text`, superseding anything currently playing.
    ///
    /// `marker_id` identifies the spoken item for
    /// [`PlaybackStatus::active_marker_id`]; local sessions fall back to the
    /// text itself. Never fails: problems are logged and end the session.
    pub fn speak(&self, text: &str, kind: AudioKind, marker_id: Option<&str>) {
        self.shared.speak(text, kind, marker_id);
    }

    /// Speak an assistant reply if auto-read is enabled.
    ///
    /// Returns whether a session was started.
    pub fn speak_reply(&self, text: &str) -> bool {
        if !self.auto_read() {
            tracing::debug!("Auto-read disabled, not speaking reply");
            return false;
        }
        self.speak(text, AudioKind::System, None);
        true
    }

    /// Halt all audio and invalidate every in-flight session.
    pub fn stop(&self) {
        self.shared.stop();
    }

    /// Snapshot of the current playback status.
    #[must_use]
    pub fn status(&self) -> PlaybackStatus {
        self.shared.lock_state().status.clone()
    }

    /// Shorthand for `status().is_speaking`.
    #[must_use]
    pub fn is_speaking(&self) -> bool {
        self.shared.lock_state().status.is_speaking
    }

    /// The current session generation.
    #[must_use]
    pub fn generation(&self) -> u64 {
        self.shared.lock_state().generation
    }

    // ── Configuration ──────────────────────────────────────────────

    /// Set the playback rate for future sessions, clamped to 0.5–2.0.
    pub fn set_speed(&self, speed: f32) {
        let speed = vakya_core::clamp_speed(speed);
        tracing::debug!(speed, "Speech speed changed");
        self.shared.write_settings().speed = speed;
    }

    /// The playback rate future sessions will use.
    #[must_use]
    pub fn speed(&self) -> f32 {
        self.shared.read_settings().effective_speed()
    }

    /// Whether assistant replies are spoken automatically.
    #[must_use]
    pub fn auto_read(&self) -> bool {
        self.shared.read_settings().auto_read
    }

    /// Enable or disable automatic reading of assistant replies.
    pub fn set_auto_read(&self, auto_read: bool) {
        self.shared.write_settings().auto_read = auto_read;
    }

    /// Snapshot of the current settings.
    #[must_use]
    pub fn settings(&self) -> VoiceSettings {
        self.shared.read_settings().clone()
    }

    /// Apply a partial settings update. Invalid updates leave settings untouched.
    pub fn update_settings(&self, update: &VoiceSettingsUpdate) -> Result<(), SettingsError> {
        let mut settings = self.shared.write_settings();
        let mut merged = settings.clone();
        merged.merge(update);
        vakya_core::validate_settings(&merged)?;
        *settings = merged;
        Ok(())
    }

    /// The registry that networked clips are encoded into.
    #[must_use]
    pub fn audio_store(&self) -> &AudioStore {
        &self.shared.store
    }
}

impl Drop for SpeechSequencer {
    fn drop(&mut self) {
        self.stop();
    }
}

// ── Shared state ───────────────────────────────────────────────────

struct SessionState {
    generation: u64,
    status: PlaybackStatus,
}

struct Shared {
    /// Generation and status. Never held across an await.
    state: Mutex<SessionState>,

    /// Serializes `speak` and `stop`.
    dispatch: Mutex<()>,

    settings: RwLock<VoiceSettings>,
    backends: SpeechBackends,
    store: AudioStore,
    event_tx: mpsc::UnboundedSender<VoiceEvent>,
    unsupported_notified: AtomicBool,
}

/// Everything a networked session needs, captured at `speak` time.
struct NetworkSession {
    generation: u64,
    chunks: Vec<String>,
    params: VoiceParameters,
    sample_rate: u32,
    max_consecutive_failures: Option<u32>,
}

enum ChunkOutcome {
    Played,
    Skipped(String),
    Superseded,
}

impl Shared {
    fn speak(self: &Arc<Self>, text: &str, kind: AudioKind, marker_id: Option<&str>) {
        let _dispatch = self.dispatch.lock().unwrap_or_else(PoisonError::into_inner);

        let settings = self.read_settings().clone();
        let params = VoiceParameters::from_settings(&settings);
        let text_len = text.chars().count();
        let backend = select_with_threshold(kind, text_len, settings.auto_local_threshold);

        let generation = self.advance_generation();
        self.halt_output();

        tracing::info!(generation, ?kind, ?backend, text_len, "Starting speech session");
        self.emit(VoiceEvent::SessionStarted {
            generation,
            backend,
        });

        match backend {
            SpeechBackend::Local => {
                self.speak_local(generation, text, marker_id, params, settings.locale);
            }
            SpeechBackend::Networked => {
                self.start_networked(generation, text, params, &settings);
            }
        }
    }

    fn stop(&self) {
        let _dispatch = self.dispatch.lock().unwrap_or_else(PoisonError::into_inner);

        let generation = self.advance_generation();
        self.halt_output();
        self.set_status_if_current(generation, PlaybackStatus::idle());

        tracing::info!(generation, "Speech stopped");
    }

    // ── Local path ─────────────────────────────────────────────────

    fn speak_local(
        self: &Arc<Self>,
        generation: u64,
        text: &str,
        marker_id: Option<&str>,
        params: VoiceParameters,
        locale: String,
    ) {
        let local = &self.backends.local;

        if !local.is_available() {
            if !self.unsupported_notified.swap(true, Ordering::SeqCst) {
                tracing::warn!("Local speech synthesis is not available on this system");
                self.emit(VoiceEvent::LocalSpeechUnsupported);
            }
            self.set_status_if_current(generation, PlaybackStatus::idle());
            return;
        }

        let marker = marker_id.map_or_else(|| text.to_string(), ToString::to_string);
        self.set_status_if_current(generation, PlaybackStatus::speaking(Some(marker.clone())));

        let utterance = LocalUtterance {
            text: text.to_string(),
            rate: params.rate,
            locale,
        };
        let callback = local_callback(Arc::downgrade(self), generation, marker);

        if let Err(e) = local.enqueue(utterance, callback) {
            tracing::warn!(generation, error = %e, "Failed to queue local utterance");
            self.finish_session(generation);
        }
    }

    // ── Networked path ─────────────────────────────────────────────

    fn start_networked(
        self: &Arc<Self>,
        generation: u64,
        text: &str,
        params: VoiceParameters,
        settings: &VoiceSettings,
    ) {
        self.set_status_if_current(generation, PlaybackStatus::speaking(None));

        let chunks = text_utils::chunk_for_speech(text, settings.max_chunk_chars);
        if chunks.is_empty() {
            tracing::debug!(generation, "Nothing to speak after markdown stripping");
            self.finish_session(generation);
            return;
        }

        let handle = match tokio::runtime::Handle::try_current() {
            Ok(handle) => handle,
            Err(e) => {
                tracing::error!(generation, error = %e, "Cannot start networked speech session");
                self.set_status_if_current(generation, PlaybackStatus::idle());
                return;
            }
        };

        tracing::debug!(
            generation,
            num_chunks = chunks.len(),
            rate = params.rate,
            "Speaking text in chunks"
        );

        let session = NetworkSession {
            generation,
            chunks,
            params,
            sample_rate: self.backends.synthesizer.sample_rate(),
            max_consecutive_failures: settings.max_consecutive_failures,
        };
        handle.spawn(Arc::clone(self).run_network_session(session));
    }

    async fn run_network_session(self: Arc<Self>, session: NetworkSession) {
        let generation = session.generation;
        let total = session.chunks.len();
        let mut consecutive_failures: u32 = 0;

        for (index, chunk) in session.chunks.iter().enumerate() {
            match self.play_chunk(&session, index, chunk).await {
                ChunkOutcome::Played => consecutive_failures = 0,
                ChunkOutcome::Superseded => {
                    tracing::debug!(generation, chunk = index + 1, "Session superseded");
                    return;
                }
                ChunkOutcome::Skipped(reason) => {
                    consecutive_failures += 1;
                    tracing::warn!(
                        generation,
                        chunk = index + 1,
                        total,
                        chunk_text = %chunk.chars().take(80).collect::<String>(),
                        %reason,
                        "Skipping chunk"
                    );
                    self.emit_if_current(
                        generation,
                        VoiceEvent::ChunkSkipped {
                            generation,
                            index,
                            reason,
                        },
                    );

                    if session
                        .max_consecutive_failures
                        .is_some_and(|cap| consecutive_failures >= cap)
                    {
                        tracing::warn!(
                            generation,
                            failures = consecutive_failures,
                            "Too many consecutive chunk failures, giving up"
                        );
                        break;
                    }
                }
            }
        }

        if self.finish_session(generation) {
            tracing::debug!(generation, total, "Speech session finished");
        }
    }

    async fn play_chunk(&self, session: &NetworkSession, index: usize, chunk: &str) -> ChunkOutcome {
        let generation = session.generation;
        if !self.is_current(generation) {
            return ChunkOutcome::Superseded;
        }

        tracing::debug!(
            generation,
            chunk = index + 1,
            chars = chunk.chars().count(),
            "Synthesising chunk"
        );
        let synthesized = self.backends.synthesizer.synthesize(chunk).await;

        // Stale responses are discarded without any effect.
        if !self.is_current(generation) {
            return ChunkOutcome::Superseded;
        }

        let payload = match synthesized {
            Ok(Some(payload)) if !payload.trim().is_empty() => payload,
            Ok(_) => return ChunkOutcome::Skipped("synthesizer returned no audio".to_string()),
            Err(e) => return ChunkOutcome::Skipped(e.to_string()),
        };

        let clip = match self.store.encode_pcm(&payload, session.sample_rate) {
            Ok(clip) => clip,
            Err(e) => return ChunkOutcome::Skipped(e.to_string()),
        };

        let completion = {
            let state = self.lock_state();
            if state.generation != generation {
                drop(state);
                clip.revoke();
                return ChunkOutcome::Superseded;
            }

            match self.backends.player.play(&clip, session.params.rate) {
                Ok(completion) => {
                    self.emit(VoiceEvent::ChunkStarted {
                        generation,
                        index,
                        total: session.chunks.len(),
                    });
                    completion
                }
                Err(e) => {
                    drop(state);
                    clip.revoke();
                    return ChunkOutcome::Skipped(format!("player rejected clip: {e}"));
                }
            }
        };

        tracing::debug!(generation, chunk = index + 1, clip = %clip.uri(), "Chunk playing");
        let end = completion.wait().await;
        clip.revoke();

        match end {
            PlaybackEnd::Finished => ChunkOutcome::Played,
            PlaybackEnd::Failed(reason) => {
                ChunkOutcome::Skipped(format!("playback failed: {reason}"))
            }
            PlaybackEnd::Halted if self.is_current(generation) => {
                ChunkOutcome::Skipped("playback halted".to_string())
            }
            PlaybackEnd::Halted => ChunkOutcome::Superseded,
        }
    }

    // ── Internal helpers ───────────────────────────────────────────

    fn lock_state(&self) -> MutexGuard<'_, SessionState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn read_settings(&self) -> std::sync::RwLockReadGuard<'_, VoiceSettings> {
        self.settings.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_settings(&self) -> std::sync::RwLockWriteGuard<'_, VoiceSettings> {
        self.settings.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn advance_generation(&self) -> u64 {
        let mut state = self.lock_state();
        state.generation += 1;
        state.generation
    }

    fn is_current(&self, generation: u64) -> bool {
        self.lock_state().generation == generation
    }

    /// Stop both outputs. Called without the state lock: adapters may fire
    /// their callbacks synchronously.
    fn halt_output(&self) {
        self.backends.local.cancel();
        self.backends.player.halt();
    }

    /// Set the status if `generation` is still current. Returns whether it was.
    fn set_status_if_current(&self, generation: u64, status: PlaybackStatus) -> bool {
        let mut state = self.lock_state();
        if state.generation != generation {
            return false;
        }
        if state.status != status {
            tracing::debug!(old = ?state.status, new = ?status, "Playback status transition");
            state.status = status.clone();
            self.emit(VoiceEvent::StatusChanged(status));
        }
        true
    }

    /// End the current session: clear the status and announce it.
    ///
    /// No-op for a stale generation or a session that already ended.
    fn finish_session(&self, generation: u64) -> bool {
        let mut state = self.lock_state();
        if state.generation != generation || !state.status.is_speaking {
            return false;
        }
        state.status = PlaybackStatus::idle();
        self.emit(VoiceEvent::StatusChanged(PlaybackStatus::idle()));
        self.emit(VoiceEvent::SessionFinished { generation });
        true
    }

    fn emit_if_current(&self, generation: u64, event: VoiceEvent) {
        let state = self.lock_state();
        if state.generation == generation {
            self.emit(event);
        }
    }

    /// Emit a voice event (best-effort: a dropped receiver is logged and ignored).
    fn emit(&self, event: VoiceEvent) {
        if self.event_tx.send(event).is_err() {
            tracing::trace!("Voice event receiver dropped");
        }
    }
}

/// Route device voice events for one local session.
fn local_callback(shared: Weak<Shared>, generation: u64, marker: String) -> LocalSpeechCallback {
    Box::new(move |event| {
        let Some(shared) = shared.upgrade() else {
            return;
        };
        match event {
            LocalSpeechEvent::Started => {
                shared.set_status_if_current(generation, PlaybackStatus::speaking(Some(marker.clone())));
            }
            LocalSpeechEvent::Ended => {
                shared.finish_session(generation);
            }
            LocalSpeechEvent::Failed(reason) => {
                tracing::warn!(generation, %reason, "Local speech failed");
                shared.finish_session(generation);
            }
        }
    })
}

//! In-process audio playback via `rodio`.
//!
//! `rodio::OutputStream` is `!Send` on some platforms, so it is confined to a
//! dedicated OS thread that lives as long as the player. Only the `Send`
//! stream handle and per-clip sinks cross threads.

use std::io::Cursor;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError, mpsc};
use std::thread;

use rodio::{Decoder, OutputStream, OutputStreamHandle, Sink};

use crate::error::VoiceError;
use crate::player::{AudioPlayer, PlaybackCompletion, PlaybackEnd};
use crate::resource::AudioResource;

/// The clip currently playing, tagged so a finished watcher can tell whether
/// it was superseded.
struct CurrentClip<S> {
    slot: Arc<Mutex<Option<(u64, Arc<S>)>>>,
    next_token: AtomicU64,
}

impl<S: Send + Sync + 'static> CurrentClip<S> {
    fn new() -> Self {
        Self {
            slot: Arc::new(Mutex::new(None)),
            next_token: AtomicU64::new(0),
        }
    }

    /// Make `sink` current and return its token.
    fn replace(&self, sink: Arc<S>) -> u64 {
        let token = self.next_token.fetch_add(1, Ordering::SeqCst);
        *self.slot.lock().unwrap_or_else(PoisonError::into_inner) = Some((token, sink));
        token
    }

    fn take(&self) -> Option<Arc<S>> {
        self.slot
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
            .map(|(_, sink)| sink)
    }

    /// Run `wait_for_end` on a watcher thread. When it returns, only a clip
    /// that is still current has finished naturally; otherwise the notifier
    /// is dropped and the completion resolves as halted.
    fn watch<W>(&self, token: u64, wait_for_end: W) -> PlaybackCompletion
    where
        W: FnOnce() + Send + 'static,
    {
        let (notifier, completion) = PlaybackCompletion::channel();
        let slot = Arc::clone(&self.slot);
        thread::spawn(move || {
            wait_for_end();

            let mut guard = slot.lock().unwrap_or_else(PoisonError::into_inner);
            if matches!(guard.as_ref(), Some((t, _)) if *t == token) {
                guard.take();
                drop(guard);
                tracing::debug!("Playback finished naturally");
                notifier.notify(PlaybackEnd::Finished);
            }
        });
        completion
    }
}

/// [`AudioPlayer`] on the default output device.
pub struct RodioPlayer {
    handle: OutputStreamHandle,
    current: CurrentClip<Sink>,

    /// Dropping this ends the output thread.
    _shutdown: mpsc::Sender<()>,
}

impl RodioPlayer {
    /// Open the default output device.
    pub fn new() -> Result<Self, VoiceError> {
        let (ready_tx, ready_rx) = mpsc::channel();
        let (shutdown_tx, shutdown_rx) = mpsc::channel::<()>();

        thread::Builder::new()
            .name("vakya-audio".to_string())
            .spawn(move || match OutputStream::try_default() {
                Ok((_stream, handle)) => {
                    let _ = ready_tx.send(Ok(handle));
                    // Block until the player is dropped.
                    let _ = shutdown_rx.recv();
                    tracing::debug!("Audio output thread exiting");
                }
                Err(e) => {
                    let _ = ready_tx.send(Err(VoiceError::OutputStreamError(e.to_string())));
                }
            })?;

        let handle = ready_rx.recv().map_err(|_| {
            VoiceError::OutputStreamError("audio output thread exited during setup".to_string())
        })??;

        tracing::info!("Audio playback initialized on default output device");

        Ok(Self {
            handle,
            current: CurrentClip::new(),
            _shutdown: shutdown_tx,
        })
    }
}

impl AudioPlayer for RodioPlayer {
    fn play(&self, clip: &AudioResource, rate: f32) -> Result<PlaybackCompletion, VoiceError> {
        self.halt();

        let source = Decoder::new(Cursor::new(clip.bytes()?))
            .map_err(|e| VoiceError::Playback(format!("undecodable clip: {e}")))?;
        let sink = Sink::try_new(&self.handle)
            .map_err(|e| VoiceError::OutputStreamError(e.to_string()))?;
        sink.set_speed(rate);
        sink.append(source);
        let sink = Arc::new(sink);

        let token = self.current.replace(Arc::clone(&sink));
        tracing::debug!(clip = %clip.uri(), rate, "Audio playback started");

        // `sleep_until_end` returns when the queue drains or `stop()` is called.
        Ok(self.current.watch(token, move || sink.sleep_until_end()))
    }

    fn halt(&self) {
        if let Some(sink) = self.current.take() {
            sink.stop();
            tracing::debug!("Audio playback stopped");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Stands in for a sink: the watcher blocks until the gate is released.
    struct Gate(Mutex<mpsc::Receiver<()>>);

    fn gate() -> (Arc<Gate>, mpsc::Sender<()>) {
        let (tx, rx) = mpsc::channel();
        (Arc::new(Gate(Mutex::new(rx))), tx)
    }

    fn watch_gate(current: &CurrentClip<Gate>, gate: &Arc<Gate>) -> PlaybackCompletion {
        let token = current.replace(Arc::clone(gate));
        let gate = Arc::clone(gate);
        current.watch(token, move || {
            let _ = gate.0.lock().unwrap().recv();
        })
    }

    #[tokio::test]
    async fn drained_clip_finishes() {
        let current = CurrentClip::new();
        let (gate, release) = gate();

        let completion = watch_gate(&current, &gate);
        release.send(()).unwrap();

        assert_eq!(completion.wait().await, PlaybackEnd::Finished);
        assert!(current.take().is_none());
    }

    #[tokio::test]
    async fn taken_clip_resolves_as_halted() {
        let current = CurrentClip::new();
        let (gate, release) = gate();

        let completion = watch_gate(&current, &gate);
        assert!(current.take().is_some());
        release.send(()).unwrap();

        assert_eq!(completion.wait().await, PlaybackEnd::Halted);
    }

    #[tokio::test]
    async fn replaced_clip_resolves_as_halted() {
        let current = CurrentClip::new();
        let (first, release_first) = gate();
        let (second, release_second) = gate();

        let superseded = watch_gate(&current, &first);
        let playing = watch_gate(&current, &second);
        release_first.send(()).unwrap();
        assert_eq!(superseded.wait().await, PlaybackEnd::Halted);

        release_second.send(()).unwrap();
        assert_eq!(playing.wait().await, PlaybackEnd::Finished);
    }

    #[test]
    #[ignore = "needs an audio output device"]
    fn halt_stops_device_playback() {
        let player = RodioPlayer::new().unwrap();
        let store = crate::resource::AudioStore::new();
        let clip = store.insert(crate::wav::pcm16_to_wav(&[0; 48_000], 24_000));

        let completion = player.play(&clip, 1.0).unwrap();
        player.halt();

        let end = tokio_test::block_on(completion.wait());
        assert_eq!(end, PlaybackEnd::Halted);
        clip.revoke();
    }
}

//! Audio player abstraction for networked speech.
//!
//! The sequencer owns exactly one [`AudioPlayer`] and drives it one clip at
//! a time. Starting a clip hands back a [`PlaybackCompletion`] that resolves
//! when the clip ends, fails, or is halted.

use tokio::sync::oneshot;

use crate::error::VoiceError;
use crate::resource::AudioResource;

/// How a clip's playback ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlaybackEnd {
    /// All audio was played.
    Finished,

    /// The player reported an error mid-clip.
    Failed(String),

    /// [`AudioPlayer::halt`] was called, or the player went away.
    Halted,
}

/// Sender half of a [`PlaybackCompletion`], held by the player.
///
/// Dropping it without calling [`notify`](Self::notify) resolves the
/// completion as [`PlaybackEnd::Halted`].
#[derive(Debug)]
pub struct PlaybackNotifier {
    tx: oneshot::Sender<PlaybackEnd>,
}

impl PlaybackNotifier {
    /// Report how the clip ended.
    pub fn notify(self, end: PlaybackEnd) {
        // The sequencer may already have moved on; nothing to do then.
        let _ = self.tx.send(end);
    }
}

/// Resolves when the clip it was created for stops playing.
#[derive(Debug)]
pub struct PlaybackCompletion {
    rx: oneshot::Receiver<PlaybackEnd>,
}

impl PlaybackCompletion {
    /// Create a linked notifier/completion pair.
    #[must_use]
    pub fn channel() -> (PlaybackNotifier, Self) {
        let (tx, rx) = oneshot::channel();
        (PlaybackNotifier { tx }, Self { rx })
    }

    /// A completion that has already resolved.
    #[must_use]
    pub fn ready(end: PlaybackEnd) -> Self {
        let (notifier, completion) = Self::channel();
        notifier.notify(end);
        completion
    }

    /// Wait for the clip to stop.
    pub async fn wait(self) -> PlaybackEnd {
        self.rx.await.unwrap_or(PlaybackEnd::Halted)
    }
}

/// Abstraction over the single shared audio output element.
///
/// # Object safety
/// All methods take `&self`, so the trait is usable as `Arc<dyn AudioPlayer>`
/// inside the sequencer; implementations use interior mutability.
pub trait AudioPlayer: Send + Sync {
    /// Load `clip`, set the playback rate and start playing.
    ///
    /// Any clip still playing is stopped first. The clip must stay alive
    /// (unrevoked) until the returned completion resolves.
    fn play(&self, clip: &AudioResource, rate: f32) -> Result<PlaybackCompletion, VoiceError>;

    /// Pause, rewind and clear the current source.
    ///
    /// The pending completion, if any, resolves as [`PlaybackEnd::Halted`].
    fn halt(&self);
}

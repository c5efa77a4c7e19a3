//! Revocable audio resources.
//!
//! An [`AudioStore`] holds encoded clips keyed by id, much like an object-URL
//! registry. Each clip is handed out as an [`AudioResource`], an owned handle
//! that must be revoked once the player is done with it. Revoking consumes
//! the handle, so a clip cannot be released twice; dropping an unrevoked
//! handle releases it as well, so an abandoned clip is never leaked.

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use crate::error::VoiceError;
use crate::wav;

#[derive(Default)]
struct StoreInner {
    next_id: AtomicU64,
    clips: Mutex<HashMap<u64, Arc<[u8]>>>,
    created: AtomicUsize,
    revoked: AtomicUsize,
}

impl StoreInner {
    fn remove(&self, id: u64) -> bool {
        let removed = self
            .clips
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&id)
            .is_some();
        if removed {
            self.revoked.fetch_add(1, Ordering::SeqCst);
        }
        removed
    }
}

/// Registry of playable audio clips.
///
/// Cloning shares the same registry.
#[derive(Clone, Default)]
pub struct AudioStore {
    inner: Arc<StoreInner>,
}

impl AudioStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an already-encoded clip.
    pub fn insert(&self, bytes: Vec<u8>) -> AudioResource {
        let id = self.inner.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        self.inner
            .clips
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id, Arc::from(bytes));
        self.inner.created.fetch_add(1, Ordering::SeqCst);

        AudioResource {
            id,
            store: Arc::clone(&self.inner),
            released: false,
        }
    }

    /// Decode base64 16-bit mono PCM, wrap it as WAV and register the clip.
    pub fn encode_pcm(&self, payload: &str, sample_rate: u32) -> Result<AudioResource, VoiceError> {
        let bytes = wav::base64_pcm_to_wav(payload, sample_rate)?;
        Ok(self.insert(bytes))
    }

    /// Number of clips that have been created but not yet revoked.
    pub fn live_count(&self) -> usize {
        self.inner
            .clips
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Total clips ever registered.
    pub fn created_count(&self) -> usize {
        self.inner.created.load(Ordering::SeqCst)
    }

    /// Total clips ever revoked.
    pub fn revoked_count(&self) -> usize {
        self.inner.revoked.load(Ordering::SeqCst)
    }
}

impl fmt::Debug for AudioStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AudioStore")
            .field("live", &self.live_count())
            .field("created", &self.created_count())
            .finish()
    }
}

/// Owned handle to a clip in an [`AudioStore`].
pub struct AudioResource {
    id: u64,
    store: Arc<StoreInner>,
    released: bool,
}

impl AudioResource {
    /// Store-unique identifier.
    pub const fn id(&self) -> u64 {
        self.id
    }

    /// Opaque locator for logs and players that address clips by URI.
    pub fn uri(&self) -> String {
        format!("blob:vakya/{}", self.id)
    }

    /// The encoded clip bytes.
    pub fn bytes(&self) -> Result<Arc<[u8]>, VoiceError> {
        self.store
            .clips
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&self.id)
            .cloned()
            .ok_or(VoiceError::ResourceRevoked(self.id))
    }

    /// Release the clip. Consumes the handle.
    pub fn revoke(mut self) {
        self.release();
    }

    fn release(&mut self) {
        if !self.released {
            self.released = true;
            self.store.remove(self.id);
        }
    }
}

impl Drop for AudioResource {
    fn drop(&mut self) {
        if !self.released {
            tracing::debug!(id = self.id, "Audio resource dropped without revoke, releasing");
            self.release();
        }
    }
}

impl fmt::Debug for AudioResource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AudioResource").field("id", &self.id).finish()
    }
}

//! In-memory store of live render artifacts.
//!
//! Each artifact belongs to exactly one owner (a preview view or a dialogue session).
//! An owner holds at most one artifact: storing a new one releases the old, and tearing
//! the owner down releases whatever it holds. A global capacity bounds the store; when it
//! is exceeded the owner whose artifact was rendered longest ago loses it.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::{debug, info};
use uuid::Uuid;

use crate::render::RenderArtifact;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ArtifactOwner {
    View(String),
    Session(Uuid),
}

impl fmt::Display for ArtifactOwner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArtifactOwner::View(id) => write!(f, "view:{id}"),
            ArtifactOwner::Session(id) => write!(f, "session:{id}"),
        }
    }
}

struct Stored {
    owner: ArtifactOwner,
    artifact: Arc<RenderArtifact>,
    /// Insertion sequence; lower means rendered earlier.
    seq: u64,
}

#[derive(Default)]
struct Inner {
    by_id: HashMap<Uuid, Stored>,
    by_owner: HashMap<ArtifactOwner, Uuid>,
    next_seq: u64,
}

impl Inner {
    fn remove_owner(&mut self, owner: &ArtifactOwner) -> Option<Uuid> {
        let id = self.by_owner.remove(owner)?;
        self.by_id.remove(&id);
        Some(id)
    }
}

pub struct ArtifactStore {
    inner: RwLock<Inner>,
    capacity: usize,
}

impl ArtifactStore {
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: RwLock::new(Inner::default()),
            capacity: capacity.max(1),
        }
    }

    /// Stores `artifact` as `owner`'s current artifact, releasing any previous one.
    /// Returns the new artifact id.
    pub async fn replace(&self, owner: ArtifactOwner, artifact: RenderArtifact) -> Uuid {
        let id = Uuid::new_v4();
        let mut inner = self.inner.write().await;

        if let Some(previous) = inner.remove_owner(&owner) {
            debug!(%owner, artifact_id = %previous, "released superseded artifact");
        }

        let seq = inner.next_seq;
        inner.next_seq += 1;
        inner.by_id.insert(
            id,
            Stored {
                owner: owner.clone(),
                artifact: Arc::new(artifact),
                seq,
            },
        );
        inner.by_owner.insert(owner.clone(), id);

        while inner.by_id.len() > self.capacity {
            let oldest = inner
                .by_id
                .values()
                .min_by_key(|stored| stored.seq)
                .map(|stored| stored.owner.clone());
            let Some(oldest) = oldest else { break };
            if let Some(evicted) = inner.remove_owner(&oldest) {
                info!(owner = %oldest, artifact_id = %evicted, "evicted artifact over capacity");
            }
        }

        debug!(%owner, artifact_id = %id, live = inner.by_id.len(), "stored artifact");
        id
    }

    pub async fn get(&self, id: Uuid) -> Option<Arc<RenderArtifact>> {
        self.inner
            .read()
            .await
            .by_id
            .get(&id)
            .map(|stored| Arc::clone(&stored.artifact))
    }

    /// Id of `owner`'s current artifact, if it still holds one.
    pub async fn current_for(&self, owner: &ArtifactOwner) -> Option<Uuid> {
        self.inner.read().await.by_owner.get(owner).copied()
    }

    /// Releases `owner`'s artifact. Returns whether there was one.
    pub async fn release(&self, owner: &ArtifactOwner) -> bool {
        let released = self.inner.write().await.remove_owner(owner);
        if let Some(id) = released {
            debug!(%owner, artifact_id = %id, "released artifact");
        }
        released.is_some()
    }

    #[cfg(test)]
    pub async fn len(&self) -> usize {
        self.inner.read().await.by_id.len()
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────

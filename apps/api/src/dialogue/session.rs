//! Dialogue sessions — one controller per session plus its pending analysis task.
//!
//! # Analysis task
//! Entering `Analyzing` spawns a tokio task that waits the configured delay, asks the
//! `ProfileSource` for a profile, and hands it to the `ProfileSink`. A failed attempt is
//! retried after `delay × attempt` until the attempt budget is spent. The task's
//! `JoinHandle` is the cancellation handle: superseding, deleting or evicting a session
//! aborts it and waits for it to stop before the session is marked `Cancelled`.
//!
//! # Retention
//! The registry holds at most `capacity` sessions. A superseded session is dropped at once;
//! beyond that the oldest finished session goes first. Dropping a session discards its
//! delivered output through the sink.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::{Mutex, RwLock};
use tokio::task::JoinHandle;
use tracing::{info, warn};
use uuid::Uuid;

use crate::dialogue::controller::{DialogueController, DialogueStage, Message, StepOutcome};
use crate::dialogue::source::ProfileSource;
use crate::models::profile::Profile;
use crate::render::artifacts::{ArtifactOwner, ArtifactStore};
use crate::render::{render_profile_blocking, RenderOutcome, TemplateVariant};

// ────────────────────────────────────────────────────────────────────────────
// Profile sink
// ────────────────────────────────────────────────────────────────────────────

/// Receives the profile a finished analysis produced. Called at most once per session.
#[async_trait]
pub trait ProfileSink: Send + Sync {
    async fn deliver(
        &self,
        session_id: Uuid,
        variant: TemplateVariant,
        profile: Profile,
    ) -> anyhow::Result<()>;

    /// Drops whatever `deliver` produced for the session. Called when the session is removed.
    async fn discard(&self, _session_id: Uuid) {}
}

/// Renders delivered profiles and stores the artifact under the session.
pub struct ArtifactSink {
    store: Arc<ArtifactStore>,
}

impl ArtifactSink {
    pub fn new(store: Arc<ArtifactStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl ProfileSink for ArtifactSink {
    async fn deliver(
        &self,
        session_id: Uuid,
        variant: TemplateVariant,
        profile: Profile,
    ) -> anyhow::Result<()> {
        let report = render_profile_blocking(profile, variant).await;
        match (report.outcome, report.artifact) {
            (RenderOutcome::Failed, _) | (_, None) => {
                let reasons: Vec<String> = report.issues.into_iter().map(|i| i.message).collect();
                anyhow::bail!("render failed: {}", reasons.join("; "))
            }
            (_, Some(artifact)) => {
                let artifact_id = self
                    .store
                    .replace(ArtifactOwner::Session(session_id), artifact)
                    .await;
                info!(%session_id, %artifact_id, "session artifact ready");
                Ok(())
            }
        }
    }

    async fn discard(&self, session_id: Uuid) {
        self.store
            .release(&ArtifactOwner::Session(session_id))
            .await;
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Sessions
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnalysisSettings {
    /// Wait before the first attempt; retry `n` waits `delay × n`.
    pub delay: Duration,
    pub max_attempts: u32,
}

pub struct DialogueSession {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    /// Registry insertion order; eviction picks the lowest.
    seq: u64,
    controller: Mutex<DialogueController>,
    task: Mutex<Option<JoinHandle<()>>>,
}

/// Point-in-time view of a session for callers.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
    pub id: Uuid,
    pub variant: TemplateVariant,
    pub stage: DialogueStage,
    pub transcript: Vec<Message>,
    pub created_at: DateTime<Utc>,
}

impl DialogueSession {
    pub async fn snapshot(&self) -> SessionSnapshot {
        let controller = self.controller.lock().await;
        SessionSnapshot {
            id: self.id,
            variant: controller.variant(),
            stage: controller.stage(),
            transcript: controller.transcript().to_vec(),
            created_at: self.created_at,
        }
    }

    /// Aborts the pending analysis, waits for it to stop, then marks the session `Cancelled`.
    async fn cancel(&self) -> StepOutcome {
        let pending = self.task.lock().await.take();
        if let Some(handle) = pending {
            handle.abort();
            // Wait until the task has actually stopped so nothing is delivered afterwards.
            let _ = handle.await;
        }
        self.controller.lock().await.cancel()
    }
}

pub struct SessionRegistry {
    sessions: RwLock<HashMap<Uuid, Arc<DialogueSession>>>,
    next_seq: AtomicU64,
    source: Arc<dyn ProfileSource>,
    sink: Arc<dyn ProfileSink>,
    settings: AnalysisSettings,
    capacity: usize,
}

impl SessionRegistry {
    /// `capacity` bounds the number of retained sessions.
    pub fn new(
        source: Arc<dyn ProfileSource>,
        sink: Arc<dyn ProfileSink>,
        settings: AnalysisSettings,
        capacity: usize,
    ) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            next_seq: AtomicU64::new(0),
            source,
            sink,
            settings,
            capacity: capacity.max(1),
        }
    }

    /// Opens a session. A `supersedes` session, if it exists, is cancelled and dropped first.
    /// Past capacity, the oldest finished session is dropped, or the oldest session of all
    /// when none has finished.
    pub async fn start(
        &self,
        variant: TemplateVariant,
        supersedes: Option<Uuid>,
    ) -> Arc<DialogueSession> {
        if let Some(previous) = supersedes {
            if self.remove(previous).await.is_none() {
                warn!(session_id = %previous, "superseded session not found");
            }
        }

        let session = Arc::new(DialogueSession {
            id: Uuid::new_v4(),
            created_at: Utc::now(),
            seq: self.next_seq.fetch_add(1, Ordering::Relaxed),
            controller: Mutex::new(DialogueController::new(
                variant,
                self.settings.max_attempts,
            )),
            task: Mutex::new(None),
        });
        self.sessions
            .write()
            .await
            .insert(session.id, Arc::clone(&session));
        info!(session_id = %session.id, variant = variant.as_str(), "dialogue session started");

        while let Some(victim) = self.pick_eviction().await {
            if self.remove(victim).await.is_some() {
                info!(session_id = %victim, "evicted dialogue session");
            }
        }
        session
    }

    async fn pick_eviction(&self) -> Option<Uuid> {
        let sessions: Vec<Arc<DialogueSession>> = {
            let map = self.sessions.read().await;
            if map.len() <= self.capacity {
                return None;
            }
            map.values().cloned().collect()
        };

        let mut finished = Vec::new();
        for session in &sessions {
            if session.controller.lock().await.stage().is_terminal() {
                finished.push(session);
            }
        }
        let candidates: Vec<&Arc<DialogueSession>> = if finished.is_empty() {
            sessions.iter().collect()
        } else {
            finished
        };
        candidates
            .into_iter()
            .min_by_key(|session| session.seq)
            .map(|session| session.id)
    }

    pub async fn get(&self, id: Uuid) -> Option<Arc<DialogueSession>> {
        self.sessions.read().await.get(&id).cloned()
    }

    /// Feeds user input to the session; entering `Analyzing` starts the analysis task.
    pub async fn submit(&self, id: Uuid, text: &str) -> Option<StepOutcome> {
        let session = self.get(id).await?;
        let outcome = session.controller.lock().await.submit(text);

        if matches!(
            outcome,
            StepOutcome::Advanced {
                stage: DialogueStage::Analyzing
            }
        ) {
            let handle = tokio::spawn(run_analysis(
                Arc::clone(&session),
                Arc::clone(&self.source),
                Arc::clone(&self.sink),
                self.settings,
            ));
            *session.task.lock().await = Some(handle);
        }
        Some(outcome)
    }

    /// Aborts the session's pending analysis and marks it `Cancelled`, keeping it registered.
    #[cfg(test)]
    pub async fn cancel(&self, id: Uuid) -> Option<StepOutcome> {
        let session = self.get(id).await?;
        Some(session.cancel().await)
    }

    /// Cancels and forgets the session and discards its delivered output. Returns its final state.
    pub async fn remove(&self, id: Uuid) -> Option<SessionSnapshot> {
        let session = self.sessions.write().await.remove(&id)?;
        let outcome = session.cancel().await;
        info!(session_id = %id, ?outcome, "dialogue session removed");
        self.sink.discard(id).await;
        Some(session.snapshot().await)
    }

    #[cfg(test)]
    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }
}

async fn run_analysis(
    session: Arc<DialogueSession>,
    source: Arc<dyn ProfileSource>,
    sink: Arc<dyn ProfileSink>,
    settings: AnalysisSettings,
) {
    let mut attempt: u32 = 1;
    loop {
        tokio::time::sleep(settings.delay * attempt).await;

        let Some(intake) = session.controller.lock().await.intake() else {
            return;
        };

        let result = async {
            let profile = source.generate(&intake).await?;
            sink.deliver(session.id, intake.variant, profile.clone())
                .await?;
            anyhow::Ok(profile)
        }
        .await;

        let mut controller = session.controller.lock().await;
        match result {
            Ok(profile) => {
                controller.complete(&profile);
                info!(session_id = %session.id, attempt, "analysis complete");
                return;
            }
            Err(e) => {
                warn!(session_id = %session.id, attempt, "analysis attempt failed: {e:#}");
                match controller.record_failure() {
                    StepOutcome::Retrying { attempt: next } => attempt = next,
                    _ => {
                        warn!(session_id = %session.id, "analysis gave up");
                        return;
                    }
                }
            }
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────

//! Replay of operations queued while offline.

use std::collections::HashSet;

use super::engine::{SyncEngine, SyncError};
use crate::db::QueuedOperation;
use crate::models::{PendingOperation, WordEntry};
use crate::sheet::SheetsTransport;

/// Outcome of one pass over the pending queue.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReplayReport {
    /// Entries applied to the sheet and removed
    pub replayed: usize,
    /// Entries dropped because their word no longer exists in the sheet
    pub discarded: usize,
    /// Queued adds whose word turned out to exist in the sheet already
    pub conflicts: usize,
    /// Entries still queued
    pub remaining: usize,
    /// The failure that stopped the pass, or the last entry that could not
    /// be applied as queued
    pub error: Option<String>,
}

impl ReplayReport {
    /// True when every queued change reached the sheet as it was made.
    pub fn is_complete(&self) -> bool {
        self.remaining == 0 && self.discarded == 0 && self.conflicts == 0 && self.error.is_none()
    }
}

impl<T: SheetsTransport> SyncEngine<T> {
    /// Applies queued operations to the sheet, oldest first.
    ///
    /// An entry is removed only once its sheet call succeeded. The first
    /// failure stops the pass and leaves it and everything after it queued.
    /// Entries that can never apply as queued (an update or delete of a word
    /// gone from the sheet, an add of a word already there) are removed and
    /// reported through `error` and the last-error slot.
    /// Does nothing while offline. Concurrent calls run one after another.
    pub async fn process_pending_queue(&self) -> Result<ReplayReport, SyncError> {
        let _guard = self.replay_lock.lock().await;

        let pending = self.queue.list().await?;
        let mut report = ReplayReport {
            remaining: pending.len(),
            ..Default::default()
        };
        if pending.is_empty() || !self.is_online() {
            return Ok(report);
        }

        if let Err(e) = self.client.initialize().await {
            report.error = Some(e.to_string());
            return Ok(report);
        }

        tracing::info!(count = pending.len(), "replaying pending operations");

        for queued in pending {
            match self.apply(&queued.operation).await {
                Ok(conflicting) if conflicting.is_empty() => {
                    self.queue.remove(queued.id).await?;
                    report.replayed += 1;
                    report.remaining -= 1;
                }
                Ok(conflicting) => {
                    tracing::warn!(
                        id = queued.id,
                        words = %conflicting.join(", "),
                        "queued add collided with words already in the sheet"
                    );
                    self.queue.remove(queued.id).await?;
                    report.replayed += 1;
                    report.conflicts += conflicting.len();
                    report.remaining -= 1;

                    let message = format!(
                        "Offline add of {} skipped: already in sheet, \
                         local copy replaced by the sheet's",
                        conflicting.join(", ")
                    );
                    report.error = Some(message);
                }
                Err(SyncError::WordNotFound(word)) => {
                    tracing::warn!(
                        id = queued.id,
                        word = %word,
                        operation = %queued.operation,
                        payload = %serde_json::to_string(&queued.operation).unwrap_or_default(),
                        "queued operation targets a word missing from the sheet, discarding"
                    );
                    self.queue.remove(queued.id).await?;
                    report.discarded += 1;
                    report.remaining -= 1;

                    let message = format!(
                        "Discarded queued {}: word \"{}\" no longer exists in the sheet",
                        queued.operation, word
                    );
                    report.error = Some(message);
                }
                Err(e) => {
                    log_stop(&queued, &e);
                    report.error = Some(format!("Replay of {} failed: {}", queued.operation, e));
                    break;
                }
            }
        }

        // Sheet calls reset the slot, so it is filled once the pass is over.
        if let Some(message) = &report.error {
            self.client.set_last_error(message.clone()).await;
        }

        tracing::info!(
            replayed = report.replayed,
            discarded = report.discarded,
            conflicts = report.conflicts,
            remaining = report.remaining,
            "replay finished"
        );
        Ok(report)
    }

    /// Replays on every transition to online, and once at start when
    /// already online. Runs until the connectivity signal is dropped.
    pub async fn watch_connectivity(&self) {
        let mut rx = self.connectivity.subscribe();

        if *rx.borrow_and_update() {
            self.replay_logged().await;
        }

        while rx.changed().await.is_ok() {
            let online = *rx.borrow_and_update();
            if online {
                self.replay_logged().await;
            }
        }
    }

    async fn replay_logged(&self) {
        match self.process_pending_queue().await {
            Ok(report) if report.error.is_some() => {
                tracing::warn!(
                    remaining = report.remaining,
                    discarded = report.discarded,
                    conflicts = report.conflicts,
                    "replay did not apply every change"
                );
            }
            Ok(_) => {}
            Err(e) => tracing::warn!(error = %e, "replay failed"),
        }
    }

    /// Applies one queued operation. Returns the words of a queued add that
    /// already existed in the sheet; their cached copies are reloaded from it.
    async fn apply(&self, operation: &PendingOperation) -> Result<Vec<String>, SyncError> {
        match operation {
            PendingOperation::Add { data } => {
                let accepted: HashSet<String> = self
                    .add_online(data.clone())
                    .await?
                    .iter()
                    .map(WordEntry::key)
                    .collect();

                let mut conflicting = Vec::new();
                for entry in data.iter().filter(|e| !accepted.contains(&e.key())) {
                    self.reload_word(&entry.word).await?;
                    conflicting.push(entry.word.clone());
                }
                Ok(conflicting)
            }
            PendingOperation::Update { word, data } => {
                self.update_online(word, data.clone()).await?;
                Ok(Vec::new())
            }
            PendingOperation::Delete { word } => {
                self.delete_online(word).await?;
                Ok(Vec::new())
            }
        }
    }
}

fn log_stop(queued: &QueuedOperation, error: &SyncError) {
    tracing::warn!(
        id = queued.id,
        operation = %queued.operation,
        queued_at = %queued.created_at,
        error = %error,
        "replay stopped"
    );
}

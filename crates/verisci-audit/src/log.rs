//! Append-only audit log.
//!
//! Entries are fully built (text and digests) before the write lock is taken,
//! and pushed under a single lock acquisition, so a concurrent reader sees
//! either the whole entry or nothing.

use std::collections::BTreeMap;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use serde::{Deserialize, Serialize};

use verisci_core::hash::{chain_hashes, hash_str, Hash256};
use verisci_core::id::StepId;
use verisci_core::milestone::Milestone;
use verisci_core::time::now_millis;

use crate::entry::{AuditEntry, IntegrityIssue, VerifyStatus};
use crate::error::{AuditError, Result};

/// Inputs of one completed call, before fingerprinting.
#[derive(Debug, Clone)]
pub struct NewStep {
    pub milestone: Milestone,
    pub action: String,
    pub model: String,
    pub seed: u64,
    pub temperature: f32,
    pub prompt: String,
    pub output: String,
}

/// On-disk shape of an exported trail.
#[derive(Debug, Serialize, Deserialize)]
struct ExportedTrail {
    engine_version: String,
    entries: Vec<AuditEntry>,
}

#[derive(Debug, Default)]
pub struct AuditLog {
    entries: RwLock<Vec<AuditEntry>>,
}

impl AuditLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild a log from previously exported entries.
    ///
    /// Only ordering is validated, plus room for one more step id. Digests
    /// are kept as stored; edited text shows up in `integrity_report` and in
    /// re-execution.
    pub fn from_entries(entries: Vec<AuditEntry>) -> Result<Self> {
        for pair in entries.windows(2) {
            if pair[1].step_id <= pair[0].step_id {
                return Err(AuditError::OutOfOrder {
                    prev: pair[0].step_id,
                    next: pair[1].step_id,
                });
            }
        }
        if let Some(last) = entries.last() {
            if last.step_id.checked_next().is_none() {
                return Err(AuditError::IdsExhausted(last.step_id));
            }
        }
        Ok(Self {
            entries: RwLock::new(entries),
        })
    }

    fn read(&self) -> RwLockReadGuard<'_, Vec<AuditEntry>> {
        self.entries.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Vec<AuditEntry>> {
        self.entries.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Fingerprint a completed call, assign the next step id and store it.
    pub fn append(&self, step: NewStep) -> AuditEntry {
        let prompt_hash = hash_str(&step.prompt);
        let output_hash = hash_str(&step.output);
        let timestamp_ms = now_millis();

        let mut entries = self.write();
        // `from_entries` guarantees the last id has a successor.
        let step_id = entries
            .last()
            .and_then(|e| e.step_id.checked_next())
            .unwrap_or(StepId::new(1));
        let entry = AuditEntry {
            step_id,
            milestone: step.milestone,
            action: step.action,
            model: step.model,
            seed: step.seed,
            temperature: step.temperature,
            prompt: step.prompt,
            prompt_hash,
            output: step.output,
            output_hash,
            timestamp_ms,
            verified: VerifyStatus::Unverified,
        };
        entries.push(entry.clone());
        drop(entries);

        tracing::debug!(
            step = %step_id,
            milestone = %entry.milestone,
            action = %entry.action,
            prompt_hash = %prompt_hash.short(),
            output_hash = %output_hash.short(),
            "appended audit entry"
        );
        entry
    }

    pub fn get(&self, step_id: StepId) -> Result<AuditEntry> {
        let entries = self.read();
        find(&entries, step_id)
            .map(|i| entries[i].clone())
            .ok_or(AuditError::NotFound(step_id))
    }

    /// Snapshot of every entry in step order.
    pub fn list(&self) -> Vec<AuditEntry> {
        self.read().clone()
    }

    /// Record the outcome of a re-execution. Later checks overwrite earlier ones.
    pub fn mark_verified(&self, step_id: StepId, status: VerifyStatus) -> Result<()> {
        let mut entries = self.write();
        let i = find(&entries, step_id).ok_or(AuditError::NotFound(step_id))?;
        entries[i].verified = status;
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    pub fn count_by_milestone(&self) -> BTreeMap<Milestone, usize> {
        let mut counts = BTreeMap::new();
        for e in self.read().iter() {
            *counts.entry(e.milestone).or_insert(0) += 1;
        }
        counts
    }

    /// Entries whose stored text no longer reproduces the stored digests.
    pub fn integrity_report(&self) -> Vec<IntegrityIssue> {
        self.read()
            .iter()
            .filter_map(AuditEntry::check_integrity)
            .collect()
    }

    /// Root digest over every entry's (prompt_hash, output_hash), in step order.
    pub fn root_hash(&self) -> Hash256 {
        let entries = self.read();
        chain_hashes(
            entries
                .iter()
                .flat_map(|e| [&e.prompt_hash, &e.output_hash]),
        )
    }

    pub fn export_json(&self) -> Result<String> {
        let trail = ExportedTrail {
            engine_version: verisci_core::VERSION.to_string(),
            entries: self.list(),
        };
        Ok(serde_json::to_string_pretty(&trail)?)
    }

    pub fn import_json(json: &str) -> Result<Self> {
        let trail: ExportedTrail = serde_json::from_str(json)?;
        Self::from_entries(trail.entries)
    }
}

/// Step ids are strictly increasing, so the vector is sorted by id.
fn find(entries: &[AuditEntry], step_id: StepId) -> Option<usize> {
    entries.binary_search_by_key(&step_id, |e| e.step_id).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn step(milestone: Milestone, prompt: &str, output: &str) -> NewStep {
        NewStep {
            milestone,
            action: "test".into(),
            model: "m".into(),
            seed: 42,
            temperature: 0.0,
            prompt: prompt.into(),
            output: output.into(),
        }
    }

    #[test]
    fn append_assigns_increasing_ids_and_hashes() {
        let log = AuditLog::new();
        let a = log.append(step(Milestone::Ideation, "p1", "o1"));
        let b = log.append(step(Milestone::Ideation, "p2", "o2"));
        assert_eq!(a.step_id, StepId::new(1));
        assert_eq!(b.step_id, StepId::new(2));
        assert_eq!(a.prompt_hash, hash_str("p1"));
        assert_eq!(b.output_hash, hash_str("o2"));
        assert_eq!(a.verified, VerifyStatus::Unverified);
    }

    #[test]
    fn get_and_not_found() {
        let log = AuditLog::new();
        log.append(step(Milestone::Design, "p", "o"));
        assert_eq!(log.get(StepId::new(1)).unwrap().milestone, Milestone::Design);
        assert!(matches!(
            log.get(StepId::new(9)),
            Err(AuditError::NotFound(id)) if id == StepId::new(9)
        ));
    }

    #[test]
    fn mark_verified_overwrites() {
        let log = AuditLog::new();
        log.append(step(Milestone::Writing, "p", "o"));
        let id = StepId::new(1);
        log.mark_verified(id, VerifyStatus::Mismatched).unwrap();
        assert_eq!(log.get(id).unwrap().verified, VerifyStatus::Mismatched);
        log.mark_verified(id, VerifyStatus::Verified).unwrap();
        assert_eq!(log.get(id).unwrap().verified, VerifyStatus::Verified);
        assert!(log.mark_verified(StepId::new(2), VerifyStatus::Verified).is_err());
    }

    #[test]
    fn from_entries_rejects_reordering() {
        let log = AuditLog::new();
        log.append(step(Milestone::Ideation, "a", "b"));
        log.append(step(Milestone::Ideation, "c", "d"));
        let mut entries = log.list();
        entries.swap(0, 1);
        assert!(matches!(
            AuditLog::from_entries(entries),
            Err(AuditError::OutOfOrder { .. })
        ));
    }

    #[test]
    fn from_entries_rejects_last_possible_id() {
        let log = AuditLog::new();
        log.append(step(Milestone::Ideation, "a", "b"));
        let mut entries = log.list();
        entries[0].step_id = StepId::new(u64::MAX);
        assert!(matches!(
            AuditLog::from_entries(entries),
            Err(AuditError::IdsExhausted(id)) if id == StepId::new(u64::MAX)
        ));
    }

    #[test]
    fn integrity_report_flags_edited_text() {
        let log = AuditLog::new();
        log.append(step(Milestone::Ideation, "a", "b"));
        log.append(step(Milestone::Ideation, "c", "d"));
        assert!(log.integrity_report().is_empty());

        let mut entries = log.list();
        entries[1].output.push('!');
        let edited = AuditLog::from_entries(entries).unwrap();
        let issues = edited.integrity_report();
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].step_id, StepId::new(2));
        assert!(issues[0].prompt_ok);
        assert!(!issues[0].output_ok);
    }

    #[test]
    fn root_hash_tracks_content() {
        let a = AuditLog::new();
        let b = AuditLog::new();
        a.append(step(Milestone::Ideation, "p", "o"));
        b.append(step(Milestone::Ideation, "p", "o"));
        assert_eq!(a.root_hash(), b.root_hash());
        b.append(step(Milestone::Design, "p2", "o2"));
        assert_ne!(a.root_hash(), b.root_hash());
    }

    #[test]
    fn counts_by_milestone() {
        let log = AuditLog::new();
        log.append(step(Milestone::Ideation, "a", "b"));
        log.append(step(Milestone::Ideation, "a", "b"));
        log.append(step(Milestone::Analysis, "a", "b"));
        let counts = log.count_by_milestone();
        assert_eq!(counts.get(&Milestone::Ideation), Some(&2));
        assert_eq!(counts.get(&Milestone::Analysis), Some(&1));
        assert_eq!(counts.get(&Milestone::Design), None);
    }
}

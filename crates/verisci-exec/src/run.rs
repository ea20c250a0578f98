//! Run state: program, progress record, and audit log of one pipeline run.

use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use verisci_audit::{AuditEntry, AuditLog};
use verisci_core::id::{RunId, StepId};
use verisci_core::manifest::RunManifest;
use verisci_core::milestone::Milestone;
use verisci_core::time::now_millis;
use verisci_planner::ResearchProgram;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", content = "milestone", rename_all = "snake_case")]
pub enum RunStatus {
    NotStarted,
    Running(Milestone),
    Completed,
    Failed,
}

impl RunStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, RunStatus::Completed | RunStatus::Failed)
    }
}

impl std::fmt::Display for RunStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RunStatus::NotStarted => f.write_str("not_started"),
            RunStatus::Running(m) => write!(f, "running({m})"),
            RunStatus::Completed => f.write_str("completed"),
            RunStatus::Failed => f.write_str("failed"),
        }
    }
}

/// What a milestone produced.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MilestoneArtifact {
    Ideation {
        hypotheses: Vec<String>,
        titles: Vec<String>,
        scores: Vec<f64>,
        scores_parsed: bool,
        selected: usize,
    },
    Design {
        design: String,
        code: String,
    },
    Analysis {
        results: Value,
        analysis: String,
    },
    Writing {
        abstract_text: String,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MilestoneResult {
    pub milestone: Milestone,
    /// Audit steps that produced this result, in call order.
    pub step_ids: Vec<StepId>,
    pub artifact: MilestoneArtifact,
}

#[derive(Debug)]
struct RunProgress {
    status: RunStatus,
    current_milestone: usize,
    milestones: Vec<MilestoneResult>,
    error: Option<String>,
    manifest: Option<RunManifest>,
    started_ms: u64,
}

/// One end-to-end execution of the pipeline for a fixed program.
#[derive(Debug)]
pub struct PipelineRun {
    id: RunId,
    program: ResearchProgram,
    audit: Arc<AuditLog>,
    progress: RwLock<RunProgress>,
}

impl PipelineRun {
    pub fn new(program: ResearchProgram) -> Self {
        Self {
            id: RunId::random(),
            program,
            audit: Arc::new(AuditLog::new()),
            progress: RwLock::new(RunProgress {
                status: RunStatus::NotStarted,
                current_milestone: 0,
                milestones: Vec::new(),
                error: None,
                manifest: None,
                started_ms: 0,
            }),
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, RunProgress> {
        self.progress.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, RunProgress> {
        self.progress.write().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn id(&self) -> RunId {
        self.id
    }

    pub fn program(&self) -> &ResearchProgram {
        &self.program
    }

    pub fn audit(&self) -> &Arc<AuditLog> {
        &self.audit
    }

    pub fn status(&self) -> RunStatus {
        self.read().status
    }

    pub fn current_milestone(&self) -> usize {
        self.read().current_milestone
    }

    pub fn manifest(&self) -> Option<RunManifest> {
        self.read().manifest.clone()
    }

    pub fn error(&self) -> Option<String> {
        self.read().error.clone()
    }

    pub fn milestones(&self) -> Vec<MilestoneResult> {
        self.read().milestones.clone()
    }

    pub fn started_ms(&self) -> u64 {
        self.read().started_ms
    }

    /// NotStarted → Running(Ideation). Returns false if the run already left
    /// NotStarted.
    pub(crate) fn begin(&self) -> bool {
        let mut p = self.write();
        if p.status != RunStatus::NotStarted {
            return false;
        }
        p.status = RunStatus::Running(Milestone::Ideation);
        p.current_milestone = Milestone::Ideation.index();
        p.started_ms = now_millis();
        true
    }

    pub(crate) fn enter(&self, milestone: Milestone) {
        let mut p = self.write();
        p.status = RunStatus::Running(milestone);
        p.current_milestone = milestone.index();
    }

    pub(crate) fn record(&self, result: MilestoneResult) {
        self.write().milestones.push(result);
    }

    pub(crate) fn complete(&self, manifest: RunManifest) {
        let mut p = self.write();
        p.status = RunStatus::Completed;
        p.current_milestone = Milestone::ALL.len();
        p.manifest = Some(manifest);
    }

    /// Absorbing: a failed run never changes state again.
    pub(crate) fn fail(&self, error: String) {
        let mut p = self.write();
        if p.status.is_terminal() {
            return;
        }
        p.status = RunStatus::Failed;
        p.error = Some(error);
    }

    /// Consistent view for the status facade.
    pub fn snapshot(&self) -> RunSnapshot {
        let (status, current_milestone, milestones, error, manifest) = {
            let p = self.read();
            (
                p.status,
                p.current_milestone,
                p.milestones.clone(),
                p.error.clone(),
                p.manifest.clone(),
            )
        };
        let audit_log = self.audit.list();
        RunSnapshot {
            run_id: self.id,
            topic: self.program.topic.clone(),
            seed: self.program.seed,
            model: self.program.model.clone(),
            status,
            current_milestone,
            completed_milestones: milestones.iter().map(|m| m.milestone).collect(),
            milestones,
            error,
            steps_completed: audit_log.len(),
            audit_log,
            manifest,
        }
    }
}

/// Everything the outside world may read about a run.
#[derive(Debug, Clone, Serialize)]
pub struct RunSnapshot {
    pub run_id: RunId,
    pub topic: String,
    pub seed: u64,
    pub model: String,
    pub status: RunStatus,
    /// Index into the four milestones; 4 once the run has completed.
    pub current_milestone: usize,
    pub completed_milestones: Vec<Milestone>,
    pub milestones: Vec<MilestoneResult>,
    pub error: Option<String>,
    pub steps_completed: usize,
    pub audit_log: Vec<AuditEntry>,
    pub manifest: Option<RunManifest>,
}

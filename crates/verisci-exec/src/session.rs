//! Session registry: the status facade over pipeline runs.
//!
//! Each session holds at most one run. Starting a run spawns a named worker
//! thread that drives the pipeline; status, audit and verify calls read the
//! shared run state from any thread while it progresses.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};
use std::thread::{self, JoinHandle};

use verisci_audit::AuditEntry;
use verisci_core::id::{SessionId, StepId};
use verisci_core::time::now_millis;
use verisci_infer::InferenceClient;
use verisci_planner::ResearchProgram;

use crate::error::ExecError;
use crate::pipeline::{MilestoneObserver, Pipeline};
use crate::run::{PipelineRun, RunSnapshot, RunStatus};
use crate::verifier::{VerificationReport, Verifier};

/// Handle to a run and its worker thread. Cheap to clone.
#[derive(Debug, Clone)]
pub struct RunHandle {
    run: Arc<PipelineRun>,
    worker: Arc<Mutex<Option<JoinHandle<()>>>>,
}

impl RunHandle {
    pub fn run(&self) -> &Arc<PipelineRun> {
        &self.run
    }

    /// Block until the worker exits and return the final status. Later calls
    /// (from any clone) return immediately.
    pub fn wait(&self) -> RunStatus {
        let handle = lock(&self.worker).take();
        if let Some(h) = handle {
            if h.join().is_err() {
                tracing::error!(run = %self.run.id(), "pipeline worker panicked");
            }
        }
        self.run.status()
    }
}

struct Session {
    id: SessionId,
    created_ms: u64,
    current: Mutex<Option<RunHandle>>,
}

/// Marks the run failed if the worker unwinds before the pipeline settles it.
struct PanicGuard<'a>(&'a PipelineRun);

impl Drop for PanicGuard<'_> {
    fn drop(&mut self) {
        if thread::panicking() {
            self.0.fail("pipeline worker panicked".to_string());
        }
    }
}

pub struct SessionRegistry {
    client: Arc<dyn InferenceClient>,
    observer: Option<Arc<dyn MilestoneObserver>>,
    sessions: RwLock<HashMap<SessionId, Arc<Session>>>,
}

impl SessionRegistry {
    pub fn new(client: Arc<dyn InferenceClient>) -> Self {
        Self {
            client,
            observer: None,
            sessions: RwLock::new(HashMap::new()),
        }
    }

    pub fn with_observer(mut self, observer: Arc<dyn MilestoneObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    pub fn create_session(&self) -> SessionId {
        let id = SessionId::random();
        let session = Arc::new(Session {
            id,
            created_ms: now_millis(),
            current: Mutex::new(None),
        });
        self.sessions
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id, session);
        tracing::debug!(session = %id, "session created");
        id
    }

    fn session(&self, id: SessionId) -> Result<Arc<Session>, ExecError> {
        self.sessions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&id)
            .cloned()
            .ok_or(ExecError::UnknownSession(id))
    }

    fn current(&self, id: SessionId) -> Result<RunHandle, ExecError> {
        let session = self.session(id)?;
        let current = lock(&session.current).clone();
        current.ok_or(ExecError::NoRun(id))
    }

    /// Start a run for `program`. The run is `Running(Ideation)` by the time
    /// this returns. Rejected while the session's previous run is running.
    pub fn start(&self, id: SessionId, program: ResearchProgram) -> Result<RunHandle, ExecError> {
        program.validate()?;
        let session = self.session(id)?;

        // Held across the spawn so two concurrent starts cannot both pass.
        let mut current = lock(&session.current);
        if let Some(prev) = current.as_ref() {
            if !prev.run.status().is_terminal() {
                return Err(ExecError::RunActive(prev.run.id()));
            }
        }

        let run = Arc::new(PipelineRun::new(program));
        run.begin();

        let mut pipeline = Pipeline::new(Arc::clone(&self.client));
        if let Some(obs) = &self.observer {
            pipeline = pipeline.with_observer(Arc::clone(obs));
        }
        let worker_run = Arc::clone(&run);
        let worker = thread::Builder::new()
            .name(format!("verisci-run-{}", &run.id().to_string()[..8]))
            .spawn(move || {
                let _guard = PanicGuard(&worker_run);
                // Failures are already recorded on the run and logged.
                let _ = pipeline.drive(&worker_run);
            })
            .map_err(|e| {
                run.fail(format!("spawn failed: {e}"));
                ExecError::Spawn(e.to_string())
            })?;

        tracing::info!(
            session = %session.id,
            run = %run.id(),
            session_age_ms = now_millis().saturating_sub(session.created_ms),
            "run started"
        );
        let handle = RunHandle {
            run,
            worker: Arc::new(Mutex::new(Some(worker))),
        };
        *current = Some(handle.clone());
        Ok(handle)
    }

    pub fn status(&self, id: SessionId) -> Result<RunSnapshot, ExecError> {
        Ok(self.current(id)?.run.snapshot())
    }

    pub fn audit(&self, id: SessionId) -> Result<Vec<AuditEntry>, ExecError> {
        Ok(self.current(id)?.run.audit().list())
    }

    /// Re-execute one logged step of the session's current run.
    pub fn verify(&self, id: SessionId, step: StepId) -> Result<VerificationReport, ExecError> {
        let handle = self.current(id)?;
        let verifier = Verifier::new(Arc::clone(&self.client));
        Ok(verifier.verify(handle.run.audit(), step)?)
    }

    pub fn run(&self, id: SessionId) -> Result<RunHandle, ExecError> {
        self.current(id)
    }
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

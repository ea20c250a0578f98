//! Re-execution verification against complete pipeline trails.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Condvar, Mutex};
use std::time::Duration;

use verisci_audit::{AuditLog, VerifyStatus};
use verisci_core::id::StepId;
use verisci_core::milestone::Milestone;
use verisci_exec::{replay_log, Pipeline, PipelineRun, RunStatus, SessionRegistry, VerifyError, Verifier};
use verisci_infer::{BackendError, CompletionRequest, DeterministicBackend, InferenceClient};
use verisci_planner::ResearchProgram;

/// Blocks exactly one call (1-based) until released; every other call passes.
struct HoldOneCall {
    inner: DeterministicBackend,
    hold: u64,
    calls: AtomicU64,
    released: Mutex<bool>,
    cv: Condvar,
}

impl HoldOneCall {
    fn at(hold: u64) -> Arc<Self> {
        Arc::new(Self {
            inner: DeterministicBackend::new(),
            hold,
            calls: AtomicU64::new(0),
            released: Mutex::new(false),
            cv: Condvar::new(),
        })
    }

    fn release(&self) {
        *self.released.lock().unwrap() = true;
        self.cv.notify_all();
    }

    fn wait_until_held(&self) {
        for _ in 0..500 {
            if self.calls.load(Ordering::SeqCst) >= self.hold {
                return;
            }
            std::thread::sleep(Duration::from_millis(2));
        }
        panic!("held call was never issued");
    }
}

impl InferenceClient for HoldOneCall {
    fn complete(&self, req: &CompletionRequest) -> Result<String, BackendError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        if call == self.hold {
            let mut released = self.released.lock().unwrap();
            while !*released {
                released = self.cv.wait(released).unwrap();
            }
        }
        self.inner.complete(req)
    }
}

fn completed_run(backend: &DeterministicBackend) -> PipelineRun {
    let run = PipelineRun::new(ResearchProgram::new("X", 42, "test-model"));
    Pipeline::new(Arc::new(backend.clone()))
        .execute(&run)
        .unwrap();
    run
}

#[test]
fn every_step_reproduces_repeatedly() {
    let backend = DeterministicBackend::new();
    let run = completed_run(&backend);
    let verifier = Verifier::new(Arc::new(backend));

    for _ in 0..3 {
        for e in run.audit().list() {
            let r = verifier.verify(run.audit(), e.step_id).unwrap();
            assert!(r.matched, "{}", e.step_id);
            assert_eq!(r.recomputed_hash, e.output_hash);
            assert_eq!(r.prompt_hash, e.prompt_hash);
            assert!(r.prompt_intact);
            assert_eq!(r.milestone, e.milestone);
        }
    }
    assert!(run
        .audit()
        .list()
        .iter()
        .all(|e| e.verified == VerifyStatus::Verified));
}

#[test]
fn fresh_backend_instance_reproduces_exported_trail() {
    let run = completed_run(&DeterministicBackend::new());
    let json = run.audit().export_json().unwrap();

    let imported = AuditLog::import_json(&json).unwrap();
    let summary = replay_log(&Verifier::new(Arc::new(DeterministicBackend::new())), &imported).unwrap();
    assert_eq!(summary.total, 8);
    assert!(summary.all_matched());
}

#[test]
fn tampered_prompt_is_caught() {
    let run = completed_run(&DeterministicBackend::new());
    let mut trail: serde_json::Value =
        serde_json::from_str(&run.audit().export_json().unwrap()).unwrap();
    trail["entries"][4]["prompt"] = serde_json::Value::String("Design something else.".into());

    let log = AuditLog::import_json(&trail.to_string()).unwrap();
    let issues = log.integrity_report();
    assert_eq!(issues.len(), 1);
    assert_eq!(issues[0].step_id, StepId::new(5));
    assert!(!issues[0].prompt_ok);
    assert!(issues[0].output_ok);

    let verifier = Verifier::new(Arc::new(DeterministicBackend::new()));
    let r = verifier.verify(&log, StepId::new(5)).unwrap();
    assert!(!r.matched);
    assert_ne!(r.original_hash, r.recomputed_hash);
    assert_eq!(log.get(StepId::new(5)).unwrap().verified, VerifyStatus::Mismatched);

    let summary = replay_log(&verifier, &log).unwrap();
    assert_eq!(summary.mismatched, vec![StepId::new(5)]);
    assert!(!summary.all_matched());
}

#[test]
fn whitespace_edit_to_prompt_is_caught_when_output_ignores_it() {
    let backend =
        DeterministicBackend::new().with_responder(|req| format!("answer:{}", req.prompt.trim_end()));
    let run = completed_run(&backend);
    let mut trail: serde_json::Value =
        serde_json::from_str(&run.audit().export_json().unwrap()).unwrap();
    let edited = format!("{}   ", trail["entries"][4]["prompt"].as_str().unwrap());
    trail["entries"][4]["prompt"] = serde_json::Value::String(edited);

    let log = AuditLog::import_json(&trail.to_string()).unwrap();
    assert_eq!(log.integrity_report().len(), 1);

    let r = Verifier::new(Arc::new(backend)).verify(&log, StepId::new(5)).unwrap();
    assert_eq!(r.recomputed_hash, r.original_hash);
    assert!(!r.prompt_intact);
    assert!(!r.matched);
    assert_eq!(log.get(StepId::new(5)).unwrap().verified, VerifyStatus::Mismatched);
}

#[test]
fn unknown_step_is_not_found_and_log_unchanged() {
    let backend = DeterministicBackend::new();
    let run = completed_run(&backend);
    let before = run.audit().export_json().unwrap();
    let calls = backend.calls();

    let verifier = Verifier::new(Arc::new(backend.clone()));
    match verifier.verify(run.audit(), StepId::new(99)) {
        Err(VerifyError::NotFound(id)) => assert_eq!(id, StepId::new(99)),
        other => panic!("expected NotFound, got {other:?}"),
    }
    assert_eq!(run.audit().export_json().unwrap(), before);
    assert_eq!(backend.calls(), calls);
}

#[test]
fn nondeterministic_backend_is_flagged() {
    let backend = DeterministicBackend::new().with_drift();
    let run = completed_run(&backend);
    let verifier = Verifier::new(Arc::new(backend));
    let r = verifier.verify(run.audit(), StepId::new(1)).unwrap();
    assert!(!r.matched);
    assert_eq!(run.audit().get(StepId::new(1)).unwrap().verified, VerifyStatus::Mismatched);
}

#[test]
fn latest_check_wins() {
    let backend = DeterministicBackend::new();
    let run = completed_run(&backend);
    let step = StepId::new(2);

    Verifier::new(Arc::new(DeterministicBackend::new().with_drift()))
        .verify(run.audit(), step)
        .unwrap();
    assert_eq!(run.audit().get(step).unwrap().verified, VerifyStatus::Mismatched);

    Verifier::new(Arc::new(backend))
        .verify(run.audit(), step)
        .unwrap();
    assert_eq!(run.audit().get(step).unwrap().verified, VerifyStatus::Verified);
}

#[test]
fn verification_runs_alongside_readers() {
    let backend = DeterministicBackend::new();
    let run = Arc::new(completed_run(&backend));
    let verifier = Verifier::new(Arc::new(backend));

    std::thread::scope(|s| {
        for t in 0..4u64 {
            let run = Arc::clone(&run);
            let verifier = verifier.clone();
            s.spawn(move || {
                for i in 1..=8 {
                    let step = StepId::new((i + t) % 8 + 1);
                    assert!(verifier.verify(run.audit(), step).unwrap().matched);
                    assert_eq!(run.audit().len(), 8);
                }
            });
        }
    });
}

#[test]
fn verification_during_an_active_run() {
    // Call 5 is the first Design call; the worker blocks there with 4 entries logged.
    let backend = HoldOneCall::at(5);
    let reg = SessionRegistry::new(backend.clone());
    let session = reg.create_session();
    let handle = reg.start(session, ResearchProgram::new("X", 42, "test-model")).unwrap();
    backend.wait_until_held();

    assert_eq!(reg.status(session).unwrap().status, RunStatus::Running(Milestone::Design));
    assert_eq!(handle.run().audit().len(), 4);

    let report = reg.verify(session, StepId::new(1)).unwrap();
    assert!(report.matched);
    let independent = Verifier::new(Arc::new(DeterministicBackend::new()))
        .verify(handle.run().audit(), StepId::new(2))
        .unwrap();
    assert!(independent.matched);
    assert_eq!(handle.run().audit().len(), 4);

    backend.release();
    assert_eq!(handle.wait(), RunStatus::Completed);

    let log = reg.audit(session).unwrap();
    assert_eq!(log.len(), 8);
    assert!(log.windows(2).all(|w| w[0].step_id < w[1].step_id));
    assert_eq!(log[0].verified, VerifyStatus::Verified);
    assert_eq!(log[1].verified, VerifyStatus::Verified);
    assert_eq!(log[2].verified, VerifyStatus::Unverified);
}

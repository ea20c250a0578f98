//! Pipeline: drive one run through its four milestones.
//!
//! Every backend call is issued with the run's model and seed at temperature
//! zero, and is appended to the audit log before the next call is built. A
//! failed call moves the run to `Failed`; nothing after it is attempted.

use std::sync::Arc;
use std::time::Instant;

use verisci_audit::NewStep;
use verisci_core::id::{RunId, StepId};
use verisci_core::manifest::RunManifest;
use verisci_core::milestone::Milestone;
use verisci_infer::{CompletionRequest, InferenceClient};
use verisci_planner::prompts::{self, actions};
use verisci_planner::{declared_results, select_from_ranking, NUM_HYPOTHESES};

use crate::error::PipelineError;
use crate::metrics::emit_span;
use crate::replay::build_manifest;
use crate::run::{MilestoneArtifact, MilestoneResult, PipelineRun, RunStatus};

/// Progress callbacks. Called on the thread executing the run.
pub trait MilestoneObserver: Send + Sync {
    fn milestone_started(&self, run: RunId, milestone: Milestone);

    fn run_finished(&self, _run: RunId, _status: &RunStatus) {}
}

#[derive(Clone)]
pub struct Pipeline {
    client: Arc<dyn InferenceClient>,
    observer: Option<Arc<dyn MilestoneObserver>>,
}

impl Pipeline {
    pub fn new(client: Arc<dyn InferenceClient>) -> Self {
        Self {
            client,
            observer: None,
        }
    }

    pub fn with_observer(mut self, observer: Arc<dyn MilestoneObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    /// Run all milestones to completion (or first failure).
    ///
    /// Only a `NotStarted` run is accepted; the transition out of it is taken
    /// under the run's lock, so one run is never driven twice.
    pub fn execute(&self, run: &PipelineRun) -> Result<RunManifest, PipelineError> {
        if !run.begin() {
            return Err(PipelineError::NotRunnable {
                run: run.id(),
                state: run.status().to_string(),
            });
        }
        self.drive(run)
    }

    /// Drive a run this caller has already moved to `Running(Ideation)`.
    pub(crate) fn drive(&self, run: &PipelineRun) -> Result<RunManifest, PipelineError> {
        tracing::info!(
            run = %run.id(),
            topic = %run.program().topic,
            model = %run.program().model,
            seed = run.program().seed,
            backend = self.client.name(),
            "pipeline started"
        );
        let started = Instant::now();

        let result = self.run_milestones(run);
        match &result {
            Ok(manifest) => {
                run.complete(manifest.clone());
                tracing::info!(
                    run = %run.id(),
                    steps = manifest.total_steps,
                    audit_root = ?manifest.audit_root.map(|h| h.short()),
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "pipeline completed"
                );
            }
            Err(e) => {
                run.fail(e.to_string());
                tracing::error!(run = %run.id(), error = %e, "pipeline failed");
            }
        }
        if let Some(obs) = &self.observer {
            obs.run_finished(run.id(), &run.status());
        }
        result
    }

    fn run_milestones(&self, run: &PipelineRun) -> Result<RunManifest, PipelineError> {
        let topic = run.program().topic.clone();

        // M1: three hypotheses, then one ranking call over all of them.
        self.enter(run, Milestone::Ideation);
        let mut hypotheses = Vec::with_capacity(NUM_HYPOTHESES);
        let mut titles: Vec<String> = Vec::with_capacity(NUM_HYPOTHESES);
        let mut step_ids = Vec::with_capacity(NUM_HYPOTHESES + 1);
        for i in 0..NUM_HYPOTHESES {
            let prompt = prompts::hypothesis(&topic, i, NUM_HYPOTHESES, &titles);
            let (step, out) = self.call(run, Milestone::Ideation, actions::GENERATE_HYPOTHESIS, prompt)?;
            step_ids.push(step);
            titles.push(prompts::hypothesis_title(&out));
            hypotheses.push(out);
        }
        let (step, ranking) = self.call(
            run,
            Milestone::Ideation,
            actions::RANK_NOVELTY,
            prompts::novelty_ranking(&topic, &hypotheses),
        )?;
        step_ids.push(step);
        let selection = select_from_ranking(&ranking, hypotheses.len());
        let selected = hypotheses[selection.index].clone();
        tracing::info!(
            run = %run.id(),
            selected = selection.index,
            title = %titles[selection.index],
            scores = ?selection.scores,
            "hypothesis selected"
        );
        run.record(MilestoneResult {
            milestone: Milestone::Ideation,
            step_ids,
            artifact: MilestoneArtifact::Ideation {
                hypotheses,
                titles,
                scores: selection.scores,
                scores_parsed: selection.parsed,
                selected: selection.index,
            },
        });

        // M2: design, then code that embeds the design.
        self.enter(run, Milestone::Design);
        let (s1, design) = self.call(
            run,
            Milestone::Design,
            actions::DESIGN_EXPERIMENT,
            prompts::experiment_design(&topic, &selected),
        )?;
        let (s2, code) = self.call(
            run,
            Milestone::Design,
            actions::GENERATE_CODE,
            prompts::implementation(&design),
        )?;
        run.record(MilestoneResult {
            milestone: Milestone::Design,
            step_ids: vec![s1, s2],
            artifact: MilestoneArtifact::Design {
                design: design.clone(),
                code,
            },
        });

        // M3: analysis over the declared results.
        self.enter(run, Milestone::Analysis);
        let results = declared_results();
        let (s3, analysis) = self.call(
            run,
            Milestone::Analysis,
            actions::ANALYZE_RESULTS,
            prompts::analysis(&selected, &design, &results),
        )?;
        run.record(MilestoneResult {
            milestone: Milestone::Analysis,
            step_ids: vec![s3],
            artifact: MilestoneArtifact::Analysis {
                results: results.clone(),
                analysis: analysis.clone(),
            },
        });

        // M4: abstract.
        self.enter(run, Milestone::Writing);
        let (s4, abstract_text) = self.call(
            run,
            Milestone::Writing,
            actions::WRITE_ABSTRACT,
            prompts::write_abstract(&topic, &selected, &design, &results, &analysis),
        )?;
        run.record(MilestoneResult {
            milestone: Milestone::Writing,
            step_ids: vec![s4],
            artifact: MilestoneArtifact::Writing { abstract_text },
        });

        Ok(build_manifest(run))
    }

    fn enter(&self, run: &PipelineRun, milestone: Milestone) {
        run.enter(milestone);
        tracing::info!(run = %run.id(), milestone = %milestone, "milestone started");
        if let Some(obs) = &self.observer {
            obs.milestone_started(run.id(), milestone);
        }
    }

    /// Issue one call and log it. Returns the new step id and the output.
    fn call(
        &self,
        run: &PipelineRun,
        milestone: Milestone,
        action: &'static str,
        prompt: String,
    ) -> Result<(StepId, String), PipelineError> {
        let program = run.program();
        let req = CompletionRequest::deterministic(program.model.clone(), prompt, program.seed);
        let started = Instant::now();

        let output = self.client.complete(&req).map_err(|source| PipelineError::Backend {
            milestone,
            action,
            step: StepId::new(run.audit().len() as u64 + 1),
            source,
        })?;

        let entry = run.audit().append(NewStep {
            milestone,
            action: action.to_string(),
            model: req.model,
            seed: req.seed,
            temperature: req.temperature,
            prompt: req.prompt,
            output,
        });
        emit_span(
            "call",
            &[
                ("step", entry.step_id.to_string()),
                ("action", action.to_string()),
                ("latency_ms", started.elapsed().as_millis().to_string()),
                ("output_hash", entry.output_hash.short()),
            ],
        );
        Ok((entry.step_id, entry.output))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use verisci_infer::DeterministicBackend;
    use verisci_planner::ResearchProgram;

    fn program() -> ResearchProgram {
        ResearchProgram::new("Efficient attention for long sequences", 42, "test-model")
    }

    #[test]
    fn completes_with_eight_steps() {
        let backend = DeterministicBackend::new();
        let run = PipelineRun::new(program());
        let manifest = Pipeline::new(Arc::new(backend.clone())).execute(&run).unwrap();

        assert_eq!(run.status(), RunStatus::Completed);
        assert_eq!(run.current_milestone(), 4);
        assert_eq!(run.audit().len(), 8);
        assert_eq!(backend.calls(), 8);
        assert_eq!(manifest.total_steps, 8);
        assert_eq!(manifest.audit_root, Some(run.audit().root_hash()));
        assert_eq!(run.milestones().len(), 4);
    }

    #[test]
    fn code_prompt_embeds_design_output() {
        let run = PipelineRun::new(program());
        Pipeline::new(Arc::new(DeterministicBackend::new()))
            .execute(&run)
            .unwrap();
        let log = run.audit().list();
        assert_eq!(log[5].action, actions::GENERATE_CODE);
        assert!(log[5].prompt.contains(&log[4].output));
    }

    #[test]
    fn failure_stops_the_run() {
        let backend = DeterministicBackend::new().fail_on_call(5);
        let run = PipelineRun::new(program());
        let err = Pipeline::new(Arc::new(backend.clone())).execute(&run).unwrap_err();

        match err {
            PipelineError::Backend {
                milestone, step, ..
            } => {
                assert_eq!(milestone, Milestone::Design);
                assert_eq!(step, StepId::new(5));
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(run.status(), RunStatus::Failed);
        assert!(run.error().is_some());
        assert_eq!(run.audit().len(), 4);
        assert_eq!(backend.calls(), 5);
        assert!(run.manifest().is_none());
    }

    #[test]
    fn terminal_run_is_not_rerun() {
        let run = PipelineRun::new(program());
        let pipeline = Pipeline::new(Arc::new(DeterministicBackend::new()));
        pipeline.execute(&run).unwrap();
        assert!(matches!(
            pipeline.execute(&run),
            Err(PipelineError::NotRunnable { .. })
        ));
        assert_eq!(run.audit().len(), 8);
    }

    #[test]
    fn begun_run_is_not_runnable_from_outside() {
        let run = PipelineRun::new(program());
        assert!(run.begin());
        let err = Pipeline::new(Arc::new(DeterministicBackend::new()))
            .execute(&run)
            .unwrap_err();
        assert!(matches!(err, PipelineError::NotRunnable { .. }));
        assert!(run.audit().is_empty());
        assert_eq!(run.status(), RunStatus::Running(Milestone::Ideation));
    }

    struct Recorder(Mutex<Vec<Milestone>>);

    impl MilestoneObserver for Recorder {
        fn milestone_started(&self, _run: RunId, milestone: Milestone) {
            self.0.lock().unwrap().push(milestone);
        }
    }

    #[test]
    fn observer_sees_milestones_in_order() {
        let rec = Arc::new(Recorder(Mutex::new(Vec::new())));
        let run = PipelineRun::new(program());
        Pipeline::new(Arc::new(DeterministicBackend::new()))
            .with_observer(rec.clone())
            .execute(&run)
            .unwrap();
        assert_eq!(*rec.0.lock().unwrap(), Milestone::ALL.to_vec());
    }
}

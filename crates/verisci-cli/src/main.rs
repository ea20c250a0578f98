//! verisci CLI: run, verify, and explain research pipelines.

use clap::{Parser, Subcommand};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use verisci_audit::AuditLog;
use verisci_core::config::ScientistConfig;
use verisci_core::id::StepId;
use verisci_exec::{replay_log, RunSnapshot, RunStatus, SessionRegistry, Verifier};
use verisci_infer::build_client_from_config;
use verisci_planner::{call_plan, parse_yaml_program, ResearchProgram};

#[derive(Parser)]
#[command(name = "verisci")]
#[command(about = "Verifiable research pipeline: every inference step is logged and re-executable", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the four-milestone pipeline
    Run {
        /// Path to a research program YAML file
        #[arg(short, long, conflicts_with = "topic", required_unless_present = "topic")]
        program: Option<PathBuf>,

        /// Research topic (instead of a program file)
        #[arg(short, long)]
        topic: Option<String>,

        /// Seed (overrides program and environment)
        #[arg(long)]
        seed: Option<u64>,

        /// Model identifier (overrides program and environment)
        #[arg(long)]
        model: Option<String>,

        /// Backend endpoint, e.g. http://localhost:8080 or memory://
        #[arg(long)]
        endpoint: Option<String>,

        /// Write the audit trail as JSON to this file
        #[arg(long)]
        audit_out: Option<PathBuf>,

        /// Re-execute every step after the run completes
        #[arg(long)]
        verify: bool,
    },

    /// Re-execute steps of an exported audit trail
    Verify {
        /// Audit trail JSON written by `run --audit-out`
        #[arg(short, long)]
        audit: PathBuf,

        /// Step to verify
        #[arg(long, conflicts_with = "all", required_unless_present = "all")]
        step: Option<StepId>,

        /// Verify every step
        #[arg(long)]
        all: bool,

        /// Backend endpoint (overrides environment)
        #[arg(long)]
        endpoint: Option<String>,
    },

    /// Show the call plan for a program
    Explain {
        /// Path to a research program YAML file
        #[arg(short, long)]
        program: PathBuf,
    },
}

fn main() {
    init_tracing();
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Run {
            program,
            topic,
            seed,
            model,
            endpoint,
            audit_out,
            verify,
        } => run_pipeline(
            program.as_deref(),
            topic,
            seed,
            model,
            endpoint,
            audit_out.as_deref(),
            verify,
        ),
        Commands::Verify {
            audit,
            step,
            all,
            endpoint,
        } => verify_audit(&audit, if all { None } else { step }, endpoint),
        Commands::Explain { program } => explain_program(&program),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Flags override the program file, which overrides the environment.
fn resolve_program(
    cfg: &ScientistConfig,
    program_yaml: Option<&str>,
    topic: Option<String>,
    seed: Option<u64>,
    model: Option<String>,
) -> Result<ResearchProgram, Box<dyn std::error::Error>> {
    let mut program = match (program_yaml, topic) {
        (Some(src), _) => parse_yaml_program(src, cfg)?,
        (None, Some(topic)) => ResearchProgram::from_config(topic, cfg),
        (None, None) => return Err("either --program or --topic is required".into()),
    };
    if let Some(seed) = seed {
        program.seed = seed;
    }
    if let Some(model) = model {
        program.model = model;
    }
    program.validate()?;
    Ok(program)
}

fn config_with_endpoint(endpoint: Option<String>) -> ScientistConfig {
    let mut cfg = ScientistConfig::from_env();
    if let Some(endpoint) = endpoint {
        cfg.endpoint = endpoint;
    }
    cfg
}

fn run_pipeline(
    program_path: Option<&Path>,
    topic: Option<String>,
    seed: Option<u64>,
    model: Option<String>,
    endpoint: Option<String>,
    audit_out: Option<&Path>,
    verify: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let cfg = config_with_endpoint(endpoint);
    let yaml = program_path.map(fs::read_to_string).transpose()?;
    let program = resolve_program(&cfg, yaml.as_deref(), topic, seed, model)?;

    let client = build_client_from_config(&cfg.inference_config())?;
    let registry = SessionRegistry::new(Arc::clone(&client));
    let session = registry.create_session();
    let handle = registry.start(session, program)?;
    let status = handle.wait();
    let snapshot = registry.status(session)?;

    if let Some(path) = audit_out {
        fs::write(path, handle.run().audit().export_json()?)?;
        println!("  Audit trail: {}", path.display());
    }

    if status != RunStatus::Completed {
        let cause = snapshot.error.unwrap_or_else(|| status.to_string());
        return Err(format!(
            "run {} failed after {} step(s): {}",
            snapshot.run_id, snapshot.steps_completed, cause
        )
        .into());
    }

    print!("{}", render_summary(&snapshot)?);

    if verify {
        let summary = replay_log(&Verifier::new(client), handle.run().audit())?;
        println!(
            "  Verification: {}/{} step(s) reproduced",
            summary.matched, summary.total
        );
        if !summary.all_matched() {
            return Err(format!("steps did not reproduce: {:?}", summary.mismatched).into());
        }
    }

    Ok(())
}

fn render_summary(snapshot: &RunSnapshot) -> Result<String, Box<dyn std::error::Error>> {
    use std::fmt::Write as _;

    let mut out = String::new();
    writeln!(out, "✓ Pipeline completed")?;
    writeln!(out, "  Run: {}", snapshot.run_id)?;
    writeln!(out, "  Topic: {}", snapshot.topic)?;
    writeln!(out, "  Model: {} (seed {})", snapshot.model, snapshot.seed)?;
    writeln!(out, "  Steps: {}", snapshot.steps_completed)?;
    for entry in &snapshot.audit_log {
        writeln!(
            out,
            "    {} {:<12} {:<20} output {}",
            entry.step_id,
            entry.milestone.to_string(),
            entry.action,
            entry.output_hash.short()
        )?;
    }
    if let Some(last) = snapshot.audit_log.last() {
        writeln!(out, "  Abstract: {}", last.output_preview())?;
    }
    if let Some(manifest) = &snapshot.manifest {
        writeln!(out, "  Duration: {} ms", manifest.duration_ms())?;
        writeln!(out, "  Manifest:")?;
        writeln!(out, "{}", serde_json::to_string_pretty(manifest)?)?;
    }
    Ok(out)
}

fn verify_audit(
    audit_path: &Path,
    step: Option<StepId>,
    endpoint: Option<String>,
) -> Result<(), Box<dyn std::error::Error>> {
    let json = fs::read_to_string(audit_path)?;
    let log = AuditLog::import_json(&json)?;

    let issues = log.integrity_report();
    for issue in &issues {
        tracing::warn!(
            step = %issue.step_id,
            prompt_ok = issue.prompt_ok,
            output_ok = issue.output_ok,
            "stored text does not match its recorded digest"
        );
    }

    let cfg = config_with_endpoint(endpoint);
    let verifier = Verifier::new(build_client_from_config(&cfg.inference_config())?);

    let mismatched = match step {
        Some(step) => {
            let report = verifier.verify(&log, step)?;
            println!("{}", serde_json::to_string_pretty(&report)?);
            if report.matched {
                Vec::new()
            } else {
                vec![step]
            }
        }
        None => {
            let summary = replay_log(&verifier, &log)?;
            println!("{}", serde_json::to_string_pretty(&summary.reports)?);
            println!(
                "{}/{} step(s) reproduced",
                summary.matched, summary.total
            );
            summary.mismatched
        }
    };

    if !issues.is_empty() {
        return Err(format!("{} entr(ies) fail their integrity check", issues.len()).into());
    }
    if !mismatched.is_empty() {
        return Err(format!("steps did not reproduce: {:?}", mismatched).into());
    }
    println!("✓ Verified");
    Ok(())
}

fn explain_program(program_path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let cfg = ScientistConfig::from_env();
    let yaml = fs::read_to_string(program_path)?;
    let program = parse_yaml_program(&yaml, &cfg)?;

    println!("Research Pipeline Plan");
    println!("======================");
    println!();
    println!("Topic: {}", program.topic);
    println!("Model: {}", program.model);
    println!("Seed: {}", program.seed);
    println!("Program hash: {}", program.program_hash());
    println!("Endpoint: {}", cfg.endpoint);
    println!();
    println!("Calls (temperature 0, each logged before the next):");
    for call in call_plan() {
        println!(
            "  {}. {:<12} {}",
            call.step,
            call.milestone.to_string(),
            call.action
        );
    }

    Ok(())
}

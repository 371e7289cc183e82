// crates/nexacli/src/main.rs

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use nexacore::{load_global_parameters, ExecutionEvent, Workflow};
use nexaruntime::backends::render_pipeline;
use nexaruntime::{BackendKind, Runner, RuntimeConfig};
use std::collections::HashSet;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "nexa")]
#[command(about = "Nexa workflow executor", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Execute a workflow file
    Run {
        /// Path to workflow JSON file
        workflow: PathBuf,

        /// Simulation file whose `parameters` override module defaults
        #[arg(short, long)]
        simulation: Option<PathBuf>,

        /// Execution backend (local, pipeline or remote)
        #[arg(short, long, default_value = "local")]
        backend: String,

        /// Working directory for outputs and generated files
        #[arg(short, long, default_value = "nexa_run")]
        workdir: PathBuf,

        /// Run up to this many independent modules at once (default: one at a time)
        #[arg(short, long)]
        jobs: Option<usize>,

        /// Command used to launch the pipeline engine
        #[arg(long, default_value = "nextflow")]
        engine: String,

        /// Show verbose output
        #[arg(short, long)]
        verbose: bool,
    },

    /// Validate a workflow file
    Validate {
        /// Path to workflow JSON file
        workflow: PathBuf,
    },

    /// Print the pipeline script for a workflow without running it
    Generate {
        /// Path to workflow JSON file
        workflow: PathBuf,

        #[arg(short, long)]
        simulation: Option<PathBuf>,

        /// Working directory the script will refer to
        #[arg(short, long, default_value = "nexa_run")]
        workdir: PathBuf,

        /// Write the script here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .try_init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            workflow,
            simulation,
            backend,
            workdir,
            jobs,
            engine,
            verbose,
        } => {
            init_logging(verbose);

            let mut config = RuntimeConfig::default()
                .with_workdir(workdir)
                .with_engine(engine);
            if let Some(jobs) = jobs {
                config = config.with_max_parallel(jobs);
            }

            run_workflow(workflow, simulation, &backend, config).await?;
        }

        Commands::Validate { workflow } => {
            init_logging(false);
            validate_workflow(workflow)?;
        }

        Commands::Generate {
            workflow,
            simulation,
            workdir,
            output,
        } => {
            init_logging(false);
            generate_pipeline(workflow, simulation, workdir, output)?;
        }
    }

    Ok(())
}

async fn run_workflow(
    file: PathBuf,
    simulation: Option<PathBuf>,
    backend: &str,
    config: RuntimeConfig,
) -> Result<()> {
    // Reject unknown backends before touching anything
    let kind: BackendKind = backend.parse().with_context(|| {
        let names: Vec<&str> = BackendKind::ALL.iter().map(BackendKind::name).collect();
        format!("Choose a backend from: {}", names.join(", "))
    })?;

    println!("🚀 Loading workflow from: {}", file.display());
    let runner = Runner::load(&file, simulation.as_deref())
        .with_context(|| format!("Failed to load workflow {}", file.display()))?
        .configure(config);

    println!("📋 Workflow: {}", runner.workflow().id);
    println!("   Modules: {}", runner.workflow().modules.len());
    println!("   Connections: {}", runner.workflow().connections.len());
    println!("   Global parameters: {}", runner.parameters().len());
    println!("   Backend: {}", kind);
    println!("   Parallel modules: {}", runner.config().max_parallel_modules);
    println!();

    let mut events = runner.subscribe_events();
    let event_task = tokio::spawn(async move {
        while let Ok(event) = events.recv().await {
            print_event(event);
        }
    });

    let result = runner.run_with(kind, None).await;

    // Wait for events to finish printing
    tokio::time::sleep(tokio::time::Duration::from_millis(100)).await;
    event_task.abort();

    let report = result?;

    println!();
    println!("📊 Execution Summary:");
    println!("   Execution ID: {}", report.execution_id);
    println!("   Backend: {}", report.backend);
    println!("   Working directory: {}", report.workdir.display());
    println!("   Duration: {}ms", report.duration_ms);

    Ok(())
}

fn print_event(event: ExecutionEvent) {
    match event {
        ExecutionEvent::WorkflowStarted {
            workflow_id,
            backend,
            ..
        } => {
            println!("▶️  Workflow {} started ({} backend)", workflow_id, backend);
        }
        ExecutionEvent::ModuleStarted { module_id, .. } => {
            println!("  ⚡ Starting module: {}", module_id);
        }
        ExecutionEvent::ModuleCompleted {
            module_id,
            duration_ms,
            ..
        } => {
            println!("  ✅ Module {} completed in {}ms", module_id, duration_ms);
        }
        ExecutionEvent::ModuleFailed { module_id, .. } => {
            println!("  ❌ Module {} failed", module_id);
        }
        ExecutionEvent::ScriptGenerated { path, .. } => {
            println!("  📝 Pipeline script: {}", path.display());
        }
        ExecutionEvent::SubmissionRecorded { workflow_id, .. } => {
            println!("  📮 Remote submission recorded for {}", workflow_id);
        }
        ExecutionEvent::WorkflowCompleted {
            success,
            duration_ms,
            ..
        } => {
            if success {
                println!("✨ Workflow completed successfully in {}ms", duration_ms);
            } else {
                println!("💥 Workflow failed after {}ms", duration_ms);
            }
        }
    }
}

fn validate_workflow(file: PathBuf) -> Result<()> {
    println!("🔍 Validating workflow: {}", file.display());

    let workflow = Workflow::from_file(&file)?;
    let order = workflow.execution_order()?;
    tracing::debug!("Execution order for '{}': {:?}", workflow.id, order);

    let mut problems = 0;
    for module in &workflow.modules {
        match module.resolve_script_path() {
            Ok(Some(script)) => println!("  ✅ {} → {}", module.id, script.display()),
            Ok(None) => println!("  ⚠️  {}: no script declared", module.id),
            Err(e) => {
                problems += 1;
                println!("  ❌ {}", e);
            }
        }
    }

    // Undeclared ports are allowed, they only fail once a module runs
    for conn in &workflow.connections {
        let declared_output = workflow
            .module(&conn.from.module)
            .map(|m| m.output_ports.iter().any(|p| *p == conn.from.output))
            .unwrap_or(false);
        if !declared_output {
            println!(
                "  ⚠️  {} does not declare output port '{}'",
                conn.from.module, conn.from.output
            );
        }
        let declared_input = workflow
            .module(&conn.to.module)
            .map(|m| m.input_ports.iter().any(|p| *p == conn.to.input))
            .unwrap_or(false);
        if !declared_input {
            println!(
                "  ⚠️  {} does not declare input port '{}'",
                conn.to.module, conn.to.input
            );
        }
    }

    if problems > 0 {
        anyhow::bail!("{} module(s) failed validation", problems);
    }

    let distinct: HashSet<&str> = workflow.modules.iter().map(|m| m.id.as_str()).collect();
    println!("✅ Workflow is valid:");
    println!("   ID: {}", workflow.id);
    println!("   Modules: {}", distinct.len());
    println!("   Connections: {}", workflow.connections.len());
    println!("   Execution order: {}", order.join(" → "));

    Ok(())
}

fn generate_pipeline(
    file: PathBuf,
    simulation: Option<PathBuf>,
    workdir: PathBuf,
    output: Option<PathBuf>,
) -> Result<()> {
    let workflow = Workflow::from_file(&file)?;
    let parameters = load_global_parameters(simulation.as_deref())?;
    let script = render_pipeline(&workdir, &workflow, &parameters)?;

    match output {
        Some(output) => {
            std::fs::write(&output, script)?;
            println!("✨ Wrote pipeline script: {}", output.display());
        }
        None => print!("{}", script),
    }

    Ok(())
}

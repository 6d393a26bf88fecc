// src/lib.rs

pub mod bower;
pub mod cli;
pub mod config;
pub mod context;
pub mod dag;
pub mod engine;
pub mod entry;
pub mod errors;
pub mod exec;
pub mod logging;
pub mod paths;
pub mod pipeline;
pub mod server;
pub mod tasks;
pub mod types;
pub mod watch;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::cli::CliArgs;
use crate::config::{ConfigFile, default_config_path, load_or_default};
use crate::context::BuildContext;
use crate::dag::{DagGraph, RunReport, Scheduler};
use crate::engine::{CoreRuntime, Runtime, RuntimeEvent};
use crate::entry::Entry;
use crate::errors::PipelineError;
use crate::exec::RealExecutorBackend;
use crate::server::{ServerProfile, start_reload_server};
use crate::tasks::TaskRegistry;
use crate::types::BuildMode;

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - config loading and the task catalogue
/// - the build context (mode, live reload)
/// - scheduler / queue / runtime and the executor
/// - the entry's server and watchers
/// - Ctrl-C handling
pub async fn run(args: CliArgs) -> Result<()> {
    let root = PathBuf::from(&args.root);
    let config_path = args
        .config
        .as_ref()
        .map(PathBuf::from)
        .unwrap_or_else(|| root.join(default_config_path()));
    let cfg = load_or_default(&config_path)
        .with_context(|| format!("loading {}", config_path.display()))?;

    let registry = TaskRegistry::builtin();
    let graph = registry.graph()?;
    let entry = Entry::parse(&args.task, &registry)?;

    if args.dry_run {
        print_dry_run(&cfg, &graph, &entry);
        return Ok(());
    }

    let mode = if args.production {
        BuildMode::Production
    } else {
        entry.mode()
    };
    info!(entry = %entry, %mode, root = %root.display(), "starting");

    let mut ctx = BuildContext::new(&root, cfg, mode);
    let reload_port = if entry.is_live() {
        let (handle, port) = start_reload_server(ctx.config.server.reload_port)
            .context("starting the live reload server")?;
        ctx = ctx.with_reload(handle);
        Some(port)
    } else {
        None
    };
    let ctx = Arc::new(ctx);

    // Runtime event channel.
    let (rt_tx, rt_rx) = mpsc::channel::<RuntimeEvent>(64);

    let executor = RealExecutorBackend::new(rt_tx.clone(), Arc::new(registry), Arc::clone(&ctx));

    // Ctrl-C → graceful shutdown.
    {
        let tx = rt_tx.clone();
        tokio::spawn(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                eprintln!("failed to listen for Ctrl+C: {e}");
                return;
            }
            let _ = tx.send(RuntimeEvent::ShutdownRequested).await;
        });
    }

    let core = CoreRuntime::new(
        Scheduler::new(graph),
        ctx.config.config.triggered_while_running_behaviour,
        ctx.config.config.queue_length,
    );
    let mut runtime = Runtime::new(core, rt_rx, executor);

    let reports = runtime.run_sequence(&entry.groups()).await?;

    match entry {
        Entry::Task(_) | Entry::Default => ensure_success(&reports),
        Entry::Serve => {
            if let Err(err) = ensure_success(&reports) {
                warn!(error = %err, "initial build failed; serving anyway");
            }
            let _server = server::start(&ServerProfile::development(&ctx), &ctx, reload_port).await?;
            let _watcher = watch::spawn_watcher(
                &ctx.root,
                watch::serve_rules(&ctx)?,
                rt_tx.clone(),
                ctx.reload.clone(),
            )?;
            runtime.run().await?;
            Ok(())
        }
        Entry::ServeDist => {
            ensure_success(&reports)?;
            let _server = server::start(&ServerProfile::distribution(&ctx), &ctx, None).await?;
            runtime.run().await?;
            Ok(())
        }
        Entry::ServeTest => {
            ensure_success(&reports)?;
            let _server = server::start(&ServerProfile::test_harness(&ctx), &ctx, reload_port).await?;
            let _watcher = watch::spawn_watcher(
                &ctx.root,
                watch::test_rules(&ctx)?,
                rt_tx.clone(),
                ctx.reload.clone(),
            )?;
            runtime.run().await?;
            Ok(())
        }
    }
}

/// Fail with the last report's summary unless every group succeeded.
fn ensure_success(reports: &[RunReport]) -> Result<()> {
    match reports.last() {
        Some(report) if !report.is_success() => Err(PipelineError::RunFailed {
            run_id: report.run_id,
            summary: report.failure_summary(),
        }
        .into()),
        _ => Ok(()),
    }
}

/// Print the task graph and the entry's sequence groups.
fn print_dry_run(cfg: &ConfigFile, graph: &DagGraph, entry: &Entry) {
    println!("assetdag dry-run");
    println!(
        "  config.triggered_while_running_behaviour = {:?}",
        cfg.config.triggered_while_running_behaviour
    );
    println!("  config.queue_length = {}", cfg.config.queue_length);
    println!();

    let mut tasks: Vec<&str> = graph.tasks().collect();
    tasks.sort_unstable();
    println!("tasks ({}):", tasks.len());
    for name in tasks {
        println!("  - {name}");
        let deps = graph.dependencies_of(name);
        if !deps.is_empty() {
            println!("      after: {deps:?}");
        }
    }
    println!();

    println!("entry {entry} ({}):", entry.mode());
    for (i, group) in entry.groups().iter().enumerate() {
        println!("  {}. {}", i + 1, group.join(", "));
    }
    println!("entries: {}", Entry::NAMES.join(", "));

    debug!("dry-run complete (no execution)");
}

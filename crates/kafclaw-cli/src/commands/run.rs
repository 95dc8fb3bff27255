//! `kafclaw run` — the default command: wire every collaborator over one
//! storage backend, drive the Agent Loop, Scheduler, Delivery Worker, and
//! Sub-agent dispatcher as background tasks, and bridge stdin/stdout as
//! the CLI's own channel adapter. Shut down gracefully on Ctrl-C (spec
//! §11 supplemental feature: a root [`CancellationToken`] cancels every
//! long-lived task, and the process joins all of them before exiting).

use std::sync::Arc;

use kafclaw_config::Config;
use kafclaw_scheduler::DeliveryWorker;
use tokio_util::sync::CancellationToken;

use crate::channel;
use crate::cli::RunArgs;
use crate::theme::{self, Theme};
use crate::wiring::{self, Wiring};

/// Run the agent over a stdin/stdout CLI channel until Ctrl-C.
pub(crate) async fn run(config: Config, workspace_root: std::path::PathBuf, args: RunArgs) -> anyhow::Result<()> {
    theme::print_banner();

    let model = args.model.clone().unwrap_or_else(|| config.model.model.clone());
    let llm = wiring::build_llm_provider(&args.provider);
    let backend = wiring::build_backend(&workspace_root, args.in_memory).await?;

    let Wiring {
        agent_loop,
        inbound,
        outbound,
        scheduler,
        delivery_sink,
        delivery_poll_interval,
        delivery_max_retry,
        cancel,
    } = wiring::assemble(&config, workspace_root, &args.agent_name, &model, llm, backend);

    println!("{}", Theme::info(&format!("agent \"{}\" ready (model: {model})", args.agent_name)));
    println!("{}", Theme::dimmed("Type a message and press Enter. Ctrl-C to exit."));
    println!();

    let mut handles = Vec::new();

    handles.push(tokio::spawn({
        let agent_loop = agent_loop.clone();
        let inbound = inbound.clone();
        async move {
            if let Err(e) = agent_loop.run(&inbound).await {
                tracing::warn!(error = %e, "agent loop exited");
            }
        }
    }));

    handles.push(tokio::spawn({
        let agent_loop = agent_loop.clone();
        async move { agent_loop.run_subagent_dispatcher().await }
    }));

    handles.push(tokio::spawn({
        let scheduler = scheduler.clone();
        let cancel = cancel.clone();
        async move { scheduler.run(&cancel).await }
    }));

    handles.push(tokio::spawn(run_delivery_worker(
        delivery_sink,
        delivery_poll_interval,
        delivery_max_retry,
        cancel.clone(),
    )));

    handles.push(tokio::spawn(channel::run_stdout_printer(outbound, cancel.clone())));

    let mut reader_handle = tokio::spawn(channel::run_stdin_reader(
        inbound,
        "owner".to_string(),
        "cli".to_string(),
        cancel.clone(),
    ));

    let reader_already_done = tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            println!("\n{}", Theme::info("shutting down..."));
            false
        }
        _ = &mut reader_handle => {
            println!("\n{}", Theme::info("stdin closed, shutting down..."));
            true
        }
    };

    cancel.cancel();
    if !reader_already_done {
        let _ = reader_handle.await;
    }
    for handle in handles {
        let _ = handle.await;
    }

    Ok(())
}

async fn run_delivery_worker(
    sink: Arc<kafclaw_runtime::TaskDeliverySink>,
    poll_interval: std::time::Duration,
    max_retry: u32,
    cancel: CancellationToken,
) {
    let worker = DeliveryWorker::with_max_retry(max_retry);
    let mut ticker = tokio::time::interval(poll_interval);
    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            _ = ticker.tick() => {
                if let Err(e) = worker.run_once(sink.as_ref(), chrono::Utc::now()).await {
                    tracing::warn!(error = %e, "delivery pass failed");
                }
            }
        }
    }
}

//! EventSync worker entry point.
//!
//! ```text
//! eventsync                 run the worker pool until Ctrl-C
//! eventsync dead-letters    list parked requests
//! eventsync resubmit <id>   move a dead letter back into the inbox
//! ```

use anyhow::{bail, Context};
use eventsync_infra::{config, init_tracing};
use eventsync_worker::AppContext;
use tracing::{debug, info, warn};

enum Command {
    Run,
    DeadLetters,
    Resubmit(String),
}

impl Command {
    fn parse(mut args: impl Iterator<Item = String>) -> anyhow::Result<Self> {
        match args.next().as_deref() {
            None | Some("run") => Ok(Self::Run),
            Some("dead-letters") => Ok(Self::DeadLetters),
            Some("resubmit") => match args.next() {
                Some(id) => Ok(Self::Resubmit(id)),
                None => bail!("usage: eventsync resubmit <message-id>"),
            },
            Some(other) => bail!("unknown command '{other}' (expected run, dead-letters or resubmit)"),
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let dotenv = dotenvy::dotenv();
    let config = config::load().context("failed to load configuration")?;
    init_tracing(&config.logging).context("failed to initialise logging")?;

    match dotenv {
        Ok(path) => info!(path = %path.display(), "loaded .env"),
        Err(e) if e.not_found() => debug!("no .env file"),
        Err(e) => warn!(error = %e, "could not load .env file"),
    }

    let command = Command::parse(std::env::args().skip(1))?;
    let context = AppContext::new(config).context("failed to build application context")?;

    match command {
        Command::Run => run(&context).await,
        Command::DeadLetters => list_dead_letters(&context).await,
        Command::Resubmit(id) => {
            context.dead_letters.resubmit(&id).await?;
            info!(message_id = %id, "dead letter resubmitted");
            Ok(())
        }
    }
}

async fn run(context: &AppContext) -> anyhow::Result<()> {
    let mut pool = context.worker_pool();
    pool.start()?;
    info!(
        workers = context.config.worker.workers,
        deployment = %context.config.calendar.deployment,
        "eventsync worker running"
    );

    tokio::signal::ctrl_c().await.context("failed to listen for Ctrl-C")?;
    info!("shutdown requested");
    pool.stop().await?;
    Ok(())
}

#[allow(clippy::print_stdout)]
async fn list_dead_letters(context: &AppContext) -> anyhow::Result<()> {
    let letters = context.dead_letters.list_dead_letters().await?;
    for letter in &letters {
        println!(
            "{}\t{}\t{}\t{}",
            letter.message.id,
            letter.failed_at.to_rfc3339(),
            letter.failure_kind,
            letter.failure_reason
        );
    }
    info!(count = letters.len(), "listed dead letters");
    Ok(())
}

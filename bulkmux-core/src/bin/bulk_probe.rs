// bulkmux-core/src/bin/bulk_probe.rs

use anyhow::{Context, Result, anyhow, bail};
use bulkmux_core::{BulkConfig, SessionId, SessionRegistry, Status};
use std::io::BufRead;
use std::sync::Arc;
use std::thread;

/// The reference driver: two static bulks, one explicit block, one abandoned block.
const SCRIPT: &[&str] = &[
    "cmd1", "cmd2", "cmd3", "", //
    "{", "cmd1", "cmd2", "cmd3", "", "}", //
    "{", "cmd2", "EOF",
];

const PRODUCERS: usize = 3;

fn main() -> Result<()> {
    // Batches go to stdout; diagnostics stay on stderr.
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .with_writer(std::io::stderr)
        .init();

    let mode = std::env::args().nth(1).unwrap_or_else(|| "demo".to_string());

    let registry = Arc::new(
        SessionRegistry::new(BulkConfig::from_env()).context("SessionRegistry::new failed")?,
    );

    if mode == "demo" {
        return run_demo(&registry);
    }

    let size: usize = mode
        .parse()
        .with_context(|| format!("expected `demo` or a bulk size, got {:?}", mode))?;
    run_stdin(&registry, size)
}

/// Three producer threads hammering their own sessions concurrently.
fn run_demo(registry: &Arc<SessionRegistry>) -> Result<()> {
    let mut producers = Vec::with_capacity(PRODUCERS);

    for n in 1..=PRODUCERS {
        let registry = Arc::clone(registry);
        let handle = thread::Builder::new()
            .name(format!("producer-{n}"))
            .spawn(move || run_script(&registry, n))
            .context("failed to spawn producer")?;
        producers.push(handle);
    }

    for handle in producers {
        handle
            .join()
            .map_err(|_| anyhow!("producer thread panicked"))??;
    }

    Ok(())
}

fn run_script(registry: &SessionRegistry, n: usize) -> Result<()> {
    let id = registry.connect(2)?;
    eprintln!("[bulk_probe] producer{n} context: {id}");

    for text in SCRIPT {
        expect_ok(registry.receive(id, *text), id)?;
    }

    expect_ok(registry.disconnect(id), id)?;
    eprintln!("[bulk_probe] producer{n} exit");
    Ok(())
}

/// Interactive mode: one session, one command per stdin line.
fn run_stdin(registry: &SessionRegistry, size: usize) -> Result<()> {
    let id = registry.connect(size)?;
    eprintln!("[bulk_probe] context {id} (bulk size {size}); Ctrl+D to finish");

    let stdin = std::io::stdin();
    for line in stdin.lock().lines() {
        let line = line.context("stdin read failed")?;
        expect_ok(registry.receive(id, line), id)?;
    }

    // stdin closed: drain whatever is still pooled.
    expect_ok(registry.disconnect(id), id)?;
    Ok(())
}

fn expect_ok(status: Status, id: SessionId) -> Result<()> {
    if !status.is_ok() {
        bail!("session {} rejected the call: {:?}", id, status);
    }
    Ok(())
}

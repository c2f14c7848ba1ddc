mod analyze;
mod cli;
mod config;
mod errors;
mod interpage;
mod markup;
mod parser;
mod pdg;
mod report;
mod storage;
mod taint;

use crate::config::{Limits, TaintConfig};
use crate::errors::TaintResult;
use clap::Parser;
use cli::Cli;
use console::style;
use std::time::Instant;
use tracing_subscriber::fmt::time;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter, Registry};

fn init_tracing() {
    let fmt_layer = fmt::layer()
        .pretty()
        .with_thread_ids(true)
        .with_timer(time::UtcTime::rfc_3339());

    Registry::default()
        .with(EnvFilter::from_default_env())
        .with(fmt_layer)
        .init();
}

fn main() -> TaintResult<()> {
    let now = Instant::now();
    init_tracing();

    tracing::debug!("CLI starting up");
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => TaintConfig::load(path)?,
        // no config: include all sources and sinks
        None => TaintConfig::default(),
    };
    let jobs = cli.jobs.unwrap_or_else(num_cpus::get).max(1);

    println!(
        "{} {} with {} worker(s)...\n",
        style("Analyzing").green().bold(),
        style(cli.input.display()).white().bold(),
        jobs
    );

    analyze::run(
        &cli.input,
        &cli.output,
        &config,
        Limits::default(),
        jobs,
        cli.bench,
    )?;

    println!(
        "{} in {:.3}s.",
        style("Finished").green().bold(),
        now.elapsed().as_secs_f32()
    );
    Ok(())
}

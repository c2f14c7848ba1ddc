use clap::Parser;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "minitaint")]
#[command(about = "A static taint-flow analyzer for mini-program packages")]
#[command(version)]
pub struct Cli {
    /// Path of input mini program(s).
    /// A single package directory or an index file (one directory per line) both work.
    #[arg(short, long, value_name = "path")]
    pub input: PathBuf,

    /// Path of output results. Written outside the package directories.
    #[arg(short, long, value_name = "path", default_value = "results")]
    pub output: PathBuf,

    /// Path of the JSON config file with "sources" / "sinks" arrays.
    /// Leave empty to include all results.
    #[arg(short, long, value_name = "path")]
    pub config: Option<PathBuf>,

    /// Number of workers (defaults to the number of CPUs).
    #[arg(short, long, value_name = "number")]
    pub jobs: Option<usize>,

    /// Enable benchmark data log.
    #[arg(short, long)]
    pub bench: bool,
}

#[test]
fn defaults_are_applied() {
    let cli = Cli::parse_from(["minitaint", "-i", "apps/demo"]);
    assert_eq!(cli.input, PathBuf::from("apps/demo"));
    assert_eq!(cli.output, PathBuf::from("results"));
    assert!(cli.config.is_none());
    assert!(cli.jobs.is_none());
    assert!(!cli.bench);
}

#[test]
fn all_flags_parse() {
    let cli = Cli::parse_from([
        "minitaint", "-i", "in", "-o", "out", "-c", "cfg.json", "-j", "4", "-b",
    ]);
    assert_eq!(cli.output, PathBuf::from("out"));
    assert_eq!(cli.config, Some(PathBuf::from("cfg.json")));
    assert_eq!(cli.jobs, Some(4));
    assert!(cli.bench);
}

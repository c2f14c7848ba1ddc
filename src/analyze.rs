//! Package scanning: page discovery, the per-page worker pool, and the
//! listener that owns the CSV sinks and the inter-page store.

use crate::config::{Deadline, Limits, TaintConfig};
use crate::errors::{TaintError, TaintResult};
use crate::interpage::resolve_inter_page_flows;
use crate::pdg::{build_pdg, empty_pdg, BuildOutcome};
use crate::report::{BenchWriter, InterPageWriter, ResultWriter};
use crate::storage::{filter_flows, InterPageStore, PageSummary, Storage};
use crate::{markup, parser, taint};
use crossbeam_channel::bounded;
use rayon::prelude::*;
use std::fs;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::thread;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tracing::{debug, error};

/// Entry point: a package directory, or an index file naming one package
/// directory per line.
pub fn run(
    input: &Path,
    output: &Path,
    config: &TaintConfig,
    limits: Limits,
    jobs: usize,
    bench: bool,
) -> TaintResult<()> {
    if input.is_file() {
        let index = fs::read_to_string(input)?;
        for line in index.lines() {
            let line = line.trim();
            if !line.is_empty() {
                analyze_package(Path::new(line), output, config, limits, jobs, bench)?;
            }
        }
        Ok(())
    } else if input.is_dir() {
        analyze_package(input, output, config, limits, jobs, bench)
    } else {
        Err(TaintError::Msg(format!(
            "invalid input path: {}",
            input.display()
        )))
    }
}

/// A page is valid iff both `<path>.js` and `<path>.wxml` exist under
/// `pages/`. Returned ids are `pages/`-relative, slash separated, sorted.
pub fn retrieve_pages(app_path: &Path) -> Vec<String> {
    let pages_dir = app_path.join("pages");
    let mut stems = Vec::new();
    collect_page_stems(&pages_dir, &pages_dir, &mut stems);
    stems.sort();
    stems.dedup();
    stems
        .into_iter()
        .filter(|stem| {
            pages_dir.join(format!("{stem}.js")).is_file()
                && pages_dir.join(format!("{stem}.wxml")).is_file()
        })
        .collect()
}

fn collect_page_stems(base: &Path, dir: &Path, out: &mut Vec<String>) {
    let Ok(entries) = fs::read_dir(dir) else {
        return;
    };
    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_dir() {
            collect_page_stems(base, &path, out);
        } else if path
            .extension()
            .is_some_and(|ext| ext == "js" || ext == "wxml")
        {
            let stem = path.with_extension("");
            if let Ok(rel) = stem.strip_prefix(base) {
                out.push(rel.to_string_lossy().replace('\\', "/"));
            }
        }
    }
}

pub fn analyze_package(
    app_path: &Path,
    results_path: &Path,
    config: &TaintConfig,
    limits: Limits,
    jobs: usize,
    bench: bool,
) -> TaintResult<()> {
    if !app_path.exists() {
        return Err(TaintError::Msg(format!(
            "invalid app path: {}",
            app_path.display()
        )));
    }
    let pages = retrieve_pages(app_path);
    if pages.is_empty() {
        println!("no page found in {}", app_path.display());
        return Ok(());
    }
    if results_path.is_file() {
        return Err(TaintError::Msg(format!(
            "invalid output path: {}",
            results_path.display()
        )));
    }
    fs::create_dir_all(results_path)?;
    let intermediate = results_path.join("intermediate-data");
    fs::create_dir_all(&intermediate)?;

    let base = app_path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "package".to_owned());
    let result_csv = results_path.join(format!("{base}-result.csv"));
    let inter_csv = results_path.join(format!("{base}-inter-page-result.csv"));
    let bench_csv = bench.then(|| results_path.join(format!("{base}-bench.csv")));

    let (tx, rx) = bounded::<PageSummary>(jobs * 4);

    // The listener owns the CSV writers and the inter-page store; workers
    // only ship summary records through the channel.
    let listener = thread::spawn(move || -> TaintResult<()> {
        let mut results_writer = ResultWriter::create(&result_csv)?;
        let mut store = InterPageStore::default();
        let mut bench_rows = Vec::new();
        for summary in rx {
            for flow in &summary.flows {
                results_writer.write_flow(&summary.page, flow)?;
            }
            store.add_page(&summary);
            bench_rows.push((summary.page.clone(), summary.started, summary.finished));
        }
        let mut inter_writer = InterPageWriter::create(&inter_csv)?;
        for flow in resolve_inter_page_flows(&store) {
            inter_writer.write_flow(&flow)?;
        }
        inter_writer.finish()?;
        if let Some(path) = bench_csv {
            bench_rows.sort();
            let mut bench_writer = BenchWriter::create(&path)?;
            for (page, start, end) in bench_rows {
                bench_writer.write_row(&page, start, end)?;
            }
            bench_writer.finish()?;
        }
        Ok(())
    });

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(jobs)
        .build()
        .map_err(|e| TaintError::Msg(e.to_string()))?;
    pool.install(|| {
        pages.par_iter().for_each(|page| {
            // A crashing page must not take the pool down with it.
            let summary = catch_unwind(AssertUnwindSafe(|| {
                analyze_page(app_path, page, &intermediate, config, limits)
            }))
            .unwrap_or_else(|_| {
                error!(target: "taint", page = %page, "page worker crashed, skipping");
                empty_summary(page)
            });
            let _ = tx.send(summary);
        });
    });
    drop(tx);

    listener
        .join()
        .map_err(|_| TaintError::Msg("listener thread panicked".to_owned()))??;
    Ok(())
}

fn epoch_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

fn empty_summary(page: &str) -> PageSummary {
    let now = epoch_secs();
    PageSummary {
        page: page.to_owned(),
        flows: Vec::new(),
        events: Vec::new(),
        started: now,
        finished: now,
        timed_out: false,
    }
}

/// Analyze one page: parse, build the PDG under its deadline, tag the
/// markup bindings, resolve taint, and filter by config. Every degradation
/// path lands on an empty graph rather than an error.
fn analyze_page(
    app_path: &Path,
    page: &str,
    intermediate: &Path,
    config: &TaintConfig,
    limits: Limits,
) -> PageSummary {
    let started = epoch_secs();
    let pages_dir = app_path.join("pages");
    let js = pages_dir.join(format!("{page}.js"));
    let wxml = pages_dir.join(format!("{page}.wxml"));
    let json_out: PathBuf = intermediate.join(format!("{}.json", page.replace('/', "_")));

    let deadline = Deadline::after(Duration::from_secs(limits.page_timeout_secs));
    let outcome = match parser::produce_ast(&js, &json_out) {
        Ok(doc) => {
            let program = parser::extract_program(&doc, &js.to_string_lossy());
            build_pdg(&program, limits, deadline)
        }
        Err(e) => {
            error!(target: "pdg", page = %page, "parsing failed: {e}");
            let (graph, root) = empty_pdg(limits);
            BuildOutcome {
                graph,
                root,
                timed_out: false,
            }
        }
    };

    let mut g = outcome.graph;
    let mut storage = Storage::new(page);
    markup::handle_markup(&mut g, outcome.root, &wxml);
    taint::handle_page(&mut g, outcome.root, &mut storage);
    debug!(
        target: "taint",
        page = %page,
        flows = storage.results.len(),
        events = storage.events.len(),
        "page analysis finished"
    );

    PageSummary {
        page: page.to_owned(),
        flows: filter_flows(storage.results, config),
        events: storage.events,
        started,
        finished: epoch_secs(),
        timed_out: outcome.timed_out,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_page(dir: &Path, name: &str) {
        let pages = dir.join("pages");
        fs::create_dir_all(pages.join(name).parent().unwrap()).unwrap();
        fs::write(pages.join(format!("{name}.js")), "Page({})").unwrap();
        fs::write(pages.join(format!("{name}.wxml")), "<view/>").unwrap();
    }

    #[test]
    fn pages_need_both_script_and_markup() {
        let tmp = tempfile::tempdir().unwrap();
        make_page(tmp.path(), "foo");
        fs::write(tmp.path().join("pages/only.js"), "Page({})").unwrap();
        let pages = retrieve_pages(tmp.path());
        assert_eq!(pages, vec!["foo"]);
    }

    #[test]
    fn nested_pages_keep_their_relative_path() {
        let tmp = tempfile::tempdir().unwrap();
        make_page(tmp.path(), "sub/bar");
        let pages = retrieve_pages(tmp.path());
        assert_eq!(pages, vec!["sub/bar"]);
    }

    #[test]
    fn empty_package_yields_empty_outputs() {
        let tmp = tempfile::tempdir().unwrap();
        let app = tmp.path().join("app");
        fs::create_dir_all(app.join("pages")).unwrap();
        let out = tmp.path().join("results");
        analyze_package(&app, &out, &TaintConfig::default(), Limits::default(), 1, false)
            .expect("no pages is not an error");
        assert!(!out.join("app-result.csv").exists(), "nothing to write");
    }

    #[test]
    fn unparseable_pages_degrade_to_empty_results() {
        let tmp = tempfile::tempdir().unwrap();
        let app = tmp.path().join("app");
        make_page(&app, "foo");
        let out = tmp.path().join("results");
        // force the parser to fail
        unsafe { std::env::set_var("MINITAINT_PARSER", "/nonexistent/parser.js") };
        let r = analyze_package(&app, &out, &TaintConfig::default(), Limits::default(), 1, true);
        unsafe { std::env::remove_var("MINITAINT_PARSER") };
        r.expect("parse failures degrade, not fail");

        let result = fs::read_to_string(out.join("app-result.csv")).unwrap();
        assert_eq!(result.trim(), "page_name|page_method|ident|source|sink");
        let inter = fs::read_to_string(out.join("app-inter-page-result.csv")).unwrap();
        assert_eq!(inter.trim(), "from_page|to_page|event_name|source|sink");
        let bench = fs::read_to_string(out.join("app-bench.csv")).unwrap();
        assert!(bench.starts_with("page|start|end"));
        assert!(bench.contains("foo|"));
    }

    #[test]
    fn output_path_must_not_be_a_file() {
        let tmp = tempfile::tempdir().unwrap();
        let app = tmp.path().join("app");
        make_page(&app, "foo");
        let out = tmp.path().join("results");
        fs::write(&out, "occupied").unwrap();
        let r = analyze_package(&app, &out, &TaintConfig::default(), Limits::default(), 1, false);
        assert!(r.is_err());
    }
}

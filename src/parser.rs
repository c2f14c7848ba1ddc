//! External parser collaborator: a subprocess that turns a page script into
//! an AST JSON document. Unreachable or failing parsers degrade the page to
//! an empty PDG upstream.

use crate::errors::{TaintError, TaintResult};
use serde_json::{Map, Value as Json};
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::debug;

/// Locate the parser driver script: `MINITAINT_PARSER` wins, then a
/// `parser.js` next to the executable, then the working directory.
fn parser_script() -> PathBuf {
    if let Ok(p) = std::env::var("MINITAINT_PARSER") {
        return PathBuf::from(p);
    }
    if let Ok(exe) = std::env::current_exe()
        && let Some(dir) = exe.parent()
    {
        let candidate = dir.join("parser.js");
        if candidate.exists() {
            return candidate;
        }
    }
    PathBuf::from("parser.js")
}

/// Run the parser on `input_file`, leaving the AST JSON at `json_path`, and
/// load the document.
pub fn produce_ast(input_file: &Path, json_path: &Path) -> TaintResult<Json> {
    let script = parser_script();
    debug!(target: "pdg", parser = %script.display(), input = %input_file.display(), "producing AST");

    let output = Command::new("node")
        .arg(&script)
        .arg(input_file)
        .arg(json_path)
        .output()
        .map_err(|e| TaintError::Parse(format!("{}: {e}", input_file.display())))?;
    if !output.status.success() {
        return Err(TaintError::Parse(input_file.display().to_string()));
    }

    let raw = fs::read_to_string(json_path)?;
    Ok(serde_json::from_str(&raw)?)
}

/// Reduce the parser document to the program itself: `type`, `body`, and the
/// originating filename. Tokens and comment lists never enter the graph.
pub fn extract_program(doc: &Json, filename: &str) -> Json {
    let mut out = Map::new();
    if let Some(t) = doc.get("type") {
        out.insert("type".to_owned(), t.clone());
    }
    if let Some(b) = doc.get("body") {
        out.insert("body".to_owned(), b.clone());
    }
    out.insert("filename".to_owned(), Json::String(filename.to_owned()));
    Json::Object(out)
}

#[test]
fn extract_program_drops_tokens_and_comments() {
    let doc = serde_json::json!({
        "type": "Program",
        "body": [],
        "sourceType": "script",
        "tokens": [{"type": "Identifier", "value": "x"}],
        "comments": [{"type": "Line", "value": "c"}]
    });
    let reduced = extract_program(&doc, "pages/a.js");
    assert_eq!(reduced.get("type").unwrap(), "Program");
    assert!(reduced.get("tokens").is_none());
    assert!(reduced.get("comments").is_none());
    assert_eq!(reduced.get("filename").unwrap(), "pages/a.js");
}

#[test]
fn missing_parser_is_a_parse_failure() {
    let dir = tempfile::tempdir().unwrap();
    let js = dir.path().join("page.js");
    fs::write(&js, "Page({})").unwrap();
    let json = dir.path().join("page.json");
    // point at a parser script that cannot exist
    unsafe { std::env::set_var("MINITAINT_PARSER", "/nonexistent/parser.js") };
    let out = produce_ast(&js, &json);
    unsafe { std::env::remove_var("MINITAINT_PARSER") };
    assert!(matches!(out, Err(TaintError::Parse(_))));
}

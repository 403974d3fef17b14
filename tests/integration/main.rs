//! Integration tests for Pyflow
//!
//! These tests run extraction, persistence, diff and contraction together
//! on a small on-disk Python project.

use std::fs;
use std::path::Path;
use std::process::Command;

use pyflow_core::{
    ADDITIONAL_SECTION, CODE_SECTION, DiffStatus, DiffSummary, EdgeKind, Graph, NodeKind,
    Provenance, build, contract, diff, export, get_dependent_nodes, init_overlay,
    recalculate_hashes, union,
};
use pyflow_indexer::{Coordinator, IndexConfig};
use tempfile::TempDir;

const MODELS: &str = "\
class User:
    def save(self):
        return store(self)

def store(obj):
    return obj
";

const SERVICE: &str = "\
from .models import User, store

def register(name):
    return store(User())
";

const APP: &str = "\
from pkg.service import register

register('x')
";

fn write_project(root: &Path) {
    for (path, content) in [
        ("pkg/__init__.py", ""),
        ("pkg/models.py", MODELS),
        ("pkg/service.py", SERVICE),
        ("app.py", APP),
    ] {
        let full = root.join(path);
        fs::create_dir_all(full.parent().unwrap()).unwrap();
        fs::write(full, content).unwrap();
    }
}

fn index(root: &Path) -> Graph {
    let (graph, _) = Coordinator::new(root, IndexConfig::default()).run_full_index().unwrap();
    graph
}

fn use_edges(graph: &Graph) -> Vec<String> {
    let mut lines: Vec<String> = graph
        .edges()
        .filter(|e| e.kind == EdgeKind::Use)
        .map(|e| format!("{} -> {} ({})", e.source, e.target, e.provenance))
        .collect();
    lines.sort();
    lines
}

#[test]
fn test_extract_export_build_round_trip() {
    let project = TempDir::new().unwrap();
    let workspace = TempDir::new().unwrap();
    write_project(project.path());

    let graph = index(project.path());
    assert_eq!(
        use_edges(&graph),
        vec![
            "app.py#body -> pkg/service.py#register (code)",
            "pkg/models.py#User -> pkg/models.py#store (code)",
            "pkg/service.py#register -> pkg/models.py#User (code)",
            "pkg/service.py#register -> pkg/models.py#store (code)",
        ]
    );

    let code_dir = workspace.path().join(CODE_SECTION);
    export(&graph, &code_dir).unwrap();
    let mut reloaded = build(&code_dir).unwrap();
    recalculate_hashes(&mut reloaded);

    let summary = DiffSummary::from_graph(&diff(&graph, &reloaded));
    assert!(summary.is_unchanged(), "round trip changed the graph: {summary}");
}

#[test]
fn test_edit_shows_up_in_diff() {
    let project = TempDir::new().unwrap();
    write_project(project.path());
    let before = index(project.path());

    fs::write(
        project.path().join("pkg/models.py"),
        MODELS.replace("return obj", "return [obj]"),
    )
    .unwrap();
    fs::write(project.path().join("pkg/extra.py"), "def extra():\n    pass\n").unwrap();
    let after = index(project.path());

    let changes = diff(&before, &after);
    let status = |id: &str| changes.node(id).and_then(|n| n.diff_status());

    assert_eq!(status("pkg/models.py#store"), Some(DiffStatus::Changed));
    assert_eq!(status("pkg/models.py#User"), Some(DiffStatus::Unchanged));
    assert_eq!(status("pkg/extra.py#extra"), Some(DiffStatus::New));
    assert_eq!(status("pkg"), Some(DiffStatus::Changed));
    assert_eq!(status("app.py"), Some(DiffStatus::Unchanged));

    let summary = DiffSummary::from_graph(&changes);
    assert_eq!(summary.new_nodes, 2);
    assert_eq!(summary.deleted_nodes, 0);
    assert_eq!(summary.new_edges, 2);
}

#[test]
fn test_overlay_union_then_contract() {
    let project = TempDir::new().unwrap();
    let workspace = TempDir::new().unwrap();
    write_project(project.path());

    let code_dir = workspace.path().join(CODE_SECTION);
    export(&index(project.path()), &code_dir).unwrap();
    let overlay = init_overlay(workspace.path()).unwrap();
    assert_eq!(overlay, workspace.path().join(ADDITIONAL_SECTION));

    fs::write(
        overlay.join("nodes.csv"),
        "id,name,type\n\
         domain,domain,arc_elem\n\
         api,api,arc_elem\n",
    )
    .unwrap();
    fs::write(
        overlay.join("edges.csv"),
        "src,dest,type\n\
         domain,pkg/models.py#User,contain\n\
         domain,pkg/models.py#store,contain\n\
         api,pkg/service.py#register,contain\n",
    )
    .unwrap();

    let mut merged = union(&code_dir, &overlay).unwrap();
    recalculate_hashes(&mut merged);
    assert_eq!(merged.node("domain").map(|n| n.provenance), Some(Provenance::Hand));
    assert!(merged.node("domain").is_some_and(|n| !n.hash.is_empty()));

    let contracted = contract(&merged, &["domain", "api"], false);
    assert!(!contracted.contains("pkg/models.py#User"));
    assert!(!contracted.contains("pkg/service.py#register"));
    assert_eq!(contracted.nodes_of_kind(NodeKind::ArchElement).count(), 2);
    assert_eq!(
        use_edges(&contracted),
        vec!["api -> domain (hand)", "app.py#body -> api (hand)"]
    );

    let dependents = get_dependent_nodes(&contracted, &["domain"], 0);
    assert!(dependents.contains("api"));
    assert!(dependents.contains("app.py#body"));
}

#[test]
fn test_cli_extract_and_filter() {
    let project = TempDir::new().unwrap();
    let workspace = TempDir::new().unwrap();
    write_project(project.path());

    let output = Command::new(env!("CARGO_BIN_EXE_pyflow"))
        .arg("extract")
        .arg(project.path())
        .arg("--output")
        .arg(workspace.path())
        .output()
        .expect("Failed to execute pyflow");
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    assert!(workspace.path().join("code/nodes.csv").is_file());
    assert!(workspace.path().join("additional/edges.csv").is_file());

    let filtered_dir = workspace.path().join("functions");
    let output = Command::new(env!("CARGO_BIN_EXE_pyflow"))
        .arg("filter")
        .arg(workspace.path().join("code"))
        .arg(&filtered_dir)
        .args(["--node-types", "func,class", "--edge-types", "use"])
        .output()
        .expect("Failed to execute pyflow");
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));

    let filtered = build(&filtered_dir).unwrap();
    assert!(filtered.nodes().all(|n| matches!(n.kind, NodeKind::Function | NodeKind::Class)));
    assert_eq!(filtered.node_count(), 3);
    assert_eq!(filtered.edge_count(), 3);

    let files_dir = workspace.path().join("files");
    let output = Command::new(env!("CARGO_BIN_EXE_pyflow"))
        .arg("filter")
        .arg(workspace.path().join("code"))
        .arg(&files_dir)
        .arg("--file-links")
        .output()
        .expect("Failed to execute pyflow");
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));

    let files = build(&files_dir).unwrap();
    assert_eq!(files.node_count(), 4);
    assert_eq!(
        use_edges(&files),
        vec!["app.py -> pkg/service.py (code)", "pkg/service.py -> pkg/models.py (code)"]
    );
}

#[test]
fn test_cli_rejects_unknown_subcommand() {
    let output = Command::new(env!("CARGO_BIN_EXE_pyflow"))
        .arg("serve")
        .output()
        .expect("Failed to execute pyflow");
    assert!(!output.status.success());
}

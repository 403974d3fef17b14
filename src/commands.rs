//! CLI command implementations

use std::path::Path;

use anyhow::Context;
use pyflow_core::{
    ADDITIONAL_SECTION, CODE_SECTION, DiffSummary, FilterSpec, Graph, UNION_SECTION,
    recalculate_hashes,
};
use pyflow_indexer::Coordinator;

#[derive(Debug, Clone, Copy)]
pub enum Walk {
    Used,
    Dependents,
}

pub fn extract(project: &Path, output: &Path) -> anyhow::Result<()> {
    tracing::info!("Extracting {}", project.display());

    let (graph, stats) = Coordinator::for_project(project)?
        .run_full_index()
        .with_context(|| format!("failed to index {}", project.display()))?;

    let code_dir = output.join(CODE_SECTION);
    pyflow_core::export(&graph, &code_dir)?;
    let overlay = pyflow_core::init_overlay(output)?;

    println!("{}", stats);
    println!("code graph: {}", code_dir.display());
    println!("overlay:    {}", overlay.display());
    Ok(())
}

pub fn union(workspace: &Path) -> anyhow::Result<()> {
    let mut graph = pyflow_core::union(
        &workspace.join(CODE_SECTION),
        &workspace.join(ADDITIONAL_SECTION),
    )
    .with_context(|| format!("failed to merge workspace {}", workspace.display()))?;
    recalculate_hashes(&mut graph);

    let out = workspace.join(UNION_SECTION);
    save(&graph, &out)
}

pub fn diff(old: &Path, new: &Path, out: &Path) -> anyhow::Result<()> {
    let old_graph = load(old)?;
    let new_graph = load(new)?;

    let result = pyflow_core::diff(&old_graph, &new_graph);
    let summary = DiffSummary::from_graph(&result);
    tracing::info!("Diff {} -> {}: {}", old.display(), new.display(), summary);

    pyflow_core::export_diff(&result, out)
        .with_context(|| format!("failed to write diff to {}", out.display()))?;
    println!("{}", summary);
    Ok(())
}

pub fn contract(
    graph_dir: &Path,
    out: &Path,
    elements: &[String],
    combine_remaining: bool,
) -> anyhow::Result<()> {
    let graph = load(graph_dir)?;
    let mut contracted = pyflow_core::contract(&graph, elements, combine_remaining);
    recalculate_hashes(&mut contracted);
    save(&contracted, out)
}

pub fn query(
    graph_dir: &Path,
    out: &Path,
    start_ids: &[String],
    depth: usize,
    walk: Walk,
) -> anyhow::Result<()> {
    let graph = load(graph_dir)?;
    let result = match walk {
        Walk::Used => pyflow_core::get_used_nodes(&graph, start_ids, depth),
        Walk::Dependents => pyflow_core::get_dependent_nodes(&graph, start_ids, depth),
    };
    save(&result, out)
}

pub fn filter(
    graph_dir: &Path,
    out: &Path,
    spec: &FilterSpec,
    file_links: bool,
) -> anyhow::Result<()> {
    let mut graph = load(graph_dir)?;
    if file_links {
        graph = pyflow_core::file_links(&graph);
    }
    let result = pyflow_core::filter(&graph, spec)?;
    save(&result, out)
}

pub fn rehash(graph_dir: &Path) -> anyhow::Result<()> {
    let mut graph = load(graph_dir)?;
    recalculate_hashes(&mut graph);
    save(&graph, graph_dir)
}

fn load(dir: &Path) -> anyhow::Result<Graph> {
    pyflow_core::build(dir).with_context(|| format!("failed to load graph from {}", dir.display()))
}

fn save(graph: &Graph, dir: &Path) -> anyhow::Result<()> {
    pyflow_core::export(graph, dir)
        .with_context(|| format!("failed to write graph to {}", dir.display()))?;
    println!(
        "{} nodes, {} edges -> {}",
        graph.node_count(),
        graph.edge_count(),
        dir.display()
    );
    Ok(())
}

//! Graph persistence as a pair of CSV tables
//!
//! A graph directory holds `nodes.csv` and `edges.csv`, each starting with a
//! header row. Columns are matched by header name, so hand-written tables may
//! leave optional columns out. Loading is resilient: a malformed row is
//! logged with its line number and skipped, everything else still loads. A
//! missing table is an error.

use std::fs::{self, File};
use std::path::{Path, PathBuf};

use csv::{ReaderBuilder, StringRecord, Trim, WriterBuilder};
use serde::{Deserialize, Serialize};

use crate::error::StoreError;
use crate::graph::Graph;
use crate::model::*;

pub const NODES_FILE: &str = "nodes.csv";
pub const EDGES_FILE: &str = "edges.csv";

/// Header of the nodes table, in [`NodeRow`] field order.
const NODE_COLUMNS: [&str; 6] = ["id", "name", "type", "hash", "source", "diff_status"];
/// Header of the edges table, in [`EdgeRow`] field order.
const EDGE_COLUMNS: [&str; 5] = ["src", "dest", "type", "source", "diff_status"];

/// Workspace section holding the extracted graph.
pub const CODE_SECTION: &str = "code";
/// Workspace section holding the hand-authored overlay.
pub const ADDITIONAL_SECTION: &str = "additional";
/// Workspace section holding code merged with the overlay.
pub const UNION_SECTION: &str = "union";

#[derive(Debug, Serialize, Deserialize)]
struct NodeRow {
    id: String,
    #[serde(default)]
    name: Option<String>,
    #[serde(rename = "type")]
    kind: NodeKind,
    #[serde(default)]
    hash: String,
    #[serde(default)]
    source: Option<Provenance>,
    #[serde(default)]
    diff_status: Option<DiffStatus>,
}

#[derive(Debug, Serialize, Deserialize)]
struct EdgeRow {
    src: String,
    dest: String,
    #[serde(rename = "type")]
    kind: EdgeKind,
    #[serde(default)]
    source: Option<Provenance>,
    #[serde(default)]
    diff_status: Option<DiffStatus>,
}

impl NodeRow {
    fn from_node(node: &GraphNode, with_status: bool) -> Self {
        NodeRow {
            id: node.id.clone(),
            name: Some(node.name.clone()),
            kind: node.kind,
            hash: node.hash.clone(),
            source: Some(node.provenance),
            diff_status: with_status.then(|| node.diff_status()).flatten(),
        }
    }

    fn into_node(self, default_provenance: Provenance) -> GraphNode {
        let name = self.name.unwrap_or_else(|| self.id.clone());
        let mut node = GraphNode::new(
            self.id,
            name,
            self.kind,
            self.source.unwrap_or(default_provenance),
        )
        .with_hash(self.hash);
        if let Some(status) = self.diff_status {
            node = node.with_diff_status(status);
        }
        node
    }
}

impl EdgeRow {
    fn from_edge(edge: &GraphEdge, with_status: bool) -> Self {
        EdgeRow {
            src: edge.source.clone(),
            dest: edge.target.clone(),
            kind: edge.kind,
            source: Some(edge.provenance),
            diff_status: with_status.then(|| edge.diff_status()).flatten(),
        }
    }

    fn into_edge(self, default_provenance: Provenance) -> GraphEdge {
        let mut edge = GraphEdge::new(
            self.src,
            self.dest,
            self.kind,
            self.source.unwrap_or(default_provenance),
        );
        if let Some(status) = self.diff_status {
            edge = edge.with_diff_status(status);
        }
        edge
    }
}

/// How table rows are interpreted while loading.
#[derive(Debug, Clone, Copy)]
struct LoadOptions {
    default_provenance: Provenance,
    require_status: bool,
}

const PLAIN: LoadOptions = LoadOptions {
    default_provenance: Provenance::Code,
    require_status: false,
};

const OVERLAY: LoadOptions = LoadOptions {
    default_provenance: Provenance::Hand,
    require_status: false,
};

const DIFF: LoadOptions = LoadOptions {
    default_provenance: Provenance::Code,
    require_status: true,
};

/// Persist a graph into `dir`, creating it if needed.
pub fn export(graph: &Graph, dir: &Path) -> Result<(), StoreError> {
    write_tables(graph, dir, false)
}

/// Persist a diff graph, keeping each row's `diff_status`.
pub fn export_diff(graph: &Graph, dir: &Path) -> Result<(), StoreError> {
    write_tables(graph, dir, true)
}

/// Load a graph previously written by [`export`].
pub fn build(dir: &Path) -> Result<Graph, StoreError> {
    let mut graph = Graph::new();
    load_into(&mut graph, dir, PLAIN)?;
    Ok(graph)
}

/// Load a graph previously written by [`export_diff`].
///
/// Rows without a `diff_status` are treated as malformed.
pub fn build_diff(dir: &Path) -> Result<Graph, StoreError> {
    let mut graph = Graph::new();
    load_into(&mut graph, dir, DIFF)?;
    Ok(graph)
}

/// Create the overlay section of `workspace` with header-only tables.
///
/// Existing overlay tables are left untouched.
pub fn init_overlay(workspace: &Path) -> Result<PathBuf, StoreError> {
    let dir = workspace.join(ADDITIONAL_SECTION);
    fs::create_dir_all(&dir).map_err(|e| StoreError::io(&dir, e))?;

    let nodes_path = dir.join(NODES_FILE);
    if !nodes_path.exists() {
        write_rows(&nodes_path, &NODE_COLUMNS, std::iter::empty::<NodeRow>())?;
    }
    let edges_path = dir.join(EDGES_FILE);
    if !edges_path.exists() {
        write_rows(&edges_path, &EDGE_COLUMNS, std::iter::empty::<EdgeRow>())?;
    }
    tracing::debug!("Overlay tables ready in {}", dir.display());
    Ok(dir)
}

/// Load the code graph and lay the hand-authored overlay on top of it.
///
/// Overlay nodes whose id already exists are skipped; overlay rows without a
/// `source` column are hand-authored.
pub fn union(code_dir: &Path, overlay_dir: &Path) -> Result<Graph, StoreError> {
    let mut graph = build(code_dir)?;
    let before = (graph.node_count(), graph.edge_count());
    load_into(&mut graph, overlay_dir, OVERLAY)?;
    tracing::info!(
        "Union added {} nodes and {} edges from {}",
        graph.node_count() - before.0,
        graph.edge_count() - before.1,
        overlay_dir.display()
    );
    Ok(graph)
}

fn write_tables(graph: &Graph, dir: &Path, with_status: bool) -> Result<(), StoreError> {
    fs::create_dir_all(dir).map_err(|e| StoreError::io(dir, e))?;

    write_rows(
        &dir.join(NODES_FILE),
        &NODE_COLUMNS,
        graph.nodes().map(|n| NodeRow::from_node(n, with_status)),
    )?;
    write_rows(
        &dir.join(EDGES_FILE),
        &EDGE_COLUMNS,
        graph.edges().map(|e| EdgeRow::from_edge(e, with_status)),
    )?;

    tracing::info!(
        "Saved {} nodes and {} edges to {}",
        graph.node_count(),
        graph.edge_count(),
        dir.display()
    );
    Ok(())
}

/// Write the header row, then one row per item.
fn write_rows<T: Serialize>(
    path: &Path,
    columns: &[&str],
    rows: impl Iterator<Item = T>,
) -> Result<(), StoreError> {
    let file = File::create(path).map_err(|e| StoreError::io(path, e))?;
    let mut writer = WriterBuilder::new().has_headers(false).from_writer(file);
    let encode = |source| StoreError::Encode {
        path: path.to_path_buf(),
        source,
    };

    writer.write_record(columns).map_err(encode)?;
    for row in rows {
        writer.serialize(row).map_err(encode)?;
    }
    writer.flush().map_err(|e| StoreError::io(path, e))
}

fn load_into(graph: &mut Graph, dir: &Path, options: LoadOptions) -> Result<(), StoreError> {
    let nodes_path = dir.join(NODES_FILE);
    for_each_row(&nodes_path, |line, row: NodeRow| {
        if options.require_status && row.diff_status.is_none() {
            tracing::warn!("{}:{}: missing diff_status, row skipped", nodes_path.display(), line);
            return;
        }
        let node = row.into_node(options.default_provenance);
        let id = node.id.clone();
        if !graph.add_node(node) {
            tracing::warn!("{}:{}: duplicate node id {}, row skipped", nodes_path.display(), line, id);
        }
    })?;

    let edges_path = dir.join(EDGES_FILE);
    for_each_row(&edges_path, |line, row: EdgeRow| {
        if options.require_status && row.diff_status.is_none() {
            tracing::warn!("{}:{}: missing diff_status, row skipped", edges_path.display(), line);
            return;
        }
        let edge = row.into_edge(options.default_provenance);
        let (src, dest) = (edge.source.clone(), edge.target.clone());
        if !graph.add_edge(edge) {
            tracing::warn!(
                "{}:{}: edge {} -> {} has a missing endpoint, row skipped",
                edges_path.display(),
                line,
                src,
                dest
            );
        }
    })
}

/// Decode every data row of a table by header name, skipping rows that fail
/// to parse. Blank lines are ignored and fields are trimmed.
fn for_each_row<T, F>(path: &Path, mut handle: F) -> Result<(), StoreError>
where
    T: for<'de> Deserialize<'de>,
    F: FnMut(u64, T),
{
    let file = File::open(path).map_err(|e| {
        tracing::error!("Cannot open table {}: {}", path.display(), e);
        StoreError::io(path, e)
    })?;
    let mut reader = ReaderBuilder::new()
        .flexible(true)
        .trim(Trim::All)
        .from_reader(file);
    let headers: StringRecord = reader
        .headers()
        .map_err(|e| StoreError::io(path, e.into()))?
        .clone();

    for record in reader.records() {
        let record = match record {
            Ok(record) => record,
            Err(err) if err.is_io_error() => return Err(StoreError::io(path, err.into())),
            Err(err) => {
                let line = err.position().map_or(0, |p| p.line());
                tracing::warn!("{}:{}: unreadable row skipped: {}", path.display(), line, err);
                continue;
            }
        };
        let line = record.position().map_or(0, |p| p.line());
        match record.deserialize::<T>(Some(&headers)) {
            Ok(row) => handle(line, row),
            Err(err) => {
                tracing::warn!("{}:{}: malformed row skipped: {}", path.display(), line, err);
            }
        }
    }
    Ok(())
}

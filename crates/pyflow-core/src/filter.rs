//! Predicate and pattern based subgraph extraction

use std::collections::BTreeSet;

use regex::Regex;

use crate::error::FilterError;
use crate::graph::Graph;
use crate::model::{ENTITY_SEPARATOR, EdgeKind, GraphEdge, GraphNode, NodeKind};

/// Keep the nodes matching `predicate` and the edges between them.
pub fn apply_nodes_filter<F>(graph: &Graph, predicate: F) -> Graph
where
    F: Fn(&GraphNode) -> bool,
{
    let mut result = Graph::new();
    for node in graph.nodes().filter(|n| predicate(n)) {
        result.add_node(node.clone());
    }
    for edge in graph.edges() {
        if result.contains(&edge.source) && result.contains(&edge.target) {
            result.add_edge(edge.clone());
        }
    }
    result
}

/// Keep every node and only the edges matching `predicate`.
pub fn apply_edges_filter<F>(graph: &Graph, predicate: F) -> Graph
where
    F: Fn(&GraphEdge) -> bool,
{
    let mut result = Graph::new();
    for node in graph.nodes() {
        result.add_node(node.clone());
    }
    for edge in graph.edges().filter(|e| predicate(e)) {
        result.add_edge(edge.clone());
    }
    result
}

/// A composed filter over node kinds, edge kinds and node ids.
///
/// Empty kind lists and a missing pattern do not restrict anything. With
/// `invert`, each restricting predicate is negated.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterSpec {
    pub node_kinds: Vec<NodeKind>,
    pub edge_kinds: Vec<EdgeKind>,
    /// `*` matches any run of characters, `.` any single character and
    /// `[...]` a character class. Matched against the whole id.
    pub id_pattern: Option<String>,
    pub invert: bool,
}

impl FilterSpec {
    /// Build a spec from user supplied type tokens, dropping unknown ones.
    pub fn from_tokens<N, E>(
        node_tokens: &[N],
        edge_tokens: &[E],
        id_pattern: Option<&str>,
        invert: bool,
    ) -> Self
    where
        N: AsRef<str>,
        E: AsRef<str>,
    {
        FilterSpec {
            node_kinds: parse_tokens(node_tokens, "node"),
            edge_kinds: parse_tokens(edge_tokens, "edge"),
            id_pattern: id_pattern.map(str::to_string),
            invert,
        }
    }

    fn restricts_nodes(&self) -> bool {
        !self.node_kinds.is_empty() || self.id_pattern.is_some()
    }

    fn restricts_edges(&self) -> bool {
        !self.edge_kinds.is_empty()
    }
}

fn parse_tokens<T, S>(tokens: &[S], what: &str) -> Vec<T>
where
    T: std::str::FromStr<Err = crate::error::ModelError>,
    S: AsRef<str>,
{
    let mut parsed = Vec::new();
    for token in tokens.iter().map(AsRef::as_ref) {
        match token.parse() {
            Ok(kind) => parsed.push(kind),
            Err(err) => tracing::warn!("Ignoring {} type filter: {}", what, err),
        }
    }
    if parsed.is_empty() && !tokens.is_empty() {
        tracing::warn!("No valid {} types given, not filtering by {} type", what, what);
    }
    parsed
}

/// Compile a wildcard id pattern into an anchored regex.
pub fn compile_id_pattern(pattern: &str) -> Result<Regex, FilterError> {
    let mut source = String::from("^(?:");
    let mut in_class = false;
    for c in pattern.chars() {
        if in_class {
            source.push(c);
            in_class = c != ']';
            continue;
        }
        match c {
            '*' => source.push_str(".*"),
            '.' => source.push('.'),
            '[' => {
                source.push('[');
                in_class = true;
            }
            other => source.push_str(&regex::escape(other.encode_utf8(&mut [0; 4]))),
        }
    }
    source.push_str(")$");

    Regex::new(&source).map_err(|source| FilterError::InvalidPattern {
        pattern: pattern.to_string(),
        source,
    })
}

/// Apply a [`FilterSpec`]: the node predicate first, then the edge predicate.
pub fn filter(graph: &Graph, spec: &FilterSpec) -> Result<Graph, FilterError> {
    let pattern = spec.id_pattern.as_deref().map(compile_id_pattern).transpose()?;

    let mut result = if spec.restricts_nodes() {
        apply_nodes_filter(graph, |node| {
            let kind_ok = spec.node_kinds.is_empty() || spec.node_kinds.contains(&node.kind);
            let id_ok = pattern.as_ref().is_none_or(|re| re.is_match(&node.id));
            (kind_ok && id_ok) != spec.invert
        })
    } else {
        graph.clone()
    };

    if spec.restricts_edges() {
        result = apply_edges_filter(&result, |edge| {
            spec.edge_kinds.contains(&edge.kind) != spec.invert
        });
    }

    tracing::debug!(
        "Filter kept {} of {} nodes, {} of {} edges",
        result.node_count(),
        graph.node_count(),
        result.edge_count(),
        graph.edge_count()
    );
    Ok(result)
}

/// Project a graph onto its files.
///
/// Keeps only file nodes and adds one use edge from file A to file B when
/// an entity contained in A uses an entity of B. Uses within a file and
/// targets outside the graph's files produce no edge.
pub fn file_links(graph: &Graph) -> Graph {
    let mut result = Graph::new();
    for file in graph.nodes_of_kind(NodeKind::File) {
        result.add_node(file.clone());
    }

    let mut links: BTreeSet<(&str, &str)> = BTreeSet::new();
    for file in graph.nodes_of_kind(NodeKind::File) {
        for contained in graph.edges_out(&file.id).filter(|e| e.kind == EdgeKind::Contain) {
            for usage in graph.edges_out(&contained.target).filter(|e| e.kind == EdgeKind::Use) {
                let target_file = owning_file(&usage.target);
                if target_file != file.id && result.contains(target_file) {
                    links.insert((file.id.as_str(), target_file));
                }
            }
        }
    }
    for (source, target) in links {
        result.add_edge(GraphEdge::code(source, target, EdgeKind::Use));
    }

    tracing::debug!(
        "File projection kept {} files and {} links",
        result.node_count(),
        result.edge_count()
    );
    result
}

fn owning_file(entity_id: &str) -> &str {
    entity_id.split(ENTITY_SEPARATOR).next().unwrap_or(entity_id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::EdgeKind;

    /// Two modules, three files; arch1 {class1, func1}, arch2 {class2},
    /// arch3 {class3, func2}; class2 uses class1, func2 uses func1.
    fn mixed_graph() -> Graph {
        let mut graph = Graph::new();
        for dir in ["root", "src", "mod1", "mod2"] {
            graph.add_node(GraphNode::code(dir, dir, NodeKind::Directory));
        }
        for file in ["file1", "file2", "file3"] {
            graph.add_node(GraphNode::code(file, file, NodeKind::File));
        }
        for class in ["class1", "class2", "class3"] {
            graph.add_node(GraphNode::code(class, class, NodeKind::Class));
        }
        for func in ["func1", "func2"] {
            graph.add_node(GraphNode::code(func, func, NodeKind::Function));
        }
        for arch in ["arch1", "arch2", "arch3"] {
            graph.add_node(GraphNode::hand(arch, arch, NodeKind::ArchElement));
        }
        for (src, dest) in [
            ("root", "src"),
            ("src", "mod1"),
            ("src", "mod2"),
            ("mod1", "file1"),
            ("mod1", "file2"),
            ("mod2", "file3"),
            ("file1", "class1"),
            ("file1", "func1"),
            ("file2", "class2"),
            ("file3", "class3"),
            ("file3", "func2"),
            ("arch1", "class1"),
            ("arch1", "func1"),
            ("arch2", "class2"),
            ("arch3", "class3"),
            ("arch3", "func2"),
        ] {
            graph.add_edge(GraphEdge::code(src, dest, EdgeKind::Contain));
        }
        graph.add_edge(GraphEdge::code("class2", "class1", EdgeKind::Use));
        graph.add_edge(GraphEdge::code("func2", "func1", EdgeKind::Use));
        graph
    }

    fn spec(nodes: &[&str], edges: &[&str], pattern: Option<&str>, invert: bool) -> FilterSpec {
        FilterSpec::from_tokens(nodes, edges, pattern, invert)
    }

    fn out_targets(graph: &Graph, id: &str) -> Vec<String> {
        let mut targets: Vec<String> = graph.edges_out(id).map(|e| e.target.clone()).collect();
        targets.sort();
        targets
    }

    #[test]
    fn test_code_nodes_only() {
        let result = filter(&mixed_graph(), &spec(&["class", "func", "body"], &[], None, false)).unwrap();

        assert_eq!(result.node_count(), 5);
        assert!(result.nodes().all(|n| n.kind.is_code_entity()));
        assert_eq!(out_targets(&result, "class2"), vec!["class1"]);
        assert_eq!(out_targets(&result, "func2"), vec!["func1"]);
    }

    #[test]
    fn test_structure_nodes_only() {
        let result = filter(&mixed_graph(), &spec(&["directory", "file"], &[], None, false)).unwrap();

        assert!(result.nodes().all(|n| n.kind.is_structural()));
        assert_eq!(result.node_count(), 7);
        assert_eq!(result.edges_out("root").count(), 1);
        assert_eq!(result.edges_out("src").count(), 2);
        assert_eq!(result.edges_out("mod1").count(), 2);
        assert_eq!(result.edges_out("mod2").count(), 1);
    }

    #[test]
    fn test_use_edges_only_keeps_all_nodes() {
        let graph = mixed_graph();
        let result = filter(&graph, &spec(&[], &["use"], None, false)).unwrap();

        assert_eq!(result.node_count(), graph.node_count());
        assert_eq!(result.edge_count(), 2);
        assert!(result.edges().all(|e| e.kind == EdgeKind::Use));
    }

    #[test]
    fn test_elements_with_their_contents() {
        let result = filter(
            &mixed_graph(),
            &spec(&["arc_elem", "class", "func", "body"], &["contain"], None, false),
        )
        .unwrap();

        assert_eq!(out_targets(&result, "arch1"), vec!["class1", "func1"]);
        assert_eq!(out_targets(&result, "arch2"), vec!["class2"]);
        assert_eq!(out_targets(&result, "arch3"), vec!["class3", "func2"]);
        assert_eq!(result.edge_count(), 5);
    }

    #[test]
    fn test_id_pattern_wildcards() {
        let mut graph = mixed_graph();
        graph.add_node(GraphNode::code("class10", "class10", NodeKind::Class));

        let star = filter(&graph, &spec(&[], &[], Some("class*"), false)).unwrap();
        let mut ids: Vec<&str> = star.nodes().map(|n| n.id.as_str()).collect();
        ids.sort();
        assert_eq!(ids, vec!["class1", "class10", "class2", "class3"]);

        let dot = filter(&graph, &spec(&[], &[], Some("class."), false)).unwrap();
        assert!(dot.contains("class1"));
        assert!(dot.contains("class3"));
        assert!(!dot.contains("class10"));
    }

    #[test]
    fn test_pattern_is_anchored_and_literal() {
        let mut graph = Graph::new();
        graph.add_node(GraphNode::code("pkg/a.py#run", "run", NodeKind::Function));
        graph.add_node(GraphNode::code("pkg/a.py#run+1", "run+1", NodeKind::Function));
        graph.add_node(GraphNode::code("x/pkg/a.py#run", "run", NodeKind::Function));

        let result = filter(&graph, &spec(&[], &[], Some("pkg/*#run+1"), false)).unwrap();
        let ids: Vec<&str> = result.nodes().map(|n| n.id.as_str()).collect();
        assert_eq!(ids, vec!["pkg/a.py#run+1"]);
    }

    #[test]
    fn test_inverted_filters() {
        let graph = mixed_graph();

        let no_code = filter(&graph, &spec(&["class", "func"], &[], None, true)).unwrap();
        assert!(no_code.nodes().all(|n| !matches!(n.kind, NodeKind::Class | NodeKind::Function)));
        assert_eq!(no_code.node_count(), 10);

        let no_use = filter(&graph, &spec(&[], &["use"], None, true)).unwrap();
        assert!(no_use.edges().all(|e| e.kind != EdgeKind::Use));
        assert_eq!(no_use.node_count(), graph.node_count());
        assert_eq!(no_use.edge_count(), 16);

        let no_class = filter(&graph, &spec(&[], &[], Some("class*"), true)).unwrap();
        assert!(no_class.nodes().all(|n| !n.id.starts_with("class")));
    }

    #[test]
    fn test_combined_criteria() {
        let result = filter(&mixed_graph(), &spec(&["class"], &["use"], Some("class[12]"), false)).unwrap();

        assert!(result.contains("class1"));
        assert!(result.contains("class2"));
        assert!(!result.contains("class3"));
        assert!(!result.contains("func1"));
        let edges: Vec<&GraphEdge> = result.edges().collect();
        assert_eq!(edges.len(), 1);
        assert_eq!((edges[0].source.as_str(), edges[0].target.as_str()), ("class2", "class1"));
        assert_eq!(edges[0].kind, EdgeKind::Use);
    }

    #[test]
    fn test_unknown_tokens_are_dropped() {
        let parsed = spec(&["INVALID_TYPE", "class"], &["INVALID_TYPE", "use"], None, false);
        assert_eq!(parsed.node_kinds, vec![NodeKind::Class]);
        assert_eq!(parsed.edge_kinds, vec![EdgeKind::Use]);

        let result = filter(&mixed_graph(), &parsed).unwrap();
        assert!(result.nodes().all(|n| n.kind == NodeKind::Class));
        assert!(result.edges().all(|e| e.kind == EdgeKind::Use));
    }

    #[test]
    fn test_only_unknown_tokens_means_no_restriction() {
        let graph = mixed_graph();
        let parsed = spec(&["bogus"], &[], None, false);
        assert!(parsed.node_kinds.is_empty());

        let result = filter(&graph, &parsed).unwrap();
        assert_eq!(result.node_count(), graph.node_count());
        assert_eq!(result.edge_count(), graph.edge_count());
    }

    fn file_graph(uses: &[(&str, &str)]) -> Graph {
        let mut graph = Graph::new();
        graph.add_node(GraphNode::code("root", "root", NodeKind::Directory));
        for file in ["a.py", "b.py"] {
            graph.add_node(GraphNode::code(file, file, NodeKind::File));
            graph.add_edge(GraphEdge::code("root", file, EdgeKind::Contain));
        }
        for entity in ["a.py#one", "a.py#two", "a.py#body", "b.py#target"] {
            graph.add_node(GraphNode::code(entity, entity, NodeKind::Function));
            graph.add_edge(GraphEdge::code(owning_file(entity), entity, EdgeKind::Contain));
        }
        for (src, dest) in uses {
            graph.add_edge(GraphEdge::code(*src, *dest, EdgeKind::Use));
        }
        graph
    }

    #[test]
    fn test_file_links_collapse_entity_uses() {
        let graph = file_graph(&[
            ("a.py#one", "b.py#target"),
            ("a.py#two", "b.py#target"),
            ("a.py#body", "a.py#one"),
        ]);
        let result = file_links(&graph);

        let mut ids: Vec<&str> = result.nodes().map(|n| n.id.as_str()).collect();
        ids.sort();
        assert_eq!(ids, vec!["a.py", "b.py"]);
        let edges: Vec<(&str, &str, EdgeKind)> = result
            .edges()
            .map(|e| (e.source.as_str(), e.target.as_str(), e.kind))
            .collect();
        assert_eq!(edges, vec![("a.py", "b.py", EdgeKind::Use)]);
    }

    #[test]
    fn test_file_links_skip_same_file_uses() {
        let graph = file_graph(&[("a.py#one", "a.py#two"), ("a.py#body", "a.py#one")]);
        let result = file_links(&graph);

        assert_eq!(result.node_count(), 2);
        assert_eq!(result.edge_count(), 0);
    }

    #[test]
    fn test_file_links_drop_targets_outside_files() {
        let mut graph = file_graph(&[("a.py#one", "b.py#target")]);
        graph.add_node(GraphNode::hand("domain", "domain", NodeKind::ArchElement));
        graph.add_edge(GraphEdge::hand("a.py#two", "domain", EdgeKind::Use));
        let result = file_links(&graph);

        assert!(!result.contains("domain"));
        assert_eq!(result.edge_count(), 1);
    }

    #[test]
    fn test_unterminated_class_is_an_error() {
        let err = filter(&mixed_graph(), &spec(&[], &[], Some("class[1"), false)).unwrap_err();
        assert!(matches!(err, FilterError::InvalidPattern { .. }));
    }
}

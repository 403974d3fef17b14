//! Python entity extraction and usage resolution

use std::collections::{BTreeSet, HashSet};

use pyflow_core::{BODY_ENTITY_NAME, EdgeKind, GraphEdge, GraphNode, NodeKind, entity_id};
use tree_sitter::Node;

use crate::extractor::{
    ExtractError, ExtractionResult, ImportRecord, ImportedName, LanguageExtractor, SourceFile,
};
use crate::parser::{FileType, SourceParser, structural_hash};
use crate::resolver::ModuleResolver;
use crate::usages::{UsageCollector, is_builtin};

const FUTURE_MODULE: &str = "__future__";

/// Extracts top-level classes, functions and the synthetic body entity.
pub struct PythonExtractor {
    parser: SourceParser,
}

impl PythonExtractor {
    pub fn new() -> Result<Self, ExtractError> {
        Ok(Self { parser: SourceParser::new(FileType::Python)? })
    }
}

/// A top-level class or function, with its decorators when present.
struct Declaration<'t> {
    name: String,
    kind: NodeKind,
    node: Node<'t>,
}

impl LanguageExtractor for PythonExtractor {
    fn extract(&mut self, file: &SourceFile<'_>) -> Result<ExtractionResult, ExtractError> {
        let path = file.absolute_path();
        let source = std::str::from_utf8(file.content)
            .map_err(|source| ExtractError::Encoding { path: path.clone(), source })?;
        let tree = self.parser.parse(source, &path)?;
        let bytes = source.as_bytes();
        let file_id = file.file_id();

        let mut imports = Vec::new();
        let mut declarations: Vec<Declaration<'_>> = Vec::new();
        let mut body: Vec<Node<'_>> = Vec::new();

        let module = tree.root_node();
        let mut cursor = module.walk();
        for statement in module.named_children(&mut cursor) {
            match statement.kind() {
                "comment" => {}
                "import_statement" => imports.extend(plain_imports(statement, bytes)),
                "import_from_statement" | "future_import_statement" => {
                    imports.push(from_import(statement, bytes));
                }
                "class_definition" | "function_definition" | "decorated_definition" => {
                    match declaration(statement, bytes) {
                        Some(decl) => {
                            // A later definition rebinds the name
                            if let Some(pos) = declarations.iter().position(|d| d.name == decl.name) {
                                tracing::debug!("{} redefines {}", file_id, decl.name);
                                declarations.remove(pos);
                            }
                            declarations.push(decl);
                        }
                        None => body.push(statement),
                    }
                }
                _ => body.push(statement),
            }
        }

        let scope = Scope {
            file_id: &file_id,
            declared: declarations.iter().map(|d| d.name.as_str()).collect(),
            imports: &imports,
            resolver: ModuleResolver::new(file.project_root, file.relative_path),
        };

        let mut result = ExtractionResult { file_id: file_id.clone(), ..Default::default() };
        for decl in &declarations {
            let id = entity_id(&file_id, &decl.name);
            let hash = structural_hash(&[decl.node], bytes);
            result.nodes.push(GraphNode::code(id.as_str(), decl.name.as_str(), decl.kind).with_hash(hash));

            let mut collector = UsageCollector::new(bytes, true);
            collector.visit(decl.node);
            scope.add_usages(&id, collector.into_names(), &mut result);
        }

        if !body.is_empty() {
            let id = entity_id(&file_id, BODY_ENTITY_NAME);
            let hash = structural_hash(&body, bytes);
            result
                .nodes
                .push(GraphNode::code(id.as_str(), BODY_ENTITY_NAME, NodeKind::Body).with_hash(hash));

            let mut collector = UsageCollector::new(bytes, false);
            for statement in &body {
                collector.visit(*statement);
            }
            scope.add_usages(&id, collector.into_names(), &mut result);
        }

        tracing::debug!(
            "Extracted {}: {} entities, {} imports, {} candidate usages",
            file_id,
            result.nodes.len(),
            imports.len(),
            result.usages.len()
        );
        result.imports = imports;
        Ok(result)
    }
}

fn declaration<'t>(statement: Node<'t>, source: &[u8]) -> Option<Declaration<'t>> {
    let definition = match statement.kind() {
        "decorated_definition" => statement.child_by_field_name("definition")?,
        _ => statement,
    };
    let kind = match definition.kind() {
        "class_definition" => NodeKind::Class,
        "function_definition" => NodeKind::Function,
        _ => return None,
    };
    let name = definition.child_by_field_name("name")?.utf8_text(source).ok()?;
    Some(Declaration { name: name.to_string(), kind, node: statement })
}

fn line_of(node: Node<'_>) -> usize {
    node.start_position().row + 1
}

/// `a.b.c` with any interior whitespace removed.
fn dotted_text(node: Node<'_>, source: &[u8]) -> String {
    let mut cursor = node.walk();
    let parts: Vec<&str> = node
        .named_children(&mut cursor)
        .filter(|c| c.kind() == "identifier")
        .filter_map(|c| c.utf8_text(source).ok())
        .collect();
    if parts.is_empty() {
        node.utf8_text(source).unwrap_or_default().to_string()
    } else {
        parts.join(".")
    }
}

fn imported_name(node: Node<'_>, source: &[u8]) -> Option<ImportedName> {
    match node.kind() {
        "dotted_name" => Some(ImportedName { name: dotted_text(node, source), alias: None }),
        "aliased_import" => {
            let name = dotted_text(node.child_by_field_name("name")?, source);
            let alias = node.child_by_field_name("alias")?.utf8_text(source).ok()?;
            Some(ImportedName { name, alias: Some(alias.to_string()) })
        }
        _ => None,
    }
}

/// `import a.b, c as d` gives one record per module.
fn plain_imports(statement: Node<'_>, source: &[u8]) -> Vec<ImportRecord> {
    let mut cursor = statement.walk();
    statement
        .children_by_field_name("name", &mut cursor)
        .filter_map(|node| imported_name(node, source))
        .map(|imported| ImportRecord {
            module: imported.name,
            level: 0,
            alias: imported.alias,
            objects: Vec::new(),
            is_from: false,
            wildcard: false,
            line: line_of(statement),
        })
        .collect()
}

fn from_import(statement: Node<'_>, source: &[u8]) -> ImportRecord {
    let (module, level) = match statement.child_by_field_name("module_name") {
        Some(node) if node.kind() == "relative_import" => relative_module(node, source),
        Some(node) => (dotted_text(node, source), 0),
        None => (FUTURE_MODULE.to_string(), 0),
    };

    let mut cursor = statement.walk();
    let objects = statement
        .children_by_field_name("name", &mut cursor)
        .filter_map(|node| imported_name(node, source))
        .collect();

    let mut cursor = statement.walk();
    let wildcard = statement
        .named_children(&mut cursor)
        .any(|c| c.kind() == "wildcard_import");

    ImportRecord {
        module,
        level,
        alias: None,
        objects,
        is_from: true,
        wildcard,
        line: line_of(statement),
    }
}

fn relative_module(node: Node<'_>, source: &[u8]) -> (String, usize) {
    let mut level = 0;
    let mut module = String::new();
    let mut cursor = node.walk();
    for child in node.named_children(&mut cursor) {
        match child.kind() {
            "import_prefix" => {
                level = child.utf8_text(source).unwrap_or_default().matches('.').count();
            }
            "dotted_name" => module = dotted_text(child, source),
            _ => {}
        }
    }
    (module, level)
}

enum Resolution {
    Target(String),
    Builtin,
    Unresolved,
}

/// What the names of one file can refer to.
struct Scope<'a> {
    file_id: &'a str,
    declared: HashSet<&'a str>,
    imports: &'a [ImportRecord],
    resolver: ModuleResolver<'a>,
}

impl Scope<'_> {
    fn add_usages(&self, entity: &str, names: BTreeSet<String>, result: &mut ExtractionResult) {
        let mut targets = BTreeSet::new();
        for name in &names {
            match self.resolve(name) {
                Resolution::Target(target) if target != entity => {
                    targets.insert(target);
                }
                Resolution::Target(_) | Resolution::Builtin => {}
                Resolution::Unresolved => result.unresolved += 1,
            }
        }
        result
            .usages
            .extend(targets.into_iter().map(|target| GraphEdge::code(entity, target, EdgeKind::Use)));
    }

    /// Sibling declarations first, then imports in declaration order.
    fn resolve(&self, reference: &str) -> Resolution {
        let segments: Vec<&str> = reference.split('.').collect();
        let first = segments[0];

        if self.declared.contains(first) {
            return Resolution::Target(entity_id(self.file_id, first));
        }
        if let Some(target) = self.imports.iter().find_map(|import| self.match_import(import, &segments)) {
            return Resolution::Target(target);
        }
        if is_builtin(first) && !self.binds(first) {
            Resolution::Builtin
        } else {
            Resolution::Unresolved
        }
    }

    fn binds(&self, name: &str) -> bool {
        self.imports.iter().any(|import| {
            if import.is_from {
                import.objects.iter().any(|o| o.binding() == name)
            } else {
                match &import.alias {
                    Some(alias) => alias.as_str() == name,
                    None => import.module.split('.').next() == Some(name),
                }
            }
        })
    }

    fn match_import(&self, import: &ImportRecord, segments: &[&str]) -> Option<String> {
        if import.module == FUTURE_MODULE && import.level == 0 {
            return None;
        }

        if import.is_from {
            let object = import.objects.iter().find(|o| o.binding() == segments[0])?;
            if let Some(module_file) =
                self.resolver.resolve_submodule(&import.module, import.level, &object.name)
            {
                return segments.get(1).map(|member| entity_id(&module_file, member));
            }
            let module_file = self.resolver.resolve(&import.module, import.level)?;
            return Some(entity_id(&module_file, &object.name));
        }

        let member = match &import.alias {
            Some(alias) if segments[0] == alias.as_str() => *segments.get(1)?,
            Some(_) => return None,
            None => {
                let module: Vec<&str> = import.module.split('.').collect();
                if segments.len() <= module.len() || segments[..module.len()] != module[..] {
                    return None;
                }
                segments[module.len()]
            }
        };
        let module_file = self.resolver.resolve(&import.module, import.level)?;
        Some(entity_id(&module_file, member))
    }
}

//! Collection of the dotted names an entity refers to

use std::collections::BTreeSet;

use tree_sitter::Node;

const KEYWORDS: &[&str] = &[
    "False", "None", "True", "and", "as", "assert", "async", "await", "break", "class",
    "continue", "def", "del", "elif", "else", "except", "finally", "for", "from", "global", "if",
    "import", "in", "is", "lambda", "nonlocal", "not", "or", "pass", "raise", "return", "try",
    "while", "with", "yield",
];

const BUILTINS: &[&str] = &[
    "__build_class__", "__debug__", "__doc__", "__file__", "__import__", "__name__",
    "__package__", "__spec__", "abs", "aiter", "all", "anext", "any", "ascii", "bin", "bool",
    "breakpoint", "bytearray", "bytes", "callable", "chr", "classmethod", "compile", "complex",
    "copyright", "credits", "delattr", "dict", "dir", "divmod", "enumerate", "eval", "exec",
    "exit", "filter", "float", "format", "frozenset", "getattr", "globals", "hasattr", "hash",
    "help", "hex", "id", "input", "int", "isinstance", "issubclass", "iter", "len", "license",
    "list", "locals", "map", "max", "memoryview", "min", "next", "object", "oct", "open", "ord",
    "pow", "print", "property", "quit", "range", "repr", "reversed", "round", "set", "setattr",
    "slice", "sorted", "staticmethod", "str", "sum", "super", "tuple", "type", "vars", "zip",
    "Ellipsis", "NotImplemented", "ArithmeticError", "AssertionError", "AttributeError",
    "BaseException", "BaseExceptionGroup", "BlockingIOError", "BrokenPipeError", "BufferError",
    "BytesWarning", "ChildProcessError", "ConnectionAbortedError", "ConnectionError",
    "ConnectionRefusedError", "ConnectionResetError", "DeprecationWarning", "EOFError",
    "EnvironmentError", "Exception", "ExceptionGroup", "FileExistsError", "FileNotFoundError",
    "FloatingPointError", "FutureWarning", "GeneratorExit", "IOError", "ImportError",
    "ImportWarning", "IndentationError", "IndexError", "InterruptedError", "IsADirectoryError",
    "KeyError", "KeyboardInterrupt", "LookupError", "MemoryError", "ModuleNotFoundError",
    "NameError", "NotADirectoryError", "NotImplementedError", "OSError", "OverflowError",
    "PendingDeprecationWarning", "PermissionError", "ProcessLookupError", "RecursionError",
    "ReferenceError", "ResourceWarning", "RuntimeError", "RuntimeWarning", "StopAsyncIteration",
    "StopIteration", "SyntaxError", "SyntaxWarning", "SystemError", "SystemExit", "TabError",
    "TimeoutError", "TypeError", "UnboundLocalError", "UnicodeDecodeError", "UnicodeEncodeError",
    "UnicodeError", "UnicodeTranslateError", "UnicodeWarning", "UserWarning", "ValueError",
    "Warning", "ZeroDivisionError",
];

/// Whether `name` is a Python builtin.
pub fn is_builtin(name: &str) -> bool {
    BUILTINS.contains(&name)
}

/// Walks a syntax subtree and records every name read in it.
///
/// Attribute chains rooted at a plain name are recorded whole (`a.b.c`).
/// Declaration names, parameter names, keyword-argument names and
/// assignment or loop targets are not reads and are skipped. With
/// `ignore_self`, chains rooted at `self` are dropped.
pub struct UsageCollector<'s> {
    source: &'s [u8],
    ignore_self: bool,
    names: BTreeSet<String>,
}

impl<'s> UsageCollector<'s> {
    pub fn new(source: &'s [u8], ignore_self: bool) -> Self {
        Self { source, ignore_self, names: BTreeSet::new() }
    }

    pub fn into_names(self) -> BTreeSet<String> {
        self.names
    }

    pub fn visit(&mut self, node: Node<'_>) {
        match node.kind() {
            "comment"
            | "import_statement"
            | "import_from_statement"
            | "future_import_statement"
            | "global_statement"
            | "nonlocal_statement"
            | "as_pattern_target" => {}
            "identifier" => {
                let name = self.text(node).to_string();
                self.record(name);
            }
            "attribute" => match self.dotted_name(node) {
                Some(name) => self.record(name),
                None => self.visit_field(node, "object"),
            },
            "function_definition" | "class_definition" => self.visit_children_except(node, &["name"]),
            "parameters" | "lambda_parameters" => self.visit_parameters(node),
            "keyword_argument" | "named_expression" => self.visit_field(node, "value"),
            "assignment" | "augmented_assignment" | "for_statement" | "for_in_clause" => {
                if let Some(left) = node.child_by_field_name("left") {
                    self.visit_target(left);
                }
                self.visit_children_except(node, &["left"]);
            }
            "except_clause" => self.visit_children_except(node, &["alias"]),
            _ => self.visit_children_except(node, &[]),
        }
    }

    fn record(&mut self, name: String) {
        let first = name.split('.').next().unwrap_or_default();
        if first.is_empty() || KEYWORDS.contains(&first) {
            return;
        }
        if self.ignore_self && first == "self" {
            return;
        }
        self.names.insert(name);
    }

    fn visit_field(&mut self, node: Node<'_>, field: &str) {
        if let Some(child) = node.child_by_field_name(field) {
            self.visit(child);
        }
    }

    fn visit_children_except(&mut self, node: Node<'_>, skipped: &[&str]) {
        let mut cursor = node.walk();
        if !cursor.goto_first_child() {
            return;
        }
        loop {
            let skip = cursor.field_name().is_some_and(|field| skipped.contains(&field));
            if !skip {
                self.visit(cursor.node());
            }
            if !cursor.goto_next_sibling() {
                break;
            }
        }
    }

    /// Annotations and defaults are reads, the parameter names are not.
    fn visit_parameters(&mut self, node: Node<'_>) {
        let mut cursor = node.walk();
        for param in node.named_children(&mut cursor) {
            match param.kind() {
                "default_parameter" => self.visit_field(param, "value"),
                "typed_parameter" => self.visit_field(param, "type"),
                "typed_default_parameter" => {
                    self.visit_field(param, "type");
                    self.visit_field(param, "value");
                }
                _ => {}
            }
        }
    }

    fn visit_target(&mut self, target: Node<'_>) {
        match target.kind() {
            "identifier" => {}
            // `obj.attr = v` reads `obj`
            "attribute" => self.visit_field(target, "object"),
            "pattern_list" | "tuple_pattern" | "list_pattern" | "list_splat_pattern"
            | "expression_list" | "tuple" | "list" | "parenthesized_expression" => {
                let mut cursor = target.walk();
                for child in target.named_children(&mut cursor) {
                    self.visit_target(child);
                }
            }
            _ => self.visit(target),
        }
    }

    fn dotted_name(&self, node: Node<'_>) -> Option<String> {
        match node.kind() {
            "identifier" => Some(self.text(node).to_string()),
            "attribute" => {
                let object = self.dotted_name(node.child_by_field_name("object")?)?;
                let attribute = node.child_by_field_name("attribute")?;
                Some(format!("{object}.{}", self.text(attribute)))
            }
            _ => None,
        }
    }

    fn text(&self, node: Node<'_>) -> &'s str {
        node.utf8_text(self.source).unwrap_or_default()
    }
}

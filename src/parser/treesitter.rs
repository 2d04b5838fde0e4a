// Language parsers

use std::collections::HashSet;
use std::rc::Rc;
use tree_sitter::{Language, Node, Parser as TreeParser, Tree};

use super::{ElementDescriptor, StructureParser};
use crate::error::{Result, TkgError};
use crate::store::ElementType;

/// What a syntax node contributes to the element tree
#[derive(Debug, Clone, PartialEq, Eq)]
enum Structure {
    Class(String),
    Function(String),
    /// A function declared outside its owning type (Go receivers)
    MethodOf { receiver: String, name: String },
}

type Classifier = fn(&Node<'_>, &[u8]) -> Option<Structure>;

/// Tree-sitter backed parser for one language
pub struct TreeSitterParser {
    language: &'static str,
    extensions: &'static [&'static str],
    grammar: fn() -> Language,
    classify: Classifier,
}

/// Scope a node is visited in
struct Scope {
    prefix: String,
    in_class: bool,
}

impl TreeSitterParser {
    pub fn python() -> Self {
        Self {
            language: "python",
            extensions: &["py", "pyi"],
            grammar: python_grammar,
            classify: classify_python,
        }
    }

    pub fn rust() -> Self {
        Self {
            language: "rust",
            extensions: &["rs"],
            grammar: rust_grammar,
            classify: classify_rust,
        }
    }

    pub fn go() -> Self {
        Self {
            language: "go",
            extensions: &["go"],
            grammar: go_grammar,
            classify: classify_go,
        }
    }

    pub fn java() -> Self {
        Self {
            language: "java",
            extensions: &["java"],
            grammar: java_grammar,
            classify: classify_java,
        }
    }

    pub fn typescript() -> Self {
        Self {
            language: "typescript",
            extensions: &["ts", "mts", "cts"],
            grammar: typescript_grammar,
            classify: classify_typescript,
        }
    }

    pub fn tsx() -> Self {
        Self {
            language: "typescript",
            extensions: &["tsx"],
            grammar: tsx_grammar,
            classify: classify_typescript,
        }
    }

    fn parse_tree(&self, content: &str, file_path: &str) -> Result<Tree> {
        let failure = |reason: String| TkgError::ParseFailure {
            path: file_path.to_string(),
            reason,
        };

        let mut parser = TreeParser::new();
        parser
            .set_language(&(self.grammar)())
            .map_err(|e| failure(e.to_string()))?;

        parser
            .parse(content, None)
            .ok_or_else(|| failure(format!("{} parser produced no tree", self.language)))
    }

    /// Walk the tree with an explicit stack, visiting nodes in source order.
    fn extract(&self, tree: &Tree, source: &[u8], file_path: &str) -> Vec<ElementDescriptor> {
        let mut descriptors = Vec::new();
        let mut seen = HashSet::new();

        let root_scope = Rc::new(Scope {
            prefix: file_path.to_string(),
            in_class: false,
        });
        let mut stack: Vec<(Node<'_>, Rc<Scope>)> = vec![(tree.root_node(), root_scope)];

        while let Some((node, scope)) = stack.pop() {
            let mut inner = Rc::clone(&scope);

            if let Some(structure) = (self.classify)(&node, source) {
                let (element_type, name, stable_identifier, enters_class) = match structure {
                    Structure::Class(name) => {
                        let id = format!("{}:class:{}", scope.prefix, name);
                        (ElementType::Class, name, id, true)
                    }
                    Structure::Function(name) => {
                        let segment = if scope.in_class { "method" } else { "function" };
                        let id = format!("{}:{}:{}", scope.prefix, segment, name);
                        (ElementType::Function, name, id, false)
                    }
                    Structure::MethodOf { receiver, name } => {
                        let id = format!("{}:class:{}:method:{}", scope.prefix, receiver, name);
                        (ElementType::Function, name, id, false)
                    }
                };

                inner = Rc::new(Scope {
                    prefix: stable_identifier.clone(),
                    in_class: enters_class,
                });

                // first declaration wins (struct before impl, overloads)
                if seen.insert(stable_identifier.clone()) {
                    descriptors.push(ElementDescriptor {
                        element_type,
                        stable_identifier,
                        name,
                        start_line: Some(node.start_position().row as u32 + 1),
                        end_line: Some(node.end_position().row as u32 + 1),
                    });
                }
            }

            let mut cursor = node.walk();
            let children: Vec<Node<'_>> = node.named_children(&mut cursor).collect();
            for child in children.into_iter().rev() {
                stack.push((child, Rc::clone(&inner)));
            }
        }

        descriptors
    }
}

impl StructureParser for TreeSitterParser {
    fn language(&self) -> &'static str {
        self.language
    }

    fn extensions(&self) -> &'static [&'static str] {
        self.extensions
    }

    fn parse(&self, content: &str, file_path: &str) -> Result<Vec<ElementDescriptor>> {
        let tree = self.parse_tree(content, file_path)?;
        Ok(self.extract(&tree, content.as_bytes(), file_path))
    }
}

fn python_grammar() -> Language {
    tree_sitter_python::LANGUAGE.into()
}

fn rust_grammar() -> Language {
    tree_sitter_rust::LANGUAGE.into()
}

fn go_grammar() -> Language {
    tree_sitter_go::LANGUAGE.into()
}

fn java_grammar() -> Language {
    tree_sitter_java::LANGUAGE.into()
}

fn typescript_grammar() -> Language {
    tree_sitter_typescript::LANGUAGE_TYPESCRIPT.into()
}

fn tsx_grammar() -> Language {
    tree_sitter_typescript::LANGUAGE_TSX.into()
}

/// Every built-in parser
pub fn all_parsers() -> Vec<Box<dyn StructureParser>> {
    vec![
        Box::new(TreeSitterParser::python()),
        Box::new(TreeSitterParser::rust()),
        Box::new(TreeSitterParser::go()),
        Box::new(TreeSitterParser::java()),
        Box::new(TreeSitterParser::typescript()),
        Box::new(TreeSitterParser::tsx()),
    ]
}

fn field_text(node: &Node<'_>, field: &str, source: &[u8]) -> Option<String> {
    let child = node.child_by_field_name(field)?;
    let text = child.utf8_text(source).ok()?.trim();
    if text.is_empty() {
        None
    } else {
        Some(text.to_string())
    }
}

/// `Foo<T>` -> `Foo`, `&mut Foo` -> `Foo`
fn bare_type_name(text: &str) -> String {
    let without_generics = text.split('<').next().unwrap_or(text);
    without_generics
        .trim_start_matches('&')
        .trim_start_matches("mut ")
        .trim_start_matches("dyn ")
        .trim()
        .to_string()
}

fn classify_python(node: &Node<'_>, source: &[u8]) -> Option<Structure> {
    match node.kind() {
        "class_definition" => field_text(node, "name", source).map(Structure::Class),
        "function_definition" => field_text(node, "name", source).map(Structure::Function),
        _ => None,
    }
}

fn classify_rust(node: &Node<'_>, source: &[u8]) -> Option<Structure> {
    match node.kind() {
        "struct_item" | "enum_item" | "union_item" | "trait_item" => {
            field_text(node, "name", source).map(Structure::Class)
        }
        "impl_item" => field_text(node, "type", source)
            .map(|t| bare_type_name(&t))
            .filter(|t| !t.is_empty())
            .map(Structure::Class),
        "function_item" | "function_signature_item" => {
            field_text(node, "name", source).map(Structure::Function)
        }
        _ => None,
    }
}

fn classify_go(node: &Node<'_>, source: &[u8]) -> Option<Structure> {
    match node.kind() {
        "type_spec" => {
            let ty = node.child_by_field_name("type")?;
            match ty.kind() {
                "struct_type" | "interface_type" => field_text(node, "name", source).map(Structure::Class),
                _ => None,
            }
        }
        "function_declaration" => field_text(node, "name", source).map(Structure::Function),
        "method_declaration" => {
            let name = field_text(node, "name", source)?;
            let receiver = node
                .child_by_field_name("receiver")
                .and_then(|r| first_of_kind(r, "type_identifier"))
                .and_then(|n| n.utf8_text(source).ok().map(str::to_string));

            Some(match receiver {
                Some(receiver) => Structure::MethodOf { receiver, name },
                None => Structure::Function(name),
            })
        }
        _ => None,
    }
}

fn first_of_kind<'t>(root: Node<'t>, kind: &str) -> Option<Node<'t>> {
    let mut stack = vec![root];
    while let Some(node) = stack.pop() {
        if node.kind() == kind {
            return Some(node);
        }
        let mut cursor = node.walk();
        let children: Vec<Node<'t>> = node.named_children(&mut cursor).collect();
        stack.extend(children.into_iter().rev());
    }
    None
}

fn classify_java(node: &Node<'_>, source: &[u8]) -> Option<Structure> {
    match node.kind() {
        "class_declaration"
        | "interface_declaration"
        | "enum_declaration"
        | "record_declaration"
        | "annotation_type_declaration" => field_text(node, "name", source).map(Structure::Class),
        "method_declaration" | "constructor_declaration" => {
            field_text(node, "name", source).map(Structure::Function)
        }
        _ => None,
    }
}

fn classify_typescript(node: &Node<'_>, source: &[u8]) -> Option<Structure> {
    match node.kind() {
        "class_declaration" | "abstract_class_declaration" | "interface_declaration" => {
            field_text(node, "name", source).map(Structure::Class)
        }
        "function_declaration"
        | "generator_function_declaration"
        | "method_definition"
        | "method_signature"
        | "abstract_method_signature" => field_text(node, "name", source).map(Structure::Function),
        "variable_declarator" => {
            let value = node.child_by_field_name("value")?;
            match value.kind() {
                "arrow_function" | "function_expression" | "function" => {
                    field_text(node, "name", source).map(Structure::Function)
                }
                _ => None,
            }
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(parser: &TreeSitterParser, path: &str, source: &str) -> Vec<String> {
        parser
            .parse(source, path)
            .unwrap()
            .into_iter()
            .map(|d| d.stable_identifier)
            .collect()
    }

    const CALCULATOR_PY: &str = r#""""
A simple calculator module
"""

class Calculator:
    """
    A simple calculator class with basic operations
    """

    def add(self, a, b):
        return a + b

    def subtract(self, a, b):
        return a - b


def multiply(a, b):
    return a * b
"#;

    #[test]
    fn test_python_classes_and_methods() {
        let parser = TreeSitterParser::python();
        let elements = parser.parse(CALCULATOR_PY, "src/py/calculator.py").unwrap();

        let ids: Vec<_> = elements.iter().map(|e| e.stable_identifier.as_str()).collect();
        assert_eq!(
            ids,
            vec![
                "src/py/calculator.py:class:Calculator",
                "src/py/calculator.py:class:Calculator:method:add",
                "src/py/calculator.py:class:Calculator:method:subtract",
                "src/py/calculator.py:function:multiply",
            ]
        );

        let class = &elements[0];
        assert_eq!(class.element_type, ElementType::Class);
        assert_eq!(class.name, "Calculator");
        assert_eq!(class.start_line, Some(5));
        assert_eq!(elements[1].element_type, ElementType::Function);
    }

    #[test]
    fn test_python_nested_and_decorated() {
        let source = "class Model:\n    @classmethod\n    def build(cls):\n        def helper():\n            pass\n        return helper\n";
        assert_eq!(
            ids(&TreeSitterParser::python(), "m.py", source),
            vec![
                "m.py:class:Model",
                "m.py:class:Model:method:build",
                "m.py:class:Model:method:build:function:helper",
            ]
        );
    }

    #[test]
    fn test_typescript_elements() {
        let source = r#"
export class Foo {
  constructor(private x: number) {}
  bar(): number { return this.x; }
}

interface Shape { area(): number; }

export function make(): Foo { return new Foo(1); }

const double = (n: number) => n * 2;
"#;
        assert_eq!(
            ids(&TreeSitterParser::typescript(), "a.ts", source),
            vec![
                "a.ts:class:Foo",
                "a.ts:class:Foo:method:constructor",
                "a.ts:class:Foo:method:bar",
                "a.ts:class:Shape",
                "a.ts:class:Shape:method:area",
                "a.ts:function:make",
                "a.ts:function:double",
            ]
        );
    }

    #[test]
    fn test_rust_impl_merges_with_struct() {
        let source = r#"
pub struct Store<T> { items: Vec<T> }

impl<T> Store<T> {
    pub fn len(&self) -> usize { self.items.len() }
}

fn free() {}
"#;
        let parser = TreeSitterParser::rust();
        let elements = parser.parse(source, "src/store.rs").unwrap();
        let ids: Vec<_> = elements.iter().map(|e| e.stable_identifier.as_str()).collect();
        assert_eq!(
            ids,
            vec![
                "src/store.rs:class:Store",
                "src/store.rs:class:Store:method:len",
                "src/store.rs:function:free",
            ]
        );
        // struct declaration wins over the impl block
        assert_eq!(elements[0].start_line, Some(2));
    }

    #[test]
    fn test_go_methods_attach_to_receiver() {
        let source = r#"package main

type Server struct {
	port int
}

func (s *Server) Start() error {
	return nil
}

func main() {}
"#;
        assert_eq!(
            ids(&TreeSitterParser::go(), "cmd/main.go", source),
            vec![
                "cmd/main.go:class:Server",
                "cmd/main.go:class:Server:method:Start",
                "cmd/main.go:function:main",
            ]
        );
    }

    #[test]
    fn test_java_constructors_and_methods() {
        let source = r#"
public class Account {
    public Account() {}
    public void deposit(int amount) {}
    static class Ledger {
        void post() {}
    }
}
"#;
        assert_eq!(
            ids(&TreeSitterParser::java(), "Account.java", source),
            vec![
                "Account.java:class:Account",
                "Account.java:class:Account:method:Account",
                "Account.java:class:Account:method:deposit",
                "Account.java:class:Account:class:Ledger",
                "Account.java:class:Account:class:Ledger:method:post",
            ]
        );
    }

    #[test]
    fn test_syntax_errors_still_yield_elements() {
        let source = "class Broken:\n    def ok(self):\n        pass\n\ndef (:\n";
        let found = ids(&TreeSitterParser::python(), "b.py", source);
        assert!(found.contains(&"b.py:class:Broken".to_string()));
    }

    #[test]
    fn test_bare_type_name() {
        assert_eq!(bare_type_name("Store<T>"), "Store");
        assert_eq!(bare_type_name("&mut Foo"), "Foo");
        assert_eq!(bare_type_name("Bar"), "Bar");
    }
}

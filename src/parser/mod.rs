// Structural parser adapter

pub mod treesitter;

use std::path::Path;
use tracing::{debug, warn};

use crate::error::Result;
use crate::store::ElementType;

/// Default size ceiling for parsed files
pub const MAX_FILE_SIZE: usize = 1024 * 1024;

/// A structural element found in one file, before any identity is assigned
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElementDescriptor {
    pub element_type: ElementType,
    pub stable_identifier: String,
    pub name: String,
    /// 1-based, inclusive
    pub start_line: Option<u32>,
    pub end_line: Option<u32>,
}

/// Parser trait for different languages
pub trait StructureParser: Send + Sync {
    fn language(&self) -> &'static str;

    fn extensions(&self) -> &'static [&'static str];

    fn can_parse(&self, file_path: &str) -> bool {
        extension_of(file_path).is_some_and(|ext| self.extensions().contains(&ext))
    }

    /// Class and function descriptors for the file, in source order.
    /// The file-level descriptor is added by [`ParserRegistry`].
    fn parse(&self, content: &str, file_path: &str) -> Result<Vec<ElementDescriptor>>;
}

fn extension_of(file_path: &str) -> Option<&str> {
    Path::new(file_path).extension().and_then(|e| e.to_str())
}

/// Dispatches files to a language parser by extension
pub struct ParserRegistry {
    parsers: Vec<Box<dyn StructureParser>>,
    max_file_size: usize,
}

impl ParserRegistry {
    pub fn new(max_file_size: usize) -> Self {
        Self {
            parsers: Vec::new(),
            max_file_size,
        }
    }

    /// Registry with every built-in language parser
    pub fn with_defaults(max_file_size: usize) -> Self {
        let mut registry = Self::new(max_file_size);
        for parser in treesitter::all_parsers() {
            registry.register(parser);
        }
        registry
    }

    /// Registry restricted to the named languages
    pub fn for_languages(languages: &[String], max_file_size: usize) -> Self {
        let mut registry = Self::new(max_file_size);
        for parser in treesitter::all_parsers() {
            if languages.iter().any(|l| l == parser.language()) {
                registry.register(parser);
            }
        }
        registry
    }

    pub fn register(&mut self, parser: Box<dyn StructureParser>) {
        self.parsers.push(parser);
    }

    pub fn languages(&self) -> Vec<&'static str> {
        self.parsers.iter().map(|p| p.language()).collect()
    }

    pub fn max_file_size(&self) -> usize {
        self.max_file_size
    }

    pub fn parser_for(&self, file_path: &str) -> Option<&dyn StructureParser> {
        self.parsers
            .iter()
            .find(|p| p.can_parse(file_path))
            .map(|p| p.as_ref())
    }

    pub fn supports(&self, file_path: &str) -> bool {
        self.parser_for(file_path).is_some()
    }

    /// Descriptors for one file: the file itself followed by its classes and
    /// functions.
    ///
    /// Oversized files and unknown extensions yield an empty list. A parse
    /// failure is logged and also yields an empty list, so one bad file never
    /// blocks the rest of a commit.
    pub fn parse_file(&self, file_path: &str, content: &[u8]) -> Vec<ElementDescriptor> {
        let Some(parser) = self.parser_for(file_path) else {
            debug!("No parser for {}", file_path);
            return Vec::new();
        };

        if content.len() > self.max_file_size {
            debug!("Skipping {} ({} bytes exceeds ceiling)", file_path, content.len());
            return Vec::new();
        }

        let text = match std::str::from_utf8(content) {
            Ok(text) => text,
            Err(e) => {
                warn!("Skipping {}: not valid UTF-8 ({})", file_path, e);
                return Vec::new();
            }
        };

        match parser.parse(text, file_path) {
            Ok(children) => {
                let mut descriptors = Vec::with_capacity(children.len() + 1);
                descriptors.push(file_descriptor(file_path, text));
                descriptors.extend(children);
                descriptors
            }
            Err(e) => {
                warn!("{}", e);
                Vec::new()
            }
        }
    }
}

fn file_descriptor(file_path: &str, text: &str) -> ElementDescriptor {
    let name = Path::new(file_path)
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or(file_path)
        .to_string();

    ElementDescriptor {
        element_type: ElementType::File,
        stable_identifier: file_path.to_string(),
        name,
        start_line: Some(1),
        end_line: Some(text.lines().count().max(1) as u32),
    }
}

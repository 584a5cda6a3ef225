//! Resolves `include` and `extends` into a single node tree.

use std::fs;
use std::path::{Path, PathBuf};

use rustc_hash::FxHashMap;

use super::TemplateError;
use super::node::{Block, BlockMode, Node};
use super::parser::parse;

/// Maximum nesting of includes and layouts before assuming a cycle.
const MAX_DEPTH: usize = 32;

/// Extension assumed for include/extends paths without one.
const TEMPLATE_EXT: &str = "pug";

type Result<T> = std::result::Result<T, TemplateError>;

/// Loads templates from disk and splices includes and layouts.
pub(super) struct Loader<'a> {
    /// Root for absolute (`/partials/x`) include paths.
    basedir: &'a Path,
}

impl<'a> Loader<'a> {
    pub fn new(basedir: &'a Path) -> Self {
        Self { basedir }
    }

    /// Read, parse and resolve a template file.
    pub fn load_file(&self, path: &Path) -> Result<Vec<Node>> {
        self.load_file_at(path, 0)
    }

    /// Parse and resolve template source as if it were read from `path`.
    pub fn load_str(&self, source: &str, path: &Path) -> Result<Vec<Node>> {
        self.resolve_source(source, path, 0)
    }

    fn load_file_at(&self, path: &Path, depth: usize) -> Result<Vec<Node>> {
        let source = read(path)?;
        self.resolve_source(&source, path, depth)
    }

    fn resolve_source(&self, source: &str, path: &Path, depth: usize) -> Result<Vec<Node>> {
        if depth > MAX_DEPTH {
            return Err(TemplateError::new(
                path,
                0,
                "too many nested includes or layouts (is there a cycle?)",
            ));
        }

        let nodes = parse(source).map_err(|(line, message)| TemplateError::new(path, line, message))?;
        let nodes = self.resolve_includes(nodes, path, depth)?;

        let (extends, nodes) = split_extends(nodes, path)?;
        let Some((layout, line)) = extends else {
            return Ok(nodes);
        };

        let layout_path = self.resolve_path(&layout, path, line)?;
        let mut tree = self.load_file_at(&layout_path, depth + 1)?;
        let blocks = collect_overrides(nodes, path)?;
        apply_overrides(&mut tree, &blocks);
        Ok(tree)
    }

    /// Replace every `include` node with the included content.
    fn resolve_includes(&self, nodes: Vec<Node>, path: &Path, depth: usize) -> Result<Vec<Node>> {
        nodes
            .into_iter()
            .map(|node| self.resolve_node(node, path, depth))
            .collect()
    }

    fn resolve_node(&self, node: Node, path: &Path, depth: usize) -> Result<Node> {
        Ok(match node {
            Node::Include { path: target, line } => {
                let target = self.resolve_path(&target, path, line)?;
                if target.extension().is_some_and(|ext| ext == TEMPLATE_EXT) {
                    Node::Fragment(self.load_file_at(&target, depth + 1)?)
                } else {
                    let raw = fs::read_to_string(&target).map_err(|err| {
                        TemplateError::new(
                            path,
                            line,
                            format!("cannot include `{}`: {err}", target.display()),
                        )
                    })?;
                    Node::Text(raw.trim_end().to_string())
                }
            }
            Node::Element(mut element) => {
                element.children = self.resolve_includes(element.children, path, depth)?;
                Node::Element(element)
            }
            Node::Fragment(children) => {
                Node::Fragment(self.resolve_includes(children, path, depth)?)
            }
            Node::Block(mut block) => {
                block.children = self.resolve_includes(block.children, path, depth)?;
                Node::Block(block)
            }
            other => other,
        })
    }

    /// Resolve a referenced path against the referencing file.
    ///
    /// Absolute paths resolve against the base directory. Paths without an
    /// extension get `.pug`.
    fn resolve_path(&self, target: &str, from: &Path, line: usize) -> Result<PathBuf> {
        let target = target.trim_matches(|c| c == '"' || c == '\'');
        let mut resolved = match target.strip_prefix('/') {
            Some(rooted) => self.basedir.join(rooted),
            None => from
                .parent()
                .map_or_else(|| PathBuf::from(target), |dir| dir.join(target)),
        };
        if resolved.extension().is_none() {
            resolved.set_extension(TEMPLATE_EXT);
        }
        if !resolved.is_file() {
            return Err(TemplateError::new(
                from,
                line,
                format!("template `{}` not found", resolved.display()),
            ));
        }
        Ok(resolved)
    }
}

fn read(path: &Path) -> Result<String> {
    fs::read_to_string(path).map_err(|err| TemplateError::new(path, 0, err.to_string()))
}

/// Separate a leading `extends` (layout path and line) from the remaining
/// top-level nodes.
fn split_extends(nodes: Vec<Node>, path: &Path) -> Result<(Option<(String, usize)>, Vec<Node>)> {
    let mut extends = None;
    let mut rest = Vec::new();

    for node in nodes {
        match node {
            Node::Extends { path: layout, line } => {
                if extends.is_some() || !rest.is_empty() {
                    return Err(TemplateError::new(
                        path,
                        line,
                        "`extends` must be the first statement and appear once",
                    ));
                }
                extends = Some((layout, line));
            }
            other => rest.push(other),
        }
    }

    Ok((extends, rest))
}

/// Gather the block overrides of an extending template, in source order.
fn collect_overrides(nodes: Vec<Node>, path: &Path) -> Result<FxHashMap<String, Vec<Block>>> {
    let mut blocks: FxHashMap<String, Vec<Block>> = FxHashMap::default();
    for node in nodes {
        match node {
            Node::Block(block) => blocks.entry(block.name.clone()).or_default().push(block),
            Node::Comment(_) => {}
            Node::Fragment(children) => {
                for (name, mut more) in collect_overrides(children, path)? {
                    blocks.entry(name).or_default().append(&mut more);
                }
            }
            _ => {
                return Err(TemplateError::new(
                    path,
                    0,
                    "only named blocks may appear at the top level of an extending template",
                ));
            }
        }
    }
    Ok(blocks)
}

/// Apply overrides to every matching block slot in the layout tree.
fn apply_overrides(nodes: &mut [Node], blocks: &FxHashMap<String, Vec<Block>>) {
    for node in nodes {
        match node {
            Node::Block(slot) => {
                if let Some(overrides) = blocks.get(&slot.name) {
                    for block in overrides {
                        match block.mode {
                            BlockMode::Replace => slot.children = block.children.clone(),
                            BlockMode::Append => slot.children.extend(block.children.iter().cloned()),
                            BlockMode::Prepend => {
                                let mut children = block.children.clone();
                                children.append(&mut slot.children);
                                slot.children = children;
                            }
                        }
                    }
                }
                apply_overrides(&mut slot.children, blocks);
            }
            Node::Element(element) => apply_overrides(&mut element.children, blocks),
            Node::Fragment(children) => apply_overrides(children, blocks),
            _ => {}
        }
    }
}

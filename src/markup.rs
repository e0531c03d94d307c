//! Generic markup node tree: the boundary between the in-memory model and
//! the persisted XFL structure.
//!
//! Architecture:
//! - The model is the source of truth; entities produce nodes on demand via
//!   `to_node()` and consume them once via `from_node()`.
//! - Attribute and child order is preserved (the persisted format cares).
//! - Default-value elision is a serializer concern: `set_attr_unless()` is
//!   how `to_node()` implementations omit defaults, while `from_node()`
//!   always falls back to the same defaults on absent attributes.
//!
//! Actual text parsing/printing of the markup lives outside this crate; a
//! `Node` tree is what crosses the `io::MarkupIo` port.

use std::fmt::Display;
use std::str::FromStr;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::{Result, XflError};

/// One markup element: name, ordered attributes, ordered children.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub name: String,
    attrs: IndexMap<String, String>,
    pub children: Vec<Node>,
}

impl Node {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attrs: IndexMap::new(),
            children: Vec::new(),
        }
    }

    // ========== Attributes ==========

    /// Raw attribute lookup.
    pub fn attr(&self, key: &str) -> Option<&str> {
        self.attrs.get(key).map(String::as_str)
    }

    pub fn has_attr(&self, key: &str) -> bool {
        self.attrs.contains_key(key)
    }

    /// Parse an attribute, falling back to `default` when absent.
    ///
    /// A present-but-unparsable value is a `Validation` error: the persisted
    /// document said something, it just was not in the domain.
    pub fn attr_or<T: FromStr>(&self, key: &str, default: T) -> Result<T> {
        match self.attrs.get(key) {
            None => Ok(default),
            Some(raw) => raw.parse().map_err(|_| {
                XflError::validation(format!(
                    "attribute '{}'='{}' on <{}> is not a valid {}",
                    key,
                    raw,
                    self.name,
                    std::any::type_name::<T>()
                ))
            }),
        }
    }

    /// Parse a required attribute; absence is a `Validation` error.
    pub fn attr_req<T: FromStr>(&self, key: &str) -> Result<T> {
        let raw = self.attrs.get(key).ok_or_else(|| {
            XflError::validation(format!("missing attribute '{}' on <{}>", key, self.name))
        })?;
        raw.parse().map_err(|_| {
            XflError::validation(format!(
                "attribute '{}'='{}' on <{}> is not a valid {}",
                key,
                raw,
                self.name,
                std::any::type_name::<T>()
            ))
        })
    }

    /// String attribute with a default.
    pub fn attr_str(&self, key: &str, default: &str) -> String {
        self.attrs
            .get(key)
            .cloned()
            .unwrap_or_else(|| default.to_string())
    }

    pub fn set_attr(&mut self, key: impl Into<String>, value: impl Display) {
        self.attrs.insert(key.into(), value.to_string());
    }

    /// Write the attribute only when it differs from its default.
    pub fn set_attr_unless<T: Display + PartialEq>(&mut self, key: &str, value: &T, default: &T) {
        if value != default {
            self.set_attr(key, value);
        }
    }

    /// Builder-style `set_attr`, for literal node construction in tests.
    pub fn with_attr(mut self, key: impl Into<String>, value: impl Display) -> Self {
        self.set_attr(key, value);
        self
    }

    // ========== Children ==========

    pub fn push(&mut self, child: Node) {
        self.children.push(child);
    }

    pub fn with_child(mut self, child: Node) -> Self {
        self.children.push(child);
        self
    }

    /// First child with the given name.
    pub fn child(&self, name: &str) -> Option<&Node> {
        self.children.iter().find(|c| c.name == name)
    }

    pub fn child_mut(&mut self, name: &str) -> Option<&mut Node> {
        self.children.iter_mut().find(|c| c.name == name)
    }

    /// All children with the given name, in document order.
    pub fn children_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Node> {
        self.children.iter().filter(move |c| c.name == name)
    }

    /// Children of the first child with the given name (the common
    /// wrapper-group pattern: `<frames><DOMFrame/>...</frames>`).
    pub fn grandchildren<'a>(&'a self, group: &'a str) -> impl Iterator<Item = &'a Node> {
        self.child(group).into_iter().flat_map(|g| g.children.iter())
    }

    /// Wrap `children` in a named group node and append it, skipping the
    /// group entirely when empty.
    pub fn push_group(&mut self, group: &str, children: Vec<Node>) {
        if children.is_empty() {
            return;
        }
        let mut g = Node::new(group);
        g.children = children;
        self.push(g);
    }
}

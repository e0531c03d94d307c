//! Affine placement types: `Matrix` and `Point`.
//!
//! Always fully populated in the model; whether a default-valued transform
//! appears in the persisted markup is decided by `to_node()` alone.

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::markup::Node;

/// Tolerance for treating a transform field as its default value.
pub const EPSILON: f64 = 1e-4;

fn near(a: f64, b: f64) -> bool {
    (a - b).abs() < EPSILON
}

/// 2D affine matrix in column form: x' = a*x + c*y + tx, y' = b*x + d*y + ty.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Matrix {
    pub a: f64,
    pub b: f64,
    pub c: f64,
    pub d: f64,
    pub tx: f64,
    pub ty: f64,
}

impl Default for Matrix {
    fn default() -> Self {
        Self { a: 1.0, b: 0.0, c: 0.0, d: 1.0, tx: 0.0, ty: 0.0 }
    }
}

impl Matrix {
    /// Identity within `EPSILON` on every field.
    pub fn is_default(&self) -> bool {
        near(self.a, 1.0)
            && near(self.b, 0.0)
            && near(self.c, 0.0)
            && near(self.d, 1.0)
            && near(self.tx, 0.0)
            && near(self.ty, 0.0)
    }

    /// Serialize to a `<Matrix>` node. Fields at their default are elided;
    /// call sites usually skip the whole node when `is_default()`.
    pub fn to_node(&self) -> Node {
        let mut n = Node::new("Matrix");
        if !near(self.a, 1.0) {
            n.set_attr("a", self.a);
        }
        if !near(self.b, 0.0) {
            n.set_attr("b", self.b);
        }
        if !near(self.c, 0.0) {
            n.set_attr("c", self.c);
        }
        if !near(self.d, 1.0) {
            n.set_attr("d", self.d);
        }
        if !near(self.tx, 0.0) {
            n.set_attr("tx", self.tx);
        }
        if !near(self.ty, 0.0) {
            n.set_attr("ty", self.ty);
        }
        n
    }

    pub fn from_node(node: &Node) -> Result<Self> {
        Ok(Self {
            a: node.attr_or("a", 1.0)?,
            b: node.attr_or("b", 0.0)?,
            c: node.attr_or("c", 0.0)?,
            d: node.attr_or("d", 1.0)?,
            tx: node.attr_or("tx", 0.0)?,
            ty: node.attr_or("ty", 0.0)?,
        })
    }
}

/// 2D point, used for transformation pivots.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn is_default(&self) -> bool {
        near(self.x, 0.0) && near(self.y, 0.0)
    }

    pub fn to_node(&self) -> Node {
        let mut n = Node::new("Point");
        if !near(self.x, 0.0) {
            n.set_attr("x", self.x);
        }
        if !near(self.y, 0.0) {
            n.set_attr("y", self.y);
        }
        n
    }

    pub fn from_node(node: &Node) -> Result<Self> {
        Ok(Self {
            x: node.attr_or("x", 0.0)?,
            y: node.attr_or("y", 0.0)?,
        })
    }
}

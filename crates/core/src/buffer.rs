//! Flat node-major storage for discretized trajectories.

use serde::Serialize;
use thiserror::Error;

/// Raised when flat data does not match the requested node layout.
#[derive(Debug, Error, PartialEq)]
pub enum ShapeError {
    #[error("buffer holds {len} values, expected {nodes} nodes x {width} components")]
    Mismatch {
        len: usize,
        nodes: usize,
        width: usize,
    },
    #[error("node width must be positive")]
    ZeroWidth,
}

/// Contiguous row-major buffer of `nodes` rows with `width` components each.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NodeBuffer {
    nodes: usize,
    width: usize,
    data: Vec<f64>,
}

impl NodeBuffer {
    /// Zero-filled buffer with the given shape.
    pub fn zeros(nodes: usize, width: usize) -> Self {
        Self {
            nodes,
            width,
            data: vec![0.0; nodes * width],
        }
    }

    /// Wrap existing flat data, checking it matches the shape.
    pub fn from_flat(nodes: usize, width: usize, data: Vec<f64>) -> Result<Self, ShapeError> {
        if width == 0 {
            return Err(ShapeError::ZeroWidth);
        }
        if data.len() != nodes * width {
            return Err(ShapeError::Mismatch {
                len: data.len(),
                nodes,
                width,
            });
        }
        Ok(Self { nodes, width, data })
    }

    /// Build from a sequence of fixed-width rows.
    pub fn from_rows<const W: usize>(rows: &[[f64; W]]) -> Self {
        let mut data = Vec::with_capacity(rows.len() * W);
        for row in rows {
            data.extend_from_slice(row);
        }
        Self {
            nodes: rows.len(),
            width: W,
            data,
        }
    }

    pub fn nodes(&self) -> usize {
        self.nodes
    }

    pub fn width(&self) -> usize {
        self.width
    }

    /// `(nodes, width)` pair.
    pub fn shape(&self) -> (usize, usize) {
        (self.nodes, self.width)
    }

    pub fn is_empty(&self) -> bool {
        self.nodes == 0
    }

    /// Borrow a single node row. Panics when `k` is out of range, like slice indexing.
    pub fn node(&self, k: usize) -> &[f64] {
        &self.data[k * self.width..(k + 1) * self.width]
    }

    pub fn node_mut(&mut self, k: usize) -> &mut [f64] {
        &mut self.data[k * self.width..(k + 1) * self.width]
    }

    /// Copy a node into a fixed-size array. Returns `None` on width mismatch or bad index.
    pub fn node_array<const W: usize>(&self, k: usize) -> Option<[f64; W]> {
        if W != self.width || k >= self.nodes {
            return None;
        }
        let mut out = [0.0; W];
        out.copy_from_slice(self.node(k));
        Some(out)
    }

    pub fn get(&self, k: usize, component: usize) -> f64 {
        self.data[k * self.width + component]
    }

    pub fn set(&mut self, k: usize, component: usize, value: f64) {
        self.data[k * self.width + component] = value;
    }

    /// Iterate node rows in order.
    pub fn rows(&self) -> impl Iterator<Item = &[f64]> {
        self.data.chunks_exact(self.width.max(1))
    }

    /// Values of one component across all nodes.
    pub fn column(&self, component: usize) -> impl Iterator<Item = f64> + '_ {
        self.rows().map(move |row| row[component])
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.data
    }

    pub fn into_inner(self) -> Vec<f64> {
        self.data
    }

    /// True when every stored value is finite.
    pub fn is_finite(&self) -> bool {
        self.data.iter().all(|v| v.is_finite())
    }
}

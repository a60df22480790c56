//! Index arithmetic for the flat decision vector: all state nodes, then all control nodes.

use descent_dynamics::{CONTROL_DIM, STATE_DIM};

/// Width of one Hessian block `(s_k, u_k)`.
pub const INTERVAL_BLOCK: usize = STATE_DIM + CONTROL_DIM;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VariableLayout {
    intervals: usize,
}

impl VariableLayout {
    pub fn new(intervals: usize) -> Self {
        Self { intervals }
    }

    pub fn intervals(&self) -> usize {
        self.intervals
    }

    pub fn state_nodes(&self) -> usize {
        self.intervals + 1
    }

    pub fn num_state_vars(&self) -> usize {
        self.state_nodes() * STATE_DIM
    }

    pub fn num_variables(&self) -> usize {
        self.num_state_vars() + self.intervals * CONTROL_DIM
    }

    #[inline]
    pub fn state(&self, node: usize, component: usize) -> usize {
        node * STATE_DIM + component
    }

    #[inline]
    pub fn control(&self, node: usize, component: usize) -> usize {
        self.num_state_vars() + node * CONTROL_DIM + component
    }

    pub fn state_slice<'x>(&self, x: &'x [f64], node: usize) -> &'x [f64] {
        let start = self.state(node, 0);
        &x[start..start + STATE_DIM]
    }

    pub fn control_slice<'x>(&self, x: &'x [f64], node: usize) -> &'x [f64] {
        let start = self.control(node, 0);
        &x[start..start + CONTROL_DIM]
    }

    pub fn state_array(&self, x: &[f64], node: usize) -> [f64; STATE_DIM] {
        let mut out = [0.0; STATE_DIM];
        out.copy_from_slice(self.state_slice(x, node));
        out
    }

    pub fn control_array(&self, x: &[f64], node: usize) -> [f64; CONTROL_DIM] {
        let mut out = [0.0; CONTROL_DIM];
        out.copy_from_slice(self.control_slice(x, node));
        out
    }

    /// First row of the defect block for `interval`.
    #[inline]
    pub fn defect_row(&self, interval: usize, component: usize) -> usize {
        interval * STATE_DIM + component
    }

    pub fn num_defect_rows(&self) -> usize {
        self.intervals * STATE_DIM
    }

    /// Decision-variable indices of each Hessian block: `(s_k, u_k)` for every interval, then `s_N`.
    pub fn hessian_blocks(&self) -> Vec<Vec<usize>> {
        let mut blocks = Vec::with_capacity(self.state_nodes());
        for k in 0..self.intervals {
            let mut block: Vec<usize> = (0..STATE_DIM).map(|i| self.state(k, i)).collect();
            block.extend((0..CONTROL_DIM).map(|j| self.control(k, j)));
            blocks.push(block);
        }
        blocks.push((0..STATE_DIM).map(|i| self.state(self.intervals, i)).collect());
        blocks
    }

    /// Offset of block `k` inside the concatenated dense Hessian values.
    pub fn hessian_offset(&self, block: usize) -> usize {
        block.min(self.intervals) * INTERVAL_BLOCK * INTERVAL_BLOCK
    }

    pub fn hessian_len(&self) -> usize {
        self.intervals * INTERVAL_BLOCK * INTERVAL_BLOCK + STATE_DIM * STATE_DIM
    }
}

use serde::{Deserialize, Serialize};

const D3Q15: [[i32; 3]; 15] = [
    [0, 0, 0],
    [1, 1, 1],
    [1, 1, -1],
    [1, 0, 0],
    [1, -1, 1],
    [1, -1, -1],
    [0, 1, 0],
    [0, 0, 1],
    [0, 0, -1],
    [0, -1, 0],
    [-1, 1, 1],
    [-1, 1, -1],
    [-1, 0, 0],
    [-1, -1, 1],
    [-1, -1, -1],
];

const D3Q19: [[i32; 3]; 19] = [
    [0, 0, 0],
    [1, 1, 0],
    [1, 0, 1],
    [1, 0, 0],
    [1, 0, -1],
    [1, -1, 0],
    [0, 1, 1],
    [0, 1, 0],
    [0, 1, -1],
    [0, 0, 1],
    [0, 0, -1],
    [0, -1, 1],
    [0, -1, 0],
    [0, -1, -1],
    [-1, 1, 0],
    [-1, 0, 1],
    [-1, 0, 0],
    [-1, 0, -1],
    [-1, -1, 0],
];

/// Discrete velocity sets for the full-velocity-set stress stencil.
///
/// Index 0 is always the rest velocity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VelocitySet {
    D3Q15,
    D3Q19,
}

impl VelocitySet {
    pub fn velocities(&self) -> &'static [[i32; 3]] {
        match self {
            VelocitySet::D3Q15 => &D3Q15,
            VelocitySet::D3Q19 => &D3Q19,
        }
    }

    pub fn nvel(&self) -> usize {
        self.velocities().len()
    }

    pub fn name(&self) -> &'static str {
        match self {
            VelocitySet::D3Q15 => "d3q15",
            VelocitySet::D3Q19 => "d3q19",
        }
    }

    /// `sum_p c[p][axis]^2`, which sets the normalisation of the gradient estimate.
    pub fn second_moment(&self, axis: usize) -> i32 {
        self.velocities().iter().map(|c| c[axis] * c[axis]).sum()
    }
}

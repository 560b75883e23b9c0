//! Thermodynamic force stencils and a red/black SOR Poisson solver for
//! lattice fluid simulations.
//!
//! The force kernels turn a chemical stress tensor or a set of chemical
//! potentials into a body force on the fluid, conserving momentum exactly on
//! a periodic lattice. The Poisson solver relaxes the electrostatic potential
//! of a set of charged species with uniform or position-dependent
//! permittivity.

pub mod config;
pub mod discretization;
pub mod error;
pub mod models;
pub mod numerics;
pub mod physics;
pub mod processing;

pub use error::PreconditionError;

pub mod force;
pub mod force_stress;
pub mod functional;
pub mod grad_mu;
pub mod psi;
pub mod stress;

use nalgebra::{Matrix3, Vector3};

/// Upper bound on order-parameter components handled by the gradient kernels.
pub const MAX_COMPONENTS: usize = 5;

/// Supplies the (possibly asymmetric) chemical stress tensor at a site.
pub trait ChemicalStress: Sync {
    fn chemical_stress(&self, index: usize) -> Matrix3<f64>;
}

/// Supplies the chemical potentials at a site.
pub trait ChemicalPotential: Sync {
    /// Number of leading entries of `mu` the provider fills.
    fn n_mu(&self) -> usize;

    /// Write the chemical potentials at `index` into `mu`, which always has
    /// `MAX_COMPONENTS + 1` slots. Entries beyond `n_mu()` are left alone.
    fn chemical_potential(&self, index: usize, mu: &mut [f64]);
}

/// Position-dependent permittivity.
pub trait Permittivity: Sync {
    fn epsilon(&self, index: usize) -> f64;
}

/// Additive per-site body-force sink.
pub trait ForceSink {
    fn add_local_force(&mut self, index: usize, force: &Vector3<f64>);
}

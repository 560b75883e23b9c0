use crate::physics::{ChemicalPotential, ChemicalStress, MAX_COMPONENTS, Permittivity};
use nalgebra::Matrix3;

// Closure signatures for free-energy models configured at run time.

// Stress function: f(site_index) -> Pth
type StressFn<'a> = Box<dyn Fn(usize) -> Matrix3<f64> + Sync + 'a>;

// Chemical potential function: f(site_index, mu)
type ChemicalPotentialFn<'a> = Box<dyn Fn(usize, &mut [f64]) + Sync + 'a>;

// Permittivity function: f(site_index) -> epsilon
type PermittivityFn<'a> = Box<dyn Fn(usize) -> f64 + Sync + 'a>;

/// A chemical stress provider configured by a user-defined closure.
pub struct FunctionalStress<'a> {
    stress: StressFn<'a>,
}

impl<'a> FunctionalStress<'a> {
    pub fn new<F>(stress: F) -> Self
    where
        F: Fn(usize) -> Matrix3<f64> + Sync + 'a,
    {
        Self {
            stress: Box::new(stress),
        }
    }
}

impl ChemicalStress for FunctionalStress<'_> {
    fn chemical_stress(&self, index: usize) -> Matrix3<f64> {
        (self.stress)(index)
    }
}

/// A chemical potential provider configured by a user-defined closure.
///
/// `n_mu` may be one more than the number of order-parameter components for
/// models that carry an extra potential; the gradient kernels only read the
/// leading `nf` entries.
pub struct FunctionalChemicalPotential<'a> {
    pub n_mu: usize,
    mu: ChemicalPotentialFn<'a>,
}

impl<'a> FunctionalChemicalPotential<'a> {
    pub fn new<F>(n_mu: usize, mu: F) -> Self
    where
        F: Fn(usize, &mut [f64]) + Sync + 'a,
    {
        debug_assert!(n_mu <= MAX_COMPONENTS + 1);
        Self {
            n_mu,
            mu: Box::new(mu),
        }
    }
}

impl ChemicalPotential for FunctionalChemicalPotential<'_> {
    fn n_mu(&self) -> usize {
        self.n_mu
    }

    fn chemical_potential(&self, index: usize, mu: &mut [f64]) {
        (self.mu)(index, mu)
    }
}

pub struct FunctionalPermittivity<'a> {
    epsilon: PermittivityFn<'a>,
}

impl<'a> FunctionalPermittivity<'a> {
    pub fn new<F>(epsilon: F) -> Self
    where
        F: Fn(usize) -> f64 + Sync + 'a,
    {
        Self {
            epsilon: Box::new(epsilon),
        }
    }

    pub fn constant(epsilon: f64) -> Self {
        Self::new(move |_| epsilon)
    }
}

impl Permittivity for FunctionalPermittivity<'_> {
    fn epsilon(&self, index: usize) -> f64 {
        (self.epsilon)(index)
    }
}

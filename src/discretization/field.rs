use crate::discretization::kernel::KernelRange;
use crate::discretization::lattice::Lattice;
use crate::physics::ForceSink;
use nalgebra::Vector3;

/// Site-major storage for an `nf`-component field over every allocated site.
#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    nf: usize,
    data: Vec<f64>,
}

impl Field {
    pub fn new(lattice: &dyn Lattice, nf: usize) -> Self {
        Self {
            nf,
            data: vec![0.0; lattice.nsites() * nf],
        }
    }

    /// Fill the interior from `f(ic, jc, kc, values)` and refresh the halo.
    pub fn from_fn<F>(lattice: &dyn Lattice, nf: usize, mut f: F) -> Self
    where
        F: FnMut(i32, i32, i32, &mut [f64]),
    {
        let mut field = Self::new(lattice, nf);
        for site in KernelRange::interior(lattice).sites() {
            f(site.ic, site.jc, site.kc, field.values_mut(site.index));
        }
        field.halo(lattice);
        field
    }

    pub fn nf(&self) -> usize {
        self.nf
    }

    pub fn nsites(&self) -> usize {
        self.data.len() / self.nf.max(1)
    }

    #[inline]
    pub fn scalar(&self, index: usize, n: usize) -> f64 {
        self.data[index * self.nf + n]
    }

    #[inline]
    pub fn set_scalar(&mut self, index: usize, n: usize, value: f64) {
        self.data[index * self.nf + n] = value;
    }

    #[inline]
    pub fn values(&self, index: usize) -> &[f64] {
        &self.data[index * self.nf..(index + 1) * self.nf]
    }

    #[inline]
    pub fn values_mut(&mut self, index: usize) -> &mut [f64] {
        &mut self.data[index * self.nf..(index + 1) * self.nf]
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.data
    }

    pub fn as_mut_slice(&mut self) -> &mut [f64] {
        &mut self.data
    }

    pub fn halo(&mut self, lattice: &dyn Lattice) {
        lattice.halo_exchange(&mut self.data, self.nf);
    }
}

/// Per-site body-force accumulator.
#[derive(Debug, Clone, PartialEq)]
pub struct ForceField {
    forces: Vec<Vector3<f64>>,
}

impl ForceField {
    pub fn new(lattice: &dyn Lattice) -> Self {
        Self {
            forces: vec![Vector3::zeros(); lattice.nsites()],
        }
    }

    pub fn force(&self, index: usize) -> Vector3<f64> {
        self.forces[index]
    }

    pub fn zero(&mut self) {
        self.forces.iter_mut().for_each(|f| *f = Vector3::zeros());
    }

    /// Sum of the force over the interior of every process.
    pub fn total(&self, lattice: &dyn Lattice) -> Vector3<f64> {
        let mut sum = [0.0; 3];
        for site in KernelRange::interior(lattice).sites() {
            let f = &self.forces[site.index];
            for (s, v) in sum.iter_mut().zip(f.iter()) {
                *s += v;
            }
        }
        lattice.communicator().all_reduce_sum(&mut sum);
        Vector3::from(sum)
    }
}

impl ForceSink for ForceField {
    fn add_local_force(&mut self, index: usize, force: &Vector3<f64>) {
        self.forces[index] += force;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum SiteStatus {
    Fluid = 0,
    Boundary = 1,
    Colloid = 2,
}

impl SiteStatus {
    fn from_code(code: u8) -> Self {
        match code {
            1 => SiteStatus::Boundary,
            2 => SiteStatus::Colloid,
            _ => SiteStatus::Fluid,
        }
    }
}

/// Geometry map: the status of every allocated site.
#[derive(Debug, Clone)]
pub struct SiteMap {
    status: Vec<u8>,
}

impl SiteMap {
    /// An all-fluid map.
    pub fn new(lattice: &dyn Lattice) -> Self {
        Self {
            status: vec![SiteStatus::Fluid as u8; lattice.nsites()],
        }
    }

    pub fn status(&self, index: usize) -> SiteStatus {
        SiteStatus::from_code(self.status[index])
    }

    pub fn set_status(&mut self, index: usize, status: SiteStatus) {
        self.status[index] = status as u8;
    }

    pub fn halo(&mut self, lattice: &dyn Lattice) {
        lattice.halo_exchange_bytes(&mut self.status, 1);
    }
}

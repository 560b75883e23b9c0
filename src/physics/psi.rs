use crate::discretization::field::Field;
use crate::discretization::kernel::KernelRange;
use crate::discretization::lattice::Lattice;
use serde::{Deserialize, Serialize};

/// Physical parameters of the Poisson equation `div(eps grad psi) = -e beta rho`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ElectrostaticParams {
    /// Uniform permittivity.
    pub epsilon: f64,
    /// Inverse thermal energy.
    pub beta: f64,
    pub unit_charge: f64,
    /// Applied field `E0`; represented through the potential jump halo.
    pub external_field: [f64; 3],
}

impl Default for ElectrostaticParams {
    fn default() -> Self {
        Self {
            epsilon: 1.0,
            beta: 1.0,
            unit_charge: 1.0,
            external_field: [0.0; 3],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SolverParams {
    /// Iteration cap; `None` keeps the solver variant's own default.
    pub max_iterations: Option<u32>,
    pub reltol: f64,
    pub abstol: f64,
    /// Convergence is reported on steps that are a multiple of this.
    pub nfreq: usize,
}

impl Default for SolverParams {
    fn default() -> Self {
        Self {
            max_iterations: None,
            reltol: f32::EPSILON as f64,
            abstol: 0.01 * f32::EPSILON as f64,
            nfreq: 100,
        }
    }
}

/// Minimum, maximum and total of each charged species over the interior,
/// followed by the same for the total charge density `rho_elec`.
#[derive(Debug, Clone, PartialEq)]
pub struct ChargeStats {
    pub min: Vec<f64>,
    pub max: Vec<f64>,
    pub total: Vec<f64>,
}

/// Electrostatic potential and the charge densities that source it.
#[derive(Debug, Clone)]
pub struct Potential {
    pub nk: usize,
    pub valency: Vec<i32>,
    pub params: ElectrostaticParams,
    pub solver: SolverParams,
    psi: Field,
    rho: Field,
}

impl Potential {
    pub fn new(lattice: &dyn Lattice, nk: usize) -> Self {
        Self {
            nk,
            valency: vec![0; nk],
            params: ElectrostaticParams::default(),
            solver: SolverParams::default(),
            psi: Field::new(lattice, 1),
            rho: Field::new(lattice, nk),
        }
    }

    pub fn nsites(&self) -> usize {
        self.psi.nsites()
    }

    #[inline]
    pub fn psi(&self, index: usize) -> f64 {
        self.psi.scalar(index, 0)
    }

    #[inline]
    pub fn set_psi(&mut self, index: usize, value: f64) {
        self.psi.set_scalar(index, 0, value);
    }

    pub fn psi_slice(&self) -> &[f64] {
        self.psi.as_slice()
    }

    pub(crate) fn psi_mut_slice(&mut self) -> &mut [f64] {
        self.psi.as_mut_slice()
    }

    #[inline]
    pub fn rho(&self, index: usize, n: usize) -> f64 {
        self.rho.scalar(index, n)
    }

    #[inline]
    pub fn set_rho(&mut self, index: usize, n: usize, value: f64) {
        self.rho.set_scalar(index, n, value);
    }

    /// Total charge density `e sum_n z_n rho_n`.
    pub fn rho_elec(&self, index: usize) -> f64 {
        let rho = self.rho.values(index);
        let sum: f64 = self
            .valency
            .iter()
            .zip(rho)
            .map(|(&z, &r)| z as f64 * r)
            .sum();
        self.params.unit_charge * sum
    }

    /// Source term of the non-dimensional Poisson equation, `e beta rho_elec`.
    pub fn charge_term(&self, index: usize) -> f64 {
        self.params.unit_charge * self.params.beta * self.rho_elec(index)
    }

    pub fn halo_psi(&mut self, lattice: &dyn Lattice) {
        self.psi.halo(lattice);
    }

    pub fn halo_rho(&mut self, lattice: &dyn Lattice) {
        self.rho.halo(lattice);
    }

    /// Correct the psi halo on the faces of the global domain for the applied
    /// field, so that `psi = -E0 . r` looks continuous across the periodic
    /// boundary. Must follow [`Potential::halo_psi`].
    pub fn halo_psi_jump(&mut self, lattice: &dyn Lattice) {
        let e0 = self.params.external_field;
        let ltot = lattice.ltot();
        let periodic = lattice.periodic();
        let coords = lattice.cart_coords();
        let size = lattice.cart_size();
        let nlocal = lattice.nlocal().map(|n| n as i32);
        let nh = lattice.nhalo() as i32;

        for dim in 0..3 {
            if e0[dim] == 0.0 || !periodic[dim] {
                continue;
            }
            let jump = e0[dim] * ltot[dim];
            if coords[dim] == 0 {
                self.shift_planes(lattice, dim, (1 - nh)..=0, jump);
            }
            if coords[dim] == size[dim] - 1 {
                self.shift_planes(lattice, dim, (nlocal[dim] + 1)..=(nlocal[dim] + nh), -jump);
            }
        }
    }

    fn shift_planes(
        &mut self,
        lattice: &dyn Lattice,
        dim: usize,
        planes: std::ops::RangeInclusive<i32>,
        shift: f64,
    ) {
        let nlocal = lattice.nlocal().map(|n| n as i32);
        let nh = lattice.nhalo() as i32;
        let full = |d: usize| (1 - nh)..=(nlocal[d] + nh);

        for c in planes {
            let mut ranges = [full(0), full(1), full(2)];
            ranges[dim] = c..=c;
            let [xr, yr, zr] = ranges;
            for ic in xr {
                for jc in yr.clone() {
                    for kc in zr.clone() {
                        let index = lattice.index(ic, jc, kc);
                        let value = self.psi(index) + shift;
                        self.set_psi(index, value);
                    }
                }
            }
        }
    }

    /// Net charge `sum rho_elec` over the interior of every process.
    pub fn total_charge(&self, lattice: &dyn Lattice) -> f64 {
        let mut total = [KernelRange::interior(lattice)
            .sites()
            .map(|s| self.rho_elec(s.index))
            .sum::<f64>()];
        lattice.communicator().all_reduce_sum(&mut total);
        total[0]
    }

    pub fn charge_stats(&self, lattice: &dyn Lattice) -> ChargeStats {
        let n = self.nk + 1;
        let mut min = vec![f64::INFINITY; n];
        let mut max = vec![f64::NEG_INFINITY; n];
        let mut total = vec![0.0; n];

        for site in KernelRange::interior(lattice).sites() {
            for k in 0..n {
                let value = if k < self.nk {
                    self.rho(site.index, k)
                } else {
                    self.rho_elec(site.index)
                };
                min[k] = min[k].min(value);
                max[k] = max[k].max(value);
                total[k] += value;
            }
        }

        let comm = lattice.communicator();
        comm.all_reduce_min(&mut min);
        comm.all_reduce_max(&mut max);
        comm.all_reduce_sum(&mut total);

        ChargeStats { min, max, total }
    }
}

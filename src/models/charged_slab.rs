use crate::discretization::kernel::KernelRange;
use crate::discretization::lattice::Lattice;
use crate::physics::psi::{ElectrostaticParams, Potential, SolverParams};
use nalgebra::{DMatrix, DVector};

/// Two charged species between two charged walls.
///
/// Species 0 (valency +1) sits only in the planes `z = 1` and `z = Lz` with
/// density `1 / (2 Lx Ly)`; species 1 (valency -1) fills every other plane
/// with `1 / (Lx Ly (Lz - 2))`. Each species carries unit total charge, so
/// the system is neutral and the potential varies only along z.
#[derive(Debug, Clone)]
pub struct ChargedSlab {
    pub valency: [i32; 2],
    pub electrostatics: ElectrostaticParams,
    pub solver: SolverParams,
}

impl Default for ChargedSlab {
    fn default() -> Self {
        Self {
            valency: [1, -1],
            electrostatics: ElectrostaticParams::default(),
            solver: SolverParams::default(),
        }
    }
}

impl ChargedSlab {
    pub fn wall_density(ltot: [f64; 3]) -> f64 {
        1.0 / (2.0 * ltot[0] * ltot[1])
    }

    pub fn interior_density(ltot: [f64; 3]) -> f64 {
        1.0 / (ltot[0] * ltot[1] * (ltot[2] - 2.0))
    }

    /// A zero potential with the slab charge in place and the rho halo swapped.
    pub fn potential(&self, lattice: &dyn Lattice, logging: bool) -> Potential {
        let mut potential = Potential::new(lattice, 2);
        potential.valency = self.valency.to_vec();
        potential.params = self.electrostatics;
        potential.solver = self.solver;

        let ltot = lattice.ltot();
        let rho0 = Self::wall_density(ltot);
        let rho1 = Self::interior_density(ltot);
        let offset = (lattice.cart_coords()[2] * lattice.nlocal()[2]) as i32;
        let lz = ltot[2] as i32;

        for site in KernelRange::interior(lattice).sites() {
            let z = offset + site.kc;
            if z == 1 || z == lz {
                potential.set_rho(site.index, 0, rho0);
                potential.set_rho(site.index, 1, 0.0);
            } else {
                potential.set_rho(site.index, 0, 0.0);
                potential.set_rho(site.index, 1, rho1);
            }
        }
        potential.halo_rho(lattice);

        if logging {
            log::info!("--- Charged slab ---");
            log::info!("System size:       {:?}", ltot);
            log::info!("Wall density:      {:.6e}", rho0);
            log::info!("Interior density:  {:.6e}", rho1);
            log::info!("Valencies:         {:?}", self.valency);
            log::info!("Permittivity:      {}", self.electrostatics.epsilon);
            log::info!("Net charge:        {:e}", potential.total_charge(lattice));
        }

        potential
    }
}

/// Potential along z at `(ic, jc) = (1, 1)`, interior planes only.
pub fn potential_profile(lattice: &dyn Lattice, potential: &Potential) -> Vec<f64> {
    let nz = lattice.nlocal()[2] as i32;
    (1..=nz)
        .map(|kc| potential.psi(lattice.index(1, 1, kc)))
        .collect()
}

/// Total charge density along z at `(ic, jc) = (1, 1)`.
pub fn charge_profile(lattice: &dyn Lattice, potential: &Potential) -> Vec<f64> {
    let nz = lattice.nlocal()[2] as i32;
    (1..=nz)
        .map(|kc| potential.rho_elec(lattice.index(1, 1, kc)))
        .collect()
}

/// Exact solution of the z-only discrete problem with uniform permittivity,
///
/// `eps (psi[k+1] - 2 psi[k] + psi[k-1]) = -e beta rho_elec[k]`, periodic in k,
///
/// fixed by `psi[0] = 0`. The first row is dropped, being implied by the
/// others for a neutral system. Returns `None` if the reduced matrix is
/// singular. Valid for a single process holding the whole of z.
pub fn exact_potential(lattice: &dyn Lattice, potential: &Potential) -> Option<DVector<f64>> {
    let nz = lattice.nlocal()[2];
    if nz < 2 {
        return None;
    }
    let epsilon = potential.params.epsilon;
    let charge: Vec<f64> = (1..=nz as i32)
        .map(|kc| potential.charge_term(lattice.index(1, 1, kc)))
        .collect();

    // Unknowns psi[1..nz]; psi[0] and its periodic image psi[nz] are zero.
    let n = nz - 1;
    let mut a = DMatrix::<f64>::zeros(n, n);
    let mut b = DVector::<f64>::zeros(n);
    for row in 0..n {
        let k = row + 1;
        a[(row, row)] = -2.0 * epsilon;
        if row > 0 {
            a[(row, row - 1)] = epsilon;
        }
        if row + 1 < n {
            a[(row, row + 1)] = epsilon;
        }
        b[row] = -charge[k];
    }

    let solution = a.lu().solve(&b)?;
    let mut psi = DVector::<f64>::zeros(nz);
    psi.rows_mut(1, n).copy_from(&solution);
    Some(psi)
}

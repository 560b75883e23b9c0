//! Body force from the divergence of the chemical stress.
//!
//! Both stencils write the force at a site as a difference of stress values
//! shared with its neighbours, so the sum of the force over a periodic domain
//! telescopes to zero and momentum is conserved to round-off.

use crate::discretization::kernel::KernelRange;
use crate::discretization::lattice::Lattice;
use crate::discretization::velocity_set::VelocitySet;
use crate::error::PreconditionError;
use crate::numerics::parallel::ExecutionBackend;
use crate::physics::{ChemicalStress, ForceSink};
use nalgebra::{Matrix3, Vector3};

/// Halo depth both stencils need from the stress provider.
pub const STRESS_HALO: usize = 2;

fn require_halo(lattice: &dyn Lattice) -> Result<(), PreconditionError> {
    if lattice.nhalo() < STRESS_HALO {
        return Err(PreconditionError::InsufficientHalo {
            required: STRESS_HALO,
            actual: lattice.nhalo(),
        });
    }
    Ok(())
}

/// Six-point stencil: in each direction the force is the centred difference
/// of the stress averaged onto the two faces of the site,
///
/// `F_a = -0.5 (P_xa(i+1) + P_xa(i)) + 0.5 (P_xa(i-1) + P_xa(i)) + (y, z terms)`.
///
/// The x neighbours go through [`Lattice::x_buffer_index`] so that sliding
/// boundaries are respected.
pub fn stress_divergence(
    lattice: &dyn Lattice,
    stress: &dyn ChemicalStress,
    force: &mut dyn ForceSink,
    backend: ExecutionBackend,
) -> Result<(), PreconditionError> {
    require_halo(lattice)?;

    let range = KernelRange::interior(lattice);
    let contributions = backend.map_range(range.len(), |k| {
        let site = range.site(k);
        let (ic, jc, kc) = (site.ic, site.jc, site.kc);
        let pth0 = stress.chemical_stress(site.index);

        let icm1 = lattice.x_buffer_index(ic, -1);
        let icp1 = lattice.x_buffer_index(ic, 1);
        let neighbours = [
            (lattice.index(icm1, jc, kc), lattice.index(icp1, jc, kc)),
            (lattice.index(ic, jc - 1, kc), lattice.index(ic, jc + 1, kc)),
            (lattice.index(ic, jc, kc - 1), lattice.index(ic, jc, kc + 1)),
        ];

        let mut f = Vector3::<f64>::zeros();
        for (b, &(im1, ip1)) in neighbours.iter().enumerate() {
            let pthm1 = stress.chemical_stress(im1);
            let pthp1 = stress.chemical_stress(ip1);
            for a in 0..3 {
                f[a] += -0.5 * (pthp1[(b, a)] + pth0[(b, a)]) + 0.5 * (pthm1[(b, a)] + pth0[(b, a)]);
            }
        }
        (site.index, f)
    });

    for (index, f) in &contributions {
        force.add_local_force(*index, f);
    }
    Ok(())
}

/// Full velocity-set stencil: the stress gradient is estimated from the
/// differences to every non-rest neighbour `c`,
///
/// `dP_ab/dr_b ~ (1 / sum c_b^2) sum_c c_b (P_ab(i + c) - P_ab(i))`,
///
/// and the force is the negative row sum. Not usable across sliding planes.
pub fn stress_divergence_nvel(
    lattice: &dyn Lattice,
    stress: &dyn ChemicalStress,
    force: &mut dyn ForceSink,
    velocities: VelocitySet,
    backend: ExecutionBackend,
) -> Result<(), PreconditionError> {
    require_halo(lattice)?;
    let planes = lattice.n_sliding_planes();
    if planes > 0 {
        return Err(PreconditionError::SlidingPlanes { planes });
    }

    let cv = velocities.velocities();
    let rcs2 = 1.0 / velocities.second_moment(0) as f64;

    let range = KernelRange::interior(lattice);
    let contributions = backend.map_range(range.len(), |k| {
        let site = range.site(k);
        let pth0 = stress.chemical_stress(site.index);

        let mut gradpth = Matrix3::<f64>::zeros();
        for c in &cv[1..] {
            let neighbour = lattice.index(site.ic + c[0], site.jc + c[1], site.kc + c[2]);
            let pdiffs = stress.chemical_stress(neighbour) - pth0;
            for a in 0..3 {
                for b in 0..3 {
                    gradpth[(a, b)] += c[b] as f64 * pdiffs[(a, b)];
                }
            }
        }

        let mut f = Vector3::<f64>::zeros();
        for a in 0..3 {
            for b in 0..3 {
                f[a] -= rcs2 * gradpth[(a, b)];
            }
        }
        (site.index, f)
    });

    for (index, f) in &contributions {
        force.add_local_force(*index, f);
    }
    Ok(())
}

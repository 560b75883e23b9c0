//! Body force `F_a = -phi d_a mu` from chemical potential gradients.

use crate::discretization::field::{Field, SiteMap, SiteStatus};
use crate::discretization::kernel::{KernelRange, Site};
use crate::discretization::lattice::Lattice;
use crate::error::PreconditionError;
use crate::numerics::parallel::ExecutionBackend;
use crate::physics::{ChemicalPotential, ForceSink, MAX_COMPONENTS};
use nalgebra::Vector3;

// The provider may fill one more potential than there are order parameters
// (e.g. ternary models). Only the leading nf entries take part in the force.
type MuBuffer = [f64; MAX_COMPONENTS + 1];

fn require_components(phi: &Field) -> Result<usize, PreconditionError> {
    let nf = phi.nf();
    if nf > MAX_COMPONENTS {
        return Err(PreconditionError::TooManyComponents {
            nf,
            max: MAX_COMPONENTS,
        });
    }
    Ok(nf)
}

fn centred_force(
    lattice: &dyn Lattice,
    site: &Site,
    phi: &Field,
    nf: usize,
    mu: &dyn ChemicalPotential,
    map: Option<&SiteMap>,
) -> Vector3<f64> {
    let phi0 = phi.values(site.index);

    let mut mu0: MuBuffer = [0.0; MAX_COMPONENTS + 1];
    if map.is_some() {
        mu.chemical_potential(site.index, &mut mu0);
    }

    let neighbours = [
        (
            lattice.index(site.ic - 1, site.jc, site.kc),
            lattice.index(site.ic + 1, site.jc, site.kc),
        ),
        (
            lattice.index(site.ic, site.jc - 1, site.kc),
            lattice.index(site.ic, site.jc + 1, site.kc),
        ),
        (
            lattice.index(site.ic, site.jc, site.kc - 1),
            lattice.index(site.ic, site.jc, site.kc + 1),
        ),
    ];

    let mut force = Vector3::zeros();
    for (a, &(im1, ip1)) in neighbours.iter().enumerate() {
        let mut mum1: MuBuffer = [0.0; MAX_COMPONENTS + 1];
        let mut mup1: MuBuffer = [0.0; MAX_COMPONENTS + 1];
        mu.chemical_potential(im1, &mut mum1);
        mu.chemical_potential(ip1, &mut mup1);

        if let Some(map) = map {
            // Zero normal gradient at a wall: the solid neighbour takes the
            // value at the site itself.
            if map.status(im1) == SiteStatus::Boundary {
                mum1[..nf].copy_from_slice(&mu0[..nf]);
            }
            if map.status(ip1) == SiteStatus::Boundary {
                mup1[..nf].copy_from_slice(&mu0[..nf]);
            }
        }

        for n in 0..nf {
            force[a] -= phi0[n] * 0.5 * (mup1[n] - mum1[n]);
        }
    }
    force
}

fn accumulate<F>(
    lattice: &dyn Lattice,
    force: &mut dyn ForceSink,
    backend: ExecutionBackend,
    body: F,
) where
    F: Fn(&Site) -> Vector3<f64> + Sync + Send,
{
    let range = KernelRange::interior(lattice);
    let contributions = backend.map_range(range.len(), |k| {
        let site = range.site(k);
        (site.index, body(&site))
    });
    for (index, f) in &contributions {
        force.add_local_force(*index, f);
    }
}

/// `F_a(i) = -sum_n phi_n(i) 0.5 (mu_n(i + e_a) - mu_n(i - e_a))` on an
/// all-fluid lattice.
pub fn grad_mu_fluid(
    lattice: &dyn Lattice,
    phi: &Field,
    mu: &dyn ChemicalPotential,
    force: &mut dyn ForceSink,
    backend: ExecutionBackend,
) -> Result<(), PreconditionError> {
    let nf = require_components(phi)?;
    accumulate(lattice, force, backend, |site| {
        centred_force(lattice, site, phi, nf, mu, None)
    });
    Ok(())
}

/// As [`grad_mu_fluid`], but a neighbour whose status is
/// [`SiteStatus::Boundary`] contributes the chemical potential of the site
/// itself, giving a one-sided difference next to solid walls.
pub fn grad_mu_solid(
    lattice: &dyn Lattice,
    phi: &Field,
    mu: &dyn ChemicalPotential,
    map: &SiteMap,
    force: &mut dyn ForceSink,
    backend: ExecutionBackend,
) -> Result<(), PreconditionError> {
    let nf = require_components(phi)?;
    accumulate(lattice, force, backend, |site| {
        centred_force(lattice, site, phi, nf, mu, Some(map))
    });
    Ok(())
}

/// Force `-phi grad_mu` from a uniform external chemical potential gradient.
///
/// Skipped entirely unless the gradient is non-zero and the order parameter
/// is a scalar. Returns whether any force was added; like the other kernels
/// it rejects fields with more than [`MAX_COMPONENTS`] components.
pub fn grad_mu_external(
    lattice: &dyn Lattice,
    phi: &Field,
    grad_mu: &Vector3<f64>,
    force: &mut dyn ForceSink,
    backend: ExecutionBackend,
) -> Result<bool, PreconditionError> {
    require_components(phi)?;
    let is_grad_mu = grad_mu.iter().any(|&g| g != 0.0);

    // TODO: extend to vector order parameters once a model needs it.
    if !is_grad_mu || phi.nf() != 1 {
        log::trace!(
            "external grad mu skipped (grad_mu = {:?}, nf = {})",
            grad_mu.as_slice(),
            phi.nf()
        );
        return Ok(false);
    }

    accumulate(lattice, force, backend, |site| {
        let phi0 = phi.scalar(site.index, 0);
        *grad_mu * -phi0
    });
    Ok(true)
}

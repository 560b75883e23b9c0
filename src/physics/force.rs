use crate::discretization::field::{Field, SiteMap};
use crate::discretization::lattice::Lattice;
use crate::discretization::velocity_set::VelocitySet;
use crate::error::PreconditionError;
use crate::numerics::parallel::ExecutionBackend;
use crate::physics::force_stress::{stress_divergence, stress_divergence_nvel};
use crate::physics::grad_mu::{grad_mu_external, grad_mu_fluid, grad_mu_solid};
use crate::physics::{ChemicalPotential, ChemicalStress, ForceSink};
use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

/// What the free-energy model can supply to the force calculation.
#[derive(Clone, Copy)]
pub enum Thermodynamics<'a> {
    Stress(&'a dyn ChemicalStress),
    ChemicalPotential(&'a dyn ChemicalPotential),
}

impl Thermodynamics<'_> {
    fn name(&self) -> &'static str {
        match self {
            Thermodynamics::Stress(_) => "stress",
            Thermodynamics::ChemicalPotential(_) => "chemical potential",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ForceMethod {
    StressDivergence,
    StressDivergenceNvel(VelocitySet),
    PhiGradMu,
    PhiGradMuSolid,
}

impl ForceMethod {
    pub fn name(&self) -> &'static str {
        match self {
            ForceMethod::StressDivergence => "stress_divergence",
            ForceMethod::StressDivergenceNvel(_) => "stress_divergence_nvel",
            ForceMethod::PhiGradMu => "phi_grad_mu",
            ForceMethod::PhiGradMuSolid => "phi_grad_mu_solid",
        }
    }
}

/// Thermodynamic force stage of a time step.
///
/// The external chemical potential gradient is a run parameter handed in
/// here rather than read from shared state.
#[derive(Debug, Clone, Copy)]
pub struct PhiForce {
    pub method: ForceMethod,
    pub external_grad_mu: Vector3<f64>,
    pub backend: ExecutionBackend,
}

impl PhiForce {
    pub fn new(method: ForceMethod) -> Self {
        Self {
            method,
            external_grad_mu: Vector3::zeros(),
            backend: ExecutionBackend::default(),
        }
    }

    /// Add the thermodynamic force to `force`.
    pub fn compute(
        &self,
        lattice: &dyn Lattice,
        thermo: Thermodynamics<'_>,
        phi: Option<&Field>,
        map: Option<&SiteMap>,
        force: &mut dyn ForceSink,
    ) -> Result<(), PreconditionError> {
        let method = self.method.name();
        let wrong_capability = |needed: &'static str| {
            log::debug!("{} offered a {} provider", method, thermo.name());
            PreconditionError::MissingCapability {
                method,
                capability: needed,
            }
        };

        match self.method {
            ForceMethod::StressDivergence => {
                let Thermodynamics::Stress(pth) = thermo else {
                    return Err(wrong_capability("stress"));
                };
                stress_divergence(lattice, pth, force, self.backend)
            }
            ForceMethod::StressDivergenceNvel(velocities) => {
                let Thermodynamics::Stress(pth) = thermo else {
                    return Err(wrong_capability("stress"));
                };
                stress_divergence_nvel(lattice, pth, force, velocities, self.backend)
            }
            ForceMethod::PhiGradMu | ForceMethod::PhiGradMuSolid => {
                let Thermodynamics::ChemicalPotential(mu) = thermo else {
                    return Err(wrong_capability("chemical potential"));
                };
                let phi = phi.ok_or(PreconditionError::MissingInput {
                    method,
                    input: "an order parameter field",
                })?;

                if self.method == ForceMethod::PhiGradMuSolid {
                    let map = map.ok_or(PreconditionError::MissingInput {
                        method,
                        input: "a site map",
                    })?;
                    grad_mu_solid(lattice, phi, mu, map, force, self.backend)?;
                } else {
                    grad_mu_fluid(lattice, phi, mu, force, self.backend)?;
                }

                if grad_mu_external(lattice, phi, &self.external_grad_mu, force, self.backend)? {
                    log::trace!("{}: external grad mu applied", method);
                }
                Ok(())
            }
        }
    }
}

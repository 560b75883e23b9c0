//! Red/black successive over-relaxation for the Poisson equation
//!
//! `div(eps grad psi) = -e beta rho_elec`
//!
//! on a periodic lattice. With uniform permittivity the update is the usual
//! seven-point Laplacian; with a permittivity function the stencil picks up
//! the `grad eps . grad psi` term from centred differences.
//!
//! One iteration is a red pass then a black pass, each followed by a halo
//! swap (and the potential jump for an applied field). The summed absolute
//! residual seen during the sweep is reduced over all processes every
//! `check_every` iterations and tested against the absolute tolerance, then
//! the relative one. Running out of iterations is not an error: the
//! potential is left as it stands and the outcome says so.

use crate::discretization::kernel::{KernelRange, Site};
use crate::discretization::lattice::Lattice;
use crate::error::PreconditionError;
use crate::numerics::parallel::ExecutionBackend;
use crate::numerics::timing;
use crate::numerics::{Converged, Tolerance};
use crate::physics::Permittivity;
use crate::physics::psi::Potential;
use std::f64::consts::PI;
use std::time::Instant;

/// Iteration cap and residual check frequency.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SorLimits {
    pub max_iterations: u32,
    pub check_every: u32,
}

impl SorLimits {
    pub const UNIFORM: SorLimits = SorLimits {
        max_iterations: 1000,
        check_every: 5,
    };
    pub const VARIABLE: SorLimits = SorLimits {
        max_iterations: 2000,
        check_every: 1,
    };
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SorOutcome {
    ConvergedAbsolute,
    ConvergedRelative,
    MaxIterations,
}

impl SorOutcome {
    pub fn converged(&self) -> bool {
        !matches!(self, SorOutcome::MaxIterations)
    }
}

impl From<Converged> for SorOutcome {
    fn from(c: Converged) -> Self {
        match c {
            Converged::Absolute => SorOutcome::ConvergedAbsolute,
            Converged::Relative => SorOutcome::ConvergedRelative,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SorResult {
    pub outcome: SorOutcome,
    /// Full red/black iterations performed.
    pub iterations: u32,
    pub initial_residual: f64,
    pub final_residual: f64,
    /// Relaxation parameter after the last pass.
    pub omega: f64,
}

/// Estimate of the Jacobi spectral radius, `1 - (pi / max(Lx, Lz))^2 / 2`.
pub fn jacobi_spectral_radius(ltot: [f64; 3]) -> f64 {
    let lmax = ltot[0].max(ltot[2]);
    1.0 - 0.5 * (PI / lmax).powi(2)
}

/// Chebyshev acceleration of the relaxation parameter.
#[derive(Debug, Clone, Copy)]
pub struct ChebyshevOmega {
    radius: f64,
    omega: f64,
    started: bool,
}

impl ChebyshevOmega {
    pub fn new(radius: f64) -> Self {
        Self {
            radius,
            omega: 1.0,
            started: false,
        }
    }

    pub fn omega(&self) -> f64 {
        self.omega
    }

    /// Half-pass schedule: `1 / (1 - r^2 / 2)` first, then
    /// `1 / (1 - r^2 omega / 4)`. The result must lie strictly in (1, 2).
    pub fn advance_half_pass(&mut self) -> Result<f64, PreconditionError> {
        let r2 = self.radius * self.radius;
        self.omega = if self.started {
            1.0 / (1.0 - 0.25 * r2 * self.omega)
        } else {
            1.0 / (1.0 - 0.5 * r2)
        };
        self.started = true;

        if !(1.0 < self.omega && self.omega < 2.0) {
            return Err(PreconditionError::RelaxationOutOfRange { omega: self.omega });
        }
        Ok(self.omega)
    }

    /// Per-iteration schedule used with variable permittivity.
    pub fn advance(&mut self) -> f64 {
        let r2 = self.radius * self.radius;
        self.omega = 1.0 / (1.0 - 0.25 * r2 * self.omega);
        self.started = true;
        self.omega
    }
}

/// Residual of the uniform-permittivity equation at `index`,
/// `eps (sum of six neighbours - 6 psi) + charge`.
#[inline]
pub fn uniform_residual(
    psi: &[f64],
    strides: [usize; 3],
    index: usize,
    epsilon: f64,
    charge: f64,
) -> f64 {
    let [xs, ys, zs] = strides;
    let dpsi = psi[index + xs] + psi[index - xs] + psi[index + ys] + psi[index - ys]
        + psi[index + zs]
        + psi[index - zs]
        - 6.0 * psi[index];
    epsilon * dpsi + charge
}

/// Residual of the variable-permittivity equation at `index`:
///
/// `eps0 (sum of six neighbours - 6 psi)
///   + sum_a 0.25 (eps(i + e_a) - eps(i - e_a)) (psi(i + e_a) - psi(i - e_a)) + charge`.
#[inline]
pub fn variable_residual(
    psi: &[f64],
    strides: [usize; 3],
    index: usize,
    permittivity: &dyn Permittivity,
    charge: f64,
) -> f64 {
    let eps0 = permittivity.epsilon(index);
    variable_residual_at(psi, strides, index, permittivity, eps0, charge)
}

// `eps0` is the permittivity at `index` itself, which the update also needs
// for its pivot.
#[inline]
fn variable_residual_at(
    psi: &[f64],
    strides: [usize; 3],
    index: usize,
    permittivity: &dyn Permittivity,
    eps0: f64,
    charge: f64,
) -> f64 {
    let mut depsi = eps0
        * (-6.0 * psi[index]
            + psi[index + strides[0]]
            + psi[index - strides[0]]
            + psi[index + strides[1]]
            + psi[index - strides[1]]
            + psi[index + strides[2]]
            + psi[index - strides[2]]);

    for &s in &strides {
        let gradient = psi[index + s] - psi[index - s];
        depsi += 0.25 * permittivity.epsilon(index + s) * gradient;
        depsi -= 0.25 * permittivity.epsilon(index - s) * gradient;
    }

    depsi + charge
}

fn check_preconditions(lattice: &dyn Lattice, potential: &Potential) -> Result<(), PreconditionError> {
    if lattice.nhalo() < 1 {
        return Err(PreconditionError::InsufficientHalo {
            required: 1,
            actual: lattice.nhalo(),
        });
    }
    for (dim, &extent) in lattice.nlocal().iter().enumerate() {
        if extent % 2 != 0 {
            return Err(PreconditionError::OddExtent { dim, extent });
        }
    }
    if potential.nsites() != lattice.nsites() {
        return Err(PreconditionError::SizeMismatch {
            what: "potential",
            expected: lattice.nsites(),
            actual: potential.nsites(),
        });
    }
    Ok(())
}

/// Red/black SOR driver.
#[derive(Debug, Clone, Copy, Default)]
pub struct SorSolver {
    pub backend: ExecutionBackend,
}

// The two regimes differ only in the stencil, the pivot and how omega moves.
enum Regime<'a> {
    Uniform,
    Variable(&'a dyn Permittivity),
}

impl Regime<'_> {
    fn label(&self) -> &'static str {
        match self {
            Regime::Uniform => "SOR solver",
            Regime::Variable(_) => "SOR (heterogeneous) solver",
        }
    }

    fn limits(&self) -> SorLimits {
        match self {
            Regime::Uniform => SorLimits::UNIFORM,
            Regime::Variable(_) => SorLimits::VARIABLE,
        }
    }

    /// Residual and diagonal at one site.
    fn residual(&self, psi: &[f64], strides: [usize; 3], potential: &Potential, index: usize) -> (f64, f64) {
        let charge = potential.charge_term(index);
        match self {
            Regime::Uniform => {
                let epsilon = potential.params.epsilon;
                (uniform_residual(psi, strides, index, epsilon, charge), -6.0 * epsilon)
            }
            Regime::Variable(permittivity) => {
                let eps0 = permittivity.epsilon(index);
                (
                    variable_residual_at(psi, strides, index, *permittivity, eps0, charge),
                    -6.0 * eps0,
                )
            }
        }
    }
}

impl SorSolver {
    pub fn new(backend: ExecutionBackend) -> Self {
        Self { backend }
    }

    /// Uniform permittivity when `permittivity` is `None`, otherwise the
    /// heterogeneous solver. `step` is the caller's time step, used only to
    /// decide whether convergence is reported.
    pub fn solve(
        &self,
        lattice: &dyn Lattice,
        potential: &mut Potential,
        permittivity: Option<&dyn Permittivity>,
        step: Option<usize>,
    ) -> Result<SorResult, PreconditionError> {
        match permittivity {
            None => self.solve_uniform(lattice, potential, step),
            Some(eps) => self.solve_variable(lattice, potential, eps, step),
        }
    }

    pub fn solve_uniform(
        &self,
        lattice: &dyn Lattice,
        potential: &mut Potential,
        step: Option<usize>,
    ) -> Result<SorResult, PreconditionError> {
        self.iterate(lattice, potential, Regime::Uniform, step)
    }

    pub fn solve_variable(
        &self,
        lattice: &dyn Lattice,
        potential: &mut Potential,
        permittivity: &dyn Permittivity,
        step: Option<usize>,
    ) -> Result<SorResult, PreconditionError> {
        self.iterate(lattice, potential, Regime::Variable(permittivity), step)
    }

    fn iterate(
        &self,
        lattice: &dyn Lattice,
        potential: &mut Potential,
        regime: Regime<'_>,
        step: Option<usize>,
    ) -> Result<SorResult, PreconditionError> {
        check_preconditions(lattice, potential)?;

        let start = Instant::now();
        timing::reset_timing();

        let limits = regime.limits();
        let max_iterations = potential.solver.max_iterations.unwrap_or(limits.max_iterations);
        let tolerance = Tolerance::Combined(potential.solver.abstol, potential.solver.reltol);
        let report = step.is_some_and(|s| s % potential.solver.nfreq.max(1) == 0);

        let ltot = lattice.ltot();
        let volume = ltot[0] * ltot[1] * ltot[2];
        let strides = lattice.strides();
        let comm = lattice.communicator();

        let range = KernelRange::interior(lattice);
        let colours: [Vec<Site>; 2] = [range.coloured(0), range.coloured(1)];

        potential.halo_psi(lattice);
        potential.halo_psi_jump(lattice);

        let mut initial = [{
            let current: &Potential = potential;
            let psi = current.psi_slice();
            let residuals = self.backend.map_range(range.len(), |k| {
                let index = range.site(k).index;
                regime.residual(psi, strides, current, index).0
            });
            residuals.iter().map(|r| r.abs()).sum::<f64>()
        }];
        comm.all_reduce_sum(&mut initial);
        let initial_residual = initial[0];

        let mut omega = ChebyshevOmega::new(jacobi_spectral_radius(ltot));
        let mut rnorm = [0.0];
        let mut outcome = SorOutcome::MaxIterations;
        let mut iterations = 0;

        for n in 0..max_iterations {
            let mut rnorm_local = 0.0;

            for sites in &colours {
                let relax = omega.omega();
                timing::record_pass(|| {
                    let updates = {
                        let current: &Potential = potential;
                        let psi = current.psi_slice();
                        self.backend.map_sites(sites, |site| {
                            regime.residual(psi, strides, current, site.index)
                        })
                    };
                    let psi = potential.psi_mut_slice();
                    for (site, (residual, diagonal)) in sites.iter().zip(updates) {
                        psi[site.index] -= relax * residual / diagonal;
                        rnorm_local += residual.abs();
                    }
                });

                if let Regime::Uniform = regime {
                    omega.advance_half_pass()?;
                }

                timing::record_halo(|| {
                    potential.halo_psi(lattice);
                    potential.halo_psi_jump(lattice);
                });
            }

            if let Regime::Variable(_) = regime {
                omega.advance();
            }
            iterations = n + 1;

            if n % limits.check_every == 0 {
                rnorm = [rnorm_local];
                comm.all_reduce_sum(&mut rnorm);
                log::debug!(
                    "{} iteration {}: residual {:e} (initial {:e})",
                    regime.label(),
                    n,
                    rnorm[0],
                    initial_residual
                );

                if let Some(converged) = tolerance.check(rnorm[0], initial_residual) {
                    outcome = converged.into();
                    if report {
                        let which = match converged {
                            Converged::Absolute => "absolute",
                            Converged::Relative => "relative",
                        };
                        log::info!("{} converged to {} tolerance", regime.label(), which);
                        log::info!(
                            "SOR residual per site {:14.7e} at {} iterations",
                            rnorm[0] / volume,
                            n
                        );
                    }
                    break;
                }
            } else if n == max_iterations - 1 {
                rnorm = [rnorm_local];
                comm.all_reduce_sum(&mut rnorm);
            }
        }

        if outcome == SorOutcome::MaxIterations {
            log::warn!("{} exceeded {} iterations", regime.label(), max_iterations);
            log::warn!(
                "SOR residual {:e} (initial) {:e} (final)",
                initial_residual,
                rnorm[0]
            );
        }

        timing::finalize_and_report(start.elapsed());

        Ok(SorResult {
            outcome,
            iterations,
            initial_residual,
            final_residual: rnorm[0],
            omega: omega.omega(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::discretization::lattice::SerialLattice;
    use approx::assert_abs_diff_eq;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn spectral_radius_uses_longest_of_x_and_z() {
        let r = jacobi_spectral_radius([4.0, 100.0, 64.0]);
        assert_abs_diff_eq!(r, 1.0 - 0.5 * (PI / 64.0).powi(2), epsilon = 1e-15);
    }

    #[test]
    fn half_pass_omega_stays_in_open_interval() {
        let mut omega = ChebyshevOmega::new(jacobi_spectral_radius([4.0, 4.0, 64.0]));
        for _ in 0..2000 {
            let w = omega.advance_half_pass().unwrap();
            assert!(1.0 < w && w < 2.0);
        }
        // Settles on the optimal SOR factor 2 / (1 + sqrt(1 - r^2)).
        let r = jacobi_spectral_radius([4.0, 4.0, 64.0]);
        let optimal = 2.0 / (1.0 + (1.0 - r * r).sqrt());
        assert_abs_diff_eq!(omega.omega(), optimal, epsilon = 1e-10);
    }

    #[test]
    fn tiny_lattice_drives_omega_out_of_range() {
        // L = 1 makes the radius estimate meaningless.
        let mut omega = ChebyshevOmega::new(jacobi_spectral_radius([1.0, 1.0, 1.0]));
        assert!(matches!(
            omega.advance_half_pass(),
            Err(PreconditionError::RelaxationOutOfRange { .. })
        ));
    }

    #[test]
    fn variable_schedule_starts_from_unity() {
        let r = jacobi_spectral_radius([8.0, 8.0, 8.0]);
        let mut omega = ChebyshevOmega::new(r);
        assert_eq!(omega.omega(), 1.0);
        let w = omega.advance();
        assert_abs_diff_eq!(w, 1.0 / (1.0 - 0.25 * r * r), epsilon = 1e-15);
    }

    struct CountingPermittivity {
        calls: AtomicUsize,
    }

    impl Permittivity for CountingPermittivity {
        fn epsilon(&self, _index: usize) -> f64 {
            self.calls.fetch_add(1, Ordering::Relaxed);
            1.0
        }
    }

    #[test]
    fn variable_sweep_reads_seven_permittivities_per_site() {
        let lattice = SerialLattice::new([4, 4, 4], 1).unwrap();
        let mut psi = Potential::new(&lattice, 1);
        psi.valency = vec![1];
        psi.set_rho(lattice.index(1, 1, 1), 0, 1.0);
        psi.set_rho(lattice.index(2, 3, 4), 0, -1.0);
        psi.solver.max_iterations = Some(1);

        let eps = CountingPermittivity {
            calls: AtomicUsize::new(0),
        };
        let result = SorSolver::new(ExecutionBackend::Serial)
            .solve_variable(&lattice, &mut psi, &eps, None)
            .unwrap();
        assert_eq!(result.iterations, 1);

        // Initial residual plus one red and one black update of every site.
        let sites = KernelRange::interior(&lattice).len();
        assert_eq!(eps.calls.load(Ordering::Relaxed), 7 * 2 * sites);
    }

    #[test]
    fn odd_extent_is_rejected() {
        let lattice = SerialLattice::new([4, 3, 4], 1).unwrap();
        let mut psi = Potential::new(&lattice, 1);
        let err = SorSolver::default()
            .solve_uniform(&lattice, &mut psi, None)
            .unwrap_err();
        assert_eq!(err, PreconditionError::OddExtent { dim: 1, extent: 3 });
    }

    #[test]
    fn zero_charge_converges_immediately() {
        let lattice = SerialLattice::new([4, 4, 4], 1).unwrap();
        let mut psi = Potential::new(&lattice, 1);
        let result = SorSolver::default()
            .solve_uniform(&lattice, &mut psi, Some(0))
            .unwrap();
        assert_eq!(result.outcome, SorOutcome::ConvergedAbsolute);
        assert_eq!(result.iterations, 1);
        assert_eq!(result.final_residual, 0.0);
    }
}

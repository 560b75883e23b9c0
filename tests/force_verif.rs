use nalgebra::{Matrix3, Vector3};
use std::f64::consts::PI;

use lbfs_rs::discretization::field::{Field, ForceField, SiteMap, SiteStatus};
use lbfs_rs::discretization::kernel::KernelRange;
use lbfs_rs::discretization::lattice::{Communicator, Lattice, SerialLattice};
use lbfs_rs::discretization::velocity_set::VelocitySet;
use lbfs_rs::error::PreconditionError;
use lbfs_rs::numerics::parallel::ExecutionBackend;
use lbfs_rs::physics::force::{ForceMethod, PhiForce, Thermodynamics};
use lbfs_rs::physics::force_stress::{stress_divergence, stress_divergence_nvel};
use lbfs_rs::physics::functional::{FunctionalChemicalPotential, FunctionalStress};
use lbfs_rs::physics::grad_mu::{grad_mu_external, grad_mu_fluid, grad_mu_solid};
use lbfs_rs::physics::stress::StressField;
use lbfs_rs::physics::{ChemicalPotential, ForceSink, MAX_COMPONENTS};

// Asymmetric, position-dependent stress that is not periodic-smooth, so the
// force is far from zero everywhere.
fn rough_stress(lattice: &SerialLattice) -> StressField {
    let provider = FunctionalStress::new(|index| {
        let [ic, jc, kc] = lattice.index_to_ijk(index);
        Matrix3::from_fn(|a, b| {
            let seed = (ic * 31 + jc * 17 + kc * 7) as f64 + (3 * a + b) as f64 * 0.37;
            (seed * 1.618).sin() + 0.1 * (a as f64 - b as f64)
        })
    });
    StressField::from_provider(lattice, &provider, ExecutionBackend::Serial)
}

fn max_force(lattice: &SerialLattice, force: &ForceField) -> f64 {
    KernelRange::interior(lattice)
        .sites()
        .map(|s| force.force(s.index).amax())
        .fold(0.0, f64::max)
}

#[test]
fn stress_divergence_conserves_momentum() {
    let lattice = SerialLattice::new([8, 6, 10], 2).unwrap();
    let stress = rough_stress(&lattice);

    let mut force = ForceField::new(&lattice);
    stress_divergence(&lattice, &stress, &mut force, ExecutionBackend::Serial).unwrap();
    let total = force.total(&lattice);
    println!("six-point: total force {:?}, max |f| {:.3e}", total.as_slice(), max_force(&lattice, &force));

    assert!(max_force(&lattice, &force) > 1e-2);
    assert!(total.amax() < 1e-12);

    for set in [VelocitySet::D3Q15, VelocitySet::D3Q19] {
        let mut force = ForceField::new(&lattice);
        stress_divergence_nvel(&lattice, &stress, &mut force, set, ExecutionBackend::Serial).unwrap();
        let total = force.total(&lattice);
        println!("{}: total force {:?}", set.name(), total.as_slice());

        assert!(max_force(&lattice, &force) > 1e-2);
        assert!(total.amax() < 1e-12);
    }
}

#[test]
fn stencils_reproduce_sinusoidal_gradient() {
    let n = 16;
    let lattice = SerialLattice::new([n, 4, 4], 2).unwrap();
    let k = 2.0 * PI / n as f64;
    let provider = FunctionalStress::new(|index| {
        let x = lattice.index_to_ijk(index)[0] as f64;
        let mut pth = Matrix3::zeros();
        pth[(0, 0)] = (k * x).sin();
        pth
    });
    let stress = StressField::from_provider(&lattice, &provider, ExecutionBackend::Serial);

    // Both stencils reduce to F_x = -(P(x+1) - P(x-1)) / 2 = -sin(k) cos(k x).
    let expected = |x: f64| Vector3::new(-k.sin() * (k * x).cos(), 0.0, 0.0);

    let mut six = ForceField::new(&lattice);
    stress_divergence(&lattice, &stress, &mut six, ExecutionBackend::Serial).unwrap();
    let mut q19 = ForceField::new(&lattice);
    stress_divergence_nvel(&lattice, &stress, &mut q19, VelocitySet::D3Q19, ExecutionBackend::Serial)
        .unwrap();
    let mut q15 = ForceField::new(&lattice);
    stress_divergence_nvel(&lattice, &stress, &mut q15, VelocitySet::D3Q15, ExecutionBackend::Serial)
        .unwrap();

    for site in KernelRange::interior(&lattice).sites() {
        let f = expected(site.ic as f64);
        for computed in [&six, &q19, &q15] {
            assert!((computed.force(site.index) - f).amax() < 1e-12);
        }
    }
}

#[test]
fn stress_stencils_need_two_halo_planes() {
    let lattice = SerialLattice::new([4, 4, 4], 1).unwrap();
    let stress = StressField::new(&lattice);
    let mut force = ForceField::new(&lattice);

    let expected = PreconditionError::InsufficientHalo {
        required: 2,
        actual: 1,
    };
    assert_eq!(
        stress_divergence(&lattice, &stress, &mut force, ExecutionBackend::Serial).unwrap_err(),
        expected
    );
    assert_eq!(
        stress_divergence_nvel(&lattice, &stress, &mut force, VelocitySet::D3Q19, ExecutionBackend::Serial)
            .unwrap_err(),
        expected
    );
}

/// A periodic lattice that reports sliding planes.
struct Sheared(SerialLattice);

impl Lattice for Sheared {
    fn nlocal(&self) -> [usize; 3] {
        self.0.nlocal()
    }
    fn nhalo(&self) -> usize {
        self.0.nhalo()
    }
    fn index(&self, ic: i32, jc: i32, kc: i32) -> usize {
        self.0.index(ic, jc, kc)
    }
    fn index_to_ijk(&self, index: usize) -> [i32; 3] {
        self.0.index_to_ijk(index)
    }
    fn strides(&self) -> [usize; 3] {
        self.0.strides()
    }
    fn nsites(&self) -> usize {
        self.0.nsites()
    }
    fn ltot(&self) -> [f64; 3] {
        self.0.ltot()
    }
    fn cart_coords(&self) -> [usize; 3] {
        self.0.cart_coords()
    }
    fn cart_size(&self) -> [usize; 3] {
        self.0.cart_size()
    }
    fn periodic(&self) -> [bool; 3] {
        self.0.periodic()
    }
    fn communicator(&self) -> &dyn Communicator {
        self.0.communicator()
    }
    fn halo_exchange(&self, data: &mut [f64], nf: usize) {
        self.0.halo_exchange(data, nf)
    }
    fn halo_exchange_bytes(&self, data: &mut [u8], nf: usize) {
        self.0.halo_exchange_bytes(data, nf)
    }
    fn n_sliding_planes(&self) -> usize {
        2
    }
}

#[test]
fn velocity_set_stencil_refuses_sliding_planes() {
    let lattice = Sheared(SerialLattice::new([4, 4, 4], 2).unwrap());
    let stress = StressField::new(&lattice);
    let mut force = ForceField::new(&lattice);

    let err = stress_divergence_nvel(&lattice, &stress, &mut force, VelocitySet::D3Q15, ExecutionBackend::Serial)
        .unwrap_err();
    assert_eq!(err, PreconditionError::SlidingPlanes { planes: 2 });

    // The six-point stencil is still allowed.
    stress_divergence(&lattice, &stress, &mut force, ExecutionBackend::Serial).unwrap();
}

// Two order parameters and a third "spare" chemical potential, all periodic.
fn ternary_fields(lattice: &SerialLattice) -> (Field, FunctionalChemicalPotential<'_>) {
    let n = lattice.nlocal().map(|n| n as f64);
    let phi = Field::from_fn(lattice, 2, |ic, jc, kc, v| {
        v[0] = 0.5 + 0.25 * (2.0 * PI * ic as f64 / n[0]).cos();
        v[1] = -0.3 + 0.1 * (2.0 * PI * (jc + kc) as f64 / n[1]).sin();
    });
    let mu = FunctionalChemicalPotential::new(3, move |index, mu| {
        let [ic, jc, kc] = lattice.index_to_ijk(index);
        let (x, y, z) = (ic as f64 / n[0], jc as f64 / n[1], kc as f64 / n[2]);
        mu[0] = (2.0 * PI * (x + 2.0 * z)).sin();
        mu[1] = (2.0 * PI * (y - x)).cos() * 0.5;
        mu[2] = 1.0e3;
    });
    (phi, mu)
}

#[test]
fn solid_kernel_without_walls_matches_fluid_kernel() {
    let lattice = SerialLattice::new([6, 4, 8], 1).unwrap();
    let (phi, mu) = ternary_fields(&lattice);
    let map = SiteMap::new(&lattice);

    let mut fluid = ForceField::new(&lattice);
    grad_mu_fluid(&lattice, &phi, &mu, &mut fluid, ExecutionBackend::Serial).unwrap();
    let mut solid = ForceField::new(&lattice);
    grad_mu_solid(&lattice, &phi, &mu, &map, &mut solid, ExecutionBackend::Serial).unwrap();

    assert!(max_force(&lattice, &fluid) > 1e-2);
    for site in KernelRange::interior(&lattice).sites() {
        assert_eq!(fluid.force(site.index), solid.force(site.index));
    }
}

#[test]
fn solid_kernel_is_one_sided_at_a_wall() {
    let lattice = SerialLattice::new([4, 4, 8], 1).unwrap();
    let (phi, mu) = ternary_fields(&lattice);

    let mut map = SiteMap::new(&lattice);
    for site in KernelRange::interior(&lattice).sites().filter(|s| s.kc == 1) {
        map.set_status(site.index, SiteStatus::Boundary);
    }
    map.halo(&lattice);

    let mut force = ForceField::new(&lattice);
    grad_mu_solid(&lattice, &phi, &mu, &map, &mut force, ExecutionBackend::Serial).unwrap();

    let mu_at = |index| {
        let mut buf = [0.0; MAX_COMPONENTS + 1];
        mu.chemical_potential(index, &mut buf);
        [buf[0], buf[1]]
    };

    let here = lattice.index(2, 3, 2);
    let above = lattice.index(2, 3, 3);
    let mu0 = mu_at(here);
    let mup1 = mu_at(above);
    let phi0 = phi.values(here);

    // Below is wall: d_z mu = (mu(z + 1) - mu(z)) / 2.
    let expected_z: f64 = (0..2).map(|n| -phi0[n] * 0.5 * (mup1[n] - mu0[n])).sum();
    let fz = force.force(here)[2];
    println!("wall-adjacent F_z = {:.6e}, expected {:.6e}", fz, expected_z);
    assert!((fz - expected_z).abs() < 1e-14);

    // A site with no wall neighbour sees the plain centred difference.
    let mut fluid = ForceField::new(&lattice);
    grad_mu_fluid(&lattice, &phi, &mu, &mut fluid, ExecutionBackend::Serial).unwrap();
    let middle = lattice.index(1, 1, 5);
    assert_eq!(force.force(middle), fluid.force(middle));
}

#[test]
fn external_gradient_short_circuits() {
    let lattice = SerialLattice::new([4, 4, 4], 1).unwrap();
    let scalar = Field::from_fn(&lattice, 1, |_, _, _, v| v[0] = 0.7);
    let (vector, _) = ternary_fields(&lattice);

    let mut force = ForceField::new(&lattice);
    for site in KernelRange::interior(&lattice).sites() {
        force.add_local_force(site.index, &Vector3::new(site.ic as f64, 1.0, -2.0));
    }
    let before = force.clone();

    let applied = grad_mu_external(&lattice, &scalar, &Vector3::zeros(), &mut force, ExecutionBackend::Serial).unwrap();
    assert!(!applied);
    assert_eq!(force, before);

    let grad = Vector3::new(0.0, 0.1, 0.0);
    let applied = grad_mu_external(&lattice, &vector, &grad, &mut force, ExecutionBackend::Serial).unwrap();
    assert!(!applied);
    assert_eq!(force, before);

    let applied = grad_mu_external(&lattice, &scalar, &grad, &mut force, ExecutionBackend::Serial).unwrap();
    assert!(applied);
    let index = lattice.index(3, 1, 2);
    let delta = force.force(index) - before.force(index);
    assert!((delta - Vector3::new(0.0, -0.07, 0.0)).amax() < 1e-15);
}

#[test]
fn too_many_components_is_rejected() {
    let lattice = SerialLattice::new([4, 4, 4], 1).unwrap();
    let phi = Field::new(&lattice, MAX_COMPONENTS + 1);
    let mu = FunctionalChemicalPotential::new(1, |_, mu| mu[0] = 0.0);
    let mut force = ForceField::new(&lattice);

    let grad = Vector3::new(0.1, 0.0, 0.0);
    let err = grad_mu_external(&lattice, &phi, &grad, &mut force, ExecutionBackend::Serial).unwrap_err();
    assert!(matches!(err, PreconditionError::TooManyComponents { .. }));

    let err = grad_mu_fluid(&lattice, &phi, &mu, &mut force, ExecutionBackend::Serial).unwrap_err();
    assert_eq!(
        err,
        PreconditionError::TooManyComponents {
            nf: MAX_COMPONENTS + 1,
            max: MAX_COMPONENTS
        }
    );
}

#[test]
fn threaded_backend_is_bit_identical() {
    let lattice = SerialLattice::new([16, 16, 16], 2).unwrap();
    let stress = rough_stress(&lattice);
    let lat = &lattice;
    let (phi, mu) = {
        let n = 16.0;
        let phi = Field::from_fn(&lattice, 1, |ic, jc, kc, v| {
            v[0] = ((ic * 3 + jc * 5 + kc) as f64 * 0.41).sin();
        });
        let mu = FunctionalChemicalPotential::new(1, move |index, mu| {
            let [ic, _, kc] = lat.index_to_ijk(index);
            mu[0] = (2.0 * PI * (ic + kc) as f64 / n).cos();
        });
        (phi, mu)
    };

    let methods = [
        ForceMethod::StressDivergence,
        ForceMethod::StressDivergenceNvel(VelocitySet::D3Q19),
        ForceMethod::PhiGradMu,
    ];
    for method in methods {
        let thermo = match method {
            ForceMethod::PhiGradMu => Thermodynamics::ChemicalPotential(&mu),
            _ => Thermodynamics::Stress(&stress),
        };
        let run = |backend| {
            let stage = PhiForce {
                backend,
                external_grad_mu: Vector3::new(0.01, 0.0, 0.0),
                ..PhiForce::new(method)
            };
            let mut force = ForceField::new(&lattice);
            stage
                .compute(&lattice, thermo, Some(&phi), None, &mut force)
                .unwrap();
            force
        };

        let serial = run(ExecutionBackend::Serial);
        let threaded = run(ExecutionBackend::Threaded);
        assert_eq!(serial, threaded, "{}", method.name());
    }
}

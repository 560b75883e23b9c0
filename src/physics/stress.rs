use crate::discretization::kernel::KernelRange;
use crate::discretization::lattice::Lattice;
use crate::numerics::parallel::ExecutionBackend;
use crate::physics::ChemicalStress;
use nalgebra::Matrix3;

/// Stored chemical stress, nine row-major components per site.
///
/// Filling the store once and refreshing its halo lets the stencils read the
/// stress up to `nhalo` sites outside the interior, where a live provider
/// has nothing to say.
#[derive(Debug, Clone)]
pub struct StressField {
    data: Vec<f64>,
}

impl StressField {
    pub fn new(lattice: &dyn Lattice) -> Self {
        Self {
            data: vec![0.0; 9 * lattice.nsites()],
        }
    }

    /// Evaluate `provider` on every interior site, then swap the halo.
    pub fn compute(
        &mut self,
        lattice: &dyn Lattice,
        provider: &dyn ChemicalStress,
        backend: ExecutionBackend,
    ) {
        let range = KernelRange::interior(lattice);
        let values = backend.map_range(range.len(), |k| {
            let site = range.site(k);
            (site.index, provider.chemical_stress(site.index))
        });
        for (index, pth) in values {
            self.set_stress(index, &pth);
        }
        lattice.halo_exchange(&mut self.data, 9);
    }

    pub fn from_provider(
        lattice: &dyn Lattice,
        provider: &dyn ChemicalStress,
        backend: ExecutionBackend,
    ) -> Self {
        let mut field = Self::new(lattice);
        field.compute(lattice, provider, backend);
        field
    }

    pub fn stress(&self, index: usize) -> Matrix3<f64> {
        Matrix3::from_row_slice(&self.data[9 * index..9 * index + 9])
    }

    pub fn set_stress(&mut self, index: usize, pth: &Matrix3<f64>) {
        let slot = &mut self.data[9 * index..9 * index + 9];
        for a in 0..3 {
            for b in 0..3 {
                slot[3 * a + b] = pth[(a, b)];
            }
        }
    }
}

impl ChemicalStress for StressField {
    fn chemical_stress(&self, index: usize) -> Matrix3<f64> {
        self.stress(index)
    }
}

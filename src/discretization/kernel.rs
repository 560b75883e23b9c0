use crate::discretization::lattice::Lattice;

/// A lattice site visited by a kernel: local coordinates plus linear index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Site {
    pub ic: i32,
    pub jc: i32,
    pub kc: i32,
    pub index: usize,
}

/// A box of local coordinates flattened into a single index range.
///
/// Kernels are written as a per-site body over `0..len()`; [`KernelRange::site`]
/// recovers the coordinates so the body never depends on how the range is
/// scheduled.
#[derive(Clone, Copy)]
pub struct KernelRange<'a> {
    lattice: &'a dyn Lattice,
    lower: [i32; 3],
    extent: [usize; 3],
}

impl<'a> KernelRange<'a> {
    /// The local interior, halo excluded.
    pub fn interior(lattice: &'a dyn Lattice) -> Self {
        Self {
            lattice,
            lower: [1, 1, 1],
            extent: lattice.nlocal(),
        }
    }

    pub fn len(&self) -> usize {
        self.extent.iter().product()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn site(&self, k: usize) -> Site {
        let [_, ny, nz] = self.extent;
        let ic = self.lower[0] + (k / (ny * nz)) as i32;
        let jc = self.lower[1] + ((k / nz) % ny) as i32;
        let kc = self.lower[2] + (k % nz) as i32;
        Site {
            ic,
            jc,
            kc,
            index: self.lattice.index(ic, jc, kc),
        }
    }

    pub fn sites(&self) -> impl Iterator<Item = Site> + '_ {
        (0..self.len()).map(move |k| self.site(k))
    }

    /// Sites of one red/black colour: pass 0 holds `ic + jc + kc` odd, pass 1 even.
    pub fn coloured(&self, pass: usize) -> Vec<Site> {
        let parity = if pass % 2 == 0 { 1 } else { 0 };
        self.sites()
            .filter(|s| (s.ic + s.jc + s.kc).rem_euclid(2) == parity)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::discretization::lattice::SerialLattice;

    #[test]
    fn interior_visits_every_site_once() {
        let lattice = SerialLattice::new([2, 3, 4], 1).unwrap();
        let range = KernelRange::interior(&lattice);
        assert_eq!(range.len(), 24);

        let mut seen: Vec<usize> = range.sites().map(|s| s.index).collect();
        seen.sort_unstable();
        seen.dedup();
        assert_eq!(seen.len(), 24);

        let first = range.site(0);
        assert_eq!((first.ic, first.jc, first.kc), (1, 1, 1));
        let last = range.site(23);
        assert_eq!((last.ic, last.jc, last.kc), (2, 3, 4));
    }

    #[test]
    fn colours_partition_the_interior() {
        let lattice = SerialLattice::new([4, 4, 4], 1).unwrap();
        let range = KernelRange::interior(&lattice);
        let red = range.coloured(0);
        let black = range.coloured(1);

        assert_eq!(red.len(), 32);
        assert_eq!(black.len(), 32);
        assert!(red.iter().all(|s| (s.ic + s.jc + s.kc) % 2 == 1));
        assert!(black.iter().all(|s| (s.ic + s.jc + s.kc) % 2 == 0));
    }
}

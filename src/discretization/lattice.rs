use crate::error::PreconditionError;

/// Global reductions across the cooperating processes of a decomposition.
pub trait Communicator: Sync {
    fn rank(&self) -> usize;
    fn size(&self) -> usize;

    /// Element-wise sum of `values` over all processes, result left in place.
    fn all_reduce_sum(&self, values: &mut [f64]);

    fn all_reduce_min(&self, values: &mut [f64]);

    fn all_reduce_max(&self, values: &mut [f64]);
}

/// Local view of a Cartesian lattice decomposition.
///
/// Local coordinates are signed: the interior runs over `1..=nlocal[d]` and the
/// halo extends `nhalo` sites beyond it on either side. Every index returned by
/// [`Lattice::index`] addresses the full allocation, halo included.
pub trait Lattice: Sync {
    /// Interior extents of the local subdomain.
    fn nlocal(&self) -> [usize; 3];

    fn nhalo(&self) -> usize;

    /// Linear index of the site at local coordinates `(ic, jc, kc)`.
    fn index(&self, ic: i32, jc: i32, kc: i32) -> usize;

    /// Inverse of [`Lattice::index`].
    fn index_to_ijk(&self, index: usize) -> [i32; 3];

    /// Memory strides `[xs, ys, zs]` so that `index(ic + 1, jc, kc) == index + xs` etc.
    fn strides(&self) -> [usize; 3];

    /// Number of allocated sites, halo included.
    fn nsites(&self) -> usize;

    /// Global system size `[Lx, Ly, Lz]`.
    fn ltot(&self) -> [f64; 3];

    fn cart_coords(&self) -> [usize; 3];

    fn cart_size(&self) -> [usize; 3];

    fn periodic(&self) -> [bool; 3];

    fn communicator(&self) -> &dyn Communicator;

    /// Refresh the halo of a site-major field with `nf` components per site.
    fn halo_exchange(&self, data: &mut [f64], nf: usize);

    /// As [`Lattice::halo_exchange`] for byte-valued fields such as status maps.
    fn halo_exchange_bytes(&self, data: &mut [u8], nf: usize);

    /// Number of sliding (Lees-Edwards) planes crossing the local domain.
    fn n_sliding_planes(&self) -> usize {
        0
    }

    /// x-coordinate of the neighbour `di` sites away from `ic`, remapped to
    /// the sliding-boundary buffer where the geometry requires it.
    fn x_buffer_index(&self, ic: i32, di: i32) -> i32 {
        ic + di
    }
}

/// Trivial communicator for a single process.
#[derive(Debug, Default, Clone, Copy)]
pub struct SerialComm;

impl Communicator for SerialComm {
    fn rank(&self) -> usize {
        0
    }

    fn size(&self) -> usize {
        1
    }

    fn all_reduce_sum(&self, _values: &mut [f64]) {}

    fn all_reduce_min(&self, _values: &mut [f64]) {}

    fn all_reduce_max(&self, _values: &mut [f64]) {}
}

/// A fully periodic lattice owned by one process.
///
/// The halo is refreshed by copying periodic images, one dimension at a time
/// so that edges and corners pick up the values already placed by the
/// previous dimension.
#[derive(Debug, Clone)]
pub struct SerialLattice {
    ntotal: [usize; 3],
    nhalo: usize,
    nall: [usize; 3],
    strides: [usize; 3],
    comm: SerialComm,
}

impl SerialLattice {
    pub fn new(ntotal: [usize; 3], nhalo: usize) -> Result<Self, PreconditionError> {
        if nhalo == 0 {
            return Err(PreconditionError::InsufficientHalo {
                required: 1,
                actual: 0,
            });
        }
        for (dim, &extent) in ntotal.iter().enumerate() {
            if extent < nhalo {
                return Err(PreconditionError::ExtentBelowHalo { dim, extent, nhalo });
            }
        }

        let nall = ntotal.map(|n| n + 2 * nhalo);
        let strides = [nall[1] * nall[2], nall[2], 1];

        Ok(Self {
            ntotal,
            nhalo,
            nall,
            strides,
            comm: SerialComm,
        })
    }

    /// Allocated extents, halo included.
    pub fn nall(&self) -> [usize; 3] {
        self.nall
    }

    fn periodic_halo<T: Copy>(&self, data: &mut [T], nf: usize) {
        debug_assert_eq!(data.len(), self.nsites() * nf);

        let nh = self.nhalo as i32;
        let n = self.ntotal.map(|x| x as i32);
        let full = |d: usize| (1 - nh)..=(n[d] + nh);

        for dim in 0..3 {
            for ic in full(0) {
                for jc in full(1) {
                    for kc in full(2) {
                        let mut at = [ic, jc, kc];
                        let c = at[dim];
                        let source = if c < 1 {
                            c + n[dim]
                        } else if c > n[dim] {
                            c - n[dim]
                        } else {
                            continue;
                        };
                        let dst = self.index(at[0], at[1], at[2]);
                        at[dim] = source;
                        let src = self.index(at[0], at[1], at[2]);
                        for f in 0..nf {
                            data[dst * nf + f] = data[src * nf + f];
                        }
                    }
                }
            }
        }
    }
}

impl Lattice for SerialLattice {
    fn nlocal(&self) -> [usize; 3] {
        self.ntotal
    }

    fn nhalo(&self) -> usize {
        self.nhalo
    }

    #[inline]
    fn index(&self, ic: i32, jc: i32, kc: i32) -> usize {
        let nh = self.nhalo as i32;
        debug_assert!(ic >= 1 - nh && ic <= self.ntotal[0] as i32 + nh);
        debug_assert!(jc >= 1 - nh && jc <= self.ntotal[1] as i32 + nh);
        debug_assert!(kc >= 1 - nh && kc <= self.ntotal[2] as i32 + nh);

        self.strides[0] * (ic + nh - 1) as usize
            + self.strides[1] * (jc + nh - 1) as usize
            + (kc + nh - 1) as usize
    }

    fn index_to_ijk(&self, index: usize) -> [i32; 3] {
        let nh = self.nhalo as i32;
        let ic = (index / self.strides[0]) as i32;
        let jc = ((index % self.strides[0]) / self.strides[1]) as i32;
        let kc = (index % self.strides[1]) as i32;
        [ic + 1 - nh, jc + 1 - nh, kc + 1 - nh]
    }

    fn strides(&self) -> [usize; 3] {
        self.strides
    }

    fn nsites(&self) -> usize {
        self.nall.iter().product()
    }

    fn ltot(&self) -> [f64; 3] {
        self.ntotal.map(|n| n as f64)
    }

    fn cart_coords(&self) -> [usize; 3] {
        [0, 0, 0]
    }

    fn cart_size(&self) -> [usize; 3] {
        [1, 1, 1]
    }

    fn periodic(&self) -> [bool; 3] {
        [true, true, true]
    }

    fn communicator(&self) -> &dyn Communicator {
        &self.comm
    }

    fn halo_exchange(&self, data: &mut [f64], nf: usize) {
        self.periodic_halo(data, nf);
    }

    fn halo_exchange_bytes(&self, data: &mut [u8], nf: usize) {
        self.periodic_halo(data, nf);
    }
}

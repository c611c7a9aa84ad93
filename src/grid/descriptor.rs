//! Global grid description and its domain decomposition.
//!
//! A `GridDescriptor` knows the global number of grid points per axis, which axes
//! are periodic, the process grid the domain is split over and which block belongs
//! to this rank. On a non-periodic axis point 0 lies on the boundary, carries the
//! zero boundary value and is never stored: the first domain starts at index 1.

use crate::error::FdError;

/// Lower or upper face of a domain along one axis.
pub const LOW: usize = 0;
pub const HIGH: usize = 1;

#[derive(Debug, Clone, PartialEq)]
pub struct GridDescriptor {
    global: [usize; 3],
    periodic: [bool; 3],
    spacing: [f64; 3],
    parsize: [usize; 3],
    rank: usize,
    coords: [usize; 3],
    /// Domain boundaries per axis: domain p covers `[bounds[p], bounds[p + 1])`.
    bounds: [Vec<usize>; 3],
}

impl GridDescriptor {
    /// Undecomposed grid (one partition).
    pub fn new(global: [usize; 3], periodic: [bool; 3], spacing: [f64; 3]) -> Result<Self, FdError> {
        Self::decomposed(global, periodic, spacing, [1, 1, 1], 0)
    }

    /// Grid split over a `parsize` process grid, seen from `rank`.
    pub fn decomposed(
        global: [usize; 3],
        periodic: [bool; 3],
        spacing: [f64; 3],
        parsize: [usize; 3],
        rank: usize,
    ) -> Result<Self, FdError> {
        let nranks: usize = parsize.iter().product();
        if nranks == 0 {
            return Err(FdError::InvalidGrid(format!("process grid {parsize:?} is empty")));
        }
        if rank >= nranks {
            return Err(FdError::InvalidGrid(format!(
                "rank {rank} outside process grid {parsize:?}"
            )));
        }
        let mut bounds: [Vec<usize>; 3] = Default::default();
        for c in 0..3 {
            let first = usize::from(!periodic[c]);
            if global[c] <= first {
                return Err(FdError::InvalidGrid(format!(
                    "axis {c} has {} points, too few for {} boundaries",
                    global[c],
                    if periodic[c] { "periodic" } else { "zero" }
                )));
            }
            let p = parsize[c];
            let mut b: Vec<usize> = (0..=p)
                .map(|i| ((i * global[c]) as f64 / p as f64).round() as usize)
                .collect();
            b[0] = first;
            if b.windows(2).any(|w| w[1] <= w[0]) {
                return Err(FdError::InvalidGrid(format!(
                    "cannot split {} points over {p} domains along axis {c}",
                    global[c]
                )));
            }
            bounds[c] = b;
        }
        let coords = [
            rank / (parsize[1] * parsize[2]),
            (rank / parsize[2]) % parsize[1],
            rank % parsize[2],
        ];
        Ok(Self { global, periodic, spacing, parsize, rank, coords, bounds })
    }

    pub fn global(&self) -> [usize; 3] {
        self.global
    }

    pub fn periodic(&self) -> [bool; 3] {
        self.periodic
    }

    pub fn spacing(&self) -> [f64; 3] {
        self.spacing
    }

    pub fn parsize(&self) -> [usize; 3] {
        self.parsize
    }

    pub fn rank(&self) -> usize {
        self.rank
    }

    pub fn coords(&self) -> [usize; 3] {
        self.coords
    }

    pub fn nranks(&self) -> usize {
        self.parsize.iter().product()
    }

    /// First global index owned by this rank along `axis`.
    pub fn beg(&self, axis: usize) -> usize {
        self.bounds[axis][self.coords[axis]]
    }

    /// One past the last global index owned by this rank along `axis`.
    pub fn end(&self, axis: usize) -> usize {
        self.bounds[axis][self.coords[axis] + 1]
    }

    /// Local interior extent.
    pub fn n(&self) -> [usize; 3] {
        [0, 1, 2].map(|c| self.end(c) - self.beg(c))
    }

    /// Number of locally stored points.
    pub fn points(&self) -> usize {
        self.n().iter().product()
    }

    /// Fewest points any rank holds along each axis.
    pub fn smallest_domain(&self) -> [usize; 3] {
        [0, 1, 2].map(|c| self.bounds[c].windows(2).map(|w| w[1] - w[0]).min().unwrap_or(0))
    }

    /// Volume element.
    pub fn dv(&self) -> f64 {
        self.spacing.iter().product()
    }

    pub fn rank_of(&self, coords: [usize; 3]) -> usize {
        (coords[0] * self.parsize[1] + coords[1]) * self.parsize[2] + coords[2]
    }

    /// Rank across the `side` face of `axis`, `None` at a non-periodic domain edge.
    pub fn neighbor(&self, axis: usize, side: usize) -> Option<usize> {
        let p = self.parsize[axis];
        let c = self.coords[axis];
        let target = match side {
            LOW if c > 0 => c - 1,
            LOW if self.periodic[axis] => p - 1,
            HIGH if c + 1 < p => c + 1,
            HIGH if self.periodic[axis] => 0,
            _ => return None,
        };
        let mut coords = self.coords;
        coords[axis] = target;
        Some(self.rank_of(coords))
    }

    /// Whether the `side` face of this domain is the periodic boundary of the
    /// global cell (data arriving there carries the Bloch phase).
    pub fn wraps(&self, axis: usize, side: usize) -> bool {
        self.periodic[axis]
            && match side {
                LOW => self.coords[axis] == 0,
                _ => self.coords[axis] + 1 == self.parsize[axis],
            }
    }

    /// Descriptor of the grid with half the points per axis on the same process grid.
    pub fn coarsen(&self) -> Result<Self, FdError> {
        let mut coarse = self.clone();
        for c in 0..3 {
            if self.global[c] % 2 != 0 {
                return Err(FdError::InvalidGrid(format!(
                    "axis {c} has {} points, not divisible by 2",
                    self.global[c]
                )));
            }
            let first = usize::from(!self.periodic[c]);
            let mut b = Vec::with_capacity(self.bounds[c].len());
            for (p, &x) in self.bounds[c].iter().enumerate() {
                if p == 0 {
                    b.push(first);
                } else if x % 2 != 0 {
                    return Err(FdError::InvalidGrid(format!(
                        "domain boundary {x} on axis {c} is odd, cannot coarsen"
                    )));
                } else {
                    b.push(x / 2);
                }
            }
            if b.windows(2).any(|w| w[1] <= w[0]) {
                return Err(FdError::InvalidGrid(format!(
                    "coarse axis {c} leaves an empty domain"
                )));
            }
            coarse.global[c] = self.global[c] / 2;
            coarse.spacing[c] = self.spacing[c] * 2.0;
            coarse.bounds[c] = b;
        }
        Ok(coarse)
    }

    /// Global index ranges of every rank (used to scatter/gather in tests and hosts).
    pub fn domain_of(&self, rank: usize) -> [(usize, usize); 3] {
        let coords = [
            rank / (self.parsize[1] * self.parsize[2]),
            (rank / self.parsize[2]) % self.parsize[1],
            rank % self.parsize[2],
        ];
        [0, 1, 2].map(|c| (self.bounds[c][coords[c]], self.bounds[c][coords[c] + 1]))
    }

    /// Same grid seen from another rank.
    pub fn for_rank(&self, rank: usize) -> Result<Self, FdError> {
        if rank >= self.nranks() {
            return Err(FdError::InvalidGrid(format!("rank {rank} out of range")));
        }
        let mut gd = self.clone();
        gd.rank = rank;
        gd.coords = [
            rank / (self.parsize[1] * self.parsize[2]),
            (rank / self.parsize[2]) % self.parsize[1],
            rank % self.parsize[2],
        ];
        Ok(gd)
    }
}

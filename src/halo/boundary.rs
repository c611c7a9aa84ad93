//! Halo exchange channel of one partition.
//!
//! A `Boundary` is built once per (grid descriptor, halo widths) pair. It owns no
//! buffers: `begin` packs the send slabs of a chunk of padded grids and posts the
//! transfers, `finish` waits for them and writes the received slabs into the halo.
//! Exchanging axes 0, 1, 2 in that order fills edges and corners, because the slabs
//! of axis `a` cover the full padded extent of the axes before it.

use tracing::trace;

use super::Phases;
use crate::core::Scalar;
use crate::error::FdError;
use crate::grid::{GridDescriptor, HIGH, LOW, Layout, Region};
use crate::parallel::{TagSpace, Transport};

/// Where the data for one side of a pending exchange comes from.
enum Incoming<T, R> {
    Nothing,
    Local(Vec<T>),
    Remote(R),
}

/// Transfers posted by [`Boundary::begin`] for one axis of one chunk.
#[must_use = "a begun exchange must be finished"]
pub struct AxisExchange<T: Scalar, C: Transport<T>> {
    axis: usize,
    count: usize,
    incoming: [Incoming<T, C::RecvRequest>; 2],
    sends: Vec<C::SendRequest>,
}

impl<T: Scalar, C: Transport<T>> AxisExchange<T, C> {
    pub fn axis(&self) -> usize {
        self.axis
    }
}

#[derive(Debug, Clone)]
pub struct Boundary {
    layout: Layout,
    rank: usize,
    neighbor: [[Option<usize>; 2]; 3],
    wraps: [[bool; 2]; 3],
    /// Slab of this partition's interior a neighbour needs.
    send: [[Region; 2]; 3],
    /// Slab of this partition's halo filled from a neighbour.
    recv: [[Region; 2]; 3],
    maxsend: usize,
    maxrecv: usize,
}

impl Boundary {
    /// Channel for grids laid out with halo `pad` (per axis, per side) whose
    /// neighbours use halo `npad`.
    ///
    /// For stencils `npad == pad`; transfer operators derive both from the fine and
    /// coarse global ranges.
    pub fn new(
        gd: &GridDescriptor,
        pad: [[usize; 2]; 3],
        npad: [[usize; 2]; 3],
        channels: usize,
    ) -> Result<Self, FdError> {
        if channels == 0 {
            return Err(FdError::InvalidGrid("grids need at least one channel".into()));
        }
        let n = gd.n();
        let layout = Layout::new(n, pad, channels);
        let padded = layout.padded();
        let mut neighbor = [[None; 2]; 3];
        let mut wraps = [[false; 2]; 3];
        let mut send = [[Region::default(); 2]; 3];
        let mut recv = [[Region::default(); 2]; 3];
        let mut maxsend = 0;
        let mut maxrecv = 0;
        for a in 0..3 {
            for side in [LOW, HIGH] {
                let Some(peer) = gd.neighbor(a, side) else {
                    continue;
                };
                // `npad[a][side]` is the neighbour's halo facing this side: the slab we send there.
                let width = npad[a][side];
                if width > n[a] {
                    return Err(FdError::InvalidGrid(format!(
                        "axis {a}: neighbour halo of {width} points exceeds the {} local points",
                        n[a]
                    )));
                }
                if peer == gd.rank() && pad[a][side] > n[a] {
                    return Err(FdError::InvalidGrid(format!(
                        "axis {a}: periodic self-wrap needs at least {} points, have {}",
                        pad[a][side], n[a]
                    )));
                }
                let mut s = Region::default();
                let mut r = Region::default();
                for b in 0..3 {
                    if b < a {
                        s.start[b] = 0;
                        s.size[b] = padded[b];
                    } else if b > a {
                        s.start[b] = pad[b][LOW];
                        s.size[b] = n[b];
                    }
                }
                r.start = s.start;
                r.size = s.size;
                s.size[a] = width;
                s.start[a] = match side {
                    LOW => pad[a][LOW],
                    _ => pad[a][LOW] + n[a] - width,
                };
                r.size[a] = pad[a][side];
                r.start[a] = match side {
                    LOW => 0,
                    _ => pad[a][LOW] + n[a],
                };
                maxsend = maxsend.max(s.points() * channels);
                maxrecv = maxrecv.max(r.points() * channels);
                neighbor[a][side] = Some(peer);
                wraps[a][side] = gd.wraps(a, side);
                send[a][side] = s;
                recv[a][side] = r;
            }
        }
        Ok(Self { layout, rank: gd.rank(), neighbor, wraps, send, recv, maxsend, maxrecv })
    }

    /// Channel with the same halo width on both sides of every axis.
    pub fn symmetric(gd: &GridDescriptor, halo: [usize; 3], channels: usize) -> Result<Self, FdError> {
        let pad = halo.map(|h| [h, h]);
        Self::new(gd, pad, pad, channels)
    }

    pub fn layout(&self) -> &Layout {
        &self.layout
    }

    /// Largest slab sent per grid, in scalars.
    pub fn maxsend(&self) -> usize {
        self.maxsend
    }

    /// Largest slab received per grid, in scalars.
    pub fn maxrecv(&self) -> usize {
        self.maxrecv
    }

    pub fn neighbor(&self, axis: usize, side: usize) -> Option<usize> {
        self.neighbor[axis][side]
    }

    /// Scalars this partition sends per grid over a full three-axis exchange.
    pub fn send_len_per_grid(&self) -> usize {
        (0..3)
            .flat_map(|a| [LOW, HIGH].map(|s| (a, s)))
            .filter(|&(a, s)| self.neighbor[a][s].is_some_and(|p| p != self.rank))
            .map(|(a, s)| self.send[a][s].points() * self.layout.channels)
            .sum()
    }

    /// True when no side of any axis moves data.
    pub fn is_trivial(&self) -> bool {
        (0..3).all(|a| {
            [LOW, HIGH].iter().all(|&s| {
                self.neighbor[a][s].is_none()
                    || (self.send[a][s].points() == 0 && self.recv[a][s].points() == 0)
            })
        })
    }

    fn check_chunk<T>(&self, buf: &[T], count: usize) -> Result<(), FdError> {
        FdError::check_len("halo chunk", count * self.layout.padded_len(), buf.len())
    }

    /// Pack and post the slabs of `axis` for `count` padded grids stored back to back in
    /// `buf`. Tags come from `space`, so concurrent chunks never collide.
    pub fn begin<T: Scalar, C: Transport<T>>(
        &self,
        comm: &C,
        axis: usize,
        buf: &[T],
        count: usize,
        space: TagSpace,
    ) -> Result<AxisExchange<T, C>, FdError> {
        space.validate()?;
        if axis > 2 {
            return Err(FdError::InvalidGrid(format!("axis {axis} out of range 0..3")));
        }
        self.check_chunk(buf, count)?;
        trace!(axis, count, worker = space.worker, slot = space.slot, "halo begin");
        let glen = self.layout.padded_len();
        let mut incoming = [Incoming::Nothing, Incoming::Nothing];
        let mut sends = Vec::new();

        for side in [LOW, HIGH] {
            let Some(peer) = self.neighbor[axis][side] else {
                continue;
            };
            let r = &self.recv[axis][side];
            if peer != self.rank && r.points() > 0 {
                let len = r.points() * self.layout.channels * count;
                let tag = space.halo(axis, 1 - side);
                incoming[side] = Incoming::Remote(comm.post_recv(len, peer, tag)?);
            }
        }
        for side in [LOW, HIGH] {
            let Some(peer) = self.neighbor[axis][side] else {
                continue;
            };
            let s = &self.send[axis][side];
            if s.points() == 0 {
                continue;
            }
            let mut packed = Vec::with_capacity(s.points() * self.layout.channels * count);
            for g in 0..count {
                s.pack(&self.layout, &buf[g * glen..(g + 1) * glen], &mut packed);
            }
            if peer == self.rank {
                // Periodic axis held by one partition: what leaves through one side
                // arrives at the other.
                incoming[1 - side] = Incoming::Local(packed);
            } else {
                sends.push(comm.post_send(packed, peer, space.halo(axis, side))?);
            }
        }
        Ok(AxisExchange { axis, count, incoming, sends })
    }

    /// Wait for the transfers of `ex` and write them into the halo of `buf`,
    /// multiplied by the side's phase where the side wraps the periodic boundary.
    pub fn finish<T: Scalar, C: Transport<T>>(
        &self,
        comm: &C,
        ex: AxisExchange<T, C>,
        buf: &mut [T],
        phases: &Phases<T>,
    ) -> Result<(), FdError> {
        let AxisExchange { axis, count, incoming, sends } = ex;
        self.check_chunk(buf, count)?;
        let glen = self.layout.padded_len();
        let [low, high] = incoming;
        for (side, inc) in [(LOW, low), (HIGH, high)] {
            let data = match inc {
                Incoming::Nothing => continue,
                Incoming::Local(data) => data,
                Incoming::Remote(req) => comm.wait_recv(req)?,
            };
            let r = &self.recv[axis][side];
            let per_grid = r.points() * self.layout.channels;
            FdError::check_len("halo slab", per_grid * count, data.len())?;
            let phase = if self.wraps[axis][side] { phases.get(axis, side) } else { T::one() };
            for g in 0..count {
                r.unpack(
                    &self.layout,
                    &data[g * per_grid..(g + 1) * per_grid],
                    &mut buf[g * glen..(g + 1) * glen],
                    phase,
                );
            }
        }
        for req in sends {
            comm.wait_send(req)?;
        }
        trace!(axis, count, "halo finish");
        Ok(())
    }

    /// Full halo refresh of `count` grids: every axis begun and finished in order.
    pub fn exchange<T: Scalar, C: Transport<T>>(
        &self,
        comm: &C,
        buf: &mut [T],
        count: usize,
        phases: &Phases<T>,
        space: TagSpace,
    ) -> Result<(), FdError> {
        if self.is_trivial() {
            return self.check_chunk(buf, count);
        }
        for axis in 0..3 {
            let ex = self.begin(comm, axis, buf, count, space)?;
            self.finish(comm, ex, buf, phases)?;
        }
        Ok(())
    }
}

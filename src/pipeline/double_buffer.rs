//! Double-buffered exchange/compute schedule.
//!
//! Each worker walks its share of the batch in chunks. While chunk i is completed
//! and computed out of one slot, the first axis of chunk i+1 is already in flight
//! out of the other slot. The reference schedule exchanges and computes one grid at
//! a time; both produce bit-identical results because every grid's output depends
//! only on its own input and halo.

use std::mem::size_of;
use std::ops::Range;

use tracing::{debug, trace};

use super::{ChunkKernel, ChunkSchedule};
use crate::config::PipelineOptions;
use crate::core::Scalar;
use crate::error::FdError;
use crate::halo::{AxisExchange, Phases};
use crate::parallel::{TagSpace, Transport, partition};
use crate::utils::zeroed;

#[derive(Debug, Clone)]
pub struct DoubleBufferedPipeline {
    opts: PipelineOptions,
}

impl DoubleBufferedPipeline {
    pub fn new(opts: PipelineOptions) -> Result<Self, FdError> {
        opts.validate()?;
        Ok(Self { opts })
    }

    pub fn options(&self) -> &PipelineOptions {
        &self.opts
    }

    /// Apply `kernel` to every grid of `input` (unpadded, batch outermost), writing
    /// `kernel.output_len()` scalars per grid to `output`.
    ///
    /// All partitions must call this with the same batch size and options so that
    /// workers pair up by tag. With `optimal_msg_size` set, the chunk size comes from
    /// the largest per-grid send over all partitions, so neighbours with fewer
    /// neighbours or smaller domains still cut the batch the same way.
    pub fn run<T, C, K>(
        &self,
        comm: &C,
        kernel: &K,
        input: &[T],
        output: &mut [T],
        phases: &Phases<T>,
    ) -> Result<(), FdError>
    where
        T: Scalar,
        C: Transport<T> + Sync,
        K: ChunkKernel<T> + ?Sized,
    {
        let ilen = kernel.boundary().layout().interior_len();
        let olen = kernel.output_len();
        let nbatch = input.len() / ilen.max(1);
        FdError::check_len("batch input", nbatch * ilen, input.len())?;
        FdError::check_len("batch output", nbatch * olen, output.len())?;

        let send_bytes = match self.opts.optimal_msg_size {
            Some(_) if self.opts.double_buffering => {
                let local = kernel.boundary().send_len_per_grid() * size_of::<T>();
                comm.all_reduce_max(local as f64) as usize
            }
            _ => 0,
        };

        let ranges = partition(nbatch, self.opts.workers)?;
        let mut jobs: Vec<(usize, Range<usize>, &mut [T])> = Vec::with_capacity(ranges.len());
        let mut rest = output;
        for (id, r) in ranges.into_iter().enumerate() {
            let (head, tail) = std::mem::take(&mut rest).split_at_mut(r.len() * olen);
            rest = tail;
            if !r.is_empty() {
                jobs.push((id, r, head));
            }
        }
        debug!(nbatch, workers = jobs.len(), overlap = self.opts.double_buffering, send_bytes, "pipeline run");

        if jobs.len() <= 1 {
            for (id, r, out) in jobs {
                let input = &input[r.start * ilen..r.end * ilen];
                self.worker(comm, kernel, id, send_bytes, input, out, phases)?;
            }
            return Ok(());
        }
        std::thread::scope(|s| {
            let handles: Vec<_> = jobs
                .into_iter()
                .map(|(id, r, out)| {
                    let input = &input[r.start * ilen..r.end * ilen];
                    s.spawn(move || self.worker(comm, kernel, id, send_bytes, input, out, phases))
                })
                .collect();
            handles
                .into_iter()
                .map(|h| h.join().unwrap_or_else(|e| std::panic::resume_unwind(e)))
                .collect::<Result<(), FdError>>()
        })
    }

    fn worker<T, C, K>(
        &self,
        comm: &C,
        kernel: &K,
        id: usize,
        send_bytes: usize,
        input: &[T],
        output: &mut [T],
        phases: &Phases<T>,
    ) -> Result<(), FdError>
    where
        T: Scalar,
        C: Transport<T>,
        K: ChunkKernel<T> + ?Sized,
    {
        let bd = kernel.boundary();
        let layout = *bd.layout();
        let (ilen, glen, olen) = (layout.interior_len(), layout.padded_len(), kernel.output_len());
        let nb = input.len() / ilen;
        let mut scratch = zeroed(kernel.scratch_len())?;

        if !self.opts.double_buffering {
            let mut slot = zeroed(glen)?;
            for g in 0..nb {
                layout.paste(&input[g * ilen..(g + 1) * ilen], &mut slot);
                bd.exchange(comm, &mut slot, 1, phases, TagSpace::new(id, 0))?;
                kernel.compute(&slot, &mut output[g * olen..(g + 1) * olen], &mut scratch)?;
            }
            return Ok(());
        }

        let max_chunk = self.opts.max_chunk(send_bytes, nb);
        let increment = self.opts.increment(max_chunk);
        debug!(worker = id, grids = nb, max_chunk, increment, "chunk schedule");
        let mut slots = [zeroed(max_chunk * glen)?, zeroed(max_chunk * glen)?];
        let mut chunks = ChunkSchedule::new(nb, increment, max_chunk);

        // Paste a chunk into a slot and post its first axis.
        let stage = |slot: &mut [T], idx: usize, (start, len): (usize, usize)| -> Result<AxisExchange<T, C>, FdError> {
            for g in 0..len {
                let src = &input[(start + g) * ilen..(start + g + 1) * ilen];
                layout.paste(src, &mut slot[g * glen..(g + 1) * glen]);
            }
            bd.begin(comm, 0, &slot[..len * glen], len, TagSpace::new(id, idx))
        };

        let Some(first) = chunks.next() else {
            return Ok(());
        };
        let ex = stage(&mut slots[0][..], 0, first)?;
        let mut current = (first, 0usize, ex);
        loop {
            let ((start, len), idx, ex) = current;
            let next = match chunks.next() {
                Some(chunk) => {
                    let other = 1 - idx;
                    Some((chunk, other, stage(&mut slots[other][..], other, chunk)?))
                }
                None => None,
            };
            trace!(worker = id, start, len, slot = idx, "compute chunk");
            let buf = &mut slots[idx][..len * glen];
            bd.finish(comm, ex, buf, phases)?;
            for axis in 1..3 {
                let ex = bd.begin(comm, axis, buf, len, TagSpace::new(id, idx))?;
                bd.finish(comm, ex, buf, phases)?;
            }
            for g in 0..len {
                let out = &mut output[(start + g) * olen..(start + g + 1) * olen];
                kernel.compute(&buf[g * glen..(g + 1) * glen], out, &mut scratch)?;
            }
            match next {
                Some(n) => current = n,
                None => break,
            }
        }
        Ok(())
    }
}

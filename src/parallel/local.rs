// In-process transport: every rank is a thread, every (src, dst, tag) link is a channel.

use crossbeam_channel::{Receiver, Sender, unbounded};
use std::collections::HashMap;
use std::sync::{Arc, Barrier, Mutex, MutexGuard};

use super::{Tag, Transport};
use crate::core::Scalar;
use crate::error::FdError;

type Link<T> = (Sender<Vec<T>>, Receiver<Vec<T>>);

struct Hub<T> {
    size: usize,
    links: Mutex<HashMap<(usize, usize, Tag), Link<T>>>,
    barrier: Barrier,
    reduce: Mutex<Vec<f64>>,
}

fn lock<X>(m: &Mutex<X>) -> MutexGuard<'_, X> {
    m.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl<T> Hub<T> {
    fn link(&self, src: usize, dst: usize, tag: Tag) -> Link<T> {
        let mut links = lock(&self.links);
        let (tx, rx) = links.entry((src, dst, tag)).or_insert_with(unbounded);
        (tx.clone(), rx.clone())
    }
}

/// One rank of an in-process universe.
pub struct LocalTransport<T> {
    rank: usize,
    hub: Arc<Hub<T>>,
}

/// Posted receive on a [`LocalTransport`].
pub struct LocalRecv<T> {
    src: usize,
    tag: Tag,
    len: usize,
    rx: Receiver<Vec<T>>,
}

impl<T: Scalar> LocalTransport<T> {
    /// Create `size` connected ranks.
    pub fn universe(size: usize) -> Vec<Self> {
        let hub = Arc::new(Hub {
            size,
            links: Mutex::new(HashMap::new()),
            barrier: Barrier::new(size),
            reduce: Mutex::new(vec![0.0; size]),
        });
        (0..size).map(|rank| LocalTransport { rank, hub: hub.clone() }).collect()
    }

    /// Single-rank universe.
    pub fn solo() -> Self {
        Self::universe(1).remove(0)
    }

    /// Every rank's `x`, in rank order.
    fn gather(&self, x: f64) -> Vec<f64> {
        lock(&self.hub.reduce)[self.rank] = x;
        self.hub.barrier.wait();
        let all = lock(&self.hub.reduce).clone();
        self.hub.barrier.wait();
        all
    }

    /// Run `f` once per rank, each on its own thread, and collect the results in rank order.
    pub fn run<R, F>(size: usize, f: F) -> Vec<R>
    where
        R: Send,
        F: Fn(&LocalTransport<T>) -> R + Sync,
    {
        let comms = Self::universe(size);
        let f = &f;
        std::thread::scope(|s| {
            let handles: Vec<_> = comms.iter().map(|comm| s.spawn(move || f(comm))).collect();
            handles
                .into_iter()
                .map(|h| h.join().unwrap_or_else(|e| std::panic::resume_unwind(e)))
                .collect()
        })
    }
}

impl<T: Scalar> Transport<T> for LocalTransport<T> {
    type SendRequest = ();
    type RecvRequest = LocalRecv<T>;

    fn rank(&self) -> usize {
        self.rank
    }

    fn size(&self) -> usize {
        self.hub.size
    }

    fn post_send(&self, buf: Vec<T>, dest: usize, tag: Tag) -> Result<(), FdError> {
        if dest >= self.hub.size {
            return Err(FdError::Transport(format!("send to rank {dest} of {}", self.hub.size)));
        }
        let (tx, _) = self.hub.link(self.rank, dest, tag);
        tx.send(buf)
            .map_err(|_| FdError::Transport(format!("link {} -> {dest} closed", self.rank)))
    }

    fn post_recv(&self, len: usize, src: usize, tag: Tag) -> Result<LocalRecv<T>, FdError> {
        if src >= self.hub.size {
            return Err(FdError::Transport(format!("receive from rank {src} of {}", self.hub.size)));
        }
        let (_, rx) = self.hub.link(src, self.rank, tag);
        Ok(LocalRecv { src, tag, len, rx })
    }

    fn wait_send(&self, _req: ()) -> Result<(), FdError> {
        Ok(())
    }

    fn wait_recv(&self, req: LocalRecv<T>) -> Result<Vec<T>, FdError> {
        let data = req.rx.recv().map_err(|_| {
            FdError::Transport(format!("link {} -> {} closed ({:?})", req.src, self.rank, req.tag))
        })?;
        if data.len() != req.len {
            return Err(FdError::Transport(format!(
                "message {:?} from rank {} has {} elements, expected {}",
                req.tag,
                req.src,
                data.len(),
                req.len
            )));
        }
        Ok(data)
    }

    fn barrier(&self) {
        self.hub.barrier.wait();
    }

    fn all_reduce_sum(&self, x: f64) -> f64 {
        // Summed in rank order on every rank so all ranks see the same bits.
        self.gather(x).iter().sum()
    }

    fn all_reduce_max(&self, x: f64) -> f64 {
        self.gather(x).into_iter().fold(f64::NEG_INFINITY, f64::max)
    }
}

//! Thin façade over intra-process (Rayon) or inter-process (MPI) message passing.
//!
//! Messages are *contiguous byte slices* (no zero-copy guarantees).
//! Point-to-point handles are **waitable**; the collective helpers
//! (`allreduce_*`, `allgather`, `barrier`) are built on top of them by
//! gathering to rank 0 and broadcasting the result, so every backend gets
//! them for free. The MPI backend overrides the reductions with native calls.
//!
//! Every collective must be entered by all ranks in the same order.

use bytes::Bytes;
use dashmap::DashMap;
use once_cell::sync::Lazy;
use parking_lot::Mutex;
use std::sync::Arc;
use std::thread::JoinHandle;

use crate::mesh_error::MeshError;

/// Rank that gathers and broadcasts in the generic collectives.
pub const ROOT_RANK: usize = 0;

const TAG_REDUCE_UP: u16 = 0xA100;
const TAG_REDUCE_DOWN: u16 = 0xA101;
const TAG_GATHER_LEN: u16 = 0xA110;
const TAG_GATHER_DATA: u16 = 0xA111;
const TAG_BCAST_LEN: u16 = 0xA112;
const TAG_BCAST_DATA: u16 = 0xA113;

/// Non-blocking communication interface plus collectives derived from it.
pub trait Communicator {
    /// Handle returned by `isend`.
    type SendHandle: Wait;
    /// Handle returned by `irecv`.
    type RecvHandle: Wait;

    /// This process' rank in `0..size()`.
    fn rank(&self) -> usize;
    /// Number of cooperating ranks.
    fn size(&self) -> usize;

    fn isend(&self, peer: usize, tag: u16, buf: &[u8]) -> Self::SendHandle;
    fn irecv(&self, peer: usize, tag: u16, buf: &mut [u8]) -> Self::RecvHandle;

    /// Maximum of `value` over all ranks.
    fn allreduce_max(&self, value: u64) -> Result<u64, MeshError> {
        allreduce_with(self, value, u64::max)
    }

    /// Sum of `value` over all ranks.
    fn allreduce_sum(&self, value: u64) -> Result<u64, MeshError> {
        allreduce_with(self, value, u64::wrapping_add)
    }

    /// Every rank's `local` slice, indexed by rank.
    fn allgather(&self, local: &[u64]) -> Result<Vec<Vec<u64>>, MeshError> {
        allgather_via_root(self, local)
    }

    /// Synchronisation point.
    fn barrier(&self) -> Result<(), MeshError> {
        self.allreduce_max(0).map(|_| ())
    }
}

/// Anything that can be waited on.
pub trait Wait {
    /// Wait for completion and return the received data (if any).
    fn wait(self) -> Option<Vec<u8>>;
}

fn encode_u64s(values: &[u64]) -> &[u8] {
    bytemuck::cast_slice(values)
}

fn decode_u64s(bytes: &[u8]) -> Result<Vec<u64>, MeshError> {
    if bytes.len() % 8 != 0 {
        return Err(MeshError::Communication(format!(
            "payload of {} bytes is not a whole number of u64 words",
            bytes.len()
        )));
    }
    Ok(bytes
        .chunks_exact(8)
        .map(|chunk| {
            let mut word = [0u8; 8];
            word.copy_from_slice(chunk);
            u64::from_ne_bytes(word)
        })
        .collect())
}

fn send_words<C: Communicator + ?Sized>(comm: &C, peer: usize, tag: u16, words: &[u64]) {
    comm.isend(peer, tag, encode_u64s(words)).wait();
}

fn recv_words<C: Communicator + ?Sized>(
    comm: &C,
    peer: usize,
    tag: u16,
    len: usize,
) -> Result<Vec<u64>, MeshError> {
    let mut buf = vec![0u8; len * 8];
    let bytes = comm.irecv(peer, tag, &mut buf).wait().unwrap_or(buf);
    let words = decode_u64s(&bytes)?;
    if words.len() != len {
        return Err(MeshError::Communication(format!(
            "expected {len} words from rank {peer}, got {}",
            words.len()
        )));
    }
    Ok(words)
}

fn allreduce_with<C, F>(comm: &C, value: u64, op: F) -> Result<u64, MeshError>
where
    C: Communicator + ?Sized,
    F: Fn(u64, u64) -> u64,
{
    let size = comm.size();
    if size <= 1 {
        return Ok(value);
    }
    if comm.rank() == ROOT_RANK {
        let mut acc = value;
        for peer in (0..size).filter(|&p| p != ROOT_RANK) {
            acc = op(acc, recv_words(comm, peer, TAG_REDUCE_UP, 1)?[0]);
        }
        for peer in (0..size).filter(|&p| p != ROOT_RANK) {
            send_words(comm, peer, TAG_REDUCE_DOWN, &[acc]);
        }
        Ok(acc)
    } else {
        send_words(comm, ROOT_RANK, TAG_REDUCE_UP, &[value]);
        Ok(recv_words(comm, ROOT_RANK, TAG_REDUCE_DOWN, 1)?[0])
    }
}

fn allgather_via_root<C>(comm: &C, local: &[u64]) -> Result<Vec<Vec<u64>>, MeshError>
where
    C: Communicator + ?Sized,
{
    let size = comm.size();
    if size <= 1 {
        return Ok(vec![local.to_vec()]);
    }
    if comm.rank() == ROOT_RANK {
        let mut pieces = vec![Vec::new(); size];
        pieces[ROOT_RANK] = local.to_vec();
        for peer in (0..size).filter(|&p| p != ROOT_RANK) {
            let len = recv_words(comm, peer, TAG_GATHER_LEN, 1)?[0] as usize;
            pieces[peer] = recv_words(comm, peer, TAG_GATHER_DATA, len)?;
        }
        // [len_0, data_0..., len_1, data_1..., ...]
        let mut flat = Vec::with_capacity(size + pieces.iter().map(Vec::len).sum::<usize>());
        for piece in &pieces {
            flat.push(piece.len() as u64);
            flat.extend_from_slice(piece);
        }
        for peer in (0..size).filter(|&p| p != ROOT_RANK) {
            send_words(comm, peer, TAG_BCAST_LEN, &[flat.len() as u64]);
            send_words(comm, peer, TAG_BCAST_DATA, &flat);
        }
        Ok(pieces)
    } else {
        send_words(comm, ROOT_RANK, TAG_GATHER_LEN, &[local.len() as u64]);
        send_words(comm, ROOT_RANK, TAG_GATHER_DATA, local);
        let len = recv_words(comm, ROOT_RANK, TAG_BCAST_LEN, 1)?[0] as usize;
        let flat = recv_words(comm, ROOT_RANK, TAG_BCAST_DATA, len)?;
        let mut pieces = Vec::with_capacity(size);
        let mut cursor = 0usize;
        while cursor < flat.len() {
            let n = flat[cursor] as usize;
            let end = cursor + 1 + n;
            if end > flat.len() {
                return Err(MeshError::Communication("truncated allgather payload".into()));
            }
            pieces.push(flat[cursor + 1..end].to_vec());
            cursor = end;
        }
        if pieces.len() != size {
            return Err(MeshError::Communication(format!(
                "allgather returned {} pieces for {size} ranks",
                pieces.len()
            )));
        }
        Ok(pieces)
    }
}

/// Compile-time no-op comm for pure serial runs and unit tests.
#[derive(Clone, Debug, Default)]
pub struct NoComm;

impl Wait for () {
    fn wait(self) -> Option<Vec<u8>> {
        None
    }
}

impl Communicator for NoComm {
    type SendHandle = ();
    type RecvHandle = ();

    fn rank(&self) -> usize {
        0
    }
    fn size(&self) -> usize {
        1
    }
    fn isend(&self, _peer: usize, _tag: u16, _buf: &[u8]) {}
    fn irecv(&self, _peer: usize, _tag: u16, _buf: &mut [u8]) {}
}

// --- RayonComm: intra-process / multi-thread ---
type Key = (usize, usize, u16); // (src, dst, tag)

static MAILBOX: Lazy<DashMap<Key, Bytes>> = Lazy::new(DashMap::new);

pub struct LocalHandle {
    buf: Arc<Mutex<Option<Vec<u8>>>>,
    handle: Option<JoinHandle<()>>,
}

impl Wait for LocalHandle {
    fn wait(mut self) -> Option<Vec<u8>> {
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
        self.buf.lock().take()
    }
}

/// In-process ranks exchanging messages through a shared mailbox.
///
/// Each simulated rank runs on its own thread with its own `RayonComm`.
/// The mailbox is process-global, so tests using it must not overlap.
#[derive(Clone, Debug)]
pub struct RayonComm {
    rank: usize,
    size: usize,
}

impl RayonComm {
    pub fn new(rank: usize, size: usize) -> Self {
        Self { rank, size }
    }
}

impl Communicator for RayonComm {
    type SendHandle = ();
    type RecvHandle = LocalHandle;

    fn rank(&self) -> usize {
        self.rank
    }
    fn size(&self) -> usize {
        self.size
    }

    fn isend(&self, peer: usize, tag: u16, buf: &[u8]) -> Self::SendHandle {
        let key = (self.rank, peer, tag);
        MAILBOX.insert(key, Bytes::copy_from_slice(buf));
    }

    fn irecv(&self, peer: usize, tag: u16, buf: &mut [u8]) -> Self::RecvHandle {
        let key = (peer, self.rank, tag);
        let buf_arc = Arc::new(Mutex::new(None));
        let buf_arc_clone = buf_arc.clone();
        let buf_len = buf.len();
        let handle = std::thread::spawn(move || {
            loop {
                if let Some((_, bytes)) = MAILBOX.remove(&key) {
                    let n = buf_len.min(bytes.len());
                    *buf_arc_clone.lock() = Some(bytes[..n].to_vec());
                    break;
                }
                std::thread::yield_now();
            }
        });
        LocalHandle {
            buf: buf_arc,
            handle: Some(handle),
        }
    }
}

// --- MPI backend (feature = "mpi-support") ---
#[cfg(feature = "mpi-support")]
mod mpi_backend {
    use super::*;
    use mpi::collective::SystemOperation;
    use mpi::environment::Universe;
    use mpi::topology::SimpleCommunicator;
    use mpi::traits::*;

    /// MPI world communicator. Point-to-point calls complete before returning.
    pub struct MpiComm {
        pub world: SimpleCommunicator,
        pub rank: usize,
        _universe: Universe,
    }

    impl MpiComm {
        /// Initialises MPI; fails if it was already initialised.
        pub fn new() -> Result<Self, MeshError> {
            let universe = mpi::initialize()
                .ok_or_else(|| MeshError::Communication("MPI is already initialised".into()))?;
            let world = universe.world();
            let rank = world.rank() as usize;
            Ok(Self {
                world,
                rank,
                _universe: universe,
            })
        }
    }

    pub struct MpiHandle(Option<Vec<u8>>);

    impl Wait for MpiHandle {
        fn wait(self) -> Option<Vec<u8>> {
            self.0
        }
    }

    impl Communicator for MpiComm {
        type SendHandle = MpiHandle;
        type RecvHandle = MpiHandle;

        fn rank(&self) -> usize {
            self.rank
        }
        fn size(&self) -> usize {
            self.world.size() as usize
        }

        fn isend(&self, peer: usize, tag: u16, buf: &[u8]) -> MpiHandle {
            self.world
                .process_at_rank(peer as i32)
                .send_with_tag(buf, i32::from(tag));
            MpiHandle(None)
        }

        fn irecv(&self, peer: usize, tag: u16, _buf: &mut [u8]) -> MpiHandle {
            let (data, _status) = self
                .world
                .process_at_rank(peer as i32)
                .receive_vec_with_tag::<u8>(i32::from(tag));
            MpiHandle(Some(data))
        }

        fn allreduce_max(&self, value: u64) -> Result<u64, MeshError> {
            let mut out = 0u64;
            self.world
                .all_reduce_into(&value, &mut out, SystemOperation::max());
            Ok(out)
        }

        fn allreduce_sum(&self, value: u64) -> Result<u64, MeshError> {
            let mut out = 0u64;
            self.world
                .all_reduce_into(&value, &mut out, SystemOperation::sum());
            Ok(out)
        }

        fn barrier(&self) -> Result<(), MeshError> {
            self.world.barrier();
            Ok(())
        }
    }
}

#[cfg(feature = "mpi-support")]
pub use mpi_backend::MpiComm;

/// Runs `body` once per simulated rank on its own thread and collects the
/// results in rank order. Used to exercise collective code paths in-process.
pub fn run_on_local_ranks<T, F>(size: usize, body: F) -> Vec<T>
where
    T: Send + 'static,
    F: Fn(RayonComm) -> T + Send + Sync + 'static,
{
    let body = Arc::new(body);
    let handles: Vec<_> = (0..size)
        .map(|rank| {
            let body = Arc::clone(&body);
            std::thread::spawn(move || body(RayonComm::new(rank, size)))
        })
        .collect();
    handles
        .into_iter()
        .map(|h| match h.join() {
            Ok(value) => value,
            Err(panic) => std::panic::resume_unwind(panic),
        })
        .collect()
}

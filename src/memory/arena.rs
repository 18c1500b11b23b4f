//! Backing arena
//!
//! One zeroed, fixed-size allocation carved into equal chunks. Chunks are handed
//! to `ArenaClient`s, which sub-allocate inside them. Everything stored in the
//! arena refers to everything else by byte offset from the base, so the region
//! `[0, high_water_mark)` can be uploaded to the GPU as-is.

use super::arena_client::ArenaClient;
use super::error::{MemoryError, MemoryResult};
use crate::constants::memory::{
    ARENA_ALIGNMENT, DEFAULT_ARENA_SIZE, DEFAULT_CHUNK_SIZE, LARGE_CLASS_MAX, MAX_ARENA_SIZE,
};
use crate::error::{EngineError, EngineResult};
use parking_lot::{Mutex, RwLock};
use rustc_hash::FxHashSet;
use serde::Deserialize;
use std::alloc::{self, Layout};
use std::collections::VecDeque;
use std::ptr::NonNull;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Arena sizing, deserialized from the `[arena]` table
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ArenaConfig {
    /// Total reserved bytes, never resized
    pub max_size: usize,
    /// Bytes per chunk handed to clients
    pub chunk_size: usize,
    /// Keep a per-client ledger of live allocations to catch size mismatches
    pub track_allocations: bool,
}

impl Default for ArenaConfig {
    fn default() -> Self {
        Self {
            max_size: DEFAULT_ARENA_SIZE,
            chunk_size: DEFAULT_CHUNK_SIZE,
            track_allocations: cfg!(debug_assertions),
        }
    }
}

impl ArenaConfig {
    pub fn validate(&self) -> EngineResult<()> {
        if self.max_size == 0 {
            return Err(EngineError::invalid_config(
                "arena.max_size",
                self.max_size,
                "cannot be 0",
            ));
        }
        if self.max_size > MAX_ARENA_SIZE {
            return Err(EngineError::invalid_config(
                "arena.max_size",
                self.max_size,
                format!(
                    "exceeds {} bytes addressable by a 30-bit node header",
                    MAX_ARENA_SIZE
                ),
            ));
        }
        if self.chunk_size < LARGE_CLASS_MAX {
            return Err(EngineError::invalid_config(
                "arena.chunk_size",
                self.chunk_size,
                format!("must hold the largest size class ({} bytes)", LARGE_CLASS_MAX),
            ));
        }
        if self.chunk_size > self.max_size {
            return Err(EngineError::invalid_config(
                "arena.chunk_size",
                self.chunk_size,
                format!("larger than arena.max_size ({})", self.max_size),
            ));
        }
        Ok(())
    }
}

/// Chunk bookkeeping, guarded by one lock
#[derive(Debug, Default)]
struct ArenaState {
    /// Next never-used byte, also the high-water mark
    cursor: usize,
    /// Chunks ever bump-allocated
    allocated_chunks: usize,
    /// Released chunk indices, reused oldest first
    free_chunks: VecDeque<u32>,
    /// Same indices as `free_chunks`, for double-release checks
    free_set: FxHashSet<u32>,
}

pub struct Arena {
    base: NonNull<u8>,
    layout: Layout,
    chunk_size: usize,
    track_allocations: bool,
    state: Mutex<ArenaState>,
    /// Client writes hold it shared, snapshots hold it exclusive
    write_gate: RwLock<()>,
    used_bytes: AtomicUsize,
    client_count: AtomicUsize,
}

// SAFETY: the raw region is only written through `write_bytes`/`copy_bytes`,
// whose callers guarantee exclusive ownership of the target chunk. Chunk
// bookkeeping is behind `state`, and whole-buffer reads take `write_gate`
// exclusively, so no reader observes a concurrent write.
unsafe impl Send for Arena {}
unsafe impl Sync for Arena {}

impl Arena {
    pub fn new(config: &ArenaConfig) -> EngineResult<Arc<Self>> {
        config.validate()?;

        let layout = Layout::from_size_align(config.max_size, ARENA_ALIGNMENT).map_err(|e| {
            MemoryError::AllocationFailed {
                size: config.max_size,
                reason: e.to_string(),
            }
        })?;
        // SAFETY: layout has a non-zero size, checked by validate()
        let raw = unsafe { alloc::alloc_zeroed(layout) };
        let base = NonNull::new(raw).ok_or_else(|| MemoryError::AllocationFailed {
            size: config.max_size,
            reason: "system allocator returned null".to_string(),
        })?;

        log::info!(
            "[Arena::new] Reserved {} MiB in {} byte chunks (allocation tracking: {})",
            config.max_size / (1024 * 1024),
            config.chunk_size,
            config.track_allocations
        );

        Ok(Arc::new(Self {
            base,
            layout,
            chunk_size: config.chunk_size,
            track_allocations: config.track_allocations,
            state: Mutex::new(ArenaState::default()),
            write_gate: RwLock::new(()),
            used_bytes: AtomicUsize::new(0),
            client_count: AtomicUsize::new(0),
        }))
    }

    /// Create a sub-allocator drawing chunks from this arena
    pub fn create_client(self: &Arc<Self>) -> ArenaClient {
        self.client_count.fetch_add(1, Ordering::Relaxed);
        ArenaClient::new(Arc::clone(self), self.track_allocations)
    }

    /// Hand out a chunk, reusing released ones first. Only clients call this:
    /// every chunk has exactly one owner until it is released.
    pub(crate) fn allocate_chunk(&self) -> MemoryResult<u32> {
        let mut state = self.state.lock();

        if let Some(chunk) = state.free_chunks.pop_front() {
            state.free_set.remove(&chunk);
            log::debug!("[Arena::allocate_chunk] Reusing chunk at {:#x}", chunk);
            return Ok(chunk);
        }

        if state.cursor + self.chunk_size > self.size() {
            return Err(MemoryError::OutOfMemory {
                requested: self.chunk_size,
                capacity: self.size(),
            });
        }

        let chunk = state.cursor as u32;
        state.cursor += self.chunk_size;
        state.allocated_chunks += 1;
        log::debug!(
            "[Arena::allocate_chunk] New chunk at {:#x} ({} allocated)",
            chunk,
            state.allocated_chunks
        );
        Ok(chunk)
    }

    /// Return a chunk for reuse. The backing allocation never shrinks.
    pub(crate) fn release_chunk(&self, chunk: u32) {
        let mut state = self.state.lock();
        let offset = chunk as usize;
        if offset % self.chunk_size != 0 || offset >= state.cursor {
            log::error!(
                "[Arena::release_chunk] {:#x} is not a chunk handed out by this arena",
                chunk
            );
            panic!("{}", MemoryError::ForeignIndex { index: chunk });
        }
        if !state.free_set.insert(chunk) {
            log::error!(
                "[Arena::release_chunk] Chunk {:#x} released twice",
                chunk
            );
            panic!("{}", MemoryError::DoubleFree { index: chunk });
        }
        state.free_chunks.push_back(chunk);
    }

    pub fn index_of(&self, ptr: *const u8) -> u32 {
        let offset = (ptr as usize).wrapping_sub(self.base.as_ptr() as usize);
        assert!(
            offset < self.size(),
            "pointer {:p} lies outside the arena",
            ptr
        );
        offset as u32
    }

    pub fn addr_of(&self, index: u32) -> *const u8 {
        self.base.as_ptr().wrapping_add(index as usize) as *const u8
    }

    /// Reserved bytes
    pub fn size(&self) -> usize {
        self.layout.size()
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Bytes claimed from the arena by bump allocation
    pub fn allocated(&self) -> usize {
        self.state.lock().allocated_chunks * self.chunk_size
    }

    /// Live bytes across every client
    pub fn used(&self) -> usize {
        self.used_bytes.load(Ordering::Relaxed)
    }

    pub fn high_water_mark(&self) -> usize {
        self.state.lock().cursor
    }

    /// Chunks currently owned by some client
    pub fn outstanding_chunks(&self) -> usize {
        let state = self.state.lock();
        state.allocated_chunks - state.free_chunks.len()
    }

    pub fn client_count(&self) -> usize {
        self.client_count.load(Ordering::Relaxed)
    }

    /// Copy `[0, high_water_mark)` once no client write is in flight
    pub fn snapshot(&self) -> Vec<u8> {
        let _exclusive = self.write_gate.write();
        let len = self.high_water_mark();
        // SAFETY: `len` never exceeds the reserved size and the exclusive gate
        // keeps every client write out for the duration of the copy.
        unsafe { std::slice::from_raw_parts(self.base.as_ptr(), len).to_vec() }
    }

    pub(crate) fn note_allocated(&self, bytes: usize) {
        self.used_bytes.fetch_add(bytes, Ordering::Relaxed);
    }

    pub(crate) fn note_freed(&self, bytes: usize) {
        self.used_bytes.fetch_sub(bytes, Ordering::Relaxed);
    }

    pub(crate) fn note_client_dropped(&self) {
        self.client_count.fetch_sub(1, Ordering::Relaxed);
    }

    /// # Safety
    /// `[index, index + out.len())` must lie in a chunk owned by the caller.
    pub(crate) unsafe fn read_bytes(&self, index: u32, out: &mut [u8]) {
        debug_assert!(index as usize + out.len() <= self.size());
        let _shared = self.write_gate.read();
        std::ptr::copy_nonoverlapping(
            self.base.as_ptr().add(index as usize),
            out.as_mut_ptr(),
            out.len(),
        );
    }

    /// # Safety
    /// `[index, index + bytes.len())` must lie in a chunk exclusively owned by
    /// the caller.
    pub(crate) unsafe fn write_bytes(&self, index: u32, bytes: &[u8]) {
        debug_assert!(index as usize + bytes.len() <= self.size());
        let _shared = self.write_gate.read();
        std::ptr::copy_nonoverlapping(
            bytes.as_ptr(),
            self.base.as_ptr().add(index as usize),
            bytes.len(),
        );
    }

    /// # Safety
    /// Both ranges must lie in chunks exclusively owned by the caller.
    pub(crate) unsafe fn copy_bytes(&self, src: u32, dst: u32, len: usize) {
        debug_assert!(src as usize + len <= self.size());
        debug_assert!(dst as usize + len <= self.size());
        let _shared = self.write_gate.read();
        std::ptr::copy(
            self.base.as_ptr().add(src as usize),
            self.base.as_ptr().add(dst as usize),
            len,
        );
    }
}

impl Drop for Arena {
    fn drop(&mut self) {
        log::debug!(
            "[Arena::drop] Releasing {} bytes ({} high-water)",
            self.size(),
            self.state.get_mut().cursor
        );
        // SAFETY: allocated in `new` with this exact layout
        unsafe { alloc::dealloc(self.base.as_ptr(), self.layout) };
    }
}

impl std::fmt::Debug for Arena {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Arena")
            .field("size", &self.size())
            .field("chunk_size", &self.chunk_size)
            .field("allocated", &self.allocated())
            .field("used", &self.used())
            .field("clients", &self.client_count())
            .finish()
    }
}

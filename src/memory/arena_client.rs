//! Arena client - per-owner size-class sub-allocator
//!
//! Each size class keeps its own current chunk, bump cursor and FIFO hole list.
//! Freed blocks only ever go back to their own class; chunks go back to the
//! arena when the client is released or dropped.

use super::arena::Arena;
use super::error::{MemoryError, MemoryResult};
use super::size_class::SizeClasses;
use bytemuck::Pod;
use rustc_hash::{FxHashMap, FxHashSet};
use std::collections::VecDeque;
use std::sync::Arc;

/// Per-size-class state
#[derive(Debug, Default)]
struct SubPool {
    current_chunk: Option<u32>,
    next_offset: usize,
    holes: VecDeque<u32>,
    chunks: Vec<u32>,
    /// Live bytes in this class
    allocated: usize,
}

pub struct ArenaClient {
    arena: Arc<Arena>,
    classes: SizeClasses,
    pools: Vec<SubPool>,
    /// Chunk ordinals (`index / chunk_size`) this client may touch
    owned_chunks: FxHashSet<u32>,
    /// index -> size of every live allocation, when tracking is on
    ledger: Option<FxHashMap<u32, usize>>,
    used: usize,
}

impl ArenaClient {
    pub(crate) fn new(arena: Arc<Arena>, track_allocations: bool) -> Self {
        let classes = SizeClasses::for_nodes();
        let pools = (0..classes.count()).map(|_| SubPool::default()).collect();
        Self {
            arena,
            classes,
            pools,
            owned_chunks: FxHashSet::default(),
            ledger: track_allocations.then(FxHashMap::default),
            used: 0,
        }
    }

    /// Allocate `size` bytes. Exhaustion and unsupported sizes are fatal.
    pub fn allocate(&mut self, size: usize) -> u32 {
        match self.try_allocate(size) {
            Ok(index) => index,
            Err(e) => {
                log::error!("[ArenaClient::allocate] {} byte allocation failed: {}", size, e);
                panic!("arena allocation failed: {}", e);
            }
        }
    }

    pub fn try_allocate(&mut self, size: usize) -> MemoryResult<u32> {
        let class = self
            .classes
            .class_of(size)
            .ok_or(MemoryError::InvalidSizeClass { size })?;
        let chunk_size = self.arena.chunk_size();
        let pool = &mut self.pools[class];

        let index = match pool.holes.pop_front() {
            Some(hole) => hole,
            None => {
                let chunk = match pool.current_chunk {
                    Some(chunk) if pool.next_offset + size <= chunk_size => chunk,
                    _ => {
                        let chunk = self.arena.allocate_chunk()?;
                        pool.current_chunk = Some(chunk);
                        pool.next_offset = 0;
                        pool.chunks.push(chunk);
                        self.owned_chunks.insert(chunk / chunk_size as u32);
                        chunk
                    }
                };
                let index = chunk + pool.next_offset as u32;
                pool.next_offset += size;
                index
            }
        };

        pool.allocated += size;
        self.used += size;
        self.arena.note_allocated(size);
        if let Some(ledger) = self.ledger.as_mut() {
            ledger.insert(index, size);
        }
        Ok(index)
    }

    /// Free a block. `size` must match the allocation exactly.
    pub fn deallocate(&mut self, index: u32, size: usize) {
        if let Err(e) = self.try_deallocate(index, size) {
            log::error!(
                "[ArenaClient::deallocate] Freeing {} bytes at {:#x} failed: {}",
                size,
                index,
                e
            );
            panic!("arena deallocation failed: {}", e);
        }
    }

    pub fn try_deallocate(&mut self, index: u32, size: usize) -> MemoryResult<()> {
        let class = self
            .classes
            .class_of(size)
            .ok_or(MemoryError::InvalidSizeClass { size })?;
        self.check_owned(index, size)?;

        if let Some(ledger) = self.ledger.as_mut() {
            match ledger.remove(&index) {
                Some(recorded) if recorded == size => {}
                Some(recorded) => {
                    ledger.insert(index, recorded);
                    return Err(MemoryError::SizeMismatch {
                        index,
                        expected: recorded,
                        found: size,
                    });
                }
                None => return Err(MemoryError::DoubleFree { index }),
            }
        }

        let pool = &mut self.pools[class];
        pool.allocated -= size;
        pool.holes.push_back(index);
        self.used -= size;
        self.arena.note_freed(size);
        Ok(())
    }

    pub fn to_index(&self, ptr: *const u8) -> u32 {
        self.arena.index_of(ptr)
    }

    pub fn to_pointer(&self, index: u32) -> *const u8 {
        self.arena.addr_of(index)
    }

    /// Live bytes held by this client
    pub fn used_memory(&self) -> usize {
        debug_assert_eq!(self.used, self.pools.iter().map(|p| p.allocated).sum::<usize>());
        self.used
    }

    /// Bytes of arena chunks held by this client
    pub fn allocated(&self) -> usize {
        self.owned_chunk_count() * self.arena.chunk_size()
    }

    pub fn owned_chunk_count(&self) -> usize {
        self.owned_chunks.len()
    }

    /// Size recorded for a live allocation, when tracking is on
    pub fn allocation_size(&self, index: u32) -> Option<usize> {
        self.ledger.as_ref()?.get(&index).copied()
    }

    pub fn tracks_allocations(&self) -> bool {
        self.ledger.is_some()
    }

    pub fn arena(&self) -> &Arc<Arena> {
        &self.arena
    }

    pub fn read<T: Pod>(&self, index: u32) -> T {
        let mut value = T::zeroed();
        self.read_slice(index, std::slice::from_mut(&mut value));
        value
    }

    pub fn read_slice<T: Pod>(&self, index: u32, out: &mut [T]) {
        let bytes: &mut [u8] = bytemuck::cast_slice_mut(out);
        self.expect_owned(index, bytes.len());
        // SAFETY: the range lies inside a chunk owned by this client
        unsafe { self.arena.read_bytes(index, bytes) };
    }

    pub fn write<T: Pod>(&mut self, index: u32, value: &T) {
        self.write_slice(index, std::slice::from_ref(value));
    }

    pub fn write_slice<T: Pod>(&mut self, index: u32, values: &[T]) {
        let bytes: &[u8] = bytemuck::cast_slice(values);
        self.expect_owned(index, bytes.len());
        // SAFETY: the range lies inside a chunk owned by this client, and
        // `&mut self` rules out any other access through this client
        unsafe { self.arena.write_bytes(index, bytes) };
    }

    /// Copy `len` bytes between two blocks owned by this client
    pub fn copy(&mut self, src: u32, dst: u32, len: usize) {
        if len == 0 {
            return;
        }
        self.expect_owned(src, len);
        self.expect_owned(dst, len);
        // SAFETY: both ranges lie inside chunks owned by this client
        unsafe { self.arena.copy_bytes(src, dst, len) };
    }

    /// Return every chunk to the arena. Returns how many were released.
    pub fn release(mut self) -> usize {
        self.release_chunks()
    }

    fn release_chunks(&mut self) -> usize {
        let mut released = 0;
        for pool in &mut self.pools {
            for chunk in pool.chunks.drain(..) {
                self.arena.release_chunk(chunk);
                released += 1;
            }
            pool.holes.clear();
            pool.current_chunk = None;
            pool.next_offset = 0;
            pool.allocated = 0;
        }
        self.arena.note_freed(self.used);
        self.used = 0;
        self.owned_chunks.clear();
        if let Some(ledger) = self.ledger.as_mut() {
            ledger.clear();
        }
        released
    }

    fn check_owned(&self, index: u32, len: usize) -> MemoryResult<()> {
        let chunk_size = self.arena.chunk_size();
        let first = index as usize / chunk_size;
        let last = (index as usize + len.max(1) - 1) / chunk_size;
        if first != last || !self.owned_chunks.contains(&(first as u32)) {
            return Err(MemoryError::ForeignIndex { index });
        }
        Ok(())
    }

    fn expect_owned(&self, index: u32, len: usize) {
        if let Err(e) = self.check_owned(index, len) {
            log::error!(
                "[ArenaClient] Access of {} bytes at {:#x} rejected: {}",
                len,
                index,
                e
            );
            panic!("arena access violation: {}", e);
        }
    }
}

impl Drop for ArenaClient {
    fn drop(&mut self) {
        let released = self.release_chunks();
        if released > 0 {
            log::debug!("[ArenaClient::drop] Returned {} chunks to the arena", released);
        }
        self.arena.note_client_dropped();
    }
}

impl std::fmt::Debug for ArenaClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ArenaClient")
            .field("used", &self.used)
            .field("owned_chunks", &self.owned_chunks.len())
            .field("tracking", &self.ledger.is_some())
            .finish()
    }
}

//! Size-class table for the arena client
//!
//! Every byte size up to `small_max` gets its own class, then every multiple of
//! `stride` above it up to `large_max`. With the node defaults that is sizes
//! 1..=64 plus 72, 84, ..., 768: 123 classes.

use crate::constants::layout::NODE_SIZE;
use crate::constants::memory::{LARGE_CLASS_MAX, SMALL_CLASS_MAX};

/// Class identifier, dense in `0..SizeClasses::count()`
pub type SizeClassId = usize;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SizeClasses {
    small_max: usize,
    stride: usize,
    large_max: usize,
}

impl SizeClasses {
    pub const fn new(small_max: usize, stride: usize, large_max: usize) -> Self {
        Self {
            small_max,
            stride,
            large_max,
        }
    }

    /// Byte classes up to 64 and node-array classes up to a full 64-child array
    pub const fn for_nodes() -> Self {
        Self::new(SMALL_CLASS_MAX, NODE_SIZE, LARGE_CLASS_MAX)
    }

    pub fn count(&self) -> usize {
        self.small_max + self.large_max / self.stride - self.small_max / self.stride
    }

    /// Largest size any class serves
    pub fn max_size(&self) -> usize {
        self.large_max
    }

    pub fn class_of(&self, size: usize) -> Option<SizeClassId> {
        if size == 0 {
            return None;
        }
        if size <= self.small_max {
            return Some(size - 1);
        }
        if size > self.large_max || size % self.stride != 0 {
            return None;
        }
        Some(self.small_max + size / self.stride - self.small_max / self.stride - 1)
    }

    pub fn size_of(&self, class: SizeClassId) -> usize {
        if class < self.small_max {
            class + 1
        } else {
            (class - self.small_max + 1 + self.small_max / self.stride) * self.stride
        }
    }
}

impl Default for SizeClasses {
    fn default() -> Self {
        Self::for_nodes()
    }
}

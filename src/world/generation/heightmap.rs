//! Dense 2-D height grid, one `i32` per voxel column

use rayon::prelude::*;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeightMap {
    width: u32,
    heights: Vec<i32>,
}

impl HeightMap {
    pub fn new(width: u32) -> Self {
        Self {
            width,
            heights: vec![0; (width * width) as usize],
        }
    }

    /// Fill every column from `height(x, y)`, rows in parallel
    pub fn from_fn<F>(width: u32, height: F) -> Self
    where
        F: Fn(u32, u32) -> i32 + Sync,
    {
        let mut heights = vec![0; (width * width) as usize];
        heights
            .par_chunks_mut(width.max(1) as usize)
            .enumerate()
            .for_each(|(y, row)| {
                for (x, h) in row.iter_mut().enumerate() {
                    *h = height(x as u32, y as u32);
                }
            });
        Self { width, heights }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    fn index(&self, x: u32, y: u32) -> usize {
        assert!(
            x < self.width && y < self.width,
            "heightmap coordinate ({}, {}) outside a {} wide map",
            x,
            y,
            self.width
        );
        (x + y * self.width) as usize
    }

    pub fn get(&self, x: u32, y: u32) -> i32 {
        self.heights[self.index(x, y)]
    }

    pub fn set(&mut self, x: u32, y: u32, height: i32) {
        let index = self.index(x, y);
        self.heights[index] = height;
    }

    /// Lowest and highest column in the `size` x `size` cell at `(x, y)`
    pub fn cell_bounds(&self, x: u32, y: u32, size: u32) -> (i32, i32) {
        let mut min = i32::MAX;
        let mut max = i32::MIN;
        for dy in 0..size {
            for dx in 0..size {
                let h = self.get(x + dx, y + dy);
                min = min.min(h);
                max = max.max(h);
            }
        }
        (min, max)
    }
}

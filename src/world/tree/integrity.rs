//! Structural integrity walk over a built region

use super::node::NodeKind;
use super::view::{check_depth, encoding_mismatch, NodeSource};
use crate::constants::layout::{NODE_SIZE, VOXEL_SIZE};

/// Result of walking every node reachable from a root
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TreeIntegrityReport {
    pub nodes: usize,
    pub internal_nodes: usize,
    pub terminal_nodes: usize,
    pub lod_nodes: usize,
    /// Populated voxels under terminal and LOD nodes
    pub voxels: usize,
    pub violations: Vec<String>,
}

impl TreeIntegrityReport {
    pub fn is_valid(&self) -> bool {
        self.violations.is_empty()
    }
}

/// Check every node against its depth, and every packed array against the
/// size it was allocated with when the source keeps an allocation ledger.
pub fn validate_tree<S: NodeSource + ?Sized>(
    source: &S,
    root: u32,
    depth: u32,
) -> TreeIntegrityReport {
    let mut report = TreeIntegrityReport::default();
    if let Err(e) = check_depth(depth) {
        report.violations.push(e.to_string());
        return report;
    }
    let mut stack = vec![(root, 0u32)];

    while let Some((index, level)) = stack.pop() {
        let node = source.read_node(index);
        report.nodes += 1;

        let kind = match node.kind() {
            Ok(kind) => kind,
            Err(e) => {
                report.violations.push(format!("{:#x}: {}", index, e));
                continue;
            }
        };

        let at_leaf = level + 1 == depth;
        let count = node.count();
        match kind {
            NodeKind::Internal { children } if !at_leaf => {
                report.internal_nodes += 1;
                if count > 0 {
                    check_array(source, children, count * NODE_SIZE, &mut report);
                    for i in 0..count {
                        stack.push((children + (i * NODE_SIZE) as u32, level + 1));
                    }
                }
            }
            NodeKind::Terminal { voxels } if at_leaf => {
                report.terminal_nodes += 1;
                report.voxels += count;
                if count > 0 {
                    check_array(source, voxels, count * VOXEL_SIZE, &mut report);
                }
            }
            NodeKind::Lod { .. } if at_leaf => {
                report.lod_nodes += 1;
                report.voxels += count;
            }
            _ => {
                let e = encoding_mismatch(index, level, at_leaf, kind);
                report.violations.push(e.to_string());
            }
        }
    }

    if !report.is_valid() {
        log::warn!(
            "[validate_tree] {} violations in {} nodes",
            report.violations.len(),
            report.nodes
        );
    }
    report
}

fn check_array<S: NodeSource + ?Sized>(
    source: &S,
    index: u32,
    expected: usize,
    report: &mut TreeIntegrityReport,
) {
    if !source.tracks_allocations() {
        return;
    }
    match source.allocation_size(index) {
        Some(size) if size == expected => {}
        Some(size) => report.violations.push(format!(
            "{:#x}: packed array holds {} bytes, bitmap needs {}",
            index, size, expected
        )),
        None => report
            .violations
            .push(format!("{:#x}: packed array is not a live allocation", index)),
    }
}

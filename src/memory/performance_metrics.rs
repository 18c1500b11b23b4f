//! Memory diagnostics for the debug overlay

use super::Arena;

const MIB: f64 = 1024.0 * 1024.0;

/// Point-in-time arena usage. Not load-bearing for correctness.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemoryStats {
    /// Reserved bytes
    pub size: usize,
    /// Bytes claimed from the arena as chunks
    pub allocated: usize,
    /// Live bytes across clients, excluding holes and unused chunk tails
    pub used: usize,
    pub clients: usize,
}

impl MemoryStats {
    pub fn capture(arena: &Arena) -> Self {
        Self {
            size: arena.size(),
            allocated: arena.allocated(),
            used: arena.used(),
            clients: arena.client_count(),
        }
    }

    pub fn allocated_mib(&self) -> f64 {
        self.allocated as f64 / MIB
    }

    pub fn used_mib(&self) -> f64 {
        self.used as f64 / MIB
    }

    /// Share of claimed chunk memory that is live
    pub fn utilization(&self) -> f64 {
        if self.allocated == 0 {
            0.0
        } else {
            self.used as f64 / self.allocated as f64
        }
    }
}

impl std::fmt::Display for MemoryStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Memory-pool allocation: {:.2} MiB, usage: {:.2} MiB ({} clients)",
            self.allocated_mib(),
            self.used_mib(),
            self.clients
        )
    }
}

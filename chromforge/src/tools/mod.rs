//! Analysis tools built on the core data structures: genome partitioning,
//! dynamic-bin compression, peak calling and dosage correction.

pub mod compress;
pub mod dosage;
pub mod partition;
pub mod peaks;

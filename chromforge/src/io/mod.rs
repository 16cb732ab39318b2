//! File input and output: sparse coverage parsing and dense materialization,
//! region-list readers, chromosome-keyed stores and track export.

pub mod coverage;
pub mod export;
pub mod loci;
pub mod store;

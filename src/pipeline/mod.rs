// Pipeline stages: each loads its inputs from the database, runs the
// CPU-bound work off the async runtime, and writes its outputs back.

pub mod annotate;
pub mod cluster_annotate;
pub mod fingerprint;

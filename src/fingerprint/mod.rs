// Section fingerprints: vector math, mean fingerprints, k-means clusters.

pub mod builder;
pub mod kmeans;
pub mod vector;

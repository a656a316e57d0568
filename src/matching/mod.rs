// Candidate matching: single-centroid and clustered strategies.

pub mod clusters;
pub mod sections;
pub mod snippet;

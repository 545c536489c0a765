// Domain layer - Pure models and algorithms, no I/O
pub mod compliance;
pub mod geometry;
pub mod patrol;

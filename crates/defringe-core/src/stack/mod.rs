pub mod median;
pub mod sampling;

pub mod atomic;
pub mod fits;
pub mod folder;
pub mod region;

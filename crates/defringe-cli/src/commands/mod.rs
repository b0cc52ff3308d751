pub mod config;
pub mod info;
pub mod model;
pub mod remove;

pub mod consts;
pub mod error;
pub mod frame;
pub mod io;
pub mod orientation;
pub mod stack;
pub mod model;
pub mod ratio;
pub mod remove;
pub mod setup;
pub mod pipeline;

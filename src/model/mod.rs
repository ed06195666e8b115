pub mod branch;
pub mod common;
pub mod maintenance;
pub mod vehicle;

pub use branch::*;
pub use common::*;
pub use maintenance::*;
pub use vehicle::*;

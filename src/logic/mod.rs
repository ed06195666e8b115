pub mod cost;
pub mod integrity;
pub mod links;
pub mod listing;
pub mod pagination;

pub use cost::*;
pub use integrity::*;
pub use links::*;
pub use listing::*;
pub use pagination::*;

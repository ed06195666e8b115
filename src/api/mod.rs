pub mod extractors;
pub mod handlers;
pub mod routes;

pub use extractors::*;
pub use handlers::*;
pub use routes::*;

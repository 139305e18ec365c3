mod constructors;
pub mod entities;
pub mod handlers;
pub(crate) mod repositories;
pub mod routes;
pub(crate) mod utils;

pub use constructors::*;

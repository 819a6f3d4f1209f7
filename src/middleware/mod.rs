// Middleware shared by the routers

pub mod cors;

pub use cors::*;

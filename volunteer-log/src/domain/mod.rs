mod error;
pub mod models;
pub mod ports;
mod screen;
pub mod services;

pub use error::*;
pub use screen::*;

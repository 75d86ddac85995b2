//! Build descriptor loading and schema definitions

mod loader;
mod schema;

pub use loader::Config;
pub use schema::*;

pub mod handler;
pub mod model;

pub use handler::{generate, list_tokens, logout};

//! Session engine: the read and write relay loops over one hub connection.

pub mod engine;

pub use engine::Session;

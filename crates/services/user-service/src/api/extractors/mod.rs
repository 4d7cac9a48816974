//! Custom Axum extractors that reject with [`common::AppError`] bodies.

mod json_body;
mod uuid_path;

pub use json_body::JsonBody;
pub use uuid_path::UuidPath;

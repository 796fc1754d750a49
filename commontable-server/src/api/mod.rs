pub mod admin;
pub mod auth;
pub mod cycles;
pub mod error;
pub mod groups;
pub mod posts;
pub mod profile;

pub use error::{ApiError, ApiResult};

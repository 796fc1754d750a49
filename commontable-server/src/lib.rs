// Library exports for commontable-server
// This allows other crates in the workspace to use commontable-server modules

pub mod api;
pub mod config;
pub mod db;
pub mod lifecycle;
pub mod rate_limit;
pub mod session;
pub mod state;
pub mod validation;

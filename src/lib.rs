// Library exports for rollcall
// Integration tests drive the router and API client through these modules

pub mod api;
pub mod attendance;
pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod extractors;
pub mod routes;
pub mod state;
pub mod stats;

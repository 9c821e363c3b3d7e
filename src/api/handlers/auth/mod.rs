//! Authentication endpoints, one module per route.

pub mod callback;
pub mod config;
pub mod dual;
pub mod token;
pub mod verify_key;
pub mod verify_token;

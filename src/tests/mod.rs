pub mod common;

mod config_validation;
mod server_api;

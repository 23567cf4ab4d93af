pub mod fetch;
pub mod oauth2;
pub mod rate_limit;

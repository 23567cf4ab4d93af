pub mod flatten;
pub mod jwt;
pub mod schema;

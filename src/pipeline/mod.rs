pub mod filter;
pub mod resolver;

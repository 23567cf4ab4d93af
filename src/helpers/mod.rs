pub mod email;
pub mod time;

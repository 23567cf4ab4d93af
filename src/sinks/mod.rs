pub mod export;
pub mod snapshot_file;

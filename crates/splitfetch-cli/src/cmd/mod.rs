pub mod check;
pub mod config_dir;
pub mod fetch;

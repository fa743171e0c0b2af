pub mod cache;
pub mod config;
pub mod fs;
pub mod fuse;
pub mod remote;
pub mod render;

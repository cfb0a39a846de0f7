pub mod cache;
pub mod config;
pub mod events;
pub mod hierarchy;
pub mod render;
pub mod rename;
pub mod sequence;
pub mod storage;

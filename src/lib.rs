pub mod cache;
pub mod colombia;
pub mod config;
pub mod error;
pub mod filter;
pub mod getter;
pub mod join;
pub mod map;
pub mod records;
pub mod region;
pub mod region_key;
pub mod server;
pub mod state;
pub mod summary;

pub use enrollment;

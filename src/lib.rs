pub mod config;
pub mod content;
pub mod domain;
pub mod srs;

pub mod error;
pub mod fileloader;
pub mod metadata;

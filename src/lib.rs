pub mod athletes;
pub mod config;
pub mod fetch;
pub mod output;
pub mod regatta;
pub mod scoring;

pub mod config;
pub mod fetch;
pub mod parse;
pub mod pipeline;
pub mod powerflow;
pub mod render;
pub mod tabs;

pub mod body;
pub mod cli;
pub mod config;
pub mod control;
pub mod core;
pub mod trial;

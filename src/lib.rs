pub mod cli;
pub mod client;
pub mod config;
pub mod credential;
pub mod display;
pub mod error;
pub mod job;
pub mod models;
pub mod overlay;
pub mod poll;
pub mod report;
pub mod result;
pub mod session;
pub mod util;

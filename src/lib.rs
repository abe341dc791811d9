pub mod bot;
pub mod commands;
pub mod config;
pub mod error;
pub mod keyword_reply;
pub mod matcher;
pub mod registry;
pub mod retraction;

pub use bot::run;

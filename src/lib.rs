pub mod config;
pub mod error;
pub mod fetch;
pub mod forecast;
pub mod history;
pub mod infra;
pub mod output;
pub mod parser;
pub mod pipeline;
pub mod resolver;
pub mod services;
pub mod stats;

pub mod app;
pub mod citation;
pub mod config;
pub mod domain;
pub mod error;
pub mod http;
pub mod input;
pub mod output;
pub mod providers;
pub mod resolver;
pub mod tui;
pub mod xml;

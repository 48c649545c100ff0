pub mod logging;
pub mod run_config;
pub mod settings;

pub mod catalog;
pub mod checksum;
pub mod cleaner;
pub mod control;
pub mod download;
pub mod http;
pub mod pipeline;
pub mod url_model;

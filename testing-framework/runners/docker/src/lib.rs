mod command;
mod config;
mod environment;

pub use config::{DockerConfig, resolve_image};
pub use environment::DockerEnvironment;

pub mod config;
pub mod homework;
pub mod sink;

pub use config::{ConfigError, Credentials, WatcherConfig};
pub use sink::{MessageSink, SinkError};

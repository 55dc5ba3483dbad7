pub mod agent;
pub mod browser;
pub mod config;
pub mod processor;
pub mod storage;

pub use agent::WebAgent;
pub use browser::BrowserTrait;
pub use config::{
    BrowserConfig, Config, DataProcessorConfig, DriverConfig, LoggingConfig, StorageConfig,
    Viewport,
};
pub use processor::DataProcessor;
pub use storage::Storage;

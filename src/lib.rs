pub mod actions;
pub mod browser;
pub mod core;
pub mod data;
pub mod dom;
pub mod errors;
pub mod logging;
pub mod pipeline;
pub mod processor;
pub mod storage;
pub mod testing;
pub mod types;

pub use actions::{CoreAction, PayloadRef, Selector, WebAgentAction};
pub use browser::{BrowserWebAgent, Driver};
pub use crate::core::{BrowserTrait, Config, DataProcessor, Storage, WebAgent};
pub use data::{Data, IdData, Record};
pub use dom::{Element, ElementSequence};
pub use errors::{AgentError, Result};
pub use pipeline::Core;
pub use processor::SubprocessDataProcessor;
pub use storage::LocalFileStorage;
pub use types::*;

#[cfg(feature = "chrome")]
pub use browser::ChromeBrowser;
#[cfg(feature = "chrome")]
pub use pipeline::build_core;

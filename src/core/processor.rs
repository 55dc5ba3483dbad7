use crate::actions::DataProcessorAction;
use crate::data::Data;
use crate::errors::Result;
use async_trait::async_trait;

/// Turns a payload into a new value by running user code.
#[async_trait]
pub trait DataProcessor: Send + Sync {
    async fn run(&self, action: &DataProcessorAction, payload: Data) -> Result<Data>;
}

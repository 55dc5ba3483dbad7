use crate::actions::{CoreAction, PayloadRef, StorageCoreAction};
use crate::core::{DataProcessor, Storage, WebAgent};
use crate::data::{Data, IdData};
use crate::errors::{AgentError, Result};
use futures::FutureExt;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::pin::Pin;
use tracing::{debug, warn};

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T>> + Send + 'a>>;

/// Dispatches [`CoreAction`]s and threads a single memory slot between them.
///
/// `GenerateId` and `DataProcessor` actions overwrite memory; web actions
/// never touch it; storage and processor actions read it through
/// [`PayloadRef::Memory`]. Reading memory before the first write fails with
/// [`AgentError::MemoryNotSet`].
pub struct Core<W, S, P> {
    web_agent: W,
    storage: S,
    processor: P,
    memory: Option<Data>,
}

impl<W, S, P> Core<W, S, P>
where
    W: WebAgent,
    S: Storage,
    P: DataProcessor,
{
    pub fn new(web_agent: W, storage: S, processor: P) -> Self {
        Self {
            web_agent,
            storage,
            processor,
            memory: None,
        }
    }

    pub fn web_agent(&self) -> &W {
        &self.web_agent
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    pub fn processor(&self) -> &P {
        &self.processor
    }

    pub fn get_memory(&self) -> Result<&Data> {
        self.memory.as_ref().ok_or(AgentError::MemoryNotSet)
    }

    pub fn set_memory(&mut self, data: Data) {
        self.memory = Some(data);
    }

    pub async fn start(&mut self) -> Result<()> {
        self.web_agent.start().await
    }

    pub async fn stop(&mut self) -> Result<()> {
        self.web_agent.stop().await
    }

    /// Run `body` inside a started web agent session.
    ///
    /// Once `start` succeeds, `stop` runs exactly once whatever `body`
    /// returns, and also when it panics (the panic then resumes). An error
    /// from `body` wins over an error from `stop`.
    pub async fn scoped<T, F>(&mut self, body: F) -> Result<T>
    where
        F: for<'a> FnOnce(&'a mut Self) -> BoxFuture<'a, T>,
    {
        self.start().await?;
        let outcome = AssertUnwindSafe(body(&mut *self)).catch_unwind().await;
        let stopped = self.stop().await;

        let result = match outcome {
            Ok(result) => result,
            Err(panic) => {
                if let Err(stop_error) = &stopped {
                    warn!("stopping the web agent after a panic failed: {}", stop_error);
                }
                std::panic::resume_unwind(panic);
            }
        };

        match (result, stopped) {
            (Ok(value), Ok(())) => Ok(value),
            (Ok(_), Err(stop_error)) => Err(stop_error),
            (Err(error), Ok(())) => Err(error),
            (Err(error), Err(stop_error)) => {
                warn!("stopping the web agent also failed: {}", stop_error);
                Err(error)
            }
        }
    }

    pub fn perform<'a>(&'a mut self, action: &'a CoreAction) -> BoxFuture<'a, ()> {
        Box::pin(async move {
            debug!("performing {} ({})", action.name(), action.meta().id);
            match action {
                CoreAction::GenerateId(_) => {
                    self.memory = Some(Data::Id(IdData::generate()));
                }
                CoreAction::WebAgent(a) => {
                    self.web_agent.perform(&a.action).await?;
                }
                CoreAction::DataProcessor(a) => {
                    let payload = self.resolve_payload(&a.payload).await?;
                    let result = self.processor.run(&a.action, payload).await?;
                    self.memory = Some(result);
                }
                CoreAction::Storage(a) => {
                    self.perform_storage(a).await?;
                }
                CoreAction::Sequential(a) => {
                    for child in &a.actions {
                        self.perform(child).await?;
                    }
                }
            }
            Ok(())
        })
    }

    async fn perform_storage(&self, action: &StorageCoreAction) -> Result<()> {
        let Some(payload) = &action.payload else {
            return self.storage.perform(&action.action, None).await;
        };

        let value = self.resolve_payload(payload).await?;
        if payload.is_expanded() {
            let items = value.into_items()?;
            debug!("saving {} expanded item(s)", items.len());
            for item in &items {
                self.storage.perform(&action.action, Some(item)).await?;
            }
            Ok(())
        } else {
            self.storage.perform(&action.action, Some(&value)).await
        }
    }

    async fn resolve_payload(&self, payload: &PayloadRef) -> Result<Data> {
        match payload {
            PayloadRef::Memory { attribute, expand } => {
                let memory = self.get_memory()?;
                let value = match attribute {
                    Some(name) => memory.attribute(name)?,
                    None => memory.clone(),
                };
                if *expand == Some(true) {
                    Ok(Data::List(value.into_items()?))
                } else {
                    Ok(value)
                }
            }
            PayloadRef::SelectedElement => Ok(Data::Element(
                self.web_agent.get_selected_element().await?,
            )),
            PayloadRef::SelectedElements => Ok(Data::Elements(
                self.web_agent.get_selected_elements().await?,
            )),
        }
    }
}

#[cfg(feature = "chrome")]
pub type ChromeCore = Core<
    crate::browser::BrowserWebAgent<crate::browser::ChromeBrowser>,
    crate::storage::LocalFileStorage,
    crate::processor::SubprocessDataProcessor,
>;

/// Chrome web agent, local file storage and the subprocess transform runner,
/// wired from `config`.
#[cfg(feature = "chrome")]
pub fn build_core(config: &crate::core::Config) -> ChromeCore {
    Core::new(
        crate::browser::BrowserWebAgent::new(crate::browser::ChromeBrowser::new(), config.clone()),
        crate::storage::from_config(&config.storage),
        crate::processor::SubprocessDataProcessor::from_config(&config.data_processor),
    )
}

use crate::actions::WebAgentAction;
use crate::dom::{Element, ElementSequence};
use crate::errors::Result;
use async_trait::async_trait;
use url::Url;

/// What the pipeline sees of the browser side.
///
/// `start` and `stop` bracket a session; [`crate::pipeline::Core::scoped`]
/// guarantees one `stop` per `start`.
#[async_trait]
pub trait WebAgent: Send + Sync {
    async fn start(&mut self) -> Result<()>;

    async fn stop(&mut self) -> Result<()>;

    async fn perform(&mut self, action: &WebAgentAction) -> Result<()>;

    async fn get_selected_element(&self) -> Result<Element>;

    async fn get_selected_elements(&self) -> Result<ElementSequence>;

    async fn open(&mut self, url: &Url) -> Result<()> {
        self.perform(&WebAgentAction::open_url(url.clone())).await
    }
}

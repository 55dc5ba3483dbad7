use crate::actions::WebAgentAction;
use crate::browser::driver::Driver;
use crate::core::{BrowserTrait, Config, WebAgent};
use crate::dom::{Element, ElementSequence};
use crate::errors::Result;
use async_trait::async_trait;
use tracing::debug;

/// [`WebAgent`] backed by a [`Driver`] over any [`BrowserTrait`].
pub struct BrowserWebAgent<B: BrowserTrait> {
    driver: Driver<B>,
}

impl<B: BrowserTrait> BrowserWebAgent<B> {
    pub fn new(browser: B, config: Config) -> Self {
        Self {
            driver: Driver::new(browser, config),
        }
    }

    pub fn driver(&self) -> &Driver<B> {
        &self.driver
    }
}

#[async_trait]
impl<B: BrowserTrait> WebAgent for BrowserWebAgent<B> {
    async fn start(&mut self) -> Result<()> {
        self.driver.start().await
    }

    async fn stop(&mut self) -> Result<()> {
        self.driver.stop().await
    }

    async fn perform(&mut self, action: &WebAgentAction) -> Result<()> {
        debug!("web agent action: {}", action.name());
        self.driver.perform(action).await
    }

    async fn get_selected_element(&self) -> Result<Element> {
        self.driver.get_selected_element().await
    }

    async fn get_selected_elements(&self) -> Result<ElementSequence> {
        self.driver.get_selected_elements().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actions::Selector;
    use crate::testing::{fixture_site, FIXTURE_INDEX};
    use url::Url;

    #[tokio::test]
    async fn test_agent_drives_fixture_site() {
        let mut agent = BrowserWebAgent::new(fixture_site(), Config::default());
        agent.start().await.unwrap();
        agent.open(&Url::parse(FIXTURE_INDEX).unwrap()).await.unwrap();
        agent
            .perform(&WebAgentAction::set_selector(
                Selector::xpath("//ul[@class='pagination']//a").unwrap(),
            ))
            .await
            .unwrap();

        let link = agent.get_selected_element().await.unwrap();
        assert_eq!(link.tag_name(), "a");
        assert_eq!(link.text(), "next page");

        agent
            .perform(&WebAgentAction::click_selected_element())
            .await
            .unwrap();
        assert!(agent.driver().browser().current_url().ends_with("index1.html"));

        agent.stop().await.unwrap();
        assert_eq!(agent.driver().browser().close_count(), 1);
    }
}

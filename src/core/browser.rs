use crate::core::Config;
use crate::errors::Result;
use crate::types::Rectangle;
use async_trait::async_trait;

/// The narrow slice of a live browser the driver needs.
///
/// Path queries are evaluated by the browser itself. Elements cross this
/// seam as `(xpath, index)`: the `index`-th element the browser matches for
/// `xpath`, counting element nodes only.
#[async_trait]
pub trait BrowserTrait: Send + Sync {
    type TabHandle: Send + Sync;

    /// Launch a new browser instance
    async fn launch(&mut self, config: &Config) -> Result<()>;

    /// Create a new tab/page
    async fn new_tab(&self) -> Result<Self::TabHandle>;

    /// Navigate to a URL and wait for the load to finish
    async fn navigate(&self, tab: &Self::TabHandle, url: &str) -> Result<()>;

    /// Serialized `document.documentElement` as currently rendered
    async fn page_source(&self, tab: &Self::TabHandle) -> Result<String>;

    /// Get current URL
    async fn get_url(&self, tab: &Self::TabHandle) -> Result<String>;

    /// Outer HTML of every element matching `xpath`, in document order.
    /// An expression the browser rejects is `InvalidSelector`.
    async fn find_by_xpath(&self, tab: &Self::TabHandle, xpath: &str) -> Result<Vec<String>>;

    /// Click the `index`-th match of `xpath` and wait for any navigation it triggers
    async fn click(&self, tab: &Self::TabHandle, xpath: &str, index: usize) -> Result<()>;

    /// PNG screenshot and bounding box of the `index`-th match of `xpath`
    async fn capture_element(
        &self,
        tab: &Self::TabHandle,
        xpath: &str,
        index: usize,
    ) -> Result<(Vec<u8>, Rectangle)>;

    /// Check if browser is still running
    fn is_running(&self) -> bool;

    /// Close the browser
    async fn close(&mut self) -> Result<()>;
}

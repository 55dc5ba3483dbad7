use crate::actions::{Selector, WebAgentAction};
use crate::core::{BrowserTrait, Config};
use crate::dom::{absolute_xpath, find_minimal_enclosing, outer_html, Document};
use crate::dom::{Element, ElementSequence};
use crate::errors::{AgentError, Result};
use tracing::{debug, info, warn};
use url::Url;

/// Owns one browser tab and the current selector.
///
/// The selector is the only selection state: every read re-runs it against
/// the page as it is at that moment, so reads after a click or navigation see
/// the new document.
pub struct Driver<B: BrowserTrait> {
    browser: B,
    config: Config,
    tab: Option<B::TabHandle>,
    selector: Option<Selector>,
}

/// A matched element: its markup and how the browser can find it again.
struct ResolvedNode {
    html_source: String,
    xpath: String,
    index: usize,
}

impl<B: BrowserTrait> Driver<B> {
    pub fn new(browser: B, config: Config) -> Self {
        Self {
            browser,
            config,
            tab: None,
            selector: None,
        }
    }

    pub fn browser(&self) -> &B {
        &self.browser
    }

    pub async fn start(&mut self) -> Result<()> {
        self.browser.launch(&self.config).await?;
        match self.browser.new_tab().await {
            Ok(tab) => self.tab = Some(tab),
            Err(e) => {
                // a launched browser without a tab is closed before reporting
                if let Err(close_error) = self.browser.close().await {
                    warn!("closing the browser after a failed start: {}", close_error);
                }
                return Err(e);
            }
        }
        info!("browser session started");
        Ok(())
    }

    pub async fn stop(&mut self) -> Result<()> {
        self.tab = None;
        self.browser.close().await?;
        info!("browser session stopped");
        Ok(())
    }

    fn tab(&self) -> Result<&B::TabHandle> {
        self.tab.as_ref().ok_or(AgentError::NoActiveTab)
    }

    pub async fn open(&mut self, url: &Url) -> Result<()> {
        info!("opening {}", url);
        let tab = self.tab()?;
        self.browser.navigate(tab, url.as_str()).await
    }

    pub fn set_selector(&mut self, selector: Selector) {
        debug!("selector set: {}", selector.describe());
        self.selector = Some(selector);
    }

    pub fn selector(&self) -> Option<&Selector> {
        self.selector.as_ref()
    }

    pub async fn perform(&mut self, action: &WebAgentAction) -> Result<()> {
        debug!("driver action: {}", action.name());
        match action {
            WebAgentAction::OpenUrl(a) => self.open(&a.url).await,
            WebAgentAction::SetSelector(a) => {
                self.set_selector(a.selector.clone());
                Ok(())
            }
            WebAgentAction::ClickSelectedElement(_) => self.click_selected().await,
        }
    }

    pub async fn get_selected_element(&self) -> Result<Element> {
        let (url, nodes) = self.resolve(false).await?;
        let node = nodes
            .into_iter()
            .next()
            .ok_or_else(|| AgentError::NoElementFound(self.describe_selector()))?;
        self.build_element(&url, node).await
    }

    pub async fn get_selected_elements(&self) -> Result<ElementSequence> {
        let (url, nodes) = self.resolve(true).await?;
        let mut elements = Vec::with_capacity(nodes.len());
        for node in nodes {
            elements.push(self.build_element(&url, node).await?);
        }
        Ok(ElementSequence::new(elements))
    }

    pub async fn click_selected(&self) -> Result<()> {
        let (_, nodes) = self.resolve(false).await?;
        let node = nodes
            .into_iter()
            .next()
            .ok_or_else(|| AgentError::NoElementFound(self.describe_selector()))?;
        info!("clicking {} [{}]", node.xpath, node.index);
        self.browser.click(self.tab()?, &node.xpath, node.index).await
    }

    fn describe_selector(&self) -> String {
        self.selector
            .as_ref()
            .map(Selector::describe)
            .unwrap_or_default()
    }

    /// Run the current selector against the page as it is now.
    async fn resolve(&self, plural: bool) -> Result<(Url, Vec<ResolvedNode>)> {
        let selector = self.selector.as_ref().ok_or(AgentError::NoElementSelected)?;
        let tab = self.tab()?;

        let raw_url = self.browser.get_url(tab).await?;
        let url = Url::parse(&raw_url)
            .map_err(|e| AgentError::NavigationFailed(format!("{}: {}", raw_url, e)))?;

        let nodes = match selector {
            Selector::XPath(s) => {
                let mut sources = self.browser.find_by_xpath(tab, s.xpath.as_str()).await?;
                if sources.is_empty() {
                    return Err(AgentError::NoElementFound(selector.describe()));
                }
                if !plural {
                    sources.truncate(1);
                }
                sources
                    .into_iter()
                    .enumerate()
                    .map(|(index, html_source)| ResolvedNode {
                        html_source,
                        xpath: s.xpath.to_string(),
                        index,
                    })
                    .collect()
            }
            Selector::EnclosingText(s) => {
                if plural {
                    return Err(AgentError::unsupported(
                        "reading multiple elements with an enclosing-text selector",
                    ));
                }
                let source = self.browser.page_source(tab).await?;
                let node = enclosing_node(&source, s.target_strings.as_slice())
                    .ok_or_else(|| AgentError::NoElementFound(selector.describe()))?;
                vec![node]
            }
            Selector::Rectangle(_) => {
                return Err(AgentError::unsupported("rectangle selectors"));
            }
        };

        debug!("{} matched {} node(s) on {}", selector.describe(), nodes.len(), url);
        Ok((url, nodes))
    }

    async fn build_element(&self, url: &Url, node: ResolvedNode) -> Result<Element> {
        let element = Element::new(url.clone(), node.html_source)?;
        if !self.config.driver.capture_screenshots {
            return Ok(element);
        }

        match self.browser.capture_element(self.tab()?, &node.xpath, node.index).await {
            Ok((screenshot, location)) => Ok(element.with_capture(screenshot, location)),
            Err(e) => {
                warn!("could not capture {}: {}", node.xpath, e);
                Ok(element)
            }
        }
    }
}

/// Text search runs over a snapshot of the page; the hit goes back to the
/// browser as its positional path. The parsed document never crosses an
/// await point.
fn enclosing_node<S: AsRef<str>>(source: &str, targets: &[S]) -> Option<ResolvedNode> {
    let document = Document::parse(source);
    find_minimal_enclosing(document.root_element(), targets).map(|node| ResolvedNode {
        html_source: outer_html(node),
        xpath: absolute_xpath(node),
        index: 0,
    })
}

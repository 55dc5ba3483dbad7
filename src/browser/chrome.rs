use crate::core::{BrowserTrait, Config};
use crate::errors::{AgentError, Result};
use crate::types::Rectangle;
use async_trait::async_trait;
use headless_chrome::protocol::cdp::Page::{CaptureScreenshotFormatOption, Viewport};
use headless_chrome::{Browser, LaunchOptions, Tab};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use std::ffi::OsStr;
use std::sync::Arc;
use tracing::debug;

/// `(path, index, mode)`: evaluates `path` with `document.evaluate` and
/// returns the matches' markup, clicks one, or measures one.
const QUERY_SCRIPT: &str = include_str!("query.js");

#[derive(Deserialize)]
#[serde(rename_all = "lowercase")]
enum QueryOutcome<T> {
    Ok(T),
    Invalid(String),
    Missing,
}

/// Chrome browser implementation
pub struct ChromeBrowser {
    browser: Option<Browser>,
}

impl ChromeBrowser {
    pub fn new() -> Self {
        Self { browser: None }
    }
}

impl Default for ChromeBrowser {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BrowserTrait for ChromeBrowser {
    type TabHandle = Arc<Tab>;

    async fn launch(&mut self, config: &Config) -> Result<()> {
        let window_size_arg = format!(
            "--window-size={},{}",
            config.browser.viewport.width, config.browser.viewport.height
        );

        let user_agent_arg = config
            .browser
            .user_agent
            .as_ref()
            .map(|ua| format!("--user-agent={}", ua));

        let mut args = vec![
            OsStr::new("--no-sandbox"),
            OsStr::new("--disable-dev-shm-usage"),
            OsStr::new(&window_size_arg),
        ];

        if let Some(ref ua_arg) = user_agent_arg {
            args.push(OsStr::new(ua_arg));
        }

        if config.browser.disable_images {
            args.push(OsStr::new("--blink-settings=imagesEnabled=false"));
        }

        for arg in &config.browser.args {
            args.push(OsStr::new(arg));
        }

        let launch_options = LaunchOptions::default_builder()
            .headless(config.browser.headless)
            .args(args)
            .build()
            .map_err(|e| AgentError::LaunchFailed(e.to_string()))?;

        let browser =
            Browser::new(launch_options).map_err(|e| AgentError::LaunchFailed(e.to_string()))?;

        debug!("chrome launched (headless: {})", config.browser.headless);
        self.browser = Some(browser);
        Ok(())
    }

    async fn new_tab(&self) -> Result<Self::TabHandle> {
        let browser = self
            .browser
            .as_ref()
            .ok_or(AgentError::BrowserNotLaunched)?;

        browser
            .new_tab()
            .map_err(|e| AgentError::ChromeError(e.to_string()))
    }

    async fn navigate(&self, tab: &Self::TabHandle, url: &str) -> Result<()> {
        tab.navigate_to(url)
            .map_err(|e| AgentError::NavigationFailed(format!("{}: {}", url, e)))?;

        tab.wait_until_navigated()
            .map_err(|e| AgentError::NavigationFailed(format!("{}: {}", url, e)))?;

        Ok(())
    }

    async fn page_source(&self, tab: &Self::TabHandle) -> Result<String> {
        let result = tab
            .evaluate("document.documentElement.outerHTML", false)
            .map_err(|e| AgentError::JavaScriptFailed(e.to_string()))?;

        match result.value {
            Some(Value::String(html)) => Ok(html),
            other => Err(AgentError::JavaScriptFailed(format!(
                "unexpected page source result: {:?}",
                other
            ))),
        }
    }

    async fn get_url(&self, tab: &Self::TabHandle) -> Result<String> {
        Ok(tab.get_url())
    }

    async fn find_by_xpath(&self, tab: &Self::TabHandle, xpath: &str) -> Result<Vec<String>> {
        run_query(tab, xpath, 0, "html")
    }

    async fn click(&self, tab: &Self::TabHandle, xpath: &str, index: usize) -> Result<()> {
        run_query::<()>(tab, xpath, index, "click")
            .map_err(|e| AgentError::ClickFailed(format!("{} [{}]: {}", xpath, index, e)))?;

        tab.wait_until_navigated()
            .map_err(|e| AgentError::NavigationFailed(e.to_string()))?;

        Ok(())
    }

    async fn capture_element(
        &self,
        tab: &Self::TabHandle,
        xpath: &str,
        index: usize,
    ) -> Result<(Vec<u8>, Rectangle)> {
        let location: Rectangle = run_query(tab, xpath, index, "measure")
            .map_err(|e| AgentError::ScreenshotFailed(format!("{} [{}]: {}", xpath, index, e)))?;

        let clip = Viewport {
            x: location.x,
            y: location.y,
            width: location.width,
            height: location.height,
            scale: 1.0,
        };
        let screenshot = tab
            .capture_screenshot(CaptureScreenshotFormatOption::Png, None, Some(clip), true)
            .map_err(|e| AgentError::ScreenshotFailed(e.to_string()))?;

        Ok((screenshot, location))
    }

    fn is_running(&self) -> bool {
        self.browser.is_some()
    }

    async fn close(&mut self) -> Result<()> {
        self.browser = None;
        Ok(())
    }
}

fn run_query<T: DeserializeOwned>(tab: &Tab, xpath: &str, index: usize, mode: &str) -> Result<T> {
    let script = format!(
        "({})({}, {}, {})",
        QUERY_SCRIPT,
        serde_json::to_string(xpath)?,
        index,
        serde_json::to_string(mode)?
    );

    let result = tab
        .evaluate(&script, false)
        .map_err(|e| AgentError::JavaScriptFailed(e.to_string()))?;

    let outcome = match result.value {
        Some(Value::String(json)) => serde_json::from_str::<QueryOutcome<T>>(&json)?,
        other => {
            return Err(AgentError::JavaScriptFailed(format!(
                "unexpected query result: {:?}",
                other
            )))
        }
    };

    match outcome {
        QueryOutcome::Ok(value) => Ok(value),
        QueryOutcome::Invalid(message) => {
            Err(AgentError::InvalidSelector(format!("{}: {}", xpath, message)))
        }
        QueryOutcome::Missing => Err(AgentError::NoElementFound(format!("{} [{}]", xpath, index))),
    }
}

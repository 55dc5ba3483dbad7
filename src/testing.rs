//! An in-memory browser over fixture pages, for exercising the driver and
//! pipeline without launching Chrome. Path queries run through the crate's
//! own XPath evaluator in place of the browser's.

use crate::core::{BrowserTrait, Config};
use crate::dom::{outer_html, xpath, Document};
use crate::errors::{AgentError, Result};
use crate::types::Rectangle;
use async_trait::async_trait;
use scraper::ElementRef;
use std::collections::HashMap;
use std::sync::Mutex;
use url::Url;

pub const FIXTURE_INDEX: &str = "http://fixture.test/index.html";
pub const FIXTURE_NEXT: &str = "http://fixture.test/index1.html";

const PNG_SIGNATURE: [u8; 8] = [0x89, b'P', b'N', b'G', 0x0d, 0x0a, 0x1a, 0x0a];

/// Serves registered pages by URL; clicking a link (or anything inside one)
/// navigates to its resolved `href`.
pub struct FixtureBrowser {
    pages: HashMap<String, String>,
    current: Mutex<Option<String>>,
    clicks: Mutex<Vec<(String, usize)>>,
    refuse_tabs: bool,
    running: bool,
    launch_count: usize,
    close_count: usize,
}

impl FixtureBrowser {
    pub fn new() -> Self {
        Self {
            pages: HashMap::new(),
            current: Mutex::new(None),
            clicks: Mutex::new(Vec::new()),
            refuse_tabs: false,
            running: false,
            launch_count: 0,
            close_count: 0,
        }
    }

    pub fn with_page(mut self, url: &str, html: impl Into<String>) -> Self {
        self.pages.insert(url.to_string(), html.into());
        self
    }

    /// Launches fine but fails every `new_tab`.
    pub fn refusing_tabs(mut self) -> Self {
        self.refuse_tabs = true;
        self
    }

    pub fn current_url(&self) -> String {
        self.current
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
            .unwrap_or_else(|| "about:blank".to_string())
    }

    /// Every `(xpath, index)` clicked so far.
    pub fn clicks(&self) -> Vec<(String, usize)> {
        self.clicks
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    pub fn launch_count(&self) -> usize {
        self.launch_count
    }

    pub fn close_count(&self) -> usize {
        self.close_count
    }

    fn set_current(&self, url: &str) {
        *self
            .current
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = Some(url.to_string());
    }
}

impl Default for FixtureBrowser {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BrowserTrait for FixtureBrowser {
    type TabHandle = ();

    async fn launch(&mut self, _config: &Config) -> Result<()> {
        self.running = true;
        self.launch_count += 1;
        Ok(())
    }

    async fn new_tab(&self) -> Result<Self::TabHandle> {
        if !self.running {
            return Err(AgentError::BrowserNotLaunched);
        }
        if self.refuse_tabs {
            return Err(AgentError::ChromeError("tab creation refused".to_string()));
        }
        Ok(())
    }

    async fn navigate(&self, _tab: &Self::TabHandle, url: &str) -> Result<()> {
        if !self.pages.contains_key(url) {
            return Err(AgentError::NavigationFailed(format!(
                "{}: no such fixture page",
                url
            )));
        }
        self.set_current(url);
        Ok(())
    }

    async fn page_source(&self, _tab: &Self::TabHandle) -> Result<String> {
        let url = self.current_url();
        self.pages
            .get(&url)
            .cloned()
            .ok_or_else(|| AgentError::NavigationFailed(format!("{}: nothing loaded", url)))
    }

    async fn get_url(&self, _tab: &Self::TabHandle) -> Result<String> {
        Ok(self.current_url())
    }

    async fn find_by_xpath(&self, tab: &Self::TabHandle, xpath: &str) -> Result<Vec<String>> {
        let source = self.page_source(tab).await?;
        let document = Document::parse(&source);
        Ok(xpath::evaluate(&document, xpath)?
            .into_iter()
            .map(outer_html)
            .collect())
    }

    async fn click(&self, tab: &Self::TabHandle, xpath: &str, index: usize) -> Result<()> {
        let source = self.page_source(tab).await?;
        let href = link_target(&source, xpath, index)?;
        self.clicks
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push((xpath.to_string(), index));

        let Some(href) = href else {
            return Ok(());
        };
        let current = self.current_url();
        let target = Url::parse(&current)
            .and_then(|base| base.join(&href))
            .map_err(|e| AgentError::ClickFailed(format!("{}: {}", href, e)))?;
        self.navigate(tab, target.as_str()).await
    }

    async fn capture_element(
        &self,
        tab: &Self::TabHandle,
        xpath: &str,
        index: usize,
    ) -> Result<(Vec<u8>, Rectangle)> {
        let source = self.page_source(tab).await?;
        node_at(&source, xpath, index, |_| ())
            .map_err(|e| AgentError::ScreenshotFailed(e.to_string()))?;
        Ok((
            PNG_SIGNATURE.to_vec(),
            Rectangle {
                x: 0.0,
                y: 20.0 * index as f64,
                width: 100.0,
                height: 20.0,
            },
        ))
    }

    fn is_running(&self) -> bool {
        self.running
    }

    async fn close(&mut self) -> Result<()> {
        self.running = false;
        self.close_count += 1;
        Ok(())
    }
}

fn node_at<T>(
    source: &str,
    path: &str,
    index: usize,
    inspect: impl FnOnce(ElementRef<'_>) -> T,
) -> Result<T> {
    let document = Document::parse(source);
    let node = xpath::evaluate(&document, path)?
        .into_iter()
        .nth(index)
        .ok_or_else(|| AgentError::ClickFailed(format!("no match {} at {}", index, path)))?;
    Ok(inspect(node))
}

/// `href` of the match or of its closest enclosing link.
fn link_target(source: &str, path: &str, index: usize) -> Result<Option<String>> {
    node_at(source, path, index, |node| {
        std::iter::once(node)
            .chain(node.ancestors().filter_map(ElementRef::wrap))
            .find(|el| el.value().name() == "a")
            .and_then(|link| link.value().attr("href"))
            .map(str::to_string)
    })
}

struct Article {
    link: &'static str,
    title: &'static str,
    date: &'static str,
    description: &'static str,
}

const FIRST_PAGE: [Article; 3] = [
    Article {
        link: "articles/village.html",
        title: "title-A",
        date: "2024-03-31",
        description: "The village where the journey begins.",
    },
    Article {
        link: "articles/forest.html",
        title: "title-B",
        date: "2024-04-07",
        description: "Lost for two days in the northern forest.",
    },
    Article {
        link: "articles/gear.html",
        title: "title-C",
        date: "2024-04-14",
        description: "What to pack and what to leave behind.",
    },
];

const SECOND_PAGE: [Article; 3] = [
    Article {
        link: "articles/harbor.html",
        title: "title-D",
        date: "2024-04-21",
        description: "A week in the harbor town.",
    },
    Article {
        link: "articles/ruins.html",
        title: "title-E",
        date: "2024-04-28",
        description: "The ruins nobody could explain.",
    },
    Article {
        link: "articles/finale.html",
        title: "title-F",
        date: "2024-05-05",
        description: "The last climb.",
    },
];

fn listing_page(articles: &[Article], pagination: &str) -> String {
    let items: Vec<String> = articles
        .iter()
        .enumerate()
        .map(|(index, article)| {
            let class = if index == 0 {
                "list-item first-item"
            } else {
                "list-item"
            };
            format!(
                r#"      <li class="{}">
        <h2><a href="{}">{}</a></h2>
        <p>date: {}</p>
        <p class="description">{}</p>
      </li>"#,
                class, article.link, article.title, article.date, article.description
            )
        })
        .collect();

    format!(
        r#"<!DOCTYPE html>
<html lang="en">
  <head><meta charset="utf-8"><title>Travel Journal</title></head>
  <body>
    <header><h1>Travel Journal</h1></header>
    <ul class="article-list">
{}
    </ul>
    <ul class="pagination">
      {}
    </ul>
  </body>
</html>
"#,
        items.join("\n"),
        pagination
    )
}

pub fn index_page() -> String {
    listing_page(&FIRST_PAGE, r#"<li><a href="index1.html">next page</a></li>"#)
}

pub fn next_page() -> String {
    listing_page(&SECOND_PAGE, r#"<li><a href="index.html">previous page</a></li>"#)
}

/// Both listing pages, linked by their pagination.
pub fn fixture_site() -> FixtureBrowser {
    FixtureBrowser::new()
        .with_page(FIXTURE_INDEX, index_page())
        .with_page(FIXTURE_NEXT, next_page())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actions::{CoreAction, PayloadRef, Selector};
    use crate::browser::BrowserWebAgent;
    use crate::core::WebAgent;
    use crate::pipeline::Core;
    use crate::processor::SubprocessDataProcessor;
    use crate::storage::LocalFileStorage;
    use std::collections::BTreeSet;
    use std::path::Path;
    use tokio_test::{assert_err, assert_ok};

    type FixtureCore = Core<BrowserWebAgent<FixtureBrowser>, LocalFileStorage, SubprocessDataProcessor>;

    const ARTICLE_LIST_CODE: &str = r#"
import re
from dataclasses import dataclass


@dataclass
class Article:
    link: str
    title: str
    date: str
    description: str


@dataclass
class ArticleList:
    articles: list


def convert(payload):
    articles = []
    for element in payload.elements:
        html = element.html_source
        link, title = re.search(r'<a href="([^"]+)">([^<]+)</a>', html).groups()
        date = re.search(r'<p>date: ([^<]+)</p>', html).group(1)
        description = re.search(r'<p class="description">([^<]+)</p>', html).group(1)
        articles.append(Article(link=link, title=title, date=date, description=description))
    return ArticleList(articles=articles)
"#;

    fn fixture_core(storage_root: &Path) -> FixtureCore {
        Core::new(
            BrowserWebAgent::new(fixture_site(), Config::default()),
            LocalFileStorage::new(storage_root),
            SubprocessDataProcessor::new("python3"),
        )
    }

    fn python_available() -> bool {
        std::process::Command::new("python3")
            .arg("--version")
            .output()
            .map(|o| o.status.success())
            .unwrap_or(false)
    }

    async fn open_index(core: &mut FixtureCore) {
        core.start().await.unwrap();
        core.perform(&CoreAction::open_url(Url::parse(FIXTURE_INDEX).unwrap()))
            .await
            .unwrap();
    }

    fn list_items() -> CoreAction {
        CoreAction::set_selector(Selector::xpath("//li[contains(@class,'list-item')]").unwrap())
    }

    #[tokio::test]
    async fn test_fixture_navigation() {
        let mut browser = fixture_site();
        assert!(matches!(browser.new_tab().await, Err(AgentError::BrowserNotLaunched)));
        assert_ok!(browser.launch(&Config::default()).await);
        assert_ok!(browser.navigate(&(), FIXTURE_INDEX).await);
        assert!(assert_ok!(browser.page_source(&()).await).contains("title-A"));
        let missing = assert_err!(browser.navigate(&(), "http://fixture.test/missing.html").await);
        assert!(matches!(missing, AgentError::NavigationFailed(_)));
        assert_eq!(browser.current_url(), FIXTURE_INDEX);
        browser.close().await.unwrap();
        assert_eq!((browser.launch_count(), browser.close_count()), (1, 1));
        assert!(!browser.is_running());
    }

    #[tokio::test]
    async fn test_scenario_a_enclosing_text_finds_list_item() {
        let dir = tempfile::tempdir().unwrap();
        let mut core = fixture_core(dir.path());
        open_index(&mut core).await;

        core.perform(&CoreAction::set_selector(
            Selector::enclosing_text(&["title-A", "2024-03-31"]).unwrap(),
        ))
        .await
        .unwrap();
        let element = core.web_agent().get_selected_element().await.unwrap();

        assert_eq!(element.tag_name(), "li");
        assert!(element.classes().contains("list-item"));
        assert_eq!(element.url.as_str(), FIXTURE_INDEX);
        core.stop().await.unwrap();
    }

    #[tokio::test]
    async fn test_scenario_b_xpath_returns_items_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let mut core = fixture_core(dir.path());
        open_index(&mut core).await;

        core.perform(&list_items()).await.unwrap();
        let elements = core.web_agent().get_selected_elements().await.unwrap();

        assert_eq!(elements.len(), 3);
        for (element, title) in elements.iter().zip(["title-A", "title-B", "title-C"]) {
            assert_eq!(element.tag_name(), "li");
            assert!(element.classes().contains("list-item"));
            assert!(element.text().contains(title));
        }
        core.stop().await.unwrap();
    }

    #[tokio::test]
    async fn test_scenario_c_click_then_reselect() {
        let dir = tempfile::tempdir().unwrap();
        let mut core = fixture_core(dir.path());
        open_index(&mut core).await;

        core.perform(&list_items()).await.unwrap();
        let before = core.web_agent().get_selected_elements().await.unwrap();

        core.perform(&CoreAction::set_selector(
            Selector::xpath("//a[text()='next page']").unwrap(),
        ))
        .await
        .unwrap();
        core.perform(&CoreAction::click_selected_element()).await.unwrap();
        core.perform(&list_items()).await.unwrap();
        let after = core.web_agent().get_selected_elements().await.unwrap();

        assert_eq!(after.len(), 3);
        for (element, title) in after.iter().zip(["title-D", "title-E", "title-F"]) {
            assert!(element.text().contains(title));
            assert_eq!(element.url.as_str(), FIXTURE_NEXT);
        }
        let before_sources: BTreeSet<&str> = before.iter().map(|e| e.html_source.as_str()).collect();
        assert!(after
            .iter()
            .all(|e| !before_sources.contains(e.html_source.as_str())));
        core.stop().await.unwrap();
    }

    #[tokio::test]
    async fn test_scenario_d_transform_and_expand_save() {
        if !python_available() {
            eprintln!("python3 not found, skipping");
            return;
        }
        let dir = tempfile::tempdir().unwrap();
        let mut core = fixture_core(dir.path());

        let pipeline = CoreAction::sequential(vec![
            CoreAction::open_url(Url::parse(FIXTURE_INDEX).unwrap()),
            list_items(),
            CoreAction::python_code(ARTICLE_LIST_CODE, PayloadRef::SelectedElements),
            CoreAction::save_data(Some(PayloadRef::expand("articles"))),
        ]);
        core.scoped(|core| Box::pin(async move { core.perform(&pipeline).await }))
            .await
            .unwrap();
        assert_eq!(core.web_agent().driver().browser().close_count(), 1);

        let storage = core.storage();
        let ids = storage.list("Article").await.unwrap();
        assert_eq!(ids.len(), 3);

        let mut stored = BTreeSet::new();
        for id in &ids {
            let record = storage.load("Article", id).await.unwrap();
            assert_eq!(record["type_id"], "Article");
            assert_eq!(record["id"], id.as_str());
            stored.insert((
                record["link"].as_str().unwrap().to_string(),
                record["title"].as_str().unwrap().to_string(),
                record["date"].as_str().unwrap().to_string(),
                record["description"].as_str().unwrap().to_string(),
            ));
        }

        let expected: BTreeSet<_> = FIRST_PAGE
            .iter()
            .map(|a| {
                (
                    a.link.to_string(),
                    a.title.to_string(),
                    a.date.to_string(),
                    a.description.to_string(),
                )
            })
            .collect();
        assert_eq!(stored, expected);
        assert_eq!(core.get_memory().unwrap().type_id(), "ArticleList");
    }

    #[cfg(feature = "chrome")]
    #[tokio::test]
    #[ignore = "launches a local Chrome"]
    async fn test_scenario_a_in_chrome() {
        let dir = tempfile::tempdir().unwrap();
        let page = dir.path().join("index.html");
        std::fs::write(&page, index_page()).unwrap();

        let mut config = Config::default();
        config.storage = crate::core::StorageConfig::LocalFile {
            path: dir.path().join("data"),
        };
        let mut core = crate::pipeline::build_core(&config);
        let url = Url::from_file_path(&page).unwrap();

        let element = core
            .scoped(|core| {
                Box::pin(async move {
                    core.perform(&CoreAction::open_url(url)).await?;
                    core.perform(&CoreAction::set_selector(Selector::enclosing_text(&[
                        "title-A",
                        "2024-03-31",
                    ])?))
                    .await?;
                    core.web_agent().get_selected_element().await
                })
            })
            .await
            .unwrap();

        assert_eq!(element.tag_name(), "li");
        assert!(element.classes().contains("list-item"));
    }
}

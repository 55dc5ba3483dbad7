use crate::errors::{AgentError, Result};
use crate::types::{EntityMeta, NonEmptyString, Rectangle};
use serde::{Deserialize, Serialize};
use url::Url;

/// How the driver locates elements in the current document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Selector {
    #[serde(rename = "XPATH")]
    XPath(XPathSelector),
    #[serde(rename = "RECTANGLE")]
    Rectangle(RectangleSelector),
    #[serde(rename = "MINIMUM_ENCLOSING_ELEMENT_WITH_MULTIPLE_TEXTS")]
    EnclosingText(EnclosingTextSelector),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct XPathSelector {
    #[serde(flatten)]
    pub meta: EntityMeta,
    pub xpath: NonEmptyString,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RectangleSelector {
    #[serde(flatten)]
    pub meta: EntityMeta,
    pub rectangle: Rectangle,
}

/// Smallest element whose text contains every one of `target_strings`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnclosingTextSelector {
    #[serde(flatten)]
    pub meta: EntityMeta,
    pub target_strings: Vec<NonEmptyString>,
}

impl Selector {
    pub fn xpath(xpath: &str) -> Result<Self> {
        let xpath = NonEmptyString::new(xpath)
            .map_err(|_| AgentError::InvalidSelector("xpath must not be empty".to_string()))?;
        Ok(Selector::XPath(XPathSelector {
            meta: EntityMeta::new(),
            xpath,
        }))
    }

    pub fn rectangle(rectangle: Rectangle) -> Self {
        Selector::Rectangle(RectangleSelector {
            meta: EntityMeta::new(),
            rectangle,
        })
    }

    pub fn enclosing_text<S: AsRef<str>>(targets: &[S]) -> Result<Self> {
        let target_strings = targets
            .iter()
            .map(|t| NonEmptyString::new(t.as_ref()))
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|_| {
                AgentError::InvalidSelector("target strings must not be empty".to_string())
            })?;
        Ok(Selector::EnclosingText(EnclosingTextSelector {
            meta: EntityMeta::new(),
            target_strings,
        }))
    }

    pub fn describe(&self) -> String {
        match self {
            Selector::XPath(s) => format!("xpath {}", s.xpath),
            Selector::Rectangle(s) => format!(
                "rectangle ({}, {}, {}x{})",
                s.rectangle.x, s.rectangle.y, s.rectangle.width, s.rectangle.height
            ),
            Selector::EnclosingText(s) => format!(
                "enclosing text {:?}",
                s.target_strings.iter().map(|t| t.as_str()).collect::<Vec<_>>()
            ),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WebAgentAction {
    OpenUrl(OpenUrlAction),
    SetSelector(SetSelectorAction),
    ClickSelectedElement(ClickSelectedElementAction),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OpenUrlAction {
    #[serde(flatten)]
    pub meta: EntityMeta,
    pub url: Url,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SetSelectorAction {
    #[serde(flatten)]
    pub meta: EntityMeta,
    pub selector: Selector,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClickSelectedElementAction {
    #[serde(flatten)]
    pub meta: EntityMeta,
}

impl WebAgentAction {
    pub fn open_url(url: Url) -> Self {
        WebAgentAction::OpenUrl(OpenUrlAction {
            meta: EntityMeta::new(),
            url,
        })
    }

    pub fn set_selector(selector: Selector) -> Self {
        WebAgentAction::SetSelector(SetSelectorAction {
            meta: EntityMeta::new(),
            selector,
        })
    }

    pub fn click_selected_element() -> Self {
        WebAgentAction::ClickSelectedElement(ClickSelectedElementAction {
            meta: EntityMeta::new(),
        })
    }

    pub fn name(&self) -> &'static str {
        match self {
            WebAgentAction::OpenUrl(_) => "open_url",
            WebAgentAction::SetSelector(_) => "set_selector",
            WebAgentAction::ClickSelectedElement(_) => "click_selected_element",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_selector_wire_format() {
        let json = r#"{"type": "XPATH", "xpath": "//li[contains(@class, 'list-item')]"}"#;
        let selector: Selector = serde_json::from_str(json).unwrap();
        match selector {
            Selector::XPath(s) => assert_eq!(s.xpath.as_str(), "//li[contains(@class, 'list-item')]"),
            other => panic!("unexpected selector {:?}", other),
        }
    }

    #[test]
    fn test_enclosing_text_selector_rejects_empty_target() {
        assert!(Selector::enclosing_text(&["title-A", " "]).is_err());
        let json = r#"{"type": "MINIMUM_ENCLOSING_ELEMENT_WITH_MULTIPLE_TEXTS", "target_strings": [""]}"#;
        assert!(serde_json::from_str::<Selector>(json).is_err());
    }

    #[test]
    fn test_web_agent_action_wire_format() {
        let json = r#"{
            "type": "SET_SELECTOR",
            "id": "selector-1",
            "selector": {"type": "RECTANGLE", "rectangle": {"x": 0, "y": 0, "width": 10, "height": 10}}
        }"#;
        let action: WebAgentAction = serde_json::from_str(json).unwrap();
        match &action {
            WebAgentAction::SetSelector(a) => {
                assert_eq!(a.meta.id, "selector-1");
                assert!(matches!(a.selector, Selector::Rectangle(_)));
            }
            other => panic!("unexpected action {:?}", other),
        }
        assert_eq!(action.name(), "set_selector");
    }
}

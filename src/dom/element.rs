use crate::errors::{AgentError, Result};
use crate::types::{EntityMeta, NonEmptyString, Rectangle};
use crate::dom::document::text_of;
use regex::Regex;
use scraper::Html;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::BTreeSet;
use std::sync::OnceLock;
use url::Url;

/// A DOM node captured from the page: where it came from and its outer markup.
///
/// Values are immutable once built. `tag_name`, `classes` and `text` are
/// parsed from `html_source` on first use and cached; the cache takes no part
/// in equality or serialization.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Element {
    #[serde(flatten)]
    pub meta: EntityMeta,
    pub url: Url,
    pub html_source: NonEmptyString,
    #[serde(
        default,
        with = "png_base64",
        skip_serializing_if = "Option::is_none"
    )]
    pub screenshot: Option<Vec<u8>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<Rectangle>,
    #[serde(skip)]
    parsed: OnceLock<ParsedMarkup>,
}

#[derive(Debug, Clone, Default)]
struct ParsedMarkup {
    tag_name: String,
    classes: BTreeSet<String>,
    text: String,
}

fn start_tag_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r#"^\s*<([A-Za-z][A-Za-z0-9:-]*)((?:[^>"']|"[^"]*"|'[^']*')*)>"#)
            .expect("start tag pattern is a valid regex")
    })
}

fn class_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r#"(?i)(?:^|\s)class\s*=\s*(?:"([^"]*)"|'([^']*)'|([^\s"'>]+))"#)
            .expect("class pattern is a valid regex")
    })
}

impl ParsedMarkup {
    /// Tag and classes come from the leading start tag as written. The text
    /// comes from a parse in a context that keeps the element: table parts
    /// and document-level tags are dropped by a plain body fragment parse.
    fn from_source(source: &str) -> Self {
        let Some(start) = start_tag_pattern().captures(source) else {
            let fragment = Html::parse_fragment(source);
            return Self {
                text: text_of(fragment.root_element()),
                ..Self::default()
            };
        };

        let tag_name = start[1].to_ascii_lowercase();
        let classes = class_pattern()
            .captures(start.get(2).map_or("", |m| m.as_str()))
            .and_then(|c| c.get(1).or_else(|| c.get(2)).or_else(|| c.get(3)))
            .map(|m| m.as_str().split_whitespace().map(str::to_string).collect())
            .unwrap_or_default();

        let text = match tag_name.as_str() {
            "html" | "head" | "body" => text_of(Html::parse_document(source).root_element()),
            "tr" => fragment_text(&format!("<table><tbody>{}</tbody></table>", source)),
            "td" | "th" => fragment_text(&format!("<table><tbody><tr>{}</tr></tbody></table>", source)),
            "thead" | "tbody" | "tfoot" | "caption" | "colgroup" => {
                fragment_text(&format!("<table>{}</table>", source))
            }
            _ => fragment_text(source),
        };

        Self {
            tag_name,
            classes,
            text,
        }
    }
}

fn fragment_text(source: &str) -> String {
    text_of(Html::parse_fragment(source).root_element())
}

impl Element {
    pub const TYPE_ID: &'static str = "element";

    pub fn new(url: Url, html_source: impl Into<String>) -> Result<Self> {
        let html_source = NonEmptyString::new(html_source).map_err(|_| {
            AgentError::InvalidSelector(format!("element from {} has no markup", url))
        })?;
        Ok(Self {
            meta: EntityMeta::new(),
            url,
            html_source,
            screenshot: None,
            location: None,
            parsed: OnceLock::new(),
        })
    }

    pub fn with_capture(mut self, screenshot: Vec<u8>, location: Rectangle) -> Self {
        self.screenshot = Some(screenshot);
        self.location = Some(location);
        self
    }

    pub fn tag_name(&self) -> &str {
        &self.parsed().tag_name
    }

    pub fn classes(&self) -> &BTreeSet<String> {
        &self.parsed().classes
    }

    pub fn text(&self) -> &str {
        &self.parsed().text
    }

    fn parsed(&self) -> &ParsedMarkup {
        self.parsed.get_or_init(|| ParsedMarkup::from_source(&self.html_source))
    }

    /// JSON handed to user transforms: the stored fields plus the derived ones.
    pub fn to_transport(&self) -> Result<Value> {
        let mut value = serde_json::to_value(self)?;
        if let Value::Object(map) = &mut value {
            map.insert("type_id".to_string(), json!(Self::TYPE_ID));
            map.insert("tag_name".to_string(), json!(self.tag_name()));
            map.insert("classes".to_string(), json!(self.classes()));
            map.insert("text".to_string(), json!(self.text()));
        }
        Ok(value)
    }
}

impl PartialEq for Element {
    fn eq(&self, other: &Self) -> bool {
        self.meta == other.meta
            && self.url == other.url
            && self.html_source == other.html_source
            && self.screenshot == other.screenshot
            && self.location == other.location
    }
}

/// Elements in the order the selector matched them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ElementSequence {
    #[serde(flatten)]
    pub meta: EntityMeta,
    pub elements: Vec<Element>,
}

impl ElementSequence {
    pub const TYPE_ID: &'static str = "element_sequence";

    pub fn new(elements: Vec<Element>) -> Self {
        Self {
            meta: EntityMeta::new(),
            elements,
        }
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Element> {
        self.elements.iter()
    }

    pub fn to_transport(&self) -> Result<Value> {
        let elements = self
            .elements
            .iter()
            .map(Element::to_transport)
            .collect::<Result<Vec<_>>>()?;
        Ok(json!({
            "id": self.meta.id,
            "created_at": self.meta.created_at,
            "updated_at": self.meta.updated_at,
            "type_id": Self::TYPE_ID,
            "elements": elements,
        }))
    }
}

mod png_base64 {
    use base64::{engine::general_purpose::STANDARD, Engine as _};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &Option<Vec<u8>>, serializer: S) -> Result<S::Ok, S::Error> {
        match bytes {
            Some(bytes) => serializer.serialize_str(&STANDARD.encode(bytes)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<Vec<u8>>, D::Error> {
        Option::<String>::deserialize(deserializer)?
            .map(|encoded| STANDARD.decode(encoded).map_err(serde::de::Error::custom))
            .transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn element(html: &str) -> Element {
        Element::new(Url::parse("http://fixture.test/index.html").unwrap(), html).unwrap()
    }

    #[test]
    fn test_derived_properties() {
        let el = element(r#"<li class="list-item first-item"><a href="a.html">title-A</a><p>2024-03-31</p></li>"#);
        assert_eq!(el.tag_name(), "li");
        assert!(el.classes().contains("list-item"));
        assert!(el.classes().contains("first-item"));
        assert_eq!(el.text(), "title-A2024-03-31");
    }

    #[test]
    fn test_table_parts_keep_their_tag() {
        let row = element(r#"<tr class="row odd"><td>a</td><td>b</td></tr>"#);
        assert_eq!(row.tag_name(), "tr");
        assert!(row.classes().contains("row") && row.classes().contains("odd"));
        assert_eq!(row.text(), "ab");

        let cell = element("<td class='cell'>a</td>");
        assert_eq!(cell.tag_name(), "td");
        assert!(cell.classes().contains("cell"));
        assert_eq!(cell.text(), "a");
    }

    #[test]
    fn test_document_root_element() {
        let root = element(
            r#"<html lang="en"><head><title>Journal</title></head><body><p>shown</p></body></html>"#,
        );
        assert_eq!(root.tag_name(), "html");
        assert!(root.classes().is_empty());
        assert_eq!(root.text(), "shown");
    }

    #[test]
    fn test_data_class_attribute_is_not_a_class() {
        let el = element(r#"<div data-class="fake" class="real">x</div>"#);
        assert_eq!(el.classes().iter().collect::<Vec<_>>(), vec!["real"]);
    }

    #[test]
    fn test_rejects_empty_markup() {
        let url = Url::parse("http://fixture.test/").unwrap();
        assert!(Element::new(url, "  ").is_err());
    }

    #[test]
    fn test_cache_is_not_part_of_equality_or_json() {
        let el = element("<p>hello</p>");
        let copy = el.clone();
        assert_eq!(el.text(), "hello");
        assert_eq!(el, copy);

        let json = serde_json::to_value(&el).unwrap();
        assert!(json.get("parsed").is_none());
        assert!(json.get("text").is_none());
        let back: Element = serde_json::from_value(json).unwrap();
        assert_eq!(back, el);
    }

    #[test]
    fn test_screenshot_is_base64_on_the_wire() {
        let el = element("<p>x</p>").with_capture(
            vec![0x89, 0x50, 0x4e, 0x47],
            Rectangle {
                x: 1.0,
                y: 2.0,
                width: 3.0,
                height: 4.0,
            },
        );
        let json = serde_json::to_value(&el).unwrap();
        assert_eq!(json["screenshot"], "iVBORw==");
        let back: Element = serde_json::from_value(json).unwrap();
        assert_eq!(back.screenshot.as_deref(), Some(&[0x89, 0x50, 0x4e, 0x47][..]));
    }

    #[test]
    fn test_transport_includes_derived_fields() {
        let sequence = ElementSequence::new(vec![element(r#"<li class="list-item">one</li>"#)]);
        let transport = sequence.to_transport().unwrap();
        assert_eq!(transport["type_id"], "element_sequence");
        assert_eq!(transport["elements"][0]["tag_name"], "li");
        assert_eq!(transport["elements"][0]["classes"][0], "list-item");
        assert_eq!(transport["elements"][0]["text"], "one");
        assert_eq!(transport["elements"][0]["html_source"], r#"<li class="list-item">one</li>"#);
    }
}

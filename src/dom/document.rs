use ego_tree::NodeRef;
use scraper::{ElementRef, Html, Node};

const HTML_NAMESPACE: &str = "http://www.w3.org/1999/xhtml";

/// A parsed snapshot of a page, as served by the browser at read time.
pub struct Document {
    html: Html,
}

impl Document {
    pub fn parse(source: &str) -> Self {
        Self {
            html: Html::parse_document(source),
        }
    }

    /// The `<html>` element.
    pub fn root_element(&self) -> ElementRef<'_> {
        self.html.root_element()
    }

    /// The document node above `<html>` (and any doctype).
    pub fn tree_root(&self) -> NodeRef<'_, Node> {
        self.html.tree.root()
    }
}

/// Elements whose content is never rendered as page text.
const UNRENDERED: [&str; 6] = ["head", "script", "style", "template", "noscript", "title"];

/// Rendered text under `element`: descendant text nodes in document order,
/// untouched, skipping anything inside [`UNRENDERED`] elements.
pub fn text_of(element: ElementRef<'_>) -> String {
    let mut text = String::new();
    if !UNRENDERED.contains(&element.value().name()) {
        collect_text(*element, &mut text);
    }
    text
}

fn collect_text(node: NodeRef<'_, Node>, out: &mut String) {
    for child in node.children() {
        match child.value() {
            Node::Text(text) => out.push_str(text),
            Node::Element(el) if !UNRENDERED.contains(&el.name()) => collect_text(child, out),
            _ => {}
        }
    }
}

pub fn outer_html(element: ElementRef<'_>) -> String {
    element.html()
}

/// Positional absolute path of `element`, e.g. `/html[1]/body[1]/ul[1]/li[2]`.
///
/// The path addresses the same node in a browser that parsed the same markup,
/// which is how the driver hands a resolved node back to the live page.
pub fn absolute_xpath(element: ElementRef<'_>) -> String {
    let mut segments = Vec::new();
    let mut current = Some(element);

    while let Some(el) = current {
        let name = el.value().name();
        let position = 1 + el
            .prev_siblings()
            .filter_map(ElementRef::wrap)
            .filter(|sibling| sibling.value().name() == name)
            .count();

        if &*el.value().name.ns == HTML_NAMESPACE {
            segments.push(format!("{}[{}]", name, position));
        } else {
            segments.push(format!("*[local-name()='{}'][{}]", name, position));
        }

        current = el.parent().and_then(ElementRef::wrap);
    }

    segments.reverse();
    format!("/{}", segments.join("/"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::xpath::evaluate;

    const PAGE: &str = r#"<!DOCTYPE html>
<html><body>
  <ul><li>one</li><li>two <b>bold</b></li></ul>
  <ul><li>three</li></ul>
</body></html>"#;

    #[test]
    fn test_absolute_xpath_counts_same_name_siblings() {
        let document = Document::parse(PAGE);
        let items = evaluate(&document, "//li").unwrap();
        assert_eq!(absolute_xpath(items[0]), "/html[1]/body[1]/ul[1]/li[1]");
        assert_eq!(absolute_xpath(items[1]), "/html[1]/body[1]/ul[1]/li[2]");
        assert_eq!(absolute_xpath(items[2]), "/html[1]/body[1]/ul[2]/li[1]");
    }

    #[test]
    fn test_absolute_xpath_resolves_back_to_same_node() {
        let document = Document::parse(PAGE);
        let bold = evaluate(&document, "//b").unwrap()[0];
        let path = absolute_xpath(bold);
        let found = evaluate(&document, &path).unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id(), bold.id());
    }

    #[test]
    fn test_text_of_skips_unrendered_content() {
        let document = Document::parse(
            r#"<html><head><title>Journal</title><style>p { color: red }</style></head>
<body><p>shown</p><script>var hidden = 1;</script><noscript>fallback</noscript></body></html>"#,
        );
        let text = text_of(document.root_element());
        assert!(text.contains("shown"));
        for hidden in ["Journal", "color", "hidden", "fallback"] {
            assert!(!text.contains(hidden), "{} leaked into text", hidden);
        }
        let script = evaluate(&document, "//script").unwrap()[0];
        assert_eq!(text_of(script), "");
    }

    #[test]
    fn test_text_of_keeps_whitespace() {
        let document = Document::parse(PAGE);
        let second = evaluate(&document, "//li").unwrap()[1];
        assert_eq!(text_of(second), "two bold");
        assert!(outer_html(second).starts_with("<li>"));
    }
}

use crate::dom::document::text_of;
use scraper::ElementRef;

/// Smallest single element under `root` whose text contains every target.
///
/// Descends depth first and takes the leftmost child that still satisfies all
/// targets. Text only shrinks on the way down, so a subtree missing a target is
/// never entered. With no targets, `root` itself matches.
pub fn find_minimal_enclosing<'a, S: AsRef<str>>(
    root: ElementRef<'a>,
    targets: &[S],
) -> Option<ElementRef<'a>> {
    if targets.is_empty() {
        return Some(root);
    }

    let text = text_of(root);
    if !targets.iter().all(|target| text.contains(target.as_ref())) {
        return None;
    }

    root.children()
        .filter_map(ElementRef::wrap)
        .find_map(|child| find_minimal_enclosing(child, targets))
        .or(Some(root))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::document::Document;

    const PAGE: &str = r#"<html><body>
<div id="outer">
  <section id="left"><p>apple</p><p>banana</p></section>
  <section id="right"><span>apple banana</span></section>
  <p id="split">cherry</p><p>date</p>
</div>
</body></html>"#;

    fn id_of(element: ElementRef<'_>) -> Option<&str> {
        element.value().attr("id")
    }

    #[test]
    fn test_result_contains_all_targets_and_no_child_does() {
        let document = Document::parse(PAGE);
        let found = find_minimal_enclosing(document.root_element(), &["apple", "banana"]).unwrap();
        let text = text_of(found);
        assert!(text.contains("apple") && text.contains("banana"));
        for child in found.children().filter_map(ElementRef::wrap) {
            let child_text = text_of(child);
            assert!(!(child_text.contains("apple") && child_text.contains("banana")));
        }
    }

    #[test]
    fn test_leftmost_subtree_wins_ties() {
        let document = Document::parse(PAGE);
        let found = find_minimal_enclosing(document.root_element(), &["apple", "banana"]).unwrap();
        assert_eq!(id_of(found), Some("left"));
    }

    #[test]
    fn test_targets_split_across_siblings_return_parent() {
        let document = Document::parse(PAGE);
        let found = find_minimal_enclosing(document.root_element(), &["cherry", "date"]).unwrap();
        assert_eq!(id_of(found), Some("outer"));
    }

    #[test]
    fn test_missing_target_is_not_found() {
        let document = Document::parse(PAGE);
        assert!(find_minimal_enclosing(document.root_element(), &["apple", "elderberry"]).is_none());
    }

    #[test]
    fn test_empty_targets_match_root() {
        let document = Document::parse(PAGE);
        let targets: [&str; 0] = [];
        let found = find_minimal_enclosing(document.root_element(), &targets).unwrap();
        assert_eq!(found.value().name(), "html");
    }

    #[test]
    fn test_script_text_is_not_matched() {
        let page = r#"<html><head>
<script type="application/ld+json">{"headline":"title-A","date":"2024-03-31"}</script>
</head><body>
<ul><li class="list-item"><a href="a.html">title-A</a><p>date: 2024-03-31</p></li></ul>
</body></html>"#;
        let document = Document::parse(page);
        let found = find_minimal_enclosing(document.root_element(), &["title-A", "2024-03-31"]).unwrap();
        assert_eq!(found.value().name(), "li");
    }

    #[test]
    fn test_leaf_matches_itself() {
        let document = Document::parse(PAGE);
        let found = find_minimal_enclosing(document.root_element(), &["cherry"]).unwrap();
        assert_eq!(id_of(found), Some("split"));
    }
}

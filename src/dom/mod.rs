pub mod document;
pub mod element;
pub mod search;
pub mod xpath;

pub use document::{absolute_xpath, outer_html, text_of, Document};
pub use element::{Element, ElementSequence};
pub use search::find_minimal_enclosing;
pub use xpath::{evaluate, XPath};

//! Small helpers over the kuchiki DOM.

use html5ever::{LocalName, QualName, local_name, namespace_url, ns};
use kuchiki::{Attribute, ElementData, ExpandedName, NodeDataRef, NodeRef};

use crate::error::{BundleError, BundleResult};

/// Collect every element matching a selector. Collected up front because the
/// rewriting passes detach nodes while iterating, which would invalidate a
/// live iterator.
pub(crate) fn select_all(
    node: &NodeRef,
    selector: &str,
) -> BundleResult<Vec<NodeDataRef<ElementData>>> {
    Ok(node
        .select(selector)
        .map_err(|()| BundleError::Document(format!("invalid selector: {selector}")))?
        .collect())
}

/// Fetch an attribute value as an owned string.
pub(crate) fn attr(element: &NodeDataRef<ElementData>, name: &str) -> Option<String> {
    element.attributes.borrow().get(name).map(str::to_string)
}

/// Replace a node's children with a single text node.
pub(crate) fn set_text(node: &NodeRef, text: &str) {
    while let Some(child) = node.first_child() {
        child.detach();
    }
    node.append(NodeRef::new_text(text));
}

/// Build a `<style>` element holding raw text.
pub(crate) fn style_element(text: &str) -> NodeRef {
    raw_text_element(local_name!("style"), text)
}

/// Build a `<script>` element holding raw text.
pub(crate) fn script_element(text: &str) -> NodeRef {
    raw_text_element(local_name!("script"), text)
}

fn raw_text_element(name: LocalName, text: &str) -> NodeRef {
    let element = NodeRef::new_element(
        QualName::new(None, ns!(html), name),
        std::iter::empty::<(ExpandedName, Attribute)>(),
    );
    element.append(NodeRef::new_text(text));
    element
}

#[cfg(test)]
mod tests {
    use super::*;
    use kuchiki::traits::TendrilSink;

    #[test]
    fn style_element_serializes_raw_text() {
        let document = kuchiki::parse_html().one("<html><head></head><body></body></html>");
        let head = select_all(&document, "head").unwrap().remove(0);
        head.as_node().append(style_element("a > b { color: red; }"));

        let mut out = Vec::new();
        document.serialize(&mut out).unwrap();
        let html = String::from_utf8(out).unwrap();
        // Raw text elements must not be entity-escaped.
        assert!(html.contains("<style>a > b { color: red; }</style>"));
    }

    #[test]
    fn set_text_replaces_children() {
        let document = kuchiki::parse_html().one("<html><body><p>old<b>x</b></p></body></html>");
        let p = select_all(&document, "p").unwrap().remove(0);
        set_text(p.as_node(), "new");
        assert_eq!(p.as_node().text_contents(), "new");
    }
}

//! Opaque HTML element values.

use crate::Value;
use std::fmt;

/// Result of evaluating an HTML expression literal.
///
/// `tag` is either a string (plain element, or empty for a fragment) or a
/// callable component value looked up from the scope chain. Attribute order
/// follows source order.
#[derive(Debug, Clone)]
pub struct HtmlElement {
    /// Tag string or component value
    pub tag: Value,
    /// Evaluated attributes in source order
    pub attributes: Vec<(String, Value)>,
    /// Evaluated children
    pub children: Vec<Value>,
}

impl HtmlElement {
    /// Construct an element from its evaluated parts.
    pub fn new(tag: Value, attributes: Vec<(String, Value)>, children: Vec<Value>) -> Self {
        Self {
            tag,
            attributes,
            children,
        }
    }

    /// Tag name for display purposes; components render under their
    /// function name.
    fn tag_name(&self) -> String {
        match &self.tag {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        }
    }
}

impl fmt::Display for HtmlElement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = self.tag_name();
        write!(f, "<{}", name)?;
        for (key, value) in &self.attributes {
            write!(f, " {}=\"{}\"", key, value)?;
        }
        if self.children.is_empty() && !name.is_empty() {
            return write!(f, "/>");
        }
        write!(f, ">")?;
        for child in &self.children {
            write!(f, "{}", child)?;
        }
        write!(f, "</{}>", name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_self_closing() {
        let el = HtmlElement::new(Value::String("br".to_string()), vec![], vec![]);
        assert_eq!(el.to_string(), "<br/>");
    }

    #[test]
    fn test_display_with_attributes_and_children() {
        let el = HtmlElement::new(
            Value::String("div".to_string()),
            vec![("id".to_string(), Value::String("main".to_string()))],
            vec![Value::String("hi".to_string())],
        );
        assert_eq!(el.to_string(), "<div id=\"main\">hi</div>");
    }
}

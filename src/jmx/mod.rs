//! In-memory JMX element tree.
//!
//! Elements keep attributes in insertion order so serialization is stable
//! without any sorting pass. An element carries either text or children,
//! never both; that is all the JMX schema needs.
pub mod parse;
pub mod write;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    pub tag: String,
    pub attrs: Vec<(String, String)>,
    pub text: Option<String>,
    pub children: Vec<Element>,
}

impl Element {
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            attrs: Vec::new(),
            text: None,
            children: Vec::new(),
        }
    }

    /// JMeter test element with the standard gui/test class header.
    pub fn test_element(tag: &str, guiclass: &str, testclass: &str, testname: &str) -> Self {
        Element::new(tag)
            .with_attr("guiclass", guiclass)
            .with_attr("testclass", testclass)
            .with_attr("testname", testname)
            .with_attr("enabled", "true")
    }

    pub fn with_attr(mut self, name: &str, value: impl Into<String>) -> Self {
        self.attrs.push((name.to_string(), value.into()));
        self
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    pub fn with_child(mut self, child: Element) -> Self {
        self.children.push(child);
        self
    }

    pub fn push(&mut self, child: Element) {
        self.children.push(child);
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    /// Direct child property (`*Prop` element) with the given `name=`.
    pub fn prop(&self, name: &str) -> Option<&Element> {
        self.children
            .iter()
            .find(|child| child.tag.ends_with("Prop") && child.attr("name") == Some(name))
    }

    /// Text of a direct child property, if the property exists.
    pub fn prop_text(&self, name: &str) -> Option<&str> {
        self.prop(name)
            .map(|prop| prop.text.as_deref().unwrap_or(""))
    }

    /// All descendants with `tag`, in document order.
    pub fn descendants(&self, tag: &str) -> Vec<&Element> {
        let mut found = Vec::new();
        collect_descendants(self, tag, &mut found);
        found
    }
}

fn collect_descendants<'a>(element: &'a Element, tag: &str, found: &mut Vec<&'a Element>) {
    for child in &element.children {
        if child.tag == tag {
            found.push(child);
        }
        collect_descendants(child, tag, found);
    }
}

pub fn string_prop(name: &str, value: impl Into<String>) -> Element {
    Element::new("stringProp")
        .with_attr("name", name)
        .with_text(value)
}

pub fn bool_prop(name: &str, value: bool) -> Element {
    Element::new("boolProp")
        .with_attr("name", name)
        .with_text(value.to_string())
}

pub fn int_prop(name: &str, value: i64) -> Element {
    Element::new("intProp")
        .with_attr("name", name)
        .with_text(value.to_string())
}

pub fn collection_prop(name: &str, items: Vec<Element>) -> Element {
    Element {
        tag: "collectionProp".to_string(),
        attrs: vec![("name".to_string(), name.to_string())],
        text: None,
        children: items,
    }
}

pub fn element_prop(name: &str, element_type: &str) -> Element {
    Element::new("elementProp")
        .with_attr("name", name)
        .with_attr("elementType", element_type)
}

/// `hashTree` holding each element followed by the tree of its children.
pub fn hash_tree(entries: Vec<(Element, Element)>) -> Element {
    let mut tree = Element::new("hashTree");
    for (element, subtree) in entries {
        tree.push(element);
        tree.push(subtree);
    }
    tree
}

/// `hashTree` for elements that have no children of their own.
pub fn leaf_tree(elements: Vec<Element>) -> Element {
    hash_tree(
        elements
            .into_iter()
            .map(|element| (element, Element::new("hashTree")))
            .collect(),
    )
}

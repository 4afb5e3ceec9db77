//! A small mixed-content element tree.
//!
//! Each element keeps the text before its first child (`text`), its
//! children in document order, and the text that follows its own end tag
//! (`tail`). Attributes, comments and processing instructions are dropped.

use quick_xml::Reader;
use quick_xml::events::Event;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Element {
    pub name: String,
    pub text: String,
    pub children: Vec<Element>,
    pub tail: String,
}

impl Element {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// First element (self included) with the given name, depth first.
    pub fn find(&self, name: &str) -> Option<&Element> {
        if self.name == name {
            return Some(self);
        }
        self.children.iter().find_map(|child| child.find(name))
    }

    /// Every element (self included) with the given name, in document order.
    pub fn find_all<'a>(&'a self, name: &str) -> Vec<&'a Element> {
        let mut out = Vec::new();
        self.collect(name, &mut out);
        out
    }

    fn collect<'a>(&'a self, name: &str, out: &mut Vec<&'a Element>) {
        if self.name == name {
            out.push(self);
        }
        for child in &self.children {
            child.collect(name, out);
        }
    }

    pub fn child(&self, name: &str) -> Option<&Element> {
        self.children.iter().find(|child| child.name == name)
    }

    /// Resolves `parent/child`: the first `child` directly under any
    /// `parent` element in the tree.
    pub fn find_path(&self, parent: &str, child: &str) -> Option<&Element> {
        self.find_all(parent)
            .into_iter()
            .find_map(|element| element.child(child))
    }

    /// Trimmed own text of `parent/child`, empty when missing.
    pub fn path_text(&self, parent: &str, child: &str) -> String {
        self.find_path(parent, child)
            .map(|element| element.text.trim().to_string())
            .unwrap_or_default()
    }

    pub fn child_text(&self, name: &str) -> String {
        self.child(name)
            .map(|element| element.text.trim().to_string())
            .unwrap_or_default()
    }

    /// Concatenates all text in the subtree, markup removed, order kept.
    pub fn plain_text(&self) -> String {
        let mut out = String::new();
        flatten_into(self, &mut out);
        out.trim().to_string()
    }
}

fn flatten_into(element: &Element, out: &mut String) {
    out.push_str(&element.text);
    for child in &element.children {
        flatten_into(child, out);
        out.push_str(&child.tail);
    }
}

/// Parses a document and returns its root element.
pub fn parse(input: &str) -> Result<Element, String> {
    let mut reader = Reader::from_str(input);
    let mut stack: Vec<Element> = Vec::new();
    let mut root: Option<Element> = None;

    loop {
        match reader.read_event() {
            Ok(Event::Start(start)) => {
                let name = String::from_utf8_lossy(start.local_name().as_ref()).into_owned();
                stack.push(Element::new(name));
            }
            Ok(Event::Empty(empty)) => {
                let name = String::from_utf8_lossy(empty.local_name().as_ref()).into_owned();
                close(Element::new(name), &mut stack, &mut root)?;
            }
            Ok(Event::End(_)) => {
                let element = stack
                    .pop()
                    .ok_or_else(|| "unbalanced end tag".to_string())?;
                close(element, &mut stack, &mut root)?;
            }
            Ok(Event::Text(text)) => {
                let value = text.unescape().map_err(|err| err.to_string())?;
                push_text(&mut stack, &value);
            }
            Ok(Event::CData(data)) => {
                let raw = data.into_inner();
                push_text(&mut stack, &String::from_utf8_lossy(&raw));
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(err) => {
                return Err(format!(
                    "at position {}: {err}",
                    reader.error_position()
                ));
            }
        }
    }

    if !stack.is_empty() {
        return Err("document ended inside an element".to_string());
    }
    root.ok_or_else(|| "document has no root element".to_string())
}

fn close(
    element: Element,
    stack: &mut [Element],
    root: &mut Option<Element>,
) -> Result<(), String> {
    match stack.last_mut() {
        Some(parent) => parent.children.push(element),
        None => {
            if root.is_some() {
                return Err("more than one root element".to_string());
            }
            *root = Some(element);
        }
    }
    Ok(())
}

// Text goes to the open element until it has a child; after that it is the
// tail of the most recent child.
fn push_text(stack: &mut [Element], value: &str) {
    let Some(current) = stack.last_mut() else {
        return;
    };
    match current.children.last_mut() {
        Some(last) => last.tail.push_str(value),
        None => current.text.push_str(value),
    }
}

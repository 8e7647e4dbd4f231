//! Minimal element tree shared by the text and binary manifest readers.

use quick_xml::events::{BytesStart, Event};
use quick_xml::reader::Reader;
use std::collections::HashMap;

/// Namespace URI of `android:` attributes.
pub const ANDROID_NS: &str = "http://schemas.android.com/apk/res/android";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XmlAttribute {
    /// Resolved namespace URI, `None` for unqualified attributes.
    pub namespace: Option<String>,
    /// Local name.
    pub name: String,
    pub value: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct XmlElement {
    /// Local name.
    pub name: String,
    pub attributes: Vec<XmlAttribute>,
    pub children: Vec<XmlElement>,
}

impl XmlElement {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Self::default()
        }
    }

    /// An unqualified attribute (e.g. `package` on `<manifest>`).
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|a| a.namespace.is_none() && a.name == name)
            .map(|a| a.value.as_str())
    }

    /// An attribute in the `android:` namespace.
    pub fn android_attr(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|a| a.namespace.as_deref() == Some(ANDROID_NS) && a.name == name)
            .map(|a| a.value.as_str())
    }

    pub fn children_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a XmlElement> {
        self.children.iter().filter(move |c| c.name == name)
    }
}

fn split_qname(qname: &str) -> (Option<&str>, &str) {
    match qname.split_once(':') {
        Some((prefix, local)) => (Some(prefix), local),
        None => (None, qname),
    }
}

/// Resolve an element start tag, pushing its `xmlns` declarations onto `scopes`.
fn read_start(
    start: &BytesStart<'_>,
    scopes: &mut Vec<HashMap<String, String>>,
) -> Result<XmlElement, String> {
    let mut declared = HashMap::new();
    let mut raw = Vec::new();

    for attr in start.attributes() {
        let attr = attr.map_err(|e| e.to_string())?;
        let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
        let value = attr.unescape_value().map_err(|e| e.to_string())?.into_owned();
        if let Some(prefix) = key.strip_prefix("xmlns:") {
            declared.insert(prefix.to_string(), value);
        } else if key != "xmlns" {
            raw.push((key, value));
        }
    }
    scopes.push(declared);

    let lookup = |prefix: &str| {
        scopes
            .iter()
            .rev()
            .find_map(|scope| scope.get(prefix).cloned())
    };

    let mut attributes = Vec::with_capacity(raw.len());
    for (key, value) in raw {
        let (prefix, local) = split_qname(&key);
        let namespace = match prefix {
            Some(p) => Some(lookup(p).ok_or_else(|| format!("undeclared namespace prefix '{p}'"))?),
            None => None,
        };
        attributes.push(XmlAttribute {
            namespace,
            name: local.to_string(),
            value,
        });
    }

    let qname = String::from_utf8_lossy(start.name().as_ref()).into_owned();
    Ok(XmlElement {
        name: split_qname(&qname).1.to_string(),
        attributes,
        children: Vec::new(),
    })
}

/// Parse a plain-text XML document into its root element.
///
/// # Errors
///
/// Returns a human-readable message for malformed XML or an empty document.
pub fn parse_text_xml(text: &str) -> Result<XmlElement, String> {
    let mut reader = Reader::from_str(text);
    reader.config_mut().trim_text(true);

    let mut scopes: Vec<HashMap<String, String>> = Vec::new();
    let mut stack: Vec<XmlElement> = Vec::new();
    let mut root = None;

    loop {
        let event = reader
            .read_event()
            .map_err(|e| format!("at byte {}: {e}", reader.buffer_position()))?;
        match event {
            Event::Start(start) => {
                stack.push(read_start(&start, &mut scopes)?);
            }
            Event::Empty(start) => {
                let element = read_start(&start, &mut scopes)?;
                scopes.pop();
                attach(&mut stack, &mut root, element);
            }
            Event::End(_) => {
                scopes.pop();
                let element = stack.pop().ok_or("unbalanced end tag")?;
                attach(&mut stack, &mut root, element);
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if !stack.is_empty() {
        return Err("unexpected end of document".to_string());
    }
    root.ok_or_else(|| "document has no root element".to_string())
}

/// Attach a finished element to its parent, or make it the root.
pub(crate) fn attach(stack: &mut [XmlElement], root: &mut Option<XmlElement>, element: XmlElement) {
    match stack.last_mut() {
        Some(parent) => parent.children.push(element),
        None => {
            if root.is_none() {
                *root = Some(element);
            }
        }
    }
}

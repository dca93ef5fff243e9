//! Generic XML element tree used by the validator, transformer and SOAP codec.
//!
//! Documents are parsed once with `quick-xml` into an owned [`XmlElement`] tree.
//! Element text is trimmed once the element closes, entity references are
//! resolved and CDATA sections are kept as text. Mixed content is flattened into
//! a single text value per element.

use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DocumentError {
    #[error("XML parse error at position {position}: {message}")]
    Malformed { position: u64, message: String },
    #[error("XML document has no root element")]
    Empty,
    #[error("XML document has unclosed element <{0}>")]
    Unclosed(String),
    #[error("XML document has unexpected closing tag </{0}>")]
    UnexpectedClose(String),
}

/// An owned XML element with attributes, trimmed text and child elements
#[derive(Debug, Clone, PartialEq, Default)]
pub struct XmlElement {
    pub name: String,
    pub attributes: Vec<(String, String)>,
    pub text: Option<String>,
    pub children: Vec<XmlElement>,
}

/// The three shapes a scalar field can take in a parsed document
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RawValue<'a> {
    Absent,
    Scalar(&'a str),
    Wrapped {
        text: Option<&'a str>,
        attributes: &'a [(String, String)],
    },
}

impl<'a> RawValue<'a> {
    /// Text content regardless of shape
    pub fn text(&self) -> Option<&'a str> {
        match self {
            RawValue::Absent => None,
            RawValue::Scalar(text) => Some(text),
            RawValue::Wrapped { text, .. } => *text,
        }
    }

    pub fn is_absent(&self) -> bool {
        matches!(self, RawValue::Absent)
    }
}

impl XmlElement {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Parse a complete document and return its root element
    pub fn parse(input: &str) -> Result<Self, DocumentError> {
        let mut reader = Reader::from_str(input);
        let decoder = reader.decoder();

        let mut stack: Vec<XmlElement> = Vec::new();
        let mut root: Option<XmlElement> = None;

        loop {
            let position = reader.buffer_position();
            let malformed = |message: String| DocumentError::Malformed { position, message };
            let event = reader.read_event().map_err(|e| malformed(e.to_string()))?;

            match event {
                Event::Start(start) => {
                    let element = Self::open(&start, position)?;
                    stack.push(element);
                }
                Event::Empty(start) => {
                    let element = Self::open(&start, position)?;
                    Self::attach(element, &mut stack, &mut root, position)?;
                }
                Event::End(end) => {
                    let name = String::from_utf8_lossy(end.name().as_ref()).into_owned();
                    let element = stack
                        .pop()
                        .ok_or_else(|| DocumentError::UnexpectedClose(name.clone()))?;
                    if element.name != name {
                        return Err(malformed(format!(
                            "expected </{}> but found </{}>",
                            element.name, name
                        )));
                    }
                    Self::attach(element, &mut stack, &mut root, position)?;
                }
                Event::Text(text) => {
                    let decoded = decoder
                        .decode(&text)
                        .map_err(|e| malformed(e.to_string()))?;
                    Self::push_text(&mut stack, &decoded);
                }
                Event::CData(data) => {
                    let decoded = decoder
                        .decode(&data)
                        .map_err(|e| malformed(e.to_string()))?;
                    Self::push_text(&mut stack, &decoded);
                }
                Event::GeneralRef(reference) => {
                    let name = decoder
                        .decode(&reference)
                        .map_err(|e| malformed(e.to_string()))?;
                    let resolved = resolve_reference(&name)
                        .ok_or_else(|| malformed(format!("unknown entity reference &{};", name)))?;
                    Self::push_text(&mut stack, &resolved);
                }
                Event::Eof => break,
                // Declarations, processing instructions, comments and doctypes carry no data
                _ => {}
            }
        }

        if let Some(open) = stack.pop() {
            return Err(DocumentError::Unclosed(open.name));
        }

        root.ok_or(DocumentError::Empty)
    }

    fn open(start: &BytesStart<'_>, position: u64) -> Result<Self, DocumentError> {
        let name = String::from_utf8_lossy(start.name().as_ref()).into_owned();
        let mut attributes = Vec::new();

        for attribute in start.attributes() {
            let attribute = attribute.map_err(|e| DocumentError::Malformed {
                position,
                message: e.to_string(),
            })?;
            let key = String::from_utf8_lossy(attribute.key.as_ref()).into_owned();
            let value = attribute
                .unescape_value()
                .map_err(|e| DocumentError::Malformed {
                    position,
                    message: e.to_string(),
                })?
                .into_owned();
            attributes.push((key, value));
        }

        Ok(Self {
            name,
            attributes,
            text: None,
            children: Vec::new(),
        })
    }

    fn attach(
        mut element: XmlElement,
        stack: &mut [XmlElement],
        root: &mut Option<XmlElement>,
        position: u64,
    ) -> Result<(), DocumentError> {
        element.text = element
            .text
            .take()
            .map(|text| text.trim().to_string())
            .filter(|text| !text.is_empty());

        match stack.last_mut() {
            Some(parent) => {
                parent.children.push(element);
                Ok(())
            }
            None if root.is_none() => {
                *root = Some(element);
                Ok(())
            }
            None => Err(DocumentError::Malformed {
                position,
                message: format!("multiple root elements (found <{}>)", element.name),
            }),
        }
    }

    fn push_text(stack: &mut [XmlElement], fragment: &str) {
        if fragment.is_empty() {
            return;
        }
        if let Some(current) = stack.last_mut() {
            match current.text.as_mut() {
                Some(existing) => existing.push_str(fragment),
                None => current.text = Some(fragment.to_string()),
            }
        }
    }

    /// Element name without a namespace prefix
    pub fn local_name(&self) -> &str {
        self.name
            .rsplit_once(':')
            .map(|(_, local)| local)
            .unwrap_or(&self.name)
    }

    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    /// First child with the given name
    pub fn child(&self, name: &str) -> Option<&XmlElement> {
        self.children.iter().find(|child| child.name == name)
    }

    /// First child whose local name matches, ignoring namespace prefixes
    pub fn child_local(&self, local_name: &str) -> Option<&XmlElement> {
        self.children
            .iter()
            .find(|child| child.local_name() == local_name)
    }

    /// All children with the given name, always as a sequence
    pub fn children_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a XmlElement> {
        self.children.iter().filter(move |child| child.name == name)
    }

    /// Children whose name ends with the given suffix (e.g. `Rq`, `Rs`)
    pub fn children_with_suffix<'a>(
        &'a self,
        suffix: &'a str,
    ) -> impl Iterator<Item = &'a XmlElement> {
        self.children
            .iter()
            .filter(move |child| child.name.ends_with(suffix))
    }

    /// Raw shape of a scalar child field
    pub fn value(&self, name: &str) -> RawValue<'_> {
        match self.child(name) {
            None => RawValue::Absent,
            Some(child) if child.attributes.is_empty() => match child.text.as_deref() {
                Some(text) => RawValue::Scalar(text),
                None => RawValue::Absent,
            },
            Some(child) => RawValue::Wrapped {
                text: child.text.as_deref(),
                attributes: &child.attributes,
            },
        }
    }

    pub fn text(&self) -> Option<&str> {
        self.text.as_deref()
    }
}

/// Resolve a general entity reference body (`amp`, `#38`, `#x26`)
fn resolve_reference(name: &str) -> Option<String> {
    if let Some(numeric) = name.strip_prefix('#') {
        let code = match numeric.strip_prefix('x').or_else(|| numeric.strip_prefix('X')) {
            Some(hex) => u32::from_str_radix(hex, 16).ok()?,
            None => numeric.parse::<u32>().ok()?,
        };
        return char::from_u32(code).map(|ch| ch.to_string());
    }
    quick_xml::escape::resolve_predefined_entity(name).map(str::to_string)
}

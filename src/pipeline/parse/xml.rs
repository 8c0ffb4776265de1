use quick_xml::events::Event;
use quick_xml::Reader;

use crate::error::ParseError;

/// Minimal element tree built from the quick-xml event stream.
///
/// Lookups follow document semantics: a tag name matches any descendant with
/// that qualified name (prefix included).
#[derive(Debug, Clone, Default)]
pub struct Element {
    pub name: String,
    pub attributes: Vec<(String, String)>,
    pub children: Vec<Element>,
    /// Concatenated direct text content.
    pub text: String,
}

impl Element {
    pub fn parse(bytes: &[u8]) -> Result<Element, ParseError> {
        let mut reader = Reader::from_reader(bytes);
        reader.trim_text(true);

        let mut stack = vec![Element {
            name: "#document".to_string(),
            ..Element::default()
        }];
        let mut buf = Vec::new();

        loop {
            match reader.read_event_into(&mut buf) {
                Ok(Event::Start(e)) => {
                    stack.push(start_element(&e)?);
                }
                Ok(Event::Empty(e)) => {
                    let element = start_element(&e)?;
                    push_child(&mut stack, element)?;
                }
                Ok(Event::End(_)) => {
                    let element = stack
                        .pop()
                        .ok_or_else(|| ParseError::InvalidXml("unbalanced end tag".to_string()))?;
                    push_child(&mut stack, element)?;
                }
                Ok(Event::Text(e)) => {
                    let text = e
                        .unescape()
                        .map_err(|e| ParseError::InvalidXml(e.to_string()))?;
                    if let Some(top) = stack.last_mut() {
                        top.text.push_str(&text);
                    }
                }
                Ok(Event::CData(e)) => {
                    let raw = e.into_inner();
                    if let Some(top) = stack.last_mut() {
                        top.text.push_str(&String::from_utf8_lossy(&raw));
                    }
                }
                Ok(Event::Eof) => break,
                Err(e) => return Err(ParseError::InvalidXml(e.to_string())),
                _ => {}
            }
            buf.clear();
        }

        if stack.len() != 1 {
            return Err(ParseError::InvalidXml("unexpected end of document".to_string()));
        }
        stack
            .pop()
            .ok_or_else(|| ParseError::InvalidXml("empty document".to_string()))
    }

    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// All descendants named `name`, in document order.
    pub fn descendants<'a>(&'a self, name: &str) -> Vec<&'a Element> {
        let mut found = Vec::new();
        self.collect_descendants(name, usize::MAX, &mut found);
        found
    }

    fn collect_descendants<'a>(&'a self, name: &str, limit: usize, found: &mut Vec<&'a Element>) {
        for child in &self.children {
            if found.len() >= limit {
                return;
            }
            if child.name == name {
                found.push(child);
            }
            child.collect_descendants(name, limit, found);
        }
    }

    /// Walks `path` one tag at a time. Each step must match at most one
    /// descendant; a missing step yields `None`.
    pub fn find_path<'a>(&'a self, path: &[&str]) -> Result<Option<&'a Element>, ParseError> {
        let mut element = self;
        for tag in path {
            let mut found = Vec::with_capacity(2);
            element.collect_descendants(tag, 2, &mut found);
            match found.as_slice() {
                [] => return Ok(None),
                [single] => element = single,
                _ => return Err(ParseError::DuplicateTag((*tag).to_string())),
            }
        }
        Ok(Some(element))
    }

    pub fn optional_text(&self, path: &[&str]) -> Result<Option<&str>, ParseError> {
        Ok(self.find_path(path)?.map(|e| e.text.as_str()))
    }

    pub fn required_text(&self, path: &[&str]) -> Result<&str, ParseError> {
        match self.find_path(path)? {
            Some(element) => Ok(element.text.as_str()),
            None => Err(ParseError::MissingTag(missing_step(self, path))),
        }
    }

    /// Numeric value at `path`; an absent tag or empty text is `None`.
    pub fn optional_f64(&self, path: &[&str]) -> Result<Option<f64>, ParseError> {
        match self.optional_text(path)? {
            None => Ok(None),
            Some(text) => parse_number(path.last().copied().unwrap_or_default(), text),
        }
    }

    /// Like [`Element::optional_f64`], trying each alternative path in turn.
    pub fn first_f64(&self, paths: &[&[&str]]) -> Result<Option<f64>, ParseError> {
        for path in paths {
            if let Some(value) = self.optional_f64(path)? {
                return Ok(Some(value));
            }
        }
        Ok(None)
    }
}

/// Empty text and non-finite values (`NaN`, `inf`) are missing, not numbers.
pub fn parse_number(tag: &str, text: &str) -> Result<Option<f64>, ParseError> {
    let text = text.trim();
    if text.is_empty() {
        return Ok(None);
    }
    let value = text.parse::<f64>().map_err(|_| ParseError::InvalidValue {
        tag: tag.to_string(),
        value: text.to_string(),
    })?;
    Ok(value.is_finite().then_some(value))
}

fn missing_step(root: &Element, path: &[&str]) -> String {
    let mut element = root;
    for tag in path {
        match element.descendants(tag).first() {
            Some(next) => element = next,
            None => return (*tag).to_string(),
        }
    }
    path.join("|")
}

fn start_element(e: &quick_xml::events::BytesStart) -> Result<Element, ParseError> {
    let name = std::str::from_utf8(e.name().as_ref())
        .map_err(|e| ParseError::InvalidXml(e.to_string()))?
        .to_string();

    let mut attributes = Vec::new();
    for attr in e.attributes() {
        let attr = attr.map_err(|e| ParseError::InvalidXml(e.to_string()))?;
        let key = std::str::from_utf8(attr.key.as_ref())
            .map_err(|e| ParseError::InvalidXml(e.to_string()))?
            .to_string();
        let value = attr
            .unescape_value()
            .map_err(|e| ParseError::InvalidXml(e.to_string()))?
            .into_owned();
        attributes.push((key, value));
    }

    Ok(Element {
        name,
        attributes,
        children: Vec::new(),
        text: String::new(),
    })
}

fn push_child(stack: &mut [Element], element: Element) -> Result<(), ParseError> {
    let parent = stack
        .last_mut()
        .ok_or_else(|| ParseError::InvalidXml("unbalanced end tag".to_string()))?;
    parent.children.push(element);
    Ok(())
}

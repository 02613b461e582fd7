use anyhow::{anyhow, bail, Result};
use indexmap::IndexMap;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;
use xml::reader::{ParserConfig, XmlEvent};
use xml::writer::{EmitterConfig, EventWriter, XmlEvent as WriterEvent};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    Element(Element),
    Text(String),
    CData(String),
    Comment(String),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Element {
    pub name: String,
    pub attributes: IndexMap<String, String>,
    pub children: Vec<Node>,
}

impl Element {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Default::default()
        }
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(|v| v.as_str())
    }

    /// Iterates over child elements, skipping text and comments.
    pub fn elements(&self) -> impl Iterator<Item = &Element> {
        self.children.iter().filter_map(|node| match node {
            Node::Element(el) => Some(el),
            _ => None,
        })
    }

    pub fn child(&self, name: &str) -> Option<&Element> {
        self.elements().find(|el| el.name == name)
    }

    pub fn has_elements(&self) -> bool {
        self.elements().next().is_some()
    }

    /// Concatenated text and CDATA content of this element.
    pub fn text(&self) -> String {
        let mut text = String::new();
        for node in &self.children {
            match node {
                Node::Text(v) | Node::CData(v) => text.push_str(v),
                _ => {}
            }
        }
        text
    }

    /// Replaces the text content, keeping child elements and comments in place.
    pub fn set_text(&mut self, value: &str) {
        let at = self
            .children
            .iter()
            .position(|node| matches!(node, Node::Text(_) | Node::CData(_)));
        self.children
            .retain(|node| !matches!(node, Node::Text(_) | Node::CData(_)));
        if value.is_empty() {
            return;
        }
        let at = at.unwrap_or(self.children.len()).min(self.children.len());
        self.children.insert(at, Node::Text(value.to_string()));
    }

    /// Position (in `children`) of the first child element matching `predicate`.
    pub fn position_of<F>(&self, predicate: F) -> Option<usize>
    where
        F: Fn(&Element) -> bool,
    {
        self.children.iter().position(|node| match node {
            Node::Element(el) => predicate(el),
            _ => false,
        })
    }

    /// Position (in `children`) of the `nth` (0-based) child element named `name`.
    pub fn position_of_nth(&self, name: &str, nth: usize) -> Option<usize> {
        self.children
            .iter()
            .enumerate()
            .filter(|(_, node)| matches!(node, Node::Element(el) if el.name == name))
            .nth(nth)
            .map(|(i, _)| i)
    }

    fn element_at(&self, i: usize) -> Option<&Element> {
        match self.children.get(i)? {
            Node::Element(el) => Some(el),
            _ => None,
        }
    }

    fn element_at_mut(&mut self, i: usize) -> Option<&mut Element> {
        match self.children.get_mut(i)? {
            Node::Element(el) => Some(el),
            _ => None,
        }
    }
}

/// One step of a path expression, e.g. `Item[@Key='ApiKey']`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathStep {
    pub name: String,
    pub predicate: Option<(String, String)>,
}

impl PathStep {
    fn matches(&self, el: &Element) -> bool {
        if self.name != "*" && self.name != el.name {
            return false;
        }
        match &self.predicate {
            Some((attr, value)) => el.attr(attr) == Some(value.as_str()),
            None => true,
        }
    }
}

/// Parses `Settings/Section/Item[@Key='Name']` into steps.
pub fn parse_path(path: &str) -> Result<Vec<PathStep>> {
    let mut parts = vec![];
    let mut current = String::new();
    let mut quote: Option<char> = None;
    for c in path.trim().trim_start_matches('/').chars() {
        match (quote, c) {
            (None, '/') => parts.push(std::mem::take(&mut current)),
            (None, '\'' | '"') => {
                quote = Some(c);
                current.push(c);
            }
            (Some(q), _) if q == c => {
                quote = None;
                current.push(c);
            }
            _ => current.push(c),
        }
    }
    if quote.is_some() {
        bail!("Unterminated quote in path '{path}'");
    }
    parts.push(current);

    let mut steps = vec![];
    for part in parts {
        steps.push(parse_step(&part).map_err(|err| anyhow!("Invalid path '{path}', {err}"))?);
    }
    Ok(steps)
}

fn parse_step(part: &str) -> Result<PathStep> {
    let part = part.trim();
    let (name, predicate) = match part.find('[') {
        None => (part, None),
        Some(i) => {
            let inner = part[i + 1..]
                .strip_suffix(']')
                .ok_or_else(|| anyhow!("missing ']' in '{part}'"))?;
            let inner = inner
                .trim()
                .strip_prefix('@')
                .ok_or_else(|| anyhow!("predicate must start with '@' in '{part}'"))?;
            let (attr, value) = inner
                .split_once('=')
                .ok_or_else(|| anyhow!("predicate must be '@Attr=value' in '{part}'"))?;
            let value = value.trim();
            let value = value
                .strip_prefix('\'')
                .and_then(|v| v.strip_suffix('\''))
                .or_else(|| value.strip_prefix('"').and_then(|v| v.strip_suffix('"')))
                .ok_or_else(|| anyhow!("predicate value must be quoted in '{part}'"))?;
            (&part[..i], Some((attr.trim().to_string(), value.to_string())))
        }
    };
    if name.is_empty() {
        bail!("empty step");
    }
    Ok(PathStep {
        name: name.to_string(),
        predicate,
    })
}

/// The parsed settings tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    root: Element,
}

impl Document {
    pub fn new(root: Element) -> Self {
        Self { root }
    }

    pub fn parse<R: Read>(reader: R) -> Result<Self> {
        let parser = ParserConfig::new()
            .trim_whitespace(false)
            .whitespace_to_characters(false)
            .ignore_comments(false)
            .create_reader(BufReader::new(reader));
        let mut stack: Vec<Element> = vec![];
        let mut root = None;
        for event in parser {
            match event.map_err(|err| anyhow!("Failed to parse settings xml, {err}"))? {
                XmlEvent::StartElement {
                    name, attributes, ..
                } => {
                    let mut el = Element::new(&name.local_name);
                    for attr in attributes {
                        el.attributes.insert(attr.name.local_name, attr.value);
                    }
                    stack.push(el);
                }
                XmlEvent::EndElement { .. } => {
                    let mut el = stack
                        .pop()
                        .ok_or_else(|| anyhow!("Unbalanced end element in settings xml"))?;
                    // whitespace between child elements is formatting, leaf text is kept as is
                    if el.has_elements() {
                        el.children
                            .retain(|node| !matches!(node, Node::Text(v) if v.trim().is_empty()));
                    }
                    match stack.last_mut() {
                        Some(parent) => parent.children.push(Node::Element(el)),
                        None => root = Some(el),
                    }
                }
                XmlEvent::Characters(text) | XmlEvent::Whitespace(text) => {
                    if let Some(el) = stack.last_mut() {
                        el.children.push(Node::Text(text));
                    }
                }
                XmlEvent::CData(text) => {
                    if let Some(el) = stack.last_mut() {
                        el.children.push(Node::CData(text));
                    }
                }
                XmlEvent::Comment(text) => {
                    if let Some(el) = stack.last_mut() {
                        el.children.push(Node::Comment(text));
                    }
                }
                _ => {}
            }
        }
        let root = root.ok_or_else(|| anyhow!("Settings xml has no root element"))?;
        Ok(Self { root })
    }

    pub fn load(path: &Path) -> Result<Self> {
        let file = File::open(path)
            .map_err(|err| anyhow!("Failed to open '{}', {err}", path.display()))?;
        Self::parse(file)
    }

    pub fn write_to<W: Write>(&self, writer: W) -> Result<W> {
        let mut writer = EmitterConfig::new()
            .perform_indent(true)
            .create_writer(writer);
        write_element(&mut writer, &self.root)
            .map_err(|err| anyhow!("Failed to serialize settings xml, {err}"))?;
        Ok(writer.into_inner())
    }

    /// Writes to a sibling temporary file, then renames it over `path`.
    pub fn save(&self, path: &Path) -> Result<()> {
        let tmp_path = path.with_extension("xml.tmp");
        let ret = self.save_to_tmp(&tmp_path).and_then(|_| {
            fs::rename(&tmp_path, path)
                .map_err(|err| anyhow!("Failed to replace '{}', {err}", path.display()))
        });
        if ret.is_err() {
            let _ = fs::remove_file(&tmp_path);
        }
        ret
    }

    fn save_to_tmp(&self, tmp_path: &Path) -> Result<()> {
        let file = File::create(tmp_path)
            .map_err(|err| anyhow!("Failed to create '{}', {err}", tmp_path.display()))?;
        let mut writer = self.write_to(BufWriter::new(file))?;
        writer
            .flush()
            .map_err(|err| anyhow!("Failed to write '{}', {err}", tmp_path.display()))
    }

    pub fn root(&self) -> &Element {
        &self.root
    }

    pub fn select(&self, path: &str) -> Result<Vec<&Element>> {
        let steps = parse_path(path)?;
        let Some((first, rest)) = steps.split_first() else {
            return Ok(vec![]);
        };
        let mut matched = vec![];
        if first.matches(&self.root) {
            matched.push(&self.root);
        }
        for step in rest {
            matched = matched
                .into_iter()
                .flat_map(|el| el.elements())
                .filter(|el| step.matches(el))
                .collect();
        }
        Ok(matched)
    }

    pub fn select_first(&self, path: &str) -> Result<Option<&Element>> {
        Ok(self.select(path)?.into_iter().next())
    }

    /// Resolves a position produced by the locators below.
    pub fn element_at_mut(&mut self, position: &[usize]) -> Option<&mut Element> {
        let mut el = &mut self.root;
        for i in position {
            el = el.element_at_mut(*i)?;
        }
        Some(el)
    }

    pub fn element_at(&self, position: &[usize]) -> Option<&Element> {
        let mut el = &self.root;
        for i in position {
            el = el.element_at(*i)?;
        }
        Some(el)
    }
}

fn write_element<W: Write>(writer: &mut EventWriter<W>, el: &Element) -> xml::writer::Result<()> {
    let mut start = WriterEvent::start_element(el.name.as_str());
    for (name, value) in &el.attributes {
        start = start.attr(name.as_str(), value.as_str());
    }
    writer.write(start)?;
    for node in &el.children {
        match node {
            Node::Element(child) => write_element(writer, child)?,
            Node::Text(text) => writer.write(WriterEvent::characters(text))?,
            Node::CData(text) => writer.write(WriterEvent::cdata(text))?,
            Node::Comment(text) => writer.write(WriterEvent::comment(text))?,
        }
    }
    writer.write(WriterEvent::end_element())
}

/// Position of field `field` inside the `index`-th (1-based) shortcut block.
pub fn locate_shortcut_field(
    root: &Element,
    container: &str,
    block: &str,
    index: usize,
    field: &str,
) -> Option<Vec<usize>> {
    let nth = index.checked_sub(1)?;
    let i = root.position_of(|el| el.name == container)?;
    let shortcuts = root.element_at(i)?;
    let j = shortcuts.position_of_nth(block, nth)?;
    let shortcut = shortcuts.element_at(j)?;
    let k = shortcut.position_of(|el| same_field(&el.name, field))?;
    Some(vec![i, j, k])
}

fn same_field(name: &str, field: &str) -> bool {
    if name == field {
        return true;
    }
    let url = ["URL", "Url"];
    url.contains(&name) && url.contains(&field)
}

/// Position of the item `key` that belongs to `category`.
pub fn locate_keyed_item(root: &Element, category: &str, key: &str) -> Option<Vec<usize>> {
    if category == root.name {
        return root
            .position_of(|el| !el.has_elements() && el.name == key)
            .map(|i| vec![i]);
    }
    if let Some(i) = root.position_of(|el| el.name == category) {
        if let Some(section) = root.element_at(i) {
            let j = section
                .position_of(|el| el.attr("Key") == Some(key))
                .or_else(|| section.position_of(|el| el.attr("Key").is_none() && el.name == key));
            if let Some(j) = j {
                return Some(vec![i, j]);
            }
        }
    }
    for (i, node) in root.children.iter().enumerate() {
        let Node::Element(section) = node else {
            continue;
        };
        if let Some(j) = section.position_of(|el| {
            el.attr("Key") == Some(key) && el.attr("Category") == Some(category)
        }) {
            return Some(vec![i, j]);
        }
    }
    None
}

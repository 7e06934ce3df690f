//! Parsing of the `$Nodes` and `$Elements` sections of an ASCII .msh file.

use std::str::FromStr;

use super::{
    element_type,
    remap::{NodeCollector, TriangleCollector},
    sections::Section,
    GmshError,
};
use crate::geometry::ParsedGeometry;

const NODES: &str = "Nodes";
const ELEMENTS: &str = "Elements";

/// Build geometry from the sections of an ASCII file.
///
/// Nodes are always processed before elements,
/// whatever order the sections appear in.
/// Sections other than `$Nodes` and `$Elements` are ignored.
pub(super) fn parse_body(sections: &[Section<'_>]) -> Result<ParsedGeometry, GmshError> {
    let nodes = unique_section(sections, NODES)?;
    let elements = unique_section(sections, ELEMENTS)?;

    let collector = parse_nodes(nodes)?;
    let mut collector = collector.into_triangles();
    parse_elements(elements, &mut collector)?;
    Ok(collector.finish())
}

fn unique_section<'a>(
    sections: &'a [Section<'a>],
    name: &'static str,
) -> Result<&'a Section<'a>, GmshError> {
    let mut matching = sections.iter().filter(|s| s.name == name);
    let section = matching.next().ok_or(GmshError::SectionMissing(name))?;
    if let Some(duplicate) = matching.next() {
        return Err(GmshError::SectionSyntaxError {
            offset: duplicate.body_offset,
            message: format!("${name} section appears more than once"),
        });
    }
    Ok(section)
}

fn parse_nodes(section: &Section<'_>) -> Result<NodeCollector, GmshError> {
    let mut tokens = Tokens::new(section, NODES)?;
    let node_count: usize = tokens.parse_next()?;
    log::debug!("reading {node_count} ASCII nodes");

    // don't trust the declared count for preallocation,
    // a node needs at least 8 bytes of text
    let mut collector = NodeCollector::with_capacity(node_count.min(section.body.len() / 8));
    for _ in 0..node_count {
        let node_id: u64 = tokens.parse_next()?;
        let x: f64 = tokens.parse_next()?;
        let y: f64 = tokens.parse_next()?;
        let z: f64 = tokens.parse_next()?;
        collector.push_node(node_id, [x, y, z])?;
    }
    tokens.expect_end()?;

    Ok(collector)
}

fn parse_elements(
    section: &Section<'_>,
    collector: &mut TriangleCollector,
) -> Result<(), GmshError> {
    let mut tokens = Tokens::new(section, ELEMENTS)?;
    let element_count: usize = tokens.parse_next()?;
    log::debug!("reading {element_count} ASCII elements");

    for _ in 0..element_count {
        let _element_id: u64 = tokens.parse_next()?;
        let type_offset = tokens.offset();
        let el_type: u32 = tokens.parse_next()?;
        let tag_count: usize = tokens.parse_next()?;
        tokens.skip(tag_count)?;

        let node_count = element_type::node_count(el_type).ok_or(
            GmshError::UnknownElementType {
                element_type: el_type,
                offset: type_offset,
            },
        )?;
        if el_type == element_type::TRIANGLE {
            let a = tokens.parse_next()?;
            let b = tokens.parse_next()?;
            let c = tokens.parse_next()?;
            collector.push_triangle([a, b, c])?;
        } else {
            log::trace!("skipping element of type {el_type}");
            tokens.skip(node_count)?;
        }
    }
    tokens.expect_end()?;

    Ok(())
}

/// Whitespace-separated tokens of a section body,
/// tracking their byte offsets for error reporting.
struct Tokens<'a> {
    text: &'a str,
    pos: usize,
    base_offset: usize,
    section: &'static str,
}

impl<'a> Tokens<'a> {
    /// Start reading a section, which has to be valid UTF-8.
    fn new(section: &Section<'a>, name: &'static str) -> Result<Self, GmshError> {
        let text = std::str::from_utf8(section.body).map_err(|e| GmshError::NotUtf8 {
            offset: section.body_offset + e.valid_up_to(),
        })?;
        Ok(Self {
            text,
            pos: 0,
            base_offset: section.body_offset,
            section: name,
        })
    }

    fn skip_whitespace(&mut self) {
        let rest = &self.text[self.pos..];
        self.pos += rest.len() - rest.trim_start_matches(|c: char| c.is_ascii_whitespace()).len();
    }

    /// Offset of the next token in the whole input.
    fn offset(&mut self) -> usize {
        self.skip_whitespace();
        self.base_offset + self.pos
    }

    fn next_token(&mut self) -> Result<&'a str, GmshError> {
        self.skip_whitespace();
        let rest = &self.text[self.pos..];
        if rest.is_empty() {
            return Err(GmshError::UnexpectedEndOfSection {
                section: self.section,
            });
        }
        let len = rest
            .find(|c: char| c.is_ascii_whitespace())
            .unwrap_or(rest.len());
        self.pos += len;
        Ok(&rest[..len])
    }

    fn parse_next<T: FromStr>(&mut self) -> Result<T, GmshError> {
        let offset = self.offset();
        let token = self.next_token()?;
        token.parse().map_err(|_| GmshError::InvalidNumber {
            offset,
            token: token.to_string(),
        })
    }

    /// Read and discard tokens.
    fn skip(&mut self, count: usize) -> Result<(), GmshError> {
        for _ in 0..count {
            self.next_token()?;
        }
        Ok(())
    }

    fn expect_end(&mut self) -> Result<(), GmshError> {
        self.skip_whitespace();
        if self.pos < self.text.len() {
            return Err(GmshError::TrailingData {
                section: self.section,
                offset: self.base_offset + self.pos,
            });
        }
        Ok(())
    }
}

//! Parsing of the `$Nodes` and `$Elements` sections of a binary .msh file.
//!
//! Binary files keep the ASCII section markers and record counts,
//! but the records themselves are raw integers and doubles:
//!
//! ```text
//! node:          u32 id | f64 x | f64 y | f64 z
//! element group: u32 type | u32 count | u32 tag count
//!                then `count` times: u32 id | u32 tags.. | u32 node ids..
//! ```

use byteorder::{BigEndian, ByteOrder, LittleEndian};

use super::{
    element_type,
    remap::{NodeCollector, TriangleCollector},
    Endianness, GmshError,
};
use crate::geometry::ParsedGeometry;

const NODES: &str = "Nodes";
const ELEMENTS: &str = "Elements";
const NODES_START: &[u8] = b"$Nodes";
const NODES_END: &[u8] = b"$EndNodes";
const ELEMENTS_START: &[u8] = b"$Elements";
const ELEMENTS_END: &[u8] = b"$EndElements";

/// Size of a node record: id and three coordinates.
const NODE_RECORD_LEN: usize = 4 + 3 * 8;

/// Build geometry from the binary body of a file, starting the search for
/// sections at byte `start`.
///
/// The `$Elements` section is searched for after the end of `$Nodes`.
pub(super) fn parse_body(
    bytes: &[u8],
    start: usize,
    endianness: Endianness,
) -> Result<ParsedGeometry, GmshError> {
    let mut cursor = ByteCursor {
        bytes,
        pos: start,
        endianness,
    };

    cursor.seek_marker(NODES_START, NODES)?;
    log::debug!("$Nodes data starts at byte {}", cursor.pos);
    let nodes = parse_nodes(&mut cursor)?;
    cursor.expect_marker(NODES_END, NODES)?;

    cursor.seek_marker(ELEMENTS_START, ELEMENTS)?;
    log::debug!("$Elements data starts at byte {}", cursor.pos);
    let mut collector = nodes.into_triangles();
    parse_elements(&mut cursor, &mut collector)?;
    cursor.expect_marker(ELEMENTS_END, ELEMENTS)?;

    Ok(collector.finish())
}

fn parse_nodes(cursor: &mut ByteCursor<'_>) -> Result<NodeCollector, GmshError> {
    let node_count = cursor.read_count()?;
    log::debug!("reading {node_count} binary nodes from byte {}", cursor.pos);

    // check the whole block fits before allocating anything for it
    let block_len = node_count
        .checked_mul(NODE_RECORD_LEN)
        .unwrap_or(usize::MAX);
    if block_len > cursor.remaining() {
        return Err(cursor.truncated(block_len));
    }

    let mut collector = NodeCollector::with_capacity(node_count);
    for _ in 0..node_count {
        let node_id = cursor.read_u32()?;
        let x = cursor.read_f64()?;
        let y = cursor.read_f64()?;
        let z = cursor.read_f64()?;
        collector.push_node(node_id as u64, [x, y, z])?;
    }
    Ok(collector)
}

fn parse_elements(
    cursor: &mut ByteCursor<'_>,
    collector: &mut TriangleCollector,
) -> Result<(), GmshError> {
    let element_count = cursor.read_count()?;
    log::debug!("reading {element_count} binary elements from byte {}", cursor.pos);

    // elements come in groups of a single type,
    // each with a header giving the type, size and number of tags
    let mut elements_read = 0;
    while elements_read < element_count {
        let group_offset = cursor.pos;
        let el_type = cursor.read_u32()?;
        let group_len = cursor.read_u32()? as usize;
        let tag_count = cursor.read_u32()? as usize;

        let node_count = element_type::node_count(el_type).ok_or(
            GmshError::UnknownElementType {
                element_type: el_type,
                offset: group_offset,
            },
        )?;
        if group_len > element_count - elements_read {
            return Err(GmshError::SectionSyntaxError {
                offset: group_offset,
                message: format!(
                    "group of {group_len} elements exceeds the {element_count} declared in total"
                ),
            });
        }

        if el_type == element_type::TRIANGLE {
            for _ in 0..group_len {
                // element id, then tags
                cursor.skip_u32s(1 + tag_count)?;
                let a = cursor.read_u32()?;
                let b = cursor.read_u32()?;
                let c = cursor.read_u32()?;
                collector.push_triangle([a as u64, b as u64, c as u64])?;
            }
        } else {
            log::trace!("skipping {group_len} elements of type {el_type}");
            for _ in 0..group_len {
                cursor.skip_u32s(1 + tag_count + node_count)?;
            }
        }

        elements_read += group_len;
    }
    Ok(())
}

/// Bounds-checked reading position in the input.
struct ByteCursor<'a> {
    bytes: &'a [u8],
    pos: usize,
    endianness: Endianness,
}

impl<'a> ByteCursor<'a> {
    fn remaining(&self) -> usize {
        self.bytes.len() - self.pos
    }

    fn truncated(&self, needed: usize) -> GmshError {
        GmshError::TruncatedBinaryData {
            offset: self.pos,
            needed,
            len: self.bytes.len(),
        }
    }

    fn take(&mut self, len: usize) -> Result<&'a [u8], GmshError> {
        if len > self.remaining() {
            return Err(self.truncated(len));
        }
        let taken = &self.bytes[self.pos..self.pos + len];
        self.pos += len;
        Ok(taken)
    }

    fn read_u32(&mut self) -> Result<u32, GmshError> {
        let bytes = self.take(4)?;
        Ok(match self.endianness {
            Endianness::Little => LittleEndian::read_u32(bytes),
            Endianness::Big => BigEndian::read_u32(bytes),
        })
    }

    fn read_f64(&mut self) -> Result<f64, GmshError> {
        let bytes = self.take(8)?;
        Ok(match self.endianness {
            Endianness::Little => LittleEndian::read_f64(bytes),
            Endianness::Big => BigEndian::read_f64(bytes),
        })
    }

    fn skip_u32s(&mut self, count: usize) -> Result<(), GmshError> {
        let len = count.checked_mul(4).unwrap_or(usize::MAX);
        self.take(len).map(|_| ())
    }

    fn peek(&self) -> Option<u8> {
        self.bytes.get(self.pos).copied()
    }

    fn skip_whitespace(&mut self) {
        while self.peek().is_some_and(|b| b.is_ascii_whitespace()) {
            self.pos += 1;
        }
    }

    /// Move past the next occurrence of a section start marker
    /// and the whitespace following it.
    fn seek_marker(&mut self, marker: &[u8], section: &'static str) -> Result<(), GmshError> {
        let bytes = self.bytes;
        // the marker has to be followed by whitespace
        // so that e.g. `$Nodes` doesn't match `$NodesFoo`
        let found = (self.pos..bytes.len())
            .find(|&i| {
                bytes[i..].starts_with(marker)
                    && bytes
                        .get(i + marker.len())
                        .is_some_and(|b| b.is_ascii_whitespace())
            })
            .ok_or(GmshError::SectionMissing(section))?;
        self.pos = found + marker.len();
        self.skip_whitespace();
        Ok(())
    }

    /// Check that, after whitespace, the data continues with the given marker
    /// and move past it.
    fn expect_marker(&mut self, marker: &[u8], section: &'static str) -> Result<(), GmshError> {
        self.skip_whitespace();
        if !self.bytes[self.pos..].starts_with(marker) {
            return Err(GmshError::TrailingData {
                section,
                offset: self.pos,
            });
        }
        self.pos += marker.len();
        Ok(())
    }

    /// Read a record count written as ASCII digits in the binary stream.
    ///
    /// Only the line break ending the count is consumed after the digits,
    /// since the binary records that follow may begin with bytes
    /// that look like whitespace.
    fn read_count(&mut self) -> Result<usize, GmshError> {
        self.skip_whitespace();
        let start = self.pos;
        while self.peek().is_some_and(|b| b.is_ascii_digit()) {
            self.pos += 1;
        }
        if self.pos == start {
            return match self.peek() {
                None => Err(self.truncated(1)),
                Some(b) => Err(GmshError::InvalidNumber {
                    offset: start,
                    token: String::from_utf8_lossy(&[b]).into_owned(),
                }),
            };
        }

        let digits = &self.bytes[start..self.pos];
        // digits are ASCII so this is always valid UTF-8
        let text = String::from_utf8_lossy(digits);
        let count = text.parse().map_err(|_| GmshError::InvalidNumber {
            offset: start,
            token: text.to_string(),
        })?;

        while matches!(self.peek(), Some(b' ' | b'\t' | b'\r')) {
            self.pos += 1;
        }
        if self.peek() == Some(b'\n') {
            self.pos += 1;
        }
        Ok(count)
    }
}

//! Utilities for loading meshes generated with [`gmsh`](https://www.gmsh.info/).
//!
//! Only version 2.2 of the MSH format is supported,
//! in both its ASCII and binary encodings.
//! First-order triangles (element type 2) become the triangles of the output;
//! every other element type is read past and ignored.

use std::path::Path;

use crate::geometry::ParsedGeometry;

mod ascii;
mod binary;
mod element_type;
mod header;
mod remap;
mod sections;

pub use header::{Endianness, MeshFormatHeader};

/// Error in loading a mesh from a Gmsh .msh file.
///
/// Every error aborts the whole parse; no partial geometry is returned.
#[derive(thiserror::Error, Debug)]
pub enum GmshError {
    /// The data does not begin with a `$MeshFormat` block.
    #[error("Invalid .msh data: no $MeshFormat header at the start of the file")]
    HeaderMissing,
    /// The `$MeshFormat` block does not contain the expected fields.
    #[error("Invalid .msh header: {0}")]
    MalformedHeader(String),
    /// The format version is something other than 2.2.
    #[error("Unsupported .msh version {0}, only 2.2 is supported")]
    UnsupportedVersion(String),
    /// The file type field is neither 0 (ASCII) nor 1 (binary).
    #[error("Invalid .msh file type {0}, expected 0 (ASCII) or 1 (binary)")]
    InvalidEncodingFlag(String),
    /// The data size field is not 8.
    #[error("Invalid .msh data size {0}, floating point values must be 8 bytes wide")]
    InvalidFloatWidth(String),
    /// Section markers are unmatched or misnested,
    /// or there is stray text between sections.
    #[error("Invalid .msh section structure at byte {offset}: {message}")]
    SectionSyntaxError {
        /// Byte offset of the offending data in the input.
        offset: usize,
        /// Description including a snippet of the offending text.
        message: String,
    },
    /// A required section is not present.
    #[error("Invalid .msh data: no ${0} section")]
    SectionMissing(&'static str),
    /// An element has a type code that isn't defined by the format.
    #[error("Unknown element type {element_type} at byte {offset}")]
    UnknownElementType {
        /// The type code found in the file.
        element_type: u32,
        /// Byte offset of the type code in the input.
        offset: usize,
    },
    /// An element refers to a node that has not been declared.
    #[error("An element refers to node {node_id}, which is not declared in $Nodes")]
    DanglingNodeReference {
        /// The file-assigned id of the missing node.
        node_id: u64,
    },
    /// The same node id is declared twice in `$Nodes`.
    #[error("Node {node_id} is declared more than once")]
    DuplicateNodeId {
        /// The repeated file-assigned id.
        node_id: u64,
    },
    /// A binary read would go past the end of the data.
    #[error("Binary .msh data is truncated: {needed} bytes needed at byte {offset}, but the data is {len} bytes long")]
    TruncatedBinaryData {
        /// Position of the attempted read.
        offset: usize,
        /// Number of bytes the read required.
        needed: usize,
        /// Total length of the input.
        len: usize,
    },
    /// A token that should be a number isn't one.
    #[error("Invalid number {token:?} at byte {offset}")]
    InvalidNumber {
        /// Byte offset of the token in the input.
        offset: usize,
        /// The offending text.
        token: String,
    },
    /// A section body ran out before all its declared records were read.
    #[error("${section} section ended before all of its records were read")]
    UnexpectedEndOfSection {
        /// Name of the section.
        section: &'static str,
    },
    /// Data remains in a section after all its declared records.
    #[error("Unexpected data after the records of the ${section} section at byte {offset}")]
    TrailingData {
        /// Name of the section.
        section: &'static str,
        /// Byte offset of the first unexpected byte.
        offset: usize,
    },
    /// The `$Nodes` or `$Elements` section of an ASCII file is not valid UTF-8.
    #[error("Invalid .msh data: text is not valid UTF-8 at byte {offset}")]
    NotUtf8 {
        /// Byte offset of the first invalid byte.
        offset: usize,
    },
    /// The mesh has more vertices than fit in a 32-bit index buffer.
    #[error("Invalid .msh data: too many nodes for 32-bit indices")]
    TooManyNodes,
    /// Reading the file from disk failed.
    #[error("Reading the .msh file failed")]
    Io(#[from] std::io::Error),
}

/// Parse the contents of a `.msh` file into triangle geometry.
///
/// The encoding (ASCII or binary, and the byte order of the latter)
/// is detected from the `$MeshFormat` header.
/// Vertices are emitted in the order their nodes appear in `$Nodes`,
/// regardless of the ids the file assigns to them,
/// and element node ids are translated to those vertex positions.
///
/// ```
/// # use gmsh_loader::gmsh::parse;
/// # fn load() -> Result<(), Box<dyn std::error::Error>> {
/// let msh_bytes = std::fs::read("src/gmsh/square_ascii.msh")?;
/// let geometry = parse(&msh_bytes)?;
/// assert_eq!(geometry.triangle_count(), 4);
/// # Ok(())
/// # }
/// # load().expect("Failed to load mesh");
/// ```
pub fn parse(bytes: &[u8]) -> Result<ParsedGeometry, GmshError> {
    let (header, body_start) = header::parse_header_block(bytes)?;

    let geometry = match header.endianness {
        None => {
            log::debug!("parsing ASCII .msh body starting at byte {body_start}");
            let sections = sections::split_sections(&bytes[body_start..], body_start)?;
            ascii::parse_body(&sections)?
        }
        Some(endianness) => {
            log::debug!("parsing {endianness:?}-endian binary .msh body starting at byte {body_start}");
            binary::parse_body(bytes, body_start, endianness)?
        }
    };

    log::debug!(
        "loaded geometry with {} vertices and {} triangles",
        geometry.vertex_count(),
        geometry.triangle_count()
    );
    Ok(geometry)
}

/// Read only the `$MeshFormat` header of a `.msh` file.
///
/// Useful for checking a file's encoding without parsing all of it.
/// The same validation as in [`parse`] is applied.
pub fn parse_header(bytes: &[u8]) -> Result<MeshFormatHeader, GmshError> {
    header::parse_header_block(bytes).map(|(header, _)| header)
}

/// Read a `.msh` file from disk and [`parse`] it.
///
/// The whole file is read into memory first.
pub fn load_file(path: impl AsRef<Path>) -> Result<ParsedGeometry, GmshError> {
    let bytes = std::fs::read(path)?;
    parse(&bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    const EXAMPLE: &str = "$MeshFormat
2.2 0 8
$EndMeshFormat
$Nodes
3
10 0 0 0
11 1 0 0
12 0 1 0
$EndNodes
$Elements
1
1 2 0 10 11 12
$EndElements
";

    #[test]
    fn single_triangle_with_offset_ids() {
        let geometry = parse(EXAMPLE.as_bytes()).expect("Failed to parse mesh");
        assert_eq!(
            geometry.vertices,
            vec![0., 0., 0., 1., 0., 0., 0., 1., 0.]
        );
        assert_eq!(geometry.indices, vec![0, 1, 2]);
    }

    #[test]
    fn ascii_and_binary_encodings_agree() {
        let ascii = parse(include_bytes!("gmsh/square_ascii.msh")).expect("Failed to load ASCII");
        let little = parse(include_bytes!("gmsh/square_binary_le.msh"))
            .expect("Failed to load little-endian binary");
        let big = parse(include_bytes!("gmsh/square_binary_be.msh"))
            .expect("Failed to load big-endian binary");

        assert_eq!(ascii, little);
        assert_eq!(ascii, big);
    }

    #[test]
    fn fixture_counts_and_index_ranges() {
        for bytes in [
            &include_bytes!("gmsh/square_ascii.msh")[..],
            &include_bytes!("gmsh/square_binary_le.msh")[..],
            &include_bytes!("gmsh/square_binary_be.msh")[..],
        ] {
            let geometry = parse(bytes).expect("Failed to load mesh");
            // 5 nodes, 12 elements of which 4 are triangles
            assert_eq!(geometry.vertices.len(), 3 * 5);
            assert_eq!(geometry.indices.len(), 3 * 4);
            assert!(
                geometry.indices.iter().all(|&i| (i as usize) < 5),
                "index out of range in {:?}",
                geometry.indices
            );
        }
    }

    #[test]
    fn vertices_follow_node_declaration_order() {
        let geometry =
            parse(include_bytes!("gmsh/square_ascii.msh")).expect("Failed to load mesh");
        // the fixture declares node 7 (the center) first,
        // then the corners with decreasing ids
        #[rustfmt::skip]
        let expected_vertices = vec![
            0.5, 0.5, 0.,
            1., 1., 0.,
            0., 1., 0.,
            1., 0., 0.,
            0., 0., 0.,
        ];
        assert_eq!(geometry.vertices, expected_vertices);
        #[rustfmt::skip]
        let expected_indices = vec![
            4, 3, 0,
            3, 1, 0,
            1, 2, 0,
            2, 4, 0,
        ];
        assert_eq!(geometry.indices, expected_indices);
    }

    #[test]
    fn header_only_read() {
        let header = parse_header(include_bytes!("gmsh/square_binary_be.msh"))
            .expect("Failed to read header");
        assert_eq!(header.version, "2.2");
        assert!(!header.is_ascii);
        assert_eq!(header.endianness, Some(Endianness::Big));

        let header = parse_header(EXAMPLE.as_bytes()).expect("Failed to read header");
        assert!(header.is_ascii);
        assert_eq!(header.endianness, None);
    }

    #[test]
    fn rejects_other_versions_and_widths() {
        let v21 = EXAMPLE.replace("2.2 0 8", "2.1 0 8");
        assert!(matches!(
            parse(v21.as_bytes()),
            Err(GmshError::UnsupportedVersion(v)) if v == "2.1"
        ));

        let narrow = EXAMPLE.replace("2.2 0 8", "2.2 0 4");
        assert!(matches!(
            parse(narrow.as_bytes()),
            Err(GmshError::InvalidFloatWidth(w)) if w == "4"
        ));

        let bad_type = EXAMPLE.replace("2.2 0 8", "2.2 2 8");
        assert!(matches!(
            parse(bad_type.as_bytes()),
            Err(GmshError::InvalidEncodingFlag(t)) if t == "2"
        ));
    }

    #[test]
    fn dangling_node_reference() {
        let msh = EXAMPLE.replace("1 2 0 10 11 12", "1 2 0 10 11 13");
        assert!(matches!(
            parse(msh.as_bytes()),
            Err(GmshError::DanglingNodeReference { node_id: 13 })
        ));
    }

    #[test]
    fn missing_sections() {
        let no_elements = EXAMPLE.replace("$Elements\n1\n1 2 0 10 11 12\n$EndElements\n", "");
        assert!(matches!(
            parse(no_elements.as_bytes()),
            Err(GmshError::SectionMissing("Elements"))
        ));

        let no_header = EXAMPLE.replace("$MeshFormat\n2.2 0 8\n$EndMeshFormat\n", "");
        assert!(matches!(
            parse(no_header.as_bytes()),
            Err(GmshError::HeaderMissing)
        ));
    }

    #[test]
    fn invalid_utf8_in_nodes() {
        // the x coordinate of node 11 becomes a lone latin-1 byte
        let bad_pos = EXAMPLE.find("11 1 0 0").unwrap() + 3;
        let mut bad = EXAMPLE.as_bytes().to_vec();
        bad[bad_pos] = 0xE9;
        assert!(matches!(
            parse(&bad),
            Err(GmshError::NotUtf8 { offset }) if offset == bad_pos
        ));
    }

    #[test]
    fn non_utf8_in_ignored_sections_is_tolerated() {
        let mut msh = b"$MeshFormat\n2.2 0 8\n$EndMeshFormat\n\
                        $PhysicalNames\n1\n2 1 \"caf\xE9\"\n$EndPhysicalNames\n\
                        $Comments\n\xFF\xFE latin-1 \xE9\n$EndComments\n"
            .to_vec();
        let body_start = EXAMPLE.find("$Nodes").unwrap();
        msh.extend_from_slice(EXAMPLE[body_start..].as_bytes());

        let geometry = parse(&msh).expect("Failed to parse mesh");
        assert_eq!(
            geometry.vertices,
            vec![0., 0., 0., 1., 0., 0., 0., 1., 0.]
        );
        assert_eq!(geometry.indices, vec![0, 1, 2]);
    }

    #[test]
    fn byte_order_mark_and_crlf() {
        let mut msh = b"\xEF\xBB\xBF".to_vec();
        msh.extend_from_slice(EXAMPLE.replace('\n', "\r\n").as_bytes());
        let geometry = parse(&msh).expect("Failed to parse mesh");
        assert_eq!(geometry.indices, vec![0, 1, 2]);
        assert_eq!(geometry.vertex_count(), 3);
    }

    #[test]
    fn load_file_reads_from_disk() {
        let geometry = load_file("src/gmsh/square_binary_le.msh").expect("Failed to load mesh");
        assert_eq!(geometry.triangle_count(), 4);

        assert!(matches!(
            load_file("src/gmsh/does_not_exist.msh"),
            Err(GmshError::Io(_))
        ));
    }
}

//! Parsing of the `$MeshFormat` block that every .msh file starts with.

use super::GmshError;

const SUPPORTED_VERSION: &str = "2.2";
const FLOAT_WIDTH: usize = 8;

const HEADER_START: &[u8] = b"$MeshFormat";
const HEADER_END: &[u8] = b"$EndMeshFormat";
const BYTE_ORDER_MARK: &[u8] = b"\xEF\xBB\xBF";

/// Byte order of the records in a binary .msh file.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Endianness {
    /// Least significant byte first.
    Little,
    /// Most significant byte first.
    Big,
}

/// Contents of the `$MeshFormat` block of a .msh file.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MeshFormatHeader {
    /// Format version. Always "2.2" for a successfully parsed header.
    pub version: String,
    /// Whether the body of the file is plain text.
    pub is_ascii: bool,
    /// Width of floating point values in bytes. Always 8.
    pub float_width: usize,
    /// Byte order of binary records, `None` for ASCII files.
    pub endianness: Option<Endianness>,
}

/// Parse the header at the start of the data,
/// returning it along with the byte offset right after `$EndMeshFormat`.
///
/// The header is inspected as bytes rather than text
/// because in binary files it contains a raw integer
/// used to detect the byte order.
pub(super) fn parse_header_block(bytes: &[u8]) -> Result<(MeshFormatHeader, usize), GmshError> {
    // editors on Windows like to prepend a UTF-8 byte order mark
    let bom_len = if bytes.starts_with(BYTE_ORDER_MARK) {
        BYTE_ORDER_MARK.len()
    } else {
        0
    };
    let start = bom_len
        + bytes[bom_len..]
            .iter()
            .position(|b| !b.is_ascii_whitespace())
            .ok_or(GmshError::HeaderMissing)?;
    // the marker has to be a whole word, `$MeshFormatX` is something else
    let body_start = start + HEADER_START.len();
    if !bytes[start..].starts_with(HEADER_START)
        || !bytes
            .get(body_start)
            .map_or(false, |b| b.is_ascii_whitespace())
    {
        return Err(GmshError::HeaderMissing);
    }
    let body_len = find_bytes(&bytes[body_start..], HEADER_END).ok_or(GmshError::HeaderMissing)?;
    let body = &bytes[body_start..body_start + body_len];
    let end = body_start + body_len + HEADER_END.len();

    let fields: Vec<&[u8]> = body
        .split(|b| b.is_ascii_whitespace())
        .filter(|field| !field.is_empty())
        .collect();
    if fields.len() != 3 && fields.len() != 4 {
        return Err(GmshError::MalformedHeader(format!(
            "expected 3 or 4 fields, found {}",
            fields.len()
        )));
    }

    let version = String::from_utf8_lossy(fields[0]).into_owned();
    if version != SUPPORTED_VERSION {
        return Err(GmshError::UnsupportedVersion(version));
    }

    let file_type = String::from_utf8_lossy(fields[1]);
    let is_ascii = match file_type.as_ref() {
        "0" => true,
        "1" => false,
        _ => return Err(GmshError::InvalidEncodingFlag(file_type.into_owned())),
    };

    let data_size = String::from_utf8_lossy(fields[2]);
    if data_size.parse::<usize>().ok() != Some(FLOAT_WIDTH) {
        return Err(GmshError::InvalidFloatWidth(data_size.into_owned()));
    }

    // binary files store the integer 1 here in their own byte order,
    // so the first byte is 1 exactly when the file is little-endian
    let endianness = if is_ascii {
        None
    } else {
        let marker = fields.get(3).ok_or_else(|| {
            GmshError::MalformedHeader("binary header is missing the endianness marker".into())
        })?;
        if marker[0] == 1 {
            Some(Endianness::Little)
        } else {
            Some(Endianness::Big)
        }
    };

    let header = MeshFormatHeader {
        version,
        is_ascii,
        float_width: FLOAT_WIDTH,
        endianness,
    };
    Ok((header, end))
}

/// Find the first occurrence of `needle` in `haystack`.
fn find_bytes(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}

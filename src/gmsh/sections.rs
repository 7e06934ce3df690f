//! Splitting the text of an ASCII .msh file into `$Name ... $EndName` sections.

use super::GmshError;

/// Free-form text section that may contain anything, including `$`.
const COMMENTS: &str = "Comments";

/// Longest snippet of offending text quoted in error messages.
const SNIPPET_LEN: usize = 40;

/// A named section of an ASCII .msh file.
///
/// Bodies are kept as bytes, so sections the loader ignores
/// may contain text in any encoding.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(super) struct Section<'a> {
    /// Name of the section without the leading `$`.
    pub name: &'a str,
    /// Everything between the start and end markers.
    pub body: &'a [u8],
    /// Byte offset of `body` in the whole input.
    pub body_offset: usize,
}

/// Split data consisting of nothing but sections into its sections,
/// preserving their order.
///
/// `base_offset` is the position of `data` in the whole input
/// and is only used for error reporting.
pub(super) fn split_sections(
    data: &[u8],
    base_offset: usize,
) -> Result<Vec<Section<'_>>, GmshError> {
    let mut sections = Vec::new();
    let mut pos = 0;

    loop {
        pos = skip_whitespace(data, pos);
        if pos == data.len() {
            break;
        }

        let rest = &data[pos..];
        let Some(after_dollar) = rest.strip_prefix(b"$") else {
            return Err(syntax_error(
                base_offset + pos,
                format!("unexpected text between sections: {:?}", snippet(rest)),
            ));
        };
        let name_len = after_dollar
            .iter()
            .position(|b| b.is_ascii_whitespace())
            .unwrap_or(after_dollar.len());
        let Some(name) = std::str::from_utf8(&after_dollar[..name_len])
            .ok()
            .filter(|name| is_valid_name(name))
        else {
            return Err(syntax_error(
                base_offset + pos,
                format!("expected a section start marker, found {:?}", snippet(rest)),
            ));
        };

        let body_start = pos + 1 + name_len;
        let end_marker = format!("$End{name}");
        let body_len =
            find_end_marker(&data[body_start..], end_marker.as_bytes()).ok_or_else(|| {
                syntax_error(
                    base_offset + pos,
                    format!("section ${name} has no matching {end_marker}"),
                )
            })?;
        let body = &data[body_start..body_start + body_len];
        if name != COMMENTS {
            check_not_nested(body, base_offset + body_start)?;
        }

        log::debug!("found section ${name} at byte {}", base_offset + pos);
        sections.push(Section {
            name,
            body,
            body_offset: base_offset + body_start,
        });
        pos = body_start + body_len + end_marker.len();
    }

    Ok(sections)
}

fn is_valid_name(name: &str) -> bool {
    !name.is_empty()
        && !name.starts_with("End")
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}

/// Find the end marker of a section body.
/// It has to stand on its own,
/// i.e. be surrounded by whitespace or the ends of the data.
fn find_end_marker(body: &[u8], end_marker: &[u8]) -> Option<usize> {
    (0..body.len()).find(|&idx| {
        body[idx..].starts_with(end_marker)
            && idx
                .checked_sub(1)
                .map_or(true, |before| body[before].is_ascii_whitespace())
            && body
                .get(idx + end_marker.len())
                .map_or(true, |b| b.is_ascii_whitespace())
    })
}

/// Sections can't contain other sections,
/// so no line inside a body may start with a marker.
fn check_not_nested(body: &[u8], body_offset: usize) -> Result<(), GmshError> {
    let mut line_start = 0;
    for line in body.split_inclusive(|&b| b == b'\n') {
        let indent = line
            .iter()
            .take_while(|b| b.is_ascii_whitespace())
            .count();
        if line.get(indent) == Some(&b'$') {
            return Err(syntax_error(
                body_offset + line_start + indent,
                format!("nested section marker {:?}", snippet(&line[indent..])),
            ));
        }
        line_start += line.len();
    }
    Ok(())
}

fn skip_whitespace(data: &[u8], pos: usize) -> usize {
    pos + data[pos..]
        .iter()
        .take_while(|b| b.is_ascii_whitespace())
        .count()
}

/// First line of the data, shortened for error messages.
fn snippet(data: &[u8]) -> String {
    let line = data.split(|&b| b == b'\n').next().unwrap_or_default();
    String::from_utf8_lossy(line)
        .trim_end()
        .chars()
        .take(SNIPPET_LEN)
        .collect()
}

fn syntax_error(offset: usize, message: String) -> GmshError {
    GmshError::SectionSyntaxError { offset, message }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sections_in_order() {
        let text = "\n$PhysicalNames\n1\n2 1 \"surface\"\n$EndPhysicalNames\n\
                    $Nodes\n1\n1 0 0 0\n$EndNodes\n  \n$Comments\n$ anything $\n$EndComments";
        let sections = split_sections(text.as_bytes(), 100).expect("Failed to split sections");

        let names: Vec<&str> = sections.iter().map(|s| s.name).collect();
        assert_eq!(names, vec!["PhysicalNames", "Nodes", "Comments"]);
        assert_eq!(sections[1].body, b"\n1\n1 0 0 0\n");
        assert_eq!(
            &text.as_bytes()[sections[1].body_offset - 100..][..sections[1].body.len()],
            sections[1].body
        );
    }

    #[test]
    fn ignored_bodies_may_hold_any_bytes() {
        let data = b"$PhysicalNames\n1\n2 1 \"caf\xE9\"\n$EndPhysicalNames\n$Nodes\n0\n$EndNodes\n";
        let sections = split_sections(data, 0).expect("Failed to split sections");
        assert_eq!(sections.len(), 2);
        assert_eq!(sections[0].body, b"\n1\n2 1 \"caf\xE9\"\n");
    }

    #[test]
    fn empty_text_has_no_sections() {
        assert_eq!(split_sections(b" \n\t", 0).unwrap(), vec![]);
    }

    #[test]
    fn stray_text_between_sections() {
        let text = "$Nodes\n0\n$EndNodes\nstray\n$Elements\n0\n$EndElements\n";
        let Err(GmshError::SectionSyntaxError { offset, message }) = split_sections(text.as_bytes(), 10)
        else {
            panic!("stray text should be an error");
        };
        assert_eq!(offset, 10 + text.find("stray").unwrap());
        assert!(message.contains("stray"), "bad message {message}");
    }

    #[test]
    fn unmatched_and_nested_markers() {
        assert!(matches!(
            split_sections(b"$Nodes\n1\n1 0 0 0\n", 0),
            Err(GmshError::SectionSyntaxError { offset: 0, .. })
        ));
        assert!(matches!(
            split_sections(b"$EndNodes\n", 0),
            Err(GmshError::SectionSyntaxError { .. })
        ));
        // an end marker that's only a prefix of another word doesn't count
        assert!(matches!(
            split_sections(b"$Nodes\n0\n$EndNodesX\n", 0),
            Err(GmshError::SectionSyntaxError { .. })
        ));

        let nested = "$Nodes\n0\n$Elements\n0\n$EndElements\n$EndNodes\n";
        let Err(GmshError::SectionSyntaxError { offset, .. }) = split_sections(nested.as_bytes(), 0) else {
            panic!("nested sections should be an error");
        };
        assert_eq!(offset, nested.find("$Elements").unwrap());
    }
}

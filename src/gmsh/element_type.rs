//! Element types of the MSH 2.2 format and the number of nodes each one has.

/// Type code of a 3-node triangle, the only element type turned into geometry.
pub(super) const TRIANGLE: u32 = 2;

/// Number of node references carried by an element of the given type,
/// or `None` if the format doesn't define the type.
pub(super) const fn node_count(element_type: u32) -> Option<usize> {
    let count = match element_type {
        // 2-node line
        1 => 2,
        // 3-node triangle
        2 => 3,
        // 4-node quadrangle
        3 => 4,
        // 4-node tetrahedron
        4 => 4,
        // 8-node hexahedron
        5 => 8,
        // 6-node prism
        6 => 6,
        // 5-node pyramid
        7 => 5,
        // second order line, triangle, quadrangle, tetrahedron,
        // hexahedron, prism and pyramid
        8 => 3,
        9 => 6,
        10 => 9,
        11 => 10,
        12 => 27,
        13 => 18,
        14 => 14,
        // 1-node point
        15 => 1,
        // incomplete second order quadrangle, hexahedron, prism and pyramid
        16 => 8,
        17 => 20,
        18 => 15,
        19 => 13,
        // higher order triangles and lines
        20 => 9,
        21 => 10,
        22 => 12,
        23 => 15,
        24 => 15,
        25 => 21,
        26 => 4,
        27 => 5,
        28 => 6,
        // higher order tetrahedra
        29 => 20,
        30 => 35,
        31 => 56,
        // third and fourth order hexahedra
        92 => 64,
        93 => 125,
        _ => return None,
    };
    Some(count)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_and_unknown_types() {
        assert_eq!(node_count(TRIANGLE), Some(3));
        assert_eq!(node_count(1), Some(2));
        assert_eq!(node_count(15), Some(1));
        assert_eq!(node_count(93), Some(125));

        assert_eq!(node_count(0), None);
        assert_eq!(node_count(32), None);
        assert_eq!(node_count(91), None);
        assert_eq!(node_count(u32::MAX), None);

        let defined = (0..200).filter(|&t| node_count(t).is_some()).count();
        assert_eq!(defined, 33);
    }
}

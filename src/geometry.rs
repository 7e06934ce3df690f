//! The triangle geometry produced by the loader.

use itertools::Itertools;

use crate::Vec3;

/// Triangle mesh in the flat buffer layout renderers expect.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ParsedGeometry {
    /// Vertex coordinates, three per vertex,
    /// in the order the nodes are declared in the file.
    pub vertices: Vec<f64>,
    /// Vertex indices into `vertices`, three per triangle.
    pub indices: Vec<u32>,
}

impl ParsedGeometry {
    /// Get the number of vertices.
    #[inline]
    pub fn vertex_count(&self) -> usize {
        self.vertices.len() / 3
    }

    /// Get the number of triangles.
    #[inline]
    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    /// Get the vertices as `nalgebra` vectors.
    pub fn positions(&self) -> Vec<Vec3> {
        self.vertices
            .chunks_exact(3)
            .map(|v| Vec3::new(v[0], v[1], v[2]))
            .collect()
    }

    /// Iterate over the vertex indices of each triangle.
    pub fn triangles(&self) -> impl '_ + Iterator<Item = [u32; 3]> {
        self.indices
            .iter()
            .copied()
            .tuples()
            .map(|(a, b, c)| [a, b, c])
    }

    /// Vertex coordinates converted to single precision for uploading to the GPU.
    pub fn vertices_f32(&self) -> Vec<f32> {
        self.vertices.iter().map(|&v| v as f32).collect()
    }

    /// Compute a unit normal for every vertex
    /// by averaging the normals of the triangles around it,
    /// weighted by triangle area.
    ///
    /// Triangle normals follow the winding order of the indices
    /// (counterclockwise is front-facing).
    /// Vertices not part of any non-degenerate triangle get a zero normal.
    ///
    /// Triangles referring to vertices past the end of `vertices`
    /// can only come from editing the buffers by hand;
    /// they are skipped.
    pub fn vertex_normals(&self) -> Vec<Vec3> {
        let positions = self.positions();
        let mut normals = vec![Vec3::zeros(); positions.len()];

        for tri in self.triangles() {
            let [a, b, c] = tri.map(|i| i as usize);
            if [a, b, c].iter().any(|&i| i >= positions.len()) {
                log::debug!("skipping triangle {tri:?} with out-of-range indices");
                continue;
            }
            // length of the cross product is twice the area,
            // which gives the area weighting for free
            let face_normal = (positions[b] - positions[a]).cross(&(positions[c] - positions[a]));
            for i in [a, b, c] {
                normals[i] += face_normal;
            }
        }

        for normal in &mut normals {
            *normal = normal.try_normalize(f64::EPSILON).unwrap_or_else(Vec3::zeros);
        }
        normals
    }
}

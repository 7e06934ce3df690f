//! Translation of file-assigned node ids into dense vertex indices,
//! and assembly of the output buffers.
//!
//! Assembly happens in two phases that mirror the two sections of the file.
//! [`NodeCollector`] only inserts nodes;
//! once it's turned into a [`TriangleCollector`]
//! the id map is frozen and can only be queried.

use std::collections::HashMap;

use super::GmshError;
use crate::geometry::ParsedGeometry;

/// Map from the ids nodes have in the file
/// to the positions of the corresponding vertices in the output.
#[derive(Clone, Debug, Default)]
struct NodeIndexMap {
    indices: HashMap<u64, u32>,
}

impl NodeIndexMap {
    fn with_capacity(capacity: usize) -> Self {
        Self {
            indices: HashMap::with_capacity(capacity),
        }
    }

    /// Give the node the next free vertex index.
    fn insert(&mut self, node_id: u64) -> Result<u32, GmshError> {
        let next_idx = u32::try_from(self.indices.len()).map_err(|_| GmshError::TooManyNodes)?;
        if self.indices.insert(node_id, next_idx).is_some() {
            return Err(GmshError::DuplicateNodeId { node_id });
        }
        Ok(next_idx)
    }

    fn get(&self, node_id: u64) -> Result<u32, GmshError> {
        self.indices
            .get(&node_id)
            .copied()
            .ok_or(GmshError::DanglingNodeReference { node_id })
    }
}

/// First assembly phase: collects the vertices of the `$Nodes` section.
#[derive(Debug, Default)]
pub(super) struct NodeCollector {
    node_map: NodeIndexMap,
    vertices: Vec<f64>,
}

impl NodeCollector {
    /// Preallocate space for the given number of nodes.
    pub fn with_capacity(node_count: usize) -> Self {
        Self {
            node_map: NodeIndexMap::with_capacity(node_count),
            vertices: Vec::with_capacity(3 * node_count),
        }
    }

    pub fn push_node(&mut self, node_id: u64, position: [f64; 3]) -> Result<(), GmshError> {
        self.node_map.insert(node_id)?;
        self.vertices.extend_from_slice(&position);
        Ok(())
    }

    /// Finish collecting nodes and move on to elements.
    pub fn into_triangles(self) -> TriangleCollector {
        TriangleCollector {
            node_map: self.node_map,
            vertices: self.vertices,
            indices: Vec::new(),
        }
    }
}

/// Second assembly phase: collects triangles from the `$Elements` section,
/// translating their node ids through the frozen id map.
#[derive(Debug)]
pub(super) struct TriangleCollector {
    node_map: NodeIndexMap,
    vertices: Vec<f64>,
    indices: Vec<u32>,
}

impl TriangleCollector {
    pub fn push_triangle(&mut self, node_ids: [u64; 3]) -> Result<(), GmshError> {
        for node_id in node_ids {
            let idx = self.node_map.get(node_id)?;
            self.indices.push(idx);
        }
        Ok(())
    }

    /// Assemble the output, discarding the id map.
    pub fn finish(self) -> ParsedGeometry {
        ParsedGeometry {
            vertices: self.vertices,
            indices: self.indices,
        }
    }
}

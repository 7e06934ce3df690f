//! Loader for meshes saved by [`gmsh`](https://www.gmsh.info/)
//! in version 2.2 of the MSH format.
//!
//! Both the ASCII and the binary encoding are accepted,
//! and the encoding is detected from the file's header.
//! The result is a flat vertex buffer and a triangle index buffer
//! ready to be handed to a renderer.
//!
//! ```
//! # use gmsh_loader::{parse, GmshError};
//! # fn load() -> Result<(), GmshError> {
//! let msh = b"$MeshFormat
//! 2.2 0 8
//! $EndMeshFormat
//! $Nodes
//! 3
//! 10 0 0 0
//! 11 1 0 0
//! 12 0 1 0
//! $EndNodes
//! $Elements
//! 1
//! 1 2 0 10 11 12
//! $EndElements
//! ";
//! let geometry = parse(msh)?;
//! assert_eq!(geometry.vertices, vec![0., 0., 0., 1., 0., 0., 0., 1., 0.]);
//! assert_eq!(geometry.indices, vec![0, 1, 2]);
//! # Ok(())
//! # }
//! # load().expect("Failed to parse mesh");
//! ```

#![warn(missing_docs)]

pub mod gmsh;
#[doc(inline)]
pub use gmsh::{load_file, parse, parse_header, Endianness, GmshError, MeshFormatHeader};

pub mod geometry;
#[doc(inline)]
pub use geometry::ParsedGeometry;

// nalgebra re-exports of common types for convenience

pub use nalgebra as na;
/// Type alias for a 3D `nalgebra` vector.
pub type Vec3 = na::Vector3<f64>;

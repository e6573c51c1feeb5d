//! Owned mesh and grid transfer objects.
//!
//! The kernel cannot pre-announce result sizes, so every mesh/grid-returning
//! operation is split in two: a dimension query yielding only counts, then a
//! data fetch into caller-allocated arrays of exactly those lengths. The
//! buffer guards here own the transient foreign arrays for the duration of
//! one operation and copy them into the owned types before release.

use meshkernel_sys::{CurvilinearGridNative, Mesh2dNative};
use serde::{Deserialize, Serialize};

use crate::error::{KernelError, Result};
use crate::scoped::ScopedBuffer;

/// Scalar result of a mesh dimension query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Mesh2dDimensions {
    pub node_count: usize,
    pub edge_count: usize,
    pub face_count: usize,
    /// Total number of face-node links across all faces.
    pub face_node_count: usize,
}

/// An unstructured 2D mesh: node coordinates, an edge table, and an optional
/// variable-length face table.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Mesh2d {
    pub node_x: Vec<f64>,
    pub node_y: Vec<f64>,
    /// Node index pairs, two entries per edge.
    pub edge_nodes: Vec<i32>,
    /// Node indices of all faces, concatenated.
    pub face_nodes: Vec<i32>,
    /// Number of nodes of each face, indexing runs of `face_nodes`.
    pub nodes_per_face: Vec<i32>,
}

impl Mesh2d {
    /// Empty mesh.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of nodes.
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.node_x.len()
    }

    /// Number of edges.
    #[must_use]
    pub fn edge_count(&self) -> usize {
        self.edge_nodes.len() / 2
    }

    /// Number of faces.
    #[must_use]
    pub fn face_count(&self) -> usize {
        self.nodes_per_face.len()
    }

    /// Whether the mesh has no nodes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.node_x.is_empty()
    }

    /// The node index pair of edge `index`.
    #[must_use]
    pub fn edge(&self, index: usize) -> Option<(i32, i32)> {
        let pair = self.edge_nodes.get(2 * index..2 * index + 2)?;
        Some((pair[0], pair[1]))
    }

    /// The counts this mesh would report from a dimension query.
    #[must_use]
    pub fn dimensions(&self) -> Mesh2dDimensions {
        Mesh2dDimensions {
            node_count: self.node_count(),
            edge_count: self.edge_count(),
            face_count: self.face_count(),
            face_node_count: self.face_nodes.len(),
        }
    }

    /// Check the structural invariants: equal coordinate channels, a
    /// well-formed edge table referencing valid nodes, and a face table
    /// whose run lengths add up.
    pub fn validate(&self) -> Result<()> {
        if self.node_x.len() != self.node_y.len() {
            return Err(KernelError::invalid_input(
                "mesh",
                format!(
                    "node channel lengths differ: x={}, y={}",
                    self.node_x.len(),
                    self.node_y.len()
                ),
            ));
        }
        if self.edge_nodes.len() % 2 != 0 {
            return Err(KernelError::invalid_input(
                "mesh",
                format!("edge table holds {} entries, not pairs", self.edge_nodes.len()),
            ));
        }
        let node_count = self.node_count() as i32;
        if let Some(&bad) = self
            .edge_nodes
            .iter()
            .find(|&&n| n < 0 || n >= node_count)
        {
            return Err(KernelError::invalid_input(
                "mesh",
                format!("edge references node {bad} outside 0..{node_count}"),
            ));
        }
        let face_links: i64 = self.nodes_per_face.iter().map(|&n| i64::from(n)).sum();
        if face_links != self.face_nodes.len() as i64 {
            return Err(KernelError::invalid_input(
                "mesh",
                format!(
                    "face table declares {face_links} links but holds {}",
                    self.face_nodes.len()
                ),
            ));
        }
        if let Some(&bad) = self
            .face_nodes
            .iter()
            .find(|&&n| n < 0 || n >= node_count)
        {
            return Err(KernelError::invalid_input(
                "mesh",
                format!("face references node {bad} outside 0..{node_count}"),
            ));
        }
        Ok(())
    }
}

/// Scalar result of a curvilinear dimension query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CurvilinearDimensions {
    pub rows: usize,
    pub columns: usize,
}

impl CurvilinearDimensions {
    /// Total node count, `rows * columns`.
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.rows * self.columns
    }
}

/// A structured grid with nodes addressed by (row, column).
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct CurvilinearGrid {
    pub node_x: Vec<f64>,
    pub node_y: Vec<f64>,
    pub rows: usize,
    pub columns: usize,
}

impl CurvilinearGrid {
    /// Number of nodes.
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.node_x.len()
    }

    /// Number of edges of the structured connectivity.
    #[must_use]
    pub fn edge_count(&self) -> usize {
        if self.rows == 0 || self.columns == 0 {
            return 0;
        }
        self.columns * (self.rows - 1) + self.rows * (self.columns - 1)
    }

    /// Coordinates of the node at (row, column), row-major.
    #[must_use]
    pub fn node(&self, row: usize, column: usize) -> Option<(f64, f64)> {
        if row >= self.rows || column >= self.columns {
            return None;
        }
        let i = row * self.columns + column;
        Some((self.node_x[i], self.node_y[i]))
    }

    /// Check that `rows * columns` matches the node arrays.
    pub fn validate(&self) -> Result<()> {
        if self.node_x.len() != self.node_y.len() {
            return Err(KernelError::invalid_input(
                "curvilinear grid",
                format!(
                    "node channel lengths differ: x={}, y={}",
                    self.node_x.len(),
                    self.node_y.len()
                ),
            ));
        }
        if self.rows * self.columns != self.node_x.len() {
            return Err(KernelError::invalid_input(
                "curvilinear grid",
                format!(
                    "{} rows x {} columns != {} nodes",
                    self.rows,
                    self.columns,
                    self.node_x.len()
                ),
            ));
        }
        Ok(())
    }
}

/// Foreign arrays of one mesh transfer, sized exactly to a dimension query.
#[derive(Debug)]
pub(crate) struct Mesh2dBuffers {
    node_x: ScopedBuffer<f64>,
    node_y: ScopedBuffer<f64>,
    edge_nodes: ScopedBuffer<i32>,
    face_nodes: ScopedBuffer<i32>,
    nodes_per_face: ScopedBuffer<i32>,
    native: Mesh2dNative,
}

impl Mesh2dBuffers {
    /// Buffers holding a copy of `mesh`, for the set operation.
    pub fn from_mesh(mesh: &Mesh2d) -> Result<Self> {
        Ok(Self::assemble(
            ScopedBuffer::from_slice(&mesh.node_x)?,
            ScopedBuffer::from_slice(&mesh.node_y)?,
            ScopedBuffer::from_slice(&mesh.edge_nodes)?,
            ScopedBuffer::from_slice(&mesh.face_nodes)?,
            ScopedBuffer::from_slice(&mesh.nodes_per_face)?,
            mesh.dimensions(),
        ))
    }

    /// Zero-filled buffers of exactly the queried lengths, for the fetch.
    pub fn sized(dims: Mesh2dDimensions) -> Result<Self> {
        Ok(Self::assemble(
            ScopedBuffer::zeroed(dims.node_count)?,
            ScopedBuffer::zeroed(dims.node_count)?,
            ScopedBuffer::zeroed(dims.edge_count * 2)?,
            ScopedBuffer::zeroed(dims.face_node_count)?,
            ScopedBuffer::zeroed(dims.face_count)?,
            dims,
        ))
    }

    fn assemble(
        mut node_x: ScopedBuffer<f64>,
        mut node_y: ScopedBuffer<f64>,
        mut edge_nodes: ScopedBuffer<i32>,
        mut face_nodes: ScopedBuffer<i32>,
        mut nodes_per_face: ScopedBuffer<i32>,
        dims: Mesh2dDimensions,
    ) -> Self {
        let native = Mesh2dNative {
            edge_nodes: edge_nodes.as_mut_ptr(),
            face_nodes: face_nodes.as_mut_ptr(),
            nodes_per_face: nodes_per_face.as_mut_ptr(),
            node_x: node_x.as_mut_ptr(),
            node_y: node_y.as_mut_ptr(),
            num_nodes: dims.node_count as i32,
            num_edges: dims.edge_count as i32,
            num_faces: dims.face_count as i32,
            num_face_nodes: dims.face_node_count as i32,
        };
        Self {
            node_x,
            node_y,
            edge_nodes,
            face_nodes,
            nodes_per_face,
            native,
        }
    }

    pub fn native_ptr(&self) -> *const Mesh2dNative {
        &self.native
    }

    pub fn native_mut_ptr(&mut self) -> *mut Mesh2dNative {
        &mut self.native
    }

    /// Copy the fetched arrays into an owned mesh.
    ///
    /// # Panics
    ///
    /// Panics if the kernel changed the counts between the dimension query
    /// and the fetch; the two-phase contract makes that a programming error,
    /// not a runtime condition.
    pub fn into_mesh(self, dims: Mesh2dDimensions) -> Mesh2d {
        assert_eq!(
            (
                self.native.num_nodes,
                self.native.num_edges,
                self.native.num_faces,
                self.native.num_face_nodes,
            ),
            (
                dims.node_count as i32,
                dims.edge_count as i32,
                dims.face_count as i32,
                dims.face_node_count as i32,
            ),
            "mesh counts changed between dimension query and data fetch"
        );
        Mesh2d {
            node_x: self.node_x.to_vec_truncated(dims.node_count),
            node_y: self.node_y.to_vec_truncated(dims.node_count),
            edge_nodes: self.edge_nodes.to_vec_truncated(dims.edge_count * 2),
            face_nodes: self.face_nodes.to_vec_truncated(dims.face_node_count),
            nodes_per_face: self.nodes_per_face.to_vec_truncated(dims.face_count),
        }
    }
}

/// Foreign arrays of one curvilinear transfer.
#[derive(Debug)]
pub(crate) struct CurvilinearBuffers {
    node_x: ScopedBuffer<f64>,
    node_y: ScopedBuffer<f64>,
    native: CurvilinearGridNative,
}

impl CurvilinearBuffers {
    /// Zero-filled buffers of exactly the queried node count.
    pub fn sized(dims: CurvilinearDimensions) -> Result<Self> {
        let mut node_x = ScopedBuffer::zeroed(dims.node_count())?;
        let mut node_y = ScopedBuffer::zeroed(dims.node_count())?;
        let native = CurvilinearGridNative {
            node_x: node_x.as_mut_ptr(),
            node_y: node_y.as_mut_ptr(),
            num_m: dims.columns as i32,
            num_n: dims.rows as i32,
        };
        Ok(Self {
            node_x,
            node_y,
            native,
        })
    }

    pub fn native_mut_ptr(&mut self) -> *mut CurvilinearGridNative {
        &mut self.native
    }

    /// Copy the fetched arrays into an owned grid.
    ///
    /// # Panics
    ///
    /// Panics if the kernel changed the dimensions between query and fetch.
    pub fn into_grid(self, dims: CurvilinearDimensions) -> CurvilinearGrid {
        assert_eq!(
            (self.native.num_n, self.native.num_m),
            (dims.rows as i32, dims.columns as i32),
            "grid dimensions changed between dimension query and data fetch"
        );
        CurvilinearGrid {
            node_x: self.node_x.to_vec_truncated(dims.node_count()),
            node_y: self.node_y.to_vec_truncated(dims.node_count()),
            rows: dims.rows,
            columns: dims.columns,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn triangle() -> Mesh2d {
        Mesh2d {
            node_x: vec![0.0, 1.0, 0.0],
            node_y: vec![0.0, 0.0, 1.0],
            edge_nodes: vec![0, 1, 1, 2, 2, 0],
            face_nodes: vec![0, 1, 2],
            nodes_per_face: vec![3],
        }
    }

    #[test]
    fn valid_mesh_passes_validation() {
        triangle().validate().unwrap();
    }

    #[test]
    fn edge_out_of_range_rejected() {
        let mut mesh = triangle();
        mesh.edge_nodes[3] = 9;
        assert!(matches!(
            mesh.validate(),
            Err(KernelError::InvalidInput { .. })
        ));
    }

    #[test]
    fn face_links_must_add_up() {
        let mut mesh = triangle();
        mesh.nodes_per_face = vec![4];
        assert!(matches!(
            mesh.validate(),
            Err(KernelError::InvalidInput { .. })
        ));
    }

    #[test]
    fn dimensions_reflect_tables() {
        let dims = triangle().dimensions();
        assert_eq!(
            dims,
            Mesh2dDimensions {
                node_count: 3,
                edge_count: 3,
                face_count: 1,
                face_node_count: 3,
            }
        );
    }

    #[test]
    fn buffers_round_trip_through_native_arrays() {
        let mesh = triangle();
        let buffers = Mesh2dBuffers::from_mesh(&mesh).unwrap();
        assert_eq!(buffers.into_mesh(mesh.dimensions()), mesh);
    }

    #[test]
    #[should_panic(expected = "between dimension query and data fetch")]
    fn fetch_length_mismatch_is_defensive() {
        let mesh = triangle();
        let buffers = Mesh2dBuffers::from_mesh(&mesh).unwrap();
        let wrong = Mesh2dDimensions {
            node_count: 2,
            ..mesh.dimensions()
        };
        let _ = buffers.into_mesh(wrong);
    }

    #[test]
    fn curvilinear_node_addressing() {
        let grid = CurvilinearGrid {
            node_x: vec![0.0, 1.0, 0.0, 1.0, 0.0, 1.0],
            node_y: vec![0.0, 0.0, 1.0, 1.0, 2.0, 2.0],
            rows: 3,
            columns: 2,
        };
        grid.validate().unwrap();
        assert_eq!(grid.node(2, 1), Some((1.0, 2.0)));
        assert_eq!(grid.node(3, 0), None);
        assert_eq!(grid.edge_count(), 2 * 2 + 3);
    }

    #[test]
    fn curvilinear_dimension_mismatch_rejected() {
        let grid = CurvilinearGrid {
            node_x: vec![0.0; 5],
            node_y: vec![0.0; 5],
            rows: 2,
            columns: 3,
        };
        assert!(matches!(
            grid.validate(),
            Err(KernelError::InvalidInput { .. })
        ));
    }
}

//! Rectangular mesh and grid builders.
//!
//! These produce the same node ordering and connectivity as the kernel's
//! uniform generator: nodes row-major with x varying fastest; each node
//! contributes its rightward edge, then its upward edge; faces are quads in
//! cell order. The test suite cross-checks builder output against kernel
//! output.

use crate::mesh2d::{CurvilinearGrid, Mesh2d};

/// A rectangular mesh of `nx` by `ny` nodes with cell sizes `dx`, `dy`.
#[must_use]
pub fn rectangular_mesh2d(nx: usize, ny: usize, dx: f64, dy: f64) -> Mesh2d {
    let mut mesh = Mesh2d::new();
    for iy in 0..ny {
        for ix in 0..nx {
            mesh.node_x.push(ix as f64 * dx);
            mesh.node_y.push(iy as f64 * dy);
        }
    }
    for iy in 0..ny {
        for ix in 0..nx {
            let n = (iy * nx + ix) as i32;
            if ix + 1 < nx {
                mesh.edge_nodes.push(n);
                mesh.edge_nodes.push(n + 1);
            }
            if iy + 1 < ny {
                mesh.edge_nodes.push(n);
                mesh.edge_nodes.push(n + nx as i32);
            }
        }
    }
    if nx > 0 && ny > 0 {
        for iy in 0..ny - 1 {
            for ix in 0..nx - 1 {
                let n = (iy * nx + ix) as i32;
                mesh.face_nodes
                    .extend_from_slice(&[n, n + 1, n + nx as i32 + 1, n + nx as i32]);
                mesh.nodes_per_face.push(4);
            }
        }
    }
    mesh
}

/// A rectangular curvilinear grid of `rows` by `columns` nodes with cell
/// sizes `dx`, `dy`.
#[must_use]
pub fn rectangular_curvilinear_grid(
    rows: usize,
    columns: usize,
    dx: f64,
    dy: f64,
) -> CurvilinearGrid {
    let mut grid = CurvilinearGrid {
        rows,
        columns,
        ..CurvilinearGrid::default()
    };
    for row in 0..rows {
        for column in 0..columns {
            grid.node_x.push(column as f64 * dx);
            grid.node_y.push(row as f64 * dy);
        }
    }
    grid
}

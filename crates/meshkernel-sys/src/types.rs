//! C-compatible types crossing the kernel boundary.
//!
//! Field order and widths match the native structs bit for bit; do not
//! reorder fields. Variable-length data is always passed as raw parallel
//! arrays plus an explicit count, never as a fat pointer.

use std::os::raw::{c_double, c_int};
use std::ptr;

/// Coordinate system of a kernel state: planar cartesian.
pub const PROJECTION_CARTESIAN: c_int = 0;
/// Coordinate system of a kernel state: spherical (geodetic).
pub const PROJECTION_SPHERICAL: c_int = 1;
/// Coordinate system of a kernel state: spherical with accurate computations.
pub const PROJECTION_SPHERICAL_ACCURATE: c_int = 2;

/// Flat geometry descriptor: three parallel coordinate channels plus the two
/// reserved sentinel doubles.
///
/// `values` is multiplexed by operation: z-coordinates, orthogonality or
/// smoothness values, or a 0.0/1.0 inclusion mask. The kernel reads
/// `num_coordinates` entries from each channel.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct GeometryListNative {
    /// Sentinel marking boundaries between independent sub-sequences.
    pub geometry_separator: c_double,
    /// Sentinel separating the inner ring(s) of a polygon from its outer ring.
    pub inner_outer_separator: c_double,
    /// Declared length of each coordinate channel.
    pub num_coordinates: c_int,
    pub x_coordinates: *mut c_double,
    pub y_coordinates: *mut c_double,
    pub values: *mut c_double,
}

impl GeometryListNative {
    /// Descriptor with null channels and zero count, for pure output slots.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            geometry_separator: 0.0,
            inner_outer_separator: 0.0,
            num_coordinates: 0,
            x_coordinates: ptr::null_mut(),
            y_coordinates: ptr::null_mut(),
            values: ptr::null_mut(),
        }
    }
}

impl Default for GeometryListNative {
    fn default() -> Self {
        Self::empty()
    }
}

/// Unstructured 2D mesh descriptor used by the two-phase transfer.
///
/// A dimension query fills only the four counts; a data fetch reads the
/// counts and fills the caller-allocated arrays. `edge_nodes` holds
/// `2 * num_edges` node indices, `face_nodes` holds `num_face_nodes` indices
/// and `nodes_per_face` holds `num_faces` run lengths into it.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct Mesh2dNative {
    pub edge_nodes: *mut c_int,
    pub face_nodes: *mut c_int,
    pub nodes_per_face: *mut c_int,
    pub node_x: *mut c_double,
    pub node_y: *mut c_double,
    pub num_nodes: c_int,
    pub num_edges: c_int,
    pub num_faces: c_int,
    pub num_face_nodes: c_int,
}

impl Mesh2dNative {
    /// Descriptor with null arrays and zero counts, ready for a dimension
    /// query.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            edge_nodes: ptr::null_mut(),
            face_nodes: ptr::null_mut(),
            nodes_per_face: ptr::null_mut(),
            node_x: ptr::null_mut(),
            node_y: ptr::null_mut(),
            num_nodes: 0,
            num_edges: 0,
            num_faces: 0,
            num_face_nodes: 0,
        }
    }
}

impl Default for Mesh2dNative {
    fn default() -> Self {
        Self::empty()
    }
}

/// Curvilinear grid descriptor: nodes addressed by (row, column).
///
/// `num_m` counts columns, `num_n` rows; both coordinate arrays hold
/// `num_m * num_n` values in row-major order.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct CurvilinearGridNative {
    pub node_x: *mut c_double,
    pub node_y: *mut c_double,
    pub num_m: c_int,
    pub num_n: c_int,
}

impl CurvilinearGridNative {
    /// Descriptor with null arrays and zero dimensions.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            node_x: ptr::null_mut(),
            node_y: ptr::null_mut(),
            num_m: 0,
            num_n: 0,
        }
    }
}

impl Default for CurvilinearGridNative {
    fn default() -> Self {
        Self::empty()
    }
}

/// Uniform rectangular grid generation parameters.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct MakeGridParametersNative {
    pub num_columns: c_int,
    pub num_rows: c_int,
    pub angle: c_double,
    pub origin_x: c_double,
    pub origin_y: c_double,
    pub block_size_x: c_double,
    pub block_size_y: c_double,
}

/// Orthogonalization tuning parameters.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct OrthogonalizationParametersNative {
    pub outer_iterations: c_int,
    pub boundary_iterations: c_int,
    pub inner_iterations: c_int,
    pub orthogonalization_to_smoothing_factor: c_double,
}

/// Transfinite-interpolation parameters for curvilinear grid generation.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct CurvilinearParametersNative {
    pub m_refinement: c_int,
    pub n_refinement: c_int,
    pub smoothing_iterations: c_int,
    pub smoothing_parameter: c_double,
    pub attraction_parameter: c_double,
}

/// Advancing-front parameters for spline-based curvilinear grids.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct SplinesToCurvilinearParametersNative {
    pub aspect_ratio: c_double,
    pub aspect_ratio_grow_factor: c_double,
    pub average_width: c_double,
    pub curvature_adapted_grid_spacing: c_int,
    pub grow_grid_outside: c_int,
    pub maximum_num_faces_in_uniform_part: c_int,
    pub nodes_on_top_of_each_other_tolerance: c_double,
    pub min_cosine_crossing_angles: c_double,
    pub check_front_collisions: c_int,
    pub remove_skinny_triangles: c_int,
}

/// Sample interpolation settings used by the refinement operations.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct InterpolationParametersNative {
    pub interpolation_type: c_int,
    pub averaging_method: c_int,
    pub minimum_num_points: c_int,
    pub relative_search_radius: c_double,
    pub max_refinement_iterations: c_int,
}

/// Sample-set settings used by refinement based on samples.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct SamplesRefineParametersNative {
    pub sample_vector_dimension: c_int,
    pub minimum_cell_size: c_double,
    pub directional_refinement: c_int,
    pub refinement_type: c_int,
    pub connect_hanging_nodes: c_int,
    pub account_for_samples_outside: c_int,
}

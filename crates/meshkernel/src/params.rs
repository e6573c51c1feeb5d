//! Flat configuration records passed by value to kernel operations.
//!
//! Defaults follow the kernel's documented defaults. Each record converts to
//! its `#[repr(C)]` twin at the call site; the records themselves own no
//! resources.

use meshkernel_sys::{
    CurvilinearParametersNative, InterpolationParametersNative, MakeGridParametersNative,
    OrthogonalizationParametersNative, SamplesRefineParametersNative,
    SplinesToCurvilinearParametersNative,
};
use serde::{Deserialize, Serialize};

/// Shape of a uniform rectangular grid.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MakeGridParameters {
    /// Number of cell columns.
    pub num_columns: i32,
    /// Number of cell rows.
    pub num_rows: i32,
    /// Rotation angle of the grid, in degrees.
    pub angle: f64,
    pub origin_x: f64,
    pub origin_y: f64,
    /// Cell size along the x axis.
    pub block_size_x: f64,
    /// Cell size along the y axis.
    pub block_size_y: f64,
}

impl Default for MakeGridParameters {
    fn default() -> Self {
        Self {
            num_columns: 3,
            num_rows: 3,
            angle: 0.0,
            origin_x: 0.0,
            origin_y: 0.0,
            block_size_x: 10.0,
            block_size_y: 10.0,
        }
    }
}

impl MakeGridParameters {
    /// Grid of `num_columns` by `num_rows` square cells of size `block_size`
    /// anchored at the origin.
    #[must_use]
    pub fn square_cells(num_columns: i32, num_rows: i32, block_size: f64) -> Self {
        Self {
            num_columns,
            num_rows,
            block_size_x: block_size,
            block_size_y: block_size,
            ..Self::default()
        }
    }

    pub(crate) fn to_native(self) -> MakeGridParametersNative {
        MakeGridParametersNative {
            num_columns: self.num_columns,
            num_rows: self.num_rows,
            angle: self.angle,
            origin_x: self.origin_x,
            origin_y: self.origin_y,
            block_size_x: self.block_size_x,
            block_size_y: self.block_size_y,
        }
    }
}

/// Orthogonalization tuning.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OrthogonalizationParameters {
    pub outer_iterations: i32,
    pub boundary_iterations: i32,
    pub inner_iterations: i32,
    /// Blend between orthogonalization (1.0) and smoothing (0.0).
    pub orthogonalization_to_smoothing_factor: f64,
}

impl Default for OrthogonalizationParameters {
    fn default() -> Self {
        Self {
            outer_iterations: 2,
            boundary_iterations: 25,
            inner_iterations: 25,
            orthogonalization_to_smoothing_factor: 0.975,
        }
    }
}

impl OrthogonalizationParameters {
    pub(crate) fn to_native(self) -> OrthogonalizationParametersNative {
        OrthogonalizationParametersNative {
            outer_iterations: self.outer_iterations,
            boundary_iterations: self.boundary_iterations,
            inner_iterations: self.inner_iterations,
            orthogonalization_to_smoothing_factor: self.orthogonalization_to_smoothing_factor,
        }
    }
}

/// Transfinite interpolation settings for spline-based curvilinear grids.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CurvilinearParameters {
    /// Refinement along the m (column) direction.
    pub m_refinement: i32,
    /// Refinement along the n (row) direction.
    pub n_refinement: i32,
    pub smoothing_iterations: i32,
    pub smoothing_parameter: f64,
    pub attraction_parameter: f64,
}

impl Default for CurvilinearParameters {
    fn default() -> Self {
        Self {
            m_refinement: 2000,
            n_refinement: 40,
            smoothing_iterations: 10,
            smoothing_parameter: 0.5,
            attraction_parameter: 0.0,
        }
    }
}

impl CurvilinearParameters {
    pub(crate) fn to_native(self) -> CurvilinearParametersNative {
        CurvilinearParametersNative {
            m_refinement: self.m_refinement,
            n_refinement: self.n_refinement,
            smoothing_iterations: self.smoothing_iterations,
            smoothing_parameter: self.smoothing_parameter,
            attraction_parameter: self.attraction_parameter,
        }
    }
}

/// Advancing-front settings for orthogonal grids grown from splines.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SplinesToCurvilinearParameters {
    pub aspect_ratio: f64,
    pub aspect_ratio_grow_factor: f64,
    pub average_width: f64,
    pub curvature_adapted_grid_spacing: bool,
    pub grow_grid_outside: bool,
    pub maximum_num_faces_in_uniform_part: i32,
    pub nodes_on_top_of_each_other_tolerance: f64,
    pub min_cosine_crossing_angles: f64,
    pub check_front_collisions: bool,
    pub remove_skinny_triangles: bool,
}

impl Default for SplinesToCurvilinearParameters {
    fn default() -> Self {
        Self {
            aspect_ratio: 0.1,
            aspect_ratio_grow_factor: 1.1,
            average_width: 500.0,
            curvature_adapted_grid_spacing: true,
            grow_grid_outside: true,
            maximum_num_faces_in_uniform_part: 5,
            nodes_on_top_of_each_other_tolerance: 1e-4,
            min_cosine_crossing_angles: 0.95,
            check_front_collisions: false,
            remove_skinny_triangles: false,
        }
    }
}

impl SplinesToCurvilinearParameters {
    pub(crate) fn to_native(self) -> SplinesToCurvilinearParametersNative {
        SplinesToCurvilinearParametersNative {
            aspect_ratio: self.aspect_ratio,
            aspect_ratio_grow_factor: self.aspect_ratio_grow_factor,
            average_width: self.average_width,
            curvature_adapted_grid_spacing: i32::from(self.curvature_adapted_grid_spacing),
            grow_grid_outside: i32::from(self.grow_grid_outside),
            maximum_num_faces_in_uniform_part: self.maximum_num_faces_in_uniform_part,
            nodes_on_top_of_each_other_tolerance: self.nodes_on_top_of_each_other_tolerance,
            min_cosine_crossing_angles: self.min_cosine_crossing_angles,
            check_front_collisions: i32::from(self.check_front_collisions),
            remove_skinny_triangles: i32::from(self.remove_skinny_triangles),
        }
    }
}

/// Sample interpolation settings used by refinement.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct InterpolationParameters {
    pub interpolation_type: i32,
    pub averaging_method: i32,
    pub minimum_num_points: i32,
    pub relative_search_radius: f64,
    pub max_refinement_iterations: i32,
}

impl Default for InterpolationParameters {
    fn default() -> Self {
        Self {
            interpolation_type: 1,
            averaging_method: 1,
            minimum_num_points: 1,
            relative_search_radius: 1.01,
            max_refinement_iterations: 10,
        }
    }
}

impl InterpolationParameters {
    pub(crate) fn to_native(self) -> InterpolationParametersNative {
        InterpolationParametersNative {
            interpolation_type: self.interpolation_type,
            averaging_method: self.averaging_method,
            minimum_num_points: self.minimum_num_points,
            relative_search_radius: self.relative_search_radius,
            max_refinement_iterations: self.max_refinement_iterations,
        }
    }
}

/// Sample-set settings for refinement based on samples.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SamplesRefineParameters {
    pub sample_vector_dimension: i32,
    pub minimum_cell_size: f64,
    pub directional_refinement: bool,
    pub refinement_type: i32,
    pub connect_hanging_nodes: bool,
    pub account_for_samples_outside: bool,
}

impl Default for SamplesRefineParameters {
    fn default() -> Self {
        Self {
            sample_vector_dimension: 1,
            minimum_cell_size: 500.0,
            directional_refinement: false,
            refinement_type: 2,
            connect_hanging_nodes: true,
            account_for_samples_outside: false,
        }
    }
}

impl SamplesRefineParameters {
    pub(crate) fn to_native(self) -> SamplesRefineParametersNative {
        SamplesRefineParametersNative {
            sample_vector_dimension: self.sample_vector_dimension,
            minimum_cell_size: self.minimum_cell_size,
            directional_refinement: i32::from(self.directional_refinement),
            refinement_type: self.refinement_type,
            connect_hanging_nodes: i32::from(self.connect_hanging_nodes),
            account_for_samples_outside: i32::from(self.account_for_samples_outside),
        }
    }
}

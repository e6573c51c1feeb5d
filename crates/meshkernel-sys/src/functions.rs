//! Entry-point table and dynamic loading of the native kernel.
//!
//! The kernel uses a flat calling convention: one exported symbol per
//! operation, integer status return. All symbols are resolved once at load
//! time into a [`KernelFunctions`] table of plain function pointers, so a
//! missing entry point fails fast instead of at first use.
//!
//! Library resolution follows platform conventions (`lib{name}.so`,
//! `lib{name}.dylib`, `{name}.dll`) over a configurable search-path list,
//! with the `MESHKERNEL_LIBRARY_PATH` environment variable taking
//! precedence.

use std::env;
use std::os::raw::{c_double, c_int};
use std::path::{Path, PathBuf};

use libloading::Library;
use thiserror::Error;

use crate::types::{
    CurvilinearGridNative, CurvilinearParametersNative, GeometryListNative,
    InterpolationParametersNative, MakeGridParametersNative, Mesh2dNative,
    OrthogonalizationParametersNative, SamplesRefineParametersNative,
    SplinesToCurvilinearParametersNative,
};

/// Base name of the native kernel library, without platform decoration.
pub const LIBRARY_BASE_NAME: &str = "MeshKernelApi";

/// Environment variable overriding library resolution with an explicit path.
pub const LIBRARY_PATH_ENV: &str = "MESHKERNEL_LIBRARY_PATH";

/// Library loading errors.
#[derive(Debug, Error)]
pub enum LoadError {
    /// No candidate file was found in any search path.
    #[error("kernel library `{name}` not found in any search path")]
    LibraryNotFound { name: String },

    /// The dynamic loader rejected the library file.
    #[error("failed to load kernel library `{path}`: {message}")]
    LoadFailed { path: PathBuf, message: String },

    /// The library is missing one of the required entry points.
    #[error("entry point `{symbol}` not found in kernel library")]
    SymbolNotFound { symbol: &'static str },
}

macro_rules! kernel_functions {
    (
        $(
            $(#[$doc:meta])*
            $field:ident : $symbol:literal => $sig:ty;
        )+
    ) => {
        /// Resolved entry points of the native kernel.
        ///
        /// Every field is a raw `extern "C"` function pointer; calling one is
        /// `unsafe` and subject to the contract documented on the crate root.
        #[derive(Clone, Copy)]
        pub struct KernelFunctions {
            $( $(#[$doc])* pub $field: $sig, )+
        }

        impl KernelFunctions {
            fn resolve(library: &Library) -> Result<Self, LoadError> {
                unsafe {
                    Ok(Self {
                        $(
                            $field: *library
                                .get::<$sig>($symbol.as_bytes())
                                .map_err(|_| LoadError::SymbolNotFound { symbol: $symbol })?,
                        )+
                    })
                }
            }
        }

        impl std::fmt::Debug for KernelFunctions {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.debug_struct("KernelFunctions").finish_non_exhaustive()
            }
        }
    };
}

kernel_functions! {
    // -- state management -------------------------------------------------

    /// Create a new kernel state for the given projection, writing its id.
    allocate_state: "mkernel_allocate_state"
        => unsafe extern "C" fn(c_int, *mut c_int) -> c_int;
    /// Deallocate a kernel state.
    deallocate_state: "mkernel_deallocate_state"
        => unsafe extern "C" fn(c_int) -> c_int;
    /// Replace the mesh held by a kernel state.
    mesh2d_set: "mkernel_mesh2d_set"
        => unsafe extern "C" fn(c_int, *const Mesh2dNative) -> c_int;
    /// Query mesh dimensions; fills only the counts.
    mesh2d_get_dimensions: "mkernel_mesh2d_get_dimensions"
        => unsafe extern "C" fn(c_int, *mut Mesh2dNative) -> c_int;
    /// Fetch mesh data into caller-allocated arrays sized per the counts.
    mesh2d_get_data: "mkernel_mesh2d_get_data"
        => unsafe extern "C" fn(c_int, *mut Mesh2dNative) -> c_int;

    // -- node operations --------------------------------------------------

    mesh2d_insert_node: "mkernel_mesh2d_insert_node"
        => unsafe extern "C" fn(c_int, c_double, c_double, *mut c_int) -> c_int;
    mesh2d_delete_node: "mkernel_mesh2d_delete_node"
        => unsafe extern "C" fn(c_int, c_int) -> c_int;
    mesh2d_move_node: "mkernel_mesh2d_move_node"
        => unsafe extern "C" fn(c_int, c_double, c_double, c_int) -> c_int;
    mesh2d_merge_two_nodes: "mkernel_mesh2d_merge_two_nodes"
        => unsafe extern "C" fn(c_int, c_int, c_int) -> c_int;
    /// Merge nodes closer than the kernel tolerance inside a polygon.
    mesh2d_merge_nodes: "mkernel_mesh2d_merge_nodes"
        => unsafe extern "C" fn(c_int, *const GeometryListNative) -> c_int;
    /// Index of the node nearest to a point, within a search radius.
    mesh2d_get_node_index: "mkernel_mesh2d_get_node_index"
        => unsafe extern "C" fn(c_int, c_double, c_double, c_double, *mut c_int) -> c_int;
    /// Coordinates of the node nearest to a point, within a search radius.
    mesh2d_get_closest_node: "mkernel_mesh2d_get_closest_node"
        => unsafe extern "C" fn(
            c_int, c_double, c_double, c_double, *mut c_double, *mut c_double,
        ) -> c_int;

    // -- edge operations --------------------------------------------------

    mesh2d_insert_edge: "mkernel_mesh2d_insert_edge"
        => unsafe extern "C" fn(c_int, c_int, c_int, *mut c_int) -> c_int;
    /// Delete the edge nearest to the input point.
    mesh2d_delete_edge: "mkernel_delete_edge_mesh2d"
        => unsafe extern "C" fn(c_int, *const GeometryListNative) -> c_int;
    /// Find the edge nearest to the input point.
    mesh2d_find_edge: "mkernel_find_edge_mesh2d"
        => unsafe extern "C" fn(c_int, *const GeometryListNative, *mut c_int) -> c_int;
    mesh2d_flip_edges: "mkernel_mesh2d_flip_edges"
        => unsafe extern "C" fn(
            c_int, c_int, c_int, *const GeometryListNative, *const GeometryListNative,
        ) -> c_int;

    // -- mesh-wide operations ---------------------------------------------

    /// Delete mesh inside (or outside) a polygon, per deletion option.
    mesh2d_delete: "mkernel_mesh2d_delete"
        => unsafe extern "C" fn(c_int, *const GeometryListNative, c_int, c_int) -> c_int;
    mesh2d_count_mesh_boundaries_as_polygons: "mkernel_mesh2d_count_mesh_boundaries_as_polygons"
        => unsafe extern "C" fn(c_int, *mut c_int) -> c_int;
    mesh2d_get_mesh_boundaries_as_polygons: "mkernel_mesh2d_get_mesh_boundaries_as_polygons"
        => unsafe extern "C" fn(c_int, *mut GeometryListNative) -> c_int;
    mesh2d_refine_based_on_samples: "mkernel_mesh2d_refine_based_on_samples"
        => unsafe extern "C" fn(
            c_int,
            *const GeometryListNative,
            *const InterpolationParametersNative,
            *const SamplesRefineParametersNative,
        ) -> c_int;
    mesh2d_refine_based_on_polygon: "mkernel_mesh2d_refine_based_on_polygon"
        => unsafe extern "C" fn(
            c_int, *const GeometryListNative, *const InterpolationParametersNative,
        ) -> c_int;
    /// Triangulate the interior of a polygon.
    mesh2d_make_mesh_from_polygon: "mkernel_mesh2d_make_mesh_from_polygon"
        => unsafe extern "C" fn(c_int, *const GeometryListNative) -> c_int;
    /// Triangulate a sample point set.
    mesh2d_make_mesh_from_samples: "mkernel_mesh2d_make_mesh_from_samples"
        => unsafe extern "C" fn(c_int, *const GeometryListNative) -> c_int;

    // -- orthogonalization ------------------------------------------------

    /// One-shot orthogonalization.
    compute_orthogonalization: "mkernel_compute_orthogonalization_mesh2d"
        => unsafe extern "C" fn(
            c_int,
            c_int,
            *const OrthogonalizationParametersNative,
            *const GeometryListNative,
            *const GeometryListNative,
        ) -> c_int;
    /// First call of the interactive orthogonalization sequence.
    initialize_orthogonalization: "mkernel_mesh2d_initialize_orthogonalization"
        => unsafe extern "C" fn(
            c_int,
            c_int,
            *const OrthogonalizationParametersNative,
            *const GeometryListNative,
            *const GeometryListNative,
        ) -> c_int;
    prepare_outer_iteration_orthogonalization: "mkernel_prepare_outer_iteration_orthogonalization_mesh2d"
        => unsafe extern "C" fn(c_int) -> c_int;
    compute_inner_orthogonalization_iteration: "mkernel_compute_inner_ortogonalization_iteration_mesh2d"
        => unsafe extern "C" fn(c_int) -> c_int;
    finalize_inner_orthogonalization_iteration: "mkernel_finalize_inner_ortogonalization_iteration_mesh2d"
        => unsafe extern "C" fn(c_int) -> c_int;
    delete_orthogonalization: "mkernel_delete_orthogonalization_mesh2d"
        => unsafe extern "C" fn(c_int) -> c_int;

    // -- curvilinear grids ------------------------------------------------

    /// Generate a uniform rectangular curvilinear grid.
    curvilinear_make_uniform: "mkernel_curvilinear_make_uniform"
        => unsafe extern "C" fn(
            c_int, *const MakeGridParametersNative, *const GeometryListNative,
        ) -> c_int;
    curvilinear_get_dimensions: "mkernel_curvilinear_get_dimensions"
        => unsafe extern "C" fn(c_int, *mut CurvilinearGridNative) -> c_int;
    curvilinear_get_data: "mkernel_curvilinear_get_data"
        => unsafe extern "C" fn(c_int, *mut CurvilinearGridNative) -> c_int;
    /// Spline intermediate-point generation; stateless, no kernel id.
    get_splines: "mkernel_get_splines"
        => unsafe extern "C" fn(
            *const GeometryListNative, *mut GeometryListNative, c_int,
        ) -> c_int;
    curvilinear_compute_transfinite_from_splines: "mkernel_curvilinear_compute_transfinite_from_splines"
        => unsafe extern "C" fn(
            c_int, *const GeometryListNative, *const CurvilinearParametersNative,
        ) -> c_int;
    curvilinear_compute_orthogonal_grid_from_splines: "mkernel_curvilinear_compute_orthogonal_grid_from_splines"
        => unsafe extern "C" fn(
            c_int,
            *const GeometryListNative,
            *const CurvilinearParametersNative,
            *const SplinesToCurvilinearParametersNative,
        ) -> c_int;
    curvilinear_compute_transfinite_from_polygon: "mkernel_curvilinear_compute_transfinite_from_polygon"
        => unsafe extern "C" fn(
            c_int, *const GeometryListNative, c_int, c_int, c_int, c_int,
        ) -> c_int;
    curvilinear_compute_transfinite_from_triangle: "mkernel_curvilinear_compute_transfinite_from_triangle"
        => unsafe extern "C" fn(c_int, *const GeometryListNative, c_int, c_int, c_int) -> c_int;
    curvilinear_convert_to_mesh2d: "mkernel_curvilinear_convert_to_mesh2d"
        => unsafe extern "C" fn(c_int) -> c_int;

    // -- polygon operations -----------------------------------------------

    polygon_count_offset: "mkernel_polygon_count_offset"
        => unsafe extern "C" fn(
            c_int, *const GeometryListNative, c_int, c_double, *mut c_int,
        ) -> c_int;
    polygon_get_offset: "mkernel_polygon_get_offset"
        => unsafe extern "C" fn(
            c_int, *const GeometryListNative, c_int, c_double, *mut GeometryListNative,
        ) -> c_int;
    polygon_count_refine: "mkernel_polygon_count_refine"
        => unsafe extern "C" fn(
            c_int, *const GeometryListNative, c_int, c_int, c_double, *mut c_int,
        ) -> c_int;
    polygon_refine: "mkernel_polygon_refine"
        => unsafe extern "C" fn(
            c_int, *const GeometryListNative, c_int, c_int, c_double, *mut GeometryListNative,
        ) -> c_int;
    /// Inclusion mask of points against polygons, in the values channel.
    get_points_in_polygon: "mkernel_get_points_in_polygon"
        => unsafe extern "C" fn(
            c_int, *const GeometryListNative, *const GeometryListNative, *mut GeometryListNative,
        ) -> c_int;
    count_nodes_in_polygons: "mkernel_count_nodes_in_polygons"
        => unsafe extern "C" fn(c_int, *const GeometryListNative, c_int, *mut c_int) -> c_int;
    get_nodes_in_polygons: "mkernel_get_nodes_in_polygons"
        => unsafe extern "C" fn(c_int, *const GeometryListNative, c_int, *mut c_int) -> c_int;

    // -- mesh quality -----------------------------------------------------

    /// Per-edge orthogonality, in the values channel.
    get_orthogonality: "mkernel_get_orthogonality_mesh2d"
        => unsafe extern "C" fn(c_int, *mut GeometryListNative) -> c_int;
    /// Per-edge smoothness, in the values channel.
    get_smoothness: "mkernel_get_smoothness_mesh2d"
        => unsafe extern "C" fn(c_int, *mut GeometryListNative) -> c_int;

    // -- reserved sentinels -----------------------------------------------

    /// The double used as missing value and geometry separator.
    get_separator: "mkernel_get_separator"
        => unsafe extern "C" fn() -> c_double;
    /// The double separating inner from outer polygon rings.
    get_inner_outer_separator: "mkernel_get_inner_outer_separator"
        => unsafe extern "C" fn() -> c_double;

    // -- 1d-2d contacts ---------------------------------------------------

    contacts_compute_single: "mkernel_contacts_compute_single"
        => unsafe extern "C" fn(c_int, *const c_int, *const GeometryListNative) -> c_int;
    contacts_compute_multiple: "mkernel_contacts_compute_multiple"
        => unsafe extern "C" fn(c_int, *const c_int) -> c_int;
    contacts_compute_with_polygons: "mkernel_contacts_compute_with_polygons"
        => unsafe extern "C" fn(c_int, *const c_int, *const GeometryListNative) -> c_int;
    contacts_compute_with_points: "mkernel_contacts_compute_with_points"
        => unsafe extern "C" fn(c_int, *const c_int, *const GeometryListNative) -> c_int;
    contacts_compute_boundary: "mkernel_contacts_compute_boundary"
        => unsafe extern "C" fn(
            c_int, *const c_int, *const GeometryListNative, c_double,
        ) -> c_int;
}

/// A loaded kernel library together with its resolved entry points.
///
/// The `Library` handle is kept alive for as long as the table is in use;
/// dropping `KernelLibrary` unloads the kernel.
#[derive(Debug)]
pub struct KernelLibrary {
    functions: KernelFunctions,
    _library: Option<Library>,
}

impl KernelLibrary {
    /// Load the kernel using default resolution.
    ///
    /// Checks the `MESHKERNEL_LIBRARY_PATH` environment variable first, then
    /// searches the platform default paths for the decorated library name.
    pub fn load_default() -> Result<Self, LoadError> {
        if let Some(path) = env::var_os(LIBRARY_PATH_ENV) {
            return Self::load_from(Path::new(&path));
        }
        Self::load_with_search_paths(&default_search_paths())
    }

    /// Load the kernel from an explicit library file.
    pub fn load_from(path: &Path) -> Result<Self, LoadError> {
        let library = unsafe {
            Library::new(path).map_err(|e| LoadError::LoadFailed {
                path: path.to_path_buf(),
                message: e.to_string(),
            })?
        };
        let functions = KernelFunctions::resolve(&library)?;
        Ok(Self {
            functions,
            _library: Some(library),
        })
    }

    /// Load the kernel by searching the given paths for the platform-named
    /// library file.
    pub fn load_with_search_paths(paths: &[PathBuf]) -> Result<Self, LoadError> {
        let path = resolve_library_path(LIBRARY_BASE_NAME, paths).ok_or_else(|| {
            LoadError::LibraryNotFound {
                name: LIBRARY_BASE_NAME.to_string(),
            }
        })?;
        Self::load_from(&path)
    }

    /// The resolved entry-point table.
    #[must_use]
    pub fn functions(&self) -> &KernelFunctions {
        &self.functions
    }
}

#[cfg(feature = "stub-kernel")]
impl KernelLibrary {
    /// Table backed by the in-process stub kernel; no library is loaded.
    #[must_use]
    pub fn stub() -> Self {
        Self {
            functions: crate::stub::functions(),
            _library: None,
        }
    }
}

/// Platform default library search paths, current directory first.
#[must_use]
pub fn default_search_paths() -> Vec<PathBuf> {
    let mut paths = Vec::new();

    #[cfg(target_os = "linux")]
    {
        paths.push(PathBuf::from("/usr/lib"));
        paths.push(PathBuf::from("/usr/local/lib"));
        paths.push(PathBuf::from("/lib"));

        if cfg!(target_pointer_width = "64") {
            paths.push(PathBuf::from("/usr/lib64"));
            paths.push(PathBuf::from("/lib64"));
        }
    }

    #[cfg(target_os = "macos")]
    {
        paths.push(PathBuf::from("/usr/lib"));
        paths.push(PathBuf::from("/usr/local/lib"));
        paths.push(PathBuf::from("/opt/homebrew/lib"));
    }

    #[cfg(target_os = "windows")]
    {
        paths.push(PathBuf::from("C:\\Windows\\System32"));
        if let Ok(system_root) = env::var("SystemRoot") {
            paths.push(PathBuf::from(format!("{system_root}\\System32")));
        }
    }

    if let Ok(cwd) = env::current_dir() {
        paths.insert(0, cwd);
    }

    paths
}

/// Resolve a library base name to a file path using platform naming
/// conventions over the given search paths.
fn resolve_library_path(name: &str, search_paths: &[PathBuf]) -> Option<PathBuf> {
    let path = Path::new(name);
    if path.is_absolute() && path.exists() {
        return Some(path.to_path_buf());
    }

    let extensions: &[&str] = if cfg!(target_os = "windows") {
        &["dll"]
    } else if cfg!(target_os = "macos") {
        &["dylib", "so"]
    } else {
        &["so"]
    };

    let prefixes: &[&str] = if cfg!(target_os = "windows") {
        &["", "lib"]
    } else {
        &["lib", ""]
    };

    for search_path in search_paths {
        for prefix in prefixes {
            for ext in extensions {
                let full_path = search_path.join(format!("{prefix}{name}.{ext}"));
                if full_path.exists() {
                    return Some(full_path);
                }
            }
        }
    }

    None
}

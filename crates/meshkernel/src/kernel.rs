//! Handle registry and call dispatcher.
//!
//! [`MeshKernel`] owns the loaded kernel and the table of live state
//! handles. Every operation follows the same shape: reject dead handles
//! before touching the kernel, pack inputs into scoped foreign buffers,
//! invoke the entry point, decode the integer status, unpack outputs, and
//! let the buffer guards release on the way out, on success and on every
//! failure path alike.
//!
//! Calls are synchronous and blocking. Distinct handles may be driven from
//! different threads; operations against one handle must be serialized by
//! the caller, the registry lock only protects handle bookkeeping.

use std::collections::HashSet;
use std::os::raw::c_int;
use std::path::Path;
use std::sync::{Mutex, MutexGuard, PoisonError};

use meshkernel_sys::{
    KernelFunctions, KernelLibrary, Mesh2dNative, PROJECTION_CARTESIAN, PROJECTION_SPHERICAL,
    PROJECTION_SPHERICAL_ACCURATE,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::error::{KernelError, Result};
use crate::geometry::{GeometryList, PackedGeometry, Separators};
use crate::mesh2d::{
    CurvilinearBuffers, CurvilinearDimensions, CurvilinearGrid, Mesh2d, Mesh2dBuffers,
    Mesh2dDimensions,
};
use crate::ortho::OrthogonalizationSession;
use crate::params::{
    CurvilinearParameters, InterpolationParameters, MakeGridParameters,
    OrthogonalizationParameters, SamplesRefineParameters, SplinesToCurvilinearParameters,
};
use crate::scoped::ScopedBuffer;

/// Coordinate reference of a kernel state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Projection {
    /// Planar cartesian coordinates.
    Cartesian,
    /// Spherical (geodetic) coordinates.
    Spherical,
    /// Spherical coordinates with accurate computations.
    SphericalAccurate,
}

impl Projection {
    fn to_native(self) -> c_int {
        match self {
            Self::Cartesian => PROJECTION_CARTESIAN,
            Self::Spherical => PROJECTION_SPHERICAL,
            Self::SphericalAccurate => PROJECTION_SPHERICAL_ACCURATE,
        }
    }
}

/// How mesh boundaries snap to land boundaries during orthogonalization and
/// edge flipping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProjectToLandBoundary {
    No = 0,
    ToOriginalNetBoundary = 1,
    OuterMeshBoundaryToLandBoundary = 2,
    InnerAndOuterMeshBoundaryToLandBoundary = 3,
    WholeMesh = 4,
}

impl ProjectToLandBoundary {
    pub(crate) fn to_native(self) -> c_int {
        self as c_int
    }
}

/// Which mesh parts a delete-in-polygon removes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DeletionOption {
    AllNodesInside = 0,
    FacesWithIncludedCircumcenters = 1,
    AllCompleteFacesInside = 2,
}

impl DeletionOption {
    fn to_native(self) -> c_int {
        self as c_int
    }
}

/// Opaque identifier of a live kernel state.
///
/// Handles are issued by [`MeshKernel::allocate_state`] and stay valid until
/// released; a released or forged handle is rejected with
/// [`KernelError::InvalidHandle`] before any native invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct KernelHandle(i32);

impl KernelHandle {
    /// Wrap a raw kernel id. The id is not validated here; operations check
    /// liveness against the registry.
    #[must_use]
    pub fn from_raw(id: i32) -> Self {
        Self(id)
    }

    /// The raw kernel id.
    #[must_use]
    pub fn as_raw(self) -> i32 {
        self.0
    }
}

/// The loaded kernel: session registry plus one dispatch method per native
/// operation.
#[derive(Debug)]
pub struct MeshKernel {
    library: KernelLibrary,
    live: Mutex<HashSet<i32>>,
    separators: Separators,
}

impl MeshKernel {
    /// Wrap an already loaded kernel library.
    ///
    /// The two reserved sentinel doubles are fetched here, once, and applied
    /// uniformly by every geometry-producing or -consuming operation.
    #[must_use]
    pub fn new(library: KernelLibrary) -> Self {
        let functions = library.functions();
        let separators = Separators {
            geometry: unsafe { (functions.get_separator)() },
            inner_outer: unsafe { (functions.get_inner_outer_separator)() },
        };
        debug!(
            geometry = separators.geometry,
            inner_outer = separators.inner_outer,
            "fetched kernel separators"
        );
        Self {
            library,
            live: Mutex::new(HashSet::new()),
            separators,
        }
    }

    /// Load the kernel library through default resolution and wrap it.
    pub fn load_default() -> Result<Self> {
        Ok(Self::new(KernelLibrary::load_default()?))
    }

    /// Load the kernel from an explicit library file and wrap it.
    pub fn load_from(path: &Path) -> Result<Self> {
        Ok(Self::new(KernelLibrary::load_from(path)?))
    }

    /// The sentinel pair reported by this kernel.
    #[must_use]
    pub fn separators(&self) -> Separators {
        self.separators
    }

    /// Geometry list with no coordinates, using this kernel's sentinels.
    #[must_use]
    pub fn empty_geometry(&self) -> GeometryList {
        GeometryList::empty(self.separators)
    }

    pub(crate) fn functions(&self) -> &KernelFunctions {
        self.library.functions()
    }

    fn live_handles(&self) -> MutexGuard<'_, HashSet<i32>> {
        self.live.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Decode an integer status; nonzero passes through opaquely.
    pub(crate) fn check(&self, operation: &'static str, status: c_int) -> Result<()> {
        trace!(operation, status, "kernel call completed");
        if status == 0 {
            Ok(())
        } else {
            Err(KernelError::NativeFailure {
                operation,
                code: status,
            })
        }
    }

    /// Reject unknown or released handles before any native invocation.
    pub(crate) fn ensure_live(&self, handle: KernelHandle) -> Result<()> {
        if self.live_handles().contains(&handle.0) {
            Ok(())
        } else {
            Err(KernelError::InvalidHandle(handle.0))
        }
    }

    // -- session lifecycle -------------------------------------------------

    /// Create a new kernel state and register its handle.
    pub fn allocate_state(&self, projection: Projection) -> Result<KernelHandle> {
        let mut id: c_int = 0;
        let status = unsafe { (self.functions().allocate_state)(projection.to_native(), &mut id) };
        self.check("mkernel_allocate_state", status)?;
        let inserted = self.live_handles().insert(id);
        debug_assert!(inserted, "kernel reissued live handle {id}");
        debug!(id, ?projection, "allocated kernel state");
        Ok(KernelHandle(id))
    }

    /// Release a kernel state. Releasing twice, or releasing a handle that
    /// was never issued, yields [`KernelError::InvalidHandle`].
    pub fn deallocate_state(&self, handle: KernelHandle) -> Result<()> {
        // The id leaves the registry before the native release so a failed
        // release cannot leave a reusable handle behind.
        if !self.live_handles().remove(&handle.0) {
            return Err(KernelError::InvalidHandle(handle.0));
        }
        let status = unsafe { (self.functions().deallocate_state)(handle.0) };
        debug!(id = handle.0, "released kernel state");
        self.check("mkernel_deallocate_state", status)
    }

    /// Allocate a state that is released when the guard drops; explicit
    /// [`ScopedState::release`] remains the primary contract.
    pub fn scoped_state(&self, projection: Projection) -> Result<ScopedState<'_>> {
        let handle = self.allocate_state(projection)?;
        Ok(ScopedState {
            kernel: self,
            handle,
            released: false,
        })
    }

    /// Begin an interactive orthogonalization sequence on a state.
    #[must_use]
    pub fn orthogonalization(&self, handle: KernelHandle) -> OrthogonalizationSession<'_> {
        OrthogonalizationSession::new(self, handle)
    }

    // -- bulk mesh exchange ------------------------------------------------

    /// Replace the mesh held by a state.
    pub fn mesh2d_set(&self, handle: KernelHandle, mesh: &Mesh2d) -> Result<()> {
        self.ensure_live(handle)?;
        mesh.validate()?;
        let buffers = Mesh2dBuffers::from_mesh(mesh)?;
        let status = unsafe { (self.functions().mesh2d_set)(handle.0, buffers.native_ptr()) };
        self.check("mkernel_mesh2d_set", status)
    }

    /// First phase of the mesh transfer: counts only.
    pub fn mesh2d_get_dimensions(&self, handle: KernelHandle) -> Result<Mesh2dDimensions> {
        self.ensure_live(handle)?;
        let mut native = Mesh2dNative::empty();
        let status =
            unsafe { (self.functions().mesh2d_get_dimensions)(handle.0, &mut native) };
        self.check("mkernel_mesh2d_get_dimensions", status)?;
        Ok(Mesh2dDimensions {
            node_count: native.num_nodes.max(0) as usize,
            edge_count: native.num_edges.max(0) as usize,
            face_count: native.num_faces.max(0) as usize,
            face_node_count: native.num_face_nodes.max(0) as usize,
        })
    }

    /// Both phases of the mesh transfer: dimension query, then a fetch into
    /// arrays of exactly the reported lengths.
    pub fn mesh2d_get_data(&self, handle: KernelHandle) -> Result<Mesh2d> {
        let dims = self.mesh2d_get_dimensions(handle)?;
        let mut buffers = Mesh2dBuffers::sized(dims)?;
        let status =
            unsafe { (self.functions().mesh2d_get_data)(handle.0, buffers.native_mut_ptr()) };
        self.check("mkernel_mesh2d_get_data", status)?;
        Ok(buffers.into_mesh(dims))
    }

    // -- node operations ---------------------------------------------------

    /// Insert a node, returning its index.
    pub fn mesh2d_insert_node(&self, handle: KernelHandle, x: f64, y: f64) -> Result<usize> {
        self.ensure_live(handle)?;
        let mut index: c_int = 0;
        let status =
            unsafe { (self.functions().mesh2d_insert_node)(handle.0, x, y, &mut index) };
        self.check("mkernel_mesh2d_insert_node", status)?;
        Ok(index.max(0) as usize)
    }

    /// Delete the node at `index`.
    pub fn mesh2d_delete_node(&self, handle: KernelHandle, index: usize) -> Result<()> {
        self.ensure_live(handle)?;
        let status =
            unsafe { (self.functions().mesh2d_delete_node)(handle.0, index as c_int) };
        self.check("mkernel_mesh2d_delete_node", status)
    }

    /// Move the node at `index` to a new position.
    pub fn mesh2d_move_node(
        &self,
        handle: KernelHandle,
        x: f64,
        y: f64,
        index: usize,
    ) -> Result<()> {
        self.ensure_live(handle)?;
        let status =
            unsafe { (self.functions().mesh2d_move_node)(handle.0, x, y, index as c_int) };
        self.check("mkernel_mesh2d_move_node", status)
    }

    /// Merge node `from` into node `into`.
    pub fn mesh2d_merge_two_nodes(
        &self,
        handle: KernelHandle,
        from: usize,
        into: usize,
    ) -> Result<()> {
        self.ensure_live(handle)?;
        let status = unsafe {
            (self.functions().mesh2d_merge_two_nodes)(handle.0, from as c_int, into as c_int)
        };
        self.check("mkernel_mesh2d_merge_two_nodes", status)
    }

    /// Merge nodes within the kernel tolerance inside `polygon`.
    pub fn mesh2d_merge_nodes(&self, handle: KernelHandle, polygon: &GeometryList) -> Result<()> {
        self.ensure_live(handle)?;
        let packed = PackedGeometry::pack(polygon)?;
        let status =
            unsafe { (self.functions().mesh2d_merge_nodes)(handle.0, packed.native_ptr()) };
        self.check("mkernel_mesh2d_merge_nodes", status)
    }

    /// Index of the node nearest to (x, y) within `search_radius`.
    pub fn mesh2d_node_index(
        &self,
        handle: KernelHandle,
        x: f64,
        y: f64,
        search_radius: f64,
    ) -> Result<usize> {
        self.ensure_live(handle)?;
        let mut index: c_int = 0;
        let status = unsafe {
            (self.functions().mesh2d_get_node_index)(handle.0, x, y, search_radius, &mut index)
        };
        self.check("mkernel_mesh2d_get_node_index", status)?;
        Ok(index.max(0) as usize)
    }

    /// Coordinates of the node nearest to (x, y) within `search_radius`.
    pub fn mesh2d_closest_node(
        &self,
        handle: KernelHandle,
        x: f64,
        y: f64,
        search_radius: f64,
    ) -> Result<(f64, f64)> {
        self.ensure_live(handle)?;
        let (mut out_x, mut out_y) = (0.0, 0.0);
        let status = unsafe {
            (self.functions().mesh2d_get_closest_node)(
                handle.0,
                x,
                y,
                search_radius,
                &mut out_x,
                &mut out_y,
            )
        };
        self.check("mkernel_mesh2d_get_closest_node", status)?;
        Ok((out_x, out_y))
    }

    // -- edge operations ---------------------------------------------------

    /// Connect two nodes with a new edge, returning its index.
    pub fn mesh2d_insert_edge(
        &self,
        handle: KernelHandle,
        from: usize,
        to: usize,
    ) -> Result<usize> {
        self.ensure_live(handle)?;
        let mut index: c_int = 0;
        let status = unsafe {
            (self.functions().mesh2d_insert_edge)(handle.0, from as c_int, to as c_int, &mut index)
        };
        self.check("mkernel_mesh2d_insert_edge", status)?;
        Ok(index.max(0) as usize)
    }

    /// Delete the edge nearest to (x, y).
    pub fn mesh2d_delete_edge(&self, handle: KernelHandle, x: f64, y: f64) -> Result<()> {
        self.ensure_live(handle)?;
        let point = GeometryList::from_point(x, y, self.separators)?;
        let packed = PackedGeometry::pack(&point)?;
        let status =
            unsafe { (self.functions().mesh2d_delete_edge)(handle.0, packed.native_ptr()) };
        self.check("mkernel_delete_edge_mesh2d", status)
    }

    /// Index of the edge nearest to (x, y).
    pub fn mesh2d_find_edge(&self, handle: KernelHandle, x: f64, y: f64) -> Result<usize> {
        self.ensure_live(handle)?;
        let point = GeometryList::from_point(x, y, self.separators)?;
        let packed = PackedGeometry::pack(&point)?;
        let mut index: c_int = 0;
        let status = unsafe {
            (self.functions().mesh2d_find_edge)(handle.0, packed.native_ptr(), &mut index)
        };
        self.check("mkernel_find_edge_mesh2d", status)?;
        Ok(index.max(0) as usize)
    }

    /// Flip edges towards a Delaunay-like configuration.
    pub fn mesh2d_flip_edges(
        &self,
        handle: KernelHandle,
        triangulate: bool,
        project: ProjectToLandBoundary,
        polygon: &GeometryList,
        land_boundaries: &GeometryList,
    ) -> Result<()> {
        self.ensure_live(handle)?;
        let polygon = PackedGeometry::pack(polygon)?;
        let land = PackedGeometry::pack(land_boundaries)?;
        let status = unsafe {
            (self.functions().mesh2d_flip_edges)(
                handle.0,
                c_int::from(triangulate),
                project.to_native(),
                polygon.native_ptr(),
                land.native_ptr(),
            )
        };
        self.check("mkernel_mesh2d_flip_edges", status)
    }

    // -- mesh-wide operations ----------------------------------------------

    /// Delete the mesh inside (or, inverted, outside) a polygon.
    pub fn mesh2d_delete(
        &self,
        handle: KernelHandle,
        polygon: &GeometryList,
        option: DeletionOption,
        invert: bool,
    ) -> Result<()> {
        self.ensure_live(handle)?;
        let packed = PackedGeometry::pack(polygon)?;
        let status = unsafe {
            (self.functions().mesh2d_delete)(
                handle.0,
                packed.native_ptr(),
                option.to_native(),
                c_int::from(invert),
            )
        };
        self.check("mkernel_mesh2d_delete", status)
    }

    /// Boundary of the mesh as closed polygons; two-phase.
    pub fn mesh2d_boundary_polygons(&self, handle: KernelHandle) -> Result<GeometryList> {
        self.ensure_live(handle)?;
        let mut count: c_int = 0;
        let status = unsafe {
            (self.functions().mesh2d_count_mesh_boundaries_as_polygons)(handle.0, &mut count)
        };
        self.check("mkernel_mesh2d_count_mesh_boundaries_as_polygons", status)?;
        let mut out = PackedGeometry::output(count.max(0) as usize, self.separators)?;
        let status = unsafe {
            (self.functions().mesh2d_get_mesh_boundaries_as_polygons)(
                handle.0,
                out.native_mut_ptr(),
            )
        };
        self.check("mkernel_mesh2d_get_mesh_boundaries_as_polygons", status)?;
        Ok(out.unpack())
    }

    /// Refine the mesh where the sample set demands it.
    pub fn mesh2d_refine_based_on_samples(
        &self,
        handle: KernelHandle,
        samples: &GeometryList,
        interpolation: &InterpolationParameters,
        sample_refine: &SamplesRefineParameters,
    ) -> Result<()> {
        self.ensure_live(handle)?;
        let packed = PackedGeometry::pack(samples)?;
        let interpolation = interpolation.to_native();
        let sample_refine = sample_refine.to_native();
        let status = unsafe {
            (self.functions().mesh2d_refine_based_on_samples)(
                handle.0,
                packed.native_ptr(),
                &interpolation,
                &sample_refine,
            )
        };
        self.check("mkernel_mesh2d_refine_based_on_samples", status)
    }

    /// Refine the mesh inside a closed polygon.
    pub fn mesh2d_refine_based_on_polygon(
        &self,
        handle: KernelHandle,
        polygon: &GeometryList,
        interpolation: &InterpolationParameters,
    ) -> Result<()> {
        self.ensure_live(handle)?;
        let packed = PackedGeometry::pack(polygon)?;
        let interpolation = interpolation.to_native();
        let status = unsafe {
            (self.functions().mesh2d_refine_based_on_polygon)(
                handle.0,
                packed.native_ptr(),
                &interpolation,
            )
        };
        self.check("mkernel_mesh2d_refine_based_on_polygon", status)
    }

    /// Triangulate the interior of a polygon.
    pub fn mesh2d_make_from_polygon(
        &self,
        handle: KernelHandle,
        polygon: &GeometryList,
    ) -> Result<()> {
        self.ensure_live(handle)?;
        let packed = PackedGeometry::pack(polygon)?;
        let status = unsafe {
            (self.functions().mesh2d_make_mesh_from_polygon)(handle.0, packed.native_ptr())
        };
        self.check("mkernel_mesh2d_make_mesh_from_polygon", status)
    }

    /// Triangulate a sample point set.
    pub fn mesh2d_make_from_samples(
        &self,
        handle: KernelHandle,
        samples: &GeometryList,
    ) -> Result<()> {
        self.ensure_live(handle)?;
        let packed = PackedGeometry::pack(samples)?;
        let status = unsafe {
            (self.functions().mesh2d_make_mesh_from_samples)(handle.0, packed.native_ptr())
        };
        self.check("mkernel_mesh2d_make_mesh_from_samples", status)
    }

    /// One-shot orthogonalization; see [`MeshKernel::orthogonalization`] for
    /// the interactive sequence.
    pub fn compute_orthogonalization(
        &self,
        handle: KernelHandle,
        project: ProjectToLandBoundary,
        parameters: &OrthogonalizationParameters,
        polygon: &GeometryList,
        land_boundaries: &GeometryList,
    ) -> Result<()> {
        self.ensure_live(handle)?;
        let polygon = PackedGeometry::pack(polygon)?;
        let land = PackedGeometry::pack(land_boundaries)?;
        let parameters = parameters.to_native();
        let status = unsafe {
            (self.functions().compute_orthogonalization)(
                handle.0,
                project.to_native(),
                &parameters,
                polygon.native_ptr(),
                land.native_ptr(),
            )
        };
        self.check("mkernel_compute_orthogonalization_mesh2d", status)
    }

    // -- mesh quality ------------------------------------------------------

    /// Per-edge orthogonality, carried in the values channel.
    pub fn mesh2d_orthogonality(&self, handle: KernelHandle) -> Result<GeometryList> {
        let dims = self.mesh2d_get_dimensions(handle)?;
        let mut out = PackedGeometry::output(dims.edge_count, self.separators)?;
        let status =
            unsafe { (self.functions().get_orthogonality)(handle.0, out.native_mut_ptr()) };
        self.check("mkernel_get_orthogonality_mesh2d", status)?;
        Ok(out.unpack())
    }

    /// Per-edge smoothness, carried in the values channel.
    pub fn mesh2d_smoothness(&self, handle: KernelHandle) -> Result<GeometryList> {
        let dims = self.mesh2d_get_dimensions(handle)?;
        let mut out = PackedGeometry::output(dims.edge_count, self.separators)?;
        let status =
            unsafe { (self.functions().get_smoothness)(handle.0, out.native_mut_ptr()) };
        self.check("mkernel_get_smoothness_mesh2d", status)?;
        Ok(out.unpack())
    }

    // -- curvilinear grids -------------------------------------------------

    /// Generate a uniform rectangular grid; `polygon` restricts the area and
    /// may be empty.
    pub fn curvilinear_make_uniform(
        &self,
        handle: KernelHandle,
        parameters: &MakeGridParameters,
        polygon: &GeometryList,
    ) -> Result<()> {
        self.ensure_live(handle)?;
        let packed = PackedGeometry::pack(polygon)?;
        let parameters = parameters.to_native();
        let status = unsafe {
            (self.functions().curvilinear_make_uniform)(
                handle.0,
                &parameters,
                packed.native_ptr(),
            )
        };
        self.check("mkernel_curvilinear_make_uniform", status)
    }

    /// First phase of the grid transfer: dimensions only.
    pub fn curvilinear_get_dimensions(
        &self,
        handle: KernelHandle,
    ) -> Result<CurvilinearDimensions> {
        self.ensure_live(handle)?;
        let mut native = meshkernel_sys::CurvilinearGridNative::empty();
        let status =
            unsafe { (self.functions().curvilinear_get_dimensions)(handle.0, &mut native) };
        self.check("mkernel_curvilinear_get_dimensions", status)?;
        Ok(CurvilinearDimensions {
            rows: native.num_n.max(0) as usize,
            columns: native.num_m.max(0) as usize,
        })
    }

    /// Both phases of the grid transfer.
    pub fn curvilinear_get_data(&self, handle: KernelHandle) -> Result<CurvilinearGrid> {
        let dims = self.curvilinear_get_dimensions(handle)?;
        let mut buffers = CurvilinearBuffers::sized(dims)?;
        let status =
            unsafe { (self.functions().curvilinear_get_data)(handle.0, buffers.native_mut_ptr()) };
        self.check("mkernel_curvilinear_get_data", status)?;
        Ok(buffers.into_grid(dims))
    }

    /// Intermediate spline points between corner vertices; stateless.
    pub fn get_splines(
        &self,
        corners: &GeometryList,
        points_between: usize,
    ) -> Result<GeometryList> {
        let packed = PackedGeometry::pack(corners)?;
        let capacity = corners.len() * (points_between + 1);
        let mut out = PackedGeometry::output(capacity, self.separators)?;
        let status = unsafe {
            (self.functions().get_splines)(
                packed.native_ptr(),
                out.native_mut_ptr(),
                points_between as c_int,
            )
        };
        self.check("mkernel_get_splines", status)?;
        Ok(out.unpack())
    }

    /// Curvilinear grid from splines via transfinite interpolation.
    pub fn curvilinear_from_splines(
        &self,
        handle: KernelHandle,
        splines: &GeometryList,
        parameters: &CurvilinearParameters,
    ) -> Result<()> {
        self.ensure_live(handle)?;
        let packed = PackedGeometry::pack(splines)?;
        let parameters = parameters.to_native();
        let status = unsafe {
            (self.functions().curvilinear_compute_transfinite_from_splines)(
                handle.0,
                packed.native_ptr(),
                &parameters,
            )
        };
        self.check("mkernel_curvilinear_compute_transfinite_from_splines", status)
    }

    /// Orthogonal curvilinear grid grown from splines with an advancing
    /// front.
    pub fn curvilinear_orthogonal_from_splines(
        &self,
        handle: KernelHandle,
        splines: &GeometryList,
        curvilinear: &CurvilinearParameters,
        advancing_front: &SplinesToCurvilinearParameters,
    ) -> Result<()> {
        self.ensure_live(handle)?;
        let packed = PackedGeometry::pack(splines)?;
        let curvilinear = curvilinear.to_native();
        let advancing_front = advancing_front.to_native();
        let status = unsafe {
            (self.functions().curvilinear_compute_orthogonal_grid_from_splines)(
                handle.0,
                packed.native_ptr(),
                &curvilinear,
                &advancing_front,
            )
        };
        self.check(
            "mkernel_curvilinear_compute_orthogonal_grid_from_splines",
            status,
        )
    }

    /// Curvilinear grid inside a polygon from three selected corner nodes.
    pub fn curvilinear_from_polygon(
        &self,
        handle: KernelHandle,
        polygon: &GeometryList,
        first: usize,
        second: usize,
        third: usize,
        use_fourth_side: bool,
    ) -> Result<()> {
        self.ensure_live(handle)?;
        let packed = PackedGeometry::pack(polygon)?;
        let status = unsafe {
            (self.functions().curvilinear_compute_transfinite_from_polygon)(
                handle.0,
                packed.native_ptr(),
                first as c_int,
                second as c_int,
                third as c_int,
                c_int::from(use_fourth_side),
            )
        };
        self.check("mkernel_curvilinear_compute_transfinite_from_polygon", status)
    }

    /// Curvilinear grid inside a triangle from three selected corner nodes.
    pub fn curvilinear_from_triangle(
        &self,
        handle: KernelHandle,
        polygon: &GeometryList,
        first: usize,
        second: usize,
        third: usize,
    ) -> Result<()> {
        self.ensure_live(handle)?;
        let packed = PackedGeometry::pack(polygon)?;
        let status = unsafe {
            (self.functions().curvilinear_compute_transfinite_from_triangle)(
                handle.0,
                packed.native_ptr(),
                first as c_int,
                second as c_int,
                third as c_int,
            )
        };
        self.check(
            "mkernel_curvilinear_compute_transfinite_from_triangle",
            status,
        )
    }

    /// Convert the state's curvilinear grid to an unstructured mesh.
    pub fn curvilinear_convert_to_mesh2d(&self, handle: KernelHandle) -> Result<()> {
        self.ensure_live(handle)?;
        let status = unsafe { (self.functions().curvilinear_convert_to_mesh2d)(handle.0) };
        self.check("mkernel_curvilinear_convert_to_mesh2d", status)
    }

    // -- polygon operations ------------------------------------------------

    /// Offset a polygon by `distance`; two-phase.
    pub fn polygon_offset(
        &self,
        handle: KernelHandle,
        polygon: &GeometryList,
        inner: bool,
        distance: f64,
    ) -> Result<GeometryList> {
        self.ensure_live(handle)?;
        let packed = PackedGeometry::pack(polygon)?;
        let mut count: c_int = 0;
        let status = unsafe {
            (self.functions().polygon_count_offset)(
                handle.0,
                packed.native_ptr(),
                c_int::from(inner),
                distance,
                &mut count,
            )
        };
        self.check("mkernel_polygon_count_offset", status)?;
        let mut out = PackedGeometry::output(count.max(0) as usize, self.separators)?;
        let status = unsafe {
            (self.functions().polygon_get_offset)(
                handle.0,
                packed.native_ptr(),
                c_int::from(inner),
                distance,
                out.native_mut_ptr(),
            )
        };
        self.check("mkernel_polygon_get_offset", status)?;
        Ok(out.unpack())
    }

    /// Refine the polygon perimeter between two vertex indices; two-phase.
    pub fn polygon_refine(
        &self,
        handle: KernelHandle,
        polygon: &GeometryList,
        first: usize,
        second: usize,
        distance: f64,
    ) -> Result<GeometryList> {
        self.ensure_live(handle)?;
        let packed = PackedGeometry::pack(polygon)?;
        let mut count: c_int = 0;
        let status = unsafe {
            (self.functions().polygon_count_refine)(
                handle.0,
                packed.native_ptr(),
                first as c_int,
                second as c_int,
                distance,
                &mut count,
            )
        };
        self.check("mkernel_polygon_count_refine", status)?;
        let mut out = PackedGeometry::output(count.max(0) as usize, self.separators)?;
        let status = unsafe {
            (self.functions().polygon_refine)(
                handle.0,
                packed.native_ptr(),
                first as c_int,
                second as c_int,
                distance,
                out.native_mut_ptr(),
            )
        };
        self.check("mkernel_polygon_refine", status)?;
        Ok(out.unpack())
    }

    /// Select points falling inside polygons; the result carries the
    /// inclusion mask in its values channel.
    pub fn points_in_polygon(
        &self,
        handle: KernelHandle,
        polygon: &GeometryList,
        points: &GeometryList,
    ) -> Result<GeometryList> {
        self.ensure_live(handle)?;
        let polygon = PackedGeometry::pack(polygon)?;
        let points_packed = PackedGeometry::pack(points)?;
        let mut out = PackedGeometry::output(points.len(), self.separators)?;
        let status = unsafe {
            (self.functions().get_points_in_polygon)(
                handle.0,
                polygon.native_ptr(),
                points_packed.native_ptr(),
                out.native_mut_ptr(),
            )
        };
        self.check("mkernel_get_points_in_polygon", status)?;
        Ok(out.unpack())
    }

    /// Indices of mesh nodes inside (or outside) the selecting polygons;
    /// two-phase with an index buffer.
    pub fn nodes_in_polygons(
        &self,
        handle: KernelHandle,
        polygon: &GeometryList,
        inside: bool,
    ) -> Result<Vec<i32>> {
        self.ensure_live(handle)?;
        let packed = PackedGeometry::pack(polygon)?;
        // The kernel selects inside for 0 and outside for 1.
        let inside_flag = c_int::from(!inside);
        let mut count: c_int = 0;
        let status = unsafe {
            (self.functions().count_nodes_in_polygons)(
                handle.0,
                packed.native_ptr(),
                inside_flag,
                &mut count,
            )
        };
        self.check("mkernel_count_nodes_in_polygons", status)?;
        let mut indices = ScopedBuffer::<c_int>::zeroed(count.max(0) as usize)?;
        let status = unsafe {
            (self.functions().get_nodes_in_polygons)(
                handle.0,
                packed.native_ptr(),
                inside_flag,
                indices.as_mut_ptr(),
            )
        };
        self.check("mkernel_get_nodes_in_polygons", status)?;
        Ok(indices.to_vec_truncated(count.max(0) as usize))
    }

    // -- 1d-2d contacts ----------------------------------------------------

    /// Connect masked 1d nodes to the containing 2d face circumcenters.
    pub fn contacts_compute_single(
        &self,
        handle: KernelHandle,
        node_mask: &[i32],
        polygons: &GeometryList,
    ) -> Result<()> {
        self.ensure_live(handle)?;
        let mask = ScopedBuffer::from_slice(node_mask)?;
        let packed = PackedGeometry::pack(polygons)?;
        let status = unsafe {
            (self.functions().contacts_compute_single)(
                handle.0,
                mask.as_slice().as_ptr(),
                packed.native_ptr(),
            )
        };
        self.check("mkernel_contacts_compute_single", status)
    }

    /// Connect masked 1d nodes to multiple 2d face circumcenters.
    pub fn contacts_compute_multiple(
        &self,
        handle: KernelHandle,
        node_mask: &[i32],
    ) -> Result<()> {
        self.ensure_live(handle)?;
        let mask = ScopedBuffer::from_slice(node_mask)?;
        let status = unsafe {
            (self.functions().contacts_compute_multiple)(handle.0, mask.as_slice().as_ptr())
        };
        self.check("mkernel_contacts_compute_multiple", status)
    }

    /// Connect one 2d face per polygon to the closest masked 1d node.
    pub fn contacts_compute_with_polygons(
        &self,
        handle: KernelHandle,
        node_mask: &[i32],
        polygons: &GeometryList,
    ) -> Result<()> {
        self.ensure_live(handle)?;
        let mask = ScopedBuffer::from_slice(node_mask)?;
        let packed = PackedGeometry::pack(polygons)?;
        let status = unsafe {
            (self.functions().contacts_compute_with_polygons)(
                handle.0,
                mask.as_slice().as_ptr(),
                packed.native_ptr(),
            )
        };
        self.check("mkernel_contacts_compute_with_polygons", status)
    }

    /// Connect masked 1d nodes to the faces containing the input points.
    pub fn contacts_compute_with_points(
        &self,
        handle: KernelHandle,
        node_mask: &[i32],
        points: &GeometryList,
    ) -> Result<()> {
        self.ensure_live(handle)?;
        let mask = ScopedBuffer::from_slice(node_mask)?;
        let packed = PackedGeometry::pack(points)?;
        let status = unsafe {
            (self.functions().contacts_compute_with_points)(
                handle.0,
                mask.as_slice().as_ptr(),
                packed.native_ptr(),
            )
        };
        self.check("mkernel_contacts_compute_with_points", status)
    }

    /// Connect masked 1d nodes to the closest boundary faces within
    /// `search_radius`.
    pub fn contacts_compute_boundary(
        &self,
        handle: KernelHandle,
        node_mask: &[i32],
        polygons: &GeometryList,
        search_radius: f64,
    ) -> Result<()> {
        self.ensure_live(handle)?;
        let mask = ScopedBuffer::from_slice(node_mask)?;
        let packed = PackedGeometry::pack(polygons)?;
        let status = unsafe {
            (self.functions().contacts_compute_boundary)(
                handle.0,
                mask.as_slice().as_ptr(),
                packed.native_ptr(),
                search_radius,
            )
        };
        self.check("mkernel_contacts_compute_boundary", status)
    }
}

/// A kernel state released on drop.
///
/// Explicit [`ScopedState::release`] is the primary contract and surfaces
/// the native status; the drop path ignores release errors.
#[derive(Debug)]
pub struct ScopedState<'a> {
    kernel: &'a MeshKernel,
    handle: KernelHandle,
    released: bool,
}

impl ScopedState<'_> {
    /// The handle of this state.
    #[must_use]
    pub fn handle(&self) -> KernelHandle {
        self.handle
    }

    /// Release the state now, surfacing any native failure.
    pub fn release(mut self) -> Result<()> {
        self.released = true;
        self.kernel.deallocate_state(self.handle)
    }
}

impl Drop for ScopedState<'_> {
    fn drop(&mut self) {
        if !self.released {
            let _ = self.kernel.deallocate_state(self.handle);
        }
    }
}

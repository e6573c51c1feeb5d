//! In-process stand-in for the native kernel.
//!
//! Implements every entry point of the [`KernelFunctions`] table against a
//! process-global state table, so the binding layer can be exercised without
//! the `MeshKernelApi` shared library. Geometry behavior is deliberately
//! simple: uniform grid generation, nearest-node/edge queries, even-odd
//! point-in-polygon, piecewise-linear splines. Operations whose output the
//! binding layer never inspects structurally (refinement, triangulation,
//! orthogonalization iterations, contacts) succeed without mutating state.
//!
//! Test hooks: [`force_status`] makes the next invocation return a chosen
//! nonzero code, [`call_count`] counts every invocation, [`reset`] clears
//! all state. All hooks act on process-global state, so tests driving them
//! must not run concurrently with each other.

use std::collections::HashMap;
use std::os::raw::{c_double, c_int};
use std::sync::{Mutex, MutexGuard, OnceLock};

use crate::functions::KernelFunctions;
use crate::types::{
    CurvilinearGridNative, CurvilinearParametersNative, GeometryListNative,
    InterpolationParametersNative, MakeGridParametersNative, Mesh2dNative,
    OrthogonalizationParametersNative, SamplesRefineParametersNative,
    SplinesToCurvilinearParametersNative,
};

/// Missing value / geometry separator reported by the stub.
pub const SEPARATOR: f64 = -999.0;
/// Inner-outer ring separator reported by the stub.
pub const INNER_OUTER_SEPARATOR: f64 = -998.0;

const STATUS_OK: c_int = 0;
/// Generic failure code for operations the stub can reject.
pub const STATUS_ERROR: c_int = 1;

#[derive(Default)]
struct Session {
    node_x: Vec<f64>,
    node_y: Vec<f64>,
    /// Node index pairs, two entries per edge.
    edge_nodes: Vec<i32>,
    face_nodes: Vec<i32>,
    nodes_per_face: Vec<i32>,
    /// Curvilinear dimensions, zero until a uniform grid is generated.
    grid_columns: i32,
    grid_rows: i32,
}

#[derive(Default)]
struct StubState {
    next_id: i32,
    sessions: HashMap<i32, Session>,
    forced_status: Option<c_int>,
    calls: u64,
}

fn state() -> MutexGuard<'static, StubState> {
    static STATE: OnceLock<Mutex<StubState>> = OnceLock::new();
    STATE
        .get_or_init(|| Mutex::new(StubState::default()))
        .lock()
        .unwrap_or_else(std::sync::PoisonError::into_inner)
}

/// Make the next invocation return `code` instead of executing.
pub fn force_status(code: c_int) {
    state().forced_status = Some(code);
}

/// Total number of entry-point invocations since the last [`reset`].
#[must_use]
pub fn call_count() -> u64 {
    state().calls
}

/// Drop all sessions, counters and pending forced statuses.
pub fn reset() {
    let mut st = state();
    st.sessions.clear();
    st.forced_status = None;
    st.calls = 0;
    st.next_id = 0;
}

/// Records the invocation and returns a pending forced status, if any.
fn enter(st: &mut StubState) -> Option<c_int> {
    st.calls += 1;
    st.forced_status.take()
}

unsafe fn read_f64(ptr: *const c_double, len: c_int) -> Vec<f64> {
    if ptr.is_null() || len <= 0 {
        Vec::new()
    } else {
        std::slice::from_raw_parts(ptr, len as usize).to_vec()
    }
}

unsafe fn read_i32(ptr: *const c_int, len: c_int) -> Vec<i32> {
    if ptr.is_null() || len <= 0 {
        Vec::new()
    } else {
        std::slice::from_raw_parts(ptr, len as usize).to_vec()
    }
}

unsafe fn write_f64(ptr: *mut c_double, data: &[f64]) {
    if !ptr.is_null() && !data.is_empty() {
        std::ptr::copy_nonoverlapping(data.as_ptr(), ptr, data.len());
    }
}

unsafe fn write_i32(ptr: *mut c_int, data: &[i32]) {
    if !ptr.is_null() && !data.is_empty() {
        std::ptr::copy_nonoverlapping(data.as_ptr(), ptr, data.len());
    }
}

/// Even-odd ray cast against one closed ring.
fn point_in_ring(px: f64, py: f64, ring_x: &[f64], ring_y: &[f64]) -> bool {
    let n = ring_x.len().min(ring_y.len());
    if n < 3 {
        return false;
    }
    let mut inside = false;
    let mut j = n - 1;
    for i in 0..n {
        let (xi, yi) = (ring_x[i], ring_y[i]);
        let (xj, yj) = (ring_x[j], ring_y[j]);
        if (yi > py) != (yj > py) && px < (xj - xi) * (py - yi) / (yj - yi) + xi {
            inside = !inside;
        }
        j = i;
    }
    inside
}

/// First ring of a packed geometry list: everything up to the first sentinel.
unsafe fn first_ring(list: &GeometryListNative) -> (Vec<f64>, Vec<f64>) {
    let xs = read_f64(list.x_coordinates, list.num_coordinates);
    let ys = read_f64(list.y_coordinates, list.num_coordinates);
    let end = xs
        .iter()
        .position(|&x| x == list.geometry_separator || x == list.inner_outer_separator)
        .unwrap_or(xs.len());
    (xs[..end].to_vec(), ys[..end].to_vec())
}

/// Uniform rectangular connectivity for an `nx` by `ny` node lattice.
///
/// Nodes are row-major with x varying fastest. Each node contributes its
/// rightward edge, then its upward edge; faces are quads in cell order.
fn rectangular_connectivity(nx: i32, ny: i32) -> (Vec<i32>, Vec<i32>, Vec<i32>) {
    let mut edge_nodes = Vec::new();
    let mut face_nodes = Vec::new();
    let mut nodes_per_face = Vec::new();

    for iy in 0..ny {
        for ix in 0..nx {
            let n = iy * nx + ix;
            if ix + 1 < nx {
                edge_nodes.push(n);
                edge_nodes.push(n + 1);
            }
            if iy + 1 < ny {
                edge_nodes.push(n);
                edge_nodes.push(n + nx);
            }
        }
    }

    for iy in 0..ny - 1 {
        for ix in 0..nx - 1 {
            let n = iy * nx + ix;
            face_nodes.extend_from_slice(&[n, n + 1, n + nx + 1, n + nx]);
            nodes_per_face.push(4);
        }
    }

    (edge_nodes, face_nodes, nodes_per_face)
}

fn nearest_node(session: &Session, x: f64, y: f64) -> Option<(usize, f64)> {
    session
        .node_x
        .iter()
        .zip(&session.node_y)
        .enumerate()
        .map(|(i, (nx, ny))| (i, (nx - x).hypot(ny - y)))
        .min_by(|a, b| a.1.total_cmp(&b.1))
}

fn nearest_edge(session: &Session, x: f64, y: f64) -> Option<usize> {
    (0..session.edge_nodes.len() / 2)
        .map(|e| {
            let a = session.edge_nodes[2 * e] as usize;
            let b = session.edge_nodes[2 * e + 1] as usize;
            let mx = (session.node_x[a] + session.node_x[b]) / 2.0;
            let my = (session.node_y[a] + session.node_y[b]) / 2.0;
            (e, (mx - x).hypot(my - y))
        })
        .min_by(|a, b| a.1.total_cmp(&b.1))
        .map(|(e, _)| e)
}

// -- state management ------------------------------------------------------

unsafe extern "C" fn allocate_state(_projection: c_int, id_out: *mut c_int) -> c_int {
    let mut st = state();
    if let Some(code) = enter(&mut st) {
        return code;
    }
    let id = st.next_id;
    st.next_id += 1;
    st.sessions.insert(id, Session::default());
    if id_out.is_null() {
        return STATUS_ERROR;
    }
    *id_out = id;
    STATUS_OK
}

unsafe extern "C" fn deallocate_state(id: c_int) -> c_int {
    let mut st = state();
    if let Some(code) = enter(&mut st) {
        return code;
    }
    match st.sessions.remove(&id) {
        Some(_) => STATUS_OK,
        None => STATUS_ERROR,
    }
}

unsafe extern "C" fn mesh2d_set(id: c_int, mesh: *const Mesh2dNative) -> c_int {
    let mut st = state();
    if let Some(code) = enter(&mut st) {
        return code;
    }
    let Some(session) = st.sessions.get_mut(&id) else {
        return STATUS_ERROR;
    };
    if mesh.is_null() {
        return STATUS_ERROR;
    }
    let mesh = &*mesh;
    session.node_x = read_f64(mesh.node_x, mesh.num_nodes);
    session.node_y = read_f64(mesh.node_y, mesh.num_nodes);
    session.edge_nodes = read_i32(mesh.edge_nodes, mesh.num_edges * 2);
    session.face_nodes = read_i32(mesh.face_nodes, mesh.num_face_nodes);
    session.nodes_per_face = read_i32(mesh.nodes_per_face, mesh.num_faces);
    STATUS_OK
}

unsafe extern "C" fn mesh2d_get_dimensions(id: c_int, mesh: *mut Mesh2dNative) -> c_int {
    let mut st = state();
    if let Some(code) = enter(&mut st) {
        return code;
    }
    let Some(session) = st.sessions.get(&id) else {
        return STATUS_ERROR;
    };
    if mesh.is_null() {
        return STATUS_ERROR;
    }
    let mesh = &mut *mesh;
    mesh.num_nodes = session.node_x.len() as c_int;
    mesh.num_edges = (session.edge_nodes.len() / 2) as c_int;
    mesh.num_faces = session.nodes_per_face.len() as c_int;
    mesh.num_face_nodes = session.face_nodes.len() as c_int;
    STATUS_OK
}

unsafe extern "C" fn mesh2d_get_data(id: c_int, mesh: *mut Mesh2dNative) -> c_int {
    let mut st = state();
    if let Some(code) = enter(&mut st) {
        return code;
    }
    let Some(session) = st.sessions.get(&id) else {
        return STATUS_ERROR;
    };
    if mesh.is_null() {
        return STATUS_ERROR;
    }
    let mesh = &mut *mesh;
    write_f64(mesh.node_x, &session.node_x);
    write_f64(mesh.node_y, &session.node_y);
    write_i32(mesh.edge_nodes, &session.edge_nodes);
    write_i32(mesh.face_nodes, &session.face_nodes);
    write_i32(mesh.nodes_per_face, &session.nodes_per_face);
    STATUS_OK
}

// -- node operations -------------------------------------------------------

unsafe extern "C" fn mesh2d_insert_node(
    id: c_int,
    x: c_double,
    y: c_double,
    index_out: *mut c_int,
) -> c_int {
    let mut st = state();
    if let Some(code) = enter(&mut st) {
        return code;
    }
    let Some(session) = st.sessions.get_mut(&id) else {
        return STATUS_ERROR;
    };
    session.node_x.push(x);
    session.node_y.push(y);
    if index_out.is_null() {
        return STATUS_ERROR;
    }
    *index_out = (session.node_x.len() - 1) as c_int;
    STATUS_OK
}

fn remove_node(session: &mut Session, index: i32) {
    session.node_x.remove(index as usize);
    session.node_y.remove(index as usize);
    let mut kept = Vec::with_capacity(session.edge_nodes.len());
    for pair in session.edge_nodes.chunks_exact(2) {
        if pair[0] != index && pair[1] != index {
            kept.push(pair[0] - i32::from(pair[0] > index));
            kept.push(pair[1] - i32::from(pair[1] > index));
        }
    }
    session.edge_nodes = kept;
}

unsafe extern "C" fn mesh2d_delete_node(id: c_int, index: c_int) -> c_int {
    let mut st = state();
    if let Some(code) = enter(&mut st) {
        return code;
    }
    let Some(session) = st.sessions.get_mut(&id) else {
        return STATUS_ERROR;
    };
    if index < 0 || index as usize >= session.node_x.len() {
        return STATUS_ERROR;
    }
    remove_node(session, index);
    STATUS_OK
}

unsafe extern "C" fn mesh2d_move_node(id: c_int, x: c_double, y: c_double, index: c_int) -> c_int {
    let mut st = state();
    if let Some(code) = enter(&mut st) {
        return code;
    }
    let Some(session) = st.sessions.get_mut(&id) else {
        return STATUS_ERROR;
    };
    if index < 0 || index as usize >= session.node_x.len() {
        return STATUS_ERROR;
    }
    session.node_x[index as usize] = x;
    session.node_y[index as usize] = y;
    STATUS_OK
}

unsafe extern "C" fn mesh2d_merge_two_nodes(id: c_int, from: c_int, into: c_int) -> c_int {
    let mut st = state();
    if let Some(code) = enter(&mut st) {
        return code;
    }
    let Some(session) = st.sessions.get_mut(&id) else {
        return STATUS_ERROR;
    };
    let count = session.node_x.len() as c_int;
    if from < 0 || from >= count || into < 0 || into >= count || from == into {
        return STATUS_ERROR;
    }
    for entry in &mut session.edge_nodes {
        if *entry == from {
            *entry = into;
        }
    }
    remove_node(session, from);
    STATUS_OK
}

unsafe extern "C" fn mesh2d_merge_nodes(id: c_int, _polygon: *const GeometryListNative) -> c_int {
    let mut st = state();
    if let Some(code) = enter(&mut st) {
        return code;
    }
    if st.sessions.contains_key(&id) {
        STATUS_OK
    } else {
        STATUS_ERROR
    }
}

unsafe extern "C" fn mesh2d_get_node_index(
    id: c_int,
    x: c_double,
    y: c_double,
    search_radius: c_double,
    index_out: *mut c_int,
) -> c_int {
    let mut st = state();
    if let Some(code) = enter(&mut st) {
        return code;
    }
    let Some(session) = st.sessions.get(&id) else {
        return STATUS_ERROR;
    };
    match nearest_node(session, x, y) {
        Some((i, dist)) if dist <= search_radius && !index_out.is_null() => {
            *index_out = i as c_int;
            STATUS_OK
        }
        _ => STATUS_ERROR,
    }
}

unsafe extern "C" fn mesh2d_get_closest_node(
    id: c_int,
    x: c_double,
    y: c_double,
    search_radius: c_double,
    x_out: *mut c_double,
    y_out: *mut c_double,
) -> c_int {
    let mut st = state();
    if let Some(code) = enter(&mut st) {
        return code;
    }
    let Some(session) = st.sessions.get(&id) else {
        return STATUS_ERROR;
    };
    match nearest_node(session, x, y) {
        Some((i, dist)) if dist <= search_radius && !x_out.is_null() && !y_out.is_null() => {
            *x_out = session.node_x[i];
            *y_out = session.node_y[i];
            STATUS_OK
        }
        _ => STATUS_ERROR,
    }
}

// -- edge operations -------------------------------------------------------

unsafe extern "C" fn mesh2d_insert_edge(
    id: c_int,
    from: c_int,
    to: c_int,
    index_out: *mut c_int,
) -> c_int {
    let mut st = state();
    if let Some(code) = enter(&mut st) {
        return code;
    }
    let Some(session) = st.sessions.get_mut(&id) else {
        return STATUS_ERROR;
    };
    let count = session.node_x.len() as c_int;
    if from < 0 || from >= count || to < 0 || to >= count || index_out.is_null() {
        return STATUS_ERROR;
    }
    session.edge_nodes.push(from);
    session.edge_nodes.push(to);
    *index_out = (session.edge_nodes.len() / 2 - 1) as c_int;
    STATUS_OK
}

unsafe extern "C" fn mesh2d_delete_edge(id: c_int, point: *const GeometryListNative) -> c_int {
    let mut st = state();
    if let Some(code) = enter(&mut st) {
        return code;
    }
    let Some(session) = st.sessions.get_mut(&id) else {
        return STATUS_ERROR;
    };
    if point.is_null() {
        return STATUS_ERROR;
    }
    let (xs, ys) = first_ring(&*point);
    let (Some(&x), Some(&y)) = (xs.first(), ys.first()) else {
        return STATUS_ERROR;
    };
    match nearest_edge(session, x, y) {
        Some(e) => {
            session.edge_nodes.drain(2 * e..2 * e + 2);
            STATUS_OK
        }
        None => STATUS_ERROR,
    }
}

unsafe extern "C" fn mesh2d_find_edge(
    id: c_int,
    point: *const GeometryListNative,
    index_out: *mut c_int,
) -> c_int {
    let mut st = state();
    if let Some(code) = enter(&mut st) {
        return code;
    }
    let Some(session) = st.sessions.get(&id) else {
        return STATUS_ERROR;
    };
    if point.is_null() || index_out.is_null() {
        return STATUS_ERROR;
    }
    let (xs, ys) = first_ring(&*point);
    let (Some(&x), Some(&y)) = (xs.first(), ys.first()) else {
        return STATUS_ERROR;
    };
    match nearest_edge(session, x, y) {
        Some(e) => {
            *index_out = e as c_int;
            STATUS_OK
        }
        None => STATUS_ERROR,
    }
}

unsafe extern "C" fn mesh2d_flip_edges(
    id: c_int,
    _triangulate: c_int,
    _project_to_land_boundary: c_int,
    _polygon: *const GeometryListNative,
    _land_boundaries: *const GeometryListNative,
) -> c_int {
    let mut st = state();
    if let Some(code) = enter(&mut st) {
        return code;
    }
    if st.sessions.contains_key(&id) {
        STATUS_OK
    } else {
        STATUS_ERROR
    }
}

// -- mesh-wide operations --------------------------------------------------

unsafe extern "C" fn mesh2d_delete(
    id: c_int,
    _polygon: *const GeometryListNative,
    _deletion_option: c_int,
    _invert: c_int,
) -> c_int {
    let mut st = state();
    if let Some(code) = enter(&mut st) {
        return code;
    }
    if st.sessions.contains_key(&id) {
        STATUS_OK
    } else {
        STATUS_ERROR
    }
}

/// Perimeter node indices of the stored uniform grid, counter-clockwise,
/// with the starting corner repeated to close the ring.
fn boundary_ring(session: &Session) -> Option<Vec<usize>> {
    let (nx, ny) = (session.grid_columns, session.grid_rows);
    if nx < 2 || ny < 2 {
        return None;
    }
    let (nx, ny) = (nx as usize, ny as usize);
    let mut ring = Vec::with_capacity(2 * (nx + ny) - 3);
    ring.extend(0..nx);
    ring.extend((1..ny).map(|iy| iy * nx + nx - 1));
    ring.extend((0..nx - 1).rev().map(|ix| (ny - 1) * nx + ix));
    ring.extend((1..ny - 1).rev().map(|iy| iy * nx));
    ring.push(0);
    Some(ring)
}

unsafe extern "C" fn mesh2d_count_mesh_boundaries_as_polygons(
    id: c_int,
    count_out: *mut c_int,
) -> c_int {
    let mut st = state();
    if let Some(code) = enter(&mut st) {
        return code;
    }
    let Some(session) = st.sessions.get(&id) else {
        return STATUS_ERROR;
    };
    if count_out.is_null() {
        return STATUS_ERROR;
    }
    *count_out = boundary_ring(session).map_or(0, |ring| ring.len()) as c_int;
    STATUS_OK
}

unsafe extern "C" fn mesh2d_get_mesh_boundaries_as_polygons(
    id: c_int,
    geometry: *mut GeometryListNative,
) -> c_int {
    let mut st = state();
    if let Some(code) = enter(&mut st) {
        return code;
    }
    let Some(session) = st.sessions.get(&id) else {
        return STATUS_ERROR;
    };
    if geometry.is_null() {
        return STATUS_ERROR;
    }
    let Some(ring) = boundary_ring(session) else {
        return STATUS_OK;
    };
    let geometry = &mut *geometry;
    let xs: Vec<f64> = ring.iter().map(|&n| session.node_x[n]).collect();
    let ys: Vec<f64> = ring.iter().map(|&n| session.node_y[n]).collect();
    if (geometry.num_coordinates as usize) < xs.len() {
        return STATUS_ERROR;
    }
    write_f64(geometry.x_coordinates, &xs);
    write_f64(geometry.y_coordinates, &ys);
    geometry.num_coordinates = xs.len() as c_int;
    STATUS_OK
}

unsafe extern "C" fn mesh2d_refine_based_on_samples(
    id: c_int,
    _samples: *const GeometryListNative,
    _interpolation: *const InterpolationParametersNative,
    _sample_refine: *const SamplesRefineParametersNative,
) -> c_int {
    let mut st = state();
    if let Some(code) = enter(&mut st) {
        return code;
    }
    if st.sessions.contains_key(&id) {
        STATUS_OK
    } else {
        STATUS_ERROR
    }
}

unsafe extern "C" fn mesh2d_refine_based_on_polygon(
    id: c_int,
    _polygon: *const GeometryListNative,
    _interpolation: *const InterpolationParametersNative,
) -> c_int {
    let mut st = state();
    if let Some(code) = enter(&mut st) {
        return code;
    }
    if st.sessions.contains_key(&id) {
        STATUS_OK
    } else {
        STATUS_ERROR
    }
}

unsafe extern "C" fn mesh2d_make_mesh_from_polygon(
    id: c_int,
    _polygon: *const GeometryListNative,
) -> c_int {
    let mut st = state();
    if let Some(code) = enter(&mut st) {
        return code;
    }
    if st.sessions.contains_key(&id) {
        STATUS_OK
    } else {
        STATUS_ERROR
    }
}

unsafe extern "C" fn mesh2d_make_mesh_from_samples(
    id: c_int,
    _samples: *const GeometryListNative,
) -> c_int {
    let mut st = state();
    if let Some(code) = enter(&mut st) {
        return code;
    }
    if st.sessions.contains_key(&id) {
        STATUS_OK
    } else {
        STATUS_ERROR
    }
}

// -- orthogonalization -----------------------------------------------------

unsafe extern "C" fn compute_orthogonalization(
    id: c_int,
    _project_to_land_boundary: c_int,
    _parameters: *const OrthogonalizationParametersNative,
    _polygon: *const GeometryListNative,
    _land_boundaries: *const GeometryListNative,
) -> c_int {
    let mut st = state();
    if let Some(code) = enter(&mut st) {
        return code;
    }
    if st.sessions.contains_key(&id) {
        STATUS_OK
    } else {
        STATUS_ERROR
    }
}

unsafe extern "C" fn initialize_orthogonalization(
    id: c_int,
    _project_to_land_boundary: c_int,
    _parameters: *const OrthogonalizationParametersNative,
    _polygon: *const GeometryListNative,
    _land_boundaries: *const GeometryListNative,
) -> c_int {
    let mut st = state();
    if let Some(code) = enter(&mut st) {
        return code;
    }
    if st.sessions.contains_key(&id) {
        STATUS_OK
    } else {
        STATUS_ERROR
    }
}

unsafe extern "C" fn prepare_outer_iteration_orthogonalization(id: c_int) -> c_int {
    let mut st = state();
    if let Some(code) = enter(&mut st) {
        return code;
    }
    if st.sessions.contains_key(&id) {
        STATUS_OK
    } else {
        STATUS_ERROR
    }
}

unsafe extern "C" fn compute_inner_orthogonalization_iteration(id: c_int) -> c_int {
    let mut st = state();
    if let Some(code) = enter(&mut st) {
        return code;
    }
    if st.sessions.contains_key(&id) {
        STATUS_OK
    } else {
        STATUS_ERROR
    }
}

unsafe extern "C" fn finalize_inner_orthogonalization_iteration(id: c_int) -> c_int {
    let mut st = state();
    if let Some(code) = enter(&mut st) {
        return code;
    }
    if st.sessions.contains_key(&id) {
        STATUS_OK
    } else {
        STATUS_ERROR
    }
}

unsafe extern "C" fn delete_orthogonalization(id: c_int) -> c_int {
    let mut st = state();
    if let Some(code) = enter(&mut st) {
        return code;
    }
    if st.sessions.contains_key(&id) {
        STATUS_OK
    } else {
        STATUS_ERROR
    }
}

// -- curvilinear grids -----------------------------------------------------

unsafe extern "C" fn curvilinear_make_uniform(
    id: c_int,
    parameters: *const MakeGridParametersNative,
    _polygon: *const GeometryListNative,
) -> c_int {
    let mut st = state();
    if let Some(code) = enter(&mut st) {
        return code;
    }
    let Some(session) = st.sessions.get_mut(&id) else {
        return STATUS_ERROR;
    };
    if parameters.is_null() {
        return STATUS_ERROR;
    }
    let p = &*parameters;
    if p.num_columns < 1 || p.num_rows < 1 {
        return STATUS_ERROR;
    }
    let nx = p.num_columns + 1;
    let ny = p.num_rows + 1;

    session.node_x.clear();
    session.node_y.clear();
    for iy in 0..ny {
        for ix in 0..nx {
            session
                .node_x
                .push(p.origin_x + f64::from(ix) * p.block_size_x);
            session
                .node_y
                .push(p.origin_y + f64::from(iy) * p.block_size_y);
        }
    }
    let (edge_nodes, face_nodes, nodes_per_face) = rectangular_connectivity(nx, ny);
    session.edge_nodes = edge_nodes;
    session.face_nodes = face_nodes;
    session.nodes_per_face = nodes_per_face;
    session.grid_columns = nx;
    session.grid_rows = ny;
    STATUS_OK
}

unsafe extern "C" fn curvilinear_get_dimensions(
    id: c_int,
    grid: *mut CurvilinearGridNative,
) -> c_int {
    let mut st = state();
    if let Some(code) = enter(&mut st) {
        return code;
    }
    let Some(session) = st.sessions.get(&id) else {
        return STATUS_ERROR;
    };
    if grid.is_null() {
        return STATUS_ERROR;
    }
    let grid = &mut *grid;
    grid.num_m = session.grid_columns;
    grid.num_n = session.grid_rows;
    STATUS_OK
}

unsafe extern "C" fn curvilinear_get_data(id: c_int, grid: *mut CurvilinearGridNative) -> c_int {
    let mut st = state();
    if let Some(code) = enter(&mut st) {
        return code;
    }
    let Some(session) = st.sessions.get(&id) else {
        return STATUS_ERROR;
    };
    if grid.is_null() {
        return STATUS_ERROR;
    }
    let grid = &mut *grid;
    write_f64(grid.node_x, &session.node_x);
    write_f64(grid.node_y, &session.node_y);
    STATUS_OK
}

unsafe extern "C" fn get_splines(
    input: *const GeometryListNative,
    output: *mut GeometryListNative,
    points_between: c_int,
) -> c_int {
    let mut st = state();
    if let Some(code) = enter(&mut st) {
        return code;
    }
    if input.is_null() || output.is_null() || points_between < 0 {
        return STATUS_ERROR;
    }
    let input = &*input;
    let output = &mut *output;
    let xs = read_f64(input.x_coordinates, input.num_coordinates);
    let ys = read_f64(input.y_coordinates, input.num_coordinates);

    // Piecewise-linear stand-in for the kernel's cubic interpolation.
    let mut out_x = Vec::new();
    let mut out_y = Vec::new();
    let is_sep =
        |v: f64| v == input.geometry_separator || v == input.inner_outer_separator;
    for i in 0..xs.len() {
        if is_sep(xs[i]) {
            out_x.push(xs[i]);
            out_y.push(ys[i]);
            continue;
        }
        out_x.push(xs[i]);
        out_y.push(ys[i]);
        if i + 1 < xs.len() && !is_sep(xs[i + 1]) {
            for k in 1..=points_between {
                let t = f64::from(k) / f64::from(points_between + 1);
                out_x.push(xs[i] + t * (xs[i + 1] - xs[i]));
                out_y.push(ys[i] + t * (ys[i + 1] - ys[i]));
            }
        }
    }
    if (output.num_coordinates as usize) < out_x.len() {
        return STATUS_ERROR;
    }
    write_f64(output.x_coordinates, &out_x);
    write_f64(output.y_coordinates, &out_y);
    output.num_coordinates = out_x.len() as c_int;
    STATUS_OK
}

unsafe extern "C" fn curvilinear_compute_transfinite_from_splines(
    id: c_int,
    _splines: *const GeometryListNative,
    _parameters: *const CurvilinearParametersNative,
) -> c_int {
    let mut st = state();
    if let Some(code) = enter(&mut st) {
        return code;
    }
    if st.sessions.contains_key(&id) {
        STATUS_OK
    } else {
        STATUS_ERROR
    }
}

unsafe extern "C" fn curvilinear_compute_orthogonal_grid_from_splines(
    id: c_int,
    _splines: *const GeometryListNative,
    _curvilinear: *const CurvilinearParametersNative,
    _advancing_front: *const SplinesToCurvilinearParametersNative,
) -> c_int {
    let mut st = state();
    if let Some(code) = enter(&mut st) {
        return code;
    }
    if st.sessions.contains_key(&id) {
        STATUS_OK
    } else {
        STATUS_ERROR
    }
}

unsafe extern "C" fn curvilinear_compute_transfinite_from_polygon(
    id: c_int,
    _polygon: *const GeometryListNative,
    _first: c_int,
    _second: c_int,
    _third: c_int,
    _use_fourth_side: c_int,
) -> c_int {
    let mut st = state();
    if let Some(code) = enter(&mut st) {
        return code;
    }
    if st.sessions.contains_key(&id) {
        STATUS_OK
    } else {
        STATUS_ERROR
    }
}

unsafe extern "C" fn curvilinear_compute_transfinite_from_triangle(
    id: c_int,
    _polygon: *const GeometryListNative,
    _first: c_int,
    _second: c_int,
    _third: c_int,
) -> c_int {
    let mut st = state();
    if let Some(code) = enter(&mut st) {
        return code;
    }
    if st.sessions.contains_key(&id) {
        STATUS_OK
    } else {
        STATUS_ERROR
    }
}

unsafe extern "C" fn curvilinear_convert_to_mesh2d(id: c_int) -> c_int {
    let mut st = state();
    if let Some(code) = enter(&mut st) {
        return code;
    }
    if st.sessions.contains_key(&id) {
        STATUS_OK
    } else {
        STATUS_ERROR
    }
}

// -- polygon operations ----------------------------------------------------

unsafe extern "C" fn polygon_count_offset(
    id: c_int,
    polygon: *const GeometryListNative,
    _inner: c_int,
    _distance: c_double,
    count_out: *mut c_int,
) -> c_int {
    let mut st = state();
    if let Some(code) = enter(&mut st) {
        return code;
    }
    if !st.sessions.contains_key(&id) || polygon.is_null() || count_out.is_null() {
        return STATUS_ERROR;
    }
    *count_out = (*polygon).num_coordinates;
    STATUS_OK
}

unsafe extern "C" fn polygon_get_offset(
    id: c_int,
    polygon: *const GeometryListNative,
    inner: c_int,
    distance: c_double,
    out: *mut GeometryListNative,
) -> c_int {
    let mut st = state();
    if let Some(code) = enter(&mut st) {
        return code;
    }
    if !st.sessions.contains_key(&id) || polygon.is_null() || out.is_null() {
        return STATUS_ERROR;
    }
    let polygon = &*polygon;
    let out = &mut *out;
    let xs = read_f64(polygon.x_coordinates, polygon.num_coordinates);
    let ys = read_f64(polygon.y_coordinates, polygon.num_coordinates);
    if (out.num_coordinates as usize) < xs.len() {
        return STATUS_ERROR;
    }

    // Move each vertex radially from the centroid; inward for inner offsets.
    let n = xs.len() as f64;
    let cx = xs.iter().sum::<f64>() / n;
    let cy = ys.iter().sum::<f64>() / n;
    let sign = if inner == 0 { 1.0 } else { -1.0 };
    let mut out_x = Vec::with_capacity(xs.len());
    let mut out_y = Vec::with_capacity(ys.len());
    for (&x, &y) in xs.iter().zip(&ys) {
        let len = (x - cx).hypot(y - cy);
        if len == 0.0 {
            out_x.push(x);
            out_y.push(y);
        } else {
            out_x.push(x + sign * distance * (x - cx) / len);
            out_y.push(y + sign * distance * (y - cy) / len);
        }
    }
    write_f64(out.x_coordinates, &out_x);
    write_f64(out.y_coordinates, &out_y);
    out.num_coordinates = out_x.len() as c_int;
    STATUS_OK
}

unsafe extern "C" fn polygon_count_refine(
    id: c_int,
    polygon: *const GeometryListNative,
    first: c_int,
    second: c_int,
    _distance: c_double,
    count_out: *mut c_int,
) -> c_int {
    let mut st = state();
    if let Some(code) = enter(&mut st) {
        return code;
    }
    if !st.sessions.contains_key(&id) || polygon.is_null() || count_out.is_null() {
        return STATUS_ERROR;
    }
    let count = (*polygon).num_coordinates;
    if first < 0 || second <= first || second >= count {
        return STATUS_ERROR;
    }
    // One midpoint per refined segment.
    *count_out = count + (second - first);
    STATUS_OK
}

unsafe extern "C" fn polygon_refine(
    id: c_int,
    polygon: *const GeometryListNative,
    first: c_int,
    second: c_int,
    _distance: c_double,
    out: *mut GeometryListNative,
) -> c_int {
    let mut st = state();
    if let Some(code) = enter(&mut st) {
        return code;
    }
    if !st.sessions.contains_key(&id) || polygon.is_null() || out.is_null() {
        return STATUS_ERROR;
    }
    let polygon = &*polygon;
    let out = &mut *out;
    let xs = read_f64(polygon.x_coordinates, polygon.num_coordinates);
    let ys = read_f64(polygon.y_coordinates, polygon.num_coordinates);
    let count = xs.len() as c_int;
    if first < 0 || second <= first || second >= count {
        return STATUS_ERROR;
    }

    let mut out_x = Vec::new();
    let mut out_y = Vec::new();
    for i in 0..xs.len() {
        out_x.push(xs[i]);
        out_y.push(ys[i]);
        let i = i as c_int;
        if i >= first && i < second {
            let (j, k) = (i as usize, (i + 1) as usize);
            out_x.push((xs[j] + xs[k]) / 2.0);
            out_y.push((ys[j] + ys[k]) / 2.0);
        }
    }
    if (out.num_coordinates as usize) < out_x.len() {
        return STATUS_ERROR;
    }
    write_f64(out.x_coordinates, &out_x);
    write_f64(out.y_coordinates, &out_y);
    out.num_coordinates = out_x.len() as c_int;
    STATUS_OK
}

unsafe extern "C" fn get_points_in_polygon(
    id: c_int,
    polygon: *const GeometryListNative,
    points: *const GeometryListNative,
    selected: *mut GeometryListNative,
) -> c_int {
    let mut st = state();
    if let Some(code) = enter(&mut st) {
        return code;
    }
    if !st.sessions.contains_key(&id) || polygon.is_null() || points.is_null() || selected.is_null()
    {
        return STATUS_ERROR;
    }
    let (ring_x, ring_y) = first_ring(&*polygon);
    let points = &*points;
    let selected = &mut *selected;
    let xs = read_f64(points.x_coordinates, points.num_coordinates);
    let ys = read_f64(points.y_coordinates, points.num_coordinates);
    if (selected.num_coordinates as usize) < xs.len() {
        return STATUS_ERROR;
    }
    let mask: Vec<f64> = xs
        .iter()
        .zip(&ys)
        .map(|(&x, &y)| f64::from(point_in_ring(x, y, &ring_x, &ring_y)))
        .collect();
    write_f64(selected.x_coordinates, &xs);
    write_f64(selected.y_coordinates, &ys);
    write_f64(selected.values, &mask);
    selected.num_coordinates = xs.len() as c_int;
    STATUS_OK
}

fn selected_nodes(session: &Session, polygon: &GeometryListNative, inside: c_int) -> Vec<i32> {
    let (ring_x, ring_y) = unsafe { first_ring(polygon) };
    session
        .node_x
        .iter()
        .zip(&session.node_y)
        .enumerate()
        .filter(|&(_, (&x, &y))| point_in_ring(x, y, &ring_x, &ring_y) == (inside == 0))
        .map(|(i, _)| i as i32)
        .collect()
}

unsafe extern "C" fn count_nodes_in_polygons(
    id: c_int,
    polygon: *const GeometryListNative,
    inside: c_int,
    count_out: *mut c_int,
) -> c_int {
    let mut st = state();
    if let Some(code) = enter(&mut st) {
        return code;
    }
    let Some(session) = st.sessions.get(&id) else {
        return STATUS_ERROR;
    };
    if polygon.is_null() || count_out.is_null() {
        return STATUS_ERROR;
    }
    *count_out = selected_nodes(session, &*polygon, inside).len() as c_int;
    STATUS_OK
}

unsafe extern "C" fn get_nodes_in_polygons(
    id: c_int,
    polygon: *const GeometryListNative,
    inside: c_int,
    indices_out: *mut c_int,
) -> c_int {
    let mut st = state();
    if let Some(code) = enter(&mut st) {
        return code;
    }
    let Some(session) = st.sessions.get(&id) else {
        return STATUS_ERROR;
    };
    if polygon.is_null() || indices_out.is_null() {
        return STATUS_ERROR;
    }
    let selected = selected_nodes(session, &*polygon, inside);
    write_i32(indices_out, &selected);
    STATUS_OK
}

// -- mesh quality ----------------------------------------------------------

unsafe extern "C" fn get_orthogonality(id: c_int, geometry: *mut GeometryListNative) -> c_int {
    let mut st = state();
    if let Some(code) = enter(&mut st) {
        return code;
    }
    let Some(session) = st.sessions.get(&id) else {
        return STATUS_ERROR;
    };
    if geometry.is_null() {
        return STATUS_ERROR;
    }
    let geometry = &mut *geometry;
    let edges = session.edge_nodes.len() / 2;
    if (geometry.num_coordinates as usize) < edges {
        return STATUS_ERROR;
    }
    // The stub's grids are perfectly orthogonal.
    write_f64(geometry.values, &vec![0.0; edges]);
    geometry.num_coordinates = edges as c_int;
    STATUS_OK
}

unsafe extern "C" fn get_smoothness(id: c_int, geometry: *mut GeometryListNative) -> c_int {
    let mut st = state();
    if let Some(code) = enter(&mut st) {
        return code;
    }
    let Some(session) = st.sessions.get(&id) else {
        return STATUS_ERROR;
    };
    if geometry.is_null() {
        return STATUS_ERROR;
    }
    let geometry = &mut *geometry;
    let edges = session.edge_nodes.len() / 2;
    if (geometry.num_coordinates as usize) < edges {
        return STATUS_ERROR;
    }
    write_f64(geometry.values, &vec![1.0; edges]);
    geometry.num_coordinates = edges as c_int;
    STATUS_OK
}

// -- reserved sentinels ----------------------------------------------------

unsafe extern "C" fn get_separator() -> c_double {
    let mut st = state();
    st.calls += 1;
    SEPARATOR
}

unsafe extern "C" fn get_inner_outer_separator() -> c_double {
    let mut st = state();
    st.calls += 1;
    INNER_OUTER_SEPARATOR
}

// -- 1d-2d contacts --------------------------------------------------------

unsafe extern "C" fn contacts_compute_single(
    id: c_int,
    _node_mask: *const c_int,
    _polygons: *const GeometryListNative,
) -> c_int {
    let mut st = state();
    if let Some(code) = enter(&mut st) {
        return code;
    }
    if st.sessions.contains_key(&id) {
        STATUS_OK
    } else {
        STATUS_ERROR
    }
}

unsafe extern "C" fn contacts_compute_multiple(id: c_int, _node_mask: *const c_int) -> c_int {
    let mut st = state();
    if let Some(code) = enter(&mut st) {
        return code;
    }
    if st.sessions.contains_key(&id) {
        STATUS_OK
    } else {
        STATUS_ERROR
    }
}

unsafe extern "C" fn contacts_compute_with_polygons(
    id: c_int,
    _node_mask: *const c_int,
    _polygons: *const GeometryListNative,
) -> c_int {
    let mut st = state();
    if let Some(code) = enter(&mut st) {
        return code;
    }
    if st.sessions.contains_key(&id) {
        STATUS_OK
    } else {
        STATUS_ERROR
    }
}

unsafe extern "C" fn contacts_compute_with_points(
    id: c_int,
    _node_mask: *const c_int,
    _points: *const GeometryListNative,
) -> c_int {
    let mut st = state();
    if let Some(code) = enter(&mut st) {
        return code;
    }
    if st.sessions.contains_key(&id) {
        STATUS_OK
    } else {
        STATUS_ERROR
    }
}

unsafe extern "C" fn contacts_compute_boundary(
    id: c_int,
    _node_mask: *const c_int,
    _polygons: *const GeometryListNative,
    _search_radius: c_double,
) -> c_int {
    let mut st = state();
    if let Some(code) = enter(&mut st) {
        return code;
    }
    if st.sessions.contains_key(&id) {
        STATUS_OK
    } else {
        STATUS_ERROR
    }
}

/// Entry-point table routing every operation to the stub.
#[must_use]
pub fn functions() -> KernelFunctions {
    KernelFunctions {
        allocate_state,
        deallocate_state,
        mesh2d_set,
        mesh2d_get_dimensions,
        mesh2d_get_data,
        mesh2d_insert_node,
        mesh2d_delete_node,
        mesh2d_move_node,
        mesh2d_merge_two_nodes,
        mesh2d_merge_nodes,
        mesh2d_get_node_index,
        mesh2d_get_closest_node,
        mesh2d_insert_edge,
        mesh2d_delete_edge,
        mesh2d_find_edge,
        mesh2d_flip_edges,
        mesh2d_delete,
        mesh2d_count_mesh_boundaries_as_polygons,
        mesh2d_get_mesh_boundaries_as_polygons,
        mesh2d_refine_based_on_samples,
        mesh2d_refine_based_on_polygon,
        mesh2d_make_mesh_from_polygon,
        mesh2d_make_mesh_from_samples,
        compute_orthogonalization,
        initialize_orthogonalization,
        prepare_outer_iteration_orthogonalization,
        compute_inner_orthogonalization_iteration,
        finalize_inner_orthogonalization_iteration,
        delete_orthogonalization,
        curvilinear_make_uniform,
        curvilinear_get_dimensions,
        curvilinear_get_data,
        get_splines,
        curvilinear_compute_transfinite_from_splines,
        curvilinear_compute_orthogonal_grid_from_splines,
        curvilinear_compute_transfinite_from_polygon,
        curvilinear_compute_transfinite_from_triangle,
        curvilinear_convert_to_mesh2d,
        polygon_count_offset,
        polygon_get_offset,
        polygon_count_refine,
        polygon_refine,
        get_points_in_polygon,
        count_nodes_in_polygons,
        get_nodes_in_polygons,
        get_orthogonality,
        get_smoothness,
        get_separator,
        get_inner_outer_separator,
        contacts_compute_single,
        contacts_compute_multiple,
        contacts_compute_with_polygons,
        contacts_compute_with_points,
        contacts_compute_boundary,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rectangular_connectivity_counts() {
        // 3x4 node lattice: nx*(ny-1) + ny*(nx-1) edges, (nx-1)*(ny-1) faces.
        let (edges, faces, per_face) = rectangular_connectivity(3, 4);
        assert_eq!(edges.len() / 2, 17);
        assert_eq!(per_face.len(), 6);
        assert_eq!(faces.len(), 24);
    }

    #[test]
    fn point_in_ring_unit_square() {
        let xs = [0.0, 1.0, 1.0, 0.0];
        let ys = [0.0, 0.0, 1.0, 1.0];
        assert!(point_in_ring(0.5, 0.5, &xs, &ys));
        assert!(!point_in_ring(1.5, 0.5, &xs, &ys));
    }
}

//! Integration tests for the kernel boundary, driven against the in-process
//! stub kernel.
//!
//! Tests relying on the stub's global hooks (forced statuses, invocation
//! counting) live in `stub_hooks.rs`, which serializes them; everything here
//! is safe to run in parallel.

use meshkernel::testutil::{rectangular_curvilinear_grid, rectangular_mesh2d};
use meshkernel::{
    GeometryList, KernelError, KernelHandle, MakeGridParameters, Mesh2d, MeshKernel, Polygon,
    Projection, ProjectToLandBoundary, ProtocolState, Ring,
};
use meshkernel_sys::KernelLibrary;
use pretty_assertions::assert_eq;
use rstest::rstest;

fn stub_kernel() -> MeshKernel {
    MeshKernel::new(KernelLibrary::stub())
}

fn square_ring(x0: f64, y0: f64, size: f64) -> Ring {
    Ring::from_points(&[
        (x0, y0),
        (x0 + size, y0),
        (x0 + size, y0 + size),
        (x0, y0 + size),
    ])
}

/// Uniform grid of `nx` by `ny` nodes with unit cells.
fn make_uniform(kernel: &MeshKernel, handle: KernelHandle, nx: usize, ny: usize) {
    let params = MakeGridParameters::square_cells(nx as i32 - 1, ny as i32 - 1, 1.0);
    kernel
        .curvilinear_make_uniform(handle, &params, &kernel.empty_geometry())
        .unwrap();
}

// Session lifecycle

#[test]
fn separators_are_fetched_from_the_kernel() {
    let kernel = stub_kernel();
    let separators = kernel.separators();
    assert_eq!(separators.geometry, -999.0);
    assert_eq!(separators.inner_outer, -998.0);
}

#[test]
fn allocate_and_release_state() {
    let kernel = stub_kernel();
    let handle = kernel.allocate_state(Projection::Cartesian).unwrap();
    kernel.deallocate_state(handle).unwrap();
}

#[test]
fn handles_are_unique_among_live_handles() {
    let kernel = stub_kernel();
    let a = kernel.allocate_state(Projection::Cartesian).unwrap();
    let b = kernel.allocate_state(Projection::Spherical).unwrap();
    assert_ne!(a, b);
    kernel.deallocate_state(a).unwrap();
    kernel.deallocate_state(b).unwrap();
}

#[test]
fn releasing_twice_yields_invalid_handle() {
    let kernel = stub_kernel();
    let handle = kernel.allocate_state(Projection::Cartesian).unwrap();
    kernel.deallocate_state(handle).unwrap();
    let err = kernel.deallocate_state(handle).unwrap_err();
    assert!(matches!(err, KernelError::InvalidHandle(_)));
}

#[test]
fn operations_on_released_handle_are_rejected() {
    let kernel = stub_kernel();
    let handle = kernel.allocate_state(Projection::Cartesian).unwrap();
    kernel.deallocate_state(handle).unwrap();
    let err = kernel.mesh2d_get_dimensions(handle).unwrap_err();
    assert!(matches!(err, KernelError::InvalidHandle(_)));
}

#[test]
fn forged_handle_is_rejected() {
    let kernel = stub_kernel();
    let forged = KernelHandle::from_raw(123_456);
    let err = kernel.mesh2d_get_data(forged).unwrap_err();
    assert!(matches!(err, KernelError::InvalidHandle(123_456)));
}

#[test]
fn scoped_state_releases_on_drop() {
    let kernel = stub_kernel();
    let handle = {
        let state = kernel.scoped_state(Projection::Cartesian).unwrap();
        state.handle()
    };
    let err = kernel.mesh2d_get_dimensions(handle).unwrap_err();
    assert!(matches!(err, KernelError::InvalidHandle(_)));
}

#[test]
fn scoped_state_explicit_release() {
    let kernel = stub_kernel();
    let state = kernel.scoped_state(Projection::Cartesian).unwrap();
    let handle = state.handle();
    state.release().unwrap();
    let err = kernel.deallocate_state(handle).unwrap_err();
    assert!(matches!(err, KernelError::InvalidHandle(_)));
}

// Bulk mesh exchange

#[test]
fn mesh_set_get_round_trip() {
    let kernel = stub_kernel();
    let state = kernel.scoped_state(Projection::Cartesian).unwrap();

    let mesh = rectangular_mesh2d(4, 3, 1.0, 1.0);
    kernel.mesh2d_set(state.handle(), &mesh).unwrap();
    let fetched = kernel.mesh2d_get_data(state.handle()).unwrap();
    assert_eq!(fetched, mesh);
}

#[test]
fn malformed_mesh_is_rejected_before_the_kernel() {
    let kernel = stub_kernel();
    let state = kernel.scoped_state(Projection::Cartesian).unwrap();

    let mut mesh = rectangular_mesh2d(3, 3, 1.0, 1.0);
    mesh.edge_nodes[0] = 99;
    let err = kernel.mesh2d_set(state.handle(), &mesh).unwrap_err();
    assert!(matches!(err, KernelError::InvalidInput { .. }));
}

#[test]
fn two_phase_fetch_lengths_match_dimension_query() {
    let kernel = stub_kernel();
    let state = kernel.scoped_state(Projection::Cartesian).unwrap();
    make_uniform(&kernel, state.handle(), 4, 4);

    let dims = kernel.mesh2d_get_dimensions(state.handle()).unwrap();
    let mesh = kernel.mesh2d_get_data(state.handle()).unwrap();
    assert_eq!(mesh.dimensions(), dims);
}

#[test]
fn rectangular_mesh_scenario_counts() {
    // 2 columns and 3 rows of cells: 3x4 nodes.
    let kernel = stub_kernel();
    let state = kernel.scoped_state(Projection::Cartesian).unwrap();
    let params = MakeGridParameters::square_cells(2, 3, 1.0);
    kernel
        .curvilinear_make_uniform(state.handle(), &params, &kernel.empty_geometry())
        .unwrap();

    let dims = kernel.mesh2d_get_dimensions(state.handle()).unwrap();
    assert_eq!(dims.node_count, 12);
    assert_eq!(dims.edge_count, 17);
}

#[rstest]
#[case(3, 4)]
#[case(4, 3)]
fn builder_agrees_with_kernel_mesh(#[case] nx: usize, #[case] ny: usize) {
    let kernel = stub_kernel();
    let state = kernel.scoped_state(Projection::Cartesian).unwrap();
    make_uniform(&kernel, state.handle(), nx, ny);
    let from_kernel = kernel.mesh2d_get_data(state.handle()).unwrap();

    let built = rectangular_mesh2d(nx, ny, 1.0, 1.0);
    assert_eq!(built.node_x, from_kernel.node_x);
    assert_eq!(built.node_y, from_kernel.node_y);
    assert_eq!(built.edge_nodes, from_kernel.edge_nodes);
}

#[rstest]
#[case(3, 4)]
#[case(4, 3)]
fn builder_agrees_with_kernel_grid(#[case] nx: usize, #[case] ny: usize) {
    let kernel = stub_kernel();
    let state = kernel.scoped_state(Projection::Cartesian).unwrap();
    make_uniform(&kernel, state.handle(), nx, ny);
    let from_kernel = kernel.curvilinear_get_data(state.handle()).unwrap();

    let built = rectangular_curvilinear_grid(ny, nx, 1.0, 1.0);
    assert_eq!(from_kernel, built);
    assert_eq!(from_kernel.rows * from_kernel.columns, from_kernel.node_count());
}

#[test]
fn curvilinear_dimensions_match_data() {
    let kernel = stub_kernel();
    let state = kernel.scoped_state(Projection::Cartesian).unwrap();
    make_uniform(&kernel, state.handle(), 5, 3);

    let dims = kernel.curvilinear_get_dimensions(state.handle()).unwrap();
    assert_eq!(dims.columns, 5);
    assert_eq!(dims.rows, 3);
    let grid = kernel.curvilinear_get_data(state.handle()).unwrap();
    assert_eq!(grid.node_count(), dims.node_count());
}

// Node and edge operations

#[test]
fn node_operations_round_trip() {
    let kernel = stub_kernel();
    let state = kernel.scoped_state(Projection::Cartesian).unwrap();
    make_uniform(&kernel, state.handle(), 3, 3);

    let index = kernel
        .mesh2d_insert_node(state.handle(), 10.0, 10.0)
        .unwrap();
    assert_eq!(index, 9);

    kernel
        .mesh2d_move_node(state.handle(), 11.0, 11.0, index)
        .unwrap();
    let nearest = kernel
        .mesh2d_node_index(state.handle(), 11.2, 11.2, 1.0)
        .unwrap();
    assert_eq!(nearest, index);

    let (x, y) = kernel
        .mesh2d_closest_node(state.handle(), 11.2, 11.2, 1.0)
        .unwrap();
    assert_eq!((x, y), (11.0, 11.0));

    kernel.mesh2d_delete_node(state.handle(), index).unwrap();
    let dims = kernel.mesh2d_get_dimensions(state.handle()).unwrap();
    assert_eq!(dims.node_count, 9);
}

#[test]
fn nearest_node_outside_radius_is_a_native_failure() {
    let kernel = stub_kernel();
    let state = kernel.scoped_state(Projection::Cartesian).unwrap();
    make_uniform(&kernel, state.handle(), 3, 3);

    let err = kernel
        .mesh2d_node_index(state.handle(), 50.0, 50.0, 0.1)
        .unwrap_err();
    assert!(matches!(err, KernelError::NativeFailure { .. }));
}

#[test]
fn edge_operations_round_trip() {
    let kernel = stub_kernel();
    let state = kernel.scoped_state(Projection::Cartesian).unwrap();
    make_uniform(&kernel, state.handle(), 3, 3);
    let before = kernel.mesh2d_get_dimensions(state.handle()).unwrap();

    // The first edge of the uniform grid runs from (0,0) to (1,0).
    let found = kernel.mesh2d_find_edge(state.handle(), 0.5, 0.01).unwrap();
    assert_eq!(found, 0);

    kernel.mesh2d_delete_edge(state.handle(), 0.5, 0.01).unwrap();
    let after = kernel.mesh2d_get_dimensions(state.handle()).unwrap();
    assert_eq!(after.edge_count, before.edge_count - 1);

    let index = kernel.mesh2d_insert_edge(state.handle(), 0, 1).unwrap();
    assert_eq!(index, after.edge_count);
}

#[test]
fn merge_two_nodes_shrinks_the_mesh() {
    let kernel = stub_kernel();
    let state = kernel.scoped_state(Projection::Cartesian).unwrap();
    make_uniform(&kernel, state.handle(), 3, 3);

    kernel.mesh2d_merge_two_nodes(state.handle(), 0, 1).unwrap();
    let dims = kernel.mesh2d_get_dimensions(state.handle()).unwrap();
    assert_eq!(dims.node_count, 8);
}

// Polygon operations

#[test]
fn polygon_offset_preserves_vertex_count() {
    let kernel = stub_kernel();
    let state = kernel.scoped_state(Projection::Cartesian).unwrap();

    let polygon = GeometryList::from_polygons(
        &[Polygon::simple(square_ring(0.0, 0.0, 10.0))],
        kernel.separators(),
    );
    let offset = kernel
        .polygon_offset(state.handle(), &polygon, false, 1.0)
        .unwrap();
    assert_eq!(offset.len(), polygon.len());
}

#[test]
fn polygon_refine_inserts_vertices_between_indices() {
    let kernel = stub_kernel();
    let state = kernel.scoped_state(Projection::Cartesian).unwrap();

    let polygon = GeometryList::from_polygons(
        &[Polygon::simple(square_ring(0.0, 0.0, 10.0))],
        kernel.separators(),
    );
    let refined = kernel
        .polygon_refine(state.handle(), &polygon, 0, 2, 1.0)
        .unwrap();
    assert_eq!(refined.len(), polygon.len() + 2);
}

#[test]
fn points_in_polygon_masks_the_values_channel() {
    let kernel = stub_kernel();
    let state = kernel.scoped_state(Projection::Cartesian).unwrap();
    let separators = kernel.separators();

    let polygon =
        GeometryList::from_polygons(&[Polygon::simple(square_ring(0.0, 0.0, 10.0))], separators);
    let points = GeometryList::from_coordinates(
        vec![5.0, 20.0, 1.0],
        vec![5.0, 20.0, 1.0],
        separators,
    )
    .unwrap();

    let selected = kernel
        .points_in_polygon(state.handle(), &polygon, &points)
        .unwrap();
    assert_eq!(selected.selection_mask(), &[1.0, 0.0, 1.0]);
    assert_eq!(selected.selected_indices(), vec![0, 2]);
    // Coordinates pass through unchanged alongside the mask.
    assert_eq!(selected.x_coordinates(), points.x_coordinates());
}

#[test]
fn nodes_in_polygons_selects_grid_corner() {
    let kernel = stub_kernel();
    let state = kernel.scoped_state(Projection::Cartesian).unwrap();
    make_uniform(&kernel, state.handle(), 3, 3);

    let polygon = GeometryList::from_polygons(
        &[Polygon::simple(square_ring(-0.5, -0.5, 2.0))],
        kernel.separators(),
    );
    let inside = kernel
        .nodes_in_polygons(state.handle(), &polygon, true)
        .unwrap();
    assert_eq!(inside, vec![0, 1, 3, 4]);

    let outside = kernel
        .nodes_in_polygons(state.handle(), &polygon, false)
        .unwrap();
    assert_eq!(outside.len(), 5);
}

#[test]
fn boundary_polygon_is_a_closed_ring() {
    let kernel = stub_kernel();
    let state = kernel.scoped_state(Projection::Cartesian).unwrap();
    make_uniform(&kernel, state.handle(), 3, 3);

    let boundary = kernel.mesh2d_boundary_polygons(state.handle()).unwrap();
    // 8 perimeter nodes plus the repeated starting corner.
    assert_eq!(boundary.len(), 9);
    assert_eq!(
        boundary.x_coordinates().first(),
        boundary.x_coordinates().last()
    );
    assert_eq!(
        boundary.y_coordinates().first(),
        boundary.y_coordinates().last()
    );
}

// Splines and mesh quality

#[test]
fn splines_interpolate_between_corners() {
    let kernel = stub_kernel();
    let corners = GeometryList::from_coordinates(
        vec![0.0, 4.0],
        vec![0.0, 0.0],
        kernel.separators(),
    )
    .unwrap();

    let spline = kernel.get_splines(&corners, 3).unwrap();
    assert_eq!(spline.len(), 5);
    assert_eq!(spline.x_coordinates(), &[0.0, 1.0, 2.0, 3.0, 4.0]);
}

#[test]
fn orthogonality_and_smoothness_cover_every_edge() {
    let kernel = stub_kernel();
    let state = kernel.scoped_state(Projection::Cartesian).unwrap();
    make_uniform(&kernel, state.handle(), 3, 4);
    let dims = kernel.mesh2d_get_dimensions(state.handle()).unwrap();

    let orthogonality = kernel.mesh2d_orthogonality(state.handle()).unwrap();
    assert_eq!(orthogonality.orthogonality_values().len(), dims.edge_count);
    assert!(orthogonality
        .orthogonality_values()
        .iter()
        .all(|&v| v == 0.0));

    let smoothness = kernel.mesh2d_smoothness(state.handle()).unwrap();
    assert_eq!(smoothness.smoothness_values().len(), dims.edge_count);
    assert!(smoothness.smoothness_values().iter().all(|&v| v == 1.0));
}

// Whole-mesh operations

#[test]
fn mesh_wide_operations_succeed_on_a_live_state() {
    let kernel = stub_kernel();
    let state = kernel.scoped_state(Projection::Cartesian).unwrap();
    make_uniform(&kernel, state.handle(), 4, 4);
    let separators = kernel.separators();

    let polygon =
        GeometryList::from_polygons(&[Polygon::simple(square_ring(0.0, 0.0, 3.0))], separators);
    let empty = kernel.empty_geometry();

    kernel
        .mesh2d_flip_edges(
            state.handle(),
            true,
            ProjectToLandBoundary::No,
            &polygon,
            &empty,
        )
        .unwrap();
    kernel
        .mesh2d_refine_based_on_polygon(state.handle(), &polygon, &Default::default())
        .unwrap();
    kernel
        .mesh2d_refine_based_on_samples(
            state.handle(),
            &polygon,
            &Default::default(),
            &Default::default(),
        )
        .unwrap();
    kernel
        .mesh2d_make_from_polygon(state.handle(), &polygon)
        .unwrap();
    kernel
        .mesh2d_make_from_samples(state.handle(), &polygon)
        .unwrap();
    kernel
        .compute_orthogonalization(
            state.handle(),
            ProjectToLandBoundary::No,
            &Default::default(),
            &polygon,
            &empty,
        )
        .unwrap();
    kernel
        .curvilinear_convert_to_mesh2d(state.handle())
        .unwrap();
    kernel
        .contacts_compute_multiple(state.handle(), &[1, 0, 1])
        .unwrap();
    kernel
        .contacts_compute_boundary(state.handle(), &[1, 1], &polygon, 5.0)
        .unwrap();
}

// Interactive orthogonalization protocol

#[test]
fn orthogonalization_sequence_runs_in_order() {
    let kernel = stub_kernel();
    let state = kernel.scoped_state(Projection::Cartesian).unwrap();
    make_uniform(&kernel, state.handle(), 3, 3);

    let mut session = kernel.orthogonalization(state.handle());
    assert_eq!(session.state(), ProtocolState::Uninitialized);

    session
        .initialize(
            ProjectToLandBoundary::No,
            &Default::default(),
            &kernel.empty_geometry(),
            &kernel.empty_geometry(),
        )
        .unwrap();
    assert_eq!(session.state(), ProtocolState::OuterPrepared);

    for _ in 0..2 {
        session.prepare_outer_iteration().unwrap();
        assert_eq!(session.state(), ProtocolState::Iterating);
        session.inner_iteration().unwrap();
        session.inner_iteration().unwrap();
        session.finalize_outer_iteration().unwrap();
        assert_eq!(session.state(), ProtocolState::Finalized);
    }

    session.delete().unwrap();
    assert_eq!(session.state(), ProtocolState::Uninitialized);
}

#[test]
fn inner_iteration_before_prepare_is_a_state_failure() {
    let kernel = stub_kernel();
    let state = kernel.scoped_state(Projection::Cartesian).unwrap();

    let mut session = kernel.orthogonalization(state.handle());
    session
        .initialize(
            ProjectToLandBoundary::No,
            &Default::default(),
            &kernel.empty_geometry(),
            &kernel.empty_geometry(),
        )
        .unwrap();

    let err = session.inner_iteration().unwrap_err();
    assert!(matches!(
        err,
        KernelError::StateFailure {
            state: ProtocolState::OuterPrepared,
            ..
        }
    ));
}

#[test]
fn steps_after_delete_are_state_failures() {
    let kernel = stub_kernel();
    let state = kernel.scoped_state(Projection::Cartesian).unwrap();

    let mut session = kernel.orthogonalization(state.handle());
    session
        .initialize(
            ProjectToLandBoundary::No,
            &Default::default(),
            &kernel.empty_geometry(),
            &kernel.empty_geometry(),
        )
        .unwrap();
    session.delete().unwrap();

    assert!(matches!(
        session.prepare_outer_iteration().unwrap_err(),
        KernelError::StateFailure { .. }
    ));
    assert!(matches!(
        session.inner_iteration().unwrap_err(),
        KernelError::StateFailure { .. }
    ));
    assert!(matches!(
        session.finalize_outer_iteration().unwrap_err(),
        KernelError::StateFailure { .. }
    ));
}

#[test]
fn uninitialized_session_rejects_every_step() {
    let kernel = stub_kernel();
    let state = kernel.scoped_state(Projection::Cartesian).unwrap();

    let mut session = kernel.orthogonalization(state.handle());
    assert!(matches!(
        session.prepare_outer_iteration().unwrap_err(),
        KernelError::StateFailure { .. }
    ));
    // Deleting an uninitialized session is a no-op, not an error.
    session.delete().unwrap();
}

#[test]
fn initialize_twice_is_a_state_failure() {
    let kernel = stub_kernel();
    let state = kernel.scoped_state(Projection::Cartesian).unwrap();

    let mut session = kernel.orthogonalization(state.handle());
    let empty = kernel.empty_geometry();
    session
        .initialize(ProjectToLandBoundary::No, &Default::default(), &empty, &empty)
        .unwrap();
    let err = session
        .initialize(ProjectToLandBoundary::No, &Default::default(), &empty, &empty)
        .unwrap_err();
    assert!(matches!(err, KernelError::StateFailure { .. }));
}

// Mesh construction from a hand-built mesh

#[test]
fn hand_built_mesh_passes_through_the_boundary() {
    let kernel = stub_kernel();
    let state = kernel.scoped_state(Projection::Cartesian).unwrap();

    let mesh = Mesh2d {
        node_x: vec![0.0, 1.0, 0.5],
        node_y: vec![0.0, 0.0, 1.0],
        edge_nodes: vec![0, 1, 1, 2, 2, 0],
        face_nodes: vec![0, 1, 2],
        nodes_per_face: vec![3],
    };
    kernel.mesh2d_set(state.handle(), &mesh).unwrap();

    let dims = kernel.mesh2d_get_dimensions(state.handle()).unwrap();
    assert_eq!(dims.node_count, 3);
    assert_eq!(dims.edge_count, 3);
    assert_eq!(dims.face_count, 1);
    assert_eq!(dims.face_node_count, 3);
}

//! Tests driving the stub kernel's global hooks (forced statuses and
//! invocation counting).
//!
//! The hooks act on process-global state, so every test here serializes on
//! one mutex. This file is its own test binary; tests in other files run in
//! other processes and cannot interfere.

use std::sync::Mutex;

use meshkernel::{
    GeometryList, KernelError, KernelHandle, MeshKernel, Polygon, Projection, Ring,
};
use meshkernel_sys::{stub, KernelLibrary};

static HOOKS: Mutex<()> = Mutex::new(());

fn stub_kernel() -> MeshKernel {
    MeshKernel::new(KernelLibrary::stub())
}

fn unit_square(kernel: &MeshKernel) -> GeometryList {
    let ring = Ring::from_points(&[(0.0, 0.0), (1.0, 0.0), (1.0, 1.0), (0.0, 1.0)]);
    GeometryList::from_polygons(&[Polygon::simple(ring)], kernel.separators())
}

#[test]
fn forced_status_surfaces_as_native_failure_with_the_same_code() {
    let _hooks = HOOKS.lock().unwrap();
    let kernel = stub_kernel();
    let handle = kernel.allocate_state(Projection::Cartesian).unwrap();

    stub::force_status(42);
    let err = kernel.mesh2d_get_dimensions(handle).unwrap_err();
    match err {
        KernelError::NativeFailure { operation, code } => {
            assert_eq!(operation, "mkernel_mesh2d_get_dimensions");
            assert_eq!(code, 42);
        }
        other => panic!("expected NativeFailure, got {other:?}"),
    }

    // The failure was not retried and did not kill the session.
    kernel.mesh2d_get_dimensions(handle).unwrap();
    kernel.deallocate_state(handle).unwrap();
}

#[test]
fn forced_status_on_a_packed_operation_still_releases_buffers() {
    let _hooks = HOOKS.lock().unwrap();
    let kernel = stub_kernel();
    let handle = kernel.allocate_state(Projection::Cartesian).unwrap();
    let polygon = unit_square(&kernel);

    stub::force_status(-3);
    let err = kernel.mesh2d_merge_nodes(handle, &polygon).unwrap_err();
    assert_eq!(err.native_code(), Some(-3));

    // The packed buffers were dropped on the failure path; the same list
    // packs and crosses the boundary again cleanly.
    kernel.mesh2d_merge_nodes(handle, &polygon).unwrap();
    kernel.deallocate_state(handle).unwrap();
}

#[test]
fn invalid_handle_short_circuits_before_any_native_invocation() {
    let _hooks = HOOKS.lock().unwrap();
    let kernel = stub_kernel();

    let before = stub::call_count();
    let err = kernel
        .mesh2d_get_data(KernelHandle::from_raw(777_777))
        .unwrap_err();
    assert!(matches!(err, KernelError::InvalidHandle(777_777)));
    assert_eq!(stub::call_count(), before);
}

#[test]
fn released_handle_short_circuits_before_any_native_invocation() {
    let _hooks = HOOKS.lock().unwrap();
    let kernel = stub_kernel();
    let handle = kernel.allocate_state(Projection::Cartesian).unwrap();
    kernel.deallocate_state(handle).unwrap();

    let before = stub::call_count();
    let polygon = unit_square(&kernel);
    let err = kernel.mesh2d_merge_nodes(handle, &polygon).unwrap_err();
    assert!(matches!(err, KernelError::InvalidHandle(_)));
    assert_eq!(stub::call_count(), before);
}

#[test]
fn state_failure_short_circuits_before_any_native_invocation() {
    let _hooks = HOOKS.lock().unwrap();
    let kernel = stub_kernel();
    let handle = kernel.allocate_state(Projection::Cartesian).unwrap();

    let mut session = kernel.orthogonalization(handle);
    let before = stub::call_count();
    let err = session.inner_iteration().unwrap_err();
    assert!(matches!(err, KernelError::StateFailure { .. }));
    assert_eq!(stub::call_count(), before);

    kernel.deallocate_state(handle).unwrap();
}

#[test]
fn failed_native_release_still_invalidates_the_handle() {
    let _hooks = HOOKS.lock().unwrap();
    let kernel = stub_kernel();
    let handle = kernel.allocate_state(Projection::Cartesian).unwrap();

    stub::force_status(13);
    let err = kernel.deallocate_state(handle).unwrap_err();
    assert_eq!(err.native_code(), Some(13));

    // The registry dropped the id first; the handle is gone for good.
    let err = kernel.deallocate_state(handle).unwrap_err();
    assert!(matches!(err, KernelError::InvalidHandle(_)));
    // Clean up the stub-side session the failed release left behind.
    stub::reset();
}

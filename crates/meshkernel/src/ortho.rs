//! Interactive orthogonalization protocol.
//!
//! A small state machine layered over the dispatcher. Out-of-order calls
//! are [`KernelError::StateFailure`] raised before the kernel is touched;
//! they are protocol violations, not native errors.

use crate::error::{KernelError, Result};
use crate::geometry::{GeometryList, PackedGeometry};
use crate::kernel::{KernelHandle, MeshKernel, ProjectToLandBoundary};
use crate::params::OrthogonalizationParameters;

/// Where an interactive sequence currently stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProtocolState {
    /// Nothing initialized; only `initialize` is allowed.
    Uninitialized,
    /// Initialized, ready for the first outer iteration.
    OuterPrepared,
    /// Inside an outer iteration; inner iterations may repeat.
    Iterating,
    /// Outer iteration finalized; another may be prepared.
    Finalized,
}

/// One interactive orthogonalization sequence against a kernel state.
///
/// Transitions: `initialize` (Uninitialized → OuterPrepared),
/// `prepare_outer_iteration` (OuterPrepared/Finalized → Iterating),
/// `inner_iteration` (Iterating → Iterating), `finalize_outer_iteration`
/// (Iterating → Finalized), `delete` (any → Uninitialized).
#[derive(Debug)]
pub struct OrthogonalizationSession<'a> {
    kernel: &'a MeshKernel,
    handle: KernelHandle,
    state: ProtocolState,
}

impl<'a> OrthogonalizationSession<'a> {
    pub(crate) fn new(kernel: &'a MeshKernel, handle: KernelHandle) -> Self {
        Self {
            kernel,
            handle,
            state: ProtocolState::Uninitialized,
        }
    }

    /// The state handle this sequence operates on.
    #[must_use]
    pub fn handle(&self) -> KernelHandle {
        self.handle
    }

    /// Current protocol state.
    #[must_use]
    pub fn state(&self) -> ProtocolState {
        self.state
    }

    fn expect(&self, operation: &'static str, allowed: &[ProtocolState]) -> Result<()> {
        if allowed.contains(&self.state) {
            Ok(())
        } else {
            Err(KernelError::StateFailure {
                operation,
                state: self.state,
            })
        }
    }

    /// Set up the kernel-side orthogonalization state.
    pub fn initialize(
        &mut self,
        project: ProjectToLandBoundary,
        parameters: &OrthogonalizationParameters,
        polygon: &GeometryList,
        land_boundaries: &GeometryList,
    ) -> Result<()> {
        self.expect(
            "mkernel_mesh2d_initialize_orthogonalization",
            &[ProtocolState::Uninitialized],
        )?;
        self.kernel.ensure_live(self.handle)?;
        let polygon = PackedGeometry::pack(polygon)?;
        let land = PackedGeometry::pack(land_boundaries)?;
        let parameters = parameters.to_native();
        let status = unsafe {
            (self.kernel.functions().initialize_orthogonalization)(
                self.handle.as_raw(),
                project.to_native(),
                &parameters,
                polygon.native_ptr(),
                land.native_ptr(),
            )
        };
        self.kernel
            .check("mkernel_mesh2d_initialize_orthogonalization", status)?;
        self.state = ProtocolState::OuterPrepared;
        Ok(())
    }

    /// Begin an outer iteration.
    pub fn prepare_outer_iteration(&mut self) -> Result<()> {
        self.expect(
            "mkernel_prepare_outer_iteration_orthogonalization_mesh2d",
            &[ProtocolState::OuterPrepared, ProtocolState::Finalized],
        )?;
        self.kernel.ensure_live(self.handle)?;
        let status = unsafe {
            (self
                .kernel
                .functions()
                .prepare_outer_iteration_orthogonalization)(self.handle.as_raw())
        };
        self.kernel.check(
            "mkernel_prepare_outer_iteration_orthogonalization_mesh2d",
            status,
        )?;
        self.state = ProtocolState::Iterating;
        Ok(())
    }

    /// One inner iteration; repeatable while iterating.
    pub fn inner_iteration(&mut self) -> Result<()> {
        self.expect(
            "mkernel_compute_inner_ortogonalization_iteration_mesh2d",
            &[ProtocolState::Iterating],
        )?;
        self.kernel.ensure_live(self.handle)?;
        let status = unsafe {
            (self
                .kernel
                .functions()
                .compute_inner_orthogonalization_iteration)(self.handle.as_raw())
        };
        self.kernel.check(
            "mkernel_compute_inner_ortogonalization_iteration_mesh2d",
            status,
        )
    }

    /// Close the current outer iteration.
    pub fn finalize_outer_iteration(&mut self) -> Result<()> {
        self.expect(
            "mkernel_finalize_inner_ortogonalization_iteration_mesh2d",
            &[ProtocolState::Iterating],
        )?;
        self.kernel.ensure_live(self.handle)?;
        let status = unsafe {
            (self
                .kernel
                .functions()
                .finalize_inner_orthogonalization_iteration)(self.handle.as_raw())
        };
        self.kernel.check(
            "mkernel_finalize_inner_ortogonalization_iteration_mesh2d",
            status,
        )?;
        self.state = ProtocolState::Finalized;
        Ok(())
    }

    /// Tear down the kernel-side orthogonalization state; allowed from any
    /// state and resets the sequence to `Uninitialized`.
    pub fn delete(&mut self) -> Result<()> {
        if self.state == ProtocolState::Uninitialized {
            return Ok(());
        }
        self.kernel.ensure_live(self.handle)?;
        let status = unsafe {
            (self.kernel.functions().delete_orthogonalization)(self.handle.as_raw())
        };
        self.kernel
            .check("mkernel_delete_orthogonalization_mesh2d", status)?;
        self.state = ProtocolState::Uninitialized;
        Ok(())
    }
}

//! Safe bindings for the `MeshKernelApi` mesh-generation kernel.
//!
//! The kernel itself is an opaque native library; this crate owns the
//! boundary to it:
//! - session identity: handles issued and tracked by [`MeshKernel`],
//!   rejected after release and never reused
//! - marshaling: [`GeometryList`] packing/unpacking with the kernel's two
//!   reserved sentinel separators, fetched once and applied uniformly
//! - two-phase transfer: [`Mesh2d`] and [`CurvilinearGrid`] fetched via a
//!   dimension query followed by a fetch into exactly-sized buffers
//! - lifecycle discipline: every foreign buffer is scoped to one operation
//!   and released on every exit path
//!
//! Nonzero kernel statuses surface as [`KernelError::NativeFailure`] with
//! the raw code carried through unmodified.
//!
//! # Concurrency
//!
//! Calls are synchronous and blocking with no cancellation. Distinct
//! handles may be used from independent threads; all operations against one
//! handle must be externally serialized by the caller.
//!
//! # Example
//!
//! ```no_run
//! use meshkernel::{MakeGridParameters, MeshKernel, Projection};
//!
//! # fn main() -> meshkernel::Result<()> {
//! let kernel = MeshKernel::load_default()?;
//! let handle = kernel.allocate_state(Projection::Cartesian)?;
//!
//! let params = MakeGridParameters::square_cells(2, 3, 1.0);
//! kernel.curvilinear_make_uniform(handle, &params, &kernel.empty_geometry())?;
//! let mesh = kernel.mesh2d_get_data(handle)?;
//! assert_eq!(mesh.node_count(), 12);
//!
//! kernel.deallocate_state(handle)?;
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod geometry;
pub mod kernel;
pub mod mesh2d;
pub mod ortho;
pub mod params;
pub mod scoped;
pub mod testutil;

pub use error::{KernelError, Result};
pub use geometry::{GeometryList, Polygon, Ring, Separators};
pub use kernel::{
    DeletionOption, KernelHandle, MeshKernel, Projection, ProjectToLandBoundary, ScopedState,
};
pub use mesh2d::{CurvilinearDimensions, CurvilinearGrid, Mesh2d, Mesh2dDimensions};
pub use ortho::{OrthogonalizationSession, ProtocolState};
pub use params::{
    CurvilinearParameters, InterpolationParameters, MakeGridParameters,
    OrthogonalizationParameters, SamplesRefineParameters, SplinesToCurvilinearParameters,
};
pub use scoped::ScopedBuffer;

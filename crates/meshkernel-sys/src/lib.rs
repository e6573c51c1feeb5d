//! Raw ABI surface for the `MeshKernelApi` native library.
//!
//! This crate defines the flat foreign-call boundary exactly as the native
//! kernel exposes it:
//! - `#[repr(C)]` parameter records and data descriptors ([`types`])
//! - one function pointer per `mkernel_*` entry point, resolved once into a
//!   [`KernelFunctions`] table ([`functions`])
//! - dynamic library loading with platform-specific naming and search paths
//!
//! Every entry point returns an integer status: `0` means success, any other
//! value is an opaque kernel failure code. This crate does not interpret
//! status codes, manage handles, or own buffers; that is the job of the
//! safe `meshkernel` crate layered on top.
//!
//! # Safety
//!
//! Calling through a [`KernelFunctions`] table is `unsafe`: the caller must
//! uphold the native contract (valid pointers, array lengths matching the
//! declared counts, single-writer use of each kernel state id).

pub mod functions;
pub mod types;

#[cfg(feature = "stub-kernel")]
pub mod stub;

pub use functions::{KernelFunctions, KernelLibrary, LoadError};
pub use types::{
    CurvilinearGridNative, CurvilinearParametersNative, GeometryListNative,
    InterpolationParametersNative, MakeGridParametersNative, Mesh2dNative,
    OrthogonalizationParametersNative, SamplesRefineParametersNative,
    SplinesToCurvilinearParametersNative, PROJECTION_CARTESIAN, PROJECTION_SPHERICAL,
    PROJECTION_SPHERICAL_ACCURATE,
};

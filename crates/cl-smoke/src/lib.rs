//! Lists compute platforms and devices, then adds two 10-element integer
//! vectors on the first device of the first platform.
//!
//! The pipeline in [`run`] is written against the [`Backend`] /
//! [`ComputeContext`] capability traits. [`OpenClBackend`] drives a real
//! OpenCL runtime; [`HostBackend`] is an in-process reference device used by
//! the tests and benches.

pub mod backend;
pub mod buffer;
pub mod config;
pub mod error;
pub mod kernel;
#[cfg(feature = "metrics")]
pub mod metrics;
pub mod run;

pub use backend::host::{HostBackend, HostContext, HostPlatform, HostStats};
#[cfg(feature = "opencl")]
pub use backend::opencl::{OpenClBackend, OpenClContext};
pub use backend::{Backend, ComputeContext};
pub use buffer::DeviceBuffer;
pub use buffer::state::{Empty, InFlight, Ready, State};
pub use config::{ELEMENTS, INPUT_A, INPUT_B, RunConfig};
pub use error::{Error, Result};
pub use run::{run, vector_add};

#[cfg(feature = "metrics")]
pub use metrics::{ALLOC_BYTES, ALLOCS, WRITE_BYTES, record, summary};

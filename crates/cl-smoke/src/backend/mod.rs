//! Capability interface the run pipeline is written against.
//!
//! `Backend` covers discovery (platforms, devices, context creation) and
//! `ComputeContext` covers everything bound to one device: program builds,
//! buffers, dispatch and the two blocking points (event wait, read-back).

use crate::error::Result;

pub mod host;
#[cfg(feature = "opencl")]
pub mod opencl;

pub trait Backend {
    type Platform;
    type Device;
    type Context: ComputeContext;

    fn platforms(&self) -> Result<Vec<Self::Platform>>;
    fn platform_name(&self, platform: &Self::Platform) -> Result<String>;
    /// All devices of the platform, regardless of device type.
    fn devices(&self, platform: &Self::Platform) -> Result<Vec<Self::Device>>;
    fn device_name(&self, device: &Self::Device) -> Result<String>;
    /// Context and in-order queue bound to exactly one device.
    fn create_context(&self, device: &Self::Device) -> Result<Self::Context>;
}

pub trait ComputeContext {
    type Program;
    type Buffer;
    type Event;

    /// Compiles `source` for the context's device. A failed build returns
    /// `Error::Build` with the compiler log.
    fn build_program(&self, source: &str) -> Result<Self::Program>;

    /// Read/write buffer of `len` 32-bit integers, contents undefined.
    fn create_buffer(&self, len: usize) -> Result<Self::Buffer>;

    /// Blocking host-to-device copy.
    fn write_buffer(&self, buffer: &mut Self::Buffer, data: &[i32]) -> Result<()>;

    /// Binds `args` positionally and dispatches over a 1-D range of
    /// `global_size` lanes, offset 0, local size left to the runtime.
    fn enqueue_kernel(
        &self,
        program: &Self::Program,
        kernel_name: &str,
        args: &[&Self::Buffer],
        global_size: usize,
    ) -> Result<Self::Event>;

    fn wait(&self, event: Self::Event) -> Result<()>;

    /// Blocking device-to-host copy.
    fn read_buffer(&self, buffer: &Self::Buffer, out: &mut [i32]) -> Result<()>;
}

//! `opencl3` implementation of the capability interface.

use std::ptr;

use opencl3::{
    command_queue::CommandQueue,
    context::Context,
    device::{CL_DEVICE_TYPE_ALL, Device},
    error_codes::CL_BUILD_PROGRAM_FAILURE,
    event::Event,
    kernel::{ExecuteKernel, Kernel},
    memory::{Buffer, CL_MEM_READ_WRITE},
    platform::{Platform, get_platforms},
    program::Program,
    types::{CL_BLOCKING, cl_device_id, cl_int},
};
use tracing::debug;

use super::{Backend, ComputeContext};
use crate::error::{Error, Result};

/// Talks to whatever ICD loader the process is linked against.
#[derive(Debug, Default, Clone, Copy)]
pub struct OpenClBackend;

impl Backend for OpenClBackend {
    type Platform = Platform;
    type Device = Device;
    type Context = OpenClContext;

    fn platforms(&self) -> Result<Vec<Platform>> {
        Ok(get_platforms()?)
    }

    fn platform_name(&self, platform: &Platform) -> Result<String> {
        Ok(platform.name()?)
    }

    fn devices(&self, platform: &Platform) -> Result<Vec<Device>> {
        let ids = platform.get_devices(CL_DEVICE_TYPE_ALL)?;
        Ok(ids.into_iter().map(Device::new).collect())
    }

    fn device_name(&self, device: &Device) -> Result<String> {
        Ok(device.name()?)
    }

    fn create_context(&self, device: &Device) -> Result<OpenClContext> {
        let context = Context::from_device(device)?;
        #[allow(deprecated)]
        let queue = CommandQueue::create(&context, device.id(), 0)?;
        Ok(OpenClContext { device: device.id(), queue, context })
    }
}

/// Context and queue of the selected execution target.
///
/// Field order matters: the queue is released before its context.
pub struct OpenClContext {
    device: cl_device_id,
    queue: CommandQueue,
    context: Context,
}

impl ComputeContext for OpenClContext {
    type Program = Program;
    type Buffer = Buffer<cl_int>;
    type Event = Event;

    fn build_program(&self, source: &str) -> Result<Program> {
        let mut program = Program::create_from_source(&self.context, source)?;
        match program.build(self.context.devices(), "") {
            Ok(()) => Ok(program),
            // Only the compiler's log is reported, not the status name.
            Err(e) if e.0 == CL_BUILD_PROGRAM_FAILURE => Err(Error::Build {
                log: program.get_build_log(self.device)?,
            }),
            Err(e) => Err(e.into()),
        }
    }

    fn create_buffer(&self, len: usize) -> Result<Buffer<cl_int>> {
        let buffer = unsafe {
            Buffer::<cl_int>::create(&self.context, CL_MEM_READ_WRITE, len, ptr::null_mut())?
        };
        Ok(buffer)
    }

    fn write_buffer(&self, buffer: &mut Buffer<cl_int>, data: &[i32]) -> Result<()> {
        unsafe {
            self.queue.enqueue_write_buffer(buffer, CL_BLOCKING, 0, data, &[])?;
        }
        Ok(())
    }

    fn enqueue_kernel(
        &self,
        program: &Program,
        kernel_name: &str,
        args: &[&Buffer<cl_int>],
        global_size: usize,
    ) -> Result<Event> {
        let kernel = Kernel::create(program, kernel_name)?;
        debug!(kernel = kernel_name, args = args.len(), global_size, "enqueue nd-range");
        let event = unsafe {
            let mut exec = ExecuteKernel::new(&kernel);
            for arg in args {
                exec.set_arg(*arg);
            }
            exec.set_global_work_size(global_size).enqueue_nd_range(&self.queue)?
        };
        Ok(event)
    }

    fn wait(&self, event: Event) -> Result<()> {
        event.wait()?;
        Ok(())
    }

    fn read_buffer(&self, buffer: &Buffer<cl_int>, out: &mut [i32]) -> Result<()> {
        unsafe {
            self.queue.enqueue_read_buffer(buffer, CL_BLOCKING, 0, out, &[])?;
        }
        Ok(())
    }
}

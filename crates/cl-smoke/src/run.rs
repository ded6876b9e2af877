//! The linear pipeline: enumerate, select, compile, execute, report.
//!
//! Everything the user sees goes to `out`. Fatal conditions print their
//! diagnostic there first and then come back as `Err`.

use std::io::Write;
#[cfg(feature = "metrics")]
use std::time::Instant;

use tracing::{debug, info, warn};

use crate::backend::{Backend, ComputeContext};
use crate::buffer::{DeviceBuffer, state::Empty};
use crate::config::{ELEMENTS, RunConfig};
use crate::error::{Error, Result};

pub const NO_PLATFORMS: &str = " No platforms found. Check OpenCL installation!";
pub const NO_DEVICES: &str = " No devices found. Check OpenCL installation!";
pub const RESULT_LABEL: &str = " result: ";

/// Runs the whole program against `backend` and returns the result array.
pub fn run<B, W>(backend: &B, config: &RunConfig, out: &mut W) -> Result<[i32; ELEMENTS]>
where
    B: Backend,
    W: Write,
{
    let platforms = list_platforms(backend, out)?;
    let device = select_device(backend, &platforms[0], out)?;
    let context = backend.create_context(&device)?;
    let program = build(&context, config.source, out)?;
    let result = vector_add(&context, &program, config.kernel_name, &config.a, &config.b)?;
    report(&result, out)?;
    Ok(result)
}

/// Prints every platform with its devices. Never returns an empty list.
pub fn list_platforms<B: Backend, W: Write>(backend: &B, out: &mut W) -> Result<Vec<B::Platform>> {
    let platforms = backend.platforms().unwrap_or_else(|e| {
        warn!(error = %e, "platform query failed");
        Vec::new()
    });
    if platforms.is_empty() {
        writeln!(out, "{NO_PLATFORMS}")?;
        return Err(Error::NoPlatforms);
    }

    for platform in &platforms {
        let name = backend.platform_name(platform).unwrap_or_default();
        write!(out, "Platform: {name}\n\tDevice list:")?;
        let devices = backend.devices(platform).unwrap_or_default();
        debug!(platform = %name, devices = devices.len(), "enumerated");
        for device in &devices {
            write!(out, "\n\t\t{}\n", backend.device_name(device).unwrap_or_default())?;
        }
    }
    Ok(platforms)
}

/// First device of `platform`, from a fresh device query.
pub fn select_device<B: Backend, W: Write>(
    backend: &B,
    platform: &B::Platform,
    out: &mut W,
) -> Result<B::Device> {
    let devices = backend.devices(platform).unwrap_or_else(|e| {
        warn!(error = %e, "device query failed");
        Vec::new()
    });
    match devices.into_iter().next() {
        Some(device) => {
            info!(device = %backend.device_name(&device).unwrap_or_default(), "selected");
            Ok(device)
        }
        None => {
            writeln!(out, "{NO_DEVICES}")?;
            Err(Error::NoDevices)
        }
    }
}

/// Compiles `source`, printing the build log if the compiler rejects it.
pub fn build<C: ComputeContext, W: Write>(context: &C, source: &str, out: &mut W) -> Result<C::Program> {
    #[cfg(feature = "metrics")]
    let t0 = Instant::now();

    let program = match context.build_program(source) {
        Ok(program) => program,
        Err(Error::Build { log }) => {
            writeln!(out, " Error building: {log}")?;
            return Err(Error::Build { log });
        }
        Err(e) => return Err(e),
    };

    #[cfg(feature = "metrics")]
    crate::metrics::record("build_program", t0);

    info!("program built");
    Ok(program)
}

/// Uploads `a` and `b`, runs `kernel_name` over `ELEMENTS` lanes, reads `C`.
pub fn vector_add<C: ComputeContext>(
    context: &C,
    program: &C::Program,
    kernel_name: &str,
    a: &[i32; ELEMENTS],
    b: &[i32; ELEMENTS],
) -> Result<[i32; ELEMENTS]> {
    let a_dev = DeviceBuffer::<C, Empty>::new(context, ELEMENTS)?.upload(context, a)?;
    let b_dev = DeviceBuffer::<C, Empty>::new(context, ELEMENTS)?.upload(context, b)?;
    let c_dev = DeviceBuffer::<C, Empty>::new(context, ELEMENTS)?.launch();

    let event = context.enqueue_kernel(
        program,
        kernel_name,
        &[a_dev.raw(), b_dev.raw(), c_dev.raw()],
        ELEMENTS,
    )?;
    let c_dev = c_dev.complete(context, event)?;
    debug!(kernel = kernel_name, lanes = ELEMENTS, "dispatch complete");

    let mut c = [0; ELEMENTS];
    c_dev.read_into(context, &mut c)?;
    Ok(c)
}

pub fn report<W: Write>(result: &[i32], out: &mut W) -> Result<()> {
    writeln!(out, "{RESULT_LABEL}")?;
    for value in result {
        write!(out, "{value} ")?;
    }
    out.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn report_prints_label_then_space_separated_values() {
        let mut out = Vec::new();
        report(&[0, 2, -4], &mut out).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), " result: \n0 2 -4 ");
    }
}

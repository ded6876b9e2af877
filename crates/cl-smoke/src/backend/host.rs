//! In-process reference device.
//!
//! Platforms, devices and the build outcome are plain data, so every branch
//! of the run pipeline can be driven without a GPU driver. Buffers are raw
//! byte regions like device memory; the only program the device can execute
//! is the `simple_add` kernel, interpreted lane by lane.

use std::{cell::Cell, cell::RefCell, rc::Rc};

use bytemuck::{cast_slice, pod_read_unaligned};
use tracing::debug;

use super::{Backend, ComputeContext};
use crate::error::{Error, Result};
use crate::kernel::KERNEL_NAME;

const WORD: usize = std::mem::size_of::<i32>();

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostPlatform {
    pub name: String,
    pub devices: Vec<String>,
    /// Status code returned by every device query on this platform.
    pub device_query_error: Option<i32>,
    /// Status code returned by name queries on this platform and its devices.
    pub name_query_error: Option<i32>,
}

impl HostPlatform {
    pub fn new(name: impl Into<String>, devices: &[&str]) -> Self {
        Self {
            name: name.into(),
            devices: devices.iter().map(|d| d.to_string()).collect(),
            device_query_error: None,
            name_query_error: None,
        }
    }

    pub fn with_device_query_failure(mut self, code: i32) -> Self {
        self.device_query_error = Some(code);
        self
    }

    pub fn with_name_query_failure(mut self, code: i32) -> Self {
        self.name_query_error = Some(code);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostDevice {
    pub name: String,
    name_query_error: Option<i32>,
}

impl HostDevice {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), name_query_error: None }
    }
}

/// Operation counts across every context created by one backend.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct HostStats {
    pub contexts: usize,
    pub builds: usize,
    pub allocations: usize,
    pub bytes_allocated: usize,
    pub writes: usize,
    pub dispatches: usize,
    pub reads: usize,
}

#[derive(Debug, Default)]
struct Counters {
    contexts: Cell<usize>,
    builds: Cell<usize>,
    allocations: Cell<usize>,
    bytes_allocated: Cell<usize>,
    writes: Cell<usize>,
    dispatches: Cell<usize>,
    reads: Cell<usize>,
}

fn bump(cell: &Cell<usize>, by: usize) {
    cell.set(cell.get() + by);
}

#[derive(Debug, Clone)]
pub struct HostBackend {
    platforms: Vec<HostPlatform>,
    platform_query_error: Option<i32>,
    build_failure: Option<String>,
    counters: Rc<Counters>,
}

impl HostBackend {
    pub fn new(platforms: Vec<HostPlatform>) -> Self {
        Self {
            platforms,
            platform_query_error: None,
            build_failure: None,
            counters: Rc::default(),
        }
    }

    /// One platform with one device.
    pub fn reference() -> Self {
        Self::new(vec![HostPlatform::new("Host Reference", &["Host CPU"])])
    }

    /// The platform query fails with `code`.
    pub fn with_platform_query_failure(mut self, code: i32) -> Self {
        self.platform_query_error = Some(code);
        self
    }

    /// Every build on this backend fails with `log`.
    pub fn with_build_failure(mut self, log: impl Into<String>) -> Self {
        self.build_failure = Some(log.into());
        self
    }

    pub fn stats(&self) -> HostStats {
        let c = &self.counters;
        HostStats {
            contexts: c.contexts.get(),
            builds: c.builds.get(),
            allocations: c.allocations.get(),
            bytes_allocated: c.bytes_allocated.get(),
            writes: c.writes.get(),
            dispatches: c.dispatches.get(),
            reads: c.reads.get(),
        }
    }
}

impl Backend for HostBackend {
    type Platform = HostPlatform;
    type Device = HostDevice;
    type Context = HostContext;

    fn platforms(&self) -> Result<Vec<HostPlatform>> {
        if let Some(code) = self.platform_query_error {
            return Err(Error::Api(code));
        }
        Ok(self.platforms.clone())
    }

    fn platform_name(&self, platform: &HostPlatform) -> Result<String> {
        if let Some(code) = platform.name_query_error {
            return Err(Error::Api(code));
        }
        Ok(platform.name.clone())
    }

    fn devices(&self, platform: &HostPlatform) -> Result<Vec<HostDevice>> {
        if let Some(code) = platform.device_query_error {
            return Err(Error::Api(code));
        }
        Ok(platform
            .devices
            .iter()
            .map(|name| HostDevice {
                name: name.clone(),
                name_query_error: platform.name_query_error,
            })
            .collect())
    }

    fn device_name(&self, device: &HostDevice) -> Result<String> {
        if let Some(code) = device.name_query_error {
            return Err(Error::Api(code));
        }
        Ok(device.name.clone())
    }

    fn create_context(&self, device: &HostDevice) -> Result<HostContext> {
        bump(&self.counters.contexts, 1);
        Ok(HostContext {
            device: device.clone(),
            build_failure: self.build_failure.clone(),
            counters: Rc::clone(&self.counters),
        })
    }
}

pub struct HostContext {
    device: HostDevice,
    build_failure: Option<String>,
    counters: Rc<Counters>,
}

#[derive(Debug, Clone)]
pub struct HostProgram {
    kernels: Vec<String>,
}

/// Byte-addressed device memory.
#[derive(Debug)]
pub struct HostBuffer {
    bytes: RefCell<Vec<u8>>,
}

impl HostBuffer {
    fn len(&self) -> usize {
        self.bytes.borrow().len() / WORD
    }

    fn load(&self, len: usize) -> Vec<i32> {
        self.bytes.borrow()[..len * WORD]
            .chunks_exact(WORD)
            .map(pod_read_unaligned::<i32>)
            .collect()
    }

    fn store(&self, data: &[i32]) {
        self.bytes.borrow_mut()[..data.len() * WORD].copy_from_slice(cast_slice(data));
    }
}

/// Completion handle of a dispatch; lanes have already run when it exists.
#[derive(Debug)]
pub struct HostEvent {
    dispatch: usize,
}

impl ComputeContext for HostContext {
    type Program = HostProgram;
    type Buffer = HostBuffer;
    type Event = HostEvent;

    fn build_program(&self, source: &str) -> Result<HostProgram> {
        bump(&self.counters.builds, 1);
        if let Some(log) = &self.build_failure {
            return Err(Error::Build { log: log.clone() });
        }
        let program = compile(source)?;
        debug!(device = %self.device.name, kernels = ?program.kernels, "host build");
        Ok(program)
    }

    fn create_buffer(&self, len: usize) -> Result<HostBuffer> {
        bump(&self.counters.allocations, 1);
        bump(&self.counters.bytes_allocated, len * WORD);
        Ok(HostBuffer { bytes: RefCell::new(vec![0; len * WORD]) })
    }

    fn write_buffer(&self, buffer: &mut HostBuffer, data: &[i32]) -> Result<()> {
        check_len(buffer, data.len())?;
        bump(&self.counters.writes, 1);
        buffer.store(data);
        Ok(())
    }

    fn enqueue_kernel(
        &self,
        program: &HostProgram,
        kernel_name: &str,
        args: &[&HostBuffer],
        global_size: usize,
    ) -> Result<HostEvent> {
        if !program.kernels.iter().any(|k| k == kernel_name) {
            return Err(Error::Kernel(format!("no kernel named `{kernel_name}` in program")));
        }
        if kernel_name != KERNEL_NAME {
            return Err(Error::Kernel(format!("host device cannot execute `{kernel_name}`")));
        }
        let [a, b, c] = args else {
            return Err(Error::Kernel(format!(
                "`{kernel_name}` takes 3 arguments, {} bound",
                args.len()
            )));
        };
        for arg in [a, b, c] {
            check_len(arg, global_size)?;
        }

        // Inputs are loaded before the output is borrowed, so aliased
        // arguments behave like separate reads followed by one write.
        let lhs = a.load(global_size);
        let rhs = b.load(global_size);
        let sum: Vec<i32> = lhs.iter().zip(&rhs).map(|(x, y)| x.wrapping_add(*y)).collect();
        c.store(&sum);

        bump(&self.counters.dispatches, 1);
        Ok(HostEvent { dispatch: self.counters.dispatches.get() })
    }

    fn wait(&self, event: HostEvent) -> Result<()> {
        debug!(dispatch = event.dispatch, "host event complete");
        Ok(())
    }

    fn read_buffer(&self, buffer: &HostBuffer, out: &mut [i32]) -> Result<()> {
        check_len(buffer, out.len())?;
        bump(&self.counters.reads, 1);
        out.copy_from_slice(&buffer.load(out.len()));
        Ok(())
    }
}

fn check_len(buffer: &HostBuffer, wanted: usize) -> Result<()> {
    let len = buffer.len();
    if wanted > len {
        return Err(Error::SizeMismatch { expected: len, actual: wanted });
    }
    Ok(())
}

/// Collects kernel entry points and rejects sources with unbalanced braces.
fn compile(source: &str) -> Result<HostProgram> {
    let mut depth: i64 = 0;
    for (line, text) in source.lines().enumerate() {
        for ch in text.chars() {
            match ch {
                '{' => depth += 1,
                '}' => depth -= 1,
                _ => {}
            }
            if depth < 0 {
                return Err(Error::Build {
                    log: format!("<source>:{}: error: unexpected '}}'", line + 1),
                });
            }
        }
    }
    if depth != 0 {
        return Err(Error::Build {
            log: "<source>: error: expected '}' at end of input".into(),
        });
    }

    let kernels = kernel_names(source);
    if kernels.is_empty() {
        return Err(Error::Build {
            log: "<source>: error: no kernel functions declared".into(),
        });
    }
    Ok(HostProgram { kernels })
}

/// Names of functions carrying a `kernel` / `__kernel` qualifier.
fn kernel_names(source: &str) -> Vec<String> {
    let mut segments: Vec<&str> = source.split('(').collect();
    // Text after the last '(' never precedes a parameter list.
    segments.pop();

    segments
        .into_iter()
        .filter_map(|segment| {
            let words: Vec<&str> = segment
                .split(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
                .filter(|w| !w.is_empty())
                .collect();
            let (name, qualifiers) = words.split_last()?;
            // Qualifiers belong to the same declaration only after the last
            // statement or block boundary in the segment.
            let tail = segment.rsplit(['{', '}', ';']).next().unwrap_or(segment);
            let declared = qualifiers
                .iter()
                .any(|w| (*w == "kernel" || *w == "__kernel") && tail.contains(*w));
            declared.then(|| name.to_string())
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kernel::SIMPLE_ADD;

    fn context() -> (HostBackend, HostContext) {
        let backend = HostBackend::reference();
        let device = HostDevice::new("Host CPU");
        let ctx = backend.create_context(&device).unwrap();
        (backend, ctx)
    }

    #[test]
    fn finds_the_embedded_kernel() {
        assert_eq!(kernel_names(SIMPLE_ADD), vec!["simple_add".to_string()]);
    }

    #[test]
    fn finds_several_kernels_and_ignores_calls() {
        let src = "__kernel void first(global int* x) { x[get_global_id(0)] = 0; }\n\
                   void helper(int y) { }\n\
                   kernel void second(global int* x) { }";
        assert_eq!(kernel_names(src), vec!["first".to_string(), "second".to_string()]);
    }

    #[test]
    fn unbalanced_source_fails_to_build() {
        let (_, ctx) = context();
        let err = ctx.build_program("kernel void broken(global int* x) {").unwrap_err();
        match err {
            Error::Build { log } => assert!(log.contains("expected '}'"), "{log}"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn source_without_kernels_fails_to_build() {
        let (_, ctx) = context();
        assert!(matches!(ctx.build_program("int f(int x) { return x; }"), Err(Error::Build { .. })));
    }

    #[test]
    fn scripted_build_failure_wins() {
        let backend = HostBackend::reference().with_build_failure("boom");
        let ctx = backend.create_context(&HostDevice::new("x")).unwrap();
        match ctx.build_program(SIMPLE_ADD) {
            Err(Error::Build { log }) => assert_eq!(log, "boom"),
            other => panic!("unexpected: {:?}", other.map(|p| p.kernels)),
        }
        assert_eq!(backend.stats().builds, 1);
    }

    #[test]
    fn dispatch_adds_lanes() {
        let (backend, ctx) = context();
        let program = ctx.build_program(SIMPLE_ADD).unwrap();
        let mut a = ctx.create_buffer(4).unwrap();
        let mut b = ctx.create_buffer(4).unwrap();
        let c = ctx.create_buffer(4).unwrap();
        ctx.write_buffer(&mut a, &[1, 2, 3, i32::MAX]).unwrap();
        ctx.write_buffer(&mut b, &[10, 20, 30, 1]).unwrap();
        let event = ctx.enqueue_kernel(&program, KERNEL_NAME, &[&a, &b, &c], 4).unwrap();
        ctx.wait(event).unwrap();

        let mut out = [0; 4];
        ctx.read_buffer(&c, &mut out).unwrap();
        assert_eq!(out, [11, 22, 33, i32::MIN]);

        let stats = backend.stats();
        assert_eq!(stats.allocations, 3);
        assert_eq!(stats.bytes_allocated, 48);
        assert_eq!(stats.dispatches, 1);
    }

    #[test]
    fn dispatch_range_larger_than_buffer_is_rejected() {
        let (_, ctx) = context();
        let program = ctx.build_program(SIMPLE_ADD).unwrap();
        let a = ctx.create_buffer(2).unwrap();
        let err = ctx.enqueue_kernel(&program, KERNEL_NAME, &[&a, &a, &a], 3).unwrap_err();
        assert!(matches!(err, Error::SizeMismatch { expected: 2, actual: 3 }));
    }

    #[test]
    fn wrong_arity_is_rejected() {
        let (_, ctx) = context();
        let program = ctx.build_program(SIMPLE_ADD).unwrap();
        let a = ctx.create_buffer(1).unwrap();
        assert!(matches!(
            ctx.enqueue_kernel(&program, KERNEL_NAME, &[&a, &a], 1),
            Err(Error::Kernel(_))
        ));
    }

    #[test]
    fn unknown_kernel_is_rejected() {
        let (_, ctx) = context();
        let program = ctx.build_program(SIMPLE_ADD).unwrap();
        let a = ctx.create_buffer(1).unwrap();
        assert!(matches!(
            ctx.enqueue_kernel(&program, "simple_sub", &[&a, &a, &a], 1),
            Err(Error::Kernel(_))
        ));
    }

    #[test]
    fn aliased_output_reads_inputs_first() {
        let (_, ctx) = context();
        let program = ctx.build_program(SIMPLE_ADD).unwrap();
        let mut a = ctx.create_buffer(3).unwrap();
        ctx.write_buffer(&mut a, &[1, 2, 3]).unwrap();
        ctx.enqueue_kernel(&program, KERNEL_NAME, &[&a, &a, &a], 3).unwrap();
        let mut out = [0; 3];
        ctx.read_buffer(&a, &mut out).unwrap();
        assert_eq!(out, [2, 4, 6]);
    }
}

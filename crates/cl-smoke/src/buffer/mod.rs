//! Device buffers with their lifecycle tracked in the type.
//!
//! `Empty -> Ready` by a blocking upload, `Empty -> InFlight -> Ready` when
//! the buffer is a kernel output and the dispatch event has been waited on.
//! Reading back consumes a `Ready` buffer.

pub mod state;

use std::marker::PhantomData;
#[cfg(feature = "metrics")]
use std::{sync::atomic::Ordering, time::Instant};

use crate::backend::ComputeContext;
use crate::error::{Error, Result};
use state::{Empty, InFlight, Ready, State};

pub struct DeviceBuffer<C: ComputeContext, S: State> {
    raw: C::Buffer,
    len: usize,
    _state: PhantomData<S>,
}

impl<C: ComputeContext, S: State> DeviceBuffer<C, S> {
    /// Backend handle, for binding as a kernel argument.
    pub fn raw(&self) -> &C::Buffer {
        &self.raw
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    fn into_state<T: State>(self) -> DeviceBuffer<C, T> {
        DeviceBuffer { raw: self.raw, len: self.len, _state: PhantomData }
    }
}

impl<C: ComputeContext> DeviceBuffer<C, Empty> {
    /// Allocates room for `len` integers.
    pub fn new(context: &C, len: usize) -> Result<Self> {
        let raw = context.create_buffer(len)?;

        #[cfg(feature = "metrics")]
        {
            crate::ALLOCS.fetch_add(1, Ordering::Relaxed);
            crate::ALLOC_BYTES.fetch_add(len * std::mem::size_of::<i32>(), Ordering::Relaxed);
        }

        Ok(Self { raw, len, _state: PhantomData })
    }

    /// Blocking host-to-device copy of exactly `len` elements.
    pub fn upload(mut self, context: &C, data: &[i32]) -> Result<DeviceBuffer<C, Ready>> {
        if data.len() != self.len {
            return Err(Error::SizeMismatch { expected: self.len, actual: data.len() });
        }

        #[cfg(feature = "metrics")]
        let t0 = Instant::now();

        context.write_buffer(&mut self.raw, data)?;

        #[cfg(feature = "metrics")]
        {
            crate::metrics::record("enqueue_write", t0);
            crate::WRITE_BYTES.fetch_add(std::mem::size_of_val(data), Ordering::Relaxed);
        }

        Ok(self.into_state())
    }

    /// Marks the buffer as the output of a dispatch about to be enqueued.
    pub fn launch(self) -> DeviceBuffer<C, InFlight> {
        self.into_state()
    }
}

impl<C: ComputeContext> DeviceBuffer<C, InFlight> {
    /// Blocks on the dispatch that writes this buffer.
    pub fn complete(self, context: &C, event: C::Event) -> Result<DeviceBuffer<C, Ready>> {
        #[cfg(feature = "metrics")]
        let t0 = Instant::now();

        context.wait(event)?;

        #[cfg(feature = "metrics")]
        crate::metrics::record("kernel_wait", t0);

        Ok(self.into_state())
    }
}

impl<C: ComputeContext> DeviceBuffer<C, Ready> {
    /// Blocking device-to-host copy; the buffer is gone afterwards.
    pub fn read_into(self, context: &C, out: &mut [i32]) -> Result<()> {
        if out.len() != self.len {
            return Err(Error::SizeMismatch { expected: self.len, actual: out.len() });
        }

        #[cfg(feature = "metrics")]
        let t0 = Instant::now();

        context.read_buffer(&self.raw, out)?;

        #[cfg(feature = "metrics")]
        crate::metrics::record("enqueue_read", t0);

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::Backend;
    use crate::backend::host::{HostBackend, HostContext, HostDevice};

    fn context() -> HostContext {
        HostBackend::reference()
            .create_context(&HostDevice::new("Host CPU"))
            .unwrap()
    }

    #[test]
    fn upload_rejects_short_input() {
        let ctx = context();
        let buf = DeviceBuffer::<_, Empty>::new(&ctx, 10).unwrap();
        let err = buf.upload(&ctx, &[1, 2, 3]).err().unwrap();
        assert!(matches!(err, Error::SizeMismatch { expected: 10, actual: 3 }));
    }

    #[test]
    fn read_rejects_wrong_output_length() {
        let ctx = context();
        let buf = DeviceBuffer::<_, Empty>::new(&ctx, 2).unwrap().upload(&ctx, &[7, 8]).unwrap();
        let mut out = [0; 3];
        assert!(matches!(
            buf.read_into(&ctx, &mut out),
            Err(Error::SizeMismatch { expected: 2, actual: 3 })
        ));
    }

    #[test]
    fn uploaded_contents_come_back() {
        let ctx = context();
        let buf = DeviceBuffer::<_, Empty>::new(&ctx, 3).unwrap().upload(&ctx, &[-1, 0, 42]).unwrap();
        assert_eq!(buf.len(), 3);
        let mut out = [0; 3];
        buf.read_into(&ctx, &mut out).unwrap();
        assert_eq!(out, [-1, 0, 42]);
    }
}

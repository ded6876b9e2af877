//! Buffer lifecycle states: `Empty` after allocation, `InFlight` while a
//! dispatch writes it, `Ready` once its contents are valid on the device.

/// Sealed trait pattern for state types
mod sealed {
    pub trait Sealed {}
}

/// State trait for device buffer states
pub trait State: sealed::Sealed + std::fmt::Debug + Send + Sync {}

/// Freshly allocated, contents undefined
#[derive(Debug, Clone, Copy)]
pub struct Empty;
impl sealed::Sealed for Empty {}
impl State for Empty {}

/// Bound as the output of a dispatch that has not been waited on
#[derive(Debug, Clone, Copy)]
pub struct InFlight;
impl sealed::Sealed for InFlight {}
impl State for InFlight {}

/// Contents valid on the device
#[derive(Debug, Clone, Copy)]
pub struct Ready;
impl sealed::Sealed for Ready {}
impl State for Ready {}

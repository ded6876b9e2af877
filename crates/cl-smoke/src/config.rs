//! Fixed run parameters.
//!
//! There is no runtime configuration: `RunConfig::default()` is the program.
//! Tests build other values to drive the pipeline with different inputs.

use crate::kernel::{KERNEL_NAME, SIMPLE_ADD};

/// Element count shared by allocation, dispatch range and read-back.
pub const ELEMENTS: usize = 10;

pub const INPUT_A: [i32; ELEMENTS] = [0, 1, 2, 3, 4, 5, 6, 7, 8, 9];
pub const INPUT_B: [i32; ELEMENTS] = [0, 1, 2, 0, 1, 2, 0, 1, 2, 0];

#[derive(Debug, Clone)]
pub struct RunConfig {
    pub source: &'static str,
    pub kernel_name: &'static str,
    pub a: [i32; ELEMENTS],
    pub b: [i32; ELEMENTS],
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            source: SIMPLE_ADD,
            kernel_name: KERNEL_NAME,
            a: INPUT_A,
            b: INPUT_B,
        }
    }
}

impl RunConfig {
    pub fn with_inputs(a: [i32; ELEMENTS], b: [i32; ELEMENTS]) -> Self {
        Self { a, b, ..Self::default() }
    }
}

//! The embedded OpenCL C kernel.

pub const KERNEL_NAME: &str = "simple_add";

/// One lane per global id: `C[i] = A[i] + B[i]`.
pub const SIMPLE_ADD: &str = "\
void kernel simple_add(global const int* A,
                       global const int* B,
                       global int* C) {
    C[get_global_id(0)] = A[get_global_id(0)] + B[get_global_id(0)];
}
";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn source_declares_the_kernel() {
        assert!(SIMPLE_ADD.contains(&format!("kernel {KERNEL_NAME}(")));
    }

    #[test]
    fn source_takes_two_const_inputs_and_one_output() {
        assert_eq!(SIMPLE_ADD.matches("global const int*").count(), 2);
        assert_eq!(SIMPLE_ADD.matches("global int*").count(), 1);
    }
}

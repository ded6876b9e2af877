//! Error type shared by the runner and every backend.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    /// Platform query failed or returned an empty list.
    #[error("no platforms found")]
    NoPlatforms,

    /// Device query on the selected platform failed or returned an empty list.
    #[error("no devices found")]
    NoDevices,

    /// Kernel compilation failed; `log` is the compiler's build log.
    #[error("error building program: {log}")]
    Build { log: String },

    /// Raw status code of a failed OpenCL call.
    #[error("OpenCL API error {0}")]
    Api(i32),

    #[error("kernel error: {0}")]
    Kernel(String),

    #[error("buffer holds {expected} elements, got {actual}")]
    SizeMismatch { expected: usize, actual: usize },

    #[error("console output failed: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Process exit status for a run that ended with this error.
    pub fn exit_code(&self) -> u8 {
        1
    }
}

#[cfg(feature = "opencl")]
impl From<opencl3::error_codes::ClError> for Error {
    fn from(e: opencl3::error_codes::ClError) -> Self {
        Error::Api(e.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_error_carries_log() {
        let e = Error::Build { log: "<source>:1:5: error: expected ';'".into() };
        assert_eq!(e.to_string(), "error building program: <source>:1:5: error: expected ';'");
    }

    #[test]
    fn every_fatal_error_exits_with_one() {
        for e in [
            Error::NoPlatforms,
            Error::NoDevices,
            Error::Build { log: String::new() },
            Error::Api(-5),
            Error::SizeMismatch { expected: 10, actual: 9 },
        ] {
            assert_eq!(e.exit_code(), 1, "{e}");
        }
    }

    #[test]
    fn api_error_shows_status_code() {
        assert_eq!(Error::Api(-4).to_string(), "OpenCL API error -4");
    }
}

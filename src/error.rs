use thiserror::Error;

/// Fatal conditions of a cloak run. None of these are retried.
#[derive(Debug, Error)]
pub enum CloakError {
    #[error("camera device unavailable: {0}")]
    DeviceUnavailable(String),

    #[error("failed to read frame {frame} from camera: {reason}")]
    FrameReadFailure { frame: u64, reason: String },

    #[error("frame size {actual:?} differs from background model size {expected:?}")]
    DimensionMismatch {
        expected: (u32, u32),
        actual: (u32, u32),
    },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("cannot {operation} while pipeline is {state}")]
    InvalidState {
        state: &'static str,
        operation: &'static str,
    },
}

impl CloakError {
    /// Fails with `DimensionMismatch` unless both sizes agree.
    pub fn check_dimensions(expected: (u32, u32), actual: (u32, u32)) -> Result<(), Self> {
        if expected == actual {
            Ok(())
        } else {
            Err(Self::DimensionMismatch { expected, actual })
        }
    }
}

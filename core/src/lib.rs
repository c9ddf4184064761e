pub mod descriptor;
pub mod frame;
pub mod keypoint;
pub mod robust;
pub mod runtime;
pub mod transform;

pub use descriptor::*;
pub use frame::*;
pub use keypoint::*;
pub use robust::*;
pub use runtime::*;
pub use transform::*;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("empty frame sequence: nothing to stitch")]
    EmptyInput,

    #[error("frame buffer mismatch: {0}")]
    BufferMismatch(String),

    #[error("dimension mismatch: {0}")]
    DimensionMismatch(String),

    #[error("stitch job cancelled")]
    Cancelled,
}

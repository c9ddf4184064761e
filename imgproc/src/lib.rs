pub mod convolve;
pub mod deblur;
pub mod edges;
pub mod histogram;
pub mod hough;
pub mod resize;
pub mod sample;
pub mod template_matching;

pub use convolve::*;
pub use deblur::*;
pub use edges::*;
pub use histogram::*;
pub use hough::*;
pub use resize::*;
pub use sample::*;
pub use template_matching::*;

pub type Result<T> = std::result::Result<T, ImgprocError>;

#[derive(Debug, thiserror::Error)]
pub enum ImgprocError {
    #[error("Algorithm error: {0}")]
    AlgorithmError(String),

    #[error("Dimension mismatch: {0}")]
    DimensionMismatch(String),
}

pub fn validate_image_size(width: u32, height: u32) -> Result<()> {
    if width == 0 || height == 0 {
        return Err(ImgprocError::DimensionMismatch(
            "Image dimensions must be non-zero".into(),
        ));
    }
    Ok(())
}

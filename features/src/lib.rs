pub mod brief;
pub mod extractor;
pub mod fast;
pub mod matcher;

pub use brief::*;
pub use extractor::*;
pub use fast::*;
pub use matcher::*;

pub type Result<T> = std::result::Result<T, FeatureError>;

#[derive(Debug, thiserror::Error)]
pub enum FeatureError {
    #[error("Detection error: {0}")]
    DetectionError(String),

    #[error("Descriptor error: {0}")]
    DescriptorError(String),
}

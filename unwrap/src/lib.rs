pub mod axis;
pub mod polar;
pub mod session;

pub use axis::*;
pub use polar::*;
pub use session::*;

pub type Result<T> = std::result::Result<T, UnwrapError>;

#[derive(Debug, thiserror::Error)]
pub enum UnwrapError {
    #[error("Geometry error: {0}")]
    GeometryError(String),
}

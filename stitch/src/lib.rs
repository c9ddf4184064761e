//! Sequential panorama assembly for axially-scanned bores.
//!
//! The pipeline registers consecutive unwrapped frames (robust feature
//! fit with template-matching and zero-offset fallbacks), classifies the
//! recovered motion, places frames on an exclusively-owned canvas with
//! adaptive seam blending, and post-processes the result. Registration
//! degradation is never an error; the job always yields a best-effort
//! panorama.

pub mod blend;
pub mod canvas;
pub mod motion;
pub mod pattern;
pub mod pipeline;
pub mod post;

pub use blend::*;
pub use canvas::*;
pub use motion::*;
pub use pattern::*;
pub use pipeline::*;
pub use post::*;

pub use bs_core::{Error, Result};

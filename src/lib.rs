pub use bs_core as core;
pub use bs_features as features;
pub use bs_imgproc as imgproc;
pub use bs_stitch as stitch;
pub use bs_unwrap as unwrap;

pub use bs_core::{Error, Frame, Result};
pub use bs_stitch::{
    CancelToken, MotionProfile, StitchConfig, StitchOutput, StitchPipeline,
};
pub use bs_unwrap::{UnwrapConfig, UnwrapSession};

/// Initialize a single global Rayon thread pool for all CPU-parallel stages.
///
/// Call this once at application startup before running a stitch job.
/// Repeated calls are idempotent and return the first initialization result.
///
/// Priority order:
/// 1. explicit `num_threads`
/// 2. `BORESTITCH_CPU_THREADS` env var
/// 3. Rayon default
pub fn init_thread_pool(num_threads: Option<usize>) -> std::result::Result<(), String> {
    bs_core::init_global_thread_pool(num_threads)
}

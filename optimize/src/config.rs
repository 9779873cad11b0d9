//! Optimizer configuration.
//!
//! Typed configuration with bon builders and environment variable fallbacks.

use std::fmt;
use std::sync::Arc;

use bon::bon;
use tessera_ir::Op;
use tessera_value::ImageSize;

/// Which op kinds must not be folded because materializing them eagerly
/// risks a memory blow-up.
#[derive(Clone, Default)]
pub enum BlockingPolicy {
    /// Image composition, multi-layering and mipmapping.
    #[default]
    Default,
    /// Caller-supplied predicate over op kinds.
    Custom(Arc<dyn Fn(&Op) -> bool + Send + Sync>),
}

impl BlockingPolicy {
    pub fn is_blocking_kind(&self, op: &Op) -> bool {
        match self {
            Self::Default => {
                matches!(op, Op::ImageCompose { .. } | Op::ImageMultiLayer { .. } | Op::ImageMipmap { .. })
            }
            Self::Custom(predicate) => predicate(op),
        }
    }

    /// Whether `op` blocks folding. A blocking kind whose output is proven
    /// to be at most `small_image_pixels` pixels does not block.
    pub fn blocks(&self, op: &Op, size: Option<ImageSize>, small_image_pixels: u64) -> bool {
        self.is_blocking_kind(op) && !size.is_some_and(|s| s.pixels() <= small_image_pixels)
    }
}

impl fmt::Debug for BlockingPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Default => f.write_str("Default"),
            Self::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}

const DEFAULT_MAX_ITERATIONS: u32 = 64;
const DEFAULT_SMALL_IMAGE_PIXELS: u64 = 256 * 256;

fn default_worker_threads() -> usize {
    std::thread::available_parallelism().map(|p| p.get()).unwrap_or(4)
}

#[derive(Debug, Clone)]
pub struct OptimizerConfig {
    /// Global budget of local-pass rounds shared by every loop of the driver.
    pub max_iterations: u32,
    /// Run skeleton unification before the main loop.
    pub unify_skeletons: bool,
    /// Run the constant-folding scheduler in the main loop.
    pub fold_constants: bool,
    /// Resolve external references during the reference-resolution pass.
    pub resolve_references: bool,
    /// Size of the fold worker pool.
    pub worker_threads: usize,
    /// Images at or below this many pixels never block folding.
    pub small_image_pixels: u64,
    pub blocking: BlockingPolicy,
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        Self {
            max_iterations: DEFAULT_MAX_ITERATIONS,
            unify_skeletons: true,
            fold_constants: true,
            resolve_references: true,
            worker_threads: default_worker_threads(),
            small_image_pixels: DEFAULT_SMALL_IMAGE_PIXELS,
            blocking: BlockingPolicy::Default,
        }
    }
}

#[bon]
impl OptimizerConfig {
    /// Create an optimizer configuration with builder pattern.
    #[builder]
    pub fn builder(
        #[builder(default = DEFAULT_MAX_ITERATIONS)] max_iterations: u32,
        #[builder(default = true)] unify_skeletons: bool,
        #[builder(default = true)] fold_constants: bool,
        #[builder(default = true)] resolve_references: bool,
        #[builder(default = default_worker_threads())] worker_threads: usize,
        #[builder(default = DEFAULT_SMALL_IMAGE_PIXELS)] small_image_pixels: u64,
        #[builder(default)] blocking: BlockingPolicy,
    ) -> Self {
        Self {
            max_iterations,
            unify_skeletons,
            fold_constants,
            resolve_references,
            worker_threads: worker_threads.max(1),
            small_image_pixels,
            blocking,
        }
    }

    /// Create configuration from environment variables.
    ///
    /// # Environment Variables
    ///
    /// * `TESSERA_OPT_ITERATIONS` - Global iteration budget (default: 64)
    /// * `TESSERA_NO_SKELETON_UNIFY` - Disable skeleton unification if set
    /// * `TESSERA_NO_FOLD` - Disable constant folding if set
    /// * `TESSERA_THREADS` - Fold worker count (default: available_parallelism)
    pub fn from_env() -> Self {
        let max_iterations =
            std::env::var("TESSERA_OPT_ITERATIONS").ok().and_then(|s| s.parse().ok()).unwrap_or(DEFAULT_MAX_ITERATIONS);
        let unify_skeletons = std::env::var("TESSERA_NO_SKELETON_UNIFY").is_err();
        let fold_constants = std::env::var("TESSERA_NO_FOLD").is_err();
        let worker_threads = std::env::var("TESSERA_THREADS")
            .ok()
            .and_then(|s| s.parse::<usize>().ok())
            .filter(|&n| n > 0)
            .unwrap_or_else(default_worker_threads);

        Self { max_iterations, unify_skeletons, fold_constants, worker_threads, ..Default::default() }
    }
}

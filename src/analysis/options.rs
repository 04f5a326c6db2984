//! Analysis configuration types.
//!
//! Configuration is split into three plain structures:
//!
//! - [`AnalysisOptions`] - Top-level container (census size, sampling, retained-size toggle)
//! - [`AnalysisLimits`] - Traversal bounds (path depth, visited-node cap, result counts)
//! - [`ClassifierThresholds`] - Numeric triggers of the leak classifier and its diagnostics
//!
//! All fields are public and every structure implements [`Default`]. The `with_*`
//! methods allow fluent customization, and [`AnalysisOptions::quick()`] /
//! [`AnalysisOptions::thorough()`] cover the two common trade-offs.
//!
//! # Example
//!
//! ```rust
//! use heapscope::analysis::{AnalysisLimits, AnalysisOptions};
//!
//! let options = AnalysisOptions {
//!     limits: AnalysisLimits::new().with_max_traversal_nodes(50_000),
//!     ..AnalysisOptions::default()
//! }
//! .with_top_n(10);
//!
//! assert_eq!(options.top_n, 10);
//! assert_eq!(options.limits.max_path_depth, 100);
//! ```

use serde::Serialize;

/// One mebibyte.
const MIB: u64 = 1024 * 1024;

/// Top-level analysis configuration.
///
/// # Default Configuration
///
/// | Setting | Default Value |
/// |---------|---------------|
/// | `top_n` | 25 |
/// | `max_samples_per_type` | 5 |
/// | `calculate_approx_retained_size` | true |
/// | `approx_retained_size_candidate_count` | 10 |
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct AnalysisOptions {
    /// Number of types kept in the census, largest aggregate size first.
    pub top_n: usize,

    /// Maximum sample addresses recorded per type (first seen).
    pub max_samples_per_type: usize,

    /// Whether [`execute`](crate::analysis::AnalysisSession::execute) estimates retained
    /// sizes for the top candidates.
    pub calculate_approx_retained_size: bool,

    /// Number of census types whose first sample is a retained-size candidate.
    pub approx_retained_size_candidate_count: usize,

    /// Traversal bounds.
    pub limits: AnalysisLimits,

    /// Classifier triggers.
    pub thresholds: ClassifierThresholds,
}

/// Traversal bounds.
///
/// Hitting a bound degrades results instead of failing: retained sizes are flagged
/// approximate, multi-path results truncated, and a path search beyond the depth bound
/// reports "no path found". The one exception is a retention path of an object outside
/// a truncated index, which fails with [`crate::Error::ResourceCapExceeded`] when the
/// fallback search exhausts `max_traversal_nodes`.
///
/// # Default Values
///
/// | Setting | Default Value |
/// |---------|---------------|
/// | `max_path_depth` | 100 |
/// | `max_traversal_nodes` | 10 000 |
/// | `max_index_nodes` | unbounded |
/// | `max_cycles` | 5 |
/// | `max_paths` | 10 |
/// | `classifier_type_window` | 15 |
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct AnalysisLimits {
    /// Maximum reference hops between an object and its root.
    pub max_path_depth: usize,

    /// Visited-node cap of each retained-size and path-search traversal.
    pub max_traversal_nodes: usize,

    /// Optional visited-node cap while building the graph index.
    pub max_index_nodes: Option<usize>,

    /// Maximum number of reported reference cycles.
    pub max_cycles: usize,

    /// Maximum number of root-to-object paths returned by
    /// [`find_paths_to`](crate::analysis::AnalysisSession::find_paths_to).
    pub max_paths: usize,

    /// Number of census types the classifier examines.
    pub classifier_type_window: usize,
}

/// Numeric triggers of the leak classifier.
///
/// # Default Values
///
/// | Setting | Default Value |
/// |---------|---------------|
/// | `pinned_roots` | 50 |
/// | `pinned_roots_extreme` | 500 |
/// | `large_free_block` | 1 MiB |
/// | `fragmentation_total` | 100 MiB |
/// | `timer_count` | 30 |
/// | `task_count` | 2000 |
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ClassifierThresholds {
    /// Pinned roots above this count produce a pinned-objects diagnostic.
    pub pinned_roots: usize,

    /// Pinned roots above this count are reported as extreme pressure.
    pub pinned_roots_extreme: usize,

    /// Free blocks larger than this many bytes count towards fragmentation.
    pub large_free_block: u64,

    /// Large free blocks totalling more than this many bytes produce a heap diagnostic.
    pub fragmentation_total: u64,

    /// Timer instances above this count trigger the timer rule.
    pub timer_count: usize,

    /// Task instances above this count trigger the unobserved-task rule.
    pub task_count: usize,
}

impl Default for AnalysisOptions {
    /// Creates the default configuration.
    ///
    /// See the struct documentation for default values.
    fn default() -> Self {
        Self {
            top_n: 25,
            max_samples_per_type: 5,
            calculate_approx_retained_size: true,
            approx_retained_size_candidate_count: 10,
            limits: AnalysisLimits::default(),
            thresholds: ClassifierThresholds::default(),
        }
    }
}

impl Default for AnalysisLimits {
    fn default() -> Self {
        Self {
            max_path_depth: 100,
            max_traversal_nodes: 10_000,
            max_index_nodes: None,
            max_cycles: 5,
            max_paths: 10,
            classifier_type_window: 15,
        }
    }
}

impl Default for ClassifierThresholds {
    fn default() -> Self {
        Self {
            pinned_roots: 50,
            pinned_roots_extreme: 500,
            large_free_block: MIB,          // 1 MiB
            fragmentation_total: 100 * MIB, // 100 MiB
            timer_count: 30,
            task_count: 2000,
        }
    }
}

impl AnalysisOptions {
    /// Creates options with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a configuration for a fast first look at a large heap.
    ///
    /// # Settings
    ///
    /// - **Census**: top 10 types, one sample each
    /// - **Retained size**: disabled
    /// - **Index**: capped at 1 000 000 objects
    /// - **Cycles**: at most 1
    #[must_use]
    pub fn quick() -> Self {
        Self {
            top_n: 10,
            max_samples_per_type: 1,
            calculate_approx_retained_size: false,
            limits: AnalysisLimits {
                max_index_nodes: Some(1_000_000),
                max_cycles: 1,
                ..Default::default()
            },
            ..Default::default()
        }
    }

    /// Creates a configuration that trades latency for completeness.
    ///
    /// # Settings
    ///
    /// - **Census**: top 50 types, ten samples each
    /// - **Retained size**: 25 candidates, 100 000-node traversals
    /// - **Paths**: depth 500
    /// - **Cycles**: at most 25
    #[must_use]
    pub fn thorough() -> Self {
        Self {
            top_n: 50,
            max_samples_per_type: 10,
            calculate_approx_retained_size: true,
            approx_retained_size_candidate_count: 25,
            limits: AnalysisLimits {
                max_path_depth: 500,
                max_traversal_nodes: 100_000,
                max_cycles: 25,
                max_paths: 25,
                ..Default::default()
            },
            ..Default::default()
        }
    }

    /// Sets the number of census types kept.
    #[must_use]
    pub fn with_top_n(mut self, top_n: usize) -> Self {
        self.top_n = top_n;
        self
    }

    /// Sets the number of sample addresses recorded per type.
    #[must_use]
    pub fn with_max_samples_per_type(mut self, max: usize) -> Self {
        self.max_samples_per_type = max;
        self
    }

    /// Enables or disables retained-size estimation during
    /// [`execute`](crate::analysis::AnalysisSession::execute).
    #[must_use]
    pub fn with_retained_size(mut self, enabled: bool) -> Self {
        self.calculate_approx_retained_size = enabled;
        self
    }

    /// Sets the number of retained-size candidates.
    #[must_use]
    pub fn with_retained_size_candidates(mut self, count: usize) -> Self {
        self.approx_retained_size_candidate_count = count;
        self
    }

    /// Replaces the traversal limits.
    #[must_use]
    pub fn with_limits(mut self, limits: AnalysisLimits) -> Self {
        self.limits = limits;
        self
    }

    /// Replaces the classifier thresholds.
    #[must_use]
    pub fn with_thresholds(mut self, thresholds: ClassifierThresholds) -> Self {
        self.thresholds = thresholds;
        self
    }
}

/// Builder methods for [`AnalysisLimits`].
impl AnalysisLimits {
    /// Creates new limits with default values.
    ///
    /// Equivalent to [`AnalysisLimits::default()`]. Use the `with_*` methods
    /// to customize individual limits.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the maximum number of reference hops in a retention path.
    ///
    /// # Arguments
    ///
    /// * `max` - Maximum hops between an object and its root
    ///
    /// # Returns
    ///
    /// Returns `self` for method chaining.
    #[must_use]
    pub fn with_max_path_depth(mut self, max: usize) -> Self {
        self.max_path_depth = max;
        self
    }

    /// Sets the visited-node cap of retained-size traversals.
    ///
    /// # Arguments
    ///
    /// * `max` - Maximum nodes visited per traversal
    ///
    /// # Returns
    ///
    /// Returns `self` for method chaining.
    #[must_use]
    pub fn with_max_traversal_nodes(mut self, max: usize) -> Self {
        self.max_traversal_nodes = max;
        self
    }

    /// Caps the number of objects visited while building the graph index.
    ///
    /// # Arguments
    ///
    /// * `max` - Maximum indexed objects
    ///
    /// # Returns
    ///
    /// Returns `self` for method chaining.
    #[must_use]
    pub fn with_max_index_nodes(mut self, max: usize) -> Self {
        self.max_index_nodes = Some(max);
        self
    }

    /// Sets the maximum number of reported cycles.
    #[must_use]
    pub fn with_max_cycles(mut self, max: usize) -> Self {
        self.max_cycles = max;
        self
    }

    /// Sets the maximum number of root-to-object paths.
    #[must_use]
    pub fn with_max_paths(mut self, max: usize) -> Self {
        self.max_paths = max;
        self
    }

    /// Sets how many census types the classifier examines.
    #[must_use]
    pub fn with_classifier_type_window(mut self, window: usize) -> Self {
        self.classifier_type_window = window;
        self
    }
}

impl ClassifierThresholds {
    /// Creates thresholds with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the pinned-root counts for high and extreme pressure.
    #[must_use]
    pub fn with_pinned_roots(mut self, high: usize, extreme: usize) -> Self {
        self.pinned_roots = high;
        self.pinned_roots_extreme = extreme;
        self
    }

    /// Sets the free-block size and total that trigger a fragmentation diagnostic.
    #[must_use]
    pub fn with_fragmentation(mut self, large_free_block: u64, total: u64) -> Self {
        self.large_free_block = large_free_block;
        self.fragmentation_total = total;
        self
    }

    /// Sets the timer count that triggers the timer rule.
    #[must_use]
    pub fn with_timer_count(mut self, count: usize) -> Self {
        self.timer_count = count;
        self
    }

    /// Sets the task count that triggers the unobserved-task rule.
    #[must_use]
    pub fn with_task_count(mut self, count: usize) -> Self {
        self.task_count = count;
        self
    }
}

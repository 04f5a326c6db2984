//! Type census of a heap snapshot.
//!
//! One enumeration pass over every live object, aggregating instance count and shallow
//! size per type name. Objects whose type cannot be resolved are counted under
//! [`ObjectRef::UNKNOWN_TYPE`] rather than dropped, so the census totals always match
//! the heap.

use std::collections::HashMap;

use serde::Serialize;

use crate::{
    analysis::AnalysisOptions,
    snapshot::{Address, HeapSnapshotProvider, ObjectRef},
    utils::CancellationToken,
    Result,
};

/// Aggregate statistics of one type.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct TypeSummary {
    /// Fully-qualified type name, or `Unknown`
    pub type_name: String,
    /// Number of live instances
    pub instance_count: u64,
    /// Sum of the shallow sizes of all instances
    pub aggregate_size: u64,
    /// First-seen instance addresses, bounded by `max_samples_per_type`
    pub sample_addresses: Vec<Address>,
}

impl TypeSummary {
    /// Returns this type's share of `total` bytes as a percentage.
    #[must_use]
    pub fn percent_of(&self, total: u64) -> f64 {
        if total == 0 {
            return 0.0;
        }
        self.aggregate_size as f64 * 100.0 / total as f64
    }

    /// Returns the first sample address, if any was recorded.
    #[must_use]
    pub fn first_sample(&self) -> Option<Address> {
        self.sample_addresses.first().copied()
    }
}

/// Result of a census pass.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct HeapCensus {
    /// Number of live objects enumerated
    pub total_objects: u64,
    /// Sum of the shallow sizes of all live objects
    pub total_size: u64,
    /// Heap size reported by the provider, or `total_size` when unavailable
    pub heap_size: u64,
    /// Number of distinct types seen, before truncation
    pub type_count: usize,
    /// Top types by aggregate size, descending
    pub by_size: Vec<TypeSummary>,
    /// Top types by instance count, descending
    pub by_count: Vec<TypeSummary>,
}

impl HeapCensus {
    /// Looks up a type among the retained top entries.
    #[must_use]
    pub fn type_named(&self, type_name: &str) -> Option<&TypeSummary> {
        self.by_size.iter().find(|t| t.type_name == type_name)
    }
}

#[derive(Default)]
struct Accumulator {
    count: u64,
    size: u64,
    samples: Vec<Address>,
}

impl Accumulator {
    fn record(&mut self, object: &ObjectRef, max_samples: usize) {
        self.count += 1;
        self.size = self.size.saturating_add(object.size);
        if self.samples.len() < max_samples {
            self.samples.push(object.address);
        }
    }
}

/// Builds a [`HeapCensus`] in a single pass over the snapshot.
///
/// # Examples
///
/// ```rust
/// use heapscope::{
///     analysis::TypeCensusBuilder,
///     snapshot::{Address, MemorySnapshotBuilder},
///     utils::CancellationToken,
/// };
///
/// let snapshot = MemorySnapshotBuilder::new()
///     .object(Address::new(0x10), "System.String", 40)
///     .object(Address::new(0x20), "System.String", 24)
///     .object(Address::new(0x30), "System.Byte[]", 1024)
///     .build();
///
/// let census = TypeCensusBuilder::new(10, 5).build(&snapshot, &CancellationToken::new())?;
/// assert_eq!(census.by_size[0].type_name, "System.Byte[]");
/// assert_eq!(census.by_count[0].type_name, "System.String");
/// # Ok::<(), heapscope::Error>(())
/// ```
#[derive(Clone, Copy, Debug)]
pub struct TypeCensusBuilder {
    top_n: usize,
    max_samples_per_type: usize,
}

impl TypeCensusBuilder {
    /// Creates a builder keeping `top_n` types and up to `max_samples_per_type`
    /// addresses per type.
    #[must_use]
    pub fn new(top_n: usize, max_samples_per_type: usize) -> Self {
        TypeCensusBuilder {
            top_n,
            max_samples_per_type,
        }
    }

    /// Creates a builder from [`AnalysisOptions`].
    #[must_use]
    pub fn from_options(options: &AnalysisOptions) -> Self {
        Self::new(options.top_n, options.max_samples_per_type)
    }

    /// Enumerates every live object once and aggregates per type.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::SnapshotNotReady`] if the heap cannot be walked, and
    /// [`crate::Error::Cancelled`] if `cancel` fires; cancellation is checked before
    /// each enumerated object and no partial census is returned.
    pub fn build<P: HeapSnapshotProvider>(
        &self,
        snapshot: &P,
        cancel: &CancellationToken,
    ) -> Result<HeapCensus> {
        if !snapshot.can_walk() {
            return Err(not_ready_error!("cannot walk the managed heap"));
        }

        let mut types: HashMap<String, Accumulator> = HashMap::new();
        let mut census = HeapCensus::default();

        for object in snapshot.enumerate_objects() {
            cancel.check()?;

            census.total_objects += 1;
            census.total_size = census.total_size.saturating_add(object.size);

            let type_name = object.type_name_or_unknown();
            if let Some(entry) = types.get_mut(type_name) {
                entry.record(&object, self.max_samples_per_type);
            } else {
                let mut entry = Accumulator::default();
                entry.record(&object, self.max_samples_per_type);
                types.insert(type_name.to_string(), entry);
            }
        }

        census.heap_size = snapshot.heap_size().unwrap_or(census.total_size);
        census.type_count = types.len();

        let mut summaries: Vec<TypeSummary> = types
            .into_iter()
            .map(|(type_name, acc)| TypeSummary {
                type_name,
                instance_count: acc.count,
                aggregate_size: acc.size,
                sample_addresses: acc.samples,
            })
            .collect();

        let mut by_count = summaries.clone();
        by_count.sort_by(|a, b| {
            b.instance_count
                .cmp(&a.instance_count)
                .then_with(|| a.type_name.cmp(&b.type_name))
        });
        by_count.truncate(self.top_n);

        summaries.sort_by(|a, b| {
            b.aggregate_size
                .cmp(&a.aggregate_size)
                .then_with(|| a.type_name.cmp(&b.type_name))
        });
        summaries.truncate(self.top_n);

        census.by_size = summaries;
        census.by_count = by_count;

        log::debug!(
            "Census: {} objects, {} bytes, {} types",
            census.total_objects,
            census.total_size,
            census.type_count
        );

        Ok(census)
    }
}

impl Default for TypeCensusBuilder {
    fn default() -> Self {
        Self::from_options(&AnalysisOptions::default())
    }
}

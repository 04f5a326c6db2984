//! Heuristic leak classification.
//!
//! The classifier turns a census into one plain-language diagnosis. It walks the
//! largest types in descending size order and, for each type, tries the rules of
//! [`LeakPattern`] in declaration order. The first rule to fire on any type decides the
//! result; later types are not examined.
//!
//! | Rule | Trigger | Confidence |
//! |------|---------|------------|
//! | [`LeakPattern::ClosureCapture`] | compiler-generated closure or event handler type | 0.96 |
//! | [`LeakPattern::UndisposedTimers`] | many `System.Threading.Timer` instances | 0.93 |
//! | [`LeakPattern::ShortLivedHttpClients`] | `HttpClient` / `HttpMessageHandler` instances | 0.91 |
//! | [`LeakPattern::StaticReference`] | retention path through a static root | 0.98 |
//! | [`LeakPattern::UnobservedTasks`] | thousands of `System.Threading.Tasks.Task` instances | 0.87 |
//!
//! Pinned-root and fragmentation diagnostics are evaluated independently of the rules
//! and attached to every result.

use serde::Serialize;
use strum::{AsRefStr, Display, EnumCount, EnumIter, IntoEnumIterator};

use crate::{
    analysis::{
        AnalysisResult, ClassifierThresholds, Diagnostic, HeapCensus, PressureLevel,
        RetentionPath, TypeSummary,
    },
    snapshot::{Address, FreeBlock},
    utils::{format_bytes, format_count},
    Result,
};

/// A recognized leak pattern, in rule evaluation order.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, Display, AsRefStr, EnumIter, EnumCount, Serialize,
)]
pub enum LeakPattern {
    /// Closures or event handlers capturing objects that outlive their owner
    ClosureCapture,
    /// Timers never disposed, keeping their callbacks alive
    UndisposedTimers,
    /// HTTP clients created per request
    ShortLivedHttpClients,
    /// Objects reachable from a static field
    StaticReference,
    /// Fire-and-forget tasks whose results are never observed
    UnobservedTasks,
}

impl LeakPattern {
    /// Confidence reported when this pattern fires.
    #[must_use]
    pub fn confidence(self) -> f64 {
        match self {
            LeakPattern::ClosureCapture => 0.96,
            LeakPattern::UndisposedTimers => 0.93,
            LeakPattern::ShortLivedHttpClients => 0.91,
            LeakPattern::StaticReference => 0.98,
            LeakPattern::UnobservedTasks => 0.87,
        }
    }

    /// Remediation snippet for this pattern.
    #[must_use]
    pub fn suggested_fix(self) -> &'static str {
        match self {
            LeakPattern::ClosureCapture => CLOSURE_FIX,
            LeakPattern::UndisposedTimers => TIMER_FIX,
            LeakPattern::ShortLivedHttpClients => HTTP_CLIENT_FIX,
            LeakPattern::StaticReference => STATIC_FIX,
            LeakPattern::UnobservedTasks => TASK_FIX,
        }
    }
}

const CLOSURE_FIX: &str = "\
```csharp
// Unsubscribe when the subscriber goes away
button.Click += OnClick;
// in Dispose:
button.Click -= OnClick;

// or hold the target weakly
private readonly WeakReference<ViewModel> _owner;
void OnClick(object? s, EventArgs e)
{
    if (_owner.TryGetTarget(out var vm)) vm.Refresh();
}
```";

const TIMER_FIX: &str = "\
```csharp
// Dispose timers with their owner, or use a PeriodicTimer loop
private readonly PeriodicTimer _timer = new(TimeSpan.FromSeconds(30));

public async Task RunAsync(CancellationToken ct)
{
    while (await _timer.WaitForNextTickAsync(ct))
        await TickAsync();
}

public void Dispose() => _timer.Dispose();
```";

const HTTP_CLIENT_FIX: &str = "\
```csharp
// Let the factory pool handlers instead of creating clients per request
builder.Services.AddHttpClient<ApiClient>(c => c.BaseAddress = new Uri(\"https://api.example.com/\"));

public class ApiClient(HttpClient client) { }
```";

const STATIC_FIX: &str = "\
```csharp
// Release the static reference once its contents are no longer needed
Registry.Cache.Clear();
// or
Registry.Instance = null;
```";

const TASK_FIX: &str = "\
```csharp
// Await or observe every task instead of fire-and-forget
await Task.WhenAll(pending);
// or attach a continuation that observes failures
_ = work.ContinueWith(t => log(t.Exception), TaskContinuationOptions.OnlyOnFaulted);
```";

/// Heap-wide evidence besides the census.
#[derive(Clone, Copy, Debug, Default)]
pub struct HeapEvidence<'a> {
    /// Number of pinned root entries
    pub pinned_roots: usize,
    /// Free regions reported by the provider
    pub free_blocks: &'a [FreeBlock],
}

/// Applies the ordered leak rules to a census.
#[derive(Clone, Debug)]
pub struct LeakClassifier {
    thresholds: ClassifierThresholds,
    type_window: usize,
}

impl LeakClassifier {
    /// Creates a classifier examining the `type_window` largest types.
    #[must_use]
    pub fn new(thresholds: ClassifierThresholds, type_window: usize) -> Self {
        LeakClassifier {
            thresholds,
            type_window,
        }
    }

    /// Classifies the census.
    ///
    /// `retention_path` is called with the first sample of a type only when the
    /// static-reference rule needs it, so types decided by an earlier rule never cost a
    /// path search.
    ///
    /// # Errors
    ///
    /// Propagates errors returned by `retention_path` (cancellation).
    pub fn classify<F>(
        &self,
        census: &HeapCensus,
        evidence: HeapEvidence<'_>,
        mut retention_path: F,
    ) -> Result<AnalysisResult>
    where
        F: FnMut(Address) -> Result<Option<RetentionPath>>,
    {
        let mut result = AnalysisResult::inconclusive();

        'types: for summary in census.by_size.iter().take(self.type_window) {
            for pattern in LeakPattern::iter() {
                let fired = match pattern {
                    LeakPattern::StaticReference => match summary.first_sample() {
                        Some(sample) => retention_path(sample)?
                            .is_some_and(|path| path.mentions("static")),
                        None => false,
                    },
                    _ => self.matches(pattern, summary),
                };

                if fired {
                    log::info!("Leak pattern {pattern} matched type {}", summary.type_name);
                    result.root_cause = root_cause(pattern, summary, census.heap_size);
                    result.suggested_fix = pattern.suggested_fix().to_string();
                    result.confidence = pattern.confidence();
                    result.pattern = Some(pattern);
                    break 'types;
                }
            }
        }

        result.diagnostics = self.diagnostics(census, evidence);
        Ok(result)
    }

    /// Evaluates the name and count based rules.
    fn matches(&self, pattern: LeakPattern, summary: &TypeSummary) -> bool {
        let name = summary.type_name.as_str();
        match pattern {
            LeakPattern::ClosureCapture => {
                name.contains("DisplayClass")
                    || name.contains("<>c__")
                    || name.contains("EventHandler")
            }
            LeakPattern::UndisposedTimers => {
                name.contains("System.Threading.Timer")
                    && summary.instance_count > self.thresholds.timer_count as u64
            }
            LeakPattern::ShortLivedHttpClients => {
                name.contains("HttpClient") || name.contains("HttpMessageHandler")
            }
            LeakPattern::UnobservedTasks => {
                name.contains("System.Threading.Tasks.Task")
                    && summary.instance_count > self.thresholds.task_count as u64
            }
            LeakPattern::StaticReference => false,
        }
    }

    /// Builds the pinned-root and fragmentation diagnostics.
    fn diagnostics(&self, census: &HeapCensus, evidence: HeapEvidence<'_>) -> Vec<Diagnostic> {
        let mut diagnostics = Vec::new();
        let thresholds = &self.thresholds;

        if evidence.pinned_roots > thresholds.pinned_roots {
            let pressure = if evidence.pinned_roots > thresholds.pinned_roots_extreme {
                PressureLevel::Extreme
            } else {
                PressureLevel::High
            };
            diagnostics.push(Diagnostic::PinnedObjects {
                count: evidence.pinned_roots,
                pressure,
            });
        }

        let large = evidence
            .free_blocks
            .iter()
            .filter(|block| block.size > thresholds.large_free_block);
        let (large_total, largest) = large.fold((0u64, 0u64), |(total, max), block| {
            (total.saturating_add(block.size), max.max(block.size))
        });

        if large_total > thresholds.fragmentation_total {
            let heap = census.heap_size.max(large_total);
            log::debug!(
                "Large free blocks total {} of {}",
                format_bytes(large_total),
                format_bytes(heap)
            );
            diagnostics.push(Diagnostic::Heap {
                fragmentation_level: large_total as f64 / heap as f64,
                largest_free_block: largest,
                total_size: heap,
            });
        }

        diagnostics
    }
}

impl Default for LeakClassifier {
    fn default() -> Self {
        Self::new(ClassifierThresholds::default(), 15)
    }
}

fn root_cause(pattern: LeakPattern, summary: &TypeSummary, heap_size: u64) -> String {
    let count = format_count(summary.instance_count);
    let share = summary.percent_of(heap_size);
    let name = &summary.type_name;

    match pattern {
        LeakPattern::ClosureCapture => format!(
            "Event handler or closure leak: {count} captured closures of '{name}' hold \
             objects alive ({share:.1}% of heap)."
        ),
        LeakPattern::UndisposedTimers => format!(
            "{count} undisposed System.Threading.Timer instances are keeping their \
             callbacks alive ({share:.1}% of heap)."
        ),
        LeakPattern::ShortLivedHttpClients => format!(
            "{count} instances of '{name}' suggest HttpClient is created per request, \
             which exhausts sockets."
        ),
        LeakPattern::StaticReference => format!(
            "Objects retained via a static reference: '{name}' ({count} instances, \
             {share:.1}% of heap) is held in a static container."
        ),
        LeakPattern::UnobservedTasks => format!(
            "{count} Task instances are alive; completed tasks are likely never awaited \
             or observed."
        ),
    }
}

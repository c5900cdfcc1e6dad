//! Demo algorithms injected by `bs run`
//!
//! Each one follows the `SortAlgorithm` contract: poll for cancellation once
//! per comparison, report every exchange through the view, and optionally
//! pause after each exchange so the run can be watched.

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use bgsort::{SortAlgorithm, SortOutcome, SortView};
use eyre::Result;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::debug;

/// Algorithm names accepted by `lookup`
pub const NAMES: &[&str] = &["bubble", "insertion", "quick", "selection"];

/// One-line description per algorithm, for `bs algorithms`
pub fn describe(name: &str) -> &'static str {
    match name {
        "bubble" => "adjacent exchanges, largest values sink first",
        "insertion" => "shifts each value left into the sorted prefix",
        "quick" => "Lomuto partitioning over an explicit range stack",
        "selection" => "one exchange per position, smallest remaining value first",
        _ => "",
    }
}

/// Build the named algorithm, pausing `delay` after each exchange
pub fn lookup(name: &str, delay: Duration) -> Option<Arc<dyn SortAlgorithm>> {
    debug!(%name, ?delay, "lookup: called");
    let pacer = Pacer(delay);
    let algorithm: Arc<dyn SortAlgorithm> = match name.to_lowercase().as_str() {
        "bubble" => Arc::new(BubbleSort { pacer }),
        "insertion" => Arc::new(InsertionSort { pacer }),
        "quick" | "quicksort" => Arc::new(QuickSort { pacer }),
        "selection" => Arc::new(SelectionSort { pacer }),
        _ => return None,
    };
    Some(algorithm)
}

/// Values in `0..=max_value`, reproducible when `seed` is given
pub fn random_array(len: usize, seed: Option<u64>, max_value: i32) -> Vec<i32> {
    let mut rng = match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_os_rng(),
    };
    let max_value = max_value.max(0);
    (0..len).map(|_| rng.random_range(0..=max_value)).collect()
}

#[derive(Debug, Clone, Copy)]
struct Pacer(Duration);

impl Pacer {
    fn exchange(self, view: &mut SortView<'_>, first: usize, second: usize) {
        view.exchange(first, second);
        if !self.0.is_zero() {
            thread::sleep(self.0);
        }
    }
}

struct BubbleSort {
    pacer: Pacer,
}

impl SortAlgorithm for BubbleSort {
    fn name(&self) -> &str {
        "bubble"
    }

    fn sort(&self, view: &mut SortView<'_>) -> Result<SortOutcome> {
        let n = view.len();
        for pass in 0..n.saturating_sub(1) {
            let mut swapped = false;
            for i in 0..n - 1 - pass {
                if view.is_cancellation_requested() {
                    return Ok(SortOutcome::Canceled);
                }
                if view[i] > view[i + 1] {
                    self.pacer.exchange(view, i, i + 1);
                    swapped = true;
                }
            }
            if !swapped {
                break;
            }
        }
        Ok(SortOutcome::Completed)
    }
}

struct InsertionSort {
    pacer: Pacer,
}

impl SortAlgorithm for InsertionSort {
    fn name(&self) -> &str {
        "insertion"
    }

    fn sort(&self, view: &mut SortView<'_>) -> Result<SortOutcome> {
        for i in 1..view.len() {
            let mut j = i;
            while j > 0 {
                if view.is_cancellation_requested() {
                    return Ok(SortOutcome::Canceled);
                }
                if view[j - 1] <= view[j] {
                    break;
                }
                self.pacer.exchange(view, j - 1, j);
                j -= 1;
            }
        }
        Ok(SortOutcome::Completed)
    }
}

struct SelectionSort {
    pacer: Pacer,
}

impl SortAlgorithm for SelectionSort {
    fn name(&self) -> &str {
        "selection"
    }

    fn sort(&self, view: &mut SortView<'_>) -> Result<SortOutcome> {
        let n = view.len();
        for i in 0..n.saturating_sub(1) {
            let mut min = i;
            for j in i + 1..n {
                if view.is_cancellation_requested() {
                    return Ok(SortOutcome::Canceled);
                }
                if view[j] < view[min] {
                    min = j;
                }
            }
            if min != i {
                self.pacer.exchange(view, i, min);
            }
        }
        Ok(SortOutcome::Completed)
    }
}

struct QuickSort {
    pacer: Pacer,
}

impl SortAlgorithm for QuickSort {
    fn name(&self) -> &str {
        "quick"
    }

    fn sort(&self, view: &mut SortView<'_>) -> Result<SortOutcome> {
        // Inclusive ranges still to partition
        let mut ranges = Vec::new();
        if view.len() > 1 {
            ranges.push((0, view.len() - 1));
        }

        while let Some((lo, hi)) = ranges.pop() {
            let pivot = view[hi];
            let mut store = lo;
            for j in lo..hi {
                if view.is_cancellation_requested() {
                    return Ok(SortOutcome::Canceled);
                }
                if view[j] < pivot {
                    if store != j {
                        self.pacer.exchange(view, store, j);
                    }
                    store += 1;
                }
            }
            if store != hi {
                self.pacer.exchange(view, store, hi);
            }

            if store > lo + 1 {
                ranges.push((lo, store - 1));
            }
            if store + 1 < hi {
                ranges.push((store + 1, hi));
            }
        }
        Ok(SortOutcome::Completed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bgsort::CancelFlag;

    fn run(name: &str, data: &mut [i32]) -> (SortOutcome, Vec<(usize, usize)>) {
        let algorithm = lookup(name, Duration::ZERO).unwrap();
        let mut view = SortView::recording(data, CancelFlag::new());
        let outcome = algorithm.sort(&mut view).unwrap();
        (outcome, view.recorded().to_vec())
    }

    #[test]
    fn test_every_algorithm_sorts() {
        for name in NAMES {
            let mut data = random_array(64, Some(11), 50);
            let mut expected = data.clone();
            expected.sort();

            let (outcome, _) = run(name, &mut data);
            assert_eq!(outcome, SortOutcome::Completed, "{name}");
            assert_eq!(data, expected, "{name}");
        }
    }

    #[test]
    fn test_bubble_exchange_sequence() {
        let mut data = vec![5, 3, 4, 1];
        let (_, reports) = run("bubble", &mut data);
        assert_eq!(reports, vec![(0, 1), (1, 2), (2, 3), (1, 2), (0, 1)]);
    }

    #[test]
    fn test_sorted_input_reports_nothing() {
        for name in NAMES {
            let mut data = vec![1, 2, 3, 4, 5];
            let (_, reports) = run(name, &mut data);
            assert!(reports.is_empty(), "{name}: {reports:?}");
        }
    }

    #[test]
    fn test_reports_are_valid_pairs() {
        for name in NAMES {
            let mut data = random_array(40, Some(3), 9);
            let len = data.len();
            let (_, reports) = run(name, &mut data);
            assert!(reports.iter().all(|&(i, j)| i != j && i < len && j < len), "{name}");
        }
    }

    #[test]
    fn test_canceled_before_first_step() {
        for name in NAMES {
            let cancel = CancelFlag::new();
            cancel.cancel();
            let mut data = vec![3, 2, 1];
            let algorithm = lookup(name, Duration::ZERO).unwrap();
            let mut view = SortView::recording(&mut data, cancel);

            assert_eq!(algorithm.sort(&mut view).unwrap(), SortOutcome::Canceled, "{name}");
            assert_eq!(view.exchanges(), 0);
        }
    }

    #[test]
    fn test_trivial_inputs() {
        for name in NAMES {
            for mut data in [vec![], vec![7]] {
                let (outcome, reports) = run(name, &mut data);
                assert_eq!(outcome, SortOutcome::Completed);
                assert!(reports.is_empty());
            }
        }
    }

    #[test]
    fn test_lookup_names() {
        for name in NAMES {
            let algorithm = lookup(name, Duration::ZERO).unwrap();
            assert_eq!(algorithm.name(), *name);
            assert!(!describe(name).is_empty());
        }
        assert!(lookup("QUICK", Duration::ZERO).is_some());
        assert!(lookup("bogo", Duration::ZERO).is_none());
    }

    #[test]
    fn test_random_array_is_seeded() {
        let a = random_array(20, Some(42), 99);
        let b = random_array(20, Some(42), 99);
        assert_eq!(a, b);
        assert!(a.iter().all(|v| (0..=99).contains(v)));
        assert!(random_array(5, None, -3).iter().all(|&v| v == 0));
    }
}

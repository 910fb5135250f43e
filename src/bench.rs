// Copyright 2025 Google LLC
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! The benchmark runner: timed single-threaded and multi-threaded summation
//! rounds over an all-ones sequence.

use crate::chunk::ChunkPartition;
use crate::macros::log_debug;
use crate::reduce::{parallel_sum, sequential_sum, CpuPinningPolicy, ThreadCount};
use std::fmt;
use std::time::{Duration, Instant};

/// Configuration of a summation benchmark run.
///
/// ```
/// # use sumbench::{Benchmark, CpuPinningPolicy, ThreadCount};
/// let report = Benchmark {
///     input_len: 10_000,
///     num_threads: ThreadCount::try_from(4).unwrap(),
///     cpu_pinning: CpuPinningPolicy::No,
/// }
/// .run();
/// assert_eq!(report.sequential_sum, report.parallel_sum);
/// ```
pub struct Benchmark {
    /// Number of elements in the summed sequence.
    pub input_len: usize,
    /// Number of worker threads to spawn for the multi-threaded round.
    pub num_threads: ThreadCount,
    /// Policy to pin worker threads to CPUs.
    pub cpu_pinning: CpuPinningPolicy,
}

impl Benchmark {
    /// Runs the benchmark.
    ///
    /// This allocates a sequence of [`input_len`](Self::input_len) 32-bit
    /// integers all set to 1, sums it once with a single thread and once with
    /// one worker thread per chunk, and records the wall-clock duration of
    /// both rounds. The multi-threaded round doesn't start until the
    /// single-threaded round is done.
    pub fn run(&self) -> BenchmarkReport {
        let input = vec![1; self.input_len];
        log_debug!("Allocated {} elements.", input.len());

        let sequential_start = Instant::now();
        let sequential_sum = sequential_sum(&input);
        let sequential_duration = sequential_start.elapsed();
        log_debug!("Single-threaded round finished in {sequential_duration:?}.");

        let partition = ChunkPartition::new(input.len(), self.num_threads.resolve());

        let parallel_start = Instant::now();
        let parallel_sum = parallel_sum(&input, &partition, self.cpu_pinning);
        let parallel_duration = parallel_start.elapsed();
        log_debug!(
            "Multi-threaded round finished in {parallel_duration:?} with {} threads.",
            partition.num_chunks()
        );

        BenchmarkReport {
            sequential_sum,
            parallel_sum,
            sequential_duration,
            parallel_duration,
            num_threads: partition.num_chunks(),
        }
    }
}

/// Outcome of a benchmark run.
///
/// The [`Display`](fmt::Display) implementation formats the report as three
/// lines: the single-threaded round, the multi-threaded round and the speedup
/// ratio. The two sums aren't validated against each other.
#[derive(Clone, Debug)]
pub struct BenchmarkReport {
    /// Sum computed by the single-threaded round.
    pub sequential_sum: i64,
    /// Sum computed by the multi-threaded round.
    pub parallel_sum: i64,
    /// Wall-clock duration of the single-threaded round.
    pub sequential_duration: Duration,
    /// Wall-clock duration of the multi-threaded round.
    pub parallel_duration: Duration,
    /// Number of worker threads spawned by the multi-threaded round.
    pub num_threads: usize,
}

impl BenchmarkReport {
    /// Returns how many times faster the multi-threaded round was than the
    /// single-threaded one.
    ///
    /// The ratio is finite and positive whenever the multi-threaded round
    /// took a nonzero amount of time.
    pub fn speedup(&self) -> f64 {
        self.sequential_duration.as_secs_f64() / self.parallel_duration.as_secs_f64()
    }
}

impl fmt::Display for BenchmarkReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Single-threaded sum: {} in {} seconds.",
            self.sequential_sum,
            self.sequential_duration.as_secs_f64()
        )?;
        writeln!(
            f,
            "Multi-threaded sum: {} in {} seconds ({} threads).",
            self.parallel_sum,
            self.parallel_duration.as_secs_f64(),
            self.num_threads
        )?;
        writeln!(f, "Performance gain: {}x faster.", self.speedup())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_benchmark_sums_all_ones() {
        let report = Benchmark {
            input_len: 10_000,
            num_threads: ThreadCount::try_from(4).unwrap(),
            cpu_pinning: CpuPinningPolicy::No,
        }
        .run();
        assert_eq!(report.sequential_sum, 10_000);
        assert_eq!(report.parallel_sum, 10_000);
        assert_eq!(report.num_threads, 4);
    }

    #[test]
    fn test_benchmark_reports_the_clamped_thread_count() {
        let report = Benchmark {
            input_len: 3,
            num_threads: ThreadCount::try_from(8).unwrap(),
            cpu_pinning: CpuPinningPolicy::No,
        }
        .run();
        assert_eq!(report.sequential_sum, 3);
        assert_eq!(report.parallel_sum, 3);
        assert_eq!(report.num_threads, 3);
    }

    #[test]
    fn test_benchmark_with_empty_input() {
        let report = Benchmark {
            input_len: 0,
            num_threads: ThreadCount::try_from(4).unwrap(),
            cpu_pinning: CpuPinningPolicy::No,
        }
        .run();
        assert_eq!(report.sequential_sum, 0);
        assert_eq!(report.parallel_sum, 0);
        assert_eq!(report.num_threads, 1);
    }

    #[test]
    fn test_speedup_ratio() {
        let report = BenchmarkReport {
            sequential_sum: 100,
            parallel_sum: 100,
            sequential_duration: Duration::new(1, 500_000_000),
            parallel_duration: Duration::new(0, 500_000_000),
            num_threads: 8,
        };
        assert_eq!(report.speedup(), 3.0);
    }

    #[test]
    fn test_speedup_is_finite_and_positive() {
        let report = Benchmark {
            input_len: 100_000,
            num_threads: ThreadCount::try_from(2).unwrap(),
            cpu_pinning: CpuPinningPolicy::No,
        }
        .run();
        let speedup = report.speedup();
        assert!(speedup.is_finite());
        assert!(speedup > 0.0);
    }

    #[test]
    fn test_report_format() {
        let report = BenchmarkReport {
            sequential_sum: 100,
            parallel_sum: 100,
            sequential_duration: Duration::new(1, 500_000_000),
            parallel_duration: Duration::new(0, 500_000_000),
            num_threads: 8,
        };
        assert_eq!(
            report.to_string(),
            "Single-threaded sum: 100 in 1.5 seconds.\n\
             Multi-threaded sum: 100 in 0.5 seconds (8 threads).\n\
             Performance gain: 3x faster.\n"
        );
    }
}

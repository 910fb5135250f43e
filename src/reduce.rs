// Copyright 2025 Google LLC
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Sequential and multi-threaded reduction of an integer sequence.

use crate::chunk::ChunkPartition;
use crate::macros::{log_debug, log_warn};
use crossbeam_utils::CachePadded;
// Platforms that support `libc::sched_setaffinity()`.
#[cfg(all(
    not(miri),
    any(
        target_os = "android",
        target_os = "dragonfly",
        target_os = "freebsd",
        target_os = "linux"
    )
))]
use nix::{
    sched::{sched_setaffinity, CpuSet},
    unistd::Pid,
};
use std::num::NonZeroUsize;

/// Number of worker threads to use when the available hardware parallelism
/// cannot be determined.
pub const FALLBACK_NUM_THREADS: usize = 4;

/// Number of worker threads to spawn for the multi-threaded round.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ThreadCount {
    /// Use the number of threads returned by
    /// [`std::thread::available_parallelism()`], or [`FALLBACK_NUM_THREADS`]
    /// if the available parallelism cannot be determined.
    AvailableParallelism,
    /// Use the given number of threads.
    Count(NonZeroUsize),
}

impl TryFrom<usize> for ThreadCount {
    type Error = <NonZeroUsize as TryFrom<usize>>::Error;

    fn try_from(thread_count: usize) -> Result<Self, Self::Error> {
        let count = NonZeroUsize::try_from(thread_count)?;
        Ok(ThreadCount::Count(count))
    }
}

impl ThreadCount {
    /// Resolves this thread count into a concrete number of threads.
    pub fn resolve(self) -> usize {
        match self {
            ThreadCount::AvailableParallelism => {
                detected_or_fallback(std::thread::available_parallelism().ok())
            }
            ThreadCount::Count(count) => count.get(),
        }
    }
}

/// Maps the outcome of hardware parallelism detection to a thread count,
/// substituting [`FALLBACK_NUM_THREADS`] when the detection failed.
fn detected_or_fallback(detected: Option<NonZeroUsize>) -> usize {
    match detected {
        Some(count) => count.get(),
        None => {
            log_warn!(
                "Available parallelism cannot be determined, falling back to {FALLBACK_NUM_THREADS} threads."
            );
            FALLBACK_NUM_THREADS
        }
    }
}

/// Policy to pin worker threads to CPUs.
#[derive(Clone, Copy)]
pub enum CpuPinningPolicy {
    /// Don't pin worker threads to CPUs.
    No,
    /// Pin each worker thread to a CPU, if CPU pinning is supported and
    /// implemented on this platform.
    IfSupported,
    /// Pin each worker thread to a CPU. If CPU pinning isn't supported on this
    /// platform (or not implemented), the multi-threaded round will panic.
    Always,
}

/// Computes the sum of the given elements with a single thread.
///
/// The accumulator is 64 bits wide, so the sum cannot overflow for any 32-bit
/// input sequence that fits in memory.
pub fn sequential_sum(input: &[i32]) -> i64 {
    input.iter().map(|&x| i64::from(x)).sum()
}

/// Computes the sum of the given elements, spawning one worker thread per
/// chunk of the given partition.
///
/// Each worker accumulates its own chunk into its own cache-line-padded slot,
/// without any synchronization besides the final join. Once all the workers
/// have been joined, the per-worker partial sums are combined sequentially.
///
/// # Panics
///
/// Panics if the partition doesn't cover the input exactly, if spawning a
/// worker thread fails, or if `cpu_pinning` is [`CpuPinningPolicy::Always`]
/// on a platform where CPU pinning isn't supported (or not implemented).
pub fn parallel_sum(
    input: &[i32],
    partition: &ChunkPartition,
    cpu_pinning: CpuPinningPolicy,
) -> i64 {
    assert!(
        partition.num_elements() == input.len(),
        "cannot sum a slice of {} elements with a partition of {} elements",
        input.len(),
        partition.num_elements()
    );
    check_cpu_pinning_support(cpu_pinning);

    let mut partial_sums: Vec<CachePadded<i64>> = (0..partition.num_chunks())
        .map(|_| CachePadded::new(0))
        .collect();
    std::thread::scope(|scope| {
        for (id, (slot, chunk)) in partial_sums.iter_mut().zip(partition.iter()).enumerate() {
            scope.spawn(move || {
                pin_current_thread(id, cpu_pinning);
                log_debug!("[thread {id}] Summing chunk {chunk:?}");
                **slot = sequential_sum(&input[chunk]);
            });
        }
    });

    partial_sums.iter().map(|slot| **slot).sum()
}

/// Checks upfront whether the given policy can be honored on this platform.
#[cfg(all(
    not(miri),
    any(
        target_os = "android",
        target_os = "dragonfly",
        target_os = "freebsd",
        target_os = "linux"
    )
))]
fn check_cpu_pinning_support(_cpu_pinning: CpuPinningPolicy) {}

/// Checks upfront whether the given policy can be honored on this platform.
#[cfg(any(
    miri,
    not(any(
        target_os = "android",
        target_os = "dragonfly",
        target_os = "freebsd",
        target_os = "linux"
    ))
))]
fn check_cpu_pinning_support(cpu_pinning: CpuPinningPolicy) {
    match cpu_pinning {
        CpuPinningPolicy::No => (),
        CpuPinningPolicy::IfSupported => {
            log_warn!("Pinning threads to CPUs is not implemented on this platform.")
        }
        CpuPinningPolicy::Always => {
            panic!("Pinning threads to CPUs is not implemented on this platform.")
        }
    }
}

/// Pins the current worker thread to the CPU of the same index, according to
/// the given policy.
#[cfg(all(
    not(miri),
    any(
        target_os = "android",
        target_os = "dragonfly",
        target_os = "freebsd",
        target_os = "linux"
    )
))]
fn pin_current_thread(id: usize, cpu_pinning: CpuPinningPolicy) {
    if matches!(cpu_pinning, CpuPinningPolicy::No) {
        return;
    }
    let mut cpu_set = CpuSet::new();
    match cpu_set
        .set(id)
        .and_then(|()| sched_setaffinity(Pid::from_raw(0), &cpu_set))
    {
        Ok(()) => log_debug!("Pinned thread #{id} to CPU #{id}"),
        Err(_e) => match cpu_pinning {
            CpuPinningPolicy::No => (),
            CpuPinningPolicy::IfSupported => {
                log_warn!("Failed to set CPU affinity for thread #{id}: {_e}")
            }
            CpuPinningPolicy::Always => {
                panic!("Failed to set CPU affinity for thread #{id}: {_e}")
            }
        },
    }
}

/// Pins the current worker thread to the CPU of the same index, according to
/// the given policy.
#[cfg(any(
    miri,
    not(any(
        target_os = "android",
        target_os = "dragonfly",
        target_os = "freebsd",
        target_os = "linux"
    ))
))]
fn pin_current_thread(_id: usize, _cpu_pinning: CpuPinningPolicy) {}

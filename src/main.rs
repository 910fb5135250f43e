// Copyright 2025 Google LLC
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Benchmark program that sums 100 million integers once with a single thread
//! and once with one worker thread per available CPU, and reports the speedup.

use sumbench::{Benchmark, CpuPinningPolicy, ThreadCount};

/// Number of elements in the summed sequence.
const INPUT_LEN: usize = 100_000_000;

fn main() {
    #[cfg(feature = "log")]
    env_logger::init();

    let report = Benchmark {
        input_len: INPUT_LEN,
        num_threads: ThreadCount::AvailableParallelism,
        cpu_pinning: CpuPinningPolicy::IfSupported,
    }
    .run();
    print!("{report}");
}

#![cfg(feature = "metrics")]

use once_cell::sync::Lazy;
use std::{
    collections::BTreeMap,
    fmt::Write,
    sync::{
        Mutex,
        atomic::{AtomicUsize, Ordering},
    },
    time::Instant,
};

// Raw latencies

static TIMES: Lazy<Mutex<Vec<(&'static str, u128)>>> =
    Lazy::new(|| Mutex::new(Vec::new()));

/// Call after the operation: `record("enqueue_write", t0);`
pub fn record(name: &'static str, start: Instant) {
    let dur = start.elapsed().as_micros();
    TIMES.lock().unwrap_or_else(|e| e.into_inner()).push((name, dur));
}

// Buffer allocations and uploads

pub static ALLOCS:      AtomicUsize = AtomicUsize::new(0);
pub static ALLOC_BYTES: AtomicUsize = AtomicUsize::new(0);
pub static WRITE_BYTES: AtomicUsize = AtomicUsize::new(0);

/// Drains the recorded latencies and renders them with the counters.
pub fn summary() -> String {
    let mut map: BTreeMap<&str, Vec<u128>> = BTreeMap::new();
    {
        let mut times = TIMES.lock().unwrap_or_else(|e| e.into_inner());
        for (name, us) in times.drain(..) {
            map.entry(name).or_default().push(us);
        }
    }

    let mut out = String::new();
    let _ = writeln!(out, "── metrics summary ──");
    for (name, mut v) in map {
        v.sort_unstable();
        let total_us: u128 = v.iter().sum();
        let mean = total_us / v.len() as u128;
        let p95  = v[((v.len() * 95) / 100).saturating_sub(1)];

        let _ = writeln!(out, "{:<18} mean={:>5} µs   p95={:>5} µs", name, mean, p95);

        if name == "enqueue_write" && total_us > 0 {
            let bytes = WRITE_BYTES.load(Ordering::Relaxed) as f64;
            let gibps = bytes / (total_us as f64 / 1e6) / (1u64 << 30) as f64;
            let _ = writeln!(out, "    ↳ throughput ≈ {:.4} GiB/s", gibps);
        }
    }

    let allocs = ALLOCS.load(Ordering::Relaxed);
    let bytes  = ALLOC_BYTES.load(Ordering::Relaxed);
    let _ = writeln!(out, "device allocations: {}   ({} bytes)", allocs, bytes);
    out
}

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use serde::Serialize;

/// Which lookup tier answered a `get_chunk` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LookupTier {
    LastChunk,
    Cache,
    List,
}

#[derive(Debug, Default)]
pub struct WorldStats {
    // Lookup
    pub last_chunk_hits: AtomicUsize,
    pub cache_hits: AtomicUsize,
    pub list_hits: AtomicUsize,
    pub materializations: AtomicUsize,
    pub materialize_failures: AtomicUsize,
    pub cache_evictions: AtomicUsize,

    // File world
    pub chunks_loaded: AtomicUsize,
    pub total_load_time_us: AtomicU64,
    pub chunks_generated: AtomicUsize,
    pub total_generation_time_us: AtomicU64,
    pub max_generation_time_us: AtomicU64,
    pub corrupt_chunks: AtomicUsize,
    pub chunks_saved: AtomicUsize,
    pub total_save_time_us: AtomicU64,
    pub save_failures: AtomicUsize,

    // Net world
    pub chunk_requests: AtomicUsize,
    pub deliveries_merged: AtomicUsize,
    pub deliveries_rejected: AtomicUsize,

    pub start_time: Option<Instant>,
}

/// Plain copy of the counters, for JSON output.
#[derive(Debug, Clone, Serialize)]
pub struct StatsSnapshot {
    pub last_chunk_hits: usize,
    pub cache_hits: usize,
    pub list_hits: usize,
    pub materializations: usize,
    pub materialize_failures: usize,
    pub cache_evictions: usize,
    pub chunks_loaded: usize,
    pub chunks_generated: usize,
    pub corrupt_chunks: usize,
    pub chunks_saved: usize,
    pub save_failures: usize,
    pub chunk_requests: usize,
    pub deliveries_merged: usize,
    pub deliveries_rejected: usize,
}

fn us(duration: Duration) -> u64 {
    duration.as_micros() as u64
}

fn avg_ms(total_us: u64, count: usize) -> f64 {
    if count > 0 { total_us as f64 / 1000.0 / count as f64 } else { 0.0 }
}

impl WorldStats {
    pub fn new() -> Self {
        Self {
            start_time: Some(Instant::now()),
            ..Default::default()
        }
    }

    pub fn record_hit(&self, tier: LookupTier) {
        let counter = match tier {
            LookupTier::LastChunk => &self.last_chunk_hits,
            LookupTier::Cache => &self.cache_hits,
            LookupTier::List => &self.list_hits,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_materialization(&self) {
        self.materializations.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_materialize_failure(&self) {
        self.materialize_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_eviction(&self) {
        self.cache_evictions.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_load(&self, duration: Duration) {
        self.chunks_loaded.fetch_add(1, Ordering::Relaxed);
        self.total_load_time_us.fetch_add(us(duration), Ordering::Relaxed);
    }

    pub fn record_generation(&self, duration: Duration) {
        self.chunks_generated.fetch_add(1, Ordering::Relaxed);
        self.total_generation_time_us.fetch_add(us(duration), Ordering::Relaxed);
        self.max_generation_time_us.fetch_max(us(duration), Ordering::Relaxed);
    }

    pub fn record_corrupt_chunk(&self) {
        self.corrupt_chunks.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_save(&self, duration: Duration) {
        self.chunks_saved.fetch_add(1, Ordering::Relaxed);
        self.total_save_time_us.fetch_add(us(duration), Ordering::Relaxed);
    }

    pub fn record_save_failure(&self) {
        self.save_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_request(&self) {
        self.chunk_requests.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_delivery(&self, merged: bool) {
        if merged {
            self.deliveries_merged.fetch_add(1, Ordering::Relaxed);
        } else {
            self.deliveries_rejected.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            last_chunk_hits: self.last_chunk_hits.load(Ordering::Relaxed),
            cache_hits: self.cache_hits.load(Ordering::Relaxed),
            list_hits: self.list_hits.load(Ordering::Relaxed),
            materializations: self.materializations.load(Ordering::Relaxed),
            materialize_failures: self.materialize_failures.load(Ordering::Relaxed),
            cache_evictions: self.cache_evictions.load(Ordering::Relaxed),
            chunks_loaded: self.chunks_loaded.load(Ordering::Relaxed),
            chunks_generated: self.chunks_generated.load(Ordering::Relaxed),
            corrupt_chunks: self.corrupt_chunks.load(Ordering::Relaxed),
            chunks_saved: self.chunks_saved.load(Ordering::Relaxed),
            save_failures: self.save_failures.load(Ordering::Relaxed),
            chunk_requests: self.chunk_requests.load(Ordering::Relaxed),
            deliveries_merged: self.deliveries_merged.load(Ordering::Relaxed),
            deliveries_rejected: self.deliveries_rejected.load(Ordering::Relaxed),
        }
    }

    pub fn generate_report(&self) -> String {
        let uptime = self.start_time.unwrap_or_else(Instant::now).elapsed();
        let s = self.snapshot();

        let lookups = s.last_chunk_hits + s.cache_hits + s.list_hits + s.materializations;
        let fast_rate = if lookups > 0 {
            (s.last_chunk_hits as f64 / lookups as f64) * 100.0
        } else {
            0.0
        };

        let gen_avg = avg_ms(self.total_generation_time_us.load(Ordering::Relaxed), s.chunks_generated);
        let gen_max = self.max_generation_time_us.load(Ordering::Relaxed) as f64 / 1000.0;
        let load_avg = avg_ms(self.total_load_time_us.load(Ordering::Relaxed), s.chunks_loaded);
        let save_avg = avg_ms(self.total_save_time_us.load(Ordering::Relaxed), s.chunks_saved);

        format!(
            "ABT World Report\n\
             ================\n\
             Session Duration: {:.2?}\n\n\
             [Lookup]\n\
             Last-chunk Hits: {}\n\
             Cache Hits: {}\n\
             List Hits: {}\n\
             Materializations: {} ({} failed)\n\
             Cache Evictions: {}\n\
             Fast-path Rate: {:.1}%\n\n\
             [Storage]\n\
             Chunks Loaded: {} (avg {:.2} ms)\n\
             Corrupt Chunks Regenerated: {}\n\
             Chunks Generated: {} (avg {:.2} ms, max {:.2} ms)\n\
             Chunks Saved: {} (avg {:.2} ms, {} failed)\n\n\
             [Network]\n\
             Chunk Requests: {}\n\
             Deliveries Merged: {}\n\
             Deliveries Rejected: {}\n",
            uptime,
            s.last_chunk_hits,
            s.cache_hits,
            s.list_hits,
            s.materializations, s.materialize_failures,
            s.cache_evictions,
            fast_rate,
            s.chunks_loaded, load_avg,
            s.corrupt_chunks,
            s.chunks_generated, gen_avg, gen_max,
            s.chunks_saved, save_avg, s.save_failures,
            s.chunk_requests,
            s.deliveries_merged,
            s.deliveries_rejected
        )
    }
}

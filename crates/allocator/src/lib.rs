use jemalloc_ctl::{epoch, epoch_mib, stats, thread};
use jemallocator::Jemalloc;
use std::alloc::{GlobalAlloc, Layout};
use std::sync::atomic::{AtomicU64, Ordering};

#[global_allocator]
static ALLOC: CountingAllocator = CountingAllocator;

/// Process-wide memory statistics, in bytes. See the "stats." entries of the
/// [jemalloc man page](http://jemalloc.net/jemalloc.3.html) for exact meanings.
#[derive(Debug, Clone, Copy)]
pub struct GlobalStats {
    pub allocated: u64,
    pub resident: u64,
    pub counts: AllocationCounts,
}

/// Monotonic counts of allocator invocations, collected by instrumenting
/// the global allocator rather than by introspecting jemalloc.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct AllocationCounts {
    pub alloc_ops: u64,
    pub dealloc_ops: u64,
    pub realloc_ops: u64,
}

impl std::ops::Sub for AllocationCounts {
    type Output = AllocationCounts;
    fn sub(self, rhs: Self) -> Self::Output {
        AllocationCounts {
            alloc_ops: self.alloc_ops - rhs.alloc_ops,
            dealloc_ops: self.dealloc_ops - rhs.dealloc_ops,
            realloc_ops: self.realloc_ops - rhs.realloc_ops,
        }
    }
}

/// Returns current process-wide memory statistics.
/// jemalloc's cached statistics are refreshed first.
pub fn global_stats() -> GlobalStats {
    GLOBAL_STATS.current()
}

/// Cumulative bytes allocated and deallocated by the current thread.
#[derive(Debug, Clone, Copy)]
pub struct ThreadStats {
    pub allocated: u64,
    pub deallocated: u64,
}

impl ThreadStats {
    /// Bytes allocated but not yet deallocated. May be negative over a window
    /// which frees memory allocated before it.
    pub fn net_allocated(&self) -> i64 {
        self.allocated as i64 - self.deallocated as i64
    }
}

impl std::ops::Sub for ThreadStats {
    type Output = ThreadStats;
    fn sub(self, rhs: Self) -> Self::Output {
        ThreadStats {
            allocated: self.allocated - rhs.allocated,
            deallocated: self.deallocated - rhs.deallocated,
        }
    }
}

/// Reads allocation statistics of the current thread.
pub struct ThreadStatsReader {
    allocated: thread::ThreadLocal<u64>,
    deallocated: thread::ThreadLocal<u64>,
}

impl ThreadStatsReader {
    pub fn new() -> ThreadStatsReader {
        ThreadStatsReader {
            allocated: THREAD_ALLOC_MIB.read().unwrap(),
            deallocated: THREAD_DEALLOC_MIB.read().unwrap(),
        }
    }

    pub fn current(&self) -> ThreadStats {
        ThreadStats {
            allocated: self.allocated.get(),
            deallocated: self.deallocated.get(),
        }
    }
}

impl Default for ThreadStatsReader {
    fn default() -> Self {
        Self::new()
    }
}

/// Window measures the memory used by the current thread between when it's
/// opened and closed. Opening a Window also refreshes jemalloc's statistics,
/// so each measurement starts from a settled baseline.
///
/// Where jemalloc also serves C `malloc` (see the
/// `unprefixed_malloc_on_supported_platforms` feature, enabled on Linux),
/// bytes allocated by linked C libraries are included. Allocation counts
/// only ever include calls through the Rust global allocator.
pub struct Window {
    reader: ThreadStatsReader,
    start: ThreadStats,
    start_counts: AllocationCounts,
}

/// Usage is the memory used over a closed Window.
#[derive(Debug, Clone, Copy)]
pub struct Usage {
    /// Bytes still held at close which were allocated within the window.
    pub retained: i64,
    /// Total bytes allocated within the window, including those since freed.
    pub allocated: u64,
    pub counts: AllocationCounts,
}

impl Window {
    pub fn open() -> Window {
        let _ = global_stats();

        let reader = ThreadStatsReader::new();
        let start = reader.current();
        Window {
            reader,
            start,
            start_counts: CountingAllocator::get_counts(),
        }
    }

    pub fn close(self) -> Usage {
        let delta = self.reader.current() - self.start;

        Usage {
            retained: delta.net_allocated(),
            allocated: delta.allocated,
            counts: CountingAllocator::get_counts() - self.start_counts,
        }
    }
}

// Reads global statistics using the MIB API, which caches the lookups of
// string keys so that reads are cheap.
struct GlobalStatReader {
    epoch_mib: epoch_mib,
    allocated_mib: stats::allocated_mib,
    resident_mib: stats::resident_mib,
}

impl GlobalStatReader {
    fn new() -> GlobalStatReader {
        GlobalStatReader {
            epoch_mib: epoch::mib().unwrap(),
            allocated_mib: stats::allocated::mib().unwrap(),
            resident_mib: stats::resident::mib().unwrap(),
        }
    }

    fn current(&self) -> GlobalStats {
        // jemalloc only refreshes its statistics when the epoch advances.
        self.epoch_mib.advance().unwrap();
        GlobalStats {
            allocated: self.allocated_mib.read().unwrap() as u64,
            resident: self.resident_mib.read().unwrap() as u64,
            counts: CountingAllocator::get_counts(),
        }
    }
}

lazy_static::lazy_static! {
    static ref GLOBAL_STATS: GlobalStatReader = GlobalStatReader::new();
    static ref THREAD_ALLOC_MIB: thread::allocatedp_mib = thread::allocatedp::mib().unwrap();
    static ref THREAD_DEALLOC_MIB: thread::deallocatedp_mib = thread::deallocatedp::mib().unwrap();
}

static ALLOCS_COUNT: AtomicU64 = AtomicU64::new(0);
static DEALLOCS_COUNT: AtomicU64 = AtomicU64::new(0);
static REALLOCS_COUNT: AtomicU64 = AtomicU64::new(0);

/// Delegates to Jemalloc, counting each invocation.
struct CountingAllocator;

impl CountingAllocator {
    fn get_counts() -> AllocationCounts {
        AllocationCounts {
            alloc_ops: ALLOCS_COUNT.load(Ordering::SeqCst),
            dealloc_ops: DEALLOCS_COUNT.load(Ordering::SeqCst),
            realloc_ops: REALLOCS_COUNT.load(Ordering::SeqCst),
        }
    }
}

unsafe impl GlobalAlloc for CountingAllocator {
    unsafe fn alloc(&self, layout: Layout) -> *mut u8 {
        ALLOCS_COUNT.fetch_add(1, Ordering::SeqCst);
        unsafe { Jemalloc.alloc(layout) }
    }
    unsafe fn alloc_zeroed(&self, layout: Layout) -> *mut u8 {
        ALLOCS_COUNT.fetch_add(1, Ordering::SeqCst);
        unsafe { Jemalloc.alloc_zeroed(layout) }
    }
    unsafe fn dealloc(&self, ptr: *mut u8, layout: Layout) {
        DEALLOCS_COUNT.fetch_add(1, Ordering::SeqCst);
        unsafe { Jemalloc.dealloc(ptr, layout) }
    }
    unsafe fn realloc(&self, ptr: *mut u8, layout: Layout, new_size: usize) -> *mut u8 {
        REALLOCS_COUNT.fetch_add(1, Ordering::SeqCst);
        unsafe { Jemalloc.realloc(ptr, layout, new_size) }
    }
}

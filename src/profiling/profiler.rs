//! Span recording and Chrome Trace JSON emission.
//!
//! Spans are RAII guards: creation records the start timestamp, drop
//! records the duration and queues a complete (`ph:"X"`) event. Events are
//! buffered in memory and written out once at [`shutdown`]. Each OS thread
//! is assigned a stable logical thread id so the trace viewer can lay
//! spans out per thread.

#[cfg(feature = "profiling")]
mod enabled {
    use std::fs::File;
    use std::io::{BufWriter, Write};
    use std::path::{Path, PathBuf};
    use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
    use std::sync::{Mutex, OnceLock};
    use std::time::Instant;

    struct SpanEvent {
        name: &'static str,
        ts_us: u64,
        dur_us: u64,
        tid: u64,
    }

    struct ProfilerState {
        start: Instant,
        out_path: PathBuf,
        is_on: AtomicBool,
        events: Mutex<Vec<SpanEvent>>,
    }

    static STATE: OnceLock<ProfilerState> = OnceLock::new();
    static NEXT_TID: AtomicU64 = AtomicU64::new(1);

    thread_local! {
        static TID: u64 = NEXT_TID.fetch_add(1, Ordering::Relaxed);
    }

    fn tid() -> u64 {
        TID.with(|t| *t)
    }

    /// Initialises the profiler; events are buffered from this point on.
    pub fn init<P: AsRef<Path>>(path: P) {
        let _ = STATE.set(ProfilerState {
            start: Instant::now(),
            out_path: path.as_ref().to_path_buf(),
            is_on: AtomicBool::new(true),
            events: Mutex::new(Vec::new()),
        });
    }

    /// Stops recording and writes the buffered trace to disk.
    pub fn shutdown() {
        if let Some(state) = STATE.get() {
            state.is_on.store(false, Ordering::Release);
            if let Err(e) = write_trace(state) {
                eprintln!("profiler: failed to write trace: {e}");
            }
        }
    }

    fn write_trace(state: &ProfilerState) -> std::io::Result<()> {
        let events = {
            let mut guard = state.events.lock().unwrap();
            std::mem::take(&mut *guard)
        };
        if let Some(parent) = state.out_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let mut w = BufWriter::new(File::create(&state.out_path)?);
        write!(w, "{{\"traceEvents\":[")?;
        for (i, ev) in events.iter().enumerate() {
            if i > 0 {
                write!(w, ",")?;
            }
            write!(
                w,
                "{{\"name\":\"{}\",\"cat\":\"ecs\",\"ph\":\"X\",\"ts\":{},\"dur\":{},\"pid\":1,\"tid\":{}}}",
                ev.name, ev.ts_us, ev.dur_us, ev.tid
            )?;
        }
        write!(w, "]}}")?;
        w.flush()
    }

    /// RAII guard recording one span; the event is queued on drop.
    pub struct SpanGuard {
        name: &'static str,
        start_us: u64,
        active: bool,
    }

    /// Opens a span named `name` on the current thread.
    pub fn span(name: &'static str) -> SpanGuard {
        match STATE.get() {
            Some(state) if state.is_on.load(Ordering::Acquire) => SpanGuard {
                name,
                start_us: state.start.elapsed().as_micros() as u64,
                active: true,
            },
            _ => SpanGuard {
                name,
                start_us: 0,
                active: false,
            },
        }
    }

    impl Drop for SpanGuard {
        fn drop(&mut self) {
            if !self.active {
                return;
            }
            let Some(state) = STATE.get() else { return };
            if !state.is_on.load(Ordering::Acquire) {
                return;
            }
            let now_us = state.start.elapsed().as_micros() as u64;
            let mut guard = match state.events.lock() {
                Ok(guard) => guard,
                Err(_) => return,
            };
            guard.push(SpanEvent {
                name: self.name,
                ts_us: self.start_us,
                dur_us: now_us.saturating_sub(self.start_us),
                tid: tid(),
            });
        }
    }
}

#[cfg(not(feature = "profiling"))]
mod disabled {
    use std::path::Path;

    /// No-op stand-in for the enabled guard.
    pub struct SpanGuard;

    /// No-op without the `profiling` feature.
    #[inline(always)]
    pub fn init<P: AsRef<Path>>(_path: P) {}

    /// No-op without the `profiling` feature.
    #[inline(always)]
    pub fn shutdown() {}

    /// No-op without the `profiling` feature.
    #[inline(always)]
    pub fn span(_name: &'static str) -> SpanGuard {
        SpanGuard
    }
}

#[cfg(feature = "profiling")]
pub use enabled::{init, shutdown, span, SpanGuard};

#[cfg(not(feature = "profiling"))]
pub use disabled::{init, shutdown, span, SpanGuard};

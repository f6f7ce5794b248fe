//! Measurement providers
//!
//! Timers and memory utilities sample their quantity through these traits so
//! the numbers can come from the operating system or from a scripted source
//! in tests.
//!
//! Memory policy: a memory reading is the delta of the whole process's
//! resident set between the `begin` and `finish` samples. The decorated
//! callable's return value is still alive when `finish` samples, so memory the
//! result retains is counted.

use crate::error::{DecoError, Result};
use chrono::{Local, NaiveDate, NaiveDateTime, TimeDelta};
use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::fmt;
use std::rc::Rc;
use std::time::{Duration, Instant};
use sysinfo::{Pid, ProcessRefreshKind, ProcessesToUpdate, System};

/// Monotonic time source plus wall-clock timestamps for records
pub trait Clock {
    /// Time elapsed since an arbitrary fixed origin
    fn now(&self) -> Result<Duration>;

    /// Wall-clock time used to stamp records
    fn timestamp(&self) -> NaiveDateTime {
        Local::now().naive_local()
    }
}

/// Resident memory source
pub trait MemoryProbe {
    /// Current resident memory of the process in bytes
    fn current_memory(&self) -> Result<u64>;
}

/// `Instant`-backed clock
#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    origin: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now(&self) -> Result<Duration> {
        Ok(self.origin.elapsed())
    }
}

/// Resident set size of the current process, sampled through `sysinfo`
pub struct ProcessMemory {
    system: RefCell<System>,
    pid: Pid,
}

impl ProcessMemory {
    pub fn new() -> Result<Self> {
        let pid = sysinfo::get_current_pid()
            .map_err(|reason| DecoError::unavailable("process memory", reason))?;
        Ok(Self {
            system: RefCell::new(System::new()),
            pid,
        })
    }
}

impl fmt::Debug for ProcessMemory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProcessMemory").field("pid", &self.pid).finish()
    }
}

impl MemoryProbe for ProcessMemory {
    fn current_memory(&self) -> Result<u64> {
        let mut system = self.system.borrow_mut();
        system.refresh_processes_specifics(
            ProcessesToUpdate::Some(&[self.pid]),
            true,
            ProcessRefreshKind::nothing().with_memory(),
        );
        system
            .process(self.pid)
            .map(|process| process.memory())
            .ok_or_else(|| {
                DecoError::unavailable(
                    "process memory",
                    format!("process {} not visible to sysinfo", self.pid),
                )
            })
    }
}

/// Deterministic clock advanced by hand
///
/// Timestamps start at 2024-01-01 00:00:00 and move with the clock.
#[derive(Debug, Default)]
pub struct ManualClock {
    elapsed: Cell<Duration>,
    stopped: Cell<bool>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn advance(&self, by: Duration) {
        self.elapsed.set(self.elapsed.get() + by);
    }

    /// Make every further sample fail
    pub fn stop(&self) {
        self.stopped.set(true);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Result<Duration> {
        if self.stopped.get() {
            return Err(DecoError::unavailable("manual clock", "clock stopped"));
        }
        Ok(self.elapsed.get())
    }

    fn timestamp(&self) -> NaiveDateTime {
        let base = NaiveDate::from_ymd_opt(2024, 1, 1)
            .and_then(|date| date.and_hms_opt(0, 0, 0))
            .unwrap_or_default();
        base + TimeDelta::microseconds(self.elapsed.get().as_micros() as i64)
    }
}

/// Memory probe replaying a queue of samples
#[derive(Debug, Default)]
pub struct ScriptedMemory {
    samples: RefCell<VecDeque<u64>>,
}

impl ScriptedMemory {
    pub fn new(samples: impl IntoIterator<Item = u64>) -> Self {
        Self {
            samples: RefCell::new(samples.into_iter().collect()),
        }
    }

    pub fn push(&self, sample: u64) {
        self.samples.borrow_mut().push_back(sample);
    }

    pub fn remaining(&self) -> usize {
        self.samples.borrow().len()
    }
}

impl MemoryProbe for ScriptedMemory {
    fn current_memory(&self) -> Result<u64> {
        self.samples
            .borrow_mut()
            .pop_front()
            .ok_or_else(|| DecoError::unavailable("scripted memory", "no samples left"))
    }
}

/// Providers handed to measurement utilities at construction
#[derive(Clone)]
pub struct Providers {
    pub clock: Rc<dyn Clock>,
    pub memory: Rc<dyn MemoryProbe>,
}

impl Providers {
    pub fn new(clock: Rc<dyn Clock>, memory: Rc<dyn MemoryProbe>) -> Self {
        Self { clock, memory }
    }

    /// Operating system providers for the current process
    pub fn system() -> Result<Self> {
        Ok(Self {
            clock: Rc::new(SystemClock::new()),
            memory: Rc::new(ProcessMemory::new()?),
        })
    }
}

impl fmt::Debug for Providers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Providers").finish_non_exhaustive()
    }
}

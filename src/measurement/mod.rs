//! Per-call measurement utilities
//!
//! A measurement utility observes one quantity before and after a single
//! invocation and turns the two observations into one [`Reading`]. Utilities
//! never call the target themselves, which lets the aggregating logger nest
//! several of them around one shared invocation.
//!
//! Used on its own, a utility is wrapped in a [`Reporting`] hook that prints
//! one line per call and keeps the last reading.

mod memory;
mod timer;

pub use memory::{Memory, MemoryDecorator};
pub use timer::{Timer, TimerDecorator};

use crate::config::UtilityKind;
use crate::decorator::{Call, Intercept};
use crate::error::{DecoError, Result};
use crate::providers::Providers;
use std::cell::Cell;
use std::fmt;
use std::rc::Rc;
use std::time::Duration;

/// Raw sample taken by a utility
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Observation {
    /// Clock position
    Instant(Duration),
    /// Resident bytes
    Resident(u64),
    /// Free-form sample for custom utilities
    Scalar(f64),
}

/// Value measured for one call
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Reading {
    Elapsed(Duration),
    /// Signed byte delta
    Bytes(i64),
    Scalar(f64),
}

impl Reading {
    /// Zero of the same kind
    pub fn zero_like(&self) -> Reading {
        match self {
            Reading::Elapsed(_) => Reading::Elapsed(Duration::ZERO),
            Reading::Bytes(_) => Reading::Bytes(0),
            Reading::Scalar(_) => Reading::Scalar(0.0),
        }
    }

    /// Sum of two readings of the same kind
    pub fn checked_add(&self, other: &Reading) -> Option<Reading> {
        match (self, other) {
            (Reading::Elapsed(a), Reading::Elapsed(b)) => a.checked_add(*b).map(Reading::Elapsed),
            (Reading::Bytes(a), Reading::Bytes(b)) => a.checked_add(*b).map(Reading::Bytes),
            (Reading::Scalar(a), Reading::Scalar(b)) => Some(Reading::Scalar(a + b)),
            _ => None,
        }
    }
}

impl fmt::Display for Reading {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Reading::Elapsed(duration) => f.write_str(&format_duration(*duration)),
            Reading::Bytes(bytes) => f.write_str(&format_bytes(*bytes)),
            Reading::Scalar(value) => write!(f, "{:.4}", value),
        }
    }
}

/// A named reading as it appears in rendered logs: `runtime : 0h 0m 01.5000s`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Field {
    pub name: &'static str,
    pub reading: Reading,
}

impl Field {
    pub fn new(name: &'static str, reading: Reading) -> Self {
        Self { name, reading }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} : {}", self.name, self.reading)
    }
}

/// Format a duration as `{h}h {m}m {ss.ffff}s`
///
/// # Example
/// ```
/// use decotrace::measurement::format_duration;
/// use std::time::Duration;
///
/// assert_eq!(format_duration(Duration::from_secs(70)), "0h 1m 10.0000s");
/// ```
pub fn format_duration(duration: Duration) -> String {
    let total_secs = duration.as_secs();
    let hours = total_secs / 3600;
    let minutes = (total_secs % 3600) / 60;
    let seconds = (total_secs % 60) as f64 + f64::from(duration.subsec_nanos()) / 1e9;
    format!("{}h {}m {:07.4}s", hours, minutes, seconds)
}

/// Format a byte count as `{MB}MB {KB}KB {B}B` (1024-based)
///
/// Division floors, so a negative count carries its sign on the megabytes
/// and keeps non-negative kilobytes and bytes: `-1029` is `-1MB 1022KB 1019B`.
pub fn format_bytes(bytes: i64) -> String {
    const MB: i64 = 1024 * 1024;
    let megabytes = bytes.div_euclid(MB);
    let remainder = bytes.rem_euclid(MB);
    format!("{}MB {}KB {}B", megabytes, remainder / 1024, remainder % 1024)
}

/// One quantity measured around one invocation
pub trait MeasurementUtility {
    /// Name the reading is stored and rendered under; also the connection key
    fn data_name(&self) -> &'static str;

    /// Sample before the invocation
    fn begin(&self) -> Result<Observation>;

    /// Sample after the invocation and compute the reading
    fn finish(&self, before: Observation) -> Result<Reading>;
}

pub(crate) fn mismatched(data_name: &'static str, observation: Observation) -> DecoError {
    DecoError::unavailable(
        data_name,
        format!("unexpected begin observation {:?}", observation),
    )
}

/// Data name the built-in utility for `kind` records under
pub fn data_name_of(kind: UtilityKind) -> &'static str {
    match kind {
        UtilityKind::Timer => Timer::DATA_NAME,
        UtilityKind::Memory => Memory::DATA_NAME,
    }
}

/// Build the built-in utility for `kind`
pub fn instantiate(kind: UtilityKind, providers: &Providers) -> Rc<dyn MeasurementUtility> {
    match kind {
        UtilityKind::Timer => Rc::new(Timer::new(Rc::clone(&providers.clock))),
        UtilityKind::Memory => Rc::new(Memory::new(Rc::clone(&providers.memory))),
    }
}

/// Standalone hook: measure, print one line, keep the reading
#[derive(Debug)]
pub struct Reporting<U> {
    utility: U,
    last: Cell<Option<Reading>>,
}

impl<U: MeasurementUtility> Reporting<U> {
    pub fn new(utility: U) -> Self {
        Self {
            utility,
            last: Cell::new(None),
        }
    }

    pub fn utility(&self) -> &U {
        &self.utility
    }

    /// Reading of the most recent completed call
    pub fn last_reading(&self) -> Option<Reading> {
        self.last.get()
    }
}

impl<U: MeasurementUtility> Intercept for Reporting<U> {
    fn intercept(&self, call: Call<'_>) -> Result<()> {
        let identity = call.identity();
        let before = self.utility.begin()?;
        call.proceed();
        let reading = self.utility.finish(before)?;

        println!("{} - {}", identity, Field::new(self.utility.data_name(), reading));
        self.last.set(Some(reading));
        Ok(())
    }
}

#[cfg(test)]
mod tests;

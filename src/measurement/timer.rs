//! Elapsed-time utility

use super::{mismatched, MeasurementUtility, Observation, Reading, Reporting};
use crate::config::DecoratorConfig;
use crate::decorator::Decorator;
use crate::error::Result;
use crate::providers::{Clock, SystemClock};
use std::fmt;
use std::rc::Rc;

/// Standalone timing decorator
pub type TimerDecorator = Decorator<Reporting<Timer>>;

/// Measures wall time spent in one call
#[derive(Clone)]
pub struct Timer {
    clock: Rc<dyn Clock>,
}

impl Timer {
    pub const DATA_NAME: &'static str = "runtime";

    pub fn new(clock: Rc<dyn Clock>) -> Self {
        Self { clock }
    }

    /// Decorator printing the runtime of every call
    pub fn decorator(config: DecoratorConfig, clock: Rc<dyn Clock>) -> TimerDecorator {
        Decorator::with_hook(config, Reporting::new(Self::new(clock)))
    }
}

impl Default for Timer {
    fn default() -> Self {
        Self::new(Rc::new(SystemClock::new()))
    }
}

impl fmt::Debug for Timer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Timer")
    }
}

impl MeasurementUtility for Timer {
    fn data_name(&self) -> &'static str {
        Self::DATA_NAME
    }

    fn begin(&self) -> Result<Observation> {
        self.clock.now().map(Observation::Instant)
    }

    fn finish(&self, before: Observation) -> Result<Reading> {
        let Observation::Instant(tic) = before else {
            return Err(mismatched(Self::DATA_NAME, before));
        };
        let toc = self.clock.now()?;
        Ok(Reading::Elapsed(toc.saturating_sub(tic)))
    }
}

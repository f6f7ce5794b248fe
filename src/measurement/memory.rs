//! Memory-delta utility

use super::{mismatched, MeasurementUtility, Observation, Reading, Reporting};
use crate::config::DecoratorConfig;
use crate::decorator::Decorator;
use crate::error::Result;
use crate::providers::MemoryProbe;
use std::fmt;
use std::rc::Rc;

/// Standalone memory decorator
pub type MemoryDecorator = Decorator<Reporting<Memory>>;

/// Measures the change of resident memory across one call
#[derive(Clone)]
pub struct Memory {
    probe: Rc<dyn MemoryProbe>,
}

impl Memory {
    pub const DATA_NAME: &'static str = "memory usage";

    pub fn new(probe: Rc<dyn MemoryProbe>) -> Self {
        Self { probe }
    }

    /// Decorator printing the memory delta of every call
    pub fn decorator(config: DecoratorConfig, probe: Rc<dyn MemoryProbe>) -> MemoryDecorator {
        Decorator::with_hook(config, Reporting::new(Self::new(probe)))
    }
}

impl fmt::Debug for Memory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Memory")
    }
}

impl MeasurementUtility for Memory {
    fn data_name(&self) -> &'static str {
        Self::DATA_NAME
    }

    fn begin(&self) -> Result<Observation> {
        self.probe.current_memory().map(Observation::Resident)
    }

    fn finish(&self, before: Observation) -> Result<Reading> {
        let Observation::Resident(pre) = before else {
            return Err(mismatched(Self::DATA_NAME, before));
        };
        let post = self.probe.current_memory()?;
        Ok(Reading::Bytes(post as i64 - pre as i64))
    }
}

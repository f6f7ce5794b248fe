//! Call counting hook
//!
//! Counts completed calls per resolved identity. Identities keep the order in
//! which they were first called.

use crate::config::DecoratorConfig;
use crate::decorator::{Call, Decorator, Intercept};
use crate::error::Result;
use indexmap::IndexMap;
use std::cell::RefCell;
use std::fmt;

/// Decorator whose hook counts calls
pub type CounterDecorator = Decorator<Counter>;

/// Hook counting completed calls per identity
#[derive(Debug, Default)]
pub struct Counter {
    counts: RefCell<IndexMap<String, u64>>,
}

impl Counter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decorator counting every call it intercepts
    pub fn decorator(config: DecoratorConfig) -> CounterDecorator {
        Decorator::with_hook(config, Self::new())
    }

    /// Completed calls under `identity`
    pub fn count(&self, identity: &str) -> u64 {
        self.counts.borrow().get(identity).copied().unwrap_or(0)
    }

    /// Completed calls across all identities
    pub fn total_runcall(&self) -> u64 {
        self.counts.borrow().values().sum()
    }

    /// Identities in first-called order
    pub fn identities(&self) -> Vec<String> {
        self.counts.borrow().keys().cloned().collect()
    }

    /// Forget every count
    pub fn reset(&self) {
        self.counts.borrow_mut().clear();
    }
}

impl Intercept for Counter {
    fn intercept(&self, call: Call<'_>) -> Result<()> {
        let identity = call.identity();
        self.counts
            .borrow_mut()
            .entry(identity.to_string())
            .or_insert(0);
        call.proceed();
        // Counted once the call has completed
        if let Some(count) = self.counts.borrow_mut().get_mut(identity) {
            *count += 1;
        }
        Ok(())
    }
}

impl fmt::Display for Counter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Counter(")?;
        for (identity, count) in self.counts.borrow().iter() {
            writeln!(f, "[{}] number of calls : {}", identity, count)?;
        }
        writeln!(f, "-----------")?;
        writeln!(f, "total number of calls : {}", self.total_runcall())?;
        write!(f, ")")
    }
}

//! Runtime log hook
//!
//! A lighter sibling of the aggregating logger: it keeps one
//! `(timestamp, identity, runtime)` entry per call and answers per-identity
//! questions (call counts, cumulative runtime) without any utility wiring.

use crate::config::DecoratorConfig;
use crate::decorator::{Call, Decorator, Intercept};
use crate::error::Result;
use crate::measurement::format_duration;
use crate::providers::Clock;
use chrono::NaiveDateTime;
use std::cell::RefCell;
use std::collections::BTreeSet;
use std::fmt;
use std::rc::Rc;
use std::time::Duration;

/// Decorator whose hook is a runtime log
pub type RuntimeLogDecorator = Decorator<RuntimeLog>;

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.6f";

/// One logged call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogCall {
    pub timestamp: NaiveDateTime,
    pub identity: String,
    pub runtime: Duration,
}

/// Hook logging the runtime of every call
pub struct RuntimeLog {
    clock: Rc<dyn Clock>,
    entries: RefCell<Vec<LogCall>>,
}

impl RuntimeLog {
    pub fn new(clock: Rc<dyn Clock>) -> Self {
        Self {
            clock,
            entries: RefCell::new(Vec::new()),
        }
    }

    /// Decorator timing calls with `clock`
    pub fn decorator(config: DecoratorConfig, clock: Rc<dyn Clock>) -> RuntimeLogDecorator {
        Decorator::with_hook(config, Self::new(clock))
    }

    /// Copy of every entry in storage order
    pub fn entries(&self) -> Vec<LogCall> {
        self.entries.borrow().clone()
    }

    /// Runtime summed over every entry
    pub fn total_runtime(&self) -> Duration {
        self.entries.borrow().iter().map(|call| call.runtime).sum()
    }

    /// Number of logged calls
    pub fn total_runcall(&self) -> usize {
        self.entries.borrow().len()
    }

    /// Logged calls under `identity`
    pub fn number_calls(&self, identity: &str) -> usize {
        self.entries
            .borrow()
            .iter()
            .filter(|call| call.identity == identity)
            .count()
    }

    /// Runtime summed over the calls of `identity`
    pub fn cumul_runtime(&self, identity: &str) -> Duration {
        self.entries
            .borrow()
            .iter()
            .filter(|call| call.identity == identity)
            .map(|call| call.runtime)
            .sum()
    }

    /// Distinct identities, sorted
    pub fn functions(&self) -> Vec<String> {
        self.entries
            .borrow()
            .iter()
            .map(|call| call.identity.clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// Calls of one identity sorted by timestamp
    pub fn calls_for(&self, identity: &str) -> Vec<LogCall> {
        let mut calls: Vec<LogCall> = self
            .entries
            .borrow()
            .iter()
            .filter(|call| call.identity == identity)
            .cloned()
            .collect();
        calls.sort_by_key(|call| call.timestamp);
        calls
    }

    /// Reorder storage by call timestamp
    pub fn sort_by_date(&self) {
        self.entries.borrow_mut().sort_by_key(|call| call.timestamp);
    }

    /// Reorder storage by identity; stable for equal identities
    pub fn sort_by_name(&self) {
        self.entries
            .borrow_mut()
            .sort_by(|a, b| a.identity.cmp(&b.identity));
    }

    /// Drop every entry
    pub fn reset(&self) {
        self.entries.borrow_mut().clear();
    }

    /// Every call in timestamp order followed by totals
    pub fn log_repr(&self) -> String {
        let mut calls = self.entries();
        calls.sort_by_key(|call| call.timestamp);

        let mut repr = String::from("Logger(\n");
        for call in &calls {
            repr.push_str(&format!(
                "[{}] function : {} - runtime : {}\n",
                call.timestamp.format(TIMESTAMP_FORMAT),
                call.identity,
                format_duration(call.runtime)
            ));
        }
        self.push_totals(&mut repr);
        repr
    }

    /// Per-identity call counts and cumulative runtime
    pub fn summary_repr(&self) -> String {
        self.identity_repr(false)
    }

    /// Summary plus every call under its identity
    pub fn details_repr(&self) -> String {
        self.identity_repr(true)
    }

    fn identity_repr(&self, develop: bool) -> String {
        let mut repr = String::from("Logger(\n");
        for identity in self.functions() {
            repr.push_str(&format!(
                "[{}] number of calls : {} - cumulative runtime : {}\n",
                identity,
                self.number_calls(&identity),
                format_duration(self.cumul_runtime(&identity))
            ));
            if develop {
                for call in self.calls_for(&identity) {
                    repr.push_str(&format!(
                        "\t\t[{}] runtime : {}\n",
                        call.timestamp.format(TIMESTAMP_FORMAT),
                        format_duration(call.runtime)
                    ));
                }
            }
        }
        self.push_totals(&mut repr);
        repr
    }

    fn push_totals(&self, repr: &mut String) {
        repr.push_str(&format!(
            "-----------\ntotal number of calls : {}\ntotal runtime : {}\n)",
            self.total_runcall(),
            format_duration(self.total_runtime())
        ));
    }
}

impl Intercept for RuntimeLog {
    fn intercept(&self, call: Call<'_>) -> Result<()> {
        let identity = call.identity();
        let timestamp = self.clock.timestamp();
        let tic = self.clock.now()?;
        call.proceed();
        let toc = self.clock.now()?;

        self.entries.borrow_mut().push(LogCall {
            timestamp,
            identity: identity.to_string(),
            runtime: toc.saturating_sub(tic),
        });
        Ok(())
    }
}

impl fmt::Debug for RuntimeLog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RuntimeLog")
            .field("entries", &self.entries.borrow().len())
            .finish_non_exhaustive()
    }
}

impl fmt::Display for RuntimeLog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.summary_repr())
    }
}

//! Aggregating logger
//!
//! A [`FunctionLogger`] drives its connected measurement utilities around
//! every decorated call and keeps one [`Record`] per call, grouped by the
//! call's resolved identity. Storage always keeps the full per-call history;
//! the log format only changes how the history is rendered:
//!
//! - `datetime`: one line per record in arrival order
//! - `function`: records grouped under their identity, identities in
//!   first-seen order
//! - `cumulative`: one line per identity with call count and summed readings
//!
//! # Example
//! ```
//! use decotrace::providers::{ManualClock, ScriptedMemory};
//! use decotrace::{CallableMeta, FunctionLogger, LogFormat, LoggerConfig, Providers, UtilityKind};
//! use std::rc::Rc;
//!
//! let providers = Providers::new(Rc::new(ManualClock::new()), Rc::new(ScriptedMemory::default()));
//! let config = LoggerConfig::default()
//!     .with_utils([UtilityKind::Timer])
//!     .with_log_format(LogFormat::Cumulative);
//! let logger = FunctionLogger::decorator(config, providers);
//!
//! let square = logger.apply(CallableMeta::function("square", "app"), |x: u32| x * x).unwrap();
//! assert_eq!(square.call(4).unwrap(), 16);
//! assert_eq!(
//!     logger.hook().generate_logs(),
//!     "[square] - 1 calls - runtime : 0h 0m 00.0000s\n"
//! );
//! ```

mod render;

use crate::config::{LogFormat, LoggerConfig, UtilityKind};
use crate::decorator::{Call, Decorator, Intercept};
use crate::error::{DecoError, Result};
use crate::measurement::{data_name_of, instantiate, Field, MeasurementUtility};
use crate::providers::Providers;
use chrono::NaiveDateTime;
use indexmap::IndexMap;
use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

/// Decorator whose hook is an aggregating logger
pub type AggregatingLogger = Decorator<FunctionLogger>;

/// One completed call
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    sequence: u64,
    timestamp: NaiveDateTime,
    identity: String,
    fields: Vec<Field>,
}

impl Record {
    /// Global arrival position across all identities of the logger
    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    pub fn timestamp(&self) -> NaiveDateTime {
        self.timestamp
    }

    pub fn identity(&self) -> &str {
        &self.identity
    }

    /// Readings in connection order
    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|field| field.name == name)
    }
}

/// Lifecycle of a logger's store
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoggerState {
    /// No call recorded since construction or the last reset
    Idle,
    Accumulating,
}

#[derive(Debug, Default)]
struct RecordStore {
    groups: IndexMap<String, Vec<Record>>,
    next_sequence: u64,
}

impl RecordStore {
    fn push(&mut self, identity: &str, timestamp: NaiveDateTime, fields: Vec<Field>) {
        let record = Record {
            sequence: self.next_sequence,
            timestamp,
            identity: identity.to_string(),
            fields,
        };
        self.next_sequence += 1;
        self.groups
            .entry(identity.to_string())
            .or_default()
            .push(record);
    }
}

/// Hook collecting measured records keyed by identity
pub struct FunctionLogger {
    providers: Providers,
    utils: RefCell<IndexMap<&'static str, Rc<dyn MeasurementUtility>>>,
    custom: RefCell<Vec<&'static str>>,
    log_format: Cell<LogFormat>,
    store: RefCell<RecordStore>,
}

impl FunctionLogger {
    pub fn new(providers: Providers, log_format: LogFormat) -> Self {
        Self {
            providers,
            utils: RefCell::new(IndexMap::new()),
            custom: RefCell::new(Vec::new()),
            log_format: Cell::new(log_format),
            store: RefCell::new(RecordStore::default()),
        }
    }

    /// Build a logger decorator from its configuration
    pub fn decorator(config: LoggerConfig, providers: Providers) -> AggregatingLogger {
        let logger = Self::new(providers, config.log_format);
        logger.connect_logger_utils(config.logger_utils.iter().copied());
        Decorator::with_hook(config.decorator, logger)
    }

    /// Connect built-in utilities; already connected kinds are left alone
    pub fn connect_logger_utils(&self, kinds: impl IntoIterator<Item = UtilityKind>) {
        let mut utils = self.utils.borrow_mut();
        for kind in kinds {
            let name = data_name_of(kind);
            if utils.contains_key(name) {
                continue;
            }
            tracing::debug!(utility = name, "logger utility connected");
            utils.insert(name, instantiate(kind, &self.providers));
        }
    }

    /// Connect a utility type outside the built-in collection
    pub fn connect_custom<U>(&self)
    where
        U: MeasurementUtility + Default + 'static,
    {
        let utility = U::default();
        let name = utility.data_name();
        let mut utils = self.utils.borrow_mut();
        if utils.contains_key(name) {
            return;
        }
        tracing::debug!(utility = name, "custom logger utility connected");
        utils.insert(name, Rc::new(utility));
        self.custom.borrow_mut().push(name);
    }

    /// Connect every built-in utility
    ///
    /// The logger cannot discover utility types it does not know, so this
    /// refuses to run once a custom utility is connected.
    pub fn autoconnect_logger_utils(&self) -> Result<()> {
        if let Some(name) = self.custom.borrow().first() {
            return Err(DecoError::CustomUtilityConnected(name.to_string()));
        }
        self.connect_logger_utils(UtilityKind::BUILTIN);
        Ok(())
    }

    pub fn disconnect_all(&self) {
        self.utils.borrow_mut().clear();
        self.custom.borrow_mut().clear();
    }

    /// Data names of connected utilities in connection order
    pub fn connected_utils(&self) -> Vec<&'static str> {
        self.utils.borrow().keys().copied().collect()
    }

    pub fn log_format(&self) -> LogFormat {
        self.log_format.get()
    }

    pub fn set_log_format(&self, log_format: LogFormat) {
        self.log_format.set(log_format);
    }

    /// Set the log format from its name (`datetime`, `function`, `cumulative`)
    pub fn set_log_format_str(&self, log_format: &str) -> Result<()> {
        self.set_log_format(log_format.parse()?);
        Ok(())
    }

    pub fn state(&self) -> LoggerState {
        if self.store.borrow().groups.is_empty() {
            LoggerState::Idle
        } else {
            LoggerState::Accumulating
        }
    }

    /// Drop every record and return to `Idle`
    pub fn reset(&self) {
        tracing::debug!("logger records cleared");
        *self.store.borrow_mut() = RecordStore::default();
    }

    pub fn total_calls(&self) -> usize {
        self.store.borrow().groups.values().map(Vec::len).sum()
    }

    /// Identities in first-seen order
    pub fn identities(&self) -> Vec<String> {
        self.store.borrow().groups.keys().cloned().collect()
    }

    /// Every record in arrival order
    pub fn records(&self) -> Vec<Record> {
        let store = self.store.borrow();
        let mut records: Vec<Record> = store.groups.values().flatten().cloned().collect();
        records.sort_by_key(|record| record.sequence);
        records
    }

    /// Records of one identity in arrival order
    pub fn records_for(&self, identity: &str) -> Vec<Record> {
        self.store
            .borrow()
            .groups
            .get(identity)
            .cloned()
            .unwrap_or_default()
    }

    /// Render the stored records in `format`
    pub fn render(&self, format: LogFormat) -> String {
        let store = self.store.borrow();
        match format {
            LogFormat::Datetime => render::datetime(&store.groups),
            LogFormat::Function => render::function(&store.groups),
            LogFormat::Cumulative => render::cumulative(&store.groups),
        }
    }

    /// Render the stored records in the configured format
    pub fn generate_logs(&self) -> String {
        self.render(self.log_format())
    }
}

impl Intercept for FunctionLogger {
    fn intercept(&self, call: Call<'_>) -> Result<()> {
        let identity = call.identity();
        let timestamp = self.providers.clock.timestamp();

        // Snapshot so the target may connect utilities or re-enter the logger
        let utils: Vec<Rc<dyn MeasurementUtility>> = self.utils.borrow().values().cloned().collect();

        let mut observations = Vec::with_capacity(utils.len());
        for utility in &utils {
            observations.push(utility.begin()?);
        }

        call.proceed();

        let mut fields = Vec::with_capacity(utils.len());
        for (utility, before) in utils.iter().zip(observations) {
            fields.push(Field::new(utility.data_name(), utility.finish(before)?));
        }

        self.store.borrow_mut().push(identity, timestamp, fields);
        Ok(())
    }
}

impl fmt::Display for FunctionLogger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.generate_logs())
    }
}

impl fmt::Debug for FunctionLogger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FunctionLogger")
            .field("utils", &self.connected_utils())
            .field("log_format", &self.log_format())
            .field("records", &self.total_calls())
            .finish()
    }
}

//! Decotrace - composable call decorators with per-call telemetry
//!
//! This library wraps callables in decorators that keep their calling
//! convention while adding behavior around every call: timing, memory deltas,
//! call counting, and aggregated logging grouped by a configurable identity.
//!
//! - [`decorator`]: the decorator core and the [`Intercept`] hook trait
//! - [`name_format`]: identity templates (`{name}`, `{module}`, `{qualname}`)
//! - [`measurement`]: timer and memory utilities
//! - [`function_logger`]: the aggregating logger and its text layouts
//! - [`class_propagate`]: applying a decorator across a class's methods
//! - [`counter`], [`runtime_log`]: lightweight bookkeeping hooks
//!
//! Everything here is single-threaded: decorators share state through `Rc`
//! and are neither `Send` nor `Sync`.

pub mod class_propagate;
pub mod config;
pub mod counter;
pub mod decorator;
pub mod error;
pub mod function_logger;
pub mod measurement;
pub mod name_format;
pub mod providers;
pub mod runtime_log;

pub use class_propagate::{propagate, Class, ClassBuilder, Instance, MethodSelector};
pub use config::{DecoratorConfig, LogFormat, LoggerConfig, UtilityKind};
pub use counter::{Counter, CounterDecorator};
pub use decorator::{Call, Decorated, Decorator, Intercept, PassThrough};
pub use error::{DecoError, Result};
pub use function_logger::{AggregatingLogger, FunctionLogger, LoggerState, Record};
pub use measurement::{Field, MeasurementUtility, Memory, MemoryDecorator, Reading, Reporting, Timer, TimerDecorator};
pub use name_format::{CallableMeta, NameFormat};
pub use providers::{Clock, MemoryProbe, Providers};
pub use runtime_log::{LogCall, RuntimeLog, RuntimeLogDecorator};

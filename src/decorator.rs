//! Decorator core
//!
//! A [`Decorator`] owns one configuration (activation flag and identity
//! template) and one interception hook. Applying it to a callable yields a
//! [`Decorated`] value with the same calling convention. Each call through a
//! decorated callable:
//!
//! 1. passes straight through when the decorator is deactivated;
//! 2. otherwise resolves the identity from the current template;
//! 3. hands a [`Call`] to the hook, which runs the original callable exactly
//!    once via [`Call::proceed`];
//! 4. returns the original callable's result unchanged.
//!
//! Decorators are cheap handles: clones share configuration and hook state,
//! so `set_name_format` on one clone is observed by every callable any clone
//! has decorated.
//!
//! # Example
//! ```
//! use decotrace::{callable, Decorator, DecoratorConfig};
//!
//! fn add(pair: (i32, i32)) -> i32 {
//!     pair.0 + pair.1
//! }
//!
//! let decorator = Decorator::new(DecoratorConfig::default());
//! let add = decorator.apply(callable!(add), add).unwrap();
//! assert_eq!(add.call((2, 3)).unwrap(), 5);
//! ```

use crate::config::DecoratorConfig;
use crate::error::{DecoError, Result};
use crate::name_format::{CallableMeta, NameFormat};
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

/// One intercepted invocation handed to a hook
pub struct Call<'a> {
    identity: &'a str,
    meta: &'a CallableMeta,
    target: &'a mut dyn FnMut(),
}

impl<'a> Call<'a> {
    /// Resolved identity of the callable
    pub fn identity(&self) -> &'a str {
        self.identity
    }

    pub fn meta(&self) -> &'a CallableMeta {
        self.meta
    }

    /// Run the original callable
    ///
    /// Consumes the call, so the callable runs at most once per interception.
    /// Its return value is held by the decorator until the hook returns.
    pub fn proceed(self) {
        (self.target)()
    }
}

impl fmt::Debug for Call<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Call")
            .field("identity", &self.identity)
            .field("meta", &self.meta)
            .finish_non_exhaustive()
    }
}

/// Behavior wrapped around every activated call
pub trait Intercept {
    /// Intercept one call; implementations must call [`Call::proceed`] exactly once
    fn intercept(&self, call: Call<'_>) -> Result<()>;
}

/// Hook that only runs the target
#[derive(Debug, Default, Clone, Copy)]
pub struct PassThrough;

impl Intercept for PassThrough {
    fn intercept(&self, call: Call<'_>) -> Result<()> {
        call.proceed();
        Ok(())
    }
}

#[derive(Debug)]
struct Settings {
    activated: bool,
    name_format: NameFormat,
}

struct Shared<H> {
    settings: RefCell<Settings>,
    hook: H,
}

/// Shared decorator handle: configuration plus hook
pub struct Decorator<H = PassThrough> {
    shared: Rc<Shared<H>>,
}

impl<H> Clone for Decorator<H> {
    fn clone(&self) -> Self {
        Self {
            shared: Rc::clone(&self.shared),
        }
    }
}

impl<H: fmt::Debug> fmt::Debug for Decorator<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Decorator")
            .field("settings", &self.shared.settings.borrow())
            .field("hook", &self.shared.hook)
            .finish()
    }
}

impl Decorator<PassThrough> {
    /// A decorator that adds nothing around the call
    pub fn new(config: DecoratorConfig) -> Self {
        Self::with_hook(config, PassThrough)
    }
}

impl<H: Intercept> Decorator<H> {
    pub fn with_hook(config: DecoratorConfig, hook: H) -> Self {
        Self {
            shared: Rc::new(Shared {
                settings: RefCell::new(Settings {
                    activated: config.activated,
                    name_format: NameFormat::new(config.name_format),
                }),
                hook,
            }),
        }
    }

    pub fn hook(&self) -> &H {
        &self.shared.hook
    }

    pub fn is_activated(&self) -> bool {
        self.shared.settings.borrow().activated
    }

    pub fn is_deactivated(&self) -> bool {
        !self.is_activated()
    }

    pub fn set_activated(&self, activated: bool) {
        self.shared.settings.borrow_mut().activated = activated;
    }

    pub fn set_deactivated(&self, deactivated: bool) {
        self.set_activated(!deactivated);
    }

    pub fn name_format(&self) -> String {
        self.shared.settings.borrow().name_format.as_str().to_string()
    }

    /// Replace the identity template; unknown placeholders are kept verbatim
    pub fn set_name_format(&self, template: impl Into<String>) {
        let format = NameFormat::new(template);
        tracing::debug!(name_format = %format, "name format updated");
        self.shared.settings.borrow_mut().name_format = format;
    }

    /// Replace the identity template after strict validation
    pub fn try_set_name_format(&self, template: &str) -> Result<()> {
        let format = NameFormat::parse_strict(template)?;
        tracing::debug!(name_format = %format, "name format updated");
        self.shared.settings.borrow_mut().name_format = format;
        Ok(())
    }

    /// Identity `meta` resolves to under the current template
    pub fn resolve(&self, meta: &CallableMeta) -> String {
        self.shared.settings.borrow().name_format.resolve(meta)
    }

    /// Wrap a callable taking its arguments as one value (use a tuple for several)
    pub fn apply<F, A, R>(&self, meta: CallableMeta, func: F) -> Result<Decorated<F, H>>
    where
        F: Fn(A) -> R,
    {
        meta.validate()?;
        tracing::debug!(callable = meta.qualname(), "decorator applied");
        Ok(Decorated {
            decorator: self.clone(),
            meta,
            func,
        })
    }

    /// Run `target` through this decorator as the callable described by `meta`
    pub fn invoke<R>(&self, meta: &CallableMeta, target: impl FnOnce() -> R) -> Result<R> {
        let identity = {
            let settings = self.shared.settings.borrow();
            if !settings.activated {
                None
            } else {
                Some(settings.name_format.resolve(meta))
            }
        };

        let Some(identity) = identity else {
            return Ok(target());
        };

        tracing::trace!(identity = %identity, "intercepting call");

        let mut target = Some(target);
        let mut output = None;
        {
            let mut run = || {
                if let Some(target) = target.take() {
                    output = Some(target());
                }
            };
            self.shared.hook.intercept(Call {
                identity: &identity,
                meta,
                target: &mut run,
            })?;
        }

        match output {
            Some(output) => Ok(output),
            None => {
                tracing::warn!(identity = %identity, "hook did not invoke the wrapped callable");
                Err(DecoError::TargetNotInvoked { identity })
            }
        }
    }
}

/// A callable wrapped by a decorator
pub struct Decorated<F, H = PassThrough> {
    decorator: Decorator<H>,
    meta: CallableMeta,
    func: F,
}

impl<F, H: Intercept> Decorated<F, H> {
    pub fn call<A, R>(&self, args: A) -> Result<R>
    where
        F: Fn(A) -> R,
    {
        self.decorator.invoke(&self.meta, || (self.func)(args))
    }

    pub fn meta(&self) -> &CallableMeta {
        &self.meta
    }

    pub fn decorator(&self) -> &Decorator<H> {
        &self.decorator
    }

    /// Identity this callable currently resolves to
    pub fn identity(&self) -> String {
        self.decorator.resolve(&self.meta)
    }
}

impl<F, H> fmt::Debug for Decorated<F, H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Decorated")
            .field("meta", &self.meta)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[derive(Default)]
    struct Recorder {
        seen: RefCell<Vec<String>>,
    }

    impl Intercept for Recorder {
        fn intercept(&self, call: Call<'_>) -> Result<()> {
            self.seen.borrow_mut().push(call.identity().to_string());
            call.proceed();
            Ok(())
        }
    }

    struct Skipper;

    impl Intercept for Skipper {
        fn intercept(&self, _call: Call<'_>) -> Result<()> {
            Ok(())
        }
    }

    fn double(x: i32) -> i32 {
        x * 2
    }

    #[test]
    fn test_pass_through_returns_result() {
        let decorator = Decorator::new(DecoratorConfig::default());
        let wrapped = decorator.apply(crate::callable!(double), double).unwrap();
        assert_eq!(wrapped.call(21).unwrap(), 42);
    }

    #[test]
    fn test_hook_sees_identity() {
        let decorator = Decorator::with_hook(DecoratorConfig::default(), Recorder::default());
        let wrapped = decorator.apply(crate::callable!(double), double).unwrap();
        wrapped.call(1).unwrap();
        assert_eq!(*decorator.hook().seen.borrow(), vec!["double".to_string()]);
    }

    #[test]
    fn test_deactivated_skips_hook() {
        let decorator = Decorator::with_hook(DecoratorConfig::deactivated(), Recorder::default());
        let wrapped = decorator.apply(crate::callable!(double), double).unwrap();
        assert_eq!(wrapped.call(4).unwrap(), 8);
        assert!(decorator.hook().seen.borrow().is_empty());
        assert!(decorator.is_deactivated());
    }

    #[test]
    fn test_toggle_activation() {
        let decorator = Decorator::with_hook(DecoratorConfig::default(), Recorder::default());
        let wrapped = decorator.apply(crate::callable!(double), double).unwrap();
        wrapped.call(1).unwrap();
        decorator.set_activated(false);
        wrapped.call(1).unwrap();
        decorator.set_deactivated(false);
        wrapped.call(1).unwrap();
        assert_eq!(decorator.hook().seen.borrow().len(), 2);
    }

    #[test]
    fn test_set_name_format_affects_existing_wrappers() {
        let decorator = Decorator::with_hook(DecoratorConfig::default(), Recorder::default());
        let wrapped = decorator
            .apply(CallableMeta::method("Job", "run", "app"), |_: ()| ())
            .unwrap();
        wrapped.call(()).unwrap();
        decorator.clone().set_name_format("{module}.{qualname}");
        wrapped.call(()).unwrap();
        assert_eq!(
            *decorator.hook().seen.borrow(),
            vec!["run".to_string(), "app.Job.run".to_string()]
        );
    }

    #[test]
    fn test_try_set_name_format_rejects_unknown() {
        let decorator = Decorator::new(DecoratorConfig::default());
        assert!(decorator.try_set_name_format("{name}{line}").is_err());
        assert_eq!(decorator.name_format(), "{name}");
        decorator.try_set_name_format("{qualname}").unwrap();
        assert_eq!(decorator.name_format(), "{qualname}");
    }

    #[test]
    fn test_hook_must_proceed() {
        let decorator = Decorator::with_hook(DecoratorConfig::default(), Skipper);
        let calls = Cell::new(0);
        let wrapped = decorator
            .apply(CallableMeta::function("count", "app"), |_: ()| calls.set(calls.get() + 1))
            .unwrap();
        let err = wrapped.call(()).unwrap_err();
        assert_eq!(
            err,
            DecoError::TargetNotInvoked {
                identity: "count".to_string()
            }
        );
        assert_eq!(calls.get(), 0);
    }

    #[test]
    fn test_apply_rejects_invalid_target() {
        let decorator = Decorator::new(DecoratorConfig::default());
        let err = decorator
            .apply(CallableMeta::function("", "app"), |_: ()| ())
            .unwrap_err();
        assert!(matches!(err, DecoError::InvalidTarget { .. }));
    }

    #[test]
    fn test_callable_error_passes_through_untouched() {
        let decorator = Decorator::new(DecoratorConfig::default());
        let wrapped = decorator
            .apply(CallableMeta::function("parse", "app"), |s: &str| s.parse::<u8>())
            .unwrap();
        assert_eq!(wrapped.call("7").unwrap(), Ok(7));
        assert!(wrapped.call("x").unwrap().is_err());
    }
}

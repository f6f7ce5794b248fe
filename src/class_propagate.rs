//! Class propagation
//!
//! A class is described by a [`ClassBuilder`]: a name, a module and an
//! ordered member table mapping names to methods or plain attributes.
//! Propagation replaces selected method entries with decorated ones, once,
//! while the class is still being built. Instances can only be created from
//! the finished [`Class`], so every instance observes the decorated table.
//!
//! # Example
//! ```
//! use decotrace::{ClassBuilder, Decorator, DecoratorConfig, MethodSelector};
//!
//! struct Account {
//!     balance: i64,
//! }
//!
//! let decorator = Decorator::new(DecoratorConfig::default());
//! let class = ClassBuilder::new("Account", "bank")
//!     .method("deposit", |account: &mut Account, amount: i64| {
//!         account.balance += amount;
//!         account.balance
//!     })
//!     .method("balance", |account: &mut Account, _: i64| account.balance)
//!     .propagate(&decorator, &MethodSelector::only(["deposit"]))
//!     .unwrap()
//!     .build();
//!
//! let mut account = class.instantiate(Account { balance: 0 });
//! assert_eq!(account.call("deposit", 25).unwrap(), 25);
//! assert_eq!(account.call("balance", 0).unwrap(), 25);
//! ```

use crate::decorator::{Decorator, Intercept};
use crate::error::{DecoError, Result};
use crate::name_format::CallableMeta;
use indexmap::IndexMap;
use std::fmt;
use std::rc::Rc;

/// Method entry: receiver plus one argument value (use a tuple for several)
pub type Method<S, A, R> = Rc<dyn Fn(&mut S, A) -> Result<R>>;

/// Which methods a propagation wraps
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum MethodSelector {
    /// Every method defined directly on the class
    #[default]
    All,
    /// Exactly these methods
    Only(Vec<String>),
}

impl MethodSelector {
    pub fn only<I, N>(names: I) -> Self
    where
        I: IntoIterator<Item = N>,
        N: Into<String>,
    {
        MethodSelector::Only(names.into_iter().map(Into::into).collect())
    }
}

enum Member<S, A, R> {
    Method { func: Method<S, A, R>, inherited: bool },
    Attribute(String),
}

impl<S, A, R> Clone for Member<S, A, R> {
    fn clone(&self) -> Self {
        match self {
            Member::Method { func, inherited } => Member::Method {
                func: Rc::clone(func),
                inherited: *inherited,
            },
            Member::Attribute(value) => Member::Attribute(value.clone()),
        }
    }
}

/// Mutable class definition; the only place propagation can happen
pub struct ClassBuilder<S, A, R> {
    name: String,
    module: String,
    members: IndexMap<String, Member<S, A, R>>,
}

impl<S: 'static, A: 'static, R: 'static> ClassBuilder<S, A, R> {
    pub fn new(name: impl Into<String>, module: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            module: module.into(),
            members: IndexMap::new(),
        }
    }

    /// Start a class that inherits every member of `parent`
    pub fn subclass(parent: &Class<S, A, R>, name: impl Into<String>) -> Self {
        let members = parent
            .members
            .iter()
            .map(|(member_name, member)| {
                let member = match member {
                    Member::Method { func, .. } => Member::Method {
                        func: Rc::clone(func),
                        inherited: true,
                    },
                    Member::Attribute(value) => Member::Attribute(value.clone()),
                };
                (member_name.clone(), member)
            })
            .collect();

        Self {
            name: name.into(),
            module: parent.module.clone(),
            members,
        }
    }

    /// Define (or override) a method
    pub fn method<F>(mut self, name: impl Into<String>, func: F) -> Self
    where
        F: Fn(&mut S, A) -> R + 'static,
    {
        let func: Method<S, A, R> = Rc::new(move |this: &mut S, args: A| Ok(func(this, args)));
        self.members.insert(
            name.into(),
            Member::Method {
                func,
                inherited: false,
            },
        );
        self
    }

    /// Define a plain, non-callable attribute
    pub fn attribute(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.members
            .insert(name.into(), Member::Attribute(value.into()));
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Methods defined directly on this class, in definition order
    pub fn own_methods(&self) -> Vec<&str> {
        self.members
            .iter()
            .filter(|(_, member)| matches!(member, Member::Method { inherited: false, .. }))
            .map(|(name, _)| name.as_str())
            .collect()
    }

    /// Apply `decorator` to the selected methods
    pub fn propagate<H>(mut self, decorator: &Decorator<H>, selector: &MethodSelector) -> Result<Self>
    where
        H: Intercept + 'static,
    {
        propagate(decorator, &mut self, selector)?;
        Ok(self)
    }

    /// Apply `decorator` to one member
    pub fn decorate_member<H>(mut self, name: &str, decorator: &Decorator<H>) -> Result<Self>
    where
        H: Intercept + 'static,
    {
        let func = match self.members.get(name) {
            None => return Err(self.no_such_method(name)),
            Some(Member::Attribute(_)) => {
                return Err(DecoError::InvalidTarget {
                    target: format!("{}.{}", self.name, name),
                    reason: "attribute is not callable".to_string(),
                })
            }
            Some(Member::Method { func, .. }) => Rc::clone(func),
        };

        let meta = self.meta(name);
        meta.validate()?;
        let wrapped = wrap(decorator, meta, func);
        self.replace(name, wrapped);
        Ok(self)
    }

    /// Freeze the member table
    pub fn build(self) -> Class<S, A, R> {
        Class {
            name: self.name,
            module: self.module,
            members: Rc::new(self.members),
        }
    }

    fn meta(&self, method: &str) -> CallableMeta {
        CallableMeta::method(&self.name, method, self.module.clone())
    }

    fn no_such_method(&self, method: &str) -> DecoError {
        DecoError::NoSuchMethod {
            class: self.name.clone(),
            method: method.to_string(),
        }
    }

    fn replace(&mut self, name: &str, func: Method<S, A, R>) {
        if let Some(member) = self.members.get_mut(name) {
            *member = Member::Method {
                func,
                inherited: false,
            };
        }
    }
}

impl<S, A, R> fmt::Debug for ClassBuilder<S, A, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClassBuilder")
            .field("name", &self.name)
            .field("module", &self.module)
            .field("members", &self.members.keys().collect::<Vec<_>>())
            .finish()
    }
}

fn wrap<S, A, R, H>(decorator: &Decorator<H>, meta: CallableMeta, func: Method<S, A, R>) -> Method<S, A, R>
where
    S: 'static,
    A: 'static,
    R: 'static,
    H: Intercept + 'static,
{
    let decorator = decorator.clone();
    Rc::new(move |this: &mut S, args: A| decorator.invoke(&meta, || func(this, args))?)
}

/// Replace the selected method entries of `class` with decorated ones
///
/// Every selected name is checked before any entry is replaced, so a failing
/// propagation leaves the class untouched. Each method gets its own
/// application of `decorator`; all of them share its configuration.
pub fn propagate<S, A, R, H>(
    decorator: &Decorator<H>,
    class: &mut ClassBuilder<S, A, R>,
    selector: &MethodSelector,
) -> Result<()>
where
    S: 'static,
    A: 'static,
    R: 'static,
    H: Intercept + 'static,
{
    let names: Vec<String> = match selector {
        MethodSelector::All => class.own_methods().into_iter().map(str::to_string).collect(),
        MethodSelector::Only(names) => {
            let mut selected: Vec<String> = Vec::with_capacity(names.len());
            for name in names {
                match class.members.get(name.as_str()) {
                    Some(Member::Method { .. }) => {
                        if !selected.contains(name) {
                            selected.push(name.clone());
                        }
                    }
                    _ => return Err(class.no_such_method(name)),
                }
            }
            selected
        }
    };

    let mut replacements = Vec::with_capacity(names.len());
    for name in names {
        let meta = class.meta(&name);
        meta.validate()?;
        if let Some(Member::Method { func, .. }) = class.members.get(name.as_str()) {
            replacements.push((name, wrap(decorator, meta, Rc::clone(func))));
        }
    }

    tracing::debug!(
        class = %class.name,
        methods = replacements.len(),
        "decorator propagated"
    );

    for (name, func) in replacements {
        class.replace(&name, func);
    }
    Ok(())
}

/// Finished class; its member table can no longer change
pub struct Class<S, A, R> {
    name: String,
    module: String,
    members: Rc<IndexMap<String, Member<S, A, R>>>,
}

impl<S, A, R> Clone for Class<S, A, R> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            module: self.module.clone(),
            members: Rc::clone(&self.members),
        }
    }
}

impl<S, A, R> Class<S, A, R> {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn module(&self) -> &str {
        &self.module
    }

    pub fn has_method(&self, name: &str) -> bool {
        matches!(self.members.get(name), Some(Member::Method { .. }))
    }

    /// Value of a plain attribute
    pub fn attribute(&self, name: &str) -> Option<&str> {
        match self.members.get(name) {
            Some(Member::Attribute(value)) => Some(value),
            _ => None,
        }
    }

    pub fn instantiate(&self, state: S) -> Instance<S, A, R> {
        Instance {
            class: self.clone(),
            state,
        }
    }
}

impl<S, A, R> fmt::Debug for Class<S, A, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Class")
            .field("name", &self.name)
            .field("module", &self.module)
            .field("members", &self.members.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// An instance bound to a finished class
pub struct Instance<S, A, R> {
    class: Class<S, A, R>,
    state: S,
}

impl<S, A, R> Instance<S, A, R> {
    /// Call a method by name
    pub fn call(&mut self, method: &str, args: A) -> Result<R> {
        match self.class.members.get(method) {
            Some(Member::Method { func, .. }) => {
                let func = Rc::clone(func);
                func(&mut self.state, args)
            }
            _ => Err(DecoError::NoSuchMethod {
                class: self.class.name.clone(),
                method: method.to_string(),
            }),
        }
    }

    pub fn class(&self) -> &Class<S, A, R> {
        &self.class
    }

    pub fn state(&self) -> &S {
        &self.state
    }

    pub fn state_mut(&mut self) -> &mut S {
        &mut self.state
    }

    pub fn into_state(self) -> S {
        self.state
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DecoratorConfig;
    use crate::decorator::Call;
    use std::cell::RefCell;

    #[derive(Default)]
    struct Seen {
        identities: RefCell<Vec<String>>,
    }

    impl Intercept for Seen {
        fn intercept(&self, call: Call<'_>) -> Result<()> {
            self.identities.borrow_mut().push(call.identity().to_string());
            call.proceed();
            Ok(())
        }
    }

    fn counter_class() -> ClassBuilder<u32, u32, u32> {
        ClassBuilder::new("Counter", "app")
            .method("add", |n: &mut u32, by: u32| {
                *n += by;
                *n
            })
            .method("get", |n: &mut u32, _: u32| *n)
            .attribute("unit", "items")
    }

    #[test]
    fn test_propagate_all_wraps_own_methods() {
        let decorator = Decorator::with_hook(DecoratorConfig::default(), Seen::default());
        let class = counter_class()
            .propagate(&decorator, &MethodSelector::All)
            .unwrap()
            .build();

        let mut counter = class.instantiate(0);
        assert_eq!(counter.call("add", 3).unwrap(), 3);
        assert_eq!(counter.call("get", 0).unwrap(), 3);
        assert_eq!(
            *decorator.hook().identities.borrow(),
            vec!["add".to_string(), "get".to_string()]
        );
    }

    #[test]
    fn test_propagate_only_listed() {
        let decorator = Decorator::with_hook(DecoratorConfig::default(), Seen::default());
        let class = counter_class()
            .propagate(&decorator, &MethodSelector::only(["add"]))
            .unwrap()
            .build();

        let mut counter = class.instantiate(0);
        counter.call("add", 1).unwrap();
        counter.call("get", 0).unwrap();
        assert_eq!(*decorator.hook().identities.borrow(), vec!["add".to_string()]);
    }

    #[test]
    fn test_unknown_name_leaves_class_untouched() {
        let decorator = Decorator::with_hook(DecoratorConfig::default(), Seen::default());
        let mut builder = counter_class();
        let err = propagate(&decorator, &mut builder, &MethodSelector::only(["add", "reset"]))
            .unwrap_err();
        assert_eq!(
            err,
            DecoError::NoSuchMethod {
                class: "Counter".to_string(),
                method: "reset".to_string()
            }
        );

        let mut counter = builder.build().instantiate(0);
        counter.call("add", 1).unwrap();
        assert!(decorator.hook().identities.borrow().is_empty());
    }

    #[test]
    fn test_attribute_is_not_a_method() {
        let decorator = Decorator::new(DecoratorConfig::default());
        let err = counter_class()
            .propagate(&decorator, &MethodSelector::only(["unit"]))
            .unwrap_err();
        assert!(matches!(err, DecoError::NoSuchMethod { .. }));

        let err = counter_class().decorate_member("unit", &decorator).unwrap_err();
        assert!(matches!(err, DecoError::InvalidTarget { .. }));
    }

    #[test]
    fn test_qualname_includes_class() {
        let decorator = Decorator::with_hook(
            DecoratorConfig::default().with_name_format("{module}.{qualname}"),
            Seen::default(),
        );
        let class = counter_class()
            .decorate_member("get", &decorator)
            .unwrap()
            .build();
        class.instantiate(0).call("get", 0).unwrap();
        assert_eq!(*decorator.hook().identities.borrow(), vec!["app.Counter.get".to_string()]);
    }

    #[test]
    fn test_subclass_inherits_without_rewrapping() {
        let decorator = Decorator::with_hook(DecoratorConfig::default(), Seen::default());
        let base = counter_class()
            .propagate(&decorator, &MethodSelector::All)
            .unwrap()
            .build();

        let child = ClassBuilder::subclass(&base, "Child")
            .method("double", |n: &mut u32, _: u32| {
                *n *= 2;
                *n
            });
        assert_eq!(child.own_methods(), vec!["double"]);

        // Propagating over the child only wraps what the child defines
        let child = child.propagate(&decorator, &MethodSelector::All).unwrap().build();
        let mut instance = child.instantiate(2);
        instance.call("double", 0).unwrap();
        instance.call("get", 0).unwrap();
        assert_eq!(
            *decorator.hook().identities.borrow(),
            vec!["double".to_string(), "get".to_string()]
        );
        assert_eq!(child.attribute("unit"), Some("items"));
    }

    #[test]
    fn test_unknown_method_call() {
        let mut counter = counter_class().build().instantiate(0);
        assert!(matches!(
            counter.call("missing", 0),
            Err(DecoError::NoSuchMethod { .. })
        ));
        assert!(matches!(counter.call("unit", 0), Err(DecoError::NoSuchMethod { .. })));
        assert!(counter.class().has_method("add"));
        assert!(!counter.class().has_method("unit"));
    }
}

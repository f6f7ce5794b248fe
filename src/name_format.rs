//! Identity resolution for decorated callables
//!
//! A decorated callable is known under a logical identity computed from a
//! template such as `{module}.{qualname}` and the callable's static metadata.
//! Records produced by the loggers are grouped by this identity.
//!
//! Supported placeholders:
//! - `{name}`: bare function name
//! - `{module}`: module path the callable lives in
//! - `{qualname}`: name qualified by the enclosing class, if any
//!
//! `\{` and `\}` render as literal braces. Unknown placeholders are kept
//! verbatim by [`NameFormat::resolve`]; [`NameFormat::parse_strict`] rejects them.
//!
//! The default template is `{name}`, so two methods called `run` on two
//! different classes share the identity `run`. Use `{module}.{qualname}` to
//! keep them apart.

use crate::error::{DecoError, Result};
use regex::{Captures, Regex};
use std::fmt;
use std::sync::OnceLock;

/// Template used when none is configured
pub const DEFAULT_NAME_FORMAT: &str = "{name}";

/// Build [`CallableMeta`] for a function or `Type::method` path in the current module
///
/// # Example
/// ```
/// use decotrace::callable;
///
/// fn checksum() {}
/// let meta = callable!(checksum);
/// assert_eq!(meta.name(), "checksum");
/// assert_eq!(meta.qualname(), "checksum");
/// ```
#[macro_export]
macro_rules! callable {
    ($class:ident :: $method:ident) => {
        $crate::CallableMeta::method(stringify!($class), stringify!($method), module_path!())
    };
    ($func:ident) => {
        $crate::CallableMeta::function(stringify!($func), module_path!())
    };
}

/// Static metadata of a callable
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CallableMeta {
    name: String,
    module: String,
    qualname: String,
}

impl CallableMeta {
    /// Metadata with an explicit qualified name
    pub fn new(
        name: impl Into<String>,
        module: impl Into<String>,
        qualname: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            module: module.into(),
            qualname: qualname.into(),
        }
    }

    /// Metadata for a free function (qualname equals the bare name)
    pub fn function(name: impl Into<String>, module: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            qualname: name.clone(),
            name,
            module: module.into(),
        }
    }

    /// Metadata for a method `class.name`
    pub fn method(class: &str, name: impl Into<String>, module: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            qualname: format!("{}.{}", class, name),
            name,
            module: module.into(),
        }
    }

    /// Bare name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Defining module path
    pub fn module(&self) -> &str {
        &self.module
    }

    /// Name qualified by the enclosing class, if any
    pub fn qualname(&self) -> &str {
        &self.qualname
    }

    /// Check that the metadata describes something that can be called
    pub fn validate(&self) -> Result<()> {
        let invalid = |reason: &str| DecoError::InvalidTarget {
            target: self.qualname.clone(),
            reason: reason.to_string(),
        };

        if self.name.is_empty() {
            return Err(invalid("callable has no name"));
        }
        if self
            .name
            .chars()
            .any(|c| c.is_whitespace() || c == '{' || c == '}')
        {
            return Err(invalid("callable name contains whitespace or braces"));
        }
        Ok(())
    }

    fn field(&self, placeholder: Placeholder) -> &str {
        match placeholder {
            Placeholder::Name => &self.name,
            Placeholder::Module => &self.module,
            Placeholder::Qualname => &self.qualname,
        }
    }
}

/// Recognized template placeholders
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placeholder {
    Name,
    Module,
    Qualname,
}

impl Placeholder {
    pub const ALL: [Placeholder; 3] = [Placeholder::Name, Placeholder::Module, Placeholder::Qualname];

    pub fn from_key(key: &str) -> Option<Self> {
        match key {
            "name" => Some(Placeholder::Name),
            "module" => Some(Placeholder::Module),
            "qualname" => Some(Placeholder::Qualname),
            _ => None,
        }
    }

    pub fn key(self) -> &'static str {
        match self {
            Placeholder::Name => "name",
            Placeholder::Module => "module",
            Placeholder::Qualname => "qualname",
        }
    }
}

fn placeholder_regex() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    // Escaped brace, or a `{key}` group without nested braces
    PATTERN.get_or_init(|| {
        Regex::new(r"\\[{}]|\{([^{}\\]*)\}").expect("placeholder pattern is a valid regex")
    })
}

/// Identity template
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NameFormat {
    template: String,
}

impl NameFormat {
    /// Wrap a template without validation
    pub fn new(template: impl Into<String>) -> Self {
        Self {
            template: template.into(),
        }
    }

    /// Parse a template, rejecting unbalanced braces and unknown placeholders
    pub fn parse_strict(template: &str) -> Result<Self> {
        check_braces(template)?;

        for caps in placeholder_regex().captures_iter(template) {
            if let Some(key) = caps.get(1) {
                if Placeholder::from_key(key.as_str()).is_none() {
                    let known: Vec<_> = Placeholder::ALL.iter().map(|p| p.key()).collect();
                    return Err(DecoError::unknown_format(
                        template,
                        format!(
                            "unknown placeholder `{{{}}}`, expected one of {:?}",
                            key.as_str(),
                            known
                        ),
                    ));
                }
            }
        }

        Ok(Self::new(template))
    }

    pub fn as_str(&self) -> &str {
        &self.template
    }

    /// Expand the template against callable metadata
    pub fn resolve(&self, meta: &CallableMeta) -> String {
        placeholder_regex()
            .replace_all(&self.template, |caps: &Captures| match caps.get(1) {
                Some(key) => match Placeholder::from_key(key.as_str()) {
                    Some(placeholder) => meta.field(placeholder).to_string(),
                    None => caps[0].to_string(),
                },
                // `\{` or `\}`: drop the backslash
                None => caps[0][1..].to_string(),
            })
            .into_owned()
    }
}

impl Default for NameFormat {
    fn default() -> Self {
        Self::new(DEFAULT_NAME_FORMAT)
    }
}

impl fmt::Display for NameFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.template)
    }
}

fn check_braces(template: &str) -> Result<()> {
    let mut open = false;
    let mut chars = template.chars();

    while let Some(c) = chars.next() {
        match c {
            '\\' => {
                // Escaped brace is literal text
                chars.next();
            }
            '{' if open => {
                return Err(DecoError::unknown_format(template, "nested `{` in template"));
            }
            '{' => open = true,
            '}' if !open => {
                return Err(DecoError::unknown_format(template, "unmatched `}` in template"));
            }
            '}' => open = false,
            _ => {}
        }
    }

    if open {
        return Err(DecoError::unknown_format(template, "unclosed `{` in template"));
    }
    Ok(())
}

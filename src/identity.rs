use serde::Serialize;
use std::any::TypeId;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::thread::{self, ThreadId};

/// Identity of a type whose static surface can be mocked.
///
/// Equality and hashing use the `TypeId` only; the name is kept for
/// diagnostics.
#[derive(Clone, Copy, Debug)]
pub struct ClassId {
    type_id: TypeId,
    name: &'static str,
}

impl ClassId {
    pub fn of<T: 'static>() -> Self {
        Self {
            type_id: TypeId::of::<T>(),
            name: std::any::type_name::<T>(),
        }
    }

    /// Full type path, e.g. `my_crate::fs::Files`.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Last path segment of the type name, used when rendering calls.
    pub fn short_name(&self) -> &'static str {
        let base = self.name.split('<').next().unwrap_or(self.name);
        base.rsplit("::").next().unwrap_or(base)
    }
}

impl PartialEq for ClassId {
    fn eq(&self, other: &Self) -> bool {
        self.type_id == other.type_id
    }
}

impl Eq for ClassId {}

impl Hash for ClassId {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.type_id.hash(state);
    }
}

impl fmt::Display for ClassId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

/// Identity of the thread that owns a binding.
#[derive(Clone, Debug)]
pub struct ThreadIdentity {
    id: ThreadId,
    name: Option<String>,
}

impl ThreadIdentity {
    pub fn current() -> Self {
        let current = thread::current();
        Self {
            id: current.id(),
            name: current.name().map(str::to_string),
        }
    }

    pub fn id(&self) -> ThreadId {
        self.id
    }
}

impl PartialEq for ThreadIdentity {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for ThreadIdentity {}

impl Hash for ThreadIdentity {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Display for ThreadIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.name {
            Some(name) => write!(f, "'{}' ({:?})", name, self.id),
            None => write!(f, "{:?}", self.id),
        }
    }
}

/// Method name plus ordered parameter type names.
#[derive(Clone, Debug, Eq, Hash, PartialEq, Serialize)]
pub struct CallSignature {
    pub method: String,
    pub parameters: Vec<String>,
}

impl CallSignature {
    pub fn new<I, S>(method: &str, parameters: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            method: method.to_string(),
            parameters: parameters.into_iter().map(Into::into).collect(),
        }
    }

    /// Signature from borrowed parts, as produced by `static_call!`.
    pub fn from_static(method: &str, parameters: &[&str]) -> Self {
        Self::new(method, parameters.iter().copied())
    }

    pub fn arity(&self) -> usize {
        self.parameters.len()
    }
}

impl fmt::Display for CallSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.method, self.parameters.join(", "))
    }
}

//! Traits and structs supporting the resolution of components
//!
//! * The [Provide] trait indicates that a struct can produce an instance of a bound component,
//!   either by handing out a fixed instance or by constructing a new one.
//! * The [Resolvable] trait describes the shapes that can be requested from a [Context]:
//!   the component itself (```Arc<T>```), a [Deferred] handle, or an unsupported container.
//! * A [Resolution] is the state of one lookup: it tracks the components being provided
//!   on the current thread and rejects re-entrant requests.

use std::any::{type_name, Any};
use std::cell::RefCell;
use std::collections::HashSet;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use thiserror::Error;
use tracing::trace;

use crate::config::Context;
use crate::key::{ComponentType, Dependency, Key, Qualifier, Ref};

/// Type-erased instance produced by a provider
pub type Value = Box<dyn Any + Send + Sync>;

pub type Result<T> = std::result::Result<T, WiringError>;

/// Produce instances of a bound component
///
/// The produced [Value] wraps an ```Arc<T>``` where ```T``` is the bound component type.
pub trait Provide: Send + Sync {
    fn get(&self, resolution: &mut Resolution<'_>) -> Result<Value>;

    /// Bindings needed by this provider, checked before the context is created
    fn dependencies(&self) -> Vec<Dependency> {
        Vec::new()
    }
}

/// Shared trait object implementing [Provide]
pub type Provider = Arc<dyn Provide>;

/// Reasons for rejecting an implementation type
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IllegalReason {
    Abstract,
    Interface,
    NoConstructor,
    MultipleInjectConstructors,
    ImmutableField(&'static str),
    GenericMethod(&'static str),
    NotQualifier(String),
}

impl fmt::Display for IllegalReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IllegalReason::Abstract => f.write_str("abstract types can not be instantiated"),
            IllegalReason::Interface => f.write_str("interfaces can not be instantiated"),
            IllegalReason::NoConstructor => {
                f.write_str("no inject constructor nor default constructor")
            }
            IllegalReason::MultipleInjectConstructors => {
                f.write_str("more than one inject constructor")
            }
            IllegalReason::ImmutableField(name) => write!(f, "inject field {name} is immutable"),
            IllegalReason::GenericMethod(name) => write!(f, "inject method {name} is generic"),
            IllegalReason::NotQualifier(marker) => write!(f, "{marker} is not a qualifier"),
        }
    }
}

/// Errors triggered during the wiring process
#[derive(Error, Debug)]
pub enum WiringError {
    #[error("Illegal component {component}: {reason}")]
    IllegalComponent {
        component: &'static str,
        reason: IllegalReason,
    },
    #[error("Dependency not found: {component} requires {dependency}")]
    DependencyNotFound { component: Key, dependency: Key },
    #[error("Cyclic dependencies: {}", display_keys(.components))]
    CyclicDependency { components: Vec<Key> },
    #[error("No binding for {component}")]
    Unbound { component: Key },
    #[error("Missing argument {position} for {component}")]
    MissingArgument {
        component: &'static str,
        position: usize,
    },
    #[error("Type mismatch for {component}: expected {expected}")]
    TypeMismatch {
        component: String,
        expected: &'static str,
    },
}

impl WiringError {
    pub(crate) fn illegal(component: &'static str, reason: IllegalReason) -> Self {
        WiringError::IllegalComponent { component, reason }
    }

    /// Distinct components involved in a cycle (empty for other errors)
    pub fn components(&self) -> HashSet<Key> {
        match self {
            WiringError::CyclicDependency { components } => components.iter().cloned().collect(),
            _ => HashSet::new(),
        }
    }

    pub fn is_multiple_inject_constructors(&self) -> bool {
        matches!(
            self,
            WiringError::IllegalComponent {
                reason: IllegalReason::MultipleInjectConstructors,
                ..
            }
        )
    }
}

fn display_keys(keys: &[Key]) -> String {
    keys.iter()
        .map(Key::to_string)
        .collect::<Vec<_>>()
        .join(" -> ")
}

thread_local! {
    /// Components being provided on this thread, across all lookups in progress
    static VISITING: RefCell<Vec<Key>> = const { RefCell::new(Vec::new()) };
}

/// Pops the visiting stack when a provider returns, also on error or panic
struct Visit;

impl Drop for Visit {
    fn drop(&mut self) {
        VISITING.with(|visiting| {
            visiting.borrow_mut().pop();
        });
    }
}

/// State of a lookup through a [Context].
///
/// Components being provided are tracked per thread, so nested lookups started while
/// constructing a component (through a [Deferred] handle) share the same stack.
/// Providers hold no state of their own and the context can be shared between threads.
pub struct Resolution<'c> {
    context: &'c Context,
}

impl<'c> Resolution<'c> {
    pub(crate) fn new(context: &'c Context) -> Self {
        Self { context }
    }

    pub fn context(&self) -> &'c Context {
        self.context
    }

    /// Component currently being provided on this thread
    pub fn current(&self) -> Option<Key> {
        VISITING.with(|visiting| visiting.borrow().last().cloned())
    }

    /// Call the provider bound to a key, or return None if the key is not bound.
    ///
    /// Requesting a component which is already being provided fails with a
    /// [WiringError::CyclicDependency] listing the components on the loop.
    pub fn provide(&mut self, key: &Key) -> Result<Option<Value>> {
        let context = self.context;
        let Some(provider) = context.provider(key) else {
            return Ok(None);
        };
        let depth = VISITING.with(|visiting| {
            let mut visiting = visiting.borrow_mut();
            if let Some(start) = visiting.iter().position(|k| k == key) {
                return Err(WiringError::CyclicDependency {
                    components: visiting[start..].to_vec(),
                });
            }
            visiting.push(key.clone());
            Ok(visiting.len())
        })?;

        let _visit = Visit;
        trace!(component = %key, depth, "providing");
        provider.get(self).map(Some)
    }
}

/// A shape which can be requested from a [Context] or declared as an injection point.
pub trait Resolvable: Sized + Send + Sync + 'static {
    /// Describe this shape for an optional qualifier
    fn reference(qualifier: Option<Qualifier>) -> Ref;

    /// Look up a value matching the reference.
    ///
    /// Returns None if the component is not bound or if the shape is not supported.
    fn resolve(reference: &Ref, resolution: &mut Resolution<'_>) -> Result<Option<Self>>;
}

impl<T: ?Sized + Send + Sync + 'static> Resolvable for Arc<T> {
    fn reference(qualifier: Option<Qualifier>) -> Ref {
        Ref::Direct(Key::new(ComponentType::of::<T>(), qualifier))
    }

    fn resolve(reference: &Ref, resolution: &mut Resolution<'_>) -> Result<Option<Self>> {
        let Ref::Direct(key) = reference else {
            return Ok(None);
        };
        let Some(value) = resolution.provide(key)? else {
            return Ok(None);
        };
        match value.downcast::<Arc<T>>() {
            Ok(instance) => Ok(Some(*instance)),
            Err(_) => Err(WiringError::TypeMismatch {
                component: key.to_string(),
                expected: type_name::<Arc<T>>(),
            }),
        }
    }
}

/// Multibinding is not supported: collections are never resolved
impl<T: ?Sized + Send + Sync + 'static> Resolvable for Vec<Arc<T>> {
    fn reference(_qualifier: Option<Qualifier>) -> Ref {
        Ref::Unsupported {
            container: type_name::<Self>(),
        }
    }

    fn resolve(_reference: &Ref, _resolution: &mut Resolution<'_>) -> Result<Option<Self>> {
        Ok(None)
    }
}

/// Handle on a bound component which is only constructed when requested.
///
/// Deferred dependencies are exempt from cycle detection when the context is created.
/// Calling [Deferred::get] while a component is being built on the same thread still
/// fails with [WiringError::CyclicDependency] if it leads back to that component.
pub struct Deferred<T: ?Sized> {
    key: Key,
    context: Context,
    _component: PhantomData<fn() -> Arc<T>>,
}

impl<T: ?Sized + Send + Sync + 'static> Deferred<T> {
    pub fn key(&self) -> &Key {
        &self.key
    }

    pub fn get(&self) -> Result<Arc<T>> {
        let mut resolution = Resolution::new(&self.context);
        Arc::<T>::resolve(&Ref::Direct(self.key.clone()), &mut resolution)?.ok_or_else(|| {
            WiringError::Unbound {
                component: self.key.clone(),
            }
        })
    }
}

impl<T: ?Sized> Clone for Deferred<T> {
    fn clone(&self) -> Self {
        Self {
            key: self.key.clone(),
            context: self.context.clone(),
            _component: PhantomData,
        }
    }
}

impl<T: ?Sized> fmt::Debug for Deferred<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Deferred").field(&self.key).finish()
    }
}

impl<T: ?Sized + Send + Sync + 'static> Resolvable for Deferred<T> {
    fn reference(qualifier: Option<Qualifier>) -> Ref {
        Ref::Deferred(Key::new(ComponentType::of::<T>(), qualifier))
    }

    fn resolve(reference: &Ref, resolution: &mut Resolution<'_>) -> Result<Option<Self>> {
        let Ref::Deferred(key) = reference else {
            return Ok(None);
        };
        let context = resolution.context();
        if !context.contains(key) {
            return Ok(None);
        }
        Ok(Some(Deferred {
            key: key.clone(),
            context: context.clone(),
            _component: PhantomData,
        }))
    }
}

/// Typed lookup reference for [Context::get]
pub struct ComponentRef<R> {
    reference: Ref,
    _shape: PhantomData<fn() -> R>,
}

impl<R: Resolvable> ComponentRef<R> {
    pub fn of() -> Self {
        Self {
            reference: R::reference(None),
            _shape: PhantomData,
        }
    }

    pub fn qualified(qualifier: Qualifier) -> Self {
        Self {
            reference: R::reference(Some(qualifier)),
            _shape: PhantomData,
        }
    }

    pub fn reference(&self) -> &Ref {
        &self.reference
    }
}

impl<R> fmt::Debug for ComponentRef<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ComponentRef").field(&self.reference).finish()
    }
}

/// Resolved arguments of a constructor or method, consumed in declaration order.
pub struct Args {
    component: &'static str,
    values: std::vec::IntoIter<Option<Value>>,
    position: usize,
}

impl Args {
    pub(crate) fn new(component: &'static str, values: Vec<Option<Value>>) -> Self {
        Self {
            component,
            values: values.into_iter(),
            position: 0,
        }
    }

    /// Take the next argument, which must have been resolved
    pub fn next<R: Resolvable>(&mut self) -> Result<R> {
        let position = self.position;
        self.next_optional()?
            .ok_or(WiringError::MissingArgument {
                component: self.component,
                position,
            })
    }

    /// Take the next argument, which is absent for unsupported shapes
    pub fn next_optional<R: Resolvable>(&mut self) -> Result<Option<R>> {
        let position = self.position;
        let Some(value) = self.values.next() else {
            return Err(WiringError::MissingArgument {
                component: self.component,
                position,
            });
        };
        self.position += 1;
        match value {
            None => Ok(None),
            Some(value) => value
                .downcast::<R>()
                .map(|v| Some(*v))
                .map_err(|_| WiringError::TypeMismatch {
                    component: format!("{} argument {}", self.component, position),
                    expected: type_name::<R>(),
                }),
        }
    }

    pub fn remaining(&self) -> usize {
        self.values.len()
    }
}

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use tracing::debug;

use crate::declare::ClassDecl;
use crate::helpers::{Implements, InstanceProvider};
use crate::inject::InjectionProvider;
use crate::key::{Key, Qualifier};
use crate::resolve::{
    ComponentRef, IllegalReason, Provider, Resolution, Resolvable, Result, WiringError,
};
use crate::validate::validate;

/// Registry of bindings, filled before creating a [Context].
///
/// Binding a key twice replaces the previous binding, keeping its position in the bind order.
#[derive(Default)]
pub struct ContextConfig {
    providers: HashMap<Key, Provider>,
    order: Vec<Key>,
}

impl ContextConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind a component type to a fixed instance
    pub fn bind_instance<T: ?Sized + Send + Sync + 'static>(&mut self, instance: Arc<T>) {
        self.bind_provider(Key::of::<T>(), InstanceProvider::build(instance));
    }

    /// Bind a fixed instance once for each qualifier
    pub fn bind_instance_qualified<T: ?Sized + Send + Sync + 'static>(
        &mut self,
        instance: Arc<T>,
        qualifiers: &[Qualifier],
    ) -> Result<()> {
        self.bind_qualified_provider::<T>(InstanceProvider::build(instance), qualifiers)
    }

    /// Bind a component type to an implementation type
    pub fn bind<T, I>(&mut self, implementation: ClassDecl<I>) -> Result<()>
    where
        T: ?Sized + Send + Sync + 'static,
        I: Implements<T> + 'static,
    {
        let provider = InjectionProvider::<T, I>::new(implementation)?;
        self.bind_provider(Key::of::<T>(), Arc::new(provider));
        Ok(())
    }

    /// Bind an implementation type once for each qualifier, sharing a single provider.
    ///
    /// Without any qualifier, the implementation is bound to the unqualified key.
    pub fn bind_qualified<T, I>(
        &mut self,
        implementation: ClassDecl<I>,
        qualifiers: &[Qualifier],
    ) -> Result<()>
    where
        T: ?Sized + Send + Sync + 'static,
        I: Implements<T> + 'static,
    {
        let provider = InjectionProvider::<T, I>::new(implementation)?;
        self.bind_qualified_provider::<T>(Arc::new(provider), qualifiers)
    }

    /// Bind a key to a custom provider.
    ///
    /// The provider must produce an ```Arc``` of the component type of the key.
    pub fn bind_provider(&mut self, key: Key, provider: Provider) {
        debug!(component = %key, "bind");
        if self.providers.insert(key.clone(), provider).is_none() {
            self.order.push(key);
        }
    }

    fn bind_qualified_provider<T: ?Sized + 'static>(
        &mut self,
        provider: Provider,
        qualifiers: &[Qualifier],
    ) -> Result<()> {
        check_qualifiers(std::any::type_name::<T>(), qualifiers)?;
        if qualifiers.is_empty() {
            self.bind_provider(Key::of::<T>(), provider);
            return Ok(());
        }
        for qualifier in qualifiers {
            self.bind_provider(Key::qualified::<T>(qualifier.clone()), provider.clone());
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.providers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }

    /// Check the bindings and create a context to look up components.
    ///
    /// Fails if a dependency is not bound or if direct dependencies form a cycle.
    /// Bindings are checked in bind order and the first problem found is reported.
    pub fn get_context(&self) -> Result<Context> {
        validate(&self.order, &self.providers)?;
        debug!(bindings = self.providers.len(), "context ready");
        Ok(Context {
            providers: Arc::new(self.providers.clone()),
        })
    }
}

fn check_qualifiers(component: &'static str, qualifiers: &[Qualifier]) -> Result<()> {
    match qualifiers.iter().find(|q| !q.is_qualifier()) {
        Some(q) => Err(WiringError::illegal(
            component,
            IllegalReason::NotQualifier(format!("{q:?}")),
        )),
        None => Ok(()),
    }
}

/// Read-only view on validated bindings.
///
/// Cloning a context is cheap, and contexts can be shared between threads.
#[derive(Clone)]
pub struct Context {
    providers: Arc<HashMap<Key, Provider>>,
}

impl Context {
    /// Look up a component.
    ///
    /// Returns None if the component is not bound, or if the requested shape is not supported.
    pub fn get<R: Resolvable>(&self, component: &ComponentRef<R>) -> Result<Option<R>> {
        let mut resolution = Resolution::new(self);
        R::resolve(component.reference(), &mut resolution)
    }

    pub fn contains(&self, key: &Key) -> bool {
        self.providers.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.providers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }

    pub(crate) fn provider(&self, key: &Key) -> Option<&Provider> {
        self.providers.get(key)
    }
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.providers.keys()).finish()
    }
}

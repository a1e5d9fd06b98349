use std::marker::PhantomData;
use std::sync::Arc;

use tracing::trace;

use crate::config::Context;
use crate::declare::{ClassDecl, Param};
use crate::helpers::Implements;
use crate::inspect::{inspect, MemberPlan};
use crate::key::{Dependency, Key};
use crate::resolve::{Args, Provide, Resolution, Result, Value, WiringError};

/// Construct instances of an implementation type ```I``` bound to the component type ```T```.
///
/// Construction resolves the constructor arguments, instantiates, then sets the inject
/// fields and calls the inject methods. A new instance is produced for every request.
pub struct InjectionProvider<T: ?Sized, I> {
    plan: MemberPlan<I>,
    _component: PhantomData<fn() -> Arc<T>>,
}

impl<T, I> InjectionProvider<T, I>
where
    T: ?Sized + Send + Sync + 'static,
    I: Implements<T> + 'static,
{
    pub fn new(implementation: ClassDecl<I>) -> Result<Self> {
        Ok(Self {
            plan: inspect(implementation)?,
            _component: PhantomData,
        })
    }

    pub fn plan(&self) -> &MemberPlan<I> {
        &self.plan
    }

    /// Build a new instance of the implementation type using the bindings of a context
    pub fn instantiate(&self, context: &Context) -> Result<I> {
        self.construct(&mut Resolution::new(context))
    }

    fn construct(&self, resolution: &mut Resolution<'_>) -> Result<I> {
        let plan = &self.plan;
        trace!(component = plan.component(), "constructing");

        let mut args = self.resolve_all(plan.constructor().params(), resolution)?;
        let mut instance = plan.constructor().build(&mut args)?;

        for field in plan.fields() {
            let value = self.resolve_param(field.param(), resolution)?;
            field.assign(&mut instance, value)?;
        }

        for method in plan.methods() {
            let mut args = self.resolve_all(method.params(), resolution)?;
            method.invoke(&mut instance, &mut args)?;
        }
        Ok(instance)
    }

    fn resolve_all(&self, params: &[Param], resolution: &mut Resolution<'_>) -> Result<Args> {
        let values = params
            .iter()
            .map(|param| self.resolve_param(param, resolution))
            .collect::<Result<Vec<_>>>()?;
        Ok(Args::new(self.plan.component(), values))
    }

    fn resolve_param(
        &self,
        param: &Param,
        resolution: &mut Resolution<'_>,
    ) -> Result<Option<Value>> {
        let value = param.resolve(resolution)?;
        // Unsupported shapes are absent without being an error
        match (param.reference().key(), value) {
            (Some(dependency), None) => Err(WiringError::DependencyNotFound {
                component: resolution.current().unwrap_or_else(Key::of::<T>),
                dependency: dependency.clone(),
            }),
            (_, value) => Ok(value),
        }
    }
}

impl<T, I> Provide for InjectionProvider<T, I>
where
    T: ?Sized + Send + Sync + 'static,
    I: Implements<T> + 'static,
{
    fn get(&self, resolution: &mut Resolution<'_>) -> Result<Value> {
        let instance = self.construct(resolution)?;
        Ok(Box::new(instance.into_component()))
    }

    fn dependencies(&self) -> Vec<Dependency> {
        self.plan.dependencies()
    }
}

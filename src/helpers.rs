use std::sync::Arc;

use crate::resolve::{Provide, Resolution, Result, Value};

/// Convert a concrete instance into the shared handle of a component type.
///
/// Every type implements its own component type. The [crate::implements] macro declares
/// that a concrete type implements trait object component types.
pub trait Implements<T: ?Sized> {
    fn into_component(self) -> Arc<T>;
}

impl<T: Send + Sync + 'static> Implements<T> for T {
    fn into_component(self) -> Arc<T> {
        Arc::new(self)
    }
}

/// Declare that a concrete type can be bound to one or more trait object component types.
///
/// ```
/// # use hanami_di::*;
/// trait Engine: Send + Sync {}
/// trait Machine: Send + Sync {}
///
/// struct V8;
/// impl Engine for V8 {}
/// impl Machine for V8 {}
///
/// implements!(V8 => dyn Engine, dyn Machine);
///
/// let engine = <V8 as Implements<dyn Engine>>::into_component(V8);
/// # let _ = engine;
/// ```
#[macro_export]
macro_rules! implements {
    ($Concrete:ty => $($Component:ty),+ $(,)?) => {
        $(
        impl $crate::Implements<$Component> for $Concrete {
            fn into_component(self) -> ::std::sync::Arc<$Component> {
                ::std::sync::Arc::new(self)
            }
        }
        )+
    };
}

/// Provider handing out a fixed instance
pub struct InstanceProvider<T: ?Sized>(Arc<T>);

impl<T: ?Sized + Send + Sync + 'static> InstanceProvider<T> {
    pub fn build(instance: Arc<T>) -> Arc<Self> {
        Arc::new(InstanceProvider(instance))
    }
}

impl<T: ?Sized + Send + Sync + 'static> Provide for InstanceProvider<T> {
    fn get(&self, _resolution: &mut Resolution<'_>) -> Result<Value> {
        Ok(Box::new(self.0.clone()))
    }
}

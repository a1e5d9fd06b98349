//! Dependency injection container with declarative injection points and ahead-of-time validation.
//!
//! # Simple use case
//!
//! ```
//! # use std::sync::Arc;
//! # use hanami_di::*;
//! // Define traits and implementors
//! trait Engine: Send + Sync {
//!     fn start(&self) -> String;
//! }
//!
//! struct V8;
//!
//! impl Engine for V8 {
//!     fn start(&self) -> String {
//!         "vroom".to_string()
//!     }
//! }
//!
//! struct Car {
//!     engine: Arc<dyn Engine>,
//! }
//!
//! implements!(V8 => dyn Engine);
//!
//! # fn main() -> Result<()> {
//! // Declare the implementation types and bind them
//! let mut config = ContextConfig::new();
//! config.bind::<dyn Engine, _>(ClassDecl::new().constructor(ConstructorDecl::no_args(|| V8)))?;
//! config.bind::<Car, _>(ClassDecl::new().constructor(ConstructorDecl::inject(
//!     vec![Param::of::<Arc<dyn Engine>>()],
//!     |args| Ok(Car { engine: args.next()? }),
//! )))?;
//!
//! // Validate the bindings and build components
//! let context = config.get_context()?;
//! let car = context.get(&ComponentRef::<Arc<Car>>::of())?.expect("Car is bound");
//! assert_eq!(car.engine.start(), "vroom");
//! # Ok(())
//! # }
//! ```
//!
//! # Mechanism
//!
//! Components are identified by a [Key]: the [std::any::TypeId] of a component type
//! (a struct or a trait object) and an optional [Qualifier]. Instances are shared as ```Arc<T>```.
//!
//! * A [ClassDecl] declares an implementation type: its constructors, fields and methods,
//!   each of them optionally marked as injectable, and the declaration of its base type.
//!   It is inspected once when bound, producing a [MemberPlan] (the inject constructor,
//!   the inject fields and the inject methods in the order in which they are called).
//! * The [Provide] trait produces instances for a binding. Fixed instances use an
//!   [InstanceProvider], implementation types use an [InjectionProvider].
//! * The [ContextConfig] collects the bindings. Creating the [Context] checks that all
//!   dependencies are bound and that direct dependencies do not form cycles.
//! * Injection points and lookups use a [Resolvable] shape: ```Arc<T>``` for the component,
//!   [Deferred] for a handle building the component on demand (which breaks cycles),
//!   while collections like ```Vec<Arc<T>>``` are not supported and are never resolved.

mod config;
mod declare;
mod helpers;
mod inject;
mod inspect;
mod key;
mod resolve;
mod validate;

pub use config::{Context, ContextConfig};
pub use declare::{ClassDecl, ConstructorDecl, FieldDecl, MethodDecl, Param, TypeKind};
pub use helpers::{Implements, InstanceProvider};
pub use inject::InjectionProvider;
pub use inspect::{inspect, MemberPlan};
pub use key::{Annotation, ComponentType, Dependency, Key, Named, Qualifier, Ref};
pub use resolve::{
    Args, ComponentRef, Deferred, IllegalReason, Provide, Provider, Resolution, Resolvable,
    Result, Value, WiringError,
};

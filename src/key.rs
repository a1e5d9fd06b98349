//! Identities used to bind and look up components.
//!
//! A [Key] combines the [ComponentType] of a contract (a concrete type or a trait object)
//! with an optional [Qualifier]. Injection points describe what they need with a [Ref],
//! decided once from the declared Rust type of the injection point.

use std::any::{type_name, Any, TypeId};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

/// Identity of a component contract.
///
/// Equality and hashing only consider the [TypeId], the name is kept for diagnostics.
#[derive(Clone, Copy)]
pub struct ComponentType {
    id: TypeId,
    name: &'static str,
}

impl ComponentType {
    pub fn of<T: ?Sized + 'static>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: type_name::<T>(),
        }
    }

    pub fn id(&self) -> TypeId {
        self.id
    }

    pub fn name(&self) -> &'static str {
        self.name
    }
}

impl PartialEq for ComponentType {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for ComponentType {}

impl Hash for ComponentType {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Debug for ComponentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

impl fmt::Display for ComponentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

/// Marker value attached to a binding or an injection point.
///
/// Only annotations reporting [Annotation::is_qualifier] can be used to qualify a binding.
pub trait Annotation: fmt::Debug + Eq + Hash + Send + Sync + 'static {
    fn is_qualifier(&self) -> bool {
        false
    }
}

/// Built-in qualifier carrying a name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Named(pub String);

impl Annotation for Named {
    fn is_qualifier(&self) -> bool {
        true
    }
}

/// Object-safe view of an [Annotation]
trait ErasedAnnotation: fmt::Debug + Send + Sync {
    fn as_any(&self) -> &dyn Any;
    fn erased_eq(&self, other: &dyn ErasedAnnotation) -> bool;
    fn erased_hash(&self, state: &mut dyn Hasher);
    fn erased_is_qualifier(&self) -> bool;
}

impl<A: Annotation> ErasedAnnotation for A {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn erased_eq(&self, other: &dyn ErasedAnnotation) -> bool {
        other.as_any().downcast_ref::<A>() == Some(self)
    }

    fn erased_hash(&self, mut state: &mut dyn Hasher) {
        TypeId::of::<A>().hash(&mut state);
        self.hash(&mut state);
    }

    fn erased_is_qualifier(&self) -> bool {
        self.is_qualifier()
    }
}

/// Type-erased annotation with value equality.
///
/// Two qualifiers are equal when they wrap the same annotation type with equal values.
#[derive(Clone)]
pub struct Qualifier(Arc<dyn ErasedAnnotation>);

impl Qualifier {
    pub fn new<A: Annotation>(annotation: A) -> Self {
        Self(Arc::new(annotation))
    }

    /// Shorthand for a [Named] qualifier
    pub fn named(name: impl Into<String>) -> Self {
        Self::new(Named(name.into()))
    }

    pub fn is_qualifier(&self) -> bool {
        self.0.erased_is_qualifier()
    }

    /// Access the wrapped annotation if it has the requested type
    pub fn annotation<A: Annotation>(&self) -> Option<&A> {
        self.0.as_any().downcast_ref()
    }
}

impl PartialEq for Qualifier {
    fn eq(&self, other: &Self) -> bool {
        self.0.erased_eq(&*other.0)
    }
}

impl Eq for Qualifier {}

impl Hash for Qualifier {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.erased_hash(state);
    }
}

impl fmt::Debug for Qualifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&*self.0, f)
    }
}

/// Identity of a binding: a component type and an optional qualifier.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Key {
    component: ComponentType,
    qualifier: Option<Qualifier>,
}

impl Key {
    pub fn new(component: ComponentType, qualifier: Option<Qualifier>) -> Self {
        Self {
            component,
            qualifier,
        }
    }

    /// Unqualified key of a component type
    pub fn of<T: ?Sized + 'static>() -> Self {
        Self::new(ComponentType::of::<T>(), None)
    }

    pub fn qualified<T: ?Sized + 'static>(qualifier: Qualifier) -> Self {
        Self::new(ComponentType::of::<T>(), Some(qualifier))
    }

    pub fn component(&self) -> ComponentType {
        self.component
    }

    pub fn qualifier(&self) -> Option<&Qualifier> {
        self.qualifier.as_ref()
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.qualifier {
            None => write!(f, "{}", self.component),
            Some(q) => write!(f, "{} @{:?}", self.component, q),
        }
    }
}

impl fmt::Debug for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

/// Shape of an injection point or a lookup.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Ref {
    /// The component itself
    Direct(Key),
    /// A handle building the component when invoked, see [crate::Deferred]
    Deferred(Key),
    /// A container kind the context does not support, always resolved as absent
    Unsupported { container: &'static str },
}

impl Ref {
    pub fn key(&self) -> Option<&Key> {
        match self {
            Ref::Direct(key) | Ref::Deferred(key) => Some(key),
            Ref::Unsupported { .. } => None,
        }
    }

    /// Dependency descriptor for the validator, if this shape needs a binding
    pub fn dependency(&self) -> Option<Dependency> {
        match self {
            Ref::Direct(key) => Some(Dependency {
                key: key.clone(),
                deferred: false,
            }),
            Ref::Deferred(key) => Some(Dependency {
                key: key.clone(),
                deferred: true,
            }),
            Ref::Unsupported { .. } => None,
        }
    }
}

/// One dependency of a provider.
///
/// Deferred dependencies must be bound but do not take part in cycle detection.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Dependency {
    pub key: Key,
    pub deferred: bool,
}

impl Dependency {
    pub fn direct(key: Key) -> Self {
        Self {
            key,
            deferred: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[derive(Debug, PartialEq, Eq, Hash)]
    struct Marker;
    impl Annotation for Marker {}

    #[derive(Debug, PartialEq, Eq, Hash)]
    struct Other(String);
    impl Annotation for Other {
        fn is_qualifier(&self) -> bool {
            true
        }
    }

    #[test]
    fn qualifiers_compare_by_value() {
        assert_eq!(Qualifier::named("a"), Qualifier::named("a"));
        assert_ne!(Qualifier::named("a"), Qualifier::named("b"));
        assert_ne!(Qualifier::named("a"), Qualifier::new(Other("a".into())));

        let keys: HashSet<Key> = [
            Key::qualified::<str>(Qualifier::named("a")),
            Key::qualified::<str>(Qualifier::named("a")),
            Key::of::<str>(),
        ]
        .into_iter()
        .collect();
        assert_eq!(keys.len(), 2);
    }

    #[test]
    fn only_marked_annotations_are_qualifiers() {
        assert!(Qualifier::named("a").is_qualifier());
        assert!(!Qualifier::new(Marker).is_qualifier());
        assert_eq!(
            Qualifier::named("x").annotation::<Named>(),
            Some(&Named("x".into()))
        );
    }

    #[test]
    fn unsupported_refs_have_no_dependency() {
        let direct = Ref::Direct(Key::of::<u8>());
        let deferred = Ref::Deferred(Key::of::<u8>());
        assert_eq!(direct.dependency(), Some(Dependency::direct(Key::of::<u8>())));
        assert!(deferred.dependency().is_some_and(|d| d.deferred));
        assert_eq!(Ref::Unsupported { container: "Vec" }.dependency(), None);
    }
}

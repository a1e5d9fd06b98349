//! Selection of the injection points of an implementation type.

use tracing::trace;

use crate::declare::{ClassDecl, ConstructorDecl, FieldDecl, MethodDecl, Param, TypeKind};
use crate::key::Dependency;
use crate::resolve::{IllegalReason, Result, WiringError};

/// Injection points of an implementation type, computed once when the type is bound.
///
/// Fields are listed from the most derived type to the base types.
/// Methods are listed in injection order: base types first.
pub struct MemberPlan<T> {
    component: &'static str,
    constructor: ConstructorDecl<T>,
    fields: Vec<FieldDecl<T>>,
    methods: Vec<MethodDecl<T>>,
}

impl<T: 'static> MemberPlan<T> {
    pub fn component(&self) -> &'static str {
        self.component
    }

    pub fn constructor(&self) -> &ConstructorDecl<T> {
        &self.constructor
    }

    pub fn fields(&self) -> &[FieldDecl<T>] {
        &self.fields
    }

    pub fn methods(&self) -> &[MethodDecl<T>] {
        &self.methods
    }

    fn params(&self) -> impl Iterator<Item = &Param> {
        self.constructor
            .params()
            .iter()
            .chain(self.fields.iter().map(FieldDecl::param))
            .chain(self.methods.iter().flat_map(|m| m.params()))
    }

    /// Constructor parameters, then fields, then method parameters
    pub fn dependencies(&self) -> Vec<Dependency> {
        self.params()
            .filter_map(|p| p.reference().dependency())
            .collect()
    }
}

/// Build the member plan of an implementation type.
pub fn inspect<T: 'static>(decl: ClassDecl<T>) -> Result<MemberPlan<T>> {
    let component = decl.name();
    match decl.type_kind() {
        TypeKind::Concrete => (),
        TypeKind::Abstract => return Err(WiringError::illegal(component, IllegalReason::Abstract)),
        TypeKind::Interface => {
            return Err(WiringError::illegal(component, IllegalReason::Interface))
        }
    }

    let (constructors, levels) = decl.into_parts();
    let constructor = select_constructor(component, constructors)?;

    // Non-injectable methods of the most derived type opt overridden methods out of injection
    let mut plain: Vec<MethodDecl<()>> = Vec::new();
    let mut fields = Vec::new();
    let mut methods: Vec<MethodDecl<T>> = Vec::new();
    for (depth, level) in levels.into_iter().enumerate() {
        let (marked, unmarked): (Vec<_>, Vec<_>) =
            level.methods.into_iter().partition(MethodDecl::is_injectable);
        if depth == 0 {
            plain = unmarked.into_iter().map(signature_of).collect();
        }

        for field in level.fields.into_iter().filter(FieldDecl::is_injectable) {
            if field.is_immutable() {
                return Err(WiringError::illegal(
                    component,
                    IllegalReason::ImmutableField(field.name()),
                ));
            }
            fields.push(field);
        }

        for method in marked {
            if methods.iter().any(|m| m.overrides(&method)) {
                trace!(
                    component,
                    declared_by = level.name,
                    method = method.name(),
                    "overridden inject method"
                );
                continue;
            }
            if plain.iter().any(|m| m.overrides(&method)) {
                trace!(
                    component,
                    declared_by = level.name,
                    method = method.name(),
                    "inject method opted out"
                );
                continue;
            }
            if method.is_generic() {
                return Err(WiringError::illegal(
                    component,
                    IllegalReason::GenericMethod(method.name()),
                ));
            }
            methods.push(method);
        }
    }
    methods.reverse();

    let plan = MemberPlan {
        component,
        constructor,
        fields,
        methods,
    };
    if let Some(q) = plan
        .params()
        .filter_map(Param::qualifier)
        .find(|q| !q.is_qualifier())
    {
        return Err(WiringError::illegal(
            component,
            IllegalReason::NotQualifier(format!("{q:?}")),
        ));
    }
    Ok(plan)
}

fn select_constructor<T: 'static>(
    component: &'static str,
    constructors: Vec<ConstructorDecl<T>>,
) -> Result<ConstructorDecl<T>> {
    let (mut marked, plain): (Vec<_>, Vec<_>) = constructors
        .into_iter()
        .partition(ConstructorDecl::is_injectable);
    if marked.len() > 1 {
        return Err(WiringError::illegal(
            component,
            IllegalReason::MultipleInjectConstructors,
        ));
    }
    marked
        .pop()
        .or_else(|| plain.into_iter().find(|c| c.params().is_empty()))
        .ok_or_else(|| WiringError::illegal(component, IllegalReason::NoConstructor))
}

/// Keep only the name and parameters of a method
fn signature_of<T: 'static>(method: MethodDecl<T>) -> MethodDecl<()> {
    MethodDecl::new(method.name(), method.params().to_vec(), |_, _| Ok(()))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::key::{Annotation, Key, Qualifier};
    use crate::resolve::Deferred;

    trait Repository: Send + Sync {}

    #[derive(Default)]
    struct Plain;

    fn plain() -> ClassDecl<Plain> {
        ClassDecl::new()
    }

    #[test]
    fn abstract_and_interface_types_are_rejected() {
        let decl = plain()
            .kind(TypeKind::Abstract)
            .constructor(ConstructorDecl::no_args(Plain::default).injectable());
        assert!(matches!(
            inspect(decl),
            Err(WiringError::IllegalComponent {
                reason: IllegalReason::Abstract,
                ..
            })
        ));

        let decl = plain().kind(TypeKind::Interface);
        assert!(matches!(
            inspect(decl),
            Err(WiringError::IllegalComponent {
                reason: IllegalReason::Interface,
                ..
            })
        ));
    }

    #[test]
    fn inject_constructor_is_preferred_over_default_constructor() {
        let decl = plain()
            .constructor(ConstructorDecl::no_args(Plain::default))
            .constructor(ConstructorDecl::inject(
                vec![Param::of::<Arc<dyn Repository>>()],
                |_| Ok(Plain),
            ));
        let plan = inspect(decl).expect("valid component");
        assert!(plan.constructor().is_injectable());
        assert_eq!(
            plan.dependencies(),
            vec![Dependency::direct(Key::of::<dyn Repository>())]
        );
    }

    #[test]
    fn default_constructor_is_used_without_inject_constructor() {
        let decl = plain()
            .constructor(ConstructorDecl::new(
                vec![Param::of::<Arc<String>>()],
                |_| Ok(Plain),
            ))
            .constructor(ConstructorDecl::no_args(Plain::default));
        let plan = inspect(decl).expect("valid component");
        assert!(plan.constructor().params().is_empty());
        assert!(plan.dependencies().is_empty());
    }

    #[test]
    fn multiple_inject_constructors_are_rejected() {
        let decl = plain()
            .constructor(ConstructorDecl::inject(
                vec![Param::of::<Arc<String>>(), Param::of::<Arc<f64>>()],
                |_| Ok(Plain),
            ))
            .constructor(ConstructorDecl::inject(
                vec![Param::of::<Arc<String>>()],
                |_| Ok(Plain),
            ));
        let err = inspect(decl).err().expect("two inject constructors");
        assert!(err.is_multiple_inject_constructors());
    }

    #[test]
    fn missing_constructor_is_rejected() {
        let decl = plain().constructor(ConstructorDecl::new(
            vec![Param::of::<Arc<String>>(), Param::of::<Arc<f64>>()],
            |_| Ok(Plain),
        ));
        assert!(matches!(
            inspect(decl),
            Err(WiringError::IllegalComponent {
                reason: IllegalReason::NoConstructor,
                ..
            })
        ));
    }

    #[derive(Default)]
    struct WithField {
        repository: Option<Arc<dyn Repository>>,
    }

    #[test]
    fn immutable_inject_field_is_rejected() {
        let decl = ClassDecl::new()
            .constructor(ConstructorDecl::no_args(WithField::default))
            .field(
                FieldDecl::inject("repository", |c: &mut WithField, v| c.repository = Some(v))
                    .immutable(),
            );
        assert!(matches!(
            inspect(decl),
            Err(WiringError::IllegalComponent {
                reason: IllegalReason::ImmutableField("repository"),
                ..
            })
        ));
    }

    #[test]
    fn generic_inject_method_is_rejected() {
        let decl = plain()
            .constructor(ConstructorDecl::no_args(Plain::default))
            .method(
                MethodDecl::inject("install", vec![], |_: &mut Plain, _| Ok(())).generic(&["T"]),
            );
        assert!(matches!(
            inspect(decl),
            Err(WiringError::IllegalComponent {
                reason: IllegalReason::GenericMethod("install"),
                ..
            })
        ));
    }

    #[test]
    fn non_injectable_members_are_ignored() {
        let decl = ClassDecl::new()
            .constructor(ConstructorDecl::no_args(WithField::default))
            .field(FieldDecl::new("repository", |c: &mut WithField, v| {
                c.repository = Some(v)
            }))
            .method(MethodDecl::new(
                "install",
                vec![Param::of::<Arc<String>>()],
                |_: &mut WithField, _| Ok(()),
            ));
        let plan = inspect(decl).expect("valid component");
        assert!(plan.fields().is_empty());
        assert!(plan.methods().is_empty());
    }

    #[derive(Debug, PartialEq, Eq, Hash)]
    struct Documented;
    impl Annotation for Documented {}

    #[test]
    fn qualified_injection_points_need_qualifier_markers() {
        let decl = plain().constructor(ConstructorDecl::inject(
            vec![Param::qualified::<Arc<String>>(Qualifier::new(Documented))],
            |_| Ok(Plain),
        ));
        assert!(matches!(
            inspect(decl),
            Err(WiringError::IllegalComponent {
                reason: IllegalReason::NotQualifier(_),
                ..
            })
        ));
    }

    #[test]
    fn dependencies_follow_constructor_fields_methods() {
        let named = Qualifier::named("ChosenOne");
        let decl = ClassDecl::new()
            .constructor(ConstructorDecl::inject(
                vec![Param::of::<Deferred<String>>()],
                |_| Ok(WithField::default()),
            ))
            .field(
                FieldDecl::inject("repository", |c: &mut WithField, v| c.repository = Some(v))
                    .qualified(named.clone()),
            )
            .method(MethodDecl::inject(
                "install",
                vec![Param::of::<Arc<u32>>(), Param::of::<Vec<Arc<u64>>>()],
                |_: &mut WithField, _| Ok(()),
            ));
        let plan = inspect(decl).expect("valid component");
        assert_eq!(
            plan.dependencies(),
            vec![
                Dependency {
                    key: Key::of::<String>(),
                    deferred: true
                },
                Dependency::direct(Key::qualified::<dyn Repository>(named)),
                Dependency::direct(Key::of::<u32>()),
            ]
        );
    }
}

//! Declarations of implementation types.
//!
//! A [ClassDecl] lists the constructors, fields and methods of an implementation type,
//! each of them optionally marked as injectable. The declaration is turned into a
//! [crate::MemberPlan] once, when the type is bound.
//!
//! Base types are embedded in the derived struct: [ClassDecl::extends] takes the declaration
//! of the base type and a projection from the derived value to the embedded base value.

use std::any::{type_name, TypeId};
use std::sync::Arc;

use crate::key::{Qualifier, Ref};
use crate::resolve::{Args, Resolution, Resolvable, Result, Value, WiringError};

type Build<T> = Arc<dyn Fn(&mut Args) -> Result<T> + Send + Sync>;
type Assign<T> = Arc<dyn Fn(&mut T, Option<Value>) -> Result<()> + Send + Sync>;
type Invoke<T> = Arc<dyn Fn(&mut T, &mut Args) -> Result<()> + Send + Sync>;

type Resolver = fn(&Ref, &mut Resolution<'_>) -> Result<Option<Value>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TypeKind {
    #[default]
    Concrete,
    Abstract,
    Interface,
}

/// Declared type of an injection point, with its optional qualifier
#[derive(Clone)]
pub struct Param {
    type_id: TypeId,
    type_name: &'static str,
    qualifier: Option<Qualifier>,
    reference: Ref,
    shape: fn(Option<Qualifier>) -> Ref,
    resolver: Resolver,
}

fn resolve_erased<R: Resolvable>(
    reference: &Ref,
    resolution: &mut Resolution<'_>,
) -> Result<Option<Value>> {
    Ok(R::resolve(reference, resolution)?.map(|value| Box::new(value) as Value))
}

impl Param {
    pub fn of<R: Resolvable>() -> Self {
        Self {
            type_id: TypeId::of::<R>(),
            type_name: type_name::<R>(),
            qualifier: None,
            reference: R::reference(None),
            shape: R::reference,
            resolver: resolve_erased::<R>,
        }
    }

    pub fn qualified<R: Resolvable>(qualifier: Qualifier) -> Self {
        Self::of::<R>().with_qualifier(qualifier)
    }

    pub fn with_qualifier(mut self, qualifier: Qualifier) -> Self {
        self.reference = (self.shape)(Some(qualifier.clone()));
        self.qualifier = Some(qualifier);
        self
    }

    pub fn reference(&self) -> &Ref {
        &self.reference
    }

    pub fn qualifier(&self) -> Option<&Qualifier> {
        self.qualifier.as_ref()
    }

    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    pub(crate) fn type_id(&self) -> TypeId {
        self.type_id
    }

    pub(crate) fn resolve(&self, resolution: &mut Resolution<'_>) -> Result<Option<Value>> {
        (self.resolver)(&self.reference, resolution)
    }
}

impl std::fmt::Debug for Param {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Param")
            .field("type", &self.type_name)
            .field("reference", &self.reference)
            .finish()
    }
}

pub struct ConstructorDecl<T> {
    injectable: bool,
    params: Vec<Param>,
    build: Build<T>,
}

impl<T: 'static> ConstructorDecl<T> {
    /// Declare a constructor which is not marked as injectable
    pub fn new(
        params: Vec<Param>,
        build: impl Fn(&mut Args) -> Result<T> + Send + Sync + 'static,
    ) -> Self {
        Self {
            injectable: false,
            params,
            build: Arc::new(build),
        }
    }

    /// Declare an inject constructor
    pub fn inject(
        params: Vec<Param>,
        build: impl Fn(&mut Args) -> Result<T> + Send + Sync + 'static,
    ) -> Self {
        Self::new(params, build).injectable()
    }

    /// Declare the default constructor
    pub fn no_args(build: impl Fn() -> T + Send + Sync + 'static) -> Self {
        Self::new(Vec::new(), move |_| Ok(build()))
    }

    pub fn injectable(mut self) -> Self {
        self.injectable = true;
        self
    }

    pub fn is_injectable(&self) -> bool {
        self.injectable
    }

    pub fn params(&self) -> &[Param] {
        &self.params
    }

    pub(crate) fn build(&self, args: &mut Args) -> Result<T> {
        (self.build)(args)
    }
}

pub struct FieldDecl<T> {
    name: &'static str,
    injectable: bool,
    immutable: bool,
    param: Param,
    assign: Assign<T>,
}

impl<T: 'static> FieldDecl<T> {
    /// Declare a field which is not marked as injectable.
    ///
    /// The setter is skipped when the value is absent (unsupported container shapes).
    pub fn new<R: Resolvable>(
        name: &'static str,
        set: impl Fn(&mut T, R) + Send + Sync + 'static,
    ) -> Self {
        let assign = move |target: &mut T, value: Option<Value>| -> Result<()> {
            let Some(value) = value else {
                return Ok(());
            };
            let value = value
                .downcast::<R>()
                .map_err(|_| WiringError::TypeMismatch {
                    component: format!("field {name}"),
                    expected: type_name::<R>(),
                })?;
            set(target, *value);
            Ok(())
        };
        Self {
            name,
            injectable: false,
            immutable: false,
            param: Param::of::<R>(),
            assign: Arc::new(assign),
        }
    }

    /// Declare an inject field
    pub fn inject<R: Resolvable>(
        name: &'static str,
        set: impl Fn(&mut T, R) + Send + Sync + 'static,
    ) -> Self {
        Self::new(name, set).injectable()
    }

    pub fn injectable(mut self) -> Self {
        self.injectable = true;
        self
    }

    pub fn qualified(mut self, qualifier: Qualifier) -> Self {
        self.param = self.param.with_qualifier(qualifier);
        self
    }

    /// Mark the field as set once at construction time
    pub fn immutable(mut self) -> Self {
        self.immutable = true;
        self
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn param(&self) -> &Param {
        &self.param
    }

    pub fn is_injectable(&self) -> bool {
        self.injectable
    }

    pub(crate) fn is_immutable(&self) -> bool {
        self.immutable
    }

    pub(crate) fn assign(&self, target: &mut T, value: Option<Value>) -> Result<()> {
        (self.assign)(target, value)
    }

    fn lift<D: 'static>(self, project: fn(&mut D) -> &mut T) -> FieldDecl<D> {
        let assign = self.assign;
        FieldDecl {
            name: self.name,
            injectable: self.injectable,
            immutable: self.immutable,
            param: self.param,
            assign: Arc::new(move |target: &mut D, value| assign(project(target), value)),
        }
    }
}

pub struct MethodDecl<T> {
    name: &'static str,
    injectable: bool,
    type_params: Vec<&'static str>,
    params: Vec<Param>,
    invoke: Invoke<T>,
}

impl<T: 'static> MethodDecl<T> {
    /// Declare a method which is not marked as injectable
    pub fn new(
        name: &'static str,
        params: Vec<Param>,
        invoke: impl Fn(&mut T, &mut Args) -> Result<()> + Send + Sync + 'static,
    ) -> Self {
        Self {
            name,
            injectable: false,
            type_params: Vec::new(),
            params,
            invoke: Arc::new(invoke),
        }
    }

    /// Declare an inject method
    pub fn inject(
        name: &'static str,
        params: Vec<Param>,
        invoke: impl Fn(&mut T, &mut Args) -> Result<()> + Send + Sync + 'static,
    ) -> Self {
        Self::new(name, params, invoke).injectable()
    }

    pub fn injectable(mut self) -> Self {
        self.injectable = true;
        self
    }

    /// Declare the type parameters of a generic method
    pub fn generic(mut self, type_params: &[&'static str]) -> Self {
        self.type_params = type_params.to_vec();
        self
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn params(&self) -> &[Param] {
        &self.params
    }

    pub fn is_injectable(&self) -> bool {
        self.injectable
    }

    pub(crate) fn is_generic(&self) -> bool {
        !self.type_params.is_empty()
    }

    /// Same name and same declared parameter types, qualifiers are ignored
    pub(crate) fn overrides<O>(&self, other: &MethodDecl<O>) -> bool {
        self.name == other.name
            && self.params.len() == other.params.len()
            && self
                .params
                .iter()
                .zip(&other.params)
                .all(|(a, b)| a.type_id() == b.type_id())
    }

    pub(crate) fn invoke(&self, target: &mut T, args: &mut Args) -> Result<()> {
        (self.invoke)(target, args)
    }

    fn lift<D: 'static>(self, project: fn(&mut D) -> &mut T) -> MethodDecl<D> {
        let invoke = self.invoke;
        MethodDecl {
            name: self.name,
            injectable: self.injectable,
            type_params: self.type_params,
            params: self.params,
            invoke: Arc::new(move |target: &mut D, args: &mut Args| invoke(project(target), args)),
        }
    }
}

/// Fields and methods declared by one type of a hierarchy
pub(crate) struct Level<T> {
    pub(crate) name: &'static str,
    pub(crate) fields: Vec<FieldDecl<T>>,
    pub(crate) methods: Vec<MethodDecl<T>>,
}

impl<T: 'static> Level<T> {
    fn new(name: &'static str) -> Self {
        Self {
            name,
            fields: Vec::new(),
            methods: Vec::new(),
        }
    }

    fn lift<D: 'static>(self, project: fn(&mut D) -> &mut T) -> Level<D> {
        Level {
            name: self.name,
            fields: self.fields.into_iter().map(|f| f.lift(project)).collect(),
            methods: self.methods.into_iter().map(|m| m.lift(project)).collect(),
        }
    }
}

/// Declaration of an implementation type
pub struct ClassDecl<T> {
    kind: TypeKind,
    constructors: Vec<ConstructorDecl<T>>,
    own: Level<T>,
    ancestors: Vec<Level<T>>,
}

impl<T: 'static> Default for ClassDecl<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: 'static> ClassDecl<T> {
    pub fn new() -> Self {
        Self::named(type_name::<T>())
    }

    pub fn named(name: &'static str) -> Self {
        Self {
            kind: TypeKind::Concrete,
            constructors: Vec::new(),
            own: Level::new(name),
            ancestors: Vec::new(),
        }
    }

    pub fn kind(mut self, kind: TypeKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn constructor(mut self, constructor: ConstructorDecl<T>) -> Self {
        self.constructors.push(constructor);
        self
    }

    pub fn field(mut self, field: FieldDecl<T>) -> Self {
        self.own.fields.push(field);
        self
    }

    pub fn method(mut self, method: MethodDecl<T>) -> Self {
        self.own.methods.push(method);
        self
    }

    /// Inherit the fields and methods of a base type embedded in this type.
    ///
    /// Constructors are not inherited. A previous base declaration is replaced.
    pub fn extends<B: 'static>(mut self, base: ClassDecl<B>, project: fn(&mut T) -> &mut B) -> Self {
        self.ancestors = std::iter::once(base.own)
            .chain(base.ancestors)
            .map(|level| level.lift(project))
            .collect();
        self
    }

    pub fn name(&self) -> &'static str {
        self.own.name
    }

    pub(crate) fn type_kind(&self) -> TypeKind {
        self.kind
    }

    /// Split the declaration into its constructors and its levels, most derived first
    pub(crate) fn into_parts(self) -> (Vec<ConstructorDecl<T>>, Vec<Level<T>>) {
        let levels = std::iter::once(self.own).chain(self.ancestors).collect();
        (self.constructors, levels)
    }
}

//! Class types and their identity rules.
//!
//! A [`ClassTypeDef`] can reach the same qualified name through several
//! encodings: a plain name, a reference to a definition being built, an
//! externally reflected element, or an annotated wrapper. Equality and
//! hashing only look at the resolved name, so these encodings are
//! interchangeable everywhere a type is used as a key.
//!
//! Parameterized types are the exception: `List<>` is never equal to `List`,
//! and two parameterized types are equal only when their raw names and
//! argument lists match exactly, in order.
//!
//! Nullability is a display/validation flag and never takes part in
//! identity.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use crate::{AnnotationDef, ModelError, QualifiedName, TypeDef, TypeElement, TypeHash};

// ============================================================================
// Types
// ============================================================================

/// Kind of a referenced type, used to pick dispatch forms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum TypeKind {
    #[default]
    Class,
    Interface,
    Enum,
    Record,
}

impl TypeKind {
    pub fn describe(self) -> &'static str {
        match self {
            TypeKind::Class => "a class",
            TypeKind::Interface => "an interface",
            TypeKind::Enum => "an enum",
            TypeKind::Record => "a record",
        }
    }
}

/// Identity shell shared between a definition and every reference to it.
///
/// Created by an object builder before its members are known, so bodies can
/// refer to the enclosing type while it is still being built.
#[derive(Debug, PartialEq, Eq)]
pub struct DefinitionRef {
    pub name: QualifiedName,
    pub kind: TypeKind,
}

/// The encoding used to reach a class type's name.
#[derive(Debug, Clone)]
pub enum ClassTypeRepr {
    /// Reference by qualified name.
    Named { name: QualifiedName, kind: TypeKind },
    /// Reference to a definition in the same tree.
    Definition(Arc<DefinitionRef>),
    /// Reflected element supplied by a descriptor provider.
    External(Arc<dyn TypeElement>),
    /// Type-use annotations around another class type.
    Annotated {
        inner: Box<ClassTypeDef>,
        annotations: Vec<AnnotationDef>,
    },
    /// Generic type applied to arguments.
    Parameterized {
        raw: Box<ClassTypeDef>,
        arguments: Vec<TypeDef>,
    },
}

/// A reference to a class, interface, enum or record type.
#[derive(Debug, Clone)]
pub struct ClassTypeDef {
    repr: ClassTypeRepr,
    nullable: bool,
}

// ============================================================================
// Construction
// ============================================================================

impl ClassTypeDef {
    /// Class type referenced by name.
    pub fn of(name: QualifiedName) -> Self {
        Self::of_kind(name, TypeKind::Class)
    }

    /// Interface type referenced by name.
    pub fn interface(name: QualifiedName) -> Self {
        Self::of_kind(name, TypeKind::Interface)
    }

    pub fn of_kind(name: QualifiedName, kind: TypeKind) -> Self {
        Self::from_repr(ClassTypeRepr::Named { name, kind })
    }

    /// Reference to a definition shell.
    pub fn of_definition(definition: Arc<DefinitionRef>) -> Self {
        Self::from_repr(ClassTypeRepr::Definition(definition))
    }

    /// Reference to a reflected element.
    pub fn of_element(element: Arc<dyn TypeElement>) -> Self {
        Self::from_repr(ClassTypeRepr::External(element))
    }

    /// Type in `java.lang`.
    pub fn java_lang(name: &str) -> Self {
        Self::of(QualifiedName::new("java.lang", name))
    }

    pub fn object() -> Self {
        Self::java_lang("Object")
    }

    pub fn string() -> Self {
        Self::java_lang("String")
    }

    pub fn number() -> Self {
        Self::java_lang("Number")
    }

    pub fn enum_base() -> Self {
        Self::java_lang("Enum")
    }

    pub fn record_base() -> Self {
        Self::java_lang("Record")
    }

    pub fn throwable() -> Self {
        Self::java_lang("Throwable")
    }

    pub fn auto_closeable() -> Self {
        Self::of_kind(
            QualifiedName::new("java.lang", "AutoCloseable"),
            TypeKind::Interface,
        )
    }

    pub fn objects() -> Self {
        Self::of(QualifiedName::new("java.util", "Objects"))
    }

    fn from_repr(repr: ClassTypeRepr) -> Self {
        Self {
            repr,
            nullable: false,
        }
    }

    /// Wrap with type-use annotations. Identity is unchanged.
    pub fn annotated(self, annotations: Vec<AnnotationDef>) -> Self {
        let nullable = self.nullable;
        Self {
            repr: ClassTypeRepr::Annotated {
                inner: Box::new(self),
                annotations,
            },
            nullable,
        }
    }

    /// Apply type arguments.
    ///
    /// The result is never equal to `self`, even for an empty argument
    /// list. Parameterizing an already parameterized type rebinds its
    /// arguments when the arity matches and fails otherwise.
    pub fn parameterize(self, arguments: Vec<TypeDef>) -> Result<Self, ModelError> {
        let nullable = self.nullable;
        let existing = self
            .parameterization()
            .map(|(raw, existing)| (raw.clone(), existing.len()));
        let raw = match existing {
            Some((raw, arity)) => {
                if arity != arguments.len() {
                    return Err(ModelError::ParameterizedArity {
                        name: raw.resolve().to_string(),
                        expected: arity,
                        found: arguments.len(),
                    });
                }
                raw
            }
            None => Self {
                repr: self.repr,
                nullable: false,
            },
        };
        Ok(Self {
            repr: ClassTypeRepr::Parameterized {
                raw: Box::new(raw),
                arguments,
            },
            nullable,
        })
    }

    /// Same type marked nullable.
    pub fn make_nullable(mut self) -> Self {
        self.nullable = true;
        self
    }

    /// Same type marked non-null.
    pub fn make_non_nullable(mut self) -> Self {
        self.nullable = false;
        self
    }
}

// ============================================================================
// Queries
// ============================================================================

impl ClassTypeDef {
    /// Resolved qualified name, independent of encoding.
    pub fn resolve(&self) -> QualifiedName {
        match &self.repr {
            ClassTypeRepr::Named { name, .. } => name.clone(),
            ClassTypeRepr::Definition(definition) => definition.name.clone(),
            ClassTypeRepr::External(element) => element.name(),
            ClassTypeRepr::Annotated { inner, .. } => inner.resolve(),
            ClassTypeRepr::Parameterized { raw, .. } => raw.resolve(),
        }
    }

    /// Internal (slash-separated) name of the resolved type.
    pub fn internal_name(&self) -> String {
        self.resolve().internal_name()
    }

    pub fn kind(&self) -> TypeKind {
        match &self.repr {
            ClassTypeRepr::Named { kind, .. } => *kind,
            ClassTypeRepr::Definition(definition) => definition.kind,
            ClassTypeRepr::External(element) => element.kind(),
            ClassTypeRepr::Annotated { inner, .. } => inner.kind(),
            ClassTypeRepr::Parameterized { raw, .. } => raw.kind(),
        }
    }

    pub fn is_interface(&self) -> bool {
        self.kind() == TypeKind::Interface
    }

    pub fn is_nullable(&self) -> bool {
        self.nullable
    }

    pub fn repr(&self) -> &ClassTypeRepr {
        &self.repr
    }

    /// Raw type and arguments, seeing through annotation wrappers.
    pub fn parameterization(&self) -> Option<(&ClassTypeDef, &[TypeDef])> {
        match &self.repr {
            ClassTypeRepr::Parameterized { raw, arguments } => Some((raw, arguments)),
            ClassTypeRepr::Annotated { inner, .. } => inner.parameterization(),
            _ => None,
        }
    }

    pub fn is_parameterized(&self) -> bool {
        self.parameterization().is_some()
    }

    /// Type arguments, empty when not parameterized.
    pub fn type_arguments(&self) -> &[TypeDef] {
        self.parameterization()
            .map(|(_, arguments)| arguments)
            .unwrap_or(&[])
    }

    /// Type-use annotations on the outermost wrappers.
    pub fn annotations(&self) -> Vec<&AnnotationDef> {
        match &self.repr {
            ClassTypeRepr::Annotated { inner, annotations } => {
                let mut all: Vec<&AnnotationDef> = annotations.iter().collect();
                all.extend(inner.annotations());
                all
            }
            _ => Vec::new(),
        }
    }

    /// Named reference without wrappers, arguments or nullability.
    pub fn erasure(&self) -> ClassTypeDef {
        Self::of_kind(self.resolve(), self.kind())
    }

    /// Whether this is `java.lang.Object`.
    pub fn is_object(&self) -> bool {
        let name = self.resolve();
        name.package == "java.lang" && name.name == "Object"
    }

    /// Identity hash consistent with `PartialEq`.
    pub fn identity_hash(&self) -> TypeHash {
        match self.parameterization() {
            Some((raw, arguments)) => {
                let arguments: Vec<TypeHash> = arguments.iter().map(TypeDef::type_hash).collect();
                TypeHash::from_parameterized(raw.identity_hash(), &arguments)
            }
            None => self.resolve().to_type_hash(),
        }
    }
}

// ============================================================================
// Identity
// ============================================================================

impl PartialEq for ClassTypeDef {
    fn eq(&self, other: &Self) -> bool {
        match (self.parameterization(), other.parameterization()) {
            (None, None) => self.resolve() == other.resolve(),
            (Some((raw_a, args_a)), Some((raw_b, args_b))) => raw_a == raw_b && args_a == args_b,
            _ => false,
        }
    }
}

impl Eq for ClassTypeDef {}

impl Hash for ClassTypeDef {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_u64(self.identity_hash().0);
    }
}

impl fmt::Display for ClassTypeDef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.parameterization() {
            Some((raw, arguments)) => {
                write!(f, "{}<", raw.resolve())?;
                for (i, argument) in arguments.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{argument}")?;
                }
                write!(f, ">")
            }
            None => write!(f, "{}", self.resolve()),
        }
    }
}

impl From<ClassTypeDef> for TypeDef {
    fn from(ty: ClassTypeDef) -> Self {
        TypeDef::Class(ty)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{DescribedType, PrimitiveKind};
    use rustc_hash::FxHashSet;
    use std::collections::hash_map::DefaultHasher;

    fn hash_of(ty: &ClassTypeDef) -> u64 {
        let mut hasher = DefaultHasher::new();
        ty.hash(&mut hasher);
        hasher.finish()
    }

    fn person() -> QualifiedName {
        QualifiedName::new("com.example", "Person")
    }

    fn encodings() -> Vec<ClassTypeDef> {
        let named = ClassTypeDef::of(person());
        let definition = ClassTypeDef::of_definition(Arc::new(DefinitionRef {
            name: person(),
            kind: TypeKind::Record,
        }));
        let external = ClassTypeDef::of_element(Arc::new(DescribedType::new(person())));
        let annotated = ClassTypeDef::of(person()).annotated(vec![AnnotationDef::marker(
            ClassTypeDef::of(QualifiedName::new("a", "NonNull")),
        )]);
        vec![named, definition, external, annotated]
    }

    #[test]
    fn encodings_agree_on_equality_and_hash() {
        let all = encodings();
        for a in &all {
            for b in &all {
                assert_eq!(a, b);
                assert_eq!(hash_of(a), hash_of(b));
            }
        }
    }

    #[test]
    fn nullability_never_changes_identity() {
        for ty in encodings() {
            let nullable = ty.clone().make_nullable();
            assert!(nullable.is_nullable());
            assert_eq!(ty, nullable);
            assert_eq!(hash_of(&ty), hash_of(&nullable));
        }
    }

    #[test]
    fn encodings_collapse_in_sets() {
        let set: FxHashSet<ClassTypeDef> = encodings().into_iter().collect();
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn parameterized_with_no_arguments_differs_from_raw() {
        let raw = ClassTypeDef::of(QualifiedName::new("java.util", "List"));
        let empty = raw.clone().parameterize(vec![]).unwrap();
        assert_ne!(raw, empty);
        assert_ne!(empty, raw);
        assert_ne!(hash_of(&raw), hash_of(&empty));
    }

    #[test]
    fn parameterized_compares_arguments_strictly() {
        let list = ClassTypeDef::of(QualifiedName::new("java.util", "List"));
        let a = list
            .clone()
            .parameterize(vec![TypeDef::Class(ClassTypeDef::string())])
            .unwrap();
        let same = list
            .clone()
            .parameterize(vec![TypeDef::Class(ClassTypeDef::string())])
            .unwrap();
        let other = list
            .clone()
            .parameterize(vec![TypeDef::Class(ClassTypeDef::object())])
            .unwrap();
        assert_eq!(a, same);
        assert_eq!(hash_of(&a), hash_of(&same));
        assert_ne!(a, other);
    }

    #[test]
    fn argument_order_matters() {
        let map = ClassTypeDef::of(QualifiedName::new("java.util", "Map"));
        let ab = map
            .clone()
            .parameterize(vec![TypeDef::INT, TypeDef::LONG])
            .unwrap();
        let ba = map.parameterize(vec![TypeDef::LONG, TypeDef::INT]).unwrap();
        assert_ne!(ab, ba);
    }

    #[test]
    fn reparameterize_requires_same_arity() {
        let list = ClassTypeDef::of(QualifiedName::new("java.util", "List"))
            .parameterize(vec![TypeDef::Class(ClassTypeDef::string())])
            .unwrap();
        let rebound = list
            .clone()
            .parameterize(vec![TypeDef::Class(ClassTypeDef::object())])
            .unwrap();
        assert_eq!(rebound.type_arguments().len(), 1);
        assert!(matches!(
            list.parameterize(vec![TypeDef::INT, TypeDef::INT]),
            Err(ModelError::ParameterizedArity {
                expected: 1,
                found: 2,
                ..
            })
        ));
    }

    #[test]
    fn annotated_parameterized_keeps_arguments() {
        let list = ClassTypeDef::of(QualifiedName::new("java.util", "List"))
            .parameterize(vec![TypeDef::Primitive(PrimitiveKind::Int)])
            .unwrap();
        let annotated = list
            .clone()
            .annotated(vec![AnnotationDef::marker(ClassTypeDef::object())]);
        assert_eq!(list, annotated);
        assert_eq!(annotated.annotations().len(), 1);
    }

    #[test]
    fn display_includes_arguments() {
        let list = ClassTypeDef::of(QualifiedName::new("java.util", "List"))
            .parameterize(vec![TypeDef::Class(ClassTypeDef::string())])
            .unwrap();
        assert_eq!(list.to_string(), "java.util.List<java.lang.String>");
    }
}

use std::fmt;

use crate::{ModelError, TypeHash};

/// Fully resolved name of a generatable type.
///
/// The package is dot-separated; nested types are joined to their outer
/// type with `$` inside `name`, matching the binary naming of the target
/// runtime.
///
/// # Examples
///
/// ```
/// use classgen_core::QualifiedName;
///
/// let outer = QualifiedName::new("com.example", "Outer");
/// assert_eq!(outer.to_string(), "com.example.Outer");
///
/// let inner = outer.nested("Inner");
/// assert_eq!(inner.internal_name(), "com/example/Outer$Inner");
/// assert_eq!(inner.outer(), Some(outer));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct QualifiedName {
    /// Package path (e.g., "java.lang"), empty for the default package
    pub package: String,
    /// Binary simple name (e.g., "Map$Entry")
    pub name: String,
}

impl QualifiedName {
    /// Create a qualified name from a package and a binary simple name.
    pub fn new(package: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            package: package.into(),
            name: name.into(),
        }
    }

    /// Parse a dotted binary name such as `java.util.Map$Entry`.
    ///
    /// The last dot separates the package from the name. Empty segments are
    /// rejected.
    pub fn parse(binary_name: &str) -> Result<Self, ModelError> {
        if binary_name.is_empty()
            || binary_name.split('.').any(str::is_empty)
            || binary_name.ends_with('$')
        {
            return Err(ModelError::InvalidName {
                name: binary_name.to_string(),
            });
        }
        Ok(match binary_name.rsplit_once('.') {
            Some((package, name)) => Self::new(package, name),
            None => Self::new("", binary_name),
        })
    }

    /// Name of a type nested directly inside this one.
    pub fn nested(&self, simple_name: impl AsRef<str>) -> Self {
        Self {
            package: self.package.clone(),
            name: format!("{}${}", self.name, simple_name.as_ref()),
        }
    }

    /// The enclosing type, if this name is nested.
    pub fn outer(&self) -> Option<Self> {
        self.name.rsplit_once('$').map(|(outer, _)| Self {
            package: self.package.clone(),
            name: outer.to_string(),
        })
    }

    /// Simple name without enclosing types (`Entry` for `Map$Entry`).
    pub fn simple_name(&self) -> &str {
        self.name.rsplit('$').next().unwrap_or(&self.name)
    }

    /// Whether this name lives in the default package.
    pub fn is_default_package(&self) -> bool {
        self.package.is_empty()
    }

    /// Slash-separated internal form used inside class files.
    pub fn internal_name(&self) -> String {
        if self.package.is_empty() {
            self.name.clone()
        } else {
            format!("{}/{}", self.package.replace('.', "/"), self.name)
        }
    }

    /// Relative output path of the artifact with the given extension.
    pub fn file_path(&self, extension: &str) -> String {
        format!("{}.{}", self.internal_name(), extension)
    }

    /// Identity hash of this name.
    pub fn to_type_hash(&self) -> TypeHash {
        TypeHash::from_name(&self.to_string())
    }
}

impl fmt::Display for QualifiedName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.package.is_empty() {
            write!(f, "{}", self.name)
        } else {
            write!(f, "{}.{}", self.package, self.name)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_with_package() {
        let name = QualifiedName::parse("java.lang.String").unwrap();
        assert_eq!(name.package, "java.lang");
        assert_eq!(name.name, "String");
        assert_eq!(name.internal_name(), "java/lang/String");
    }

    #[test]
    fn parse_default_package() {
        let name = QualifiedName::parse("Main").unwrap();
        assert!(name.is_default_package());
        assert_eq!(name.internal_name(), "Main");
        assert_eq!(name.to_string(), "Main");
    }

    #[test]
    fn parse_rejects_empty_segments() {
        assert!(QualifiedName::parse("").is_err());
        assert!(QualifiedName::parse("a..B").is_err());
        assert!(QualifiedName::parse("a.B.").is_err());
    }

    #[test]
    fn nested_and_outer() {
        let map = QualifiedName::new("java.util", "Map");
        let entry = map.nested("Entry");
        assert_eq!(entry.to_string(), "java.util.Map$Entry");
        assert_eq!(entry.simple_name(), "Entry");
        assert_eq!(entry.outer(), Some(map.clone()));
        assert_eq!(map.outer(), None);
    }

    #[test]
    fn file_path_uses_internal_name() {
        let name = QualifiedName::new("a.b", "C$D");
        assert_eq!(name.file_path("class"), "a/b/C$D.class");
    }

    #[test]
    fn type_hash_follows_name() {
        let a = QualifiedName::new("a", "B");
        let b = QualifiedName::parse("a.B").unwrap();
        assert_eq!(a.to_type_hash(), b.to_type_hash());
        assert_ne!(a.to_type_hash(), QualifiedName::new("a", "C").to_type_hash());
    }
}

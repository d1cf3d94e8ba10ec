use crate::QualifiedName;

/// Primitive value kinds of the target runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PrimitiveKind {
    Boolean,
    Byte,
    Short,
    Char,
    Int,
    Long,
    Float,
    Double,
}

impl PrimitiveKind {
    pub const ALL: [PrimitiveKind; 8] = [
        PrimitiveKind::Boolean,
        PrimitiveKind::Byte,
        PrimitiveKind::Short,
        PrimitiveKind::Char,
        PrimitiveKind::Int,
        PrimitiveKind::Long,
        PrimitiveKind::Float,
        PrimitiveKind::Double,
    ];

    /// Source keyword.
    pub fn name(self) -> &'static str {
        match self {
            PrimitiveKind::Boolean => "boolean",
            PrimitiveKind::Byte => "byte",
            PrimitiveKind::Short => "short",
            PrimitiveKind::Char => "char",
            PrimitiveKind::Int => "int",
            PrimitiveKind::Long => "long",
            PrimitiveKind::Float => "float",
            PrimitiveKind::Double => "double",
        }
    }

    /// Single-character descriptor.
    pub fn descriptor(self) -> char {
        match self {
            PrimitiveKind::Boolean => 'Z',
            PrimitiveKind::Byte => 'B',
            PrimitiveKind::Short => 'S',
            PrimitiveKind::Char => 'C',
            PrimitiveKind::Int => 'I',
            PrimitiveKind::Long => 'J',
            PrimitiveKind::Float => 'F',
            PrimitiveKind::Double => 'D',
        }
    }

    /// Wide kinds occupy two local slots and two operand-stack entries.
    pub fn is_wide(self) -> bool {
        matches!(self, PrimitiveKind::Long | PrimitiveKind::Double)
    }

    /// Kinds computed on the stack as `int`.
    pub fn is_int_like(self) -> bool {
        matches!(
            self,
            PrimitiveKind::Boolean
                | PrimitiveKind::Byte
                | PrimitiveKind::Short
                | PrimitiveKind::Char
                | PrimitiveKind::Int
        )
    }

    pub fn is_numeric(self) -> bool {
        self != PrimitiveKind::Boolean
    }

    /// Stack representation: sub-int kinds widen to `Int`.
    pub fn stack_kind(self) -> PrimitiveKind {
        if self.is_int_like() {
            PrimitiveKind::Int
        } else {
            self
        }
    }

    /// Binary numeric promotion of two operand kinds.
    pub fn promote(self, other: PrimitiveKind) -> PrimitiveKind {
        use PrimitiveKind::*;
        match (self.stack_kind(), other.stack_kind()) {
            (Double, _) | (_, Double) => Double,
            (Float, _) | (_, Float) => Float,
            (Long, _) | (_, Long) => Long,
            _ => Int,
        }
    }

    /// Boxed wrapper type.
    pub fn wrapper(self) -> QualifiedName {
        let name = match self {
            PrimitiveKind::Boolean => "Boolean",
            PrimitiveKind::Byte => "Byte",
            PrimitiveKind::Short => "Short",
            PrimitiveKind::Char => "Character",
            PrimitiveKind::Int => "Integer",
            PrimitiveKind::Long => "Long",
            PrimitiveKind::Float => "Float",
            PrimitiveKind::Double => "Double",
        };
        QualifiedName::new("java.lang", name)
    }

    /// Primitive kind boxed by the given wrapper name, if any.
    pub fn from_wrapper(name: &QualifiedName) -> Option<PrimitiveKind> {
        if name.package != "java.lang" {
            return None;
        }
        PrimitiveKind::ALL
            .into_iter()
            .find(|kind| kind.wrapper().name == name.name)
    }

    /// Accessor that unboxes a wrapper (`intValue`, `booleanValue`, ...).
    pub fn unbox_method(self) -> String {
        format!("{}Value", self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn promotion() {
        use PrimitiveKind::*;
        assert_eq!(Byte.promote(Short), Int);
        assert_eq!(Int.promote(Long), Long);
        assert_eq!(Long.promote(Float), Float);
        assert_eq!(Char.promote(Double), Double);
    }

    #[test]
    fn wrapper_round_trip() {
        for kind in PrimitiveKind::ALL {
            assert_eq!(PrimitiveKind::from_wrapper(&kind.wrapper()), Some(kind));
        }
        assert_eq!(
            PrimitiveKind::from_wrapper(&QualifiedName::new("java.lang", "String")),
            None
        );
    }

    #[test]
    fn wide_kinds() {
        assert!(PrimitiveKind::Long.is_wide());
        assert!(PrimitiveKind::Double.is_wide());
        assert!(!PrimitiveKind::Float.is_wide());
    }
}

use bitflags::bitflags;

bitflags! {
    /// Declaration modifiers shared by definitions, fields, methods and parameters.
    ///
    /// Not every modifier applies to every element; emitters translate the
    /// applicable subset into their own flag encoding.
    ///
    /// ```
    /// use classgen_core::Modifiers;
    ///
    /// let constant = Modifiers::PUBLIC | Modifiers::STATIC | Modifiers::FINAL;
    /// assert!(constant.is_static());
    /// assert_eq!(constant.visibility(), Modifiers::PUBLIC);
    /// ```
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct Modifiers: u16 {
        const PUBLIC = 1 << 0;
        const PROTECTED = 1 << 1;
        const PRIVATE = 1 << 2;
        const STATIC = 1 << 3;
        const FINAL = 1 << 4;
        const ABSTRACT = 1 << 5;
        const SYNCHRONIZED = 1 << 6;
        const TRANSIENT = 1 << 7;
        const VOLATILE = 1 << 8;
        /// Interface method with a body.
        const DEFAULT = 1 << 9;
        /// Compiler-generated member.
        const SYNTHETIC = 1 << 10;
    }
}

impl Modifiers {
    /// Whether `STATIC` is set.
    pub fn is_static(self) -> bool {
        self.contains(Modifiers::STATIC)
    }

    /// Whether `FINAL` is set.
    pub fn is_final(self) -> bool {
        self.contains(Modifiers::FINAL)
    }

    /// Whether `ABSTRACT` is set.
    pub fn is_abstract(self) -> bool {
        self.contains(Modifiers::ABSTRACT)
    }

    /// Whether `PRIVATE` is set.
    pub fn is_private(self) -> bool {
        self.contains(Modifiers::PRIVATE)
    }

    /// The visibility bits only (empty means package-private).
    pub fn visibility(self) -> Modifiers {
        self & (Modifiers::PUBLIC | Modifiers::PROTECTED | Modifiers::PRIVATE)
    }
}

//! Local variable slot allocation.
//!
//! [`LocalSlots`] tracks the locals of one method body:
//! - parameters (and the receiver) in the first slots
//! - nested block scopes with shadowing restored on exit
//! - slot reuse once a scope ends
//! - hidden temporaries for the emitter's own bookkeeping

use classgen_core::TypeDef;
use rustc_hash::FxHashMap;

use crate::EmitErrorKind;

// ============================================================================
// Types
// ============================================================================

/// A named local or parameter.
#[derive(Debug, Clone)]
pub struct LocalVar {
    pub name: String,
    pub ty: TypeDef,
    pub slot: u16,
    /// Scope depth where declared
    pub depth: u32,
}

/// Slot allocator for one method body.
#[derive(Debug, Default)]
pub struct LocalSlots {
    parameters: FxHashMap<String, LocalVar>,
    variables: FxHashMap<String, LocalVar>,
    /// Variables hidden by a declaration at the given depth.
    shadowed: Vec<(u32, String, LocalVar)>,
    /// `next_slot` at each scope entry.
    marks: Vec<u32>,
    depth: u32,
    next_slot: u32,
    max_slot: u32,
    temporaries: u32,
}

impl LocalSlots {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reserve slot 0 for the receiver.
    pub fn reserve_receiver(&mut self) -> Result<(), EmitErrorKind> {
        self.allocate(1).map(|_| ())
    }

    // ==========================================================================
    // Scope Management
    // ==========================================================================

    /// Enter a block.
    pub fn push_scope(&mut self) {
        self.depth += 1;
        self.marks.push(self.next_slot);
    }

    /// Exit a block; its slots become free for later declarations.
    pub fn pop_scope(&mut self) {
        let depth = self.depth;
        self.variables.retain(|_, var| var.depth < depth);

        while let Some((shadowing_depth, _, _)) = self.shadowed.last() {
            if *shadowing_depth != depth {
                break;
            }
            if let Some((_, name, var)) = self.shadowed.pop() {
                self.variables.insert(name, var);
            }
        }

        if let Some(mark) = self.marks.pop() {
            self.next_slot = mark;
        }
        self.depth = depth.saturating_sub(1);
    }

    pub fn depth(&self) -> u32 {
        self.depth
    }

    // ==========================================================================
    // Declaration
    // ==========================================================================

    /// Declare a method parameter.
    pub fn declare_parameter(&mut self, name: &str, ty: TypeDef) -> Result<u16, EmitErrorKind> {
        let slot = self.allocate(ty.slot_size())?;
        self.parameters.insert(
            name.to_string(),
            LocalVar {
                name: name.to_string(),
                ty,
                slot,
                depth: 0,
            },
        );
        Ok(slot)
    }

    /// Declare a local in the current scope. Redeclaring a name in the same
    /// scope is an error; declaring it in a nested scope shadows it.
    pub fn declare(&mut self, name: &str, ty: TypeDef) -> Result<u16, EmitErrorKind> {
        if let Some(existing) = self.variables.get(name) {
            if existing.depth == self.depth {
                return Err(EmitErrorKind::DuplicateLocal {
                    name: name.to_string(),
                });
            }
            self.shadowed
                .push((self.depth, name.to_string(), existing.clone()));
        }

        let slot = self.allocate(ty.slot_size())?;
        self.variables.insert(
            name.to_string(),
            LocalVar {
                name: name.to_string(),
                ty,
                slot,
                depth: self.depth,
            },
        );
        Ok(slot)
    }

    /// Allocate an unnamed slot living until the current scope ends.
    pub fn temporary(&mut self, ty: TypeDef) -> Result<u16, EmitErrorKind> {
        self.temporaries += 1;
        let name = format!("${}", self.temporaries);
        self.declare(&name, ty)
    }

    fn allocate(&mut self, size: u16) -> Result<u16, EmitErrorKind> {
        let slot = self.next_slot;
        self.next_slot += u32::from(size.max(1));
        if self.next_slot > u32::from(u16::MAX) {
            return Err(EmitErrorKind::TooManyLocals {
                count: self.next_slot as usize,
            });
        }
        self.max_slot = self.max_slot.max(self.next_slot);
        Ok(slot as u16)
    }

    // ==========================================================================
    // Lookup
    // ==========================================================================

    pub fn local(&self, name: &str) -> Option<&LocalVar> {
        self.variables.get(name)
    }

    pub fn parameter(&self, name: &str) -> Option<&LocalVar> {
        self.parameters.get(name)
    }

    /// Slots needed by the method (`max_locals`).
    pub fn max_locals(&self) -> u16 {
        self.max_slot as u16
    }

    /// Slots in use at this point.
    pub fn in_use(&self) -> u32 {
        self.next_slot
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parameters_follow_receiver() {
        let mut locals = LocalSlots::new();
        locals.reserve_receiver().unwrap();
        assert_eq!(locals.declare_parameter("a", TypeDef::LONG), Ok(1));
        assert_eq!(locals.declare_parameter("b", TypeDef::INT), Ok(3));
        assert_eq!(locals.parameter("b").map(|p| p.slot), Some(3));
        assert_eq!(locals.max_locals(), 4);
    }

    #[test]
    fn wide_locals_take_two_slots() {
        let mut locals = LocalSlots::new();
        assert_eq!(locals.declare("d", TypeDef::DOUBLE), Ok(0));
        assert_eq!(locals.declare("s", TypeDef::string()), Ok(2));
        assert_eq!(locals.in_use(), 3);
    }

    #[test]
    fn slots_reused_after_scope() {
        let mut locals = LocalSlots::new();
        locals.declare("outer", TypeDef::INT).unwrap();

        locals.push_scope();
        assert_eq!(locals.declare("a", TypeDef::LONG), Ok(1));
        locals.pop_scope();
        assert!(locals.local("a").is_none());

        locals.push_scope();
        assert_eq!(locals.declare("b", TypeDef::INT), Ok(1));
        locals.pop_scope();

        assert_eq!(locals.max_locals(), 3);
    }

    #[test]
    fn live_slots_are_not_reused() {
        let mut locals = LocalSlots::new();
        locals.push_scope();
        let a = locals.declare("a", TypeDef::INT).unwrap();
        locals.push_scope();
        let b = locals.declare("b", TypeDef::INT).unwrap();
        assert_ne!(a, b);
        locals.pop_scope();
        assert_eq!(locals.local("a").map(|v| v.slot), Some(a));
        locals.pop_scope();
    }

    #[test]
    fn redeclaration_in_same_scope_fails() {
        let mut locals = LocalSlots::new();
        locals.declare("x", TypeDef::INT).unwrap();
        assert_eq!(
            locals.declare("x", TypeDef::INT),
            Err(EmitErrorKind::DuplicateLocal { name: "x".into() })
        );
    }

    #[test]
    fn shadowing_restored_on_exit() {
        let mut locals = LocalSlots::new();
        locals.declare("x", TypeDef::INT).unwrap();
        locals.push_scope();
        locals.declare("x", TypeDef::string()).unwrap();
        assert_eq!(locals.local("x").map(|v| v.slot), Some(1));
        locals.pop_scope();
        assert_eq!(locals.local("x").map(|v| v.slot), Some(0));
    }

    #[test]
    fn temporaries_are_hidden() {
        let mut locals = LocalSlots::new();
        let a = locals.temporary(TypeDef::INT).unwrap();
        let b = locals.temporary(TypeDef::INT).unwrap();
        assert_ne!(a, b);
    }
}

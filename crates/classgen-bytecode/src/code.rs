//! Method body assembly.
//!
//! [`CodeBuffer`] collects instructions for one method. Branch targets are
//! symbolic [`Label`]s resolved in [`CodeBuffer::finish`]. The buffer
//! tracks the operand-stack depth along the straight-line instruction
//! stream: every label remembers the depth of the first edge reaching it
//! and later edges must agree. After an unconditional transfer the depth is
//! unknown until a label with a recorded depth is placed.

use crate::{EmitErrorKind, OpCode};

/// A branch target inside one method body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Label(u32);

impl Label {
    pub fn id(self) -> u32 {
        self.0
    }
}

#[derive(Debug, Clone, Default)]
struct LabelState {
    offset: Option<usize>,
    depth: Option<u16>,
}

/// Pending operand to patch once the target offset is known.
#[derive(Debug, Clone)]
struct Fixup {
    label: Label,
    /// Offset of the instruction the branch is relative to.
    instruction: usize,
    /// Offset of the operand bytes.
    at: usize,
    /// 32-bit operand (switches) instead of 16-bit.
    wide: bool,
}

/// A protected range whose handler is still symbolic.
#[derive(Debug, Clone)]
struct PendingHandler {
    start: usize,
    end: usize,
    handler: Label,
    catch_type: u16,
}

/// A resolved exception table entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HandlerEntry {
    pub start_pc: u16,
    pub end_pc: u16,
    pub handler_pc: u16,
    /// Pool index of the caught class, 0 for any exception.
    pub catch_type: u16,
}

/// A finished method body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodeAttribute {
    pub code: Vec<u8>,
    pub max_stack: u16,
    pub max_locals: u16,
    pub exception_table: Vec<HandlerEntry>,
}

impl CodeAttribute {
    /// Opcodes in order, skipping operands.
    pub fn opcodes(&self) -> Vec<OpCode> {
        decode_opcodes(&self.code)
    }
}

/// Value category of a local slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotKind {
    Int,
    Long,
    Float,
    Double,
    Reference,
}

impl SlotKind {
    pub fn size(self) -> u16 {
        match self {
            SlotKind::Long | SlotKind::Double => 2,
            _ => 1,
        }
    }
}

/// Instruction buffer for one method body.
#[derive(Debug, Clone)]
pub struct CodeBuffer {
    code: Vec<u8>,
    /// Current stack depth, `None` while unreachable.
    depth: Option<u16>,
    max_stack: u16,
    labels: Vec<LabelState>,
    fixups: Vec<Fixup>,
    handlers: Vec<PendingHandler>,
}

impl Default for CodeBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl CodeBuffer {
    pub fn new() -> Self {
        Self {
            code: Vec::new(),
            depth: Some(0),
            max_stack: 0,
            labels: Vec::new(),
            fixups: Vec::new(),
            handlers: Vec::new(),
        }
    }

    /// Current code offset.
    pub fn position(&self) -> usize {
        self.code.len()
    }

    /// Whether the next instruction can be reached.
    pub fn is_reachable(&self) -> bool {
        self.depth.is_some()
    }

    pub fn depth(&self) -> Option<u16> {
        self.depth
    }

    pub fn max_stack(&self) -> u16 {
        self.max_stack
    }

    // =========================================================================
    // Labels
    // =========================================================================

    pub fn new_label(&mut self) -> Label {
        let label = Label(self.labels.len() as u32);
        self.labels.push(LabelState::default());
        label
    }

    /// Bind a label to the current offset.
    pub fn place(&mut self, label: Label) -> Result<(), EmitErrorKind> {
        let offset = self.code.len();
        debug_assert!(
            self.labels[label.0 as usize].offset.is_none(),
            "label placed twice"
        );
        self.labels[label.0 as usize].offset = Some(offset);
        match self.depth {
            Some(depth) => self.merge(label, depth),
            None => {
                self.depth = self.labels[label.0 as usize].depth;
                Ok(())
            }
        }
    }

    /// Bind an exception handler entry point; the stack holds the thrown
    /// exception.
    pub fn place_handler(&mut self, label: Label) -> Result<(), EmitErrorKind> {
        self.depth = None;
        self.labels[label.0 as usize].depth = Some(1);
        self.place(label)?;
        self.max_stack = self.max_stack.max(1);
        Ok(())
    }

    fn merge(&mut self, label: Label, depth: u16) -> Result<(), EmitErrorKind> {
        let state = &mut self.labels[label.0 as usize];
        match state.depth {
            Some(expected) if expected != depth => Err(EmitErrorKind::StackMismatch {
                label: label.0,
                expected,
                found: depth,
            }),
            Some(_) => Ok(()),
            None => {
                state.depth = Some(depth);
                Ok(())
            }
        }
    }

    // =========================================================================
    // Raw writes
    // =========================================================================

    pub fn write_u8(&mut self, byte: u8) {
        self.code.push(byte);
    }

    pub fn write_u16(&mut self, value: u16) {
        self.code.extend_from_slice(&value.to_be_bytes());
    }

    pub fn write_i32(&mut self, value: i32) {
        self.code.extend_from_slice(&value.to_be_bytes());
    }

    fn adjust(&mut self, pops: u16, pushes: u16) -> Result<(), EmitErrorKind> {
        let Some(depth) = self.depth else {
            return Ok(());
        };
        if depth < pops {
            return Err(EmitErrorKind::StackUnderflow {
                offset: self.code.len(),
            });
        }
        let depth = depth - pops + pushes;
        self.max_stack = self.max_stack.max(depth);
        self.depth = Some(depth);
        Ok(())
    }

    // =========================================================================
    // Instructions
    // =========================================================================

    /// Emit an instruction with a fixed stack effect. Operands, if any, are
    /// written by the caller.
    pub fn op(&mut self, op: OpCode) -> Result<(), EmitErrorKind> {
        let (pops, pushes) = op.stack_effect().unwrap_or((0, 0));
        self.op_with(op, pops, pushes)
    }

    /// Emit an instruction whose stack effect depends on a descriptor.
    pub fn op_with(&mut self, op: OpCode, pops: u16, pushes: u16) -> Result<(), EmitErrorKind> {
        self.adjust(pops, pushes)?;
        self.code.push(op.into());
        if op.ends_flow() {
            self.depth = None;
        }
        Ok(())
    }

    /// Emit an instruction with a 16-bit operand.
    pub fn op_u16(&mut self, op: OpCode, operand: u16) -> Result<(), EmitErrorKind> {
        self.op(op)?;
        self.write_u16(operand);
        Ok(())
    }

    /// Emit a branch to `label`.
    pub fn branch(&mut self, op: OpCode, label: Label) -> Result<(), EmitErrorKind> {
        debug_assert!(op.is_branch());
        let (pops, _) = op.stack_effect().unwrap_or((0, 0));
        let instruction = self.code.len();
        self.adjust(pops, 0)?;
        self.code.push(op.into());
        self.fixups.push(Fixup {
            label,
            instruction,
            at: self.code.len(),
            wide: false,
        });
        self.write_u16(0);
        if let Some(depth) = self.depth {
            self.merge(label, depth)?;
        }
        if op == OpCode::Goto {
            self.depth = None;
        }
        Ok(())
    }

    /// Emit a `tableswitch` over `low..=high`; `targets` has one label per
    /// value.
    pub fn table_switch(
        &mut self,
        low: i32,
        high: i32,
        default: Label,
        targets: &[Label],
    ) -> Result<(), EmitErrorKind> {
        debug_assert_eq!(i64::from(high) - i64::from(low) + 1, targets.len() as i64);
        let instruction = self.begin_switch(OpCode::Tableswitch)?;
        self.switch_target(default, instruction);
        self.write_i32(low);
        self.write_i32(high);
        for &target in targets {
            self.switch_target(target, instruction);
        }
        self.end_switch(default, targets.iter().copied())
    }

    /// Emit a `lookupswitch`; pairs are sorted by key.
    pub fn lookup_switch(
        &mut self,
        default: Label,
        pairs: &[(i32, Label)],
    ) -> Result<(), EmitErrorKind> {
        let mut pairs = pairs.to_vec();
        pairs.sort_by_key(|(key, _)| *key);
        let instruction = self.begin_switch(OpCode::Lookupswitch)?;
        self.switch_target(default, instruction);
        self.write_i32(pairs.len() as i32);
        for &(key, target) in &pairs {
            self.write_i32(key);
            self.switch_target(target, instruction);
        }
        self.end_switch(default, pairs.iter().map(|(_, label)| *label))
    }

    fn begin_switch(&mut self, op: OpCode) -> Result<usize, EmitErrorKind> {
        let instruction = self.code.len();
        self.adjust(1, 0)?;
        self.code.push(op.into());
        while self.code.len() % 4 != 0 {
            self.code.push(0);
        }
        Ok(instruction)
    }

    fn switch_target(&mut self, label: Label, instruction: usize) {
        self.fixups.push(Fixup {
            label,
            instruction,
            at: self.code.len(),
            wide: true,
        });
        self.write_i32(0);
    }

    fn end_switch(
        &mut self,
        default: Label,
        targets: impl Iterator<Item = Label>,
    ) -> Result<(), EmitErrorKind> {
        if let Some(depth) = self.depth {
            self.merge(default, depth)?;
            for target in targets {
                self.merge(target, depth)?;
            }
        }
        self.depth = None;
        Ok(())
    }

    /// Load a local with the shortest encoding for its slot.
    pub fn load(&mut self, kind: SlotKind, slot: u16) -> Result<(), EmitErrorKind> {
        use OpCode::*;
        let (short, long) = match kind {
            SlotKind::Int => ([Iload0, Iload1, Iload2, Iload3], Iload),
            SlotKind::Long => ([Lload0, Lload1, Lload2, Lload3], Lload),
            SlotKind::Float => ([Fload0, Fload1, Fload2, Fload3], Fload),
            SlotKind::Double => ([Dload0, Dload1, Dload2, Dload3], Dload),
            SlotKind::Reference => ([Aload0, Aload1, Aload2, Aload3], Aload),
        };
        self.local_op(short, long, slot)
    }

    /// Store into a local with the shortest encoding for its slot.
    pub fn store(&mut self, kind: SlotKind, slot: u16) -> Result<(), EmitErrorKind> {
        use OpCode::*;
        let (short, long) = match kind {
            SlotKind::Int => ([Istore0, Istore1, Istore2, Istore3], Istore),
            SlotKind::Long => ([Lstore0, Lstore1, Lstore2, Lstore3], Lstore),
            SlotKind::Float => ([Fstore0, Fstore1, Fstore2, Fstore3], Fstore),
            SlotKind::Double => ([Dstore0, Dstore1, Dstore2, Dstore3], Dstore),
            SlotKind::Reference => ([Astore0, Astore1, Astore2, Astore3], Astore),
        };
        self.local_op(short, long, slot)
    }

    fn local_op(&mut self, short: [OpCode; 4], long: OpCode, slot: u16) -> Result<(), EmitErrorKind> {
        match slot {
            0..=3 => self.op(short[usize::from(slot)]),
            4..=255 => {
                self.op(long)?;
                self.write_u8(slot as u8);
                Ok(())
            }
            _ => {
                self.code.push(OpCode::Wide.into());
                self.op(long)?;
                self.write_u16(slot);
                Ok(())
            }
        }
    }

    // =========================================================================
    // Exception table
    // =========================================================================

    /// Protect `start..end` with the handler at `handler`. Empty ranges are
    /// dropped. Entries keep insertion order, so inner handlers must be
    /// added first.
    pub fn add_handler(&mut self, start: usize, end: usize, handler: Label, catch_type: u16) {
        if start < end {
            self.handlers.push(PendingHandler {
                start,
                end,
                handler,
                catch_type,
            });
        }
    }

    // =========================================================================
    // Finish
    // =========================================================================

    /// Resolve all labels and produce the method body.
    pub fn finish(mut self, max_locals: u16) -> Result<CodeAttribute, EmitErrorKind> {
        if self.code.len() > usize::from(u16::MAX) {
            return Err(EmitErrorKind::CodeTooLarge {
                length: self.code.len(),
            });
        }

        for fixup in &self.fixups {
            let target = self.labels[fixup.label.0 as usize]
                .offset
                .ok_or(EmitErrorKind::UnresolvedLabel { label: fixup.label.0 })?;
            let offset = target as i64 - fixup.instruction as i64;
            if fixup.wide {
                self.code[fixup.at..fixup.at + 4].copy_from_slice(&(offset as i32).to_be_bytes());
            } else {
                let offset = i16::try_from(offset)
                    .map_err(|_| EmitErrorKind::BranchOutOfRange { offset })?;
                self.code[fixup.at..fixup.at + 2].copy_from_slice(&offset.to_be_bytes());
            }
        }

        let mut exception_table = Vec::with_capacity(self.handlers.len());
        for pending in &self.handlers {
            let handler = self.labels[pending.handler.0 as usize]
                .offset
                .ok_or(EmitErrorKind::UnresolvedLabel {
                    label: pending.handler.0,
                })?;
            exception_table.push(HandlerEntry {
                start_pc: pending.start as u16,
                end_pc: pending.end as u16,
                handler_pc: handler as u16,
                catch_type: pending.catch_type,
            });
        }

        Ok(CodeAttribute {
            code: self.code,
            max_stack: self.max_stack,
            max_locals,
            exception_table,
        })
    }
}

/// Walk a code array instruction by instruction.
pub fn decode_opcodes(code: &[u8]) -> Vec<OpCode> {
    let mut ops = Vec::new();
    let mut offset = 0;
    while offset < code.len() {
        let Ok(op) = OpCode::try_from(code[offset]) else {
            break;
        };
        ops.push(op);
        offset += instruction_length(code, offset).unwrap_or(code.len());
    }
    ops
}

/// Length in bytes of the instruction at `offset`, operands included.
pub fn instruction_length(code: &[u8], offset: usize) -> Option<usize> {
    let op = OpCode::try_from(*code.get(offset)?).ok()?;
    if let Some(size) = op.operand_size() {
        return Some(1 + size);
    }
    let read_i32 = |at: usize| -> Option<i32> {
        let bytes = code.get(at..at + 4)?;
        Some(i32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    };
    let aligned = (offset + 4) & !3;
    match op {
        OpCode::Tableswitch => {
            let low = read_i32(aligned + 4)?;
            let high = read_i32(aligned + 8)?;
            let count = usize::try_from(i64::from(high) - i64::from(low) + 1).ok()?;
            Some(aligned + 12 + count * 4 - offset)
        }
        OpCode::Lookupswitch => {
            let count = usize::try_from(read_i32(aligned + 4)?).ok()?;
            Some(aligned + 8 + count * 8 - offset)
        }
        OpCode::Wide => {
            let inner = OpCode::try_from(*code.get(offset + 1)?).ok()?;
            Some(if inner == OpCode::Iinc { 6 } else { 4 })
        }
        _ => None,
    }
}

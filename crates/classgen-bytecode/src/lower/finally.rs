//! `try`/`catch`/`finally`, try-with-resources and `synchronized`.
//!
//! Finally blocks are inlined on every normal exit (fall-through and
//! `return`) and once more in a catch-any handler that rethrows. Each
//! enclosing try or monitor is tracked as a [`FinallyFrame`] recording the
//! code ranges it protects; ranges are suspended while an outer finally
//! block is being inlined so that the inlined code is not covered by the
//! handlers it exits from.
//!
//! ```text
//! try { return x; } finally { F }
//!
//!  start: <x> store t          ; protected
//!         F                    ; not protected
//!         load t; return
//!  any:   astore e; F; aload e; athrow
//! ```

use classgen_core::{
    ClassTypeDef, ExpressionDef, MethodRef, StatementDef, TryStatement, TypeDef,
};

use super::{MethodLowering, Result, return_op, slot_kind};
use crate::OpCode;
use crate::code::{Label, SlotKind};

#[derive(Debug, Clone)]
enum FinallyAction {
    /// Range tracking only (catch clauses without finally).
    Nothing,
    Block(StatementDef),
    /// Release the monitor held in a local slot.
    MonitorExit(u16),
}

/// An enclosing protected region.
#[derive(Debug)]
pub(super) struct FinallyFrame {
    action: FinallyAction,
    /// Closed `[start, end)` ranges.
    segments: Vec<(usize, usize)>,
    /// Start of the range being recorded, if any.
    open: Option<usize>,
}

impl FinallyFrame {
    fn open(action: FinallyAction, at: usize) -> Self {
        Self {
            action,
            segments: Vec::new(),
            open: Some(at),
        }
    }

    fn suspend(&mut self, at: usize) {
        if let Some(start) = self.open.take() {
            if start < at {
                self.segments.push((start, at));
            }
        }
    }

    fn resume(&mut self, at: usize) {
        if self.open.is_none() {
            self.open = Some(at);
        }
    }

    fn finish(mut self, at: usize) -> Vec<(usize, usize)> {
        self.suspend(at);
        self.segments
    }
}

impl MethodLowering<'_> {
    /// Return the value on top of the stack (nothing for `void`), running
    /// every enclosing finally block and monitor exit first.
    pub(super) fn exit_with(&mut self, ty: &TypeDef) -> Result<()> {
        let op = return_op(ty);
        if self
            .frames
            .iter()
            .all(|frame| matches!(frame.action, FinallyAction::Nothing))
        {
            return self.code.op(op);
        }

        let saved = if ty.is_void() {
            None
        } else {
            let slot = self.locals.temporary(ty.clone())?;
            self.code.store(slot_kind(ty), slot)?;
            Some(slot)
        };
        self.leave_frames(0)?;
        if self.code.is_reachable() {
            if let Some(slot) = saved {
                self.code.load(slot_kind(ty), slot)?;
            }
            self.code.op(op)?;
        }

        let at = self.code.position();
        for frame in &mut self.frames {
            frame.resume(at);
        }
        Ok(())
    }

    /// Inline the actions of frames `down_to..`, innermost first.
    fn leave_frames(&mut self, down_to: usize) -> Result<()> {
        for index in (down_to..self.frames.len()).rev() {
            let at = self.code.position();
            self.frames[index].suspend(at);
            self.inline_frame(index)?;
            if !self.code.is_reachable() {
                break;
            }
        }
        Ok(())
    }

    /// Inline one frame's action with it and everything inside it removed
    /// from the frame stack, so a `return` in a finally block only runs the
    /// finally blocks outside it.
    fn inline_frame(&mut self, index: usize) -> Result<()> {
        let inner = self.frames.split_off(index);
        let result = self.run_action(&inner[0].action);
        self.frames.extend(inner);
        result
    }

    fn run_action(&mut self, action: &FinallyAction) -> Result<()> {
        match action {
            FinallyAction::Nothing => Ok(()),
            FinallyAction::Block(statement) => self.block(statement),
            FinallyAction::MonitorExit(slot) => {
                self.code.load(SlotKind::Reference, *slot)?;
                self.code.op(OpCode::Monitorexit)
            }
        }
    }

    fn pop_frame(&mut self) -> Vec<(usize, usize)> {
        let at = self.code.position();
        self.frames
            .pop()
            .map(|frame| frame.finish(at))
            .unwrap_or_default()
    }

    /// Catch-any handler over `ranges`: store the exception, run `action`,
    /// rethrow.
    fn rethrow_handler(&mut self, ranges: &[(usize, usize)], action: &FinallyAction) -> Result<()> {
        if ranges.is_empty() {
            return Ok(());
        }
        let handler = self.code.new_label();
        self.code.place_handler(handler)?;
        for &(start, end) in ranges {
            self.code.add_handler(start, end, handler, 0);
        }
        let thrown = self
            .locals
            .temporary(TypeDef::Class(ClassTypeDef::throwable()))?;
        self.code.store(SlotKind::Reference, thrown)?;
        self.run_action(action)?;
        if self.code.is_reachable() {
            self.code.load(SlotKind::Reference, thrown)?;
            self.code.op(OpCode::Athrow)?;
        }
        Ok(())
    }

    // ========================================================================
    // try
    // ========================================================================

    pub(super) fn try_statement(&mut self, statement: &TryStatement) -> Result<()> {
        if !statement.resources.is_empty() {
            return self.try_with_resources(statement);
        }
        if statement.catches.is_empty() && statement.finally.is_none() {
            return self.block(&statement.body);
        }
        self.locals.push_scope();
        let result = self.try_catch_finally(statement);
        self.locals.pop_scope();
        result
    }

    fn try_catch_finally(&mut self, statement: &TryStatement) -> Result<()> {
        let end = self.code.new_label();
        let start = self.code.position();

        let finally_index = statement.finally.as_ref().map(|finally| {
            self.frames.push(FinallyFrame::open(
                FinallyAction::Block(finally.clone()),
                start,
            ));
            self.frames.len() - 1
        });
        let has_catches = !statement.catches.is_empty();
        if has_catches {
            self.frames
                .push(FinallyFrame::open(FinallyAction::Nothing, start));
        }

        self.block(&statement.body)?;
        let body_ranges = if has_catches {
            self.pop_frame()
        } else {
            Vec::new()
        };
        self.leave_normally(finally_index, end)?;

        // Clauses are unreachable when the body has no instructions.
        if !body_ranges.is_empty() {
            for catch in &statement.catches {
                let handler = self.code.new_label();
                self.code.place_handler(handler)?;
                if let Some(index) = finally_index {
                    let at = self.code.position();
                    self.frames[index].resume(at);
                }
                let exception = TypeDef::Class(catch.exception.clone());
                let catch_type = self.class_index(&exception)?;
                for &(from, to) in &body_ranges {
                    self.code.add_handler(from, to, handler, catch_type);
                }

                self.locals.push_scope();
                let clause = self
                    .locals
                    .declare(&catch.name, exception)
                    .and_then(|slot| self.code.store(SlotKind::Reference, slot))
                    .and_then(|()| self.block(&catch.body));
                self.locals.pop_scope();
                clause?;
                self.leave_normally(finally_index, end)?;
            }
        }

        if let Some(finally) = &statement.finally {
            let ranges = self.pop_frame();
            self.rethrow_handler(&ranges, &FinallyAction::Block(finally.clone()))?;
        }
        self.code.place(end)
    }

    /// Fall-through exit from a try body or catch clause.
    fn leave_normally(&mut self, finally_index: Option<usize>, end: Label) -> Result<()> {
        if !self.code.is_reachable() {
            return Ok(());
        }
        if let Some(index) = finally_index {
            self.leave_frames(index)?;
        }
        if self.code.is_reachable() {
            self.code.branch(OpCode::Goto, end)?;
        }
        Ok(())
    }

    /// Rewrite resources into nested try/finally blocks that close them in
    /// reverse order, then lower the clauses around the result.
    fn try_with_resources(&mut self, statement: &TryStatement) -> Result<()> {
        let close = MethodRef::new(
            ClassTypeDef::auto_closeable(),
            "close",
            vec![],
            TypeDef::Void,
        );
        let mut body = statement.body.clone();
        for resource in statement.resources.iter().rev() {
            let variable = resource.variable();
            let release = StatementDef::if_then(
                variable.read().is_non_null(),
                variable.read().invoke(close.clone(), vec![]).into_statement(),
            );
            body = StatementDef::Multi(vec![
                StatementDef::DefineAndAssign {
                    name: resource.name.clone(),
                    ty: resource.ty.clone(),
                    value: resource.value.clone(),
                },
                TryStatement::new(body).with_finally(release).build(),
            ]);
        }
        let outer = TryStatement {
            resources: Vec::new(),
            body,
            catches: statement.catches.clone(),
            finally: statement.finally.clone(),
        };
        self.try_statement(&outer)
    }

    // ========================================================================
    // synchronized
    // ========================================================================

    pub(super) fn synchronized(
        &mut self,
        monitor: &ExpressionDef,
        body: &StatementDef,
    ) -> Result<()> {
        self.locals.push_scope();
        let result = self.synchronized_scoped(monitor, body);
        self.locals.pop_scope();
        result
    }

    fn synchronized_scoped(&mut self, monitor: &ExpressionDef, body: &StatementDef) -> Result<()> {
        let end = self.code.new_label();
        self.value(monitor)?;
        self.code.op(OpCode::Dup)?;
        let held = self.locals.temporary(TypeDef::object())?;
        self.code.store(SlotKind::Reference, held)?;
        self.code.op(OpCode::Monitorenter)?;

        let start = self.code.position();
        self.frames
            .push(FinallyFrame::open(FinallyAction::MonitorExit(held), start));
        let index = self.frames.len() - 1;
        self.block(body)?;
        self.leave_normally(Some(index), end)?;

        let ranges = self.pop_frame();
        self.rethrow_handler(&ranges, &FinallyAction::MonitorExit(held))?;
        self.code.place(end)
    }
}

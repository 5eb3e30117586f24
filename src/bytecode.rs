//! The action stream the CFG builder consumes: [`Action`], its opcode
//! taxonomy [`ActionKind`], and the [`ByteCode`] container.
//!
//! `Action`'s [`std::fmt::Display`] impl is an external contract - tests in
//! [`crate::graph`] match the CFG output against these exact strings, so the
//! format must be reproduced byte-for-byte, including the two-space indent
//! and `END_PUSH` sentinel on multi-line pushes.
use std::fmt;

/// A single pushed operand. Only the shapes the decompiler's tests exercise
/// are modeled; a richer value set (doubles, object references, ...) would
/// be a straightforward extension here.
#[derive(Debug, Clone, PartialEq)]
pub enum PushValue {
    Null,
    Undefined,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    Register(u16),
}

impl fmt::Display for PushValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PushValue::Null => write!(f, "NULL"),
            PushValue::Undefined => write!(f, "UNDEFINED"),
            PushValue::Bool(true) => write!(f, "True"),
            PushValue::Bool(false) => write!(f, "False"),
            PushValue::Int(i) => write!(f, "{i}"),
            PushValue::Float(x) => write!(f, "{x}"),
            PushValue::Str(s) => write!(f, "'{s}'"),
            PushValue::Register(r) => write!(f, "Register({r})"),
        }
    }
}

/// The comparison an `If` action branches on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparison {
    IsTrue,
    IsFalse,
    Equals,
    NotEquals,
    LessThan,
    GreaterThan,
    LessThanOrEquals,
    GreaterThanOrEquals,
}

impl fmt::Display for Comparison {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Comparison::IsTrue => "IS TRUE",
            Comparison::IsFalse => "IS FALSE",
            Comparison::Equals => "==",
            Comparison::NotEquals => "!=",
            Comparison::LessThan => "<",
            Comparison::GreaterThan => ">",
            Comparison::LessThanOrEquals => "<=",
            Comparison::GreaterThanOrEquals => ">=",
        };
        write!(f, "{s}")
    }
}

/// The opcode of an [`Action`], tagged by shape rather than by inheritance:
/// the CFG builder switches on this to decide fall-through vs. branch vs.
/// terminator, nothing more.
#[derive(Debug, Clone, PartialEq)]
pub enum ActionKind {
    Stop,
    Play,
    End,
    Return,
    Throw,
    Jump { target: u32 },
    If { comparison: Comparison, target: u32 },
    Push { values: Vec<PushValue> },
    /// Writes the top of stack into a register slot. Straight-line from the
    /// CFG's point of view; the register index is what the live-registers
    /// dataflow analysis treats as a definition.
    SetRegister { register: u16 },
    /// Catch-all for opcodes the CFG doesn't need to special-case
    /// (arithmetic, calls, locals, ...): all of them fall through to the
    /// next offset. `mnemonic` is only used for [`Action`]'s `Display` impl.
    Generic { mnemonic: &'static str },
}

impl ActionKind {
    /// True for `Return`/`Throw`: control never falls through.
    pub fn is_terminator(&self) -> bool {
        matches!(self, ActionKind::Return | ActionKind::Throw)
    }

    /// True for `Jump`/`If`.
    pub fn is_branch(&self) -> bool {
        matches!(self, ActionKind::Jump { .. } | ActionKind::If { .. })
    }

    /// True for `Jump`: control never falls through, it always transfers to `target`.
    pub fn is_unconditional_jump(&self) -> bool {
        matches!(self, ActionKind::Jump { .. })
    }

    fn mnemonic(&self) -> &'static str {
        match self {
            ActionKind::Stop => "STOP",
            ActionKind::Play => "PLAY",
            ActionKind::End => "END",
            ActionKind::Return => "RETURN",
            ActionKind::Throw => "THROW",
            ActionKind::Jump { .. } => "JUMP",
            ActionKind::If { .. } => "IF",
            ActionKind::Push { .. } => "PUSH",
            ActionKind::SetRegister { .. } => "SET_REGISTER",
            ActionKind::Generic { mnemonic } => mnemonic,
        }
    }
}

/// One instruction of the AP2 bytecode: an offset plus an opcode.
#[derive(Debug, Clone, PartialEq)]
pub struct Action {
    pub offset: u32,
    pub kind: ActionKind,
}

impl Action {
    pub fn new(offset: u32, kind: ActionKind) -> Self {
        Action { offset, kind }
    }

    pub fn stop(offset: u32) -> Self {
        Action::new(offset, ActionKind::Stop)
    }

    pub fn play(offset: u32) -> Self {
        Action::new(offset, ActionKind::Play)
    }

    pub fn end(offset: u32) -> Self {
        Action::new(offset, ActionKind::End)
    }

    pub fn ret(offset: u32) -> Self {
        Action::new(offset, ActionKind::Return)
    }

    pub fn throw(offset: u32) -> Self {
        Action::new(offset, ActionKind::Throw)
    }

    pub fn jump(offset: u32, target: u32) -> Self {
        Action::new(offset, ActionKind::Jump { target })
    }

    pub fn if_(offset: u32, comparison: Comparison, target: u32) -> Self {
        Action::new(offset, ActionKind::If { comparison, target })
    }

    pub fn push(offset: u32, values: Vec<PushValue>) -> Self {
        Action::new(offset, ActionKind::Push { values })
    }

    pub fn set_register(offset: u32, register: u16) -> Self {
        Action::new(offset, ActionKind::SetRegister { register })
    }

    /// The offset this action branches to, if any.
    pub fn branch_target(&self) -> Option<u32> {
        match &self.kind {
            ActionKind::Jump { target } => Some(*target),
            ActionKind::If { target, .. } => Some(*target),
            _ => None,
        }
    }

    /// Register slots read by this action (via a pushed [`PushValue::Register`]).
    pub fn registers_read(&self) -> Vec<u16> {
        match &self.kind {
            ActionKind::Push { values } => values
                .iter()
                .filter_map(|v| match v {
                    PushValue::Register(r) => Some(*r),
                    _ => None,
                })
                .collect(),
            _ => Vec::new(),
        }
    }

    /// Register slot written by this action, if any.
    pub fn register_written(&self) -> Option<u16> {
        match &self.kind {
            ActionKind::SetRegister { register } => Some(*register),
            _ => None,
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            ActionKind::Jump { target } => {
                write!(f, "{}: JUMP, Offset To Jump To: {}", self.offset, target)
            }
            ActionKind::If { comparison, target } => write!(
                f,
                "{}: IF, Comparison: {}, Offset To Jump To If True: {}",
                self.offset, comparison, target
            ),
            ActionKind::Push { values } => {
                writeln!(f, "{}: PUSH", self.offset)?;
                for value in values {
                    writeln!(f, "  {value}")?;
                }
                write!(f, "END_PUSH")
            }
            ActionKind::SetRegister { register } => {
                write!(f, "{}: SET_REGISTER, Register: {}", self.offset, register)
            }
            _ => write!(f, "{}: {}", self.offset, self.kind.mnemonic()),
        }
    }
}

/// A sequence of actions plus the offset one past the last action.
///
/// Invariant: `actions` is sorted strictly ascending by `offset`, and
/// `end_offset == actions.last().offset + 1` (or `0` if `actions` is empty).
#[derive(Debug, Clone, PartialEq)]
pub struct ByteCode {
    pub actions: Vec<Action>,
    pub end_offset: u32,
}

impl ByteCode {
    pub fn new(actions: Vec<Action>, end_offset: u32) -> Self {
        ByteCode {
            actions,
            end_offset,
        }
    }

    /// Convenience constructor matching the common case of
    /// `end_offset = last_action.offset + 1`.
    pub fn from_actions(actions: Vec<Action>) -> Self {
        let end_offset = actions.last().map(|a| a.offset + 1).unwrap_or(0);
        ByteCode::new(actions, end_offset)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_stop() {
        assert_eq!(Action::stop(100).to_string(), "100: STOP");
    }

    #[test]
    fn test_display_jump() {
        assert_eq!(
            Action::jump(101, 104).to_string(),
            "101: JUMP, Offset To Jump To: 104"
        );
    }

    #[test]
    fn test_display_if() {
        assert_eq!(
            Action::if_(101, Comparison::IsFalse, 103).to_string(),
            "101: IF, Comparison: IS FALSE, Offset To Jump To If True: 103"
        );
        assert_eq!(
            Action::if_(101, Comparison::NotEquals, 104).to_string(),
            "101: IF, Comparison: !=, Offset To Jump To If True: 104"
        );
    }

    #[test]
    fn test_display_push_bool() {
        assert_eq!(
            Action::push(100, vec![PushValue::Bool(true)]).to_string(),
            "100: PUSH\n  True\nEND_PUSH"
        );
    }

    #[test]
    fn test_display_push_register_and_int() {
        assert_eq!(
            Action::push(100, vec![PushValue::Register(0), PushValue::Int(1)]).to_string(),
            "100: PUSH\n  Register(0)\n  1\nEND_PUSH"
        );
    }

    #[test]
    fn test_display_push_string() {
        assert_eq!(
            Action::push(100, vec![PushValue::Str("a".to_string())]).to_string(),
            "100: PUSH\n  'a'\nEND_PUSH"
        );
    }

    #[test]
    fn test_from_actions_end_offset() {
        let bc = ByteCode::from_actions(vec![Action::stop(100)]);
        assert_eq!(bc.end_offset, 101);

        let bc = ByteCode::from_actions(vec![]);
        assert_eq!(bc.end_offset, 0);
    }
}

//! Built-in commands and object methods.
//!
//! Calls to these names compile to a dedicated opcode instead of a
//! script function call.
use super::opcode::Opcode;
use std::ops::BitOr;

/// Options controlling how a call is lowered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CmdFlags(u8);

impl CmdFlags {
    pub const NOOPT: Self = Self(0);
    /// Arguments are passed in an array.
    pub const USE_ARRAY: Self = Self(1 << 0);
    /// Arguments are pushed last to first.
    pub const REVERSE_ARGS: Self = Self(1 << 1);
    /// Call leaves a value on the stack.
    pub const RETURN_VALUE: Self = Self(1 << 2);
    /// Object is pushed before the arguments.
    pub const OBJECT_FIRST: Self = Self(1 << 3);

    #[inline]
    pub const fn union(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }

    #[inline]
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    #[inline]
    pub const fn bits(self) -> u8 {
        self.0
    }
}

impl BitOr for CmdFlags {
    type Output = Self;

    #[inline]
    fn bitor(self, rhs: Self) -> Self {
        self.union(rhs)
    }
}

const BUILTIN: CmdFlags = CmdFlags::REVERSE_ARGS.union(CmdFlags::RETURN_VALUE);
const CALL: CmdFlags = CmdFlags::USE_ARRAY.union(BUILTIN);
const OBJ_QUERY: CmdFlags = CmdFlags::OBJECT_FIRST.union(CmdFlags::RETURN_VALUE);
const OBJ_EDIT: CmdFlags = CmdFlags::OBJECT_FIRST.union(CmdFlags::REVERSE_ARGS);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuiltinCmd {
    pub name: &'static str,
    /// Dedicated opcode, or [`Opcode::Call`] for script calls.
    pub op: Opcode,
    /// Conversion applied to the object of a method call.
    pub convert: Option<Opcode>,
    pub flags: CmdFlags,
}

impl BuiltinCmd {
    const fn new(name: &'static str, op: Opcode) -> Self {
        Self {
            name,
            op,
            convert: None,
            flags: BUILTIN,
        }
    }

    const fn flags(mut self, flags: CmdFlags) -> Self {
        self.flags = flags;
        self
    }

    const fn convert(mut self, op: Opcode) -> Self {
        self.convert = Some(op);
        self
    }

    #[inline]
    pub fn returns_value(&self) -> bool {
        self.flags.contains(CmdFlags::RETURN_VALUE)
    }
}

/// Call to a function defined by a script, or unknown to the compiler.
pub const DEFAULT_CALL: BuiltinCmd = BuiltinCmd::new("", Opcode::Call).flags(CALL);

/// Method call on an object.
pub const DEFAULT_OBJ_CALL: BuiltinCmd = BuiltinCmd::new("", Opcode::Call)
    .flags(CALL)
    .convert(Opcode::ConvToObject);

#[rustfmt::skip]
pub static BUILTIN_CMDS: &[BuiltinCmd] = &[
    BuiltinCmd::new("sleep", Opcode::Sleep).flags(CmdFlags::NOOPT),
    BuiltinCmd::new("sin", Opcode::Sin),
    BuiltinCmd::new("char", Opcode::Char),
    BuiltinCmd::new("cos", Opcode::Cos),
    BuiltinCmd::new("arctan", Opcode::Arctan),
    BuiltinCmd::new("vecx", Opcode::VecX),
    BuiltinCmd::new("vecy", Opcode::VecY),
    BuiltinCmd::new("abs", Opcode::Abs),
    BuiltinCmd::new("exp", Opcode::Exp),
    BuiltinCmd::new("log", Opcode::Log),
    BuiltinCmd::new("min", Opcode::Min),
    BuiltinCmd::new("max", Opcode::Max),
    BuiltinCmd::new("pow", Opcode::Pow).flags(CmdFlags::RETURN_VALUE),
    BuiltinCmd::new("random", Opcode::Random),
    BuiltinCmd::new("arraylen", Opcode::ObjSize),
    BuiltinCmd::new("sarraylen", Opcode::ObjSize),
    BuiltinCmd::new("setarray", Opcode::SetArray).flags(CmdFlags::NOOPT),
    BuiltinCmd::new("getangle", Opcode::GetAngle).flags(CmdFlags::RETURN_VALUE),
    BuiltinCmd::new("getdir", Opcode::GetDir).flags(CmdFlags::RETURN_VALUE),
    BuiltinCmd::new("format", Opcode::Format).flags(CALL),
    BuiltinCmd::new("makevar", Opcode::MakeVar).convert(Opcode::ConvToString),
];

#[rustfmt::skip]
pub static BUILTIN_OBJ_CMDS: &[BuiltinCmd] = &[
    BuiltinCmd::new("index", Opcode::ObjIndex).convert(Opcode::ConvToObject).flags(OBJ_QUERY),
    BuiltinCmd::new("type", Opcode::ObjType).convert(Opcode::ConvToObject),
    BuiltinCmd::new("indices", Opcode::ObjIndices),
    BuiltinCmd::new("link", Opcode::ObjLink),
    BuiltinCmd::new("trim", Opcode::ObjTrim).convert(Opcode::ConvToString),
    BuiltinCmd::new("length", Opcode::ObjLength).convert(Opcode::ConvToString),
    BuiltinCmd::new("pos", Opcode::ObjPos).convert(Opcode::ConvToString).flags(OBJ_QUERY),
    BuiltinCmd::new("charat", Opcode::ObjCharAt).convert(Opcode::ConvToString).flags(OBJ_QUERY),
    BuiltinCmd::new("substring", Opcode::ObjSubstr).convert(Opcode::ConvToString).flags(OBJ_QUERY),
    BuiltinCmd::new("starts", Opcode::ObjStarts).convert(Opcode::ConvToString).flags(OBJ_QUERY),
    BuiltinCmd::new("ends", Opcode::ObjEnds).convert(Opcode::ConvToString).flags(OBJ_QUERY),
    BuiltinCmd::new("tokenize", Opcode::ObjTokenize).convert(Opcode::ConvToString).flags(OBJ_QUERY),
    BuiltinCmd::new("positions", Opcode::ObjPositions).convert(Opcode::ConvToString).flags(OBJ_QUERY),
    BuiltinCmd::new("size", Opcode::ObjSize).convert(Opcode::ConvToObject),
    BuiltinCmd::new("subarray", Opcode::ObjSubarray),
    BuiltinCmd::new("clear", Opcode::ObjClear).convert(Opcode::ConvToObject).flags(CmdFlags::NOOPT),
    BuiltinCmd::new("add", Opcode::ObjAddString).convert(Opcode::ConvToObject).flags(CmdFlags::OBJECT_FIRST),
    BuiltinCmd::new("delete", Opcode::ObjDeleteString).convert(Opcode::ConvToObject).flags(CmdFlags::OBJECT_FIRST),
    BuiltinCmd::new("insert", Opcode::ObjInsertString).convert(Opcode::ConvToObject).flags(OBJ_EDIT),
    BuiltinCmd::new("remove", Opcode::ObjRemoveString).convert(Opcode::ConvToObject).flags(OBJ_EDIT),
    BuiltinCmd::new("replace", Opcode::ObjReplaceString).convert(Opcode::ConvToObject).flags(OBJ_EDIT),
];

/// Commands provided by the runtime to every script.
pub static CORE_COMMANDS: &[&str] = &[
    "echo",
    "join",
    "settimer",
    "scheduleevent",
    "trigger",
    "triggerclient",
    "triggerserver",
    "waitfor",
    "setstring",
    "tokenize",
];

/// Variables and objects provided by the runtime to every script.
pub static CORE_NAMES: &[&str] = &[
    "this", "thiso", "player", "playero", "level", "temp", "params", "pi", "timevar", "timevar2",
];

/// Default separators of `tokenize` when called without arguments.
pub const TOKENIZE_SEPARATORS: &str = " ,";

#[inline]
pub fn lookup_cmd(name: &str) -> Option<&'static BuiltinCmd> {
    BUILTIN_CMDS.iter().find(|cmd| cmd.name == name)
}

#[inline]
pub fn lookup_obj_cmd(name: &str) -> Option<&'static BuiltinCmd> {
    BUILTIN_OBJ_CMDS.iter().find(|cmd| cmd.name == name)
}

/// Whether a bare function name is always callable.
pub fn is_core_function(name: &str) -> bool {
    lookup_cmd(name).is_some() || CORE_COMMANDS.contains(&name)
}

#[inline]
pub fn is_core_name(name: &str) -> bool {
    CORE_NAMES.contains(&name)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_lookup() {
        let sleep = lookup_cmd("sleep").unwrap();
        assert_eq!(sleep.op, Opcode::Sleep);
        assert!(!sleep.returns_value());

        let substring = lookup_obj_cmd("substring").unwrap();
        assert!(substring.flags.contains(CmdFlags::OBJECT_FIRST));
        assert_eq!(substring.convert, Some(Opcode::ConvToString));

        assert!(lookup_cmd("substring").is_none());
        assert!(is_core_function("echo"));
        assert!(!is_core_function("onCreated"));
    }

    #[test]
    fn test_default_call_flags() {
        assert_eq!(DEFAULT_CALL.flags.bits(), 0b0111);
        assert_eq!(DEFAULT_OBJ_CALL.convert, Some(Opcode::ConvToObject));
    }
}

//! Instruction set of the GS2 virtual machine.
use std::{convert::TryFrom, fmt};

macro_rules! opcodes {
    ($($name:ident = $value:literal => $text:literal,)*) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        #[repr(u8)]
        pub enum Opcode {
            $($name = $value,)*
        }

        impl Opcode {
            /// Mnemonic as printed by the disassembler.
            pub fn name(self) -> &'static str {
                match self {
                    $(Self::$name => $text,)*
                }
            }
        }

        impl TryFrom<u8> for Opcode {
            type Error = u8;

            fn try_from(value: u8) -> Result<Self, u8> {
                match value {
                    $($value => Ok(Self::$name),)*
                    _ => Err(value),
                }
            }
        }
    };
}

opcodes! {
    SetIndex = 1 => "SET_INDEX",
    SetIndexTrue = 2 => "SET_INDEX_TRUE",
    Or = 3 => "OR",
    If = 4 => "IF",
    And = 5 => "AND",
    Call = 6 => "CALL",
    Ret = 7 => "RET",
    Sleep = 8 => "SLEEP",
    CmdCall = 9 => "CMD_CALL",
    Jmp = 10 => "JMP",

    TypeNumber = 20 => "TYPE_NUMBER",
    TypeString = 21 => "TYPE_STRING",
    TypeVar = 22 => "TYPE_VAR",
    TypeArray = 23 => "TYPE_ARRAY",
    TypeTrue = 24 => "TYPE_TRUE",
    TypeFalse = 25 => "TYPE_FALSE",
    TypeNull = 26 => "TYPE_NULL",
    Pi = 27 => "PI",

    CopyLastOp = 30 => "COPY_LAST_OP",
    SwapLastOps = 31 => "SWAP_LAST_OPS",
    IndexDec = 32 => "INDEX_DEC",
    ConvToFloat = 33 => "CONV_TO_FLOAT",
    ConvToString = 34 => "CONV_TO_STRING",
    MemberAccess = 35 => "MEMBER_ACCESS",
    ConvToObject = 36 => "CONV_TO_OBJECT",
    ArrayEnd = 37 => "ARRAY_END",
    ArrayNew = 38 => "ARRAY_NEW",
    SetArray = 39 => "SETARRAY",
    InlineNew = 40 => "INLINE_NEW",
    MakeVar = 41 => "MAKEVAR",
    NewObject = 42 => "NEW_OBJECT",
    InlineConditional = 44 => "INLINE_CONDITIONAL",

    Assign = 50 => "ASSIGN",
    FuncParamsEnd = 51 => "FUNC_PARAMS_END",
    Inc = 52 => "INC",
    Dec = 53 => "DEC",

    Add = 60 => "ADD",
    Sub = 61 => "SUB",
    Mul = 62 => "MUL",
    Div = 63 => "DIV",
    Mod = 64 => "MOD",
    Pow = 65 => "POW",
    Not = 68 => "NOT",
    UnarySub = 69 => "UNARYSUB",
    Eq = 70 => "EQ",
    Neq = 71 => "NEQ",
    Lt = 72 => "LT",
    Gt = 73 => "GT",
    Lte = 74 => "LTE",
    Gte = 75 => "GTE",
    Bwo = 76 => "BWO",
    Bwa = 77 => "BWA",
    Bwx = 78 => "BWX",
    Bwi = 79 => "BWI",
    InRange = 80 => "IN_RANGE",
    InObj = 81 => "IN_OBJ",
    ObjIndex = 82 => "OBJ_INDEX",
    ObjType = 83 => "OBJ_TYPE",
    Format = 84 => "FORMAT",
    Int = 85 => "INT",
    Abs = 86 => "ABS",
    Random = 87 => "RANDOM",
    Sin = 88 => "SIN",
    Cos = 89 => "COS",
    Arctan = 90 => "ARCTAN",
    Exp = 91 => "EXP",
    Log = 92 => "LOG",
    Min = 93 => "MIN",
    Max = 94 => "MAX",
    GetAngle = 95 => "GETANGLE",
    GetDir = 96 => "GETDIR",
    VecX = 97 => "VECX",
    VecY = 98 => "VECY",
    ObjIndices = 99 => "OBJ_INDICES",
    ObjLink = 100 => "OBJ_LINK",
    BwLeftShift = 101 => "BW_LEFTSHIFT",
    BwRightShift = 102 => "BW_RIGHTSHIFT",
    Char = 103 => "CHAR",
    ObjCompare = 104 => "OBJ_COMPARE",

    ObjTrim = 110 => "OBJ_TRIM",
    ObjLength = 111 => "OBJ_LENGTH",
    ObjPos = 112 => "OBJ_POS",
    Join = 113 => "JOIN",
    ObjCharAt = 114 => "OBJ_CHARAT",
    ObjSubstr = 115 => "OBJ_SUBSTR",
    ObjStarts = 116 => "OBJ_STARTS",
    ObjEnds = 117 => "OBJ_ENDS",
    ObjTokenize = 118 => "OBJ_TOKENIZE",
    Translate = 119 => "TRANSLATE",
    ObjPositions = 120 => "OBJ_POSITIONS",

    ObjSize = 130 => "OBJ_SIZE",
    Array = 131 => "ARRAY",
    ArrayAssign = 132 => "ARRAY_ASSIGN",
    ArrayMultidim = 133 => "ARRAY_MULTIDIM",
    ArrayMultidimAssign = 134 => "ARRAY_MULTIDIM_ASSIGN",
    ObjSubarray = 135 => "OBJ_SUBARRAY",
    ObjAddString = 136 => "OBJ_ADDSTRING",
    ObjDeleteString = 137 => "OBJ_DELETESTRING",
    ObjRemoveString = 138 => "OBJ_REMOVESTRING",
    ObjReplaceString = 139 => "OBJ_REPLACESTRING",
    ObjInsertString = 140 => "OBJ_INSERTSTRING",
    ObjClear = 141 => "OBJ_CLEAR",
    ArrayNewMultidim = 142 => "ARRAY_NEW_MULTIDIM",

    With = 150 => "WITH",
    WithEnd = 151 => "WITHEND",
    ForEach = 163 => "FOREACH",

    This = 180 => "THIS",
    ThisO = 181 => "THISO",
    Player = 182 => "PLAYER",
    PlayerO = 183 => "PLAYERO",
    Level = 184 => "LEVEL",
    Temp = 189 => "TEMP",
    Params = 190 => "PARAMS",
}

impl Opcode {
    /// Operations known to leave a boolean on the stack.
    #[inline]
    pub fn is_boolean_returning(self) -> bool {
        use Opcode as O;
        matches!(
            self,
            O::Not | O::Eq | O::Neq | O::Lt | O::Gt | O::Lte | O::Gte | O::InRange | O::InObj
        )
    }

    /// Operations known to leave an object on the stack.
    #[inline]
    pub fn is_object_returning(self) -> bool {
        use Opcode as O;
        matches!(
            self,
            O::This | O::ThisO | O::Player | O::PlayerO | O::Level | O::Temp
        )
    }

    /// Operations followed by a jump target operand.
    #[inline]
    pub fn is_jump(self) -> bool {
        use Opcode as O;
        matches!(
            self,
            O::SetIndex | O::SetIndexTrue | O::Or | O::If | O::And | O::With | O::ForEach
        )
    }

    /// Opcode of a reserved object name like `this` or `player`.
    pub fn from_root(name: &str) -> Option<Self> {
        Some(match name {
            "this" => Self::This,
            "thiso" => Self::ThisO,
            "player" => Self::Player,
            "playero" => Self::PlayerO,
            "level" => Self::Level,
            "temp" => Self::Temp,
            "params" => Self::Params,
            "pi" => Self::Pi,
            _ => return None,
        })
    }
}

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_opcode_from_byte() {
        assert_eq!(Opcode::try_from(1), Ok(Opcode::SetIndex));
        assert_eq!(Opcode::try_from(163), Ok(Opcode::ForEach));
        assert_eq!(Opcode::try_from(190), Ok(Opcode::Params));
        assert_eq!(Opcode::try_from(0), Err(0));
        assert_eq!(Opcode::try_from(200), Err(200));
        assert_eq!(Opcode::ObjSubstr as u8, 115);
    }

    #[test]
    fn test_opcode_names() {
        assert_eq!(Opcode::TypeVar.to_string(), "TYPE_VAR");
        assert_eq!(Opcode::from_root("playero"), Some(Opcode::PlayerO));
        assert_eq!(Opcode::from_root("server"), None);
    }
}

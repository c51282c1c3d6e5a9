//! Script header synthesis.
//!
//! Scripts compiled for the server are prefixed with a small prologue
//! naming the script type and script name. The script type also decides
//! which implicit names exist in the environment the script runs in.
use crate::encoding::{write_graal_byte, write_graal_short, GRAAL_SHORT_MAX};
use smol_str::SmolStr;
use std::{error, fmt};

/// Category of script, with the names its environment provides.
#[derive(Debug)]
pub struct ScriptType {
    pub name: &'static str,
    pub variables: &'static [&'static str],
    pub functions: &'static [&'static str],
}

/// Accepted script types.
pub static SCRIPT_TYPES: &[ScriptType] = &[
    ScriptType {
        name: "weapon",
        variables: &["client", "clientr", "server", "serverr", "allplayers"],
        functions: &["findplayer", "findweapon", "setani", "showimg", "hideimg"],
    },
    ScriptType {
        name: "npc",
        variables: &["server", "serverr", "allplayers", "npcs", "x", "y"],
        functions: &["findplayer", "findnpc", "setcharprop", "setshape", "warpto"],
    },
    ScriptType {
        name: "class",
        variables: &["server", "serverr"],
        functions: &["findplayer", "findnpc"],
    },
    ScriptType {
        name: "levelnpc",
        variables: &["server", "serverr", "npcs", "links", "signs", "chests", "x", "y"],
        functions: &["findplayer", "putnpc2", "setshape", "warpto"],
    },
];

/// Number of zeroed key bytes at the end of the prologue.
const HEADER_KEY_LEN: usize = 10;

/// Names implicitly available to a script.
///
/// Empty for scripts compiled without a header.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Environment {
    script_type: Option<SmolStr>,
    variables: Vec<SmolStr>,
    functions: Vec<SmolStr>,
}

impl Environment {
    #[inline]
    pub fn empty() -> Self {
        Self::default()
    }

    #[inline]
    pub fn script_type(&self) -> Option<&str> {
        self.script_type.as_deref()
    }

    #[inline]
    pub fn has_variable(&self, name: &str) -> bool {
        self.variables.iter().any(|var| var == name)
    }

    #[inline]
    pub fn has_function(&self, name: &str) -> bool {
        self.functions.iter().any(|func| func == name)
    }
}

/// Output of the header synthesizer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Header {
    /// Bytes prepended to the bytecode image.
    pub prologue: Vec<u8>,
    pub env: Environment,
}

pub struct HeaderSynth<'a> {
    types: &'a [ScriptType],
    save_to_disk: bool,
}

impl<'a> HeaderSynth<'a> {
    pub fn new(types: &'a [ScriptType], save_to_disk: bool) -> Self {
        Self { types, save_to_disk }
    }

    pub fn script_type(&self, name: &str) -> Option<&'a ScriptType> {
        self.types.iter().find(|ty| ty.name == name)
    }

    /// Build the prologue and environment for the given script.
    pub fn synthesize(&self, script_type: &str, script_name: &str) -> Result<Header, HeaderError> {
        let ty = self
            .script_type(script_type)
            .ok_or_else(|| HeaderError::UnknownScriptType(script_type.into()))?;

        // The name is embedded in a comma separated list.
        if script_name.is_empty() || script_name.contains(',') {
            return Err(HeaderError::InvalidScriptName(script_name.into()));
        }

        log::debug!("synthesizing header for {} '{}'", ty.name, script_name);

        Ok(Header {
            prologue: self.prologue(ty.name, script_name)?,
            env: Self::environment(ty, script_name),
        })
    }

    /// `GraalShort(len) "type,name,flag," GraalByte(0) * 10`
    fn prologue(&self, script_type: &str, script_name: &str) -> Result<Vec<u8>, HeaderError> {
        let section_len = script_type.len() + script_name.len() + 4 + HEADER_KEY_LEN;
        let encoded_len = u16::try_from(section_len)
            .ok()
            .filter(|len| *len <= GRAAL_SHORT_MAX)
            .ok_or(HeaderError::NameTooLong(section_len))?;
        let mut prologue = Vec::with_capacity(2 + section_len);

        write_graal_short(&mut prologue, encoded_len);
        prologue.extend_from_slice(script_type.as_bytes());
        prologue.push(b',');
        prologue.extend_from_slice(script_name.as_bytes());
        prologue.push(b',');
        prologue.push(if self.save_to_disk { b'1' } else { b'0' });
        prologue.push(b',');
        for _ in 0..HEADER_KEY_LEN {
            write_graal_byte(&mut prologue, 0);
        }

        Ok(prologue)
    }

    fn environment(ty: &ScriptType, script_name: &str) -> Environment {
        let mut variables: Vec<SmolStr> = ty.variables.iter().map(|name| SmolStr::new(name)).collect();
        if is_identifier(script_name) && !ty.variables.contains(&script_name) {
            variables.push(script_name.into());
        }

        Environment {
            script_type: Some(ty.name.into()),
            variables,
            functions: ty.functions.iter().map(|name| SmolStr::new(name)).collect(),
        }
    }
}

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    matches!(chars.next(), Some('_' | 'a'..='z' | 'A'..='Z'))
        && chars.all(|c| c == '_' || c.is_ascii_alphanumeric())
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HeaderError {
    UnknownScriptType(SmolStr),
    InvalidScriptName(SmolStr),
    /// Header section longer than its length field can hold.
    NameTooLong(usize),
}

impl error::Error for HeaderError {}

impl fmt::Display for HeaderError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::UnknownScriptType(name) => write!(f, "unknown script type '{}'", name),
            Self::InvalidScriptName(name) => write!(f, "invalid script name '{}'", name),
            Self::NameTooLong(len) => write!(f, "header section of {} bytes is too long", len),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_prologue_layout() {
        let synth = HeaderSynth::new(SCRIPT_TYPES, true);
        let header = synth.synthesize("weapon", "TestCode").unwrap();

        // 6 + 8 + 4 + 10
        assert_eq!(&header.prologue[..2], &[32, 32 + 28]);
        assert_eq!(&header.prologue[2..20], b"weapon,TestCode,1,");
        assert_eq!(&header.prologue[20..], &[32; 10]);
    }

    #[test]
    fn test_environment() {
        let synth = HeaderSynth::new(SCRIPT_TYPES, true);
        let header = synth.synthesize("npc", "Banker").unwrap();

        assert_eq!(header.env.script_type(), Some("npc"));
        assert!(header.env.has_variable("npcs"));
        assert!(header.env.has_variable("Banker"));
        assert!(header.env.has_function("findnpc"));
        assert!(!header.env.has_function("findweapon"));
    }

    #[test]
    fn test_rejects_unknown() {
        let synth = HeaderSynth::new(SCRIPT_TYPES, true);

        assert_eq!(
            synth.synthesize("gmap", "a"),
            Err(HeaderError::UnknownScriptType("gmap".into()))
        );
        assert_eq!(
            synth.synthesize("weapon", "a,b"),
            Err(HeaderError::InvalidScriptName("a,b".into()))
        );
    }

    #[test]
    fn test_rejects_long_name() {
        let synth = HeaderSynth::new(SCRIPT_TYPES, true);
        let name = "a".repeat(usize::from(GRAAL_SHORT_MAX));

        // 6 + len + 4 + 10
        let expected = usize::from(GRAAL_SHORT_MAX) + 20;
        assert_eq!(
            synth.synthesize("weapon", &name),
            Err(HeaderError::NameTooLong(expected))
        );
        assert_eq!(
            synth.synthesize("weapon", &"a".repeat(70000)),
            Err(HeaderError::NameTooLong(70020))
        );

        let longest = "a".repeat(usize::from(GRAAL_SHORT_MAX) - 20);
        let header = synth.synthesize("weapon", &longest).unwrap();
        assert_eq!(header.prologue.len(), 2 + usize::from(GRAAL_SHORT_MAX));
    }

    #[test]
    fn test_deterministic() {
        let synth = HeaderSynth::new(SCRIPT_TYPES, false);
        assert_eq!(
            synth.synthesize("class", "util").unwrap(),
            synth.synthesize("class", "util").unwrap()
        );
    }
}

use std::{fmt, str::FromStr};

/// Symbolic relative step names and their wire tokens.
pub const RELATIVE_STEP: [(&str, &str); 4] = [
    ("BIG_IN", "+bigStep"),
    ("SMALL_IN", "+smallStep"),
    ("BIG_OUT", "-bigStep"),
    ("SMALL_OUT", "-smallStep"),
];

/// Looks up the wire token for a symbolic step name such as `"BIG_IN"`.
pub fn relative_step(name: &str) -> Option<&'static str> {
    RELATIVE_STEP
        .iter()
        .find(|(symbol, _)| *symbol == name)
        .map(|(_, token)| *token)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelativeStep {
    BigIn,
    SmallIn,
    BigOut,
    SmallOut,
}

impl RelativeStep {
    pub fn as_str(&self) -> &'static str {
        match self {
            RelativeStep::BigIn => "+bigStep",
            RelativeStep::SmallIn => "+smallStep",
            RelativeStep::BigOut => "-bigStep",
            RelativeStep::SmallOut => "-smallStep",
        }
    }
}

impl AsRef<str> for RelativeStep {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl fmt::Display for RelativeStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Accepts either the wire token (`+bigStep`) or the symbolic name (`BIG_IN`).
impl FromStr for RelativeStep {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let token = relative_step(s).unwrap_or(s);
        match token {
            "+bigStep" => Ok(RelativeStep::BigIn),
            "+smallStep" => Ok(RelativeStep::SmallIn),
            "-bigStep" => Ok(RelativeStep::BigOut),
            "-smallStep" => Ok(RelativeStep::SmallOut),
            _ => Err(format!("Unknown relative step: {}", s)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IrCutFilterState {
    On,
    Off,
    Auto,
}

impl IrCutFilterState {
    pub fn as_str(&self) -> &'static str {
        match self {
            IrCutFilterState::On => "on",
            IrCutFilterState::Off => "off",
            IrCutFilterState::Auto => "auto",
        }
    }
}

impl AsRef<str> for IrCutFilterState {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl FromStr for IrCutFilterState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "on" => Ok(IrCutFilterState::On),
            "off" => Ok(IrCutFilterState::Off),
            "auto" => Ok(IrCutFilterState::Auto),
            _ => Err(format!("Unknown IR cut filter state: {}", s)),
        }
    }
}

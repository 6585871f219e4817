use std::fmt;

/// Which interpreter implementation to construct. There is only one; this
/// exists so `Factory` has a seam for a second implementation later
/// without callers having to change.
#[derive(Debug, PartialEq, Clone, Default)]
pub enum VMType {
    #[default]
    Interpreter,
}

impl fmt::Display for VMType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "{}",
            match *self {
                VMType::Interpreter => "INT",
            }
        )
    }
}

impl VMType {
    pub fn all() -> Vec<VMType> {
        vec![VMType::Interpreter]
    }
}

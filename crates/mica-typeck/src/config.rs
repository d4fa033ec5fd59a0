use crate::compat::Mode;

/// Compatibility policy for the rules where the language leaves a choice.
///
/// Every other compatibility point (branches, returns, clauses, union
/// properties, collection values) always compares with [`Mode::Equal`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CheckConfig {
    /// Mode for call arguments against parameter types.
    pub argument_mode: Mode,
    /// Mode for `x = init` against the type bound to `x`.
    pub assignment_mode: Mode,
}

impl Default for CheckConfig {
    fn default() -> Self {
        Self {
            argument_mode: Mode::Width,
            assignment_mode: Mode::Equal,
        }
    }
}

impl CheckConfig {
    /// Every compatibility point compares exactly.
    pub fn strict() -> Self {
        Self {
            argument_mode: Mode::Equal,
            assignment_mode: Mode::Equal,
        }
    }

    pub fn with_argument_mode(mut self, mode: Mode) -> Self {
        self.argument_mode = mode;
        self
    }

    pub fn with_assignment_mode(mut self, mode: Mode) -> Self {
        self.assignment_mode = mode;
        self
    }
}

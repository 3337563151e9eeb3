use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use super::test_case::TestCase;

/// Non-owning handle to the result variable of a statement.
///
/// The handle is a lookup into the owning test case (its id plus the
/// statement position), so cloning a test case can rebind every internal
/// cross-reference without dangling pointers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct VariableRef {
    test_case: Uuid,
    position: usize,
}

impl VariableRef {
    pub const fn new(test_case: Uuid, position: usize) -> Self {
        Self {
            test_case,
            position,
        }
    }

    /// Id of the test case owning the variable.
    pub const fn test_case(&self) -> Uuid {
        self.test_case
    }

    /// Position of the statement producing the variable.
    pub const fn position(&self) -> usize {
        self.position
    }

    /// Rebind this variable into `target` at `position + offset`.
    pub fn clone_into(&self, target: &TestCase, offset: isize) -> Self {
        let position = self.position.saturating_add_signed(offset);
        debug_assert!(
            offset >= 0 || self.position >= offset.unsigned_abs(),
            "offset {offset} moves variable {self} before the start of the test case"
        );
        Self::new(target.id(), position)
    }

    pub(crate) const fn with_position(self, position: usize) -> Self {
        Self::new(self.test_case, position)
    }
}

impl fmt::Display for VariableRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "var_{}", self.position)
    }
}

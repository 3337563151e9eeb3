use serde::Serialize;
use std::collections::BTreeSet;
use uuid::Uuid;

use super::statement::Statement;
use super::value::ValueType;
use super::variable::VariableRef;

/// An ordered sequence of statements.
///
/// `Clone` keeps the identity, so a sandbox can execute its own copy and the
/// trace still refers to this test case. Use [`TestCase::deep_clone`] for an
/// independent test case with a fresh identity.
#[derive(Debug, Clone, Serialize)]
pub struct TestCase {
    id: Uuid,
    statements: Vec<Statement>,
}

impl Default for TestCase {
    fn default() -> Self {
        Self::new()
    }
}

impl TestCase {
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            statements: Vec::new(),
        }
    }

    pub const fn id(&self) -> Uuid {
        self.id
    }

    pub fn statements(&self) -> &[Statement] {
        &self.statements
    }

    pub fn statement(&self, position: usize) -> Option<&Statement> {
        self.statements.get(position)
    }

    pub fn statement_mut(&mut self, position: usize) -> Option<&mut Statement> {
        self.statements.get_mut(position)
    }

    /// Number of statements.
    pub fn size(&self) -> usize {
        self.statements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.statements.is_empty()
    }

    /// The result variable of the statement at `position`, if there is one.
    pub fn variable_at(&self, position: usize) -> Option<VariableRef> {
        (position < self.statements.len()).then(|| VariableRef::new(self.id, position))
    }

    /// Append a statement and return its result variable.
    pub fn add_statement(&mut self, statement: Statement) -> VariableRef {
        self.statements.push(statement);
        VariableRef::new(self.id, self.statements.len() - 1)
    }

    /// Insert a statement at `position`, shifting every later statement and
    /// every reference to it by one.
    pub fn insert_statement(&mut self, position: usize, statement: Statement) -> VariableRef {
        let position = position.min(self.statements.len());
        for existing in &mut self.statements {
            existing.remap_references(|v| {
                Some(if v.position() >= position {
                    v.with_position(v.position() + 1)
                } else {
                    v
                })
            });
        }
        self.statements.insert(position, statement);
        VariableRef::new(self.id, position)
    }

    /// Remove the statement at `position` together with every statement that
    /// transitively depends on its result. Returns how many were removed.
    pub fn remove_statement(&mut self, position: usize) -> usize {
        if position >= self.statements.len() {
            return 0;
        }

        let mut removed = BTreeSet::new();
        removed.insert(position);
        for (index, statement) in self.statements.iter().enumerate().skip(position + 1) {
            if statement
                .references()
                .iter()
                .any(|v| removed.contains(&v.position()))
            {
                removed.insert(index);
            }
        }

        let new_positions: Vec<Option<usize>> = {
            let mut next = 0;
            (0..self.statements.len())
                .map(|index| {
                    if removed.contains(&index) {
                        None
                    } else {
                        next += 1;
                        Some(next - 1)
                    }
                })
                .collect()
        };

        let statements = std::mem::take(&mut self.statements);
        self.statements = statements
            .into_iter()
            .enumerate()
            .filter(|(index, _)| !removed.contains(index))
            .map(|(_, mut statement)| {
                statement.remap_references(|v| {
                    new_positions
                        .get(v.position())
                        .copied()
                        .flatten()
                        .map(|p| v.with_position(p))
                });
                statement
            })
            .collect();

        removed.len()
    }

    /// Variables of type `ty` produced strictly before `before`.
    pub fn variables_of_type(&self, ty: &ValueType, before: usize) -> Vec<VariableRef> {
        self.statements
            .iter()
            .take(before)
            .enumerate()
            .filter(|(_, s)| s.return_type() == ty)
            .map(|(position, _)| VariableRef::new(self.id, position))
            .collect()
    }

    /// Independent copy with a fresh identity; every reference and assertion
    /// source is rebound into the copy.
    pub fn deep_clone(&self) -> Self {
        let mut clone = Self::new();
        for statement in &self.statements {
            let cloned = statement.clone_into(&clone, 0);
            clone.statements.push(cloned);
        }
        clone
    }

    pub fn assertion_count(&self) -> usize {
        self.statements.iter().map(|s| s.assertions().len()).sum()
    }

    pub fn clear_assertions(&mut self) {
        for statement in &mut self.statements {
            statement.clear_assertions();
        }
    }
}

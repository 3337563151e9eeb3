use serde::Serialize;
use std::fmt;

use super::assertion::Assertion;
use super::test_case::TestCase;
use super::value::{PrimitiveValue, ValueType};
use super::variable::VariableRef;

/// What a statement does.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StatementKind {
    /// Bind a literal.
    Primitive(PrimitiveValue),
    /// Invoke a constructor, method or free function of the target.
    Call {
        callable: String,
        receiver: Option<VariableRef>,
        args: Vec<VariableRef>,
    },
}

/// One step of a test case, together with the assertions checked after it.
#[derive(Debug, Clone, Serialize)]
pub struct Statement {
    kind: StatementKind,
    return_type: ValueType,
    assertions: Vec<Assertion>,
}

impl Statement {
    pub fn primitive(value: PrimitiveValue) -> Self {
        let return_type = value.value_type();
        Self {
            kind: StatementKind::Primitive(value),
            return_type,
            assertions: Vec::new(),
        }
    }

    pub fn call(
        callable: impl Into<String>,
        receiver: Option<VariableRef>,
        args: Vec<VariableRef>,
        return_type: ValueType,
    ) -> Self {
        Self {
            kind: StatementKind::Call {
                callable: callable.into(),
                receiver,
                args,
            },
            return_type,
            assertions: Vec::new(),
        }
    }

    pub const fn kind(&self) -> &StatementKind {
        &self.kind
    }

    pub(crate) fn kind_mut(&mut self) -> &mut StatementKind {
        &mut self.kind
    }

    pub const fn return_type(&self) -> &ValueType {
        &self.return_type
    }

    pub fn assertions(&self) -> &[Assertion] {
        &self.assertions
    }

    /// Attach an assertion unless an equal one is already present.
    pub fn add_assertion(&mut self, assertion: Assertion) -> bool {
        if self.assertions.contains(&assertion) {
            return false;
        }
        self.assertions.push(assertion);
        true
    }

    pub fn clear_assertions(&mut self) {
        self.assertions.clear();
    }

    /// Variables this statement reads (receiver first, then arguments).
    pub fn references(&self) -> Vec<VariableRef> {
        match &self.kind {
            StatementKind::Primitive(_) => Vec::new(),
            StatementKind::Call { receiver, args, .. } => {
                receiver.iter().chain(args.iter()).copied().collect()
            }
        }
    }

    /// Clone into `target`, shifting every reference by `offset`.
    pub fn clone_into(&self, target: &TestCase, offset: isize) -> Self {
        let kind = match &self.kind {
            StatementKind::Primitive(value) => StatementKind::Primitive(value.clone()),
            StatementKind::Call {
                callable,
                receiver,
                args,
            } => StatementKind::Call {
                callable: callable.clone(),
                receiver: receiver.map(|r| r.clone_into(target, offset)),
                args: args.iter().map(|a| a.clone_into(target, offset)).collect(),
            },
        };
        Self {
            kind,
            return_type: self.return_type.clone(),
            assertions: self
                .assertions
                .iter()
                .map(|a| a.clone_into(target, offset))
                .collect(),
        }
    }

    /// Rewrite every reference (arguments and assertion sources) through `map`.
    ///
    /// Assertions whose source maps to `None` are dropped.
    pub(crate) fn remap_references(&mut self, map: impl Fn(VariableRef) -> Option<VariableRef>) {
        if let StatementKind::Call { receiver, args, .. } = &mut self.kind {
            if let Some(r) = receiver.as_mut() {
                if let Some(mapped) = map(*r) {
                    *r = mapped;
                }
            }
            for arg in args.iter_mut() {
                if let Some(mapped) = map(*arg) {
                    *arg = mapped;
                }
            }
        }
        self.assertions = std::mem::take(&mut self.assertions)
            .into_iter()
            .filter_map(|a| match a.source() {
                None => Some(a),
                Some(source) => map(source).map(|mapped| a.with_source(Some(mapped))),
            })
            .collect();
    }
}

impl fmt::Display for Statement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            StatementKind::Primitive(value) => write!(f, "{value}"),
            StatementKind::Call {
                callable,
                receiver,
                args,
            } => {
                if let Some(r) = receiver {
                    write!(f, "{r}.")?;
                }
                write!(f, "{callable}(")?;
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{arg}")?;
                }
                write!(f, ")")
            }
        }
    }
}

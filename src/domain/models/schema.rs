use serde::{Deserialize, Serialize};

use super::value::ValueType;

/// How a callable is invoked.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CallableKind {
    /// Creates an instance of `type_name`.
    Constructor { type_name: String },
    /// Invoked on an instance of `owner`.
    Method { owner: String },
    Function,
}

/// A constructor, method or function the generated tests may call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallableSpec {
    pub name: String,
    pub kind: CallableKind,
    pub parameters: Vec<ValueType>,
    pub returns: ValueType,
}

impl CallableSpec {
    pub fn constructor(type_name: impl Into<String>, parameters: Vec<ValueType>) -> Self {
        let type_name = type_name.into();
        Self {
            name: type_name.clone(),
            returns: ValueType::Object(type_name.clone()),
            kind: CallableKind::Constructor { type_name },
            parameters,
        }
    }

    pub fn method(
        owner: impl Into<String>,
        name: impl Into<String>,
        parameters: Vec<ValueType>,
        returns: ValueType,
    ) -> Self {
        Self {
            name: name.into(),
            kind: CallableKind::Method {
                owner: owner.into(),
            },
            parameters,
            returns,
        }
    }

    pub fn function(name: impl Into<String>, parameters: Vec<ValueType>, returns: ValueType) -> Self {
        Self {
            name: name.into(),
            kind: CallableKind::Function,
            parameters,
            returns,
        }
    }
}

/// What a target exposes to test generation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetSchema {
    pub module: String,
    pub callables: Vec<CallableSpec>,
}

impl TargetSchema {
    pub fn callable(&self, name: &str) -> Option<&CallableSpec> {
        self.callables.iter().find(|c| c.name == name)
    }

    /// A constructor producing `type_name`, if the target has one.
    pub fn constructor_for(&self, type_name: &str) -> Option<&CallableSpec> {
        self.callables.iter().find(|c| {
            matches!(&c.kind, CallableKind::Constructor { type_name: t } if t == type_name)
        })
    }
}

use std::cmp::Ordering;

use bonsai_core::{Blackboard, Value};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Inequality {
    #[default]
    #[serde(alias = "==")]
    Equal,
    #[serde(alias = "!=")]
    NotEqual,
    #[serde(alias = "<")]
    Less,
    #[serde(alias = "<=")]
    LessEqual,
    #[serde(alias = ">")]
    Greater,
    #[serde(alias = ">=")]
    GreaterEqual,
}

impl Inequality {
    /// Equality works on any pair of values; orderings only between numbers or between texts.
    pub fn holds(self, lhs: &Value, rhs: &Value) -> bool {
        match self {
            Inequality::Equal => values_equal(lhs, rhs),
            Inequality::NotEqual => !values_equal(lhs, rhs),
            Inequality::Less => compare(lhs, rhs) == Some(Ordering::Less),
            Inequality::LessEqual => {
                matches!(compare(lhs, rhs), Some(Ordering::Less | Ordering::Equal))
            }
            Inequality::Greater => compare(lhs, rhs) == Some(Ordering::Greater),
            Inequality::GreaterEqual => {
                matches!(compare(lhs, rhs), Some(Ordering::Greater | Ordering::Equal))
            }
        }
    }

    pub fn symbol(self) -> &'static str {
        match self {
            Inequality::Equal => "==",
            Inequality::NotEqual => "!=",
            Inequality::Less => "<",
            Inequality::LessEqual => "<=",
            Inequality::Greater => ">",
            Inequality::GreaterEqual => ">=",
        }
    }
}

fn values_equal(lhs: &Value, rhs: &Value) -> bool {
    match (lhs, rhs) {
        (Value::Int(_), Value::Float(_)) | (Value::Float(_), Value::Int(_)) => {
            compare(lhs, rhs) == Some(Ordering::Equal)
        }
        _ => lhs == rhs,
    }
}

fn compare(lhs: &Value, rhs: &Value) -> Option<Ordering> {
    match (lhs, rhs) {
        (Value::Int(a), Value::Int(b)) => Some(a.cmp(b)),
        (Value::Text(a), Value::Text(b)) => Some(a.cmp(b)),
        _ => lhs.as_f64()?.partial_cmp(&rhs.as_f64()?),
    }
}

/// Predicate over the blackboard, shared by condition leaves and conditional aborts.
///
/// A missing key never satisfies a condition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ConditionSpec {
    IsSet {
        key: String,
    },
    CompareEntries {
        key1: String,
        key2: String,
        #[serde(default)]
        inequality: Inequality,
    },
    CompareValue {
        key: String,
        value: Value,
        #[serde(default)]
        inequality: Inequality,
    },
}

impl ConditionSpec {
    pub fn evaluate(&self, blackboard: &Blackboard) -> bool {
        match self {
            ConditionSpec::IsSet { key } => blackboard.is_set(key),
            ConditionSpec::CompareEntries {
                key1,
                key2,
                inequality,
            } => match (blackboard.get(key1), blackboard.get(key2)) {
                (Ok(a), Ok(b)) => inequality.holds(&a, &b),
                _ => false,
            },
            ConditionSpec::CompareValue {
                key,
                value,
                inequality,
            } => blackboard
                .get(key)
                .is_ok_and(|current| inequality.holds(&current, value)),
        }
    }

    /// Keys whose changes can flip the result.
    pub fn keys(&self) -> Vec<String> {
        match self {
            ConditionSpec::IsSet { key } | ConditionSpec::CompareValue { key, .. } => {
                vec![key.clone()]
            }
            ConditionSpec::CompareEntries { key1, key2, .. } => vec![key1.clone(), key2.clone()],
        }
    }

    pub fn describe(&self) -> String {
        match self {
            ConditionSpec::IsSet { key } => format!("is_set({key})"),
            ConditionSpec::CompareEntries {
                key1,
                key2,
                inequality,
            } => format!("{key1} {} {key2}", inequality.symbol()),
            ConditionSpec::CompareValue {
                key,
                value,
                inequality,
            } => format!("{key} {} {value}", inequality.symbol()),
        }
    }
}

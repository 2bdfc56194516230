//! Option values carried inside a generation request.
//!
//! The server reads `userData` as a single-quoted, JSON-like object. Every
//! value a request can carry is one of the `OptionValue` variants, and
//! [`serialize`] is the only place that knows how each one is written.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::types::{DataSource, TemplateType};

/// A single request option value.
#[derive(Debug, Clone, PartialEq)]
pub enum OptionValue {
    Str(String),
    Int(i64),
    Bool(bool),
    Set(BTreeSet<String>),
    SetMap(BTreeMap<String, BTreeSet<String>>),
    DataSource(DataSource),
    Template(TemplateType),
    Object(BTreeMap<String, OptionValue>),
}

impl OptionValue {
    /// Plain JSON projection, used by the feedback payload.
    pub fn to_json(&self) -> Value {
        match self {
            OptionValue::Str(s) => json!(s),
            OptionValue::Int(i) => json!(i),
            OptionValue::Bool(b) => json!(b),
            OptionValue::Set(set) => json!(set),
            OptionValue::SetMap(map) => json!(map),
            OptionValue::DataSource(d) => json!(d.url_param()),
            OptionValue::Template(t) => json!(t.url_param()),
            OptionValue::Object(map) => Value::Object(
                map.iter()
                    .map(|(k, v)| (k.clone(), v.to_json()))
                    .collect(),
            ),
        }
    }
}

impl From<&str> for OptionValue {
    fn from(v: &str) -> Self {
        OptionValue::Str(v.to_string())
    }
}

impl From<String> for OptionValue {
    fn from(v: String) -> Self {
        OptionValue::Str(v)
    }
}

impl From<i64> for OptionValue {
    fn from(v: i64) -> Self {
        OptionValue::Int(v)
    }
}

impl From<u32> for OptionValue {
    fn from(v: u32) -> Self {
        OptionValue::Int(v as i64)
    }
}

impl From<bool> for OptionValue {
    fn from(v: bool) -> Self {
        OptionValue::Bool(v)
    }
}

impl From<BTreeSet<String>> for OptionValue {
    fn from(v: BTreeSet<String>) -> Self {
        OptionValue::Set(v)
    }
}

impl From<DataSource> for OptionValue {
    fn from(v: DataSource) -> Self {
        OptionValue::DataSource(v)
    }
}

impl From<TemplateType> for OptionValue {
    fn from(v: TemplateType) -> Self {
        OptionValue::Template(v)
    }
}

/// Serialize an option value in the server's single-quoted notation.
pub fn serialize(value: &OptionValue) -> String {
    match value {
        OptionValue::Str(s) => quote(s),
        OptionValue::Int(i) => quote(&i.to_string()),
        OptionValue::Bool(b) => quote(if *b { "true" } else { "false" }),
        OptionValue::Set(set) => serialize_list(set.iter()),
        OptionValue::SetMap(map) => {
            let entries: Vec<String> = map
                .iter()
                .map(|(k, set)| format!("{}:{}", quote(k), serialize_list(set.iter())))
                .collect();
            format!("{{{}}}", entries.join(","))
        }
        OptionValue::DataSource(d) => quote(d.url_param()),
        OptionValue::Template(t) => quote(t.url_param()),
        OptionValue::Object(map) => {
            let entries: Vec<String> = map.iter().map(|(k, v)| serialize_entry(k, v)).collect();
            format!("{{{}}}", entries.join(","))
        }
    }
}

/// Serialize a `'key':value` pair.
pub fn serialize_entry(key: &str, value: &OptionValue) -> String {
    format!("{}:{}", quote(key), serialize(value))
}

fn quote(s: &str) -> String {
    format!("'{s}'")
}

fn serialize_list<'a>(items: impl Iterator<Item = &'a String>) -> String {
    let items: Vec<String> = items.map(|s| quote(s)).collect();
    format!("[{}]", items.join(","))
}

fn set_of<I, S>(names: I) -> BTreeSet<String>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    names.into_iter().map(Into::into).collect()
}

// ── Option slots ─────────────────────────────────────────────────────

/// Which model constraints the generator must respect.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Constraints {
    All,
    None,
    Selected(BTreeSet<String>),
}

impl Constraints {
    pub fn selected<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Constraints::Selected(set_of(names))
    }

    pub fn to_option(&self) -> OptionValue {
        match self {
            Constraints::All => OptionValue::Str("ALL".into()),
            Constraints::None => OptionValue::Str("NONE".into()),
            Constraints::Selected(set) => OptionValue::Set(set.clone()),
        }
    }
}

/// Which choices of each argument the generator may use.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Choices {
    All,
    /// Argument name -> selected choice names.
    Selected(BTreeMap<String, BTreeSet<String>>),
}

impl Choices {
    pub fn selected<I, K, C, S>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, C)>,
        K: Into<String>,
        C: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Choices::Selected(
            entries
                .into_iter()
                .map(|(arg, choices)| (arg.into(), set_of(choices)))
                .collect(),
        )
    }

    pub fn to_option(&self) -> OptionValue {
        match self {
            Choices::All => OptionValue::Str("ALL".into()),
            Choices::Selected(map) => OptionValue::SetMap(map.clone()),
        }
    }
}

/// Test suites replayed by a static generation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TestSuites {
    All,
    Selected(BTreeSet<String>),
}

impl TestSuites {
    pub fn selected<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        TestSuites::Selected(set_of(names))
    }

    pub fn to_option(&self) -> OptionValue {
        match self {
            TestSuites::All => OptionValue::Str("ALL".into()),
            TestSuites::Selected(set) => OptionValue::Set(set.clone()),
        }
    }
}

use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum ArgumentError {
    #[error("Invalid argument name: '{0}'")]
    InvalidName(String),

    #[error("Argument index {index} out of range ({len} arguments)")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("Cannot parse '{value}' as {type_tag}")]
    Parse { type_tag: String, value: String },

    #[error("Argument '{name}' of type {type_tag} cannot be read as {requested}")]
    TypeMismatch {
        name: String,
        type_tag: String,
        requested: &'static str,
    },
}

/// One positional argument: declared name, declared type tag, raw value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Argument {
    pub name: String,
    pub type_tag: String,
    pub value: String,
}

/// A value parsed according to its type tag.
#[derive(Debug, Clone, PartialEq)]
pub enum ArgValue {
    String(String),
    Char(char),
    Byte(i8),
    Short(i16),
    Int(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    Boolean(bool),
}

impl ArgValue {
    /// Parse a raw value per type tag. Unknown tags read as strings.
    pub fn parse(type_tag: &str, raw: &str) -> Result<Self, ArgumentError> {
        let err = || ArgumentError::Parse {
            type_tag: type_tag.to_string(),
            value: raw.to_string(),
        };

        let value = match type_tag {
            "String" | "java.lang.String" => ArgValue::String(raw.to_string()),
            "char" => ArgValue::Char(raw.chars().next().ok_or_else(err)?),
            "byte" => ArgValue::Byte(raw.trim().parse().map_err(|_| err())?),
            "short" => ArgValue::Short(raw.trim().parse().map_err(|_| err())?),
            "int" => ArgValue::Int(raw.trim().parse().map_err(|_| err())?),
            "long" => ArgValue::Long(raw.trim().parse().map_err(|_| err())?),
            "float" => ArgValue::Float(raw.trim().parse().map_err(|_| err())?),
            "double" => ArgValue::Double(raw.trim().parse().map_err(|_| err())?),
            "boolean" => ArgValue::Boolean(raw == "true"),
            other => {
                tracing::warn!(
                    "Unknown parameter type: {other}. Converting the parameter to String"
                );
                ArgValue::String(raw.to_string())
            }
        };
        Ok(value)
    }

    fn as_i64(&self) -> Option<i64> {
        match self {
            ArgValue::Byte(v) => Some(*v as i64),
            ArgValue::Short(v) => Some(*v as i64),
            ArgValue::Int(v) => Some(*v as i64),
            ArgValue::Long(v) => Some(*v),
            _ => None,
        }
    }

    fn as_f64(&self) -> Option<f64> {
        match self {
            ArgValue::Float(v) => Some(*v as f64),
            ArgValue::Double(v) => Some(*v),
            other => other.as_i64().map(|v| v as f64),
        }
    }
}

/// Rust types readable from an argument.
pub trait FromArgument: Sized {
    const TYPE_NAME: &'static str;

    fn from_value(value: ArgValue) -> Option<Self>;

    fn from_argument(argument: &Argument) -> Result<Self, ArgumentError> {
        let value = ArgValue::parse(&argument.type_tag, &argument.value)?;
        Self::from_value(value).ok_or_else(|| ArgumentError::TypeMismatch {
            name: argument.name.clone(),
            type_tag: argument.type_tag.clone(),
            requested: Self::TYPE_NAME,
        })
    }
}

impl FromArgument for String {
    const TYPE_NAME: &'static str = "String";

    fn from_value(value: ArgValue) -> Option<Self> {
        match value {
            ArgValue::String(s) => Some(s),
            _ => None,
        }
    }

    // Every argument has a string form: its raw value.
    fn from_argument(argument: &Argument) -> Result<Self, ArgumentError> {
        Ok(argument.value.clone())
    }
}

impl FromArgument for char {
    const TYPE_NAME: &'static str = "char";

    fn from_value(value: ArgValue) -> Option<Self> {
        match value {
            ArgValue::Char(c) => Some(c),
            _ => None,
        }
    }
}

impl FromArgument for bool {
    const TYPE_NAME: &'static str = "bool";

    fn from_value(value: ArgValue) -> Option<Self> {
        match value {
            ArgValue::Boolean(b) => Some(b),
            _ => None,
        }
    }
}

impl FromArgument for f32 {
    const TYPE_NAME: &'static str = "f32";

    fn from_value(value: ArgValue) -> Option<Self> {
        value.as_f64().map(|v| v as f32)
    }
}

impl FromArgument for f64 {
    const TYPE_NAME: &'static str = "f64";

    fn from_value(value: ArgValue) -> Option<Self> {
        value.as_f64()
    }
}

macro_rules! integer_from_argument {
    ($($ty:ty),*) => {
        $(
            impl FromArgument for $ty {
                const TYPE_NAME: &'static str = stringify!($ty);

                fn from_value(value: ArgValue) -> Option<Self> {
                    value.as_i64().and_then(|v| <$ty>::try_from(v).ok())
                }
            }
        )*
    };
}

integer_from_argument!(i8, i16, i32, i64);

/// Positional or named lookup key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArgKey<'a> {
    Index(usize),
    Name(&'a str),
}

impl From<usize> for ArgKey<'_> {
    fn from(index: usize) -> Self {
        ArgKey::Index(index)
    }
}

impl From<i32> for ArgKey<'_> {
    fn from(index: i32) -> Self {
        ArgKey::Index(usize::try_from(index).unwrap_or(usize::MAX))
    }
}

impl<'a> From<&'a str> for ArgKey<'a> {
    fn from(name: &'a str) -> Self {
        ArgKey::Name(name)
    }
}

impl<'a> From<&'a String> for ArgKey<'a> {
    fn from(name: &'a String) -> Self {
        ArgKey::Name(name)
    }
}

/// Ordered, named, typed arguments of one test case.
///
/// Values stay in their raw string form and are parsed on every access.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestArguments {
    arguments: Vec<Argument>,
}

impl TestArguments {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(
        &mut self,
        name: impl Into<String>,
        type_tag: impl Into<String>,
        value: impl Into<String>,
    ) {
        self.arguments.push(Argument {
            name: name.into(),
            type_tag: type_tag.into(),
            value: value.into(),
        });
    }

    pub fn len(&self) -> usize {
        self.arguments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.arguments.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Argument> {
        self.arguments.iter()
    }

    pub fn names(&self) -> Vec<&str> {
        self.arguments.iter().map(|a| a.name.as_str()).collect()
    }

    pub fn types(&self) -> Vec<&str> {
        self.arguments.iter().map(|a| a.type_tag.as_str()).collect()
    }

    /// Look up an argument by position or name.
    pub fn argument<'k>(&self, key: impl Into<ArgKey<'k>>) -> Result<&Argument, ArgumentError> {
        match key.into() {
            ArgKey::Index(index) => {
                self.arguments
                    .get(index)
                    .ok_or(ArgumentError::IndexOutOfRange {
                        index,
                        len: self.arguments.len(),
                    })
            }
            ArgKey::Name(name) => self
                .arguments
                .iter()
                .find(|a| a.name == name)
                .ok_or_else(|| ArgumentError::InvalidName(name.to_string())),
        }
    }

    /// Parse an argument into `T` according to its type tag.
    pub fn get<'k, T: FromArgument>(&self, key: impl Into<ArgKey<'k>>) -> Result<T, ArgumentError> {
        T::from_argument(self.argument(key)?)
    }

    /// Parsed value in the variant matching its type tag.
    pub fn value<'k>(&self, key: impl Into<ArgKey<'k>>) -> Result<ArgValue, ArgumentError> {
        let argument = self.argument(key)?;
        ArgValue::parse(&argument.type_tag, &argument.value)
    }

    pub fn get_string<'k>(&self, key: impl Into<ArgKey<'k>>) -> Result<String, ArgumentError> {
        self.get(key)
    }

    pub fn get_char<'k>(&self, key: impl Into<ArgKey<'k>>) -> Result<char, ArgumentError> {
        self.get(key)
    }

    pub fn get_bool<'k>(&self, key: impl Into<ArgKey<'k>>) -> Result<bool, ArgumentError> {
        self.get(key)
    }

    pub fn get_int<'k>(&self, key: impl Into<ArgKey<'k>>) -> Result<i32, ArgumentError> {
        self.get(key)
    }

    pub fn get_long<'k>(&self, key: impl Into<ArgKey<'k>>) -> Result<i64, ArgumentError> {
        self.get(key)
    }

    pub fn get_float<'k>(&self, key: impl Into<ArgKey<'k>>) -> Result<f32, ArgumentError> {
        self.get(key)
    }

    pub fn get_double<'k>(&self, key: impl Into<ArgKey<'k>>) -> Result<f64, ArgumentError> {
        self.get(key)
    }
}

impl<'a> IntoIterator for &'a TestArguments {
    type Item = &'a Argument;
    type IntoIter = std::slice::Iter<'a, Argument>;

    fn into_iter(self) -> Self::IntoIter {
        self.arguments.iter()
    }
}

impl fmt::Display for TestArguments {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for argument in &self.arguments {
            write!(f, "{} {} = {}; ", argument.type_tag, argument.name, argument.value)?;
        }
        Ok(())
    }
}

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

#[derive(Debug, thiserror::Error)]
#[error("Unknown {kind}: '{value}'")]
pub struct UnknownVariant {
    pub kind: &'static str,
    pub value: String,
}

// ── Generation strategy ──────────────────────────────────────────────

/// Generation strategy requested from the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataSource {
    /// Replay of test suites stored in the model.
    Static,
    /// N-wise combinatorial coverage.
    NWise,
    /// Full cartesian product of all choices.
    Cartesian,
    /// Random sampling.
    Random,
}

impl DataSource {
    /// Value used for `dataSource` in the request and `generatorType` in feedback.
    pub fn url_param(self) -> &'static str {
        match self {
            DataSource::Static => "static",
            DataSource::NWise => "genNWise",
            DataSource::Cartesian => "genCartesian",
            DataSource::Random => "genRandom",
        }
    }
}

impl fmt::Display for DataSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.url_param())
    }
}

impl FromStr for DataSource {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "static" => Ok(DataSource::Static),
            "genNWise" => Ok(DataSource::NWise),
            "genCartesian" => Ok(DataSource::Cartesian),
            "genRandom" => Ok(DataSource::Random),
            other => Err(UnknownVariant {
                kind: "data source",
                value: other.to_string(),
            }),
        }
    }
}

// ── Export templates ─────────────────────────────────────────────────

/// Output formatting requested for an export.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TemplateType {
    #[default]
    #[serde(rename = "CSV")]
    Csv,
    #[serde(rename = "XML")]
    Xml,
    Gherkin,
    #[serde(rename = "JSON")]
    Json,
    /// Unformatted stream: the export is issued as a plain data request.
    #[serde(rename = "RAW")]
    Raw,
}

impl TemplateType {
    pub fn url_param(self) -> &'static str {
        match self {
            TemplateType::Csv => "CSV",
            TemplateType::Xml => "XML",
            TemplateType::Gherkin => "Gherkin",
            TemplateType::Json => "JSON",
            TemplateType::Raw => "RAW",
        }
    }
}

impl fmt::Display for TemplateType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.url_param())
    }
}

impl FromStr for TemplateType {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "csv" => Ok(TemplateType::Csv),
            "xml" => Ok(TemplateType::Xml),
            "gherkin" => Ok(TemplateType::Gherkin),
            "json" => Ok(TemplateType::Json),
            "raw" => Ok(TemplateType::Raw),
            _ => Err(UnknownVariant {
                kind: "template",
                value: s.to_string(),
            }),
        }
    }
}

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::options::{Choices, Constraints, OptionValue, TestSuites};
use crate::types::{DataSource, TemplateType};

/// Settings shared by every generator kind.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CommonParams {
    /// Overrides the provider's default model for this request.
    pub model: Option<String>,
    pub constraints: Option<Constraints>,
    pub choices: Option<Choices>,
    /// Label attached to the feedback session.
    pub label: Option<String>,
    /// Free-form metadata attached to the feedback session.
    pub custom: BTreeMap<String, String>,
    /// Whether verdicts are reported back once every test case is resolved.
    pub feedback: bool,
    /// Export template. Ignored by generate requests.
    pub template: Option<TemplateType>,
}

/// A fully resolved request: generator kind, its properties, and the shared settings.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationRequest {
    pub data_source: DataSource,
    pub properties: BTreeMap<String, OptionValue>,
    pub common: CommonParams,
    pub test_suites: Option<TestSuites>,
}

impl GenerationRequest {
    /// Entries of the `userData` object, in key order.
    pub fn user_data(&self) -> BTreeMap<String, OptionValue> {
        let mut data = BTreeMap::new();
        if let Some(choices) = &self.common.choices {
            data.insert("choices".to_string(), choices.to_option());
        }
        if let Some(constraints) = &self.common.constraints {
            data.insert("constraints".to_string(), constraints.to_option());
        }
        data.insert(
            "dataSource".to_string(),
            OptionValue::DataSource(self.data_source),
        );
        data.insert(
            "properties".to_string(),
            OptionValue::Object(self.properties.clone()),
        );
        if let Some(suites) = &self.test_suites {
            data.insert("testSuites".to_string(), suites.to_option());
        }
        data
    }

    /// Human-readable generator options, e.g. `coverage=100, n=2`.
    pub fn generator_options(&self) -> String {
        self.properties
            .iter()
            .map(|(k, v)| match v {
                OptionValue::Str(s) => format!("{k}={s}"),
                OptionValue::Int(i) => format!("{k}={i}"),
                OptionValue::Bool(b) => format!("{k}={b}"),
                other => format!("{k}={}", other.to_json()),
            })
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// Common interface of the per-generator parameter structs.
///
/// The provided methods are chainable setters for the shared settings:
///
/// ```
/// use ecfeed_params::{Constraints, GeneratorParams, NWiseParams};
///
/// let params = NWiseParams::default()
///     .n(3)
///     .constraints(Constraints::None)
///     .label("nightly")
///     .feedback(true);
/// assert_eq!(params.n, 3);
/// ```
pub trait GeneratorParams: Sized {
    fn data_source(&self) -> DataSource;

    fn properties(&self) -> BTreeMap<String, OptionValue>;

    fn common(&self) -> &CommonParams;

    fn common_mut(&mut self) -> &mut CommonParams;

    fn selected_suites(&self) -> Option<&TestSuites> {
        None
    }

    fn to_request(&self) -> GenerationRequest {
        GenerationRequest {
            data_source: self.data_source(),
            properties: self.properties(),
            common: self.common().clone(),
            test_suites: self.selected_suites().cloned(),
        }
    }

    fn model(mut self, model: impl Into<String>) -> Self {
        self.common_mut().model = Some(model.into());
        self
    }

    fn constraints(mut self, constraints: Constraints) -> Self {
        self.common_mut().constraints = Some(constraints);
        self
    }

    fn choices(mut self, choices: Choices) -> Self {
        self.common_mut().choices = Some(choices);
        self
    }

    fn label(mut self, label: impl Into<String>) -> Self {
        self.common_mut().label = Some(label.into());
        self
    }

    fn custom(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.common_mut().custom.insert(key.into(), value.into());
        self
    }

    fn feedback(mut self, enabled: bool) -> Self {
        self.common_mut().feedback = enabled;
        self
    }

    fn template(mut self, template: TemplateType) -> Self {
        self.common_mut().template = Some(template);
        self
    }
}

// ── N-wise ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NWiseParams {
    pub n: u32,
    /// Percentage of n-tuples to cover.
    pub coverage: u32,
    #[serde(flatten)]
    pub common: CommonParams,
}

impl Default for NWiseParams {
    fn default() -> Self {
        Self {
            n: 2,
            coverage: 100,
            common: CommonParams::default(),
        }
    }
}

impl NWiseParams {
    pub fn n(mut self, n: u32) -> Self {
        self.n = n;
        self
    }

    pub fn coverage(mut self, coverage: u32) -> Self {
        self.coverage = coverage;
        self
    }
}

impl GeneratorParams for NWiseParams {
    fn data_source(&self) -> DataSource {
        DataSource::NWise
    }

    fn properties(&self) -> BTreeMap<String, OptionValue> {
        BTreeMap::from([
            ("n".to_string(), OptionValue::from(self.n)),
            ("coverage".to_string(), OptionValue::from(self.coverage)),
        ])
    }

    fn common(&self) -> &CommonParams {
        &self.common
    }

    fn common_mut(&mut self) -> &mut CommonParams {
        &mut self.common
    }
}

// ── Pairwise (n-wise with n = 2) ─────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PairwiseParams {
    pub coverage: u32,
    #[serde(flatten)]
    pub common: CommonParams,
}

impl Default for PairwiseParams {
    fn default() -> Self {
        Self {
            coverage: 100,
            common: CommonParams::default(),
        }
    }
}

impl PairwiseParams {
    pub fn coverage(mut self, coverage: u32) -> Self {
        self.coverage = coverage;
        self
    }
}

impl GeneratorParams for PairwiseParams {
    fn data_source(&self) -> DataSource {
        DataSource::NWise
    }

    fn properties(&self) -> BTreeMap<String, OptionValue> {
        BTreeMap::from([
            ("n".to_string(), OptionValue::Int(2)),
            ("coverage".to_string(), OptionValue::from(self.coverage)),
        ])
    }

    fn common(&self) -> &CommonParams {
        &self.common
    }

    fn common_mut(&mut self) -> &mut CommonParams {
        &mut self.common
    }
}

// ── Random ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RandomParams {
    /// Number of test cases to generate.
    pub length: u32,
    pub duplicates: bool,
    pub adaptive: bool,
    #[serde(flatten)]
    pub common: CommonParams,
}

impl Default for RandomParams {
    fn default() -> Self {
        Self {
            length: 100,
            duplicates: false,
            adaptive: true,
            common: CommonParams::default(),
        }
    }
}

impl RandomParams {
    pub fn length(mut self, length: u32) -> Self {
        self.length = length;
        self
    }

    pub fn duplicates(mut self, duplicates: bool) -> Self {
        self.duplicates = duplicates;
        self
    }

    pub fn adaptive(mut self, adaptive: bool) -> Self {
        self.adaptive = adaptive;
        self
    }
}

impl GeneratorParams for RandomParams {
    fn data_source(&self) -> DataSource {
        DataSource::Random
    }

    fn properties(&self) -> BTreeMap<String, OptionValue> {
        BTreeMap::from([
            ("length".to_string(), OptionValue::from(self.length)),
            ("duplicates".to_string(), OptionValue::from(self.duplicates)),
            ("adaptive".to_string(), OptionValue::from(self.adaptive)),
        ])
    }

    fn common(&self) -> &CommonParams {
        &self.common
    }

    fn common_mut(&mut self) -> &mut CommonParams {
        &mut self.common
    }
}

// ── Cartesian ────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CartesianParams {
    #[serde(flatten)]
    pub common: CommonParams,
}

impl GeneratorParams for CartesianParams {
    fn data_source(&self) -> DataSource {
        DataSource::Cartesian
    }

    fn properties(&self) -> BTreeMap<String, OptionValue> {
        BTreeMap::new()
    }

    fn common(&self) -> &CommonParams {
        &self.common
    }

    fn common_mut(&mut self) -> &mut CommonParams {
        &mut self.common
    }
}

// ── Static ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StaticParams {
    pub test_suites: TestSuites,
    #[serde(flatten)]
    pub common: CommonParams,
}

impl Default for StaticParams {
    fn default() -> Self {
        Self {
            test_suites: TestSuites::All,
            common: CommonParams::default(),
        }
    }
}

impl StaticParams {
    pub fn test_suites(mut self, suites: TestSuites) -> Self {
        self.test_suites = suites;
        self
    }
}

impl GeneratorParams for StaticParams {
    fn data_source(&self) -> DataSource {
        DataSource::Static
    }

    fn properties(&self) -> BTreeMap<String, OptionValue> {
        BTreeMap::new()
    }

    fn common(&self) -> &CommonParams {
        &self.common
    }

    fn common_mut(&mut self) -> &mut CommonParams {
        &mut self.common
    }

    fn selected_suites(&self) -> Option<&TestSuites> {
        Some(&self.test_suites)
    }
}

//! Tool registry: the closed set of tools, their specs, and input validation.
//!
//! Tools are a fixed enum ([`ToolKind`]) rather than runtime-registered trait objects.
//! [`ToolRegistry::new`] compiles every enabled tool's JSON schema once, so a bad schema
//! fails at startup instead of on the first call. [`ToolRegistry::validate`] checks a
//! model-supplied input against the schema and then deserializes it into the typed
//! [`ToolInvocation`] for that tool.

use std::collections::HashMap;

use serde::de::DeserializeOwned;
use serde_json::Value;

use super::calculator::{self, BinaryInput, DivideInput, SubtractInput};
use super::nasa::{self, SearchCategory, SearchInput};
use super::{ToolError, ToolSpec};

/// Every tool the assistant knows about.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ToolKind {
    Add,
    Subtract,
    Multiply,
    Divide,
    SearchPatents,
    SearchSoftware,
    SearchSpinoffs,
}

impl ToolKind {
    pub const ALL: [ToolKind; 7] = [
        ToolKind::Add,
        ToolKind::Subtract,
        ToolKind::Multiply,
        ToolKind::Divide,
        ToolKind::SearchPatents,
        ToolKind::SearchSoftware,
        ToolKind::SearchSpinoffs,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Self::Add => calculator::TOOL_ADD,
            Self::Subtract => calculator::TOOL_SUBTRACT,
            Self::Multiply => calculator::TOOL_MULTIPLY,
            Self::Divide => calculator::TOOL_DIVIDE,
            Self::SearchPatents => nasa::TOOL_SEARCH_PATENTS,
            Self::SearchSoftware => nasa::TOOL_SEARCH_SOFTWARE,
            Self::SearchSpinoffs => nasa::TOOL_SEARCH_SPINOFFS,
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.name() == name)
    }

    pub fn description(&self) -> &'static str {
        match self {
            Self::Add => "Add two numbers together.",
            Self::Subtract => "Subtract one number from another.",
            Self::Multiply => "Multiply two numbers together.",
            Self::Divide => "Divide one number by another.",
            Self::SearchPatents => "Search for NASA patents matching specific criteria.",
            Self::SearchSoftware => "Search for NASA software matching specific criteria.",
            Self::SearchSpinoffs => {
                "Search for NASA spinoff technologies matching specific criteria."
            }
        }
    }

    pub fn input_schema(&self) -> Value {
        match self {
            Self::Add => calculator::binary_schema("add"),
            Self::Multiply => calculator::binary_schema("multiply"),
            Self::Subtract => calculator::subtract_schema(),
            Self::Divide => calculator::divide_schema(),
            Self::SearchPatents => nasa::search_schema("patents"),
            Self::SearchSoftware => nasa::search_schema("software"),
            Self::SearchSpinoffs => nasa::search_schema("spinoff technologies"),
        }
    }

    pub fn spec(&self) -> ToolSpec {
        ToolSpec {
            name: self.name().to_string(),
            description: self.description().to_string(),
            input_schema: self.input_schema(),
        }
    }

    /// Search collection for the NASA tools; `None` for calculator tools.
    pub fn search_category(&self) -> Option<SearchCategory> {
        match self {
            Self::SearchPatents => Some(SearchCategory::Patent),
            Self::SearchSoftware => Some(SearchCategory::Software),
            Self::SearchSpinoffs => Some(SearchCategory::Spinoff),
            _ => None,
        }
    }
}

/// A validated, typed tool call.
#[derive(Clone, Debug, PartialEq)]
pub enum ToolInvocation {
    Add(BinaryInput),
    Subtract(SubtractInput),
    Multiply(BinaryInput),
    Divide(DivideInput),
    SearchPatents(SearchInput),
    SearchSoftware(SearchInput),
    SearchSpinoffs(SearchInput),
}

fn typed<T: DeserializeOwned>(kind: ToolKind, input: &Value) -> Result<T, ToolError> {
    serde_json::from_value(input.clone()).map_err(|e| ToolError::SchemaValidation {
        tool: kind.name().to_string(),
        message: e.to_string(),
    })
}

impl ToolInvocation {
    /// Deserializes `input` into the typed input of `kind`. Does not run the JSON schema;
    /// use [`ToolRegistry::validate`] for model-supplied input.
    pub fn from_input(kind: ToolKind, input: &Value) -> Result<Self, ToolError> {
        Ok(match kind {
            ToolKind::Add => Self::Add(typed(kind, input)?),
            ToolKind::Subtract => Self::Subtract(typed(kind, input)?),
            ToolKind::Multiply => Self::Multiply(typed(kind, input)?),
            ToolKind::Divide => Self::Divide(typed(kind, input)?),
            ToolKind::SearchPatents => Self::SearchPatents(typed(kind, input)?),
            ToolKind::SearchSoftware => Self::SearchSoftware(typed(kind, input)?),
            ToolKind::SearchSpinoffs => Self::SearchSpinoffs(typed(kind, input)?),
        })
    }

    pub fn kind(&self) -> ToolKind {
        match self {
            Self::Add(_) => ToolKind::Add,
            Self::Subtract(_) => ToolKind::Subtract,
            Self::Multiply(_) => ToolKind::Multiply,
            Self::Divide(_) => ToolKind::Divide,
            Self::SearchPatents(_) => ToolKind::SearchPatents,
            Self::SearchSoftware(_) => ToolKind::SearchSoftware,
            Self::SearchSpinoffs(_) => ToolKind::SearchSpinoffs,
        }
    }
}

/// Named groups of tools selectable by configuration.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum Toolset {
    Calculator,
    Nasa,
    #[default]
    All,
}

impl Toolset {
    pub fn kinds(&self) -> Vec<ToolKind> {
        match self {
            Self::Calculator => vec![
                ToolKind::Add,
                ToolKind::Subtract,
                ToolKind::Multiply,
                ToolKind::Divide,
            ],
            Self::Nasa => vec![
                ToolKind::SearchPatents,
                ToolKind::SearchSoftware,
                ToolKind::SearchSpinoffs,
            ],
            Self::All => ToolKind::ALL.to_vec(),
        }
    }
}

impl std::str::FromStr for Toolset {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "calculator" => Ok(Self::Calculator),
            "nasa" => Ok(Self::Nasa),
            "all" => Ok(Self::All),
            _ => Err(format!(
                "unknown toolset: {} (use calculator, nasa, or all)",
                s
            )),
        }
    }
}

/// The enabled tools with their specs and compiled schema validators.
pub struct ToolRegistry {
    specs: Vec<ToolSpec>,
    validators: HashMap<ToolKind, jsonschema::Validator>,
}

impl ToolRegistry {
    /// Builds a registry for `kinds`, compiling each input schema.
    ///
    /// Duplicate kinds are ignored after the first. Fails with
    /// [`ToolError::InvalidSchema`] when a schema does not compile.
    pub fn new(kinds: impl IntoIterator<Item = ToolKind>) -> Result<Self, ToolError> {
        let mut specs = Vec::new();
        let mut validators = HashMap::new();
        for kind in kinds {
            if validators.contains_key(&kind) {
                continue;
            }
            let spec = kind.spec();
            let validator =
                jsonschema::validator_for(&spec.input_schema).map_err(|e| {
                    ToolError::InvalidSchema {
                        tool: spec.name.clone(),
                        message: e.to_string(),
                    }
                })?;
            validators.insert(kind, validator);
            specs.push(spec);
        }
        Ok(Self { specs, validators })
    }

    pub fn for_toolset(toolset: Toolset) -> Result<Self, ToolError> {
        Self::new(toolset.kinds())
    }

    pub fn calculator() -> Result<Self, ToolError> {
        Self::for_toolset(Toolset::Calculator)
    }

    pub fn nasa() -> Result<Self, ToolError> {
        Self::for_toolset(Toolset::Nasa)
    }

    pub fn all() -> Result<Self, ToolError> {
        Self::for_toolset(Toolset::All)
    }

    /// Specs in registration order, as sent to the model.
    pub fn specs(&self) -> &[ToolSpec] {
        &self.specs
    }

    /// Enabled tool with this name.
    pub fn get(&self, name: &str) -> Option<ToolKind> {
        ToolKind::from_name(name).filter(|k| self.validators.contains_key(k))
    }

    pub fn len(&self) -> usize {
        self.specs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }

    /// Checks `input` against the named tool's schema and returns the typed invocation.
    pub fn validate(&self, name: &str, input: &Value) -> Result<ToolInvocation, ToolError> {
        let kind = self
            .get(name)
            .ok_or_else(|| ToolError::UnknownTool(name.to_string()))?;
        let validator = self
            .validators
            .get(&kind)
            .ok_or_else(|| ToolError::UnknownTool(name.to_string()))?;
        let violations: Vec<String> = validator.iter_errors(input).map(|e| e.to_string()).collect();
        if !violations.is_empty() {
            return Err(ToolError::SchemaValidation {
                tool: name.to_string(),
                message: violations.join("; "),
            });
        }
        ToolInvocation::from_input(kind, input)
    }
}

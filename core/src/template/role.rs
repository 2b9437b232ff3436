//! Role meta-template: per-role framing rules and the validated role table.

use super::TemplateError;
use crate::dialogue::{ASSISTANT, ENVIRONMENT, SYSTEM, USER};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// How a role's begin phrase is produced.
///
/// `Plain` is a fixed prefix. `Named` picks between two templates depending on
/// whether the turn carries a speaker name; `{name}` in `with_name` is replaced
/// by the display form from `known`, or by the name itself when unlisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum BeginSpec {
    Plain(String),
    Named {
        with_name: String,
        without_name: String,
        #[serde(default)]
        known: HashMap<String, String>,
    },
}

impl BeginSpec {
    pub fn plain(s: impl Into<String>) -> Self {
        BeginSpec::Plain(s.into())
    }

    pub fn named(with_name: impl Into<String>, without_name: impl Into<String>) -> Self {
        BeginSpec::Named {
            with_name: with_name.into(),
            without_name: without_name.into(),
            known: HashMap::new(),
        }
    }

    /// Register a display substitution for a known speaker name.
    /// No effect on a `Plain` begin.
    pub fn alias(mut self, name: impl Into<String>, display: impl Into<String>) -> Self {
        if let BeginSpec::Named { known, .. } = &mut self {
            known.insert(name.into(), display.into());
        }
        self
    }
}

impl Default for BeginSpec {
    fn default() -> Self {
        BeginSpec::Plain(String::new())
    }
}

impl From<&str> for BeginSpec {
    fn from(s: &str) -> Self {
        BeginSpec::Plain(s.to_string())
    }
}

impl From<String> for BeginSpec {
    fn from(s: String) -> Self {
        BeginSpec::Plain(s)
    }
}

/// Framing rules for one role
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoleSpec {
    pub role: String,

    #[serde(default)]
    pub begin: BeginSpec,

    #[serde(default)]
    pub end: String,

    /// Render this role's turns with another role's framing (one hop)
    #[serde(default)]
    pub fallback_role: Option<String>,

    /// Terminal turns of this role leave the prompt open for the model
    #[serde(default)]
    pub generate: bool,
}

impl RoleSpec {
    pub fn new(role: impl Into<String>) -> Self {
        Self {
            role: role.into(),
            begin: BeginSpec::default(),
            end: String::new(),
            fallback_role: None,
            generate: false,
        }
    }

    pub fn begin(mut self, begin: impl Into<BeginSpec>) -> Self {
        self.begin = begin.into();
        self
    }

    pub fn end(mut self, end: impl Into<String>) -> Self {
        self.end = end.into();
        self
    }

    pub fn fallback(mut self, role: impl Into<String>) -> Self {
        self.fallback_role = Some(role.into());
        self
    }

    pub fn generates(mut self) -> Self {
        self.generate = true;
        self
    }

    /// Begin phrase for a turn, honoring the name-aware variants
    pub fn begin_phrase(&self, name: Option<&str>) -> String {
        match (&self.begin, name) {
            (BeginSpec::Plain(s), _) => s.clone(),
            (
                BeginSpec::Named {
                    with_name, known, ..
                },
                Some(name),
            ) => {
                let display = known.get(name).map(String::as_str).unwrap_or(name);
                with_name.replace("{name}", display)
            }
            (BeginSpec::Named { without_name, .. }, None) => without_name.clone(),
        }
    }
}

/// Validated, immutable map of role name to `RoleSpec`
#[derive(Debug, Clone)]
pub struct RoleTable {
    roles: HashMap<String, RoleSpec>,
}

impl RoleTable {
    /// Build a table, rejecting duplicate roles and dangling fallbacks
    pub fn new(specs: Vec<RoleSpec>) -> Result<Self, TemplateError> {
        let mut roles: HashMap<String, RoleSpec> = HashMap::with_capacity(specs.len());
        for spec in specs {
            if roles.contains_key(&spec.role) {
                return Err(TemplateError::DuplicateRole(spec.role));
            }
            roles.insert(spec.role.clone(), spec);
        }
        for spec in roles.values() {
            if let Some(fallback) = &spec.fallback_role {
                if !roles.contains_key(fallback) {
                    return Err(TemplateError::UnknownFallback {
                        role: spec.role.clone(),
                        fallback: fallback.clone(),
                    });
                }
            }
        }
        Ok(Self { roles })
    }

    /// The OpenAI chat table: system / user / assistant (generating), with
    /// environment turns rendered under the system role
    pub fn chat_default() -> Self {
        let specs = vec![
            RoleSpec::new(SYSTEM),
            RoleSpec::new(USER),
            RoleSpec::new(ASSISTANT).generates(),
            RoleSpec::new(ENVIRONMENT).fallback(SYSTEM),
        ];
        let mut roles = HashMap::with_capacity(specs.len());
        for spec in specs {
            roles.insert(spec.role.clone(), spec);
        }
        Self { roles }
    }

    pub fn get(&self, role: &str) -> Option<&RoleSpec> {
        self.roles.get(role)
    }

    /// Look up a role, following its fallback redirect at most one hop
    pub fn resolve(&self, role: &str) -> Result<&RoleSpec, TemplateError> {
        let spec = self
            .roles
            .get(role)
            .ok_or_else(|| TemplateError::UnknownRole(role.to_string()))?;
        match &spec.fallback_role {
            Some(fallback) => self
                .roles
                .get(fallback)
                .ok_or_else(|| TemplateError::UnknownRole(fallback.clone())),
            None => Ok(spec),
        }
    }

    pub fn contains(&self, role: &str) -> bool {
        self.roles.contains_key(role)
    }

    pub fn len(&self) -> usize {
        self.roles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.roles.is_empty()
    }
}

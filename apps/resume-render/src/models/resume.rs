//! Typed resume record.
//!
//! Records arrive as loosely-shaped JSON. `validation::into_record` checks the
//! shape once and builds these types, so formatters match exhaustively instead
//! of re-inspecting `serde_json::Value`s.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResumeRecord {
    pub personal_info: PersonalInfo,
    #[serde(default)]
    pub education: Vec<Education>,
    #[serde(default)]
    pub experience: Vec<Experience>,
    #[serde(default)]
    pub projects: Vec<Project>,
    #[serde(default)]
    pub skills: Vec<SkillCategory>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PersonalInfo {
    pub name: String,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub linkedin: Option<String>,
    pub github: Option<String>,
    /// Contact fields without a fixed slot in the header. Kept, never rendered.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub extra: BTreeMap<String, String>,
}

impl PersonalInfo {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Education {
    pub institution: String,
    pub location: Option<String>,
    pub degree: String,
    pub dates: String,
    #[serde(default)]
    pub details: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Experience {
    pub company: String,
    pub title: String,
    pub location: Option<String>,
    pub dates: String,
    /// Bullet text, order-significant.
    #[serde(default)]
    pub details: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Project {
    pub name: String,
    #[serde(default)]
    pub technologies: Technologies,
    #[serde(default)]
    pub details: Vec<String>,
}

/// Producers emit either `"Rust, Go"` or `["Rust", "Go"]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Technologies {
    Single(String),
    List(Vec<String>),
}

impl Default for Technologies {
    fn default() -> Self {
        Technologies::List(Vec::new())
    }
}

impl Technologies {
    /// Normalises to a sequence. A blank single string yields an empty list.
    pub fn as_list(&self) -> Vec<&str> {
        match self {
            Technologies::Single(s) if s.trim().is_empty() => Vec::new(),
            Technologies::Single(s) => vec![s.as_str()],
            Technologies::List(items) => items
                .iter()
                .map(String::as_str)
                .filter(|s| !s.trim().is_empty())
                .collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.as_list().is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkillCategory {
    pub name: String,
    pub group: SkillGroup,
}

/// A skills category is either a flat list or one level of named sub-categories.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkillGroup {
    Flat(Vec<String>),
    Nested(Vec<SkillSubgroup>),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkillSubgroup {
    pub name: String,
    pub items: Vec<String>,
}

impl SkillCategory {
    pub fn flat(name: impl Into<String>, items: &[&str]) -> Self {
        Self {
            name: name.into(),
            group: SkillGroup::Flat(items.iter().map(|s| s.to_string()).collect()),
        }
    }

    pub fn nested(name: impl Into<String>, subgroups: Vec<SkillSubgroup>) -> Self {
        Self {
            name: name.into(),
            group: SkillGroup::Nested(subgroups),
        }
    }
}

impl SkillSubgroup {
    pub fn new(name: impl Into<String>, items: &[&str]) -> Self {
        Self {
            name: name.into(),
            items: items.iter().map(|s| s.to_string()).collect(),
        }
    }
}

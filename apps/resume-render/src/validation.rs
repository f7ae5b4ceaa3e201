//! Record Validation — checks the shape of an incoming resume record and
//! builds the typed [`ResumeRecord`].
//!
//! # Rules
//! - The root must be a JSON object. Anything else is fatal (`MalformedInput`),
//!   reported before any field-level checks.
//! - `personal_info.name` is the only required field and must be non-empty.
//! - Sections (`education`, `experience`, `projects`) are optional arrays of
//!   objects; `null` counts as absent.
//! - Entry text fields must be strings (or `null`) when present.
//! - `skills` values are either an array of strings or an object whose values
//!   are arrays of strings.
//!
//! Checking and building happen in one walk so the two can never disagree.
//! Problems are collected, never raised, and the input is never mutated.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::errors::AppError;
use crate::models::{
    Education, Experience, PersonalInfo, Project, ResumeRecord, SkillCategory, SkillGroup,
    SkillSubgroup, Technologies,
};

/// Key some producers wrap the record in.
const ENVELOPE_KEY: &str = "customized_resume";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldProblem {
    /// Dotted path with array indices, e.g. `experience[1].details[0]`.
    pub path: String,
    pub reason: String,
}

impl FieldProblem {
    pub fn new(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            reason: reason.into(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationReport {
    pub problems: Vec<FieldProblem>,
}

impl ValidationReport {
    pub fn is_ok(&self) -> bool {
        self.problems.is_empty()
    }

    fn push(&mut self, path: impl Into<String>, reason: impl Into<String>) {
        self.problems.push(FieldProblem::new(path, reason));
    }
}

impl fmt::Display for ValidationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} problem(s)", self.problems.len())?;
        for (i, p) in self.problems.iter().enumerate() {
            let sep = if i == 0 { ": " } else { "; " };
            write!(f, "{sep}{}: {}", p.path, p.reason)?;
        }
        Ok(())
    }
}

/// Returns the inner record when it is wrapped as `{"customized_resume": {...}}`.
pub fn unwrap_envelope(value: &Value) -> &Value {
    match value.get(ENVELOPE_KEY) {
        Some(inner) if inner.is_object() => inner,
        _ => value,
    }
}

/// Checks a raw record. `Ok` carries the (possibly empty) list of problems.
pub fn validate(raw: &Value) -> Result<ValidationReport, AppError> {
    let mut report = ValidationReport::default();
    build_record(raw, &mut report)?;
    Ok(report)
}

/// Validates and converts a raw record. Any problem rejects the whole record.
pub fn into_record(raw: &Value) -> Result<ResumeRecord, AppError> {
    let mut report = ValidationReport::default();
    let record = build_record(raw, &mut report)?;
    if report.is_ok() {
        Ok(record)
    } else {
        Err(AppError::Validation(report))
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Walkers
// ────────────────────────────────────────────────────────────────────────────

fn build_record(raw: &Value, report: &mut ValidationReport) -> Result<ResumeRecord, AppError> {
    let root = raw.as_object().ok_or_else(|| {
        AppError::MalformedInput(format!(
            "resume record must be a JSON object, found {}",
            kind_of(raw)
        ))
    })?;

    let personal_info = build_personal_info(root.get("personal_info"), report);
    let education = build_entries(root, "education", report, build_education);
    let experience = build_entries(root, "experience", report, build_experience);
    let projects = build_entries(root, "projects", report, build_project);
    let skills = build_skills(root.get("skills"), report);

    Ok(ResumeRecord {
        personal_info,
        education,
        experience,
        projects,
        skills,
    })
}

fn build_personal_info(value: Option<&Value>, report: &mut ValidationReport) -> PersonalInfo {
    let obj = match value {
        None | Some(Value::Null) => {
            report.push("personal_info", "is required");
            return PersonalInfo::default();
        }
        Some(Value::Object(obj)) => obj,
        Some(other) => {
            report.push(
                "personal_info",
                format!("must be an object, found {}", kind_of(other)),
            );
            return PersonalInfo::default();
        }
    };

    let mut info = PersonalInfo::default();
    match obj.get("name") {
        Some(Value::String(name)) if !name.trim().is_empty() => info.name = name.trim().to_string(),
        Some(Value::String(_)) => report.push("personal_info.name", "must not be empty"),
        None | Some(Value::Null) => report.push("personal_info.name", "is required"),
        Some(other) => report.push(
            "personal_info.name",
            format!("must be a string, found {}", kind_of(other)),
        ),
    }

    for (key, value) in obj {
        if key == "name" {
            continue;
        }
        let path = format!("personal_info.{key}");
        let Some(text) = optional_string(Some(value), &path, report) else {
            continue;
        };
        match key.as_str() {
            "phone" => info.phone = Some(text),
            "email" => info.email = Some(text),
            "linkedin" => info.linkedin = Some(text),
            "github" => info.github = Some(text),
            _ => {
                info.extra.insert(key.clone(), text);
            }
        }
    }

    info
}

fn build_entries<T>(
    root: &Map<String, Value>,
    section: &str,
    report: &mut ValidationReport,
    build: fn(&Map<String, Value>, &str, &mut ValidationReport) -> T,
) -> Vec<T> {
    let items = match root.get(section) {
        None | Some(Value::Null) => return Vec::new(),
        Some(Value::Array(items)) => items,
        Some(other) => {
            report.push(
                section,
                format!("must be an array, found {}", kind_of(other)),
            );
            return Vec::new();
        }
    };

    items
        .iter()
        .enumerate()
        .filter_map(|(i, item)| {
            let path = format!("{section}[{i}]");
            match item.as_object() {
                Some(obj) => Some(build(obj, &path, report)),
                None => {
                    report.push(path, format!("must be an object, found {}", kind_of(item)));
                    None
                }
            }
        })
        .collect()
}

fn build_education(obj: &Map<String, Value>, path: &str, report: &mut ValidationReport) -> Education {
    Education {
        institution: text_field(obj, "institution", path, report),
        location: optional_field(obj, "location", path, report),
        degree: text_field(obj, "degree", path, report),
        dates: text_field(obj, "dates", path, report),
        details: string_list(obj.get("details"), &format!("{path}.details"), report),
    }
}

fn build_experience(
    obj: &Map<String, Value>,
    path: &str,
    report: &mut ValidationReport,
) -> Experience {
    Experience {
        company: text_field(obj, "company", path, report),
        title: text_field(obj, "title", path, report),
        location: optional_field(obj, "location", path, report),
        dates: text_field(obj, "dates", path, report),
        details: string_list(obj.get("details"), &format!("{path}.details"), report),
    }
}

fn build_project(obj: &Map<String, Value>, path: &str, report: &mut ValidationReport) -> Project {
    let name_key = if has_value(obj, "name") { "name" } else { "title" };
    let name = text_field(obj, name_key, path, report);

    let tech_key = if has_value(obj, "technologies_used") {
        "technologies_used"
    } else {
        "technologies"
    };
    let tech_path = format!("{path}.{tech_key}");
    let technologies = match obj.get(tech_key) {
        None | Some(Value::Null) => Technologies::default(),
        Some(Value::String(s)) => Technologies::Single(s.trim().to_string()),
        Some(list @ Value::Array(_)) => Technologies::List(string_list(Some(list), &tech_path, report)),
        Some(other) => {
            report.push(
                tech_path,
                format!("must be a string or an array of strings, found {}", kind_of(other)),
            );
            Technologies::default()
        }
    };

    let mut details = string_list(obj.get("details"), &format!("{path}.details"), report);
    if details.is_empty() {
        let desc_path = format!("{path}.description");
        details = match obj.get("description") {
            Some(Value::String(s)) if !s.trim().is_empty() => vec![s.trim().to_string()],
            Some(list @ Value::Array(_)) => string_list(Some(list), &desc_path, report),
            None | Some(Value::Null) | Some(Value::String(_)) => Vec::new(),
            Some(other) => {
                report.push(
                    desc_path,
                    format!("must be a string or an array of strings, found {}", kind_of(other)),
                );
                Vec::new()
            }
        };
    }

    Project {
        name,
        technologies,
        details,
    }
}

fn build_skills(value: Option<&Value>, report: &mut ValidationReport) -> Vec<SkillCategory> {
    let obj = match value {
        None | Some(Value::Null) => return Vec::new(),
        Some(Value::Object(obj)) => obj,
        Some(other) => {
            report.push("skills", format!("must be an object, found {}", kind_of(other)));
            return Vec::new();
        }
    };

    let mut categories = Vec::with_capacity(obj.len());
    for (name, value) in obj {
        let path = format!("skills.{name}");
        let group = match value {
            Value::Array(_) => SkillGroup::Flat(string_list(Some(value), &path, report)),
            Value::Object(subs) => SkillGroup::Nested(
                subs.iter()
                    .map(|(sub, items)| {
                        let sub_path = format!("{path}.{sub}");
                        if !items.is_array() && !items.is_null() {
                            report.push(
                                &sub_path,
                                format!("must be an array of strings, found {}", kind_of(items)),
                            );
                        }
                        SkillSubgroup {
                            name: sub.clone(),
                            items: string_list(Some(items).filter(|v| v.is_array()), &sub_path, report),
                        }
                    })
                    .collect(),
            ),
            other => {
                report.push(
                    path,
                    format!(
                        "must be an array of strings or an object of arrays, found {}",
                        kind_of(other)
                    ),
                );
                continue;
            }
        };
        categories.push(SkillCategory {
            name: name.clone(),
            group,
        });
    }
    categories
}

// ────────────────────────────────────────────────────────────────────────────
// Field helpers
// ────────────────────────────────────────────────────────────────────────────

fn has_value(obj: &Map<String, Value>, key: &str) -> bool {
    obj.get(key).is_some_and(|v| !v.is_null())
}

/// A string field that defaults to empty when absent.
fn text_field(
    obj: &Map<String, Value>,
    key: &str,
    path: &str,
    report: &mut ValidationReport,
) -> String {
    optional_string(obj.get(key), &format!("{path}.{key}"), report).unwrap_or_default()
}

fn optional_field(
    obj: &Map<String, Value>,
    key: &str,
    path: &str,
    report: &mut ValidationReport,
) -> Option<String> {
    optional_string(obj.get(key), &format!("{path}.{key}"), report)
}

/// `None` for absent, null, or blank strings; reports non-string values.
fn optional_string(value: Option<&Value>, path: &str, report: &mut ValidationReport) -> Option<String> {
    match value {
        None | Some(Value::Null) => None,
        Some(Value::String(s)) if s.trim().is_empty() => None,
        Some(Value::String(s)) => Some(s.trim().to_string()),
        Some(other) => {
            report.push(path, format!("must be a string, found {}", kind_of(other)));
            None
        }
    }
}

/// An optional array of strings. Blank items are dropped.
fn string_list(value: Option<&Value>, path: &str, report: &mut ValidationReport) -> Vec<String> {
    let items = match value {
        None | Some(Value::Null) => return Vec::new(),
        Some(Value::Array(items)) => items,
        Some(other) => {
            report.push(
                path,
                format!("must be an array of strings, found {}", kind_of(other)),
            );
            return Vec::new();
        }
    };

    items
        .iter()
        .enumerate()
        .filter_map(|(i, item)| match item {
            Value::String(s) if s.trim().is_empty() => None,
            Value::String(s) => Some(s.trim().to_string()),
            other => {
                report.push(
                    format!("{path}[{i}]"),
                    format!("must be a string, found {}", kind_of(other)),
                );
                None
            }
        })
        .collect()
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

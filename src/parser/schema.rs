//! Typed shapes of the upstream payloads the pipeline reads.
//!
//! Every field the pipeline does not strictly need is optional; records are
//! validated here instead of being walked as loose JSON.

use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// `students/{id}/classes` (roster)
#[derive(Debug, Clone, Deserialize, Default)]
pub struct RosterClassesPage {
    #[serde(default)]
    pub classes: Vec<RosterClass>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RosterClass {
    #[serde(rename = "classCode", default, deserialize_with = "opt_string_or_number")]
    pub class_code: Option<String>,
}

/// `students/{id}` (roster)
#[derive(Debug, Clone, Deserialize)]
pub struct RosterStudentDocument {
    pub user: Option<RosterUser>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RosterUser {
    #[serde(default, deserialize_with = "opt_string_or_number")]
    pub identifier: Option<String>,
}

/// `academics/enrollments` (primary)
#[derive(Debug, Clone, Deserialize)]
pub struct EnrollmentRecord {
    #[serde(default, deserialize_with = "opt_string_or_number")]
    pub id: Option<String>,
    #[serde(default)]
    pub class_description: Option<String>,
}

/// `report_card/enrollments/{id}/qualitative_grades` (primary)
#[derive(Debug, Clone, Deserialize)]
pub struct QualitativeGrade {
    pub proficiency_level: Option<Abbreviated>,
    pub grading_period: Option<Abbreviated>,
    pub rubric_criteria: Option<RubricCriteria>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Abbreviated {
    #[serde(default, deserialize_with = "opt_string_or_number")]
    pub abbreviation: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RubricCriteria {
    #[serde(default)]
    pub description: Option<String>,
}

/// Identifiers and abbreviations come back as strings or bare numbers
/// depending on the endpoint.
fn opt_string_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s)),
        Some(Value::Number(n)) => Ok(Some(n.to_string())),
        Some(other) => Err(serde::de::Error::custom(format!(
            "expected string or number, got {}",
            other
        ))),
    }
}

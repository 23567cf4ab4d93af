use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::parser::schema::QualitativeGrade;

/// One reported qualitative grade. Duplicates are meaningful and kept.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GradeRow {
    pub class: String,
    pub grading_period: String,
    pub description: String,
    pub score: String,
}

/// Grade records of one enrollment paired with its class name.
#[derive(Debug, Clone)]
pub struct ClassGrades {
    pub class_name: String,
    pub grades: Vec<Value>,
}

impl ClassGrades {
    pub fn new(class_name: impl Into<String>, grades: Vec<Value>) -> Self {
        Self { class_name: class_name.into(), grades }
    }
}

/// Turn paired grade lists into rows, preserving input order.
///
/// Records without a proficiency abbreviation are not reportable and are
/// dropped, as are non-object and malformed records.
pub fn flatten(classes: &[ClassGrades]) -> Vec<GradeRow> {
    classes
        .iter()
        .flat_map(|class| {
            class
                .grades
                .iter()
                .filter_map(move |record| row_from_record(&class.class_name, record))
        })
        .collect()
}

fn row_from_record(class_name: &str, record: &Value) -> Option<GradeRow> {
    if !record.is_object() {
        debug!(class = class_name, "skipping non-object grade record");
        return None;
    }
    let grade = QualitativeGrade::deserialize(record)
        .inspect_err(|e| debug!(class = class_name, "skipping malformed grade record: {}", e))
        .ok()?;

    let score = grade.proficiency_level?.abbreviation?;
    // a row always carries its grading period
    let grading_period = grade.grading_period?.abbreviation?;
    let description = grade
        .rubric_criteria
        .and_then(|criteria| criteria.description)
        .unwrap_or_default();

    Some(GradeRow {
        class: class_name.to_owned(),
        grading_period,
        description,
        score,
    })
}

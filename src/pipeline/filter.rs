use crate::utils::constants::DEFAULT_EXCLUDED_CLASSES;

/// Enrollment id with the class description it belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnrollmentRef {
    pub id: String,
    pub class_description: String,
}

impl EnrollmentRef {
    pub fn new(id: impl Into<String>, class_description: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            class_description: class_description.into(),
        }
    }
}

/// Drops non-academic classes: any description containing one of the
/// banned substrings, compared case-insensitively.
#[derive(Debug, Clone)]
pub struct ExclusionFilter {
    banned: Vec<String>,
}

impl Default for ExclusionFilter {
    fn default() -> Self {
        Self::new(DEFAULT_EXCLUDED_CLASSES)
    }
}

impl ExclusionFilter {
    pub fn new<I, S>(banned: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            banned: banned
                .into_iter()
                .map(|b| b.as_ref().trim().to_lowercase())
                .filter(|b| !b.is_empty())
                .collect(),
        }
    }

    pub fn is_excluded(&self, class_description: &str) -> bool {
        let description = class_description.trim().to_lowercase();
        self.banned.iter().any(|banned| description.contains(banned.as_str()))
    }

    /// Keep the surviving enrollments in their original order.
    pub fn apply(&self, enrollments: Vec<EnrollmentRef>) -> Vec<EnrollmentRef> {
        enrollments
            .into_iter()
            .filter(|e| !self.is_excluded(&e.class_description))
            .collect()
    }
}

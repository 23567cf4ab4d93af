use std::sync::Arc;

use tracing::{debug, info};

use crate::error::{ReportError, Result};
use crate::helpers::email::validate_email;
use crate::index::student_index::StudentIndex;
use crate::observability::metrics::get_metrics;
use crate::parser::flatten::{flatten, ClassGrades, GradeRow};
use crate::parser::schema::{EnrollmentRecord, RosterClassesPage, RosterStudentDocument};
use crate::pipeline::filter::{EnrollmentRef, ExclusionFilter};
use crate::sources::fetch::{ApiMode, FetchSession, PaginatedFetcher};

/// Walks email → sourced id → person id → enrollments → grades.
///
/// Every hop runs sequentially on one fetch session.
#[derive(Debug, Clone)]
pub struct GradeResolver {
    fetcher: Arc<PaginatedFetcher>,
    index: StudentIndex,
    filter: ExclusionFilter,
    fetch_class_list: bool,
}

impl GradeResolver {
    pub fn new(
        fetcher: Arc<PaginatedFetcher>,
        index: StudentIndex,
        filter: ExclusionFilter,
        fetch_class_list: bool,
    ) -> Self {
        Self {
            fetcher,
            index,
            filter,
            fetch_class_list,
        }
    }

    pub async fn resolve_grades(&self, email: &str) -> Result<Vec<GradeRow>> {
        let metrics = get_metrics().await;
        let result = self.resolve(email).await;
        let outcome = match &result {
            Ok(_) => "ok",
            Err(e) => e.kind(),
        };
        metrics.lookups.with_label_values(&[outcome]).inc();
        if let Ok(rows) = &result {
            metrics.grade_rows.inc_by(rows.len() as u64);
        }
        result
    }

    async fn resolve(&self, email: &str) -> Result<Vec<GradeRow>> {
        let email = validate_email(email)?;
        let sourced_id = self
            .index
            .lookup_sourced_id(email)
            .await
            .ok_or_else(|| ReportError::Lookup { email: email.to_owned() })?;
        info!(sourced_id = %sourced_id, "student resolved from index");

        let mut session = self.fetcher.session();

        if self.fetch_class_list {
            self.fetch_class_codes(&mut session, &sourced_id).await?;
        }

        let identifier = person_identifier(&mut session, &sourced_id).await?;
        let enrollments = self.enrollments(&mut session, &identifier).await?;

        let mut classes: Vec<ClassGrades> = Vec::with_capacity(enrollments.len());
        let total = enrollments.len();
        for (done, enrollment) in enrollments.into_iter().enumerate() {
            info!(
                class = %enrollment.class_description,
                remaining = total - done,
                "fetching qualitative grades"
            );
            let endpoint = format!("report_card/enrollments/{}/qualitative_grades", enrollment.id);
            let grades = session
                .fetch(&endpoint, ApiMode::Primary)
                .await
                .map_err(|e| ReportError::pipeline(endpoint.as_str(), e))?;
            classes.push(ClassGrades::new(enrollment.class_description, grades));
        }

        let rows = flatten(&classes);
        info!(classes = classes.len(), rows = rows.len(), "grades resolved");
        Ok(rows)
    }

    /// The class list is not used downstream; the call is kept for parity
    /// with the upstream access pattern and can be switched off.
    async fn fetch_class_codes(&self, session: &mut FetchSession<'_>, sourced_id: &str) -> Result<()> {
        let endpoint = format!("students/{}/classes", sourced_id);
        let pages: Vec<RosterClassesPage> = session
            .fetch_as(&endpoint, ApiMode::Roster)
            .await
            .map_err(|e| ReportError::pipeline(endpoint.as_str(), e))?;
        let codes: Vec<&str> = pages
            .iter()
            .flat_map(|page| page.classes.iter())
            .filter_map(|class| class.class_code.as_deref())
            .collect();
        debug!(count = codes.len(), "class codes: {:?}", codes);
        Ok(())
    }

    async fn enrollments(&self, session: &mut FetchSession<'_>, identifier: &str) -> Result<Vec<EnrollmentRef>> {
        let endpoint = format!("academics/enrollments?person_id={}", identifier);
        let records: Vec<EnrollmentRecord> = session
            .fetch_as(&endpoint, ApiMode::Primary)
            .await
            .map_err(|e| ReportError::pipeline(endpoint.as_str(), e))?;

        let all: Vec<EnrollmentRef> = records
            .into_iter()
            .filter_map(|record| {
                let id = record.id.filter(|id| !id.is_empty())?;
                Some(EnrollmentRef::new(id, record.class_description.unwrap_or_default()))
            })
            .collect();
        let found = all.len();
        let kept = self.filter.apply(all);
        info!(found, kept = kept.len(), "enrollments filtered");
        Ok(kept)
    }
}

/// `user.identifier` of the roster student document. Absent means the
/// remaining hops have nothing to address, so it is fatal.
async fn person_identifier(session: &mut FetchSession<'_>, sourced_id: &str) -> Result<String> {
    let endpoint = format!("students/{}", sourced_id);
    let documents: Vec<RosterStudentDocument> = session
        .fetch_as(&endpoint, ApiMode::Roster)
        .await
        .map_err(|e| ReportError::pipeline(endpoint.as_str(), e))?;

    documents
        .into_iter()
        .filter_map(|doc| doc.user.and_then(|user| user.identifier))
        .find(|identifier| !identifier.trim().is_empty())
        .ok_or_else(|| ReportError::Pipeline {
            endpoint,
            reason: "student document has no user.identifier".to_string(),
        })
}

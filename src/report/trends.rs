//! Per-class trend tables: mean numeric score per grading period and
//! rubric description, the data behind the per-class charts.

use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};
use std::io::Write;
use std::sync::OnceLock;

use regex::Regex;
use serde::Serialize;

use crate::error::{ReportError, Result};
use crate::parser::flatten::GradeRow;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassTrend {
    pub class: String,
    /// ordered by their trailing number
    pub periods: Vec<String>,
    pub descriptions: Vec<String>,
    /// `scores[period][description]`, `None` when no numeric score exists
    pub scores: Vec<Vec<Option<f64>>>,
}

impl ClassTrend {
    pub fn file_name(&self) -> String {
        format!("{}_trends.csv", self.class.to_lowercase().replace(' ', "_"))
    }

    pub fn score(&self, period: &str, description: &str) -> Option<f64> {
        let p = self.periods.iter().position(|x| x == period)?;
        let d = self.descriptions.iter().position(|x| x == description)?;
        self.scores[p][d]
    }
}

pub fn build_trends(rows: &[GradeRow]) -> Vec<ClassTrend> {
    let mut by_class: BTreeMap<&str, Vec<&GradeRow>> = BTreeMap::new();
    for row in rows {
        by_class.entry(row.class.as_str()).or_default().push(row);
    }

    by_class
        .into_iter()
        .map(|(class, rows)| class_trend(class, &rows))
        .collect()
}

fn class_trend(class: &str, rows: &[&GradeRow]) -> ClassTrend {
    let mut periods: Vec<String> = rows
        .iter()
        .map(|r| r.grading_period.clone())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();
    periods.sort_by(|a, b| compare_periods(a, b));

    let descriptions: Vec<String> = rows
        .iter()
        .map(|r| r.description.clone())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();

    // (sum, count) per cell
    let mut cells = vec![vec![(0.0_f64, 0_u32); descriptions.len()]; periods.len()];
    for row in rows {
        let Ok(value) = row.score.trim().parse::<f64>() else {
            continue;
        };
        if !value.is_finite() {
            continue;
        }
        let p = periods.iter().position(|x| *x == row.grading_period);
        let d = descriptions.iter().position(|x| *x == row.description);
        if let (Some(p), Some(d)) = (p, d) {
            cells[p][d].0 += value;
            cells[p][d].1 += 1;
        }
    }

    let scores = cells
        .into_iter()
        .map(|line| {
            line.into_iter()
                .map(|(sum, count)| (count > 0).then(|| sum / count as f64))
                .collect()
        })
        .collect();

    ClassTrend {
        class: class.to_owned(),
        periods,
        descriptions,
        scores,
    }
}

/// Trailing integer of a period name, `Q3` → 3.
fn period_rank(period: &str) -> Option<u64> {
    static TRAILING: OnceLock<Regex> = OnceLock::new();
    let re = TRAILING.get_or_init(|| Regex::new(r"(\d+)\s*$").expect("trailing number pattern is valid"));
    re.captures(period)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse().ok())
}

fn compare_periods(a: &str, b: &str) -> Ordering {
    match (period_rank(a), period_rank(b)) {
        (Some(x), Some(y)) => x.cmp(&y).then_with(|| a.cmp(b)),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => a.cmp(b),
    }
}

/// One row per grading period, one column per description.
pub fn write_trend_csv<W: Write>(writer: W, trend: &ClassTrend) -> Result<()> {
    let mut wtr = csv::Writer::from_writer(writer);
    let csv_err = |e: csv::Error| ReportError::Serialization(format!("CSV write error: {e}"));

    let mut header = vec!["grading_period".to_string()];
    header.extend(trend.descriptions.iter().cloned());
    wtr.write_record(&header).map_err(csv_err)?;

    for (period, line) in trend.periods.iter().zip(&trend.scores) {
        let mut record = vec![period.clone()];
        record.extend(line.iter().map(|cell| cell.map(|v| v.to_string()).unwrap_or_default()));
        wtr.write_record(&record).map_err(csv_err)?;
    }

    wtr.flush()?;
    Ok(())
}

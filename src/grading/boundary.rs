//! Grade-boundary tables and mark-to-grade resolution.
//!
//! A boundary table maps (tier, grade) to the minimum raw mark for that
//! grade. Tiers partition a subject; grades within a tier are totally
//! ordered by raw mark descending. The crate ships a static reference
//! catalog used when the primary store has no table for a subject.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::config::GradingParams;
use crate::error::EngineError;
use crate::types::{GradeBoundary, Tier};

pub type GradeMap = BTreeMap<String, GradeBoundary>;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BoundaryTable {
    pub board: String,
    pub subject_code: String,
    pub tiers: BTreeMap<Tier, GradeMap>,
}

impl BoundaryTable {
    pub fn new(board: &str, subject_code: &str) -> Self {
        Self {
            board: board.to_string(),
            subject_code: subject_code.to_string(),
            tiers: BTreeMap::new(),
        }
    }

    pub fn with_tier(mut self, tier: Tier, boundaries: &[(&str, i32, f64)]) -> Self {
        let map: GradeMap = boundaries
            .iter()
            .map(|&(grade, raw_mark, percentage_mark)| {
                (
                    grade.to_string(),
                    GradeBoundary {
                        raw_mark,
                        percentage_mark,
                    },
                )
            })
            .collect();
        self.tiers.insert(tier, map);
        self
    }

    /// Tier selection. An explicit request always wins; otherwise pick by
    /// the achieved percentage when both tiers exist, fall back to the only
    /// tier present, and finally to the untiered sentinel.
    pub fn select_tier(&self, requested: Option<Tier>, percentage: f64, params: &GradingParams) -> Tier {
        if let Some(tier) = requested {
            return tier;
        }
        let has_foundation = self.tiers.contains_key(&Tier::Foundation);
        let has_higher = self.tiers.contains_key(&Tier::Higher);
        match (has_foundation, has_higher) {
            (true, true) => {
                if percentage < params.foundation_cutoff_pct {
                    Tier::Foundation
                } else {
                    Tier::Higher
                }
            }
            (true, false) => Tier::Foundation,
            (false, true) => Tier::Higher,
            (false, false) => Tier::Single,
        }
    }

    /// Grades of one tier ordered by raw mark descending.
    pub fn ordered_grades(&self, tier: Tier) -> Option<Vec<(&str, GradeBoundary)>> {
        let map = self.tiers.get(&tier)?;
        let mut grades: Vec<(&str, GradeBoundary)> =
            map.iter().map(|(g, b)| (g.as_str(), *b)).collect();
        grades.sort_by(|a, b| b.1.raw_mark.cmp(&a.1.raw_mark));
        Some(grades)
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GradeResult {
    pub grade: String,
    pub description: String,
    pub percentage: f64,
    pub marks_achieved: i32,
    pub marks_total: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub boundary_mark: Option<i32>,
    pub tier: Tier,
    pub board: String,
    pub subject_code: String,
}

fn describe(grade: &str) -> String {
    match grade {
        "U" => "Ungraded — achieved marks fall below every boundary".to_string(),
        "9" | "A*" => format!("Grade {grade} — outstanding performance"),
        "8" | "7" | "A" => format!("Grade {grade} — strong performance"),
        "6" | "5" | "B" | "C" => format!("Grade {grade} — secure pass"),
        "4" | "D" => format!("Grade {grade} — standard pass"),
        _ => format!("Grade {grade}"),
    }
}

pub fn percentage_of(achieved: i32, total: i32) -> f64 {
    if total <= 0 {
        return 0.0;
    }
    achieved as f64 / total as f64 * 100.0
}

/// Resolve an achieved-mark total to a grade within the applicable tier.
///
/// The student must meet or exceed a boundary to earn its grade; below
/// every boundary resolves to "U" rather than an error. A tier with no
/// table at all is `NoBoundaryData`.
pub fn resolve_grade(
    achieved: i32,
    total: i32,
    table: &BoundaryTable,
    requested_tier: Option<Tier>,
    params: &GradingParams,
) -> Result<GradeResult, EngineError> {
    let percentage = percentage_of(achieved, total);
    let tier = table.select_tier(requested_tier, percentage, params);

    let grades = table
        .ordered_grades(tier)
        .ok_or_else(|| EngineError::NoBoundaryData {
            board: table.board.clone(),
            subject_code: table.subject_code.clone(),
        })?;

    let hit = grades
        .iter()
        .find(|(_, boundary)| boundary.raw_mark <= achieved);

    let (grade, boundary_mark) = match hit {
        Some((grade, boundary)) => (grade.to_string(), Some(boundary.raw_mark)),
        None => ("U".to_string(), None),
    };

    tracing::debug!(
        achieved,
        total,
        tier = tier.as_str(),
        grade = grade.as_str(),
        "grade resolved"
    );

    Ok(GradeResult {
        description: describe(&grade),
        grade,
        percentage,
        marks_achieved: achieved,
        marks_total: total,
        boundary_mark,
        tier,
        board: table.board.clone(),
        subject_code: table.subject_code.clone(),
    })
}

/// Static reference boundary data, the last entry in the data-source
/// precedence (primary store first, then this catalog).
pub fn reference_table(board: &str, subject_code: &str) -> Option<BoundaryTable> {
    match (board.to_uppercase().as_str(), subject_code) {
        ("AQA", "8300") => Some(
            // GCSE Mathematics, papers out of 240.
            BoundaryTable::new("AQA", "8300")
                .with_tier(
                    Tier::Higher,
                    &[
                        ("9", 214, 89.2),
                        ("8", 186, 77.5),
                        ("7", 158, 65.8),
                        ("6", 130, 54.2),
                        ("5", 102, 42.5),
                        ("4", 74, 30.8),
                        ("3", 46, 19.2),
                    ],
                )
                .with_tier(
                    Tier::Foundation,
                    &[
                        ("5", 157, 65.4),
                        ("4", 127, 52.9),
                        ("3", 97, 40.4),
                        ("2", 67, 27.9),
                        ("1", 37, 15.4),
                    ],
                ),
        ),
        ("EDEXCEL", "1MA1") => Some(
            BoundaryTable::new("Edexcel", "1MA1")
                .with_tier(
                    Tier::Higher,
                    &[
                        ("9", 198, 82.5),
                        ("8", 166, 69.2),
                        ("7", 134, 55.8),
                        ("6", 107, 44.6),
                        ("5", 80, 33.3),
                        ("4", 53, 22.1),
                        ("3", 38, 15.8),
                    ],
                )
                .with_tier(
                    Tier::Foundation,
                    &[
                        ("5", 160, 66.7),
                        ("4", 129, 53.8),
                        ("3", 93, 38.8),
                        ("2", 57, 23.8),
                        ("1", 21, 8.8),
                    ],
                ),
        ),
        ("AQA", "7402") => Some(
            // A-level Biology, untiered, out of 260.
            BoundaryTable::new("AQA", "7402").with_tier(
                Tier::Single,
                &[
                    ("A*", 201, 77.3),
                    ("A", 174, 66.9),
                    ("B", 147, 56.5),
                    ("C", 121, 46.5),
                    ("D", 95, 36.5),
                    ("E", 69, 26.5),
                ],
            ),
        ),
        _ => None,
    }
}

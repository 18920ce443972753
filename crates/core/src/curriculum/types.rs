//! Curriculum data types.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Curriculum offered on the campus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum CurriculumType {
    /// French national curriculum.
    Fr,
    /// International Baccalaureate.
    Ib,
}

impl std::fmt::Display for CurriculumType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Fr => write!(f, "FR"),
            Self::Ib => write!(f, "IB"),
        }
    }
}

/// Enrolment, pricing and staffing inputs for one curriculum in one year.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurriculumRecord {
    /// Curriculum.
    pub curriculum_type: CurriculumType,
    /// Year the figures apply to.
    pub year: i32,
    /// Seats available.
    pub capacity: u32,
    /// Enrolled students. Not checked against capacity here; see `validate`.
    pub students: u32,
    /// Annual tuition per student in the CPI base year.
    pub tuition_base: Decimal,
    /// CPI adjustment per step.
    pub cpi_rate: Decimal,
    /// Years between CPI adjustments.
    pub cpi_frequency: u32,
    /// Year in which `tuition_base` applies.
    pub cpi_base_year: i32,
    /// Teachers per student.
    pub teacher_ratio: Decimal,
    /// Non-teaching staff per student.
    pub non_teacher_ratio: Decimal,
    /// Average teacher salary in the salary base year.
    pub teacher_avg_salary: Decimal,
    /// Average non-teaching salary in the salary base year.
    pub non_teacher_avg_salary: Decimal,
    /// Annual salary escalation.
    pub salary_escalation_rate: Decimal,
    /// Year in which the average salaries apply.
    pub salary_base_year: i32,
}

impl CurriculumRecord {
    /// Returns domain problems with the record; empty when valid.
    #[must_use]
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();
        if self.students > self.capacity {
            errors.push(format!(
                "{} students ({}) exceed capacity ({}) in {}",
                self.curriculum_type, self.students, self.capacity, self.year
            ));
        }
        if self.cpi_frequency == 0 {
            errors.push(format!(
                "{} CPI frequency must be at least 1 year",
                self.curriculum_type
            ));
        }
        let non_negative = [
            (self.tuition_base, "Tuition"),
            (self.teacher_ratio, "Teacher ratio"),
            (self.non_teacher_ratio, "Non-teacher ratio"),
            (self.teacher_avg_salary, "Teacher salary"),
            (self.non_teacher_avg_salary, "Non-teacher salary"),
        ];
        for (value, label) in non_negative {
            if value.is_sign_negative() {
                errors.push(format!("{} {label} must not be negative", self.curriculum_type));
            }
        }
        errors
    }
}

/// Staff cost split by role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct StaffCost {
    /// Teaching staff cost.
    pub teacher: Decimal,
    /// Non-teaching staff cost.
    pub non_teacher: Decimal,
    /// Sum of both rows.
    pub total: Decimal,
}

/// Computed figures for one curriculum in one year.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurriculumResult {
    /// Curriculum.
    pub curriculum_type: CurriculumType,
    /// Year.
    pub year: i32,
    /// Enrolled students.
    pub students: u32,
    /// Seats available.
    pub capacity: u32,
    /// CPI-adjusted tuition per student.
    pub adjusted_tuition: Decimal,
    /// Tuition revenue.
    pub revenue: Decimal,
    /// Staff cost.
    pub staff_cost: StaffCost,
}

/// FR and IB combined for one year.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CombinedCurriculum {
    /// Year shared by both curricula.
    pub year: i32,
    /// Total tuition revenue.
    pub revenue: Decimal,
    /// Total students.
    pub students: u32,
    /// Total capacity.
    pub capacity: u32,
    /// Total staff cost.
    pub staff_cost: Decimal,
    /// Students as a percentage of capacity; `None` without capacity.
    pub utilisation_pct: Option<Decimal>,
    /// FR figures.
    pub fr: CurriculumResult,
    /// IB figures.
    pub ib: CurriculumResult,
}

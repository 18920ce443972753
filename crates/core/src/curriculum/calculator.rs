//! Curriculum calculations.
//!
//! Tuition follows CPI only on frequency boundaries, while salaries escalate
//! every year from their base year.

use rust_decimal::Decimal;

use super::error::CurriculumError;
use super::types::{CombinedCurriculum, CurriculumRecord, CurriculumResult, CurriculumType, StaffCost};
use crate::compounding::{gated_periods, growth_factor};

/// Stateless curriculum calculator.
pub struct CurriculumCalculator;

impl CurriculumCalculator {
    /// `tuition_base * (1 + cpi_rate)^floor((year - cpi_base_year) / cpi_frequency)`.
    pub fn adjusted_tuition(record: &CurriculumRecord) -> Result<Decimal, CurriculumError> {
        let periods = gated_periods(record.year, record.cpi_base_year, record.cpi_frequency)
            .ok_or(CurriculumError::InvalidCpiFrequency(record.curriculum_type))?;
        growth_factor(record.cpi_rate, periods)
            .and_then(|factor| record.tuition_base.checked_mul(factor))
            .ok_or(CurriculumError::Overflow {
                curriculum: record.curriculum_type,
                year: record.year,
            })
    }

    /// `salary * (1 + rate)^(year - base_year)`, compounding every year.
    #[must_use]
    pub fn escalated_salary(salary: Decimal, rate: Decimal, base_year: i32, year: i32) -> Option<Decimal> {
        growth_factor(rate, i64::from(year) - i64::from(base_year))
            .and_then(|factor| salary.checked_mul(factor))
    }

    /// `students * adjusted_tuition`.
    pub fn revenue(record: &CurriculumRecord) -> Result<Decimal, CurriculumError> {
        Self::revenue_at(record, Self::adjusted_tuition(record)?)
    }

    fn revenue_at(record: &CurriculumRecord, adjusted_tuition: Decimal) -> Result<Decimal, CurriculumError> {
        Decimal::from(record.students)
            .checked_mul(adjusted_tuition)
            .ok_or(CurriculumError::Overflow {
                curriculum: record.curriculum_type,
                year: record.year,
            })
    }

    /// Teacher and non-teacher cost, each `students * ratio * escalated salary`.
    pub fn staff_cost(record: &CurriculumRecord) -> Result<StaffCost, CurriculumError> {
        let students = Decimal::from(record.students);
        let overflow = || CurriculumError::Overflow {
            curriculum: record.curriculum_type,
            year: record.year,
        };
        let row = |ratio: Decimal, salary: Decimal| {
            Self::escalated_salary(
                salary,
                record.salary_escalation_rate,
                record.salary_base_year,
                record.year,
            )
            .and_then(|salary| students.checked_mul(ratio)?.checked_mul(salary))
            .ok_or_else(overflow)
        };

        let teacher = row(record.teacher_ratio, record.teacher_avg_salary)?;
        let non_teacher = row(record.non_teacher_ratio, record.non_teacher_avg_salary)?;
        Ok(StaffCost {
            teacher,
            non_teacher,
            total: teacher.checked_add(non_teacher).ok_or_else(overflow)?,
        })
    }

    /// Computes revenue and staff cost for one curriculum.
    pub fn calculate(record: &CurriculumRecord) -> Result<CurriculumResult, CurriculumError> {
        let adjusted_tuition = Self::adjusted_tuition(record)?;
        Ok(CurriculumResult {
            curriculum_type: record.curriculum_type,
            year: record.year,
            students: record.students,
            capacity: record.capacity,
            adjusted_tuition,
            revenue: Self::revenue_at(record, adjusted_tuition)?,
            staff_cost: Self::staff_cost(record)?,
        })
    }

    /// Computes `record` for every year in `start_year..=end_year`, keeping
    /// enrolment and base figures fixed.
    pub fn project(
        record: &CurriculumRecord,
        start_year: i32,
        end_year: i32,
    ) -> Result<Vec<CurriculumResult>, CurriculumError> {
        (start_year..=end_year)
            .map(|year| {
                Self::calculate(&CurriculumRecord {
                    year,
                    ..record.clone()
                })
            })
            .collect()
    }

    /// Sums FR and IB for the same year.
    ///
    /// # Errors
    ///
    /// Fails hard when the years differ or the results are in the wrong slots.
    pub fn aggregate(
        fr: &CurriculumResult,
        ib: &CurriculumResult,
    ) -> Result<CombinedCurriculum, CurriculumError> {
        for (result, expected) in [(fr, CurriculumType::Fr), (ib, CurriculumType::Ib)] {
            if result.curriculum_type != expected {
                return Err(CurriculumError::WrongCurriculum {
                    expected,
                    found: result.curriculum_type,
                });
            }
        }
        if fr.year != ib.year {
            return Err(CurriculumError::YearMismatch {
                fr_year: fr.year,
                ib_year: ib.year,
            });
        }

        let overflow = || CurriculumError::AggregateOverflow { year: fr.year };
        let students = fr.students.checked_add(ib.students).ok_or_else(overflow)?;
        let capacity = fr.capacity.checked_add(ib.capacity).ok_or_else(overflow)?;
        // At most u32::MAX percent, well inside the decimal range.
        let utilisation_pct = (capacity > 0)
            .then(|| Decimal::from(students) / Decimal::from(capacity) * Decimal::ONE_HUNDRED);
        let revenue = fr.revenue.checked_add(ib.revenue).ok_or_else(overflow)?;
        let staff_cost = fr
            .staff_cost
            .total
            .checked_add(ib.staff_cost.total)
            .ok_or_else(overflow)?;

        Ok(CombinedCurriculum {
            year: fr.year,
            revenue,
            students,
            capacity,
            staff_cost,
            utilisation_pct,
            fr: fr.clone(),
            ib: ib.clone(),
        })
    }
}

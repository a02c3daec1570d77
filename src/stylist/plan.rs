use serde::Deserialize;

pub const PLAN_DAYS: usize = 7;

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct WeeklyPlanDay {
    pub day: String,
    pub occasion: String,
    pub outfit: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlanIssue {
    EmptyResponse,
    DayCount { expected: usize, actual: usize },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WeeklyPlan {
    pub days: Vec<WeeklyPlanDay>,
    pub issues: Vec<PlanIssue>,
}

impl WeeklyPlan {
    pub fn empty() -> Self {
        Self {
            days: Vec::new(),
            issues: vec![PlanIssue::EmptyResponse],
        }
    }

    pub fn from_days(days: Vec<WeeklyPlanDay>) -> Self {
        let mut issues = Vec::new();
        if days.len() != PLAN_DAYS {
            issues.push(PlanIssue::DayCount {
                expected: PLAN_DAYS,
                actual: days.len(),
            });
        }
        Self { days, issues }
    }

    pub fn is_complete(&self) -> bool {
        self.issues.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_calendars_that_are_not_seven_days() {
        let days = vec![WeeklyPlanDay {
            day: "Monday".into(),
            occasion: "Office".into(),
            outfit: "Navy blazer".into(),
        }];
        let plan = WeeklyPlan::from_days(days);
        assert!(!plan.is_complete());
        assert_eq!(
            plan.issues,
            vec![PlanIssue::DayCount {
                expected: 7,
                actual: 1
            }]
        );
    }

    #[test]
    fn missing_keys_default_to_empty_text() {
        let day: WeeklyPlanDay = serde_json::from_str(r#"{"day":"Sunday"}"#).unwrap();
        assert_eq!(day.day, "Sunday");
        assert!(day.outfit.is_empty());
    }
}

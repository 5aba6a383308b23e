use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Attendance marker written in a workbook row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AttendanceStatus {
    #[serde(rename = "근무")]
    Work,
    #[serde(rename = "개별식사")]
    IndividualMeal,
    #[serde(rename = "재택")]
    HomeOffice,
    #[serde(rename = "오전반차")]
    MorningHalfLeave,
    #[serde(rename = "오후반차")]
    AfternoonHalfLeave,
    #[serde(rename = "연차/휴무")]
    FullDayLeave,
}

impl AttendanceStatus {
    /// Match a cell label, ignoring whitespace. Unknown labels give `None`.
    pub fn from_label(label: &str) -> Option<Self> {
        let label: String = label.chars().filter(|c| !c.is_whitespace()).collect();
        match label.as_str() {
            "근무" | "출근" => Some(AttendanceStatus::Work),
            "개별식사" | "근무(개별식사)" => Some(AttendanceStatus::IndividualMeal),
            "재택" | "재택근무" => Some(AttendanceStatus::HomeOffice),
            "오전반차" => Some(AttendanceStatus::MorningHalfLeave),
            "오후반차" => Some(AttendanceStatus::AfternoonHalfLeave),
            "연차/휴무" | "연차" | "휴무" | "휴가" => Some(AttendanceStatus::FullDayLeave),
            _ => None,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            AttendanceStatus::Work => "근무",
            AttendanceStatus::IndividualMeal => "개별식사",
            AttendanceStatus::HomeOffice => "재택",
            AttendanceStatus::MorningHalfLeave => "오전반차",
            AttendanceStatus::AfternoonHalfLeave => "오후반차",
            AttendanceStatus::FullDayLeave => "연차/휴무",
        }
    }

    pub fn is_working(self) -> bool {
        matches!(
            self,
            AttendanceStatus::Work | AttendanceStatus::IndividualMeal | AttendanceStatus::HomeOffice
        )
    }

    /// Days of leave this status represents.
    pub fn leave_weight(self) -> f64 {
        match self {
            AttendanceStatus::FullDayLeave => 1.0,
            AttendanceStatus::MorningHalfLeave | AttendanceStatus::AfternoonHalfLeave => 0.5,
            _ => 0.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MealEntry {
    pub store: String,
    pub amount: i64,
    pub payer: String,
}

/// Meals recorded for one user on one day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MealRecord {
    pub date: NaiveDate,
    pub attendance: AttendanceStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub breakfast: Option<MealEntry>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lunch: Option<MealEntry>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dinner: Option<MealEntry>,
}

impl MealRecord {
    pub fn has_meals(&self) -> bool {
        self.breakfast.is_some() || self.lunch.is_some() || self.dinner.is_some()
    }

    pub fn meals(&self) -> impl Iterator<Item = &MealEntry> {
        [&self.breakfast, &self.lunch, &self.dinner]
            .into_iter()
            .flatten()
    }

    pub fn total_amount(&self) -> i64 {
        self.meals().map(|m| m.amount).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_labels_round_trip() {
        let all = [
            AttendanceStatus::Work,
            AttendanceStatus::IndividualMeal,
            AttendanceStatus::HomeOffice,
            AttendanceStatus::MorningHalfLeave,
            AttendanceStatus::AfternoonHalfLeave,
            AttendanceStatus::FullDayLeave,
        ];
        for status in all {
            assert_eq!(AttendanceStatus::from_label(status.label()), Some(status));
        }
    }

    #[test]
    fn test_label_aliases_and_whitespace() {
        assert_eq!(
            AttendanceStatus::from_label(" 연차 / 휴무 "),
            Some(AttendanceStatus::FullDayLeave)
        );
        assert_eq!(
            AttendanceStatus::from_label("재택 근무"),
            Some(AttendanceStatus::HomeOffice)
        );
        assert_eq!(
            AttendanceStatus::from_label("근무(개별식사)"),
            Some(AttendanceStatus::IndividualMeal)
        );
        assert_eq!(AttendanceStatus::from_label(""), None);
        assert_eq!(AttendanceStatus::from_label("출장"), None);
    }

    #[test]
    fn test_working_and_leave_weights() {
        assert!(AttendanceStatus::HomeOffice.is_working());
        assert!(!AttendanceStatus::MorningHalfLeave.is_working());
        assert_eq!(AttendanceStatus::FullDayLeave.leave_weight(), 1.0);
        assert_eq!(AttendanceStatus::AfternoonHalfLeave.leave_weight(), 0.5);
        assert_eq!(AttendanceStatus::Work.leave_weight(), 0.0);
    }

    #[test]
    fn test_record_json_shape() {
        let record = MealRecord {
            date: NaiveDate::from_ymd_opt(2024, 7, 15).unwrap(),
            attendance: AttendanceStatus::Work,
            breakfast: None,
            lunch: Some(MealEntry {
                store: "김밥천국".to_string(),
                amount: 8000,
                payer: "홍길동".to_string(),
            }),
            dinner: None,
        };
        assert_eq!(record.total_amount(), 8000);
        assert_eq!(
            serde_json::to_value(&record).unwrap(),
            serde_json::json!({
                "date": "2024-07-15",
                "attendance": "근무",
                "lunch": { "store": "김밥천국", "amount": 8000, "payer": "홍길동" },
            })
        );
    }
}

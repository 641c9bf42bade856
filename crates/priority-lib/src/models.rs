//! Core data models for the priority service

use crate::frame::{Cell, Frame};
use crate::harmonize::columns;
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

/// Status values offered by the single-record form
pub const STATUS_CHOICES: &[&str] = &["Open", "Resolved", "Closed"];

/// Impact/urgency scale offered by the single-record form
pub const SCALE_CHOICES: std::ops::RangeInclusive<u8> = 1..=5;

/// A single ticket as entered through the form or the JSON API
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct TicketRecord {
    #[validate(range(min = 1, max = 5))]
    pub impact: u8,
    #[validate(range(min = 1, max = 5))]
    pub urgency: u8,
    pub reassignments: u32,
    #[validate(range(min = 0.0), custom(function = "finite_hours"))]
    pub handle_time_hrs: f64,
    pub related_interactions: u32,
    pub related_incidents: u32,
    pub related_changes: u32,
    #[validate(length(min = 1))]
    pub status: String,
    pub category: String,
    pub closure_code: String,
}

impl Default for TicketRecord {
    fn default() -> Self {
        Self {
            impact: 2,
            urgency: 2,
            reassignments: 0,
            handle_time_hrs: 0.0,
            related_interactions: 0,
            related_incidents: 0,
            related_changes: 0,
            status: "Open".to_string(),
            category: "incident".to_string(),
            closure_code: "Other".to_string(),
        }
    }
}

impl TicketRecord {
    /// One-row table for the record.
    ///
    /// Handle time is written to both time columns since the model reads
    /// `Resolution_Time_hours` while the form collects handle time.
    pub fn to_frame(&self) -> Frame {
        let header = [
            columns::IMPACT,
            columns::URGENCY,
            columns::REASSIGNMENTS,
            columns::HANDLE_TIME,
            columns::RESOLUTION_TIME,
            columns::RELATED_INTERACTIONS,
            columns::RELATED_INCIDENTS,
            columns::RELATED_CHANGES,
            columns::STATUS,
            columns::CATEGORY,
            columns::CLOSURE_CODE,
        ]
        .map(String::from)
        .to_vec();
        let row = vec![
            Cell::from(u32::from(self.impact)),
            Cell::from(u32::from(self.urgency)),
            Cell::from(self.reassignments),
            Cell::from(self.handle_time_hrs),
            Cell::from(self.handle_time_hrs),
            Cell::from(self.related_interactions),
            Cell::from(self.related_incidents),
            Cell::from(self.related_changes),
            Cell::text(self.status.clone()),
            Cell::text(self.category.clone()),
            Cell::text(self.closure_code.clone()),
        ];
        Frame::from_parts(header, vec![row])
    }
}

fn finite_hours(value: f64) -> Result<(), ValidationError> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(ValidationError::new("finite"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::harmonize::Harmonizer;

    #[test]
    fn test_default_matches_form_defaults() {
        let record = TicketRecord::default();
        assert_eq!(record.impact, 2);
        assert_eq!(record.urgency, 2);
        assert_eq!(record.status, "Open");
        assert_eq!(record.category, "incident");
        assert_eq!(record.closure_code, "Other");
        assert!(record.validate().is_ok());
    }

    #[test]
    fn test_to_frame_sets_both_time_columns() {
        let record = TicketRecord {
            handle_time_hrs: 6.5,
            ..Default::default()
        };
        let frame = record.to_frame();

        assert_eq!(frame.len(), 1);
        assert_eq!(frame.get(0, columns::HANDLE_TIME), Some(&Cell::Number(6.5)));
        assert_eq!(frame.get(0, columns::RESOLUTION_TIME), Some(&Cell::Number(6.5)));
    }

    #[test]
    fn test_record_frame_is_already_harmonized() {
        let frame = TicketRecord::default().to_frame();
        assert!(Harmonizer::default().report(&frame).is_clean());
    }

    #[test]
    fn test_validation_rejects_out_of_scale() {
        let record = TicketRecord {
            impact: 7,
            ..Default::default()
        };
        assert!(record.validate().is_err());

        let record = TicketRecord {
            handle_time_hrs: -1.0,
            ..Default::default()
        };
        assert!(record.validate().is_err());
    }

    #[test]
    fn test_validation_rejects_non_finite_handle_time() {
        for hours in [f64::NAN, f64::INFINITY] {
            let record = TicketRecord {
                handle_time_hrs: hours,
                ..Default::default()
            };
            let errors = record.validate().unwrap_err();
            assert!(errors.field_errors().contains_key("handle_time_hrs"));
        }
    }

    #[test]
    fn test_to_frame_is_one_full_row() {
        let record = TicketRecord {
            impact: 4,
            closure_code: "007".to_string(),
            ..Default::default()
        };
        let frame = record.to_frame();

        assert_eq!(frame.len(), 1);
        assert_eq!(frame.rows()[0].len(), frame.columns().len());
        assert_eq!(frame.get(0, columns::IMPACT), Some(&Cell::Number(4.0)));
        assert_eq!(frame.get(0, columns::CLOSURE_CODE), Some(&Cell::text("007")));
    }

    #[test]
    fn test_deserialize_partial_json_uses_defaults() {
        let record: TicketRecord = serde_json::from_str(r#"{"impact": 4, "status": "Closed"}"#).unwrap();
        assert_eq!(record.impact, 4);
        assert_eq!(record.urgency, 2);
        assert_eq!(record.status, "Closed");
    }
}

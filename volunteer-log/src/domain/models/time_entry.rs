use time::{format_description::BorrowedFormatItem, macros::format_description, Date, Time};

use crate::domain::{models::SheetRow, ValidationError};

/// `M/D/YYYY`, the en-US short date the sheet has always received.
const SHEET_DATE_FORMAT: &[BorrowedFormatItem<'static>] =
    format_description!("[month padding:none]/[day padding:none]/[year]");
/// `h:MM AM`
const SHEET_TIME_FORMAT: &[BorrowedFormatItem<'static>] =
    format_description!("[hour repr:12 padding:none]:[minute] [period]");

/// One volunteer time-logging record.
///
/// Fields are private so an entry can't change after it was built; the
/// duration is always derived from the start and end times.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimeEntry {
    volunteer_id: String,
    date: Date,
    start_time: Time,
    end_time: Time,
    organization: String,
    description: String,
}

impl TimeEntry {
    pub fn new(
        volunteer_id: impl Into<String>,
        date: Date,
        start_time: Time,
        end_time: Time,
        organization: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            volunteer_id: volunteer_id.into(),
            date,
            start_time,
            end_time,
            organization: organization.into(),
            description: description.into(),
        }
    }

    pub fn volunteer_id(&self) -> &str {
        &self.volunteer_id
    }

    pub fn date(&self) -> Date {
        self.date
    }

    pub fn start_time(&self) -> Time {
        self.start_time
    }

    pub fn end_time(&self) -> Time {
        self.end_time
    }

    pub fn organization(&self) -> &str {
        &self.organization
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    /// Hours between start and end, rounded to two decimals. Negative or zero
    /// when the range is invalid.
    pub fn duration_hours(&self) -> f64 {
        let seconds = (self.end_time - self.start_time).whole_seconds() as f64;
        (seconds / 3600.0 * 100.0).round() / 100.0
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.organization.trim().is_empty() || self.description.trim().is_empty() {
            return Err(ValidationError::MissingFields);
        }
        if self.end_time <= self.start_time {
            return Err(ValidationError::InvalidTimeRange);
        }
        Ok(())
    }

    /// Row in sheet column order.
    pub fn to_row(&self) -> SheetRow {
        SheetRow::new(vec![
            self.volunteer_id.clone(),
            self.date
                .format(SHEET_DATE_FORMAT)
                .unwrap_or_else(|_| self.date.to_string()),
            format_clock(self.start_time),
            format_clock(self.end_time),
            format!("{:.2}", self.duration_hours()),
            self.organization.clone(),
            self.description.clone(),
        ])
    }
}

fn format_clock(t: Time) -> String {
    t.format(SHEET_TIME_FORMAT).unwrap_or_else(|_| t.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::{date, time};

    fn entry(start: Time, end: Time) -> TimeEntry {
        TimeEntry::new(
            "vol-42",
            date!(2024 - 03 - 09),
            start,
            end,
            "Food Bank",
            "Sorting donations",
        )
    }

    #[test]
    fn food_bank_scenario_builds_expected_row() {
        let entry = entry(time!(14:00), time!(16:30));

        assert_eq!(entry.duration_hours(), 2.5);
        assert_eq!(
            entry.to_row().fields(),
            [
                "vol-42",
                "3/9/2024",
                "2:00 PM",
                "4:30 PM",
                "2.50",
                "Food Bank",
                "Sorting donations",
            ]
        );
    }

    #[test]
    fn duration_rounds_to_two_decimals() {
        assert_eq!(entry(time!(9:00), time!(9:20)).duration_hours(), 0.33);
        assert_eq!(entry(time!(9:00), time!(9:40)).duration_hours(), 0.67);
        assert_eq!(entry(time!(8:05), time!(17:00)).duration_hours(), 8.92);
        assert_eq!(entry(time!(9:00), time!(9:40)).to_row().fields()[4], "0.67");
        assert_eq!(entry(time!(9:00), time!(12:00)).to_row().fields()[4], "3.00");
    }

    #[test]
    fn midnight_and_noon_use_twelve() {
        let row = entry(time!(0:05), time!(12:15)).to_row();
        assert_eq!(row.fields()[2], "12:05 AM");
        assert_eq!(row.fields()[3], "12:15 PM");
    }

    #[test]
    fn validate_rejects_end_not_after_start() {
        assert_eq!(
            entry(time!(10:00), time!(10:00)).validate(),
            Err(ValidationError::InvalidTimeRange)
        );
        assert_eq!(
            entry(time!(11:00), time!(10:00)).validate(),
            Err(ValidationError::InvalidTimeRange)
        );
        assert_eq!(entry(time!(10:00), time!(10:01)).validate(), Ok(()));
    }

    #[test]
    fn validate_rejects_blank_text_fields_first() {
        let missing_org = TimeEntry::new(
            "vol",
            date!(2024 - 01 - 01),
            time!(11:00),
            time!(10:00),
            "",
            "Something",
        );
        assert_eq!(missing_org.validate(), Err(ValidationError::MissingFields));

        let blank_description = TimeEntry::new(
            "vol",
            date!(2024 - 01 - 01),
            time!(10:00),
            time!(11:00),
            "Shelter",
            "   ",
        );
        assert_eq!(
            blank_description.validate(),
            Err(ValidationError::MissingFields)
        );
    }
}

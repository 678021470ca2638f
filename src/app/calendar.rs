//! iCalendar (RFC 5545) output
//!
//! Events use floating local times, which calendar clients show in the
//! viewer's zone. Escaping and line folding are left to `icalendar`.

use std::fs;
use std::path::Path;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use icalendar::{Calendar, Component, Event, EventLike};
use tracing::info;

use crate::app::models::Course;
use crate::constants::calendar;
use crate::errors::{CalendarError, CalendarResult};

const LOCAL_FORMAT: &str = "%Y%m%dT%H%M%S";

/// Builds calendar text for one term
#[derive(Debug, Clone)]
pub struct CalendarWriter {
    term_start: NaiveDate,
    stamp: DateTime<Utc>,
}

impl CalendarWriter {
    /// Writer stamped with the current time
    pub fn new(term_start: NaiveDate) -> Self {
        Self::with_stamp(term_start, Utc::now())
    }

    /// Writer with a fixed DTSTAMP
    pub fn with_stamp(term_start: NaiveDate, stamp: DateTime<Utc>) -> Self {
        Self { term_start, stamp }
    }

    /// Render the whole calendar
    ///
    /// # Errors
    ///
    /// Returns `CalendarError::DateOutOfRange` if a course date cannot be computed
    pub fn render(&self, courses: &[Course]) -> CalendarResult<String> {
        let mut ical = Calendar::new();
        ical.name(calendar::CALENDAR_NAME);

        for (index, course) in courses.iter().enumerate() {
            ical.push(self.event(index, course)?);
        }
        Ok(ical.to_string())
    }

    fn event(&self, index: usize, course: &Course) -> CalendarResult<Event> {
        let (start, end) = course.first_occurrence(self.term_start)?;

        let mut event = Event::new();
        event
            .uid(&event_uid(index, course, start))
            .timestamp(self.stamp)
            .starts(start)
            .ends(end)
            .summary(&course.name)
            .description(&course.description())
            .location(&course.location());

        if let Some((interval, count)) = course.weeks.recurrence() {
            let rule = format!("FREQ=WEEKLY;INTERVAL={};COUNT={}", interval, count);
            event.add_property("RRULE", rule.as_str());
        }
        Ok(event.done())
    }

    /// Render and write to `path`
    pub fn write_to(&self, path: &Path, courses: &[Course]) -> CalendarResult<()> {
        let content = self.render(courses)?;
        fs::write(path, content).map_err(|source| CalendarError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        info!("Wrote {} events to {}", courses.len(), path.display());
        Ok(())
    }
}

/// Default output file name, e.g. `2024-2025-2.ics`
pub fn default_file_name(year: i32, term: u8) -> String {
    format!("{}-{}-{}.ics", year, year + 1, term)
}

fn event_uid(index: usize, course: &Course, start: NaiveDateTime) -> String {
    let id: String = course
        .id
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .collect();
    format!(
        "{}-{}-{}@{}",
        start.format(LOCAL_FORMAT),
        if id.is_empty() { "course" } else { id.as_str() },
        index,
        calendar::UID_DOMAIN
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::models::{PeriodRange, WeekRange};
    use chrono::TimeZone;

    fn course(weeks: WeekRange) -> Course {
        Course {
            name: "Data Structures".to_string(),
            id: "CS2101".to_string(),
            instructor: "Wang".to_string(),
            campus: "Minhang".to_string(),
            room: "East 3-201".to_string(),
            weekday: 1,
            periods: PeriodRange { first: 1, last: 2 },
            weeks,
        }
    }

    fn writer() -> CalendarWriter {
        let stamp = Utc.with_ymd_and_hms(2025, 2, 1, 8, 0, 0).unwrap();
        CalendarWriter::with_stamp(NaiveDate::from_ymd_opt(2025, 2, 17).unwrap(), stamp)
    }

    /// Value of the first content line named `name`, ignoring parameters
    fn property<'a>(output: &'a str, name: &str) -> Option<&'a str> {
        output.split("\r\n").find_map(|line| {
            let rest = line.strip_prefix(name)?;
            if !rest.starts_with(':') && !rest.starts_with(';') {
                return None;
            }
            rest.split_once(':').map(|(_, value)| value)
        })
    }

    #[test]
    fn test_event_with_recurrence() {
        let weeks = WeekRange {
            first: 1,
            last: 16,
            interval: 1,
        };
        let output = writer().render(&[course(weeks)]).unwrap();

        assert!(output.starts_with("BEGIN:VCALENDAR\r\n"));
        assert!(output.ends_with("END:VCALENDAR\r\n"));
        assert_eq!(property(&output, "VERSION"), Some("2.0"));
        assert_eq!(property(&output, "X-WR-CALNAME"), Some(calendar::CALENDAR_NAME));
        assert_eq!(property(&output, "DTSTART"), Some("20250217T080000"));
        assert_eq!(property(&output, "DTEND"), Some("20250217T094000"));
        assert_eq!(property(&output, "DTSTAMP"), Some("20250201T080000Z"));
        assert_eq!(
            property(&output, "RRULE"),
            Some("FREQ=WEEKLY;INTERVAL=1;COUNT=16")
        );
        assert_eq!(property(&output, "SUMMARY"), Some("Data Structures"));
        assert_eq!(property(&output, "DESCRIPTION"), Some("CS2101 Wang"));
        assert_eq!(property(&output, "LOCATION"), Some("Minhang East 3-201"));
        assert_eq!(
            property(&output, "UID"),
            Some("20250217T080000-CS2101-0@jaccount-calendar")
        );
    }

    #[test]
    fn test_single_week_has_no_rrule() {
        let weeks = WeekRange {
            first: 5,
            last: 5,
            interval: 0,
        };
        let output = writer().render(&[course(weeks)]).unwrap();
        assert_eq!(property(&output, "RRULE"), None);
        assert_eq!(property(&output, "DTSTART"), Some("20250317T080000"));
    }

    #[test]
    fn test_alternating_weeks() {
        let weeks = WeekRange {
            first: 2,
            last: 16,
            interval: 2,
        };
        let output = writer().render(&[course(weeks)]).unwrap();
        assert_eq!(
            property(&output, "RRULE"),
            Some("FREQ=WEEKLY;INTERVAL=2;COUNT=8")
        );
        assert_eq!(property(&output, "DTSTART"), Some("20250224T080000"));
    }

    #[test]
    fn test_long_text_is_folded() {
        let mut long = course(WeekRange {
            first: 1,
            last: 1,
            interval: 0,
        });
        long.name = "高等数学".repeat(20);
        let output = writer().render(&[long.clone()]).unwrap();

        assert!(output.split("\r\n").all(|line| line.len() < long.name.len()));
        assert_eq!(
            property(&output.replace("\r\n ", ""), "SUMMARY"),
            Some(long.name.as_str())
        );
    }

    #[test]
    fn test_default_file_name() {
        assert_eq!(default_file_name(2024, 2), "2024-2025-2.ics");
    }

    #[test]
    fn test_write_to_file() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let path = temp_dir.path().join("out.ics");
        let weeks = WeekRange {
            first: 1,
            last: 1,
            interval: 0,
        };
        writer().write_to(&path, &[course(weeks)]).unwrap();
        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content.matches("BEGIN:VEVENT").count(), 1);
    }
}

//! Course records and the timetable rules used to place them on a calendar
//!
//! The course service returns one raw record per course slot. A record's week
//! field may list several ranges (`1-8周,10-16周(双)`), so one raw record can
//! turn into several [`Course`] values, one per range.

use chrono::{Days, NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Deserializer, Serialize};

use crate::errors::{CalendarError, CalendarResult, CourseError, CourseResult};

/// Class periods as (start hour, start minute, end hour, end minute), period 1 first
const TIMETABLE: [(u32, u32, u32, u32); 13] = [
    (8, 0, 8, 45),
    (8, 55, 9, 40),
    (10, 0, 10, 45),
    (10, 55, 11, 40),
    (12, 0, 12, 45),
    (12, 55, 13, 40),
    (14, 0, 14, 45),
    (14, 55, 15, 40),
    (16, 0, 16, 45),
    (16, 55, 17, 40),
    (18, 0, 18, 45),
    (18, 55, 19, 40),
    (19, 35, 20, 20),
];

/// First Monday of each known term as (year, term, (y, m, d))
const TERM_STARTS: [(i32, u8, (i32, u32, u32)); 12] = [
    (2021, 1, (2021, 9, 13)),
    (2021, 2, (2022, 2, 14)),
    (2021, 3, (2022, 6, 20)),
    (2022, 1, (2022, 9, 12)),
    (2022, 2, (2023, 2, 13)),
    (2022, 3, (2025, 6, 19)),
    (2023, 1, (2023, 9, 11)),
    (2023, 2, (2025, 2, 19)),
    (2023, 3, (2025, 6, 24)),
    (2024, 1, (2024, 9, 16)),
    (2024, 2, (2025, 2, 17)),
    (2024, 3, (2025, 6, 23)),
];

/// Built-in start date of a term, if known
pub fn term_start(year: i32, term: u8) -> Option<NaiveDate> {
    TERM_STARTS
        .iter()
        .find(|(y, t, _)| *y == year && *t == term)
        .and_then(|(_, _, (y, m, d))| NaiveDate::from_ymd_opt(*y, *m, *d))
}

/// Start and end time of a class period
///
/// # Errors
///
/// Returns `CourseError::UnknownPeriod` outside 1..=13
pub fn period_times(period: u32) -> CourseResult<(NaiveTime, NaiveTime)> {
    let index = period
        .checked_sub(1)
        .ok_or(CourseError::UnknownPeriod { period })?;
    let (sh, sm, eh, em) = *TIMETABLE
        .get(index as usize)
        .ok_or(CourseError::UnknownPeriod { period })?;

    match (
        NaiveTime::from_hms_opt(sh, sm, 0),
        NaiveTime::from_hms_opt(eh, em, 0),
    ) {
        (Some(start), Some(end)) => Ok((start, end)),
        _ => Err(CourseError::UnknownPeriod { period }),
    }
}

/// One entry of the service's `kbList`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawCourse {
    #[serde(rename = "kcmc")]
    pub name: String,
    #[serde(rename = "kch", default, deserialize_with = "string_or_number")]
    pub id: String,
    #[serde(rename = "xm", default)]
    pub instructor: String,
    #[serde(rename = "xqmc", default)]
    pub campus: String,
    #[serde(rename = "cdmc", default)]
    pub room: String,
    #[serde(rename = "xqj", deserialize_with = "string_or_number")]
    pub weekday: String,
    #[serde(rename = "jcs", deserialize_with = "string_or_number")]
    pub periods: String,
    #[serde(rename = "zcd")]
    pub weeks: String,
}

/// Accept `"3"` and `3` alike
fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Scalar {
        Text(String),
        Int(i64),
        Float(f64),
    }

    Ok(match Scalar::deserialize(deserializer)? {
        Scalar::Text(s) => s,
        Scalar::Int(n) => n.to_string(),
        Scalar::Float(n) => n.to_string(),
    })
}

/// Active weeks of a course
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WeekRange {
    pub first: u32,
    pub last: u32,
    /// 0 for a single week, 1 for every week, 2 for alternating weeks
    pub interval: u32,
}

impl WeekRange {
    /// Parse one segment such as `3-9周`, `5周` or `2-16周(双)`
    ///
    /// # Errors
    ///
    /// Returns `CourseError::InvalidWeeks` for anything else
    pub fn parse(segment: &str) -> CourseResult<Self> {
        let invalid = |reason: &str| CourseError::InvalidWeeks {
            value: segment.to_string(),
            reason: reason.to_string(),
        };

        let (range, marker) = segment
            .trim()
            .split_once('周')
            .ok_or_else(|| invalid("missing 周"))?;
        let alternating = !marker.trim().is_empty();

        let numbers = range
            .split('-')
            .map(|n| n.trim().parse::<u32>())
            .collect::<Result<Vec<_>, _>>()
            .map_err(|_| invalid("week numbers must be positive integers"))?;

        let (first, last, interval) = match numbers.as_slice() {
            [week] => (*week, *week, 0),
            [first, last] if alternating => (*first, *last, 2),
            [first, last] => (*first, *last, 1),
            _ => return Err(invalid("expected one or two week numbers")),
        };

        if first == 0 {
            return Err(invalid("weeks start at 1"));
        }
        if last < first {
            return Err(invalid("range ends before it starts"));
        }

        Ok(Self {
            first,
            last,
            interval,
        })
    }

    /// Parse the whole comma-separated week field
    pub fn parse_list(weeks: &str) -> CourseResult<Vec<Self>> {
        weeks
            .split(',')
            .filter(|segment| !segment.trim().is_empty())
            .map(Self::parse)
            .collect()
    }

    /// Number of weekly occurrences
    pub fn recurrence_count(&self) -> u32 {
        if self.interval == 0 {
            1
        } else {
            (self.last - self.first) / self.interval + 1
        }
    }

    /// `(interval, count)` when the course happens more than once
    pub fn recurrence(&self) -> Option<(u32, u32)> {
        let count = self.recurrence_count();
        (count > 1).then_some((self.interval, count))
    }
}

/// Consecutive class periods
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PeriodRange {
    pub first: u32,
    pub last: u32,
}

impl PeriodRange {
    /// Parse `a-b` or a single `a`
    pub fn parse(value: &str) -> CourseResult<Self> {
        let invalid = || CourseError::InvalidField {
            field: "jcs",
            value: value.to_string(),
        };

        let numbers = value
            .split('-')
            .map(|n| n.trim().parse::<u32>())
            .collect::<Result<Vec<_>, _>>()
            .map_err(|_| invalid())?;

        let (first, last) = match numbers.as_slice() {
            [period] => (*period, *period),
            [first, last] if first <= last => (*first, *last),
            _ => return Err(invalid()),
        };

        // Validate both ends against the timetable up front.
        period_times(first)?;
        period_times(last)?;
        Ok(Self { first, last })
    }

    /// Class start and end time of the whole block
    pub fn times(&self) -> CourseResult<(NaiveTime, NaiveTime)> {
        let (start, _) = period_times(self.first)?;
        let (_, end) = period_times(self.last)?;
        Ok((start, end))
    }
}

/// A validated course for one week range
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Course {
    pub name: String,
    pub id: String,
    pub instructor: String,
    pub campus: String,
    pub room: String,
    /// 1 = Monday .. 7 = Sunday
    pub weekday: u32,
    pub periods: PeriodRange,
    pub weeks: WeekRange,
}

impl Course {
    /// Validate a raw record, producing one course per week range
    ///
    /// # Errors
    ///
    /// Returns `CourseError` if any field fails validation
    pub fn from_raw(raw: &RawCourse) -> CourseResult<Vec<Self>> {
        let weekday = raw
            .weekday
            .trim()
            .parse::<u32>()
            .ok()
            .filter(|day| (1..=7).contains(day))
            .ok_or_else(|| CourseError::InvalidField {
                field: "xqj",
                value: raw.weekday.clone(),
            })?;
        let periods = PeriodRange::parse(&raw.periods)?;

        let ranges = WeekRange::parse_list(&raw.weeks)?;
        if ranges.is_empty() {
            return Err(CourseError::InvalidWeeks {
                value: raw.weeks.clone(),
                reason: "no week ranges".to_string(),
            });
        }

        Ok(ranges
            .into_iter()
            .map(|weeks| Self {
                name: raw.name.trim().to_string(),
                id: raw.id.trim().to_string(),
                instructor: raw.instructor.trim().to_string(),
                campus: raw.campus.trim().to_string(),
                room: raw.room.trim().to_string(),
                weekday,
                periods,
                weeks,
            })
            .collect())
    }

    /// Validate every record of a listing
    pub fn from_raw_list(raw: &[RawCourse]) -> CourseResult<Vec<Self>> {
        let mut courses = Vec::with_capacity(raw.len());
        for record in raw {
            courses.extend(Self::from_raw(record)?);
        }
        Ok(courses)
    }

    /// Date of the first occurrence
    pub fn first_date(&self, term_start: NaiveDate) -> CalendarResult<NaiveDate> {
        let offset = u64::from(self.weekday - 1) + 7 * u64::from(self.weeks.first - 1);
        term_start
            .checked_add_days(Days::new(offset))
            .ok_or_else(|| CalendarError::DateOutOfRange {
                reason: format!("{} + {} days", term_start, offset),
            })
    }

    /// Start and end of the first occurrence, in local time
    pub fn first_occurrence(
        &self,
        term_start: NaiveDate,
    ) -> CalendarResult<(NaiveDateTime, NaiveDateTime)> {
        let date = self.first_date(term_start)?;
        let (start, end) = self
            .periods
            .times()
            .map_err(|e| CalendarError::DateOutOfRange {
                reason: e.to_string(),
            })?;
        Ok((date.and_time(start), date.and_time(end)))
    }

    /// Text for the event description
    pub fn description(&self) -> String {
        join_non_empty(&self.id, &self.instructor)
    }

    /// Text for the event location
    pub fn location(&self) -> String {
        join_non_empty(&self.campus, &self.room)
    }
}

fn join_non_empty(a: &str, b: &str) -> String {
    match (a.is_empty(), b.is_empty()) {
        (false, false) => format!("{} {}", a, b),
        (false, true) => a.to_string(),
        (true, _) => b.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(weeks: &str) -> RawCourse {
        RawCourse {
            name: "Linear Algebra".to_string(),
            id: "MATH1205".to_string(),
            instructor: "Zhang San".to_string(),
            campus: "Minhang".to_string(),
            room: "Upper 301".to_string(),
            weekday: "3".to_string(),
            periods: "3-4".to_string(),
            weeks: weeks.to_string(),
        }
    }

    #[test]
    fn test_contiguous_weeks() {
        let weeks = WeekRange::parse("3-9周").unwrap();
        assert_eq!(
            weeks,
            WeekRange {
                first: 3,
                last: 9,
                interval: 1
            }
        );
        assert_eq!(weeks.recurrence_count(), 7);
        assert_eq!(weeks.recurrence(), Some((1, 7)));
    }

    #[test]
    fn test_single_week_has_no_recurrence() {
        let weeks = WeekRange::parse("5周").unwrap();
        assert_eq!(weeks.interval, 0);
        assert_eq!(weeks.recurrence(), None);

        let same = WeekRange::parse("5-5周").unwrap();
        assert_eq!(same.recurrence(), None);
    }

    #[test]
    fn test_alternating_weeks() {
        let weeks = WeekRange::parse("2-16周(双)").unwrap();
        assert_eq!(weeks.interval, 2);
        assert_eq!(weeks.recurrence_count(), 8);

        let odd = WeekRange::parse("1-15周(单)").unwrap();
        assert_eq!(odd.recurrence(), Some((2, 8)));
    }

    #[test]
    fn test_malformed_weeks_rejected() {
        for bad in ["1-2-3周", "周", "3-9", "9-3周", "0-4周", "a-b周"] {
            assert!(
                matches!(WeekRange::parse(bad), Err(CourseError::InvalidWeeks { .. })),
                "{} should be rejected",
                bad
            );
        }
    }

    #[test]
    fn test_week_list() {
        let ranges = WeekRange::parse_list("1-8周,10-16周(双)").unwrap();
        assert_eq!(ranges.len(), 2);
        assert_eq!(ranges[1].interval, 2);
    }

    #[test]
    fn test_period_times() {
        let (start, end) = PeriodRange::parse("3-4").unwrap().times().unwrap();
        assert_eq!(start, NaiveTime::from_hms_opt(10, 0, 0).unwrap());
        assert_eq!(end, NaiveTime::from_hms_opt(11, 40, 0).unwrap());

        let single = PeriodRange::parse("13").unwrap();
        assert_eq!(single.first, single.last);
        assert!(matches!(
            PeriodRange::parse("12-14"),
            Err(CourseError::UnknownPeriod { period: 14 })
        ));
        assert!(PeriodRange::parse("4-3").is_err());
    }

    #[test]
    fn test_term_start_table() {
        assert_eq!(term_start(2024, 2), NaiveDate::from_ymd_opt(2025, 2, 17));
        assert_eq!(term_start(2021, 1), NaiveDate::from_ymd_opt(2021, 9, 13));
        assert_eq!(term_start(2030, 1), None);
    }

    #[test]
    fn test_raw_course_accepts_numbers() {
        let json = r#"{"kcmc":"Physics","kch":"PHY1","xm":"Li","xqmc":"Xuhui","cdmc":"A101",
                       "xqj":2,"jcs":"1-2","zcd":"1-16周"}"#;
        let record: RawCourse = serde_json::from_str(json).unwrap();
        assert_eq!(record.weekday, "2");
    }

    #[test]
    fn test_first_occurrence() {
        let courses = Course::from_raw(&raw("3-9周")).unwrap();
        assert_eq!(courses.len(), 1);

        let term = NaiveDate::from_ymd_opt(2025, 2, 17).unwrap();
        let (start, end) = courses[0].first_occurrence(term).unwrap();
        // Wednesday of week 3
        assert_eq!(start.date(), NaiveDate::from_ymd_opt(2025, 3, 5).unwrap());
        assert_eq!(start.time(), NaiveTime::from_hms_opt(10, 0, 0).unwrap());
        assert_eq!(end.time(), NaiveTime::from_hms_opt(11, 40, 0).unwrap());
    }

    #[test]
    fn test_invalid_weekday() {
        let mut record = raw("1-16周");
        record.weekday = "8".to_string();
        assert!(matches!(
            Course::from_raw(&record),
            Err(CourseError::InvalidField { field: "xqj", .. })
        ));
    }

    #[test]
    fn test_description_and_location() {
        let course = Course::from_raw(&raw("1周")).unwrap().remove(0);
        assert_eq!(course.description(), "MATH1205 Zhang San");
        assert_eq!(course.location(), "Minhang Upper 301");

        let mut record = raw("1周");
        record.room.clear();
        let course = Course::from_raw(&record).unwrap().remove(0);
        assert_eq!(course.location(), "Minhang");
    }
}

//! Timetable retrieval from the course service
//!
//! One authenticated POST per run. The service answers with the student's
//! info block (including a course count) and the raw course list.

use reqwest::header::CONTENT_TYPE;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, info};

use crate::app::client::SessionHandle;
use crate::app::models::RawCourse;
use crate::constants::courses;
use crate::errors::{CourseError, CourseResult};

/// Result of a timetable query
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CourseListing {
    /// The service reports no courses for the term
    Empty,
    /// Raw records, in service order
    Courses(Vec<RawCourse>),
}

#[derive(Debug, Deserialize)]
struct ListingBody {
    #[serde(default)]
    xsxx: Option<Value>,
    #[serde(rename = "kbList", default)]
    course_list: Vec<RawCourse>,
}

/// Query the default course service
///
/// # Errors
///
/// Returns `CourseError` on transport failure, unknown term or a malformed reply
pub async fn fetch_courses(
    session: &SessionHandle,
    year: i32,
    term: u8,
) -> CourseResult<CourseListing> {
    fetch_courses_from(session, courses::TIMETABLE_URL, year, term).await
}

/// Query a course service at `url`
pub async fn fetch_courses_from(
    session: &SessionHandle,
    url: &str,
    year: i32,
    term: u8,
) -> CourseResult<CourseListing> {
    let term_code = courses::term_code(term).ok_or(CourseError::UnknownTerm { term })?;
    let year = year.to_string();

    info!("Fetching courses for {} term {}", year, term);
    let response = session
        .client()
        .post(url)
        .form(&[("xnm", year.as_str()), ("xqm", term_code)])
        .send()
        .await?;

    let status = response.status();
    if !status.is_success() {
        return Err(CourseError::Status {
            status: status.as_u16(),
        });
    }

    let content_type = response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .unwrap_or("unknown")
        .to_string();
    if !content_type.contains("json") {
        return Err(CourseError::UnexpectedContent { content_type });
    }

    let body = response.text().await?;
    debug!("Course listing: {} bytes", body.len());
    parse_listing(&body)
}

/// Decode a listing body
pub fn parse_listing(body: &str) -> CourseResult<CourseListing> {
    let listing: ListingBody = serde_json::from_str(body)?;

    let count = listing
        .xsxx
        .as_ref()
        .and_then(|info| info.get("KCMS"))
        .and_then(|count| match count {
            Value::Number(n) => n.as_u64(),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        });

    if count == Some(0) || listing.course_list.is_empty() {
        info!("No courses this term");
        return Ok(CourseListing::Empty);
    }

    info!("Retrieved {} course records", listing.course_list.len());
    Ok(CourseListing::Courses(listing.course_list))
}

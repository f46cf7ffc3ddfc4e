//! Pure builders turning raw server records into domain entities. No I/O.
//!
//! Required fields fail loudly with [`BuildError::MissingField`] — a silently
//! half-built entity would only surface later as a confusing link-lookup
//! failure. The one deliberate local recovery is the event date: an absent or
//! unparseable date degrades to "now" instead of failing the whole record.

use chrono::{DateTime, NaiveDateTime, Utc};
use log::debug;
use serde_json::Value;
use std::fmt;

use crate::hal::Links;
use crate::{Competition, Event, EventKind, Fixture, Resolution, Season, Team, VideoSource};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BuildError {
    MissingField { field: &'static str },
}

impl fmt::Display for BuildError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BuildError::MissingField { field } => {
                write!(f, "record is missing required field '{field}'")
            }
        }
    }
}

impl std::error::Error for BuildError {}

pub fn build_competition(record: &Value) -> Result<Competition, BuildError> {
    Ok(Competition {
        id: req_id(record, "id")?,
        name: req_name(record, "name")?,
        abbreviation: opt_str(record, "abbreviation"),
        links: req_links(record)?,
    })
}

pub fn build_team(record: &Value) -> Result<Team, BuildError> {
    Ok(Team {
        id: req_id(record, "id")?,
        name: req_name(record, "name")?,
        abbreviation: opt_str(record, "abbreviation"),
        links: req_links(record)?,
    })
}

/// Build an event of the appropriate kind from a raw record.
///
/// The discriminant is structural: a `homeTeam` field makes the record a
/// match (and then `awayTeam` is required too); otherwise it is a highlight.
pub fn build_event(record: &Value) -> Result<Event, BuildError> {
    let competition = record
        .get("competition")
        .ok_or(BuildError::MissingField { field: "competition" })
        .and_then(build_competition)?;

    let kind = match record.get("homeTeam") {
        Some(home) => {
            let away = record
                .get("awayTeam")
                .ok_or(BuildError::MissingField { field: "awayTeam" })?;
            EventKind::Match { home: build_team(home)?, away: build_team(away)? }
        }
        None => EventKind::Highlight,
    };

    Ok(Event {
        id: req_id(record, "eventId")?,
        date: event_date(record),
        title: req_str(record, "title")?,
        competition,
        fixture: build_fixture(record.get("fixture")),
        season: build_season(record.get("season")),
        links: req_links(record)?,
        kind,
    })
}

/// Build one stream variant. Stream URL and resolution are required (the
/// latter is the ranking key); every other field is deployment-dependent
/// metadata and defaults to empty when absent.
pub fn build_video_source(record: &Value) -> Result<VideoSource, BuildError> {
    let links = req_links(record)?;
    let stream_url = ["stream", "transport-stream", "video-stream"]
        .into_iter()
        .find_map(|name| links.href(name))
        .ok_or(BuildError::MissingField { field: "_links.stream" })?
        .to_owned();

    let resolution = record
        .get("resolution")
        .and_then(Value::as_str)
        .and_then(Resolution::parse)
        .ok_or(BuildError::MissingField { field: "resolution" })?;

    Ok(VideoSource {
        channel: opt_str(record, "channel"),
        source: opt_str(record, "source"),
        languages: languages(record.get("languages")),
        resolution,
        media_container: opt_str(record, "mediaContainer"),
        bitrate: record.get("bitrate").and_then(Value::as_u64),
        framerate: record
            .get("frameRate")
            .and_then(Value::as_u64)
            .and_then(|n| u32::try_from(n).ok()),
        video_codec: opt_str(record, "videoCodec"),
        audio_codec: opt_str(record, "audioCodec"),
        stream_url,
    })
}

// ---------------------------------------------------------------------------
// Field projection helpers
// ---------------------------------------------------------------------------

fn event_date(record: &Value) -> DateTime<Utc> {
    let raw = record.get("date").and_then(Value::as_str).unwrap_or_default();
    parse_date(raw).unwrap_or_else(|| {
        debug!("unparseable event date {raw:?}; substituting current time");
        Utc::now()
    })
}

fn parse_date(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    // Zone-less timestamps from older server versions; treated as UTC.
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|naive| naive.and_utc())
}

fn build_fixture(value: Option<&Value>) -> Option<Fixture> {
    let value = value?;
    let fixture = Fixture {
        title: opt_str(value, "title"),
        number: value
            .get("fixtureNumber")
            .and_then(Value::as_u64)
            .and_then(|n| u32::try_from(n).ok()),
    };
    (fixture != Fixture::default()).then_some(fixture)
}

fn build_season(value: Option<&Value>) -> Option<Season> {
    let value = value?;
    let date_at = |field: &str| {
        value
            .get(field)
            .and_then(Value::as_str)
            .and_then(parse_date)
    };
    let season = Season { start: date_at("startDate"), end: date_at("endDate") };
    (season != Season::default()).then_some(season)
}

fn languages(value: Option<&Value>) -> Vec<String> {
    match value {
        Some(Value::Array(entries)) => entries
            .iter()
            .filter_map(Value::as_str)
            .map(str::to_owned)
            .collect(),
        // Some deployments send a single comma-separated string.
        Some(Value::String(joined)) => joined
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_owned)
            .collect(),
        _ => Vec::new(),
    }
}

/// Required identifier; the server has sent both string and numeric ids.
fn req_id(record: &Value, field: &'static str) -> Result<String, BuildError> {
    match record.get(field) {
        Some(Value::String(id)) => Ok(id.clone()),
        Some(Value::Number(id)) => Ok(id.to_string()),
        _ => Err(BuildError::MissingField { field }),
    }
}

fn req_str(record: &Value, field: &'static str) -> Result<String, BuildError> {
    record
        .get(field)
        .and_then(Value::as_str)
        .map(str::to_owned)
        .ok_or(BuildError::MissingField { field })
}

/// Required display name. Accepts both the plain form `"name": "..."` and the
/// wrapped form `"name": {"name": "..."}` used for teams.
fn req_name(record: &Value, field: &'static str) -> Result<String, BuildError> {
    let value = record.get(field).ok_or(BuildError::MissingField { field })?;
    value
        .as_str()
        .or_else(|| value.get("name").and_then(Value::as_str))
        .map(str::to_owned)
        .ok_or(BuildError::MissingField { field })
}

fn opt_str(record: &Value, field: &str) -> Option<String> {
    record.get(field).and_then(Value::as_str).map(str::to_owned)
}

fn req_links(record: &Value) -> Result<Links, BuildError> {
    let raw = record
        .get("_links")
        .ok_or(BuildError::MissingField { field: "_links" })?;
    serde_json::from_value(raw.clone())
        .map_err(|_| BuildError::MissingField { field: "_links" })
}

pub mod build;
pub mod client;
pub mod hal;
pub mod repository;
pub mod source;

use chrono::{DateTime, Utc};

use crate::hal::Links;

// ---------------------------------------------------------------------------
// Domain types — clean model, independent of the server wire format
// ---------------------------------------------------------------------------

/// A competition (league or cup) hosted on the server.
///
/// Carries its own link map so related collections (teams, events, artwork)
/// are always resolved through server-provided hrefs, never client-built URLs.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Competition {
    pub id: String,
    pub name: String,
    pub abbreviation: Option<String>,
    pub links: Links,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Team {
    pub id: String,
    pub name: String,
    pub abbreviation: Option<String>,
    pub links: Links,
}

/// A broadcast event: either a match between two teams or a highlight show.
#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    pub id: String,
    pub date: DateTime<Utc>,
    pub title: String,
    pub competition: Competition,
    pub fixture: Option<Fixture>,
    pub season: Option<Season>,
    pub links: Links,
    pub kind: EventKind,
}

/// Structural discriminant over the shared event contract. A record carrying
/// a home team is a match; anything else is a highlight-style show.
#[derive(Debug, Clone, PartialEq)]
pub enum EventKind {
    Highlight,
    Match { home: Team, away: Team },
}

impl Event {
    pub fn is_match(&self) -> bool {
        matches!(self.kind, EventKind::Match { .. })
    }

    /// Home and away teams, when this event is a match.
    pub fn teams(&self) -> Option<(&Team, &Team)> {
        match &self.kind {
            EventKind::Match { home, away } => Some((home, away)),
            EventKind::Highlight => None,
        }
    }
}

/// Position of an event within a competition's schedule, e.g. "Matchday 12".
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Fixture {
    pub title: Option<String>,
    pub number: Option<u32>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Season {
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
}

// ---------------------------------------------------------------------------
// Video sources
// ---------------------------------------------------------------------------

/// One encoded rendition of an event's video, ranked by [`Resolution`].
///
/// Metadata completeness varies by server deployment, so everything except
/// the stream URL and the resolution is optional with empty defaults.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VideoSource {
    pub channel: Option<String>,
    pub source: Option<String>,
    pub languages: Vec<String>,
    pub resolution: Resolution,
    pub media_container: Option<String>,
    pub bitrate: Option<u64>,
    pub framerate: Option<u32>,
    pub video_codec: Option<String>,
    pub audio_codec: Option<String>,
    pub stream_url: String,
}

/// Vertical line count of a rendition; the ranking key for variant ordering.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord)]
pub struct Resolution(pub u32);

impl Resolution {
    /// Parse server resolution labels: `"1080p"`, `"R_720p"`, `"1920x1080"`,
    /// `"4K"`. Returns `None` when no usable line count can be extracted.
    pub fn parse(raw: &str) -> Option<Self> {
        let upper = raw.trim().to_ascii_uppercase();
        match upper.trim_start_matches("R_") {
            "4K" | "UHD" => return Some(Resolution(2160)),
            "8K" => return Some(Resolution(4320)),
            _ => {}
        }
        // "WxH" labels carry the vertical count after the separator;
        // otherwise the first digit run is the line count.
        let digits: String = match upper.split_once('X') {
            Some((_, after)) => after.chars().take_while(char::is_ascii_digit).collect(),
            None => upper
                .chars()
                .skip_while(|c| !c.is_ascii_digit())
                .take_while(char::is_ascii_digit)
                .collect(),
        };
        digits.parse().ok().filter(|&n| n > 0).map(Resolution)
    }
}

impl std::fmt::Display for Resolution {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}p", self.0)
    }
}

// ---------------------------------------------------------------------------
// Pagination
// ---------------------------------------------------------------------------

/// Continuation state for a paged collection: the server's `next` href.
/// Absence means the final page has been reached.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageCursor {
    pub href: String,
}

/// One fetched page of a collection, paired with its continuation cursor.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub next: Option<PageCursor>,
}

impl<T> Page<T> {
    pub fn is_last(&self) -> bool {
        self.next.is_none()
    }
}

//! Per-entity-kind repositories: lazily fetched first-page caches plus
//! relation traversal through entity link maps.
//!
//! Only the first page of a collection is ever cached; continuation pages are
//! always fetched fresh. A failed fetch leaves the previous cache intact.
//! Repositories are constructed once by the shell's top-level wiring (see
//! [`Repositories`]) instead of living in hidden globals.

use log::debug;

use crate::client::{ApiError, ApiResult, MatchdayApi};
use crate::{Competition, Event, Page, PageCursor, Team};

pub struct CompetitionRepository {
    api: MatchdayApi,
    cache: Option<Page<Competition>>,
}

impl CompetitionRepository {
    pub fn new(api: MatchdayApi) -> Self {
        Self { api, cache: None }
    }

    pub fn get_all(&mut self, cursor: Option<&PageCursor>) -> ApiResult<Page<Competition>> {
        if let Some(cursor) = cursor {
            return self.api.competitions(Some(cursor));
        }
        if let Some(cached) = &self.cache {
            return Ok(cached.clone());
        }
        let page = self.api.competitions(None)?;
        self.cache = Some(page.clone());
        Ok(page)
    }

    /// Linear scan of the cached first page; `None` is a normal outcome.
    pub fn get_by_id(&self, id: &str) -> Option<&Competition> {
        self.cache.as_ref()?.items.iter().find(|c| c.id == id)
    }

    pub fn teams_of(&mut self, comp_id: &str) -> ApiResult<Page<Team>> {
        if self.cache.is_none() {
            self.get_all(None)?;
        }
        let competition = self
            .get_by_id(comp_id)
            .ok_or_else(|| ApiError::NotFound(format!("competition '{comp_id}'")))?;
        self.api.teams_of(competition)
    }

    pub fn events_of(&mut self, comp_id: &str) -> ApiResult<Page<Event>> {
        if self.cache.is_none() {
            self.get_all(None)?;
        }
        let competition = self
            .get_by_id(comp_id)
            .ok_or_else(|| ApiError::NotFound(format!("competition '{comp_id}'")))?;
        debug!("resolving events for competition {comp_id}");
        self.api.events_of_competition(competition)
    }
}

pub struct TeamRepository {
    api: MatchdayApi,
    cache: Option<Page<Team>>,
}

impl TeamRepository {
    pub fn new(api: MatchdayApi) -> Self {
        Self { api, cache: None }
    }

    pub fn get_all(&mut self, cursor: Option<&PageCursor>) -> ApiResult<Page<Team>> {
        if let Some(cursor) = cursor {
            return self.api.teams(Some(cursor));
        }
        if let Some(cached) = &self.cache {
            return Ok(cached.clone());
        }
        let page = self.api.teams(None)?;
        self.cache = Some(page.clone());
        Ok(page)
    }

    pub fn get_by_id(&self, id: &str) -> Option<&Team> {
        self.cache.as_ref()?.items.iter().find(|t| t.id == id)
    }

    pub fn events_of(&mut self, team_id: &str) -> ApiResult<Page<Event>> {
        if self.cache.is_none() {
            self.get_all(None)?;
        }
        let team = self
            .get_by_id(team_id)
            .ok_or_else(|| ApiError::NotFound(format!("team '{team_id}'")))?;
        self.api.events_of_team(team)
    }
}

pub struct EventRepository {
    api: MatchdayApi,
    cache: Option<Page<Event>>,
}

impl EventRepository {
    pub fn new(api: MatchdayApi) -> Self {
        Self { api, cache: None }
    }

    pub fn get_all(&mut self, cursor: Option<&PageCursor>) -> ApiResult<Page<Event>> {
        if let Some(cursor) = cursor {
            return self.api.events(Some(cursor));
        }
        if let Some(cached) = &self.cache {
            return Ok(cached.clone());
        }
        let page = self.api.events(None)?;
        self.cache = Some(page.clone());
        Ok(page)
    }

    pub fn get_by_id(&self, id: &str) -> Option<&Event> {
        self.cache.as_ref()?.items.iter().find(|e| e.id == id)
    }

    pub fn featured(&self) -> ApiResult<Vec<Event>> {
        self.api.featured_events()
    }
}

/// Session-wide repository bundle, built once from a single client and
/// handed by reference into navigation handlers.
pub struct Repositories {
    pub competitions: CompetitionRepository,
    pub teams: TeamRepository,
    pub events: EventRepository,
}

impl Repositories {
    pub fn new(api: MatchdayApi) -> Self {
        Self {
            competitions: CompetitionRepository::new(api.clone()),
            teams: TeamRepository::new(api.clone()),
            events: EventRepository::new(api),
        }
    }
}

//! Video source resolution: parse a source-list resource into ranked
//! variants, then resolve the chosen variant (or the server's preferred one)
//! into a playable playlist.
//!
//! This is the one path with a user-visible failure requirement: a fetch or
//! parse failure during resolution is reported through the [`Notify`] seam
//! and playback simply does not start.

use log::{debug, error};
use serde_json::Value;
use std::fmt;

use crate::VideoSource;
use crate::build;
use crate::client::{ApiError, ApiResult, MatchdayApi};
use crate::hal::Document;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectionError {
    OutOfRange { index: usize, len: usize },
}

impl fmt::Display for SelectionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SelectionError::OutOfRange { index, len } => {
                write!(f, "variant index {index} out of range (0..{len})")
            }
        }
    }
}

impl std::error::Error for SelectionError {}

/// A parsed source-list resource: the server-designated preferred stream plus
/// all variants, ranked by resolution descending. Index 0 is always best.
#[derive(Debug, Clone, PartialEq)]
pub struct VideoSourceList {
    preferred_url: String,
    variants: Vec<VideoSource>,
}

impl VideoSourceList {
    /// Parse a fetched source-list document. Newer servers embed variants
    /// under `video-sources`; older ones used `video-resources`.
    pub fn from_doc(doc: &Document) -> ApiResult<Self> {
        let preferred_url = doc
            .href("preferred")
            .ok_or_else(|| ApiError::NotFound("source list has no 'preferred' link".into()))?
            .to_owned();

        let records: &[Value] = {
            let current = doc.embedded("video-sources");
            if current.is_empty() { doc.embedded("video-resources") } else { current }
        };
        let mut variants = records
            .iter()
            .map(|record| build::build_video_source(record).map_err(ApiError::from))
            .collect::<Result<Vec<VideoSource>, ApiError>>()?;

        // Deterministic total order: resolution descending, bitrate breaking
        // ties. Stable sort keeps server order for full ties.
        variants.sort_by_key(|v| std::cmp::Reverse((v.resolution, v.bitrate.unwrap_or(0))));

        Ok(Self { preferred_url, variants })
    }

    /// The server-designated preferred stream href. May legitimately differ
    /// from the locally ranked best variant (licensing, geo).
    pub fn preferred_url(&self) -> &str {
        &self.preferred_url
    }

    pub fn variants(&self) -> &[VideoSource] {
        &self.variants
    }

    /// Highest-resolution variant; `None` only when the list is empty.
    pub fn best(&self) -> Option<&VideoSource> {
        self.variants.first()
    }

    /// User-driven selection from a dialog; bounds-checked.
    pub fn variant(&self, index: usize) -> Result<&VideoSource, SelectionError> {
        self.variants
            .get(index)
            .ok_or(SelectionError::OutOfRange { index, len: self.variants.len() })
    }
}

/// A playable playlist resource: the master href plus its variant hrefs,
/// split out of the resource's link map.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Playlist {
    master: Option<String>,
    variants: Vec<String>,
}

impl Playlist {
    pub fn from_doc(doc: &Document) -> Self {
        let mut master = None;
        let mut variants = Vec::new();
        for (name, link) in doc.links().iter() {
            if name == "master" {
                master = Some(link.href.clone());
            } else {
                variants.push(link.href.clone());
            }
        }
        Self { master, variants }
    }

    pub fn master_url(&self) -> Option<&str> {
        self.master.as_deref()
    }

    pub fn variant_url(&self, index: usize) -> Result<&str, SelectionError> {
        self.variants
            .get(index)
            .map(String::as_str)
            .ok_or(SelectionError::OutOfRange { index, len: self.variants.len() })
    }

    pub fn variant_urls(&self) -> &[String] {
        &self.variants
    }
}

/// User-facing notification surface, implemented by the host shell.
pub trait Notify {
    fn notify(&self, heading: &str, message: &str);
}

/// Fallback notifier for embedders without a notification surface.
pub struct LogNotifier;

impl Notify for LogNotifier {
    fn notify(&self, heading: &str, message: &str) {
        log::warn!("{heading}: {message}");
    }
}

/// Stateless resolution engine wiring the client to the notification seam.
pub struct SourceResolver<'a> {
    api: &'a MatchdayApi,
    notifier: &'a dyn Notify,
}

impl<'a> SourceResolver<'a> {
    pub fn new(api: &'a MatchdayApi, notifier: &'a dyn Notify) -> Self {
        Self { api, notifier }
    }

    /// Fetch and parse a source-list resource. A failure is reported to the
    /// user and resolution yields no playable source.
    pub fn resolve_source_list(&self, url: &str) -> Option<VideoSourceList> {
        match self.fetch_source_list(url) {
            Ok(list) => {
                debug!("resolved {} variants from {url}", list.variants().len());
                Some(list)
            }
            Err(err) => {
                error!("source list resolution failed for {url}: {err}");
                self.notifier
                    .notify("Could not retrieve video sources", &format!("Location: {url}\n{err}"));
                None
            }
        }
    }

    /// Fallible form of [`Self::resolve_source_list`], for callers that
    /// surface errors themselves.
    pub fn fetch_source_list(&self, url: &str) -> ApiResult<VideoSourceList> {
        let doc = self.api.fetch_doc(url)?;
        VideoSourceList::from_doc(&doc)
    }

    /// Follow the server-designated preferred link, independent of the local
    /// ranking.
    pub fn preferred(&self, list: &VideoSourceList) -> Option<Playlist> {
        self.download_playlist(list.preferred_url())
    }

    /// Resolve an explicitly selected variant. An out-of-range index is a
    /// caller error; a download failure is notified and yields `None`.
    pub fn variant_playlist(
        &self,
        list: &VideoSourceList,
        index: usize,
    ) -> Result<Option<Playlist>, SelectionError> {
        let variant = list.variant(index)?;
        Ok(self.download_playlist(&variant.stream_url))
    }

    fn download_playlist(&self, url: &str) -> Option<Playlist> {
        match self.api.fetch_doc(url) {
            Ok(doc) => {
                debug!("got playlist resource from {url}");
                Some(Playlist::from_doc(&doc))
            }
            Err(err) => {
                error!("playlist download failed for {url}: {err}");
                self.notifier
                    .notify("Could not retrieve playlist", &format!("Location: {url}\n{err}"));
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Resolution;
    use serde_json::json;
    use std::cell::RefCell;

    #[derive(Default)]
    struct RecordingNotifier {
        messages: RefCell<Vec<String>>,
    }

    impl Notify for RecordingNotifier {
        fn notify(&self, heading: &str, message: &str) {
            self.messages.borrow_mut().push(format!("{heading}: {message}"));
        }
    }

    fn variant(resolution: &str, stream: &str) -> serde_json::Value {
        json!({
            "resolution": resolution,
            "_links": {"stream": {"href": stream}}
        })
    }

    fn source_list_body(preferred: &str, collection_key: &str) -> String {
        json!({
            "_links": {"preferred": {"href": preferred}},
            "_embedded": {
                collection_key: [
                    variant("480p", "/streams/480"),
                    variant("1080p", "/streams/1080"),
                    variant("720p", "/streams/720")
                ]
            }
        })
        .to_string()
    }

    fn json_mock(server: &mut mockito::ServerGuard, path: &str, body: String) -> mockito::Mock {
        server
            .mock("GET", path)
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(body)
            .create()
    }

    #[test]
    fn variants_rank_by_resolution_descending() {
        let doc = Document::from_value(
            serde_json::from_str(&source_list_body("/preferred", "video-sources")).unwrap(),
        )
        .unwrap();
        let list = VideoSourceList::from_doc(&doc).unwrap();

        let resolutions: Vec<Resolution> =
            list.variants().iter().map(|v| v.resolution).collect();
        assert_eq!(resolutions, vec![Resolution(1080), Resolution(720), Resolution(480)]);
        assert_eq!(list.best().unwrap().stream_url, "/streams/1080");
        assert_eq!(list.variant(0).unwrap().resolution, Resolution(1080));
    }

    #[test]
    fn bitrate_breaks_resolution_ties() {
        let doc = Document::from_value(json!({
            "_links": {"preferred": {"href": "/p"}},
            "_embedded": {"video-sources": [
                {"resolution": "1080p", "bitrate": 4_000_000u64,
                 "_links": {"stream": {"href": "/low"}}},
                {"resolution": "1080p", "bitrate": 12_000_000u64,
                 "_links": {"stream": {"href": "/high"}}}
            ]}
        }))
        .unwrap();
        let list = VideoSourceList::from_doc(&doc).unwrap();
        assert_eq!(list.best().unwrap().stream_url, "/high");
    }

    #[test]
    fn older_video_resources_key_is_probed() {
        let doc = Document::from_value(
            serde_json::from_str(&source_list_body("/preferred", "video-resources")).unwrap(),
        )
        .unwrap();
        let list = VideoSourceList::from_doc(&doc).unwrap();
        assert_eq!(list.variants().len(), 3);
    }

    #[test]
    fn variant_selection_is_bounds_checked() {
        let doc = Document::from_value(
            serde_json::from_str(&source_list_body("/preferred", "video-sources")).unwrap(),
        )
        .unwrap();
        let list = VideoSourceList::from_doc(&doc).unwrap();
        assert_eq!(
            list.variant(3),
            Err(SelectionError::OutOfRange { index: 3, len: 3 })
        );
    }

    #[test]
    fn missing_preferred_link_is_an_error() {
        let doc = Document::from_value(json!({"_embedded": {"video-sources": []}})).unwrap();
        assert!(VideoSourceList::from_doc(&doc).is_err());
    }

    #[test]
    fn playlist_splits_master_from_variants() {
        let doc = Document::from_value(json!({
            "_links": {
                "master": {"href": "/playlist/master.m3u8"},
                "variant-480": {"href": "/playlist/480.m3u8"},
                "variant-720": {"href": "/playlist/720.m3u8"}
            }
        }))
        .unwrap();
        let playlist = Playlist::from_doc(&doc);
        assert_eq!(playlist.master_url(), Some("/playlist/master.m3u8"));
        assert_eq!(playlist.variant_urls().len(), 2);
        assert_eq!(playlist.variant_url(0).unwrap(), "/playlist/480.m3u8");
        assert!(playlist.variant_url(5).is_err());
    }

    #[test]
    fn preferred_follows_server_link_not_local_ranking() {
        let mut server = mockito::Server::new();
        let url = server.url();
        // The server prefers the 480p stream even though 1080p ranks first.
        let _list = json_mock(
            &mut server,
            "/events/e1/video",
            source_list_body(&format!("{url}/streams/480"), "video-sources"),
        );
        let _preferred = json_mock(
            &mut server,
            "/streams/480",
            json!({"_links": {"master": {"href": "/playlist/480/master.m3u8"}}}).to_string(),
        );

        let api = MatchdayApi::new(url.clone());
        let notifier = RecordingNotifier::default();
        let resolver = SourceResolver::new(&api, &notifier);

        let list = resolver.resolve_source_list(&format!("{url}/events/e1/video")).unwrap();
        assert_eq!(list.best().unwrap().resolution, Resolution(1080));

        let playlist = resolver.preferred(&list).expect("preferred stream should resolve");
        assert_eq!(playlist.master_url(), Some("/playlist/480/master.m3u8"));
        assert!(notifier.messages.borrow().is_empty());
    }

    #[test]
    fn variant_playlist_downloads_the_selected_stream() {
        let mut server = mockito::Server::new();
        let url = server.url();
        let _list = json_mock(
            &mut server,
            "/events/e1/video",
            json!({
                "_links": {"preferred": {"href": format!("{url}/streams/720")}},
                "_embedded": {"video-sources": [
                    variant("720p", &format!("{url}/streams/720"))
                ]}
            })
            .to_string(),
        );
        let _stream = json_mock(
            &mut server,
            "/streams/720",
            json!({"_links": {"master": {"href": "/playlist/720/master.m3u8"}}}).to_string(),
        );

        let api = MatchdayApi::new(url.clone());
        let notifier = RecordingNotifier::default();
        let resolver = SourceResolver::new(&api, &notifier);

        let list = resolver.resolve_source_list(&format!("{url}/events/e1/video")).unwrap();
        let playlist = resolver.variant_playlist(&list, 0).unwrap().unwrap();
        assert_eq!(playlist.master_url(), Some("/playlist/720/master.m3u8"));

        assert_eq!(
            resolver.variant_playlist(&list, 9),
            Err(SelectionError::OutOfRange { index: 9, len: 1 })
        );
    }

    #[test]
    fn resolution_failure_notifies_and_yields_no_source() {
        let mut server = mockito::Server::new();
        let _broken = server.mock("GET", "/events/e1/video").with_status(502).create();

        let api = MatchdayApi::new(server.url());
        let notifier = RecordingNotifier::default();
        let resolver = SourceResolver::new(&api, &notifier);

        assert!(resolver.resolve_source_list("/events/e1/video").is_none());
        let messages = notifier.messages.borrow();
        assert_eq!(messages.len(), 1);
        assert!(messages[0].contains("Could not retrieve video sources"));
    }

    #[test]
    fn playlist_download_failure_notifies_and_skips_playback() {
        let mut server = mockito::Server::new();
        let url = server.url();
        let _list = json_mock(
            &mut server,
            "/events/e1/video",
            source_list_body(&format!("{url}/streams/480"), "video-sources"),
        );
        let _broken = server.mock("GET", "/streams/480").with_status(500).create();

        let api = MatchdayApi::new(url.clone());
        let notifier = RecordingNotifier::default();
        let resolver = SourceResolver::new(&api, &notifier);

        let list = resolver.resolve_source_list(&format!("{url}/events/e1/video")).unwrap();
        assert!(resolver.preferred(&list).is_none());
        assert_eq!(notifier.messages.borrow().len(), 1);
    }
}

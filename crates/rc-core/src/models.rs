//! # Domain Models
//!
//! The catalog hierarchy: Theme -> Category -> Emission -> Video -> Stream.
//!
//! Every entity is immutable once built and compares by its natural key only
//! (see [`Keyed`]). Two parses of the same logical entity with different
//! descriptive text are the same record as far as sets, maps and the store
//! are concerned. Children carry their parent's key as a plain value;
//! navigating downwards is a store query, never a pointer walk.

use std::borrow::Cow;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{CatalogError, Result};

/// Description endpoint of a video; `{vid}` is replaced by the video id.
pub const VIDEO_SOURCE_URL_TEMPLATE: &str =
    "http://service.canal-plus.com/video/rest/getVideosLiees/cplus/{vid}";

const DESCRIPTION_DISPLAY_CHARS: usize = 60;
const URL_DISPLAY_CHARS: usize = 20;

/// Builds the description-service URL for a video id.
pub fn video_source_url(vid: i64) -> String {
    VIDEO_SOURCE_URL_TEMPLATE.replace("{vid}", &vid.to_string())
}

// ── Identity ────────────────────────────────────────────────────────────────

/// Natural-key extraction shared by equality and hashing.
pub trait Keyed {
    type Key<'a>: Eq + Hash
    where
        Self: 'a;

    fn key(&self) -> Self::Key<'_>;
}

macro_rules! key_identity {
    ($($ty:ty),+ $(,)?) => {
        $(
            impl PartialEq for $ty {
                fn eq(&self, other: &Self) -> bool {
                    self.key() == other.key()
                }
            }

            impl Eq for $ty {}

            impl Hash for $ty {
                fn hash<H: Hasher>(&self, state: &mut H) {
                    self.key().hash(state);
                }
            }
        )+
    };
}

/// Values accepted where the catalog expects an integer key.
///
/// Scraped pages hand ids over as text, so strings are accepted as long as
/// their trimmed content is a base-10 `i64`.
pub trait IntoKey {
    fn into_key(self, field: &'static str) -> Result<i64>;
}

impl IntoKey for i64 {
    fn into_key(self, _field: &'static str) -> Result<i64> {
        Ok(self)
    }
}

macro_rules! into_key_lossless {
    ($($ty:ty),+) => {
        $(
            impl IntoKey for $ty {
                fn into_key(self, _field: &'static str) -> Result<i64> {
                    Ok(i64::from(self))
                }
            }
        )+
    };
}

into_key_lossless!(i8, i16, i32, u8, u16, u32);

impl IntoKey for u64 {
    fn into_key(self, field: &'static str) -> Result<i64> {
        i64::try_from(self).map_err(|_| CatalogError::format(field, self.to_string()))
    }
}

impl IntoKey for usize {
    fn into_key(self, field: &'static str) -> Result<i64> {
        i64::try_from(self).map_err(|_| CatalogError::format(field, self.to_string()))
    }
}

impl IntoKey for &str {
    fn into_key(self, field: &'static str) -> Result<i64> {
        self.trim()
            .parse::<i64>()
            .map_err(|_| CatalogError::format(field, self))
    }
}

impl IntoKey for &String {
    fn into_key(self, field: &'static str) -> Result<i64> {
        self.as_str().into_key(field)
    }
}

impl IntoKey for String {
    fn into_key(self, field: &'static str) -> Result<i64> {
        self.as_str().into_key(field)
    }
}

// ── Display helpers ─────────────────────────────────────────────────────────

fn truncate_chars(text: &str, max: usize) -> Cow<'_, str> {
    match text.char_indices().nth(max) {
        Some((cut, _)) => Cow::Owned(format!("{}…", &text[..cut])),
        None => Cow::Borrowed(text),
    }
}

/// Keeps the first and last `keep` characters of a long URL.
fn elide_url(url: &str, keep: usize) -> Cow<'_, str> {
    let count = url.chars().count();
    if count <= keep * 2 {
        return Cow::Borrowed(url);
    }
    let head: String = url.chars().take(keep).collect();
    let tail: String = url.chars().skip(count - keep).collect();
    Cow::Owned(format!("{head}[..]{tail}"))
}

// ── Theme ───────────────────────────────────────────────────────────────────

/// Top-most classification. Themes -> Categories -> Emissions.
#[derive(Debug, Clone)]
pub struct Theme {
    tid: i64,
    url: String,
    text: String,
}

impl Theme {
    pub fn new(tid: impl IntoKey, url: impl Into<String>, text: impl Into<String>) -> Result<Self> {
        Ok(Self {
            tid: tid.into_key("tid")?,
            url: url.into(),
            text: text.into(),
        })
    }

    pub fn tid(&self) -> i64 {
        self.tid
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn text(&self) -> &str {
        &self.text
    }
}

impl Keyed for Theme {
    type Key<'a> = i64;

    fn key(&self) -> i64 {
        self.tid
    }
}

impl fmt::Display for Theme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "<Theme {}: {:?}>",
            self.tid,
            truncate_chars(&self.text, DESCRIPTION_DISPLAY_CHARS)
        )
    }
}

// ── Category ────────────────────────────────────────────────────────────────

/// Groups several emissions. Keyed by its own description text.
#[derive(Debug, Clone)]
pub struct Category {
    text: String,
    tid: Option<i64>,
}

impl Category {
    pub fn new(text: impl Into<String>, tid: Option<i64>) -> Self {
        Self {
            text: text.into(),
            tid,
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    /// Owning theme, when the scraper could attach one.
    pub fn tid(&self) -> Option<i64> {
        self.tid
    }
}

impl Keyed for Category {
    type Key<'a> = &'a str;

    fn key(&self) -> &str {
        &self.text
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = truncate_chars(&self.text, DESCRIPTION_DISPLAY_CHARS);
        match self.tid {
            Some(tid) => write!(f, "<Category {tid}: {text:?}>"),
            None => write!(f, "<Category -: {text:?}>"),
        }
    }
}

// ── Emission ────────────────────────────────────────────────────────────────

/// A program page. Its video listing lives behind `url`.
#[derive(Debug, Clone)]
pub struct Emission {
    pid: i64,
    cid: String,
    text: String,
    url: String,
    ts: Option<DateTime<Utc>>,
}

impl Emission {
    /// # Errors
    /// - `CatalogError::Format` if `pid` is not an integer.
    pub fn new(
        pid: impl IntoKey,
        cid: impl Into<String>,
        url: impl Into<String>,
        text: impl Into<String>,
    ) -> Result<Self> {
        Ok(Self {
            pid: pid.into_key("pid")?,
            cid: cid.into(),
            text: text.into(),
            url: url.into(),
            ts: None,
        })
    }

    pub fn with_timestamp(mut self, ts: DateTime<Utc>) -> Self {
        self.ts = Some(ts);
        self
    }

    pub fn pid(&self) -> i64 {
        self.pid
    }

    /// Description text of the owning category.
    pub fn cid(&self) -> &str {
        &self.cid
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn ts(&self) -> Option<DateTime<Utc>> {
        self.ts
    }
}

impl Keyed for Emission {
    type Key<'a> = i64;

    fn key(&self) -> i64 {
        self.pid
    }
}

impl fmt::Display for Emission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "<Emission {:?} pid=\"{}\">",
            truncate_chars(&self.text, DESCRIPTION_DISPLAY_CHARS),
            self.pid
        )
    }
}

// ── Video ───────────────────────────────────────────────────────────────────

/// A playable item of an emission.
///
/// The full XML description of a video, listing its streams (and often the
/// other videos of the same emission), is served at [`Video::url`], which is
/// always derived from `vid`.
#[derive(Debug, Clone)]
pub struct Video {
    vid: i64,
    pid: i64,
    text: String,
    url: String,
    /// Set once the XML description has been processed. Never persisted.
    parsed: bool,
}

impl Video {
    /// # Errors
    /// - `CatalogError::Format` if `vid` or `pid` is not an integer.
    pub fn new(vid: impl IntoKey, pid: impl IntoKey, text: impl Into<String>) -> Result<Self> {
        let pid = pid.into_key("pid")?;
        let vid = vid.into_key("vid")?;
        Ok(Self {
            vid,
            pid,
            text: text.into(),
            url: video_source_url(vid),
            parsed: false,
        })
    }

    pub fn vid(&self) -> i64 {
        self.vid
    }

    pub fn pid(&self) -> i64 {
        self.pid
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn is_parsed(&self) -> bool {
        self.parsed
    }

    pub fn mark_parsed(&mut self) {
        self.parsed = true;
    }
}

impl Keyed for Video {
    type Key<'a> = (i64, i64);

    fn key(&self) -> (i64, i64) {
        (self.vid, self.pid)
    }
}

impl fmt::Display for Video {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "<Video {}-{}: {:?}>",
            self.pid,
            self.vid,
            truncate_chars(&self.text, DESCRIPTION_DISPLAY_CHARS)
        )
    }
}

// ── Quality ─────────────────────────────────────────────────────────────────

/// Stream quality label as published by the broadcaster.
///
/// Parsing is exact: `"hd"` is not `HD` and ends up in `Other`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Quality {
    Hd,
    HautDebit,
    BasDebit,
    Other(String),
}

/// Ranked labels, best first.
pub const QUALITY_PRIORITY: [Quality; 3] = [Quality::Hd, Quality::HautDebit, Quality::BasDebit];

impl Quality {
    pub fn parse(label: &str) -> Self {
        match label {
            "HD" => Quality::Hd,
            "HAUT_DEBIT" => Quality::HautDebit,
            "BAS_DEBIT" => Quality::BasDebit,
            other => Quality::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Quality::Hd => "HD",
            Quality::HautDebit => "HAUT_DEBIT",
            Quality::BasDebit => "BAS_DEBIT",
            Quality::Other(label) => label,
        }
    }

    /// Position in [`QUALITY_PRIORITY`]; `None` for unranked labels.
    pub fn rank(&self) -> Option<usize> {
        QUALITY_PRIORITY
            .iter()
            .position(|ranked| ranked.as_str() == self.as_str())
    }
}

// Compared on the label so a hand-built `Other("HD")` still equals `Hd`.
impl PartialEq for Quality {
    fn eq(&self, other: &Self) -> bool {
        self.as_str() == other.as_str()
    }
}

impl Eq for Quality {}

impl Hash for Quality {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.as_str().hash(state);
    }
}

impl From<&str> for Quality {
    fn from(value: &str) -> Self {
        Quality::parse(value)
    }
}

impl From<String> for Quality {
    fn from(value: String) -> Self {
        Quality::parse(&value)
    }
}

impl From<Quality> for String {
    fn from(value: Quality) -> Self {
        value.as_str().to_string()
    }
}

impl FromStr for Quality {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(Quality::parse(s))
    }
}

impl fmt::Display for Quality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ── Stream ──────────────────────────────────────────────────────────────────

/// Link to the video content in one quality.
#[derive(Debug, Clone)]
pub struct Stream {
    vid: i64,
    quality: Quality,
    url: Url,
}

impl Stream {
    /// # Errors
    /// - `CatalogError::Format` if `vid` is not an integer.
    /// - `CatalogError::InvalidUrl` if `url` is not an absolute URL with a path.
    pub fn new(vid: impl IntoKey, quality: impl Into<Quality>, url: &str) -> Result<Self> {
        let vid = vid.into_key("vid")?;
        let parsed = Url::parse(url).map_err(|e| CatalogError::InvalidUrl {
            url: url.to_string(),
            reason: e.to_string(),
        })?;
        if parsed.cannot_be_a_base() {
            return Err(CatalogError::InvalidUrl {
                url: url.to_string(),
                reason: "URL has no path".to_string(),
            });
        }

        Ok(Self {
            vid,
            quality: quality.into(),
            url: parsed,
        })
    }

    pub fn vid(&self) -> i64 {
        self.vid
    }

    pub fn quality(&self) -> &Quality {
        &self.quality
    }

    /// Normalised URL, as stored.
    pub fn url(&self) -> &str {
        self.url.as_str()
    }

    /// Last path segment of the URL, without query or fragment, percent-decoded.
    ///
    /// The raw segment is kept when decoding fails or would yield a path
    /// separator.
    pub fn basename(&self) -> Cow<'_, str> {
        let raw = self
            .url
            .path_segments()
            .and_then(|mut segments| segments.next_back())
            .unwrap_or_default();
        match urlencoding::decode(raw) {
            Ok(decoded) if !decoded.contains(['/', '\\']) => decoded,
            _ => Cow::Borrowed(raw),
        }
    }
}

impl Keyed for Stream {
    type Key<'a> = (i64, &'a Quality);

    fn key(&self) -> (i64, &Quality) {
        (self.vid, &self.quality)
    }
}

impl fmt::Display for Stream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "<Stream {} {} >",
            self.quality,
            elide_url(self.url.as_str(), URL_DISPLAY_CHARS)
        )
    }
}

key_identity!(Theme, Category, Emission, Video, Stream);

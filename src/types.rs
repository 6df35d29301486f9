//! Shared types: authentication mode, API endpoints and query URLs.

use crate::error::{BggError, Result};
use std::fmt;
use url::Url;

/// How requests are authenticated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AuthMode {
    /// Anonymous requests
    #[default]
    None,
    /// `Authorization: Bearer <key>`
    ApiKey,
    /// Raw `Cookie` header copied from a logged-in browser session
    Cookie,
}

/// XML API2 endpoint families
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Endpoint {
    Collection,
    Family,
    Forum,
    ForumList,
    Guild,
    Hot,
    Plays,
    Search,
    Thing,
    Thread,
    User,
}

impl Endpoint {
    /// Path segment appended to the API base URL
    pub fn path(&self) -> &'static str {
        match self {
            Endpoint::Collection => "collection",
            Endpoint::Family => "family",
            Endpoint::Forum => "forum",
            Endpoint::ForumList => "forumlist",
            Endpoint::Guild => "guild",
            Endpoint::Hot => "hot",
            Endpoint::Plays => "plays",
            Endpoint::Search => "search",
            Endpoint::Thing => "thing",
            Endpoint::Thread => "thread",
            Endpoint::User => "user",
        }
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.path())
    }
}

/// Maximum number of ids BGG accepts in a single `thing` request
pub const MAX_THING_IDS: usize = 20;

/// Query parameters for one endpoint.
///
/// Setting a key twice keeps the position of the first call and the value of
/// the last one, so independent options can be applied in any order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Query {
    endpoint: Endpoint,
    params: Vec<(String, String)>,
}

impl Query {
    /// Start an empty query against `endpoint`
    pub fn new(endpoint: Endpoint) -> Self {
        Self {
            endpoint,
            params: Vec::new(),
        }
    }

    /// The endpoint this query targets
    pub fn endpoint(&self) -> Endpoint {
        self.endpoint
    }

    /// Set a parameter, replacing any earlier value for the same key
    pub fn param(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        let key = key.into();
        let value = value.to_string();
        match self.params.iter_mut().find(|(k, _)| *k == key) {
            Some(existing) => existing.1 = value,
            None => self.params.push((key, value)),
        }
        self
    }

    /// Set a `1`/`0` flag parameter
    pub fn flag(self, key: impl Into<String>, enabled: bool) -> Self {
        self.param(key, if enabled { "1" } else { "0" })
    }

    /// Set a comma separated id list, rejecting empty or oversized lists
    pub fn ids(self, key: impl Into<String>, ids: &[u64], max: usize) -> Result<Self> {
        if ids.is_empty() {
            return Err(BggError::invalid_argument("no IDs provided"));
        }
        if ids.len() > max {
            return Err(BggError::invalid_argument(format!(
                "too many IDs provided ({}), maximum is {}",
                ids.len(),
                max
            )));
        }

        let joined = ids
            .iter()
            .map(|id| id.to_string())
            .collect::<Vec<_>>()
            .join(",");
        Ok(self.param(key, joined))
    }

    /// Current value of a parameter
    pub fn get(&self, key: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Build the full request URL below `base_url`
    pub fn to_url(&self, base_url: &str) -> Result<String> {
        let mut url = Url::parse(base_url.trim_end_matches('/'))?;
        url.path_segments_mut()
            .map_err(|_| BggError::invalid_argument(format!("cannot be a base URL: {}", base_url)))?
            .pop_if_empty()
            .push(self.endpoint.path());

        if !self.params.is_empty() {
            url.query_pairs_mut().extend_pairs(self.params.iter());
        }
        Ok(url.to_string())
    }
}

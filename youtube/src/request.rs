//! YouTube Data API v3 list/search requests.
//!
//! Each builder knows its resource path and renders its own query
//! string. Parameter names follow the API's camelCase spelling.

use crate::error::{ApiError, ApiResult};
use chrono::{DateTime, SecondsFormat, Utc};

pub const MAX_RESULTS_LIMIT: u32 = 50;

/// A request the client can execute with a GET.
pub trait ApiRequest {
    /// Path below the API root, e.g. `search`.
    fn resource(&self) -> &'static str;

    /// Query parameters, in the order they are sent.
    fn query(&self) -> ApiResult<Vec<(&'static str, String)>>;
}

fn check_max_results(max: Option<u32>) -> ApiResult<()> {
    match max {
        Some(n) if n > MAX_RESULTS_LIMIT => Err(ApiError::InvalidParameter {
            name:   "maxResults",
            reason: format!("{n} exceeds {MAX_RESULTS_LIMIT}"),
        }),
        _ => Ok(()),
    }
}

fn rfc3339(t: &DateTime<Utc>) -> String {
    t.to_rfc3339_opts(SecondsFormat::Secs, true)
}

fn push_opt(q: &mut Vec<(&'static str, String)>, name: &'static str, value: Option<impl ToString>) {
    if let Some(v) = value {
        q.push((name, v.to_string()));
    }
}

// ── channels.list ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub enum ChannelFilter {
    Mine,
    Id(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChannelsList {
    pub part:   String,
    pub filter: ChannelFilter,
}

impl ChannelsList {
    /// Snippet, content details and statistics for the caller's channel.
    pub fn mine() -> Self {
        Self {
            part:   "snippet,contentDetails,statistics".into(),
            filter: ChannelFilter::Mine,
        }
    }

    pub fn by_id(id: impl Into<String>) -> Self {
        Self { filter: ChannelFilter::Id(id.into()), ..Self::mine() }
    }
}

impl ApiRequest for ChannelsList {
    fn resource(&self) -> &'static str { "channels" }

    fn query(&self) -> ApiResult<Vec<(&'static str, String)>> {
        let mut q = vec![("part", self.part.clone())];
        match &self.filter {
            ChannelFilter::Mine   => q.push(("mine", "true".into())),
            ChannelFilter::Id(id) => q.push(("id", id.clone())),
        }
        Ok(q)
    }
}

// ── videos.list ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub struct VideosList {
    pub part:         String,
    pub chart:        String,
    pub region_code:  Option<String>,
    pub max_results:  Option<u32>,
    pub fields:       Option<String>,
    pub pretty_print: bool,
}

impl VideosList {
    /// The most popular videos chart for a region.
    pub fn most_popular(region_code: impl Into<String>) -> Self {
        Self {
            part:         "snippet,statistics".into(),
            chart:        "mostPopular".into(),
            region_code:  Some(region_code.into()),
            max_results:  Some(10),
            fields:       Some("items(id,snippet(title,channelId,publishedAt),statistics)".into()),
            pretty_print: true,
        }
    }

    pub fn max_results(mut self, n: u32) -> Self {
        self.max_results = Some(n);
        self
    }
}

impl ApiRequest for VideosList {
    fn resource(&self) -> &'static str { "videos" }

    fn query(&self) -> ApiResult<Vec<(&'static str, String)>> {
        check_max_results(self.max_results)?;
        let mut q = vec![
            ("part", self.part.clone()),
            ("chart", self.chart.clone()),
        ];
        push_opt(&mut q, "regionCode", self.region_code.as_ref());
        push_opt(&mut q, "maxResults", self.max_results);
        push_opt(&mut q, "fields", self.fields.as_ref());
        q.push(("prettyPrint", self.pretty_print.to_string()));
        Ok(q)
    }
}

// ── search.list ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub struct SearchList {
    pub part:             String,
    pub q:                Option<String>,
    pub kind:             String,
    pub channel_type:     String,
    pub region_code:      Option<String>,
    pub order:            String,
    pub max_results:      Option<u32>,
    pub published_after:  Option<DateTime<Utc>>,
    pub published_before: Option<DateTime<Utc>>,
    pub fields:           Option<String>,
}

impl Default for SearchList {
    fn default() -> Self {
        Self {
            part:             "snippet".into(),
            q:                None,
            kind:             "video".into(),
            channel_type:     "any".into(),
            region_code:      None,
            order:            "viewCount".into(),
            max_results:      Some(10),
            published_after:  None,
            published_before: None,
            fields:           Some(
                "items(id,snippet(title,channelTitle,channelId,publishedAt))".into(),
            ),
        }
    }
}

impl SearchList {
    pub fn query_text(mut self, q: impl Into<String>) -> Self {
        self.q = Some(q.into());
        self
    }

    pub fn region(mut self, code: impl Into<String>) -> Self {
        self.region_code = Some(code.into());
        self
    }

    pub fn order(mut self, order: impl Into<String>) -> Self {
        self.order = order.into();
        self
    }

    pub fn max_results(mut self, n: u32) -> Self {
        self.max_results = Some(n);
        self
    }

    pub fn published_between(mut self, after: DateTime<Utc>, before: DateTime<Utc>) -> Self {
        self.published_after = Some(after);
        self.published_before = Some(before);
        self
    }
}

impl ApiRequest for SearchList {
    fn resource(&self) -> &'static str { "search" }

    fn query(&self) -> ApiResult<Vec<(&'static str, String)>> {
        check_max_results(self.max_results)?;
        if let (Some(after), Some(before)) = (self.published_after, self.published_before) {
            if after > before {
                return Err(ApiError::InvalidParameter {
                    name:   "publishedAfter",
                    reason: format!("{} is later than publishedBefore {}", rfc3339(&after), rfc3339(&before)),
                });
            }
        }

        let mut q = Vec::new();
        push_opt(&mut q, "q", self.q.as_ref());
        q.push(("type", self.kind.clone()));
        q.push(("channelType", self.channel_type.clone()));
        push_opt(&mut q, "regionCode", self.region_code.as_ref());
        q.push(("order", self.order.clone()));
        push_opt(&mut q, "maxResults", self.max_results);
        push_opt(&mut q, "publishedAfter", self.published_after.as_ref().map(rfc3339));
        push_opt(&mut q, "publishedBefore", self.published_before.as_ref().map(rfc3339));
        q.push(("part", self.part.clone()));
        push_opt(&mut q, "fields", self.fields.as_ref());
        Ok(q)
    }
}

//! Metrics definitions for upstream access.

use shared::metrics_defs::{MetricDef, MetricType};

pub const CACHE_HIT: MetricDef = MetricDef {
    name: "upstream.cache.hit",
    metric_type: MetricType::Counter,
    description: "Number of requests answered from the response cache",
};

pub const CACHE_MISS: MetricDef = MetricDef {
    name: "upstream.cache.miss",
    metric_type: MetricType::Counter,
    description: "Number of requests that missed the response cache",
};

pub const UPSTREAM_REQUEST: MetricDef = MetricDef {
    name: "upstream.request",
    metric_type: MetricType::Counter,
    description: "Number of GET requests sent to upstreams, retries included",
};

pub const UPSTREAM_RETRY: MetricDef = MetricDef {
    name: "upstream.retry",
    metric_type: MetricType::Counter,
    description: "Number of backoff delays taken after a failed upstream request",
};

pub const UPSTREAM_NOT_FOUND: MetricDef = MetricDef {
    name: "upstream.not_found",
    metric_type: MetricType::Counter,
    description: "Number of upstream requests answered with 404",
};

pub const UPSTREAM_RETRIES_EXHAUSTED: MetricDef = MetricDef {
    name: "upstream.retries_exhausted",
    metric_type: MetricType::Counter,
    description: "Number of requests abandoned after the retry limit",
};

pub const ALL_METRICS: &[MetricDef] = &[
    CACHE_HIT,
    CACHE_MISS,
    UPSTREAM_REQUEST,
    UPSTREAM_RETRY,
    UPSTREAM_NOT_FOUND,
    UPSTREAM_RETRIES_EXHAUSTED,
];

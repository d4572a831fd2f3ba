//! Metrics definitions for the aggregation pipeline.

use shared::metrics_defs::{MetricDef, MetricType};

pub const BUILD_SUCCESS: MetricDef = MetricDef {
    name: "aggregator.build.success",
    metric_type: MetricType::Counter,
    description: "Number of artist records built",
};

pub const BUILD_NOT_FOUND: MetricDef = MetricDef {
    name: "aggregator.build.not_found",
    metric_type: MetricType::Counter,
    description: "Number of builds whose artist does not exist upstream",
};

pub const BUILD_FAILED: MetricDef = MetricDef {
    name: "aggregator.build.failed",
    metric_type: MetricType::Counter,
    description: "Number of builds failed by an unusable artist lookup",
};

pub const BUILD_DURATION: MetricDef = MetricDef {
    name: "aggregator.build.duration",
    metric_type: MetricType::Histogram,
    description: "Time to build one artist record in seconds",
};

pub const LOOKUP_DEGRADED: MetricDef = MetricDef {
    name: "aggregator.lookup.degraded",
    metric_type: MetricType::Counter,
    description: "Number of image or summary lookups replaced by an empty value",
};

pub const ALL_METRICS: &[MetricDef] = &[
    BUILD_SUCCESS,
    BUILD_NOT_FOUND,
    BUILD_FAILED,
    BUILD_DURATION,
    LOOKUP_DEGRADED,
];

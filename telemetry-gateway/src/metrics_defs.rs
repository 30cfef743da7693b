use shared::metrics_defs::{MetricDef, MetricType};

pub const REQUEST_DURATION: MetricDef = MetricDef {
    name: "request.duration",
    metric_type: MetricType::Histogram,
    description: "API request duration in seconds. Tagged with route, status.",
};

pub const AGGREGATION_DURATION: MetricDef = MetricDef {
    name: "aggregation.duration",
    metric_type: MetricType::Histogram,
    description: "Time for all sources of an aggregation request to settle, in seconds",
};

pub const SOURCE_FETCH_FAILURES: MetricDef = MetricDef {
    name: "aggregation.source.failures",
    metric_type: MetricType::Counter,
    description: "Sources replaced with an error marker in a merged response. Tagged with source.",
};

pub const RELAY_TICKS: MetricDef = MetricDef {
    name: "relay.ticks",
    metric_type: MetricType::Counter,
    description: "Relay loop ticks. Tagged with outcome.",
};

pub const CHANNELS_DROPPED: MetricDef = MetricDef {
    name: "readings.channels_dropped",
    metric_type: MetricType::Counter,
    description: "Channels removed for reporting the sentinel value. Tagged with channel.",
};

pub const ALL_METRICS: &[MetricDef] = &[
    REQUEST_DURATION,
    AGGREGATION_DURATION,
    SOURCE_FETCH_FAILURES,
    RELAY_TICKS,
    CHANNELS_DROPPED,
];

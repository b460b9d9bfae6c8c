use prometheus::{IntCounter, IntCounterVec, IntGauge, Opts, Registry};

/// Process-local counters exposed on the optional `/metrics` surface.
///
/// Nothing here feeds back into forwarding decisions; the dispatch path only
/// ever increments a counter, never reads one.
#[derive(Clone)]
pub struct Metrics {
    pub packets_received_total: IntCounterVec,
    pub drops_total: IntCounterVec,
    pub forwards_total: IntCounterVec,
    pub duplicate_hits_total: IntCounter,
    pub social_rebuilds_total: IntCounter,
    pub social_rebuild_seconds: prometheus::Histogram,
    pub social_table_entries: IntGauge,
}

impl Metrics {
    fn new(registry: &Registry) -> Result<Self, prometheus::Error> {
        let packets_received_total = IntCounterVec::new(
            Opts::new("allnet_packets_received_total", "Packets received, by source pipe index"),
            &["pipe"],
        )?;
        let drops_total = IntCounterVec::new(
            Opts::new("allnet_drops_total", "Packets dropped, by reason"),
            &["reason"],
        )?;
        let forwards_total = IntCounterVec::new(
            Opts::new("allnet_forwards_total", "Packets forwarded, by scope"),
            &["scope"],
        )?;
        let duplicate_hits_total = IntCounter::new(
            "allnet_duplicate_hits_total",
            "Packets recognized as duplicates within the forgetting horizon",
        )?;
        let social_rebuilds_total = IntCounter::new(
            "allnet_social_rebuilds_total",
            "Number of times the social table has been rebuilt from the contacts directory",
        )?;
        let social_rebuild_seconds = prometheus::Histogram::with_opts(prometheus::HistogramOpts::new(
            "allnet_social_rebuild_seconds",
            "Wall-clock time spent rebuilding the social table snapshot",
        ))?;
        let social_table_entries = IntGauge::new(
            "allnet_social_table_entries",
            "Number of contacts in the current social table snapshot",
        )?;

        registry.register(Box::new(packets_received_total.clone()))?;
        registry.register(Box::new(drops_total.clone()))?;
        registry.register(Box::new(forwards_total.clone()))?;
        registry.register(Box::new(duplicate_hits_total.clone()))?;
        registry.register(Box::new(social_rebuilds_total.clone()))?;
        registry.register(Box::new(social_rebuild_seconds.clone()))?;
        registry.register(Box::new(social_table_entries.clone()))?;

        Ok(Self {
            packets_received_total,
            drops_total,
            forwards_total,
            duplicate_hits_total,
            social_rebuilds_total,
            social_rebuild_seconds,
            social_table_entries,
        })
    }
}

/// Build a fresh registry and the counter set registered against it.
///
/// Talks straight to `prometheus`, with no OpenTelemetry export layer in
/// front of it: nothing here needs distributed tracing, just a scrape
/// endpoint.
pub fn init_metrics() -> Result<(Metrics, Registry), prometheus::Error> {
    let registry = Registry::new();
    let metrics = Metrics::new(&registry)?;
    Ok((metrics, registry))
}

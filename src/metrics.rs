//! Metrics collection and export module

use prometheus::{Histogram, HistogramOpts, IntCounter, IntGauge, Opts, Registry};
use std::time::Instant;

/// Global metrics registry
pub struct Metrics {
    registry: Registry,

    // Counters
    pub tokens_scanned_total: IntCounter,
    pub tokens_flagged_total: IntCounter,
    pub scans_rate_limited: IntCounter,
    pub investigations_total: IntCounter,
    pub investigations_dropped: IntCounter,
    pub scams_detected_total: IntCounter,
    pub trades_total: IntCounter,
    pub trades_success: IntCounter,
    pub trades_failed: IntCounter,
    pub emergency_exits_total: IntCounter,
    pub bus_messages_total: IntCounter,
    pub bus_messages_dropped: IntCounter,
    pub dashboard_events_dropped: IntCounter,
    pub debates_total: IntCounter,

    // Gauges
    pub open_positions: IntGauge,
    pub agents_running: IntGauge,
    pub investigation_queue_depth: IntGauge,
    pub watchlist_size: IntGauge,

    // Histograms
    pub investigation_latency: Histogram,
    pub trade_latency: Histogram,
    pub debate_latency: Histogram,
}

impl Metrics {
    /// Create new metrics instance
    pub fn new() -> anyhow::Result<Self> {
        let registry = Registry::new();

        let tokens_scanned_total = IntCounter::with_opts(Opts::new(
            "tokens_scanned_total",
            "Launch events scanned by scouts",
        ))?;

        let tokens_flagged_total = IntCounter::with_opts(Opts::new(
            "tokens_flagged_total",
            "Launches flagged suspicious and routed to analysts",
        ))?;

        let scans_rate_limited = IntCounter::with_opts(Opts::new(
            "scans_rate_limited",
            "Launch events refused by the scout rate limiter",
        ))?;

        let investigations_total = IntCounter::with_opts(Opts::new(
            "investigations_total",
            "Investigations completed by analysts",
        ))?;

        let investigations_dropped = IntCounter::with_opts(Opts::new(
            "investigations_dropped",
            "Investigation requests dropped because the queue was full",
        ))?;

        let scams_detected_total = IntCounter::with_opts(Opts::new(
            "scams_detected_total",
            "Investigations that ended in a SCAM verdict",
        ))?;

        let trades_total =
            IntCounter::with_opts(Opts::new("trades_total", "Total number of trades attempted"))?;

        let trades_success =
            IntCounter::with_opts(Opts::new("trades_success", "Number of successful trades"))?;

        let trades_failed =
            IntCounter::with_opts(Opts::new("trades_failed", "Number of failed trades"))?;

        let emergency_exits_total = IntCounter::with_opts(Opts::new(
            "emergency_exits_total",
            "Positions closed by emergency exit",
        ))?;

        let bus_messages_total = IntCounter::with_opts(Opts::new(
            "bus_messages_total",
            "Messages published on the bus",
        ))?;

        let bus_messages_dropped = IntCounter::with_opts(Opts::new(
            "bus_messages_dropped",
            "Messages that reached a closed subscription",
        ))?;

        let dashboard_events_dropped = IntCounter::with_opts(Opts::new(
            "dashboard_events_dropped",
            "Dashboard events dropped due to buffer overflow or push failure",
        ))?;

        let debates_total =
            IntCounter::with_opts(Opts::new("debates_total", "Debate rounds completed"))?;

        let open_positions = IntGauge::with_opts(Opts::new(
            "open_positions",
            "Number of currently active positions",
        ))?;

        let agents_running = IntGauge::with_opts(Opts::new(
            "agents_running",
            "Agents currently reporting running",
        ))?;

        let investigation_queue_depth = IntGauge::with_opts(Opts::new(
            "investigation_queue_depth",
            "Pending investigation requests",
        ))?;

        let watchlist_size =
            IntGauge::with_opts(Opts::new("watchlist_size", "Wallets on the hunter watchlist"))?;

        let investigation_latency = Histogram::with_opts(
            HistogramOpts::new("investigation_latency_seconds", "Investigation duration")
                .buckets(vec![0.01, 0.05, 0.1, 0.5, 1.0, 2.0, 5.0, 10.0]),
        )?;

        let trade_latency = Histogram::with_opts(
            HistogramOpts::new("trade_latency_seconds", "Trade execution latency")
                .buckets(vec![0.01, 0.05, 0.1, 0.5, 1.0, 2.0, 5.0]),
        )?;

        let debate_latency = Histogram::with_opts(
            HistogramOpts::new("debate_latency_seconds", "Debate round duration")
                .buckets(vec![0.1, 0.5, 1.0, 2.0, 5.0, 10.0, 30.0]),
        )?;

        registry.register(Box::new(tokens_scanned_total.clone()))?;
        registry.register(Box::new(tokens_flagged_total.clone()))?;
        registry.register(Box::new(scans_rate_limited.clone()))?;
        registry.register(Box::new(investigations_total.clone()))?;
        registry.register(Box::new(investigations_dropped.clone()))?;
        registry.register(Box::new(scams_detected_total.clone()))?;
        registry.register(Box::new(trades_total.clone()))?;
        registry.register(Box::new(trades_success.clone()))?;
        registry.register(Box::new(trades_failed.clone()))?;
        registry.register(Box::new(emergency_exits_total.clone()))?;
        registry.register(Box::new(bus_messages_total.clone()))?;
        registry.register(Box::new(bus_messages_dropped.clone()))?;
        registry.register(Box::new(dashboard_events_dropped.clone()))?;
        registry.register(Box::new(debates_total.clone()))?;
        registry.register(Box::new(open_positions.clone()))?;
        registry.register(Box::new(agents_running.clone()))?;
        registry.register(Box::new(investigation_queue_depth.clone()))?;
        registry.register(Box::new(watchlist_size.clone()))?;
        registry.register(Box::new(investigation_latency.clone()))?;
        registry.register(Box::new(trade_latency.clone()))?;
        registry.register(Box::new(debate_latency.clone()))?;

        Ok(Self {
            registry,
            tokens_scanned_total,
            tokens_flagged_total,
            scans_rate_limited,
            investigations_total,
            investigations_dropped,
            scams_detected_total,
            trades_total,
            trades_success,
            trades_failed,
            emergency_exits_total,
            bus_messages_total,
            bus_messages_dropped,
            dashboard_events_dropped,
            debates_total,
            open_positions,
            agents_running,
            investigation_queue_depth,
            watchlist_size,
            investigation_latency,
            trade_latency,
            debate_latency,
        })
    }

    /// Get the registry for exporting
    pub fn registry(&self) -> &Registry {
        &self.registry
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new().expect("Failed to create metrics")
    }
}

/// Global metrics instance
pub fn metrics() -> &'static Metrics {
    static METRICS: once_cell::sync::Lazy<Metrics> =
        once_cell::sync::Lazy::new(|| Metrics::new().expect("Failed to initialize metrics"));
    &METRICS
}

/// Timer helper for measuring operation duration
pub struct Timer {
    start: Instant,
}

impl Timer {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    pub fn observe_duration(&self, histogram: &Histogram) {
        let duration = self.start.elapsed();
        histogram.observe(duration.as_secs_f64());
    }

    pub fn elapsed_secs(&self) -> f64 {
        self.start.elapsed().as_secs_f64()
    }
}

impl Default for Timer {
    fn default() -> Self {
        Self::new()
    }
}

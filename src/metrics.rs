use once_cell::sync::Lazy;
use prometheus::{Counter, CounterVec, Encoder, IntGauge, Registry, TextEncoder};

pub struct Metrics {
    pub registry: Registry,
    pub login_lookups: CounterVec,
    pub login_rate_limited: Counter,
    pub guard_swept: prometheus::IntCounter,
    pub guard_entries: IntGauge,
}

impl Metrics {
    fn new() -> Self {
        let registry = Registry::new();

        let login_lookups = CounterVec::new(
            prometheus::Opts::new("login_lookups_total", "Login identity lookups grouped by result"),
            &["result"],
        ).expect("valid metric definition");
        registry.register(Box::new(login_lookups.clone())).expect("metric registered once");

        let login_rate_limited = Counter::new("login_rate_limited_total", "Lookups rejected by the login guard").expect("valid metric definition");
        registry.register(Box::new(login_rate_limited.clone())).expect("metric registered once");

        let guard_swept = prometheus::IntCounter::new("login_guard_swept_total", "Expired attempt records removed by the sweeper").expect("valid metric definition");
        registry.register(Box::new(guard_swept.clone())).expect("metric registered once");

        let guard_entries = IntGauge::new("login_guard_entries", "Attempt records currently tracked").expect("valid metric definition");
        registry.register(Box::new(guard_entries.clone())).expect("metric registered once");

        Self {
            registry,
            login_lookups,
            login_rate_limited,
            guard_swept,
            guard_entries,
        }
    }

    pub fn render(&self) -> Result<String, String> {
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        let encoder = TextEncoder::new();
        encoder.encode(&metric_families, &mut buffer).map_err(|e| e.to_string())?;
        String::from_utf8(buffer).map_err(|e| e.to_string())
    }

    /// 记录一次查找结果：found / not_found / inactive / limited / error
    pub fn record_lookup(&self, result: &str) {
        self.login_lookups.with_label_values(&[result]).inc();
    }
}

pub static METRICS: Lazy<Metrics> = Lazy::new(Metrics::new);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_contains_registered_metrics() {
        METRICS.record_lookup("found");
        METRICS.login_rate_limited.inc();

        let text = METRICS.render().unwrap();
        assert!(text.contains("login_lookups_total"));
        assert!(text.contains("login_rate_limited_total"));
        assert!(text.contains("login_guard_entries"));
    }
}

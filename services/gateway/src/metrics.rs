//! Prometheus metrics exposition
//!
//! - `gateway_requests_total` (counter): labels `route`, `status`
//! - `gateway_request_duration_seconds` (histogram): label `route`
//! - `gateway_gate_outcomes_total` (counter): label `outcome`

use metrics_exporter_prometheus::{BuildError, Matcher, PrometheusBuilder, PrometheusHandle};

const DURATION_METRIC: &str = "gateway_request_duration_seconds";

/// 5ms to 60s; the upper end covers the upstream timeout plus a consent round trip.
const DURATION_BUCKETS: &[f64] = &[
    0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0,
];

/// What the gate did with a request or callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateOutcome {
    PassThrough,
    ConsentRequired,
    Resumed,
    Authenticated,
    ConsentDenied,
    MissingCode,
    ExchangeFailed,
    SessionStoreError,
    PersistFailed,
}

impl GateOutcome {
    pub fn as_str(self) -> &'static str {
        match self {
            GateOutcome::PassThrough => "pass_through",
            GateOutcome::ConsentRequired => "consent_required",
            GateOutcome::Resumed => "resumed",
            GateOutcome::Authenticated => "authenticated",
            GateOutcome::ConsentDenied => "consent_denied",
            GateOutcome::MissingCode => "missing_code",
            GateOutcome::ExchangeFailed => "exchange_failed",
            GateOutcome::SessionStoreError => "session_store_error",
            GateOutcome::PersistFailed => "persist_failed",
        }
    }
}

fn builder() -> Result<PrometheusBuilder, BuildError> {
    PrometheusBuilder::new()
        .set_buckets_for_metric(Matcher::Full(DURATION_METRIC.to_string()), DURATION_BUCKETS)
}

/// Install the global Prometheus recorder and return a handle for `/metrics`.
pub fn install_recorder() -> Result<PrometheusHandle, BuildError> {
    builder()?.install_recorder()
}

/// Handle backed by a recorder that is not installed globally, for tests.
#[cfg(test)]
pub fn detached_handle() -> PrometheusHandle {
    PrometheusBuilder::new().build_recorder().handle()
}

/// Record a completed request on a named route.
pub fn record_request(route: &'static str, status: u16, duration_secs: f64) {
    metrics::counter!("gateway_requests_total", "route" => route, "status" => status.to_string())
        .increment(1);
    metrics::histogram!(DURATION_METRIC, "route" => route).record(duration_secs);
}

pub fn record_gate_outcome(outcome: GateOutcome) {
    metrics::counter!("gateway_gate_outcomes_total", "outcome" => outcome.as_str()).increment(1);
}

#[cfg(test)]
mod tests {
    use super::*;
    use metrics_exporter_prometheus::PrometheusRecorder;

    fn isolated_recorder() -> (PrometheusRecorder, PrometheusHandle) {
        let recorder = builder().unwrap().build_recorder();
        let handle = recorder.handle();
        (recorder, handle)
    }

    #[test]
    fn record_functions_do_not_panic_without_recorder() {
        record_request("albums_list", 200, 0.05);
        record_gate_outcome(GateOutcome::Resumed);
    }

    #[test]
    fn record_request_renders_counter_and_histogram() {
        let (recorder, handle) = isolated_recorder();
        let _guard = metrics::set_default_local_recorder(&recorder);

        record_request("albums_list", 200, 0.042);
        record_request("get_calendar", 401, 0.003);

        let output = handle.render();
        assert!(output.contains("gateway_requests_total"));
        assert!(output.contains("route=\"albums_list\""));
        assert!(output.contains("status=\"401\""));
        assert!(
            output.contains("gateway_request_duration_seconds_bucket"),
            "duration must render as a histogram"
        );
        assert!(output.contains("le=\"0.005\""));
        assert!(output.contains("le=\"60\""));
    }

    #[test]
    fn gate_outcomes_are_labelled() {
        let (recorder, handle) = isolated_recorder();
        let _guard = metrics::set_default_local_recorder(&recorder);

        record_gate_outcome(GateOutcome::ConsentRequired);
        record_gate_outcome(GateOutcome::ExchangeFailed);

        let output = handle.render();
        assert!(output.contains("outcome=\"consent_required\""));
        assert!(output.contains("outcome=\"exchange_failed\""));
    }
}

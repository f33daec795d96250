//! Subscriber setup and per-request log correlation.
//!
//! Each request runs inside its own `request` span carrying the Cloud Trace
//! id from the `x-cloud-trace-context` header. The span is owned by the
//! request's future, so concurrent requests never see each other's trace id
//! and the span is closed on every exit path, including panics and errors.
//!
//! In JSON mode every line is a Cloud Logging structured entry. Lines logged
//! inside a request carry the top-level `logging.googleapis.com/trace` field
//! so the log viewer groups them under that request.

use axum::{body::Body, http::HeaderMap, http::Request};
use chrono::{SecondsFormat, Utc};
use serde_json::{Map, Value as JsonValue};
use std::fmt;
use tracing::field::{Field, Visit};
use tracing::span::{Attributes, Id};
use tracing::{Event, Level, Span, Subscriber};
use tracing_subscriber::fmt::format::{DefaultFields, Writer};
use tracing_subscriber::fmt::{FmtContext, FormatEvent, FormatFields};
use tracing_subscriber::layer::{Context, Layer, SubscriberExt};
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use crate::config::LogFormat;

pub const TRACE_CONTEXT_HEADER: &str = "x-cloud-trace-context";

/// Top-level field Cloud Logging correlates request logs on
pub const CLOUD_TRACE_FIELD: &str = "logging.googleapis.com/trace";

const TRACE_ID_FIELD: &str = "trace_id";

/// `project` qualifies trace ids as `projects/{project}/traces/{id}`
pub fn init(format: LogFormat, project: Option<String>) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    match format {
        LogFormat::Pretty => tracing_subscriber::fmt().with_env_filter(filter).init(),
        LogFormat::Json => tracing_subscriber::registry()
            .with(filter)
            .with(TraceIdLayer)
            .with(cloud_logging_layer(project))
            .init(),
    }
}

/// Formatting layer emitting Cloud Logging JSON entries
pub fn cloud_logging_layer<S>(
    project: Option<String>,
) -> tracing_subscriber::fmt::Layer<S, DefaultFields, CloudLoggingFormat>
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    tracing_subscriber::fmt::layer().event_format(CloudLoggingFormat { project })
}

/// Extract the trace id from a `TRACE_ID/SPAN_ID;o=OPTIONS` header value
pub fn trace_id(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(TRACE_CONTEXT_HEADER)?.to_str().ok()?;
    let trace_id = value.split('/').next()?.trim();
    (!trace_id.is_empty()).then_some(trace_id)
}

pub fn make_request_span(request: &Request<Body>) -> Span {
    tracing::info_span!(
        "request",
        method = %request.method(),
        uri = %request.uri(),
        trace_id = trace_id(request.headers()).unwrap_or_default(),
    )
}

/// Trace id recorded on a span, stored in the span's extensions
#[derive(Debug, Clone)]
struct TraceId(String);

/// Copies the `trace_id` field of new spans into their extensions so the
/// formatter can find it without re-parsing formatted fields.
pub struct TraceIdLayer;

impl<S> Layer<S> for TraceIdLayer
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    fn on_new_span(&self, attrs: &Attributes<'_>, id: &Id, ctx: Context<'_, S>) {
        let mut visitor = TraceIdVisitor(None);
        attrs.record(&mut visitor);

        if let (Some(trace_id), Some(span)) = (visitor.0, ctx.span(id)) {
            span.extensions_mut().insert(TraceId(trace_id));
        }
    }
}

struct TraceIdVisitor(Option<String>);

impl Visit for TraceIdVisitor {
    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == TRACE_ID_FIELD && !value.is_empty() {
            self.0 = Some(value.to_string());
        }
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        if field.name() == TRACE_ID_FIELD {
            self.record_str(field, &format!("{:?}", value));
        }
    }
}

/// Collects event fields into a JSON object
struct JsonVisitor<'a>(&'a mut Map<String, JsonValue>);

impl Visit for JsonVisitor<'_> {
    fn record_str(&mut self, field: &Field, value: &str) {
        self.0.insert(field.name().to_string(), value.into());
    }

    fn record_i64(&mut self, field: &Field, value: i64) {
        self.0.insert(field.name().to_string(), value.into());
    }

    fn record_u64(&mut self, field: &Field, value: u64) {
        self.0.insert(field.name().to_string(), value.into());
    }

    fn record_f64(&mut self, field: &Field, value: f64) {
        self.0.insert(field.name().to_string(), value.into());
    }

    fn record_bool(&mut self, field: &Field, value: bool) {
        self.0.insert(field.name().to_string(), value.into());
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        self.0
            .insert(field.name().to_string(), format!("{:?}", value).into());
    }
}

/// Event formatter producing one Cloud Logging structured entry per line
pub struct CloudLoggingFormat {
    project: Option<String>,
}

fn severity(level: &Level) -> &'static str {
    match *level {
        Level::ERROR => "ERROR",
        Level::WARN => "WARNING",
        Level::INFO => "INFO",
        _ => "DEBUG",
    }
}

impl<S, N> FormatEvent<S, N> for CloudLoggingFormat
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        ctx: &FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &Event<'_>,
    ) -> fmt::Result {
        let metadata = event.metadata();

        let mut entry = Map::new();
        event.record(&mut JsonVisitor(&mut entry));
        entry.insert("severity".to_string(), severity(metadata.level()).into());
        entry.insert(
            "time".to_string(),
            Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true).into(),
        );
        entry.insert("target".to_string(), metadata.target().into());

        // Innermost span carrying a trace id wins
        let trace_id = ctx.event_scope().and_then(|scope| {
            scope
                .into_iter()
                .find_map(|span| span.extensions().get::<TraceId>().map(|t| t.0.clone()))
        });

        if let Some(trace_id) = trace_id {
            if let Some(project) = &self.project {
                entry.insert(
                    CLOUD_TRACE_FIELD.to_string(),
                    format!("projects/{}/traces/{}", project, trace_id).into(),
                );
            }
            entry.insert(TRACE_ID_FIELD.to_string(), trace_id.into());
        }

        writeln!(writer, "{}", JsonValue::Object(entry))
    }
}

//! Trace-context propagation across process boundaries.
//!
//! The edge and the backend must agree on a single header format or trace
//! trees fragment at the RPC hop. The format is selected at startup:
//! W3C `traceparent` is the default, B3 (multi-header and single-header)
//! are available for meshes that speak Zipkin headers. Injection and
//! extraction are explicit carrier operations around the transport, so the
//! contract is testable without a socket.

use std::str::FromStr;

use once_cell::sync::Lazy;
use opentelemetry::{
    global,
    propagation::{text_map_propagator::FieldIter, Extractor, Injector, TextMapPropagator},
    trace::{SpanContext, SpanId, TraceContextExt, TraceFlags, TraceId, TraceState},
    Context,
};
use opentelemetry_http::HeaderExtractor;
use opentelemetry_sdk::propagation::TraceContextPropagator;
use tonic::metadata::{KeyRef, MetadataKey, MetadataMap, MetadataValue};

const B3_TRACE_ID: &str = "x-b3-traceid";
const B3_SPAN_ID: &str = "x-b3-spanid";
const B3_SAMPLED: &str = "x-b3-sampled";
const B3_SINGLE: &str = "b3";

static B3_MULTI_FIELDS: Lazy<Vec<String>> = Lazy::new(|| {
    vec![
        B3_TRACE_ID.to_string(),
        B3_SPAN_ID.to_string(),
        B3_SAMPLED.to_string(),
    ]
});
static B3_SINGLE_FIELDS: Lazy<Vec<String>> = Lazy::new(|| vec![B3_SINGLE.to_string()]);

/// Wire format used to carry the trace identifier across the hop.
///
/// Both processes read this from `HELLOTRACE_TRACE_FORMAT` and must be
/// configured identically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PropagationFormat {
    /// W3C TraceContext (`traceparent` header). The default.
    #[default]
    W3c,
    /// B3 multi-header (`x-b3-traceid`/`x-b3-spanid`/`x-b3-sampled`).
    B3Multi,
    /// B3 single-header (`b3`).
    B3Single,
}

/// Error returned for an unrecognized propagation format selector.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown propagation format '{0}', expected one of: w3c, b3m, b3s")]
pub struct UnknownFormat(pub String);

impl FromStr for PropagationFormat {
    type Err = UnknownFormat;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "w3c" => Ok(PropagationFormat::W3c),
            "b3m" => Ok(PropagationFormat::B3Multi),
            "b3s" => Ok(PropagationFormat::B3Single),
            other => Err(UnknownFormat(other.to_string())),
        }
    }
}

// ============================================================================
// B3 PROPAGATOR
// ============================================================================

/// Zipkin B3 propagator supporting both the multi-header and the
/// single-header encodings.
#[derive(Debug, Clone)]
pub struct B3Propagator {
    single_header: bool,
}

impl B3Propagator {
    pub fn multi() -> Self {
        Self {
            single_header: false,
        }
    }

    pub fn single() -> Self {
        Self {
            single_header: true,
        }
    }

    fn extract_span_context(&self, extractor: &dyn Extractor) -> Option<SpanContext> {
        let (trace_id, span_id, sampled) = if self.single_header {
            let value = extractor.get(B3_SINGLE)?;
            let mut parts = value.split('-');
            let trace_id = parts.next()?;
            let span_id = parts.next()?;
            let sampled = matches!(parts.next(), Some("1") | Some("d"));
            (trace_id, span_id, sampled)
        } else {
            let trace_id = extractor.get(B3_TRACE_ID)?;
            let span_id = extractor.get(B3_SPAN_ID)?;
            let sampled = matches!(extractor.get(B3_SAMPLED), Some("1") | Some("d"));
            (trace_id, span_id, sampled)
        };

        let trace_id = TraceId::from_hex(trace_id).ok()?;
        let span_id = SpanId::from_hex(span_id).ok()?;
        let flags = if sampled {
            TraceFlags::SAMPLED
        } else {
            TraceFlags::default()
        };

        let span_context = SpanContext::new(trace_id, span_id, flags, true, TraceState::default());
        span_context.is_valid().then_some(span_context)
    }
}

impl TextMapPropagator for B3Propagator {
    fn inject_context(&self, cx: &Context, injector: &mut dyn Injector) {
        let span = cx.span();
        let span_context = span.span_context();
        if !span_context.is_valid() {
            return;
        }

        let sampled = if span_context.is_sampled() { "1" } else { "0" };
        if self.single_header {
            injector.set(
                B3_SINGLE,
                format!(
                    "{}-{}-{}",
                    span_context.trace_id(),
                    span_context.span_id(),
                    sampled
                ),
            );
        } else {
            injector.set(B3_TRACE_ID, span_context.trace_id().to_string());
            injector.set(B3_SPAN_ID, span_context.span_id().to_string());
            injector.set(B3_SAMPLED, sampled.to_string());
        }
    }

    fn extract_with_context(&self, cx: &Context, extractor: &dyn Extractor) -> Context {
        match self.extract_span_context(extractor) {
            Some(span_context) => cx.with_remote_span_context(span_context),
            None => cx.clone(),
        }
    }

    fn fields(&self) -> FieldIter<'_> {
        if self.single_header {
            FieldIter::new(&B3_SINGLE_FIELDS)
        } else {
            FieldIter::new(&B3_MULTI_FIELDS)
        }
    }
}

// ============================================================================
// FORMAT-SELECTED PROPAGATOR
// ============================================================================

/// The propagator actually installed as the process-global text-map
/// propagator, dispatching on the configured [`PropagationFormat`].
#[derive(Debug, Clone)]
pub enum TracePropagator {
    TraceContext(TraceContextPropagator),
    B3(B3Propagator),
}

impl TracePropagator {
    pub fn for_format(format: PropagationFormat) -> Self {
        match format {
            PropagationFormat::W3c => Self::TraceContext(TraceContextPropagator::new()),
            PropagationFormat::B3Multi => Self::B3(B3Propagator::multi()),
            PropagationFormat::B3Single => Self::B3(B3Propagator::single()),
        }
    }
}

impl TextMapPropagator for TracePropagator {
    fn inject_context(&self, cx: &Context, injector: &mut dyn Injector) {
        match self {
            Self::TraceContext(p) => p.inject_context(cx, injector),
            Self::B3(p) => p.inject_context(cx, injector),
        }
    }

    fn extract_with_context(&self, cx: &Context, extractor: &dyn Extractor) -> Context {
        match self {
            Self::TraceContext(p) => p.extract_with_context(cx, extractor),
            Self::B3(p) => p.extract_with_context(cx, extractor),
        }
    }

    fn fields(&self) -> FieldIter<'_> {
        match self {
            Self::TraceContext(p) => p.fields(),
            Self::B3(p) => p.fields(),
        }
    }
}

/// Install the propagator for the given format as the process-global
/// text-map propagator. Called once at startup by both processes.
pub fn set_global_propagator(format: PropagationFormat) {
    global::set_text_map_propagator(TracePropagator::for_format(format));
}

// ============================================================================
// CARRIERS
// ============================================================================

/// [`Injector`] over tonic request metadata, used to carry the current
/// span identifier on the outbound gRPC call.
pub struct MetadataInjector<'a>(pub &'a mut MetadataMap);

impl Injector for MetadataInjector<'_> {
    fn set(&mut self, key: &str, value: String) {
        if let Ok(key) = MetadataKey::from_bytes(key.as_bytes()) {
            if let Ok(value) = MetadataValue::try_from(value.as_str()) {
                self.0.insert(key, value);
            }
        }
    }
}

/// [`Extractor`] over tonic request metadata, used by the backend to
/// recover the caller's span identifier.
pub struct MetadataExtractor<'a>(pub &'a MetadataMap);

impl Extractor for MetadataExtractor<'_> {
    fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(|value| value.to_str().ok())
    }

    fn keys(&self) -> Vec<&str> {
        self.0
            .keys()
            .map(|key| match key {
                KeyRef::Ascii(k) => k.as_str(),
                KeyRef::Binary(k) => k.as_str(),
            })
            .collect()
    }
}

/// Inject the span identifier from `cx` into outbound gRPC metadata using
/// the globally configured format.
pub fn inject_metadata(cx: &Context, metadata: &mut MetadataMap) {
    global::get_text_map_propagator(|propagator| {
        propagator.inject_context(cx, &mut MetadataInjector(metadata))
    });
}

/// Extract the remote span identifier from inbound gRPC metadata. Returns
/// a root context when no (or malformed) identifiers are present.
pub fn extract_metadata(metadata: &MetadataMap) -> Context {
    global::get_text_map_propagator(|propagator| {
        propagator.extract_with_context(&Context::new(), &MetadataExtractor(metadata))
    })
}

/// Extract the remote span identifier from inbound HTTP headers.
pub fn extract_headers(headers: &http::HeaderMap) -> Context {
    global::get_text_map_propagator(|propagator| {
        propagator.extract_with_context(&Context::new(), &HeaderExtractor(headers))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn sample_context() -> Context {
        let span_context = SpanContext::new(
            TraceId::from_hex("0af7651916cd43dd8448eb211c80319c").unwrap(),
            SpanId::from_hex("b7ad6b7169203331").unwrap(),
            TraceFlags::SAMPLED,
            false,
            TraceState::default(),
        );
        Context::new().with_remote_span_context(span_context)
    }

    #[test]
    fn format_selector_parses() {
        assert_eq!("w3c".parse::<PropagationFormat>(), Ok(PropagationFormat::W3c));
        assert_eq!("B3M".parse::<PropagationFormat>(), Ok(PropagationFormat::B3Multi));
        assert_eq!(" b3s ".parse::<PropagationFormat>(), Ok(PropagationFormat::B3Single));
        assert!("zipkin".parse::<PropagationFormat>().is_err());
    }

    #[test]
    fn w3c_round_trip() {
        let propagator = TracePropagator::for_format(PropagationFormat::W3c);
        let cx = sample_context();

        let mut carrier = HashMap::new();
        propagator.inject_context(&cx, &mut carrier);
        assert!(carrier.contains_key("traceparent"));

        let extracted = propagator.extract_with_context(&Context::new(), &carrier);
        let expected = cx.span().span_context().clone();
        let got = extracted.span().span_context().clone();
        assert_eq!(got.trace_id(), expected.trace_id());
        assert_eq!(got.span_id(), expected.span_id());
        assert!(got.is_sampled());
    }

    #[test]
    fn b3_multi_round_trip() {
        let propagator = B3Propagator::multi();
        let cx = sample_context();

        let mut carrier = HashMap::new();
        propagator.inject_context(&cx, &mut carrier);
        assert_eq!(
            carrier.get("x-b3-traceid").map(String::as_str),
            Some("0af7651916cd43dd8448eb211c80319c")
        );
        assert_eq!(
            carrier.get("x-b3-spanid").map(String::as_str),
            Some("b7ad6b7169203331")
        );
        assert_eq!(carrier.get("x-b3-sampled").map(String::as_str), Some("1"));

        let extracted = propagator.extract_with_context(&Context::new(), &carrier);
        let got = extracted.span().span_context().clone();
        assert_eq!(got.trace_id().to_string(), "0af7651916cd43dd8448eb211c80319c");
        assert_eq!(got.span_id().to_string(), "b7ad6b7169203331");
        assert!(got.is_sampled());
        assert!(got.is_remote());
    }

    #[test]
    fn b3_single_round_trip() {
        let propagator = B3Propagator::single();
        let cx = sample_context();

        let mut carrier = HashMap::new();
        propagator.inject_context(&cx, &mut carrier);
        assert_eq!(
            carrier.get("b3").map(String::as_str),
            Some("0af7651916cd43dd8448eb211c80319c-b7ad6b7169203331-1")
        );

        let extracted = propagator.extract_with_context(&Context::new(), &carrier);
        let got = extracted.span().span_context().clone();
        assert_eq!(got.trace_id().to_string(), "0af7651916cd43dd8448eb211c80319c");
        assert!(got.is_sampled());
    }

    #[test]
    fn b3_unsampled_is_preserved() {
        let propagator = B3Propagator::multi();
        let mut carrier = HashMap::new();
        carrier.insert(B3_TRACE_ID.to_string(), "0af7651916cd43dd8448eb211c80319c".to_string());
        carrier.insert(B3_SPAN_ID.to_string(), "b7ad6b7169203331".to_string());
        carrier.insert(B3_SAMPLED.to_string(), "0".to_string());

        let extracted = propagator.extract_with_context(&Context::new(), &carrier);
        assert!(!extracted.span().span_context().is_sampled());
    }

    #[test]
    fn mismatched_formats_fragment_the_trace() {
        // Producer speaks B3, consumer expects W3C: the consumer sees no
        // usable identifiers and starts a fresh root context.
        let producer = TracePropagator::for_format(PropagationFormat::B3Multi);
        let consumer = TracePropagator::for_format(PropagationFormat::W3c);

        let mut carrier = HashMap::new();
        producer.inject_context(&sample_context(), &mut carrier);

        let extracted = consumer.extract_with_context(&Context::new(), &carrier);
        assert!(!extracted.span().span_context().is_valid());
    }

    #[test]
    fn malformed_b3_headers_yield_root_context() {
        let propagator = B3Propagator::multi();
        let mut carrier = HashMap::new();
        carrier.insert(B3_TRACE_ID.to_string(), "not-hex".to_string());
        carrier.insert(B3_SPAN_ID.to_string(), "b7ad6b7169203331".to_string());

        let extracted = propagator.extract_with_context(&Context::new(), &carrier);
        assert!(!extracted.span().span_context().is_valid());
    }

    #[test]
    fn invalid_context_injects_nothing() {
        let propagator = B3Propagator::multi();
        let mut carrier = HashMap::new();
        propagator.inject_context(&Context::new(), &mut carrier);
        assert!(carrier.is_empty());
    }

    #[test]
    fn metadata_carrier_round_trip() {
        let propagator = B3Propagator::multi();
        let cx = sample_context();

        let mut metadata = MetadataMap::new();
        propagator.inject_context(&cx, &mut MetadataInjector(&mut metadata));

        let extracted =
            propagator.extract_with_context(&Context::new(), &MetadataExtractor(&metadata));
        assert_eq!(
            extracted.span().span_context().trace_id(),
            cx.span().span_context().trace_id()
        );
    }
}

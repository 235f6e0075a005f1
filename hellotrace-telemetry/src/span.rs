//! Span recorder facade.
//!
//! Thin wrapper over the OpenTelemetry API used by both processes to open
//! and close spans, tag them, and emit point-in-time events. Contexts are
//! passed to request handlers explicitly rather than looked up through
//! thread-local ambient state, which keeps the parent/child relationship
//! deterministic across await points.

use std::borrow::Cow;

use opentelemetry::{
    global,
    trace::{SpanKind, Status, TraceContextExt, Tracer},
    Context, KeyValue, Value,
};

const TRACER_NAME: &str = "hellotrace";

/// The server span covering one inbound request. Cloneable; clones share
/// the same underlying span.
#[derive(Clone)]
pub struct RequestSpan {
    cx: Context,
}

impl RequestSpan {
    /// Open a server-kind span as a child of `parent` (typically the
    /// context extracted from inbound request metadata).
    pub fn server(name: impl Into<Cow<'static, str>>, parent: &Context) -> Self {
        let tracer = global::tracer(TRACER_NAME);
        let span = tracer
            .span_builder(name)
            .with_kind(SpanKind::Server)
            .start_with_context(&tracer, parent);
        Self {
            cx: parent.with_span(span),
        }
    }

    /// Open an internal child span under this request.
    pub fn child(&self, name: impl Into<Cow<'static, str>>) -> ChildSpan {
        ChildSpan::start(name, SpanKind::Internal, &self.cx)
    }

    /// Open a client-kind child span, for outbound calls.
    pub fn client_child(&self, name: impl Into<Cow<'static, str>>) -> ChildSpan {
        ChildSpan::start(name, SpanKind::Client, &self.cx)
    }

    pub fn tag(&self, key: &'static str, value: impl Into<Value>) {
        self.cx.span().set_attribute(KeyValue::new(key, value.into()));
    }

    pub fn event(&self, message: impl Into<Cow<'static, str>>) {
        self.cx.span().add_event(message.into(), Vec::new());
    }

    pub fn set_error(&self, description: impl Into<Cow<'static, str>>) {
        self.cx.span().set_status(Status::error(description.into()));
    }

    pub fn set_ok(&self) {
        self.cx.span().set_status(Status::Ok);
    }

    /// The context carrying this span, for opening children or injecting
    /// into outbound metadata.
    pub fn context(&self) -> &Context {
        &self.cx
    }

    pub fn end(&self) {
        self.cx.span().end();
    }
}

/// A child span within one request. Ends explicitly via [`ChildSpan::end`]
/// or implicitly when dropped.
pub struct ChildSpan {
    cx: Context,
}

impl ChildSpan {
    fn start(name: impl Into<Cow<'static, str>>, kind: SpanKind, parent: &Context) -> Self {
        let tracer = global::tracer(TRACER_NAME);
        let span = tracer
            .span_builder(name)
            .with_kind(kind)
            .start_with_context(&tracer, parent);
        Self {
            cx: parent.with_span(span),
        }
    }

    pub fn tag(&self, key: &'static str, value: impl Into<Value>) {
        self.cx.span().set_attribute(KeyValue::new(key, value.into()));
    }

    pub fn event(&self, message: impl Into<Cow<'static, str>>) {
        self.cx.span().add_event(message.into(), Vec::new());
    }

    pub fn set_error(&self, description: impl Into<Cow<'static, str>>) {
        self.cx.span().set_status(Status::error(description.into()));
    }

    pub fn context(&self) -> &Context {
        &self.cx
    }

    pub fn end(self) {
        self.cx.span().end();
    }
}

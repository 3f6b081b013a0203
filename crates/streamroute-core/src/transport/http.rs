//! HTTP event-stream transport
//!
//! Sends one request per connection and decodes the response body with
//! [`SseLineDecoder`]. No reconnection: a dropped body is reported once as
//! an error event and the connection stays dead.

use futures::StreamExt;
use reqwest::header::{HeaderName, HeaderValue, ACCEPT};
use reqwest::{Client, Method, RequestBuilder};
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use url::Url;

use super::sse::SseLineDecoder;
use super::{Connection, EventSink, Transport, TransportEvent};
use crate::config::HttpSettings;
use crate::error::TransportError;
use crate::session::StreamOptions;

/// [`Transport`] over `reqwest`
pub struct HttpTransport {
    client: Client,
    base_url: Option<Url>,
}

impl HttpTransport {
    pub fn new(settings: &HttpSettings) -> Result<Self, TransportError> {
        let mut builder = Client::builder().user_agent(settings.user_agent.clone());
        if let Some(secs) = settings.connect_timeout_secs {
            builder = builder.connect_timeout(Duration::from_secs(secs));
        }
        let client = builder
            .build()
            .map_err(|e| TransportError::Connect(e.to_string()))?;

        let base_url = settings
            .base_url
            .as_deref()
            .map(|base| {
                Url::parse(base).map_err(|e| TransportError::InvalidUrl {
                    url: base.to_string(),
                    reason: e.to_string(),
                })
            })
            .transpose()?;

        Ok(Self { client, base_url })
    }

    /// Resolve `url`, joining relative paths onto the configured base URL
    fn resolve(&self, url: &str) -> Result<Url, TransportError> {
        let invalid = |e: url::ParseError| TransportError::InvalidUrl {
            url: url.to_string(),
            reason: e.to_string(),
        };
        match (Url::parse(url), &self.base_url) {
            (Ok(absolute), _) => Ok(absolute),
            (Err(url::ParseError::RelativeUrlWithoutBase), Some(base)) => {
                base.join(url).map_err(invalid)
            }
            (Err(e), _) => Err(invalid(e)),
        }
    }

    fn build_request(
        &self,
        url: &str,
        options: &StreamOptions,
    ) -> Result<RequestBuilder, TransportError> {
        let url = self.resolve(url)?;
        let method = Method::from_bytes(options.method.to_ascii_uppercase().as_bytes())
            .map_err(|_| {
                TransportError::InvalidOptions(format!("unsupported method '{}'", options.method))
            })?;

        let mut request = self
            .client
            .request(method, url)
            .header(ACCEPT, "text/event-stream");
        for (name, value) in &options.headers {
            let header_name = HeaderName::from_bytes(name.as_bytes()).map_err(|_| {
                TransportError::InvalidOptions(format!("invalid header name '{}'", name))
            })?;
            let header_value = HeaderValue::from_str(value).map_err(|_| {
                TransportError::InvalidOptions(format!("invalid value for header '{}'", name))
            })?;
            request = request.header(header_name, header_value);
        }
        if let Some(payload) = &options.payload {
            request = request.body(payload.clone());
        }
        if options.with_credentials {
            debug!("with_credentials has no effect outside a browser, ignoring");
        }
        Ok(request)
    }
}

impl Transport for HttpTransport {
    fn open(
        &self,
        url: &str,
        options: &StreamOptions,
        sink: EventSink,
    ) -> Result<Box<dyn Connection>, TransportError> {
        let request = self.build_request(url, options)?;
        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|e| TransportError::Connect(format!("no async runtime: {}", e)))?;

        let cancel = CancellationToken::new();
        let token = cancel.clone();
        let url = url.to_string();
        runtime.spawn(async move {
            tokio::select! {
                _ = token.cancelled() => debug!(url = %url, "stream task cancelled"),
                _ = pump(request, sink) => {}
            }
        });

        Ok(Box::new(HttpConnection { cancel }))
    }
}

/// Read the response body and forward message events until it ends
async fn pump(request: RequestBuilder, sink: EventSink) {
    let stream_start = Instant::now();
    let response = match request.send().await {
        Ok(response) => response,
        Err(e) => {
            let _ = sink.send(TransportEvent::Error(TransportError::Connect(e.to_string())));
            return;
        }
    };

    let status = response.status();
    if !status.is_success() {
        let _ = sink.send(TransportEvent::Error(TransportError::Status {
            status: status.as_u16(),
        }));
        return;
    }
    info!("SSE stream connected ({}) after {:?}", status, stream_start.elapsed());

    let mut decoder = SseLineDecoder::new();
    let mut body = response.bytes_stream();
    let mut event_count = 0usize;
    while let Some(chunk) = body.next().await {
        let bytes = match chunk {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!(error = %e, "SSE stream read error");
                let _ = sink.send(TransportEvent::Error(TransportError::Read(e.to_string())));
                return;
            }
        };
        for message in decoder.push(&bytes) {
            if !message.is_message() {
                debug!("skipping SSE event of type {:?}", message.event);
                continue;
            }
            event_count += 1;
            if sink.send(TransportEvent::Message(message.data)).is_err() {
                // Session dropped its receiver; nobody is listening any more.
                return;
            }
        }
    }

    info!(
        "SSE body ended after {:?}, {} events, {} bytes",
        stream_start.elapsed(),
        event_count,
        decoder.bytes_received()
    );
    let _ = sink.send(TransportEvent::Error(TransportError::Closed));
}

/// Connection handle; closing cancels the reader task
struct HttpConnection {
    cancel: CancellationToken,
}

impl Connection for HttpConnection {
    fn close(&mut self) {
        self.cancel.cancel();
    }

    fn is_closed(&self) -> bool {
        self.cancel.is_cancelled()
    }
}

impl Drop for HttpConnection {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

use std::io::Read;

use log::debug;
use reqwest::Url;

use crate::{
    config::FetcherConfig,
    error::{Error, TransportErrorKind},
};

/// Status and body of an HTTP response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Issues the single GET request of a quote fetch.
pub trait Transport {
    /// GET `url` and read the whole body, failing with
    /// [`Error::OversizedResponseError`] once it exceeds `max_body_size` bytes.
    fn get(&self, url: &Url, max_body_size: u64) -> Result<HttpResponse, Error>;
}

/// [`Transport`] backed by a blocking `reqwest` client.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: reqwest::blocking::Client,
}

impl ReqwestTransport {
    /// Build the HTTP client from the user agent and timeouts of `config`.
    ///
    /// The timeout bounds the connection establishment as well as the whole
    /// exchange, body included.
    pub fn new(config: &FetcherConfig) -> Result<Self, Error> {
        let client = reqwest::blocking::Client::builder()
            .user_agent(config.user_agent.as_str())
            .connect_timeout(config.timeout())
            .timeout(config.timeout())
            .build()
            .map_err(|e| Error::ConfigError(format!("can't build HTTP client: {e}")))?;

        Ok(Self { client })
    }
}

impl Transport for ReqwestTransport {
    fn get(&self, url: &Url, max_body_size: u64) -> Result<HttpResponse, Error> {
        let response = self
            .client
            .get(url.clone())
            .send()
            .map_err(request_error)?;

        let status = response.status();
        debug!(
            "HTTP status code {status}, content length {:?}",
            response.content_length()
        );

        // Error bodies only feed the diagnostic excerpt, truncate them.
        if !status.is_success() {
            let mut body = Vec::new();
            response
                .take(max_body_size)
                .read_to_end(&mut body)
                .map_err(body_error)?;

            return Ok(HttpResponse {
                status: status.as_u16(),
                body,
            });
        }

        if let Some(len) = response.content_length() {
            if len > max_body_size {
                return Err(Error::OversizedResponseError {
                    limit: max_body_size,
                });
            }
        }

        // One byte past the limit tells an oversized body from one that
        // exactly fills it.
        let mut body = Vec::new();
        response
            .take(max_body_size.saturating_add(1))
            .read_to_end(&mut body)
            .map_err(body_error)?;

        if body.len() as u64 > max_body_size {
            return Err(Error::OversizedResponseError {
                limit: max_body_size,
            });
        }

        Ok(HttpResponse {
            status: status.as_u16(),
            body,
        })
    }
}

fn request_error(e: reqwest::Error) -> Error {
    let kind = if e.is_timeout() {
        TransportErrorKind::Timeout
    } else if is_tls_failure(&e) {
        TransportErrorKind::TlsFailed
    } else if e.is_body() || e.is_decode() {
        TransportErrorKind::BodyRead
    } else {
        TransportErrorKind::ConnectFailed
    };

    Error::transport(kind, error_chain(&e))
}

fn body_error(e: std::io::Error) -> Error {
    let timed_out = e.kind() == std::io::ErrorKind::TimedOut
        || e.get_ref()
            .and_then(|inner| inner.downcast_ref::<reqwest::Error>())
            .is_some_and(reqwest::Error::is_timeout);

    let kind = if timed_out {
        TransportErrorKind::Timeout
    } else {
        TransportErrorKind::BodyRead
    };

    Error::transport(kind, error_chain(&e))
}

/// Look for a rustls error anywhere in the chain. tokio-rustls hands it over
/// wrapped in an `InvalidData` I/O error, whose `source()` skips the wrapped
/// error itself.
fn is_tls_failure(e: &(dyn std::error::Error + 'static)) -> bool {
    let mut source = Some(e);
    while let Some(err) = source {
        if err.downcast_ref::<rustls::Error>().is_some() {
            return true;
        }
        if let Some(io) = err.downcast_ref::<std::io::Error>() {
            if io.kind() == std::io::ErrorKind::InvalidData
                || io
                    .get_ref()
                    .is_some_and(|inner| inner.downcast_ref::<rustls::Error>().is_some())
            {
                return true;
            }
        }
        source = err.source();
    }
    false
}

fn error_chain(e: &(dyn std::error::Error + 'static)) -> String {
    let mut message = e.to_string();
    let mut source = e.source();
    while let Some(err) = source {
        message.push_str(": ");
        message.push_str(&err.to_string());
        source = err.source();
    }
    message
}

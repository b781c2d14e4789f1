use std::{io::Write, path::Path};

use log::{debug, warn};
use reqwest::Url;

use crate::{
    config::{FetcherConfig, ResponseMode, ServiceEndpoint},
    error::Error,
    report_data::ReportData,
    transport::{ReqwestTransport, Transport},
};

/// Length of the body kept in a [`Error::RemoteError`].
const BODY_EXCERPT_SIZE: usize = 256;

/// Canonical quote bytes, without trailing newline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Quote(Vec<u8>);

impl Quote {
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.0
    }

    /// Quote bytes followed by exactly one newline.
    pub fn to_output(&self) -> Vec<u8> {
        let mut output = Vec::with_capacity(self.0.len() + 1);
        output.extend_from_slice(&self.0);
        output.push(b'\n');
        output
    }

    /// Emit the quote to `sink` with a single write.
    pub fn write_to<W: Write>(&self, sink: &mut W) -> Result<(), Error> {
        sink.write_all(&self.to_output())?;
        sink.flush()?;
        Ok(())
    }

    /// Write the quote to `path` through a temporary file renamed into place,
    /// so a failed write never leaves a partial quote behind.
    pub fn write_to_file(&self, path: &Path) -> Result<(), Error> {
        let dir = match path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir,
            _ => Path::new("."),
        };

        let mut file = tempfile::NamedTempFile::new_in(dir)?;
        self.write_to(&mut file)?;
        file.persist(path).map_err(|e| Error::IoError(e.error))?;

        Ok(())
    }
}

/// Extract the quote from a response body according to `mode`.
///
/// # Returns
///
/// Either the [`Quote`] or [`Error::EmptyResponseError`] when nothing is left
/// once newlines have been stripped.
pub fn normalize_response(body: &[u8], mode: ResponseMode) -> Result<Quote, Error> {
    let quote = match mode {
        ResponseMode::Direct => strip_line_ending(body),
        ResponseMode::LineDelimited => body
            .split(|b| *b == b'\n')
            .map(strip_carriage_return)
            .filter(|line| !line.is_empty())
            .last()
            .unwrap_or_default(),
    };

    if quote.is_empty() {
        return Err(Error::EmptyResponseError);
    }

    Ok(Quote(quote.to_vec()))
}

fn strip_line_ending(body: &[u8]) -> &[u8] {
    body.strip_suffix(b"\n").unwrap_or(body)
}

fn strip_carriage_return(line: &[u8]) -> &[u8] {
    line.strip_suffix(b"\r").unwrap_or(line)
}

/// Fetch DCAP quotes from a remote attestation service.
///
/// A fetcher only holds immutable settings, so one instance may serve
/// concurrent callers as long as its transport allows it.
#[derive(Debug)]
pub struct QuoteFetcher<T = ReqwestTransport> {
    endpoint: ServiceEndpoint,
    max_response_size: u64,
    transport: T,
}

impl QuoteFetcher<ReqwestTransport> {
    /// Build a fetcher issuing its requests with `reqwest`.
    pub fn new(config: &FetcherConfig) -> Result<Self, Error> {
        config.validate()?;
        let transport = ReqwestTransport::new(config)?;
        Self::with_transport(config, transport)
    }
}

impl<T: Transport> QuoteFetcher<T> {
    pub fn with_transport(config: &FetcherConfig, transport: T) -> Result<Self, Error> {
        config.validate()?;

        Ok(Self {
            endpoint: config.endpoint()?,
            max_response_size: config.max_response_size,
            transport,
        })
    }

    pub fn endpoint(&self) -> &ServiceEndpoint {
        &self.endpoint
    }

    pub fn quote_url(&self, report_data: &ReportData) -> Result<Url, Error> {
        self.endpoint.quote_url(report_data)
    }

    /// Fetch the quote for the report data given as a hex string.
    ///
    /// # Arguments
    ///
    /// * `report_data_hex` - 64 bytes encoded as 128 hex characters, in any case.
    ///
    /// # Returns
    ///
    /// Either [`Quote`] or [`Error`]. Malformed report data is rejected with
    /// [`Error::ValidationError`] before any request is sent.
    pub fn fetch(&self, report_data_hex: &str) -> Result<Quote, Error> {
        let report_data = ReportData::from_hex(report_data_hex)?;
        self.fetch_report_data(&report_data)
    }

    /// Fetch the quote for `report_data` with one GET request, no retry.
    pub fn fetch_report_data(&self, report_data: &ReportData) -> Result<Quote, Error> {
        let url = self.quote_url(report_data)?;

        debug!("Requesting quote from: {url}");

        let response = self.transport.get(&url, self.max_response_size)?;

        if !response.is_success() {
            warn!("Attestation service answered HTTP {}", response.status);
            let excerpt = &response.body[..response.body.len().min(BODY_EXCERPT_SIZE)];
            return Err(Error::RemoteError {
                status: response.status,
                body_excerpt: String::from_utf8_lossy(excerpt).into_owned(),
            });
        }

        if response.body.len() as u64 > self.max_response_size {
            return Err(Error::OversizedResponseError {
                limit: self.max_response_size,
            });
        }

        debug!(
            "Received {} bytes, extracting quote ({} mode)",
            response.body.len(),
            self.endpoint.mode()
        );

        normalize_response(&response.body, self.endpoint.mode())
    }
}

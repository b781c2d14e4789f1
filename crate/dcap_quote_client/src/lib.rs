pub mod config;
pub mod error;
pub mod fetcher;
pub mod report_data;
pub mod transport;

pub use config::{FetcherConfig, ResponseMode, ServiceEndpoint};
pub use error::{Error, TransportErrorKind, ValidationErrorKind};
pub use fetcher::{normalize_response, Quote, QuoteFetcher};
pub use report_data::{ReportData, REPORT_DATA_SIZE};
pub use transport::{HttpResponse, ReqwestTransport, Transport};

/// Fetch a DCAP quote from the default attestation service.
///
/// # Arguments
///
/// * `report_data_hex` - 64 bytes of report data as 128 hex characters.
/// * `mode` - Shape of the body returned by the service.
///
/// # Returns
///
/// Either the quote bytes followed by one newline, as printed by the
/// `fetch_quote` binary, or [`Error`].
pub fn fetch_quote(report_data_hex: &str, mode: ResponseMode) -> Result<Vec<u8>, Error> {
    let config = FetcherConfig {
        mode,
        ..Default::default()
    };

    let quote = QuoteFetcher::new(&config)?.fetch(report_data_hex)?;

    Ok(quote.to_output())
}

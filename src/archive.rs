use std::io::{self, Read, Write};
use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};

use crate::dataset::{ProgressEvent, ProgressSink};
use crate::error::MmashError;

const CHUNK_SIZE: usize = 64 * 1024;

/// Streams a remote archive into `destination`, returning the bytes written.
pub trait ArchiveClient {
    fn download(
        &self,
        url: &str,
        destination: &mut dyn Write,
        sink: &dyn ProgressSink,
    ) -> Result<u64, MmashError>;
}

#[derive(Clone)]
pub struct HttpArchiveClient {
    client: Client,
}

impl HttpArchiveClient {
    pub fn new() -> Result<Self, MmashError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&format!("mmash-dataset/{}", env!("CARGO_PKG_VERSION")))
                .map_err(|err| MmashError::ArchiveHttp(err.to_string()))?,
        );
        // No request timeout: the download blocks until the transport gives up.
        let client = Client::builder()
            .default_headers(headers)
            .timeout(None::<Duration>)
            .build()
            .map_err(|err| MmashError::ArchiveHttp(err.to_string()))?;
        Ok(Self { client })
    }
}

impl ArchiveClient for HttpArchiveClient {
    fn download(
        &self,
        url: &str,
        destination: &mut dyn Write,
        sink: &dyn ProgressSink,
    ) -> Result<u64, MmashError> {
        let response = self
            .client
            .get(url)
            .send()
            .map_err(|err| MmashError::ArchiveHttp(err.to_string()))?;
        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = response
                .text()
                .unwrap_or_else(|_| "archive request failed".to_string());
            return Err(MmashError::ArchiveStatus { status, message });
        }
        let total = response.content_length();
        copy_with_progress(response, destination, total, sink)
    }
}

/// Copies `source` into `destination` chunk by chunk, emitting a transfer event per chunk.
///
/// `total` is only echoed in the events; a short or long body is not an error.
pub fn copy_with_progress<R: Read>(
    mut source: R,
    destination: &mut dyn Write,
    total: Option<u64>,
    sink: &dyn ProgressSink,
) -> Result<u64, MmashError> {
    let mut buffer = vec![0u8; CHUNK_SIZE];
    let mut received = 0u64;
    loop {
        let read = match source.read(&mut buffer) {
            Ok(0) => break,
            Ok(read) => read,
            Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
            Err(err) => return Err(MmashError::ArchiveHttp(err.to_string())),
        };
        destination
            .write_all(&buffer[..read])
            .map_err(|err| MmashError::Filesystem(err.to_string()))?;
        received += read as u64;
        sink.event(ProgressEvent::transfer(received, total));
    }
    destination
        .flush()
        .map_err(|err| MmashError::Filesystem(err.to_string()))?;
    Ok(received)
}

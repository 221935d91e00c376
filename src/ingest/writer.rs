//! Chunked, size-bounded copy of an upload stream onto disk.
//!
//! Mirrors the object store's streaming upload: bytes are hashed while they
//! are written so the stored file gets an MD5 etag for free, and nothing is
//! buffered beyond a single chunk.

use super::{IngestError, IngestResult};
use md5::Context;
use std::path::Path;
use tokio::{
    fs::File,
    io::{AsyncRead, AsyncReadExt, AsyncWriteExt},
};

/// Bytes read per step, both for the header read and the copy loop.
pub const CHUNK_SIZE: usize = 8192;

/// Result of a completed bounded write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteOutcome {
    pub size_bytes: u64,
    /// Lowercase hex MD5 of the written bytes.
    pub checksum: String,
}

/// Read up to `len` bytes from the front of `reader`.
///
/// Returns fewer bytes only when the stream ends first. An empty stream is
/// rejected with `InvalidInput` naming `label`.
pub async fn read_header<R>(reader: &mut R, len: usize, label: &str) -> IngestResult<Vec<u8>>
where
    R: AsyncRead + Unpin,
{
    let mut header = vec![0u8; len];
    let mut filled = 0;
    while filled < len {
        let n = reader.read(&mut header[filled..]).await?;
        if n == 0 {
            break;
        }
        filled += n;
    }
    header.truncate(filled);

    if header.is_empty() {
        return Err(IngestError::invalid(format!("{label} file is empty")));
    }
    Ok(header)
}

/// Write `header` followed by the rest of `reader` to `dest`.
///
/// Fails with `SizeExceeded` as soon as the running total passes `limit`.
/// A failed write leaves whatever was already flushed at `dest`; removing
/// it is the caller's job.
pub async fn write_bounded<R>(
    header: &[u8],
    reader: &mut R,
    dest: &Path,
    limit: u64,
    label: &'static str,
) -> IngestResult<WriteOutcome>
where
    R: AsyncRead + Unpin,
{
    if header.is_empty() {
        return Err(IngestError::invalid(format!("{label} file is empty")));
    }

    let mut total = header.len() as u64;
    if total > limit {
        return Err(IngestError::SizeExceeded {
            label,
            size: total,
            limit,
        });
    }

    let mut file = File::create(dest).await?;
    let mut digest = Context::new();
    digest.consume(header);
    file.write_all(header).await?;

    let mut buf = vec![0u8; CHUNK_SIZE];
    loop {
        let n = reader.read(&mut buf).await?;
        if n == 0 {
            break;
        }
        total += n as u64;
        if total > limit {
            return Err(IngestError::SizeExceeded {
                label,
                size: total,
                limit,
            });
        }
        digest.consume(&buf[..n]);
        file.write_all(&buf[..n]).await?;
    }

    file.flush().await?;
    file.sync_all().await?;

    Ok(WriteOutcome {
        size_bytes: total,
        checksum: format!("{:x}", digest.compute()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn header_reads_across_short_chunks() {
        let data = vec![7u8; 20_000];
        let mut reader = data.as_slice();
        let header = read_header(&mut reader, CHUNK_SIZE, "Book").await.unwrap();
        assert_eq!(header.len(), CHUNK_SIZE);
        assert_eq!(reader.len(), 20_000 - CHUNK_SIZE);
    }

    #[tokio::test]
    async fn empty_stream_is_invalid_input() {
        let mut reader: &[u8] = &[];
        let err = read_header(&mut reader, CHUNK_SIZE, "Book").await.unwrap_err();
        assert!(matches!(err, IngestError::InvalidInput(msg) if msg == "Book file is empty"));
    }

    #[tokio::test]
    async fn writes_exact_bytes_and_checksum() {
        let dir = TempDir::new().unwrap();
        let dest = dir.path().join("out.bin");
        let data: Vec<u8> = (0..30_000u32).map(|i| (i % 251) as u8).collect();

        let mut reader = data.as_slice();
        let header = read_header(&mut reader, CHUNK_SIZE, "File").await.unwrap();
        let outcome = write_bounded(&header, &mut reader, &dest, 30_000, "File")
            .await
            .unwrap();

        assert_eq!(outcome.size_bytes, 30_000);
        assert_eq!(outcome.checksum, format!("{:x}", md5::compute(&data)));
        assert_eq!(tokio::fs::read(&dest).await.unwrap(), data);
    }

    #[tokio::test]
    async fn one_byte_over_limit_fails() {
        let dir = TempDir::new().unwrap();
        let dest = dir.path().join("out.bin");
        let data = vec![1u8; 10_001];

        let mut reader = data.as_slice();
        let header = read_header(&mut reader, CHUNK_SIZE, "File").await.unwrap();
        let err = write_bounded(&header, &mut reader, &dest, 10_000, "File")
            .await
            .unwrap_err();

        match err {
            IngestError::SizeExceeded { size, limit, .. } => {
                assert_eq!(limit, 10_000);
                assert!(size > limit);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn oversized_header_fails_before_creating_file() {
        let dir = TempDir::new().unwrap();
        let dest = dir.path().join("out.bin");
        let mut reader: &[u8] = &[];
        let err = write_bounded(&[0u8; 16], &mut reader, &dest, 8, "Cover")
            .await
            .unwrap_err();
        assert!(matches!(err, IngestError::SizeExceeded { label: "Cover", .. }));
        assert!(!dest.exists());
    }
}

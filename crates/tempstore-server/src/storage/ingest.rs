//! Size-capped streaming copy shared by every store backend.

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use super::StoreError;

/// Largest single read taken from an upload stream.
const INGEST_CHUNK_SIZE: usize = 1024 * 1024;

/// Reject up front when the caller already knows the payload is too big.
pub(crate) fn check_declared_size(declared: Option<u64>, limit: u64) -> Result<(), StoreError> {
    match declared {
        Some(size) if size > limit => Err(StoreError::SizeLimitExceeded { limit }),
        _ => Ok(()),
    }
}

/// Copy `reader` into `writer` until EOF, failing as soon as more than
/// `limit` bytes have been read. Returns the number of bytes written.
///
/// Reading stops at the first chunk that crosses the limit; the caller owns
/// cleanup of whatever `writer` already received.
pub(crate) async fn copy_capped<R, W>(
    reader: &mut R,
    writer: &mut W,
    limit: u64,
) -> Result<u64, StoreError>
where
    R: AsyncRead + Unpin + ?Sized,
    W: AsyncWrite + Unpin + ?Sized,
{
    let mut buf = vec![0u8; INGEST_CHUNK_SIZE];
    let mut total: u64 = 0;

    loop {
        let n = reader.read(&mut buf).await?;
        if n == 0 {
            break;
        }

        total += n as u64;
        if total > limit {
            return Err(StoreError::SizeLimitExceeded { limit });
        }

        writer.write_all(&buf[..n]).await?;
    }

    writer.flush().await?;
    Ok(total)
}

#[cfg(test)]
mod tests {
    use std::io;

    use bytes::Bytes;
    use futures::stream;
    use tokio_util::io::StreamReader;

    use super::*;

    #[tokio::test]
    async fn test_copies_everything_under_limit() {
        let data = vec![7u8; 3 * INGEST_CHUNK_SIZE + 17];
        let mut reader = data.as_slice();
        let mut out = Vec::new();

        let n = copy_capped(&mut reader, &mut out, data.len() as u64)
            .await
            .unwrap();

        assert_eq!(n, data.len() as u64);
        assert_eq!(out, data);
    }

    #[tokio::test]
    async fn test_stops_at_first_chunk_over_limit() {
        let chunks: Vec<io::Result<Bytes>> = vec![
            Ok(Bytes::from(vec![1u8; 60])),
            Ok(Bytes::from(vec![2u8; 60])),
            Ok(Bytes::from(vec![3u8; 60])),
        ];
        let mut reader = StreamReader::new(stream::iter(chunks));
        let mut out = Vec::new();

        let err = copy_capped(&mut reader, &mut out, 100).await.unwrap_err();

        assert!(matches!(err, StoreError::SizeLimitExceeded { limit: 100 }));
        // only the first chunk made it out before the limit tripped
        assert_eq!(out.len(), 60);
    }

    #[tokio::test]
    async fn test_exact_limit_is_allowed() {
        let data = vec![0u8; 100];
        let mut reader = data.as_slice();
        let mut out = Vec::new();

        assert_eq!(copy_capped(&mut reader, &mut out, 100).await.unwrap(), 100);
    }

    #[tokio::test]
    async fn test_read_error_propagates() {
        let chunks: Vec<io::Result<Bytes>> = vec![
            Ok(Bytes::from_static(b"partial")),
            Err(io::Error::new(io::ErrorKind::ConnectionReset, "client went away")),
        ];
        let mut reader = StreamReader::new(stream::iter(chunks));
        let mut out = Vec::new();

        let err = copy_capped(&mut reader, &mut out, 1024).await.unwrap_err();
        assert!(matches!(err, StoreError::Io(e) if e.kind() == io::ErrorKind::ConnectionReset));
    }

    #[test]
    fn test_declared_size() {
        assert!(check_declared_size(None, 10).is_ok());
        assert!(check_declared_size(Some(10), 10).is_ok());
        assert!(matches!(
            check_declared_size(Some(11), 10),
            Err(StoreError::SizeLimitExceeded { limit: 10 })
        ));
    }
}

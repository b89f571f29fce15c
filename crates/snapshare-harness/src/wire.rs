//! Frame I/O over simulated byte streams.

use std::io::{self, ErrorKind};

use bytes::BytesMut;
use snapshare_proto::{Frame, FrameHeader};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// Read one frame. Returns `Ok(None)` when the peer closed the stream on a
/// frame boundary.
///
/// # Errors
///
/// - `ErrorKind::InvalidData` for a header that fails validation
/// - `ErrorKind::UnexpectedEof` if the stream ends inside a frame
pub async fn read_frame<R: AsyncRead + Unpin>(reader: &mut R) -> io::Result<Option<Frame>> {
    let mut header_buf = [0u8; FrameHeader::SIZE];
    match reader.read_exact(&mut header_buf).await {
        Ok(_) => {},
        Err(e) if e.kind() == ErrorKind::UnexpectedEof => return Ok(None),
        Err(e) => return Err(e),
    }

    let payload_size = FrameHeader::from_bytes(&header_buf)
        .map_err(|e| io::Error::new(ErrorKind::InvalidData, e))?
        .payload_size() as usize;

    let mut buf = BytesMut::zeroed(FrameHeader::SIZE + payload_size);
    buf[..FrameHeader::SIZE].copy_from_slice(&header_buf);
    reader.read_exact(&mut buf[FrameHeader::SIZE..]).await?;

    Frame::decode(&buf).map(Some).map_err(|e| io::Error::new(ErrorKind::InvalidData, e))
}

/// Encode and write one frame, then flush.
pub(crate) async fn write_frame<W: AsyncWrite + Unpin>(
    writer: &mut W,
    frame: &Frame,
) -> io::Result<()> {
    let mut buf = Vec::with_capacity(frame.wire_len());
    frame.encode(&mut buf).map_err(|e| io::Error::new(ErrorKind::InvalidData, e))?;
    writer.write_all(&buf).await?;
    writer.flush().await
}

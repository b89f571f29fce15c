//! Minimal protocol client over turmoil TCP.
//!
//! Sends requests with increasing request ids and reads whatever the server
//! pushes back, in order. It keeps no engine state of its own; tests decide
//! what to expect.

use std::{
    io::{self, ErrorKind},
    time::Duration,
};

use snapshare_proto::{
    Frame, Opcode, Payload,
    payloads::{
        content::{AddComment, AssetUpload, ContentId, PublishContent, Scope},
        group::{CreateGroup, JoinGroup},
        session::{Goodbye, Join},
    },
};
use tokio::io::AsyncWriteExt;
use turmoil::net::{
    TcpStream,
    tcp::{OwnedReadHalf, OwnedWriteHalf},
};

use crate::{read_frame, wire::write_frame};

fn invalid_data(e: impl std::error::Error + Send + Sync + 'static) -> io::Error {
    io::Error::new(ErrorKind::InvalidData, e)
}

/// Simulated client connection.
pub struct SimClient {
    reader: OwnedReadHalf,
    writer: OwnedWriteHalf,
    next_request_id: u32,
}

impl SimClient {
    /// Connect to a simulated server, e.g. `"server:4433"`.
    pub async fn connect(address: &str) -> io::Result<Self> {
        let (reader, writer) = TcpStream::connect(address).await?.into_split();
        Ok(Self { reader, writer, next_request_id: 1 })
    }

    /// Send a request and return the request id it was stamped with.
    pub async fn send(&mut self, payload: Payload) -> io::Result<u32> {
        let request_id = self.next_request_id;
        self.next_request_id += 1;

        let frame = payload.into_frame_for(request_id).map_err(invalid_data)?;
        self.send_frame(&frame).await?;
        Ok(request_id)
    }

    /// Send a prebuilt frame as-is.
    pub async fn send_frame(&mut self, frame: &Frame) -> io::Result<()> {
        write_frame(&mut self.writer, frame).await
    }

    /// Next frame from the server, or `None` once it closed the connection.
    pub async fn next_frame(&mut self) -> io::Result<Option<Frame>> {
        read_frame(&mut self.reader).await
    }

    /// Next frame, decoded. Returns the frame's request id with the payload.
    ///
    /// # Errors
    ///
    /// - `ErrorKind::UnexpectedEof` if the server closed the connection
    /// - `ErrorKind::InvalidData` if the payload does not decode
    pub async fn recv(&mut self) -> io::Result<(u32, Payload)> {
        let frame = self
            .next_frame()
            .await?
            .ok_or_else(|| io::Error::new(ErrorKind::UnexpectedEof, "server closed connection"))?;
        let payload = Payload::from_frame(&frame).map_err(invalid_data)?;
        Ok((frame.header.request_id(), payload))
    }

    /// Like [`SimClient::recv`], but gives up after `timeout` of simulated
    /// time and returns `None`.
    pub async fn recv_timeout(&mut self, timeout: Duration) -> io::Result<Option<(u32, Payload)>> {
        match tokio::time::timeout(timeout, self.recv()).await {
            Ok(received) => received.map(Some),
            Err(_) => Ok(None),
        }
    }

    /// Skip frames until one with `opcode` arrives.
    pub async fn recv_until(&mut self, opcode: Opcode) -> io::Result<(u32, Payload)> {
        loop {
            let (request_id, payload) = self.recv().await?;
            if payload.opcode() == opcode {
                return Ok((request_id, payload));
            }
        }
    }

    /// Join with `display_name`.
    pub async fn join(&mut self, display_name: &str) -> io::Result<u32> {
        self.send(Payload::Join(Join { display_name: display_name.to_string() })).await
    }

    /// Create a group.
    pub async fn create_group(&mut self, name: &str) -> io::Result<u32> {
        self.send(Payload::CreateGroup(CreateGroup { name: name.to_string() })).await
    }

    /// Join a group.
    pub async fn join_group(&mut self, name: &str) -> io::Result<u32> {
        self.send(Payload::JoinGroup(JoinGroup { name: name.to_string() })).await
    }

    /// Publish a small PNG to `scope`.
    pub async fn publish(&mut self, scope: Scope, caption: Option<&str>) -> io::Result<u32> {
        let asset = AssetUpload {
            file_name: "photo.png".to_string(),
            mime_type: "image/png".to_string(),
            bytes: vec![0x89, b'P', b'N', b'G'],
        };
        self.publish_asset(scope, caption, asset).await
    }

    /// Publish an arbitrary upload.
    pub async fn publish_asset(
        &mut self,
        scope: Scope,
        caption: Option<&str>,
        asset: AssetUpload,
    ) -> io::Result<u32> {
        let caption = caption.map(str::to_string);
        self.send(Payload::PublishContent(PublishContent { scope, caption, asset })).await
    }

    /// Comment on an item.
    pub async fn comment(&mut self, content_id: ContentId, text: &str) -> io::Result<u32> {
        self.send(Payload::AddComment(AddComment { content_id, text: text.to_string() })).await
    }

    /// Say goodbye. The server closes the connection afterwards.
    pub async fn goodbye(&mut self) -> io::Result<u32> {
        self.send(Payload::Goodbye(Goodbye::default())).await
    }

    /// Close the write side without saying goodbye.
    pub async fn hang_up(&mut self) -> io::Result<()> {
        self.writer.shutdown().await
    }
}

//! Inbound frame classification.
//!
//! Every frame a runtime reads passes through [`classify`] before the driver
//! sees it. Most frames go straight through. `PublishContent` frames are
//! unpacked here: the upload is validated and stored, and only the resulting
//! asset reference is handed to the driver. An upload that fails never
//! reaches the driver; the runtime sends the returned error frame back to the
//! uploader instead.

use snapshare_core::{env::Environment, validate};
use snapshare_proto::{
    Frame, Opcode, Payload, ProtocolError,
    payloads::{ErrorPayload, content::Scope},
};

use crate::{
    assets::{AssetError, AssetIntake},
    driver::ServerEvent,
    storage::AssetStore,
};

/// Outcome of classifying one inbound frame.
#[derive(Debug)]
pub enum Ingress {
    /// Hand this event to the driver
    Event(ServerEvent),
    /// Send this frame back to the sender and drop the request
    Reject {
        /// Error frame carrying the request's ID
        frame: Frame,
        /// Human-readable reason, for logging
        reason: String,
    },
}

/// Classify a frame received on `session_id`.
///
/// `joined` is whether the driver considers the session joined; uploads from
/// unjoined sessions are refused before anything is stored.
///
/// # Errors
///
/// - `ProtocolError::CborEncode` if the rejection frame cannot be encoded
pub fn classify<S, E>(
    session_id: u64,
    frame: Frame,
    joined: bool,
    intake: &AssetIntake<S, E>,
) -> Result<Ingress, ProtocolError>
where
    S: AssetStore,
    E: Environment,
{
    if frame.opcode() != Some(Opcode::PublishContent) {
        return Ok(Ingress::Event(ServerEvent::FrameReceived { session_id, frame }));
    }

    let request_id = frame.header.request_id();
    let reject = |error: ErrorPayload| -> Result<Ingress, ProtocolError> {
        let reason = error.message.clone();
        let frame = Payload::Error(error).into_frame_for(request_id)?;
        Ok(Ingress::Reject { frame, reason })
    };

    if !joined {
        return reject(ErrorPayload::validation("join before publishing"));
    }

    let publish = match Payload::from_frame(&frame) {
        Ok(Payload::PublishContent(publish)) => publish,
        Ok(other) => {
            return reject(ErrorPayload::invalid_payload(format!(
                "expected PublishContent, decoded {:?}",
                other.opcode()
            )));
        },
        Err(e) => return reject(ErrorPayload::invalid_payload(format!("malformed upload: {e}"))),
    };

    if let Err(e) = validate::caption(publish.caption.as_deref()) {
        return reject(ErrorPayload::validation(e.to_string()));
    }
    if let Scope::Group(name) = &publish.scope
        && let Err(e) = validate::group_name(name)
    {
        return reject(ErrorPayload::validation(e.to_string()));
    }

    match intake.accept(&publish.asset) {
        Ok(stored) => Ok(Ingress::Event(ServerEvent::ContentPublished {
            session_id,
            request_id,
            scope: publish.scope,
            caption: publish.caption,
            asset_ref: stored.asset_ref,
        })),
        Err(AssetError::Storage(e)) => {
            reject(ErrorPayload::asset_rejected(format!("upload could not be stored: {e}")))
        },
        Err(e) => reject(ErrorPayload::asset_rejected(e.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use snapshare_proto::payloads::{
        content::{AssetUpload, PublishContent},
        group::JoinGroup,
    };

    use super::*;
    use crate::{assets::AssetConfig, storage::MemoryAssetStore};

    #[derive(Clone)]
    struct TestEnv;

    impl Environment for TestEnv {
        type Instant = std::time::Instant;

        #[allow(clippy::disallowed_methods)]
        fn now(&self) -> Self::Instant {
            std::time::Instant::now()
        }

        fn sleep(&self, _duration: Duration) -> impl std::future::Future<Output = ()> + Send {
            async {}
        }

        fn random_bytes(&self, buffer: &mut [u8]) {
            buffer.fill(1);
        }

        fn wall_clock_millis(&self) -> u64 {
            42
        }
    }

    fn intake() -> AssetIntake<MemoryAssetStore, TestEnv> {
        AssetIntake::new(AssetConfig::default(), MemoryAssetStore::new(), TestEnv)
    }

    fn publish_frame(scope: Scope, caption: Option<&str>, file_name: &str) -> Frame {
        Payload::PublishContent(PublishContent {
            scope,
            caption: caption.map(str::to_string),
            asset: AssetUpload {
                file_name: file_name.to_string(),
                mime_type: "image/png".to_string(),
                bytes: vec![1, 2, 3],
            },
        })
        .into_frame_for(11)
        .unwrap()
    }

    fn rejection(ingress: Ingress) -> ErrorPayload {
        match ingress {
            Ingress::Reject { frame, .. } => {
                assert_eq!(frame.header.request_id(), 11);
                match Payload::from_frame(&frame).unwrap() {
                    Payload::Error(error) => error,
                    other => panic!("expected error payload, got {other:?}"),
                }
            },
            Ingress::Event(event) => panic!("expected rejection, got {event:?}"),
        }
    }

    #[test]
    fn other_frames_pass_through() {
        let frame =
            Payload::JoinGroup(JoinGroup { name: "Work".to_string() }).into_frame_for(3).unwrap();

        let ingress = classify(5, frame, false, &intake()).unwrap();

        assert!(matches!(ingress, Ingress::Event(ServerEvent::FrameReceived { session_id: 5, .. })));
    }

    #[test]
    fn accepted_upload_becomes_publish_event() {
        let intake = intake();
        let frame = publish_frame(Scope::Group("Work".to_string()), Some("hi"), "a.png");

        let ingress = classify(5, frame, true, &intake).unwrap();

        match ingress {
            Ingress::Event(ServerEvent::ContentPublished {
                session_id,
                request_id,
                scope,
                caption,
                asset_ref,
            }) => {
                assert_eq!((session_id, request_id), (5, 11));
                assert_eq!(scope, Scope::Group("Work".to_string()));
                assert_eq!(caption.as_deref(), Some("hi"));
                assert!(asset_ref.starts_with("/uploads/42-"));
            },
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(intake.store().asset_count().unwrap(), 1);
    }

    #[test]
    fn unjoined_upload_is_refused_before_storing() {
        let intake = intake();

        let error =
            rejection(classify(5, publish_frame(Scope::Global, None, "a.png"), false, &intake).unwrap());

        assert_eq!(error.code, ErrorPayload::VALIDATION);
        assert_eq!(intake.store().asset_count().unwrap(), 0);
    }

    #[test]
    fn bad_file_type_is_rejected() {
        let error =
            rejection(classify(5, publish_frame(Scope::Global, None, "a.exe"), true, &intake()).unwrap());

        assert_eq!(error.code, ErrorPayload::ASSET_REJECTED);
    }

    #[test]
    fn long_caption_is_rejected_before_storing() {
        let intake = intake();
        let caption = "x".repeat(validate::MAX_CAPTION_CHARS + 1);

        let error = rejection(
            classify(5, publish_frame(Scope::Global, Some(&caption), "a.png"), true, &intake).unwrap(),
        );

        assert_eq!(error.code, ErrorPayload::VALIDATION);
        assert_eq!(intake.store().asset_count().unwrap(), 0);
    }

    #[test]
    fn garbage_upload_is_invalid_payload() {
        let mut header = snapshare_proto::FrameHeader::new(Opcode::PublishContent);
        header.set_request_id(11);
        let frame = Frame::new(header, vec![0xff, 0x00, 0x13]);

        let error = rejection(classify(5, frame, true, &intake()).unwrap());

        assert_eq!(error.code, ErrorPayload::INVALID_PAYLOAD);
    }
}

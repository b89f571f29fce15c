//! Upload path tests against the directory-backed store
//!
//! Frames go through ingress into a `DiskAssetStore`, and accepted uploads
//! continue into the driver.

use std::{fs, time::Duration};

use snapshare_core::env::Environment;
use snapshare_proto::{
    Frame, Opcode, Payload,
    payloads::{
        ErrorPayload,
        content::{AssetUpload, PublishContent, Scope},
        session::Join,
    },
};
use snapshare_server::{
    AssetConfig, AssetIntake, AssetStore, DiskAssetStore, DriverConfig, ServerAction,
    ServerDriver, ServerEvent,
    ingress::{Ingress, classify},
};

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
        use rand::RngCore;
        rand::thread_rng().fill_bytes(buffer);
    }

    fn wall_clock_millis(&self) -> u64 {
        1_700_000_000_000
    }
}

fn upload_frame(file_name: &str, mime_type: &str, bytes: Vec<u8>) -> Frame {
    Payload::PublishContent(PublishContent {
        scope: Scope::Global,
        caption: Some("beach".to_string()),
        asset: AssetUpload {
            file_name: file_name.to_string(),
            mime_type: mime_type.to_string(),
            bytes,
        },
    })
    .into_frame_for(9)
    .unwrap()
}

fn disk_intake(dir: &std::path::Path) -> AssetIntake<DiskAssetStore, TestEnv> {
    let store = DiskAssetStore::open(dir.join("uploads")).unwrap();
    AssetIntake::new(AssetConfig { max_bytes: 1024, ..Default::default() }, store, TestEnv)
}

#[test]
fn accepted_upload_lands_on_disk_and_reaches_participants() {
    let dir = tempfile::tempdir().unwrap();
    let intake = disk_intake(dir.path());
    let mut driver = ServerDriver::new(TestEnv, DriverConfig::default());
    for (session_id, name) in [(1, "ada"), (2, "bob")] {
        driver.process_event(ServerEvent::ConnectionAccepted { session_id }).unwrap();
        let frame =
            Payload::Join(Join { display_name: name.to_string() }).into_frame_for(1).unwrap();
        driver.process_event(ServerEvent::FrameReceived { session_id, frame }).unwrap();
    }

    let ingress =
        classify(1, upload_frame("beach.JPG", "image/jpeg", vec![0xff, 0xd8, 0xff]), true, &intake)
            .unwrap();
    let Ingress::Event(event) = ingress else {
        panic!("upload should have been accepted");
    };
    let actions = driver.process_event(event).unwrap();

    let stored: Vec<_> = fs::read_dir(dir.path().join("uploads"))
        .unwrap()
        .map(|entry| entry.unwrap().file_name().into_string().unwrap())
        .collect();
    assert_eq!(stored.len(), 1);
    assert!(stored[0].starts_with("1700000000000-"));
    assert!(stored[0].ends_with(".jpg"));

    let mut new_content_recipients = Vec::new();
    for action in &actions {
        if let ServerAction::Broadcast { recipients, frame } = action
            && frame.opcode() == Some(Opcode::NewContent)
        {
            new_content_recipients.extend(recipients.iter().copied());
            match Payload::from_frame(frame).unwrap() {
                Payload::NewContent(new) => {
                    assert_eq!(new.item.asset_ref, format!("/uploads/{}", stored[0]));
                    assert_eq!(new.item.author, "ada");
                },
                other => panic!("unexpected payload {other:?}"),
            }
        }
    }
    assert_eq!(new_content_recipients, vec![1, 2]);
}

#[test]
fn rejected_uploads_leave_no_files() {
    let dir = tempfile::tempdir().unwrap();
    let intake = disk_intake(dir.path());

    for frame in [
        upload_frame("big.png", "image/png", vec![0; 1025]),
        upload_frame("notes.txt", "text/plain", vec![1]),
        upload_frame("empty.gif", "image/gif", Vec::new()),
    ] {
        match classify(1, frame, true, &intake).unwrap() {
            Ingress::Reject { frame, .. } => {
                assert_eq!(frame.header.request_id(), 9);
                match Payload::from_frame(&frame).unwrap() {
                    Payload::Error(error) => assert_eq!(error.code, ErrorPayload::ASSET_REJECTED),
                    other => panic!("unexpected payload {other:?}"),
                }
            },
            Ingress::Event(event) => panic!("expected rejection, got {event:?}"),
        }
    }

    assert_eq!(intake.store().asset_count().unwrap(), 0);
}

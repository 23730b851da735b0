//! Integration tests for the UDP tracking receiver
//!
//! Tests the following:
//! - Packets sent to the listen socket become the latest snapshot
//! - Malformed packets are dropped and counted
//! - The control message reaches the tracking client
//! - Action state reflects received buttons

use std::net::UdpSocket;
use std::sync::Arc;
use std::time::Duration;

use wxr_common::RuntimeConfig;
use wxr_runtime::{
    Button, GraphicsBinding, HeadlessSurface, LocationFlags, PoseSnapshot, PoseSource,
    PreviewSurface, Runtime, SurfaceFactory,
};

const RECORD: &str = "client0 0 0 0 1 0.5 -0.5 -0.2 1.1 -0.3 0 0 0 1 0 0 0.2 1.1 -0.3 \
    0 0 0 1 0 1.7 0 0.064 104.5 104.5 42 FFFFFFFFFFFFFFFFFFT";

fn listen() -> PoseSource {
    PoseSource::bind(
        "127.0.0.1:0".parse().expect("listen address"),
        "127.0.0.1:9".parse().expect("control address"),
    )
    .expect("bind pose socket")
}

fn send(source: &PoseSource, text: &str) {
    let sender = UdpSocket::bind("127.0.0.1:0").expect("bind sender");
    let target = source.local_addr().expect("bound address");
    sender.send_to(text.as_bytes(), target).expect("send");
}

#[test]
fn test_packet_becomes_latest_snapshot() {
    let source = listen();
    send(&source, RECORD);

    let snapshot = source
        .wait_first(Some(Duration::from_secs(5)))
        .expect("snapshot within timeout");
    assert_eq!(snapshot.frame_id, 42);
    assert_eq!(snapshot.client, "client0");
    assert!(snapshot.pressed(Button::RTrigger));
    assert!((snapshot.head_position.y - 1.7).abs() < 1e-6);
    assert_eq!(source.packets_received(), 1);
    source.shutdown();
}

#[test]
fn test_malformed_packets_are_counted() {
    let source = listen();
    send(&source, "client0 1 2 nope");
    send(&source, RECORD);

    let snapshot = source
        .wait_first(Some(Duration::from_secs(5)))
        .expect("snapshot within timeout");
    assert_eq!(snapshot.frame_id, 42);
    assert_eq!(source.packets_rejected(), 1);
}

#[test]
fn test_control_message_delivery() {
    let client = UdpSocket::bind("127.0.0.1:0").expect("bind client");
    client
        .set_read_timeout(Some(Duration::from_secs(5)))
        .expect("timeout");
    let source = PoseSource::manual(client.local_addr().expect("client address"));
    source
        .send_control(&wxr_runtime::ControlMessage::default())
        .expect("send control");

    let mut buf = [0u8; 128];
    let (len, _) = client.recv_from(&mut buf).expect("control datagram");
    assert_eq!(
        std::str::from_utf8(&buf[..len]).unwrap(),
        "0 0 1 1 104.500000 104.500000"
    );
}

#[test]
fn test_received_pose_drives_actions_and_spaces() {
    let source = Arc::new(listen());
    send(&source, RECORD);
    assert!(source.wait_first(Some(Duration::from_secs(5))).is_some());

    let surface = HeadlessSurface::new(32, 16);
    let factory: SurfaceFactory =
        Box::new(move |_, _| Ok(Box::new(surface.clone()) as Box<dyn PreviewSurface>));
    let config = RuntimeConfig {
        frame_rate: 1000.0,
        pose_wait_timeout_ms: Some(2000),
        ..RuntimeConfig::default()
    };
    let mut rt = Runtime::new(config, source, factory);
    let instance = rt.create_instance::<&str>("input", &[], &[]).expect("instance");
    let session = rt
        .create_session(instance, 1, Some(GraphicsBinding::D3D11 { device: 1 }))
        .expect("session");
    rt.begin_session(session, 2).expect("begin");

    let left = rt.string_to_path(instance, "/user/hand/left").unwrap();
    let right = rt.string_to_path(instance, "/user/hand/right").unwrap();
    assert_eq!(rt.path_to_string(instance, right).unwrap(), "/user/hand/right");

    let set = rt.create_action_set(instance, "gameplay", 0).unwrap();
    let fire = rt.create_action(set, "fire_weapon", 1, &[left, right]).unwrap();
    let aim = rt.create_action(set, "aim_pose", 4, &[left, right]).unwrap();
    rt.attach_action_sets(session, &[set]).unwrap();

    rt.wait_frame(session).expect("wait frame");
    rt.sync_actions(session, &[set]).unwrap();
    assert_eq!(rt.current_pose().frame_id, 42);

    assert!(rt.action_state_boolean(session, fire, right).unwrap().current);
    assert!(!rt.action_state_boolean(session, fire, left).unwrap().current);
    assert!(rt.action_state_pose(session, aim).unwrap());

    let stage = rt.create_reference_space(session, 3).unwrap();
    let grip = rt.create_action_space(session, aim, left).unwrap();
    let located = rt.locate_space(grip, stage).unwrap();
    assert_eq!(located.flags, LocationFlags::TRACKED);
    assert!((located.pose.position.x + 0.2).abs() < 1e-6);

    let views = rt.locate_views(session, 2).unwrap();
    assert!((views[0].pose.position.x + 0.032).abs() < 1e-6);
    assert!((views[1].pose.position.y - 1.7).abs() < 1e-6);
}

#[test]
fn test_pose_timeout_falls_back_to_identity() {
    let source = Arc::new(PoseSource::manual("127.0.0.1:9".parse().unwrap()));
    let config = RuntimeConfig {
        frame_rate: 1000.0,
        pose_wait_timeout_ms: Some(10),
        ..RuntimeConfig::default()
    };
    let factory: SurfaceFactory = Box::new(|w, h| {
        Ok(Box::new(HeadlessSurface::new(w, h)) as Box<dyn PreviewSurface>)
    });
    let mut rt = Runtime::new(config, source, factory);
    let instance = rt.create_instance::<&str>("timeout", &[], &[]).unwrap();
    let session = rt
        .create_session(instance, 1, Some(GraphicsBinding::D3D11 { device: 1 }))
        .unwrap();
    let state = rt.wait_frame(session).expect("wait frame");
    assert!(state.should_render);
    assert_eq!(rt.current_pose(), &PoseSnapshot::identity());
}

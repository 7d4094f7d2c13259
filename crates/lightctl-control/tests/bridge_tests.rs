use lightctl_control::discovery::{
    DiscoveredPeer, DiscoveryEvent, NullRegistry, ServiceHandle, ServiceRegistry,
};
use lightctl_control::dmx::{DmxFrame, DmxOutput};
use lightctl_control::osc::{parse_osc_address, OscAddress};
use lightctl_control::{
    channel_of, LightControl, LightControlOptions, OscEndpointConfig, Result, DMX_CHANNELS,
};
use rosc::{decoder, encoder, OscBundle, OscMessage, OscPacket, OscTime, OscType};
use std::cell::RefCell;
use std::net::UdpSocket;
use std::rc::Rc;
use std::time::{Duration, Instant};

#[derive(Default)]
struct MockOutput {
    devices: Vec<String>,
    connected: Option<String>,
    frame: DmxFrame,
}

impl DmxOutput for MockOutput {
    fn list_devices(&self) -> Vec<String> {
        self.devices.clone()
    }

    fn connect(&mut self, device: &str) -> Result<()> {
        self.connected = Some(device.to_string());
        Ok(())
    }

    fn disconnect(&mut self) {
        self.connected = None;
    }

    fn is_connected(&self) -> bool {
        self.connected.is_some()
    }

    fn connected_device(&self) -> Option<String> {
        self.connected.clone()
    }

    fn reset_frame(&mut self) {
        self.frame.reset();
    }

    fn set_channel(&mut self, channel: u16, value: u8) {
        self.frame.set(channel, value);
    }

    fn channel(&self, channel: u16) -> u8 {
        self.frame.get(channel)
    }

    fn commit_frame(&mut self) -> Result<()> {
        Ok(())
    }

    fn frame(&self) -> &[u8; DMX_CHANNELS] {
        self.frame.data()
    }
}

#[derive(Default)]
struct RegistryLog {
    registered: Vec<u16>,
    unregistered: usize,
    events: Vec<DiscoveryEvent>,
    shut_down: bool,
}

struct SharedRegistry(Rc<RefCell<RegistryLog>>);

impl ServiceRegistry for SharedRegistry {
    fn register(&mut self, name: &str, port: u16) -> Result<ServiceHandle> {
        self.0.borrow_mut().registered.push(port);
        Ok(ServiceHandle(name.to_string()))
    }

    fn unregister(&mut self, _handle: &ServiceHandle) -> Result<()> {
        self.0.borrow_mut().unregistered += 1;
        Ok(())
    }

    fn browse(&mut self) -> Result<()> {
        Ok(())
    }

    fn resolve(&mut self, _name: &str) -> Result<()> {
        Ok(())
    }

    fn poll_events(&mut self) -> Vec<DiscoveryEvent> {
        std::mem::take(&mut self.0.borrow_mut().events)
    }

    fn shutdown(&mut self) {
        self.0.borrow_mut().shut_down = true;
    }
}

/// A fake touch panel on loopback
struct Controller {
    socket: UdpSocket,
}

impl Controller {
    fn new() -> Self {
        let socket = UdpSocket::bind("127.0.0.1:0").unwrap();
        socket
            .set_read_timeout(Some(Duration::from_secs(2)))
            .unwrap();
        Self { socket }
    }

    fn port(&self) -> u16 {
        self.socket.local_addr().unwrap().port()
    }

    fn send(&self, control: &LightControl, packet: OscPacket) {
        let port = control.link().receive_addr().unwrap().port();
        let buf = encoder::encode(&packet).unwrap();
        self.socket.send_to(&buf, ("127.0.0.1", port)).unwrap();
    }

    fn send_float(&self, control: &LightControl, addr: &str, value: f32) {
        self.send(control, message(addr, value));
    }

    fn recv(&self) -> OscPacket {
        let mut buf = [0u8; decoder::MTU];
        let (size, _) = self.socket.recv_from(&mut buf).unwrap();
        decoder::decode_udp(&buf[..size]).unwrap().1
    }

    fn recv_snapshot(&self) -> Vec<OscMessage> {
        let mut messages = Vec::new();
        for _ in 0..2 {
            match self.recv() {
                OscPacket::Bundle(bundle) => {
                    for packet in bundle.content {
                        if let OscPacket::Message(msg) = packet {
                            messages.push(msg);
                        }
                    }
                }
                other => panic!("Expected snapshot bundle, got {:?}", other),
            }
        }
        messages
    }

    fn assert_silent(&self) {
        self.socket
            .set_read_timeout(Some(Duration::from_millis(100)))
            .unwrap();
        let mut buf = [0u8; decoder::MTU];
        assert!(self.socket.recv_from(&mut buf).is_err());
        self.socket
            .set_read_timeout(Some(Duration::from_secs(2)))
            .unwrap();
    }
}

fn message(addr: &str, value: f32) -> OscPacket {
    OscPacket::Message(OscMessage {
        addr: addr.to_string(),
        args: vec![OscType::Float(value)],
    })
}

fn options(send_port: u16) -> LightControlOptions {
    LightControlOptions {
        osc: OscEndpointConfig {
            receive_port: 0,
            send_port,
            unicast: true,
            send_address: "127.0.0.1".to_string(),
            local_port: 0,
        },
        browse_peers: true,
        peer_marker: "TouchOSC".to_string(),
    }
}

fn control_for(controller: &Controller) -> LightControl {
    LightControl::new(
        options(controller.port()),
        Box::new(MockOutput::default()),
        Box::new(NullRegistry),
    )
}

fn tick_until(control: &mut LightControl, mut done: impl FnMut(&LightControl) -> bool) {
    let deadline = Instant::now() + Duration::from_secs(2);
    loop {
        control.update();
        if done(control) {
            return;
        }
        assert!(Instant::now() < deadline, "condition not reached in time");
        std::thread::sleep(Duration::from_millis(5));
    }
}

#[test]
fn test_startup_sends_snapshot() {
    let controller = Controller::new();
    let control = control_for(&controller);

    let messages = controller.recv_snapshot();
    assert_eq!(messages.len(), 84);
    assert!(messages
        .iter()
        .all(|m| m.args == vec![OscType::Float(0.0)]));
    assert!(control.link().is_listening());
}

#[test]
fn test_volume_sets_store_and_echoes_once() {
    let controller = Controller::new();
    let mut control = control_for(&controller);
    controller.recv_snapshot();

    controller.send_float(&control, "/volume", 0.5);
    tick_until(&mut control, |c| c.store().volume() == 0.5);

    match controller.recv() {
        OscPacket::Message(msg) => {
            assert_eq!(msg.addr, "/volume");
            assert_eq!(msg.args, vec![OscType::Float(0.5)]);
        }
        other => panic!("Expected /volume echo, got {:?}", other),
    }
    controller.assert_silent();
}

#[test]
fn test_fader_scaled_by_volume_reaches_output() {
    let controller = Controller::new();
    let mut control = control_for(&controller);

    controller.send_float(&control, "/1/faders/1/1", 200.0);
    controller.send_float(&control, "/volume", 0.5);
    tick_until(&mut control, |c| c.output().channel(1) == 100);

    assert_eq!(control.store().channel(1), Some(200));
}

#[test]
fn test_ignored_addresses_leave_store_untouched() {
    let controller = Controller::new();
    let mut control = control_for(&controller);

    controller.send_float(&control, "/1/knobs/2/3", 50.0);
    controller.send_float(&control, "/a/faders/b/c", 50.0);
    controller.send(
        &control,
        OscPacket::Message(OscMessage {
            addr: "/1/faders/2/3".to_string(),
            args: vec![OscType::String("fifty".to_string())],
        }),
    );
    // Marker message so we know the earlier ones were processed
    controller.send_float(&control, "/volume", 1.0);
    tick_until(&mut control, |c| c.store().volume() == 1.0);

    assert!(control.store().channels().iter().all(|&v| v == 0));
}

#[test]
fn test_snapshot_addresses_round_trip_to_channels() {
    let controller = Controller::new();
    let mut control = control_for(&controller);
    controller.recv_snapshot();

    for page in 1..=2u16 {
        let content = (1..=6u16)
            .flat_map(|column| (1..=7u16).map(move |row| (column, row)))
            .map(|(column, row)| {
                let channel = channel_of(page, column, row);
                message(
                    &format!("/{}/faders/{}/{}", page, column, row),
                    channel as f32,
                )
            })
            .collect();
        controller.send(
            &control,
            OscPacket::Bundle(OscBundle {
                timetag: OscTime {
                    seconds: 0,
                    fractional: 1,
                },
                content,
            }),
        );
    }
    tick_until(&mut control, |c| {
        c.store().channel(1) == Some(1) && c.store().channel(84) == Some(84)
    });

    let config = control.config().clone();
    control.reconfigure(config).unwrap();

    let messages = controller.recv_snapshot();
    assert_eq!(messages.len(), 84);
    for msg in messages {
        let segments: Vec<&str> = msg.addr.trim_start_matches('/').split('/').collect();
        assert_eq!(segments.len(), 3);
        let inbound = format!("/{}/faders/{}/{}", segments[0], segments[1], segments[2]);

        let OscAddress::Fader(position) = parse_osc_address(&inbound).unwrap() else {
            panic!("{} did not parse as a fader", inbound);
        };
        assert_eq!(msg.args, vec![OscType::Float(position.channel() as f32)]);
    }
}

#[test]
fn test_reconfigure_keeps_only_latest_receiver() {
    let controller = Controller::new();
    let mut control = control_for(&controller);
    let first = control.link().receive_addr().unwrap().port();

    let probe = UdpSocket::bind("0.0.0.0:0").unwrap();
    let second = probe.local_addr().unwrap().port();
    drop(probe);

    control.set_receive_port(second).unwrap();
    assert_eq!(control.link().receive_addr().unwrap().port(), second);

    let buf = encoder::encode(&message("/1/faders/1/1", 100.0)).unwrap();
    controller.socket.send_to(&buf, ("127.0.0.1", first)).unwrap();
    controller.send_float(&control, "/1/faders/2/1", 50.0);

    tick_until(&mut control, |c| c.store().channel(2) == Some(50));
    assert_eq!(control.store().channel(1), Some(0));
}

#[test]
fn test_same_receive_port_retries_failed_bind() {
    let controller = Controller::new();
    let mut control = control_for(&controller);

    let blocker = UdpSocket::bind("0.0.0.0:0").unwrap();
    let busy = blocker.local_addr().unwrap().port();

    control.set_receive_port(busy).unwrap();
    assert!(!control.link().is_listening());
    assert!(control.link().can_send());

    drop(blocker);
    control.set_receive_port(busy).unwrap();
    assert_eq!(control.link().receive_addr().unwrap().port(), busy);
}

#[test]
fn test_invalid_send_address_keeps_running_config() {
    let controller = Controller::new();
    let mut control = control_for(&controller);
    let before = control.config().clone();

    assert!(control.set_send_address("999.1.1.1").is_err());
    assert!(control.set_send_address("lighting-desk").is_err());

    assert_eq!(control.config(), &before);
    assert!(control.link().can_send());
}

#[test]
fn test_sender_address_is_tracked_without_rebuild() {
    let controller = Controller::new();
    let mut control = LightControl::new(
        LightControlOptions {
            osc: OscEndpointConfig {
                send_address: "10.9.9.9".to_string(),
                ..options(controller.port()).osc
            },
            ..options(controller.port())
        },
        Box::new(MockOutput::default()),
        Box::new(NullRegistry),
    );
    let target_before = control.link().send_target();

    controller.send_float(&control, "/volume", 0.25);
    tick_until(&mut control, |c| c.store().volume() == 0.25);

    assert_eq!(control.config().send_address, "127.0.0.1");
    assert_eq!(control.link().send_target(), target_before);
}

#[test]
fn test_advertises_and_adopts_discovered_port() {
    let controller = Controller::new();
    let log = Rc::new(RefCell::new(RegistryLog::default()));
    let mut control = LightControl::new(
        options(9),
        Box::new(MockOutput::default()),
        Box::new(SharedRegistry(log.clone())),
    );
    assert_eq!(log.borrow().registered, vec![0]);

    log.borrow_mut().events = vec![DiscoveryEvent::Resolved(DiscoveredPeer {
        name: "TouchOSC on tablet".to_string(),
        host: "tablet.local.".to_string(),
        port: controller.port(),
    })];
    control.update();

    assert_eq!(control.config().send_port, controller.port());
    assert_eq!(
        control.link().send_target().map(|t| t.port()),
        Some(controller.port())
    );
    assert_eq!(log.borrow().registered.len(), 2);
    assert_eq!(log.borrow().unregistered, 1);
    controller.recv_snapshot();
}

#[test]
fn test_auto_connects_single_device() {
    let controller = Controller::new();
    let mut control = LightControl::new(
        options(controller.port()),
        Box::new(MockOutput {
            devices: vec!["Enttec".to_string()],
            ..Default::default()
        }),
        Box::new(NullRegistry),
    );

    control.update();
    assert_eq!(control.output().connected_device(), Some("Enttec".to_string()));

    control.disconnect_device();
    control.update();
    assert!(!control.output().is_connected());
}

#[test]
fn test_explicit_connect_disarms_auto_connect() {
    let controller = Controller::new();
    let mut control = LightControl::new(
        options(controller.port()),
        Box::new(MockOutput {
            devices: vec!["Enttec".to_string()],
            ..Default::default()
        }),
        Box::new(NullRegistry),
    );

    control.connect_device("Enttec").unwrap();
    control.disconnect_device();
    control.update();

    assert!(!control.output().is_connected());
}

#[test]
fn test_shutdown_releases_everything() {
    let controller = Controller::new();
    let log = Rc::new(RefCell::new(RegistryLog::default()));
    let mut control = LightControl::new(
        options(controller.port()),
        Box::new(MockOutput {
            devices: vec!["Enttec".to_string()],
            ..Default::default()
        }),
        Box::new(SharedRegistry(log.clone())),
    );
    control.update();

    control.shutdown();

    assert!(!control.link().is_listening());
    assert!(!control.link().can_send());
    assert!(!control.output().is_connected());
    assert!(log.borrow().shut_down);
    assert_eq!(log.borrow().unregistered, 1);
}

use std::env;
use std::thread;
use std::time::{Duration, Instant};

use dotenvy::dotenv;
use libmqtt::network::application::mqtt::{Client, ClientConfig, Error, Mode, Options, QoS};
use libmqtt::network::std::{MonotonicClock, TcpTransport};

use super::mock::{Recorder, options};

type LiveClient<'b> = Client<'b, Recorder, 512>;

fn broker_address() -> String {
    dotenv().ok();
    env::var("TEST_MQTT_ADDRESS").unwrap_or("test.mosquitto.org:1883".to_string())
}

/// Drive the client until `done` holds, failing after five seconds.
fn run_until(
    client: &mut LiveClient<'_>,
    transport: &mut TcpTransport,
    clock: &MonotonicClock,
    done: impl Fn(&LiveClient<'_>) -> bool,
) -> Result<(), Error> {
    let deadline = Instant::now() + Duration::from_secs(5);
    while Instant::now() < deadline {
        transport.poll().expect("transport failed");
        let (rx, tx) = transport.split();
        client.sync(rx, tx, clock)?;
        if done(client) {
            return Ok(());
        }
        thread::sleep(Duration::from_millis(10));
    }
    panic!("broker did not answer in time");
}

#[test]
#[ignore = "needs a reachable MQTT broker"]
fn connect_subscribe_and_receive_own_publish() {
    let mut transport = TcpTransport::connect(broker_address()).expect("Failed to connect to broker");
    let clock = MonotonicClock::new();
    let mut buffer = [0u8; 1024];
    let mut client: LiveClient<'_> =
        Client::new(&mut buffer, Mode::Generic, Recorder::default(), &ClientConfig::default());

    let client_id = format!("libmqtt-test-{}", std::process::id());
    let topic = format!("libmqtt/test/{}", std::process::id());
    client
        .connect(&Options {
            client_id: &client_id,
            ..options(10)
        })
        .unwrap();
    run_until(&mut client, &mut transport, &clock, |c| c.connack_received()).unwrap();

    client.subscribe(&topic, QoS::AtMostOnce).unwrap();
    run_until(&mut client, &mut transport, &clock, |c| c.suback_received()).unwrap();
    client.mark_startup_complete();

    client.publish(&topic, b"hello world", false).unwrap();
    run_until(&mut client, &mut transport, &clock, |c| !c.handler().messages.is_empty()).unwrap();

    let received = &client.handler().messages[0];
    assert_eq!(received.topic, topic.as_bytes());
    assert_eq!(received.payload, b"hello world");
}

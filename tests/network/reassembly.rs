use super::mock::*;
use libmqtt::network::application::mqtt::reassembler::{Mode, Progress, Reassembler};
use libmqtt::network::application::mqtt::{Client, ClientConfig};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Feed `segments` in order and collect every staged message.
fn reassemble<const P: usize>(reassembler: &mut Reassembler<P>, segments: &[&[u8]]) -> Vec<Vec<u8>> {
    let mut staged = Vec::new();
    for segment in segments {
        let mut input = *segment;
        while !input.is_empty() {
            let (consumed, progress) = reassembler.advance(input).unwrap();
            input = &input[consumed..];
            if progress == Progress::Staged {
                staged.push(reassembler.staged().unwrap().to_vec());
                reassembler.reset();
            }
        }
    }
    staged
}

/// Cut `stream` at random offsets, including zero-length cuts.
fn random_split<'s>(rng: &mut StdRng, stream: &'s [u8]) -> Vec<&'s [u8]> {
    let mut segments = Vec::new();
    let mut rest = stream;
    while !rest.is_empty() {
        let len = rng.gen_range(0..=rest.len().min(40));
        let (head, tail) = rest.split_at(len);
        segments.push(head);
        rest = tail;
    }
    segments
}

fn broker_traffic(rng: &mut StdRng) -> Vec<Vec<u8>> {
    (0..rng.gen_range(1..12))
        .map(|i| match rng.gen_range(0..4) {
            0 => CONNACK_ACCEPTED.to_vec(),
            1 => suback(rng.gen_range(1..=u16::MAX), 0x00).to_vec(),
            2 => PINGRESP.to_vec(),
            _ => {
                let payload = vec![b'a' + (i as u8 % 26); rng.gen_range(0..180)];
                publish_bytes("sensors/kitchen", &payload)
            }
        })
        .collect()
}

#[test]
fn any_segmentation_yields_the_same_messages() {
    let mut rng = StdRng::seed_from_u64(0x4D51_5454);
    for _ in 0..300 {
        let messages = broker_traffic(&mut rng);
        let stream = messages.concat();
        let segments = random_split(&mut rng, &stream);

        let mut reassembler: Reassembler<256> = Reassembler::new(Mode::Generic, 0);
        assert_eq!(reassemble(&mut reassembler, &segments), messages);
    }
}

#[test]
fn filtering_result_does_not_depend_on_segmentation() {
    let mut rng = StdRng::seed_from_u64(7);
    let update = publish_bytes("domoticz/out", DOMOTICZ_UPDATE);
    let mut stream = update.clone();
    stream.extend(suback(0x0102, 0x00));

    for _ in 0..200 {
        let segments = random_split(&mut rng, &stream);
        let mut reassembler: Reassembler<16> = Reassembler::new(Mode::Filtering, 59);
        let mut staged = Vec::new();
        for segment in &segments {
            let mut input = *segment;
            while !input.is_empty() {
                let (consumed, progress) = reassembler.advance(input).unwrap();
                input = &input[consumed..];
                if progress == Progress::Staged {
                    let fields = reassembler.fields().map(|f| (f.idx.clone(), f.nvalue.clone()));
                    staged.push((reassembler.staged().unwrap().to_vec(), fields));
                    reassembler.reset();
                }
            }
        }

        assert_eq!(staged.len(), 2);
        assert_eq!(staged[0].0, [0x30, 0x04, 0x00, 0x01, b'd', b'}']);
        let (idx, nvalue) = staged[0].1.clone().unwrap();
        assert_eq!(idx.as_str(), "42");
        assert_eq!(nvalue.as_str(), "1");
        assert_eq!(staged[1], (suback(0x0102, 0x00).to_vec(), None));
    }
}

#[test]
fn client_dispatch_does_not_depend_on_segmentation() {
    let mut rng = StdRng::seed_from_u64(0xC11E);
    let payloads: Vec<Vec<u8>> = (0..20u8).map(|i| vec![i; usize::from(i) * 9]).collect();
    let stream: Vec<u8> = payloads
        .iter()
        .flat_map(|payload| publish_bytes("cmd/relay", payload))
        .collect();

    for _ in 0..50 {
        let mut buffer = [0u8; 256];
        let mut client: Client<'_, Recorder, 256> =
            Client::new(&mut buffer, Mode::Generic, Recorder::default(), &ClientConfig::default());
        let mut link = MockLink::new();
        client.connect(&options(0)).unwrap();
        link.sync(&mut client, 0).unwrap();
        link.deliver(&CONNACK_ACCEPTED);
        link.sync(&mut client, 0).unwrap();

        for segment in random_split(&mut rng, &stream) {
            link.deliver(segment);
            link.sync(&mut client, 1).unwrap();
        }

        let received: Vec<_> = client.handler().messages.iter().map(|m| m.payload.clone()).collect();
        assert_eq!(received, payloads);
    }
}

use std::cell::RefCell;
use std::collections::HashMap;
use std::io::{self, Read, Write};
use std::rc::Rc;

use bytes::BytesMut;
use probelink::frame::{
    decode_request, encode_response, FrameError, Operation, Request, Response, Width,
};
use probelink::metadata::{FireFlyMetadata, Metadata, MetadataRecord, BLOCK_SIZE, NUM_PAGES, V12};
use probelink::transport::{Connector, StreamTransport, Transport, TransportConfig, TransportError};
use probelink::{Channel, DeviceError, PowerSupply, PowerSupplyModel, METADATA_COMMAND};

/// EEPROM contents and traffic log shared between a test and its simulated device.
#[derive(Default)]
struct Bench {
    eeproms: HashMap<u8, Vec<u8>>,
    requests: Vec<Request>,
    opens: usize,
    /// The device stops accepting bytes, as after a cable pull.
    hung_up: bool,
}

/// A power supply that answers metadata frames from its EEPROM map.
/// Channels without an EEPROM answer NAK.
struct SimulatedDevice {
    bench: Rc<RefCell<Bench>>,
    inbox: Vec<u8>,
    outbox: Vec<u8>,
}

impl SimulatedDevice {
    fn answer(&mut self, request: Request) {
        let mut bench = self.bench.borrow_mut();
        let response = match bench.eeproms.get_mut(&request.address) {
            Some(eeprom) if request.command == METADATA_COMMAND => match request.operation {
                Operation::Read => Response::ack(request.address, eeprom.clone()),
                Operation::Write => {
                    let offset = usize::from(request.payload[0]);
                    let data = &request.payload[1..];
                    eeprom[offset..offset + data.len()].copy_from_slice(data);
                    Response::ack(request.address, request.payload.clone())
                }
            },
            _ => Response::nak(request.address),
        };
        bench.requests.push(request);

        let mut buf = BytesMut::new();
        encode_response(&response, &mut buf).unwrap();
        self.outbox.extend_from_slice(&buf);
    }
}

impl Write for SimulatedDevice {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if self.bench.borrow().hung_up {
            return Ok(0);
        }
        self.inbox.extend_from_slice(buf);
        if let Ok(request) = decode_request(&self.inbox) {
            self.inbox.clear();
            self.answer(request);
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Read for SimulatedDevice {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.outbox.is_empty() {
            return Err(io::Error::new(io::ErrorKind::TimedOut, "no reply"));
        }
        // Hand replies out in small fragments like a real serial bridge.
        let n = buf.len().min(self.outbox.len()).min(37);
        buf[..n].copy_from_slice(&self.outbox[..n]);
        self.outbox.drain(..n);
        Ok(n)
    }
}

struct BenchConnector(Rc<RefCell<Bench>>);

impl Connector for BenchConnector {
    type Stream = SimulatedDevice;

    fn connect(
        &mut self,
        _config: &TransportConfig,
    ) -> probelink::transport::Result<SimulatedDevice> {
        self.0.borrow_mut().opens += 1;
        Ok(SimulatedDevice {
            bench: Rc::clone(&self.0),
            inbox: Vec::new(),
            outbox: Vec::new(),
        })
    }

    fn endpoint(&self) -> String {
        "bench".to_string()
    }
}

fn bench_supply(
    channels: &[u8],
) -> (PowerSupply<StreamTransport<BenchConnector>>, Rc<RefCell<Bench>>) {
    let bench = Rc::new(RefCell::new(Bench::default()));
    for &channel in channels {
        bench
            .borrow_mut()
            .eeproms
            .insert(channel, vec![0xFF; BLOCK_SIZE]);
    }
    let transport = StreamTransport::new(BenchConnector(Rc::clone(&bench)));
    (PowerSupply::new(transport), bench)
}

fn bumblebee() -> Metadata {
    Metadata::new()
        .eeprom_layout_revision("1.2")
        .serial_number("0624100")
        .manufacturer("http://www.pmk.de")
        .model("BumbleBee2kV")
        .description("High voltage probe system")
        .calibration_instance("PMK")
        .hardware_revision("M7.2 K5.0")
        .software_revision("M1.0 K0.0")
        .uuid("886-102-504")
}

#[test]
fn metadata_written_page_by_page_reads_back() {
    let (mut ps, bench) = bench_supply(&[1]);
    let record = bumblebee();

    ps.write_metadata(Channel::Ch1, &record).unwrap();
    let read = ps.read_metadata(Channel::Ch1).unwrap();
    assert_eq!(read, record);
    assert_eq!(read.probe_model(), Some("BumbleBee2kV"));

    let bench = bench.borrow();
    assert_eq!(bench.requests.len(), NUM_PAGES + 1);
    for (index, request) in bench.requests[..NUM_PAGES].iter().enumerate() {
        assert_eq!(request.operation, Operation::Write);
        assert_eq!(request.width, Width::Byte);
        assert_eq!(request.address, 1);
        assert_eq!(request.payload.len(), 17);
        assert_eq!(usize::from(request.payload[0]), index * 16);
    }
    let last = &bench.requests[NUM_PAGES];
    assert_eq!(*last, Request::read(1, METADATA_COMMAND, Width::Word));
    assert_eq!(bench.eeproms[&1], record.to_bytes().unwrap().to_vec());
}

#[test]
fn link_opens_lazily_once() {
    let (mut ps, bench) = bench_supply(&[0]);
    assert_eq!(bench.borrow().opens, 0);

    ps.read_metadata(Channel::PsCh).unwrap();
    ps.read_metadata(Channel::PsCh).unwrap();
    assert_eq!(bench.borrow().opens, 1);

    ps.close().unwrap();
    assert!(!ps.transport().is_open());
    ps.read_metadata_block(Channel::PsCh).unwrap();
    assert_eq!(bench.borrow().opens, 2);
}

#[test]
fn broken_link_stays_down_until_reopened() {
    let (mut ps, bench) = bench_supply(&[0]);
    ps.open().unwrap();
    assert!(ps.transport().is_open());
    assert_eq!(bench.borrow().opens, 1);

    bench.borrow_mut().hung_up = true;
    let err = ps.read_metadata(Channel::PsCh).unwrap_err();
    assert!(matches!(
        err,
        DeviceError::Frame(FrameError::Transport(TransportError::Broken { .. }))
    ));

    bench.borrow_mut().hung_up = false;
    let err = ps.read_metadata(Channel::PsCh).unwrap_err();
    assert!(matches!(
        err,
        DeviceError::Frame(FrameError::Transport(TransportError::NotOpen { .. }))
    ));
    assert_eq!(bench.borrow().opens, 1);

    ps.open().unwrap();
    ps.read_metadata(Channel::PsCh).unwrap();
    assert_eq!(bench.borrow().opens, 2);
}

#[test]
fn blank_eeprom_reads_as_empty_record() {
    let (mut ps, _bench) = bench_supply(&[2]);
    let record = ps.read_metadata(Channel::Ch2).unwrap();
    assert_eq!(record, Metadata::default());
}

#[test]
fn empty_socket_answers_nak() {
    let (mut ps, bench) = bench_supply(&[0]);
    let err = ps.read_metadata(Channel::Ch3).unwrap_err();
    assert!(matches!(
        err,
        DeviceError::Frame(FrameError::Nak { address: 3 })
    ));

    // The link survives a NAK.
    ps.read_metadata(Channel::PsCh).unwrap();
    assert_eq!(bench.borrow().opens, 1);
}

#[test]
fn model_rejects_missing_channel_before_io() {
    let (ps, bench) = bench_supply(&[3]);
    let mut ps = ps.with_model(PowerSupplyModel::Ps02);

    let err = ps.read_metadata(Channel::Ch3).unwrap_err();
    assert!(matches!(
        err,
        DeviceError::ChannelUnavailable {
            channel: Channel::Ch3,
            model: PowerSupplyModel::Ps02
        }
    ));
    assert!(bench.borrow().requests.is_empty());
    assert_eq!(bench.borrow().opens, 0);
}

#[test]
fn firefly_block_decodes_through_address_map() {
    let (mut ps, bench) = bench_supply(&[4]);
    {
        let mut bench = bench.borrow_mut();
        let eeprom = bench.eeproms.get_mut(&4).unwrap();
        let fields: [&[u8]; 4] = [b"1.2", b"0124001", b"http://www.pmk.de", b"FireFly"];
        for (index, text) in fields.iter().enumerate() {
            let (offset, _) = V12.fields[index];
            eeprom[offset..offset + text.len()].copy_from_slice(text);
        }
        let (offset, _) = V12.fields[10];
        eeprom[offset..offset + 11].copy_from_slice(b"886-102-505");
        let (offset, _) = V12.fields[11];
        eeprom[offset..offset + 4].copy_from_slice(&3.25f32.to_le_bytes());
    }

    let record: FireFlyMetadata = ps.read_firefly_metadata(Channel::Ch4).unwrap();
    assert_eq!(record.base.serial_number.as_deref(), Some("0124001"));
    assert_eq!(record.base.probe_model(), Some("FireFly"));
    assert_eq!(record.base.production_date, None);
    assert_eq!(record.propagation_delay, Some(3.25));
}

#[test]
fn unsupported_revision_is_a_metadata_error() {
    let (mut ps, _bench) = bench_supply(&[1]);
    let err = ps.read_firefly_metadata(Channel::Ch1).unwrap_err();
    assert!(matches!(err, DeviceError::Metadata(_)));
}

#[test]
fn oversized_record_is_not_written() {
    let (mut ps, bench) = bench_supply(&[1]);
    let record = bumblebee().description("x".repeat(BLOCK_SIZE));

    assert!(matches!(
        ps.write_metadata(Channel::Ch1, &record),
        Err(DeviceError::Metadata(_))
    ));
    assert!(bench.borrow().requests.is_empty());
    assert!(bench.borrow().eeproms[&1].iter().all(|b| *b == 0xFF));
}

#[test]
fn record_with_multiline_text_is_not_written() {
    let (mut ps, bench) = bench_supply(&[1]);
    let record = bumblebee().model("Line1\nLine2");

    assert!(matches!(
        ps.write_metadata(Channel::Ch1, &record),
        Err(DeviceError::Metadata(_))
    ));
    assert!(bench.borrow().requests.is_empty());
}

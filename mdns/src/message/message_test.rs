use super::parser::Parser;
use super::rdata::{RecordRdata, SrvRdata};
use super::record::RecordParsed;
use super::*;
use std::net::{Ipv4Addr, Ipv6Addr};
use std::time::{Duration, Instant};

const RESPONSE_HEADER: [u8; 4] = [0x00, 0x00, 0x84, 0x00]; // id 0, QR + AA

fn encode_name(name: &str) -> Vec<u8> {
    Name { data: name.to_owned() }.pack(vec![]).unwrap()
}

fn header(questions: u16, answers: u16, authorities: u16, additionals: u16) -> Vec<u8> {
    let mut msg = RESPONSE_HEADER.to_vec();
    for count in [questions, answers, authorities, additionals] {
        msg.extend_from_slice(&count.to_be_bytes());
    }
    msg
}

fn record(name: &[u8], typ: u16, class: u16, ttl: u32, rdata: &[u8]) -> Vec<u8> {
    let mut msg = name.to_vec();
    msg.extend_from_slice(&typ.to_be_bytes());
    msg.extend_from_slice(&class.to_be_bytes());
    msg.extend_from_slice(&ttl.to_be_bytes());
    msg.extend_from_slice(&(rdata.len() as u16).to_be_bytes());
    msg.extend_from_slice(rdata);
    msg
}

#[test]
fn test_build_query_has_no_flags() {
    let query = build_query(DnsType::A, "foo.local").unwrap();

    let mut expected = vec![0, 0, 0, 0, 0, 1, 0, 0, 0, 0, 0, 0];
    expected.extend_from_slice(&[3, b'f', b'o', b'o', 5, b'l', b'o', b'c', b'a', b'l', 0]);
    expected.extend_from_slice(&[0, 1, 0, 1]);
    assert_eq!(&query[..], &expected[..]);
}

#[test]
fn test_build_query_accepts_trailing_dot() {
    let a = build_query(DnsType::Ptr, "_http._tcp.local.").unwrap();
    let b = build_query(DnsType::Ptr, "_http._tcp.local").unwrap();
    assert_eq!(a, b);
}

#[test]
fn test_name_new_validation() {
    assert_eq!(Name::new("").unwrap_err(), Error::ErrEmptyName);
    assert_eq!(Name::new(".").unwrap_err(), Error::ErrEmptyName);
    assert_eq!(Name::new("foo..local").unwrap_err(), Error::ErrZeroSegLen);

    let long_label = "a".repeat(64);
    assert_eq!(
        Name::new(&format!("{long_label}.local")).unwrap_err(),
        Error::ErrSegTooLong
    );

    let label = "a".repeat(63);
    let long_name = [label.as_str(); 4].join(".");
    assert_eq!(Name::new(&long_name).unwrap_err(), Error::ErrNameTooLong);

    assert_eq!(Name::new("foo.local.").unwrap().as_str(), "foo.local");
}

#[test]
fn test_name_unpack_follows_compression_pointer() {
    let mut msg = header(0, 0, 0, 0);
    msg.extend_from_slice(&encode_name("foo.local"));
    let second = msg.len();
    msg.extend_from_slice(&[3, b'b', b'a', b'r', 0xC0, 12]);

    let mut name = Name::default();
    let off = name.unpack(&msg, second).unwrap();
    assert_eq!(name.as_str(), "bar.foo.local");
    assert_eq!(off, msg.len());
}

#[test]
fn test_name_escapes_dots_inside_labels() {
    let mut msg = header(0, 0, 0, 0);
    msg.push(10);
    msg.extend_from_slice(b"My.Printer");
    msg.extend_from_slice(&encode_name("_ipp._tcp.local"));

    let mut name = Name::default();
    name.unpack(&msg, 12).unwrap();
    assert_eq!(name.as_str(), r"My\.Printer._ipp._tcp.local");
    assert_ne!(name.as_str(), "My.Printer._ipp._tcp.local");

    // the escaped form packs back to the same wire labels
    let packed = Name::new(name.as_str()).unwrap().pack(vec![]).unwrap();
    assert_eq!(packed, msg[12..]);

    let mut msg = header(0, 0, 0, 0);
    msg.extend_from_slice(&[2, b'a', b'\\', 5]);
    msg.extend_from_slice(b"local");
    msg.push(0);
    name.unpack(&msg, 12).unwrap();
    assert_eq!(name.as_str(), r"a\\.local");
}

#[test]
fn test_trim_root_keeps_escaped_dot() {
    assert_eq!(super::name::trim_root("foo.local."), "foo.local");
    assert_eq!(super::name::trim_root(r"foo\."), r"foo\.");
    assert_eq!(super::name::trim_root(r"foo\\."), r"foo\\");
    assert_eq!(Name::new(r"My\..local").unwrap().as_str(), r"My\..local");
}

#[test]
fn test_name_unpack_rejects_pointer_loop() {
    let mut msg = header(0, 0, 0, 0);
    msg.extend_from_slice(&[0xC0, 12]);

    let mut name = Name::default();
    assert_eq!(name.unpack(&msg, 12).unwrap_err(), Error::ErrInvalidPtr);
}

#[test]
fn test_name_unpack_rejects_reserved_label() {
    let mut msg = header(0, 0, 0, 0);
    msg.extend_from_slice(&[0x40, 0]);

    let mut name = Name::default();
    assert_eq!(name.unpack(&msg, 12).unwrap_err(), Error::ErrReservedLabel);
}

#[test]
fn test_name_unpack_truncated() {
    let mut msg = header(0, 0, 0, 0);
    msg.extend_from_slice(&[5, b'l', b'o']);

    let mut name = Name::default();
    assert_eq!(name.unpack(&msg, 12).unwrap_err(), Error::ErrCalcLen);
}

#[test]
fn test_parser_skips_questions() {
    let mut msg = header(1, 1, 0, 0);
    msg.extend_from_slice(&encode_name("foo.local"));
    msg.extend_from_slice(&[0, 1, 0, 1]);
    msg.extend_from_slice(&record(&[0xC0, 12], 1, 1, 120, &[10, 0, 0, 1]));

    let now = Instant::now();
    let mut parser = Parser::start_without_query(&msg).unwrap();
    assert!(parser.header().response);
    assert!(parser.header().authoritative);
    assert_eq!(parser.answer_count(), 1);

    let rec = parser.record(now).unwrap();
    assert_eq!(rec.name(), "foo.local");
    assert_eq!(rec.typ(), DnsType::A);
    assert_eq!(rec.rdata(), &RecordRdata::A(Ipv4Addr::new(10, 0, 0, 1)));
    assert_eq!(rec.expiration(), now + Duration::from_secs(120));
    assert_eq!(parser.offset(), msg.len());
}

#[test]
fn test_parser_bad_rdata_advances_cursor() {
    let mut msg = header(0, 2, 0, 0);
    msg.extend_from_slice(&record(&encode_name("foo.local"), 1, 1, 120, &[10, 0, 0]));
    let second = msg.len();
    msg.extend_from_slice(&record(&encode_name("bar.local"), 1, 1, 120, &[10, 0, 0, 2]));

    let now = Instant::now();
    let mut parser = Parser::start_without_query(&msg).unwrap();
    assert_eq!(parser.record(now).unwrap_err(), Error::ErrInvalidRdata(1));
    assert_eq!(parser.offset(), second);

    let rec = parser.record(now).unwrap();
    assert_eq!(rec.name(), "bar.local");
}

#[test]
fn test_parser_bad_header_keeps_cursor() {
    let mut msg = header(0, 1, 0, 0);
    let mut rec = record(&encode_name("foo.local"), 1, 1, 120, &[10, 0, 0, 1]);
    // rdlength claims more bytes than the packet holds
    let len_off = rec.len() - 6;
    rec[len_off] = 0x01;
    msg.extend_from_slice(&rec);

    let mut parser = Parser::start_without_query(&msg).unwrap();
    let before = parser.offset();
    assert_eq!(
        parser.record(Instant::now()).unwrap_err(),
        Error::ErrResourceLen
    );
    assert_eq!(parser.offset(), before);
}

#[test]
fn test_parser_short_header() {
    assert_eq!(
        Parser::start_without_query(&[0, 0, 0x84]).err(),
        Some(Error::ErrBaseLen)
    );
}

#[test]
fn test_rdata_types() {
    let mut msg = header(0, 5, 0, 0);
    msg.extend_from_slice(&encode_name("_http._tcp.local"));
    // Drop the name again; it only seeds the compression target at offset 12.
    let service = msg.split_off(12);
    msg.extend_from_slice(&record(&service, 12, 1, 4500, &{
        let mut rdata = vec![7];
        rdata.extend_from_slice(b"printer");
        rdata.extend_from_slice(&[0xC0, 12]);
        rdata
    }));
    msg.extend_from_slice(&record(
        &encode_name("printer._http._tcp.local"),
        33,
        0x8001,
        120,
        &{
            let mut rdata = vec![0, 0, 0, 0, 0x1F, 0x90];
            rdata.extend_from_slice(&encode_name("printer.local"));
            rdata
        },
    ));
    msg.extend_from_slice(&record(
        &encode_name("printer._http._tcp.local"),
        16,
        1,
        4500,
        &[4, b'p', b'=', b'1', b'2', 0, 3, b'a', b'=', b'b'],
    ));
    msg.extend_from_slice(&record(
        &encode_name("printer.local"),
        28,
        0x8001,
        120,
        &Ipv6Addr::LOCALHOST.octets(),
    ));
    msg.extend_from_slice(&record(&encode_name("printer.local"), 47, 1, 120, &[1, 2, 3]));

    let now = Instant::now();
    let mut parser = Parser::start_without_query(&msg).unwrap();

    let ptr = parser.record(now).unwrap();
    assert_eq!(ptr.name(), "_http._tcp.local");
    assert_eq!(
        ptr.rdata(),
        &RecordRdata::Ptr("printer._http._tcp.local".to_owned())
    );

    let srv = parser.record(now).unwrap();
    assert!(srv.cache_flush());
    assert!(srv.class().is_inet());
    assert_eq!(
        srv.rdata(),
        &RecordRdata::Srv(SrvRdata {
            priority: 0,
            weight: 0,
            port: 8080,
            target: "printer.local".to_owned(),
        })
    );

    let txt = parser.record(now).unwrap();
    assert_eq!(
        txt.rdata(),
        &RecordRdata::Txt(vec!["p=12".to_owned(), String::new(), "a=b".to_owned()])
    );

    let aaaa = parser.record(now).unwrap();
    assert_eq!(aaaa.rdata(), &RecordRdata::Aaaa(Ipv6Addr::LOCALHOST));

    let nsec = parser.record(now).unwrap();
    assert_eq!(nsec.typ(), DnsType::Nsec);
    assert_eq!(nsec.rdata(), &RecordRdata::Unknown(vec![1, 2, 3].into()));
}

#[test]
fn test_record_is_equal_ignores_cache_flush_and_ttl() {
    let now = Instant::now();
    let a = RecordParsed::new(
        "foo.local",
        DnsType::A,
        DnsClass(0x8001),
        120,
        RecordRdata::A(Ipv4Addr::new(10, 0, 0, 1)),
        now,
    );
    let b = RecordParsed::new(
        "foo.local.",
        DnsType::A,
        DNSCLASS_INET,
        60,
        RecordRdata::A(Ipv4Addr::new(10, 0, 0, 1)),
        now,
    );
    assert!(a.is_equal(&b, true));
    assert!(!a.is_equal(&b, false));
}

#[test]
fn test_dns_type_round_trip_unknown() {
    assert_eq!(DnsType::from(47), DnsType::Nsec);
    assert_eq!(DnsType::from(99), DnsType::Unknown(99));
    assert_eq!(u16::from(DnsType::Unknown(99)), 99);
    assert_eq!(DnsType::Srv.to_string(), "SRV");
    assert_eq!(DnsType::Unknown(99).to_string(), "TYPE99");
}

use std::{hint::black_box, io::Cursor};

use criterion::{Criterion, criterion_group, criterion_main};
use oracle_protocol::{
    Command,
    codec::{Scan, vector_len},
    xvc::Message,
};

fn encode_scans(c: &mut Criterion) {
    c.bench_function("instruction scan", |b| {
        b.iter(|| Scan::instruction(black_box(Command::GetStatus.opcode())))
    });
    c.bench_function("idcode data scan", |b| {
        b.iter(|| Scan::data(black_box(0), black_box(32)))
    });
    let scan = Scan::data(0, 32).unwrap();
    let tdo = vec![0xA5; vector_len(scan.num_bits())];
    c.bench_function("capture idcode", |b| b.iter(|| scan.capture(black_box(&tdo))));
}

fn encode_messages(c: &mut Criterion) {
    let scan = Scan::data(0x1392_001d, 32).unwrap();
    let message = Message::Shift {
        num_bits: scan.num_bits(),
        tms: scan.tms().into(),
        tdi: scan.tdi().into(),
    };
    let mut encoded = Vec::new();
    message.write_to(&mut encoded).unwrap();

    c.bench_function("write shift message", |b| {
        b.iter(|| {
            let mut out = Vec::with_capacity(encoded.len());
            black_box(&message).write_to(&mut out).unwrap();
            out
        })
    });
    c.bench_function("read shift message", |b| {
        b.iter(|| Message::from_reader(&mut Cursor::new(black_box(&encoded)), 1024).unwrap())
    });
}

criterion_group!(benches, encode_scans, encode_messages);
criterion_main!(benches);

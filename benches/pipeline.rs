use criterion::{black_box, criterion_group, criterion_main, Criterion};
use isbn_scan::capture::{CameraBackend, MockCamera, StreamRequest};
use isbn_scan::{Frame, FrameConditioner, SymbolDecoder};

fn mock_frame(width: u32, height: u32) -> Frame {
    let mut camera = MockCamera::new()
        .with_resolution(width, height)
        .with_barcode("9780131103627");
    let mut stream = camera
        .open(&StreamRequest::default())
        .expect("mock camera opens");
    let mut frame = Frame::empty();
    stream.grab(&mut frame).expect("mock frame");
    frame
}

fn bench_pipeline(c: &mut Criterion) {
    let frame = mock_frame(1280, 720);
    let conditioner = FrameConditioner::default();

    c.bench_function("condition_1280x720", |b| {
        b.iter(|| conditioner.condition(black_box(&frame)))
    });

    let mut native = SymbolDecoder::native(FrameConditioner::default());
    c.bench_function("decode_native_1280x720", |b| {
        b.iter(|| native.decode(black_box(&frame)))
    });

    let mut software = SymbolDecoder::software();
    c.bench_function("decode_software_1280x720", |b| {
        b.iter(|| software.decode(black_box(&frame)))
    });
}

criterion_group!(benches, bench_pipeline);
criterion_main!(benches);

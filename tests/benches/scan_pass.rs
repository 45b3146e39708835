use criterion::{black_box, criterion_group, criterion_main, Criterion};
use matrix_core::test_utils::MockBoard;
use matrix_core::{default_config, Matrix, RowPin, Tick};

fn scan_pass(c: &mut Criterion) {
    let board = MockBoard::<4, 12>::new();
    board.press(1, 3);
    board.press(2, 7);

    let rows = board.row_pins().map(RowPin::pull_up);
    let mut matrix = Matrix::<_, 4, 12, 32>::new(board.column_pins(), rows, &default_config())
        .expect("valid matrix");
    matrix.init().expect("mock pins");

    let mut now = Tick::ZERO;
    c.bench_function("scan_pass_4x12", |b| {
        b.iter(|| {
            now = now.wrapping_add(1);
            let emitted = matrix.scan(black_box(now)).unwrap_or(0);
            while matrix.events().pop().is_some() {}
            emitted
        })
    });
}

criterion_group!(benches, scan_pass);
criterion_main!(benches);

//! `embedded-hal` pins driving the matrix through `EmbeddedHalPin`

#[cfg(test)]
mod tests {
    use embedded_hal_mock::eh1::pin::{Mock as PinMock, State as PinState, Transaction as PinTransaction};
    use matrix_core::{default_config, Edge, EmbeddedHalPin, GpioPin, Level, Matrix, Pull, RowPin, Tick};

    #[test]
    fn test_single_key_scan_over_embedded_hal() {
        const SCANS: usize = 6;

        // Column: parked high by init, then low/high around every row read
        let mut column_expect = vec![PinTransaction::set(PinState::High)];
        for _ in 0..SCANS {
            column_expect.push(PinTransaction::set(PinState::Low));
            column_expect.push(PinTransaction::set(PinState::High));
        }
        let row_expect = vec![PinTransaction::get(PinState::Low); SCANS];

        let column = PinMock::new(&column_expect);
        let row = PinMock::new(&row_expect);

        let mut matrix = Matrix::<_, 1, 1, 4>::new(
            [EmbeddedHalPin::new(column)],
            [RowPin::pull_up(EmbeddedHalPin::new(row))],
            &default_config(),
        )
        .unwrap();
        matrix.init().unwrap();

        let emitted: usize = (0..SCANS as u16).map(|t| matrix.scan(Tick::from_raw(t)).unwrap()).sum();

        assert_eq!(emitted, 1);
        assert_eq!(matrix.events().pop().map(|e| e.edge), Some(Edge::Pressed));

        let ([column], [row]) = matrix.release();
        column.into_inner().done();
        row.pin.into_inner().done();
    }

    #[test]
    fn test_adapter_maps_levels() {
        let expectations = [
            PinTransaction::get(PinState::High),
            PinTransaction::get(PinState::Low),
            PinTransaction::set(PinState::Low),
        ];
        let mut pin = EmbeddedHalPin::new(PinMock::new(&expectations));

        // Direction is fixed by the HAL type; these touch no hardware
        pin.set_input(Pull::Up).unwrap();
        pin.set_output().unwrap();

        assert_eq!(pin.read(), Ok(Level::High));
        assert_eq!(pin.read(), Ok(Level::Low));
        pin.drive(Level::Low).unwrap();

        pin.into_inner().done();
    }
}

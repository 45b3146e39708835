//! Debounce properties over arbitrary start ticks and bounce patterns

#[cfg(test)]
mod tests {
    use matrix_core::{DebounceState, Edge, KeyCell, Tick};
    use proptest::prelude::*;

    const DEBOUNCE: u16 = 5;

    /// Feed one reading per tick starting at `start`; returns (offset, edge)
    fn run(cell: &mut KeyCell, start: u16, readings: &[bool]) -> Vec<(u16, Edge)> {
        let start = Tick::from_raw(start);
        readings
            .iter()
            .enumerate()
            .filter_map(|(offset, &raw)| {
                let offset = offset as u16;
                cell.update(raw, start.wrapping_add(offset), DEBOUNCE).map(|edge| (offset, edge))
            })
            .collect()
    }

    /// Raw readings alternating every `runs[i]` ticks, starting pressed
    fn chatter(runs: &[u16]) -> Vec<bool> {
        runs.iter()
            .enumerate()
            .flat_map(|(i, &len)| std::iter::repeat(i % 2 == 0).take(len as usize))
            .collect()
    }

    proptest! {
        #[test]
        fn prop_elapsed_survives_wrap(start in any::<u16>(), delta in any::<u16>()) {
            let before = Tick::from_raw(start);
            prop_assert_eq!(before.wrapping_add(delta).elapsed_since(before), delta);
        }

        #[test]
        fn prop_chatter_shorter_than_debounce_is_silent(
            start in any::<u16>(),
            runs in prop::collection::vec(1..DEBOUNCE, 1..40),
        ) {
            let mut cell = KeyCell::new();
            prop_assert!(run(&mut cell, start, &chatter(&runs)).is_empty());
            prop_assert!(!cell.is_pressed());
        }

        #[test]
        fn prop_held_press_reported_once(start in any::<u16>(), hold in DEBOUNCE..300) {
            let mut cell = KeyCell::new();
            let readings = vec![true; hold as usize + 1];

            prop_assert_eq!(run(&mut cell, start, &readings), vec![(DEBOUNCE, Edge::Pressed)]);
            prop_assert_eq!(cell.state(), DebounceState::Pressed);
        }

        #[test]
        fn prop_held_release_reported_once(
            start in any::<u16>(),
            bounce in prop::collection::vec(1..DEBOUNCE, 0..10),
            hold in DEBOUNCE..300,
        ) {
            let mut cell = KeyCell::new();
            run(&mut cell, start, &[true; DEBOUNCE as usize + 1]);
            prop_assert!(cell.is_pressed());

            // Release bounces first (released, pressed, ...) then stays released
            let mut readings: Vec<bool> = chatter(&bounce).into_iter().map(|raw| !raw).collect();
            if readings.last() == Some(&false) {
                readings.push(true);
            }
            let settle_from = readings.len() as u16;
            readings.extend(std::iter::repeat(false).take(hold as usize + 1));

            let resume = start.wrapping_add(DEBOUNCE + 1);
            prop_assert_eq!(
                run(&mut cell, resume, &readings),
                vec![(settle_from + DEBOUNCE, Edge::Released)]
            );
            prop_assert_eq!(cell.state(), DebounceState::Idle);
        }
    }
}

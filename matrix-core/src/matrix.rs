//! Column-driven matrix scanner feeding the per-key debounce
//!
//! Each pass drives one column to the active level, reads every row, then
//! returns the column to idle before moving on. Rows are read through the
//! GPIO collaborator and mapped to pressed/released by their wiring.

use crate::debounce::KeyCell;
use crate::hal::{GpioPin, Level, RowWiring};
use crate::queue::EventQueue;
use crate::types::{ConfigError, KeyboardConfig, Tick, TransitionEvent};

/// Rows and columns are reported as `u8` indices
pub const MAX_LINES: usize = u8::MAX as usize + 1;

/// Row input and how it is biased
pub struct RowPin<P> {
    pub pin: P,
    pub wiring: RowWiring,
}

impl<P> RowPin<P> {
    pub fn pull_up(pin: P) -> Self {
        Self {
            pin,
            wiring: RowWiring::InternalPullUp,
        }
    }

    pub fn pull_down(pin: P) -> Self {
        Self {
            pin,
            wiring: RowWiring::ExternalPullDown,
        }
    }
}

/// `R` x `C` key matrix with a transition queue of depth `Q`
pub struct Matrix<P, const R: usize, const C: usize, const Q: usize> {
    columns: [P; C],
    rows: [RowPin<P>; R],
    active: Level,
    cells: [[KeyCell; C]; R],
    events: EventQueue<Q>,
    debounce_ticks: u16,
}

impl<P, const R: usize, const C: usize, const Q: usize> Matrix<P, R, C, Q>
where
    P: GpioPin,
{
    /// Build the scanner. Rows must agree on the pressed level, since the
    /// columns are driven to that level.
    pub fn new(columns: [P; C], rows: [RowPin<P>; R], config: &KeyboardConfig) -> Result<Self, ConfigError> {
        if R > MAX_LINES || C > MAX_LINES {
            return Err(ConfigError::MatrixTooLarge);
        }

        let active = match rows.first() {
            Some(row) => row.wiring.pressed_level(),
            None => Level::Low,
        };
        if rows.iter().any(|row| row.wiring.pressed_level() != active) {
            return Err(ConfigError::MixedRowWiring);
        }

        Ok(Self {
            columns,
            rows,
            active,
            cells: [[KeyCell::new(); C]; R],
            events: EventQueue::new(config.overflow),
            debounce_ticks: config.debounce_ticks(),
        })
    }

    /// Configure pin directions and park every column at the idle level
    pub fn init(&mut self) -> Result<(), P::Error> {
        for row in self.rows.iter_mut() {
            row.pin.set_input(row.wiring.pull())?;
        }
        let idle = self.active.opposite();
        for column in self.columns.iter_mut() {
            column.set_output()?;
            column.drive(idle)?;
        }
        Ok(())
    }

    /// One scan pass at tick `now`. Returns the number of settled transitions.
    ///
    /// On a GPIO error the column being scanned is still returned to idle.
    pub fn scan(&mut self, now: Tick) -> Result<usize, P::Error> {
        let mut emitted = 0;

        for col in 0..C {
            self.columns[col].drive(self.active)?;
            let result = self.scan_column(col, now);
            self.columns[col].drive(self.active.opposite())?;
            emitted += result?;
        }

        Ok(emitted)
    }

    fn scan_column(&mut self, col: usize, now: Tick) -> Result<usize, P::Error> {
        let mut emitted = 0;

        for (row, input) in self.rows.iter_mut().enumerate() {
            let level = input.pin.read()?;
            let pressed = input.wiring.is_pressed(level);

            if let Some(edge) = self.cells[row][col].update(pressed, now, self.debounce_ticks) {
                #[cfg(feature = "defmt")]
                defmt::debug!("key ({}, {}) {}", row, col, edge);

                self.events.push(TransitionEvent {
                    row: row as u8,
                    col: col as u8,
                    edge,
                    at: now,
                });
                emitted += 1;
            }
        }

        Ok(emitted)
    }

    /// Debounced state of one key
    pub fn is_pressed(&self, row: usize, col: usize) -> bool {
        self.cells
            .get(row)
            .and_then(|cells| cells.get(col))
            .is_some_and(|cell| cell.is_pressed())
    }

    pub fn cell(&self, row: usize, col: usize) -> Option<&KeyCell> {
        self.cells.get(row).and_then(|cells| cells.get(col))
    }

    /// Transition queue for the downstream consumer
    pub fn events(&mut self) -> &mut EventQueue<Q> {
        &mut self.events
    }

    /// Return every key to Idle and discard queued transitions
    pub fn reset(&mut self) {
        for cell in self.cells.iter_mut().flatten() {
            cell.reset();
        }
        self.events.clear();
    }

    /// Level columns are driven to while scanned
    pub fn active_level(&self) -> Level {
        self.active
    }

    pub fn debounce_ticks(&self) -> u16 {
        self.debounce_ticks
    }

    /// Give the pins back
    pub fn release(self) -> ([P; C], [RowPin<P>; R]) {
        (self.columns, self.rows)
    }
}

use std::{iter::FusedIterator, time::Duration};

use shared::domain::Color;

use crate::timing::Timing;

/// One lit button: `on` while lit, then `off` dark before anything else shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Flash {
    pub color: Color,
    pub on: Duration,
    pub off: Duration,
}

/// Flashes for a whole sequence, in order. Built once per presentation and
/// consumed; the final flash is followed by a longer pause.
#[derive(Debug)]
pub struct Playback {
    sequence: Vec<Color>,
    next: usize,
    on: Duration,
    between: Duration,
    after_last: Duration,
}

impl Playback {
    pub(crate) fn new(sequence: Vec<Color>, timing: &Timing) -> Self {
        Self {
            sequence,
            next: 0,
            on: timing.flash_on,
            between: timing.flash_off + timing.flash_gap,
            after_last: timing.flash_off + timing.final_pause,
        }
    }
}

impl Iterator for Playback {
    type Item = Flash;

    fn next(&mut self) -> Option<Flash> {
        let color = *self.sequence.get(self.next)?;
        self.next += 1;
        let off = if self.next == self.sequence.len() {
            self.after_last
        } else {
            self.between
        };
        Some(Flash {
            color,
            on: self.on,
            off,
        })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let left = self.sequence.len() - self.next;
        (left, Some(left))
    }
}

impl ExactSizeIterator for Playback {}

impl FusedIterator for Playback {}

/// Cosmetic run through every button, `cycles` times.
#[derive(Debug)]
pub struct Sweep {
    step: usize,
    cycles: usize,
    on: Duration,
    rest: Duration,
}

impl Sweep {
    pub const CELEBRATION_CYCLES: usize = 2;

    pub fn new(cycles: usize, timing: &Timing) -> Self {
        Self {
            step: 0,
            cycles,
            on: timing.sweep_on,
            rest: timing.sweep_rest,
        }
    }
}

impl Iterator for Sweep {
    type Item = Flash;

    fn next(&mut self) -> Option<Flash> {
        if self.step >= self.cycles * Color::ALL.len() {
            return None;
        }
        let position = self.step % Color::ALL.len();
        self.step += 1;
        let off = if position == Color::ALL.len() - 1 {
            self.rest
        } else {
            Duration::ZERO
        };
        Some(Flash {
            color: Color::ALL[position],
            on: self.on,
            off,
        })
    }
}

impl FusedIterator for Sweep {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn playback_walks_sequence_with_long_final_pause() {
        let timing = Timing::default();
        let flashes: Vec<_> =
            Playback::new(vec![Color::Red, Color::Blue, Color::Red], &timing).collect();

        let colors: Vec<_> = flashes.iter().map(|f| f.color).collect();
        assert_eq!(colors, vec![Color::Red, Color::Blue, Color::Red]);
        assert!(flashes.iter().all(|f| f.on == Duration::from_millis(800)));
        assert_eq!(flashes[0].off, Duration::from_millis(600));
        assert_eq!(flashes[1].off, Duration::from_millis(600));
        assert_eq!(flashes[2].off, Duration::from_millis(700));
    }

    #[test]
    fn playback_is_exhausted_once() {
        let mut playback = Playback::new(vec![Color::Green], &Timing::default());
        assert_eq!(playback.len(), 1);
        assert!(playback.next().is_some());
        assert_eq!(playback.len(), 0);
        assert!(playback.next().is_none());
        assert!(playback.next().is_none());
    }

    #[test]
    fn single_flash_gets_final_pause() {
        let flash = Playback::new(vec![Color::Yellow], &Timing::default())
            .next()
            .expect("flash");
        assert_eq!(flash.off, Duration::from_millis(700));
    }

    #[test]
    fn sweep_cycles_through_every_color() {
        let flashes: Vec<_> = Sweep::new(2, &Timing::default()).collect();
        assert_eq!(flashes.len(), 8);
        assert_eq!(flashes[4].color, Color::Red);
        assert_eq!(flashes[3].off, Duration::from_millis(200));
        assert_eq!(flashes[2].off, Duration::ZERO);
    }
}

use std::fmt;

use serde::{Deserialize, Serialize};
use ulog_explorer_protocol::Rgb;

pub const PALETTE_SIZE: usize = 10;

const COLORS: [Rgb; PALETTE_SIZE] = [
    Rgb::new(31, 119, 180),
    Rgb::new(255, 127, 14),
    Rgb::new(44, 160, 44),
    Rgb::new(214, 39, 40),
    Rgb::new(148, 103, 189),
    Rgb::new(140, 86, 75),
    Rgb::new(227, 119, 194),
    Rgb::new(127, 127, 127),
    Rgb::new(188, 189, 34),
    Rgb::new(23, 190, 207),
];

/// Palette slot identifier, displayed as `C0`..`C9`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ColorKey(u8);

impl ColorKey {
    pub fn index(self) -> usize {
        usize::from(self.0)
    }

    pub fn rgb(self) -> Rgb {
        COLORS[self.index()]
    }

    /// Parse `C3` style keys.
    pub fn parse(s: &str) -> Option<Self> {
        let n: u8 = s.strip_prefix('C')?.parse().ok()?;
        (usize::from(n) < PALETTE_SIZE).then_some(Self(n))
    }
}

impl fmt::Display for ColorKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "C{}", self.0)
    }
}

/// Fixed ten-color allocator. A color is occupied while some curve uses it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Palette {
    occupied: [bool; PALETTE_SIZE],
}

impl Palette {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take the lowest unoccupied color.
    pub fn allocate(&mut self) -> Option<ColorKey> {
        let slot = self.occupied.iter().position(|o| !o)?;
        self.occupied[slot] = true;
        u8::try_from(slot).ok().map(ColorKey)
    }

    pub fn release(&mut self, key: ColorKey) {
        self.occupied[key.index()] = false;
    }

    pub fn release_all(&mut self) {
        self.occupied = [false; PALETTE_SIZE];
    }

    pub fn is_occupied(&self, key: ColorKey) -> bool {
        self.occupied[key.index()]
    }

    pub fn occupied_count(&self) -> usize {
        self.occupied.iter().filter(|o| **o).count()
    }

    pub fn is_full(&self) -> bool {
        self.occupied_count() == PALETTE_SIZE
    }
}

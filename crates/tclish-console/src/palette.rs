//! Random colours for rendered elements, drawn from a fixed palette.

use crate::error::{ConsoleError, Result};
use clap::ValueEnum;
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;

pub const DEFAULT_PALETTE: [&str; 6] = [
    "#FF5733", "#FFBD33", "#33FF57", "#3388FF", "#FF33E9", "#7F33FF",
];

const RESET: &str = "\x1b[0m";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Rgb(pub u8, pub u8, pub u8);

impl Rgb {
    /// Parse `#RRGGBB`
    pub fn parse(hex: &str) -> Result<Self> {
        let invalid = || ConsoleError::InvalidColor(hex.to_string());
        let digits = hex.strip_prefix('#').ok_or_else(invalid)?;
        if digits.len() != 6 || !digits.is_ascii() {
            return Err(invalid());
        }
        let channel = |i: usize| u8::from_str_radix(&digits[i..i + 2], 16).map_err(|_| invalid());
        Ok(Rgb(channel(0)?, channel(2)?, channel(4)?))
    }
}

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02X}{:02X}{:02X}", self.0, self.1, self.2)
    }
}

/// How foreground and background are chosen for an element
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum PaletteVariant {
    /// Random foreground only
    #[default]
    Foreground,
    /// Independent random foreground and background; they may coincide
    ForegroundBackground,
    /// Background picked from the palette minus the foreground
    Distinct,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColorPair {
    pub foreground: Rgb,
    pub background: Option<Rgb>,
}

impl ColorPair {
    /// Wrap `text` in 24-bit ANSI colour escapes
    pub fn paint(&self, text: &str) -> String {
        let Rgb(r, g, b) = self.foreground;
        let mut out = format!("\x1b[38;2;{};{};{}m", r, g, b);
        if let Some(Rgb(r, g, b)) = self.background {
            out.push_str(&format!("\x1b[48;2;{};{};{}m", r, g, b));
        }
        out.push_str(text);
        out.push_str(RESET);
        out
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Palette {
    colors: Vec<Rgb>,
}

impl Palette {
    pub fn new(colors: Vec<Rgb>) -> Result<Self> {
        if colors.is_empty() {
            return Err(ConsoleError::EmptyPalette);
        }
        Ok(Self { colors })
    }

    pub fn from_hex<S: AsRef<str>>(colors: &[S]) -> Result<Self> {
        let colors = colors
            .iter()
            .map(|c| Rgb::parse(c.as_ref()))
            .collect::<Result<Vec<_>>>()?;
        Self::new(colors)
    }

    pub fn colors(&self) -> &[Rgb] {
        &self.colors
    }

    /// Pick the colours of one element
    pub fn pick<R: Rng + ?Sized>(&self, variant: PaletteVariant, rng: &mut R) -> ColorPair {
        let foreground = self.random(rng);
        let background = match variant {
            PaletteVariant::Foreground => None,
            PaletteVariant::ForegroundBackground => Some(self.random(rng)),
            PaletteVariant::Distinct => {
                let remaining: Vec<Rgb> = self
                    .colors
                    .iter()
                    .copied()
                    .filter(|c| *c != foreground)
                    .collect();
                remaining.choose(rng).copied()
            }
        };
        ColorPair {
            foreground,
            background,
        }
    }

    fn random<R: Rng + ?Sized>(&self, rng: &mut R) -> Rgb {
        self.colors[rng.gen_range(0..self.colors.len())]
    }
}

impl Default for Palette {
    fn default() -> Self {
        Self {
            colors: vec![
                Rgb(0xFF, 0x57, 0x33),
                Rgb(0xFF, 0xBD, 0x33),
                Rgb(0x33, 0xFF, 0x57),
                Rgb(0x33, 0x88, 0xFF),
                Rgb(0xFF, 0x33, 0xE9),
                Rgb(0x7F, 0x33, 0xFF),
            ],
        }
    }
}

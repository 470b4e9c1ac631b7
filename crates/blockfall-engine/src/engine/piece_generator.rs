use std::{fmt, str::FromStr};

use rand::{
    Rng, SeedableRng as _,
    distr::{Distribution, StandardUniform},
};
use rand_pcg::Pcg32;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::{CellColor, Piece, PieceKind};

/// Seed for deterministic piece generation.
///
/// A 128-bit seed for the [`Pcg32`] behind [`PieceGenerator`]. The same seed always
/// yields the same sequence of kinds and colours, which makes training runs and test
/// scenarios reproducible.
///
/// Seeds are written as 32 hexadecimal characters, both by [`fmt::Display`] and in
/// serialized form.
///
/// # Example
///
/// ```
/// use blockfall_engine::{PieceGenerator, PieceSeed};
///
/// let seed: PieceSeed = "0123456789abcdef0123456789abcdef".parse().unwrap();
/// let mut a = PieceGenerator::with_seed(seed);
/// let mut b = PieceGenerator::with_seed(seed);
/// assert_eq!(a.next_piece().kind(), b.next_piece().kind());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PieceSeed([u8; 16]);

#[derive(Debug, Clone, PartialEq, Eq, derive_more::Display, derive_more::Error)]
#[display("invalid hex seed {input:?}: expected 32 hexadecimal characters")]
pub struct ParseSeedError {
    input: String,
}

impl From<[u8; 16]> for PieceSeed {
    fn from(bytes: [u8; 16]) -> Self {
        Self(bytes)
    }
}

impl PieceSeed {
    #[must_use]
    pub const fn to_bytes(self) -> [u8; 16] {
        self.0
    }
}

impl fmt::Display for PieceSeed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:032x}", u128::from_be_bytes(self.0))
    }
}

impl FromStr for PieceSeed {
    type Err = ParseSeedError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let error = || ParseSeedError {
            input: s.to_owned(),
        };
        if s.len() != 32 || !s.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(error());
        }
        let num = u128::from_str_radix(s, 16).map_err(|_| error())?;
        Ok(Self(num.to_be_bytes()))
    }
}

impl Serialize for PieceSeed {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for PieceSeed {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let hex_str = String::deserialize(deserializer)?;
        hex_str.parse().map_err(serde::de::Error::custom)
    }
}

impl Distribution<PieceSeed> for StandardUniform {
    fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> PieceSeed {
        let mut seed = [0; 16];
        rng.fill(&mut seed);
        PieceSeed(seed)
    }
}

/// Supplies the pieces of a game.
///
/// Every piece is an independent uniform draw of kind and colour. The upcoming kind is
/// drawn one step ahead so that it can be previewed.
#[derive(Debug, Clone)]
pub struct PieceGenerator {
    rng: Pcg32,
    next: (PieceKind, CellColor),
}

impl Default for PieceGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl PieceGenerator {
    /// Creates a generator with a random seed.
    #[must_use]
    pub fn new() -> Self {
        Self::with_seed(rand::rng().random())
    }

    #[must_use]
    pub fn with_seed(seed: PieceSeed) -> Self {
        let mut rng = Pcg32::from_seed(seed.0);
        let next = (rng.random(), rng.random());
        Self { rng, next }
    }

    /// Returns the next piece, placed at the origin.
    pub fn next_piece(&mut self) -> Piece {
        let (kind, color) = self.next;
        self.next = (self.rng.random(), self.rng.random());
        Piece::new(kind, color)
    }

    /// Kind of the piece the next [`Self::next_piece`] call returns.
    #[must_use]
    pub fn peek_kind(&self) -> PieceKind {
        self.next.0
    }
}

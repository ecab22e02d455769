//! # Join Codes
//!
//! Short, speakable codes such as `FOX-271` that participants type to find a board.
//! Codes are purely probabilistic: nothing here checks them against existing boards.

use std::fmt;
use std::str::FromStr;

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// Animal tokens a code starts with.
pub const ANIMALS: [&str; 9] = ["FOX", "OWL", "ELK", "BEE", "LYNX", "OTTER", "DOVE", "HARE", "MOTH"];

/// Inclusive range of the numeric suffix.
pub const SUFFIX_MIN: u16 = 100;
pub const SUFFIX_MAX: u16 = 999;

/// A normalized join code matching `^[A-Z]{2,5}-\d{3}$`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct JoinCode(String);

impl JoinCode {
    /// Draws a code from the thread-local generator.
    pub fn generate() -> Self {
        Self::generate_with(&mut rand::rng())
    }

    /// Draws a code uniformly from {animal} x {100..=999}.
    pub fn generate_with<R: Rng + ?Sized>(rng: &mut R) -> Self {
        let animal = ANIMALS[rng.random_range(0..ANIMALS.len())];
        let suffix = rng.random_range(SUFFIX_MIN..=SUFFIX_MAX);
        Self(format!("{animal}-{suffix}"))
    }

    /// Uppercases and strips every whitespace character.
    pub fn normalize(input: &str) -> String {
        input
            .chars()
            .filter(|c| !c.is_whitespace())
            .flat_map(char::to_uppercase)
            .collect()
    }

    /// Normalizes `input` and returns it if it is a well-formed code.
    pub fn parse(input: &str) -> Option<Self> {
        let normalized = Self::normalize(input);
        is_well_formed(&normalized).then_some(Self(normalized))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

fn is_well_formed(code: &str) -> bool {
    let Some((prefix, digits)) = code.split_once('-') else {
        return false;
    };
    (2..=5).contains(&prefix.len())
        && prefix.bytes().all(|b| b.is_ascii_uppercase())
        && digits.len() == 3
        && digits.bytes().all(|b| b.is_ascii_digit())
}

impl fmt::Display for JoinCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for JoinCode {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| {
            AppError::ValidationError(format!("{s:?} is not a join code (expected e.g. FOX-271)"))
        })
    }
}

impl TryFrom<String> for JoinCode {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value).ok_or_else(|| format!("malformed join code {value:?}"))
    }
}

impl From<JoinCode> for String {
    fn from(code: JoinCode) -> Self {
        code.0
    }
}

//! Values computed from other fields: password strength, lookup fills and
//! password suggestions.
//!
//! Nothing here is a source of truth. Strength is recomputed from the current
//! password on every read, and coupled fields are rewritten from their source
//! through [`DerivedRule`]s whenever the source changes.

use std::fmt;
use std::sync::Arc;

use once_cell::sync::Lazy;
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::config::SuggestionQuotas;
use crate::wizard::value::{FieldStore, FieldValue};

pub const MAX_STRENGTH: u8 = 5;
const MIN_STRONG_LENGTH: usize = 8;

const UPPERCASE: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ";
const LOWERCASE: &[u8] = b"abcdefghijkmnopqrstuvwxyz";
const DIGITS: &[u8] = b"23456789";
const SYMBOLS: &[u8] = b"!@#$%^&*()-_=+?";

/// Scores a password from 0 to 5, one point each for length of at least 8,
/// an uppercase letter, a lowercase letter, a digit and a symbol.
pub fn password_strength(password: &str) -> u8 {
    let checks = [
        password.chars().count() >= MIN_STRONG_LENGTH,
        password.chars().any(|ch| ch.is_ascii_uppercase()),
        password.chars().any(|ch| ch.is_ascii_lowercase()),
        password.chars().any(|ch| ch.is_ascii_digit()),
        password.chars().any(|ch| !ch.is_ascii_alphanumeric()),
    ];
    checks.iter().filter(|passed| **passed).count() as u8
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StrengthLevel {
    Empty,
    Weak,
    Medium,
    Strong,
}

impl StrengthLevel {
    pub fn from_score(score: u8) -> Self {
        match score {
            0 => StrengthLevel::Empty,
            1 | 2 => StrengthLevel::Weak,
            3 => StrengthLevel::Medium,
            _ => StrengthLevel::Strong,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            StrengthLevel::Empty => "",
            StrengthLevel::Weak => "Weak",
            StrengthLevel::Medium => "Medium",
            StrengthLevel::Strong => "Strong",
        }
    }

    pub fn color(&self) -> StrengthColor {
        match self {
            StrengthLevel::Empty => StrengthColor::Gray,
            StrengthLevel::Weak => StrengthColor::Red,
            StrengthLevel::Medium => StrengthColor::Yellow,
            StrengthLevel::Strong => StrengthColor::Green,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StrengthColor {
    Gray,
    Red,
    Yellow,
    Green,
}

impl fmt::Display for StrengthColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            StrengthColor::Gray => "gray",
            StrengthColor::Red => "red",
            StrengthColor::Yellow => "yellow",
            StrengthColor::Green => "green",
        };
        f.write_str(name)
    }
}

/// Meter state for a password field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PasswordStrength {
    pub score: u8,
    pub level: StrengthLevel,
}

impl PasswordStrength {
    pub fn of(password: &str) -> Self {
        let score = password_strength(password);
        Self {
            score,
            level: StrengthLevel::from_score(score),
        }
    }

    pub fn label(&self) -> &'static str {
        self.level.label()
    }

    pub fn color(&self) -> StrengthColor {
        self.level.color()
    }

    /// Width of the meter bar, `score / 5 * 100`.
    pub fn width_percent(&self) -> u8 {
        self.score.min(MAX_STRENGTH) * (100 / MAX_STRENGTH)
    }
}

/// Generates a password meeting every strength criterion by construction.
///
/// Draws the configured quota from each character class, then applies a
/// Fisher–Yates shuffle so class positions carry no bias.
pub fn suggest_password<R: Rng + ?Sized>(rng: &mut R, quotas: &SuggestionQuotas) -> String {
    let mut chars: Vec<u8> = Vec::with_capacity(quotas.total());
    for (class, count) in [
        (UPPERCASE, quotas.uppercase),
        (LOWERCASE, quotas.lowercase),
        (DIGITS, quotas.digits),
        (SYMBOLS, quotas.symbols),
    ] {
        for _ in 0..count {
            chars.push(class[rng.gen_range(0..class.len())]);
        }
    }
    chars.shuffle(rng);
    chars.into_iter().map(char::from).collect()
}

static BANK_DIRECTORY: Lazy<Vec<(&'static str, &'static str)>> = Lazy::new(|| {
    vec![
        ("007", "FCMB"),
        ("011", "First Bank of Nigeria"),
        ("023", "Citibank Nigeria"),
        ("030", "Heritage Bank"),
        ("032", "Union Bank of Nigeria"),
        ("033", "United Bank for Africa"),
        ("035", "Wema Bank"),
        ("044", "Access Bank"),
        ("050", "Ecobank Nigeria"),
        ("057", "Zenith Bank"),
        ("058", "Guaranty Trust Bank"),
        ("068", "Standard Chartered Bank"),
        ("070", "Fidelity Bank"),
        ("076", "Polaris Bank"),
        ("082", "Keystone Bank"),
        ("215", "Unity Bank"),
        ("221", "Stanbic IBTC Bank"),
        ("232", "Sterling Bank"),
    ]
});

/// Settlement bank name for a CBN bank code.
pub fn bank_name(code: &str) -> Option<&'static str> {
    let code = code.trim();
    BANK_DIRECTORY
        .iter()
        .find(|(candidate, _)| *candidate == code)
        .map(|(_, name)| *name)
}

/// All known bank codes, in directory order.
pub fn bank_codes() -> Vec<String> {
    BANK_DIRECTORY
        .iter()
        .map(|(code, _)| code.to_string())
        .collect()
}

type DeriveFn = dyn Fn(&FieldStore) -> Option<FieldValue> + Send + Sync;

/// Declarative coupling: whenever `source` changes, `target` is recomputed.
///
/// Returning `None` from the derive function leaves the target untouched.
#[derive(Clone)]
pub struct DerivedRule {
    pub source: &'static str,
    pub target: &'static str,
    derive: Arc<DeriveFn>,
}

impl DerivedRule {
    pub fn new(
        source: &'static str,
        target: &'static str,
        derive: impl Fn(&FieldStore) -> Option<FieldValue> + Send + Sync + 'static,
    ) -> Self {
        Self {
            source,
            target,
            derive: Arc::new(derive),
        }
    }

    /// Bank code to bank name through the static directory. Unknown codes
    /// clear the name.
    pub fn bank_name(source: &'static str, target: &'static str) -> Self {
        Self::new(source, target, move |fields| {
            Some(FieldValue::Text(
                bank_name(fields.text(source)).unwrap_or_default().to_string(),
            ))
        })
    }

    /// Copies `from` into `target` while the `switch` checkbox is ticked.
    pub fn copy_when_checked(
        switch: &'static str,
        from: &'static str,
        target: &'static str,
    ) -> Self {
        Self::new(switch, target, move |fields| {
            if fields.flag(switch) {
                fields.get(from).cloned()
            } else {
                None
            }
        })
    }

    /// Resets `target` to a fixed value whenever `source` changes.
    pub fn reset(source: &'static str, target: &'static str, value: FieldValue) -> Self {
        Self::new(source, target, move |_| Some(value.clone()))
    }

    pub fn evaluate(&self, fields: &FieldStore) -> Option<FieldValue> {
        (self.derive)(fields)
    }
}

impl fmt::Debug for DerivedRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DerivedRule")
            .field("source", &self.source)
            .field("target", &self.target)
            .finish()
    }
}

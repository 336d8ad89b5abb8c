// Denomination Ledger
//
// Fixed value table for the ten US cash denominations a drawer holds, and the
// count vector every opening/closing record is expressed in.

use crate::error::{CashError, ValidationError};
use crate::money::Money;
use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

// ============================================================================
// DENOMINATION
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Denomination {
    Pennies,
    Nickels,
    Dimes,
    Quarters,
    Ones,
    Fives,
    Tens,
    Twenties,
    Fifties,
    Hundreds,
}

impl Denomination {
    /// Every denomination, smallest first. Index order matches `DenominationCount`.
    pub const ALL: [Denomination; 10] = [
        Denomination::Pennies,
        Denomination::Nickels,
        Denomination::Dimes,
        Denomination::Quarters,
        Denomination::Ones,
        Denomination::Fives,
        Denomination::Tens,
        Denomination::Twenties,
        Denomination::Fifties,
        Denomination::Hundreds,
    ];

    pub const fn key(self) -> &'static str {
        match self {
            Denomination::Pennies => "pennies",
            Denomination::Nickels => "nickels",
            Denomination::Dimes => "dimes",
            Denomination::Quarters => "quarters",
            Denomination::Ones => "ones",
            Denomination::Fives => "fives",
            Denomination::Tens => "tens",
            Denomination::Twenties => "twenties",
            Denomination::Fifties => "fifties",
            Denomination::Hundreds => "hundreds",
        }
    }

    /// Face value of one unit.
    pub const fn value(self) -> Money {
        Money::from_cents(match self {
            Denomination::Pennies => 1,
            Denomination::Nickels => 5,
            Denomination::Dimes => 10,
            Denomination::Quarters => 25,
            Denomination::Ones => 100,
            Denomination::Fives => 500,
            Denomination::Tens => 1_000,
            Denomination::Twenties => 2_000,
            Denomination::Fifties => 5_000,
            Denomination::Hundreds => 10_000,
        })
    }

    const fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for Denomination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for Denomination {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key = s.trim().to_ascii_lowercase();
        Denomination::ALL
            .into_iter()
            .find(|d| d.key() == key)
            .ok_or_else(|| ValidationError::UnknownDenomination(s.trim().to_string()))
    }
}

// ============================================================================
// DENOMINATION COUNT
// ============================================================================

/// Count of each denomination. All ten keys always exist; absent input keys
/// count as zero.
///
/// On the wire this is a JSON object keyed by denomination name. Unknown or
/// repeated keys, negative values and non-integer values are rejected.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Deserialize)]
#[serde(try_from = "RawEntries")]
pub struct DenominationCount {
    counts: [u32; 10],
}

impl DenominationCount {
    pub const ZERO: DenominationCount = DenominationCount { counts: [0; 10] };

    pub fn get(&self, denomination: Denomination) -> u32 {
        self.counts[denomination.index()]
    }

    pub fn set(&mut self, denomination: Denomination, count: u32) {
        self.counts[denomination.index()] = count;
    }

    pub fn with(mut self, denomination: Denomination, count: u32) -> Self {
        self.set(denomination, count);
        self
    }

    pub fn iter(&self) -> impl Iterator<Item = (Denomination, u32)> + '_ {
        Denomination::ALL.into_iter().map(move |d| (d, self.get(d)))
    }

    pub fn is_zero(&self) -> bool {
        self.counts.iter().all(|&c| c == 0)
    }

    /// Build from `(key, count)` pairs. Keys are case-insensitive; a key given
    /// twice is rejected.
    pub fn from_entries<'a, I>(entries: I) -> Result<Self, ValidationError>
    where
        I: IntoIterator<Item = (&'a str, i64)>,
    {
        let mut collector = EntryCollector::over(DenominationCount::ZERO);
        for (key, value) in entries {
            let denomination: Denomination = key.parse()?;
            collector.insert(denomination, checked_count(denomination, value)?)?;
        }
        Ok(collector.counts)
    }

    /// Overlay textual `(key, count)` entries, e.g. CSV rows or form fields.
    /// Keys not named keep their value; a key named twice is rejected.
    pub fn with_text_entries<K, V, I>(self, entries: I) -> Result<Self, ValidationError>
    where
        K: AsRef<str>,
        V: AsRef<str>,
        I: IntoIterator<Item = (K, V)>,
    {
        let mut collector = EntryCollector::over(self);
        for (key, raw) in entries {
            let (denomination, count) = parse_entry(key.as_ref(), raw.as_ref())?;
            collector.insert(denomination, count)?;
        }
        Ok(collector.counts)
    }

    /// Parse `key=count` pairs as typed on a command line or in a form.
    pub fn from_pairs<S: AsRef<str>>(pairs: &[S]) -> Result<Self, ValidationError> {
        DenominationCount::ZERO.with_pairs(pairs)
    }

    /// Like `from_pairs`, but on top of existing counts; keys not named keep
    /// their value.
    pub fn with_pairs<S: AsRef<str>>(self, pairs: &[S]) -> Result<Self, ValidationError> {
        let split = pairs
            .iter()
            .map(|pair| {
                let pair = pair.as_ref();
                pair.split_once('=').ok_or_else(|| ValidationError::NonNumeric {
                    field: pair.to_string(),
                    value: String::new(),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        self.with_text_entries(split)
    }

    /// Ledger total: Σ count × face value, in cents.
    pub fn total(&self) -> Result<Money, CashError> {
        self.iter().try_fold(Money::ZERO, |acc, (denomination, count)| {
            denomination
                .value()
                .checked_times(count)
                .and_then(|line| acc.checked_add(line))
                .ok_or(CashError::Overflow("denomination total"))
        })
    }
}

/// Collects input entries, refusing a denomination named twice (keys are
/// case-insensitive, so `Ones` and `ones` collide).
struct EntryCollector {
    counts: DenominationCount,
    seen: [bool; 10],
}

impl EntryCollector {
    fn over(counts: DenominationCount) -> Self {
        EntryCollector {
            counts,
            seen: [false; 10],
        }
    }

    fn insert(&mut self, denomination: Denomination, count: u32) -> Result<(), ValidationError> {
        let slot = &mut self.seen[denomination.index()];
        if *slot {
            return Err(ValidationError::DuplicateDenomination(
                denomination.key().to_string(),
            ));
        }
        *slot = true;
        self.counts.set(denomination, count);
        Ok(())
    }
}

fn checked_count(denomination: Denomination, value: i64) -> Result<u32, ValidationError> {
    if value < 0 {
        return Err(ValidationError::NegativeCount {
            key: denomination.key().to_string(),
            value,
        });
    }
    u32::try_from(value).map_err(|_| ValidationError::NonNumeric {
        field: denomination.key().to_string(),
        value: value.to_string(),
    })
}

/// Parse one textual `(key, count)` entry, e.g. a form field or CSV row.
fn parse_entry(key: &str, raw: &str) -> Result<(Denomination, u32), ValidationError> {
    let denomination: Denomination = key.parse()?;
    Ok((denomination, parse_count(denomination, raw)?))
}

fn parse_count(denomination: Denomination, raw: &str) -> Result<u32, ValidationError> {
    let trimmed = raw.trim();
    let value: i64 = trimmed.parse().map_err(|_| ValidationError::NonNumeric {
        field: denomination.key().to_string(),
        value: trimmed.to_string(),
    })?;
    checked_count(denomination, value)
}

/// JSON object entries in document order. A map type would fold repeated
/// keys before validation could see them.
struct RawEntries(Vec<(String, Value)>);

impl<'de> Deserialize<'de> for RawEntries {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct EntriesVisitor;

        impl<'de> Visitor<'de> for EntriesVisitor {
            type Value = RawEntries;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("an object of denomination counts")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<RawEntries, A::Error> {
                let mut entries = Vec::with_capacity(access.size_hint().unwrap_or(0));
                while let Some(entry) = access.next_entry::<String, Value>()? {
                    entries.push(entry);
                }
                Ok(RawEntries(entries))
            }
        }

        deserializer.deserialize_map(EntriesVisitor)
    }
}

impl TryFrom<RawEntries> for DenominationCount {
    type Error = ValidationError;

    fn try_from(raw: RawEntries) -> Result<Self, Self::Error> {
        let mut collector = EntryCollector::over(DenominationCount::ZERO);
        for (key, value) in &raw.0 {
            let denomination: Denomination = key.parse()?;
            let count = match value {
                Value::Number(n) => match n.as_i64() {
                    Some(v) => checked_count(denomination, v)?,
                    None => {
                        return Err(ValidationError::NonNumeric {
                            field: denomination.key().to_string(),
                            value: n.to_string(),
                        })
                    }
                },
                Value::String(s) => parse_count(denomination, s)?,
                other => {
                    return Err(ValidationError::NonNumeric {
                        field: denomination.key().to_string(),
                        value: other.to_string(),
                    })
                }
            };
            collector.insert(denomination, count)?;
        }
        Ok(collector.counts)
    }
}

impl Serialize for DenominationCount {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(Denomination::ALL.len()))?;
        for (denomination, count) in self.iter() {
            map.serialize_entry(denomination.key(), &count)?;
        }
        map.end()
    }
}

impl fmt::Display for DenominationCount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self
            .iter()
            .filter(|(_, c)| *c > 0)
            .map(|(d, c)| format!("{d}={c}"))
            .collect();
        if parts.is_empty() {
            f.write_str("(empty)")
        } else {
            f.write_str(&parts.join(" "))
        }
    }
}

/// Ledger total of a count vector.
pub fn total(denominations: &DenominationCount) -> Result<Money, CashError> {
    denominations.total()
}

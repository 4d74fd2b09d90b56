//! Append-only record of acknowledged parts.

use std::collections::BTreeMap;

use tracing::warn;

use crate::types::PartResult;

/// Outcome of recording a part.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Acknowledgement {
    /// First acknowledgement for this part.
    Recorded { acknowledged: u32 },
    /// The part was already recorded; the ledger is unchanged.
    Duplicate,
    /// Part number outside `1..=total`; the ledger is unchanged.
    OutOfRange,
}

/// Maps part number to its [`PartResult`] for one session.
///
/// Keys are always a subset of `1..=total` with no duplicates; the first
/// result recorded for a part wins.
#[derive(Debug, Clone)]
pub struct PartLedger {
    total: u32,
    parts: BTreeMap<u32, PartResult>,
}

impl PartLedger {
    pub fn new(total: u32) -> Self {
        Self {
            total,
            parts: BTreeMap::new(),
        }
    }

    /// Records an acknowledged part.
    pub fn record(&mut self, result: PartResult) -> Acknowledgement {
        let part_number = result.part_number;
        if part_number == 0 || part_number > self.total {
            return Acknowledgement::OutOfRange;
        }
        if let Some(existing) = self.parts.get(&part_number) {
            if existing.integrity_tag != result.integrity_tag {
                warn!(
                    part = part_number,
                    kept = %existing.integrity_tag,
                    ignored = %result.integrity_tag,
                    "conflicting integrity tag for recorded part"
                );
            }
            return Acknowledgement::Duplicate;
        }
        self.parts.insert(part_number, result);
        Acknowledgement::Recorded {
            acknowledged: self.acknowledged(),
        }
    }

    /// Number of distinct parts recorded.
    pub fn acknowledged(&self) -> u32 {
        self.parts.len() as u32
    }

    /// Number of parts the session needs.
    pub fn total(&self) -> u32 {
        self.total
    }

    /// True when every part in `1..=total` is recorded.
    pub fn is_complete(&self) -> bool {
        self.acknowledged() == self.total
    }

    /// Part numbers not yet recorded, ascending.
    pub fn missing(&self) -> Vec<u32> {
        (1..=self.total)
            .filter(|n| !self.parts.contains_key(n))
            .collect()
    }

    pub fn get(&self, part_number: u32) -> Option<&PartResult> {
        self.parts.get(&part_number)
    }

    /// Recorded parts ordered by part number.
    pub fn parts(&self) -> impl Iterator<Item = &PartResult> {
        self.parts.values()
    }
}

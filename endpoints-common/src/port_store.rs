
use std::ops::RangeInclusive;
use thiserror::Error;

/// Maximum number of port ranges a single rule may list.
pub const MAX_RANGES: usize = 256;

const START_MASK: u32 = 0x0000_FFFF;
const END_MASK: u32 = 0xFFFF_0000;
const END_FIRST_BIT: u32 = 16;

#[inline]
fn start(range: u32) -> u16 {
    (range & START_MASK) as u16
}

#[inline]
fn end(range: u32) -> u16 {
    ((range & END_MASK) >> END_FIRST_BIT) as u16
}

#[inline]
fn new_range(start: u16, end: u16) -> u32 {
    ((end as u32) << END_FIRST_BIT) | (start as u32)
}

/// Set of port ranges accepted by a rule.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PortStore {
    // Sorted non-overlapping ranges
    // bit 0-15: port-start
    // bit 16-31: port-end
    ranges: Vec<u32>,
}

impl PortStore {
    /// Builds the store from inclusive `(start, end)` pairs.
    ///
    /// Overlapping and adjacent ranges are merged.
    pub fn new(ranges: &[(u16, u16)]) -> Result<Self, PortStoreError> {
        if let Some(&(start, end)) = ranges.iter().find(|(start, end)| start > end) {
            return Err(PortStoreError::Reversed { start, end });
        }

        let mut sorted = ranges.to_vec();
        sorted.sort_unstable();

        let mut merged: Vec<(u16, u16)> = Vec::with_capacity(sorted.len());
        for (start, end) in sorted {
            match merged.last_mut() {
                Some(last) if u32::from(start) <= u32::from(last.1) + 1 => {
                    last.1 = last.1.max(end);
                }
                _ => merged.push((start, end)),
            }
        }

        if merged.len() > MAX_RANGES {
            return Err(PortStoreError::Exhausted);
        }

        Ok(Self {
            ranges: merged
                .into_iter()
                .map(|(start, end)| new_range(start, end))
                .collect(),
        })
    }

    pub fn lookup(&self, port: u16) -> bool {
        let idx = self.ranges.partition_point(|&r| start(r) <= port);
        idx > 0 && end(self.ranges[idx - 1]) >= port
    }

    pub fn ranges(&self) -> impl Iterator<Item = RangeInclusive<u16>> + '_ {
        self.ranges.iter().map(|&r| start(r)..=end(r))
    }

    pub fn len(&self) -> usize {
        self.ranges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }
}

#[non_exhaustive]
#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum PortStoreError {
    #[error("maximum number of port ranges for a rule reached")]
    Exhausted,
    #[error("port range {start}-{end} ends before it starts")]
    Reversed { start: u16, end: u16 },
}

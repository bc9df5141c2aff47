use crate::{Error, Result};
use serde::{Deserialize, Serialize};

/// Primary and secondary vehicle counts per station.
///
/// Allocations are values: operators build new allocations instead of
/// editing one in place, and equality/hash are structural so an allocation
/// can key the objective cache directly.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(try_from = "AllocationData", into = "AllocationData")]
pub struct Allocation {
    primary: Vec<u32>,
    secondary: Vec<u32>,
}

#[derive(Serialize, Deserialize)]
struct AllocationData {
    primary: Vec<u32>,
    secondary: Vec<u32>,
}

impl TryFrom<AllocationData> for Allocation {
    type Error = Error;

    fn try_from(data: AllocationData) -> Result<Self> {
        Allocation::new(data.primary, data.secondary)
    }
}

impl From<Allocation> for AllocationData {
    fn from(allocation: Allocation) -> Self {
        AllocationData {
            primary: allocation.primary,
            secondary: allocation.secondary,
        }
    }
}

impl Allocation {
    pub fn new(primary: Vec<u32>, secondary: Vec<u32>) -> Result<Self> {
        if primary.len() != secondary.len() {
            return Err(Error::shape(
                "secondary allocation",
                primary.len(),
                secondary.len(),
            ));
        }
        Ok(Self { primary, secondary })
    }

    pub fn zeros(num_stations: usize) -> Self {
        Self {
            primary: vec![0; num_stations],
            secondary: vec![0; num_stations],
        }
    }

    pub fn num_stations(&self) -> usize {
        self.primary.len()
    }

    pub fn primary(&self) -> &[u32] {
        &self.primary
    }

    pub fn secondary(&self) -> &[u32] {
        &self.secondary
    }

    pub fn total_primary(&self) -> u32 {
        self.primary.iter().sum()
    }

    pub fn total_secondary(&self) -> u32 {
        self.secondary.iter().sum()
    }

    /// `primary + secondary / ratio`, the budget measure conserved by trades.
    pub fn primary_equivalent(&self, ratio: u32) -> f64 {
        self.total_primary() as f64 + self.total_secondary() as f64 / ratio as f64
    }

    pub fn within_caps(&self, max_primary: u32, max_secondary: u32) -> bool {
        self.primary.iter().all(|&z| z <= max_primary)
            && self.secondary.iter().all(|&z| z <= max_secondary)
    }

    /// Same stations with the two vehicle types exchanged.
    pub fn swapped(&self) -> Self {
        Self {
            primary: self.secondary.clone(),
            secondary: self.primary.clone(),
        }
    }

    pub fn into_parts(self) -> (Vec<u32>, Vec<u32>) {
        (self.primary, self.secondary)
    }
}

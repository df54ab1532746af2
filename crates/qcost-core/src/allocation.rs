//! Percentage-based attribution of a record's grand total to responsible
//! parties, and the closure rule (percentages sum to 100).

use serde::{Deserialize, Serialize};

use crate::{
  Error, Result,
  draft::{Allocation, Party, chosen},
};

/// Default allowed deviation of the percentage sum from 100.
pub const CLOSURE_TOLERANCE: f64 = 0.01;

/// A resolved allocation entry with its monetary amount.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AllocationShare {
  pub party:      Party,
  pub percentage: f64,
  pub amount:     f64,
}

/// Resolve the entries that carry a chosen party and a positive percentage.
pub fn allocation_shares(
  entries: &[Allocation],
  grand_total: f64,
) -> Vec<AllocationShare> {
  entries
    .iter()
    .filter(|a| a.percentage > 0.0)
    .filter_map(|a| {
      chosen(a.party.as_ref()).map(|party| AllocationShare {
        party:      party.clone(),
        percentage: a.percentage,
        amount:     grand_total * a.percentage / 100.0,
      })
    })
    .collect()
}

/// Sum of percentages over every entry, chosen party or not.
pub fn percentage_sum(entries: &[Allocation]) -> f64 {
  entries.iter().map(|a| a.percentage).sum()
}

/// Check that allocation mode is usable: no negative shares, at least one
/// real entry, and a sum within `tolerance` of 100.
pub fn check_closure(entries: &[Allocation], tolerance: f64) -> Result<()> {
  if let Some(neg) = entries.iter().find(|a| a.percentage < 0.0) {
    return Err(Error::closure(format!(
      "negative percentage {}",
      neg.percentage
    )));
  }

  let has_valid = entries
    .iter()
    .any(|a| a.percentage > 0.0 && chosen(a.party.as_ref()).is_some());
  if !has_valid {
    return Err(Error::closure(
      "no entry with a responsible party and a positive percentage",
    ));
  }

  let sum = percentage_sum(entries);
  if (sum - 100.0).abs() > tolerance {
    return Err(Error::closure(format!(
      "percentages sum to {sum}, expected 100"
    )));
  }
  Ok(())
}

//! The ordered validation pipeline run before a draft may be submitted.
//!
//! Rules run in a fixed order and the first violation wins, so a caller (or a
//! test) always sees exactly one error:
//!
//! 1. base fields (category, date, supplier of a supplier-sourced record)
//! 2. category inputs (formula amount, or line items)
//! 3. shared and indirect surcharges
//! 4. customer name for External Failure
//! 5. allocation closure, when allocation mode is on

use crate::{
  Error, Result,
  allocation::check_closure,
  draft::{AmountMode, CostDraft, chosen, non_blank},
  formula::FormulaOutcome,
};

/// Run every rule against `draft`. `formula` is the outcome of
/// [`crate::formula::derive`] for the same draft.
pub fn validate(
  draft: &CostDraft,
  formula: Option<&FormulaOutcome>,
  tolerance: f64,
) -> Result<()> {
  check_base(draft)?;
  check_category_inputs(draft, formula)?;
  check_surcharges(draft)?;
  check_customer(draft)?;
  check_allocations(draft, tolerance)?;
  Ok(())
}

pub fn check_base(draft: &CostDraft) -> Result<()> {
  if draft.category.is_none() {
    return Err(Error::missing("category"));
  }
  if draft.cost_date.is_none() {
    return Err(Error::missing("cost date"));
  }
  if draft.supplier_sourced && draft.supplier_id.is_none() {
    return Err(Error::missing("supplier of a supplier-sourced cost"));
  }
  Ok(())
}

pub fn check_category_inputs(
  draft: &CostDraft,
  formula: Option<&FormulaOutcome>,
) -> Result<()> {
  if draft.is_formula() {
    check_formula(draft, formula)
  } else {
    check_line_items(draft)
  }
}

fn check_formula(
  draft: &CostDraft,
  formula: Option<&FormulaOutcome>,
) -> Result<()> {
  let category = draft.category.map(|c| c.label()).unwrap_or("formula");

  match draft.quantity {
    None => return Err(Error::missing("quantity")),
    Some(q) if q <= 0.0 => return Err(Error::non_positive("quantity")),
    Some(_) => {}
  }

  let is_material = draft.category.is_some_and(|c| c.is_material_formula());
  if is_material && draft.amount_mode == AmountMode::Auto {
    if non_blank(draft.material.as_deref()).is_none() {
      return Err(Error::missing("material"));
    }
    match draft.scrap_weight_kg {
      None => return Err(Error::missing("scrap weight")),
      Some(w) if w <= 0.0 => return Err(Error::non_positive("scrap weight")),
      Some(_) => {}
    }
  }

  match formula {
    Some(FormulaOutcome::NotComputable { reason }) => Err(Error::non_positive(
      format!("{category} is not computable: {reason}"),
    )),
    Some(outcome) => match outcome.amount() {
      Some(amount) if amount > 0.0 => Ok(()),
      Some(amount) => Err(Error::non_positive(format!(
        "{category} resolved to {amount}"
      ))),
      None => Err(Error::non_positive(format!("{category} has no amount"))),
    },
    None => Err(Error::non_positive(format!("{category} has no amount"))),
  }
}

fn check_line_items(draft: &CostDraft) -> Result<()> {
  if draft.line_items.is_empty() {
    return Err(Error::missing("at least one line item"));
  }
  for (i, line) in draft.line_items.iter().enumerate() {
    let n = i + 1;
    if chosen(line.responsible.as_ref()).is_none() {
      return Err(Error::missing(format!("responsible party of line {n}")));
    }
    let amount = line.effective_amount();
    if amount <= 0.0 {
      return Err(Error::non_positive(format!(
        "line {n} amount is {amount}"
      )));
    }
  }
  Ok(())
}

pub fn check_surcharges(draft: &CostDraft) -> Result<()> {
  for (i, shared) in draft.shared_costs.iter().enumerate() {
    if shared.amount <= 0.0 {
      return Err(Error::non_positive(format!(
        "shared cost {} amount is {}",
        i + 1,
        shared.amount
      )));
    }
  }
  for (i, indirect) in draft.indirect_costs.iter().enumerate() {
    let n = i + 1;
    if indirect.category.trim().is_empty() {
      return Err(Error::missing(format!("category of indirect cost {n}")));
    }
    if indirect.amount <= 0.0 {
      return Err(Error::non_positive(format!(
        "indirect cost {n} amount is {}",
        indirect.amount
      )));
    }
  }
  Ok(())
}

pub fn check_customer(draft: &CostDraft) -> Result<()> {
  let requires = draft.category.is_some_and(|c| c.requires_customer());
  if requires && non_blank(draft.customer_name.as_deref()).is_none() {
    return Err(Error::missing("customer name"));
  }
  Ok(())
}

pub fn check_allocations(draft: &CostDraft, tolerance: f64) -> Result<()> {
  match &draft.allocations {
    Some(entries) => check_closure(entries, tolerance),
    None => Ok(()),
  }
}

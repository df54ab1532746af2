//! Reference catalogs the engine reads: unit labour rates, material prices
//! and suppliers.
//!
//! Catalogs are owned by an external collaborator (settings screens, the
//! SQLite store, an imported JSON file). The engine only looks entries up by
//! name or id.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Error, Result};

// ─── Entries ─────────────────────────────────────────────────────────────────

/// Labour cost of one minute of work in a unit (department, line, cell).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnitCostRate {
  pub unit_name:       String,
  pub cost_per_minute: f64,
}

/// Purchase and scrap resale price of a material, both per kilogram.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MaterialCostRate {
  pub material_name:         String,
  pub purchase_price_per_kg: f64,
  pub scrap_price_per_kg:    f64,
}

impl UnitCostRate {
  pub fn validate(&self) -> Result<()> {
    check_price(&self.unit_name, "cost per minute", self.cost_per_minute)
  }
}

impl MaterialCostRate {
  /// Value lost per kilogram scrapped.
  pub fn loss_per_kg(&self) -> f64 {
    self.purchase_price_per_kg - self.scrap_price_per_kg
  }

  pub fn validate(&self) -> Result<()> {
    let name = &self.material_name;
    check_price(name, "purchase price per kg", self.purchase_price_per_kg)?;
    check_price(name, "scrap price per kg", self.scrap_price_per_kg)
  }
}

/// Rates and prices are finite and never negative.
fn check_price(name: &str, field: &str, value: f64) -> Result<()> {
  if value.is_finite() && value >= 0.0 {
    Ok(())
  } else {
    Err(Error::InvalidCatalog(format!("{name:?} has {field} {value}")))
  }
}

#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum SupplierStatus {
  #[default]
  Approved,
  Conditional,
  Suspended,
  Blocked,
}

impl SupplierStatus {
  pub fn is_approved(self) -> bool { matches!(self, Self::Approved) }

  pub fn as_str(self) -> &'static str {
    match self {
      Self::Approved => "approved",
      Self::Conditional => "conditional",
      Self::Suspended => "suspended",
      Self::Blocked => "blocked",
    }
  }

  pub fn parse(s: &str) -> Option<Self> {
    match s {
      "approved" => Some(Self::Approved),
      "conditional" => Some(Self::Conditional),
      "suspended" => Some(Self::Suspended),
      "blocked" => Some(Self::Blocked),
      _ => None,
    }
  }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Supplier {
  pub supplier_id: Uuid,
  pub name:        String,
  #[serde(default)]
  pub status:      SupplierStatus,
}

// ─── Catalogs ────────────────────────────────────────────────────────────────

/// The three lookup tables bundled together.
///
/// Catalogs are small (tens of rows), so lookups are linear scans.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Catalogs {
  #[serde(default)]
  pub unit_costs:     Vec<UnitCostRate>,
  #[serde(default)]
  pub material_costs: Vec<MaterialCostRate>,
  #[serde(default)]
  pub suppliers:      Vec<Supplier>,
}

impl Catalogs {
  /// Reject the first unit rate or material price that is negative or not
  /// finite. Suppliers carry no prices and always pass.
  pub fn validate(&self) -> Result<()> {
    for rate in &self.unit_costs {
      rate.validate()?;
    }
    for rate in &self.material_costs {
      rate.validate()?;
    }
    Ok(())
  }

  pub fn unit(&self, name: &str) -> Option<&UnitCostRate> {
    self.unit_costs.iter().find(|u| u.unit_name == name)
  }

  /// Cost per minute for `name`; unknown units cost nothing.
  pub fn unit_rate(&self, name: &str) -> f64 {
    self.unit(name).map(|u| u.cost_per_minute).unwrap_or(0.0)
  }

  pub fn material(&self, name: &str) -> Option<&MaterialCostRate> {
    self.material_costs.iter().find(|m| m.material_name == name)
  }

  /// Like [`Catalogs::material`], but a miss is an error.
  pub fn require_material(&self, name: &str) -> Result<&MaterialCostRate> {
    self
      .material(name)
      .ok_or_else(|| Error::LookupMiss(format!("material {name:?}")))
  }

  pub fn supplier(&self, id: Uuid) -> Option<&Supplier> {
    self.suppliers.iter().find(|s| s.supplier_id == id)
  }

  /// Display name for a supplier, falling back to its id.
  pub fn supplier_name(&self, id: Uuid) -> String {
    self
      .supplier(id)
      .map(|s| s.name.clone())
      .unwrap_or_else(|| id.to_string())
  }
}

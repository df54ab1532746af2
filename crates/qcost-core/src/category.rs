//! Cost categories and their cost-of-poor-quality grouping.

use serde::{Deserialize, Serialize};

/// The fixed set of quality-cost categories.
///
/// Scrap, Waste and Rework are *formula* categories: their amount is derived
/// from a closed-form calculation. Every other category is *itemized*: its
/// amount is the sum of user-entered line items.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CostCategory {
  // ── Formula ─────────────────────────────────────────────────────────────
  Scrap,
  Waste,
  Rework,

  // ── Internal failure ────────────────────────────────────────────────────
  InternalQualityControl,
  FinalDefects,
  InternalFailure,
  SupplierFailure,

  // ── External failure ────────────────────────────────────────────────────
  Warranty,
  Return,
  Complaint,
  ExternalFailure,
  Recall,
  CustomerLoss,

  // ── Appraisal ───────────────────────────────────────────────────────────
  IncomingInspection,
  ProductionQualityControl,
  TestAndMeasurement,
  QualityControl,

  // ── Prevention ──────────────────────────────────────────────────────────
  Training,
  QualityPlanning,
  SupplierEvaluation,
  ImprovementProjects,
  QualitySystem,
}

/// The four classic cost-of-poor-quality buckets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CopqGroup {
  InternalFailure,
  ExternalFailure,
  Appraisal,
  Prevention,
}

impl CostCategory {
  pub const ALL: [CostCategory; 22] = [
    Self::Scrap,
    Self::Waste,
    Self::Rework,
    Self::InternalQualityControl,
    Self::FinalDefects,
    Self::InternalFailure,
    Self::SupplierFailure,
    Self::Warranty,
    Self::Return,
    Self::Complaint,
    Self::ExternalFailure,
    Self::Recall,
    Self::CustomerLoss,
    Self::IncomingInspection,
    Self::ProductionQualityControl,
    Self::TestAndMeasurement,
    Self::QualityControl,
    Self::Training,
    Self::QualityPlanning,
    Self::SupplierEvaluation,
    Self::ImprovementProjects,
    Self::QualitySystem,
  ];

  pub fn is_formula(self) -> bool {
    matches!(self, Self::Scrap | Self::Waste | Self::Rework)
  }

  /// Scrap and Waste are priced from the material catalog.
  pub fn is_material_formula(self) -> bool {
    matches!(self, Self::Scrap | Self::Waste)
  }

  /// Only External Failure records carry a customer name.
  pub fn requires_customer(self) -> bool {
    matches!(self, Self::ExternalFailure)
  }

  pub fn copq_group(self) -> CopqGroup {
    use CostCategory::*;
    match self {
      Scrap | Waste | Rework | InternalQualityControl | FinalDefects
      | InternalFailure | SupplierFailure => CopqGroup::InternalFailure,
      Warranty | Return | Complaint | ExternalFailure | Recall
      | CustomerLoss => CopqGroup::ExternalFailure,
      IncomingInspection | ProductionQualityControl | TestAndMeasurement
      | QualityControl => CopqGroup::Appraisal,
      Training | QualityPlanning | SupplierEvaluation | ImprovementProjects
      | QualitySystem => CopqGroup::Prevention,
    }
  }

  /// The discriminant string stored in the `category` column.
  /// Must match the `rename_all = "snake_case"` serde tags above.
  pub fn as_str(self) -> &'static str {
    use CostCategory::*;
    match self {
      Scrap => "scrap",
      Waste => "waste",
      Rework => "rework",
      InternalQualityControl => "internal_quality_control",
      FinalDefects => "final_defects",
      InternalFailure => "internal_failure",
      SupplierFailure => "supplier_failure",
      Warranty => "warranty",
      Return => "return",
      Complaint => "complaint",
      ExternalFailure => "external_failure",
      Recall => "recall",
      CustomerLoss => "customer_loss",
      IncomingInspection => "incoming_inspection",
      ProductionQualityControl => "production_quality_control",
      TestAndMeasurement => "test_and_measurement",
      QualityControl => "quality_control",
      Training => "training",
      QualityPlanning => "quality_planning",
      SupplierEvaluation => "supplier_evaluation",
      ImprovementProjects => "improvement_projects",
      QualitySystem => "quality_system",
    }
  }

  pub fn parse(s: &str) -> Option<Self> {
    Self::ALL.into_iter().find(|c| c.as_str() == s)
  }

  /// Human-readable label.
  pub fn label(self) -> &'static str {
    use CostCategory::*;
    match self {
      Scrap => "Scrap Cost",
      Waste => "Waste Cost",
      Rework => "Rework Cost",
      InternalQualityControl => "Internal Quality Control Cost",
      FinalDefects => "Final Defects Cost",
      InternalFailure => "Internal Failure Cost",
      SupplierFailure => "Supplier Failure Cost",
      Warranty => "Warranty Cost",
      Return => "Return Cost",
      Complaint => "Complaint Cost",
      ExternalFailure => "External Failure Cost",
      Recall => "Recall Cost",
      CustomerLoss => "Customer Loss Cost",
      IncomingInspection => "Incoming Inspection Cost",
      ProductionQualityControl => "Production Quality Control Cost",
      TestAndMeasurement => "Test and Measurement Cost",
      QualityControl => "Quality Control Cost",
      Training => "Training Cost",
      QualityPlanning => "Quality Planning Cost",
      SupplierEvaluation => "Supplier Evaluation Cost",
      ImprovementProjects => "Improvement Projects Cost",
      QualitySystem => "Quality System Cost",
    }
  }
}

impl std::fmt::Display for CostCategory {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.write_str(self.label())
  }
}

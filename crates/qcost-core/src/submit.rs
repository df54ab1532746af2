//! Submission: assemble a draft and hand the payload to a store.

use tracing::{error, info};
use uuid::Uuid;

use crate::{
  CostEngine, Error, Result, draft::CostDraft, record::CostRecord,
  store::CostStore,
};

/// Whether a submission creates a record or replaces an existing one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SubmitTarget {
  #[default]
  Insert,
  Update(Uuid),
}

/// Validate and assemble `draft`, then persist it in one call.
///
/// Validation errors are returned before the store is touched. A store error
/// becomes [`Error::PersistenceFailure`] carrying the store's message; the
/// submission is not retried.
pub async fn submit<S: CostStore>(
  store: &S,
  engine: &CostEngine,
  draft: CostDraft,
  target: SubmitTarget,
) -> Result<CostRecord> {
  let payload = engine.assemble(draft)?;

  let result = match target {
    SubmitTarget::Insert => store.insert_record(payload).await,
    SubmitTarget::Update(id) => store.update_record(id, payload).await,
  };

  match result {
    Ok(record) => {
      info!(
        record_id = %record.record_id,
        category = record.category().as_str(),
        amount = record.amount(),
        "cost record saved"
      );
      Ok(record)
    }
    Err(e) => {
      error!(?target, "cost record could not be saved: {e}");
      Err(Error::PersistenceFailure(e.to_string()))
    }
  }
}

#[cfg(test)]
mod tests {
  use std::sync::Mutex;

  use chrono::{NaiveDate, Utc};

  use super::*;
  use crate::{
    ErrorKind,
    catalog::Catalogs,
    category::CostCategory,
    draft::{LineItem, Party},
    record::NewCostRecord,
    store::RecordQuery,
  };

  #[derive(Debug, thiserror::Error)]
  #[error("{0}")]
  struct FakeError(String);

  /// Keeps inserted payloads in memory; optionally refuses every write.
  #[derive(Default)]
  struct FakeStore {
    records: Mutex<Vec<NewCostRecord>>,
    refuse:  Option<String>,
  }

  impl FakeStore {
    fn save(&self, id: Uuid, record: NewCostRecord) -> Result<CostRecord, FakeError> {
      if let Some(msg) = &self.refuse {
        return Err(FakeError(msg.clone()));
      }
      self.records.lock().unwrap().push(record.clone());
      let now = Utc::now();
      Ok(CostRecord { record_id: id, recorded_at: now, updated_at: now, data: record })
    }
  }

  impl CostStore for FakeStore {
    type Error = FakeError;

    async fn insert_record(&self, record: NewCostRecord) -> Result<CostRecord, FakeError> {
      self.save(Uuid::new_v4(), record)
    }

    async fn update_record(
      &self,
      id: Uuid,
      record: NewCostRecord,
    ) -> Result<CostRecord, FakeError> {
      self.save(id, record)
    }

    async fn get_record(&self, _id: Uuid) -> Result<Option<CostRecord>, FakeError> {
      Ok(None)
    }

    async fn list_records(&self, _query: &RecordQuery) -> Result<Vec<CostRecord>, FakeError> {
      Ok(vec![])
    }
  }

  fn draft() -> CostDraft {
    let mut d = CostDraft::new(
      CostCategory::Complaint,
      NaiveDate::from_ymd_opt(2025, 4, 1).unwrap(),
    );
    d.line_items = vec![LineItem {
      responsible: Some(Party::unit("Assembly")),
      amount: Some(250.0),
      ..LineItem::default()
    }];
    d
  }

  #[tokio::test]
  async fn valid_draft_is_persisted() {
    let store = FakeStore::default();
    let engine = CostEngine::new(Catalogs::default());
    let record = submit(&store, &engine, draft(), SubmitTarget::Insert)
      .await
      .unwrap();
    assert_eq!(record.amount(), 250.0);
    assert_eq!(store.records.lock().unwrap().len(), 1);
  }

  #[tokio::test]
  async fn invalid_draft_never_reaches_the_store() {
    let store = FakeStore::default();
    let engine = CostEngine::new(Catalogs::default());
    let mut d = draft();
    d.line_items.clear();
    let err = submit(&store, &engine, d, SubmitTarget::Insert)
      .await
      .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::MissingRequiredField);
    assert!(store.records.lock().unwrap().is_empty());
  }

  #[tokio::test]
  async fn store_error_is_reported_verbatim() {
    let store = FakeStore {
      refuse: Some("disk full".into()),
      ..FakeStore::default()
    };
    let engine = CostEngine::new(Catalogs::default());
    let err = submit(&store, &engine, draft(), SubmitTarget::Update(Uuid::new_v4()))
      .await
      .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::PersistenceFailure);
    assert!(err.to_string().contains("disk full"));
  }
}

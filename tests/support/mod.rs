#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use scaffold_permits::permits::{
    AlertGateway, NotifyError, Permit, PermitDraft, PermitStatus, PermitStore, PermitUpdate,
    StoreError,
};

/// In-memory permit collection recording every write so tests can assert
/// which side effects a sweep issued.
#[derive(Default)]
pub struct InMemoryPermitStore {
    records: Mutex<Vec<Permit>>,
    sequence: AtomicU64,
    pub fail_listing: AtomicBool,
    updates: Mutex<Vec<(String, PermitUpdate)>>,
    deletes: Mutex<Vec<String>>,
}

impl InMemoryPermitStore {
    pub fn seeded(permits: Vec<Permit>) -> Self {
        let store = Self::default();
        *store.records.lock().expect("store mutex poisoned") = permits;
        store
    }

    pub fn records(&self) -> Vec<Permit> {
        self.records.lock().expect("store mutex poisoned").clone()
    }

    pub fn updates(&self) -> Vec<(String, PermitUpdate)> {
        self.updates.lock().expect("store mutex poisoned").clone()
    }

    pub fn deletes(&self) -> Vec<String> {
        self.deletes.lock().expect("store mutex poisoned").clone()
    }
}

#[async_trait]
impl PermitStore for InMemoryPermitStore {
    async fn list_all(&self) -> Result<Vec<Permit>, StoreError> {
        if self.fail_listing.load(Ordering::Relaxed) {
            return Err(StoreError::Unavailable("listing disabled".to_string()));
        }
        Ok(self.records())
    }

    async fn create(&self, draft: &PermitDraft) -> Result<Permit, StoreError> {
        let id = self.sequence.fetch_add(1, Ordering::Relaxed);
        let permit = Permit {
            id: Some(format!("mem-{id:04}")),
            area: draft.area.clone(),
            sub_area: draft.sub_area.clone(),
            start_date: draft.start_date.clone(),
            estimated_end_date: draft.estimated_end_date.clone(),
            leader_name: draft.leader_name.clone(),
            executor_name: draft.executor_name.clone(),
            leader_phone: draft.leader_phone.clone(),
            executor_phone: draft.executor_phone.clone(),
            status: draft.status,
        };
        self.records
            .lock()
            .expect("store mutex poisoned")
            .push(permit.clone());
        Ok(permit)
    }

    async fn update(&self, id: &str, update: &PermitUpdate) -> Result<Permit, StoreError> {
        let mut guard = self.records.lock().expect("store mutex poisoned");
        let record = guard
            .iter_mut()
            .find(|record| record.id.as_deref() == Some(id))
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;

        if let Some(status) = update.status {
            record.status = status;
        }
        if let Some(end) = update.estimated_end_date.clone() {
            record.estimated_end_date = end;
        }
        let updated = record.clone();
        drop(guard);

        self.updates
            .lock()
            .expect("store mutex poisoned")
            .push((id.to_string(), update.clone()));
        Ok(updated)
    }

    async fn delete(&self, id: &str) -> Result<(), StoreError> {
        self.records
            .lock()
            .expect("store mutex poisoned")
            .retain(|record| record.id.as_deref() != Some(id));
        self.deletes
            .lock()
            .expect("store mutex poisoned")
            .push(id.to_string());
        Ok(())
    }
}

/// Alert gateway capturing every dispatch attempt; can be flipped into a
/// failing mode to exercise the fire-and-forget path.
#[derive(Default)]
pub struct RecordingAlertGateway {
    pub fail_sends: AtomicBool,
    sent: Mutex<Vec<(String, String)>>,
}

impl RecordingAlertGateway {
    /// Every attempted `(phone, body)` pair, including failed ones.
    pub fn sent(&self) -> Vec<(String, String)> {
        self.sent.lock().expect("alert mutex poisoned").clone()
    }
}

#[async_trait]
impl AlertGateway for RecordingAlertGateway {
    async fn send(&self, phone: &str, body: &str) -> Result<(), NotifyError> {
        self.sent
            .lock()
            .expect("alert mutex poisoned")
            .push((phone.to_string(), body.to_string()));

        if self.fail_sends.load(Ordering::Relaxed) {
            return Err(NotifyError::Transport("gateway offline".to_string()));
        }
        Ok(())
    }
}

pub fn permit(id: &str, start: &str, end: &str) -> Permit {
    Permit {
        id: Some(id.to_string()),
        area: "North Yard".to_string(),
        sub_area: format!("Bay {id}"),
        start_date: start.to_string(),
        estimated_end_date: end.to_string(),
        leader_name: "Dana Leader".to_string(),
        executor_name: "Sam Executor".to_string(),
        leader_phone: format!("{id}-leader"),
        executor_phone: format!("{id}-executor"),
        status: PermitStatus::Active,
    }
}

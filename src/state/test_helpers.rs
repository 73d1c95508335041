use std::collections::VecDeque;
use std::sync::Mutex;

use crate::net::api::{ApiError, RecordApi};
use crate::net::types::{Record, RecordFields};

/// In-memory `RecordApi` that behaves like the remote service and logs calls.
#[derive(Default)]
pub(crate) struct FakeRecordApi {
    records: Mutex<Vec<Record>>,
    calls: Mutex<Vec<String>>,
    failures: Mutex<VecDeque<ApiError>>,
    op_failures: Mutex<Vec<(&'static str, ApiError)>>,
}

impl FakeRecordApi {
    pub(crate) fn with_records(records: Vec<Record>) -> Self {
        Self { records: Mutex::new(records), ..Self::default() }
    }

    /// Make the next call (of any kind) fail with `err`.
    pub(crate) fn fail_next(&self, err: ApiError) {
        self.failures.lock().unwrap().push_back(err);
    }

    /// Make the next call of kind `op` ("list", "create", ...) fail with `err`.
    /// Calls of other kinds go through.
    pub(crate) fn fail_on(&self, op: &'static str, err: ApiError) {
        self.op_failures.lock().unwrap().push((op, err));
    }

    pub(crate) fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub(crate) fn count(&self, op: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.split(' ').next() == Some(op))
            .count()
    }

    fn enter(&self, call: String) -> Result<(), ApiError> {
        let op = call.split(' ').next().unwrap_or_default().to_owned();
        self.calls.lock().unwrap().push(call);
        let mut targeted = self.op_failures.lock().unwrap();
        if let Some(pos) = targeted.iter().position(|(o, _)| *o == op) {
            return Err(targeted.remove(pos).1);
        }
        drop(targeted);
        match self.failures.lock().unwrap().pop_front() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

#[async_trait::async_trait]
impl RecordApi for FakeRecordApi {
    async fn list(&self) -> Result<Vec<Record>, ApiError> {
        self.enter("list".to_owned())?;
        Ok(self.records.lock().unwrap().clone())
    }

    async fn create(&self, record: &Record) -> Result<(), ApiError> {
        self.enter(format!("create {}", record.id))?;
        let mut records = self.records.lock().unwrap();
        if records.iter().any(|r| r.id == record.id) {
            return Err(ApiError::Remote { status: 409, body: "duplicate id".to_owned() });
        }
        records.push(record.clone());
        Ok(())
    }

    async fn update(&self, id: &str, fields: &RecordFields) -> Result<(), ApiError> {
        self.enter(format!("update {id}"))?;
        let mut records = self.records.lock().unwrap();
        let Some(existing) = records.iter_mut().find(|r| r.id == id) else {
            return Err(ApiError::Remote { status: 404, body: "not found".to_owned() });
        };
        existing.fields = fields.clone();
        Ok(())
    }

    async fn delete(&self, id: &str) -> Result<(), ApiError> {
        self.enter(format!("delete {id}"))?;
        let mut records = self.records.lock().unwrap();
        let before = records.len();
        records.retain(|r| r.id != id);
        if records.len() == before {
            return Err(ApiError::Remote { status: 404, body: "not found".to_owned() });
        }
        Ok(())
    }
}

pub(crate) fn fields(name: &str, description: &str, price: &str, note: &str) -> RecordFields {
    RecordFields {
        name: name.to_owned(),
        description: description.to_owned(),
        price: price.to_owned(),
        note: note.to_owned(),
    }
}

pub(crate) fn record(id: &str, name: &str) -> Record {
    Record { id: id.to_owned(), fields: fields(name, "desc", "1.00", "note") }
}

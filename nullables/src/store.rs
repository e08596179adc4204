//! Nullable store: thread-safe in-memory storage for testing.
//!
//! All state sits behind one mutex, so every closure-based update runs
//! with the same isolation a single-writer LMDB transaction gives.

use attest_audit::VerificationRequest;
use attest_evidence::EvidenceSet;
use attest_quota::{CreditAccount, CreditTransaction, QuotaError, UsageRecord, UsageWindows};
use attest_records::{EditSuggestion, Record, RecordStatus};
use attest_schema::{Project, RecordType};
use attest_store::{
    charge_usage, AuditStore, CommittedUsage, MetaStore, QuotaStore, RecordStore, SchemaStore,
    Sequence, StoreError, SuggestionStore, UsageKey,
};
use attest_types::{
    EditSuggestionId, ProjectId, RecordId, RecordTypeId, RequestId, Timestamp, TransactionId,
    UsageId, UserId,
};
use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, MutexGuard};

#[derive(Default)]
struct State {
    meta: HashMap<String, Vec<u8>>,
    sequences: HashMap<Sequence, u64>,
    schema_version: u32,
    projects: BTreeMap<ProjectId, Project>,
    record_types: BTreeMap<RecordTypeId, RecordType>,
    records: BTreeMap<RecordId, Record>,
    evidence: BTreeMap<RecordId, EvidenceSet>,
    requests: BTreeMap<RequestId, VerificationRequest>,
    suggestions: BTreeMap<EditSuggestionId, EditSuggestion>,
    usage: Vec<UsageRecord>,
    accounts: BTreeMap<ProjectId, CreditAccount>,
    ledger: BTreeMap<ProjectId, Vec<CreditTransaction>>,
}

impl State {
    fn next(&mut self, sequence: Sequence) -> u64 {
        let counter = self.sequences.entry(sequence).or_insert(0);
        *counter += 1;
        *counter
    }
}

/// An in-memory implementation of every store trait.
#[derive(Default)]
pub struct NullStore {
    state: Mutex<State>,
}

impl NullStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().expect("null store lock poisoned")
    }

    /// Seed a usage event directly, bypassing quota evaluation.
    pub fn insert_usage(&self, usage: UsageRecord) {
        self.state().usage.push(usage);
    }

    /// Overwrite a ledger entry in place, as an attacker with disk access
    /// would.
    pub fn tamper_transaction(&self, project: ProjectId, index: usize, amount: i64) {
        if let Some(tx) = self
            .state()
            .ledger
            .get_mut(&project)
            .and_then(|l| l.get_mut(index))
        {
            tx.amount = amount;
        }
    }

    pub fn usage_count(&self) -> usize {
        self.state().usage.len()
    }
}

fn not_found(what: impl std::fmt::Display) -> StoreError {
    StoreError::NotFound(what.to_string())
}

impl MetaStore for NullStore {
    fn put_meta(&self, key: &str, value: &[u8]) -> Result<(), StoreError> {
        self.state().meta.insert(key.to_string(), value.to_vec());
        Ok(())
    }

    fn get_meta(&self, key: &str) -> Result<Vec<u8>, StoreError> {
        self.state()
            .meta
            .get(key)
            .cloned()
            .ok_or_else(|| not_found(format!("meta key '{key}'")))
    }

    fn next_id(&self, sequence: Sequence) -> Result<u64, StoreError> {
        Ok(self.state().next(sequence))
    }

    fn get_schema_version(&self) -> Result<u32, StoreError> {
        Ok(self.state().schema_version)
    }

    fn set_schema_version(&self, version: u32) -> Result<(), StoreError> {
        self.state().schema_version = version;
        Ok(())
    }
}

impl SchemaStore for NullStore {
    fn insert_project(&self, project: &Project) -> Result<(), StoreError> {
        let mut state = self.state();
        if state.projects.contains_key(&project.id) {
            return Err(StoreError::Duplicate(project.id.to_string()));
        }
        state.projects.insert(project.id, project.clone());
        Ok(())
    }

    fn get_project(&self, id: ProjectId) -> Result<Project, StoreError> {
        self.state()
            .projects
            .get(&id)
            .cloned()
            .ok_or_else(|| not_found(id))
    }

    fn insert_record_type(&self, record_type: &RecordType) -> Result<(), StoreError> {
        let mut state = self.state();
        if state.record_types.contains_key(&record_type.id) {
            return Err(StoreError::Duplicate(record_type.id.to_string()));
        }
        state.record_types.insert(record_type.id, record_type.clone());
        Ok(())
    }

    fn get_record_type(&self, id: RecordTypeId) -> Result<RecordType, StoreError> {
        self.state()
            .record_types
            .get(&id)
            .cloned()
            .ok_or_else(|| not_found(id))
    }

    fn record_types(&self, project: ProjectId) -> Result<Vec<RecordType>, StoreError> {
        Ok(self
            .state()
            .record_types
            .values()
            .filter(|rt| rt.project_id == project)
            .cloned()
            .collect())
    }

    fn update_record_type<T, E, F>(&self, id: RecordTypeId, f: F) -> Result<(RecordType, T), E>
    where
        E: From<StoreError>,
        F: FnOnce(&mut RecordType) -> Result<T, E>,
    {
        let mut state = self.state();
        let mut record_type = state
            .record_types
            .get(&id)
            .cloned()
            .ok_or_else(|| not_found(id))?;
        let out = f(&mut record_type)?;
        state.record_types.insert(id, record_type.clone());
        Ok((record_type, out))
    }
}

impl RecordStore for NullStore {
    fn insert_record(&self, record: &Record, evidence: &EvidenceSet) -> Result<(), StoreError> {
        let mut state = self.state();
        if state.records.contains_key(&record.id) {
            return Err(StoreError::Duplicate(record.id.to_string()));
        }
        state.records.insert(record.id, record.clone());
        state.evidence.insert(record.id, evidence.clone());
        Ok(())
    }

    fn get_record(&self, id: RecordId) -> Result<Record, StoreError> {
        self.state()
            .records
            .get(&id)
            .cloned()
            .ok_or_else(|| not_found(id))
    }

    fn get_evidence(&self, id: RecordId) -> Result<EvidenceSet, StoreError> {
        self.state()
            .evidence
            .get(&id)
            .cloned()
            .ok_or_else(|| not_found(format!("evidence of {id}")))
    }

    fn records_in_status(
        &self,
        project: ProjectId,
        status: RecordStatus,
    ) -> Result<Vec<Record>, StoreError> {
        Ok(self
            .state()
            .records
            .values()
            .filter(|r| r.project_id == project && r.status == status)
            .cloned()
            .collect())
    }

    fn update_record<T, E, F>(&self, id: RecordId, f: F) -> Result<(Record, T), E>
    where
        E: From<StoreError>,
        F: FnOnce(&mut Record, &mut EvidenceSet) -> Result<T, E>,
    {
        let mut state = self.state();
        let mut record = state.records.get(&id).cloned().ok_or_else(|| not_found(id))?;
        let mut evidence = state
            .evidence
            .get(&id)
            .cloned()
            .unwrap_or_else(|| EvidenceSet::new(id));
        let out = f(&mut record, &mut evidence)?;
        record.revision += 1;
        state.records.insert(id, record.clone());
        state.evidence.insert(id, evidence);
        Ok((record, out))
    }
}

impl AuditStore for NullStore {
    fn create_request<E, F>(&self, record: RecordId, f: F) -> Result<VerificationRequest, E>
    where
        E: From<StoreError>,
        F: FnOnce(&[VerificationRequest]) -> Result<VerificationRequest, E>,
    {
        let mut state = self.state();
        let existing: Vec<VerificationRequest> = state
            .requests
            .values()
            .filter(|r| r.record_id == record)
            .cloned()
            .collect();
        let request = f(&existing)?;
        if state.requests.contains_key(&request.id) {
            return Err(StoreError::Duplicate(request.id.to_string()).into());
        }
        state.requests.insert(request.id, request.clone());
        Ok(request)
    }

    fn get_request(&self, id: RequestId) -> Result<VerificationRequest, StoreError> {
        self.state()
            .requests
            .get(&id)
            .cloned()
            .ok_or_else(|| not_found(id))
    }

    fn requests_for_record(
        &self,
        record: RecordId,
    ) -> Result<Vec<VerificationRequest>, StoreError> {
        Ok(self
            .state()
            .requests
            .values()
            .filter(|r| r.record_id == record)
            .cloned()
            .collect())
    }

    fn update_request<T, E, F>(&self, id: RequestId, f: F) -> Result<(VerificationRequest, T), E>
    where
        E: From<StoreError>,
        F: FnOnce(&mut VerificationRequest) -> Result<T, E>,
    {
        let mut state = self.state();
        let mut request = state.requests.get(&id).cloned().ok_or_else(|| not_found(id))?;
        let out = f(&mut request)?;
        state.requests.insert(id, request.clone());
        Ok((request, out))
    }
}

impl SuggestionStore for NullStore {
    fn insert_suggestion(&self, suggestion: &EditSuggestion) -> Result<(), StoreError> {
        let mut state = self.state();
        if state.suggestions.contains_key(&suggestion.id) {
            return Err(StoreError::Duplicate(suggestion.id.to_string()));
        }
        state.suggestions.insert(suggestion.id, suggestion.clone());
        Ok(())
    }

    fn get_suggestion(&self, id: EditSuggestionId) -> Result<EditSuggestion, StoreError> {
        self.state()
            .suggestions
            .get(&id)
            .cloned()
            .ok_or_else(|| not_found(id))
    }

    fn suggestions_for_record(&self, record: RecordId) -> Result<Vec<EditSuggestion>, StoreError> {
        Ok(self
            .state()
            .suggestions
            .values()
            .filter(|s| s.record_id == record)
            .cloned()
            .collect())
    }

    fn update_suggestion<T, E, F>(
        &self,
        id: EditSuggestionId,
        f: F,
    ) -> Result<(EditSuggestion, Record, T), E>
    where
        E: From<StoreError>,
        F: FnOnce(&mut EditSuggestion, &mut Record) -> Result<T, E>,
    {
        let mut state = self.state();
        let mut suggestion = state
            .suggestions
            .get(&id)
            .cloned()
            .ok_or_else(|| not_found(id))?;
        let before = state
            .records
            .get(&suggestion.record_id)
            .cloned()
            .ok_or_else(|| not_found(suggestion.record_id))?;
        let mut record = before.clone();
        let out = f(&mut suggestion, &mut record)?;
        if record != before {
            record.revision += 1;
            state.records.insert(record.id, record.clone());
        }
        state.suggestions.insert(id, suggestion.clone());
        Ok((suggestion, record, out))
    }
}

impl QuotaStore for NullStore {
    fn usage_windows(&self, key: &UsageKey, now: Timestamp) -> Result<UsageWindows, StoreError> {
        Ok(tally(&self.state(), key, now))
    }

    fn account(&self, project: ProjectId) -> Result<CreditAccount, StoreError> {
        Ok(self
            .state()
            .accounts
            .get(&project)
            .cloned()
            .unwrap_or_else(|| CreditAccount::new(project)))
    }

    fn transactions(&self, project: ProjectId) -> Result<Vec<CreditTransaction>, StoreError> {
        Ok(self.state().ledger.get(&project).cloned().unwrap_or_default())
    }

    fn commit_usage<E, F>(
        &self,
        key: &UsageKey,
        meta: Vec<(String, String)>,
        now: Timestamp,
        evaluate: F,
    ) -> Result<CommittedUsage, E>
    where
        E: From<StoreError> + From<QuotaError>,
        F: FnOnce(&UsageWindows, &CreditAccount) -> Result<u64, E>,
    {
        let mut state = self.state();
        let windows = tally(&state, key, now);
        let mut account = state
            .accounts
            .get(&key.project)
            .cloned()
            .unwrap_or_else(|| CreditAccount::new(key.project));
        let cost = evaluate(&windows, &account)?;
        let usage_id = UsageId::new(state.next(Sequence::Usage));
        let tx_id = TransactionId::new(state.next(Sequence::Transaction));
        let (usage, transaction) =
            charge_usage(&mut account, usage_id, tx_id, key, meta, cost, now)?;
        state.usage.push(usage.clone());
        if let Some(tx) = &transaction {
            state.ledger.entry(key.project).or_default().push(tx.clone());
        }
        let balance = account.balance;
        state.accounts.insert(key.project, account);
        Ok(CommittedUsage {
            usage,
            transaction,
            balance,
        })
    }

    fn grant_credits<E>(
        &self,
        project: ProjectId,
        amount: u64,
        actor: &UserId,
        memo: &str,
        at: Timestamp,
    ) -> Result<CreditTransaction, E>
    where
        E: From<StoreError> + From<QuotaError>,
    {
        let mut state = self.state();
        let mut account = state
            .accounts
            .get(&project)
            .cloned()
            .unwrap_or_else(|| CreditAccount::new(project));
        let tx_id = TransactionId::new(state.next(Sequence::Transaction));
        let tx = account.grant(tx_id, amount, actor, memo, at)?;
        state.ledger.entry(project).or_default().push(tx.clone());
        state.accounts.insert(project, account);
        Ok(tx)
    }
}

fn tally(state: &State, key: &UsageKey, now: Timestamp) -> UsageWindows {
    UsageWindows::tally(
        state
            .usage
            .iter()
            .filter(|u| u.user == key.user && u.project == key.project && u.operation == key.operation)
            .map(|u| u.at),
        now,
    )
}

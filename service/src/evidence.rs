//! Quotes, sources and field links.
//!
//! Every removal re-checks the record's verified fields in the same write:
//! a field that loses its last supporting quote loses its verified mark.

use attest_evidence::{EvidenceSet, Quote, Source, SourceDetached, SourceType};
use attest_records::{Record, RecordError, RecordStatus};
use attest_schema::RecordType;
use attest_store::{Sequence, Store};
use attest_types::{Actor, Clock, QuoteId, RecordId, SourceId};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::service::{refused, require, same_project};
use crate::{AttestService, ServiceError};

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewQuote {
    pub text: String,
    #[serde(default)]
    pub source: Option<SourceId>,
    /// Page or paragraph reference.
    #[serde(default)]
    pub locator: Option<String>,
    /// Field slugs to link immediately.
    #[serde(default)]
    pub fields: Vec<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewSource {
    #[serde(default)]
    pub url: String,
    pub title: String,
    #[serde(default)]
    pub source_type: SourceType,
    #[serde(default)]
    pub notes: Option<String>,
}

fn check_editable(actor: &Actor, record: &Record) -> Result<(), ServiceError> {
    same_project(actor, record.project_id)?;
    require(actor.role.can_edit_evidence(), actor, "edit evidence")?;
    if record.status == RecordStatus::Rejected {
        return Err(RecordError::NotEditable(record.status.to_string()).into());
    }
    Ok(())
}

fn check_slug(record_type: &RecordType, slug: &str) -> Result<(), ServiceError> {
    match record_type.field(slug) {
        Some(_) => Ok(()),
        None => Err(RecordError::UnknownField(slug.to_string()).into()),
    }
}

impl<S: Store, C: Clock> AttestService<S, C> {
    pub fn attach_quote(
        &self,
        actor: &Actor,
        record: RecordId,
        new: NewQuote,
    ) -> Result<Quote, ServiceError> {
        let record_type = self.record_type_of(record)?;
        let id = QuoteId::new(self.next_id(Sequence::Quote)?);
        let now = self.now();
        let (_, quote) = self
            .store
            .update_record::<Quote, ServiceError, _>(record, |rec, evidence| {
                check_editable(actor, rec)?;
                for slug in &new.fields {
                    check_slug(&record_type, slug)?;
                }
                let mut quote = Quote::new(id, rec.id, new.text, actor.id.clone(), now);
                quote.source_id = new.source;
                quote.locator = new.locator;
                quote.linked_fields = new.fields.into_iter().collect();
                evidence.attach_quote(quote.clone())?;
                Ok(quote)
            })
            .map_err(|e| refused("attach_quote", &actor.id, e))?;
        info!(record = %record, quote = %id, links = quote.linked_fields.len(), "quote attached");
        Ok(quote)
    }

    /// Delete a quote and all of its links. Returns the quote and the fields
    /// whose verification was revoked as a result.
    pub fn detach_quote(
        &self,
        actor: &Actor,
        record: RecordId,
        quote: QuoteId,
    ) -> Result<(Quote, Vec<String>), ServiceError> {
        let (removed, revoked) = self.edit_evidence(actor, record, "detach_quote", |_, evidence| {
            Ok(evidence.detach_quote(quote)?)
        })?;
        info!(record = %record, quote = %quote, revoked = ?revoked, "quote detached");
        Ok((removed, revoked))
    }

    pub fn attach_source(
        &self,
        actor: &Actor,
        record: RecordId,
        new: NewSource,
    ) -> Result<Source, ServiceError> {
        let id = SourceId::new(self.next_id(Sequence::Source)?);
        let now = self.now();
        let (_, source) = self
            .store
            .update_record::<Source, ServiceError, _>(record, |rec, evidence| {
                check_editable(actor, rec)?;
                let source = Source {
                    id,
                    record_id: rec.id,
                    url: new.url.trim().to_string(),
                    title: new.title.trim().to_string(),
                    source_type: new.source_type,
                    notes: new.notes,
                    added_by: actor.id.clone(),
                    added_at: now,
                };
                evidence.attach_source(source.clone())?;
                Ok(source)
            })
            .map_err(|e| refused("attach_source", &actor.id, e))?;
        info!(record = %record, source = %id, "source attached");
        Ok(source)
    }

    /// Delete a source. Quotes that cited it keep their text but lose the
    /// citation, which can revoke fields that require a sourced quote.
    pub fn detach_source(
        &self,
        actor: &Actor,
        record: RecordId,
        source: SourceId,
    ) -> Result<(SourceDetached, Vec<String>), ServiceError> {
        let (detached, revoked) =
            self.edit_evidence(actor, record, "detach_source", |_, evidence| {
                Ok(evidence.detach_source(source)?)
            })?;
        info!(
            record = %record,
            source = %source,
            orphaned = detached.orphaned_quotes.len(),
            revoked = ?revoked,
            "source detached"
        );
        Ok((detached, revoked))
    }

    /// Link a quote to a field. Idempotent; returns whether a link was added.
    pub fn link_quote(
        &self,
        actor: &Actor,
        record: RecordId,
        quote: QuoteId,
        slug: &str,
    ) -> Result<bool, ServiceError> {
        let (added, _) = self.edit_evidence(actor, record, "link_quote", |record_type, evidence| {
            check_slug(record_type, slug)?;
            Ok(evidence.link(quote, slug)?)
        })?;
        if added {
            info!(record = %record, quote = %quote, slug, "quote linked");
        }
        Ok(added)
    }

    /// Returns whether a link was removed and the fields revoked by it.
    pub fn unlink_quote(
        &self,
        actor: &Actor,
        record: RecordId,
        quote: QuoteId,
        slug: &str,
    ) -> Result<(bool, Vec<String>), ServiceError> {
        let (removed, revoked) = self.edit_evidence(actor, record, "unlink_quote", |_, evidence| {
            Ok(evidence.unlink(quote, slug)?)
        })?;
        if removed {
            info!(record = %record, quote = %quote, slug, revoked = ?revoked, "quote unlinked");
        }
        Ok((removed, revoked))
    }

    pub fn quotes_for_field(&self, record: RecordId, slug: &str) -> Result<Vec<Quote>, ServiceError> {
        let evidence = self.store.get_evidence(record)?;
        Ok(evidence.quotes_for_field(slug).into_iter().cloned().collect())
    }

    pub fn unlinked_quotes(&self, record: RecordId) -> Result<Vec<Quote>, ServiceError> {
        let evidence = self.store.get_evidence(record)?;
        Ok(evidence.unlinked_quotes().into_iter().cloned().collect())
    }

    pub fn sources_for_record(&self, record: RecordId) -> Result<Vec<Source>, ServiceError> {
        Ok(self.store.get_evidence(record)?.sources().to_vec())
    }

    /// Run an evidence edit and revoke any verification it leaves unsupported.
    fn edit_evidence<T>(
        &self,
        actor: &Actor,
        record: RecordId,
        operation: &'static str,
        edit: impl FnOnce(&RecordType, &mut EvidenceSet) -> Result<T, ServiceError>,
    ) -> Result<(T, Vec<String>), ServiceError> {
        let record_type = self.record_type_of(record)?;
        let now = self.now();
        let (_, out) = self
            .store
            .update_record::<(T, Vec<String>), ServiceError, _>(record, |rec, evidence| {
                check_editable(actor, rec)?;
                let out = edit(&record_type, evidence)?;
                let revoked =
                    self.workflow
                        .revoke_unsupported(&record_type, evidence, rec, &actor.id, now);
                Ok((out, revoked))
            })
            .map_err(|e| refused(operation, &actor.id, e))?;
        Ok(out)
    }
}

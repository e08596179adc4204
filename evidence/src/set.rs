//! All evidence belonging to one record.

use crate::error::EvidenceError;
use crate::quote::Quote;
use crate::source::Source;
use attest_types::{QuoteId, RecordId, SourceId};
use serde::{Deserialize, Serialize};

/// What changed when a source was detached.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SourceDetached {
    pub source: Source,
    /// Quotes that cited the source and now cite nothing.
    pub orphaned_quotes: Vec<QuoteId>,
}

/// Quotes and sources of a single record.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvidenceSet {
    pub record_id: RecordId,
    #[serde(default)]
    pub quotes: Vec<Quote>,
    #[serde(default)]
    pub sources: Vec<Source>,
}

impl EvidenceSet {
    pub fn new(record_id: RecordId) -> Self {
        Self {
            record_id,
            quotes: Vec::new(),
            sources: Vec::new(),
        }
    }

    pub fn quote(&self, id: QuoteId) -> Option<&Quote> {
        self.quotes.iter().find(|q| q.id == id)
    }

    pub fn source(&self, id: SourceId) -> Option<&Source> {
        self.sources.iter().find(|s| s.id == id)
    }

    fn quote_mut(&mut self, id: QuoteId) -> Result<&mut Quote, EvidenceError> {
        self.quotes
            .iter_mut()
            .find(|q| q.id == id)
            .ok_or(EvidenceError::QuoteNotFound(id))
    }

    pub fn attach_quote(&mut self, quote: Quote) -> Result<(), EvidenceError> {
        if quote.text.trim().is_empty() {
            return Err(EvidenceError::EmptyQuote);
        }
        if self.quote(quote.id).is_some() {
            return Err(EvidenceError::Duplicate(quote.id.to_string()));
        }
        if let Some(source) = quote.source_id {
            if self.source(source).is_none() {
                return Err(EvidenceError::SourceNotFound(source));
            }
        }
        if quote.linked_fields.iter().any(|s| s.trim().is_empty()) {
            return Err(EvidenceError::EmptySlug);
        }
        self.quotes.push(quote);
        Ok(())
    }

    /// Remove a quote together with all of its field links.
    pub fn detach_quote(&mut self, id: QuoteId) -> Result<Quote, EvidenceError> {
        let index = self
            .quotes
            .iter()
            .position(|q| q.id == id)
            .ok_or(EvidenceError::QuoteNotFound(id))?;
        Ok(self.quotes.remove(index))
    }

    pub fn attach_source(&mut self, source: Source) -> Result<(), EvidenceError> {
        source.check().map_err(EvidenceError::InvalidSource)?;
        if self.source(source.id).is_some() {
            return Err(EvidenceError::Duplicate(source.id.to_string()));
        }
        self.sources.push(source);
        Ok(())
    }

    /// Remove a source; quotes citing it keep their text but lose the citation.
    pub fn detach_source(&mut self, id: SourceId) -> Result<SourceDetached, EvidenceError> {
        let index = self
            .sources
            .iter()
            .position(|s| s.id == id)
            .ok_or(EvidenceError::SourceNotFound(id))?;
        let source = self.sources.remove(index);
        let mut orphaned_quotes = Vec::new();
        for quote in &mut self.quotes {
            if quote.source_id == Some(id) {
                quote.source_id = None;
                orphaned_quotes.push(quote.id);
            }
        }
        Ok(SourceDetached {
            source,
            orphaned_quotes,
        })
    }

    /// Point a quote at a different source, or at none.
    pub fn cite(&mut self, quote: QuoteId, source: Option<SourceId>) -> Result<(), EvidenceError> {
        if let Some(source) = source {
            if self.source(source).is_none() {
                return Err(EvidenceError::SourceNotFound(source));
            }
        }
        self.quote_mut(quote)?.source_id = source;
        Ok(())
    }

    /// Link a quote to a field. Returns whether the link is new.
    pub fn link(&mut self, quote: QuoteId, slug: &str) -> Result<bool, EvidenceError> {
        if slug.trim().is_empty() {
            return Err(EvidenceError::EmptySlug);
        }
        Ok(self.quote_mut(quote)?.linked_fields.insert(slug.to_string()))
    }

    /// Unlink a quote from a field. Returns whether a link was removed.
    pub fn unlink(&mut self, quote: QuoteId, slug: &str) -> Result<bool, EvidenceError> {
        Ok(self.quote_mut(quote)?.linked_fields.remove(slug))
    }

    pub fn quotes_for_field(&self, slug: &str) -> Vec<&Quote> {
        self.quotes.iter().filter(|q| q.supports(slug)).collect()
    }

    /// Quotes not yet linked to any field.
    pub fn unlinked_quotes(&self) -> Vec<&Quote> {
        self.quotes
            .iter()
            .filter(|q| q.linked_fields.is_empty())
            .collect()
    }

    pub fn sources(&self) -> &[Source] {
        &self.sources
    }

    /// Whether some linked quote supports `slug`.
    ///
    /// With `requires_source`, the quote must cite a source that has a URL.
    pub fn field_support(&self, slug: &str, requires_source: bool) -> bool {
        self.quotes_for_field(slug).into_iter().any(|q| {
            !requires_source
                || q.source_id
                    .and_then(|id| self.source(id))
                    .is_some_and(Source::has_url)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::SourceType;
    use attest_types::{Timestamp, UserId};

    fn set() -> EvidenceSet {
        EvidenceSet::new(RecordId::new(1))
    }

    fn quote(id: u64, text: &str) -> Quote {
        Quote::new(
            QuoteId::new(id),
            RecordId::new(1),
            text,
            UserId::from("ana"),
            Timestamp::new(10),
        )
    }

    fn source(id: u64, url: &str) -> Source {
        Source {
            id: SourceId::new(id),
            record_id: RecordId::new(1),
            url: url.to_string(),
            title: "Coroner report".into(),
            source_type: SourceType::Official,
            notes: None,
            added_by: UserId::from("ana"),
            added_at: Timestamp::new(10),
        }
    }

    #[test]
    fn link_is_idempotent() {
        let mut ev = set();
        ev.attach_quote(quote(1, "He was 34.")).unwrap();
        assert!(ev.link(QuoteId::new(1), "age").unwrap());
        assert!(!ev.link(QuoteId::new(1), "age").unwrap());
        assert_eq!(ev.quotes_for_field("age").len(), 1);
        assert!(ev.unlink(QuoteId::new(1), "age").unwrap());
        assert!(!ev.unlink(QuoteId::new(1), "age").unwrap());
        assert_eq!(ev.unlinked_quotes().len(), 1);
    }

    #[test]
    fn deleting_quote_drops_its_links() {
        let mut ev = set();
        ev.attach_quote(quote(1, "a")).unwrap();
        ev.attach_quote(quote(2, "b")).unwrap();
        ev.link(QuoteId::new(1), "age").unwrap();
        ev.link(QuoteId::new(2), "age").unwrap();
        ev.detach_quote(QuoteId::new(1)).unwrap();
        let remaining: Vec<QuoteId> = ev.quotes_for_field("age").iter().map(|q| q.id).collect();
        assert_eq!(remaining, vec![QuoteId::new(2)]);
    }

    #[test]
    fn quote_must_cite_known_source() {
        let mut ev = set();
        let err = ev
            .attach_quote(quote(1, "x").with_source(SourceId::new(9)))
            .unwrap_err();
        assert!(matches!(err, EvidenceError::SourceNotFound(_)));
        assert!(matches!(
            ev.attach_quote(quote(2, "   ")),
            Err(EvidenceError::EmptyQuote)
        ));
    }

    #[test]
    fn field_support_respects_source_requirement() {
        let mut ev = set();
        ev.attach_source(source(1, "")).unwrap();
        ev.attach_source(source(2, "https://example.org/report.pdf"))
            .unwrap();
        ev.attach_quote(quote(1, "x").with_source(SourceId::new(1)))
            .unwrap();
        ev.link(QuoteId::new(1), "cause").unwrap();

        assert!(ev.field_support("cause", false));
        assert!(!ev.field_support("cause", true));

        ev.cite(QuoteId::new(1), Some(SourceId::new(2))).unwrap();
        assert!(ev.field_support("cause", true));
        assert!(!ev.field_support("age", false));
    }

    #[test]
    fn detaching_source_clears_citations() {
        let mut ev = set();
        ev.attach_source(source(1, "https://example.org")).unwrap();
        ev.attach_quote(quote(1, "x").with_source(SourceId::new(1)))
            .unwrap();
        let detached = ev.detach_source(SourceId::new(1)).unwrap();
        assert_eq!(detached.orphaned_quotes, vec![QuoteId::new(1)]);
        assert_eq!(ev.quote(QuoteId::new(1)).unwrap().source_id, None);
    }

    #[test]
    fn source_needs_title_or_valid_url() {
        let mut ev = set();
        let mut s = source(1, "");
        s.title = " ".into();
        assert!(ev.attach_source(s).is_err());
        assert!(ev.attach_source(source(2, "example.org")).is_err());
    }
}

use proptest::prelude::*;
use std::collections::BTreeSet;

use attest_evidence::{EvidenceSet, Quote};
use attest_types::{QuoteId, RecordId, Timestamp, UserId};

fn slug() -> impl Strategy<Value = String> {
    "[a-e]{1,3}"
}

proptest! {
    /// Linking then unlinking a slug restores the quote's links exactly.
    #[test]
    fn link_then_unlink_round_trips(
        existing in prop::collection::btree_set(slug(), 0..5),
        target in slug(),
    ) {
        let mut ev = EvidenceSet::new(RecordId::new(1));
        let mut quote = Quote::new(
            QuoteId::new(1),
            RecordId::new(1),
            "text",
            UserId::from("ana"),
            Timestamp::new(0),
        );
        quote.linked_fields = existing.clone();
        ev.attach_quote(quote).unwrap();

        let was_linked = existing.contains(&target);
        let added = ev.link(QuoteId::new(1), &target).unwrap();
        prop_assert_eq!(added, !was_linked);
        if added {
            ev.unlink(QuoteId::new(1), &target).unwrap();
        }
        let after: &BTreeSet<String> = &ev.quote(QuoteId::new(1)).unwrap().linked_fields;
        prop_assert_eq!(after, &existing);
    }

    /// After a quote is detached no field lists it as support.
    #[test]
    fn detached_quote_leaves_no_links(
        links in prop::collection::vec(slug(), 1..5),
    ) {
        let mut ev = EvidenceSet::new(RecordId::new(1));
        ev.attach_quote(Quote::new(
            QuoteId::new(7),
            RecordId::new(1),
            "text",
            UserId::from("ana"),
            Timestamp::new(0),
        ))
        .unwrap();
        for slug in &links {
            ev.link(QuoteId::new(7), slug).unwrap();
        }
        ev.detach_quote(QuoteId::new(7)).unwrap();
        for slug in &links {
            prop_assert!(ev.quotes_for_field(slug).is_empty());
        }
    }
}

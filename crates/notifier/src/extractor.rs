use std::collections::BTreeSet;

use chainwatch_domain::model::{normalize_address, TriggeredBy, WebhookEvent};

/// Normalized addresses whose watch registration produced this event.
pub type AddressSet = BTreeSet<String>;

/// Collects `triggered_by` addresses from every entry list of the event.
///
/// Entries without `triggered_by` contribute nothing; an empty result is valid
/// and means no watched address can be attributed.
pub fn extract_addresses(event: &WebhookEvent) -> AddressSet {
    let mut addresses = AddressSet::new();
    collect(&mut addresses, &event.txs);
    collect(&mut addresses, &event.txs_internal);
    collect(&mut addresses, &event.logs);
    collect(&mut addresses, &event.erc20_transfers);
    collect(&mut addresses, &event.nft_transfers);
    addresses
}

fn collect<T: TriggeredBy>(addresses: &mut AddressSet, entries: &[T]) {
    for entry in entries {
        addresses.extend(
            entry
                .triggered_by()
                .iter()
                .map(|address| normalize_address(address))
                .filter(|address| !address.is_empty()),
        );
    }
}

use chrono::{DateTime, Utc};

use crate::ecs::RideSession;
use crate::pricing::{price, RideCatalog};
use crate::records::{record_trip_receipt, RideReceipt};
use crate::store::KeyValueStore;

/// Receipt for the session's trip. Uses the fare locked at confirmation; a
/// session confirmed without one is priced from the freshest estimate.
pub fn build_receipt(
    session: &RideSession,
    catalog: &RideCatalog,
    when: DateTime<Utc>,
) -> RideReceipt {
    let fare = session.locked_fare.or_else(|| {
        let option = catalog.get(&session.selected_option)?;
        let estimate = session.estimates.freshest()?;
        Some(price(option, &estimate))
    });
    let subtitle = &session.destination.subtitle;
    RideReceipt {
        dest_name: session.destination.name.clone(),
        dest_subtitle: (!subtitle.is_empty()).then(|| subtitle.clone()),
        price: fare.map(|fare| fare.to_string()),
        when,
    }
}

/// Write the receipt to `lastRide` and `rideHistory`.
pub fn persist_trip_receipt(
    session: &RideSession,
    catalog: &RideCatalog,
    store: &dyn KeyValueStore,
) {
    let receipt = build_receipt(session, catalog, Utc::now());
    record_trip_receipt(store, &receipt);
}

//! Simulate command implementation.
//!
//! Wires a credential endpoint and a reader endpoint through the
//! loopback link against the real on-disk store, with the authority
//! forced offline. Useful for exercising a device's cached rules
//! without hardware.

use chrono::{NaiveTime, Utc};
use std::path::Path;
use std::sync::Arc;
use tapgate_core::{
    CachedRule, Clock, ControlPointId, CredentialId, HolderId, Identity, SystemClock,
};
use tapgate_protocol::{
    CredentialConfig, CredentialEndpoint, LoopbackLink, ReaderConfig, ReaderEndpoint,
    TransactionOutcome,
};
use tapgate_store::LocalStore;
use tapgate_sync::MockAuthority;

fn weekday_rule(holder: HolderId, control_point: ControlPointId) -> Option<CachedRule> {
    Some(CachedRule {
        holder,
        control_point,
        allowed_days: [1u8, 2, 3, 4, 5].into_iter().collect(),
        start: NaiveTime::from_hms_opt(9, 0, 0)?,
        end: NaiveTime::from_hms_opt(17, 0, 0)?,
        last_synced_at: Utc::now(),
    })
}

/// Runs the simulate command.
pub fn run(
    path: &Path,
    credential: u64,
    holder: u64,
    control_point: u64,
    seed_weekday_rule: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let store = LocalStore::open(path)?;
    let holder = HolderId::new(holder);
    let control_point = ControlPointId::new(control_point);

    if seed_weekday_rule {
        let rule = weekday_rule(holder, control_point).ok_or("invalid seed rule window")?;
        store.rules().replace_all(vec![rule])?;
        println!("seeded weekday rule for {holder} at {control_point}");
    }

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let authority = Arc::new(MockAuthority::new());
    authority.set_reachable(false); // force the offline path

    let (reader, _notices) = ReaderEndpoint::new(
        ReaderConfig::default(),
        control_point,
        authority,
        store.rules(),
        store.events(),
        Arc::clone(&clock),
    );

    let (card, decisions) = CredentialEndpoint::new(CredentialConfig::default(), clock);
    let card = Arc::new(card);
    card.set_identity(Identity::new(CredentialId::new(credential), holder));

    let link = LoopbackLink::new(Arc::clone(&card));
    let outcome = reader.present(&link)?;

    match outcome {
        TransactionOutcome::Completed { decision, event_id } => {
            let verdict = if decision.granted { "GRANTED" } else { "DENIED" };
            println!("{verdict}: {} (recorded as {event_id})", decision.reason);
            if let Ok(notice) = decisions.try_recv() {
                println!("credential screen: {}", notice.message);
            }
        }
        other => println!("transaction ended without a decision: {other:?}"),
    }

    println!("unsynced events now queued: {}", store.events().unsynced_len());
    Ok(())
}

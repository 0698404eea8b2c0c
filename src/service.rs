//! Service layer: deal persistence with optimistic concurrency
//!
//! Deals live in one sled tree keyed by deal id, their event history in a
//! second tree keyed by `deal id / version`. A step is committed only if the
//! stored deal still has the version of the snapshot the step was computed
//! from; deal and event are written in one sled transaction.
use super::config::StorageConfig;
use super::deal::{Deal, DealId, ListingId, PartyId, TimeStamp};
use super::error::{NegotiationError, ServiceError};
use super::negotiation::{self, Command, DealEvent, Notice, Transition};
use super::query::Listing;
use sled::transaction::{
    ConflictableTransactionError, ConflictableTransactionResult, TransactionError, Transactional,
};
use sled::{Db, Tree};
use std::sync::Arc;

const DEALS_TREE: &str = "deals";
const EVENTS_TREE: &str = "deal_events";

/// Receives a notice after every committed step. Delivery is the
/// implementor's business; failures must not reach the caller.
pub trait Notifier: Send + Sync {
    fn notify(&self, notice: &Notice);
}

/// Default notifier: writes the notice to the log.
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, notice: &Notice) {
        tracing::info!(
            recipient = %notice.recipient,
            deal_id = %notice.event.deal_id,
            version = notice.event.version,
            kind = ?notice.event.kind,
            "deal notice"
        );
    }
}

pub struct DealService {
    instance: Arc<Db>,
    deals: Tree,
    events: Tree,
    notifier: Box<dyn Notifier>,
}

impl DealService {
    pub fn new(instance: Arc<Db>) -> Result<Self, ServiceError> {
        let deals = instance.open_tree(DEALS_TREE)?;
        let events = instance.open_tree(EVENTS_TREE)?;

        Ok(Self {
            instance,
            deals,
            events,
            notifier: Box::new(LogNotifier),
        })
    }

    /// Open (or create) the database at the configured path.
    pub fn open(config: &StorageConfig) -> Result<Self, ServiceError> {
        let db = sled::open(&config.path)?;
        Self::new(Arc::new(db))
    }

    pub fn with_notifier(mut self, notifier: impl Notifier + 'static) -> Self {
        self.notifier = Box::new(notifier);
        self
    }

    /// Record a buyer's first offer on a listing.
    pub fn open_deal(
        &self,
        listing: &Listing,
        buyer: &PartyId,
        agent: &PartyId,
        raw_amount: &str,
    ) -> Result<Deal, ServiceError> {
        let deal_id = DealId::generate()?;
        let transition = negotiation::open_offer(
            deal_id,
            &listing.id,
            buyer,
            agent,
            raw_amount,
            TimeStamp::new(),
        )?;

        self.commit(None, transition)
    }

    pub fn load(&self, deal_id: &DealId) -> Result<Deal, ServiceError> {
        tracing::debug!(%deal_id, "loading deal");
        let bytes = self
            .deals
            .get(deal_id.as_str())?
            .ok_or_else(|| ServiceError::NotFound(deal_id.clone()))?;

        decode_deal(deal_id, &bytes)
    }

    pub fn submit_counter(
        &self,
        snapshot: &Deal,
        actor: &PartyId,
        raw_amount: &str,
    ) -> Result<Deal, ServiceError> {
        self.execute(snapshot, actor, Command::Counter { raw_amount })
    }

    pub fn accept_offer(&self, snapshot: &Deal, actor: &PartyId) -> Result<Deal, ServiceError> {
        self.execute(snapshot, actor, Command::Accept)
    }

    pub fn cancel_offer(&self, snapshot: &Deal, actor: &PartyId) -> Result<Deal, ServiceError> {
        self.execute(snapshot, actor, Command::Cancel)
    }

    pub fn mark_sold(&self, snapshot: &Deal, actor: &PartyId) -> Result<Deal, ServiceError> {
        self.execute(snapshot, actor, Command::MarkSold)
    }

    /// Events of a deal, oldest first.
    pub fn history(&self, deal_id: &DealId) -> Result<Vec<DealEvent>, ServiceError> {
        self.events
            .scan_prefix(event_prefix(deal_id))
            .values()
            .map(|bytes| -> Result<DealEvent, ServiceError> { Ok(minicbor::decode(&bytes?)?) })
            .collect()
    }

    /// Every deal `party` is buyer or agent on.
    pub fn deals_for_party(&self, party: &PartyId) -> Result<Vec<Deal>, ServiceError> {
        self.scan(|deal| deal.role_of(party).is_some())
    }

    pub fn deals_for_listing(&self, listing_id: &ListingId) -> Result<Vec<Deal>, ServiceError> {
        self.scan(|deal| deal.listing_id() == listing_id)
    }

    pub fn flush(&self) -> Result<(), ServiceError> {
        self.instance.flush()?;
        Ok(())
    }

    fn scan(&self, keep: impl Fn(&Deal) -> bool) -> Result<Vec<Deal>, ServiceError> {
        let mut out = vec![];
        for entry in self.deals.iter() {
            let (key, bytes) = entry?;
            let deal_id = DealId::from(String::from_utf8_lossy(&key).into_owned());
            let deal = decode_deal(&deal_id, &bytes)?;
            if keep(&deal) {
                out.push(deal);
            }
        }
        Ok(out)
    }

    fn execute(
        &self,
        snapshot: &Deal,
        actor: &PartyId,
        command: Command<'_>,
    ) -> Result<Deal, ServiceError> {
        let action = command.action();
        let transition = negotiation::apply(snapshot, actor, command, TimeStamp::new())
            .inspect_err(|err| {
                tracing::warn!(deal_id = %snapshot.id(), %actor, %action, "step refused: {err}");
            })?;

        self.commit(Some(snapshot.version()), transition)
    }

    // `expected` is the version the transition was computed from; None for a new deal
    fn commit(&self, expected: Option<u64>, transition: Transition) -> Result<Deal, ServiceError> {
        let Transition { deal, event } = transition;
        let deal_id = deal.id().clone();
        let prev_digest = match expected {
            Some(version) => self.event_digest(&deal_id, version)?,
            None => None,
        };
        let event = event.chained_to(prev_digest);

        let deal_cbor = minicbor::to_vec(&deal).map_err(|e| ServiceError::Encode(e.to_string()))?;
        let (_, event_cbor) = event.build()?;
        let history_key = event_key(&deal_id, event.version);

        let res = (&self.deals, &self.events).transaction(
            |(deals, events)| -> ConflictableTransactionResult<(), ServiceError> {
                let stored = deals.get(deal_id.as_str())?;
                match (expected, stored) {
                    (None, Some(_)) => {
                        return Err(ConflictableTransactionError::Abort(
                            ServiceError::AlreadyExists(deal_id.clone()),
                        ));
                    }
                    (Some(_), None) => {
                        return Err(ConflictableTransactionError::Abort(
                            ServiceError::NotFound(deal_id.clone()),
                        ));
                    }
                    (Some(version), Some(bytes)) => {
                        let current: Deal = minicbor::decode(&bytes)
                            .map_err(|e| ConflictableTransactionError::Abort(e.into()))?;
                        if current.version() != version {
                            return Err(ConflictableTransactionError::Abort(
                                NegotiationError::StaleState {
                                    expected: version,
                                    found: current.version(),
                                }
                                .into(),
                            ));
                        }
                    }
                    (None, None) => {}
                }
                deals.insert(deal_id.as_str(), deal_cbor.as_slice())?;
                events.insert(history_key.as_slice(), event_cbor.as_slice())?;
                Ok(())
            },
        );

        match res {
            Ok(()) => {}
            Err(TransactionError::Abort(err)) => {
                if let ServiceError::Negotiation(NegotiationError::StaleState { .. }) = &err {
                    tracing::warn!(%deal_id, "stale write rejected: {err}");
                }
                return Err(err);
            }
            Err(TransactionError::Storage(err)) => return Err(err.into()),
        }

        tracing::info!(
            %deal_id,
            actor = %event.actor,
            version = deal.version(),
            status = %deal.status(),
            amount = %deal.amount(),
            "deal committed"
        );

        let transition = Transition { deal, event };
        if let Some(notice) = transition.notice() {
            self.notifier.notify(&notice);
        }

        Ok(transition.deal)
    }

    fn event_digest(&self, deal_id: &DealId, version: u64) -> Result<Option<String>, ServiceError> {
        match self.events.get(event_key(deal_id, version))? {
            Some(bytes) => Ok(Some(sha256::digest(&bytes.to_vec()))),
            None => Ok(None),
        }
    }
}

fn decode_deal(deal_id: &DealId, bytes: &[u8]) -> Result<Deal, ServiceError> {
    let deal: Deal = minicbor::decode(bytes)?;
    if !deal.is_consistent() {
        return Err(ServiceError::Corrupt(deal_id.clone()));
    }
    Ok(deal)
}

fn event_prefix(deal_id: &DealId) -> Vec<u8> {
    let mut key = deal_id.as_str().as_bytes().to_vec();
    key.push(b'/');
    key
}

// big-endian version keeps scan order equal to version order
fn event_key(deal_id: &DealId, version: u64) -> Vec<u8> {
    let mut key = event_prefix(deal_id);
    key.extend_from_slice(&version.to_be_bytes());
    key
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::money::Amount;

    fn service() -> (tempfile::TempDir, DealService) {
        let dir = tempfile::tempdir().unwrap();
        let db = sled::open(dir.path().join("deals.db")).unwrap();
        (dir, DealService::new(Arc::new(db)).unwrap())
    }

    fn listing() -> Listing {
        Listing {
            id: ListingId::from("listing_lot"),
            price: Amount::from_major(1_000_000).unwrap(),
            address: "Lot 4, Cebu".into(),
            title: "Residential lot".into(),
        }
    }

    #[test]
    fn open_then_load() {
        let (_dir, service) = service();
        let buyer = PartyId::from("user_b");
        let agent = PartyId::from("user_a");

        let deal = service.open_deal(&listing(), &buyer, &agent, "950,000").unwrap();
        let loaded = service.load(deal.id()).unwrap();

        assert_eq!(deal, loaded);
        assert_eq!(service.history(deal.id()).unwrap().len(), 1);
    }

    #[test]
    fn missing_deal_is_not_found() {
        let (_dir, service) = service();

        let err = service.load(&DealId::from("deal_nope")).unwrap_err();
        assert!(matches!(err, ServiceError::NotFound(_)));
    }

    #[test]
    fn inconsistent_record_is_corrupt() {
        let (_dir, service) = service();
        let same = PartyId::from("user_both");
        let deal = Deal::new_pending(
            DealId::from("deal_bad"),
            listing().id,
            same.clone(),
            same,
            Amount::from_major(900_000).unwrap(),
            TimeStamp::new(),
        );
        let bytes = minicbor::to_vec(&deal).unwrap();
        service.deals.insert(deal.id().as_str(), bytes).unwrap();

        let err = service.load(deal.id()).unwrap_err();
        assert!(matches!(err, ServiceError::Corrupt(id) if id == *deal.id()));
        assert!(matches!(
            service.deals_for_listing(&listing().id),
            Err(ServiceError::Corrupt(_))
        ));
    }

    #[test]
    fn reopening_an_existing_deal_is_refused() {
        let (_dir, service) = service();
        let buyer = PartyId::from("user_b");
        let agent = PartyId::from("user_a");
        let open = || {
            negotiation::open_offer(
                DealId::from("deal_twice"),
                &listing().id,
                &buyer,
                &agent,
                "950,000",
                TimeStamp::new(),
            )
            .unwrap()
        };

        let first = service.commit(None, open()).unwrap();
        let err = service.commit(None, open()).unwrap_err();

        assert!(matches!(err, ServiceError::AlreadyExists(id) if id == *first.id()));
        assert_eq!(service.load(first.id()).unwrap(), first);
        assert_eq!(service.history(first.id()).unwrap().len(), 1);
    }

    #[test]
    fn event_keys_sort_by_version() {
        let id = DealId::from("deal_x");

        assert!(event_key(&id, 2) < event_key(&id, 10));
        assert!(event_key(&id, 255) < event_key(&id, 256));
    }
}

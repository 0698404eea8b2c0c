//! Counter-offer state machine
//!
//! A deal starts `Pending` with the buyer's opening offer. While pending,
//! either party may counter (or amend their own standing offer), the party who
//! did not make the standing offer may accept it, and either party may cancel.
//! An accepted deal can only be marked sold, by the agent. Every function here
//! is pure: it takes a snapshot and returns the next snapshot, never mutating
//! its input, so a failed step leaves the caller's deal exactly as it was.
use super::deal::{CancelReason, Deal, DealId, DealStatus, ListingId, PartyId, Role, TimeStamp};
use super::error::NegotiationError;
use super::money::{Amount, parse_amount};
use chrono::Utc;
use std::fmt;

#[derive(minicbor::Encode, minicbor::Decode, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    #[n(0)]
    Counter,
    #[n(1)]
    Accept,
    #[n(2)]
    Cancel,
    #[n(3)]
    MarkSold,
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::Counter => f.write_str("counter"),
            Action::Accept => f.write_str("accept"),
            Action::Cancel => f.write_str("cancel"),
            Action::MarkSold => f.write_str("mark as sold"),
        }
    }
}

/// A requested step, carrying whatever input it needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command<'a> {
    Counter { raw_amount: &'a str },
    Accept,
    Cancel,
    MarkSold,
}

impl Command<'_> {
    pub fn action(&self) -> Action {
        match self {
            Command::Counter { .. } => Action::Counter,
            Command::Accept => Action::Accept,
            Command::Cancel => Action::Cancel,
            Command::MarkSold => Action::MarkSold,
        }
    }
}

#[derive(minicbor::Encode, minicbor::Decode, Debug, Clone, PartialEq, Eq)]
pub enum EventKind {
    #[n(0)]
    Opened {
        #[n(0)]
        amount: Amount,
    },
    #[n(1)]
    Countered {
        #[n(0)]
        previous: Amount,
        #[n(1)]
        amount: Amount,
    },
    #[n(2)]
    Accepted {
        #[n(0)]
        amount: Amount,
    },
    #[n(3)]
    Cancelled {
        #[n(0)]
        reason: CancelReason,
    },
    #[n(4)]
    Sold {
        #[n(0)]
        amount: Amount,
    },
}

/// Record of one committed step. Events of a deal form a hash chain through
/// `prev_digest`, the sha256 of the previous event's CBOR encoding.
#[derive(minicbor::Encode, minicbor::Decode, Debug, Clone, PartialEq, Eq)]
pub struct DealEvent {
    #[n(0)]
    pub deal_id: DealId,
    #[n(1)]
    pub actor: PartyId,
    #[n(2)]
    pub at: TimeStamp<Utc>,
    #[n(3)]
    pub version: u64, // deal version after this event
    #[n(4)]
    pub kind: EventKind,
    #[n(5)]
    pub prev_digest: Option<String>,
}

impl DealEvent {
    /// Encodes the event, returning its digest and CBOR bytes.
    pub fn build(&self) -> anyhow::Result<(String, Vec<u8>)> {
        let cbor = minicbor::to_vec(self)?;
        let hash = sha256::digest(&cbor);

        Ok((hash, cbor))
    }
    pub fn chained_to(mut self, prev_digest: Option<String>) -> Self {
        self.prev_digest = prev_digest;
        self
    }
}

/// Message for the party who did not act.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub recipient: PartyId,
    pub event: DealEvent,
}

/// The outcome of a legal step: the next deal snapshot and what happened.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    pub deal: Deal,
    pub event: DealEvent,
}

impl Transition {
    pub fn notice(&self) -> Option<Notice> {
        self.deal
            .counterpart(&self.event.actor)
            .map(|recipient| Notice {
                recipient: recipient.clone(),
                event: self.event.clone(),
            })
    }
}

/// Open a deal with the buyer's first offer on a listing.
pub fn open_offer(
    deal_id: DealId,
    listing_id: &ListingId,
    buyer: &PartyId,
    agent: &PartyId,
    raw_amount: &str,
    at: TimeStamp<Utc>,
) -> Result<Transition, NegotiationError> {
    if buyer == agent {
        return Err(NegotiationError::SameParty);
    }
    let amount = parse_amount(raw_amount)?;
    let deal = Deal::new_pending(
        deal_id,
        listing_id.clone(),
        buyer.clone(),
        agent.clone(),
        amount,
        at.clone(),
    );
    let event = DealEvent {
        deal_id: deal.id.clone(),
        actor: buyer.clone(),
        at,
        version: deal.version,
        kind: EventKind::Opened { amount },
        prev_digest: None,
    };

    Ok(Transition { deal, event })
}

/// Validate `command` against `deal` as `actor` and produce the next state.
///
/// Checks run in a fixed order: party membership, then status, then role and
/// turn, then input. Nothing is produced unless every check passes.
pub fn apply(
    deal: &Deal,
    actor: &PartyId,
    command: Command<'_>,
    at: TimeStamp<Utc>,
) -> Result<Transition, NegotiationError> {
    let role = deal
        .role_of(actor)
        .ok_or_else(|| NegotiationError::Unauthorized(actor.clone()))?;
    let action = command.action();

    let required = match action {
        Action::MarkSold => DealStatus::Accepted,
        _ => DealStatus::Pending,
    };
    if deal.status != required {
        return Err(NegotiationError::InvalidTransition {
            status: deal.status,
            action,
        });
    }

    let mut next = deal.clone();
    let kind = match command {
        Command::Counter { raw_amount } => {
            let amount = parse_amount(raw_amount)?;
            next.amount = amount;
            next.last_updated_by = actor.clone();
            EventKind::Countered {
                previous: deal.amount,
                amount,
            }
        }
        Command::Accept => {
            if deal.last_updated_by == *actor {
                return Err(NegotiationError::NotYourTurn);
            }
            next.status = DealStatus::Accepted;
            EventKind::Accepted {
                amount: deal.amount,
            }
        }
        Command::Cancel => {
            let reason = match role {
                _ if deal.last_updated_by == *actor => CancelReason::Withdrawn,
                Role::Buyer => CancelReason::DeclinedByBuyer,
                Role::Agent => CancelReason::DeclinedByAgent,
            };
            next.status = DealStatus::Cancelled;
            next.cancel_reason = Some(reason);
            EventKind::Cancelled { reason }
        }
        Command::MarkSold => {
            if role != Role::Agent {
                return Err(NegotiationError::RoleNotPermitted { role, action });
            }
            next.status = DealStatus::Sold;
            EventKind::Sold {
                amount: deal.amount,
            }
        }
    };

    // a clock behind the record must not make history run backwards
    next.last_updated_at = at.max(deal.last_updated_at.clone());
    next.version = deal.version + 1;

    let event = DealEvent {
        deal_id: next.id.clone(),
        actor: actor.clone(),
        at: next.last_updated_at.clone(),
        version: next.version,
        kind,
        prev_digest: None,
    };

    Ok(Transition { deal: next, event })
}

/// Propose `raw_amount`, either as a counter or as an amendment of one's own offer.
pub fn submit_counter(
    deal: &Deal,
    actor: &PartyId,
    raw_amount: &str,
) -> Result<Deal, NegotiationError> {
    apply(deal, actor, Command::Counter { raw_amount }, TimeStamp::new()).map(|t| t.deal)
}

pub fn accept_offer(deal: &Deal, actor: &PartyId) -> Result<Deal, NegotiationError> {
    apply(deal, actor, Command::Accept, TimeStamp::new()).map(|t| t.deal)
}

pub fn cancel_offer(deal: &Deal, actor: &PartyId) -> Result<Deal, NegotiationError> {
    apply(deal, actor, Command::Cancel, TimeStamp::new()).map(|t| t.deal)
}

pub fn mark_sold(deal: &Deal, actor: &PartyId) -> Result<Deal, NegotiationError> {
    apply(deal, actor, Command::MarkSold, TimeStamp::new()).map(|t| t.deal)
}

/// The actions [`apply`] would accept from `actor` right now.
pub fn permitted_actions(deal: &Deal, actor: &PartyId) -> Vec<Action> {
    let Some(role) = deal.role_of(actor) else {
        return vec![];
    };

    match deal.status {
        DealStatus::Pending if deal.last_updated_by == *actor => {
            vec![Action::Counter, Action::Cancel]
        }
        DealStatus::Pending => vec![Action::Counter, Action::Accept, Action::Cancel],
        DealStatus::Accepted if role == Role::Agent => vec![Action::MarkSold],
        _ => vec![],
    }
}

/// Recompute the digest chain of a deal's events, oldest first.
pub fn verify_history(events: &[DealEvent]) -> anyhow::Result<bool> {
    let mut prev: Option<String> = None;
    for (i, event) in events.iter().enumerate() {
        let in_order = i == 0 || event.version > events[i - 1].version;
        if event.prev_digest != prev || !in_order {
            return Ok(false);
        }
        let (digest, _) = event.build()?;
        prev = Some(digest);
    }
    Ok(true)
}

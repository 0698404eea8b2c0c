//! The negotiable offer record and its identifiers
use super::error::NegotiationError;
use super::money::Amount;
use super::utils::new_uuid_to_bech32;
use chrono::{DateTime, TimeZone, Utc};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, PartialEq, Eq, Clone)]
pub struct TimeStamp<T: TimeZone>(DateTime<T>);

// chrono's `Utc` is not itself ordered, so the derive would not apply.
impl PartialOrd for TimeStamp<Utc> {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for TimeStamp<Utc> {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.0.cmp(&other.0)
    }
}

impl TimeStamp<Utc> {
    pub fn new() -> Self {
        Self(Utc::now())
    }
    pub fn new_with(year: i32, month: u32, day: u32, hour: u32, min: u32, sec: u32) -> Option<Self> {
        Utc.with_ymd_and_hms(year, month, day, hour, min, sec)
            .single()
            .map(Self)
    }
    pub fn to_datetime_utc(&self) -> DateTime<Utc> {
        self.0
    }
}

impl Default for TimeStamp<Utc> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: TimeZone> From<DateTime<T>> for TimeStamp<T> {
    fn from(value: DateTime<T>) -> Self {
        TimeStamp(value)
    }
}

impl<C> minicbor::Encode<C> for TimeStamp<Utc> {
    fn encode<W: minicbor::encode::Write>(
        &self,
        e: &mut minicbor::Encoder<W>,
        _: &mut C,
    ) -> Result<(), minicbor::encode::Error<W::Error>> {
        if let Some(nsec) = self.0.timestamp_nanos_opt() {
            return e.i64(nsec)?.ok();
        }

        Err(minicbor::encode::Error::message(
            "failed to encode timestamp. timestamp_nanos_opt returned None",
        ))
    }
}

impl<'b, C> minicbor::Decode<'b, C> for TimeStamp<Utc> {
    fn decode(d: &mut minicbor::Decoder<'b>, _: &mut C) -> Result<Self, minicbor::decode::Error> {
        let nsecs = d.i64()?;

        Ok(TimeStamp(DateTime::from_timestamp_nanos(nsecs)))
    }
}

macro_rules! bech32_id {
    ($name:ident, $hrp:literal) => {
        #[derive(minicbor::Encode, minicbor::Decode, Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(#[n(0)] String);

        impl $name {
            /// Generate a fresh uuid7-backed id.
            pub fn generate() -> anyhow::Result<Self> {
                Ok(Self(new_uuid_to_bech32($hrp)?))
            }
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_string())
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self(value)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }
    };
}

bech32_id!(DealId, "deal_");
bech32_id!(ListingId, "listing_");
bech32_id!(PartyId, "user_");

#[derive(minicbor::Encode, minicbor::Decode, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    #[n(0)]
    Buyer,
    #[n(1)]
    Agent,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Buyer => f.write_str("buyer"),
            Role::Agent => f.write_str("agent"),
        }
    }
}

#[derive(minicbor::Encode, minicbor::Decode, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DealStatus {
    #[n(0)]
    Pending,
    #[n(1)]
    Accepted,
    #[n(2)]
    Cancelled,
    #[n(3)]
    Sold,
}

impl DealStatus {
    /// Accepted only leads to Sold; Cancelled and Sold lead nowhere.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, DealStatus::Pending)
    }
    pub fn label(&self) -> &'static str {
        match self {
            DealStatus::Pending => "Pending",
            DealStatus::Accepted => "Accepted",
            DealStatus::Cancelled => "Cancelled",
            DealStatus::Sold => "Sold",
        }
    }
}

impl fmt::Display for DealStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label().to_ascii_lowercase())
    }
}

impl FromStr for DealStatus {
    type Err = NegotiationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pending" => Ok(DealStatus::Pending),
            "accepted" => Ok(DealStatus::Accepted),
            "cancelled" | "canceled" | "rejected" | "declined" => Ok(DealStatus::Cancelled),
            "sold" => Ok(DealStatus::Sold),
            _ => Err(NegotiationError::UnknownStatus(s.to_string())),
        }
    }
}

/// Why a deal ended in `Cancelled`.
#[derive(minicbor::Encode, minicbor::Decode, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CancelReason {
    #[n(0)]
    DeclinedByBuyer,
    #[n(1)]
    DeclinedByAgent,
    /// The party who made the standing offer took it back.
    #[n(2)]
    Withdrawn,
}

impl CancelReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            CancelReason::DeclinedByBuyer => "declined_by_buyer",
            CancelReason::DeclinedByAgent => "declined_by_agent",
            CancelReason::Withdrawn => "withdrawn",
        }
    }
}

#[derive(minicbor::Encode, minicbor::Decode, Debug, Clone, PartialEq, Eq)]
pub struct Deal {
    #[n(0)]
    pub(crate) id: DealId,
    #[n(1)]
    pub(crate) listing_id: ListingId,
    #[n(2)]
    pub(crate) buyer_id: PartyId,
    #[n(3)]
    pub(crate) agent_id: PartyId,
    #[n(4)]
    pub(crate) amount: Amount,
    #[n(5)]
    pub(crate) status: DealStatus,
    #[n(6)]
    pub(crate) cancel_reason: Option<CancelReason>,
    #[n(7)]
    pub(crate) last_updated_by: PartyId, // whoever set the current amount
    #[n(8)]
    pub(crate) last_updated_at: TimeStamp<Utc>,
    #[n(9)]
    pub(crate) created_at: TimeStamp<Utc>,
    #[n(10)]
    pub(crate) version: u64, // bumped on every committed transition
}

impl Deal {
    pub(crate) fn new_pending(
        id: DealId,
        listing_id: ListingId,
        buyer_id: PartyId,
        agent_id: PartyId,
        amount: Amount,
        at: TimeStamp<Utc>,
    ) -> Self {
        Self {
            id,
            listing_id,
            last_updated_by: buyer_id.clone(),
            buyer_id,
            agent_id,
            amount,
            status: DealStatus::Pending,
            cancel_reason: None,
            last_updated_at: at.clone(),
            created_at: at,
            version: 0,
        }
    }

    pub fn id(&self) -> &DealId {
        &self.id
    }
    pub fn listing_id(&self) -> &ListingId {
        &self.listing_id
    }
    pub fn buyer_id(&self) -> &PartyId {
        &self.buyer_id
    }
    pub fn agent_id(&self) -> &PartyId {
        &self.agent_id
    }
    pub fn amount(&self) -> Amount {
        self.amount
    }
    pub fn status(&self) -> DealStatus {
        self.status
    }
    pub fn cancel_reason(&self) -> Option<CancelReason> {
        self.cancel_reason
    }
    pub fn last_updated_by(&self) -> &PartyId {
        &self.last_updated_by
    }
    pub fn last_updated_at(&self) -> &TimeStamp<Utc> {
        &self.last_updated_at
    }
    pub fn created_at(&self) -> &TimeStamp<Utc> {
        &self.created_at
    }
    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn role_of(&self, party: &PartyId) -> Option<Role> {
        if *party == self.buyer_id {
            Some(Role::Buyer)
        } else if *party == self.agent_id {
            Some(Role::Agent)
        } else {
            None
        }
    }

    /// The other side of the table, if `party` is at it.
    pub fn counterpart(&self, party: &PartyId) -> Option<&PartyId> {
        match self.role_of(party)? {
            Role::Buyer => Some(&self.agent_id),
            Role::Agent => Some(&self.buyer_id),
        }
    }

    /// Checks the record invariants that must hold for any stored deal.
    pub fn is_consistent(&self) -> bool {
        let parties_distinct = self.buyer_id != self.agent_id;
        let updater_is_party = self.role_of(&self.last_updated_by).is_some();
        let reason_matches_status =
            (self.status == DealStatus::Cancelled) == self.cancel_reason.is_some();
        let ordered = self.created_at <= self.last_updated_at;

        parties_distinct && updater_is_party && reason_matches_status && ordered
    }
}

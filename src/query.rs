//! Read-side helpers for the offer screens
//!
//! Both the buyer and agent pages ask the same questions of a deal: whose turn
//! it is, whether the viewer can still edit their offer, and how the offer
//! compares with the asking price. These answers live here once.
use super::config::DisplayConfig;
use super::deal::{Deal, DealStatus, ListingId, PartyId};
use super::money::{Amount, AmountDelta, FractionDigits};
use super::negotiation::{Action, permitted_actions};
use std::fmt;

/// Listing data supplied by the catalogue; never written by this crate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Listing {
    pub id: ListingId,
    pub price: Amount,
    pub address: String,
    pub title: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OfferLabel {
    RecentOffer,
    ClientOffer,
}

impl fmt::Display for OfferLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OfferLabel::RecentOffer => f.write_str("Recent Offer"),
            OfferLabel::ClientOffer => f.write_str("Client Offer"),
        }
    }
}

pub fn is_my_turn(deal: &Deal, actor: &PartyId) -> bool {
    deal.status() == DealStatus::Pending && deal.last_updated_by() != actor
}

pub fn can_edit(deal: &Deal, actor: &PartyId) -> bool {
    deal.status() == DealStatus::Pending && deal.last_updated_by() == actor
}

/// Offer minus asking price; positive means above asking.
pub fn price_difference(deal: &Deal, listing_price: Amount) -> AmountDelta {
    AmountDelta::between(deal.amount(), listing_price)
}

/// "Recent Offer" when the viewer made the standing offer, otherwise "Client Offer".
pub fn display_label(deal: &Deal, actor: &PartyId) -> OfferLabel {
    if deal.last_updated_by() == actor {
        OfferLabel::RecentOffer
    } else {
        OfferLabel::ClientOffer
    }
}

/// Everything an offer screen renders for one viewer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DealView {
    pub status: DealStatus,
    pub label: OfferLabel,
    pub is_my_turn: bool,
    pub can_edit: bool,
    pub amount: String,
    pub listing_price: String,
    pub difference: String,
    pub actions: Vec<Action>,
    /// Pre-filled counter input, only offered back to whoever made the offer.
    pub counter_prefill: Option<String>,
}

impl DealView {
    pub fn project(
        deal: &Deal,
        listing: &Listing,
        actor: &PartyId,
        display: &DisplayConfig,
    ) -> Self {
        let editable = can_edit(deal, actor);
        let prefill = editable.then(|| deal.amount().to_string());

        Self {
            status: deal.status(),
            label: display_label(deal, actor),
            is_my_turn: is_my_turn(deal, actor),
            can_edit: editable,
            amount: deal
                .amount()
                .format(display.currency, display.negotiation_fraction_digits),
            listing_price: listing
                .price
                .format(display.currency, display.listing_fraction_digits),
            difference: price_difference(deal, listing.price)
                .format(display.currency, FractionDigits::Two),
            actions: permitted_actions(deal, actor),
            counter_prefill: prefill,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::deal::{DealId, TimeStamp};
    use crate::negotiation::{accept_offer, open_offer, submit_counter};

    fn listing() -> Listing {
        Listing {
            id: ListingId::from("listing_condo"),
            price: Amount::from_major(3_000_000).unwrap(),
            address: "Unit 5B, Makati".into(),
            title: "Studio condo".into(),
        }
    }

    fn opened(buyer: &PartyId, agent: &PartyId) -> Deal {
        open_offer(
            DealId::from("deal_condo"),
            &listing().id,
            buyer,
            agent,
            "2,850,000",
            TimeStamp::new(),
        )
        .unwrap()
        .deal
    }

    #[test]
    fn turn_and_edit_are_exclusive() {
        let buyer = PartyId::from("user_buyer");
        let agent = PartyId::from("user_agent");
        let deal = opened(&buyer, &agent);

        assert!(can_edit(&deal, &buyer));
        assert!(!is_my_turn(&deal, &buyer));
        assert!(is_my_turn(&deal, &agent));
        assert!(!can_edit(&deal, &agent));
    }

    #[test]
    fn nobody_acts_on_a_closed_deal() {
        let buyer = PartyId::from("user_buyer");
        let agent = PartyId::from("user_agent");
        let deal = accept_offer(&opened(&buyer, &agent), &agent).unwrap();

        for party in [&buyer, &agent] {
            assert!(!is_my_turn(&deal, party));
            assert!(!can_edit(&deal, party));
        }
    }

    #[test]
    fn difference_against_asking() {
        let buyer = PartyId::from("user_buyer");
        let agent = PartyId::from("user_agent");
        let deal = opened(&buyer, &agent);

        let diff = price_difference(&deal, listing().price);
        assert!(diff.is_under());
        assert_eq!(diff.magnitude(), Amount::from_major(150_000).unwrap());
    }

    #[test]
    fn labels_follow_who_offered() {
        let buyer = PartyId::from("user_buyer");
        let agent = PartyId::from("user_agent");
        let deal = opened(&buyer, &agent);

        assert_eq!(display_label(&deal, &buyer).to_string(), "Recent Offer");
        assert_eq!(display_label(&deal, &agent).to_string(), "Client Offer");
    }

    #[test]
    fn view_prefills_only_for_the_offer_owner() {
        let buyer = PartyId::from("user_buyer");
        let agent = PartyId::from("user_agent");
        let deal = submit_counter(&opened(&buyer, &agent), &agent, "3,100,000").unwrap();
        let display = DisplayConfig::default();

        let agent_view = DealView::project(&deal, &listing(), &agent, &display);
        assert_eq!(agent_view.counter_prefill.as_deref(), Some("3100000.00"));
        assert_eq!(agent_view.amount, "₱3,100,000.00");
        assert_eq!(agent_view.listing_price, "₱3,000,000");
        assert_eq!(agent_view.difference, "+₱100,000.00");
        assert_eq!(agent_view.label, OfferLabel::RecentOffer);

        let buyer_view = DealView::project(&deal, &listing(), &buyer, &display);
        assert_eq!(buyer_view.counter_prefill, None);
        assert!(buyer_view.is_my_turn);
        assert!(buyer_view.actions.contains(&Action::Accept));
    }
}

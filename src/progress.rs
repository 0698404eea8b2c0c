//! Four-step transaction stepper: inquiry, appointment, offer, payment.
//!
//! Derived on every read from the records that drive each step; nothing here
//! is stored. Steps unlock strictly left to right.
use super::deal::{Deal, DealStatus};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    Inquiry,
    Appointment,
    Offer,
    Payment,
}

impl Stage {
    pub const ORDER: [Stage; 4] = [
        Stage::Inquiry,
        Stage::Appointment,
        Stage::Offer,
        Stage::Payment,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Stage::Inquiry => "Inquiry",
            Stage::Appointment => "Appointment",
            Stage::Offer => "Offer",
            Stage::Payment => "Payment",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StageStatus {
    Complete,
    Current,
    Upcoming,
    Locked,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum InquiryState {
    #[default]
    NotSent,
    Pending,
    Accepted,
    Rejected,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum AppointmentState {
    #[default]
    NotRequested,
    Pending,
    Accepted,
    Completed,
    Rejected,
    Cancelled,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TransactionState {
    #[default]
    NotStarted,
    Pending,
    Completed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StageMap {
    pub inquiry: StageStatus,
    pub appointment: StageStatus,
    pub offer: StageStatus,
    pub payment: StageStatus,
}

impl StageMap {
    fn all(status: StageStatus) -> Self {
        Self {
            inquiry: status,
            appointment: status,
            offer: status,
            payment: status,
        }
    }

    pub fn get(&self, stage: Stage) -> StageStatus {
        match stage {
            Stage::Inquiry => self.inquiry,
            Stage::Appointment => self.appointment,
            Stage::Offer => self.offer,
            Stage::Payment => self.payment,
        }
    }

    fn set(&mut self, stage: Stage, status: StageStatus) {
        match stage {
            Stage::Inquiry => self.inquiry = status,
            Stage::Appointment => self.appointment = status,
            Stage::Offer => self.offer = status,
            Stage::Payment => self.payment = status,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (Stage, StageStatus)> + '_ {
        Stage::ORDER.into_iter().map(|stage| (stage, self.get(stage)))
    }

    /// The step the user is working on, if any.
    pub fn active(&self) -> Option<Stage> {
        self.iter()
            .find(|(_, status)| matches!(status, StageStatus::Current | StageStatus::Upcoming))
            .map(|(stage, _)| stage)
    }

    pub fn is_closed(&self) -> bool {
        self.iter().all(|(_, status)| status == StageStatus::Complete)
    }
}

// (started, complete) per step
fn inquiry_step(state: InquiryState) -> (bool, bool) {
    (
        state != InquiryState::NotSent,
        state == InquiryState::Accepted,
    )
}

fn appointment_step(state: AppointmentState) -> (bool, bool) {
    (
        state != AppointmentState::NotRequested,
        matches!(
            state,
            AppointmentState::Accepted | AppointmentState::Completed
        ),
    )
}

fn offer_step(deal: Option<DealStatus>) -> (bool, bool) {
    (
        deal.is_some(),
        matches!(deal, Some(DealStatus::Accepted | DealStatus::Sold)),
    )
}

fn payment_step(state: TransactionState) -> (bool, bool) {
    (
        state != TransactionState::NotStarted,
        state == TransactionState::Completed,
    )
}

/// Derive the stepper for one buyer/listing pair.
///
/// A sold deal or a completed transaction closes the whole pipeline and
/// reports every step complete, whatever the earlier records say.
pub fn project_progress(
    inquiry: InquiryState,
    appointment: AppointmentState,
    deal: Option<&Deal>,
    transaction: TransactionState,
) -> StageMap {
    let deal_status = deal.map(Deal::status);
    if deal_status == Some(DealStatus::Sold) || transaction == TransactionState::Completed {
        return StageMap::all(StageStatus::Complete);
    }

    let steps = [
        inquiry_step(inquiry),
        appointment_step(appointment),
        offer_step(deal_status),
        payment_step(transaction),
    ];

    let mut map = StageMap::all(StageStatus::Locked);
    for (i, (stage, (started, complete))) in Stage::ORDER.into_iter().zip(steps).enumerate() {
        if complete {
            map.set(stage, StageStatus::Complete);
            continue;
        }
        let status = if started || i == 0 {
            StageStatus::Current
        } else {
            StageStatus::Upcoming
        };
        map.set(stage, status);
        break;
    }
    map
}

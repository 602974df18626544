// --- File: crates/meetsync_scheduler/src/proposal.rs ---
//! Issuing, viewing and revoking proposal tokens.

use chrono::{DateTime, Duration, Utc};
use chrono_tz::Tz;
use meetsync_common::models::{
    AvailableSlot, LeadInfo, Proposal, ProposalStatus, ProposalView, Slot,
};
use meetsync_common::{Notifier, Store};
use serde::Serialize;
use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::MeetingError;
use crate::token::TokenSigner;

/// What the admin gets back after issuing a proposal.
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IssuedProposal {
    pub token: String,
    pub booking_url: String,
    pub expires_at: DateTime<Utc>,
}

pub struct ProposalIssuer {
    store: Arc<dyn Store>,
    notifier: Arc<dyn Notifier>,
    signer: Arc<TokenSigner>,
    booking_base_url: String,
    /// Zone used to group slots by calendar date in the view.
    time_zone: Tz,
}

impl ProposalIssuer {
    pub fn new(
        store: Arc<dyn Store>,
        notifier: Arc<dyn Notifier>,
        signer: Arc<TokenSigner>,
        booking_base_url: impl Into<String>,
        time_zone: Tz,
    ) -> Self {
        Self {
            store,
            notifier,
            signer,
            booking_base_url: booking_base_url.into(),
            time_zone,
        }
    }

    pub fn booking_url(&self, token: &str) -> String {
        format!("{}/{}", self.booking_base_url.trim_end_matches('/'), token)
    }

    /// Binds `slot_ids` to `lead_id` behind a new single-use token.
    ///
    /// Every slot must be claimable right now; duplicates are collapsed.
    pub async fn issue(
        &self,
        lead_id: &str,
        slot_ids: &[Uuid],
        ttl: Duration,
    ) -> Result<IssuedProposal, MeetingError> {
        if ttl <= Duration::zero() {
            return Err(MeetingError::InvalidTtl);
        }
        let mut seen = HashSet::new();
        let slot_ids: Vec<Uuid> = slot_ids.iter().copied().filter(|id| seen.insert(*id)).collect();
        if slot_ids.is_empty() {
            return Err(MeetingError::InvalidSlotSet("no slots given".to_string()));
        }

        let lead = self
            .store
            .find_lead(lead_id)
            .await?
            .ok_or_else(|| MeetingError::LeadNotFound(lead_id.to_string()))?;

        let now = Utc::now();
        let slots = self.store.get_slots(&slot_ids).await?;
        for id in &slot_ids {
            match slots.iter().find(|s| s.id == *id) {
                Some(slot) if slot.is_claimable(now) => {}
                Some(slot) => {
                    return Err(MeetingError::InvalidSlotSet(format!(
                        "slot {id} is not claimable ({}, {}/{} claimed)",
                        slot.sync_status, slot.claimed_count, slot.capacity
                    )))
                }
                None => {
                    return Err(MeetingError::InvalidSlotSet(format!("slot {id} does not exist")))
                }
            }
        }

        let proposal = Proposal {
            token: self.signer.mint()?,
            lead_id: lead.id.clone(),
            slot_ids,
            issued_at: now,
            expires_at: now + ttl,
            redeemed_at: None,
            status: ProposalStatus::Active,
        };
        self.store.insert_proposal(proposal.clone()).await?;
        info!(lead_id = %lead.id, slots = proposal.slot_ids.len(), expires_at = %proposal.expires_at, "Proposal issued");

        let issued = IssuedProposal {
            token: proposal.token.clone(),
            booking_url: self.booking_url(&proposal.token),
            expires_at: proposal.expires_at,
        };
        let notifier = self.notifier.clone();
        let booking_url = issued.booking_url.clone();
        tokio::spawn(async move {
            if let Err(e) = notifier.send_proposal(&proposal, &booking_url, &lead).await {
                warn!(lead_id = %lead.id, error = %e, "Proposal e-mail not sent");
            }
        });
        Ok(issued)
    }

    /// Loads a proposal that may still be booked, in the order of checks
    /// the booking flow uses: shape, existence, expiry, revocation, use.
    pub async fn load_active(
        &self,
        token: &str,
        now: DateTime<Utc>,
    ) -> Result<Proposal, MeetingError> {
        if !self.signer.verify(token) {
            return Err(MeetingError::TokenNotFound);
        }
        let proposal = self
            .store
            .get_proposal(token)
            .await?
            .ok_or(MeetingError::TokenNotFound)?;
        match proposal.effective_status(now) {
            ProposalStatus::Active => Ok(proposal),
            ProposalStatus::Expired => Err(MeetingError::TokenExpired),
            ProposalStatus::Revoked => Err(MeetingError::TokenRevoked),
            ProposalStatus::Redeemed => Err(MeetingError::TokenAlreadyRedeemed),
        }
    }

    /// Live availability behind `token`. Does not consume it.
    pub async fn redeem(&self, token: &str) -> Result<ProposalView, MeetingError> {
        let now = Utc::now();
        let proposal = self.load_active(token, now).await?;
        let slots = self.store.get_slots(&proposal.slot_ids).await?;
        let lead_info = match self.store.find_lead(&proposal.lead_id).await? {
            Some(lead) => Some(LeadInfo {
                contact_name: lead.contact_name,
                company_name: lead.company_name,
            }),
            None => None,
        };
        Ok(self.build_view(&proposal, &slots, lead_info, now))
    }

    fn build_view(
        &self,
        proposal: &Proposal,
        slots: &[Slot],
        lead_info: Option<LeadInfo>,
        now: DateTime<Utc>,
    ) -> ProposalView {
        let mut available: Vec<AvailableSlot> = slots
            .iter()
            .filter(|s| s.is_claimable(now))
            .map(AvailableSlot::from)
            .collect();
        available.sort_by_key(|s| (s.start_time, s.id));

        let mut slots_by_date: BTreeMap<String, Vec<AvailableSlot>> = BTreeMap::new();
        for slot in &available {
            let date = slot
                .start_time
                .with_timezone(&self.time_zone)
                .format("%Y-%m-%d")
                .to_string();
            slots_by_date.entry(date).or_default().push(slot.clone());
        }

        ProposalView {
            expires_at: proposal.expires_at,
            lead_info,
            total_slots: available.len(),
            slots: available,
            slots_by_date,
        }
    }

    /// ACTIVE -> REVOKED.
    pub async fn revoke(&self, token: &str) -> Result<(), MeetingError> {
        let now = Utc::now();
        let proposal = self
            .store
            .get_proposal(token)
            .await?
            .ok_or(MeetingError::TokenNotFound)?;
        if !self.store.revoke_proposal(token, now).await? {
            return Err(MeetingError::InvalidTransition(format!(
                "proposal is {}",
                proposal.effective_status(now)
            )));
        }
        info!(lead_id = %proposal.lead_id, "Proposal revoked");
        Ok(())
    }
}

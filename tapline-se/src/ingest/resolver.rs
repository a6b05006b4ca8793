//! Identity resolver
//!
//! Maps a scanned identifier plus a site scope to at most one person using
//! an ordered list of pure matchers. Tiers are evaluated in order and the
//! first hit wins; there is no scoring across tiers. Within a tier the
//! student roster is searched before the staff roster, a fixed tie-break
//! for the (rare) case where one identifier exists in both.

use crate::error::{Error, Result};
use crate::roster::{RosterCache, SiteRoster};
use std::time::Duration;
use tapline_common::ident::{pad_to_width, strip_leading_zeros};
use tapline_common::person::{Person, StaffRecord, StudentRecord};
use tracing::debug;

/// Which tier produced a match
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchTier {
    /// Scanned identifier equals the stored card identifier
    Exact,
    /// Scanned identifier with leading zeros stripped equals the stored card
    ZeroStripped,
    /// Scanned identifier zero-padded to the frame width equals the stored card
    ZeroPadded,
    /// Scanned identifier equals the secondary (institutional) id
    SecondaryId,
}

impl MatchTier {
    /// Evaluation order; first hit wins
    pub const ORDERED: [MatchTier; 4] = [
        MatchTier::Exact,
        MatchTier::ZeroStripped,
        MatchTier::ZeroPadded,
        MatchTier::SecondaryId,
    ];

    /// Pure matcher for one tier
    fn matches(
        self,
        scanned: &str,
        card_identifier: &str,
        secondary_id: Option<&str>,
        frame_width: usize,
    ) -> bool {
        match self {
            MatchTier::Exact => scanned == card_identifier,
            MatchTier::ZeroStripped => strip_leading_zeros(scanned) == card_identifier,
            MatchTier::ZeroPadded => pad_to_width(scanned, frame_width) == card_identifier,
            MatchTier::SecondaryId => secondary_id.is_some_and(|id| id == scanned),
        }
    }
}

/// Ephemeral product of one resolution call
#[derive(Debug, Clone)]
pub struct CandidateMatch {
    pub person: Person,
    pub tier: MatchTier,
}

/// Resolves identifiers against the per-site rosters
#[derive(Clone)]
pub struct Resolver {
    cache: RosterCache,
    frame_width: usize,
    roster_wait_timeout: Duration,
    roster_poll_interval: Duration,
}

impl Resolver {
    pub fn new(
        cache: RosterCache,
        frame_width: usize,
        roster_wait_timeout: Duration,
        roster_poll_interval: Duration,
    ) -> Self {
        Self {
            cache,
            frame_width,
            roster_wait_timeout,
            roster_poll_interval,
        }
    }

    /// Resolve `(raw_identifier, site_id)` to exactly one person
    ///
    /// Readers can fire before the roster cache is warm, so a cold site is
    /// polled for up to the configured timeout before giving up with
    /// `RosterUnavailable`. A loaded-but-empty roster resolves immediately
    /// to `UnrecognizedCard`.
    pub async fn resolve(&self, site_id: &str, raw_identifier: &str) -> Result<CandidateMatch> {
        let roster = self.wait_for_roster(site_id).await?;

        match search_roster(&roster, raw_identifier, self.frame_width) {
            Some(candidate) => {
                debug!(
                    "Resolved {} at {} via {:?} to {}",
                    raw_identifier,
                    site_id,
                    candidate.tier,
                    candidate.person.person_id()
                );
                Ok(candidate)
            }
            None => Err(Error::UnrecognizedCard),
        }
    }

    async fn wait_for_roster(&self, site_id: &str) -> Result<SiteRoster> {
        let deadline = tokio::time::Instant::now() + self.roster_wait_timeout;

        loop {
            if let Some(roster) = self.cache.snapshot(site_id).await {
                return Ok(roster);
            }
            if tokio::time::Instant::now() >= deadline {
                return Err(Error::RosterUnavailable(site_id.to_string()));
            }
            tokio::time::sleep(self.roster_poll_interval).await;
        }
    }
}

/// Search both rosters tier by tier
///
/// Tier order is the primary key, roster order (students first) the
/// secondary, so a staff exact match still beats a student zero-pad match.
fn search_roster(
    roster: &SiteRoster,
    raw_identifier: &str,
    frame_width: usize,
) -> Option<CandidateMatch> {
    for tier in MatchTier::ORDERED {
        if let Some(student) = roster
            .students
            .iter()
            .find(|s| matches_student(tier, raw_identifier, s, frame_width))
        {
            return Some(CandidateMatch {
                person: Person::Student(student.clone()),
                tier,
            });
        }

        if let Some(staff) = roster
            .staff
            .iter()
            .find(|s| matches_staff(tier, raw_identifier, s, frame_width))
        {
            return Some(CandidateMatch {
                person: Person::Staff(staff.clone()),
                tier,
            });
        }
    }

    None
}

fn matches_student(
    tier: MatchTier,
    scanned: &str,
    record: &StudentRecord,
    frame_width: usize,
) -> bool {
    tier.matches(
        scanned,
        &record.card_identifier,
        record.secondary_id.as_deref(),
        frame_width,
    )
}

fn matches_staff(tier: MatchTier, scanned: &str, record: &StaffRecord, frame_width: usize) -> bool {
    tier.matches(
        scanned,
        &record.card_identifier,
        record.secondary_id.as_deref(),
        frame_width,
    )
}

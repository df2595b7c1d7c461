//! Vote tally and the score-driven expiry rule.
//!
//! The same functions run in two places: inside the backend's vote
//! transaction, and against the client's local copy for the optimistic
//! update.

use serde::{Deserialize, Serialize};

use crate::constants::EXPIRY_SCORE_THRESHOLD;
use crate::entities::{Post, Vote};
use crate::error::VoteError;
use crate::types::{PostStatus, UserId, VoteValue};

/// What a call to [`apply_vote`] did to the vote list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VoteChange {
    /// First vote from this user, appended.
    Added,
    /// The user flipped their vote; position in the list is kept.
    Replaced { previous: VoteValue },
    /// Same value cast twice: the vote is withdrawn.
    Removed,
}

/// Apply `value` from `user` to `votes` under toggle/replace rules.
pub fn apply_vote(votes: &mut Vec<Vote>, user: UserId, value: VoteValue) -> VoteChange {
    match votes.iter().position(|v| v.user_id == user) {
        Some(idx) if votes[idx].value == value => {
            votes.remove(idx);
            VoteChange::Removed
        }
        Some(idx) => {
            let previous = votes[idx].value;
            votes[idx].value = value;
            VoteChange::Replaced { previous }
        }
        None => {
            votes.push(Vote {
                user_id: user,
                value,
            });
            VoteChange::Added
        }
    }
}

pub fn total_score(votes: &[Vote]) -> i64 {
    votes.iter().map(|v| v.value.as_i64()).sum()
}

/// Status after a vote left the post at `total`. Expired is terminal.
pub fn status_after(current: PostStatus, total: i64) -> PostStatus {
    match current {
        PostStatus::Expired => PostStatus::Expired,
        PostStatus::Active if total < EXPIRY_SCORE_THRESHOLD => PostStatus::Expired,
        PostStatus::Active => PostStatus::Active,
    }
}

impl Post {
    pub fn score(&self) -> i64 {
        total_score(&self.votes)
    }

    pub fn user_vote(&self, user: UserId) -> Option<VoteValue> {
        self.votes.iter().find(|v| v.user_id == user).map(|v| v.value)
    }

    /// Apply a vote in place and re-evaluate the status.
    pub fn cast_vote(&mut self, user: UserId, value: VoteValue) -> Result<VoteChange, VoteError> {
        if !self.is_active() {
            return Err(VoteError::PostExpired);
        }
        let change = apply_vote(&mut self.votes, user, value);
        self.status = status_after(self.status, self.score());
        Ok(change)
    }

    pub fn valuation(&self) -> Valuation {
        Valuation::from_score(self.score())
    }
}

/// Display bucket for a total score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Valuation {
    Great,
    Good,
    Fair,
    Bad,
    Scam,
}

impl Valuation {
    pub fn from_score(score: i64) -> Self {
        match score {
            s if s > 10 => Valuation::Great,
            s if s > 5 => Valuation::Good,
            s if s >= -5 => Valuation::Fair,
            s if s >= -10 => Valuation::Bad,
            _ => Valuation::Scam,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Valuation::Great => "Ofertón",
            Valuation::Good => "Buena oferta",
            Valuation::Fair => "Oferta",
            Valuation::Bad => "Mala oferta",
            Valuation::Scam => "Estafa",
        }
    }
}

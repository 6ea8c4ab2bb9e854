use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::locale::Locale;
use crate::models::{Promise, PromiseStatus};

/// Per-user promise outcome tallies shown on public profiles.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ReputationCounts {
    pub confirmed: u32,
    pub completed: u32,
    pub disputed: u32,
}

impl ReputationCounts {
    pub fn new(confirmed: u32, completed: u32, disputed: u32) -> Self {
        Self {
            confirmed,
            completed,
            disputed,
        }
    }

    /// Kept promises count as completed for the promisor and as confirmed
    /// for the promisee who signed them off; disputes count against the promisor.
    pub fn tally<'a>(user_id: Uuid, promises: impl IntoIterator<Item = &'a Promise>) -> Self {
        let mut counts = Self::default();
        for promise in promises {
            let is_promisor = promise.promisor_id == Some(user_id);
            let is_promisee = promise.promisee_id == Some(user_id);
            match promise.status {
                PromiseStatus::Confirmed if is_promisor => counts.completed += 1,
                PromiseStatus::Confirmed if is_promisee => counts.confirmed += 1,
                PromiseStatus::Disputed if is_promisor => counts.disputed += 1,
                _ => {}
            }
        }
        counts
    }

    pub fn has_history(&self) -> bool {
        self.confirmed > 0 || self.completed > 0 || self.disputed > 0
    }

    pub fn score(&self) -> Decimal {
        Decimal::from(self.completed) + Decimal::new(5, 1) * Decimal::from(self.confirmed)
            - Decimal::TWO * Decimal::from(self.disputed)
    }
}

/// Renders a score with no fraction digits when whole, one otherwise.
pub fn format_score(score: Decimal, locale: Locale) -> String {
    let digits = if score.fract().is_zero() { 0 } else { 1 };
    let rounded = score
        .abs()
        .round_dp_with_strategy(digits, RoundingStrategy::MidpointAwayFromZero);

    let integer = rounded.trunc().normalize().to_string();
    let mut rendered = String::new();
    if score.is_sign_negative() && !rounded.is_zero() {
        rendered.push('-');
    }
    rendered.push_str(&group_digits(&integer, locale.group_separator()));

    if digits > 0 {
        let tenth = (rounded.fract() * Decimal::TEN).trunc().normalize();
        rendered.push(locale.decimal_separator());
        rendered.push_str(&tenth.to_string());
    }

    rendered
}

fn group_digits(digits: &str, separator: char) -> String {
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (index, digit) in digits.chars().enumerate() {
        if index > 0 && (digits.len() - index) % 3 == 0 {
            grouped.push(separator);
        }
        grouped.push(digit);
    }
    grouped
}

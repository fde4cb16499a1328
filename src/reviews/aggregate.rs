use rust_decimal::{Decimal, RoundingStrategy};

use super::error::ReviewError;
use super::model::DeveloperAggregate;
use super::repository::ReviewTransaction;

/// Number of decimal places kept on `developers.rating`.
pub const RATING_SCALE: u32 = 2;

/// Count and sum of the review ratings currently stored for one developer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RatingTotals {
    pub count: i64,
    pub sum: i64,
}

impl DeveloperAggregate {
    /// Mean rating rounded to two places (midpoint away from zero), `0.00` without reviews.
    pub fn from_totals(developer_id: i32, totals: RatingTotals) -> Self {
        let rating = if totals.count > 0 {
            (Decimal::from(totals.sum) / Decimal::from(totals.count))
                .round_dp_with_strategy(RATING_SCALE, RoundingStrategy::MidpointAwayFromZero)
        } else {
            Decimal::ZERO
        };

        Self {
            developer_id,
            rating: with_scale(rating),
            total_reviews: totals.count as i32,
        }
    }

    /// Same aggregate with the rating at the stored scale; NUMERIC reads back `0` for `0.00`.
    pub fn normalized(self) -> Self {
        Self {
            rating: with_scale(self.rating),
            ..self
        }
    }
}

fn with_scale(mut value: Decimal) -> Decimal {
    value.rescale(RATING_SCALE);
    value
}

/// Sole writer of the developer aggregate.
///
/// Callers hold the developer row lock taken by [`ReviewTransaction::lock_developer`]
/// (or one of its siblings) before calling [`AggregateMaintainer::recompute`], and commit
/// the same transaction afterwards. The read of the current rows therefore happens after the
/// triggering mutation and cannot interleave with another writer for the same developer.
pub struct AggregateMaintainer;

impl AggregateMaintainer {
    pub async fn recompute(
        tx: &mut dyn ReviewTransaction,
        developer_id: i32,
    ) -> Result<DeveloperAggregate, ReviewError> {
        let totals = tx.rating_totals(developer_id).await?;
        let aggregate = DeveloperAggregate::from_totals(developer_id, totals);
        tx.store_aggregate(&aggregate).await?;

        tracing::debug!(
            developer_id,
            rating = %aggregate.rating,
            total_reviews = aggregate.total_reviews,
            "recomputed developer aggregate"
        );
        Ok(aggregate)
    }
}

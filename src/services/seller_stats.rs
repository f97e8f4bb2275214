//! Seller statistics maintenance
//!
//! A confirmed sale bumps the seller's `sells_count` and recomputes the
//! rating as the arithmetic mean over every reviewed order of that seller,
//! rounded to two decimals.

use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, IntoActiveModel, QueryFilter,
    Set,
};

use crate::entities::{orders, prelude::*, users};

/// Mean of the given review ratings, rounded to 2 decimal places.
/// None when nothing has been reviewed yet.
pub fn mean_rating(ratings: &[i16]) -> Option<Decimal> {
    if ratings.is_empty() {
        return None;
    }
    let total: i64 = ratings.iter().map(|r| *r as i64).sum();
    let mean = Decimal::from(total) / Decimal::from(ratings.len() as i64);
    Some(mean.round_dp(2))
}

/// Apply a completed sale to the seller row: +1 sale, rating recomputed
/// from all of the seller's reviewed orders.
pub async fn record_completed_sale(
    db: &DatabaseConnection,
    seller_id: i32,
) -> Result<(), sea_orm::DbErr> {
    let Some(seller) = Users::find_by_id(seller_id).one(db).await? else {
        tracing::warn!(seller_id = seller_id, "Confirmed order references missing seller");
        return Ok(());
    };

    let reviewed = Orders::find()
        .filter(orders::Column::SellerId.eq(seller_id))
        .filter(orders::Column::ReviewRating.is_not_null())
        .all(db)
        .await?;

    let ratings: Vec<i16> = reviewed.iter().filter_map(|o| o.review_rating).collect();
    let rating = mean_rating(&ratings);

    let sells_count = seller.sells_count + 1;
    let mut active: users::ActiveModel = seller.into_active_model();
    active.sells_count = Set(sells_count);
    active.rating = Set(rating);
    active.update(db).await?;

    tracing::info!(
        seller_id = seller_id,
        sells_count = sells_count,
        rating = ?rating,
        "Seller statistics updated"
    );

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_mean_rating_empty() {
        assert_eq!(mean_rating(&[]), None);
    }

    #[test]
    fn test_mean_rating_single() {
        assert_eq!(mean_rating(&[5]), Some(dec!(5)));
    }

    #[test]
    fn test_mean_rating_rounds_to_two_decimals() {
        // (5 + 4 + 4) / 3 = 4.333...
        assert_eq!(mean_rating(&[5, 4, 4]), Some(dec!(4.33)));
        // (5 + 4) / 2 = 4.5
        assert_eq!(mean_rating(&[5, 4]), Some(dec!(4.5)));
    }

    #[test]
    fn test_mean_rating_includes_zero_ratings() {
        assert_eq!(mean_rating(&[0, 5]), Some(dec!(2.5)));
    }
}

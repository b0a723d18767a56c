use anyhow::Result;
use diesel::expression::expression_types::NotSelectable;
use diesel::pg::Pg;
use diesel::prelude::*;
use diesel_async::{pooled_connection::bb8::Pool, AsyncConnection, AsyncPgConnection, RunQueryDsl};
use tracing::debug;

use crate::criteria::{BookingCriteria, Direction, PageRequest, Sort, SortField};
use crate::models::{Booking, BookingPatch, BookingReplacement, NewBooking};
use crate::schema::bookings;

pub type DbPool = Pool<AsyncPgConnection>;

type BoxedQuery<'a> = bookings::BoxedQuery<'a, Pg>;
type BoxedSortExpr = Box<dyn BoxableExpression<bookings::table, Pg, SqlType = NotSelectable>>;

/// Conjuncts the predicates present in one field filter onto a boxed query.
macro_rules! apply_filter {
    ($query:ident, $column:expr, $filter:expr) => {{
        let filter = $filter;
        if let Some(v) = filter.equals {
            $query = $query.filter($column.eq(v));
        }
        if let Some(v) = filter.not_equals {
            $query = $query.filter($column.ne(v));
        }
        if let Some(values) = &filter.is_in {
            $query = $query.filter($column.eq_any(values.clone()));
        }
        if let Some(specified) = filter.specified {
            $query = if specified {
                $query.filter($column.is_not_null())
            } else {
                $query.filter($column.is_null())
            };
        }
        if let Some(v) = filter.greater_than {
            $query = $query.filter($column.gt(v));
        }
        if let Some(v) = filter.greater_than_or_equal {
            $query = $query.filter($column.ge(v));
        }
        if let Some(v) = filter.less_than {
            $query = $query.filter($column.lt(v));
        }
        if let Some(v) = filter.less_than_or_equal {
            $query = $query.filter($column.le(v));
        }
    }};
}

fn filtered(criteria: &BookingCriteria) -> BoxedQuery<'static> {
    let mut query = bookings::table.into_boxed();
    apply_filter!(query, bookings::id, &criteria.id);
    apply_filter!(query, bookings::hotel_id, &criteria.hotel_id);
    apply_filter!(query, bookings::room_id, &criteria.room_id);
    apply_filter!(query, bookings::user_id, &criteria.user_id);
    apply_filter!(query, bookings::checkin, &criteria.checkin);
    apply_filter!(query, bookings::checkout, &criteria.checkout);
    apply_filter!(query, bookings::num_of_guests, &criteria.num_of_guests);
    apply_filter!(query, bookings::final_price, &criteria.final_price);
    query
}

fn sort_expr(sort: &Sort) -> BoxedSortExpr {
    use Direction::*;
    use SortField::*;
    match (sort.field, sort.direction) {
        (Id, Asc) => Box::new(bookings::id.asc()),
        (Id, Desc) => Box::new(bookings::id.desc()),
        (HotelId, Asc) => Box::new(bookings::hotel_id.asc()),
        (HotelId, Desc) => Box::new(bookings::hotel_id.desc()),
        (RoomId, Asc) => Box::new(bookings::room_id.asc()),
        (RoomId, Desc) => Box::new(bookings::room_id.desc()),
        (UserId, Asc) => Box::new(bookings::user_id.asc()),
        (UserId, Desc) => Box::new(bookings::user_id.desc()),
        (Checkin, Asc) => Box::new(bookings::checkin.asc()),
        (Checkin, Desc) => Box::new(bookings::checkin.desc()),
        (Checkout, Asc) => Box::new(bookings::checkout.asc()),
        (Checkout, Desc) => Box::new(bookings::checkout.desc()),
        (NumOfGuests, Asc) => Box::new(bookings::num_of_guests.asc()),
        (NumOfGuests, Desc) => Box::new(bookings::num_of_guests.desc()),
        (FinalPrice, Asc) => Box::new(bookings::final_price.asc()),
        (FinalPrice, Desc) => Box::new(bookings::final_price.desc()),
    }
}

fn page_query(criteria: &BookingCriteria, page: &PageRequest) -> BoxedQuery<'static> {
    let mut query = filtered(criteria);
    if criteria.distinct {
        query = query.distinct();
    }
    let mut sorts = page.sort.iter();
    if let Some(first) = sorts.next() {
        query = query.order_by(sort_expr(first));
        for sort in sorts {
            query = query.then_order_by(sort_expr(sort));
        }
    }
    query.offset(page.offset()).limit(page.size)
}

/// Data-access facade for bookings. Every method is one unit of work against
/// the table; multi-statement operations run inside an explicit transaction.
pub struct BookingService {
    pool: DbPool,
}

impl BookingService {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub async fn save(&self, new_booking: NewBooking) -> Result<Booking> {
        debug!(?new_booking, "saving booking");
        let mut conn = self.pool.get().await?;
        let booking = diesel::insert_into(bookings::table)
            .values(&new_booking)
            .get_result(&mut conn)
            .await?;
        Ok(booking)
    }

    /// Full overwrite of an existing row. Returns `None` when the id is
    /// unknown.
    pub async fn update(&self, id: i64, replacement: BookingReplacement) -> Result<Option<Booking>> {
        debug!(id, "updating booking");
        let mut conn = self.pool.get().await?;
        let updated = diesel::update(bookings::table.find(id))
            .set(&replacement)
            .get_result(&mut conn)
            .await
            .optional()?;
        Ok(updated)
    }

    /// Merge-patch: only fields present on the patch overwrite stored values.
    /// Returns the merged row, or `None` when the id is unknown.
    pub async fn partial_update(&self, id: i64, patch: BookingPatch) -> Result<Option<Booking>> {
        debug!(id, "partially updating booking");
        let mut conn = self.pool.get().await?;
        conn.transaction::<_, anyhow::Error, _>(|conn| {
            Box::pin(async move {
                let existing = bookings::table
                    .find(id)
                    .first::<Booking>(conn)
                    .await
                    .optional()?;
                let Some(existing) = existing else {
                    return Ok(None);
                };
                if patch.is_empty() {
                    return Ok(Some(existing));
                }
                let merged = diesel::update(bookings::table.find(id))
                    .set(&patch)
                    .get_result(conn)
                    .await?;
                Ok(Some(merged))
            })
        })
        .await
    }

    pub async fn find_one(&self, id: i64) -> Result<Option<Booking>> {
        debug!(id, "fetching booking");
        let mut conn = self.pool.get().await?;
        let booking = bookings::table
            .find(id)
            .first::<Booking>(&mut conn)
            .await
            .optional()?;
        Ok(booking)
    }

    /// Returns the requested page plus the unpaginated total matching the
    /// criteria, read in one transaction so both see the same rows.
    pub async fn find_all(
        &self,
        criteria: BookingCriteria,
        page: PageRequest,
    ) -> Result<(Vec<Booking>, i64)> {
        debug!(?criteria, ?page, "listing bookings");
        let mut conn = self.pool.get().await?;
        conn.transaction::<_, anyhow::Error, _>(|conn| {
            Box::pin(async move {
                let items = page_query(&criteria, &page).load::<Booking>(conn).await?;
                let total = filtered(&criteria).count().get_result::<i64>(conn).await?;
                Ok((items, total))
            })
        })
        .await
    }

    pub async fn count(&self, criteria: BookingCriteria) -> Result<i64> {
        debug!(?criteria, "counting bookings");
        let mut conn = self.pool.get().await?;
        let total = filtered(&criteria)
            .count()
            .get_result::<i64>(&mut conn)
            .await?;
        Ok(total)
    }

    /// Idempotent: deleting an absent id is a no-op.
    pub async fn delete(&self, id: i64) -> Result<()> {
        debug!(id, "deleting booking");
        let mut conn = self.pool.get().await?;
        diesel::delete(bookings::table.find(id))
            .execute(&mut conn)
            .await?;
        Ok(())
    }
}

use chrono::NaiveDate;
use diesel::prelude::*;
use serde::{Deserialize, Serialize};

/// A persisted booking row. The id is always present; unsaved bookings are
/// represented by [`NewBooking`] instead of a nullable id.
#[derive(Debug, Clone, PartialEq, Queryable, Identifiable, Serialize, Deserialize)]
#[diesel(table_name = crate::schema::bookings)]
#[serde(rename_all = "camelCase")]
pub struct Booking {
    pub id: i64,
    pub hotel_id: Option<i64>,
    pub room_id: Option<i64>,
    pub user_id: Option<i32>,
    pub checkin: Option<NaiveDate>,
    pub checkout: Option<NaiveDate>,
    pub num_of_guests: Option<i32>,
    pub final_price: Option<f64>,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = crate::schema::bookings)]
pub struct NewBooking {
    pub hotel_id: Option<i64>,
    pub room_id: Option<i64>,
    pub user_id: Option<i32>,
    pub checkin: Option<NaiveDate>,
    pub checkout: Option<NaiveDate>,
    pub num_of_guests: Option<i32>,
    pub final_price: Option<f64>,
}

/// Full-overwrite changeset for PUT: absent fields are written as NULL.
#[derive(Debug, Clone, AsChangeset)]
#[diesel(table_name = crate::schema::bookings)]
#[diesel(treat_none_as_null = true)]
pub struct BookingReplacement {
    pub hotel_id: Option<i64>,
    pub room_id: Option<i64>,
    pub user_id: Option<i32>,
    pub checkin: Option<NaiveDate>,
    pub checkout: Option<NaiveDate>,
    pub num_of_guests: Option<i32>,
    pub final_price: Option<f64>,
}

/// Merge-patch changeset for PATCH: absent fields keep their stored value.
/// There is no way to clear a field to NULL through a patch.
#[derive(Debug, Clone, Default, AsChangeset)]
#[diesel(table_name = crate::schema::bookings)]
pub struct BookingPatch {
    pub hotel_id: Option<i64>,
    pub room_id: Option<i64>,
    pub user_id: Option<i32>,
    pub checkin: Option<NaiveDate>,
    pub checkout: Option<NaiveDate>,
    pub num_of_guests: Option<i32>,
    pub final_price: Option<f64>,
}

impl BookingPatch {
    /// Diesel rejects an empty SET clause, so the facade short-circuits
    /// all-absent patches to a plain read.
    pub fn is_empty(&self) -> bool {
        self.hotel_id.is_none()
            && self.room_id.is_none()
            && self.user_id.is_none()
            && self.checkin.is_none()
            && self.checkout.is_none()
            && self.num_of_guests.is_none()
            && self.final_price.is_none()
    }
}

/// Request body for POST/PUT/PATCH. Keeps `id` optional so the handlers can
/// enforce the id-presence rules before the payload reaches the facade.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingPayload {
    pub id: Option<i64>,
    pub hotel_id: Option<i64>,
    pub room_id: Option<i64>,
    pub user_id: Option<i32>,
    pub checkin: Option<NaiveDate>,
    pub checkout: Option<NaiveDate>,
    pub num_of_guests: Option<i32>,
    pub final_price: Option<f64>,
}

impl BookingPayload {
    pub fn into_new(self) -> NewBooking {
        NewBooking {
            hotel_id: self.hotel_id,
            room_id: self.room_id,
            user_id: self.user_id,
            checkin: self.checkin,
            checkout: self.checkout,
            num_of_guests: self.num_of_guests,
            final_price: self.final_price,
        }
    }

    pub fn into_replacement(self) -> BookingReplacement {
        BookingReplacement {
            hotel_id: self.hotel_id,
            room_id: self.room_id,
            user_id: self.user_id,
            checkin: self.checkin,
            checkout: self.checkout,
            num_of_guests: self.num_of_guests,
            final_price: self.final_price,
        }
    }

    pub fn into_patch(self) -> BookingPatch {
        BookingPatch {
            hotel_id: self.hotel_id,
            room_id: self.room_id,
            user_id: self.user_id,
            checkin: self.checkin,
            checkout: self.checkout,
            num_of_guests: self.num_of_guests,
            final_price: self.final_price,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn booking_serializes_with_camel_case_field_names() {
        let booking = Booking {
            id: 7,
            hotel_id: Some(1),
            room_id: Some(2),
            user_id: Some(3),
            checkin: NaiveDate::from_ymd_opt(2024, 5, 1),
            checkout: NaiveDate::from_ymd_opt(2024, 5, 3),
            num_of_guests: Some(2),
            final_price: Some(199.5),
        };
        let json = serde_json::to_value(&booking).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "id": 7,
                "hotelId": 1,
                "roomId": 2,
                "userId": 3,
                "checkin": "2024-05-01",
                "checkout": "2024-05-03",
                "numOfGuests": 2,
                "finalPrice": 199.5,
            })
        );
    }

    #[test]
    fn payload_without_id_parses() {
        let payload: BookingPayload =
            serde_json::from_str(r#"{"hotelId": 4, "numOfGuests": 2}"#).unwrap();
        assert_eq!(payload.id, None);
        assert_eq!(payload.hotel_id, Some(4));
        assert_eq!(payload.num_of_guests, Some(2));
        assert_eq!(payload.checkin, None);
    }

    #[test]
    fn empty_patch_is_detected() {
        let payload = BookingPayload::default();
        assert!(payload.into_patch().is_empty());

        let payload = BookingPayload {
            final_price: Some(10.0),
            ..Default::default()
        };
        assert!(!payload.into_patch().is_empty());
    }
}

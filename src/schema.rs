diesel::table! {
    bookings (id) {
        id -> Int8,
        hotel_id -> Nullable<Int8>,
        room_id -> Nullable<Int8>,
        user_id -> Nullable<Int4>,
        checkin -> Nullable<Date>,
        checkout -> Nullable<Date>,
        num_of_guests -> Nullable<Int4>,
        final_price -> Nullable<Float8>,
    }
}

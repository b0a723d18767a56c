use chrono::NaiveDate;
use std::str::FromStr;
use thiserror::Error;

/// Errors produced while translating query parameters into criteria.
/// All of them map to a 400 at the HTTP boundary.
#[derive(Debug, Error)]
pub enum CriteriaError {
    #[error("unknown filter parameter `{0}`")]
    UnknownField(String),
    #[error("unsupported operator `{op}` for `{field}`")]
    UnknownOperator { field: String, op: String },
    #[error("invalid value `{value}` for `{field}.{op}`")]
    InvalidValue {
        field: String,
        op: String,
        value: String,
    },
    #[error("invalid sort `{0}`, expected `field` or `field,asc|desc`")]
    InvalidSort(String),
    #[error("invalid `{name}` value `{value}`")]
    InvalidPageParam { name: String, value: String },
}

/// Per-field predicate set. Every predicate present is ANDed into the query;
/// an all-`None` filter matches everything.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RangeFilter<T> {
    pub equals: Option<T>,
    pub not_equals: Option<T>,
    pub is_in: Option<Vec<T>>,
    pub specified: Option<bool>,
    pub greater_than: Option<T>,
    pub greater_than_or_equal: Option<T>,
    pub less_than: Option<T>,
    pub less_than_or_equal: Option<T>,
}

impl<T: FromStr> RangeFilter<T> {
    fn set(&mut self, field: &str, op: &str, raw: &str) -> Result<(), CriteriaError> {
        match op {
            "equals" => self.equals = Some(parse_value(field, op, raw)?),
            "notEquals" => self.not_equals = Some(parse_value(field, op, raw)?),
            "in" => {
                // Repeated `field.in=` parameters accumulate, and each value
                // may itself be a comma-separated list.
                let values = self.is_in.get_or_insert_with(Vec::new);
                for part in raw.split(',') {
                    values.push(parse_value(field, op, part)?);
                }
            }
            "specified" => self.specified = Some(parse_value(field, op, raw)?),
            "greaterThan" => self.greater_than = Some(parse_value(field, op, raw)?),
            "greaterThanOrEqual" => {
                self.greater_than_or_equal = Some(parse_value(field, op, raw)?)
            }
            "lessThan" => self.less_than = Some(parse_value(field, op, raw)?),
            "lessThanOrEqual" => self.less_than_or_equal = Some(parse_value(field, op, raw)?),
            _ => {
                return Err(CriteriaError::UnknownOperator {
                    field: field.to_string(),
                    op: op.to_string(),
                })
            }
        }
        Ok(())
    }
}

fn parse_value<T: FromStr>(field: &str, op: &str, raw: &str) -> Result<T, CriteriaError> {
    raw.trim().parse().map_err(|_| CriteriaError::InvalidValue {
        field: field.to_string(),
        op: op.to_string(),
        value: raw.to_string(),
    })
}

/// All filtering options a list/count request can carry, one filter per
/// booking field.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BookingCriteria {
    pub id: RangeFilter<i64>,
    pub hotel_id: RangeFilter<i64>,
    pub room_id: RangeFilter<i64>,
    pub user_id: RangeFilter<i32>,
    pub checkin: RangeFilter<NaiveDate>,
    pub checkout: RangeFilter<NaiveDate>,
    pub num_of_guests: RangeFilter<i32>,
    pub final_price: RangeFilter<f64>,
    pub distinct: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortField {
    Id,
    HotelId,
    RoomId,
    UserId,
    Checkin,
    Checkout,
    NumOfGuests,
    FinalPrice,
}

impl SortField {
    fn parse(name: &str) -> Option<Self> {
        Some(match name {
            "id" => Self::Id,
            "hotelId" => Self::HotelId,
            "roomId" => Self::RoomId,
            "userId" => Self::UserId,
            "checkin" => Self::Checkin,
            "checkout" => Self::Checkout,
            "numOfGuests" => Self::NumOfGuests,
            "finalPrice" => Self::FinalPrice,
            _ => return None,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Asc,
    Desc,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Sort {
    pub field: SortField,
    pub direction: Direction,
}

impl Sort {
    fn parse(raw: &str) -> Result<Self, CriteriaError> {
        let mut parts = raw.split(',');
        let field = parts
            .next()
            .and_then(SortField::parse)
            .ok_or_else(|| CriteriaError::InvalidSort(raw.to_string()))?;
        let direction = match parts.next() {
            None | Some("asc") => Direction::Asc,
            Some("desc") => Direction::Desc,
            Some(_) => return Err(CriteriaError::InvalidSort(raw.to_string())),
        };
        if parts.next().is_some() {
            return Err(CriteriaError::InvalidSort(raw.to_string()));
        }
        Ok(Sort { field, direction })
    }
}

/// Zero-based page request. Sorts apply in the order they were supplied;
/// an unsorted request falls back to `id,asc`.
#[derive(Debug, Clone, PartialEq)]
pub struct PageRequest {
    pub page: i64,
    pub size: i64,
    pub sort: Vec<Sort>,
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            page: 0,
            size: 20,
            sort: vec![Sort {
                field: SortField::Id,
                direction: Direction::Asc,
            }],
        }
    }
}

impl PageRequest {
    pub fn offset(&self) -> i64 {
        self.page * self.size
    }
}

/// Parses the raw query pairs of a list/count request. Grammar is
/// `field.operator=value` for filters plus the reserved `page`, `size`,
/// `sort` and `distinct` parameters.
pub fn parse_query(
    pairs: &[(String, String)],
) -> Result<(BookingCriteria, PageRequest), CriteriaError> {
    let mut criteria = BookingCriteria::default();
    let mut page = PageRequest::default();
    let mut sorts = Vec::new();

    for (key, value) in pairs {
        match key.as_str() {
            "page" => {
                page.page = parse_page_param(key, value)?;
            }
            "size" => {
                page.size = parse_page_param(key, value)?;
            }
            "sort" => {
                sorts.push(Sort::parse(value)?);
            }
            "distinct" => {
                criteria.distinct = parse_value("distinct", "flag", value)
                    .map_err(|_| CriteriaError::InvalidPageParam {
                        name: key.clone(),
                        value: value.clone(),
                    })?;
            }
            _ => {
                let (field, op) = key
                    .split_once('.')
                    .ok_or_else(|| CriteriaError::UnknownField(key.clone()))?;
                match field {
                    "id" => criteria.id.set(field, op, value)?,
                    "hotelId" => criteria.hotel_id.set(field, op, value)?,
                    "roomId" => criteria.room_id.set(field, op, value)?,
                    "userId" => criteria.user_id.set(field, op, value)?,
                    "checkin" => criteria.checkin.set(field, op, value)?,
                    "checkout" => criteria.checkout.set(field, op, value)?,
                    "numOfGuests" => criteria.num_of_guests.set(field, op, value)?,
                    "finalPrice" => criteria.final_price.set(field, op, value)?,
                    _ => return Err(CriteriaError::UnknownField(key.clone())),
                }
            }
        }
    }

    if !sorts.is_empty() {
        page.sort = sorts;
    }
    Ok((criteria, page))
}

fn parse_page_param(name: &str, value: &str) -> Result<i64, CriteriaError> {
    let parsed: i64 = value.parse().map_err(|_| CriteriaError::InvalidPageParam {
        name: name.to_string(),
        value: value.to_string(),
    })?;
    if parsed < 0 {
        return Err(CriteriaError::InvalidPageParam {
            name: name.to_string(),
            value: value.to_string(),
        });
    }
    Ok(parsed)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pairs(raw: &[(&str, &str)]) -> Vec<(String, String)> {
        raw.iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn empty_query_yields_defaults() {
        let (criteria, page) = parse_query(&[]).unwrap();
        assert_eq!(criteria, BookingCriteria::default());
        assert_eq!(page, PageRequest::default());
        assert_eq!(page.offset(), 0);
    }

    #[test]
    fn equals_and_range_operators_parse() {
        let (criteria, _) = parse_query(&pairs(&[
            ("hotelId.equals", "5"),
            ("numOfGuests.greaterThan", "2"),
            ("finalPrice.lessThanOrEqual", "99.5"),
            ("checkin.greaterThanOrEqual", "2024-05-01"),
        ]))
        .unwrap();
        assert_eq!(criteria.hotel_id.equals, Some(5));
        assert_eq!(criteria.num_of_guests.greater_than, Some(2));
        assert_eq!(criteria.final_price.less_than_or_equal, Some(99.5));
        assert_eq!(
            criteria.checkin.greater_than_or_equal,
            NaiveDate::from_ymd_opt(2024, 5, 1)
        );
    }

    #[test]
    fn in_operator_accumulates_comma_lists_and_repeats() {
        let (criteria, _) = parse_query(&pairs(&[
            ("roomId.in", "1,2"),
            ("roomId.in", "3"),
        ]))
        .unwrap();
        assert_eq!(criteria.room_id.is_in, Some(vec![1, 2, 3]));
    }

    #[test]
    fn specified_and_distinct_flags_parse() {
        let (criteria, _) = parse_query(&pairs(&[
            ("checkout.specified", "false"),
            ("distinct", "true"),
        ]))
        .unwrap();
        assert_eq!(criteria.checkout.specified, Some(false));
        assert!(criteria.distinct);
    }

    #[test]
    fn paging_and_sort_parse() {
        let (_, page) = parse_query(&pairs(&[
            ("page", "3"),
            ("size", "50"),
            ("sort", "checkin,desc"),
            ("sort", "id"),
        ]))
        .unwrap();
        assert_eq!(page.page, 3);
        assert_eq!(page.size, 50);
        assert_eq!(page.offset(), 150);
        assert_eq!(
            page.sort,
            vec![
                Sort {
                    field: SortField::Checkin,
                    direction: Direction::Desc
                },
                Sort {
                    field: SortField::Id,
                    direction: Direction::Asc
                },
            ]
        );
    }

    #[test]
    fn unknown_field_is_rejected() {
        let err = parse_query(&pairs(&[("guestName.equals", "bob")])).unwrap_err();
        assert!(matches!(err, CriteriaError::UnknownField(_)));

        let err = parse_query(&pairs(&[("wat", "1")])).unwrap_err();
        assert!(matches!(err, CriteriaError::UnknownField(_)));
    }

    #[test]
    fn unknown_operator_is_rejected() {
        let err = parse_query(&pairs(&[("hotelId.contains", "5")])).unwrap_err();
        assert!(matches!(err, CriteriaError::UnknownOperator { .. }));
    }

    #[test]
    fn bad_values_are_rejected() {
        let err = parse_query(&pairs(&[("hotelId.equals", "abc")])).unwrap_err();
        assert!(matches!(err, CriteriaError::InvalidValue { .. }));

        let err = parse_query(&pairs(&[("checkin.equals", "01/05/2024")])).unwrap_err();
        assert!(matches!(err, CriteriaError::InvalidValue { .. }));

        let err = parse_query(&pairs(&[("page", "-1")])).unwrap_err();
        assert!(matches!(err, CriteriaError::InvalidPageParam { .. }));

        let err = parse_query(&pairs(&[("sort", "checkin,sideways")])).unwrap_err();
        assert!(matches!(err, CriteriaError::InvalidSort(_)));
    }
}

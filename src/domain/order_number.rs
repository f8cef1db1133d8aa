use chrono::{DateTime, FixedOffset};
use rand::Rng;

pub const ORDER_NUMBER_PREFIX: &str = "ORD";

/// `ORD` + `YYMMDDHHmmss` + three random digits.
///
/// Two orders placed in the same second collide with probability 1/1000, so
/// the number identifies an order for people, not for joins.
pub fn generate<R: Rng + ?Sized>(now: &DateTime<FixedOffset>, rng: &mut R) -> String {
    let suffix: u16 = rng.gen_range(0..1000);
    format!("{ORDER_NUMBER_PREFIX}{}{suffix:03}", now.format("%y%m%d%H%M%S"))
}

#[cfg(test)]
pub fn is_well_formed(candidate: &str) -> bool {
    candidate
        .strip_prefix(ORDER_NUMBER_PREFIX)
        .is_some_and(|digits| digits.len() == 15 && digits.bytes().all(|b| b.is_ascii_digit()))
}

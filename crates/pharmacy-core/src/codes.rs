//! Human-readable identifiers: sale numbers and restock product codes.

use chrono::NaiveDate;
use rand::Rng;

/// Characters used in generated stock codes.
pub const STOCK_CODE_ALPHABET: &[u8; 36] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// Length of a generated stock code.
pub const STOCK_CODE_LEN: usize = 4;

/// How many random codes to try before giving up on finding a free one.
pub const STOCK_CODE_MAX_ATTEMPTS: usize = 100;

/// Formats the sale number for the `n`-th sale of `day`.
///
/// `sales_so_far` is the number of sales already recorded that day, so the
/// first sale gets `0001`.
///
/// ```text
/// SALE-20240309-0001
///      ────┬─── ──┬─
///        day     sequence (count + 1, zero-padded to 4)
/// ```
pub fn sale_number(day: NaiveDate, sales_so_far: i64) -> String {
    format!("{}{:04}", sale_number_prefix(day), sales_so_far + 1)
}

/// The `SALE-YYYYMMDD-` prefix shared by every sale of `day`.
pub fn sale_number_prefix(day: NaiveDate) -> String {
    format!("SALE-{}-", day.format("%Y%m%d"))
}

/// Draws a random 4-character code from `A-Z0-9`.
pub fn random_stock_code() -> String {
    stock_code_with(&mut rand::rng())
}

/// Draws a code from `rng`, every alphabet character equally likely.
pub fn stock_code_with<R: Rng + ?Sized>(rng: &mut R) -> String {
    (0..STOCK_CODE_LEN)
        .map(|_| STOCK_CODE_ALPHABET[rng.random_range(0..STOCK_CODE_ALPHABET.len())] as char)
        .collect()
}

#[cfg(test)]
mod tests {
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    use super::*;

    #[test]
    fn test_sale_number_format() {
        let day = NaiveDate::from_ymd_opt(2024, 3, 9).unwrap();
        assert_eq!(sale_number(day, 0), "SALE-20240309-0001");
        assert_eq!(sale_number(day, 41), "SALE-20240309-0042");
        assert_eq!(sale_number(day, 9999), "SALE-20240309-10000");
    }

    #[test]
    fn test_stock_codes_cover_whole_alphabet() {
        let mut rng = StdRng::seed_from_u64(7);
        let mut seen = [0usize; 36];
        for _ in 0..2_000 {
            for b in stock_code_with(&mut rng).bytes() {
                let index = STOCK_CODE_ALPHABET.iter().position(|c| *c == b).unwrap();
                seen[index] += 1;
            }
        }
        // 8000 draws: each character expects about 222.
        assert!(seen.iter().all(|&n| (150..300).contains(&n)), "{seen:?}");
    }

    #[test]
    fn test_seeded_codes_repeat() {
        let first = stock_code_with(&mut StdRng::seed_from_u64(42));
        let again = stock_code_with(&mut StdRng::seed_from_u64(42));
        assert_eq!(first, again);
    }

    #[test]
    fn test_random_stock_code_shape() {
        for _ in 0..50 {
            let code = random_stock_code();
            assert_eq!(code.len(), STOCK_CODE_LEN);
            assert!(code.bytes().all(|b| STOCK_CODE_ALPHABET.contains(&b)));
        }
    }
}

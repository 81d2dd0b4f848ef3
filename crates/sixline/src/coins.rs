//! Coin tossing: three coins per line, six lines per cast.

use rand::Rng;

use crate::types::{DivinationError, DivinationResult, Polarity};

/// Number of lines in a hexagram.
pub const LINE_COUNT: usize = 6;

const COINS_PER_LINE: u8 = 3;

/// Toss three coins six times using the thread-local RNG.
pub fn toss_coins() -> [u8; LINE_COUNT] {
    toss_coins_with(&mut rand::thread_rng())
}

/// Toss three coins six times, counting backs per line, bottom line first.
pub fn toss_coins_with<R: Rng + ?Sized>(rng: &mut R) -> [u8; LINE_COUNT] {
    let mut backs = [0u8; LINE_COUNT];
    for slot in backs.iter_mut() {
        *slot = (0..COINS_PER_LINE).filter(|_| rng.gen_bool(0.5)).count() as u8;
    }
    backs
}

/// Interpret a number of coin backs as a line.
///
/// 0 backs is old yin and 3 backs is old yang (both moving); 1 back is
/// young yang and 2 backs is young yin.
pub fn line_from_backs(position: usize, backs: u8) -> DivinationResult<(Polarity, bool)> {
    match backs {
        0 => Ok((Polarity::Yin, true)),
        1 => Ok((Polarity::Yang, false)),
        2 => Ok((Polarity::Yin, false)),
        3 => Ok((Polarity::Yang, true)),
        value => Err(DivinationError::InvalidBacks { position, value }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_tosses_stay_in_range() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..200 {
            let backs = toss_coins_with(&mut rng);
            assert!(backs.iter().all(|b| *b <= 3));
        }
    }

    #[test]
    fn test_tosses_vary() {
        let mut rng = StdRng::seed_from_u64(42);
        let first = toss_coins_with(&mut rng);
        let differs = (0..50).any(|_| toss_coins_with(&mut rng) != first);
        assert!(differs);
    }

    #[test]
    fn test_line_mapping() {
        assert_eq!(line_from_backs(1, 0).unwrap(), (Polarity::Yin, true));
        assert_eq!(line_from_backs(1, 1).unwrap(), (Polarity::Yang, false));
        assert_eq!(line_from_backs(1, 2).unwrap(), (Polarity::Yin, false));
        assert_eq!(line_from_backs(1, 3).unwrap(), (Polarity::Yang, true));
    }

    #[test]
    fn test_line_mapping_rejects_four() {
        let err = line_from_backs(4, 4).unwrap_err();
        assert!(err.to_string().contains("line 4"));
    }
}

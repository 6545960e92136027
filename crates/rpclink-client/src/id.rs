use std::time::{SystemTime, UNIX_EPOCH};

use rpclink_envelope::CorrelationId;

/// 36^5: the random component always renders as five base-36 digits.
const RANDOM_SPAN: u32 = 60_466_176;

/// Mints correlation ids: `<millis base36><5 random base36><sequence base36>`.
///
/// The sequence is per generator and strictly increasing; the time and
/// random parts keep ids apart across client instances and restarts.
#[derive(Debug, Default)]
pub struct IdGenerator {
    sequence: u64,
}

impl IdGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next(&mut self) -> CorrelationId {
        self.sequence = self.sequence.wrapping_add(1);

        let millis = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|elapsed| elapsed.as_millis() as u64)
            .unwrap_or(0);
        let random = rand::random::<u32>() % RANDOM_SPAN;

        CorrelationId::new(format!(
            "{}{:0>5}{}",
            to_base36(millis),
            to_base36(u64::from(random)),
            to_base36(self.sequence)
        ))
    }

    /// Number of ids minted so far.
    pub fn issued(&self) -> u64 {
        self.sequence
    }
}

fn to_base36(mut value: u64) -> String {
    const DIGITS: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";
    if value == 0 {
        return "0".to_string();
    }
    let mut out = Vec::with_capacity(13);
    while value > 0 {
        out.push(DIGITS[(value % 36) as usize]);
        value /= 36;
    }
    out.reverse();
    String::from_utf8(out).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    #[test]
    fn base36_digits() {
        assert_eq!(to_base36(0), "0");
        assert_eq!(to_base36(35), "z");
        assert_eq!(to_base36(36), "10");
        assert_eq!(to_base36(u64::MAX), "3w5e11264sgsf");
    }

    #[test]
    fn ids_are_unique_in_a_burst() {
        let mut ids = IdGenerator::new();
        let minted: HashSet<_> = (0..10_000).map(|_| ids.next()).collect();
        assert_eq!(minted.len(), 10_000);
        assert_eq!(ids.issued(), 10_000);
    }

    #[test]
    fn id_ends_with_sequence() {
        let mut ids = IdGenerator::new();
        let first = ids.next();
        let second = ids.next();
        assert!(first.as_str().ends_with('1'));
        assert!(second.as_str().ends_with('2'));
        assert!(first.as_str().chars().all(|c| c.is_ascii_alphanumeric()));
    }
}

/// Signed credential with its validity window, epoch seconds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub value: String,
    pub issued_at: i64,
    pub expires_at: i64,
}

impl Token {
    pub fn new(value: String, issued_at: i64, expires_at: i64) -> Self {
        Self {
            value,
            issued_at,
            expires_at,
        }
    }

    /// Seconds of validity left at `now`, negative once expired.
    pub fn remaining_secs(&self, now: i64) -> i64 {
        self.expires_at - now
    }

    /// Usable without renewal: more than `renewal_margin` seconds left.
    pub fn is_fresh(&self, now: i64, renewal_margin: u64) -> bool {
        self.remaining_secs(now) > renewal_margin as i64
    }

    pub fn bearer(&self) -> String {
        format!("Bearer {}", self.value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn freshness_is_strict_about_the_margin() {
        let token = Token::new("t".into(), 1_000, 2_000);
        assert!(token.is_fresh(1_699, 300));
        assert!(!token.is_fresh(1_700, 300));
        assert!(!token.is_fresh(2_500, 300));
        assert_eq!(token.bearer(), "Bearer t");
    }
}

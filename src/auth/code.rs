use lazy_static::lazy_static;
use rand::{rngs::OsRng, Rng};
use regex::Regex;
use time::Duration;

/// What a verification code is allowed to unlock. Stored in Postgres as the
/// `verification_kind` enum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type)]
#[sqlx(type_name = "verification_kind", rename_all = "snake_case")]
pub enum CodeKind {
    EmailVerification,
    PasswordReset,
}

impl CodeKind {
    pub fn ttl(self) -> Duration {
        match self {
            CodeKind::EmailVerification => Duration::minutes(15),
            CodeKind::PasswordReset => Duration::minutes(30),
        }
    }
}

/// Six decimal digits, never starting with zero.
pub fn generate_code() -> String {
    OsRng.gen_range(100_000..1_000_000).to_string()
}

pub fn is_valid_code(code: &str) -> bool {
    lazy_static! {
        static ref CODE_RE: Regex = Regex::new(r"^\d{6}$").unwrap();
    }
    CODE_RE.is_match(code)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn generated_codes_are_six_digits() {
        for _ in 0..100 {
            let code = generate_code();
            assert_eq!(code.len(), 6);
            assert!(is_valid_code(&code), "bad code: {code}");
            let n: u32 = code.parse().expect("numeric");
            assert!((100_000..1_000_000).contains(&n));
        }
    }

    #[test]
    fn generated_codes_vary() {
        let codes: HashSet<String> = (0..20).map(|_| generate_code()).collect();
        assert!(codes.len() > 1);
    }

    #[test]
    fn code_format_rejects_bad_input() {
        assert!(!is_valid_code(""));
        assert!(!is_valid_code("12345"));
        assert!(!is_valid_code("1234567"));
        assert!(!is_valid_code("12a456"));
        assert!(!is_valid_code(" 123456"));
    }

    #[test]
    fn reset_codes_live_longer_than_verification_codes() {
        assert_eq!(CodeKind::EmailVerification.ttl(), Duration::minutes(15));
        assert_eq!(CodeKind::PasswordReset.ttl(), Duration::minutes(30));
        assert!(CodeKind::PasswordReset.ttl() > CodeKind::EmailVerification.ttl());
    }
}

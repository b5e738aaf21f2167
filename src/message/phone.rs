//! Recipient phone numbers with optional international dialing codes.

use std::fmt;

/// A recipient phone number.
///
/// The dialing code is optional; numbers without one are treated as
/// belonging to the default region (Chinese mainland) by the adapters
/// that care.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PhoneNumber {
    number: String,
    idd_code: Option<u32>,
}

impl PhoneNumber {
    /// Create a phone number without a dialing code.
    pub fn new(number: impl Into<String>) -> Self {
        Self {
            number: number.into(),
            idd_code: None,
        }
    }

    /// Create a phone number with an international dialing code.
    pub fn with_idd_code(idd_code: u32, number: impl Into<String>) -> Self {
        Self {
            number: number.into(),
            idd_code: Some(idd_code),
        }
    }

    /// The bare number, without any prefix.
    pub fn number(&self) -> &str {
        &self.number
    }

    /// The international dialing code, if one was supplied.
    pub fn idd_code(&self) -> Option<u32> {
        self.idd_code
    }

    /// Universal format: `+{idd}{number}`, or the bare number when no
    /// dialing code is set (e.g. `+8618888888888`).
    pub fn universal_number(&self) -> String {
        match self.idd_code {
            Some(code) => format!("+{}{}", code, self.number),
            None => self.number.clone(),
        }
    }

    /// Zero-prefixed format: `00{idd}{number}`, or the bare number when
    /// no dialing code is set (e.g. `008618888888888`).
    pub fn zero_prefixed_number(&self) -> String {
        match self.idd_code {
            Some(code) => format!("00{}{}", code, self.number),
            None => self.number.clone(),
        }
    }

    /// Whether the number is a Chinese mainland number (no dialing code,
    /// or code 86).
    pub fn in_chinese_mainland(&self) -> bool {
        matches!(self.idd_code, None | Some(86))
    }
}

impl fmt::Display for PhoneNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.universal_number())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_number_without_idd_code() {
        let phone = PhoneNumber::new("18888888888");
        assert_eq!(phone.number(), "18888888888");
        assert_eq!(phone.idd_code(), None);
        assert_eq!(phone.universal_number(), "18888888888");
        assert_eq!(phone.zero_prefixed_number(), "18888888888");
    }

    #[test]
    fn test_number_with_idd_code() {
        let phone = PhoneNumber::with_idd_code(86, "18888888888");
        assert_eq!(phone.idd_code(), Some(86));
        assert_eq!(phone.universal_number(), "+8618888888888");
        assert_eq!(phone.zero_prefixed_number(), "008618888888888");
    }

    #[test]
    fn test_in_chinese_mainland() {
        assert!(PhoneNumber::new("18888888888").in_chinese_mainland());
        assert!(PhoneNumber::with_idd_code(86, "18888888888").in_chinese_mainland());
        assert!(!PhoneNumber::with_idd_code(1, "5550100").in_chinese_mainland());
    }

    #[test]
    fn test_display_is_universal() {
        let phone = PhoneNumber::with_idd_code(1, "5550100");
        assert_eq!(phone.to_string(), "+15550100");
    }
}

//! Fixed-point currency amounts
//!
//! Amounts are held as integer minor units (centavos, cents) so offers compare
//! exactly. User input is cleaned the way the offer forms accept it: currency
//! symbols, grouping separators and whitespace are dropped before parsing.
use super::error::{ConfigError, NegotiationError};
use std::fmt;
use std::str::FromStr;

const MINOR_PER_MAJOR: u64 = 100;

#[derive(minicbor::Encode, minicbor::Decode, Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Currency {
    #[default]
    #[n(0)]
    PHP,
    #[n(1)]
    USD,
    #[n(2)]
    GBP,
    #[n(3)]
    EUR,
}

impl Currency {
    pub fn symbol(&self) -> &'static str {
        match self {
            Currency::PHP => "₱",
            Currency::USD => "$",
            Currency::GBP => "£",
            Currency::EUR => "€",
        }
    }
    pub fn code(&self) -> &'static str {
        match self {
            Currency::PHP => "PHP",
            Currency::USD => "USD",
            Currency::GBP => "GBP",
            Currency::EUR => "EUR",
        }
    }
}

impl FromStr for Currency {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "PHP" => Ok(Currency::PHP),
            "USD" => Ok(Currency::USD),
            "GBP" => Ok(Currency::GBP),
            "EUR" => Ok(Currency::EUR),
            _ => Err(ConfigError::Currency(s.to_string())),
        }
    }
}

/// Number of decimals shown. Listing cards use `Zero`, offer forms use `Two`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FractionDigits {
    Zero,
    #[default]
    Two,
}

impl TryFrom<u8> for FractionDigits {
    type Error = ConfigError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(FractionDigits::Zero),
            2 => Ok(FractionDigits::Two),
            other => Err(ConfigError::FractionDigits(other)),
        }
    }
}

impl From<FractionDigits> for u8 {
    fn from(value: FractionDigits) -> Self {
        match value {
            FractionDigits::Zero => 0,
            FractionDigits::Two => 2,
        }
    }
}

/// A non-negative amount in minor units.
#[derive(
    minicbor::Encode,
    minicbor::Decode,
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
)]
pub struct Amount(#[n(0)] u64);

impl Amount {
    pub const ZERO: Amount = Amount(0);

    pub fn from_minor(minor: u64) -> Self {
        Self(minor)
    }
    /// Whole currency units, `None` on overflow.
    pub fn from_major(major: u64) -> Option<Self> {
        major.checked_mul(MINOR_PER_MAJOR).map(Self)
    }
    pub fn minor_units(&self) -> u64 {
        self.0
    }
    pub fn format(&self, currency: Currency, digits: FractionDigits) -> String {
        format!("{}{}", currency.symbol(), render_digits(self.0, digits))
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}.{:02}",
            self.0 / MINOR_PER_MAJOR,
            self.0 % MINOR_PER_MAJOR
        )
    }
}

impl FromStr for Amount {
    type Err = NegotiationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_amount(s)
    }
}

/// Signed difference between two amounts, e.g. an offer against the asking price.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct AmountDelta(i128);

impl AmountDelta {
    pub fn between(amount: Amount, reference: Amount) -> Self {
        Self(i128::from(amount.0) - i128::from(reference.0))
    }
    pub fn minor_units(&self) -> i128 {
        self.0
    }
    pub fn is_over(&self) -> bool {
        self.0 > 0
    }
    pub fn is_under(&self) -> bool {
        self.0 < 0
    }
    pub fn magnitude(&self) -> Amount {
        // |a - b| never exceeds u64::MAX when both sides are u64
        Amount(self.0.unsigned_abs() as u64)
    }
    pub fn format(&self, currency: Currency, digits: FractionDigits) -> String {
        let sign = match self.0.signum() {
            1 => "+",
            -1 => "-",
            _ => "",
        };
        format!("{sign}{}", self.magnitude().format(currency, digits))
    }
}

/// Parse user-entered currency text into an [`Amount`].
///
/// Anything that is not a digit or a decimal point is discarded, so
/// `"₱1,200,000.50"` reads as `1200000.50`. A minus sign ahead of the first
/// digit marks the input as negative and is rejected, as are empty input,
/// more than one decimal point, more than two decimals, and overflow.
pub fn parse_amount(raw: &str) -> Result<Amount, NegotiationError> {
    let invalid = || NegotiationError::InvalidAmount(raw.to_string());

    let first_digit = raw.find(|c: char| c.is_ascii_digit()).ok_or_else(invalid)?;
    if raw[..first_digit].contains(['-', '\u{2212}']) {
        return Err(invalid());
    }

    let cleaned: String = raw
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.')
        .collect();

    let (whole, fraction) = match cleaned.split_once('.') {
        Some((whole, fraction)) => (whole, fraction),
        None => (cleaned.as_str(), ""),
    };
    if fraction.contains('.') || fraction.len() > 2 {
        return Err(invalid());
    }

    let whole: u64 = if whole.is_empty() {
        0
    } else {
        whole.parse().map_err(|_| invalid())?
    };
    let fraction: u64 = match fraction.len() {
        0 => 0,
        1 => fraction.parse::<u64>().map_err(|_| invalid())? * 10,
        _ => fraction.parse().map_err(|_| invalid())?,
    };

    whole
        .checked_mul(MINOR_PER_MAJOR)
        .and_then(|minor| minor.checked_add(fraction))
        .map(Amount)
        .ok_or_else(invalid)
}

// "1,234,567.89" style grouping; Zero rounds half up
fn render_digits(minor: u64, digits: FractionDigits) -> String {
    match digits {
        FractionDigits::Zero => {
            let whole = minor / MINOR_PER_MAJOR + u64::from(minor % MINOR_PER_MAJOR >= 50);
            group_thousands(whole)
        }
        FractionDigits::Two => format!(
            "{}.{:02}",
            group_thousands(minor / MINOR_PER_MAJOR),
            minor % MINOR_PER_MAJOR
        ),
    }
}

fn group_thousands(value: u64) -> String {
    let digits = value.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_peso_input_with_symbol_and_grouping() {
        assert_eq!(
            parse_amount("₱1,200,000.50").unwrap(),
            Amount::from_minor(120_000_050)
        );
    }

    #[test]
    fn parses_single_decimal_as_tenths() {
        assert_eq!(parse_amount("12.5").unwrap(), Amount::from_minor(1_250));
        assert_eq!(parse_amount(".75").unwrap(), Amount::from_minor(75));
        assert_eq!(parse_amount("40.").unwrap(), Amount::from_minor(4_000));
    }

    #[test]
    fn rejects_garbage_and_negatives() {
        for raw in ["abc", "", "   ", "-500", "₱-500", "−20", "1.2.3", "10.005", "."] {
            assert!(
                matches!(parse_amount(raw), Err(NegotiationError::InvalidAmount(_))),
                "{raw:?} should be rejected"
            );
        }
    }

    #[test]
    fn rejects_overflow() {
        assert!(parse_amount("184467440737095516150").is_err());
    }

    #[test]
    fn formats_both_display_conventions() {
        let amount = Amount::from_minor(520_000_050);

        assert_eq!(amount.format(Currency::PHP, FractionDigits::Two), "₱5,200,000.50");
        assert_eq!(amount.format(Currency::PHP, FractionDigits::Zero), "₱5,200,001");
        assert_eq!(Amount::ZERO.format(Currency::USD, FractionDigits::Two), "$0.00");
        assert_eq!(Amount::from_minor(99_900).format(Currency::EUR, FractionDigits::Zero), "€999");
    }

    #[test]
    fn delta_carries_sign() {
        let asking = Amount::from_major(5_000_000).unwrap();
        let low = Amount::from_major(4_800_000).unwrap();

        let delta = AmountDelta::between(low, asking);
        assert!(delta.is_under());
        assert_eq!(delta.format(Currency::PHP, FractionDigits::Zero), "-₱200,000");
        assert_eq!(AmountDelta::between(asking, low).format(Currency::PHP, FractionDigits::Zero), "+₱200,000");
        assert_eq!(AmountDelta::between(asking, asking), AmountDelta::default());
    }

    #[test]
    fn display_is_plain_decimal() {
        assert_eq!(Amount::from_minor(120_000_050).to_string(), "1200000.50");
        assert_eq!("₱7".parse::<Amount>().unwrap().to_string(), "7.00");
    }
}

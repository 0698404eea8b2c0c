//! Utility functions for identifiers

use bech32::Bech32m;
use uuid7::uuid7;

// construct a unique id then encode using bech32
pub fn new_uuid_to_bech32(hrp: &str) -> anyhow::Result<String> {
    let hrp = bech32::Hrp::parse(hrp)?;
    let encode = bech32::encode::<Bech32m>(hrp, uuid7().as_bytes())?;
    Ok(encode)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_carry_their_prefix() {
        let deal = new_uuid_to_bech32("deal_").unwrap();
        let user = new_uuid_to_bech32("user_").unwrap();

        assert!(deal.starts_with("deal_1"));
        assert!(user.starts_with("user_1"));
        assert_ne!(deal, new_uuid_to_bech32("deal_").unwrap());
    }
}

// Stellar hardware wallet app test harness and supporting libraries
//
// Copyright (C) 2024 Alekos Filini
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License
// along with this program.  If not, see <https://www.gnu.org/licenses/>.

pub const FIXTURE_EXTENSION: &str = "raw";

/// Fixture identifiers are camelCase: a lowercase ASCII letter followed by ASCII letters and
/// digits
pub fn is_valid_identifier(id: &str) -> bool {
    let mut chars = id.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_lowercase())
        && chars.all(|c| c.is_ascii_alphanumeric())
}

/// `opCreateAccount` -> `op-create-account`
pub fn file_name(id: &str) -> String {
    let mut out = String::with_capacity(id.len() + 8);
    for (i, c) in id.chars().enumerate() {
        if c.is_ascii_uppercase() {
            if i > 0 {
                out.push('-');
            }
            out.push(c.to_ascii_lowercase());
        } else {
            out.push(c);
        }
    }
    out
}

/// `opCreateAccount` -> `op-create-account.raw`
pub fn fixture_file(id: &str) -> String {
    format!("{}.{}", file_name(id), FIXTURE_EXTENSION)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_file_name() {
        assert_eq!(file_name("opCreateAccount"), "op-create-account");
        assert_eq!(
            file_name("opRevokeSponsorshipEd25519PublicKeySigner"),
            "op-revoke-sponsorship-ed25519-public-key-signer"
        );
        assert_eq!(file_name("txMemoId"), "tx-memo-id");
        assert_eq!(file_name("opInflation"), "op-inflation");
        assert_eq!(fixture_file("opInflation"), "op-inflation.raw");
    }

    #[test]
    fn test_identifiers() {
        assert!(is_valid_identifier("opCreateAccount"));
        assert!(is_valid_identifier("feeBumpTx"));
        assert!(!is_valid_identifier("OpCreateAccount"));
        assert!(!is_valid_identifier("op-create"));
        assert!(!is_valid_identifier(""));
    }

    proptest! {
        #[test]
        fn file_name_is_lowercase(id in "[a-z][a-zA-Z0-9]{0,40}") {
            let name = file_name(&id);
            prop_assert!(!name.chars().any(|c| c.is_ascii_uppercase()));
            prop_assert_eq!(name.len(), id.len() + id.chars().filter(|c| c.is_ascii_uppercase()).count());
        }

        #[test]
        fn file_name_is_injective(a in "[a-z][a-zA-Z]{0,12}", b in "[a-z][a-zA-Z]{0,12}") {
            if a != b {
                prop_assert_ne!(file_name(&a), file_name(&b));
            }
        }
    }
}

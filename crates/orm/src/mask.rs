//! Data masking rules.
//!
//! A column may name a masking rule. The rule is recorded on the column
//! descriptor and applied by whatever reads the rows back.

use std::sync::LazyLock;

use dashmap::DashMap;

/// Masks a text value.
pub type MaskFn = fn(&str) -> String;

/// Mobile phone number: keep the first three and last four characters.
pub const MOBILE: &str = "mobile";
/// Fixed-line phone number: keep the first four and last two characters.
pub const FIXED_PHONE: &str = "fixed_phone";
/// Identity card number: keep the first and the last two characters.
pub const ID_CARD_NUMBER: &str = "id_card_number";
/// Personal name: keep the first character.
pub const CHINESE_NAME: &str = "chinese_name";
/// Postal address: keep the first six characters.
pub const ADDRESS: &str = "address";
/// Email address: keep the first character of the local part and the domain.
pub const EMAIL: &str = "email";
/// Password: mask everything.
pub const PASSWORD: &str = "password";
/// Vehicle licence plate: keep the first two and last character.
pub const CAR_LICENSE: &str = "car_license";
/// Bank card number: keep the first six and last four characters.
pub const BANK_CARD_NUMBER: &str = "bank_card_number";

static RULES: LazyLock<DashMap<String, MaskFn>> = LazyLock::new(|| {
    let rules: DashMap<String, MaskFn> = DashMap::new();
    rules.insert(MOBILE.to_string(), |s| keep(s, 3, 4));
    rules.insert(FIXED_PHONE.to_string(), |s| keep(s, 4, 2));
    rules.insert(ID_CARD_NUMBER.to_string(), |s| keep(s, 1, 2));
    rules.insert(CHINESE_NAME.to_string(), |s| keep(s, 1, 0));
    rules.insert(ADDRESS.to_string(), |s| keep(s, 6, 0));
    rules.insert(EMAIL.to_string(), email);
    rules.insert(PASSWORD.to_string(), |s| "*".repeat(s.chars().count()));
    rules.insert(CAR_LICENSE.to_string(), |s| keep(s, 2, 1));
    rules.insert(BANK_CARD_NUMBER.to_string(), |s| keep(s, 6, 4));
    rules
});

/// Register (or replace) a masking rule.
pub fn register_mask(name: &str, rule: MaskFn) {
    RULES.insert(name.to_string(), rule);
}

/// `true` if a rule with this name is registered.
#[must_use]
pub fn has_mask(name: &str) -> bool {
    RULES.contains_key(name)
}

/// Apply the named rule. Unknown rules leave the text unchanged.
#[must_use]
pub fn mask(name: &str, text: &str) -> String {
    let Some(rule) = RULES.get(name).map(|entry| *entry.value()) else {
        return text.to_string();
    };
    rule(text)
}

// Replaces everything except `head` leading and `tail` trailing characters
// with `*`. Text too short to keep both ends is fully masked.
fn keep(text: &str, head: usize, tail: usize) -> String {
    let chars: Vec<char> = text.chars().collect();
    if chars.len() <= head + tail {
        return "*".repeat(chars.len());
    }
    let hidden = chars.len() - head - tail;
    let mut out: String = chars[..head].iter().collect();
    out.push_str(&"*".repeat(hidden));
    out.extend(&chars[chars.len() - tail..]);
    out
}

fn email(text: &str) -> String {
    match text.split_once('@') {
        Some((local, domain)) if !local.is_empty() => {
            format!("{}@{domain}", keep(local, 1, 0))
        }
        _ => keep(text, 1, 0),
    }
}

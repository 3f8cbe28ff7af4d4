//! Display case conversion for completion entries.

use serde::{Deserialize, Serialize};

/// Case-folding service applied to every name shown in completion lists.
///
/// Implemented by [`CaseMode`] and by any `Fn(&str) -> String`, so hosts can
/// inject their own conversion.
///
/// # Examples
///
/// ```
/// use schema_index_core::{CaseFold, CaseMode};
///
/// assert_eq!(CaseMode::Upper.fold("cust-num"), "CUST-NUM");
/// assert_eq!(CaseMode::Camel.fold("cust-num"), "Cust-Num");
///
/// let reversed = |name: &str| name.chars().rev().collect::<String>();
/// assert_eq!(reversed.fold("abc"), "cba");
/// ```
pub trait CaseFold: Send + Sync {
    fn fold(&self, name: &str) -> String;
}

impl<F> CaseFold for F
where
    F: Fn(&str) -> String + Send + Sync,
{
    fn fold(&self, name: &str) -> String {
        self(name)
    }
}

/// Built-in case conversion modes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CaseMode {
    /// Names are shown as stored in the dump.
    #[default]
    Keep,
    Upper,
    Lower,
    /// First letter and every letter after `-` or `_` upper-cased, the rest
    /// lower-cased.
    Camel,
}

impl CaseFold for CaseMode {
    fn fold(&self, name: &str) -> String {
        match self {
            Self::Keep => name.to_string(),
            Self::Upper => name.to_uppercase(),
            Self::Lower => name.to_lowercase(),
            Self::Camel => camel_case(name),
        }
    }
}

fn camel_case(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut upper_next = true;
    for ch in name.chars() {
        if upper_next {
            out.extend(ch.to_uppercase());
        } else {
            out.extend(ch.to_lowercase());
        }
        upper_next = matches!(ch, '-' | '_');
    }
    out
}

//! Keyspace and complexity estimation for attack configurations.
//!
//! Pure arithmetic over the attack config; the caller supplies resource line
//! counts. Mask keyspace is the product of per-position charset sizes using
//! the standard hashcat built-in charsets.

use crate::error::CoreError;
use crate::types::AttackMode;
use serde::{Deserialize, Serialize};

/// Result of a keyspace estimation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct KeyspaceEstimate {
    pub keyspace: u64,
    pub complexity_score: f64,
}

/// Charset size for a built-in mask token (`?l`, `?u`, …).
fn charset_size(token: char) -> Option<u64> {
    match token {
        'l' => Some(26),
        'u' => Some(26),
        'd' => Some(10),
        's' => Some(33),
        'a' => Some(95),
        'b' => Some(256),
        'h' => Some(16),
        'H' => Some(16),
        _ => None,
    }
}

/// Keyspace of a mask: the product of per-position charset sizes.
///
/// Literal characters contribute a factor of 1; `??` is a literal question
/// mark. An unknown `?x` token is a configuration error.
pub fn mask_keyspace(mask: &str) -> Result<u64, CoreError> {
    let mut keyspace: u64 = 1;
    let mut chars = mask.chars();
    while let Some(c) = chars.next() {
        if c != '?' {
            continue;
        }
        match chars.next() {
            // `??` escapes a literal question mark.
            Some('?') => {}
            Some(token) => match charset_size(token) {
                Some(size) => keyspace = keyspace.saturating_mul(size),
                None => {
                    return Err(CoreError::InvalidAttackConfig(format!(
                        "Unknown mask charset token '?{token}' in mask '{mask}'"
                    )))
                }
            },
            None => {
                return Err(CoreError::InvalidAttackConfig(format!(
                    "Mask '{mask}' ends with a dangling '?'"
                )))
            }
        }
    }
    Ok(keyspace)
}

/// Estimate keyspace and complexity for an attack configuration.
///
/// `wordlist_lines` and `rule_lines` are the line counts of the referenced
/// resources (0 when absent). Dictionary keyspace is
/// `wordlist_lines × max(rule_lines, 1)`; hybrid modes multiply the
/// dictionary keyspace by the mask keyspace.
pub fn estimate(
    mode: AttackMode,
    mask: Option<&str>,
    wordlist_lines: u64,
    rule_lines: u64,
) -> Result<KeyspaceEstimate, CoreError> {
    let dictionary = wordlist_lines.saturating_mul(rule_lines.max(1));
    let keyspace = match mode {
        AttackMode::Dictionary => dictionary,
        AttackMode::Mask => {
            let mask = mask.ok_or_else(|| {
                CoreError::InvalidAttackConfig("Mask attack requires a mask".into())
            })?;
            mask_keyspace(mask)?
        }
        AttackMode::HybridDictMask | AttackMode::HybridMaskDict => {
            let mask = mask.ok_or_else(|| {
                CoreError::InvalidAttackConfig("Hybrid attack requires a mask".into())
            })?;
            dictionary.saturating_mul(mask_keyspace(mask)?)
        }
    };
    Ok(KeyspaceEstimate {
        keyspace,
        complexity_score: complexity(keyspace),
    })
}

/// Complexity score: decimal order of magnitude of the keyspace.
fn complexity(keyspace: u64) -> f64 {
    if keyspace == 0 {
        0.0
    } else {
        (keyspace as f64).log10()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn four_digit_mask_is_ten_thousand() {
        assert_eq!(mask_keyspace("?d?d?d?d").unwrap(), 10_000);
    }

    #[test]
    fn lowercase_pair_is_676() {
        assert_eq!(mask_keyspace("?l?l").unwrap(), 676);
    }

    #[test]
    fn mixed_charsets_multiply() {
        // 26 * 26 * 10 * 33
        assert_eq!(mask_keyspace("?u?l?d?s").unwrap(), 26 * 26 * 10 * 33);
        assert_eq!(mask_keyspace("?a?b").unwrap(), 95 * 256);
        assert_eq!(mask_keyspace("?h?H").unwrap(), 256);
    }

    #[test]
    fn literals_contribute_factor_one() {
        assert_eq!(mask_keyspace("abc?d").unwrap(), 10);
        assert_eq!(mask_keyspace("????d").unwrap(), 10, "?? is a literal");
        assert_eq!(mask_keyspace("").unwrap(), 1);
    }

    #[test]
    fn unknown_token_is_rejected() {
        let err = mask_keyspace("?d?x").unwrap_err();
        assert_eq!(err.status(), 400);
        assert!(err.detail().contains("?x"));
    }

    #[test]
    fn dangling_question_mark_is_rejected() {
        assert!(mask_keyspace("?d?").is_err());
    }

    #[test]
    fn estimate_mask_mode() {
        let est = estimate(AttackMode::Mask, Some("?d?d?d?d"), 0, 0).unwrap();
        assert_eq!(est.keyspace, 10_000);
        assert!(est.complexity_score > 0.0);
        assert!((est.complexity_score - 4.0).abs() < 1e-9);
    }

    #[test]
    fn estimate_dictionary_mode() {
        let est = estimate(AttackMode::Dictionary, None, 14_344_385, 0).unwrap();
        assert_eq!(est.keyspace, 14_344_385);
        let with_rules = estimate(AttackMode::Dictionary, None, 1000, 64).unwrap();
        assert_eq!(with_rules.keyspace, 64_000);
    }

    #[test]
    fn estimate_hybrid_modes_multiply() {
        let est = estimate(AttackMode::HybridDictMask, Some("?d?d"), 100, 0).unwrap();
        assert_eq!(est.keyspace, 10_000);
        let est = estimate(AttackMode::HybridMaskDict, Some("?l"), 10, 2).unwrap();
        assert_eq!(est.keyspace, 26 * 10 * 2);
    }

    #[test]
    fn estimate_mask_mode_requires_mask() {
        assert!(estimate(AttackMode::Mask, None, 0, 0).is_err());
        assert!(estimate(AttackMode::HybridDictMask, None, 10, 0).is_err());
    }

    #[test]
    fn zero_keyspace_has_zero_complexity() {
        let est = estimate(AttackMode::Dictionary, None, 0, 0).unwrap();
        assert_eq!(est.keyspace, 0);
        assert_eq!(est.complexity_score, 0.0);
    }
}

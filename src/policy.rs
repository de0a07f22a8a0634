//! Variant policy resolution.
//!
//! A diff record carries two allele calls and the reference call. The policy
//! decides which call each output stream receives, or, for the unphased
//! regex policy, folds both calls into one token for a single stream.

use crate::variant::{AlleleCall, VariantKind};
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum VariantPolicy {
    /// allele0 to stream A, allele1 to stream B.
    #[default]
    Reported,
    /// The single non-reference call goes to stream A.
    HetFirstAllele,
    /// A seeded coin flip orients each call.
    RandomAllele,
    /// One stream, both calls encoded as a regex token.
    UnphasedRegex,
}

impl VariantPolicy {
    /// Label used in `Phase (...)` and `unphased (...)` annotations.
    pub fn label(&self) -> &'static str {
        match self {
            VariantPolicy::Reported => "REPORTED",
            VariantPolicy::HetFirstAllele => "HETA",
            VariantPolicy::RandomAllele => "RANDOM",
            VariantPolicy::UnphasedRegex => "REGEX",
        }
    }

    /// Number of output streams the policy produces.
    pub fn stream_count(&self) -> usize {
        match self {
            VariantPolicy::UnphasedRegex => 1,
            _ => 2,
        }
    }
}

impl FromStr for VariantPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "reported" => Ok(VariantPolicy::Reported),
            "heta" | "het-first-allele" => Ok(VariantPolicy::HetFirstAllele),
            "random" | "random-allele" => Ok(VariantPolicy::RandomAllele),
            "regex" | "unphased-regex" => Ok(VariantPolicy::UnphasedRegex),
            _ => Err(format!(
                "Unknown variant policy '{}' (expected reported, heta, random or regex)",
                s
            )),
        }
    }
}

impl fmt::Display for VariantPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// What one stream receives for a record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamCall {
    /// The stream follows the reference across the record's span.
    Reference,
    /// The stream carries this sequence (possibly empty) in place of the reference.
    Alt(String),
}

impl StreamCall {
    fn from_allele(allele: &str, reference: &str) -> Self {
        if allele == reference {
            StreamCall::Reference
        } else {
            StreamCall::Alt(allele.to_string())
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    Phased { a: StreamCall, b: StreamCall },
    /// A single stream; `Alt` holds the regex token.
    Unified(StreamCall),
}

/// Resolves allele calls to streams under one policy.
///
/// Each path owns its resolver so random orientation depends only on the seed
/// and the order of records within the path.
#[derive(Debug, Clone)]
pub struct PolicyResolver {
    policy: VariantPolicy,
    rng: SmallRng,
}

impl PolicyResolver {
    pub fn new(policy: VariantPolicy, seed: u64) -> Self {
        Self {
            policy,
            rng: SmallRng::seed_from_u64(seed),
        }
    }

    pub fn policy(&self) -> VariantPolicy {
        self.policy
    }

    pub fn resolve(&mut self, kind: VariantKind, call: &AlleleCall) -> Resolution {
        let reference = call.reference.as_str();
        let (a0, a1) = (call.allele0.as_str(), call.allele1.as_str());

        match self.policy {
            VariantPolicy::Reported => Resolution::Phased {
                a: StreamCall::from_allele(a0, reference),
                b: StreamCall::from_allele(a1, reference),
            },
            VariantPolicy::HetFirstAllele => {
                let (first, second) = if a0 == reference && a1 != reference {
                    (a1, a0)
                } else {
                    (a0, a1)
                };
                Resolution::Phased {
                    a: StreamCall::from_allele(first, reference),
                    b: StreamCall::from_allele(second, reference),
                }
            }
            VariantPolicy::RandomAllele => {
                let (first, second) = if self.rng.gen_bool(0.5) {
                    (a1, a0)
                } else {
                    (a0, a1)
                };
                Resolution::Phased {
                    a: StreamCall::from_allele(first, reference),
                    b: StreamCall::from_allele(second, reference),
                }
            }
            VariantPolicy::UnphasedRegex => {
                if a0 == reference && a1 == reference {
                    Resolution::Unified(StreamCall::Reference)
                } else {
                    Resolution::Unified(StreamCall::Alt(regex_token(kind, call)))
                }
            }
        }
    }
}

/// Encode both calls as one token.
///
/// Homozygous calls are written plainly. Single-base SNP sets become a
/// character class (`[ag]`), everything else an alternation (`(|aa)`), with
/// alternatives sorted and the empty allele written as nothing.
pub fn regex_token(kind: VariantKind, call: &AlleleCall) -> String {
    if call.is_homozygous() {
        return call.allele0.clone();
    }
    let mut alleles = [call.allele0.as_str(), call.allele1.as_str()];
    alleles.sort_unstable();

    if kind == VariantKind::Snp && alleles.iter().all(|a| a.len() == 1) {
        format!("[{}{}]", alleles[0], alleles[1])
    } else {
        format!("({}|{})", alleles[0], alleles[1])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn alt(s: &str) -> StreamCall {
        StreamCall::Alt(s.to_string())
    }

    #[test]
    fn test_parse_policy() {
        assert_eq!("HETA".parse::<VariantPolicy>().unwrap(), VariantPolicy::HetFirstAllele);
        assert_eq!("random".parse::<VariantPolicy>().unwrap(), VariantPolicy::RandomAllele);
        assert_eq!("regex".parse::<VariantPolicy>().unwrap(), VariantPolicy::UnphasedRegex);
        assert!("bogus".parse::<VariantPolicy>().is_err());
        assert_eq!(VariantPolicy::UnphasedRegex.stream_count(), 1);
    }

    #[test]
    fn test_reported_keeps_order() {
        let mut r = PolicyResolver::new(VariantPolicy::Reported, 0);
        let call = AlleleCall::new("C", "A", "C");
        assert_eq!(
            r.resolve(VariantKind::Snp, &call),
            Resolution::Phased {
                a: StreamCall::Reference,
                b: alt("A")
            }
        );
    }

    #[test]
    fn test_het_first_allele_moves_alt_to_a() {
        let mut r = PolicyResolver::new(VariantPolicy::HetFirstAllele, 0);
        let call = AlleleCall::new("C", "A", "C");
        assert_eq!(
            r.resolve(VariantKind::Snp, &call),
            Resolution::Phased {
                a: alt("A"),
                b: StreamCall::Reference
            }
        );

        let both = AlleleCall::new("G", "T", "C");
        assert_eq!(
            r.resolve(VariantKind::Snp, &both),
            Resolution::Phased {
                a: alt("G"),
                b: alt("T")
            }
        );
    }

    #[test]
    fn test_random_is_deterministic() {
        let call = AlleleCall::new("G", "T", "C");
        let run = |seed| {
            let mut r = PolicyResolver::new(VariantPolicy::RandomAllele, seed);
            (0..64)
                .map(|_| r.resolve(VariantKind::Snp, &call))
                .collect::<Vec<_>>()
        };
        let first = run(42);
        assert_eq!(first, run(42));
        assert!(first.iter().any(|r| matches!(r, Resolution::Phased { a, .. } if *a == alt("G"))));
        assert!(first.iter().any(|r| matches!(r, Resolution::Phased { a, .. } if *a == alt("T"))));
    }

    #[test]
    fn test_regex_tokens() {
        assert_eq!(regex_token(VariantKind::Snp, &AlleleCall::new("g", "a", "a")), "[ag]");
        assert_eq!(regex_token(VariantKind::Snp, &AlleleCall::new("t", "t", "a")), "t");
        assert_eq!(regex_token(VariantKind::Indel, &AlleleCall::new("aa", "", "")), "(|aa)");
        assert_eq!(regex_token(VariantKind::Sub, &AlleleCall::new("ct", "ag", "gg")), "(ag|ct)");

        let mut r = PolicyResolver::new(VariantPolicy::UnphasedRegex, 0);
        assert_eq!(
            r.resolve(VariantKind::Snp, &AlleleCall::new("C", "C", "C")),
            Resolution::Unified(StreamCall::Reference)
        );
    }
}

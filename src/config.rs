//! Scan configuration.
//!
//! One immutable value, built once at startup and passed by reference into
//! every scanner. Nothing here is process-global.

use crate::policy::VariantPolicy;

/// Default tag length in bases.
pub const DEFAULT_TAG_LEN: u64 = 24;

/// Default reference build name.
pub const DEFAULT_BUILD: &str = "hg19";

/// How reference positions not covered by any diff record are filled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GapFill {
    /// Lowercase `n` placeholders.
    #[default]
    NoCall,
    /// Bases copied from the reference.
    Reference,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanConfig {
    pub tag_len: u64,
    pub policy: VariantPolicy,
    pub allow_variant_on_tag: bool,
    pub gap_fill: GapFill,
    pub seed: u64,
    pub note: Option<String>,
    pub build: String,
    pub profile: bool,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            tag_len: DEFAULT_TAG_LEN,
            policy: VariantPolicy::default(),
            allow_variant_on_tag: false,
            gap_fill: GapFill::default(),
            seed: 0,
            note: None,
            build: DEFAULT_BUILD.to_string(),
            profile: false,
        }
    }
}

impl ScanConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_tag_len(mut self, tag_len: u64) -> Self {
        self.tag_len = tag_len;
        self
    }

    pub fn with_policy(mut self, policy: VariantPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_allow_variant_on_tag(mut self, allow: bool) -> Self {
        self.allow_variant_on_tag = allow;
        self
    }

    pub fn with_gap_fill(mut self, gap_fill: GapFill) -> Self {
        self.gap_fill = gap_fill;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Free-text note placed first on every emitted tile. Empty means none.
    pub fn with_note(mut self, note: Option<String>) -> Self {
        self.note = note.filter(|n| !n.is_empty());
        self
    }

    pub fn with_build(mut self, build: impl Into<String>) -> Self {
        self.build = build.into();
        self
    }

    pub fn with_profile(mut self, profile: bool) -> Self {
        self.profile = profile;
        self
    }

    /// No-call counts are reported only when gaps hold placeholders.
    #[inline]
    pub fn reports_nocalls(&self) -> bool {
        self.gap_fill == GapFill::NoCall
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cfg = ScanConfig::new();
        assert_eq!(cfg.tag_len, 24);
        assert_eq!(cfg.policy, VariantPolicy::Reported);
        assert!(!cfg.allow_variant_on_tag);
        assert_eq!(cfg.gap_fill, GapFill::NoCall);
        assert!(cfg.reports_nocalls());
        assert_eq!(cfg.build, "hg19");
    }

    #[test]
    fn test_builders() {
        let cfg = ScanConfig::new()
            .with_tag_len(5)
            .with_policy(VariantPolicy::UnphasedRegex)
            .with_gap_fill(GapFill::Reference)
            .with_note(Some(String::new()))
            .with_seed(7);
        assert_eq!(cfg.tag_len, 5);
        assert!(!cfg.reports_nocalls());
        assert_eq!(cfg.note, None);
        assert_eq!(cfg.seed, 7);

        let cfg = cfg.with_note(Some("sample hu0000".to_string()));
        assert_eq!(cfg.note.as_deref(), Some("sample hu0000"));
    }
}

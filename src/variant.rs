//! Core variant types for reference-anchored diff events.

use std::fmt;
use std::str::FromStr;

/// A position on a tiled path, 0-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GenomicOffset {
    pub path: u32,
    pub pos: u64,
}

impl GenomicOffset {
    #[inline]
    pub fn new(path: u32, pos: u64) -> Self {
        Self { path, pos }
    }
}

impl fmt::Display for GenomicOffset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:x}:{}", self.path, self.pos)
    }
}

/// The kind column of a diff record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VariantKind {
    Ref,
    Snp,
    Sub,
    Indel,
}

impl VariantKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            VariantKind::Ref => "REF",
            VariantKind::Snp => "SNP",
            VariantKind::Sub => "SUB",
            VariantKind::Indel => "INDEL",
        }
    }
}

impl FromStr for VariantKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "REF" => Ok(VariantKind::Ref),
            "SNP" => Ok(VariantKind::Snp),
            "SUB" => Ok(VariantKind::Sub),
            "INDEL" => Ok(VariantKind::Indel),
            other => Err(other.to_string()),
        }
    }
}

impl fmt::Display for VariantKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A two-allele call together with the reference call at the same locus.
///
/// Empty strings stand for the empty allele (`-` in the diff stream).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlleleCall {
    pub allele0: String,
    pub allele1: String,
    pub reference: String,
}

impl AlleleCall {
    pub fn new(
        allele0: impl Into<String>,
        allele1: impl Into<String>,
        reference: impl Into<String>,
    ) -> Self {
        Self {
            allele0: allele0.into(),
            allele1: allele1.into(),
            reference: reference.into(),
        }
    }

    /// Both alleles carry the same call.
    #[inline]
    pub fn is_homozygous(&self) -> bool {
        self.allele0 == self.allele1
    }

    /// Reference length consumed by this call.
    #[inline]
    pub fn ref_len(&self) -> u64 {
        self.reference.len() as u64
    }
}

/// A parsed diff event payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Variant {
    Ref { len: u64 },
    Snp(AlleleCall),
    Sub(AlleleCall),
    Indel(AlleleCall),
}

impl Variant {
    pub fn kind(&self) -> VariantKind {
        match self {
            Variant::Ref { .. } => VariantKind::Ref,
            Variant::Snp(_) => VariantKind::Snp,
            Variant::Sub(_) => VariantKind::Sub,
            Variant::Indel(_) => VariantKind::Indel,
        }
    }

    /// The allele call, if this is not a reference run.
    pub fn call(&self) -> Option<&AlleleCall> {
        match self {
            Variant::Ref { .. } => None,
            Variant::Snp(c) | Variant::Sub(c) | Variant::Indel(c) => Some(c),
        }
    }

    /// Reference bases spanned by the event.
    pub fn ref_len(&self) -> u64 {
        match self {
            Variant::Ref { len } => *len,
            Variant::Snp(c) | Variant::Sub(c) | Variant::Indel(c) => c.ref_len(),
        }
    }
}

/// One diff record: a variant anchored at a 0-based, half-open reference range.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiffEvent {
    pub chrom: String,
    pub start: u64,
    pub end: u64,
    pub variant: Variant,
    /// Condensed source line, used as an annotation on the tile it lands in.
    pub provenance: String,
}

impl DiffEvent {
    pub fn new(chrom: impl Into<String>, start: u64, end: u64, variant: Variant) -> Self {
        Self {
            chrom: chrom.into(),
            start,
            end,
            variant,
            provenance: String::new(),
        }
    }

    pub fn with_provenance(mut self, provenance: impl Into<String>) -> Self {
        self.provenance = provenance.into();
        self
    }

    #[inline]
    pub fn kind(&self) -> VariantKind {
        self.variant.kind()
    }

    #[inline]
    pub fn len(&self) -> u64 {
        self.end.saturating_sub(self.start)
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.start >= self.end
    }
}

impl fmt::Display for DiffEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}\t{}\t{}\t{}", self.chrom, self.start, self.end, self.kind())
    }
}

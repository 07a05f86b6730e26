//! Typed records flowing through the decomposition pipeline
//!
//! Global invariants enforced:
//! - Records are created once by their producing stage and never mutated
//!   after production
//! - Unit ordering is discovery order; member ordering is scan order

use serde::{Deserialize, Serialize};

/// Half-open byte range into the original source text
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourceSpan {
    pub start: usize,
    pub end: usize,
}

impl SourceSpan {
    pub fn new(start: usize, end: usize) -> Self {
        SourceSpan { start, end }
    }

    /// Slice the spanned region out of the source text
    pub fn slice<'a>(&self, source: &'a str) -> &'a str {
        &source[self.start..self.end]
    }

    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// One discovered unit ("package"): its canonical name plus the spans of
/// its declaration and implementation regions.
///
/// Either region may be absent: a unit can be discovered from a
/// declaration header only, an implementation header only, or both. The
/// regions are independently sliced substrings; the assembler never
/// assumes an ordering between them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnitSpan {
    /// Canonical (upper-cased) trailing identifier segment
    pub name: String,
    /// Declaration (specification) region, if a declaration header was found
    pub decl: Option<SourceSpan>,
    /// Implementation (body) region, if an implementation header was found
    pub body: Option<SourceSpan>,
}

impl UnitSpan {
    /// Text position used for ordering units deterministically
    pub fn order_key(&self) -> usize {
        match (self.decl, self.body) {
            (Some(d), _) => d.start,
            (None, Some(b)) => b.start,
            (None, None) => usize::MAX,
        }
    }
}

/// Sub-routine kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MemberKind {
    Procedure,
    Function,
}

impl MemberKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MemberKind::Procedure => "procedure",
            MemberKind::Function => "function",
        }
    }
}

/// Visibility of a merged member, decided by whether a declaration-region
/// occurrence existed for it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Visibility {
    Public,
    Private,
}

impl Visibility {
    pub fn as_str(&self) -> &'static str {
        match self {
            Visibility::Public => "public",
            Visibility::Private => "private",
        }
    }
}

/// One sub-routine occurrence, pre-merge.
///
/// A routine appearing in both the declaration and implementation regions
/// yields two `Member` values with the same name; the assembler merges
/// them into one `MergedMember`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Member {
    /// Identifier as written in source (case preserved for display)
    pub name: String,
    pub kind: MemberKind,
    /// Header text (name, parameter list, and return clause for functions)
    /// as a self-contained declaration string
    pub signature_text: String,
    /// Full implementation text including the trailing terminator; empty
    /// for declaration-only occurrences
    pub body_text: String,
    /// Type expression after the return clause (functions only)
    pub return_type: Option<String>,
    /// Raw parameter descriptors, split at top-level commas only
    pub parameters: Vec<String>,
    /// True if this occurrence was found inside the declaration region
    pub is_declared_public: bool,
    /// Owning unit (canonical name)
    pub unit_name: String,
}

impl Member {
    pub fn has_body(&self) -> bool {
        !self.body_text.is_empty()
    }

    /// Case-folded name used for matching
    pub fn folded_name(&self) -> String {
        self.name.to_uppercase()
    }

    /// Normalized parameter signature used to pair declaration and
    /// implementation occurrences of the same overload. Case, extra
    /// whitespace, mode keywords, and default values are spelling
    /// variation, not identity: `p_id NUMBER`, `p_id IN NUMBER`, and
    /// `p_id NUMBER := 1` all describe the same parameter.
    pub fn param_signature(&self) -> String {
        self.parameters
            .iter()
            .map(|p| normalize_param(p))
            .collect::<Vec<_>>()
            .join(",")
    }
}

/// Reduce one raw parameter descriptor to its identity
fn normalize_param(raw: &str) -> String {
    let upper = raw.to_uppercase();
    let before_default = match upper.find(":=") {
        Some(i) => &upper[..i],
        None => upper.as_str(),
    };
    before_default
        .split_whitespace()
        .take_while(|w| *w != "DEFAULT")
        .filter(|w| !matches!(*w, "IN" | "OUT" | "NOCOPY"))
        .collect::<Vec<_>>()
        .join(" ")
}

/// One routine per distinct (name, parameter list) after merge
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MergedMember {
    pub name: String,
    pub kind: MemberKind,
    pub signature_text: String,
    /// Empty when the routine was declared but never implemented (a stub)
    pub body_text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub return_type: Option<String>,
    pub parameters: Vec<String>,
    pub visibility: Visibility,
    /// 0 for the first overload of a name in scan order, incrementing for
    /// each subsequent one
    pub overload_index: usize,
}

impl MergedMember {
    /// Declared but never implemented. Downstream converters must be able
    /// to detect and flag this case.
    pub fn is_stub(&self) -> bool {
        self.body_text.is_empty()
    }
}

/// Fixed strategy marker: every plan entry converts its member into an
/// independent, unit-qualified object.
pub const PLAN_STRATEGY: &str = "standalone_unit_qualified_object";

/// One planned standalone object in a unit's decomposition plan
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanEntry {
    /// `{unit_name}_{member_name}` with a `_v{N}` suffix for the Nth
    /// overload beyond the first
    pub target_object_name: String,
    pub original_name: String,
    pub kind: MemberKind,
    pub visibility: Visibility,
    /// Body text when present, signature text for stubs
    pub source_text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub return_type: Option<String>,
    pub strategy: String,
}

/// Per-unit decomposition result
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitResult {
    pub unit_name: String,
    pub members: Vec<MergedMember>,
    pub total_procedures: usize,
    pub total_functions: usize,
    pub decomposition_plan: Vec<PlanEntry>,
    /// Diagnostic note, set when a caller requested a unit that was not
    /// discovered
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

impl UnitResult {
    /// Well-formed empty result carrying the originally requested name
    pub fn empty(unit_name: String, note: &str) -> Self {
        UnitResult {
            unit_name,
            members: Vec::new(),
            total_procedures: 0,
            total_functions: 0,
            decomposition_plan: Vec::new(),
            note: Some(note.to_string()),
        }
    }
}

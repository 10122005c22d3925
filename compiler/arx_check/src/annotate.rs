//! Per-site results handed to the backend and to editors.
//!
//! The control-flow model is never rewritten. Instead every checked site
//! gets an annotation saying whether its runtime check stays, and every
//! handle use gets a hover record.

use std::fmt::{self, Write};

use arx_diagnostic::emitter::escape_json;
use smallvec::SmallVec;

use crate::interval::{BoundsStatus, Interval};
use crate::ir::{LocalId, Program, SiteId};
use crate::lattice::Typestate;
use crate::pipeline::ProgramReport;

/// Which operation carries the generation check.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum CheckKind {
    /// Field read or write.
    Access,
    /// `arena.remove(h)`.
    Remove,
    /// Argument `index` of a call to a frozen function that relies on the
    /// caller having checked it.
    CallArgument { index: u32 },
}

impl fmt::Display for CheckKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CheckKind::Access => write!(f, "access"),
            CheckKind::Remove => write!(f, "remove"),
            CheckKind::CallArgument { index } => write!(f, "call argument {index}"),
        }
    }
}

/// Fate of one runtime generation check.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum CheckStatus {
    /// No check needed.
    Eliminated,
    /// An earlier check at this site already covers it.
    CoalescedInto(SiteId),
    /// The check stays.
    Retained,
}

impl CheckStatus {
    pub fn is_retained(self) -> bool {
        matches!(self, CheckStatus::Retained)
    }
}

impl fmt::Display for CheckStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CheckStatus::Eliminated => write!(f, "eliminated"),
            CheckStatus::CoalescedInto(site) => write!(f, "coalesced-into {site}"),
            CheckStatus::Retained => write!(f, "retained"),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CheckAnnotation {
    pub site: SiteId,
    pub handle: LocalId,
    pub kind: CheckKind,
    pub status: CheckStatus,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct BoundsAnnotation {
    pub site: SiteId,
    pub array: LocalId,
    pub status: BoundsStatus,
    pub interval: Interval,
}

/// Typestate of one handle local at one statement.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct HoverInfo {
    pub site: SiteId,
    pub local: LocalId,
    pub state: Typestate,
    /// Locals known to hold the same handle.
    pub aliases: SmallVec<[LocalId; 4]>,
}

/// Render every annotation of a report as JSON for editor tooling.
///
/// Sites carry their source span so a client can place them without
/// knowing the block layout.
pub fn annotations_json(report: &ProgramReport, program: &Program) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "[");
    for (fi, function) in report.functions.iter().enumerate() {
        let Some(func) = program.function(function.name) else {
            continue;
        };
        let name = program.interner.lookup(function.name);
        let _ = writeln!(out, "  {{");
        let _ = writeln!(out, "    \"function\": \"{}\",", escape_json(name));

        let _ = writeln!(out, "    \"checks\": [");
        for (i, check) in function.checks.iter().enumerate() {
            let span = func.span_of(check.site);
            let _ = writeln!(
                out,
                "      {{ \"site\": \"{}\", \"start\": {}, \"end\": {}, \"handle\": \"{}\", \"kind\": \"{}\", \"status\": \"{}\" }}{}",
                check.site,
                span.start,
                span.end,
                escape_json(&func.local_name(check.handle, &program.interner)),
                check.kind,
                check.status,
                comma(i, function.checks.len()),
            );
        }
        let _ = writeln!(out, "    ],");

        let _ = writeln!(out, "    \"bounds\": [");
        for (i, bounds) in function.bounds.iter().enumerate() {
            let span = func.span_of(bounds.site);
            let status = match bounds.status {
                BoundsStatus::Eliminated => "eliminated",
                BoundsStatus::Retained(_) => "retained",
            };
            let _ = writeln!(
                out,
                "      {{ \"site\": \"{}\", \"start\": {}, \"end\": {}, \"status\": \"{status}\", \"range\": \"{}\" }}{}",
                bounds.site,
                span.start,
                span.end,
                escape_json(&bounds.interval.to_string()),
                comma(i, function.bounds.len()),
            );
        }
        let _ = writeln!(out, "    ],");

        let _ = writeln!(out, "    \"hover\": [");
        for (i, hover) in function.hover.iter().enumerate() {
            let span = func.span_of(hover.site);
            let aliases: Vec<String> = hover
                .aliases
                .iter()
                .map(|&a| format!("\"{}\"", escape_json(&func.local_name(a, &program.interner))))
                .collect();
            let _ = writeln!(
                out,
                "      {{ \"start\": {}, \"end\": {}, \"local\": \"{}\", \"state\": \"{}\", \"aliases\": [{}] }}{}",
                span.start,
                span.end,
                escape_json(&func.local_name(hover.local, &program.interner)),
                hover.state,
                aliases.join(", "),
                comma(i, function.hover.len()),
            );
        }
        let _ = writeln!(out, "    ]");
        let _ = writeln!(out, "  }}{}", comma(fi, report.functions.len()));
    }
    let _ = writeln!(out, "]");
    out
}

fn comma(index: usize, total: usize) -> &'static str {
    if index + 1 < total {
        ","
    } else {
        ""
    }
}

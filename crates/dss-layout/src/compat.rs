//! Layout compatibility between the module an owner is bound to and the
//! module it is about to be rebound to.
//!
//! A new layout is compatible with an old one when every old variable is
//! still present under the same name with the same slot, offset, width and
//! kind, and every new variable lands in bytes the old layout never used.

use serde::{Deserialize, Serialize};

use crate::descriptor::{ModuleDescriptor, VariableDescriptor};

/// What went wrong with one variable.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LayoutViolationKind {
    /// Gone from the new layout, nothing in its place.
    Removed,
    /// Same bytes, different name.
    Renamed,
    /// Same name, different slot or offset.
    Moved,
    /// Same name and position, different width.
    Resized,
    /// Same name and position, different kind.
    Retyped,
    /// A new variable sits on bytes the old layout uses.
    Overlap,
}

/// A single incompatibility.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayoutViolation {
    pub variable: String,
    pub kind: LayoutViolationKind,
    pub description: String,
}

impl std::fmt::Display for LayoutViolation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?} '{}': {}", self.kind, self.variable, self.description)
    }
}

/// Result of comparing two layouts.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompatReport {
    pub violations: Vec<LayoutViolation>,
    /// Names of variables that only exist in the new layout and are safe.
    pub appended: Vec<String>,
}

impl CompatReport {
    pub fn is_compatible(&self) -> bool {
        self.violations.is_empty()
    }

    /// One line per violation.
    pub fn summary(&self) -> String {
        self.violations
            .iter()
            .map(|v| v.to_string())
            .collect::<Vec<_>>()
            .join("; ")
    }
}

impl std::fmt::Display for CompatReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.is_compatible() {
            write!(f, "compatible ({} appended)", self.appended.len())
        } else {
            write!(f, "{}", self.summary())
        }
    }
}

fn position(var: &VariableDescriptor) -> String {
    format!("slot {} [{}..{})", var.slot, var.byte_offset, var.end())
}

/// Compare `old` against `new`.
pub fn check_compatibility(old: &ModuleDescriptor, new: &ModuleDescriptor) -> CompatReport {
    let mut report = CompatReport::default();

    for before in old.variables() {
        match new.get(&before.name) {
            Some(after) => {
                let (kind, description) = if before.slot != after.slot
                    || before.byte_offset != after.byte_offset
                {
                    (
                        LayoutViolationKind::Moved,
                        format!("{} -> {}", position(before), position(after)),
                    )
                } else if before.width != after.width {
                    (
                        LayoutViolationKind::Resized,
                        format!("{} -> {} bytes", before.width, after.width),
                    )
                } else if before.kind != after.kind {
                    (
                        LayoutViolationKind::Retyped,
                        format!("{:?} -> {:?}", before.kind, after.kind),
                    )
                } else {
                    continue;
                };
                report.violations.push(LayoutViolation {
                    variable: before.name.clone(),
                    kind,
                    description,
                });
            }
            None => {
                let renamed = new
                    .variables()
                    .iter()
                    .find(|v| old.get(&v.name).is_none() && v.same_position(before));
                let violation = match renamed {
                    Some(to) => LayoutViolation {
                        variable: before.name.clone(),
                        kind: LayoutViolationKind::Renamed,
                        description: format!("now '{}' at {}", to.name, position(to)),
                    },
                    None => LayoutViolation {
                        variable: before.name.clone(),
                        kind: LayoutViolationKind::Removed,
                        description: format!("was at {}", position(before)),
                    },
                };
                report.violations.push(violation);
            }
        }
    }

    for after in new.variables() {
        if old.get(&after.name).is_some() {
            continue;
        }
        let renamed_target = old
            .variables()
            .iter()
            .any(|v| new.get(&v.name).is_none() && v.same_position(after));
        if renamed_target {
            continue;
        }
        match old.variables().iter().find(|v| v.overlaps(after)) {
            Some(clash) => report.violations.push(LayoutViolation {
                variable: after.name.clone(),
                kind: LayoutViolationKind::Overlap,
                description: format!("{} overlaps '{}'", position(after), clash.name),
            }),
            None => report.appended.push(after.name.clone()),
        }
    }

    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::planner::{Declaration, LayoutPlanner};

    fn counter_v1() -> ModuleDescriptor {
        LayoutPlanner::with_reserved(2)
            .declare(Declaration::uint("count", 256))
            .declare(Declaration::address("owner"))
            .declare(Declaration::uint("last_updated", 256))
            .build()
            .unwrap()
    }

    #[test]
    fn identical_layouts_are_compatible() {
        let report = check_compatibility(&counter_v1(), &counter_v1());
        assert!(report.is_compatible());
        assert!(report.appended.is_empty());
    }

    #[test]
    fn appending_is_compatible() {
        let v2 = LayoutPlanner::with_reserved(2)
            .declare(Declaration::uint("count", 256))
            .declare(Declaration::address("owner"))
            .declare(Declaration::uint("last_updated", 256))
            .declare(Declaration::uint("total_operations", 256))
            .build()
            .unwrap();
        let report = check_compatibility(&counter_v1(), &v2);
        assert!(report.is_compatible(), "{report}");
        assert_eq!(report.appended, vec!["total_operations".to_string()]);
    }

    #[test]
    fn dropping_reserved_slots_is_rejected() {
        let broken = LayoutPlanner::new()
            .declare(Declaration::uint("count", 256))
            .declare(Declaration::address("owner"))
            .declare(Declaration::uint("last_updated", 256))
            .build()
            .unwrap();
        let report = check_compatibility(&counter_v1(), &broken);
        assert!(!report.is_compatible());
        let moved: Vec<_> = report
            .violations
            .iter()
            .filter(|v| v.kind == LayoutViolationKind::Moved)
            .map(|v| v.variable.as_str())
            .collect();
        assert_eq!(moved, vec!["count", "owner", "last_updated"]);
        assert!(report
            .violations
            .iter()
            .any(|v| v.variable == "__gap_0" && v.kind == LayoutViolationKind::Removed));
    }

    #[test]
    fn renaming_is_reported() {
        let old = LayoutPlanner::plan(&[Declaration::uint("count", 256)]).unwrap();
        let new = LayoutPlanner::plan(&[Declaration::uint("counter", 256)]).unwrap();
        let report = check_compatibility(&old, &new);
        assert_eq!(report.violations.len(), 1);
        assert_eq!(report.violations[0].kind, LayoutViolationKind::Renamed);
        assert!(report.appended.is_empty());
    }

    #[test]
    fn resizing_is_reported() {
        let old = LayoutPlanner::plan(&[Declaration::uint("count", 128)]).unwrap();
        let new = LayoutPlanner::plan(&[Declaration::uint("count", 256)]).unwrap();
        let report = check_compatibility(&old, &new);
        assert_eq!(report.violations[0].kind, LayoutViolationKind::Resized);
    }

    #[test]
    fn retyping_is_reported() {
        let old = LayoutPlanner::plan(&[Declaration::uint("data", 256)]).unwrap();
        let new = LayoutPlanner::plan(&[Declaration::mapping("data")]).unwrap();
        let report = check_compatibility(&old, &new);
        assert_eq!(report.violations[0].kind, LayoutViolationKind::Retyped);
    }

    #[test]
    fn new_variable_in_used_bytes_overlaps() {
        let old = LayoutPlanner::plan(&[
            Declaration::uint("a", 128),
            Declaration::uint("b", 128),
        ])
        .unwrap();
        let new = LayoutPlanner::plan(&[
            Declaration::uint("a", 128),
            Declaration::uint("z", 64),
        ])
        .unwrap();
        let report = check_compatibility(&old, &new);
        assert!(report
            .violations
            .iter()
            .any(|v| v.variable == "b" && v.kind == LayoutViolationKind::Removed));
        assert!(report
            .violations
            .iter()
            .any(|v| v.variable == "z" && v.kind == LayoutViolationKind::Overlap));
    }

    #[test]
    fn filling_free_bytes_of_a_packed_slot_is_fine() {
        let old = LayoutPlanner::plan(&[Declaration::uint("a", 128)]).unwrap();
        let new = LayoutPlanner::plan(&[
            Declaration::uint("a", 128),
            Declaration::uint("b", 128),
        ])
        .unwrap();
        let report = check_compatibility(&old, &new);
        assert!(report.is_compatible());
        assert_eq!(report.appended, vec!["b".to_string()]);
    }

    #[test]
    fn summary_mentions_every_violation() {
        let old = LayoutPlanner::plan(&[
            Declaration::uint("a", 256),
            Declaration::uint("b", 256),
        ])
        .unwrap();
        let new = ModuleDescriptor::empty();
        let report = check_compatibility(&old, &new);
        let text = report.summary();
        assert!(text.contains("'a'"));
        assert!(text.contains("'b'"));
    }
}

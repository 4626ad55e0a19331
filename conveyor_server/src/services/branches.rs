//! Dist-git branch alias resolution.
//!
//! Job configurations name branches either literally ("f40", "epel9") or
//! through aliases ("fedora-stable"). Resolution is a pure function over the
//! release table below; membership checks downstream are exact string
//! matches, never patterns.

use std::collections::BTreeSet;

/// Fedora releases currently maintained as stable.
const STABLE_VERSIONS: &[u32] = &[40, 41];

/// The branched (not yet released) version.
const BRANCHED_VERSION: u32 = 42;

fn branch_name(version: u32) -> String {
    format!("f{version}")
}

/// Expand branch names and aliases into the concrete branch set.
///
/// `default_dg_branch` names the rolling branch: the build system calls it
/// "rawhide" while dist-git may call it "main", so callers pick.
pub fn get_branches<I, S>(aliases: I, default_dg_branch: &str) -> BTreeSet<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut branches = BTreeSet::new();
    for alias in aliases {
        match alias.as_ref() {
            "fedora-stable" => {
                branches.extend(STABLE_VERSIONS.iter().map(|v| branch_name(*v)));
            }
            "fedora-development" => {
                branches.insert(branch_name(BRANCHED_VERSION));
                branches.insert(default_dg_branch.to_string());
            }
            "fedora-latest" => {
                branches.insert(branch_name(BRANCHED_VERSION));
            }
            "fedora-latest-stable" => {
                if let Some(latest) = STABLE_VERSIONS.iter().max() {
                    branches.insert(branch_name(*latest));
                }
            }
            "fedora-all" => {
                branches.extend(STABLE_VERSIONS.iter().map(|v| branch_name(*v)));
                branches.insert(branch_name(BRANCHED_VERSION));
                branches.insert(default_dg_branch.to_string());
            }
            "fedora-rawhide" | "rawhide" | "main" => {
                branches.insert(default_dg_branch.to_string());
            }
            // Anything else is already a concrete branch name.
            name => {
                branches.insert(name.to_string());
            }
        }
    }
    branches
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resolved(aliases: &[&str]) -> BTreeSet<String> {
        get_branches(aliases.iter().copied(), "rawhide")
    }

    #[test]
    fn test_fedora_stable_expands_to_stable_releases() {
        let branches = resolved(&["fedora-stable"]);
        assert!(branches.contains("f40"));
        assert!(branches.contains("f41"));
        assert!(!branches.contains("rawhide"));
        assert!(!branches.contains("f42"));
    }

    #[test]
    fn test_fedora_development_includes_rolling_branch() {
        let branches = resolved(&["fedora-development"]);
        assert!(branches.contains("rawhide"));
        assert!(branches.contains("f42"));
    }

    #[test]
    fn test_fedora_all_is_union() {
        let branches = resolved(&["fedora-all"]);
        for expected in ["f40", "f41", "f42", "rawhide"] {
            assert!(branches.contains(expected), "missing {expected}");
        }
    }

    #[test]
    fn test_rawhide_alias_uses_default_branch_name() {
        let branches = get_branches(["rawhide"], "main");
        assert_eq!(branches, BTreeSet::from(["main".to_string()]));
    }

    #[test]
    fn test_concrete_names_pass_through() {
        let branches = resolved(&["epel9", "f38"]);
        assert!(branches.contains("epel9"));
        assert!(branches.contains("f38"));
        assert_eq!(branches.len(), 2);
    }

    #[test]
    fn test_latest_stable() {
        let branches = resolved(&["fedora-latest-stable"]);
        assert_eq!(branches, BTreeSet::from(["f41".to_string()]));
    }
}

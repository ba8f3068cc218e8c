//! Mutation executor.
//!
//! Applies a [`Plan`] step by step through the [`FileSystem`] port. Each step
//! is its own atomic syscall-equivalent; there is no cross-step rollback, so
//! a failure partway through leaves already-applied steps in place (§7).

use log::{debug, info};

use crate::{error::Result, planner::{FsOp, Plan}, ports::FileSystem};

/// Apply every step of `plan` in order, stopping at the first I/O failure.
pub fn apply(fs: &dyn FileSystem, plan: &Plan) -> Result<()> {
    info!("applying {} plan with {} step(s)", plan.kind, plan.len());
    for op in &plan.ops {
        match op {
            FsOp::Rename { from, to } => {
                debug!("rename {} -> {}", from.display(), to.display());
                fs.rename(from, to)?;
            }
            FsOp::Create { path, contents } => {
                debug!("create {}", path.display());
                fs.write(path, contents)?;
            }
            FsOp::Delete { path } => {
                debug!("delete {}", path.display());
                fs.delete(path)?;
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::InMemoryFileSystem;
    use std::path::PathBuf;

    #[test]
    fn applies_every_step_in_order() {
        let fs = InMemoryFileSystem::new();
        fs.seed(PathBuf::from("/o/a.md"), "body");
        let plan = Plan {
            kind: "test",
            ops: vec![
                FsOp::Rename {
                    from: PathBuf::from("/o/a.md"),
                    to: PathBuf::from("/o/b.md"),
                },
                FsOp::Create {
                    path: PathBuf::from("/o/c.md"),
                    contents: "new".to_string(),
                },
            ],
        };
        apply(&fs, &plan).unwrap();
        let snapshot = fs.snapshot();
        assert!(!snapshot.contains_key(&PathBuf::from("/o/a.md")));
        assert_eq!(snapshot.get(&PathBuf::from("/o/b.md")).unwrap(), "body");
        assert_eq!(snapshot.get(&PathBuf::from("/o/c.md")).unwrap(), "new");
    }

    #[test]
    fn stops_at_first_failure_leaving_prior_steps_applied() {
        let fs = InMemoryFileSystem::new();
        fs.seed(PathBuf::from("/o/a.md"), "body");
        let plan = Plan {
            kind: "test",
            ops: vec![
                FsOp::Create {
                    path: PathBuf::from("/o/z.md"),
                    contents: "x".to_string(),
                },
                FsOp::Rename {
                    from: PathBuf::from("/o/missing.md"),
                    to: PathBuf::from("/o/y.md"),
                },
            ],
        };
        let result = apply(&fs, &plan);
        assert!(result.is_err());
        assert!(fs.snapshot().contains_key(&PathBuf::from("/o/z.md")));
    }
}

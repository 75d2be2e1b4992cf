//! Path helpers

use std::path::{Path, PathBuf};

/// Expand `~`, `$VAR` and `${VAR}`; the input is returned unchanged if a variable is unset.
pub fn expand_env_vars(path: &str) -> String {
    shellexpand::full(path)
        .map(|s| s.into_owned())
        .unwrap_or_else(|_| path.to_string())
}

/// [`expand_env_vars`] for a path.
pub fn expand_path(path: &Path) -> PathBuf {
    PathBuf::from(expand_env_vars(path.to_string_lossy().as_ref()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn given_home_variable_when_expanding_then_replaced() {
        let home = std::env::var("HOME").expect("HOME should be set");
        assert_eq!(expand_env_vars("$HOME/out"), format!("{home}/out"));
        assert!(expand_path(Path::new("~/out")).starts_with(&home));
    }

    #[test]
    fn given_unset_variable_when_expanding_then_returns_input() {
        assert_eq!(
            expand_env_vars("$DEDUCTREE_SURELY_UNSET_VAR/x"),
            "$DEDUCTREE_SURELY_UNSET_VAR/x"
        );
    }
}

use std::path::PathBuf;

/// Local speech needs macOS `say` on the PATH.
pub fn local_synthesis_available() -> bool {
    cfg!(target_os = "macos") && find_in_path("say").is_some()
}

pub fn find_in_path(program: &str) -> Option<PathBuf> {
    which::which(program).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_program_is_not_found() {
        assert!(find_in_path("definitely-not-a-real-program-4711").is_none());
    }

    #[cfg(not(target_os = "macos"))]
    #[test]
    fn test_no_local_synthesis_off_macos() {
        assert!(!local_synthesis_available());
    }
}

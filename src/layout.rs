/// Path prefixes under which the header/footer chrome is suppressed. The admin
/// dashboard renders its own sidebar layout.
pub const CHROME_DENY_PREFIXES: &[&str] = &[
    "/admin-dashboard",
    "/admin-dashboard/dashboard",
    "/admin-dashboard/all-customers",
];

/// should_show_chrome
///
/// `false` when `current_path` starts with any of `deny_prefixes`, `true`
/// otherwise. Prefix matching, so nested sub-routes inherit the decision.
pub fn should_show_chrome(current_path: &str, deny_prefixes: &[&str]) -> bool {
    !deny_prefixes
        .iter()
        .any(|prefix| current_path.starts_with(prefix))
}

/// Chrome visibility against the fixed deny-list.
pub fn chrome_visible(current_path: &str) -> bool {
    should_show_chrome(current_path, CHROME_DENY_PREFIXES)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn admin_paths_hide_chrome() {
        assert!(!chrome_visible("/admin-dashboard"));
        assert!(!chrome_visible("/admin-dashboard/dashboard"));
        assert!(!chrome_visible("/admin-dashboard/all-customers"));
        assert!(!chrome_visible("/admin-dashboard/edit-book-form/42"));
    }

    #[test]
    fn public_paths_show_chrome() {
        assert!(chrome_visible("/"));
        assert!(chrome_visible("/public-books"));
        assert!(chrome_visible("/login"));
    }

    #[test]
    fn empty_deny_list_always_shows_chrome() {
        assert!(should_show_chrome("/admin-dashboard", &[]));
    }
}

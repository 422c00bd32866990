use std::collections::BTreeMap;
use std::sync::LazyLock;

use serde::Serialize;
use ts_rs::TS;
use utoipa::ToSchema;

use crate::{
    context::NavigationContext,
    guard::{self, Decision},
    layout,
    session::{Role, Session},
};

/// View
///
/// Every screen the portal can mount. The shell only names the view; rendering
/// it is the front-end's business.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, TS, ToSchema)]
#[serde(rename_all = "kebab-case")]
#[ts(export)]
pub enum View {
    Home,
    Register,
    Login,
    PublicBooks,
    BookDetails,
    ProfileInfo,
    UserDashboard,
    /// Sidebar layout wrapping every admin child view.
    AdminLayout,
    AdminDashboard,
    AllCustomers,
    AllBooks,
    AddBookForm,
    EditBookForm,
    IssueBookForm,
    IssueBookHistory,
    NotFound,
}

/// Access
///
/// Guard requirement attached to a navigation entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Public,
    /// Requires a session; `Some(role)` additionally requires that exact role.
    Protected(Option<Role>),
}

/// NavEntry
///
/// One node of the static navigation tree. Patterns are relative to the parent:
/// `""` is the index child, `"*"` the catch-all, `":name"` a placeholder for one
/// path segment.
#[derive(Debug)]
pub struct NavEntry {
    pub pattern: &'static str,
    pub view: View,
    pub access: Access,
    pub children: Vec<NavEntry>,
}

impl NavEntry {
    fn leaf(pattern: &'static str, view: View) -> Self {
        Self {
            pattern,
            view,
            access: Access::Public,
            children: Vec::new(),
        }
    }

    fn guarded(mut self, role: Role) -> Self {
        self.access = Access::Protected(Some(role));
        self
    }

    fn with_children(mut self, children: Vec<NavEntry>) -> Self {
        self.children = children;
        self
    }
}

pub const ADMIN_ROOT: &str = "/admin-dashboard";

static NAVIGATION_TREE: LazyLock<Vec<NavEntry>> = LazyLock::new(|| {
    vec![
        NavEntry::leaf("/", View::Home),
        NavEntry::leaf("/signup", View::Register),
        NavEntry::leaf("/login", View::Login),
        NavEntry::leaf("/public-books", View::PublicBooks),
        NavEntry::leaf("/book-view-details/:id", View::BookDetails),
        NavEntry::leaf("/profile-info", View::ProfileInfo),
        NavEntry::leaf("/user-dashboard", View::UserDashboard).guarded(Role::User),
        NavEntry::leaf(ADMIN_ROOT, View::AdminLayout)
            .guarded(Role::Admin)
            .with_children(vec![
                NavEntry::leaf("", View::AdminDashboard),
                NavEntry::leaf("all-customers", View::AllCustomers),
                NavEntry::leaf("all-books", View::AllBooks),
                NavEntry::leaf("add-book-form", View::AddBookForm),
                NavEntry::leaf("edit-book-form/:id", View::EditBookForm),
                NavEntry::leaf("issue-book-form", View::IssueBookForm),
                NavEntry::leaf("issue-book-history", View::IssueBookHistory),
            ]),
        // Total fallback; must stay last.
        NavEntry::leaf("*", View::NotFound),
    ]
});

/// The process-wide navigation tree. Built on first use, never mutated.
pub fn navigation_tree() -> &'static [NavEntry] {
    &NAVIGATION_TREE
}

/// RouteMatch
///
/// Result of matching a path against the tree.
#[derive(Debug, Clone, PartialEq)]
pub struct RouteMatch {
    pub view: View,
    /// Layout view the matched view is nested in, if any.
    pub layout: Option<View>,
    pub access: Access,
    /// Placeholder values captured from the path, forwarded unvalidated.
    pub params: BTreeMap<String, String>,
}

fn segments(path: &str) -> Vec<&str> {
    path.split('/').filter(|s| !s.is_empty()).collect()
}

/// Matches `pattern` against the leading segments of `path`. Returns the number
/// of segments consumed.
fn match_prefix(
    pattern: &[&str],
    path: &[&str],
    params: &mut BTreeMap<String, String>,
) -> Option<usize> {
    if pattern.len() > path.len() {
        return None;
    }
    for (expected, actual) in pattern.iter().zip(path) {
        match expected.strip_prefix(':') {
            Some(name) => {
                params.insert(name.to_string(), (*actual).to_string());
            }
            None if expected == actual => {}
            None => return None,
        }
    }
    Some(pattern.len())
}

fn match_exact(pattern: &str, path: &[&str]) -> Option<BTreeMap<String, String>> {
    if pattern == "*" {
        return Some(BTreeMap::new());
    }
    let pattern = segments(pattern);
    let mut params = BTreeMap::new();
    match match_prefix(&pattern, path, &mut params) {
        Some(consumed) if consumed == path.len() => Some(params),
        _ => None,
    }
}

/// match_route
///
/// Resolves `path` to a view. Total: anything unmatched lands on `NotFound`.
/// An unmatched path below a layout entry keeps that entry's guard and layout.
pub fn match_route(path: &str) -> RouteMatch {
    let path = segments(path);

    for entry in navigation_tree() {
        if entry.children.is_empty() {
            if let Some(params) = match_exact(entry.pattern, &path) {
                return RouteMatch {
                    view: entry.view,
                    layout: None,
                    access: entry.access,
                    params,
                };
            }
            continue;
        }

        let mut params = BTreeMap::new();
        let Some(consumed) = match_prefix(&segments(entry.pattern), &path, &mut params) else {
            continue;
        };
        let rest = &path[consumed..];

        let child = entry
            .children
            .iter()
            .find_map(|child| match_exact(child.pattern, rest).map(|p| (child.view, p)));
        let (view, child_params) = child.unwrap_or((View::NotFound, BTreeMap::new()));
        params.extend(child_params);

        return RouteMatch {
            view,
            layout: Some(entry.view),
            access: entry.access,
            params,
        };
    }

    RouteMatch {
        view: View::NotFound,
        layout: None,
        access: Access::Public,
        params: BTreeMap::new(),
    }
}

/// ViewDescriptor
///
/// What the shell tells the front-end to mount for an allowed navigation.
#[derive(Debug, Clone, PartialEq, Serialize, TS, ToSchema)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct ViewDescriptor {
    pub path: String,
    pub view: View,
    pub layout: Option<View>,
    pub params: BTreeMap<String, String>,
    /// Whether the header and footer are shown.
    pub chrome: bool,
    pub session: Option<Session>,
}

/// Navigation
///
/// Outcome of one navigation event.
#[derive(Debug, Clone, PartialEq)]
pub enum Navigation {
    Render(ViewDescriptor),
    Redirect { to: &'static str, decision: Decision },
}

/// navigate
///
/// Matches the path, applies the guard for protected entries, and decides
/// chrome visibility. Never fails.
pub fn navigate(ctx: &NavigationContext) -> Navigation {
    let matched = match_route(&ctx.path);

    if let Access::Protected(required) = matched.access {
        let decision = guard::evaluate(required, ctx.session.as_ref());
        if let Some(to) = decision.redirect_target() {
            tracing::debug!(path = %ctx.path, ?decision, "navigation redirected by guard");
            return Navigation::Redirect { to, decision };
        }
    }

    Navigation::Render(ViewDescriptor {
        path: ctx.path.clone(),
        view: matched.view,
        layout: matched.layout,
        params: matched.params,
        chrome: layout::chrome_visible(&ctx.path),
        session: ctx.session.clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catch_all_is_last() {
        let last = navigation_tree().last().unwrap();
        assert_eq!(last.pattern, "*");
        assert_eq!(last.view, View::NotFound);
    }

    #[test]
    fn public_routes_match() {
        assert_eq!(match_route("/").view, View::Home);
        assert_eq!(match_route("/signup").view, View::Register);
        assert_eq!(match_route("/public-books/").view, View::PublicBooks);
        assert_eq!(match_route("/profile-info").access, Access::Public);
    }

    #[test]
    fn placeholder_is_forwarded_unvalidated() {
        let m = match_route("/book-view-details/not-a-number");
        assert_eq!(m.view, View::BookDetails);
        assert_eq!(m.params.get("id").map(String::as_str), Some("not-a-number"));
    }

    #[test]
    fn placeholder_needs_exactly_one_segment() {
        assert_eq!(match_route("/book-view-details").view, View::NotFound);
        assert_eq!(match_route("/book-view-details/1/extra").view, View::NotFound);
    }

    #[test]
    fn admin_children_resolve_inside_layout() {
        let index = match_route("/admin-dashboard");
        assert_eq!(index.view, View::AdminDashboard);
        assert_eq!(index.layout, Some(View::AdminLayout));
        assert_eq!(index.access, Access::Protected(Some(Role::Admin)));

        let edit = match_route("/admin-dashboard/edit-book-form/b-7");
        assert_eq!(edit.view, View::EditBookForm);
        assert_eq!(edit.params.get("id").map(String::as_str), Some("b-7"));
    }

    #[test]
    fn unknown_admin_child_keeps_guard() {
        let m = match_route("/admin-dashboard/nope");
        assert_eq!(m.view, View::NotFound);
        assert_eq!(m.access, Access::Protected(Some(Role::Admin)));
    }

    #[test]
    fn matching_is_case_sensitive() {
        assert_eq!(match_route("/Login").view, View::NotFound);
    }

    #[test]
    fn admin_prefix_needs_a_segment_boundary() {
        assert_eq!(match_route("/admin-dashboardx").view, View::NotFound);
    }
}

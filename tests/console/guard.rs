//! Navigation guard against a live session.

use std::sync::Arc;

use assetdesk::auth::PrincipalSource;
use assetdesk::config::Routes;
use assetdesk::{Decision, NavigationGuard, Role, RouteTable, Session};

use super::support::token_for;

fn console_routes() -> RouteTable {
    let mut table = RouteTable::new();
    table
        .open("/dashboard")
        .unwrap()
        .open("/assets")
        .unwrap()
        .restricted("/users", &[Role::Admin, Role::ItSupport])
        .unwrap()
        .restricted("/users/{id}", &[Role::Admin])
        .unwrap()
        .restricted("/issues/all", &[Role::Admin, Role::ItSupport])
        .unwrap();
    table
}

fn guard(session: &Arc<Session>) -> NavigationGuard {
    NavigationGuard::new(
        Arc::clone(session) as Arc<dyn PrincipalSource>,
        Routes::default(),
        console_routes(),
    )
}

#[test]
fn employee_is_sent_to_dashboard_not_login() {
    let session = Arc::new(Session::new());
    session.login(&token_for(Role::Employee)).unwrap();

    let decision = guard(&session).check(Some(&[Role::Admin, Role::ItSupport]));
    assert_eq!(decision, Decision::RedirectTo("/dashboard".into()));
    assert_eq!(
        guard(&session).check_path("/users"),
        Decision::RedirectTo("/dashboard".into())
    );
}

#[test]
fn anonymous_visitor_goes_to_login_with_return_url() {
    let session = Arc::new(Session::new());
    let guard = guard(&session);

    assert_eq!(
        guard.check_path("/users/42?tab=devices"),
        Decision::RedirectTo("/login?returnUrl=%2Fusers%2F42%3Ftab%3Ddevices".into())
    );
    assert_eq!(
        guard.check_path("/dashboard"),
        Decision::RedirectTo("/login?returnUrl=%2Fdashboard".into())
    );
    assert_eq!(guard.check_path("/login"), Decision::RedirectTo("/login".into()));
}

#[test]
fn decisions_follow_the_session() {
    let session = Arc::new(Session::new());
    let guard = guard(&session);

    session.login(&token_for(Role::ItSupport)).unwrap();
    assert!(guard.check_path("/users").is_allowed());
    assert!(!guard.check_path("/users/7").is_allowed());
    assert!(guard.check_path("/issues/all").is_allowed());

    session.logout();
    assert_eq!(
        guard.check_path("/issues/all"),
        Decision::RedirectTo("/login?returnUrl=%2Fissues%2Fall".into())
    );
}

#[test]
fn unregistered_paths_only_need_a_session() {
    let session = Arc::new(Session::new());
    let guard = guard(&session);
    assert!(!guard.check_path("/settings").is_allowed());

    session.login(&token_for(Role::Employee)).unwrap();
    assert!(guard.check_path("/settings").is_allowed());
    assert!(guard.check_path("/assets").is_allowed());
}

#[test]
fn admin_enters_every_route() {
    let session = Arc::new(Session::new());
    session.login(&token_for(Role::Admin)).unwrap();
    let guard = guard(&session);
    for path in ["/dashboard", "/assets", "/users", "/users/1", "/issues/all"] {
        assert!(guard.check_path(path).is_allowed(), "{path}");
    }
}

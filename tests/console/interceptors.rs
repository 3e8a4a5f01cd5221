//! The standard interceptor chain end to end.

use std::time::Duration;

use assetdesk::api::Credentials;
use assetdesk::config::Config;
use assetdesk::http::FailureKind;
use assetdesk::interceptor::{
    GENERIC_MESSAGE, INVALID_CREDENTIALS_MESSAGE, NETWORK_MESSAGE, NOT_FOUND_MESSAGE,
    SERVER_ERROR_MESSAGE, SESSION_EXPIRED_MESSAGE,
};
use assetdesk::{Error, Request, Role, StatusCode};

use super::support::{Backend, Console, Reply};

fn failure_of(err: Error) -> assetdesk::HttpFailure {
    match err {
        Error::Http(failure) => failure,
        other => panic!("expected an HTTP failure, got {other:?}"),
    }
}

#[tokio::test]
async fn forbidden_names_the_role_and_reraises_unchanged() {
    let console = Console::new(Backend::always(Reply::status(
        StatusCode::FORBIDDEN,
        r#"{"message":"nope"}"#,
    )));
    console.sign_in(Role::Employee);

    let err = console
        .api
        .get_json::<serde_json::Value>("/users", &[])
        .await
        .unwrap_err();

    let failure = failure_of(err);
    assert_eq!(failure.status, Some(StatusCode::FORBIDDEN));
    assert_eq!(failure.url, "http://localhost:8080/api/users");
    assert_eq!(&failure.body[..], br#"{"message":"nope"}"#);
    assert_eq!(
        console.notifier.errors(),
        vec!["Access denied: your role (EMPLOYEE) does not have permission for this action."]
    );
    assert!(console.session.principal().is_some());
}

#[tokio::test]
async fn rejected_login_keeps_session_and_reports_bad_credentials() {
    let console = Console::new(Backend::always(Reply::status(StatusCode::UNAUTHORIZED, "")));
    let before = console.sign_in(Role::Admin);

    let err = console
        .api
        .login(&Credentials::new("admin@example.com", "wrong"))
        .await
        .unwrap_err();

    assert_eq!(failure_of(err).status, Some(StatusCode::UNAUTHORIZED));
    assert_eq!(console.notifier.errors(), vec![INVALID_CREDENTIALS_MESSAGE]);
    assert_eq!(console.session.principal(), Some(before));
}

#[tokio::test]
async fn login_bad_request_is_also_a_rejection() {
    let console = Console::new(Backend::always(Reply::status(StatusCode::BAD_REQUEST, "")));
    let _ = console
        .api
        .login(&Credentials::new("admin@example.com", ""))
        .await;
    assert_eq!(console.notifier.errors(), vec![INVALID_CREDENTIALS_MESSAGE]);
}

#[tokio::test]
async fn expired_session_is_logged_out() {
    let console = Console::new(Backend::always(Reply::status(StatusCode::UNAUTHORIZED, "")));
    console.sign_in(Role::ItSupport);

    let err = console
        .api
        .get_json::<serde_json::Value>("/assets", &[])
        .await
        .unwrap_err();

    assert_eq!(err.status_code(), StatusCode::UNAUTHORIZED);
    assert!(console.session.principal().is_none());
    assert_eq!(console.notifier.errors(), vec![SESSION_EXPIRED_MESSAGE]);
}

#[tokio::test]
async fn one_message_per_failure_class() {
    let cases = [
        (Reply::status(StatusCode::NOT_FOUND, ""), NOT_FOUND_MESSAGE),
        (Reply::status(StatusCode::BAD_GATEWAY, ""), SERVER_ERROR_MESSAGE),
        (Reply::unreachable(), NETWORK_MESSAGE),
        (
            Reply::status(
                StatusCode::CONFLICT,
                r#"{"message":"Serial number already registered"}"#,
            ),
            "Serial number already registered",
        ),
        (Reply::status(StatusCode::CONFLICT, "not json"), GENERIC_MESSAGE),
    ];
    for (reply, expected) in cases {
        let console = Console::new(Backend::always(reply));
        console.sign_in(Role::Admin);
        let _ = console.api.get_json::<serde_json::Value>("/assets", &[]).await;
        assert_eq!(console.notifier.errors(), vec![expected]);
        assert!(console.session.principal().is_some());
    }
}

#[tokio::test]
async fn requests_carry_the_session_credential() {
    let console = Console::new(Backend::always(Reply::ok("[]")));
    let _ = console.api.get_json::<Vec<u32>>("/assets", &[]).await.unwrap();
    console.sign_in(Role::Employee);
    let _ = console.api.get_json::<Vec<u32>>("/assets", &[]).await.unwrap();

    let requests: Vec<Request> = console.backend.requests();
    assert!(assetdesk::auth::bearer_token(&requests[0].headers).is_none());
    assert_eq!(
        assetdesk::auth::bearer_token(&requests[1].headers),
        console.session.token().as_deref()
    );
}

#[tokio::test]
async fn loading_counter_settles_after_concurrent_requests() {
    let console = Console::new(Backend::new(|request| {
        if request.path().ends_with("/fail") {
            Reply::status(StatusCode::INTERNAL_SERVER_ERROR, "").after(Duration::from_millis(30))
        } else {
            Reply::ok("{}").after(Duration::from_millis(10))
        }
    }));
    let mut busy = console.counter.subscribe();

    let api = &console.api;
    let results = tokio::join!(
        api.get_json::<serde_json::Value>("/a", &[]),
        api.get_json::<serde_json::Value>("/fail", &[]),
        api.get_json::<serde_json::Value>("/b", &[]),
        api.get_json::<serde_json::Value>("/fail", &[]),
    );
    assert!(results.0.is_ok());
    assert!(results.1.is_err());
    assert!(results.2.is_ok());
    assert!(results.3.is_err());

    assert_eq!(console.counter.current(), 0);
    assert!(!console.counter.is_busy());
    assert!(busy.has_changed().unwrap());
    assert_eq!(*busy.borrow_and_update(), 0);
}

#[tokio::test]
async fn dropped_request_still_settles_the_counter() {
    let console = Console::new(Backend::always(Reply::ok("{}").after(Duration::from_secs(5))));
    let api = &console.api;
    let outcome = tokio::time::timeout(
        Duration::from_millis(20),
        api.get_json::<serde_json::Value>("/slow", &[]),
    )
    .await;
    assert!(outcome.is_err());
    assert_eq!(console.counter.current(), 0);
}

#[tokio::test(start_paused = true)]
async fn slow_response_times_out_as_network_failure() {
    let config = Config {
        api: assetdesk::config::Api {
            request_timeout_secs: 2,
            ..Default::default()
        },
        ..Default::default()
    };
    let console = Console::with_config(
        Backend::always(Reply::ok("{}").after(Duration::from_secs(10))),
        &config,
    );

    let err = console
        .api
        .get_json::<serde_json::Value>("/assets", &[])
        .await
        .unwrap_err();

    let failure = failure_of(err);
    assert_eq!(failure.kind, FailureKind::Timeout);
    assert_eq!(failure.status, None);
    assert_eq!(console.notifier.errors(), vec![NETWORK_MESSAGE]);
    assert_eq!(console.counter.current(), 0);
}

//! Search, filters and the data table over the REST page source.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use assetdesk::filter::FilterOption;
use assetdesk::interceptor::SERVER_ERROR_MESSAGE;
use assetdesk::table::{Applied, Column, RowAction, TableCommand};
use assetdesk::{
    Capability, DataTableController, Error, Role, SearchFilterController, SortState, StatusCode,
};
use serde::Deserialize;
use tokio::sync::mpsc;
use url::Url;

use super::support::{Backend, Console, Reply};

#[derive(Clone, Debug, PartialEq, Deserialize)]
struct Asset {
    id: u32,
    name: String,
}

/// Decoded value of query parameter `key`.
fn param(url: &Url, key: &str) -> Option<String> {
    url.query_pairs()
        .find(|(k, _)| k == key)
        .map(|(_, v)| v.into_owned())
}

/// Five pages of two assets each; the page number is echoed into the ids.
fn asset_pages(url: &Url) -> String {
    let page: u32 = param(url, "page").and_then(|p| p.parse().ok()).unwrap_or(0);
    serde_json::json!({
        "content": [
            {"id": page * 2, "name": format!("asset-{}", page * 2)},
            {"id": page * 2 + 1, "name": format!("asset-{}", page * 2 + 1)},
        ],
        "totalElements": 10,
        "totalPages": 5,
        "number": page,
    })
    .to_string()
}

fn urls(console: &Console) -> Vec<Url> {
    console.backend.requests().into_iter().map(|r| r.url).collect()
}

fn status_filter() -> FilterOption {
    FilterOption::select(
        "status",
        "Status",
        &[("ACTIVE", "Active"), ("RETIRED", "Retired")],
    )
}

fn columns() -> Vec<Column> {
    vec![Column::sortable("name", "Name"), Column::new("notes", "Notes")]
}

fn table(console: &Console) -> DataTableController<Asset> {
    DataTableController::new(columns(), console.api.page_source("/assets"), 10)
}

#[tokio::test]
async fn sorting_from_page_three_fetches_page_zero() {
    let console = Console::new(Backend::new(|r| Reply::ok(&asset_pages(&r.url))));
    let mut assets = table(&console);

    assets.load().await.unwrap();
    assets.go_to_page(3).await.unwrap();
    assert_eq!(assets.pagination().page, 3);

    assets.toggle_sort("name").await.unwrap();
    assets.toggle_sort("name").await.unwrap();

    let urls = urls(&console);
    assert_eq!(urls.len(), 4);
    assert_eq!(param(&urls[1], "page").as_deref(), Some("3"));
    assert_eq!(param(&urls[2], "page").as_deref(), Some("0"));
    assert_eq!(param(&urls[2], "sort").as_deref(), Some("name,asc"));
    assert_eq!(urls[3].query().unwrap_or(""), "page=0&size=10&sort=name%2Cdesc");
    assert_eq!(assets.sort(), Some(&SortState::desc("name")));
    assert_eq!(assets.pagination().page, 0);
}

#[tokio::test]
async fn navigation_outside_known_pages_does_not_fetch() {
    let console = Console::new(Backend::always(Reply::ok(
        r#"{"content":[],"totalElements":0,"totalPages":0,"number":0}"#,
    )));
    let mut assets = table(&console);
    assets.load().await.unwrap();

    let err = assets.go_to_page(0).await.unwrap_err();
    assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
    assert_eq!(console.backend.requests().len(), 1);
}

#[tokio::test]
async fn superseded_page_response_is_discarded() {
    let console = Console::new(Backend::new(|r| {
        let reply = Reply::ok(&asset_pages(&r.url));
        if param(&r.url, "page").as_deref() == Some("2") {
            reply.after(Duration::from_millis(40))
        } else {
            reply.after(Duration::from_millis(5))
        }
    }));
    let mut assets = table(&console);
    assets.load().await.unwrap();

    let slow = assets.begin_page(2).unwrap();
    let fast = assets.begin_sort(SortState::asc("name"));
    let source = assets.source();

    let slow_fetch = source.fetch(slow.query.clone());
    let fast_fetch = source.fetch(fast.query.clone());
    let (slow_result, fast_result) = tokio::join!(slow_fetch, fast_fetch);

    assert_eq!(assets.complete(fast, fast_result).unwrap(), Applied::Updated);
    assert_eq!(assets.complete(slow, slow_result).unwrap(), Applied::Stale);
    assert_eq!(assets.pagination().page, 0);
    assert_eq!(assets.rows()[0].id, 0);
}

#[tokio::test]
async fn failed_fetch_keeps_what_is_on_screen() {
    let calls = Arc::new(AtomicUsize::new(0));
    let counted = Arc::clone(&calls);
    let console = Console::new(Backend::new(move |r| {
        if counted.fetch_add(1, Ordering::SeqCst) == 0 {
            Reply::ok(&asset_pages(&r.url))
        } else {
            Reply::status(StatusCode::INTERNAL_SERVER_ERROR, "")
        }
    }));
    let mut assets = table(&console);
    assets.load().await.unwrap();
    let before = assets.rows().to_vec();

    let err = assets.go_to_page(1).await.unwrap_err();
    assert!(matches!(err, Error::Http(_)));
    assert_eq!(assets.rows(), &before[..]);
    assert_eq!(assets.pagination().page, 0);
    assert_eq!(console.notifier.errors(), vec![SERVER_ERROR_MESSAGE]);
    assert_eq!(console.counter.current(), 0);
}

#[tokio::test(start_paused = true)]
async fn typed_search_reaches_the_table_once() {
    let console = Console::new(Backend::new(|r| Reply::ok(&asset_pages(&r.url))));
    let mut assets = table(&console);
    assets.load().await.unwrap();
    assets.go_to_page(2).await.unwrap();

    let mut search = SearchFilterController::new(vec![status_filter()], Duration::from_millis(400));
    let mut commits = search.subscribe();
    let (commands, mut inbox) = mpsc::channel(8);
    let driver = tokio::spawn(async move {
        assets.drive(&mut commits, &mut inbox).await;
        assets
    });

    for text in ["t", "th", "thi", "think"] {
        search.set_search_term(text);
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    tokio::time::sleep(Duration::from_millis(500)).await;
    search.set_filter("status", "RETIRED").unwrap();
    tokio::time::sleep(Duration::from_millis(10)).await;
    drop(search);
    drop(commands);

    let assets = driver.await.unwrap();
    let urls = urls(&console);
    assert_eq!(urls.len(), 4);
    assert_eq!(param(&urls[2], "search").as_deref(), Some("think"));
    assert_eq!(param(&urls[2], "page").as_deref(), Some("0"));
    assert_eq!(param(&urls[3], "search").as_deref(), Some("think"));
    assert_eq!(param(&urls[3], "status").as_deref(), Some("RETIRED"));
    assert_eq!(assets.filters().search_term, "think");
}

#[tokio::test(start_paused = true)]
async fn sorting_while_following_search_commits() {
    let console = Console::new(Backend::new(|r| Reply::ok(&asset_pages(&r.url))));
    let mut assets = table(&console);
    assets.load().await.unwrap();

    let mut search = SearchFilterController::new(vec![status_filter()], Duration::from_millis(400));
    let mut commits = search.subscribe();
    let (commands, mut inbox) = mpsc::channel(8);
    let driver = tokio::spawn(async move {
        assets.drive(&mut commits, &mut inbox).await;
        assets
    });

    search.set_search_term("dell");
    commands
        .send(TableCommand::ToggleSort("name".into()))
        .await
        .unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(console.backend.requests().len(), 2);

    tokio::time::sleep(Duration::from_millis(500)).await;
    commands.send(TableCommand::GoToPage(3)).await.unwrap();
    tokio::time::sleep(Duration::from_millis(10)).await;
    drop(commands);

    let assets = driver.await.unwrap();
    let urls = urls(&console);
    assert_eq!(urls.len(), 4);
    assert_eq!(param(&urls[1], "sort").as_deref(), Some("name,asc"));
    assert_eq!(param(&urls[1], "search"), None);
    assert_eq!(param(&urls[2], "search").as_deref(), Some("dell"));
    assert_eq!(param(&urls[2], "sort").as_deref(), Some("name,asc"));
    assert_eq!(param(&urls[2], "page").as_deref(), Some("0"));
    assert_eq!(param(&urls[3], "page").as_deref(), Some("3"));
    assert_eq!(param(&urls[3], "search").as_deref(), Some("dell"));
    assert_eq!(assets.sort(), Some(&SortState::asc("name")));
    assert_eq!(assets.pagination().page, 3);
    drop(search);
}

#[tokio::test]
async fn shrunken_list_lands_on_its_last_page() {
    let calls = Arc::new(AtomicUsize::new(0));
    let counted = Arc::clone(&calls);
    let console = Console::new(Backend::new(move |r| {
        if counted.fetch_add(1, Ordering::SeqCst) == 0 {
            return Reply::ok(&asset_pages(&r.url));
        }
        let page: u32 = param(&r.url, "page").and_then(|p| p.parse().ok()).unwrap_or(0);
        let content = match page {
            0 | 1 => vec![serde_json::json!({"id": page, "name": "left"})],
            _ => vec![],
        };
        let body = serde_json::json!({
            "content": content,
            "totalElements": 2,
            "totalPages": 2,
            "number": page,
        });
        Reply::ok(&body.to_string())
    }));
    let mut assets = table(&console);
    assets.load().await.unwrap();

    assert_eq!(assets.go_to_page(4).await.unwrap(), Applied::Updated);
    let urls = urls(&console);
    assert_eq!(urls.len(), 3);
    assert_eq!(param(&urls[1], "page").as_deref(), Some("4"));
    assert_eq!(param(&urls[2], "page").as_deref(), Some("1"));
    let pagination = assets.pagination();
    assert_eq!((pagination.page, pagination.total_pages), (1, 2));
    assert_eq!(assets.rows()[0].id, 1);
}

#[tokio::test]
async fn row_actions_respect_the_signed_in_role() {
    let console = Console::new(Backend::new(|r| Reply::ok(&asset_pages(&r.url))));
    let mut assets = table(&console)
        .with_action(RowAction::new("View", |_| {}))
        .with_action(RowAction::new("Retire", |_| {}).requires(Capability::ManageAssets));
    assets.load().await.unwrap();

    console.sign_in(Role::Employee);
    let authority = console.session.authority();
    let rendered = assets.render(&authority);
    assert!(rendered.iter().all(|row| row.actions == vec!["View"]));
    let first = assets.rows()[0].clone();
    assert!(matches!(
        assets.invoke_action(&first, "Retire", &authority),
        Err(Error::Forbidden { .. })
    ));

    console.sign_in(Role::ItSupport);
    let authority = console.session.authority();
    assert_eq!(assets.render(&authority)[0].actions, vec!["View", "Retire"]);
    assert!(assets.invoke_action(&first, "Retire", &authority).is_ok());
}

use anyhow::Result;
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;

use folio::testing::{ControlledPageSource, InMemoryPageSource, RecordingDelegate};
use folio::{
    ApiError, EventBus, FetchOutcome, FolioConfig, ListKind, ListQuery, ListViewModel, Node,
    Page,
};

fn nodes(range: std::ops::RangeInclusive<usize>) -> Vec<Node> {
    range
        .map(|i| Node::file(format!("n{}", i), format!("file-{}.txt", i)))
        .collect()
}

fn ids(list: &ListViewModel<Node>) -> Vec<String> {
    list.current_items().into_iter().map(|n| n.id).collect()
}

fn size(n: u32) -> NonZeroU32 {
    NonZeroU32::new(n).unwrap()
}

#[tokio::test]
async fn test_pages_append_in_order_until_exhausted() -> Result<()> {
    let bus = EventBus::new();
    let source = Arc::new(InMemoryPageSource::new(nodes(1..=25)));
    let list = ListViewModel::<Node>::builder(ListKind::Recents, source.clone())
        .page_size(size(10))
        .build(&bus)?;

    assert_eq!(
        list.refresh_list().await,
        FetchOutcome::Merged {
            received: 10,
            replaced: true
        }
    );
    assert_eq!(
        list.fetch_next_page().await,
        FetchOutcome::Merged {
            received: 10,
            replaced: false
        }
    );
    assert_eq!(ids(&list), nodes(1..=20).into_iter().map(|n| n.id).collect::<Vec<_>>());
    assert!(list.has_more());

    assert_eq!(
        list.fetch_next_page().await,
        FetchOutcome::Merged {
            received: 5,
            replaced: false
        }
    );
    assert_eq!(list.len(), 25);
    assert!(!list.has_more());

    // Exhausted: no further request reaches the source
    assert_eq!(list.fetch_next_page().await, FetchOutcome::Skipped);
    assert_eq!(source.fetch_count(), 3);

    let skips: Vec<u32> = source
        .requests()
        .iter()
        .map(|(_, request)| request.skip_count)
        .collect();
    assert_eq!(skips, vec![0, 10, 20]);

    Ok(())
}

#[tokio::test]
async fn test_first_fetch_without_refresh_replaces() -> Result<()> {
    let bus = EventBus::new();
    let source = Arc::new(InMemoryPageSource::new(nodes(1..=3)));
    let list = ListViewModel::<Node>::builder(ListKind::Recents, source).build(&bus)?;

    assert_eq!(
        list.fetch_next_page().await,
        FetchOutcome::Merged {
            received: 3,
            replaced: true
        }
    );
    assert_eq!(list.len(), 3);
    assert!(!list.has_more());

    Ok(())
}

#[tokio::test]
async fn test_refresh_replaces_accumulated_pages() -> Result<()> {
    let bus = EventBus::new();
    let source = Arc::new(InMemoryPageSource::new(nodes(1..=20)));
    let list = ListViewModel::<Node>::builder(ListKind::Recents, source.clone())
        .page_size(size(10))
        .build(&bus)?;

    list.refresh_list().await;
    list.fetch_next_page().await;
    assert_eq!(list.len(), 20);

    source.set_items(nodes(100..=104));
    list.refresh_list().await;

    assert_eq!(ids(&list), vec!["n100", "n101", "n102", "n103", "n104"]);
    assert_eq!(list.current_page(), 1);
    assert!(!list.has_more());

    Ok(())
}

#[tokio::test]
async fn test_empty_refresh_clears_list() -> Result<()> {
    let bus = EventBus::new();
    let source = Arc::new(InMemoryPageSource::new(nodes(1..=5)));
    let delegate = Arc::new(RecordingDelegate::new());
    let list = ListViewModel::<Node>::builder(ListKind::Recents, source.clone())
        .delegate(delegate.clone())
        .build(&bus)?;

    list.refresh_list().await;
    assert_eq!(list.len(), 5);

    source.set_items(Vec::new());
    assert_eq!(
        list.refresh_list().await,
        FetchOutcome::Merged {
            received: 0,
            replaced: true
        }
    );
    assert!(list.is_empty());
    assert!(!list.has_more());
    assert_eq!(delegate.list_changed_count(), 2);

    Ok(())
}

#[tokio::test]
async fn test_failed_refresh_preserves_items() -> Result<()> {
    let bus = EventBus::new();
    let source = Arc::new(InMemoryPageSource::new(nodes(1..=5)));
    let delegate = Arc::new(RecordingDelegate::new());
    let list = ListViewModel::<Node>::builder(ListKind::Recents, source.clone())
        .delegate(delegate.clone())
        .build(&bus)?;

    list.refresh_list().await;
    source.push_failure(ApiError::network("connection reset"));

    assert_eq!(
        list.refresh_list().await,
        FetchOutcome::Failed(ApiError::network("connection reset"))
    );
    assert_eq!(list.len(), 5);
    assert_eq!(delegate.list_changed_count(), 1);
    assert_eq!(
        delegate.failures(),
        vec![ApiError::network("connection reset")]
    );

    Ok(())
}

#[tokio::test]
async fn test_failed_page_is_retried_at_same_index() -> Result<()> {
    let bus = EventBus::new();
    let source = Arc::new(InMemoryPageSource::new(nodes(1..=15)));
    let delegate = Arc::new(RecordingDelegate::new());
    let list = ListViewModel::<Node>::builder(ListKind::Recents, source.clone())
        .page_size(size(10))
        .delegate(delegate.clone())
        .build(&bus)?;

    list.refresh_list().await;
    assert_eq!(list.current_page(), 2);

    source.push_failure(ApiError::AuthenticationExpired);
    assert_eq!(
        list.fetch_next_page().await,
        FetchOutcome::Failed(ApiError::AuthenticationExpired)
    );
    assert_eq!(list.current_page(), 2);
    assert!(list.has_more());
    assert!(!list.is_fetching());
    assert_eq!(list.len(), 10);
    // No automatic retry
    assert_eq!(source.fetch_count(), 2);

    list.fetch_next_page().await;
    assert_eq!(list.len(), 15);
    let skips: Vec<u32> = source
        .requests()
        .iter()
        .map(|(_, request)| request.skip_count)
        .collect();
    assert_eq!(skips, vec![0, 10, 10]);

    Ok(())
}

#[tokio::test]
async fn test_missing_total_keeps_has_more() -> Result<()> {
    let bus = EventBus::new();
    let source = Arc::new(InMemoryPageSource::without_counts(nodes(1..=3)));
    let list = ListViewModel::<Node>::builder(ListKind::Recents, source.clone())
        .page_size(size(10))
        .build(&bus)?;

    list.refresh_list().await;
    assert_eq!(list.len(), 3);
    assert!(list.has_more());

    // The next page is empty, but without a total the list stays open
    assert_eq!(
        list.fetch_next_page().await,
        FetchOutcome::Merged {
            received: 0,
            replaced: false
        }
    );
    assert!(list.has_more());

    Ok(())
}

#[tokio::test]
async fn test_refresh_discards_in_flight_page() -> Result<()> {
    let bus = EventBus::new();
    let (source, mut controller) = ControlledPageSource::<Node>::new();
    let list = Arc::new(
        ListViewModel::<Node>::builder(ListKind::Recents, Arc::new(source))
            .page_size(size(2))
            .build(&bus)?,
    );

    let stale = {
        let list = list.clone();
        tokio::spawn(async move { list.fetch_next_page().await })
    };
    let first = controller.next_fetch().await.expect("first fetch issued");

    let fresh = {
        let list = list.clone();
        tokio::spawn(async move { list.refresh_list().await })
    };
    let second = controller.next_fetch().await.expect("refresh fetch issued");
    assert_eq!(second.request.skip_count, 0);

    // The superseded fetch completes first and must not be merged
    first.respond(Ok(Page::new(nodes(1..=2), 0, 10)));
    assert_eq!(stale.await?, FetchOutcome::Discarded);
    assert!(list.is_empty());

    second.respond(Ok(Page::new(nodes(50..=51), 0, 2)));
    assert_eq!(
        fresh.await?,
        FetchOutcome::Merged {
            received: 2,
            replaced: true
        }
    );
    assert_eq!(ids(&list), vec!["n50", "n51"]);
    assert!(!list.has_more());

    Ok(())
}

#[tokio::test]
async fn test_refresh_discards_in_flight_failure() -> Result<()> {
    let bus = EventBus::new();
    let (source, mut controller) = ControlledPageSource::<Node>::new();
    let delegate = Arc::new(RecordingDelegate::new());
    let list = Arc::new(
        ListViewModel::<Node>::builder(ListKind::Recents, Arc::new(source))
            .delegate(delegate.clone())
            .build(&bus)?,
    );

    let stale = {
        let list = list.clone();
        tokio::spawn(async move { list.fetch_next_page().await })
    };
    let first = controller.next_fetch().await.expect("first fetch issued");
    let fresh = {
        let list = list.clone();
        tokio::spawn(async move { list.refresh_list().await })
    };
    let second = controller.next_fetch().await.expect("refresh fetch issued");

    first.respond(Err(ApiError::network("timeout")));
    assert_eq!(stale.await?, FetchOutcome::Discarded);
    assert!(delegate.failures().is_empty());
    assert!(list.is_fetching());

    second.respond(Ok(Page::new(nodes(1..=1), 0, 1)));
    fresh.await?;
    assert_eq!(list.len(), 1);
    assert!(!list.is_fetching());

    Ok(())
}

#[tokio::test]
async fn test_next_page_during_fetch_is_deferred_once() -> Result<()> {
    let bus = EventBus::new();
    let (source, mut controller) = ControlledPageSource::<Node>::new();
    let list = Arc::new(
        ListViewModel::<Node>::builder(ListKind::Recents, Arc::new(source))
            .page_size(size(10))
            .build(&bus)?,
    );

    let running = {
        let list = list.clone();
        tokio::spawn(async move { list.fetch_next_page().await })
    };
    let first = controller.next_fetch().await.expect("first fetch issued");
    assert!(list.is_fetching());

    // Duplicate triggers collapse into one deferred request
    assert_eq!(list.fetch_next_page().await, FetchOutcome::Deferred);
    assert_eq!(list.fetch_next_page().await, FetchOutcome::Deferred);
    assert!(controller.try_next_fetch().is_none());

    first.respond(Ok(Page::new(nodes(1..=10), 0, 30)));
    let second = controller.next_fetch().await.expect("deferred fetch issued");
    assert_eq!(second.request.skip_count, 10);
    second.respond(Ok(Page::new(nodes(11..=20), 10, 30)));

    assert_eq!(
        running.await?,
        FetchOutcome::Merged {
            received: 10,
            replaced: true
        }
    );
    assert_eq!(list.len(), 20);
    assert_eq!(list.current_page(), 3);
    assert!(controller.try_next_fetch().is_none());

    Ok(())
}

#[tokio::test]
async fn test_clear_on_refresh_empties_list_up_front() -> Result<()> {
    let bus = EventBus::new();
    let (source, mut controller) = ControlledPageSource::<Node>::new();
    let delegate = Arc::new(RecordingDelegate::new());
    let list = Arc::new(
        ListViewModel::<Node>::builder(ListKind::Recents, Arc::new(source))
            .delegate(delegate.clone())
            .clear_on_refresh(true)
            .build(&bus)?,
    );

    let load = {
        let list = list.clone();
        tokio::spawn(async move { list.refresh_list().await })
    };
    controller
        .next_fetch()
        .await
        .expect("initial fetch issued")
        .respond(Ok(Page::new(nodes(1..=3), 0, 3)));
    load.await?;
    assert_eq!(list.len(), 3);

    let reload = {
        let list = list.clone();
        tokio::spawn(async move { list.refresh_list().await })
    };
    let pending = controller.next_fetch().await.expect("refresh fetch issued");
    assert!(list.is_empty());
    assert_eq!(delegate.list_changed_count(), 2);

    pending.respond(Err(ApiError::network("offline")));
    assert!(matches!(reload.await?, FetchOutcome::Failed(_)));
    assert!(list.is_empty());
    assert_eq!(delegate.failures().len(), 1);

    Ok(())
}

#[tokio::test]
async fn test_search_requires_query_and_set_query_refreshes() -> Result<()> {
    let bus = EventBus::new();
    let source = Arc::new(InMemoryPageSource::new(nodes(1..=4)));

    let missing = ListViewModel::<Node>::builder(ListKind::Search, source.clone()).build(&bus);
    assert!(missing.is_err());

    let list = ListViewModel::<Node>::builder(ListKind::Search, source.clone())
        .query(ListQuery::Search {
            term: "report".to_string(),
        })
        .page_size(size(2))
        .build(&bus)?;
    list.refresh_list().await;
    list.fetch_next_page().await;
    assert_eq!(list.len(), 4);

    let invoice = ListQuery::Search {
        term: "invoice".to_string(),
    };
    list.set_query(invoice.clone()).await;

    assert_eq!(list.query(), invoice);
    assert_eq!(list.len(), 2);
    let (query, request) = source.requests().last().cloned().expect("a request");
    assert_eq!(query, invoice);
    assert_eq!(request.skip_count, 0);

    Ok(())
}

#[tokio::test]
async fn test_config_supplies_page_size() -> Result<()> {
    let bus = EventBus::new();
    let config = FolioConfig::from_yaml_str("default_page_size: 7\npage_sizes:\n  favorites: 3\n")?;
    let source = Arc::new(InMemoryPageSource::new(nodes(1..=10)));

    let favorites = ListViewModel::<Node>::builder(ListKind::Favorites, source.clone())
        .config(&config)
        .build(&bus)?;
    favorites.refresh_list().await;
    assert_eq!(favorites.len(), 3);

    let recents = ListViewModel::<Node>::builder(ListKind::Recents, source.clone())
        .config(&config)
        .build(&bus)?;
    recents.refresh_list().await;
    assert_eq!(recents.len(), 7);

    assert_eq!(
        favorites.query(),
        ListQuery::Favorites,
        "favorites list starts from its implied query"
    );

    Ok(())
}

#[tokio::test]
async fn test_concurrent_triggers_on_one_task_share_the_barrier() -> Result<()> {
    let bus = EventBus::new();
    let (source, mut controller) = ControlledPageSource::<Node>::new();
    let list = ListViewModel::<Node>::builder(ListKind::Recents, Arc::new(source))
        .page_size(size(10))
        .build(&bus)?;

    let (first, second, ()) = futures::join!(
        list.fetch_next_page(),
        list.fetch_next_page(),
        async {
            let pending = controller.next_fetch().await.expect("first fetch issued");
            pending.respond(Ok(Page::new(nodes(1..=10), 0, 15)));
            let pending = controller.next_fetch().await.expect("deferred fetch issued");
            assert_eq!(pending.request.skip_count, 10);
            pending.respond(Ok(Page::new(nodes(11..=15), 10, 15)));
        }
    );

    assert_eq!(
        first,
        FetchOutcome::Merged {
            received: 10,
            replaced: true
        }
    );
    assert_eq!(second, FetchOutcome::Deferred);
    assert_eq!(list.len(), 15);
    assert!(!list.has_more());

    Ok(())
}

#[tokio::test]
async fn test_dropped_fetch_does_not_wedge_the_list() -> Result<()> {
    let bus = EventBus::new();
    let (source, mut controller) = ControlledPageSource::<Node>::new();
    let list = Arc::new(
        ListViewModel::<Node>::builder(ListKind::Recents, Arc::new(source))
            .page_size(size(10))
            .build(&bus)?,
    );

    let timed_out = tokio::time::timeout(Duration::from_millis(20), list.fetch_next_page()).await;
    assert!(timed_out.is_err());
    assert!(!list.is_fetching());

    let dropped = controller.next_fetch().await.expect("first fetch issued");
    assert_eq!(dropped.request.skip_count, 0);

    let retry = {
        let list = list.clone();
        tokio::spawn(async move { list.fetch_next_page().await })
    };
    let pending = controller.next_fetch().await.expect("retry issued");
    assert_eq!(pending.request.skip_count, 0);

    // The answer to the dropped request has nowhere to go
    dropped.respond(Ok(Page::new(nodes(90..=99), 0, 10)));
    pending.respond(Ok(Page::new(nodes(1..=10), 0, 10)));

    assert_eq!(
        retry.await?,
        FetchOutcome::Merged {
            received: 10,
            replaced: true
        }
    );
    assert_eq!(ids(&list)[0], "n1");
    assert!(!list.is_fetching());

    Ok(())
}

#[tokio::test]
async fn test_dropped_refresh_keeps_items_and_allows_retry() -> Result<()> {
    let bus = EventBus::new();
    let (source, mut controller) = ControlledPageSource::<Node>::new();
    let list = Arc::new(
        ListViewModel::<Node>::builder(ListKind::Recents, Arc::new(source))
            .page_size(size(2))
            .build(&bus)?,
    );

    let load = {
        let list = list.clone();
        tokio::spawn(async move { list.refresh_list().await })
    };
    controller
        .next_fetch()
        .await
        .expect("initial fetch issued")
        .respond(Ok(Page::new(nodes(1..=2), 0, 4)));
    load.await?;

    let timed_out = tokio::time::timeout(Duration::from_millis(20), list.refresh_list()).await;
    assert!(timed_out.is_err());
    assert!(!list.is_fetching());
    assert_eq!(list.len(), 2);
    controller.next_fetch().await.expect("refresh issued");

    let next = {
        let list = list.clone();
        tokio::spawn(async move { list.fetch_next_page().await })
    };
    let pending = controller.next_fetch().await.expect("page fetch issued");
    assert_eq!(pending.request.skip_count, 0);
    pending.respond(Ok(Page::new(nodes(5..=6), 0, 2)));
    next.await?;
    assert_eq!(ids(&list), vec!["n5", "n6"]);

    Ok(())
}

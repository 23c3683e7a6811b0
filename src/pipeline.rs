//! One ingestion run: fetch, take a bounded prefix, and for every entry not
//! yet stored, notify and then persist.
//!
//! Notification happens before the insert, so an advisory is never stored
//! without an alert. If the insert then fails the next run alerts again:
//! delivery is at-least-once, not exactly-once.

use async_trait::async_trait;
use tracing::{debug, info};

use crate::advisory::Advisory;
use crate::db::Database;
use crate::discord::DiscordNotifier;
use crate::error::Result;
use crate::rss::{FeedClient, FeedEntry};
use crate::{TARGET_DB, TARGET_WEB_REQUEST};

#[async_trait]
pub trait FeedSource: Send + Sync {
    /// Entries in feed order.
    async fn fetch_entries(&self) -> Result<Vec<FeedEntry>>;
}

#[async_trait]
pub trait AdvisoryStore: Send + Sync {
    async fn exists(&self, identifier: &str) -> Result<bool>;
    async fn insert(&self, advisory: &Advisory) -> Result<()>;
}

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, advisory: &Advisory) -> Result<()>;
}

#[async_trait]
impl FeedSource for FeedClient {
    async fn fetch_entries(&self) -> Result<Vec<FeedEntry>> {
        self.fetch().await
    }
}

#[async_trait]
impl AdvisoryStore for Database {
    async fn exists(&self, identifier: &str) -> Result<bool> {
        self.advisory_exists(identifier).await
    }

    async fn insert(&self, advisory: &Advisory) -> Result<()> {
        self.insert_advisory(advisory).await.map(|_| ())
    }
}

#[async_trait]
impl Notifier for DiscordNotifier {
    async fn notify(&self, advisory: &Advisory) -> Result<()> {
        self.send(advisory).await
    }
}

/// Counts for one completed run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// Entries returned by the feed.
    pub fetched: usize,
    /// Entries in the processed prefix.
    pub considered: usize,
    /// Entries already stored by an earlier run.
    pub skipped: usize,
    /// Entries notified and stored in this run.
    pub notified: usize,
}

/// Runs the pipeline once. The first error aborts the run; advisories handled
/// before it stay stored.
pub async fn run(
    feed: &dyn FeedSource,
    store: &dyn AdvisoryStore,
    notifier: &dyn Notifier,
    max_entries: usize,
) -> Result<RunSummary> {
    let entries = feed.fetch_entries().await?;

    let mut summary = RunSummary {
        fetched: entries.len(),
        ..RunSummary::default()
    };

    for entry in entries.iter().take(max_entries) {
        summary.considered += 1;
        let advisory = Advisory::from_entry(entry);

        if store.exists(&advisory.identifier).await? {
            info!(target: TARGET_DB, "CVE already exists in the database: {}", advisory.identifier);
            summary.skipped += 1;
            continue;
        }

        notifier.notify(&advisory).await?;
        store.insert(&advisory).await?;
        debug!(target: TARGET_DB, "Stored advisory: {}", advisory.identifier);
        summary.notified += 1;
    }

    info!(
        target: TARGET_WEB_REQUEST,
        "Finished processing CVEs: {} fetched, {} considered, {} new, {} already seen",
        summary.fetched, summary.considered, summary.notified, summary.skipped
    );
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::WatchError;
    use std::collections::HashSet;
    use std::io;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::{Arc, Mutex};

    struct StaticFeed(Vec<FeedEntry>);

    #[async_trait]
    impl FeedSource for StaticFeed {
        async fn fetch_entries(&self) -> Result<Vec<FeedEntry>> {
            Ok(self.0.clone())
        }
    }

    struct FailingFeed;

    #[async_trait]
    impl FeedSource for FailingFeed {
        async fn fetch_entries(&self) -> Result<Vec<FeedEntry>> {
            Err(WatchError::fetch("https://feed.test/rss", "connection reset"))
        }
    }

    /// Records every advisory it is asked to send; fails on the given call.
    #[derive(Default)]
    struct RecordingNotifier {
        sent: Mutex<Vec<Advisory>>,
        fail_on_call: Option<usize>,
    }

    impl RecordingNotifier {
        fn failing_on(call: usize) -> Self {
            Self {
                fail_on_call: Some(call),
                ..Self::default()
            }
        }

        fn sent_ids(&self) -> Vec<String> {
            self.sent
                .lock()
                .unwrap()
                .iter()
                .map(|a| a.identifier.clone())
                .collect()
        }
    }

    #[async_trait]
    impl Notifier for RecordingNotifier {
        async fn notify(&self, advisory: &Advisory) -> Result<()> {
            let mut sent = self.sent.lock().unwrap();
            if self.fail_on_call == Some(sent.len() + 1) {
                return Err(WatchError::notify(&advisory.identifier, "unexpected status 500"));
            }
            sent.push(advisory.clone());
            Ok(())
        }
    }

    /// Memory store whose first insert fails with a write error.
    #[derive(Default)]
    struct FailFirstInsertStore {
        inner: MemoryStore,
        failed: AtomicBool,
    }

    #[async_trait]
    impl AdvisoryStore for FailFirstInsertStore {
        async fn exists(&self, identifier: &str) -> Result<bool> {
            self.inner.exists(identifier).await
        }

        async fn insert(&self, advisory: &Advisory) -> Result<()> {
            if !self.failed.swap(true, Ordering::SeqCst) {
                return Err(WatchError::StoreWrite(sqlx::Error::PoolClosed));
            }
            self.inner.insert(advisory).await
        }
    }

    /// In-memory store that logs the order of lookups.
    #[derive(Default)]
    struct MemoryStore {
        ids: Mutex<HashSet<String>>,
        lookups: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl AdvisoryStore for MemoryStore {
        async fn exists(&self, identifier: &str) -> Result<bool> {
            self.lookups.lock().unwrap().push(identifier.to_string());
            Ok(self.ids.lock().unwrap().contains(identifier))
        }

        async fn insert(&self, advisory: &Advisory) -> Result<()> {
            if !self.ids.lock().unwrap().insert(advisory.identifier.clone()) {
                return Err(WatchError::ConstraintViolation {
                    identifier: advisory.identifier.clone(),
                });
            }
            Ok(())
        }
    }

    fn entry(n: usize) -> FeedEntry {
        FeedEntry {
            title: format!("CVE-2099-{:04}", n),
            published: format!("2099-01-{:02}", n % 28 + 1),
            link: format!("https://x/{}", n),
            description: format!("<p>Issue {}</p>", n),
            severity: "High".to_string(),
        }
    }

    fn entries(count: usize) -> Vec<FeedEntry> {
        (1..=count).map(entry).collect()
    }

    async fn open_db() -> (tempfile::TempDir, Database) {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::new(&dir.path().join("cve_data.db")).await.unwrap();
        (dir, db)
    }

    #[tokio::test]
    async fn test_new_advisory_is_notified_and_stored() {
        let (_dir, db) = open_db().await;
        let feed = StaticFeed(vec![FeedEntry {
            title: "CVE-2099-0001".to_string(),
            published: "2099-01-01".to_string(),
            link: "https://x/1".to_string(),
            description: "<p>Bad &amp; bug</p>".to_string(),
            severity: "Critical".to_string(),
        }]);
        let notifier = RecordingNotifier::default();

        let summary = run(&feed, &db, &notifier, 10).await.unwrap();

        assert_eq!(summary.notified, 1);
        let sent = notifier.sent.lock().unwrap().clone();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].description, "Bad & bug");

        let stored = db.get_advisory("CVE-2099-0001").await.unwrap().unwrap();
        assert_eq!(stored.identifier, "CVE-2099-0001");
        assert_eq!(stored.description, "Bad & bug");
        assert_eq!(stored.severity, "Critical");
        assert_eq!(stored.link, "https://x/1");
        assert_eq!(stored.published, "2099-01-01");
    }

    #[tokio::test]
    async fn test_second_run_is_a_no_op() {
        let (_dir, db) = open_db().await;
        let feed = StaticFeed(entries(1));

        let first = RecordingNotifier::default();
        run(&feed, &db, &first, 10).await.unwrap();

        let second = RecordingNotifier::default();
        let summary = run(&feed, &db, &second, 10).await.unwrap();

        assert_eq!(first.sent_ids(), vec!["CVE-2099-0001"]);
        assert!(second.sent_ids().is_empty());
        assert_eq!(
            summary,
            RunSummary {
                fetched: 1,
                considered: 1,
                skipped: 1,
                notified: 0
            }
        );
        assert_eq!(db.count_advisories().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_prefix_is_bounded() {
        let store = MemoryStore::default();
        let notifier = RecordingNotifier::default();

        let summary = run(&StaticFeed(entries(15)), &store, &notifier, 10)
            .await
            .unwrap();

        assert_eq!(summary.fetched, 15);
        assert_eq!(summary.considered, 10);
        assert_eq!(notifier.sent_ids().len(), 10);
        assert_eq!(store.lookups.lock().unwrap().len(), 10);
    }

    #[tokio::test]
    async fn test_short_feed_is_fully_considered() {
        let store = MemoryStore::default();
        let notifier = RecordingNotifier::default();

        let summary = run(&StaticFeed(entries(3)), &store, &notifier, 10)
            .await
            .unwrap();

        assert_eq!(summary.considered, 3);
        assert_eq!(notifier.sent_ids().len(), 3);
    }

    #[tokio::test]
    async fn test_cap_is_configurable() {
        let store = MemoryStore::default();
        let notifier = RecordingNotifier::default();

        let summary = run(&StaticFeed(entries(15)), &store, &notifier, 12)
            .await
            .unwrap();

        assert_eq!(summary.considered, 12);
    }

    #[tokio::test]
    async fn test_entries_processed_in_feed_order() {
        let store = MemoryStore::default();
        let notifier = RecordingNotifier::default();
        let feed = StaticFeed(vec![entry(7), entry(2), entry(9), entry(1)]);

        run(&feed, &store, &notifier, 10).await.unwrap();

        let expected = vec!["CVE-2099-0007", "CVE-2099-0002", "CVE-2099-0009", "CVE-2099-0001"];
        assert_eq!(notifier.sent_ids(), expected);
        assert_eq!(*store.lookups.lock().unwrap(), expected);
    }

    #[tokio::test]
    async fn test_notify_failure_stops_the_run() {
        let (_dir, db) = open_db().await;
        let notifier = RecordingNotifier::failing_on(2);

        let err = run(&StaticFeed(entries(5)), &db, &notifier, 10)
            .await
            .unwrap_err();

        assert!(matches!(err, WatchError::Notify { .. }));
        assert_eq!(notifier.sent_ids(), vec!["CVE-2099-0001"]);
        assert!(db.advisory_exists("CVE-2099-0001").await.unwrap());
        for n in 2..=5 {
            let id = format!("CVE-2099-{:04}", n);
            assert!(!db.advisory_exists(&id).await.unwrap(), "{} stored", id);
        }
    }

    #[tokio::test]
    async fn test_fetch_failure_touches_nothing() {
        let store = MemoryStore::default();
        let notifier = RecordingNotifier::default();

        let err = run(&FailingFeed, &store, &notifier, 10).await.unwrap_err();

        assert_eq!(err.stage(), "fetch");
        assert!(store.lookups.lock().unwrap().is_empty());
        assert!(notifier.sent_ids().is_empty());
    }

    #[tokio::test]
    async fn test_failed_insert_after_notify_renotifies_next_run() {
        let feed = StaticFeed(entries(2));
        let store = FailFirstInsertStore::default();
        let notifier = RecordingNotifier::default();

        let err = run(&feed, &store, &notifier, 10).await.unwrap_err();
        assert!(matches!(err, WatchError::StoreWrite(_)));
        assert_eq!(notifier.sent_ids(), vec!["CVE-2099-0001"]);
        assert!(!store.exists("CVE-2099-0001").await.unwrap());

        // Nothing was marked seen, so the retry alerts for the same entry again.
        let summary = run(&feed, &store, &notifier, 10).await.unwrap();
        assert_eq!(summary.notified, 2);
        assert_eq!(
            notifier.sent_ids(),
            vec!["CVE-2099-0001", "CVE-2099-0001", "CVE-2099-0002"]
        );

        let third = RecordingNotifier::default();
        run(&feed, &store, &third, 10).await.unwrap();
        assert!(third.sent_ids().is_empty());
    }

    #[derive(Clone, Default)]
    struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

    impl io::Write for CapturedLogs {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_run_logs_under_named_targets() {
        let logs = CapturedLogs::default();
        let writer = logs.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(move || writer.clone())
            .with_ansi(false)
            .with_max_level(tracing::Level::DEBUG)
            .finish();
        let _default = tracing::subscriber::set_default(subscriber);

        let store = MemoryStore::default();
        let feed = StaticFeed(entries(2));
        run(&feed, &store, &RecordingNotifier::default(), 10).await.unwrap();
        run(&feed, &store, &RecordingNotifier::default(), 10).await.unwrap();

        let output = String::from_utf8(logs.0.lock().unwrap().clone()).unwrap();
        assert!(output.contains("db_query: Stored advisory: CVE-2099-0001"));
        assert!(output.contains("db_query: CVE already exists in the database"));
        assert!(output.contains("web_request: Finished processing CVEs"));
        for line in output.lines() {
            assert!(
                line.contains(" db_query: ") || line.contains(" web_request: "),
                "untargeted log line: {}",
                line
            );
        }
    }

    #[tokio::test]
    async fn test_duplicate_titles_in_one_feed_collapse() {
        let (_dir, db) = open_db().await;
        let mut second = entry(1);
        second.link = "https://x/other".to_string();
        let feed = StaticFeed(vec![entry(1), second]);
        let notifier = RecordingNotifier::default();

        let summary = run(&feed, &db, &notifier, 10).await.unwrap();

        assert_eq!(summary.notified, 1);
        assert_eq!(summary.skipped, 1);
        let stored = db.get_advisory("CVE-2099-0001").await.unwrap().unwrap();
        assert_eq!(stored.link, "https://x/1");
    }
}

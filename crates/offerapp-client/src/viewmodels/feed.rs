//! Feed pagination and filters.

use std::collections::HashSet;

use offerapp_shared::{Category, FeedQuery, FeedTab, PostId, SortOption, StatusFilter};

use super::main::MainViewModel;
use crate::error::Result;

impl MainViewModel {
    /// Fetch the next page. Ignored while a fetch is in flight or once the
    /// feed is exhausted.
    pub async fn load_more_posts(&self) -> Result<()> {
        let (query, cursor, generation) = {
            let mut state = self.lock()?;
            if state.is_loading || state.all_loaded {
                return Ok(());
            }
            state.is_loading = true;
            (state.query, state.cursor.clone(), state.generation)
        };

        let result = self
            .backend
            .fetch_posts(query, cursor, self.page_size)
            .await;

        let mut state = self.lock()?;
        if state.generation != generation {
            tracing::debug!(generation, "discarding page fetched for an old query");
            return Ok(());
        }
        state.is_loading = false;

        let page = match result {
            Ok(page) => page,
            Err(e) => {
                drop(state);
                return self.fail("load_more_posts", e);
            }
        };

        let known: HashSet<PostId> = state.all_posts.iter().map(|p| p.id).collect();
        let fetched = page.posts.len();
        let fresh: Vec<_> = page
            .posts
            .into_iter()
            .filter(|p| !known.contains(&p.id))
            .collect();
        let added = fresh.len();
        state.all_posts.extend(fresh);

        if fetched == 0 || page.next_cursor.is_none() {
            state.all_loaded = true;
        }
        if page.next_cursor.is_some() {
            state.cursor = page.next_cursor;
        }
        state.apply_filters();

        tracing::debug!(
            fetched,
            added,
            total = state.all_posts.len(),
            exhausted = state.all_loaded,
            "feed page loaded"
        );
        Ok(())
    }

    /// Drop everything fetched so far and load the first page again.
    pub async fn refresh_posts(&self) -> Result<()> {
        self.lock()?.reset_feed();
        self.load_more_posts().await
    }

    /// Server-side category filter. `Todos` shows everything.
    pub async fn filter_by_category(&self, category: Category) -> Result<()> {
        {
            let mut state = self.lock()?;
            state.query.category = category;
            state.reset_feed();
        }
        tracing::debug!(%category, "category changed");
        self.load_more_posts().await
    }

    pub async fn set_sort_option(&self, sort: SortOption) -> Result<()> {
        {
            let mut state = self.lock()?;
            state.query.sort = sort;
            state.reset_feed();
        }
        self.load_more_posts().await
    }

    pub async fn set_status_filter(&self, status: StatusFilter) -> Result<()> {
        {
            let mut state = self.lock()?;
            state.query.status = status;
            state.reset_feed();
        }
        self.load_more_posts().await
    }

    pub fn current_query(&self) -> Result<FeedQuery> {
        Ok(self.lock()?.query)
    }

    /// Client-side search over the fetched window.
    pub fn on_search_query_change(&self, query: &str) -> Result<()> {
        let mut state = self.lock()?;
        state.filter.search_query = query.to_string();
        state.apply_filters();
        Ok(())
    }

    /// "Todos" / "Siguiendo" tabs, filtered client-side.
    pub fn on_feed_tab_selected(&self, tab: FeedTab) -> Result<()> {
        let mut state = self.lock()?;
        state.filter.tab = tab;
        state.apply_filters();
        Ok(())
    }

    /// Page through the whole unfiltered feed (profile screens need every
    /// post of a user). Replaces the fetched list and the server-side
    /// filters, and marks the feed exhausted.
    pub async fn load_all_posts_for_profile(&self) -> Result<()> {
        let generation = {
            let mut state = self.lock()?;
            if state.is_loading {
                return Ok(());
            }
            state.is_loading = true;
            state.generation
        };

        let query = FeedQuery {
            category: Category::All,
            ..FeedQuery::default()
        };
        let mut posts = Vec::new();
        let mut seen = HashSet::new();
        let mut cursor = None;
        let outcome = loop {
            match self.backend.fetch_posts(query, cursor, self.page_size).await {
                Ok(page) => {
                    let empty = page.posts.is_empty();
                    posts.extend(page.posts.into_iter().filter(|p| seen.insert(p.id)));
                    match page.next_cursor {
                        Some(next) if !empty => cursor = Some(next),
                        _ => break Ok(()),
                    }
                }
                Err(e) => break Err(e),
            }
        };

        let mut state = self.lock()?;
        if state.generation != generation {
            tracing::debug!("discarding profile load for an old query");
            return Ok(());
        }
        state.is_loading = false;
        match outcome {
            Ok(()) => {
                tracing::debug!(total = posts.len(), "loaded every post for profile");
                state.query = query;
                state.all_posts = posts;
                state.cursor = None;
                state.all_loaded = true;
                state.apply_filters();
                Ok(())
            }
            Err(e) => {
                drop(state);
                self.fail("load_all_posts_for_profile", e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::Ordering;
    use std::sync::Arc;

    use offerapp_shared::{PostStatus, User};

    use super::*;
    use crate::backend::Backend;
    use crate::test_support::{new_post, store_backend, FlakyBackend};

    async fn seed(backend: &Arc<dyn Backend>, author: &User, n: usize, category: Category) {
        for i in 0..n {
            backend
                .create_post(
                    author.uid,
                    new_post(&format!("Oferta {i}"), category, 10.0 + i as f64),
                    b"img".to_vec(),
                )
                .await
                .unwrap();
        }
    }

    #[tokio::test]
    async fn pages_accumulate_without_duplicates_until_exhausted() {
        let dir = tempfile::tempdir().unwrap();
        let (backend, _) = store_backend(&dir).await;
        let ana = backend.sign_up("ana@example.com", "secreto1", "ana").await.unwrap();
        seed(&backend, &ana, 23, Category::Food).await;

        let vm = MainViewModel::new(backend, ana, 10);
        vm.load_more_posts().await.unwrap();
        assert_eq!(vm.posts().unwrap().len(), 10);
        vm.load_more_posts().await.unwrap();
        vm.load_more_posts().await.unwrap();

        let state = vm.snapshot().unwrap();
        assert_eq!(state.all_posts.len(), 23);
        assert!(state.all_loaded);
        let ids: HashSet<_> = state.all_posts.iter().map(|p| p.id).collect();
        assert_eq!(ids.len(), 23);

        // exhausted: further calls are no-ops
        vm.load_more_posts().await.unwrap();
        assert_eq!(vm.snapshot().unwrap().all_posts.len(), 23);
    }

    #[tokio::test]
    async fn concurrent_loads_fetch_one_page() {
        let dir = tempfile::tempdir().unwrap();
        let (inner, _) = store_backend(&dir).await;
        let ana = inner.sign_up("ana@example.com", "secreto1", "ana").await.unwrap();
        seed(&inner, &ana, 15, Category::Food).await;

        let flaky = Arc::new(FlakyBackend::new(inner));
        flaky.fetch_yields.store(3, Ordering::SeqCst);
        let vm = MainViewModel::new(flaky.clone(), ana, 10);

        let (a, b) = tokio::join!(vm.load_more_posts(), vm.load_more_posts());
        a.unwrap();
        b.unwrap();
        assert_eq!(flaky.fetch_calls.load(Ordering::SeqCst), 1);
        assert_eq!(vm.snapshot().unwrap().all_posts.len(), 10);
    }

    #[tokio::test]
    async fn category_change_resets_and_drops_stale_page() {
        let dir = tempfile::tempdir().unwrap();
        let (inner, _) = store_backend(&dir).await;
        let ana = inner.sign_up("ana@example.com", "secreto1", "ana").await.unwrap();
        seed(&inner, &ana, 4, Category::Food).await;
        seed(&inner, &ana, 2, Category::Toys).await;

        let flaky = Arc::new(FlakyBackend::new(inner));
        flaky.fetch_yields.store(2, Ordering::SeqCst);
        let vm = MainViewModel::new(flaky.clone(), ana, 10);

        // the unfiltered fetch is still in flight when the category changes
        let (a, b) = tokio::join!(vm.load_more_posts(), vm.filter_by_category(Category::Toys));
        a.unwrap();
        b.unwrap();

        let state = vm.snapshot().unwrap();
        assert_eq!(flaky.fetch_calls.load(Ordering::SeqCst), 2);
        assert_eq!(state.query.category, Category::Toys);
        assert_eq!(state.all_posts.len(), 2);
        assert!(state.all_posts.iter().all(|p| p.category == Category::Toys));
        assert!(!state.is_loading);

        vm.filter_by_category(Category::All).await.unwrap();
        assert_eq!(vm.posts().unwrap().len(), 6);
    }

    #[tokio::test]
    async fn search_and_following_tab_filter_fetched_window() {
        let dir = tempfile::tempdir().unwrap();
        let (backend, _) = store_backend(&dir).await;
        let ana = backend.sign_up("ana@example.com", "secreto1", "ana").await.unwrap();
        let beto = backend.sign_up("beto@example.com", "secreto1", "beto").await.unwrap();
        backend
            .create_post(ana.uid, new_post("Televisor 50'", Category::Technology, 500.0), b"i".to_vec())
            .await
            .unwrap();
        backend
            .create_post(beto.uid, new_post("Bicicleta", Category::Sports, 300.0), b"i".to_vec())
            .await
            .unwrap();
        backend.follow_user(ana.uid, beto.uid).await.unwrap();
        let ana = backend.get_user(ana.uid).await.unwrap().unwrap();

        let vm = MainViewModel::new(backend, ana, 10);
        vm.refresh_posts().await.unwrap();
        assert_eq!(vm.posts().unwrap().len(), 2);

        vm.on_search_query_change("TELEVISOR").unwrap();
        assert_eq!(vm.posts().unwrap().len(), 1);
        vm.on_search_query_change("centro").unwrap();
        assert_eq!(vm.posts().unwrap().len(), 2);
        vm.on_search_query_change("").unwrap();

        vm.on_feed_tab_selected(FeedTab::Following).unwrap();
        let posts = vm.posts().unwrap();
        assert_eq!(posts.len(), 1);
        assert_eq!(posts[0].author.username, "beto");

        vm.on_feed_tab_selected(FeedTab::All).unwrap();
        assert_eq!(vm.posts().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn sort_and_status_changes_requery() {
        let dir = tempfile::tempdir().unwrap();
        let (backend, _) = store_backend(&dir).await;
        let ana = backend.sign_up("ana@example.com", "secreto1", "ana").await.unwrap();
        seed(&backend, &ana, 3, Category::Food).await;
        let first = backend
            .fetch_posts(FeedQuery::default(), None, 10)
            .await
            .unwrap()
            .posts[0]
            .id;
        backend.update_post_status(first, PostStatus::Expired).await.unwrap();

        let vm = MainViewModel::new(backend, ana, 10);
        vm.set_sort_option(SortOption::PriceAsc).await.unwrap();
        let prices: Vec<f64> = vm.posts().unwrap().iter().map(|p| p.price).collect();
        assert_eq!(prices, vec![10.0, 11.0, 12.0]);

        vm.set_status_filter(StatusFilter::Only(PostStatus::Active)).await.unwrap();
        assert_eq!(vm.posts().unwrap().len(), 2);
        assert_eq!(vm.current_query().unwrap().sort, SortOption::PriceAsc);
    }

    #[tokio::test]
    async fn failed_fetch_sets_error_and_allows_retry() {
        let dir = tempfile::tempdir().unwrap();
        let (inner, _) = store_backend(&dir).await;
        let ana = inner.sign_up("ana@example.com", "secreto1", "ana").await.unwrap();
        seed(&inner, &ana, 2, Category::Food).await;

        let flaky = Arc::new(FlakyBackend::new(inner));
        flaky.fail_fetches.store(true, Ordering::SeqCst);
        let vm = MainViewModel::new(flaky.clone(), ana, 10);

        assert!(vm.load_more_posts().await.is_err());
        let state = vm.snapshot().unwrap();
        assert!(!state.is_loading);
        assert!(!state.all_loaded);
        assert!(state.last_error.is_some());

        flaky.fail_fetches.store(false, Ordering::SeqCst);
        vm.load_more_posts().await.unwrap();
        assert_eq!(vm.posts().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn profile_load_pages_through_everything() {
        let dir = tempfile::tempdir().unwrap();
        let (backend, _) = store_backend(&dir).await;
        let ana = backend.sign_up("ana@example.com", "secreto1", "ana").await.unwrap();
        seed(&backend, &ana, 7, Category::Food).await;
        seed(&backend, &ana, 5, Category::Toys).await;

        let vm = MainViewModel::new(backend, ana.clone(), 5);
        vm.filter_by_category(Category::Toys).await.unwrap();
        vm.load_all_posts_for_profile().await.unwrap();

        let state = vm.snapshot().unwrap();
        assert_eq!(state.all_posts.len(), 12);
        assert!(state.all_loaded);
        assert_eq!(vm.my_posts().unwrap().len(), 12);
        assert_eq!(vm.current_query().unwrap().category, Category::All);
    }
}

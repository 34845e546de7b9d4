//! Fixtures
//!
//! In-memory collaborators for exercising the cart engine without a network
//! or a filesystem.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use rusty_money::{
    Money,
    iso::{Currency, INR},
};
use thiserror::Error;

use crate::{
    api::{ApiError, Catalog, RemoteCart},
    cart::{CartContext, CartEngine},
    notify::{NoticeKind, Notifier},
    products::{Product, ProductId},
    promotions::{DEFAULT_GIFT_THRESHOLD, FreeGiftPromotion},
    session::Session,
    storage::{CartStore, KeyValueStore, MemoryStore, PersistedCartEntry},
};

/// Fixture Errors
#[derive(Debug, Error)]
pub enum FixtureError {
    /// Product not found
    #[error("Product not found: {0}")]
    ProductNotFound(String),
}

/// How a fixture collaborator fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FixtureFailure {
    /// The API answered with a server error.
    Unavailable,

    /// The API rejected the session token.
    Unauthorized,
}

impl FixtureFailure {
    fn to_error(self) -> ApiError {
        match self {
            Self::Unavailable => ApiError::Status {
                status: 503,
                message: "Service unavailable".to_string(),
            },
            Self::Unauthorized => ApiError::Unauthorized,
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Catalog serving a fixed product list.
#[derive(Debug, Default)]
pub struct FixtureCatalog {
    products: Mutex<Vec<Product>>,
    failure: Mutex<Option<FixtureFailure>>,
    calls: Mutex<usize>,
}

impl FixtureCatalog {
    /// Serve `products`.
    pub fn new(products: Vec<Product>) -> Self {
        Self {
            products: Mutex::new(products),
            ..Self::default()
        }
    }

    /// Fail every following request, or recover with `None`.
    pub fn fail_with(&self, failure: Option<FixtureFailure>) {
        *lock(&self.failure) = failure;
    }

    /// Number of catalog requests served or failed.
    pub fn calls(&self) -> usize {
        *lock(&self.calls)
    }
}

#[async_trait]
impl Catalog for FixtureCatalog {
    async fn list_products(&self) -> Result<Vec<Product>, ApiError> {
        *lock(&self.calls) += 1;

        if let Some(failure) = *lock(&self.failure) {
            return Err(failure.to_error());
        }

        Ok(lock(&self.products).clone())
    }
}

/// Remote cart held in memory. Every merge overwrites the stored cart.
#[derive(Debug, Default)]
pub struct FixtureRemoteCart {
    cart: Mutex<Option<Vec<PersistedCartEntry>>>,
    merges: Mutex<Vec<Vec<PersistedCartEntry>>>,
    tokens: Mutex<Vec<String>>,
    fetch_failure: Mutex<Option<FixtureFailure>>,
    merge_failure: Mutex<Option<FixtureFailure>>,
}

impl FixtureRemoteCart {
    /// Remote store without a cart.
    pub fn new() -> Self {
        Self::default()
    }

    /// Remote store holding `entries`.
    pub fn with_cart(entries: Vec<PersistedCartEntry>) -> Self {
        Self {
            cart: Mutex::new(Some(entries)),
            ..Self::default()
        }
    }

    /// Fail fetches, or recover with `None`.
    pub fn fail_fetch(&self, failure: Option<FixtureFailure>) {
        *lock(&self.fetch_failure) = failure;
    }

    /// Fail merges, or recover with `None`.
    pub fn fail_merge(&self, failure: Option<FixtureFailure>) {
        *lock(&self.merge_failure) = failure;
    }

    /// Currently stored remote cart.
    pub fn cart(&self) -> Option<Vec<PersistedCartEntry>> {
        lock(&self.cart).clone()
    }

    /// Every accepted merge payload, oldest first.
    pub fn merges(&self) -> Vec<Vec<PersistedCartEntry>> {
        lock(&self.merges).clone()
    }

    /// Bearer tokens seen by fetches and merges, in call order.
    pub fn tokens(&self) -> Vec<String> {
        lock(&self.tokens).clone()
    }
}

#[async_trait]
impl RemoteCart for FixtureRemoteCart {
    async fn fetch_cart(&self, token: &str) -> Result<Option<Vec<PersistedCartEntry>>, ApiError> {
        lock(&self.tokens).push(token.to_string());

        if let Some(failure) = *lock(&self.fetch_failure) {
            return Err(failure.to_error());
        }

        Ok(self.cart())
    }

    async fn merge_cart(
        &self,
        token: &str,
        entries: &[PersistedCartEntry],
    ) -> Result<(), ApiError> {
        lock(&self.tokens).push(token.to_string());

        if let Some(failure) = *lock(&self.merge_failure) {
            return Err(failure.to_error());
        }

        lock(&self.merges).push(entries.to_vec());
        *lock(&self.cart) = Some(entries.to_vec());

        Ok(())
    }
}

/// Notifier recording everything it is asked to show.
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    notices: Mutex<Vec<(String, NoticeKind)>>,
    badges: Mutex<Vec<u32>>,
    auth_requests: Mutex<Vec<String>>,
}

impl RecordingNotifier {
    /// Empty recorder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Toasts shown so far.
    pub fn notices(&self) -> Vec<(String, NoticeKind)> {
        lock(&self.notices).clone()
    }

    /// Toast messages shown so far.
    pub fn messages(&self) -> Vec<String> {
        lock(&self.notices)
            .iter()
            .map(|(message, _)| message.clone())
            .collect()
    }

    /// Every badge value, oldest first.
    pub fn badges(&self) -> Vec<u32> {
        lock(&self.badges).clone()
    }

    /// Most recent badge value.
    pub fn last_badge(&self) -> Option<u32> {
        lock(&self.badges).last().copied()
    }

    /// Actions the shopper was asked to sign in for.
    pub fn auth_requests(&self) -> Vec<String> {
        lock(&self.auth_requests).clone()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, message: &str, kind: NoticeKind) {
        lock(&self.notices).push((message.to_string(), kind));
    }

    fn badge(&self, total_quantity: u32) {
        lock(&self.badges).push(total_quantity);
    }

    fn request_authentication(&self, action: &str) {
        lock(&self.auth_requests).push(action.to_string());
    }
}

/// Session held in memory.
#[derive(Debug, Default)]
pub struct FixtureSession {
    token: Mutex<Option<String>>,
    invalidations: Mutex<usize>,
}

impl FixtureSession {
    /// Signed-in session with `token`.
    pub fn signed_in(token: impl Into<String>) -> Self {
        Self {
            token: Mutex::new(Some(token.into())),
            ..Self::default()
        }
    }

    /// Anonymous session.
    pub fn signed_out() -> Self {
        Self::default()
    }

    /// Sign in with `token`.
    pub fn sign_in(&self, token: impl Into<String>) {
        *lock(&self.token) = Some(token.into());
    }

    /// Number of times the session was invalidated.
    pub fn invalidations(&self) -> usize {
        *lock(&self.invalidations)
    }
}

impl Session for FixtureSession {
    fn token(&self) -> Option<String> {
        lock(&self.token).clone()
    }

    fn invalidate(&self) {
        *lock(&self.token) = None;
        *lock(&self.invalidations) += 1;
    }
}

/// Fixture
///
/// A small storefront catalog wired to in-memory collaborators.
#[derive(Debug, Clone)]
pub struct Fixture {
    /// Catalog collaborator
    pub catalog: Arc<FixtureCatalog>,

    /// Remote cart collaborator
    pub remote: Arc<FixtureRemoteCart>,

    /// Backing key-value store for the local cart
    pub store: Arc<MemoryStore>,

    /// Session collaborator
    pub session: Arc<FixtureSession>,

    /// Notifier collaborator
    pub notifier: Arc<RecordingNotifier>,

    products: Vec<Product>,
    currency: &'static Currency,
}

impl Default for Fixture {
    fn default() -> Self {
        Self::new()
    }
}

impl Fixture {
    /// Signed-in fixture with the default catalog and an empty remote cart.
    pub fn new() -> Self {
        Self::with_products(default_products())
    }

    /// Signed-in fixture serving `products`.
    pub fn with_products(products: Vec<Product>) -> Self {
        Self {
            catalog: Arc::new(FixtureCatalog::new(products.clone())),
            remote: Arc::new(FixtureRemoteCart::new()),
            store: Arc::new(MemoryStore::new()),
            session: Arc::new(FixtureSession::signed_in("fixture-token")),
            notifier: Arc::new(RecordingNotifier::new()),
            products,
            currency: INR,
        }
    }

    /// Replace the remote collaborator.
    #[must_use]
    pub fn with_remote(mut self, remote: FixtureRemoteCart) -> Self {
        self.remote = Arc::new(remote);
        self
    }

    /// Replace the session collaborator.
    #[must_use]
    pub fn with_session(mut self, session: FixtureSession) -> Self {
        self.session = Arc::new(session);
        self
    }

    /// Get a product by its identifier
    ///
    /// # Errors
    ///
    /// Returns an error if the product is not found.
    pub fn product(&self, id: &str) -> Result<&Product, FixtureError> {
        self.products
            .iter()
            .find(|product| product.id.as_str() == id)
            .ok_or_else(|| FixtureError::ProductNotFound(id.to_string()))
    }

    /// Local cart store view over [`Fixture::store`].
    pub fn cart_store(&self) -> CartStore {
        let store: Arc<dyn KeyValueStore> = self.store.clone();
        CartStore::new(store)
    }

    /// Engine context over the fixture collaborators.
    pub fn context(&self) -> CartContext {
        CartContext {
            catalog: self.catalog.clone(),
            remote: self.remote.clone(),
            store: self.cart_store(),
            session: self.session.clone(),
            notifier: self.notifier.clone(),
        }
    }

    /// Free-gift promotion at the default threshold.
    pub fn promotion(&self) -> FreeGiftPromotion {
        FreeGiftPromotion::with_threshold(Money::from_major(DEFAULT_GIFT_THRESHOLD, self.currency))
    }

    /// Unloaded engine over the fixture collaborators.
    pub fn engine(&self) -> CartEngine {
        CartEngine::new(self.context(), self.promotion())
    }

    /// Loaded engine over the fixture collaborators.
    pub async fn loaded_engine(&self) -> CartEngine {
        let mut engine = self.engine();
        engine.load().await;
        engine
    }
}

/// Phone accessories priced in rupees.
pub fn default_products() -> Vec<Product> {
    vec![
        Product::new("case", "Shockproof Phone Case", Money::from_major(499, INR))
            .with_image("case.jpg"),
        Product::new("charger", "65W Fast Charger", Money::from_major(999, INR))
            .with_image("charger.jpg"),
        Product::new("earbuds", "Wireless Earbuds", Money::from_major(1999, INR))
            .with_image("earbuds.jpg"),
        Product::new("cable", "Braided USB-C Cable", Money::from_minor(24_950, INR))
            .with_image("cable.jpg"),
    ]
}

#[cfg(test)]
mod tests {
    use testresult::TestResult;

    use super::*;

    #[tokio::test]
    async fn remote_merge_overwrites_stored_cart() -> TestResult {
        let remote = FixtureRemoteCart::with_cart(vec![PersistedCartEntry::new("case", 1)]);

        remote
            .merge_cart("token", &[PersistedCartEntry::new("charger", 2)])
            .await?;

        assert_eq!(remote.cart(), Some(vec![PersistedCartEntry::new("charger", 2)]));
        assert_eq!(remote.tokens(), vec!["token".to_string()]);

        Ok(())
    }

    #[tokio::test]
    async fn catalog_failure_is_reported() {
        let catalog = FixtureCatalog::new(default_products());
        catalog.fail_with(Some(FixtureFailure::Unavailable));

        let result = catalog.list_products().await;

        assert!(result.is_err(), "failing catalog returns an error");
        assert_eq!(catalog.calls(), 1);
    }

    #[test]
    fn session_invalidation_signs_out() {
        let session = FixtureSession::signed_in("token");

        session.invalidate();

        assert!(!session.is_authenticated(), "invalidated session is anonymous");
        assert_eq!(session.invalidations(), 1);
    }

    #[test]
    fn unknown_product_is_an_error() {
        let fixture = Fixture::new();

        assert!(fixture.product("case").is_ok(), "default catalog has a case");
        assert!(matches!(
            fixture.product("missing"),
            Err(FixtureError::ProductNotFound(id)) if id == "missing"
        ));
    }
}

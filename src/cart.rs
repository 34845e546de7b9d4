//! Cart Engine
//!
//! Owns the shopper's cart lines. Mutations run synchronously against the
//! in-memory lines, then persist locally and push the full cart to the remote
//! store in the background (optimistic local write, eventual remote
//! consistency, last writer wins).

use std::{fmt, sync::Arc, time::Duration};

use rusty_money::{Money, iso::Currency};
use tracing::{debug, error, warn};

use crate::{
    api::{ApiError, Catalog, RemoteCart},
    background::BackgroundTasks,
    cooldown::Cooldown,
    items::CartLineItem,
    notify::{NoticeKind, Notifier},
    pricing::{self, sanity_cap},
    products::{CatalogIndex, Product, ProductId},
    promotions::{FreeGiftPromotion, GiftProgress},
    session::Session,
    storage::{CartStore, PersistedCartEntry},
};

/// Window during which repeated add-to-cart triggers are ignored.
pub const ADD_COOLDOWN: Duration = Duration::from_secs(1);

const LOAD_ERROR_MESSAGE: &str = "Error loading cart";
const ADDED_MESSAGE: &str = "Added to cart!";
const REMOVED_MESSAGE: &str = "Item removed";
const EMPTY_CART_MESSAGE: &str = "Cart is empty";
const ADD_AUTH_ACTION: &str = "add products to your cart";

/// Result of an add-to-cart request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddOutcome {
    /// A new line was appended.
    Added,

    /// An existing line's quantity was increased.
    Incremented,

    /// Ignored: another add happened less than [`ADD_COOLDOWN`] ago.
    CoolingDown,

    /// Ignored: the shopper was asked to sign in.
    AuthenticationRequired,

    /// Ignored: empty product identifier or zero quantity.
    Rejected,

    /// Ignored: the cart has not been loaded yet.
    NotLoaded,
}

/// Whether the shopper may proceed to checkout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckoutDecision {
    /// No regular lines in the cart.
    EmptyCart,

    /// The shopper must sign in first.
    LoginRequired,

    /// Continue to the address step.
    Proceed,
}

/// Collaborators the engine is assembled from.
#[derive(Clone)]
pub struct CartContext {
    /// Product catalog lookup.
    pub catalog: Arc<dyn Catalog>,

    /// Remote cart store.
    pub remote: Arc<dyn RemoteCart>,

    /// Local persisted cart.
    pub store: CartStore,

    /// Authentication state.
    pub session: Arc<dyn Session>,

    /// Toasts, badge and sign-in prompts.
    pub notifier: Arc<dyn Notifier>,
}

/// Gift-adjusted, quantity-bounded shopping cart.
///
/// Constructed once per session; call [`CartEngine::shutdown`] on logout.
pub struct CartEngine {
    context: CartContext,
    promotion: FreeGiftPromotion,
    catalog: CatalogIndex,
    lines: Vec<CartLineItem>,
    loaded: bool,
    cooldown: Cooldown,
    background: BackgroundTasks,
}

impl fmt::Debug for CartEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CartEngine")
            .field("promotion", &self.promotion)
            .field("lines", &self.lines)
            .field("loaded", &self.loaded)
            .field("cooldown", &self.cooldown)
            .field("background", &self.background)
            .finish_non_exhaustive()
    }
}

impl CartEngine {
    /// Create an engine that has not been loaded yet.
    pub fn new(context: CartContext, promotion: FreeGiftPromotion) -> Self {
        Self {
            context,
            promotion,
            catalog: CatalogIndex::default(),
            lines: Vec::new(),
            loaded: false,
            cooldown: Cooldown::new(ADD_COOLDOWN),
            background: BackgroundTasks::new(),
        }
    }

    /// Rebuild the cart from local storage, the catalog and the remote cart.
    ///
    /// Never fails: catalog and remote errors are logged and notified, and the
    /// cart keeps whatever was resolved. When the catalog cannot be fetched the
    /// engine stays unloaded so later mutations cannot overwrite the stored cart;
    /// adds are then refused with a load error notice.
    pub async fn load(&mut self) -> &[CartLineItem] {
        self.lines.clear();

        self.catalog = match self.context.catalog.list_products().await {
            Ok(products) => products.into_iter().collect(),
            Err(error) => {
                warn!(%error, "failed to fetch catalog");
                self.context
                    .notifier
                    .notify(LOAD_ERROR_MESSAGE, NoticeKind::Error);
                self.loaded = false;
                return &self.lines;
            }
        };

        let stored = self.context.store.load().unwrap_or_else(|error| {
            warn!(%error, "local cart unreadable; starting empty");
            Vec::new()
        });
        self.lines = resolve_entries(&self.catalog, &stored);

        if let Some(token) = self.context.session.token() {
            if self.lines.is_empty() {
                self.adopt_remote(&token).await;
            } else {
                self.push_remote(self.entries());
            }
        }

        self.promotion.apply(&mut self.lines);
        self.loaded = true;
        self.context.notifier.badge(self.total_quantity());

        debug!(lines = self.lines.len(), "cart loaded");

        &self.lines
    }

    async fn adopt_remote(&mut self, token: &str) {
        match self.context.remote.fetch_cart(token).await {
            Ok(Some(entries)) => {
                self.lines = resolve_entries(&self.catalog, &entries);
                debug!(lines = self.lines.len(), "adopted remote cart");
            }
            Ok(None) => debug!("no remote cart to adopt"),
            Err(error) => {
                if error.is_unauthorized() {
                    self.context.session.invalidate();
                }
                warn!(%error, "failed to fetch remote cart");
                self.context
                    .notifier
                    .notify(LOAD_ERROR_MESSAGE, NoticeKind::Error);
            }
        }
    }

    /// Change a line's quantity by `delta`; reaching zero removes the line.
    ///
    /// Unknown products and the gift line are ignored.
    pub fn change_quantity(&mut self, product_id: &ProductId, delta: i64) {
        if !self.ensure_loaded("change quantity") {
            return;
        }

        let Some(line) = self.regular_line_mut(product_id) else {
            return;
        };

        let Some(quantity) = pricing::apply_delta(line.quantity(), delta) else {
            self.remove(product_id);
            return;
        };

        line.set_quantity(quantity);
        debug!(%product_id, quantity, "quantity changed");

        self.after_mutation();
    }

    /// Remove a regular line. Unknown products and the gift line are ignored.
    pub fn remove(&mut self, product_id: &ProductId) {
        if !self.ensure_loaded("remove") {
            return;
        }

        let before = self.lines.len();
        self.lines
            .retain(|line| line.is_gift() || line.product_id() != product_id);

        if self.lines.len() == before {
            return;
        }

        debug!(%product_id, "line removed");

        self.after_mutation();
        self.context
            .notifier
            .notify(REMOVED_MESSAGE, NoticeKind::Success);
    }

    /// Add one unit of `product`.
    pub fn add_one(&mut self, product: &Product) -> AddOutcome {
        self.add(product, 1)
    }

    /// Add `quantity` units of `product`.
    ///
    /// Guarded by a global [`ADD_COOLDOWN`]: any add within the window of the
    /// previous one is ignored, whichever product it is for.
    pub fn add(&mut self, product: &Product, quantity: u32) -> AddOutcome {
        if !self.loaded {
            return self.refuse_unloaded_add();
        }

        if self.cooldown.is_active() {
            debug!(product_id = %product.id, "add ignored during cooldown");
            return AddOutcome::CoolingDown;
        }

        if !self.context.session.is_authenticated() {
            self.context
                .notifier
                .request_authentication(ADD_AUTH_ACTION);
            return AddOutcome::AuthenticationRequired;
        }

        if product.id.is_empty() || quantity == 0 {
            return AddOutcome::Rejected;
        }

        self.cooldown.begin();

        let outcome = if let Some(line) = self.regular_line_mut(&product.id) {
            line.set_quantity(line.quantity().saturating_add(quantity));
            AddOutcome::Incremented
        } else {
            self.lines
                .push(CartLineItem::from_product(product, quantity));
            AddOutcome::Added
        };

        debug!(product_id = %product.id, quantity, ?outcome, "added to cart");

        self.after_mutation();
        self.context
            .notifier
            .notify(ADDED_MESSAGE, NoticeKind::Success);

        outcome
    }

    /// Add `quantity` units of the catalog product with `product_id`.
    ///
    /// Returns [`AddOutcome::Rejected`] when the product is not in the catalog.
    pub fn add_by_id(&mut self, product_id: &ProductId, quantity: u32) -> AddOutcome {
        match self.catalog.get(product_id).cloned() {
            Some(product) => self.add(&product, quantity),
            None if !self.loaded => self.refuse_unloaded_add(),
            None => AddOutcome::Rejected,
        }
    }

    /// Write the non-gift lines locally and push them to the remote cart.
    ///
    /// The remote push runs in the background when signed in; its failures are
    /// only logged. Does nothing until the cart has been loaded.
    pub fn persist(&mut self) {
        if !self.ensure_loaded("persist") {
            return;
        }

        let entries = self.entries();

        if let Err(error) = self.context.store.save(&entries) {
            error!(%error, "failed to write cart to local storage");
        }

        self.push_remote(entries);
    }

    fn push_remote(&mut self, entries: Vec<PersistedCartEntry>) {
        let Some(token) = self.context.session.token() else {
            return;
        };

        let remote = Arc::clone(&self.context.remote);
        let session = Arc::clone(&self.context.session);

        self.background.spawn("remote cart merge", async move {
            let result = remote.merge_cart(&token, &entries).await;

            if matches!(result, Err(ApiError::Unauthorized)) {
                session.invalidate();
            }

            result
        });
    }

    fn after_mutation(&mut self) {
        self.promotion.apply(&mut self.lines);
        self.persist();
        self.context.notifier.badge(self.total_quantity());
    }

    fn refuse_unloaded_add(&self) -> AddOutcome {
        warn!(operation = "add", "cart not loaded; ignoring mutation");
        self.context
            .notifier
            .notify(LOAD_ERROR_MESSAGE, NoticeKind::Error);

        AddOutcome::NotLoaded
    }

    fn ensure_loaded(&self, operation: &'static str) -> bool {
        if !self.loaded {
            warn!(operation, "cart not loaded; ignoring mutation");
        }

        self.loaded
    }

    fn regular_line_mut(&mut self, product_id: &ProductId) -> Option<&mut CartLineItem> {
        self.lines
            .iter_mut()
            .find(|line| !line.is_gift() && line.product_id() == product_id)
    }

    /// Whether [`CartEngine::load`] has completed successfully.
    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    /// All lines, the gift line last when present.
    pub fn lines(&self) -> &[CartLineItem] {
        &self.lines
    }

    /// Lines excluding the gift line.
    pub fn regular_lines(&self) -> impl Iterator<Item = &CartLineItem> {
        self.lines.iter().filter(|line| !line.is_gift())
    }

    /// The gift line, when unlocked.
    pub fn gift_line(&self) -> Option<&CartLineItem> {
        self.lines.iter().find(|line| line.is_gift())
    }

    /// Product from the last loaded catalog snapshot.
    pub fn product(&self, product_id: &ProductId) -> Option<&Product> {
        self.catalog.get(product_id)
    }

    /// Minimal projection of the regular lines.
    pub fn entries(&self) -> Vec<PersistedCartEntry> {
        self.regular_lines()
            .map(|line| PersistedCartEntry::new(line.product_id().clone(), line.quantity()))
            .collect()
    }

    /// Non-gift subtotal.
    pub fn subtotal(&self) -> Money<'static, Currency> {
        pricing::subtotal(&self.lines, self.promotion.currency())
    }

    /// Number of non-gift units, as shown on the cart badge.
    pub fn total_quantity(&self) -> u32 {
        pricing::total_quantity(&self.lines)
    }

    /// Progress towards the free gift.
    pub fn gift_progress(&self) -> GiftProgress {
        self.promotion.progress(&self.lines)
    }

    /// Decide whether checkout may start. The cart is left untouched.
    pub fn checkout(&self) -> CheckoutDecision {
        if self.regular_lines().next().is_none() {
            self.context
                .notifier
                .notify(EMPTY_CART_MESSAGE, NoticeKind::Info);
            return CheckoutDecision::EmptyCart;
        }

        if !self.context.session.is_authenticated() {
            return CheckoutDecision::LoginRequired;
        }

        CheckoutDecision::Proceed
    }

    /// Number of background pushes not yet joined.
    pub fn pending_tasks(&self) -> usize {
        self.background.pending()
    }

    /// Wait for every pending background push.
    pub async fn flush(&mut self) {
        self.background.flush().await;
    }

    /// Flush pending pushes and tear the engine down.
    pub async fn shutdown(mut self) {
        self.flush().await;
        debug!("cart engine shut down");
    }
}

/// Join persisted entries against the catalog.
///
/// Unresolvable and zero-quantity entries are dropped, duplicate entries are
/// folded into one line, and quantities are clamped to the sanity cap.
fn resolve_entries(catalog: &CatalogIndex, entries: &[PersistedCartEntry]) -> Vec<CartLineItem> {
    let mut lines: Vec<CartLineItem> = Vec::with_capacity(entries.len());

    for entry in entries.iter().filter(|entry| entry.quantity > 0) {
        let Some(product) = catalog.get(&entry.product_id) else {
            debug!(product_id = %entry.product_id, "dropping unresolved cart entry");
            continue;
        };

        if let Some(line) = lines
            .iter_mut()
            .find(|line| line.product_id() == &entry.product_id)
        {
            line.set_quantity(sanity_cap(line.quantity().saturating_add(entry.quantity)));
        } else {
            lines.push(CartLineItem::from_product(product, sanity_cap(entry.quantity)));
        }
    }

    lines
}


#[cfg(test)]
mod tests {
    use mockall::predicate::eq;
    use rusty_money::iso::INR;
    use testresult::TestResult;

    use crate::{
        api::{MockCatalog, MockRemoteCart},
        fixtures::{Fixture, FixtureRemoteCart, FixtureSession, default_products},
        notify::MockNotifier,
    };

    use super::*;

    #[test]
    fn resolve_entries_folds_duplicates_and_caps() {
        let catalog: CatalogIndex = default_products().into_iter().collect();

        let lines = resolve_entries(
            &catalog,
            &[
                PersistedCartEntry::new("case", 600),
                PersistedCartEntry::new("missing", 1),
                PersistedCartEntry::new("charger", 0),
                PersistedCartEntry::new("case", 600),
            ],
        );

        assert_eq!(lines.len(), 1, "unknown and zero entries are dropped");
        assert_eq!(lines.first().map(CartLineItem::quantity), Some(999));
    }

    #[tokio::test]
    async fn unloaded_engine_ignores_mutations() -> TestResult {
        let fixture = Fixture::new();
        let mut engine = fixture.engine();
        let case = fixture.product("case")?.clone();

        assert_eq!(engine.add(&case, 1), AddOutcome::NotLoaded);
        engine.change_quantity(&case.id, 1);
        engine.remove(&case.id);

        assert!(engine.lines().is_empty(), "nothing was added");
        assert_eq!(fixture.cart_store().load()?, Vec::new());
        assert_eq!(
            fixture.notifier.notices(),
            vec![(LOAD_ERROR_MESSAGE.to_string(), NoticeKind::Error)],
            "only the refused add is surfaced"
        );

        Ok(())
    }

    #[tokio::test]
    async fn persist_before_load_keeps_stored_cart() -> TestResult {
        let fixture = Fixture::new().with_remote(FixtureRemoteCart::with_cart(vec![
            PersistedCartEntry::new("charger", 1),
        ]));
        fixture
            .cart_store()
            .save(&[PersistedCartEntry::new("case", 2)])?;

        let mut engine = fixture.engine();
        engine.persist();
        engine.flush().await;

        assert_eq!(
            fixture.cart_store().load()?,
            vec![PersistedCartEntry::new("case", 2)],
            "local cart untouched"
        );
        assert_eq!(
            fixture.remote.cart(),
            Some(vec![PersistedCartEntry::new("charger", 1)]),
            "remote cart untouched"
        );
        assert!(fixture.remote.merges().is_empty(), "nothing pushed");

        Ok(())
    }

    #[tokio::test]
    async fn anonymous_add_requests_authentication() -> TestResult {
        let fixture = Fixture::new().with_session(FixtureSession::signed_out());

        let mut notifier = MockNotifier::new();
        notifier.expect_badge().with(eq(0)).return_const(());
        notifier
            .expect_request_authentication()
            .withf(|action| action == "add products to your cart")
            .times(2)
            .return_const(());
        notifier.expect_notify().never();

        let context = CartContext {
            notifier: Arc::new(notifier),
            ..fixture.context()
        };
        let mut engine = CartEngine::new(context, fixture.promotion());
        engine.load().await;

        let case = fixture.product("case")?;

        assert_eq!(engine.add(case, 1), AddOutcome::AuthenticationRequired);
        assert_eq!(
            engine.add(case, 1),
            AddOutcome::AuthenticationRequired,
            "a refused add does not start the cooldown"
        );
        assert!(engine.lines().is_empty(), "anonymous adds change nothing");

        Ok(())
    }

    #[tokio::test]
    async fn empty_local_cart_fetches_remote_once() -> TestResult {
        let fixture = Fixture::new();

        let mut catalog = MockCatalog::new();
        catalog
            .expect_list_products()
            .times(1)
            .returning(|| Ok(default_products()));

        let mut remote = MockRemoteCart::new();
        remote
            .expect_fetch_cart()
            .withf(|token| token == "fixture-token")
            .times(1)
            .returning(|_| Ok(Some(vec![PersistedCartEntry::new("case", 2)])));
        remote.expect_merge_cart().never();

        let context = CartContext {
            catalog: Arc::new(catalog),
            remote: Arc::new(remote),
            ..fixture.context()
        };
        let mut engine = CartEngine::new(context, fixture.promotion());
        engine.load().await;
        engine.flush().await;

        assert_eq!(engine.entries(), vec![PersistedCartEntry::new("case", 2)]);
        assert_eq!(fixture.cart_store().load()?, Vec::new(), "adoption is not persisted");

        Ok(())
    }

    #[tokio::test(start_paused = true)]
    async fn rejected_add_does_not_start_cooldown() -> TestResult {
        let fixture = Fixture::new();
        let mut engine = fixture.loaded_engine().await;
        let case = fixture.product("case")?;

        assert_eq!(engine.add(case, 0), AddOutcome::Rejected);
        assert_eq!(
            engine.add(&Product::new("", "Nameless", Money::from_major(1, INR)), 1),
            AddOutcome::Rejected
        );
        assert_eq!(engine.add(case, 1), AddOutcome::Added);
        assert_eq!(engine.add(case, 1), AddOutcome::CoolingDown);

        Ok(())
    }

    #[tokio::test]
    async fn add_by_id_resolves_from_catalog() -> TestResult {
        let fixture = Fixture::new();
        let mut engine = fixture.loaded_engine().await;

        assert_eq!(
            engine.add_by_id(&ProductId::new("missing"), 1),
            AddOutcome::Rejected
        );
        assert_eq!(engine.add_by_id(&ProductId::new("charger"), 2), AddOutcome::Added);
        assert_eq!(engine.total_quantity(), 2);
        assert_eq!(
            engine.product(&ProductId::new("charger")).map(|product| product.name.as_str()),
            Some("65W Fast Charger")
        );

        engine.flush().await;

        Ok(())
    }

    #[tokio::test]
    async fn checkout_requires_items_then_login() -> TestResult {
        let fixture = Fixture::new().with_session(FixtureSession::signed_out());

        let mut engine = fixture.loaded_engine().await;

        assert_eq!(engine.checkout(), CheckoutDecision::EmptyCart);
        assert_eq!(
            fixture.notifier.notices(),
            vec![("Cart is empty".to_string(), NoticeKind::Info)]
        );

        fixture
            .cart_store()
            .save(&[PersistedCartEntry::new("case", 1)])?;
        engine.load().await;

        assert_eq!(engine.checkout(), CheckoutDecision::LoginRequired);

        fixture.session.sign_in("token");

        assert_eq!(engine.checkout(), CheckoutDecision::Proceed);
        assert_eq!(engine.lines().len(), 1, "checkout leaves the cart untouched");

        engine.shutdown().await;

        Ok(())
    }
}

//! The shopping session.
//!
//! [`Storefront`] owns the catalog, cart, coupon and shipping state behind a
//! single lock and publishes a [`CartSummary`] on a watch channel after
//! every change. Cart and shipping edits schedule debounced background
//! jobs (coupon revalidation and shipping quotes); the latest schedule
//! wins. State that survives restarts (cart, coupon, shipping, menu cache,
//! customer profile) is written to a [`LocalStore`].

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;

use chrono::{NaiveDateTime, NaiveTime};
use storefront_core::cart::QtyUpdate;
use storefront_core::coupon::CouponRejection;
use storefront_core::notice::TracingNotifier;
use storefront_core::product::{ProductSheet, Selection};
use storefront_core::shipping::{GateBlock, LatLng, QuoteOutcome, ShippingMode};
use storefront_core::store::SavedCheckout;
use storefront_core::{
    AddOutcome, Cart, CartLine, CartSummary, Catalog, Coupon, ItemId, LocalStore, Notice, Notifier,
    ShippingState, StorefrontConfig,
};
use tokio::sync::{Mutex, MutexGuard, watch};

use crate::api::{GeoPlace, ShipApi, StoreApi, routes};
use crate::checkout::{CustomerDetails, OrderContext, order_failure_message, order_payload, payment_url};
use crate::client::BackendClient;
use crate::clock::{Clock, SystemClock};
use crate::debounce::Debouncer;
use crate::envelope::{NETWORK_TIMEOUT, NO_BASE_CONFIG};
use crate::error::{Error, Result};
use crate::routing::{OsrmRouteProvider, RouteProvider};
use crate::transport::{ReqwestTransport, Transport};

/// Notice when a coupon no longer meets its minimum.
pub const COUPON_BELOW_MINIMUM: &str = "Diskon dibatalkan: subtotal di bawah minimum";

/// Notice when the promo backend cannot be reached.
pub const PROMO_UNREACHABLE: &str = "Gagal menghubungi server promo";

/// Notice when reload trimmed the cart.
pub const CART_ADJUSTED: &str = "Keranjang disesuaikan dengan stok yang tersedia";

/// Mutable session state.
#[derive(Debug, Clone, Default)]
pub struct ShopState {
    /// Loaded categories and menu
    pub catalog: Catalog,
    /// Cart lines
    pub cart: Cart,
    /// Applied coupon
    pub coupon: Option<Coupon>,
    /// Delivery or pickup details
    pub shipping: ShippingState,
}

impl ShopState {
    /// Summary published to observers.
    pub fn summary(&self) -> CartSummary {
        CartSummary::new(&self.cart, self.coupon.as_ref(), self.shipping.effective_fee())
    }

    /// Clears a coupon whose minimum exceeds the subtotal. Returns `true`
    /// if it did.
    fn drop_coupon_below_minimum(&mut self) -> bool {
        let subtotal = self.cart.subtotal();
        if self.coupon.as_ref().is_some_and(|c| !c.meets_minimum(subtotal)) {
            self.coupon = None;
            return true;
        }
        false
    }
}

/// Where the menu came from on reload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuSource {
    /// Fresh local cache
    Cache,
    /// The backend
    Network,
}

/// Result of a checkout attempt that did not fail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckoutOutcome {
    /// The order was created; send the customer to the payment page
    Redirect {
        /// Payment page URL
        payment_url: String,
    },
    /// Another checkout is already in flight
    Busy,
}

fn rejection_notice(rejection: &CouponRejection) -> String {
    match rejection {
        CouponRejection::Invalid(Some(code)) if code == NETWORK_TIMEOUT || code == NO_BASE_CONFIG => {
            PROMO_UNREACHABLE.to_string()
        }
        other => other.message(),
    }
}

struct Inner {
    config: StorefrontConfig,
    api: StoreApi,
    ship: ShipApi,
    routes: Option<Arc<dyn RouteProvider>>,
    store: LocalStore,
    notifier: Arc<dyn Notifier>,
    clock: Arc<dyn Clock>,
    state: Mutex<ShopState>,
    summary: watch::Sender<CartSummary>,
    revalidation: Debouncer,
    quoting: Debouncer,
    checkout_busy: AtomicBool,
}

/// Resets the checkout flag when dropped.
struct CheckoutGuard<'a>(&'a AtomicBool);

impl<'a> CheckoutGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self(flag))
    }
}

impl Drop for CheckoutGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Builder for [`Storefront`].
pub struct StorefrontBuilder {
    config: StorefrontConfig,
    transport: Option<Arc<dyn Transport>>,
    routes: Option<Arc<dyn RouteProvider>>,
    routes_disabled: bool,
    store: Option<LocalStore>,
    notifier: Option<Arc<dyn Notifier>>,
    clock: Option<Arc<dyn Clock>>,
}

impl StorefrontBuilder {
    fn new(config: StorefrontConfig) -> Self {
        Self {
            config,
            transport: None,
            routes: None,
            routes_disabled: false,
            store: None,
            notifier: None,
            clock: None,
        }
    }

    /// Uses `transport` for every backend call. Defaults to reqwest.
    pub fn transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Uses a custom route provider.
    pub fn route_provider(mut self, routes: Arc<dyn RouteProvider>) -> Self {
        self.routes = Some(routes);
        self.routes_disabled = false;
        self
    }

    /// Quotes without route lookups.
    pub fn without_routes(mut self) -> Self {
        self.routes = None;
        self.routes_disabled = true;
        self
    }

    /// Persists into `store`. Defaults to the configured data directory.
    pub fn store(mut self, store: LocalStore) -> Self {
        self.store = Some(store);
        self
    }

    /// Delivers notices to `notifier`. Defaults to tracing.
    pub fn notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = Some(notifier);
        self
    }

    /// Reads time from `clock`. Defaults to the system clock.
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Builds the session and restores persisted cart and checkout state.
    pub fn build(self) -> Result<Storefront> {
        let config = self.config;
        let transport: Arc<dyn Transport> = match self.transport {
            Some(t) => t,
            None => Arc::new(ReqwestTransport::new()?),
        };

        let api = StoreApi::new(
            BackendClient::new(transport.clone(), &config.base, config.http.clone())
                .with_admin_token(config.admin_token.clone()),
        );
        let ship = ShipApi::new(
            BackendClient::new(transport.clone(), &config.ship_base, config.http.clone()),
            config.store_location(),
            config.shipping.geocode_radius_km,
        );
        let routes = match (self.routes, self.routes_disabled) {
            (Some(r), _) => Some(r),
            (None, true) => None,
            (None, false) if config.shipping.route_base.trim().is_empty() => None,
            (None, false) => Some(Arc::new(OsrmRouteProvider::new(
                transport,
                config.shipping.route_base.clone(),
                config.http.timeout_ms,
            )) as Arc<dyn RouteProvider>),
        };

        let store = match self.store {
            Some(s) => s,
            None => LocalStore::open(config.data_dir_path())?,
        };
        let saved = store.load_checkout();
        let state = ShopState {
            catalog: Catalog::new(config.special_categories()),
            cart: store.load_cart(),
            coupon: saved.coupon,
            shipping: saved.shipping,
        };
        let (summary, _) = watch::channel(state.summary());

        tracing::debug!(
            bases = api.client().bases().len(),
            ship_bases = ship.client().bases().len(),
            lines = state.cart.len(),
            "Storefront session ready"
        );

        Ok(Storefront {
            inner: Arc::new(Inner {
                config,
                api,
                ship,
                routes,
                store,
                notifier: self.notifier.unwrap_or_else(|| Arc::new(TracingNotifier)),
                clock: self.clock.unwrap_or_else(|| Arc::new(SystemClock)),
                state: Mutex::new(state),
                summary,
                revalidation: Debouncer::new("coupon-revalidation"),
                quoting: Debouncer::new("shipping-quote"),
                checkout_busy: AtomicBool::new(false),
            }),
        })
    }
}

/// A shopping session. Cheap to clone; clones share state.
#[derive(Clone)]
pub struct Storefront {
    inner: Arc<Inner>,
}

impl std::fmt::Debug for Storefront {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Storefront")
            .field("store", &self.inner.store.dir())
            .field("summary", &*self.inner.summary.borrow())
            .finish_non_exhaustive()
    }
}

impl Storefront {
    /// Starts building a session.
    pub fn builder(config: StorefrontConfig) -> StorefrontBuilder {
        StorefrontBuilder::new(config)
    }

    fn from_weak(weak: &Weak<Inner>) -> Option<Self> {
        weak.upgrade().map(|inner| Self { inner })
    }

    /// Effective configuration.
    pub fn config(&self) -> &StorefrontConfig {
        &self.inner.config
    }

    /// Order backend API.
    pub fn api(&self) -> &StoreApi {
        &self.inner.api
    }

    /// Shipping worker API.
    pub fn ship_api(&self) -> &ShipApi {
        &self.inner.ship
    }

    /// Local persistence.
    pub fn store(&self) -> &LocalStore {
        &self.inner.store
    }

    /// Notice sink.
    pub fn notifier(&self) -> &Arc<dyn Notifier> {
        &self.inner.notifier
    }

    /// Current local time.
    pub fn now(&self) -> NaiveDateTime {
        self.inner.clock.now_local()
    }

    /// Receives a summary after every state change.
    pub fn subscribe(&self) -> watch::Receiver<CartSummary> {
        self.inner.summary.subscribe()
    }

    /// Latest published summary.
    pub fn summary(&self) -> CartSummary {
        self.inner.summary.borrow().clone()
    }

    /// Copy of the current state.
    pub async fn snapshot(&self) -> ShopState {
        self.inner.state.lock().await.clone()
    }

    async fn lock(&self) -> MutexGuard<'_, ShopState> {
        self.inner.state.lock().await
    }

    fn notify(&self, notice: Notice) {
        self.inner.notifier.notify(notice);
    }

    /// Persists cart and checkout state and publishes a summary.
    fn commit(&self, state: &ShopState) {
        self.inner.store.save_cart(&state.cart);
        self.inner.store.save_checkout(&SavedCheckout {
            coupon: state.coupon.clone(),
            shipping: state.shipping.clone(),
        });
        self.inner.summary.send_replace(state.summary());
    }

    fn enforce_coupon_minimum(&self, state: &mut ShopState) -> bool {
        let dropped = state.drop_coupon_below_minimum();
        if dropped {
            self.notify(Notice::warn(COUPON_BELOW_MINIMUM));
        }
        dropped
    }

    fn after_cart_change(&self, state: &mut ShopState) {
        self.enforce_coupon_minimum(state);
        self.commit(state);
        if state.coupon.is_some() {
            self.schedule_revalidation();
        }
    }

    // ------------------------------------------------------------------
    // Catalog
    // ------------------------------------------------------------------

    /// Loads categories and menu, then trims the cart to available stock.
    ///
    /// Unless `force` is set, a menu cache younger than the configured TTL
    /// is used instead of the network. Category failures leave the category
    /// list empty; a menu failure is an error and leaves the cart alone.
    pub async fn reload(&self, force: bool) -> Result<MenuSource> {
        let categories = match self.inner.api.categories().await {
            Ok(rows) => rows,
            Err(e) => {
                tracing::warn!(error = %e, "Category list unavailable");
                Vec::new()
            }
        };

        let now_ms = self.inner.clock.now_ms();
        let cached = if force {
            None
        } else {
            self.inner
                .store
                .fresh_menu(now_ms, self.inner.config.menu_cache_ttl_ms())
        };
        let (rows, source) = match cached {
            Some(rows) => (rows, MenuSource::Cache),
            None => match self.inner.api.menu().await {
                Ok(rows) => {
                    self.inner.store.save_menu(rows.clone(), now_ms);
                    (rows, MenuSource::Network)
                }
                Err(e) => {
                    self.notify(Notice::error(format!("Gagal memuat menu: {}", e.user_message())));
                    return Err(e);
                }
            },
        };

        let mut state = self.lock().await;
        state.catalog.load_categories(&categories);
        state.catalog.load_items(&rows);
        let ShopState { catalog, cart, .. } = &mut *state;
        let trimmed = cart.validate_against_stock(|id| catalog.stock_of(id));
        tracing::info!(
            items = state.catalog.items_admin().len(),
            categories = state.catalog.categories().len(),
            ?source,
            "Catalog loaded"
        );
        if trimmed {
            self.notify(Notice::warn(CART_ADJUSTED));
            self.after_cart_change(&mut state);
        } else {
            self.inner.summary.send_replace(state.summary());
        }
        Ok(source)
    }

    // ------------------------------------------------------------------
    // Cart
    // ------------------------------------------------------------------

    /// Adds an item with the chosen option, add-ons and quantity.
    pub async fn add_to_cart(&self, id: &ItemId, selection: &Selection) -> Result<AddOutcome> {
        let mut state = self.lock().await;
        let item = state.catalog.require(id)?;
        let line = ProductSheet::from_item(item).resolve(selection)?;
        let stock = state.catalog.stock_of(id);

        let outcome = state.cart.add(line, stock);
        let message = outcome.message();
        match outcome {
            AddOutcome::Added { .. } => self.notify(Notice::info(message)),
            _ => self.notify(Notice::warn(message)),
        }
        if outcome.is_added() {
            self.after_cart_change(&mut state);
        }
        Ok(outcome)
    }

    /// Sets the quantity of line `index`, clamped to stock. A quantity of
    /// zero or less removes the line and reports `qty: 0`.
    pub async fn set_qty(&self, index: usize, qty: i64) -> Result<QtyUpdate> {
        let mut state = self.lock().await;
        if qty <= 0 {
            state.cart.remove_at(index)?;
            self.after_cart_change(&mut state);
            return Ok(QtyUpdate {
                qty: 0,
                changed: true,
                exceeded_stock: false,
            });
        }
        let stock = state
            .cart
            .lines()
            .get(index)
            .map(|l| state.catalog.stock_of(&l.id))
            .unwrap_or(0);
        let update = state.cart.set_qty_at(index, qty, stock)?;
        if update.exceeded_stock {
            self.notify(Notice::warn("Melebihi stok tersedia"));
        }
        if update.changed {
            self.after_cart_change(&mut state);
        }
        Ok(update)
    }

    /// Removes line `index`.
    pub async fn remove_line(&self, index: usize) -> Result<CartLine> {
        let mut state = self.lock().await;
        let line = state.cart.remove_at(index)?;
        self.after_cart_change(&mut state);
        Ok(line)
    }

    /// Empties the cart.
    pub async fn clear_cart(&self) {
        let mut state = self.lock().await;
        state.cart.clear();
        self.after_cart_change(&mut state);
    }

    // ------------------------------------------------------------------
    // Coupon
    // ------------------------------------------------------------------

    /// Validates `code` against the current cart and applies it.
    pub async fn apply_coupon(&self, code: &str) -> std::result::Result<Coupon, CouponRejection> {
        let code = code.trim().to_string();
        if code.is_empty() {
            let rejection = CouponRejection::EmptyCode;
            self.notify(Notice::warn(rejection.message()));
            return Err(rejection);
        }

        let cart = self.lock().await.cart.clone();
        let response = self.inner.api.promo_validate(&code, &cart).await;
        let verdict = Coupon::from_validation(&code, &response);

        let mut state = self.lock().await;
        let subtotal = state.cart.subtotal();
        let mut fallback = false;
        let result = match verdict {
            Ok(coupon) if coupon.meets_minimum(subtotal) => Ok(coupon),
            Ok(coupon) => Err(CouponRejection::BelowMinimum {
                min_subtotal: coupon.min_subtotal,
            }),
            Err(CouponRejection::Invalid(error)) if self.inner.config.promo_local_fallback => {
                match Coupon::local_fallback(&code) {
                    Some(coupon) => {
                        fallback = true;
                        Ok(coupon)
                    }
                    None => Err(CouponRejection::Invalid(error)),
                }
            }
            Err(rejection) => Err(rejection),
        };

        match result {
            Ok(coupon) => {
                tracing::info!(code = %coupon.code, fallback, "Coupon applied");
                state.coupon = Some(coupon.clone());
                self.notify(Notice::info(if fallback {
                    "Kode promo diterapkan (fallback)"
                } else {
                    "Kode promo diterapkan"
                }));
                self.commit(&state);
                Ok(coupon)
            }
            Err(rejection) => {
                tracing::debug!(code = %code, reason = %rejection, "Coupon rejected");
                state.coupon = None;
                self.notify(Notice::warn(rejection_notice(&rejection)));
                self.commit(&state);
                Err(rejection)
            }
        }
    }

    /// Removes the coupon. Returns `false` when none was applied.
    pub async fn clear_coupon(&self) -> bool {
        let mut state = self.lock().await;
        if state.coupon.take().is_none() {
            return false;
        }
        self.inner.revalidation.cancel();
        self.notify(Notice::info("Kode promo dihapus"));
        self.commit(&state);
        true
    }

    /// Re-checks the applied coupon against the current cart. Returns
    /// whether a coupon is still applied.
    pub async fn revalidate_coupon(&self) -> bool {
        let (code, cart) = {
            let state = self.lock().await;
            match &state.coupon {
                Some(c) => (c.code.clone(), state.cart.clone()),
                None => return false,
            }
        };

        let response = self.inner.api.promo_validate(&code, &cart).await;
        let verdict = Coupon::from_validation(&code, &response);

        let mut state = self.lock().await;
        if state.coupon.as_ref().map(|c| c.code.as_str()) != Some(code.as_str()) {
            tracing::debug!(code = %code, "Coupon changed during revalidation");
            return state.coupon.is_some();
        }
        let subtotal = state.cart.subtotal();
        let kept = match verdict {
            Ok(coupon) if coupon.meets_minimum(subtotal) => {
                state.coupon = Some(coupon);
                true
            }
            Ok(_) => {
                state.coupon = None;
                self.notify(Notice::warn(COUPON_BELOW_MINIMUM));
                false
            }
            Err(CouponRejection::Invalid(_))
                if self.inner.config.promo_local_fallback && Coupon::local_fallback(&code).is_some() =>
            {
                true
            }
            Err(rejection) => {
                tracing::info!(code = %code, reason = %rejection, "Coupon no longer valid");
                state.coupon = None;
                self.notify(Notice::warn(rejection_notice(&rejection)));
                false
            }
        };
        self.commit(&state);
        kept
    }

    /// Schedules [`Self::revalidate_coupon`] after the configured quiet
    /// period, replacing any pending revalidation.
    pub fn schedule_revalidation(&self) {
        let weak = Arc::downgrade(&self.inner);
        let delay = Duration::from_millis(self.inner.config.revalidate_debounce_ms);
        self.inner.revalidation.schedule(delay, async move {
            if let Some(shop) = Storefront::from_weak(&weak) {
                shop.revalidate_coupon().await;
            }
        });
    }

    // ------------------------------------------------------------------
    // Shipping
    // ------------------------------------------------------------------

    /// Switches between delivery and pickup.
    pub async fn set_shipping_mode(&self, mode: ShippingMode) {
        let mut state = self.lock().await;
        state.shipping.set_mode(mode);
        self.commit(&state);
        if mode == ShippingMode::Delivery && state.shipping.dest.is_some() && state.shipping.quote.is_none() {
            self.schedule_quote(self.quote_delay());
        }
    }

    /// Sets the delivery destination and quotes right away. Without an
    /// address the worker's reverse geocoder names the point, falling back
    /// to its coordinates.
    pub async fn set_destination(&self, dest: LatLng, address: Option<&str>) -> Result<()> {
        if !dest.lat.is_finite() || !dest.lng.is_finite() || dest.lat.abs() > 90.0 || dest.lng.abs() > 180.0 {
            return Err(storefront_core::Error::validation_field("dest", "Koordinat tidak valid").into());
        }
        let label = match address.map(str::trim).filter(|a| !a.is_empty()) {
            Some(a) => a.to_string(),
            None => match self.inner.ship.reverse(dest).await {
                Ok(label) => label.unwrap_or_default(),
                Err(e) => {
                    tracing::debug!(error = %e, "Reverse geocoding failed");
                    String::new()
                }
            },
        };

        let mut state = self.lock().await;
        state.shipping.set_destination(dest, label);
        self.commit(&state);
        drop(state);
        self.schedule_quote(Duration::ZERO);
        Ok(())
    }

    /// Sets the parcel weight; a change re-quotes after the quiet period.
    pub async fn set_weight(&self, kg: f64) -> bool {
        let mut state = self.lock().await;
        let changed = state.shipping.set_weight(kg);
        if changed {
            self.commit(&state);
            if state.shipping.dest.is_some() {
                self.schedule_quote(self.quote_delay());
            }
        }
        changed
    }

    /// Sets the pickup time; `None` means the earliest allowed.
    pub async fn set_pickup_time(&self, time: Option<NaiveTime>) {
        let mut state = self.lock().await;
        state.shipping.set_pickup_time(time);
        self.commit(&state);
    }

    /// Address search near the store.
    pub async fn search_address(&self, query: &str) -> Result<Vec<GeoPlace>> {
        self.inner.ship.geocode(query).await
    }

    fn quote_delay(&self) -> Duration {
        Duration::from_millis(self.inner.config.shipping.quote_debounce_ms)
    }

    /// Schedules [`Self::refresh_quote`] after `delay`, replacing any
    /// pending quote.
    pub fn schedule_quote(&self, delay: Duration) {
        let weak = Arc::downgrade(&self.inner);
        self.inner.quoting.schedule(delay, async move {
            if let Some(shop) = Storefront::from_weak(&weak)
                && let Err(e) = shop.refresh_quote().await
            {
                tracing::warn!(error = %e, "Shipping quote failed");
            }
        });
    }

    /// Fetches the route if missing, then a quote for the current
    /// destination and weight. Returns `None` when the destination or
    /// weight changed while the quote was in flight.
    pub async fn refresh_quote(&self) -> Result<Option<QuoteOutcome>> {
        let origin = self.inner.ship.origin();
        let (dest, needs_route) = {
            let state = self.lock().await;
            let dest = state
                .shipping
                .dest
                .ok_or_else(|| storefront_core::Error::validation_field("dest", GateBlock::NoDestination.message()))?;
            (dest, state.shipping.route.is_none())
        };

        if needs_route && let Some(routes) = &self.inner.routes {
            match routes.route(origin, dest).await {
                Ok(route) => {
                    let mut state = self.lock().await;
                    if state.shipping.dest.is_some_and(|d| d.same_point(&dest)) {
                        state.shipping.set_route(route);
                    }
                }
                Err(e) => tracing::debug!(error = %e, "Route lookup failed, quoting without distance"),
            }
        }

        let now = self.inner.clock.now_local().time();
        let request = self
            .lock()
            .await
            .shipping
            .quote_request(origin, now)
            .ok_or_else(|| storefront_core::Error::validation_field("dest", GateBlock::NoDestination.message()))?;

        let quote = self.inner.ship.quote(&request).await?;

        let mut state = self.lock().await;
        let current = state.shipping.dest.is_some_and(|d| d.same_point(&request.dest))
            && (state.shipping.weight_kg - request.weight_kg).abs() < f64::EPSILON;
        if !current {
            tracing::debug!("Destination changed while quoting, result dropped");
            return Ok(None);
        }
        let outcome = state.shipping.apply_quote(quote);
        match &outcome {
            QuoteOutcome::Undeliverable { reason } => self.notify(Notice::warn(reason.clone())),
            QuoteOutcome::Priced { fee } => tracing::info!(fee, "Shipping quoted"),
        }
        self.commit(&state);
        Ok(Some(outcome))
    }

    /// Whether shipping currently allows checkout.
    pub async fn checkout_gate(&self) -> std::result::Result<(), GateBlock> {
        let now = self.inner.clock.now_local();
        self.lock()
            .await
            .shipping
            .checkout_gate(now, self.inner.config.shipping.pickup_lead_minutes)
    }

    /// Runs pending debounced jobs now instead of waiting for them.
    pub async fn flush_pending(&self) {
        if self.inner.quoting.is_pending() {
            self.inner.quoting.cancel();
            if let Err(e) = self.refresh_quote().await {
                tracing::warn!(error = %e, "Shipping quote failed");
            }
        }
        if self.inner.revalidation.is_pending() {
            self.inner.revalidation.cancel();
            self.revalidate_coupon().await;
        }
    }

    // ------------------------------------------------------------------
    // Checkout
    // ------------------------------------------------------------------

    /// Saved customer details for prefilling the form.
    pub fn saved_customer(&self) -> Option<CustomerDetails> {
        self.inner
            .store
            .load_customer()
            .map(|p| CustomerDetails::from_profile(&p))
    }

    /// Submits the order and returns the payment URL.
    ///
    /// Failures are reported as notices and returned as errors. A call made
    /// while another checkout is in flight returns [`CheckoutOutcome::Busy`].
    pub async fn checkout(&self, customer: &CustomerDetails) -> Result<CheckoutOutcome> {
        if self.lock().await.cart.is_empty() {
            self.notify(Notice::warn("Keranjang kosong"));
            return Err(storefront_core::Error::validation("Keranjang kosong").into());
        }
        let Some(_guard) = CheckoutGuard::acquire(&self.inner.checkout_busy) else {
            tracing::debug!("Checkout already in flight");
            return Ok(CheckoutOutcome::Busy);
        };
        if let Err(e) = customer.validate() {
            self.notify(Notice::warn(e.user_message()));
            return Err(e.into());
        }

        let now = self.inner.clock.now_local();
        let lead = self.inner.config.shipping.pickup_lead_minutes;
        let payload = {
            let mut state = self.lock().await;
            if let Err(block) = state.shipping.checkout_gate(now, lead) {
                self.notify(Notice::warn(block.message()));
                return Err(storefront_core::Error::validation_field("shipping", block.message()).into());
            }
            if self.enforce_coupon_minimum(&mut state) {
                self.commit(&state);
            }
            order_payload(
                customer,
                &OrderContext {
                    cart: &state.cart,
                    coupon: state.coupon.as_ref(),
                    shipping: &state.shipping,
                    now,
                    pickup_lead_minutes: lead,
                    finish_redirect_url: &self.inner.config.finish_redirect_url,
                },
            )
        };

        tracing::info!(
            mode = %payload["shipping_mode"],
            grand_total = %payload["grand_total"],
            "Submitting order"
        );
        let response = self.inner.api.create_order(payload).await;

        match payment_url(&response) {
            Some(url) => {
                if let Err(e) = self.inner.store.save_customer(&customer.to_profile()) {
                    tracing::warn!(error = %e, "Failed to save customer profile");
                }
                tracing::info!("Order created");
                Ok(CheckoutOutcome::Redirect { payment_url: url })
            }
            None => {
                let message = order_failure_message(&response);
                self.notify(Notice::error(message.clone()));
                Err(Error::api(routes::CREATE_ORDER, message))
            }
        }
    }
}

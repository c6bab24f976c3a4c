//! Command execution.
//!
//! Each invocation restores the session from the local store, runs one
//! command, settles any debounced work (quote, coupon re-check) and prints
//! the notices the session raised.

use std::io::Write;
use std::sync::Arc;

use chrono::NaiveTime;
use serde_json::{Value, json};
use storefront_client::{
    AdminPanel, CheckoutOutcome, CustomerDetails, ImageUpload, MenuForm, Storefront,
};
use storefront_core::catalog::{MenuSort, SortKey};
use storefront_core::images::drive_url_candidates;
use storefront_core::notice::CollectingNotifier;
use storefront_core::product::{AddonPick, ProductSheet, Selection};
use storefront_core::push::{PushAction, PushPolicy};
use storefront_core::shipping::{LatLng, ShippingMode};
use storefront_core::traits::ConfigManager;
use storefront_core::{CouponKind, ItemId, PromoRecord, StorefrontConfig};

use crate::cli::{
    AdminAction, AdminArgs, AdminMenuAction, AdminPromoAction, CartAction, CategoryAction, CheckoutArgs,
    Cli, Command, MenuArgs, MenuSaveArgs, ModeArg, PromoAction, PromoSaveArgs, ShipAction,
};
use crate::config_handlers::handle_config_command;
use crate::error::{Error, Result};
use crate::output;

/// Runs a parsed command line. Notices go to `err`, results to `out`.
pub async fn run(cli: Cli, out: &mut dyn Write, err: &mut dyn Write) -> Result<()> {
    match cli.command {
        Command::Config { action } => handle_config_command(cli.config.as_deref(), action, out),
        Command::Push { payload, visible } => push(payload.as_deref(), visible, cli.json, out),
        command => {
            let config = StorefrontConfig::load(cli.config.as_deref())?;
            let app = App::new(config, cli.json)?;
            app.execute(command, out, err).await
        }
    }
}

/// A session plus the notices it raised.
#[derive(Debug)]
pub struct App {
    shop: Storefront,
    notices: Arc<CollectingNotifier>,
    json: bool,
}

impl App {
    /// Builds a session over the network with a collecting notifier.
    pub fn new(config: StorefrontConfig, json: bool) -> Result<Self> {
        let notices = Arc::new(CollectingNotifier::new());
        let shop = Storefront::builder(config)
            .notifier(notices.clone())
            .build()?;
        Ok(Self { shop, notices, json })
    }

    /// Wraps an existing session; `notices` must be its notifier.
    pub fn with_session(shop: Storefront, notices: Arc<CollectingNotifier>, json: bool) -> Self {
        Self { shop, notices, json }
    }

    /// The session.
    pub fn shop(&self) -> &Storefront {
        &self.shop
    }

    /// Runs one command, then settles pending work and prints notices.
    pub async fn execute(&self, command: Command, out: &mut dyn Write, err: &mut dyn Write) -> Result<()> {
        let result = self.dispatch(command, out).await;
        self.shop.flush_pending().await;
        for notice in self.notices.take() {
            writeln!(err, "{}", output::notice(&notice))?;
        }
        result
    }

    async fn dispatch(&self, command: Command, out: &mut dyn Write) -> Result<()> {
        match command {
            Command::Menu(args) => self.menu(args, out).await,
            Command::Show {
                id,
                option,
                addons,
                qty,
            } => self.show(&id, selection(option, &addons, qty)?, out).await,
            Command::Cart { action } => self.cart(action, out).await,
            Command::Promo { action } => self.promo(action, out).await,
            Command::Ship { action } => self.ship(action, out).await,
            Command::Checkout(args) => self.checkout(args, out).await,
            Command::Admin(args) => self.admin(args, out).await,
            Command::Config { .. } | Command::Push { .. } => {
                Err(Error::usage("command does not use a session"))
            }
        }
    }

    fn print_json(&self, out: &mut dyn Write, value: &Value) -> Result<()> {
        let text = serde_json::to_string_pretty(value).map_err(storefront_core::Error::from)?;
        writeln!(out, "{text}")?;
        Ok(())
    }

    // ------------------------------------------------------------------
    // Catalog
    // ------------------------------------------------------------------

    async fn menu(&self, args: MenuArgs, out: &mut dyn Write) -> Result<()> {
        self.shop.reload(args.refresh).await?;
        let state = self.shop.snapshot().await;
        let category = args.category.as_deref();
        if self.json {
            let rows = |items: Vec<&storefront_core::MenuItem>| -> Vec<Value> {
                items.into_iter().map(|m| m.to_value()).collect()
            };
            return self.print_json(
                out,
                &json!({
                    "best": rows(state.catalog.best(category)),
                    "strip": rows(state.catalog.strip(category)),
                    "menu": rows(state.catalog.regular(category, &args.search)),
                }),
            );
        }
        write!(out, "{}", output::menu(&state.catalog, category, &args.search))?;
        Ok(())
    }

    async fn show(&self, id: &str, selection: Selection, out: &mut dyn Write) -> Result<()> {
        self.shop.reload(false).await?;
        let state = self.shop.snapshot().await;
        let item = state.catalog.require(&ItemId::new(id))?;
        let sheet = ProductSheet::from_item(item);
        let preview = sheet.preview(&selection)?;
        let image = drive_url_candidates(&item.image_url, &self.shop.config().image_proxy())
            .into_iter()
            .next()
            .filter(|_| !item.image_url.trim().is_empty());

        if self.json {
            return self.print_json(
                out,
                &json!({
                    "item": item.to_value(),
                    "per_unit": preview.per_unit,
                    "total": preview.total,
                    "image": image,
                }),
            );
        }
        write!(out, "{}", output::product(&sheet, &preview, selection.qty, image.as_deref()))?;
        Ok(())
    }

    // ------------------------------------------------------------------
    // Cart and promo
    // ------------------------------------------------------------------

    async fn cart(&self, action: Option<CartAction>, out: &mut dyn Write) -> Result<()> {
        if let Some(action) = action {
            self.shop.reload(false).await?;
            match action {
                CartAction::Add {
                    id,
                    option,
                    addons,
                    qty,
                } => {
                    let selection = selection(option, &addons, qty)?;
                    self.shop.add_to_cart(&ItemId::new(id), &selection).await?;
                }
                CartAction::Set { line, qty } => {
                    self.shop.set_qty(line_index(line)?, qty).await?;
                }
                CartAction::Remove { line } => {
                    self.shop.remove_line(line_index(line)?).await?;
                }
                CartAction::Clear => self.shop.clear_cart().await,
            }
            self.shop.flush_pending().await;
        }
        self.print_cart(out).await
    }

    async fn print_cart(&self, out: &mut dyn Write) -> Result<()> {
        let state = self.shop.snapshot().await;
        let summary = state.summary();
        if self.json {
            return self.print_json(out, &json!({"lines": state.cart.lines(), "summary": summary}));
        }
        write!(out, "{}", output::cart(&state.cart, &summary))?;
        Ok(())
    }

    async fn promo(&self, action: PromoAction, out: &mut dyn Write) -> Result<()> {
        match action {
            PromoAction::Apply { code } => {
                // A rejection is already a notice; the totals show the outcome.
                let _ = self.shop.apply_coupon(&code).await;
            }
            PromoAction::Check => {
                self.shop.revalidate_coupon().await;
            }
            PromoAction::Clear => {
                self.shop.clear_coupon().await;
            }
        }
        self.print_cart(out).await
    }

    // ------------------------------------------------------------------
    // Shipping
    // ------------------------------------------------------------------

    async fn ship(&self, action: Option<ShipAction>, out: &mut dyn Write) -> Result<()> {
        match action {
            None => {}
            Some(ShipAction::Mode { mode }) => {
                let mode = match mode {
                    ModeArg::Delivery => ShippingMode::Delivery,
                    ModeArg::Pickup => ShippingMode::Pickup,
                };
                self.shop.set_shipping_mode(mode).await;
            }
            Some(ShipAction::Dest { lat, lng, address }) => {
                self.shop
                    .set_destination(LatLng::new(lat, lng), address.as_deref())
                    .await?;
            }
            Some(ShipAction::Search { query }) => {
                let places = self.shop.search_address(&query).await?;
                if self.json {
                    let rows: Vec<Value> = places
                        .iter()
                        .map(|p| json!({"label": p.label, "lat": p.point.lat, "lng": p.point.lng}))
                        .collect();
                    return self.print_json(out, &Value::Array(rows));
                }
                for place in &places {
                    writeln!(out, "{:.6},{:.6}  {}", place.point.lat, place.point.lng, place.label)?;
                }
                return Ok(());
            }
            Some(ShipAction::Weight { kg }) => {
                if !self.shop.set_weight(kg).await {
                    tracing::debug!(kg, "Weight unchanged");
                }
            }
            Some(ShipAction::PickupTime { time }) => {
                self.shop.set_pickup_time(parse_pickup_time(&time)?).await;
            }
            Some(ShipAction::Quote) => {
                self.shop.refresh_quote().await?;
            }
        }
        self.shop.flush_pending().await;
        self.print_shipping(out).await
    }

    async fn print_shipping(&self, out: &mut dyn Write) -> Result<()> {
        let gate = self.shop.checkout_gate().await;
        let state = self.shop.snapshot().await;
        if self.json {
            return self.print_json(
                out,
                &json!({
                    "shipping": state.shipping,
                    "ready": gate.is_ok(),
                    "blocked": gate.as_ref().err().map(|b| b.message()),
                }),
            );
        }
        write!(out, "{}", output::shipping(&state.shipping, &gate))?;
        Ok(())
    }

    // ------------------------------------------------------------------
    // Checkout
    // ------------------------------------------------------------------

    async fn checkout(&self, args: CheckoutArgs, out: &mut dyn Write) -> Result<()> {
        let saved = self.shop.saved_customer().unwrap_or_default();
        let address = match args.address {
            Some(a) => a,
            None => {
                let from_shipping = self.shop.snapshot().await.shipping.order_address();
                if from_shipping.is_empty() {
                    saved.address.clone()
                } else {
                    from_shipping
                }
            }
        };
        let customer = CustomerDetails::new(
            args.name.unwrap_or(saved.name),
            args.phone.unwrap_or(saved.phone),
            address,
        )
        .with_note(args.note);

        match self.shop.checkout(&customer).await? {
            CheckoutOutcome::Redirect { payment_url } => {
                if self.json {
                    return self.print_json(out, &json!({"payment_url": payment_url}));
                }
                writeln!(out, "Lanjutkan pembayaran: {payment_url}")?;
            }
            CheckoutOutcome::Busy => {
                writeln!(out, "Checkout sedang diproses")?;
            }
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Admin
    // ------------------------------------------------------------------

    async fn admin(&self, args: AdminArgs, out: &mut dyn Write) -> Result<()> {
        let panel = AdminPanel::new(self.shop.clone());
        if !panel.login(&args.pin) {
            return Err(storefront_client::Error::NotAuthorized.into());
        }
        self.shop.reload(true).await?;

        match args.action {
            AdminAction::Menu { action } => self.admin_menu(&panel, action, out).await,
            AdminAction::Category { action } => match action {
                CategoryAction::Save { id, name } => Ok(panel.save_category(id.as_deref(), &name).await?),
                CategoryAction::Delete { id } => Ok(panel.delete_category(&id).await?),
            },
            AdminAction::Stock { id, delta, note } => Ok(panel.adjust_stock(&ItemId::new(id), delta, &note).await?),
            AdminAction::Promo { action } => self.admin_promo(&panel, action, out).await,
        }
    }

    async fn admin_menu(&self, panel: &AdminPanel, action: AdminMenuAction, out: &mut dyn Write) -> Result<()> {
        match action {
            AdminMenuAction::List { filter, sort, desc } => {
                let sort = MenuSort {
                    key: sort.parse::<SortKey>()?,
                    descending: desc,
                };
                let items = panel.menu_table(&filter, sort).await;
                if self.json {
                    let rows: Vec<Value> = items.iter().map(|m| m.to_value()).collect();
                    return self.print_json(out, &Value::Array(rows));
                }
                write!(out, "{}", output::menu_table(&items))?;
                Ok(())
            }
            AdminMenuAction::Save(args) => Ok(panel.save_menu(menu_form(args).await?).await?),
            AdminMenuAction::Toggle { id } => {
                let active = panel.toggle_menu_active(&ItemId::new(id.as_str())).await?;
                writeln!(out, "{id}: {}", if active { "aktif" } else { "nonaktif" })?;
                Ok(())
            }
            AdminMenuAction::Delete { id } => Ok(panel.delete_menu(&ItemId::new(id)).await?),
        }
    }

    async fn admin_promo(&self, panel: &AdminPanel, action: AdminPromoAction, out: &mut dyn Write) -> Result<()> {
        match action {
            AdminPromoAction::List => {
                let records = panel.promos().await?;
                if self.json {
                    let rows = serde_json::to_value(&records).map_err(storefront_core::Error::from)?;
                    return self.print_json(out, &rows);
                }
                write!(out, "{}", output::promos(&records))?;
                Ok(())
            }
            AdminPromoAction::Save(args) => Ok(panel.save_promo(&promo_record(args)?).await?),
            AdminPromoAction::Toggle { code } => {
                let record = find_promo(panel, &code).await?;
                let active = panel.toggle_promo(&record).await?;
                writeln!(out, "{}: {}", record.code, if active { "aktif" } else { "nonaktif" })?;
                Ok(())
            }
            AdminPromoAction::Delete { code } => {
                let record = find_promo(panel, &code).await?;
                let id = record
                    .id
                    .ok_or_else(|| Error::usage(format!("promo {} has no id", record.code)))?;
                Ok(panel.delete_promo(&id).await?)
            }
        }
    }
}

// ----------------------------------------------------------------------
// Argument conversion
// ----------------------------------------------------------------------

fn selection(option: Option<String>, addons: &[String], qty: u32) -> Result<Selection> {
    let addons = addons
        .iter()
        .map(|raw| AddonPick::parse(raw))
        .collect::<storefront_core::Result<Vec<_>>>()?;
    Ok(Selection { option, addons, qty })
}

fn line_index(line: usize) -> Result<usize> {
    line.checked_sub(1)
        .ok_or_else(|| Error::usage("line numbers start at 1"))
}

fn parse_pickup_time(raw: &str) -> Result<Option<NaiveTime>> {
    let raw = raw.trim();
    if raw.eq_ignore_ascii_case("earliest") {
        return Ok(None);
    }
    NaiveTime::parse_from_str(raw, "%H:%M")
        .map(Some)
        .map_err(|_| Error::usage(format!("pickup time must be HH:MM, got '{raw}'")))
}

async fn menu_form(args: MenuSaveArgs) -> Result<MenuForm> {
    let image = match &args.image {
        Some(path) => Some(ImageUpload::from_path(path).await?),
        None => None,
    };
    Ok(MenuForm {
        id: args.id,
        name: args.name,
        category: args.category,
        price: args.price,
        stock: args.stock,
        active: !args.inactive,
        image_url: args.image_url,
        image,
    })
}

fn promo_record(args: PromoSaveArgs) -> Result<PromoRecord> {
    let kind: CouponKind = args.kind.parse()?;
    let mut record = PromoRecord::new(&args.code, kind, args.value);
    record.min_subtotal = args.min_subtotal;
    record.start = args.start.trim().to_string();
    record.end = args.end.trim().to_string();
    record.active = !args.inactive;
    record.note = args.note.trim().to_string();
    Ok(record)
}

async fn find_promo(panel: &AdminPanel, code: &str) -> Result<PromoRecord> {
    let wanted = code.trim().to_uppercase();
    panel
        .promos()
        .await?
        .into_iter()
        .find(|p| p.code == wanted)
        .ok_or_else(|| Error::usage(format!("promo {wanted} not found")))
}

// ----------------------------------------------------------------------
// Push
// ----------------------------------------------------------------------

/// Prints what the order monitor does with one push.
pub fn push(payload: Option<&str>, visible: bool, as_json: bool, out: &mut dyn Write) -> Result<()> {
    let payload: Option<Value> = payload
        .map(serde_json::from_str::<Value>)
        .transpose()
        .map_err(|e| Error::usage(format!("payload is not JSON: {e}")))?;
    let mut policy = PushPolicy::default();
    let action = policy.on_push(payload.as_ref(), visible, chrono::Utc::now().timestamp_millis());

    let value = match &action {
        PushAction::PingClients => json!({"action": "ping_clients"}),
        PushAction::Show(n) => json!({"action": "show", "notification": n}),
        PushAction::Throttled => json!({"action": "throttled"}),
    };
    if as_json {
        let text = serde_json::to_string_pretty(&value).map_err(storefront_core::Error::from)?;
        writeln!(out, "{text}")?;
        return Ok(());
    }
    match action {
        PushAction::PingClients => writeln!(out, "ping visible monitor windows")?,
        PushAction::Show(n) => writeln!(out, "show \"{}\": {} -> {} [{}]", n.title, n.body, n.url, n.tag)?,
        PushAction::Throttled => writeln!(out, "throttled")?,
    }
    Ok(())
}

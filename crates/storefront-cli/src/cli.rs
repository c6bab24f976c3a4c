//! Command-line arguments.

use clap::{Args, Parser, Subcommand, ValueEnum};

/// Storefront - order from the menu, quote delivery, check out, run the shop
#[derive(Parser, Debug)]
#[command(name = "storefront")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Configuration file path
    #[arg(short, long, global = true, env = "STOREFRONT_CONFIG")]
    pub config: Option<String>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Print JSON instead of text
    #[arg(long, global = true)]
    pub json: bool,

    /// Command to run
    #[command(subcommand)]
    pub command: Command,
}

/// Top-level commands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// List the menu
    Menu(MenuArgs),
    /// Show one item with its options and add-ons
    Show {
        /// Item id
        id: String,
        /// Option key to price
        #[arg(long)]
        option: Option<String>,
        /// Add-on as `id=qty`, repeatable
        #[arg(long = "addon", value_name = "ID=QTY")]
        addons: Vec<String>,
        /// Quantity to price
        #[arg(long, default_value_t = 1)]
        qty: u32,
    },
    /// Show or change the cart
    Cart {
        /// Cart action; shows the cart when omitted
        #[command(subcommand)]
        action: Option<CartAction>,
    },
    /// Apply or remove a promo code
    Promo {
        /// Promo action
        #[command(subcommand)]
        action: PromoAction,
    },
    /// Delivery or pickup settings
    Ship {
        /// Shipping action; shows the status when omitted
        #[command(subcommand)]
        action: Option<ShipAction>,
    },
    /// Place the order and print the payment link
    Checkout(CheckoutArgs),
    /// Shop administration
    Admin(AdminArgs),
    /// Manage configuration
    Config {
        /// Config action
        #[command(subcommand)]
        action: ConfigAction,
    },
    /// Decide how an order-monitor push is displayed
    Push {
        /// Push payload as JSON (`{title?, body?, url?}`)
        #[arg(long)]
        payload: Option<String>,
        /// A monitor window is currently visible
        #[arg(long)]
        visible: bool,
    },
}

/// Menu listing filters.
#[derive(Args, Debug, Default)]
pub struct MenuArgs {
    /// Category name
    #[arg(long)]
    pub category: Option<String>,
    /// Name search
    #[arg(long, short = 's', default_value = "")]
    pub search: String,
    /// Ignore the cached menu
    #[arg(long)]
    pub refresh: bool,
}

/// Cart actions.
#[derive(Subcommand, Debug)]
pub enum CartAction {
    /// Add an item
    Add {
        /// Item id
        id: String,
        /// Option key or label
        #[arg(long)]
        option: Option<String>,
        /// Add-on as `id=qty`, repeatable
        #[arg(long = "addon", value_name = "ID=QTY")]
        addons: Vec<String>,
        /// Quantity
        #[arg(long, default_value_t = 1)]
        qty: u32,
    },
    /// Set the quantity of a line (1-based)
    Set {
        /// Line number
        line: usize,
        /// New quantity; 0 removes the line
        qty: i64,
    },
    /// Remove a line (1-based)
    Remove {
        /// Line number
        line: usize,
    },
    /// Empty the cart
    Clear,
}

/// Promo code actions.
#[derive(Subcommand, Debug)]
pub enum PromoAction {
    /// Validate and apply a code
    Apply {
        /// Promo code
        code: String,
    },
    /// Re-check the applied code against the cart
    Check,
    /// Remove the applied code
    Clear,
}

/// Fulfilment mode argument.
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModeArg {
    /// Courier delivery
    Delivery,
    /// Pickup at the store
    Pickup,
}

/// Shipping actions.
#[derive(Subcommand, Debug)]
pub enum ShipAction {
    /// Switch between delivery and pickup
    Mode {
        /// Fulfilment mode
        #[arg(value_enum)]
        mode: ModeArg,
    },
    /// Set the delivery point and fetch a quote
    Dest {
        /// Latitude
        #[arg(long, allow_negative_numbers = true)]
        lat: f64,
        /// Longitude
        #[arg(long, allow_negative_numbers = true)]
        lng: f64,
        /// Address label; looked up when omitted
        #[arg(long)]
        address: Option<String>,
    },
    /// Search addresses near the store
    Search {
        /// Free-text query
        query: String,
    },
    /// Set the parcel weight in kg
    Weight {
        /// Weight in kg
        kg: f64,
    },
    /// Set the pickup time (`HH:MM`, or `earliest`)
    PickupTime {
        /// Time of day
        time: String,
    },
    /// Fetch a fresh quote for the current destination
    Quote,
}

/// Checkout form.
#[derive(Args, Debug, Default)]
pub struct CheckoutArgs {
    /// Customer name; defaults to the last order's
    #[arg(long)]
    pub name: Option<String>,
    /// Phone number; defaults to the last order's
    #[arg(long)]
    pub phone: Option<String>,
    /// Address or pickup note; defaults to the shipping address
    #[arg(long)]
    pub address: Option<String>,
    /// Note for the kitchen
    #[arg(long, default_value = "")]
    pub note: String,
}

/// Admin login and action.
#[derive(Args, Debug)]
pub struct AdminArgs {
    /// Admin PIN
    #[arg(long)]
    pub pin: String,

    /// Admin action
    #[command(subcommand)]
    pub action: AdminAction,
}

/// Admin actions.
#[derive(Subcommand, Debug)]
pub enum AdminAction {
    /// Menu table and edits
    Menu {
        /// Menu action
        #[command(subcommand)]
        action: AdminMenuAction,
    },
    /// Category edits
    Category {
        /// Category action
        #[command(subcommand)]
        action: CategoryAction,
    },
    /// Add or remove stock
    Stock {
        /// Item id
        id: String,
        /// Units to add, negative to remove
        #[arg(allow_negative_numbers = true)]
        delta: i64,
        /// Reason for the change
        #[arg(long, default_value = "")]
        note: String,
    },
    /// Promo code management
    Promo {
        /// Promo action
        #[command(subcommand)]
        action: AdminPromoAction,
    },
}

/// Admin menu actions.
#[derive(Subcommand, Debug)]
pub enum AdminMenuAction {
    /// Show the menu table
    List {
        /// Filter by name or category
        #[arg(long, default_value = "")]
        filter: String,
        /// Sort column: name, category, price, stock, active
        #[arg(long, default_value = "name")]
        sort: String,
        /// Sort descending
        #[arg(long)]
        desc: bool,
    },
    /// Create or update an item
    Save(MenuSaveArgs),
    /// Flip an item's active flag
    Toggle {
        /// Item id
        id: String,
    },
    /// Delete an item
    Delete {
        /// Item id
        id: String,
    },
}

/// Menu item form.
#[derive(Args, Debug)]
pub struct MenuSaveArgs {
    /// Existing item id; omit to create
    #[arg(long)]
    pub id: Option<String>,
    /// Display name
    #[arg(long)]
    pub name: String,
    /// Category name
    #[arg(long, default_value = "")]
    pub category: String,
    /// Base price
    #[arg(long)]
    pub price: i64,
    /// Stock
    #[arg(long, default_value_t = 0)]
    pub stock: i64,
    /// List the item as inactive
    #[arg(long)]
    pub inactive: bool,
    /// Existing image URL or Drive link
    #[arg(long, default_value = "")]
    pub image_url: String,
    /// Image file to upload
    #[arg(long)]
    pub image: Option<std::path::PathBuf>,
}

/// Category actions.
#[derive(Subcommand, Debug)]
pub enum CategoryAction {
    /// Create or rename a category
    Save {
        /// Existing category id; omit to create
        #[arg(long)]
        id: Option<String>,
        /// Category name
        name: String,
    },
    /// Delete a category
    Delete {
        /// Category id
        id: String,
    },
}

/// Admin promo actions.
#[derive(Subcommand, Debug)]
pub enum AdminPromoAction {
    /// List promo codes
    List,
    /// Create or update a promo code
    Save(PromoSaveArgs),
    /// Flip a promo's active flag
    Toggle {
        /// Promo code
        code: String,
    },
    /// Delete a promo code
    Delete {
        /// Promo code
        code: String,
    },
}

/// Promo form.
#[derive(Args, Debug)]
pub struct PromoSaveArgs {
    /// Promo code
    pub code: String,
    /// `percent` or `flat`
    #[arg(long = "type", default_value = "percent")]
    pub kind: String,
    /// Percent or Rupiah amount
    #[arg(long)]
    pub value: i64,
    /// Minimum subtotal
    #[arg(long, default_value_t = 0)]
    pub min_subtotal: i64,
    /// First valid day, `YYYY-MM-DD`
    #[arg(long, default_value = "")]
    pub start: String,
    /// Last valid day, `YYYY-MM-DD`
    #[arg(long, default_value = "")]
    pub end: String,
    /// Save the code as inactive
    #[arg(long)]
    pub inactive: bool,
    /// Free-form note
    #[arg(long, default_value = "")]
    pub note: String,
}

/// Config subcommands.
#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show the resolved config file path
    Path,
    /// Print a value by dotted key
    Get {
        /// Dotted key, e.g. `http.timeout_ms`
        key: String,
    },
    /// Set a value by dotted key in the config file
    Set {
        /// Dotted key
        key: String,
        /// New value
        value: String,
    },
    /// Write a default config file
    Init {
        /// Target file; defaults to the platform config path
        #[arg(long)]
        file: Option<String>,
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
    /// Print the configuration as environment variables
    Export {
        /// Format as `--env` flags for `docker run`
        #[arg(long)]
        docker_env: bool,
    },
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_cart_add_with_addons() {
        let cli = Cli::try_parse_from([
            "storefront", "cart", "add", "NG", "--option", "jumbo", "--addon", "KJ=2", "--addon", "TL", "--qty", "3",
        ])
        .unwrap();
        let Command::Cart {
            action: Some(CartAction::Add { id, option, addons, qty }),
        } = cli.command
        else {
            unreachable!("expected cart add");
        };
        assert_eq!(id, "NG");
        assert_eq!(option.as_deref(), Some("jumbo"));
        assert_eq!(addons, vec!["KJ=2", "TL"]);
        assert_eq!(qty, 3);
    }

    #[test]
    fn test_bare_cart_shows() {
        let cli = Cli::try_parse_from(["storefront", "--json", "cart"]).unwrap();
        assert!(cli.json);
        assert!(matches!(cli.command, Command::Cart { action: None }));
    }

    #[test]
    fn test_negative_coordinates_and_delta() {
        let cli = Cli::try_parse_from(["storefront", "ship", "dest", "--lat", "-6.2", "--lng", "106.8"]).unwrap();
        assert!(matches!(
            cli.command,
            Command::Ship { action: Some(ShipAction::Dest { lat, .. }) } if lat < 0.0
        ));

        let cli = Cli::try_parse_from(["storefront", "admin", "--pin", "1", "stock", "ET", "-3"]).unwrap();
        let Command::Admin(AdminArgs {
            action: AdminAction::Stock { delta, .. },
            ..
        }) = cli.command
        else {
            unreachable!("expected admin stock");
        };
        assert_eq!(delta, -3);
    }

    #[test]
    fn test_config_init_flags() {
        let cli = Cli::try_parse_from(["storefront", "config", "init", "--file", "/tmp/s.toml", "--force"]).unwrap();
        assert!(matches!(
            cli.command,
            Command::Config {
                action: ConfigAction::Init { force: true, .. }
            }
        ));
    }
}

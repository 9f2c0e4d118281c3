//! workorder - Command-line front end for jewelry work orders.

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use workorder_core::generator::encode_data_url;
use workorder_core::model::AddressPatch;
use workorder_core::{
    validate_history, AppConfig, Customer, CustomerInput, CustomerPatch, ExportFormat,
    FileStore, FinalizedOrder, OrderFilter, OrderStatus, Product, Session, SortDirection,
    SortKey,
};

/// Record customers, build work orders from the product catalog and print them.
#[derive(Parser, Debug)]
#[command(name = "workorder")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Directory holding the persisted records
    #[arg(long, global = true, default_value = "workorder-data")]
    data_dir: PathBuf,

    /// Product catalog JSON file to load before running the command
    #[arg(long, global = true)]
    catalog: Option<PathBuf>,

    /// Configuration JSON file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Manage customers
    #[command(subcommand)]
    Customer(CustomerCommand),
    /// Browse and edit the product catalog
    #[command(subcommand)]
    Product(ProductCommand),
    /// Build the current order draft
    #[command(subcommand)]
    Order(OrderCommand),
    /// Inspect and maintain committed orders
    #[command(subcommand)]
    History(HistoryCommand),
}

#[derive(Subcommand, Debug)]
enum CustomerCommand {
    /// Add a customer
    Add(CustomerFields),
    /// List all customers
    List,
    /// Suggest customers for typed text
    Suggest { text: String },
    /// Change a customer (by id, code or name)
    Update {
        customer: String,
        #[command(flatten)]
        fields: CustomerUpdate,
    },
    /// Delete a customer (history keeps the name)
    Delete { customer: String },
    /// Show a customer's orders
    Orders { customer: String },
    /// Export customers
    Export {
        #[arg(long, default_value = "json")]
        format: String,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Import customers from a JSON file
    Import { input: PathBuf },
    /// Directory counters
    Stats,
}

#[derive(Args, Debug)]
struct CustomerFields {
    name: String,
    #[arg(long)]
    code: Option<String>,
    #[arg(long, default_value = "")]
    email: String,
    #[arg(long, default_value = "")]
    phone: String,
    #[arg(long, default_value = "")]
    notes: String,
    #[arg(long = "tag")]
    tags: Vec<String>,
}

#[derive(Args, Debug)]
struct CustomerUpdate {
    #[arg(long)]
    name: Option<String>,
    #[arg(long)]
    email: Option<String>,
    #[arg(long)]
    phone: Option<String>,
    #[arg(long)]
    notes: Option<String>,
    #[arg(long)]
    city: Option<String>,
}

#[derive(Subcommand, Debug)]
enum ProductCommand {
    /// List products, optionally by type or material
    List {
        #[arg(long = "type")]
        product_type: Option<String>,
        #[arg(long)]
        material: Option<String>,
    },
    /// Suggest products for typed text
    Suggest { text: String },
    /// Add a product
    Add {
        code: String,
        #[arg(long)]
        metal: f64,
        #[arg(long, default_value_t = 0.0)]
        stone: f64,
        #[arg(long)]
        material: String,
        #[arg(long = "type")]
        product_type: String,
        #[arg(long)]
        description: String,
        /// JPG, PNG or GIF file (up to 5 MB) embedded as the product image
        #[arg(long)]
        image: Option<PathBuf>,
    },
    /// Change a product; omitted fields keep their values
    Update {
        code: String,
        #[arg(long)]
        metal: Option<f64>,
        #[arg(long)]
        stone: Option<f64>,
        #[arg(long)]
        material: Option<String>,
        #[arg(long = "type")]
        product_type: Option<String>,
        #[arg(long)]
        description: Option<String>,
        /// JPG, PNG or GIF file (up to 5 MB) embedded as the product image
        #[arg(long, conflicts_with = "clear_image")]
        image: Option<PathBuf>,
        /// Remove the embedded image
        #[arg(long)]
        clear_image: bool,
    },
    /// Delete a product
    Delete { code: String },
    /// Distinct product types and materials
    Types,
    /// Export the catalog as JSON
    Export {
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Replace the catalog from a JSON file
    Import { input: PathBuf },
}

#[derive(Subcommand, Debug)]
enum OrderCommand {
    /// Bind the draft to a customer (by id, code or name)
    SelectCustomer { customer: String },
    /// Search products for the draft's customer
    Search { text: String },
    /// Add a catalog product to the draft
    Add {
        code: String,
        #[arg(default_value_t = 1)]
        quantity: i64,
        #[arg(long, default_value = "")]
        note: String,
    },
    /// Show the draft
    Show,
    /// Remove a line
    Remove { code: String },
    /// Change a line's quantity
    Qty { code: String, quantity: i64 },
    /// Discard the draft
    Clear,
    /// Commit the draft to history
    Commit {
        /// Render the committed order into this directory
        #[arg(long)]
        render: Option<PathBuf>,
    },
    /// Named drafts
    #[command(subcommand)]
    Snapshot(SnapshotCommand),
    /// Start a new draft from a committed order
    Reorder { order: String },
}

#[derive(Subcommand, Debug)]
enum SnapshotCommand {
    Save { name: String },
    List,
    Restore { name: String },
    Delete { name: String },
}

#[derive(Subcommand, Debug)]
enum HistoryCommand {
    /// List orders
    List {
        #[arg(long, default_value = "date")]
        sort: String,
        #[arg(long)]
        ascending: bool,
        #[arg(long, default_value_t = 20)]
        limit: usize,
    },
    /// Free-text search over number, customer and product codes
    Search { term: String },
    /// Filter by customer, status, dates or product code
    Filter {
        #[arg(long)]
        customer: Option<String>,
        #[arg(long)]
        status: Option<String>,
        #[arg(long)]
        from: Option<NaiveDate>,
        #[arg(long)]
        to: Option<NaiveDate>,
        #[arg(long)]
        product: Option<String>,
    },
    /// Aggregate statistics as JSON
    Stats,
    /// Export history
    Export {
        #[arg(long, default_value = "json")]
        format: String,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Merge orders from a JSON file
    Import { input: PathBuf },
    /// Delete an order (by id or number)
    Delete { order: String },
    /// Change an order's status
    Status { order: String, status: String },
    /// Render a committed order
    Render {
        order: String,
        #[arg(short, long, default_value = ".")]
        output: PathBuf,
    },
    /// Delete orders older than the given number of days
    Prune { days: i64 },
    /// Check stored orders for integrity problems
    Check,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let config = match &cli.config {
        Some(path) => AppConfig::from_file(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?,
        None => AppConfig::default(),
    };

    let store = FileStore::open(&cli.data_dir)
        .with_context(|| format!("Failed to open data directory {}", cli.data_dir.display()))?;
    let mut session = Session::open(Arc::new(store), config);

    if let Some(path) = &cli.catalog {
        let origin = session.load_catalog(path);
        info!("Catalog: {} products ({:?})", session.catalog.len(), origin);
    }

    match cli.command {
        Command::Customer(cmd) => run_customer(&mut session, cmd),
        Command::Product(cmd) => run_product(&mut session, cmd),
        Command::Order(cmd) => run_order(&mut session, cmd),
        Command::History(cmd) => run_history(&mut session, cmd),
    }
}

// ==================== Customers ====================

fn run_customer(session: &mut Session, cmd: CustomerCommand) -> Result<()> {
    match cmd {
        CustomerCommand::Add(fields) => {
            let input = CustomerInput {
                code: fields.code,
                email: fields.email,
                phone: fields.phone,
                notes: fields.notes,
                tags: fields.tags,
                ..CustomerInput::named(fields.name)
            };
            let customer = session.directory.create(input)?;
            info!("Added {} ({})", customer.name, customer.code);
        }
        CustomerCommand::List => {
            for customer in session.directory.all() {
                print_customer(customer);
            }
        }
        CustomerCommand::Suggest { text } => {
            for customer in session.directory.suggest(&text) {
                print_customer(customer);
            }
        }
        CustomerCommand::Update { customer, fields } => {
            let id = resolve_customer(session, &customer)?.id.clone();
            let patch = CustomerPatch {
                name: fields.name,
                email: fields.email,
                phone: fields.phone,
                notes: fields.notes,
                address: fields.city.map(|city| AddressPatch {
                    city: Some(city),
                    ..Default::default()
                }),
                ..Default::default()
            };
            let updated = session.directory.update(&id, patch)?;
            info!("Updated {}", updated.name);
        }
        CustomerCommand::Delete { customer } => {
            let id = resolve_customer(session, &customer)?.id.clone();
            let removed = session.directory.delete(&id)?;
            info!("Deleted {}", removed.name);
        }
        CustomerCommand::Orders { customer } => {
            let customer = resolve_customer(session, &customer)?;
            for entry in session.directory.history_for(&customer.id, &session.history)? {
                print_order(entry);
            }
        }
        CustomerCommand::Export { format, output } => {
            let content = match parse_export_format(&format)? {
                ExportFormat::Json => session.directory.export_json()?,
                ExportFormat::Csv => session.directory.export_csv(),
            };
            emit(&content, output.as_deref())?;
        }
        CustomerCommand::Import { input } => {
            let content = read_file(&input)?;
            let report = session.directory.import_json(&content)?;
            info!(
                "Imported {} customer(s), skipped {}",
                report.imported, report.skipped
            );
        }
        CustomerCommand::Stats => {
            let stats = session.directory.statistics();
            println!("{}", serde_json::to_string_pretty(&stats)?);
        }
    }
    Ok(())
}

fn resolve_customer<'s>(session: &'s Session, key: &str) -> Result<&'s Customer> {
    session
        .directory
        .find_by_id(key)
        .or_else(|| session.directory.find_by_code(key))
        .or_else(|| session.directory.find_by_name(key))
        .with_context(|| format!("No customer matches '{}'", key))
}

fn print_customer(customer: &Customer) {
    println!(
        "{:<6} {:<30} {:<25} {:<15} {} order(s)",
        customer.code, customer.name, customer.email, customer.phone, customer.order_count
    );
}

// ==================== Products ====================

fn run_product(session: &mut Session, cmd: ProductCommand) -> Result<()> {
    match cmd {
        ProductCommand::List {
            product_type,
            material,
        } => {
            let products: Vec<&Product> = match (&product_type, &material) {
                (Some(t), _) => session.catalog.by_type(t),
                (None, Some(m)) => session.catalog.by_material(m),
                (None, None) => session.catalog.all().iter().collect(),
            };
            for product in products {
                if material
                    .as_deref()
                    .map_or(true, |m| product.material.eq_ignore_ascii_case(m))
                {
                    print_product(product);
                }
            }
        }
        ProductCommand::Suggest { text } => {
            for product in session.catalog.suggest(&text) {
                print_product(product);
            }
        }
        ProductCommand::Add {
            code,
            metal,
            stone,
            material,
            product_type,
            description,
            image,
        } => {
            let mut product =
                Product::new(code, metal, stone, material, product_type, description);
            if let Some(path) = &image {
                product.image_data = Some(read_image(path)?);
            }
            let product = session.catalog.create(product)?;
            info!("Added {} ({:.2}g)", product.code, product.total_weight);
        }
        ProductCommand::Update {
            code,
            metal,
            stone,
            material,
            product_type,
            description,
            image,
            clear_image,
        } => {
            let mut product = session
                .catalog
                .find_by_code(&code)
                .cloned()
                .with_context(|| format!("No product with code '{}'", code))?;
            if let Some(metal) = metal {
                product.metal_weight = metal;
            }
            if let Some(stone) = stone {
                product.stone_weight = stone;
            }
            if let Some(material) = material {
                product.material = material;
            }
            if let Some(product_type) = product_type {
                product.product_type = product_type;
            }
            if let Some(description) = description {
                product.description = description;
            }
            if clear_image {
                product.image_data = None;
            }
            if let Some(path) = &image {
                product.image_data = Some(read_image(path)?);
            }
            let product = session.catalog.update(&code, product)?;
            info!("Updated {} ({:.2}g)", product.code, product.total_weight);
        }
        ProductCommand::Delete { code } => {
            let removed = session.catalog.delete(&code)?;
            info!("Deleted {}", removed.code);
        }
        ProductCommand::Types => {
            println!("Types: {}", session.catalog.product_types().join(", "));
            println!("Materials: {}", session.catalog.materials().join(", "));
        }
        ProductCommand::Export { output } => {
            let content = session.catalog.export_json()?;
            emit(&content, output.as_deref())?;
        }
        ProductCommand::Import { input } => {
            let content = read_file(&input)?;
            let report = session.catalog.import_json(&content)?;
            info!(
                "Imported {} product(s), skipped {}",
                report.imported, report.skipped
            );
        }
    }
    Ok(())
}

fn print_product(product: &Product) {
    println!(
        "{:<8} {:>7.2}g {:>6.2}g {:<8} {:<16} {}",
        product.code,
        product.metal_weight,
        product.stone_weight,
        product.material,
        product.product_type,
        product.description
    );
}

// ==================== Order draft ====================

fn run_order(session: &mut Session, cmd: OrderCommand) -> Result<()> {
    match cmd {
        OrderCommand::SelectCustomer { customer } => {
            let id = resolve_customer(session, &customer)?.id.clone();
            session.draft.select_customer(&session.directory, &id)?;
            info!(
                "Draft {} for {}",
                session.draft.order().order_number,
                session.draft.order().customer_name
            );
        }
        OrderCommand::Search { text } => {
            for product in session.draft.search_products(&session.catalog, &text)? {
                print_product(product);
            }
        }
        OrderCommand::Add {
            code,
            quantity,
            note,
        } => {
            session.add_product(&code, quantity, &note)?;
            print_draft(session);
        }
        OrderCommand::Show => print_draft(session),
        OrderCommand::Remove { code } => {
            let removed = session.draft.remove_item(&code)?;
            info!("Removed {} x{}", removed.code, removed.quantity);
        }
        OrderCommand::Qty { code, quantity } => {
            if !session.draft.update_quantity(&code, quantity)? {
                warn!("Quantity {} rejected; line unchanged", quantity);
            }
            print_draft(session);
        }
        OrderCommand::Clear => {
            session.draft.clear()?;
            info!("Draft cleared");
        }
        OrderCommand::Commit { render } => {
            let finalized = session.commit()?;
            info!(
                "Saved {} for {}",
                finalized.order_number(),
                finalized.customer_name()
            );
            if let Some(dir) = render {
                render_to(session, &finalized, &dir)?;
            }
        }
        OrderCommand::Snapshot(cmd) => run_snapshot(session, cmd)?,
        OrderCommand::Reorder { order } => {
            let entry = resolve_order(session, &order)?.clone();
            session.draft.load_from_history(&entry)?;
            print_draft(session);
        }
    }
    Ok(())
}

fn run_snapshot(session: &mut Session, cmd: SnapshotCommand) -> Result<()> {
    match cmd {
        SnapshotCommand::Save { name } => {
            let saved = session.draft.save_snapshot(&name)?;
            info!("Saved draft '{}'", saved.name);
        }
        SnapshotCommand::List => {
            for snapshot in session.draft.snapshots() {
                println!(
                    "{:<20} {} {} ({} line(s))",
                    snapshot.name,
                    snapshot.saved_at.format("%Y-%m-%d %H:%M"),
                    snapshot.order.customer_name,
                    snapshot.order.items.len()
                );
            }
        }
        SnapshotCommand::Restore { name } => {
            session.draft.restore_snapshot(&name)?;
            print_draft(session);
        }
        SnapshotCommand::Delete { name } => {
            session.draft.delete_snapshot(&name)?;
            info!("Deleted draft '{}'", name);
        }
    }
    Ok(())
}

fn print_draft(session: &Session) {
    let order = session.draft.order();
    println!(
        "{}  {}  {}",
        order.order_number,
        order.date,
        if order.customer_name.is_empty() {
            "(no customer)"
        } else {
            order.customer_name.as_str()
        }
    );
    for item in &order.items {
        println!(
            "  {:<8} x{:<4} {:>8.2}g  {}",
            item.code,
            item.quantity,
            item.line_weight(),
            item.description
        );
    }
    let totals = &order.totals;
    println!(
        "  {} line(s), {} item(s), metal {:.2}g, stone {:.2}g, total {:.2}g",
        totals.line_count,
        totals.total_items,
        totals.total_metal_weight,
        totals.total_stone_weight,
        totals.total_weight
    );
}

// ==================== History ====================

fn run_history(session: &mut Session, cmd: HistoryCommand) -> Result<()> {
    match cmd {
        HistoryCommand::List {
            sort,
            ascending,
            limit,
        } => {
            let key = match sort.to_lowercase().as_str() {
                "date" => SortKey::Date,
                "customer" => SortKey::Customer,
                "weight" => SortKey::Weight,
                other => anyhow::bail!("Unknown sort key '{}' (date, customer, weight)", other),
            };
            let direction = if ascending {
                SortDirection::Ascending
            } else {
                SortDirection::Descending
            };
            for entry in session.history.sorted(key, direction).into_iter().take(limit) {
                print_order(entry);
            }
        }
        HistoryCommand::Search { term } => {
            for entry in session.history.search(&term) {
                print_order(entry);
            }
        }
        HistoryCommand::Filter {
            customer,
            status,
            from,
            to,
            product,
        } => {
            let filter = OrderFilter {
                customer_name: customer,
                status: status.as_deref().map(parse_status).transpose()?,
                date_from: from,
                date_to: to,
                product_code: product,
            };
            for entry in session.history.filter(&filter) {
                print_order(entry);
            }
        }
        HistoryCommand::Stats => {
            println!("{}", serde_json::to_string_pretty(&session.history.stats())?);
        }
        HistoryCommand::Export { format, output } => {
            let content = session.history.export(parse_export_format(&format)?)?;
            emit(&content, output.as_deref())?;
        }
        HistoryCommand::Import { input } => {
            let content = read_file(&input)?;
            let report = session.history.import_json(&content)?;
            info!(
                "Imported {} order(s), skipped {}",
                report.imported, report.skipped
            );
        }
        HistoryCommand::Delete { order } => {
            let id = resolve_order(session, &order)?.id.clone();
            let removed = session.history.delete(&id)?;
            info!("Deleted {}", removed.order_number());
        }
        HistoryCommand::Status { order, status } => {
            let id = resolve_order(session, &order)?.id.clone();
            let updated = session.history.update_status(&id, parse_status(&status)?)?;
            info!("{} is now {}", updated.order_number(), updated.status);
        }
        HistoryCommand::Render { order, output } => {
            let entry = resolve_order(session, &order)?.clone();
            render_to(session, &entry, &output)?;
        }
        HistoryCommand::Prune { days } => {
            let today = session.clock.today();
            let removed = session.history.prune_older_than(days, today)?;
            info!("Removed {} order(s) older than {} days", removed, days);
        }
        HistoryCommand::Check => {
            let result = validate_history(session.history.all());
            for warning in &result.warnings {
                warn!("{}", warning);
            }
            for err in &result.errors {
                error!("{}", err);
            }
            if !result.passed {
                anyhow::bail!("Validation failed");
            }
            info!("{} order(s) checked", session.history.len());
        }
    }
    Ok(())
}

fn resolve_order<'s>(session: &'s Session, key: &str) -> Result<&'s FinalizedOrder> {
    session
        .history
        .get(key)
        .or_else(|| session.history.get_by_number(key))
        .with_context(|| format!("No order matches '{}'", key))
}

fn parse_status(text: &str) -> Result<OrderStatus> {
    OrderStatus::parse(text).with_context(|| format!("Unknown order status '{}'", text))
}

fn print_order(entry: &FinalizedOrder) {
    let order = &entry.order;
    println!(
        "{:<22} {} {:<30} {:>4} item(s) {:>9.2}g  {}",
        order.order_number,
        order.date,
        order.customer_name,
        order.totals.total_items,
        order.totals.total_weight,
        entry.status
    );
}

fn render_to(session: &Session, entry: &FinalizedOrder, dir: &Path) -> Result<()> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create {}", dir.display()))?;
    let document = session.render(&entry.order)?;
    let path = document.save_to(dir)?;
    info!("Generated: {}", path.display());
    Ok(())
}

// ==================== File helpers ====================

fn parse_export_format(text: &str) -> Result<ExportFormat> {
    match text.to_lowercase().as_str() {
        "json" => Ok(ExportFormat::Json),
        "csv" => Ok(ExportFormat::Csv),
        other => anyhow::bail!("Unknown export format '{}' (json, csv)", other),
    }
}

fn read_file(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))
}

/// Load an image file as a data URL for the product record.
fn read_image(path: &Path) -> Result<String> {
    let bytes =
        std::fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;
    encode_data_url(&bytes).with_context(|| format!("Rejected image {}", path.display()))
}

/// Write to `output`, or stdout when absent.
fn emit(content: &str, output: Option<&Path>) -> Result<()> {
    match output {
        Some(path) => {
            std::fs::write(path, content)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            info!("Wrote {}", path.display());
        }
        None => println!("{}", content),
    }
    Ok(())
}

use anyhow::Context;
use clap::Subcommand;
use serde::Serialize;
use uuid::Uuid;

use loyalty_core::LoyaltyEngine;
use loyalty_core::models::{DeliveryInfo, RedemptionStatus};

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Apply pending schema migrations and exit.
    Migrate,

    /// Register a zero-balance account.
    OpenAccount {
        /// Defaults to a fresh random id.
        #[arg(long)]
        account: Option<Uuid>,
    },

    /// Record one scan of a campaign code.
    Scan {
        #[arg(long)]
        account: Uuid,
        #[arg(long)]
        code: String,
        #[arg(long)]
        location: Option<String>,
    },

    /// Manual credit outside any campaign.
    Credit {
        #[arg(long)]
        account: Uuid,
        #[arg(long)]
        points: i64,
        #[arg(long)]
        description: Option<String>,
        #[arg(long)]
        weight: Option<f64>,
    },

    /// Claim the reward of a completed progress record.
    RedeemProgress {
        #[arg(long)]
        account: Uuid,
        #[arg(long)]
        progress: Uuid,
    },

    /// Spend points on a catalog item.
    RedeemItem {
        #[arg(long)]
        account: Uuid,
        #[arg(long)]
        item: Uuid,
        #[arg(long)]
        address: Option<String>,
        #[arg(long)]
        notes: Option<String>,
    },

    /// Record the fulfilment outcome of a pending redemption.
    Advance {
        #[arg(long)]
        redemption: Uuid,
        /// "completed" or "failed".
        #[arg(long)]
        status: RedemptionStatus,
    },

    Account {
        #[arg(long)]
        account: Uuid,
    },

    Progress {
        #[arg(long)]
        account: Uuid,
    },

    Ledger {
        #[arg(long)]
        account: Uuid,
        #[arg(long, default_value_t = 50)]
        limit: i64,
    },

    Scans {
        #[arg(long)]
        account: Uuid,
        #[arg(long)]
        limit: Option<i64>,
    },

    Redemptions {
        #[arg(long)]
        account: Uuid,
        #[arg(long)]
        limit: Option<i64>,
    },

    Catalog,

    Lookup {
        code: String,
    },

    /// Replay an account's ledger against its balance. Exits non-zero on drift.
    Reconcile {
        #[arg(long)]
        account: Uuid,
    },

    #[command(subcommand)]
    Admin(AdminCommand),
}

#[derive(Subcommand, Debug, Clone)]
pub enum AdminCommand {
    CreateCampaign {
        #[arg(long)]
        brand: String,
        #[arg(long)]
        reward: String,
    },
    IssueCode {
        #[arg(long)]
        campaign: Uuid,
        #[arg(long)]
        code: String,
        #[arg(long)]
        points: i64,
    },
    SetCodeActive {
        #[arg(long)]
        code: String,
        #[arg(long, action = clap::ArgAction::Set)]
        active: bool,
    },
    CreateItem {
        #[arg(long)]
        name: String,
        #[arg(long)]
        cost: i64,
        #[arg(long, default_value_t = 0)]
        stock: i32,
        #[arg(long)]
        description: Option<String>,
        #[arg(long)]
        category: Option<String>,
    },
    Restock {
        #[arg(long)]
        item: Uuid,
        #[arg(long)]
        quantity: i32,
    },
    SetItemActive {
        #[arg(long)]
        item: Uuid,
        #[arg(long, action = clap::ArgAction::Set)]
        active: bool,
    },
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    let out = serde_json::to_string_pretty(value).context("serializing output")?;
    println!("{out}");
    Ok(())
}

pub async fn run(engine: &LoyaltyEngine, command: Command) -> anyhow::Result<()> {
    match command {
        // Handled in main before the engine runs anything.
        Command::Migrate => Ok(()),

        Command::OpenAccount { account } => {
            let id = account.unwrap_or_else(Uuid::new_v4);
            print_json(&engine.ledger().open_account(id).await?)
        }
        Command::Scan { account, code, location } => {
            print_json(&engine.apply_scan(account, &code, location.as_deref()).await?)
        }
        Command::Credit { account, points, description, weight } => {
            print_json(&engine.credit_points(account, points, description.as_deref(), weight).await?)
        }
        Command::RedeemProgress { account, progress } => {
            print_json(&engine.redeem_progress(account, progress).await?)
        }
        Command::RedeemItem { account, item, address, notes } => {
            let delivery = DeliveryInfo { delivery_address: address, notes };
            print_json(&engine.redeem_catalog_item(account, item, delivery).await?)
        }
        Command::Advance { redemption, status } => {
            print_json(&engine.advance_redemption(redemption, status).await?)
        }
        Command::Account { account } => print_json(&engine.get_account(account).await?),
        Command::Progress { account } => print_json(&engine.get_progress(account).await?),
        Command::Ledger { account, limit } => print_json(&engine.get_ledger(account, limit).await?),
        Command::Scans { account, limit } => print_json(&engine.get_scan_history(account, limit).await?),
        Command::Redemptions { account, limit } => {
            print_json(&engine.get_redemptions(account, limit).await?)
        }
        Command::Catalog => print_json(&engine.list_catalog().await?),
        Command::Lookup { code } => print_json(&engine.lookup_code(&code).await?),
        Command::Reconcile { account } => {
            let report = engine.reconcile_account(account).await?;
            print_json(&report)?;
            if !report.is_consistent() {
                anyhow::bail!("account {} does not reconcile", account);
            }
            Ok(())
        }
        Command::Admin(admin) => run_admin(engine, admin).await,
    }
}

async fn run_admin(engine: &LoyaltyEngine, command: AdminCommand) -> anyhow::Result<()> {
    match command {
        AdminCommand::CreateCampaign { brand, reward } => {
            print_json(&engine.registry().create_campaign(&brand, &reward).await?)
        }
        AdminCommand::IssueCode { campaign, code, points } => {
            print_json(&engine.registry().issue_code(campaign, &code, points).await?)
        }
        AdminCommand::SetCodeActive { code, active } => {
            engine.registry().set_code_active(&code, active).await?;
            println!("code {code} active={active}");
            Ok(())
        }
        AdminCommand::CreateItem { name, cost, stock, description, category } => {
            let item = engine
                .catalog()
                .create_item(&name, description.as_deref(), category.as_deref(), cost, stock)
                .await?;
            print_json(&item)
        }
        AdminCommand::Restock { item, quantity } => {
            print_json(&engine.catalog().restock(item, quantity).await?)
        }
        AdminCommand::SetItemActive { item, active } => {
            engine.catalog().set_item_active(item, active).await?;
            println!("item {item} active={active}");
            Ok(())
        }
    }
}

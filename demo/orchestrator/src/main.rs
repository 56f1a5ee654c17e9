// Demo Orchestrator - walks one pond period end to end
// Deposits close a period, the operator commits it, depositors claim with proofs

use anyhow::{Context, Result};
use minnow_core::{units, Address, ClaimReceipt, Config, Pond};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use tracing_subscriber::EnvFilter;

struct DemoDepositor {
    name: &'static str,
    address: Address,
    amount: Decimal,
}

fn demo_depositors() -> Result<Vec<DemoDepositor>> {
    Ok(vec![
        DemoDepositor {
            name: "alice",
            address: Address::parse("0x00000000000000000000000000000000000a11ce")?,
            amount: dec!(0.4),
        },
        DemoDepositor {
            name: "bob",
            address: Address::parse("0x0000000000000000000000000000000000000b0b")?,
            amount: dec!(0.4),
        },
        DemoDepositor {
            name: "carol",
            address: Address::parse("0x00000000000000000000000000000000000ca201")?,
            amount: dec!(0.4),
        },
    ])
}

fn load_config() -> Result<Config> {
    match std::env::args().nth(1) {
        Some(path) => {
            Config::from_file(&path).with_context(|| format!("loading config from {}", path))
        }
        None => Config::from_env().context("loading config from environment"),
    }
}

async fn run_demo(pond: &Pond) -> Result<Vec<ClaimReceipt>> {
    let config = pond.config();
    let decimals = config.pond.asset_decimals;
    let operator = config.distributor.operator;

    println!("\n🐟 =================================================================");
    println!(
        "🐟 Minnow Pond {} - Deposit, Commit, Claim",
        config.service_version
    );
    println!(
        "🐟 Close threshold: {} | Operator: {}",
        config.pond.close_threshold, operator
    );
    if let Some(address) = config.contracts.pond {
        println!("🐟 Pond deployed at: {}", address);
    }
    if let Some(address) = config.contracts.distributor {
        println!("🐟 Distributor deployed at: {}", address);
    }
    println!("🐟 =================================================================\n");

    let depositors = demo_depositors()?;
    let mut closed = None;

    for depositor in &depositors {
        let amount = units::parse_units(depositor.amount, decimals)?;
        let receipt = pond.deposit(depositor.address, amount).await?;
        println!(
            "  💧 {} deposited {} into period {} (period total {})",
            depositor.name,
            depositor.amount,
            receipt.period_index,
            units::format_units(receipt.period_total, decimals)?
        );
        if let Some(index) = receipt.closed_period {
            println!("  🔒 Period {} closed", index);
            closed = Some(index);
            break;
        }
    }

    let period_index = closed.context("demo deposits did not reach the close threshold")?;

    let tree = pond.commit_period(operator, period_index).await?;
    println!(
        "\n  🌳 Commitment for period {}: {} ({} leaves)",
        period_index,
        minnow_core::crypto::to_hex(&tree.root()),
        tree.leaf_count()
    );

    let payout: u128 = tree.leaves().iter().map(|leaf| leaf.entitlement).sum();
    let reserve = pond.fund(payout).await?;
    println!("  🏦 Reserve funded: {}", units::format_units(reserve, decimals)?);

    let mut receipts = Vec::new();
    for depositor in &depositors {
        // Depositors after the closing deposit never entered this period
        let Ok((leaf, proof)) = tree.proof_for(&depositor.address) else {
            continue;
        };
        let proof_len = proof.len();
        let receipt = pond
            .claim(period_index, depositor.address, proof, leaf.entitlement)
            .await?;
        println!(
            "  ✅ {} claimed {} with a {}-node proof",
            depositor.name,
            units::format_units(receipt.amount, decimals)?,
            proof_len
        );
        receipts.push(receipt);
    }

    // Replaying a claim must fail
    let (leaf, proof) = tree.proof_for(&depositors[0].address)?;
    match pond
        .claim(period_index, depositors[0].address, proof, leaf.entitlement)
        .await
    {
        Err(e) => println!("  🚫 Second claim rejected: {}", e),
        Ok(_) => anyhow::bail!("double claim was accepted"),
    }

    Ok(receipts)
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = load_config()?;
    let pond = Pond::open(config).await?;

    let receipts = run_demo(&pond).await?;

    let metrics = pond.metrics();
    println!("\n📈 =================================================================");
    println!("📈 SUMMARY");
    println!("📈 =================================================================\n");
    println!("  Deposits:        {}", metrics.deposits_total.get());
    println!("  Periods closed:  {}", metrics.periods_closed_total.get());
    println!("  Claims paid:     {}", metrics.claims_total.get());
    println!("  Claims rejected: {}", metrics.claims_rejected_total.get());
    println!("\n{}", serde_json::to_string_pretty(&receipts)?);

    tracing::info!(claims = receipts.len(), "Demo complete");

    pond.shutdown().await?;
    Ok(())
}

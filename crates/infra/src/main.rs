use anyhow::Context;
use tokio_util::sync::CancellationToken;

use nexus_catalog::{Category, NewProduct};
use nexus_core::UserId;
use nexus_infra::{EngineConfig, Marketplace};
use nexus_orders::{Actor, LogisticsPartner, OrderStatus};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    nexus_observability::init();

    let config = EngineConfig::from_env().context("invalid engine configuration")?;
    let market = Marketplace::in_memory(config).context("failed to start marketplace")?;

    let seller = UserId::new();
    let buyer = UserId::new();

    let product = market.list_product(
        seller,
        NewProduct {
            name: "Handloom Cotton Kurta".to_string(),
            brand: "Nexus Originals".to_string(),
            category: Category::Men,
            description: String::new(),
            price: 1_499,
            stock: 12,
        },
    )?;
    market.moderate_product(product.id_typed(), true)?;

    let description = market.spawn_description(product.name(), product.category());
    let advice = market.spawn_advice("a cotton kurta for summer");

    market.add_to_cart(buyer, product.id_typed(), 2)?;
    let order = market.checkout(buyer, CancellationToken::new()).await?;
    tracing::info!(reference = %order.id_typed().reference(), total = order.total(), "demo order placed");

    market.change_status(order.id_typed(), Actor::Seller(seller), OrderStatus::Processing)?;
    let order = market.assign_logistics(order.id_typed(), LogisticsPartner::Delhivery)?;
    tracing::info!(
        status = %order.status(),
        tracking_id = ?order.tracking_id().map(|t| t.as_str()),
        "demo order shipped"
    );

    let summary = market.summary()?;
    println!("{}", serde_json::to_string_pretty(&summary)?);
    println!("description: {}", description.await?);
    println!("advice: {}", advice.await?);
    Ok(())
}

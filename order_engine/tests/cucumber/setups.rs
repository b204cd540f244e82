use cucumber::given;
use order_engine::{db_types::NewProduct, Catalog, VoucherStore};
use shop_common::Vnd;

use crate::{
    cucumber::{shop_world::ShopSystem, ShopWorld},
    support::{percentage_voucher, seed_claim},
};

#[given("a fresh install")]
async fn fresh_database(world: &mut ShopWorld) {
    let system = ShopSystem::new().await;
    world.system = Some(system);
}

#[given(expr = "a product '{word}' priced at {int} with {int} in stock")]
async fn add_product(world: &mut ShopWorld, code: String, price: i64, total: i64) {
    let product = NewProduct::new(code.as_str(), code.as_str(), Vnd::from(price), total);
    world.db().insert_product(product).await.expect("Error inserting product");
}

#[given(expr = "a product '{word}' priced at {int} with {int} in {word} size {word}")]
async fn add_variant_product(world: &mut ShopWorld, code: String, price: i64, quantity: i64, color: String, size: String) {
    let product = NewProduct::new(code.as_str(), code.as_str(), Vnd::from(price), quantity * 2)
        .with_variant(color.as_str(), size.as_str(), quantity);
    world.db().insert_product(product).await.expect("Error inserting product");
}

#[given(expr = "a percentage voucher '{word}' worth {int} with a minimum order of {int}")]
async fn add_voucher(world: &mut ShopWorld, code: String, value: i64, min_order: i64) {
    world.db().insert_voucher(percentage_voucher(&code, value, min_order)).await.expect("Error inserting voucher");
}

#[given(expr = "'{word}' has claimed voucher '{word}'")]
async fn claim_voucher(world: &mut ShopWorld, user: String, code: String) {
    let voucher = world.db().fetch_voucher_by_code(&code).await.expect("Error fetching voucher").expect("No voucher");
    seed_claim(world.db(), &user, &voucher).await;
}

use common::{Money, ProductId, UserId};
use criterion::{Criterion, criterion_group, criterion_main};
use domain::{Cart, Pricing};

fn bench_cart_merge(c: &mut Criterion) {
    let product_ids: Vec<ProductId> = (0..50).map(|_| ProductId::new()).collect();

    c.bench_function("domain/cart_add_50_products_twice", |b| {
        b.iter(|| {
            let mut cart = Cart::empty(UserId::new());
            for id in &product_ids {
                cart.add_line(*id, 1, Money::from_cents(1000));
            }
            for id in &product_ids {
                cart.add_line(*id, 2, Money::from_cents(900));
            }
            cart.subtotal()
        });
    });
}

fn bench_pricing(c: &mut Criterion) {
    c.bench_function("domain/pricing_compute", |b| {
        b.iter(|| Pricing::compute(Money::from_cents(123_456)));
    });
}

criterion_group!(benches, bench_cart_merge, bench_pricing);
criterion_main!(benches);

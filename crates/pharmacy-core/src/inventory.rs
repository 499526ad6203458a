//! # Inventory Rules
//!
//! Pricing and stock checks for the two flows that move inventory:
//! walk-in sales and storefront orders.
//!
//! ## Sale Flow
//! ```text
//! SaleRequest ──► price_sale(products, today) ──► SaleDraft ──► repository
//!                   │                                              │
//!                   ├─ cart not empty                              ├─ sale number
//!                   ├─ every product exists                        ├─ insert sale
//!                   ├─ nothing expired                             └─ conditional
//!                   └─ enough stock                                   decrements
//! ```
//!
//! ## Order Flow
//! ```text
//! pending/processing ──(status → completed, !adjusted)──► Deduct, adjusted = true
//! completed          ──(status → cancelled,  adjusted)──► Restore, adjusted = false
//! anything else      ─────────────────────────────────► no stock change
//! ```
//!
//! Everything here is pure. The repository layer re-checks stock with a
//! conditional `UPDATE` so concurrent requests can never push a quantity
//! below zero.

use std::collections::HashMap;

use chrono::NaiveDate;

use crate::error::{CoreError, CoreResult, ValidationError};
use crate::money::Money;
use crate::types::{
    non_blank, OrderDraft, OrderItem, OrderRequest, OrderStatus, Product, SaleDraft, SaleItem,
    SaleRequest,
};
use crate::validation::{validate_non_negative, validate_quantity};

// =============================================================================
// Stock Movements
// =============================================================================

/// Units of one product to take out of (or put back into) stock.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StockMovement {
    pub product_id: String,
    pub quantity: i64,
}

/// Sums quantities per product, keeping first-seen order.
fn aggregate<'a>(lines: impl Iterator<Item = (&'a str, i64)>) -> Vec<StockMovement> {
    let mut movements: Vec<StockMovement> = Vec::new();
    for (product_id, quantity) in lines {
        match movements.iter_mut().find(|m| m.product_id == product_id) {
            Some(existing) => existing.quantity += quantity,
            None => movements.push(StockMovement {
                product_id: product_id.to_string(),
                quantity,
            }),
        }
    }
    movements
}

/// Stock movements for a sale's lines.
pub fn sale_movements(items: &[SaleItem]) -> Vec<StockMovement> {
    aggregate(items.iter().map(|i| (i.product_id.as_str(), i.quantity)))
}

/// Stock movements for an order's product-linked lines. Custom lines do
/// not touch inventory.
pub fn order_movements(items: &[OrderItem]) -> Vec<StockMovement> {
    aggregate(
        items
            .iter()
            .filter_map(|i| i.product_id.as_deref().map(|id| (id, i.quantity))),
    )
}

fn amount_overflow(field: &str) -> CoreError {
    ValidationError::AmountOverflow {
        field: field.to_string(),
    }
    .into()
}

fn check_line_quantity(quantity: i64) -> CoreResult<()> {
    if quantity < 1 {
        return Err(CoreError::InvalidQuantity);
    }
    validate_quantity(quantity)?;
    Ok(())
}

// =============================================================================
// Sales
// =============================================================================

/// Validates a till cart against the current product records and prices it.
///
/// `products` must contain every product the cart references (extra records
/// are ignored). Quantities for the same product on several lines are
/// checked together.
///
/// ## Totals
/// - subtotal: client override, else Σ unit × qty
/// - discount: client value clamped at 0
/// - total: client override, else max(subtotal − discount, 0)
///
/// A line total or subtotal past i64 cents fails with `AmountOverflow`.
pub fn price_sale(
    request: &SaleRequest,
    products: &[Product],
    today: NaiveDate,
) -> CoreResult<SaleDraft> {
    if request.items.is_empty() {
        return Err(CoreError::EmptyCart);
    }

    let by_id: HashMap<&str, &Product> = products.iter().map(|p| (p.id.as_str(), p)).collect();

    for line in &request.items {
        check_line_quantity(line.quantity)?;
    }
    if request
        .items
        .iter()
        .any(|line| !by_id.contains_key(line.product_id.as_str()))
    {
        return Err(CoreError::ProductsNotFound);
    }

    let wanted = aggregate(
        request
            .items
            .iter()
            .map(|l| (l.product_id.as_str(), l.quantity)),
    );
    for movement in &wanted {
        let product = by_id[movement.product_id.as_str()];
        if product.is_expired(today) {
            return Err(CoreError::ProductExpired {
                name: product.product_name.clone(),
            });
        }
        if product.available() < movement.quantity {
            return Err(CoreError::InsufficientStock {
                name: product.product_name.clone(),
                available: product.available(),
                requested: movement.quantity,
            });
        }
    }

    let items = request
        .items
        .iter()
        .map(|line| -> CoreResult<SaleItem> {
            let product = by_id[line.product_id.as_str()];
            let line_total = product
                .price()
                .checked_multiply_quantity(line.quantity)
                .ok_or_else(|| amount_overflow("totalPrice"))?;
            Ok(SaleItem {
                product_id: product.id.clone(),
                product_name: product.product_name.clone(),
                quantity: line.quantity,
                unit_price_cents: product.price_cents,
                total_price_cents: line_total.cents(),
            })
        })
        .collect::<CoreResult<Vec<_>>>()?;

    let computed = Money::checked_sum(items.iter().map(|i| Money::from_cents(i.total_price_cents)))
        .ok_or_else(|| amount_overflow("subtotal"))?;
    let subtotal = request
        .subtotal_cents
        .map(Money::from_cents)
        .unwrap_or(computed);
    let discount = Money::from_cents(request.discount_cents.unwrap_or(0)).non_negative();
    let total = request
        .total_amount_cents
        .map(Money::from_cents)
        .unwrap_or_else(|| subtotal.minus_floor_zero(discount));

    validate_non_negative("subtotal", subtotal.cents())?;
    validate_non_negative("totalAmount", total.cents())?;

    Ok(SaleDraft {
        items,
        subtotal,
        discount,
        total,
        payment_method: request.payment_method.unwrap_or_default(),
        notes: non_blank(&request.notes).map(String::from),
    })
}

// =============================================================================
// Orders
// =============================================================================

/// Resolves and prices a storefront checkout.
///
/// Lines naming a product (by database id or product code) take the
/// product's current name and price; the client's image is kept when
/// present. Lines naming nothing are custom lines and keep the client's
/// name and price.
///
/// `products` holds whatever the repository found for the referenced ids and
/// codes.
pub fn price_order(request: &OrderRequest, products: &[Product]) -> CoreResult<OrderDraft> {
    if request.items.is_empty() {
        return Err(CoreError::EmptyOrder);
    }

    let references_any = request.items.iter().any(|l| l.reference().is_some());
    if references_any && products.is_empty() {
        return Err(CoreError::NoProductsResolved);
    }

    let mut items = Vec::with_capacity(request.items.len());
    for line in &request.items {
        let quantity = line.quantity.unwrap_or(1);
        check_line_quantity(quantity)?;

        let item = match line.reference() {
            Some(reference) => {
                let product = products
                    .iter()
                    .find(|p| p.id == reference || p.product_code.as_deref() == Some(reference))
                    .ok_or_else(|| CoreError::ProductNotFound(reference.to_string()))?;
                OrderItem {
                    product_id: Some(product.id.clone()),
                    name: product.product_name.clone(),
                    price_cents: product.price_cents,
                    quantity,
                    image: non_blank(&line.image)
                        .map(String::from)
                        .or_else(|| product.product_image.clone()),
                }
            }
            None => {
                let name = non_blank(&line.name).ok_or_else(|| ValidationError::Required {
                    field: "name".to_string(),
                })?;
                let price_cents = line.price_cents.ok_or_else(|| ValidationError::Required {
                    field: "price".to_string(),
                })?;
                validate_non_negative("price", price_cents)?;
                OrderItem {
                    product_id: None,
                    name: name.to_string(),
                    price_cents,
                    quantity,
                    image: non_blank(&line.image).map(String::from),
                }
            }
        };
        items.push(item);
    }

    let subtotal = items
        .iter()
        .map(|i| Money::from_cents(i.price_cents).checked_multiply_quantity(i.quantity))
        .try_fold(Money::zero(), |acc, line| acc.checked_add(line?))
        .ok_or_else(|| amount_overflow("subtotal"))?;
    let discount = Money::from_cents(request.discount_cents.unwrap_or(0)).non_negative();
    let (receipt_code, order_number) = request.codes();

    Ok(OrderDraft {
        order_number,
        receipt_code,
        items,
        subtotal_cents: subtotal.cents(),
        discount_cents: discount.cents(),
        total_cents: subtotal.minus_floor_zero(discount).cents(),
        payment_status: request.payment_status.unwrap_or_default(),
        payment_reference: non_blank(&request.payment_reference).map(String::from),
        customer: request.customer(),
        shipping_address: request.shipping_address(),
        notes: non_blank(&request.notes).map(String::from),
    })
}

/// What an order status change does to inventory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InventoryAction {
    /// Take the order's units out of stock and mark the order adjusted.
    Deduct,
    /// Put the units back and clear the adjusted flag.
    Restore,
    None,
}

/// Decides the inventory effect of moving an order to `next`.
///
/// Keyed on the `inventory_adjusted` flag rather than the previous status,
/// so a repeated "completed" or "cancelled" is a no-op.
pub fn order_transition(adjusted: bool, next: Option<OrderStatus>) -> InventoryAction {
    match (next, adjusted) {
        (Some(OrderStatus::Completed), false) => InventoryAction::Deduct,
        (Some(OrderStatus::Cancelled), true) => InventoryAction::Restore,
        _ => InventoryAction::None,
    }
}

/// Checks that every product-linked order line can still be fulfilled.
pub fn check_order_stock(items: &[OrderItem], products: &[Product]) -> CoreResult<()> {
    for movement in order_movements(items) {
        let product = products
            .iter()
            .find(|p| p.id == movement.product_id)
            .ok_or_else(|| CoreError::ProductGone(movement.product_id.clone()))?;
        if product.available() < movement.quantity {
            return Err(CoreError::InsufficientStock {
                name: product.product_name.clone(),
                available: product.available(),
                requested: movement.quantity,
            });
        }
    }
    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{OrderLineRequest, PublishStatus, SaleLineRequest};
    use chrono::Utc;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, 1).unwrap()
    }

    fn product(id: &str, name: &str, price: i64, quantity: Option<i64>) -> Product {
        let now = Utc::now();
        Product {
            id: id.to_string(),
            category: "General".to_string(),
            product_name: name.to_string(),
            product_code: Some(format!("CODE-{id}")),
            price_cents: price,
            notes: String::new(),
            expiring_date: None,
            quantity,
            publish_status: PublishStatus::Yes,
            product_image: Some(format!("{id}.png")),
            created_at: now,
            updated_at: now,
        }
    }

    fn line(id: &str, quantity: i64) -> SaleLineRequest {
        SaleLineRequest {
            product_id: id.to_string(),
            quantity,
        }
    }

    fn sale(items: Vec<SaleLineRequest>) -> SaleRequest {
        SaleRequest {
            items,
            ..Default::default()
        }
    }

    #[test]
    fn test_price_sale_computes_totals() {
        let products = vec![
            product("p1", "Paracetamol", 250, Some(20)),
            product("p2", "Vitamin C", 1000, Some(5)),
        ];
        let request = SaleRequest {
            discount_cents: Some(300),
            ..sale(vec![line("p1", 4), line("p2", 1)])
        };

        let draft = price_sale(&request, &products, today()).unwrap();
        assert_eq!(draft.items.len(), 2);
        assert_eq!(draft.items[0].total_price_cents, 1000);
        assert_eq!(draft.subtotal.cents(), 2000);
        assert_eq!(draft.discount.cents(), 300);
        assert_eq!(draft.total.cents(), 1700);
    }

    #[test]
    fn test_price_sale_honours_client_totals() {
        let products = vec![product("p1", "Paracetamol", 250, Some(20))];
        let request = SaleRequest {
            subtotal_cents: Some(900),
            total_amount_cents: Some(800),
            ..sale(vec![line("p1", 4)])
        };

        let draft = price_sale(&request, &products, today()).unwrap();
        assert_eq!(draft.subtotal.cents(), 900);
        assert_eq!(draft.total.cents(), 800);
    }

    #[test]
    fn test_discount_never_makes_total_negative() {
        let products = vec![product("p1", "Paracetamol", 250, Some(20))];
        let request = SaleRequest {
            discount_cents: Some(10_000),
            ..sale(vec![line("p1", 1)])
        };
        let draft = price_sale(&request, &products, today()).unwrap();
        assert_eq!(draft.total, Money::zero());
    }

    #[test]
    fn test_price_sale_rejects_overflowing_totals() {
        let huge = i64::MAX / 2 + 1;
        let products = vec![
            product("p1", "Gold leaf", huge, Some(20)),
            product("p2", "Silver leaf", huge, Some(20)),
        ];

        let err = price_sale(&sale(vec![line("p1", 2)]), &products, today()).unwrap_err();
        assert_eq!(err.to_string(), "totalPrice amount out of range");

        let err = price_sale(&sale(vec![line("p1", 1), line("p2", 1)]), &products, today())
            .unwrap_err();
        assert_eq!(err.to_string(), "subtotal amount out of range");
    }

    #[test]
    fn test_empty_cart() {
        let err = price_sale(&sale(vec![]), &[], today()).unwrap_err();
        assert_eq!(err.to_string(), "Cart is empty");
    }

    #[test]
    fn test_missing_product() {
        let products = vec![product("p1", "Paracetamol", 250, Some(20))];
        let err = price_sale(&sale(vec![line("p1", 1), line("nope", 1)]), &products, today())
            .unwrap_err();
        assert!(matches!(err, CoreError::ProductsNotFound));
    }

    #[test]
    fn test_expired_product() {
        let mut expired = product("p1", "Amoxicillin", 500, Some(20));
        expired.expiring_date = NaiveDate::from_ymd_opt(2024, 5, 31);
        let err = price_sale(&sale(vec![line("p1", 1)]), &[expired.clone()], today()).unwrap_err();
        assert_eq!(err.to_string(), "Product Amoxicillin has expired");

        // Expiring today is still sellable.
        expired.expiring_date = Some(today());
        assert!(price_sale(&sale(vec![line("p1", 1)]), &[expired], today()).is_ok());
    }

    #[test]
    fn test_insufficient_stock_counts_repeated_lines() {
        let products = vec![product("p1", "Paracetamol", 250, Some(5))];
        let err = price_sale(&sale(vec![line("p1", 3), line("p1", 3)]), &products, today())
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "Insufficient stock for Paracetamol. Available: 5, Requested: 6"
        );
    }

    #[test]
    fn test_unstocked_product_has_no_availability() {
        let products = vec![product("p1", "Paracetamol", 250, None)];
        let err = price_sale(&sale(vec![line("p1", 1)]), &products, today()).unwrap_err();
        assert!(matches!(err, CoreError::InsufficientStock { available: 0, .. }));
    }

    #[test]
    fn test_zero_quantity_line() {
        let products = vec![product("p1", "Paracetamol", 250, Some(5))];
        let err = price_sale(&sale(vec![line("p1", 0)]), &products, today()).unwrap_err();
        assert_eq!(err.to_string(), "Quantity must be at least 1");
    }

    #[test]
    fn test_sale_movements_aggregate() {
        let items = vec![
            SaleItem {
                product_id: "p1".into(),
                product_name: "A".into(),
                quantity: 2,
                unit_price_cents: 1,
                total_price_cents: 2,
            },
            SaleItem {
                product_id: "p1".into(),
                product_name: "A".into(),
                quantity: 3,
                unit_price_cents: 1,
                total_price_cents: 3,
            },
        ];
        assert_eq!(
            sale_movements(&items),
            vec![StockMovement {
                product_id: "p1".into(),
                quantity: 5
            }]
        );
    }

    #[test]
    fn test_price_order_resolves_by_id_and_code() {
        let products = vec![
            product("p1", "Paracetamol", 250, Some(20)),
            product("p2", "Vitamin C", 1000, Some(5)),
        ];
        let request = OrderRequest {
            items: vec![
                OrderLineRequest {
                    id: Some("p1".into()),
                    name: Some("client name".into()),
                    price_cents: Some(1),
                    quantity: Some(2),
                    ..Default::default()
                },
                OrderLineRequest {
                    product_code: Some("CODE-p2".into()),
                    image: Some("custom.png".into()),
                    ..Default::default()
                },
                OrderLineRequest {
                    name: Some("Gift wrap".into()),
                    price_cents: Some(150),
                    ..Default::default()
                },
            ],
            discount_cents: Some(-500),
            ..Default::default()
        };

        let draft = price_order(&request, &products).unwrap();
        assert_eq!(draft.items[0].name, "Paracetamol");
        assert_eq!(draft.items[0].price_cents, 250);
        assert_eq!(draft.items[0].image.as_deref(), Some("p1.png"));
        assert_eq!(draft.items[1].product_id.as_deref(), Some("p2"));
        assert_eq!(draft.items[1].quantity, 1);
        assert_eq!(draft.items[1].image.as_deref(), Some("custom.png"));
        assert_eq!(draft.items[2].product_id, None);
        assert_eq!(draft.subtotal_cents, 500 + 1000 + 150);
        assert_eq!(draft.discount_cents, 0);
        assert_eq!(draft.total_cents, 1650);
    }

    #[test]
    fn test_price_order_errors() {
        let err = price_order(&OrderRequest::default(), &[]).unwrap_err();
        assert_eq!(err.to_string(), "Cart items are required");

        let request = OrderRequest {
            items: vec![OrderLineRequest {
                id: Some("ghost".into()),
                ..Default::default()
            }],
            ..Default::default()
        };
        let err = price_order(&request, &[]).unwrap_err();
        assert_eq!(err.to_string(), "One or more products could not be found");

        let products = vec![product("p1", "Paracetamol", 250, Some(20))];
        let request = OrderRequest {
            items: vec![
                OrderLineRequest {
                    id: Some("p1".into()),
                    ..Default::default()
                },
                OrderLineRequest {
                    id: Some("ghost".into()),
                    ..Default::default()
                },
            ],
            ..Default::default()
        };
        let err = price_order(&request, &products).unwrap_err();
        assert_eq!(err.to_string(), "Product ghost not found");

        let request = OrderRequest {
            items: vec![OrderLineRequest {
                id: Some("p1".into()),
                quantity: Some(0),
                ..Default::default()
            }],
            ..Default::default()
        };
        let err = price_order(&request, &products).unwrap_err();
        assert_eq!(err.to_string(), "Quantity must be at least 1");
    }

    #[test]
    fn test_price_order_rejects_overflowing_subtotal() {
        let custom = |quantity| OrderLineRequest {
            name: Some("Gift card".into()),
            price_cents: Some(i64::MAX / 2 + 1),
            quantity: Some(quantity),
            ..Default::default()
        };

        let request = OrderRequest {
            items: vec![custom(2)],
            ..Default::default()
        };
        let err = price_order(&request, &[]).unwrap_err();
        assert!(matches!(
            err,
            CoreError::Validation(ValidationError::AmountOverflow { .. })
        ));

        let request = OrderRequest {
            items: vec![custom(1), custom(1)],
            ..Default::default()
        };
        let err = price_order(&request, &[]).unwrap_err();
        assert_eq!(err.to_string(), "subtotal amount out of range");
    }

    #[test]
    fn test_order_transition() {
        use InventoryAction::*;
        assert_eq!(order_transition(false, Some(OrderStatus::Completed)), Deduct);
        assert_eq!(order_transition(true, Some(OrderStatus::Completed)), None);
        assert_eq!(order_transition(true, Some(OrderStatus::Cancelled)), Restore);
        assert_eq!(order_transition(false, Some(OrderStatus::Cancelled)), None);
        assert_eq!(order_transition(true, Some(OrderStatus::Processing)), None);
        assert_eq!(order_transition(false, Option::None), None);
    }

    #[test]
    fn test_check_order_stock() {
        let items = vec![OrderItem {
            product_id: Some("p1".into()),
            name: "Paracetamol".into(),
            price_cents: 250,
            quantity: 4,
            image: None,
        }];

        let err = check_order_stock(&items, &[]).unwrap_err();
        assert_eq!(err.to_string(), "Product p1 no longer exists");

        let low = vec![product("p1", "Paracetamol", 250, Some(3))];
        assert!(matches!(
            check_order_stock(&items, &low).unwrap_err(),
            CoreError::InsufficientStock {
                available: 3,
                requested: 4,
                ..
            }
        ));

        let plenty = vec![product("p1", "Paracetamol", 250, Some(10))];
        assert!(check_order_stock(&items, &plenty).is_ok());
    }
}

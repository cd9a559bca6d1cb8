//! Per-building trade orders.
//!
//! Bids reserve coins, asks reserve items out of the poster's deposit in
//! the building.  A newly placed order crosses against resting orders of
//! the opposite side (best price first, then order id) and executes at
//! the resting order's price; any remainder rests in the book.  Reserved
//! values are refunded on cancellation and on building destruction.

use crate::inventory::{Inventory, Quantity, MAX_ITEM_DUAL, MAX_ITEM_QUANTITY};
use crate::world::{IdT, Order, OrderSide, WorldState};

/// Resting orders of one side in one building for one item, sorted by
/// price priority (best first) and then by order id.
fn resting_orders(
    state: &WorldState,
    building_id: IdT,
    item: &str,
    side: OrderSide,
) -> Vec<IdT> {
    let mut orders: Vec<&Order> = state
        .orders
        .values()
        .filter(|o| o.building_id == building_id && o.item == item && o.side == side)
        .collect();
    match side {
        // Best ask = lowest price.
        OrderSide::Ask => orders.sort_by_key(|o| (o.price, o.id)),
        // Best bid = highest price.
        OrderSide::Bid => orders.sort_by_key(|o| (-o.price, o.id)),
    }
    orders.into_iter().map(|o| o.id).collect()
}

/// Execute a fill of `quantity` units at `price` between a buying and a
/// selling account inside a building.
fn execute_fill(
    state: &mut WorldState,
    building_id: IdT,
    buyer: &str,
    seller: &str,
    item: &str,
    quantity: Quantity,
    price: i64,
) {
    let coins = Inventory::product(quantity, price);
    state.account_mut(seller).balance += coins;
    state
        .building_inventory_mut(building_id, buyer)
        .add(item, quantity);
    tracing::debug!(buyer, seller, item, quantity, price, "trade executed");
}

/// Place a new order.  Returns false if the order is invalid; in that
/// case nothing changes.
pub fn place_order(
    state: &mut WorldState,
    building_id: IdT,
    account: &str,
    side: OrderSide,
    item: &str,
    quantity: Quantity,
    price: i64,
) -> bool {
    if !(1..=MAX_ITEM_QUANTITY).contains(&quantity) || !(1..=MAX_ITEM_DUAL).contains(&price) {
        return false;
    }
    match state.buildings.get(&building_id) {
        Some(b) if !b.foundation => {}
        _ => return false,
    }
    if state.accounts.get(account).map_or(true, |a| a.faction.is_none()) {
        return false;
    }

    // Reserve the offered value up front.
    match side {
        OrderSide::Bid => {
            let needed = Inventory::product(quantity, price);
            let a = state.account_mut(account);
            if a.balance < needed {
                tracing::debug!(account, needed, "bid exceeds balance");
                return false;
            }
            a.balance -= needed;
        }
        OrderSide::Ask => {
            let inv = state.building_inventory_mut(building_id, account);
            if inv.count(item) < quantity {
                tracing::debug!(account, item, "ask exceeds deposit");
                return false;
            }
            inv.add(item, -quantity);
        }
    }

    let mut remaining = quantity;

    // Cross against the opposite side.
    let opposite = match side {
        OrderSide::Bid => OrderSide::Ask,
        OrderSide::Ask => OrderSide::Bid,
    };
    for other_id in resting_orders(state, building_id, item, opposite) {
        if remaining == 0 {
            break;
        }
        let other = state.orders[&other_id].clone();
        let crosses = match side {
            OrderSide::Bid => other.price <= price,
            OrderSide::Ask => other.price >= price,
        };
        if !crosses {
            break;
        }

        let fill = remaining.min(other.quantity);
        match side {
            OrderSide::Bid => {
                // Taker buys at the resting ask's price; the difference
                // to the reserved bid price flows back to the buyer.
                execute_fill(state, building_id, account, &other.account, item, fill, other.price);
                let refund = Inventory::product(fill, price - other.price);
                state.account_mut(account).balance += refund;
            }
            OrderSide::Ask => {
                // Taker sells at the resting bid's price.
                execute_fill(state, building_id, &other.account, account, item, fill, other.price);
            }
        }

        remaining -= fill;
        let o = state.orders.get_mut(&other_id).unwrap();
        o.quantity -= fill;
        if o.quantity == 0 {
            state.orders.remove(&other_id);
        }
    }

    if remaining > 0 {
        let id = state.allocate_id();
        state.orders.insert(
            id,
            Order {
                id,
                building_id,
                account: account.to_owned(),
                item: item.to_owned(),
                quantity: remaining,
                price,
                side,
            },
        );
    }
    true
}

/// Cancel an order of the given account, refunding the reserved value.
/// Returns false when the order does not exist or belongs to someone
/// else.
pub fn cancel_order(state: &mut WorldState, account: &str, order_id: IdT) -> bool {
    let Some(order) = state.orders.get(&order_id) else {
        return false;
    };
    if order.account != account {
        tracing::debug!(account, order = order_id, "cancel of foreign order");
        return false;
    }
    let order = state.orders.remove(&order_id).expect("checked above");

    match order.side {
        OrderSide::Bid => {
            let refund = Inventory::product(order.quantity, order.price);
            state.account_mut(account).balance += refund;
        }
        OrderSide::Ask => {
            state
                .building_inventory_mut(order.building_id, account)
                .add(&order.item, order.quantity);
        }
    }
    true
}

//! Account coin transfers and burns.

use serde_json::Value;

use crate::context::Context;
use crate::world::WorldState;

/// Process a potential coin-operation part of a move (`"vc"` key):
/// transfers to other accounts and burning.  Amounts beyond the balance
/// or the global coin cap invalidate that part silently.
pub fn try_coin_operation(state: &mut WorldState, name: &str, mv: &Value, ctx: &Context) {
    let Some(op) = mv.get("vc") else {
        return;
    };
    let max = ctx.params().max_coin_amount;

    let mut transfers: Vec<(String, i64)> = Vec::new();
    if let Some(t) = op.get("t").and_then(Value::as_object) {
        // Objects deserialize in arbitrary order; sort recipients before
        // anything touches the state.
        let mut entries: Vec<(&String, &Value)> = t.iter().collect();
        entries.sort_by(|a, b| a.0.cmp(b.0));
        for (recipient, amount) in entries {
            let Some(amount) = amount.as_i64() else {
                continue;
            };
            if amount < 1 || amount > max || recipient == name {
                continue;
            }
            transfers.push((recipient.clone(), amount));
        }
    }
    let burnt = op
        .get("b")
        .and_then(Value::as_i64)
        .filter(|b| (1..=max).contains(b))
        .unwrap_or(0);

    let total: i64 = transfers.iter().map(|(_, a)| a).sum::<i64>() + burnt;
    if total == 0 {
        return;
    }
    if state.accounts.get(name).map_or(true, |a| a.balance < total) {
        tracing::debug!(name, total, "coin operation exceeds balance");
        return;
    }

    state.account_mut(name).balance -= total;
    for (recipient, amount) in transfers {
        state.account_mut(&recipient).balance += amount;
        tracing::debug!(name, recipient = %recipient, amount, "coins transferred");
    }
    if burnt > 0 {
        tracing::debug!(name, burnt, "coins burnt");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::Faction;
    use crate::config::{Chain, RoConfig};
    use crate::map::BaseMap;
    use serde_json::json;

    fn run(state: &mut WorldState, name: &str, mv: Value) {
        let cfg = RoConfig::for_chain(Chain::Regtest);
        let map = BaseMap::new(100, 24);
        let ctx = Context::new(Chain::Regtest, &map, &cfg, 1, 0);
        try_coin_operation(state, name, &mv, &ctx);
    }

    fn setup() -> WorldState {
        let mut state = WorldState::new();
        let a = state.account_mut("alice");
        a.faction = Some(Faction::Red);
        a.balance = 100;
        state
    }

    #[test]
    fn transfer_and_burn() {
        let mut state = setup();
        run(&mut state, "alice", json!({"vc": {"t": {"bob": 30}, "b": 20}}));
        assert_eq!(state.accounts["alice"].balance, 50);
        assert_eq!(state.accounts["bob"].balance, 30);
    }

    #[test]
    fn overdraw_rejects_the_whole_operation() {
        let mut state = setup();
        run(&mut state, "alice", json!({"vc": {"t": {"bob": 80}, "b": 30}}));
        assert_eq!(state.accounts["alice"].balance, 100);
        assert!(!state.accounts.contains_key("bob"));
    }

    #[test]
    fn invalid_amounts_are_skipped() {
        let mut state = setup();
        run(
            &mut state,
            "alice",
            json!({"vc": {"t": {"bob": 0, "carol": -5, "dave": 10}, "b": "x"}}),
        );
        assert_eq!(state.accounts["alice"].balance, 90);
        assert_eq!(state.accounts["dave"].balance, 10);
        assert!(!state.accounts.contains_key("bob"));
        assert!(!state.accounts.contains_key("carol"));
    }

    #[test]
    fn self_transfer_is_ignored() {
        let mut state = setup();
        run(&mut state, "alice", json!({"vc": {"t": {"alice": 50}}}));
        assert_eq!(state.accounts["alice"].balance, 100);
    }

    #[test]
    fn recipients_processed_in_name_order() {
        let mut state = setup();
        // Both fit individually but not together: the whole operation is
        // rejected, independent of JSON key order.
        run(&mut state, "alice", json!({"vc": {"t": {"zeta": 60, "abe": 60}}}));
        assert_eq!(state.accounts["alice"].balance, 100);
    }
}

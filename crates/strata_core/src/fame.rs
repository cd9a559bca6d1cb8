//! Damage attribution lists and fame scoring.
//!
//! Whenever one character damages another, the pair is recorded with the
//! current block height.  The lists feed fame attribution on kills and
//! are garbage-collected once entries fall out of a sliding window.

use std::collections::BTreeMap;
use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::components::{TargetKey, TargetKind};
use crate::world::{IdT, WorldState};

/// Fame points distributed per kill among the attacking accounts.
pub const FAME_PER_KILL: i64 = 100;

/// Sliding-window damage attribution lists.
///
/// Keys are `(victim, attacker)` character-id pairs; the value is the
/// height of the most recent damage dealt.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DamageLists {
    #[serde(with = "crate::world::ordered_pairs")]
    entries: BTreeMap<(IdT, IdT), u64>,
}

impl DamageLists {
    /// Record damage from `attacker` to `victim` at `height`.
    pub fn add_entry(&mut self, victim: IdT, attacker: IdT, height: u64) {
        self.entries.insert((victim, attacker), height);
    }

    /// Remove all entries older than `window` blocks relative to the
    /// current height.
    pub fn remove_old(&mut self, window: u64, height: u64) {
        self.entries.retain(|_, h| height - *h <= window);
    }

    /// Remove every entry mentioning the given character.
    pub fn remove_character(&mut self, id: IdT) {
        self.entries
            .retain(|(victim, attacker), _| *victim != id && *attacker != id);
    }

    /// All attackers recorded for a victim, ascending by id.
    #[must_use]
    pub fn attackers_of(&self, victim: IdT) -> Vec<IdT> {
        self.entries
            .range((victim, 0)..=(victim, IdT::MAX))
            .map(|((_, attacker), _)| *attacker)
            .collect()
    }

    /// Number of stored entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no entries are stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Credit fame and kills for a freshly killed fighter.
///
/// Only character kills carry fame.  The fame pot is split evenly among
/// the distinct accounts found in the victim's damage list (truncating
/// division; the remainder is burnt), and the victim's account loses what
/// the pot took from it, floored at zero.  Each involved account is also
/// credited one kill.
pub fn update_for_kill(state: &mut WorldState, victim: TargetKey) {
    if victim.kind != TargetKind::Character {
        return;
    }

    let victim_owner = match state.characters.get(&victim.id) {
        Some(c) => c.owner.clone(),
        None => return,
    };

    let mut killer_accounts: BTreeSet<String> = BTreeSet::new();
    for attacker in state.damage_lists.attackers_of(victim.id) {
        if let Some(c) = state.characters.get(&attacker) {
            if c.owner != victim_owner {
                killer_accounts.insert(c.owner.clone());
            }
        }
    }
    if killer_accounts.is_empty() {
        return;
    }

    let share = FAME_PER_KILL / killer_accounts.len() as i64;
    for name in &killer_accounts {
        let a = state.account_mut(name);
        a.fame += share;
        a.kills += 1;
    }

    let v = state.account_mut(&victim_owner);
    v.fame = (v.fame - FAME_PER_KILL).max(0);

    tracing::debug!(
        victim = victim.id,
        killers = killer_accounts.len(),
        "fame attributed for kill"
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::Faction;

    #[test]
    fn window_expiry() {
        let mut dl = DamageLists::default();
        dl.add_entry(1, 2, 100);
        dl.add_entry(1, 3, 150);

        dl.remove_old(100, 200);
        assert_eq!(dl.attackers_of(1), vec![2, 3]);

        dl.remove_old(100, 201);
        assert_eq!(dl.attackers_of(1), vec![3]);

        dl.remove_old(100, 251);
        assert!(dl.is_empty());
    }

    #[test]
    fn repeated_damage_refreshes_the_entry() {
        let mut dl = DamageLists::default();
        dl.add_entry(1, 2, 100);
        dl.add_entry(1, 2, 190);
        dl.remove_old(100, 250);
        assert_eq!(dl.attackers_of(1), vec![2]);
    }

    #[test]
    fn character_removal_clears_both_roles() {
        let mut dl = DamageLists::default();
        dl.add_entry(1, 2, 10);
        dl.add_entry(2, 3, 10);
        dl.add_entry(3, 4, 10);
        dl.remove_character(2);
        assert!(dl.attackers_of(1).is_empty());
        assert!(dl.attackers_of(2).is_empty());
        assert_eq!(dl.attackers_of(3), vec![4]);
    }

    #[test]
    fn attackers_are_sorted_and_scoped_to_victim() {
        let mut dl = DamageLists::default();
        dl.add_entry(7, 9, 1);
        dl.add_entry(7, 3, 1);
        dl.add_entry(8, 1, 1);
        assert_eq!(dl.attackers_of(7), vec![3, 9]);
        assert_eq!(dl.attackers_of(8), vec![1]);
    }

    #[test]
    fn fame_split_between_accounts() {
        let mut w = WorldState::new();
        w.account_mut("victim").faction = Some(Faction::Red);
        w.account_mut("a").faction = Some(Faction::Green);
        w.account_mut("b").faction = Some(Faction::Green);
        w.account_mut("victim").fame = 500;

        let v = w.create_character("victim", Faction::Red, "scarab");
        let c1 = w.create_character("a", Faction::Green, "scarab");
        let c2 = w.create_character("b", Faction::Green, "scarab");
        let c3 = w.create_character("a", Faction::Green, "scarab");

        w.damage_lists.add_entry(v, c1, 10);
        w.damage_lists.add_entry(v, c2, 10);
        w.damage_lists.add_entry(v, c3, 10);

        update_for_kill(&mut w, TargetKey::character(v));

        // Two distinct accounts split the pot; a's two characters count once.
        assert_eq!(w.accounts["a"].fame, 50);
        assert_eq!(w.accounts["b"].fame, 50);
        assert_eq!(w.accounts["a"].kills, 1);
        assert_eq!(w.accounts["victim"].fame, 400);
    }

    #[test]
    fn fame_never_goes_negative() {
        let mut w = WorldState::new();
        let v = w.create_character("victim", Faction::Red, "scarab");
        let a = w.create_character("killer", Faction::Green, "scarab");
        w.damage_lists.add_entry(v, a, 10);

        update_for_kill(&mut w, TargetKey::character(v));
        assert_eq!(w.accounts["victim"].fame, 0);
        assert_eq!(w.accounts["killer"].fame, FAME_PER_KILL);
    }

    #[test]
    fn building_kills_carry_no_fame() {
        let mut w = WorldState::new();
        update_for_kill(&mut w, TargetKey::building(5));
        assert!(w.accounts.is_empty());
    }

    #[test]
    fn own_faction_damage_is_not_credited() {
        let mut w = WorldState::new();
        let v = w.create_character("alice", Faction::Red, "scarab");
        let own = w.create_character("alice", Faction::Red, "scarab");
        w.damage_lists.add_entry(v, own, 10);

        update_for_kill(&mut w, TargetKey::character(v));
        assert_eq!(w.accounts["alice"].kills, 0);
    }
}

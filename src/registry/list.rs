//! List registry: owner <-> account association kept as two doubly linked lists.
//!
//! Each owner has a list of account ids; each account id has a list of auth
//! addresses. The two are kept symmetric: a pair is linked in both or neither.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::{LayerError, Result};
use crate::types::{AccountId, Address};

/// Head of a list: first/last element and length. Zero values mean empty.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Link<V> {
    pub first: V,
    pub last: V,
    pub count: u64,
}

/// Neighbours of one element inside a list.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Node<V> {
    pub prev: V,
    pub next: V,
}

/// Arena of doubly linked lists keyed by `K`, holding values `V`.
/// `V::default()` is the "none" sentinel and can never be stored.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct LinkedLists<K: Ord, V: Ord> {
    links: BTreeMap<K, Link<V>>,
    nodes: BTreeMap<K, BTreeMap<V, Node<V>>>,
}

impl<K, V> LinkedLists<K, V>
where
    K: Ord + Copy,
    V: Ord + Copy + Default,
{
    pub fn new() -> Self {
        Self {
            links: BTreeMap::new(),
            nodes: BTreeMap::new(),
        }
    }

    pub fn link(&self, key: &K) -> Link<V> {
        self.links.get(key).copied().unwrap_or_default()
    }

    pub fn node(&self, key: &K, value: &V) -> Node<V> {
        self.nodes
            .get(key)
            .and_then(|n| n.get(value))
            .copied()
            .unwrap_or_default()
    }

    pub fn contains(&self, key: &K, value: &V) -> bool {
        self.nodes.get(key).map(|n| n.contains_key(value)).unwrap_or(false)
    }

    /// O(1) insert at the tail. Returns false if already present.
    pub fn push_back(&mut self, key: K, value: V) -> bool {
        if value == V::default() || self.contains(&key, &value) {
            return false;
        }
        let link = self.links.entry(key).or_default();
        let prev = link.last;
        if link.count == 0 {
            link.first = value;
        }
        link.last = value;
        link.count += 1;

        let nodes = self.nodes.entry(key).or_default();
        if prev != V::default() {
            if let Some(prev_node) = nodes.get_mut(&prev) {
                prev_node.next = value;
            }
        }
        nodes.insert(value, Node { prev, next: V::default() });
        true
    }

    /// O(1) removal given the node's neighbours. Returns false if absent.
    pub fn remove(&mut self, key: &K, value: &V) -> bool {
        let Some(nodes) = self.nodes.get_mut(key) else {
            return false;
        };
        let Some(node) = nodes.remove(value) else {
            return false;
        };
        if node.prev != V::default() {
            if let Some(p) = nodes.get_mut(&node.prev) {
                p.next = node.next;
            }
        }
        if node.next != V::default() {
            if let Some(n) = nodes.get_mut(&node.next) {
                n.prev = node.prev;
            }
        }
        if nodes.is_empty() {
            self.nodes.remove(key);
        }

        let mut emptied = false;
        if let Some(link) = self.links.get_mut(key) {
            if link.first == *value {
                link.first = node.next;
            }
            if link.last == *value {
                link.last = node.prev;
            }
            link.count -= 1;
            emptied = link.count == 0;
        }
        if emptied {
            self.links.remove(key);
        }
        true
    }

    /// Walk the list from head to tail.
    pub fn iter(&self, key: &K) -> Vec<V> {
        let mut out = Vec::new();
        let mut cursor = self.link(key).first;
        while cursor != V::default() {
            out.push(cursor);
            cursor = self.node(key, &cursor).next;
        }
        out
    }
}

impl<K: Ord + Copy, V: Ord + Copy + Default> Default for LinkedLists<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

/// Bookkeeping of accounts and their auths. Caller authentication (index-only
/// `init`, account-only `add_auth`/`remove_auth`) is enforced by the ledger.
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct ListRegistry {
    accounts: u64,
    account_id: BTreeMap<Address, AccountId>,
    account_addr: BTreeMap<AccountId, Address>,
    /// owner -> account ids
    user_lists: LinkedLists<Address, AccountId>,
    /// account id -> owners
    account_lists: LinkedLists<AccountId, Address>,
}

impl ListRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a freshly built account and hand out the next id.
    pub fn init(&mut self, account: Address) -> Result<AccountId> {
        if account.is_zero() || self.account_id.contains_key(&account) {
            return Err(LayerError::NotValidAddress);
        }
        self.accounts += 1;
        let id = self.accounts;
        self.account_id.insert(account, id);
        self.account_addr.insert(id, account);
        Ok(id)
    }

    pub fn add_auth(&mut self, id: AccountId, owner: Address) -> Result<()> {
        if owner.is_zero() {
            return Err(LayerError::NotValid);
        }
        if self.account_lists.contains(&id, &owner) {
            return Err(LayerError::AlreadyLinked);
        }
        self.account_lists.push_back(id, owner);
        self.user_lists.push_back(owner, id);
        Ok(())
    }

    pub fn remove_auth(&mut self, id: AccountId, owner: Address) -> Result<()> {
        if !self.account_lists.contains(&id, &owner) {
            return Err(LayerError::NotLinked);
        }
        if self.account_lists.link(&id).count <= 1 {
            return Err(LayerError::RemovingAllAuthorities);
        }
        self.account_lists.remove(&id, &owner);
        self.user_lists.remove(&owner, &id);
        Ok(())
    }

    pub fn accounts(&self) -> u64 {
        self.accounts
    }

    pub fn account_id(&self, account: &Address) -> AccountId {
        self.account_id.get(account).copied().unwrap_or(0)
    }

    pub fn account_addr(&self, id: AccountId) -> Address {
        self.account_addr.get(&id).copied().unwrap_or_default()
    }

    pub fn user_link(&self, owner: &Address) -> Link<AccountId> {
        self.user_lists.link(owner)
    }

    pub fn user_list(&self, owner: &Address, id: AccountId) -> Node<AccountId> {
        self.user_lists.node(owner, &id)
    }

    pub fn account_link(&self, id: AccountId) -> Link<Address> {
        self.account_lists.link(&id)
    }

    pub fn account_list(&self, id: AccountId, owner: &Address) -> Node<Address> {
        self.account_lists.node(&id, owner)
    }

    /// Account ids `owner` is linked to, in insertion order.
    pub fn accounts_of(&self, owner: &Address) -> Vec<AccountId> {
        self.user_lists.iter(owner)
    }

    /// Auth addresses of account `id`, in insertion order.
    pub fn auths_of(&self, id: AccountId) -> Vec<Address> {
        self.account_lists.iter(&id)
    }

    pub fn is_linked(&self, id: AccountId, owner: &Address) -> bool {
        self.account_lists.contains(&id, owner)
    }

    /// Both directions agree for every pair.
    pub fn is_symmetric(&self) -> bool {
        for id in self.account_addr.keys() {
            for owner in self.auths_of(*id) {
                if !self.user_lists.contains(&owner, id) {
                    return false;
                }
            }
        }
        for (owner, ids) in &self.user_lists.nodes {
            for id in ids.keys() {
                if !self.account_lists.contains(id, owner) {
                    return false;
                }
            }
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn addr(n: u8) -> Address {
        Address([n; 20])
    }

    #[test]
    fn test_push_and_remove_middle() {
        let mut lists: LinkedLists<u8, u64> = LinkedLists::new();
        assert!(lists.push_back(1, 10));
        assert!(lists.push_back(1, 20));
        assert!(lists.push_back(1, 30));
        assert!(!lists.push_back(1, 20));
        assert_eq!(lists.link(&1), Link { first: 10, last: 30, count: 3 });

        assert!(lists.remove(&1, &20));
        assert_eq!(lists.node(&1, &10), Node { prev: 0, next: 30 });
        assert_eq!(lists.node(&1, &30), Node { prev: 10, next: 0 });
        assert_eq!(lists.iter(&1), vec![10, 30]);

        assert!(lists.remove(&1, &10));
        assert!(lists.remove(&1, &30));
        assert_eq!(lists.link(&1), Link::default());
        assert!(!lists.remove(&1, &30));
    }

    #[test]
    fn test_init_assigns_sequential_ids() {
        let mut list = ListRegistry::new();
        assert_eq!(list.init(addr(1)).unwrap(), 1);
        assert_eq!(list.init(addr(2)).unwrap(), 2);
        assert!(list.init(addr(1)).is_err());
        assert_eq!(list.accounts(), 2);
        assert_eq!(list.account_id(&addr(2)), 2);
        assert_eq!(list.account_addr(1), addr(1));
        assert_eq!(list.account_id(&addr(9)), 0);
    }

    #[test]
    fn test_links_match_after_add_and_remove() {
        let mut list = ListRegistry::new();
        let a = list.init(addr(1)).unwrap();
        let b = list.init(addr(2)).unwrap();
        list.add_auth(a, addr(100)).unwrap();
        list.add_auth(b, addr(100)).unwrap();
        list.add_auth(a, addr(101)).unwrap();

        assert_eq!(list.user_link(&addr(100)), Link { first: a, last: b, count: 2 });
        assert_eq!(list.user_list(&addr(100), a), Node { prev: 0, next: b });
        assert_eq!(list.user_list(&addr(100), b), Node { prev: a, next: 0 });
        assert_eq!(
            list.account_link(a),
            Link { first: addr(100), last: addr(101), count: 2 }
        );
        assert_eq!(list.account_list(a, &addr(101)).prev, addr(100));

        assert_eq!(list.add_auth(a, addr(100)), Err(LayerError::AlreadyLinked));
        list.remove_auth(a, addr(100)).unwrap();
        assert_eq!(list.user_link(&addr(100)), Link { first: b, last: b, count: 1 });
        assert_eq!(list.account_link(a).first, addr(101));
        assert!(list.is_symmetric());
    }

    #[test]
    fn test_last_auth_cannot_be_removed() {
        let mut list = ListRegistry::new();
        let a = list.init(addr(1)).unwrap();
        list.add_auth(a, addr(100)).unwrap();
        assert_eq!(list.remove_auth(a, addr(100)), Err(LayerError::RemovingAllAuthorities));
        assert_eq!(list.remove_auth(a, addr(101)), Err(LayerError::NotLinked));
        assert_eq!(list.account_link(a).count, 1);
        assert!(list.is_linked(a, &addr(100)));
    }

    #[derive(Debug, Clone)]
    enum Op {
        Add(u8, u8),
        Remove(u8, u8),
    }

    fn op() -> impl Strategy<Value = Op> {
        prop_oneof![
            (1u8..5, 1u8..6).prop_map(|(a, o)| Op::Add(a, o)),
            (1u8..5, 1u8..6).prop_map(|(a, o)| Op::Remove(a, o)),
        ]
    }

    proptest! {
        #[test]
        fn prop_symmetry_holds_under_interleavings(ops in prop::collection::vec(op(), 0..64)) {
            let mut list = ListRegistry::new();
            for n in 1u8..5 {
                let id = list.init(addr(n)).unwrap();
                list.add_auth(id, addr(200)).unwrap();
            }
            for op in ops {
                let before = list.clone();
                let result = match op {
                    Op::Add(a, o) => list.add_auth(a as u64, addr(o)),
                    Op::Remove(a, o) => list.remove_auth(a as u64, addr(o)),
                };
                if result.is_err() {
                    // failed calls leave counts untouched
                    for id in 1u64..5 {
                        prop_assert_eq!(before.account_link(id), list.account_link(id));
                    }
                }
                prop_assert!(list.is_symmetric());
                for id in 1u64..5 {
                    let link = list.account_link(id);
                    prop_assert!(link.count >= 1);
                    prop_assert_eq!(link.count as usize, list.auths_of(id).len());
                }
            }
        }
    }
}

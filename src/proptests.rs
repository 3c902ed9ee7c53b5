use super::*;

use proptest::prelude::*;
use proptest_derive::Arbitrary;
use std::collections::{BTreeMap, BTreeSet};

/// Check every structural invariant reachable from the sentinel.
pub(crate) fn validate_trie<K, V>(t: &TrieMap<K, V>) {
    let root = &t.nodes[ROOT];
    assert!(root.key.is_none(), "sentinel must not carry a key");
    assert!(!root.has_value(), "sentinel must not hold a value");
    assert!(root.parent.is_null() && root.next.is_null() && root.prev.is_null());

    let mut stack = vec![ROOT];
    let mut node_count = 0usize;
    let mut value_count = 0usize;

    while let Some(id) = stack.pop() {
        let node = &t.nodes[id];
        if id != ROOT {
            node_count += 1;
            assert!(node.key.is_some(), "non-root node without key");
            assert!(
                node.has_children() || node.has_value(),
                "dead node left in the trie"
            );
        }
        if node.has_value() {
            value_count += 1;
            assert!(t.values.get(node.value).is_some(), "dangling value slot");
        }

        let mut children = 0usize;
        let mut prev = SlotId::NULL;
        let mut prev_count = usize::MAX;
        let mut cur = node.child;
        while !cur.is_null() {
            let child = &t.nodes[cur];
            assert_eq!(child.parent, id, "broken parent link");
            assert_eq!(child.prev, prev, "broken prev link");
            assert!(
                child.child_count <= prev_count,
                "siblings out of order: {} after {}",
                child.child_count,
                prev_count
            );
            prev_count = child.child_count;
            children += 1;
            stack.push(cur);
            prev = cur;
            cur = child.next;
        }
        assert_eq!(children, node.child_count, "stale child_count");
    }

    assert_eq!(node_count, t.node_count(), "unreachable nodes");
    assert_eq!(value_count, t.len(), "len must count live values");
}

fn matches(query: &[Token<u8>], path: &[u8]) -> bool {
    match query.split_first() {
        None => path.is_empty(),
        Some((Token::Key(k), rest)) => path.first() == Some(k) && matches(rest, &path[1..]),
        Some((Token::Single, rest)) => !path.is_empty() && matches(rest, &path[1..]),
        Some((Token::Multi, rest)) => (0..=path.len()).any(|i| matches(rest, &path[i..])),
    }
}

fn owned_path<V>(t: &TrieMap<u8, V>, h: Handle) -> Vec<u8> {
    t.path(h).into_iter().copied().collect()
}

#[derive(Clone, Debug)]
enum Op {
    Insert(Vec<u8>, u64),
    Erase(Vec<u8>),
    Find(Vec<u8>),
    EraseBegin,
    Clear,
}

#[derive(Clone, Debug, Arbitrary)]
enum QueryToken {
    #[proptest(weight = 3)]
    Key(#[proptest(strategy = "0u8..4")] u8),
    Single,
    Multi,
}

impl From<QueryToken> for Token<u8> {
    fn from(t: QueryToken) -> Self {
        match t {
            QueryToken::Key(k) => Token::Key(k),
            QueryToken::Single => Token::Single,
            QueryToken::Multi => Token::Multi,
        }
    }
}

fn path_strategy() -> impl Strategy<Value = Vec<u8>> + Clone {
    // A narrow alphabet keeps paths overlapping.
    prop::collection::vec(0u8..4, 1..=4)
}

fn ops_strategy() -> impl Strategy<Value = Vec<Op>> {
    let path = path_strategy();
    let op = prop_oneof![
        50 => (path.clone(), any::<u64>()).prop_map(|(p, v)| Op::Insert(p, v)),
        25 => path.clone().prop_map(Op::Erase),
        20 => path.clone().prop_map(Op::Find),
        4 => Just(Op::EraseBegin),
        1 => Just(Op::Clear),
    ];
    prop::collection::vec(op, 0..=1000)
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 256,
        max_shrink_iters: 50_000,
        .. ProptestConfig::default()
    })]

    #[test]
    fn prop_equivalence(ops in ops_strategy()) {
        let mut t: TrieMap<u8, u64> = TrieMap::new(Wildcards::none());
        let mut m: BTreeMap<Vec<u8>, u64> = BTreeMap::new();

        for op in ops {
            match op {
                Op::Insert(path, value) => {
                    let (h, inserted) = t.insert(path.clone(), value).unwrap();
                    prop_assert_eq!(owned_path(&t, h), path.clone());
                    prop_assert_eq!(inserted, m.insert(path, value).is_none());
                }
                Op::Erase(path) => {
                    let old_t = t.remove(&path);
                    let old_m = m.remove(&path);
                    prop_assert_eq!(old_t, old_m);
                    prop_assert!(t.find(&path).is_end());
                }
                Op::Find(path) => {
                    prop_assert_eq!(t.get_path(&path).copied(), m.get(&path).copied());
                }
                Op::EraseBegin => {
                    let h = t.begin();
                    if !h.is_end() {
                        let path = owned_path(&t, h);
                        let next = t.erase(h);
                        prop_assert!(m.remove(&path).is_some());
                        if !next.is_end() {
                            prop_assert!(m.contains_key(&owned_path(&t, next)));
                        }
                    }
                }
                Op::Clear => {
                    t.clear();
                    m.clear();
                }
            }

            prop_assert_eq!(t.len(), m.len());
        }

        validate_trie(&t);
        let mut got: Vec<(Vec<u8>, u64)> = t.iter().map(|(h, v)| (owned_path(&t, h), *v)).collect();
        got.sort();
        let expected: Vec<(Vec<u8>, u64)> = m.into_iter().collect();
        prop_assert_eq!(got, expected);
    }

    #[test]
    fn prop_query_matches_oracle(
        paths in prop::collection::vec(path_strategy(), 0..=60),
        query in prop::collection::vec(any::<QueryToken>(), 0..=5),
    ) {
        let mut t: TrieMap<u8, usize> = TrieMap::new(Wildcards::none());
        for (i, p) in paths.iter().enumerate() {
            t.insert(p.iter().copied(), i).unwrap();
        }
        let query: Vec<Token<u8>> = query.into_iter().map(Token::from).collect();

        let mut hits = Vec::new();
        t.finds_tokens(query.iter().cloned(), |h| hits.push(h));

        let got: BTreeSet<Vec<u8>> = hits.iter().map(|&h| owned_path(&t, h)).collect();
        let expected: BTreeSet<Vec<u8>> = paths
            .iter()
            .filter(|p| matches(&query, p))
            .cloned()
            .collect();
        prop_assert_eq!(&got, &expected);

        if !query.contains(&Token::Multi) {
            prop_assert_eq!(hits.len(), got.len(), "duplicates without a multi wildcard");
        }
    }
}

fn for_each_permutation<T: Clone>(items: &[T], mut f: impl FnMut(Vec<T>)) {
    fn rec<T: Clone>(items: &[T], used: &mut [bool], out: &mut Vec<T>, f: &mut impl FnMut(Vec<T>)) {
        if out.len() == items.len() {
            f(out.clone());
            return;
        }
        for i in 0..items.len() {
            if used[i] {
                continue;
            }
            used[i] = true;
            out.push(items[i].clone());
            rec(items, used, out, f);
            out.pop();
            used[i] = false;
        }
    }

    let mut used = vec![false; items.len()];
    let mut out = Vec::with_capacity(items.len());
    rec(items, &mut used, &mut out, &mut f);
}

fn small_set() -> Vec<Vec<u8>> {
    vec![
        vec![0],
        vec![1],
        vec![0, 0],
        vec![0, 1],
        vec![0, 1, 2],
        vec![2, 0],
    ]
}

#[test]
fn exhaustive_insert_order_small_set() {
    let paths = small_set();

    for_each_permutation(&paths, |perm| {
        let mut t: TrieMap<u8, u64> = TrieMap::new(Wildcards::none());
        let mut m: BTreeMap<Vec<u8>, u64> = BTreeMap::new();

        for (i, p) in perm.into_iter().enumerate() {
            let v = i as u64;
            let inserted = t.insert(p.clone(), v).unwrap().1;
            assert_eq!(inserted, m.insert(p, v).is_none());
            validate_trie(&t);
        }

        let mut got: Vec<(Vec<u8>, u64)> = t.iter().map(|(h, v)| (owned_path(&t, h), *v)).collect();
        got.sort();
        let expected: Vec<(Vec<u8>, u64)> = m.into_iter().collect();
        assert_eq!(got, expected);
    });
}

#[test]
fn exhaustive_erase_order_small_set() {
    let paths = small_set();

    // Insert in a fixed order, then erase in all permutations.
    let mut base: TrieMap<u8, u64> = TrieMap::new(Wildcards::none());
    for (i, p) in paths.iter().enumerate() {
        base.insert(p.iter().copied(), i as u64).unwrap();
    }

    for_each_permutation(&paths, |perm| {
        let mut t = base.clone();
        let mut remaining = paths.len();

        for p in perm {
            assert!(!t.find(&p).is_end());
            t.erase_path(&p);
            remaining -= 1;
            assert!(t.find(&p).is_end());
            assert_eq!(t.len(), remaining);
            validate_trie(&t);
        }
        assert_eq!(t.len(), 0);
        assert_eq!(t.node_count(), 0);
        assert!(t.begin().is_end());
    });
}

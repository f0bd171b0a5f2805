//! Streaming group-by over key-contiguous input.
//!
//! The shuffle stage guarantees that all records with one key arrive as a
//! single contiguous run. [`Grouper`] detects run boundaries by comparing
//! each key with the current group's key, so memory is bounded by the
//! largest group rather than the whole input.
//!
//! States and transitions:
//!
//! ```text
//! NoGroup          --push(k, v)--> InGroup(k, [v])
//! InGroup(k, vs)   --push(k, v)--> InGroup(k, vs + v)
//! InGroup(k, vs)   --push(j, v)--> InGroup(j, [v])     emits Group(k, vs)
//! InGroup(k, vs)   --finish---->   NoGroup             emits Group(k, vs)
//! NoGroup          --finish---->   NoGroup
//! ```

use std::mem;

/// One completed run of records sharing a key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Group<K, V> {
    pub key: K,
    pub members: Vec<V>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GroupState<K, V> {
    NoGroup,
    InGroup { key: K, members: Vec<V> },
}

/// Group-by state machine fed one record at a time.
#[derive(Debug, Clone)]
pub struct Grouper<K, V> {
    state: GroupState<K, V>,
}

impl<K: PartialEq, V> Grouper<K, V> {
    pub fn new() -> Self {
        Self {
            state: GroupState::NoGroup,
        }
    }

    pub fn state(&self) -> &GroupState<K, V> {
        &self.state
    }

    /// Add a record. Returns the previous group when `key` starts a new run.
    pub fn push(&mut self, key: K, value: V) -> Option<Group<K, V>> {
        if let GroupState::InGroup {
            key: current,
            members,
        } = &mut self.state
        {
            if *current == key {
                members.push(value);
                return None;
            }
        }
        let next = GroupState::InGroup {
            key,
            members: vec![value],
        };
        Self::close(mem::replace(&mut self.state, next))
    }

    /// Flush the open group at end of input.
    pub fn finish(&mut self) -> Option<Group<K, V>> {
        Self::close(mem::replace(&mut self.state, GroupState::NoGroup))
    }

    fn close(state: GroupState<K, V>) -> Option<Group<K, V>> {
        match state {
            GroupState::NoGroup => None,
            GroupState::InGroup { key, members } => Some(Group { key, members }),
        }
    }
}

impl<K: PartialEq, V> Default for Grouper<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

/// Iterator adapter yielding one [`Group`] per contiguous key run.
pub struct Groups<I, K, V> {
    inner: I,
    grouper: Grouper<K, V>,
    done: bool,
}

impl<I, K, V> Iterator for Groups<I, K, V>
where
    I: Iterator<Item = (K, V)>,
    K: PartialEq,
{
    type Item = Group<K, V>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        for (key, value) in self.inner.by_ref() {
            if let Some(group) = self.grouper.push(key, value) {
                return Some(group);
            }
        }
        self.done = true;
        self.grouper.finish()
    }
}

/// Group a key-contiguous stream of `(key, value)` pairs.
pub fn group_contiguous<I, K, V>(records: I) -> Groups<I::IntoIter, K, V>
where
    I: IntoIterator<Item = (K, V)>,
    K: PartialEq,
{
    Groups {
        inner: records.into_iter(),
        grouper: Grouper::new(),
        done: false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_input_yields_no_groups() {
        let groups: Vec<Group<u32, char>> = group_contiguous(Vec::<(u32, char)>::new()).collect();
        assert!(groups.is_empty());

        let mut grouper: Grouper<u32, char> = Grouper::new();
        assert!(grouper.finish().is_none());
        assert_eq!(grouper.state(), &GroupState::NoGroup);
    }

    #[test]
    fn runs_become_groups() {
        let input = vec![(1, 'a'), (1, 'b'), (2, 'c'), (3, 'd'), (3, 'e'), (3, 'f')];
        let groups: Vec<_> = group_contiguous(input).collect();
        assert_eq!(
            groups,
            vec![
                Group {
                    key: 1,
                    members: vec!['a', 'b']
                },
                Group {
                    key: 2,
                    members: vec!['c']
                },
                Group {
                    key: 3,
                    members: vec!['d', 'e', 'f']
                },
            ]
        );
    }

    #[test]
    fn final_group_is_flushed() {
        let mut grouper = Grouper::new();
        assert!(grouper.push("k1", 1).is_none());
        assert!(grouper.push("k1", 2).is_none());
        let flushed = grouper.push("k2", 3).unwrap();
        assert_eq!(flushed.key, "k1");
        assert_eq!(flushed.members, vec![1, 2]);

        let last = grouper.finish().unwrap();
        assert_eq!(last.key, "k2");
        assert_eq!(last.members, vec![3]);
        assert!(grouper.finish().is_none());
    }

    #[test]
    fn single_record_input_is_one_group() {
        let groups: Vec<_> = group_contiguous(vec![(7, "x")]).collect();
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].members, vec!["x"]);
    }

    #[test]
    fn non_contiguous_repeat_starts_a_new_group() {
        // Keys are only compared with the open group, never remembered.
        let groups: Vec<_> = group_contiguous(vec![(1, 'a'), (2, 'b'), (1, 'c')]).collect();
        assert_eq!(groups.len(), 3);
        assert_eq!(groups[2].key, 1);
        assert_eq!(groups[2].members, vec!['c']);
    }

    #[test]
    fn iterator_is_fused_after_exhaustion() {
        let mut groups = group_contiguous(vec![(1, 'a')]);
        assert!(groups.next().is_some());
        assert!(groups.next().is_none());
        assert!(groups.next().is_none());
    }
}

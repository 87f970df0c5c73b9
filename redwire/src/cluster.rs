//! Cluster slot hashing and topology bookkeeping.
//!
//! Keys hash into one of 16384 slots via CRC16/XMODEM, honoring `{...}` hash
//! tags. The slot table is kept as a sorted vector of ranges (the shape
//! CLUSTER SLOTS reports) and looked up by binary search; a MOVED redirect
//! patches the table by splitting the affected range.

use crc16::{State, XMODEM};
use redwire_core::{Error, NodeAddr, Result, SlotRange, Value};

/// Number of hash slots in a cluster.
pub const SLOT_COUNT: u16 = 16384;

/// Hash slot for a key.
///
/// When the key contains a `{...}` section with at least one character, only
/// that section is hashed, so related keys can be pinned to one slot.
#[must_use]
pub fn key_slot(key: &[u8]) -> u16 {
    State::<XMODEM>::calculate(hash_tag(key)) % SLOT_COUNT
}

fn hash_tag(key: &[u8]) -> &[u8] {
    if let Some(open) = key.iter().position(|&b| b == b'{') {
        if let Some(close) = key[open + 1..].iter().position(|&b| b == b'}') {
            if close > 0 {
                return &key[open + 1..open + 1 + close];
            }
        }
    }
    key
}

/// One contiguous range of slots and the node serving it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlotAssignment {
    /// Slots covered.
    pub range: SlotRange,
    /// Primary serving the range.
    pub primary: NodeAddr,
}

/// The slot table: sorted, non-overlapping assignments.
#[derive(Debug, Clone, Default)]
pub struct SlotMap {
    assignments: Vec<SlotAssignment>,
}

impl SlotMap {
    /// An empty table; every lookup misses.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of assignments (not slots).
    #[must_use]
    pub fn len(&self) -> usize {
        self.assignments.len()
    }

    /// Whether the table has no assignments.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.assignments.is_empty()
    }

    /// Node serving the given slot, if known.
    #[must_use]
    pub fn lookup(&self, slot: u16) -> Option<&NodeAddr> {
        self.position(slot).map(|i| &self.assignments[i].primary)
    }

    fn position(&self, slot: u16) -> Option<usize> {
        self.assignments
            .binary_search_by(|a| {
                if a.range.end < slot {
                    std::cmp::Ordering::Less
                } else if a.range.start > slot {
                    std::cmp::Ordering::Greater
                } else {
                    std::cmp::Ordering::Equal
                }
            })
            .ok()
    }

    /// All distinct nodes currently referenced by the table.
    #[must_use]
    pub fn nodes(&self) -> Vec<NodeAddr> {
        let mut nodes: Vec<NodeAddr> = Vec::new();
        for assignment in &self.assignments {
            if !nodes.contains(&assignment.primary) {
                nodes.push(assignment.primary.clone());
            }
        }
        nodes
    }

    /// Patch the table after a MOVED redirect: `slot` is now served by
    /// `addr`. The containing range is split so neighbours keep their owner.
    pub fn apply_moved(&mut self, slot: u16, addr: NodeAddr) {
        match self.position(slot) {
            Some(i) => {
                let current = self.assignments[i].clone();
                if current.primary == addr {
                    return;
                }

                let mut replacement = Vec::with_capacity(3);
                if current.range.start < slot {
                    replacement.push(SlotAssignment {
                        range: SlotRange::new(current.range.start, slot - 1),
                        primary: current.primary.clone(),
                    });
                }
                replacement.push(SlotAssignment {
                    range: SlotRange::new(slot, slot),
                    primary: addr,
                });
                if slot < current.range.end {
                    replacement.push(SlotAssignment {
                        range: SlotRange::new(slot + 1, current.range.end),
                        primary: current.primary,
                    });
                }
                self.assignments.splice(i..=i, replacement);
            }
            None => {
                let at = self
                    .assignments
                    .partition_point(|a| a.range.end < slot);
                self.assignments.insert(
                    at,
                    SlotAssignment {
                        range: SlotRange::new(slot, slot),
                        primary: addr,
                    },
                );
            }
        }
    }

    /// Build a table from a CLUSTER SLOTS reply.
    ///
    /// Each entry is `[start, end, [primary-host, primary-port, ...],
    /// replicas...]`; replicas are ignored, commands go to primaries.
    ///
    /// # Errors
    ///
    /// Fails when the reply does not have the documented shape.
    pub fn from_cluster_slots(reply: Value) -> Result<Self> {
        let entries = reply.into_items()?;
        let mut assignments = Vec::with_capacity(entries.len());

        for entry in entries {
            let mut fields = entry.into_items()?.into_iter();
            let (Some(start), Some(end), Some(primary)) =
                (fields.next(), fields.next(), fields.next())
            else {
                return Err(Error::Cluster(
                    "CLUSTER SLOTS entry is missing fields".to_string(),
                ));
            };

            let start = u16::try_from(start.as_int()?)
                .map_err(|_| Error::Cluster("slot out of range".to_string()))?;
            let end = u16::try_from(end.as_int()?)
                .map_err(|_| Error::Cluster("slot out of range".to_string()))?;

            let mut node = primary.into_items()?.into_iter();
            let (Some(host), Some(port)) = (node.next(), node.next()) else {
                return Err(Error::Cluster(
                    "CLUSTER SLOTS node entry is missing fields".to_string(),
                ));
            };
            let host = host.into_string()?;
            let port = u16::try_from(port.as_int()?)
                .map_err(|_| Error::Cluster("port out of range".to_string()))?;

            assignments.push(SlotAssignment {
                range: SlotRange::new(start, end),
                primary: NodeAddr::new(host, port),
            });
        }

        assignments.sort_by_key(|a| a.range.start);
        Ok(Self { assignments })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_slot_vectors() {
        // Vectors checked against `redis-cli cluster keyslot`.
        assert_eq!(key_slot(b"123456789"), 12739);
        assert_eq!(key_slot(b"foobar"), 12325);
        assert!(key_slot(b"anything") < SLOT_COUNT);
    }

    #[test]
    fn hash_tags_pin_related_keys() {
        assert_eq!(
            key_slot(b"{user1000}.following"),
            key_slot(b"{user1000}.followers")
        );
        assert_eq!(key_slot(b"{tag}"), key_slot(b"prefix{tag}suffix"));
    }

    #[test]
    fn hash_tag_extraction_edges() {
        assert_eq!(hash_tag(b"plain"), b"plain");
        assert_eq!(hash_tag(b"{user}key"), b"user");
        assert_eq!(hash_tag(b"pre{user}key"), b"user");
        // Empty tag and unclosed brace fall back to the whole key.
        assert_eq!(hash_tag(b"{}key"), b"{}key");
        assert_eq!(hash_tag(b"{open"), b"{open");
        // Only the first tag counts.
        assert_eq!(hash_tag(b"{a}{b}"), b"a");
    }

    fn addr(port: u16) -> NodeAddr {
        NodeAddr::new("10.0.0.1", port)
    }

    fn table() -> SlotMap {
        let mut map = SlotMap::new();
        map.assignments = vec![
            SlotAssignment {
                range: SlotRange::new(0, 5460),
                primary: addr(7000),
            },
            SlotAssignment {
                range: SlotRange::new(5461, 10922),
                primary: addr(7001),
            },
            SlotAssignment {
                range: SlotRange::new(10923, 16383),
                primary: addr(7002),
            },
        ];
        map
    }

    #[test]
    fn lookup_hits_the_right_range() {
        let map = table();
        assert_eq!(map.lookup(0), Some(&addr(7000)));
        assert_eq!(map.lookup(5461), Some(&addr(7001)));
        assert_eq!(map.lookup(16383), Some(&addr(7002)));
        assert_eq!(SlotMap::new().lookup(5), None);
    }

    #[test]
    fn moved_splits_the_containing_range() {
        let mut map = table();
        map.apply_moved(6000, addr(7009));

        assert_eq!(map.lookup(5999), Some(&addr(7001)));
        assert_eq!(map.lookup(6000), Some(&addr(7009)));
        assert_eq!(map.lookup(6001), Some(&addr(7001)));
        assert_eq!(map.len(), 5);
    }

    #[test]
    fn moved_at_range_edges_keeps_neighbours() {
        let mut map = table();
        map.apply_moved(0, addr(7009));
        assert_eq!(map.lookup(0), Some(&addr(7009)));
        assert_eq!(map.lookup(1), Some(&addr(7000)));

        map.apply_moved(16383, addr(7010));
        assert_eq!(map.lookup(16383), Some(&addr(7010)));
        assert_eq!(map.lookup(16382), Some(&addr(7002)));
    }

    #[test]
    fn moved_to_same_owner_is_a_no_op() {
        let mut map = table();
        map.apply_moved(100, addr(7000));
        assert_eq!(map.len(), 3);
    }

    #[test]
    fn moved_into_an_uncovered_slot_inserts() {
        let mut map = SlotMap::new();
        map.apply_moved(7, addr(7000));
        map.apply_moved(3, addr(7001));
        assert_eq!(map.lookup(7), Some(&addr(7000)));
        assert_eq!(map.lookup(3), Some(&addr(7001)));
        assert_eq!(map.lookup(5), None);
    }

    #[test]
    fn parses_cluster_slots_reply() {
        let reply = Value::Array(vec![
            Value::Array(vec![
                Value::Int(5461),
                Value::Int(10922),
                Value::Array(vec![Value::from("10.0.0.2"), Value::Int(7001)]),
            ]),
            Value::Array(vec![
                Value::Int(0),
                Value::Int(5460),
                Value::Array(vec![
                    Value::from("10.0.0.1"),
                    Value::Int(7000),
                    Value::from("nodeid-ignored"),
                ]),
                // A replica entry, ignored.
                Value::Array(vec![Value::from("10.0.0.9"), Value::Int(7100)]),
            ]),
        ]);

        let map = SlotMap::from_cluster_slots(reply).unwrap();
        assert_eq!(map.len(), 2);
        assert_eq!(map.lookup(42), Some(&NodeAddr::new("10.0.0.1", 7000)));
        assert_eq!(map.lookup(6000), Some(&NodeAddr::new("10.0.0.2", 7001)));
        assert_eq!(map.nodes().len(), 2);
    }

    #[test]
    fn malformed_cluster_slots_is_rejected() {
        let reply = Value::Array(vec![Value::Array(vec![Value::Int(0)])]);
        assert!(SlotMap::from_cluster_slots(reply).is_err());
    }
}

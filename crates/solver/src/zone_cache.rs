//! LRU cache of zone packings.
//!
//! The hybrid search packs the same zone sizes with the same part shapes
//! over and over, only with different instance ids. Entries are keyed by
//! zone size, kerf and a digest of the shape multiset, and store the layout
//! per canonical slot so a hit can be relabeled onto the new instances.
//!
//! The cache is an ordinary owned value: the caller creates it and passes it
//! to the search, there is no process-wide instance.

use std::collections::{HashMap, VecDeque};
use u_panelcut_core::{CutSegment, Mm, PartInstance, Placement, Result};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Default number of cached zone packings.
pub const DEFAULT_CACHE_CAPACITY: usize = 256;

const FNV1A_OFFSET: u64 = 0xcbf29ce484222325;
const FNV1A_PRIME: u64 = 0x100000001b3;

#[inline]
fn fnv1a_hash_bytes(hash: &mut u64, bytes: &[u8]) {
    for byte in bytes {
        *hash ^= u64::from(*byte);
        *hash = hash.wrapping_mul(FNV1A_PRIME);
    }
}

/// Shape of a part with rotatable parts normalized to `(min, max)`.
type ShapeKey = (Mm, Mm, bool);

fn shape_key(part: &PartInstance) -> ShapeKey {
    if part.can_rotate {
        (part.w.min(part.h), part.w.max(part.h), true)
    } else {
        (part.w, part.h, false)
    }
}

/// Indices of `parts` in canonical order (by shape, then input position).
fn canonical_order(parts: &[PartInstance]) -> Vec<usize> {
    let mut order: Vec<usize> = (0..parts.len()).collect();
    order.sort_by_key(|&i| (shape_key(&parts[i]), i));
    order
}

/// Zone packing in zone-local coordinates (sheet index 0).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ZonePack {
    pub placements: Vec<Placement>,
    pub cuts: Vec<CutSegment>,
    /// Candidates that were not placed, in input order.
    pub remaining: Vec<PartInstance>,
}

impl ZonePack {
    pub fn placed_area(&self) -> Mm {
        self.placements.iter().map(Placement::area).sum()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct CacheKey {
    w: Mm,
    h: Mm,
    kerf: Mm,
    signature: u64,
}

/// Footprint of one canonical slot.
#[derive(Debug, Clone, Copy)]
struct SlotFootprint {
    x: Mm,
    y: Mm,
    w: Mm,
    h: Mm,
}

#[derive(Debug, Clone)]
struct CacheEntry {
    shapes: Vec<ShapeKey>,
    slots: Vec<Option<SlotFootprint>>,
    cuts: Vec<CutSegment>,
}

/// Hit/miss counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub entries: usize,
    pub capacity: usize,
}

/// Bounded least-recently-used cache of zone packings.
#[derive(Debug, Clone)]
pub struct ZonePackCache {
    capacity: usize,
    entries: HashMap<CacheKey, CacheEntry>,
    /// Least recently used first.
    order: VecDeque<CacheKey>,
    hits: u64,
    misses: u64,
}

impl Default for ZonePackCache {
    fn default() -> Self {
        Self::new(DEFAULT_CACHE_CAPACITY)
    }
}

impl ZonePackCache {
    /// Creates a cache holding at most `capacity` packings (0 disables storing).
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            entries: HashMap::new(),
            order: VecDeque::new(),
            hits: 0,
            misses: 0,
        }
    }

    /// Order independent digest of the shape multiset of `parts`.
    pub fn signature(parts: &[PartInstance]) -> u64 {
        let mut shapes: Vec<ShapeKey> = parts.iter().map(shape_key).collect();
        shapes.sort_unstable();
        let mut hash = FNV1A_OFFSET;
        fnv1a_hash_bytes(&mut hash, &(shapes.len() as u64).to_le_bytes());
        for (a, b, rot) in shapes {
            fnv1a_hash_bytes(&mut hash, &a.to_le_bytes());
            fnv1a_hash_bytes(&mut hash, &b.to_le_bytes());
            fnv1a_hash_bytes(&mut hash, &[u8::from(rot)]);
        }
        hash
    }

    fn key(w: Mm, h: Mm, kerf: Mm, parts: &[PartInstance]) -> CacheKey {
        CacheKey {
            w,
            h,
            kerf,
            signature: Self::signature(parts),
        }
    }

    fn touch(&mut self, key: CacheKey) {
        if let Some(pos) = self.order.iter().position(|k| *k == key) {
            self.order.remove(pos);
        }
        self.order.push_back(key);
    }

    /// Looks up a packing of `parts` into a `w` x `h` zone, relabeled onto `parts`.
    pub fn get(&mut self, w: Mm, h: Mm, kerf: Mm, parts: &[PartInstance]) -> Option<ZonePack> {
        let key = Self::key(w, h, kerf, parts);
        let order = canonical_order(parts);
        let hit = match self.entries.get(&key) {
            Some(entry) if order.iter().map(|&i| shape_key(&parts[i])).eq(entry.shapes.iter().copied()) => {
                Some(relabel(entry, parts, &order))
            }
            _ => None,
        };
        match hit {
            Some(pack) => {
                self.hits += 1;
                self.touch(key);
                Some(pack)
            }
            None => {
                self.misses += 1;
                None
            }
        }
    }

    /// Stores a packing of `parts`, evicting the least recently used entry if full.
    pub fn put(&mut self, w: Mm, h: Mm, kerf: Mm, parts: &[PartInstance], pack: &ZonePack) {
        if self.capacity == 0 {
            return;
        }
        let key = Self::key(w, h, kerf, parts);
        let order = canonical_order(parts);

        let by_id: HashMap<&str, &Placement> = pack
            .placements
            .iter()
            .map(|p| (p.part_id.as_str(), p))
            .collect();
        let entry = CacheEntry {
            shapes: order.iter().map(|&i| shape_key(&parts[i])).collect(),
            slots: order
                .iter()
                .map(|&i| {
                    by_id.get(parts[i].id.as_str()).map(|p| SlotFootprint {
                        x: p.x,
                        y: p.y,
                        w: p.w,
                        h: p.h,
                    })
                })
                .collect(),
            cuts: pack.cuts.clone(),
        };

        self.entries.insert(key, entry);
        self.touch(key);
        while self.order.len() > self.capacity {
            if let Some(old) = self.order.pop_front() {
                self.entries.remove(&old);
            }
        }
    }

    /// Returns the cached packing or computes, stores and returns it.
    pub fn get_or_pack<F>(&mut self, w: Mm, h: Mm, kerf: Mm, parts: &[PartInstance], pack: F) -> Result<ZonePack>
    where
        F: FnOnce(&[PartInstance]) -> Result<ZonePack>,
    {
        if let Some(hit) = self.get(w, h, kerf, parts) {
            log::trace!("zone cache hit {}x{} ({} parts)", w, h, parts.len());
            return Ok(hit);
        }
        let result = pack(parts)?;
        self.put(w, h, kerf, parts, &result);
        Ok(result)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.order.clear();
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits,
            misses: self.misses,
            entries: self.entries.len(),
            capacity: self.capacity,
        }
    }
}

fn relabel(entry: &CacheEntry, parts: &[PartInstance], order: &[usize]) -> ZonePack {
    let mut placed = vec![false; parts.len()];
    let mut placements = Vec::new();
    for (slot, &i) in entry.slots.iter().zip(order) {
        if let Some(f) = slot {
            let part = &parts[i];
            placed[i] = true;
            placements.push(Placement::new(
                0,
                part.id.clone(),
                f.x,
                f.y,
                f.w,
                f.h,
                (f.w, f.h) != (part.w, part.h),
            ));
        }
    }
    let remaining = parts
        .iter()
        .zip(&placed)
        .filter(|(_, placed)| !**placed)
        .map(|(p, _)| p.clone())
        .collect();
    ZonePack {
        placements,
        cuts: entry.cuts.clone(),
        remaining,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn part(id: &str, w: Mm, h: Mm, rot: bool) -> PartInstance {
        PartInstance::new(id, w, h, rot)
    }

    fn pack_first(parts: &[PartInstance]) -> Result<ZonePack> {
        let p = &parts[0];
        Ok(ZonePack {
            placements: vec![Placement::new(0, p.id.clone(), 0, 0, p.h, p.w, p.can_turn())],
            cuts: Vec::new(),
            remaining: parts[1..].to_vec(),
        })
    }

    #[test]
    fn test_signature_ignores_ids_and_order() {
        let a = vec![part("a#1", 100, 200, true), part("b#1", 50, 50, false)];
        let b = vec![part("x#9", 50, 50, false), part("y#3", 200, 100, true)];
        assert_eq!(ZonePackCache::signature(&a), ZonePackCache::signature(&b));

        // Fixed parts keep their orientation in the signature.
        let c = vec![part("a#1", 100, 200, false)];
        let d = vec![part("a#1", 200, 100, false)];
        assert_ne!(ZonePackCache::signature(&c), ZonePackCache::signature(&d));
    }

    #[test]
    fn test_hit_relabels_onto_new_instances() {
        let mut cache = ZonePackCache::new(4);
        let first = vec![part("side#1", 300, 900, true), part("top#1", 400, 100, true)];
        let packed = cache.get_or_pack(1000, 500, 3, &first, pack_first).unwrap();
        assert_eq!(packed.placements[0].part_id, "side#1");
        assert!(packed.placements[0].rotated);

        let second = vec![part("top#2", 100, 400, true), part("side#2", 300, 900, true)];
        let hit = cache
            .get_or_pack(1000, 500, 3, &second, |_| panic!("should hit"))
            .unwrap();
        assert_eq!(hit.placements.len(), 1);
        let p = &hit.placements[0];
        assert_eq!(p.part_id, "side#2");
        assert_eq!((p.x, p.y, p.w, p.h), (0, 0, 900, 300));
        assert!(p.rotated);
        assert_eq!(hit.remaining, vec![second[0].clone()]);
        assert_eq!(cache.stats().hits, 1);
        assert_eq!(cache.stats().misses, 1);
    }

    #[test]
    fn test_rotated_flag_recomputed_per_instance() {
        let mut cache = ZonePackCache::new(4);
        let first = vec![part("a#1", 300, 900, true)];
        cache.get_or_pack(1000, 500, 3, &first, pack_first).unwrap();
        // Same shape given the other way round: the stored 900x300 is its own orientation.
        let second = vec![part("b#1", 900, 300, true)];
        let hit = cache.get(1000, 500, 3, &second).unwrap();
        assert!(!hit.placements[0].rotated);
    }

    #[test]
    fn test_key_includes_zone_and_kerf() {
        let mut cache = ZonePackCache::new(4);
        let parts = vec![part("a#1", 100, 100, true)];
        cache.get_or_pack(1000, 500, 3, &parts, pack_first).unwrap();
        assert!(cache.get(1000, 500, 4, &parts).is_none());
        assert!(cache.get(1000, 501, 3, &parts).is_none());
        assert!(cache.get(1000, 500, 3, &parts).is_some());
    }

    #[test]
    fn test_lru_eviction() {
        let mut cache = ZonePackCache::new(2);
        let parts = vec![part("a#1", 100, 100, true)];
        cache.get_or_pack(100, 100, 0, &parts, pack_first).unwrap();
        cache.get_or_pack(200, 200, 0, &parts, pack_first).unwrap();
        // Touch the oldest so the second one is evicted.
        assert!(cache.get(100, 100, 0, &parts).is_some());
        cache.get_or_pack(300, 300, 0, &parts, pack_first).unwrap();
        assert_eq!(cache.len(), 2);
        assert!(cache.get(100, 100, 0, &parts).is_some());
        assert!(cache.get(200, 200, 0, &parts).is_none());
    }

    #[test]
    fn test_zero_capacity_never_stores() {
        let mut cache = ZonePackCache::new(0);
        let parts = vec![part("a#1", 100, 100, true)];
        cache.get_or_pack(100, 100, 0, &parts, pack_first).unwrap();
        assert!(cache.is_empty());
    }
}

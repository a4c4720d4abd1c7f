//! Classify untagged encodings against a set of candidate layouts.
//!
//! A [Discriminator] is built once from N layouts using only what their schemas guarantee about
//! every encoding: the range of possible lengths and the bytes that are constant at a known
//! offset. Candidate sets are [Bitset]s over layout indices.
//!
//! # Construction
//!
//! Every byte position carrying constants, and the encoded length itself, is rated by its
//! _power_: the number of candidates it is guaranteed to eliminate whatever the observed value.
//! A byte (or the length) eliminating all but one candidate is used directly. Otherwise a
//! strategy is chosen greedily for the full set (bytes win ties against the length), the set is
//! partitioned by the possible outcomes and each part is solved the same way. Strategies are
//! memoized by exact candidate set. A set of two or more candidates that nothing can split is
//! _indistinguishable_.
//!
//! # Classification
//!
//! Starting from the full set, the strategy stored for the current set is applied until at most
//! one candidate remains. Elimination can reach sets that construction never visited, in which
//! case the strategy of the smallest known superset that still narrows the set is used.
//! Candidates whose length bounds exclude the buffer length are removed last.
//!
//! # Example
//!
//! ```
//! use binlayout_codec::{serialize, Discriminator, Field, Item, Layout, Value};
//!
//! let layouts: Vec<Layout> = (1u8..=3)
//!     .map(|magic| {
//!         Layout::fields([
//!             Field::omitted("magic", Item::uint(1).fixed(magic)),
//!             Field::new("body", Item::bytes(magic as usize)),
//!         ])
//!     })
//!     .collect();
//! let discriminator = Discriminator::new(&layouts, false).unwrap();
//!
//! let encoded = serialize(&layouts[1], &Value::object().with("body", vec![0u8; 2])).unwrap();
//! assert_eq!(discriminator.discriminate(&encoded), Some(1));
//! assert_eq!(discriminator.discriminate(&[]), None);
//! ```

use crate::{Error, Layout, ResultExt};
use binlayout_utils::Bitset;
use std::collections::{BTreeMap, HashMap};
use tracing::{debug, trace, warn};

mod meta;
pub use meta::Bounds;
use meta::{layout_meta, FixedBytes};

/// How to narrow a candidate set.
#[derive(Clone, Debug, PartialEq, Eq)]
enum Strategy {
    /// Inspect the byte at `pos`.
    Byte {
        pos: usize,
        /// Candidates that may end at or before `pos`.
        short: Bitset,
        /// Candidates that always end at or before `pos`.
        absent: Bitset,
        /// Candidates expecting each constant at `pos`, in order of first appearance.
        values: Vec<(u8, Bitset)>,
    },
    /// Compare the encoded length against the candidates' bounds.
    Size,
    /// Nothing splits the set.
    Indistinguishable,
}

/// A byte position rated against a candidate set.
#[derive(Clone)]
struct ByteRating {
    power: usize,
    pos: usize,
    short: Bitset,
    absent: Bitset,
    values: Vec<(u8, Bitset)>,
    /// Candidates long enough to reach `pos` but without a constant there.
    any: Bitset,
}

impl ByteRating {
    fn strategy(&self) -> Strategy {
        Strategy::Byte {
            pos: self.pos,
            short: self.short.clone(),
            absent: self.absent.clone(),
            values: self.values.clone(),
        }
    }
}

/// Minimum over the observable values at a position of the candidates eliminated by it.
fn worst_case(values: &[(u8, Bitset)], absent: &Bitset) -> Option<usize> {
    let fixed: usize = values.iter().map(|(_, set)| set.count()).sum();
    values
        .iter()
        .map(|(_, set)| fixed - set.count() + absent.count())
        .min()
}

/// Builds a [Discriminator] for `layouts`.
pub fn build_discriminator(
    layouts: &[Layout],
    allow_ambiguous: bool,
) -> Result<Discriminator, Error> {
    Discriminator::new(layouts, allow_ambiguous)
}

/// Decision procedure mapping an encoding to the layouts it may conform to.
#[derive(Clone, Debug)]
pub struct Discriminator {
    all: Bitset,
    bounds: Vec<Bounds>,
    sizes: BTreeMap<usize, Bitset>,
    strategies: HashMap<Bitset, Strategy>,
    by_count: HashMap<usize, Vec<Bitset>>,
    distinguishing: bool,
}

impl Discriminator {
    /// Builds a discriminator over `layouts`.
    ///
    /// Fails with [Error::AmbiguousLayoutSet] if some encodings cannot be attributed to a single
    /// layout, unless `allow_ambiguous` is set.
    pub fn new(layouts: &[Layout], allow_ambiguous: bool) -> Result<Self, Error> {
        if layouts.is_empty() {
            return Err(Error::Schema(
                "cannot discriminate an empty set of layouts".into(),
            ));
        }

        let mut bounds = Vec::with_capacity(layouts.len());
        let mut fixed = Vec::with_capacity(layouts.len());
        for (i, layout) in layouts.iter().enumerate() {
            layout.validate().field(&i.to_string())?;
            let mut known = FixedBytes::new();
            bounds.push(layout_meta(layout, Some(0), &mut known).field(&i.to_string())?);
            fixed.push(known);
        }

        let mut discriminator = Self {
            all: Bitset::full(layouts.len()),
            sizes: ascending_sizes(&bounds),
            bounds,
            strategies: HashMap::new(),
            by_count: HashMap::new(),
            distinguishing: true,
        };
        discriminator.build(&fixed);
        debug!(
            layouts = layouts.len(),
            strategies = discriminator.strategies.len(),
            distinguishing = discriminator.distinguishing,
            "built discriminator"
        );

        if !discriminator.distinguishing {
            if !allow_ambiguous {
                return Err(Error::AmbiguousLayoutSet);
            }
            warn!(
                layouts = layouts.len(),
                "some encodings match more than one layout"
            );
        }
        Ok(discriminator)
    }

    /// Returns true if every encoding is attributed to at most one layout.
    pub fn is_distinguishing(&self) -> bool {
        self.distinguishing
    }

    /// Returns the number of candidate layouts.
    pub fn num_layouts(&self) -> usize {
        self.bounds.len()
    }

    /// Returns the length bounds of every candidate layout.
    pub fn bounds(&self) -> &[Bounds] {
        &self.bounds
    }

    /// Returns the indices of the layouts `bytes` may conform to, in ascending order.
    pub fn candidates(&self, bytes: &[u8]) -> Vec<usize> {
        let mut candidates = self.all.clone();
        while candidates.count() > 1 {
            let Some(narrowed) = self.narrow(&candidates, bytes) else {
                break;
            };
            trace!(from = ?candidates, to = ?narrowed, "narrowed candidates");
            if narrowed == candidates {
                break;
            }
            candidates = narrowed;
        }
        candidates &= &self.layouts_with_size(bytes.len());
        Vec::from(&candidates)
    }

    /// Returns the index of the layout `bytes` conforms to, or `None` if there is none.
    ///
    /// When ambiguity is allowed, the lowest matching index is returned.
    pub fn discriminate(&self, bytes: &[u8]) -> Option<usize> {
        self.candidates(bytes).first().copied()
    }

    fn layouts_with_size(&self, size: usize) -> Bitset {
        self.sizes
            .range(..=size)
            .next_back()
            .map(|(_, set)| set.clone())
            .unwrap_or_default()
    }

    fn layouts_with_byte_at(&self, pos: usize) -> Bitset {
        self.bounds
            .iter()
            .enumerate()
            .filter(|(_, bounds)| bounds.lower > pos)
            .map(|(i, _)| i)
            .collect()
    }

    fn layouts_ending_by(&self, pos: usize) -> Bitset {
        self.bounds
            .iter()
            .enumerate()
            .filter(|(_, bounds)| bounds.upper.is_some_and(|upper| upper <= pos))
            .map(|(i, _)| i)
            .collect()
    }

    fn add(&mut self, candidates: Bitset, strategy: Strategy) {
        self.by_count
            .entry(candidates.count())
            .or_default()
            .push(candidates.clone());
        self.strategies.insert(candidates, strategy);
    }

    fn build(&mut self, fixed: &[FixedBytes]) {
        let total = self.all.count();

        // Constants by position, in layout order
        let mut positions: BTreeMap<usize, Vec<(u8, usize)>> = BTreeMap::new();
        for (i, known) in fixed.iter().enumerate() {
            for (offset, bytes) in known {
                for (j, byte) in bytes.iter().enumerate() {
                    let entries = positions.entry(offset + j).or_default();
                    if !entries.iter().any(|(_, layout)| *layout == i) {
                        entries.push((*byte, i));
                    }
                }
            }
        }

        let widest = self.sizes.values().map(Bitset::count).max().unwrap_or(0);
        let size_power = total - widest;

        let mut ratings = Vec::new();
        for (pos, entries) in positions {
            let reaching = self.layouts_with_byte_at(pos);
            let short = &self.all - &reaching;
            let absent = self.layouts_ending_by(pos);
            let mut values: Vec<(u8, Bitset)> = Vec::new();
            for (byte, layout) in entries {
                match values.iter_mut().find(|(value, _)| *value == byte) {
                    Some((_, set)) => set.insert(layout),
                    None => values.push((byte, Bitset::singleton(layout))),
                }
            }
            let with_value = values.iter().fold(Bitset::new(), |acc, (_, set)| &acc | set);
            let any = &(&self.all - &absent) - &with_value;
            let power = worst_case(&values, &absent)
                .map_or(0, |power| power.min(reaching.count()));
            if power == 0 {
                continue;
            }
            let rating = ByteRating {
                power,
                pos,
                short,
                absent,
                values,
                any,
            };
            if power == total - 1 {
                debug!(pos, "found perfect byte discriminator");
                self.add(self.all.clone(), rating.strategy());
                return;
            }
            ratings.push(rating);
        }

        if size_power == total - 1 {
            debug!("found perfect size discriminator");
            self.add(self.all.clone(), Strategy::Size);
            return;
        }

        ratings.sort_by(|a, b| b.power.cmp(&a.power));
        let all = self.all.clone();
        self.build_for(&all, &ratings);
    }

    fn build_for(&mut self, candidates: &Bitset, ratings: &[ByteRating]) {
        let count = candidates.count();
        if count <= 1 || self.strategies.contains_key(candidates) {
            return;
        }

        // Candidates sharing a possible length with each candidate's minimum length
        let mut overlaps: Vec<(usize, Bitset)> = Vec::new();
        for candidate in candidates {
            let lower = self.bounds[candidate].lower;
            if overlaps.iter().any(|(key, _)| *key == lower) {
                continue;
            }
            let overlap = &self.layouts_with_size(lower) & candidates;
            overlaps.push((lower, overlap));
        }
        let widest = overlaps.iter().map(|(_, set)| set.count()).max().unwrap_or(0);
        let size_power = count - widest;

        let mut narrowed = Vec::new();
        for rating in ratings {
            let values: Vec<(u8, Bitset)> = rating
                .values
                .iter()
                .map(|(byte, set)| (*byte, set & candidates))
                .filter(|(_, set)| !set.is_empty())
                .collect();
            let short = &rating.short & candidates;
            let absent = &rating.absent & candidates;
            // A buffer ending before `pos` only eliminates the candidates reaching it
            let reaching = candidates - &short;
            let power = worst_case(&values, &absent)
                .map_or(0, |power| power.min(reaching.count()));
            if power == 0 {
                continue;
            }
            let rating = ByteRating {
                power,
                pos: rating.pos,
                short,
                absent,
                values,
                any: &rating.any & candidates,
            };
            if power == count - 1 {
                self.add(candidates.clone(), rating.strategy());
                return;
            }
            narrowed.push(rating);
        }

        if size_power == count - 1 {
            self.add(candidates.clone(), Strategy::Size);
            return;
        }

        narrowed.sort_by(|a, b| b.power.cmp(&a.power));
        if let Some(best) = narrowed.first().filter(|best| best.power >= size_power) {
            let best = best.clone();
            self.add(candidates.clone(), best.strategy());
            self.build_for(&best.short, &narrowed);
            for (_, set) in &best.values {
                self.build_for(&(set | &best.any), &narrowed[1..]);
            }
            return;
        }

        if size_power > 0 {
            self.add(candidates.clone(), Strategy::Size);
            for (_, set) in overlaps {
                self.build_for(&set, &narrowed);
            }
            return;
        }

        debug!(?candidates, "indistinguishable layouts");
        self.add(candidates.clone(), Strategy::Indistinguishable);
        self.distinguishing = false;
    }

    /// Applies the strategy stored for `candidates`, or for its smallest known superset that
    /// narrows it.
    fn narrow(&self, candidates: &Bitset, bytes: &[u8]) -> Option<Bitset> {
        if let Some(strategy) = self.strategies.get(candidates) {
            return self.apply(strategy, candidates, bytes);
        }
        for count in candidates.count() + 1..=self.all.count() {
            let Some(supersets) = self.by_count.get(&count) else {
                continue;
            };
            for superset in supersets {
                if !candidates.is_subset(superset) {
                    continue;
                }
                let strategy = self.strategies.get(superset)?;
                let narrowed = self.apply(strategy, candidates, bytes)?;
                if narrowed != *candidates {
                    return Some(narrowed);
                }
            }
        }
        None
    }

    fn apply(&self, strategy: &Strategy, candidates: &Bitset, bytes: &[u8]) -> Option<Bitset> {
        match strategy {
            Strategy::Byte {
                pos,
                short,
                absent,
                values,
            } => match bytes.get(*pos) {
                None => Some(candidates & short),
                Some(byte) => {
                    let mut narrowed = candidates.clone();
                    for (value, set) in values {
                        if value != byte {
                            narrowed -= set;
                        }
                    }
                    narrowed -= absent;
                    Some(narrowed)
                }
            },
            Strategy::Size => Some(candidates & &self.layouts_with_size(bytes.len())),
            Strategy::Indistinguishable => None,
        }
    }
}

/// Maps each length at which the set of layouts admitting it changes to that set.
fn ascending_sizes(bounds: &[Bounds]) -> BTreeMap<usize, Bitset> {
    let mut keys: Vec<usize> = bounds.iter().map(|bounds| bounds.lower).collect();
    keys.extend(bounds.iter().filter_map(|bounds| bounds.upper).map(|upper| upper + 1));
    keys.into_iter()
        .map(|size| {
            let set = bounds
                .iter()
                .enumerate()
                .filter(|(_, bounds)| bounds.contains(size))
                .map(|(i, _)| i)
                .collect();
            (size, set)
        })
        .collect()
}

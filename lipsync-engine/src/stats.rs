//! Diagnostic statistics gathered while generating a sequence

use serde::de::{self, Deserializer, MapAccess, Visitor};
use serde::ser::{SerializeMap, Serializer};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::marker::PhantomData;
use std::str::FromStr;

/// Amplitude classification used for transition tracking
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum AmplitudeBucket {
    /// Equal to the quietest sample in the envelope
    Zero,
    Quarter,
    Half,
    ThreeQuarters,
    Full,
    /// Exactly 1.0
    Max,
    /// Above 1.0 or otherwise unclassifiable (raw envelopes only)
    Other,
}

impl AmplitudeBucket {
    /// Classify an amplitude against the envelope's minimum
    pub fn classify(amplitude: f64, min: f64) -> Self {
        if amplitude == min {
            AmplitudeBucket::Zero
        } else if amplitude < 0.25 {
            AmplitudeBucket::Quarter
        } else if amplitude < 0.5 {
            AmplitudeBucket::Half
        } else if amplitude < 0.75 {
            AmplitudeBucket::ThreeQuarters
        } else if amplitude < 1.0 {
            AmplitudeBucket::Full
        } else if amplitude == 1.0 {
            AmplitudeBucket::Max
        } else {
            AmplitudeBucket::Other
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            AmplitudeBucket::Zero => "0",
            AmplitudeBucket::Quarter => "0-25",
            AmplitudeBucket::Half => "25-50",
            AmplitudeBucket::ThreeQuarters => "50-75",
            AmplitudeBucket::Full => "75-100",
            AmplitudeBucket::Max => "max",
            AmplitudeBucket::Other => "other",
        }
    }

    /// Whether a repeated sample in this bucket may be randomized
    pub fn is_randomizable(&self) -> bool {
        !matches!(self, AmplitudeBucket::Zero | AmplitudeBucket::Max)
    }

    /// Percent range `[min, max]` a randomized sample may move within
    ///
    /// `None` for buckets without a numeric range. `widen_quarter`
    /// stretches `0-25` to `0-50`.
    pub fn level_range(&self, widen_quarter: bool) -> Option<(u32, u32)> {
        match self {
            AmplitudeBucket::Quarter if widen_quarter => Some((0, 50)),
            AmplitudeBucket::Quarter => Some((0, 25)),
            AmplitudeBucket::Half => Some((25, 50)),
            AmplitudeBucket::ThreeQuarters => Some((50, 75)),
            AmplitudeBucket::Full => Some((75, 100)),
            AmplitudeBucket::Zero | AmplitudeBucket::Max | AmplitudeBucket::Other => None,
        }
    }

    const ALL: [AmplitudeBucket; 7] = [
        AmplitudeBucket::Zero,
        AmplitudeBucket::Quarter,
        AmplitudeBucket::Half,
        AmplitudeBucket::ThreeQuarters,
        AmplitudeBucket::Full,
        AmplitudeBucket::Max,
        AmplitudeBucket::Other,
    ];
}

impl fmt::Display for AmplitudeBucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for AmplitudeBucket {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|b| b.label() == s)
            .ok_or_else(|| format!("unknown amplitude bucket {s:?}"))
    }
}

/// Bucket movement between two consecutive samples
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Transition {
    Change {
        from: AmplitudeBucket,
        to: AmplitudeBucket,
    },
    NoChange(AmplitudeBucket),
}

impl Transition {
    pub fn is_no_change(&self) -> bool {
        matches!(self, Transition::NoChange(_))
    }
}

impl fmt::Display for Transition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Transition::Change { from, to } => write!(f, "{from} -> {to}"),
            Transition::NoChange(bucket) => write!(f, "noChange: {bucket}"),
        }
    }
}

impl FromStr for Transition {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Some(bucket) = s.strip_prefix("noChange: ") {
            return Ok(Transition::NoChange(bucket.parse()?));
        }
        let (from, to) = s
            .split_once(" -> ")
            .ok_or_else(|| format!("unknown transition {s:?}"))?;
        Ok(Transition::Change {
            from: from.parse()?,
            to: to.parse()?,
        })
    }
}

/// Recoverable problems counted during generation
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum StatError {
    /// Non-finite pulse width delta, replaced with 0
    NonFinite,
    /// Clamped up to the servo floor
    BelowFloor,
    /// Clamped down to the servo ceiling
    AboveCeiling,
}

impl StatError {
    pub fn label(&self) -> &'static str {
        match self {
            StatError::NonFinite => "NaN VALUE ERROR",
            StatError::BelowFloor => "Below floor",
            StatError::AboveCeiling => "Above ceiling",
        }
    }
}

impl fmt::Display for StatError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for StatError {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        [StatError::NonFinite, StatError::BelowFloor, StatError::AboveCeiling]
            .into_iter()
            .find(|e| e.label() == s)
            .ok_or_else(|| format!("unknown stat error {s:?}"))
    }
}

/// Counts keyed by `K`, ordered ascending by count
///
/// Serializes as a JSON object keyed by the display label, in count order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tally<K> {
    entries: Vec<(K, usize)>,
}

impl<K> Default for Tally<K> {
    fn default() -> Self {
        Self { entries: Vec::new() }
    }
}

impl<K: Ord + Copy> Tally<K> {
    /// Sort a keyed count map by value; equal counts keep key order
    pub fn from_map(map: BTreeMap<K, usize>) -> Self {
        let mut entries: Vec<(K, usize)> = map.into_iter().collect();
        entries.sort_by_key(|(_, count)| *count);
        Self { entries }
    }

    pub fn get(&self, key: &K) -> usize {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, count)| *count)
            .unwrap_or(0)
    }

    pub fn iter(&self) -> impl Iterator<Item = &(K, usize)> {
        self.entries.iter()
    }

    pub fn total(&self) -> usize {
        self.entries.iter().map(|(_, count)| count).sum()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<K: fmt::Display> Serialize for Tally<K> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (key, count) in &self.entries {
            map.serialize_entry(&key.to_string(), count)?;
        }
        map.end()
    }
}

impl<'de, K> Deserialize<'de> for Tally<K>
where
    K: FromStr<Err = String> + Ord + Copy,
{
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct TallyVisitor<K>(PhantomData<K>);

        impl<'de, K> Visitor<'de> for TallyVisitor<K>
        where
            K: FromStr<Err = String> + Ord + Copy,
        {
            type Value = Tally<K>;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a map of labels to counts")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
                let mut map = BTreeMap::new();
                while let Some((label, count)) = access.next_entry::<String, usize>()? {
                    let key = label.parse::<K>().map_err(de::Error::custom)?;
                    map.insert(key, count);
                }
                Ok(Tally::from_map(map))
            }
        }

        deserializer.deserialize_map(TallyVisitor(PhantomData))
    }
}

/// Statistics for one generated sequence
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SequenceStats {
    /// Quietest envelope value seen
    pub min: f32,
    /// Loudest envelope value seen
    pub max: f32,
    pub errors: Tally<StatError>,
    pub counts: Tally<AmplitudeBucket>,
    pub transitions: Tally<Transition>,
    /// Longest run of consecutive same-bucket samples
    pub max_no_change_samples: usize,
    /// Longest no-change run, keyed by the transition that opened it
    pub max_no_change_samples_distribution: Tally<Transition>,
}

/// Mutable accumulator owned by a single generation pass
#[derive(Debug)]
pub(crate) struct StatsAccumulator {
    min: f32,
    max: f32,
    errors: BTreeMap<StatError, usize>,
    counts: BTreeMap<AmplitudeBucket, usize>,
    transitions: BTreeMap<Transition, usize>,
    previous: AmplitudeBucket,
    run_label: Transition,
    run_length: usize,
    max_run: usize,
    run_distribution: BTreeMap<Transition, usize>,
}

impl StatsAccumulator {
    /// Start tracking with the bucket of the leading sample
    pub(crate) fn new(min: f32, max: f32, first: AmplitudeBucket) -> Self {
        Self {
            min,
            max,
            errors: BTreeMap::new(),
            counts: BTreeMap::new(),
            transitions: BTreeMap::new(),
            previous: first,
            run_label: Transition::NoChange(first),
            run_length: 0,
            max_run: 0,
            run_distribution: BTreeMap::new(),
        }
    }

    /// Record a classified sample and return its transition
    pub(crate) fn observe(&mut self, bucket: AmplitudeBucket) -> Transition {
        *self.counts.entry(bucket).or_insert(0) += 1;

        let transition = if bucket != self.previous {
            let change = Transition::Change {
                from: self.previous,
                to: bucket,
            };
            self.close_run();
            self.run_label = change;
            change
        } else {
            self.run_length += 1;
            Transition::NoChange(bucket)
        };

        *self.transitions.entry(transition).or_insert(0) += 1;
        self.previous = bucket;
        transition
    }

    pub(crate) fn error(&mut self, kind: StatError) {
        *self.errors.entry(kind).or_insert(0) += 1;
    }

    fn close_run(&mut self) {
        if self.run_length > 0 {
            self.max_run = self.max_run.max(self.run_length);
            let longest = self.run_distribution.entry(self.run_label).or_insert(0);
            *longest = (*longest).max(self.run_length);
        }
        self.run_length = 0;
    }

    /// Fold the trailing run and sort every tally by count
    pub(crate) fn finish(mut self) -> SequenceStats {
        self.close_run();
        SequenceStats {
            min: self.min,
            max: self.max,
            errors: Tally::from_map(self.errors),
            counts: Tally::from_map(self.counts),
            transitions: Tally::from_map(self.transitions),
            max_no_change_samples: self.max_run,
            max_no_change_samples_distribution: Tally::from_map(self.run_distribution),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify() {
        assert_eq!(AmplitudeBucket::classify(0.1, 0.1), AmplitudeBucket::Zero);
        assert_eq!(AmplitudeBucket::classify(0.1, 0.0), AmplitudeBucket::Quarter);
        assert_eq!(AmplitudeBucket::classify(0.25, 0.0), AmplitudeBucket::Half);
        assert_eq!(AmplitudeBucket::classify(0.5, 0.0), AmplitudeBucket::ThreeQuarters);
        assert_eq!(AmplitudeBucket::classify(0.99, 0.0), AmplitudeBucket::Full);
        assert_eq!(AmplitudeBucket::classify(1.0, 0.0), AmplitudeBucket::Max);
        assert_eq!(AmplitudeBucket::classify(1.3, 0.0), AmplitudeBucket::Other);
        assert_eq!(AmplitudeBucket::classify(f64::NAN, 0.0), AmplitudeBucket::Other);
    }

    #[test]
    fn test_level_range() {
        assert_eq!(AmplitudeBucket::Quarter.level_range(false), Some((0, 25)));
        assert_eq!(AmplitudeBucket::Quarter.level_range(true), Some((0, 50)));
        assert_eq!(AmplitudeBucket::Half.level_range(true), Some((25, 50)));
        assert_eq!(AmplitudeBucket::Zero.level_range(true), None);
        assert_eq!(AmplitudeBucket::Max.level_range(false), None);
    }

    #[test]
    fn test_transition_labels() {
        let change = Transition::Change {
            from: AmplitudeBucket::Half,
            to: AmplitudeBucket::Full,
        };
        assert_eq!(change.to_string(), "25-50 -> 75-100");
        assert_eq!("25-50 -> 75-100".parse::<Transition>(), Ok(change));

        let still = Transition::NoChange(AmplitudeBucket::Max);
        assert_eq!(still.to_string(), "noChange: max");
        assert_eq!("noChange: max".parse::<Transition>(), Ok(still));
        assert!("sideways".parse::<Transition>().is_err());
    }

    #[test]
    fn test_tally_sorted_by_count() {
        let mut map = BTreeMap::new();
        map.insert(AmplitudeBucket::Zero, 5);
        map.insert(AmplitudeBucket::Half, 1);
        map.insert(AmplitudeBucket::Max, 3);
        let tally = Tally::from_map(map);
        let counts: Vec<usize> = tally.iter().map(|(_, c)| *c).collect();
        assert_eq!(counts, vec![1, 3, 5]);
        assert_eq!(tally.get(&AmplitudeBucket::Max), 3);
        assert_eq!(tally.get(&AmplitudeBucket::Other), 0);
        assert_eq!(tally.total(), 9);
    }

    #[test]
    fn test_runs_tracked_per_opening_transition() {
        use AmplitudeBucket::*;
        let mut acc = StatsAccumulator::new(0.0, 1.0, Zero);
        // Zero, Zero | Half, Half, Half | Zero
        for bucket in [Zero, Half, Half, Half, Zero] {
            acc.observe(bucket);
        }
        let stats = acc.finish();
        assert_eq!(stats.max_no_change_samples, 2);
        assert_eq!(
            stats
                .max_no_change_samples_distribution
                .get(&Transition::Change { from: Zero, to: Half }),
            2
        );
        assert_eq!(
            stats
                .max_no_change_samples_distribution
                .get(&Transition::NoChange(Zero)),
            1
        );
        assert_eq!(stats.counts.total(), 5);
        assert_eq!(stats.transitions.get(&Transition::NoChange(Half)), 2);
    }

    #[test]
    fn test_trailing_run_is_folded() {
        use AmplitudeBucket::*;
        let mut acc = StatsAccumulator::new(0.0, 1.0, Zero);
        for bucket in [Full, Full, Full, Full] {
            acc.observe(bucket);
        }
        let stats = acc.finish();
        assert_eq!(stats.max_no_change_samples, 3);
    }

    #[test]
    fn test_stats_serde_roundtrip_keeps_labels() {
        use AmplitudeBucket::*;
        let mut acc = StatsAccumulator::new(0.0, 1.0, Zero);
        acc.observe(Half);
        acc.error(StatError::AboveCeiling);
        let stats = acc.finish();

        let json = serde_json::to_value(&stats).unwrap();
        assert_eq!(json["transitions"]["0 -> 25-50"], 1);
        assert_eq!(json["errors"]["Above ceiling"], 1);
        assert_eq!(json["maxNoChangeSamples"], 0);

        let back: SequenceStats = serde_json::from_value(json).unwrap();
        assert_eq!(back, stats);
    }
}

//! Rolling statistics over recovered messages
//!
//! A [`Statistic`] is one bucket of monoidal counters (count, messages,
//! sum, min, max); a [`Statistics`] table keys buckets by name while
//! preserving insertion order, so reports enumerate queues in the order
//! they were first seen.
//!
//! `join` is commutative and associative on `(count, messages, sum)`;
//! min/max use the usual monoidal update with the unset bounds acting as
//! the identity. Tables built on different worker reports can therefore
//! be merged in any completion order.

use serde::Serialize;
use std::collections::HashMap;

/// One bucket of rolling numeric statistics
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Statistic {
    /// Bucket key (file name, queue name, or type)
    pub name: String,
    count: u64,
    messages: u64,
    sum: f64,
    min: Option<f64>,
    max: Option<f64>,
}

impl Statistic {
    /// Create an empty bucket with the given key
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Fold a single value into the bucket
    pub fn add(&mut self, value: f64) {
        self.join(&Statistic {
            name: String::new(),
            count: 1,
            messages: 1,
            sum: value,
            min: Some(value),
            max: Some(value),
        });
    }

    /// Fold another bucket into this one
    ///
    /// An empty bucket (count == 0) is the identity on both sides.
    pub fn join(&mut self, other: &Statistic) {
        if other.count == 0 {
            return;
        }
        let other_min = other.minimum();
        let other_max = other.maximum();
        if self.count == 0 || other_min < self.minimum() {
            self.min = Some(other_min);
        }
        if self.count == 0 || other_max > self.maximum() {
            self.max = Some(other_max);
        }
        self.sum += other.sum;
        self.count += other.count;
        self.messages += other.messages;
    }

    /// Number of folded occurrences
    pub fn count(&self) -> u64 {
        self.count
    }

    /// Number of messages behind the folded occurrences
    pub fn messages(&self) -> u64 {
        self.messages
    }

    /// Sum of all folded values
    pub fn sum(&self) -> f64 {
        self.sum
    }

    /// Smallest folded value; falls back to the sum when no bound is set
    pub fn minimum(&self) -> f64 {
        self.min.unwrap_or(self.sum)
    }

    /// Largest folded value; falls back to the sum when no bound is set
    pub fn maximum(&self) -> f64 {
        self.max.unwrap_or(self.sum)
    }

    /// Average folded value
    pub fn average(&self) -> f64 {
        self.sum / self.count.max(1) as f64
    }

    /// Render this bucket as a neutral report record
    pub fn record(&self) -> StatRecord {
        StatRecord {
            name: self.name.clone(),
            count: self.count(),
            messages: self.messages(),
            size: self.sum(),
            average: self.average() as i64,
            minimum: self.minimum() as i64,
            maximum: self.maximum() as i64,
        }
    }
}

/// Neutral nested record consumed by the report renderers
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub struct StatRecord {
    pub name: String,
    pub count: u64,
    pub messages: u64,
    pub size: f64,
    pub average: i64,
    pub minimum: i64,
    pub maximum: i64,
}

/// Insertion-ordered table of statistic buckets keyed by name
#[derive(Debug, Clone, Default)]
pub struct Statistics {
    index: HashMap<String, usize>,
    entries: Vec<Statistic>,
}

impl Statistics {
    /// Fold one value under the given key, creating the bucket if new
    pub fn add(&mut self, name: &str, value: f64) {
        let mut stat = Statistic::named(name);
        stat.add(value);
        self.add_statistic(&stat);
    }

    /// Fold an existing bucket under a different grouping key
    ///
    /// Only messages and sum carry over; each fold counts as one
    /// occurrence of the group, and the folded sums become the bounds.
    /// This is how queue or file buckets roll up into type buckets.
    pub fn add_group(&mut self, name: &str, stat: &Statistic) {
        self.add_statistic(&Statistic {
            name: name.to_string(),
            count: 1,
            messages: stat.messages,
            sum: stat.sum,
            min: None,
            max: None,
        });
    }

    /// Fold a bucket into the entry sharing its name
    pub fn add_statistic(&mut self, stat: &Statistic) {
        let idx = match self.index.get(&stat.name) {
            Some(&idx) => idx,
            None => {
                let idx = self.entries.len();
                self.entries.push(Statistic::named(stat.name.clone()));
                self.index.insert(stat.name.clone(), idx);
                idx
            }
        };
        self.entries[idx].join(stat);
    }

    /// Merge another table into this one, key-wise
    pub fn join(&mut self, other: &Statistics) {
        for stat in &other.entries {
            self.add_statistic(stat);
        }
    }

    /// Buckets in insertion order
    pub fn iter(&self) -> impl Iterator<Item = &Statistic> {
        self.entries.iter()
    }

    /// Look up a bucket by name
    pub fn get(&self, name: &str) -> Option<&Statistic> {
        self.index.get(name).map(|&idx| &self.entries[idx])
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Render the table as report records, in insertion order
    pub fn records(&self) -> Vec<StatRecord> {
        self.entries.iter().map(Statistic::record).collect()
    }

    /// Fold every bucket into a single footer total
    pub fn total(&self) -> Statistic {
        let mut total = Statistic::default();
        for stat in &self.entries {
            total.join(stat);
        }
        total
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_value() {
        let mut stat = Statistic::named("q");
        stat.add(10.0);
        assert_eq!(stat.count(), 1);
        assert_eq!(stat.messages(), 1);
        assert_eq!(stat.sum(), 10.0);
        assert_eq!(stat.minimum(), 10.0);
        assert_eq!(stat.maximum(), 10.0);
        assert_eq!(stat.average(), 10.0);
    }

    #[test]
    fn test_bounds_and_average() {
        let mut stat = Statistic::named("q");
        for value in [4.0, 1.0, 7.0] {
            stat.add(value);
        }
        assert_eq!(stat.minimum(), 1.0);
        assert_eq!(stat.maximum(), 7.0);
        assert_eq!(stat.average(), 4.0);
        assert!(stat.minimum() <= stat.average() && stat.average() <= stat.maximum());
    }

    #[test]
    fn test_join_commutative_associative() {
        let mut a = Statistic::named("x");
        a.add(1.0);
        a.add(5.0);
        let mut b = Statistic::named("x");
        b.add(3.0);
        let mut c = Statistic::named("x");
        c.add(9.0);

        // (a+b)+c
        let mut left = a.clone();
        left.join(&b);
        left.join(&c);
        // a+(b+c)
        let mut bc = b.clone();
        bc.join(&c);
        let mut right = a.clone();
        right.join(&bc);
        assert_eq!(left, right);

        // a+b == b+a
        let mut ab = a.clone();
        ab.join(&b);
        let mut ba = b.clone();
        ba.join(&a);
        assert_eq!(ab.count(), ba.count());
        assert_eq!(ab.sum(), ba.sum());
        assert_eq!(ab.minimum(), ba.minimum());
        assert_eq!(ab.maximum(), ba.maximum());
    }

    #[test]
    fn test_join_identity() {
        let mut stat = Statistic::named("x");
        stat.add(2.0);
        let before = stat.clone();
        stat.join(&Statistic::default());
        assert_eq!(stat, before);
    }

    #[test]
    fn test_empty_receiver_inherits_bounds() {
        let mut empty = Statistic::named("x");
        let mut other = Statistic::named("x");
        other.add(3.0);
        other.add(8.0);
        empty.join(&other);
        assert_eq!(empty.minimum(), 3.0);
        assert_eq!(empty.maximum(), 8.0);
    }

    #[test]
    fn test_table_insertion_order() {
        let mut table = Statistics::default();
        table.add("beta", 1.0);
        table.add("alpha", 2.0);
        table.add("beta", 3.0);
        let names: Vec<_> = table.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, ["beta", "alpha"]);
        assert_eq!(table.get("beta").unwrap().messages(), 2);
    }

    #[test]
    fn test_table_join() {
        let mut a = Statistics::default();
        a.add("q1", 10.0);
        let mut b = Statistics::default();
        b.add("q1", 20.0);
        b.add("q2", 5.0);
        a.join(&b);
        assert_eq!(a.len(), 2);
        let q1 = a.get("q1").unwrap();
        assert_eq!(q1.messages(), 2);
        assert_eq!(q1.sum(), 30.0);
    }

    #[test]
    fn test_add_group_counts_folds() {
        let mut files = Statistics::default();
        let mut f1 = Statistic::named("0001.rdq");
        f1.add(100.0);
        f1.add(50.0);
        let mut f2 = Statistic::named("0002.rdq");
        f2.add(10.0);

        let mut types = Statistics::default();
        types.add_group("rdq", &f1);
        types.add_group("rdq", &f2);
        files.add_statistic(&f1);
        files.add_statistic(&f2);

        let rdq = types.get("rdq").unwrap();
        assert_eq!(rdq.count(), 2);
        assert_eq!(rdq.messages(), 3);
        assert_eq!(rdq.sum(), 160.0);
        // Group bounds span the folded sums, not the raw values
        assert_eq!(rdq.minimum(), 10.0);
        assert_eq!(rdq.maximum(), 150.0);
    }

    #[test]
    fn test_records() {
        let mut table = Statistics::default();
        table.add("q", 4.0);
        table.add("q", 6.0);
        let records = table.records();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].name, "q");
        assert_eq!(records[0].messages, 2);
        assert_eq!(records[0].size, 10.0);
        assert_eq!(records[0].average, 5);
    }
}

/// A set of integers stored as sorted, disjoint, inclusive intervals.
#[derive(Clone, Default, Debug, PartialEq)]
pub(crate) struct InversionList {
    ranges: Vec<(i64, i64)>,
}

impl InversionList {
    /// Builds the union of the given inclusive ranges. Empty ranges are ignored, and
    /// overlapping or adjacent ones are merged.
    pub fn new(ranges: impl IntoIterator<Item = (i64, i64)>) -> Self {
        let mut sorted: Vec<(i64, i64)> = ranges
            .into_iter()
            .filter(|&(start, end)| start <= end)
            .collect();
        sorted.sort_unstable();

        let mut merged: Vec<(i64, i64)> = Vec::with_capacity(sorted.len());
        for (start, end) in sorted {
            match merged.last_mut() {
                Some(last) if start <= last.1.saturating_add(1) => last.1 = last.1.max(end),
                _ => merged.push((start, end)),
            }
        }

        InversionList { ranges: merged }
    }

    pub fn contains(&self, number: i64) -> bool {
        let index = self.ranges.partition_point(|&(_, end)| end < number);
        self.ranges
            .get(index)
            .map_or(false, |&(start, _)| start <= number)
    }

    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }
}

#[test]
fn merged_ranges() {
    let list = InversionList::new([(7, -2), (1, 3), (9, 11), (3, 5), (12, 12), (20, 25), (21, 22)]);
    assert_eq!(list.ranges, vec![(1, 5), (9, 12), (20, 25)]);

    let members: Vec<i64> = (-3..=27).filter(|&number| list.contains(number)).collect();
    assert_eq!(
        members,
        vec![1, 2, 3, 4, 5, 9, 10, 11, 12, 20, 21, 22, 23, 24, 25]
    );
    assert!(!InversionList::default().contains(0));
    assert!(InversionList::new([(i64::MIN, i64::MAX)]).contains(i64::MAX));
}

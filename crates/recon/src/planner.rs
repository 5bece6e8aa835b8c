use crate::model::FactRecord;

/// Columns of the idempotent upsert conflict key, in wire order.
pub const CONFLICT_KEY: [&str; 4] = ["date", "store_id", "product_id", "order_type"];

pub const DEFAULT_BATCH_SIZE: usize = 500;

/// One bounded group of records sent in a single upsert call.
#[derive(Debug, Clone, PartialEq)]
pub struct UpsertBatch {
    /// 0-based position in the plan.
    pub index: usize,
    pub conflict_key: &'static [&'static str],
    pub records: Vec<FactRecord>,
}

impl UpsertBatch {
    /// `date,store_id,product_id,order_type`
    pub fn conflict_key_param(&self) -> String {
        self.conflict_key.join(",")
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct UpsertPlan {
    pub batch_size: usize,
    pub total_records: usize,
    pub batches: Vec<UpsertBatch>,
}

impl UpsertPlan {
    pub fn is_empty(&self) -> bool {
        self.batches.is_empty()
    }
}

/// Split finalized facts into ordered batches of at most `batch_size`.
///
/// Every record lands in exactly one batch and input order is kept.
/// Batches are independent: replaying any of them has no further effect.
/// A `batch_size` of 0 is treated as 1.
pub fn plan(records: Vec<FactRecord>, batch_size: usize) -> UpsertPlan {
    let batch_size = batch_size.max(1);
    let total_records = records.len();

    let mut batches = Vec::with_capacity(total_records.div_ceil(batch_size));
    let mut records = records.into_iter().peekable();
    while records.peek().is_some() {
        let chunk: Vec<FactRecord> = records.by_ref().take(batch_size).collect();
        batches.push(UpsertBatch {
            index: batches.len(),
            conflict_key: &CONFLICT_KEY,
            records: chunk,
        });
    }

    UpsertPlan {
        batch_size,
        total_records,
        batches,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{OrderType, ProductId, StoreId};
    use chrono::NaiveDate;
    use proptest::prelude::*;

    fn records(n: usize) -> Vec<FactRecord> {
        let day = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        (0..n)
            .map(|i| FactRecord {
                date: day,
                store_id: StoreId::new(format!("s{i:05}")),
                product_id: ProductId::new("p"),
                quantity: 1,
                order_type: OrderType::Retail,
            })
            .collect()
    }

    #[test]
    fn splits_1200_into_500_500_200() {
        let p = plan(records(1200), 500);
        let sizes: Vec<usize> = p.batches.iter().map(UpsertBatch::len).collect();
        assert_eq!(sizes, vec![500, 500, 200]);
        assert_eq!(p.total_records, 1200);
        assert_eq!(p.batches[2].index, 2);
        assert_eq!(
            p.batches[0].conflict_key_param(),
            "date,store_id,product_id,order_type"
        );
    }

    #[test]
    fn empty_input_empty_plan() {
        let p = plan(Vec::new(), 500);
        assert!(p.is_empty());
        assert_eq!(p.total_records, 0);
    }

    #[test]
    fn zero_batch_size_acts_as_one() {
        let p = plan(records(3), 0);
        assert_eq!(p.batch_size, 1);
        assert_eq!(p.batches.len(), 3);
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(64))]

        #[test]
        fn every_record_in_exactly_one_batch(n in 0usize..2000, size in 1usize..700) {
            let input = records(n);
            let p = plan(input.clone(), size);
            prop_assert!(p.batches.iter().all(|b| !b.is_empty() && b.len() <= size));
            let flattened: Vec<FactRecord> =
                p.batches.into_iter().flat_map(|b| b.records).collect();
            prop_assert_eq!(flattened, input);
        }
    }
}

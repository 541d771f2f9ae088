use pullgraph_api::{
    Error, IndexQuery, IndexReader, IndexSample, IndexSampler, InternalNodeId, NodeIdCursor,
    PropertyValue, Result, ValueGroupSet,
};
use tracing::{trace, warn};

use super::routes_to_boost;

/// Close two resources in order, always attempting the second.
///
/// Reports the first failure; a second failure is only logged.
fn close_pair(first: Result<()>, second: impl FnOnce() -> Result<()>, what: &str) -> Result<()> {
    let second = second();
    match (first, second) {
        (Err(e), Err(suppressed)) => {
            warn!(error = %suppressed, "fallback {what} close failed after boost failure");
            Err(e)
        }
        (Err(e), Ok(())) => Err(e),
        (Ok(()), result) => result,
    }
}

/// One logical index over a boost reader and a fallback reader.
pub struct DualIndexReader<'a> {
    boost: Box<dyn IndexReader<'a> + 'a>,
    fallback: Box<dyn IndexReader<'a> + 'a>,
    closed: bool,
}

impl<'a> DualIndexReader<'a> {
    pub fn new(
        boost: Box<dyn IndexReader<'a> + 'a>,
        fallback: Box<dyn IndexReader<'a> + 'a>,
    ) -> Self {
        Self {
            boost,
            fallback,
            closed: false,
        }
    }

    fn select(&self, values: &[PropertyValue]) -> &(dyn IndexReader<'a> + 'a) {
        if routes_to_boost(self.boost.supported_groups(), values) {
            trace!(values = values.len(), "index request routed to boost reader");
            self.boost.as_ref()
        } else {
            trace!(values = values.len(), "index request routed to fallback reader");
            self.fallback.as_ref()
        }
    }
}

impl<'a> IndexReader<'a> for DualIndexReader<'a> {
    fn supported_groups(&self) -> ValueGroupSet {
        ValueGroupSet::ALL
    }

    fn count_indexed_nodes(&self, node: InternalNodeId, values: &[PropertyValue]) -> Result<u64> {
        self.select(values).count_indexed_nodes(node, values)
    }

    fn create_sampler(&self) -> Result<Box<dyn IndexSampler + 'a>> {
        let mut boost = self.boost.create_sampler()?;
        let fallback = match self.fallback.create_sampler() {
            Ok(sampler) => sampler,
            Err(e) => {
                if let Err(suppressed) = boost.close() {
                    warn!(error = %suppressed, "boost sampler close failed");
                }
                return Err(e);
            }
        };
        Ok(Box::new(DualIndexSampler {
            boost,
            fallback,
            closed: false,
        }))
    }

    /// Routes on the values of all predicates together.
    ///
    /// A predicate without a value (`Exists`, or a fully unbounded range)
    /// would need both readers' answers combined, which is not supported.
    fn query(&self, predicates: &[IndexQuery]) -> Result<NodeIdCursor<'a>> {
        if predicates.is_empty() {
            return Err(Error::unsupported("index query without predicates"));
        }
        let mut values = Vec::with_capacity(predicates.len());
        for predicate in predicates {
            let carried = predicate.values();
            if carried.is_empty() {
                return Err(Error::unsupported(format!(
                    "{predicate:?} spans both boost and fallback readers"
                )));
            }
            values.extend(carried);
        }
        self.select(&values).query(predicates)
    }

    fn has_full_number_precision(&self) -> bool {
        // Boost covers every number exactly.
        true
    }

    fn close(&mut self) -> Result<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        let boost = self.boost.close();
        close_pair(boost, || self.fallback.close(), "reader")
    }
}

/// Sampler over both physical readers; samples are summed.
pub struct DualIndexSampler<'a> {
    boost: Box<dyn IndexSampler + 'a>,
    fallback: Box<dyn IndexSampler + 'a>,
    closed: bool,
}

impl IndexSampler for DualIndexSampler<'_> {
    fn sample(&mut self) -> Result<IndexSample> {
        let boost = self.boost.sample()?;
        let fallback = self.fallback.sample()?;
        Ok(boost.combine(fallback))
    }

    fn close(&mut self) -> Result<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        let boost = self.boost.close();
        close_pair(boost, || self.fallback.close(), "sampler")
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::ops::Bound;
    use std::rc::Rc;

    use pullgraph_api::{Cursor, ValueGroup};

    use super::*;

    type Log = Rc<RefCell<Vec<String>>>;

    struct EmptyCursor;

    impl Iterator for EmptyCursor {
        type Item = Result<InternalNodeId>;
        fn next(&mut self) -> Option<Self::Item> {
            None
        }
    }

    impl Cursor for EmptyCursor {
        fn close(&mut self) -> Result<()> {
            Ok(())
        }
    }

    struct StubSampler {
        name: &'static str,
        sample: IndexSample,
        log: Log,
    }

    impl IndexSampler for StubSampler {
        fn sample(&mut self) -> Result<IndexSample> {
            Ok(self.sample)
        }
        fn close(&mut self) -> Result<()> {
            self.log.borrow_mut().push(format!("{}.sampler.close", self.name));
            Ok(())
        }
    }

    struct StubReader {
        name: &'static str,
        groups: ValueGroupSet,
        fail_close: bool,
        sample: IndexSample,
        log: Log,
    }

    impl StubReader {
        fn boxed(name: &'static str, groups: ValueGroupSet, log: &Log) -> Box<Self> {
            Box::new(Self {
                name,
                groups,
                fail_close: false,
                sample: IndexSample::default(),
                log: log.clone(),
            })
        }
    }

    impl<'a> IndexReader<'a> for StubReader {
        fn supported_groups(&self) -> ValueGroupSet {
            self.groups
        }
        fn count_indexed_nodes(&self, _node: InternalNodeId, _values: &[PropertyValue]) -> Result<u64> {
            self.log.borrow_mut().push(format!("{}.count", self.name));
            Ok(0)
        }
        fn create_sampler(&self) -> Result<Box<dyn IndexSampler + 'a>> {
            Ok(Box::new(StubSampler {
                name: self.name,
                sample: self.sample,
                log: self.log.clone(),
            }))
        }
        fn query(&self, _predicates: &[IndexQuery]) -> Result<NodeIdCursor<'a>> {
            self.log.borrow_mut().push(format!("{}.query", self.name));
            Ok(Box::new(EmptyCursor))
        }
        fn has_full_number_precision(&self) -> bool {
            false
        }
        fn close(&mut self) -> Result<()> {
            self.log.borrow_mut().push(format!("{}.close", self.name));
            if self.fail_close {
                Err(Error::CloseFailed(self.name.to_string()))
            } else {
                Ok(())
            }
        }
    }

    fn dual(log: &Log) -> DualIndexReader<'static> {
        DualIndexReader::new(
            StubReader::boxed("boost", ValueGroupSet::NUMBER, log),
            StubReader::boxed("fallback", ValueGroupSet::complement_of(ValueGroupSet::NUMBER), log),
        )
    }

    #[test]
    fn count_routes_by_value_group() {
        let log = Log::default();
        let reader = dual(&log);
        reader.count_indexed_nodes(1, &[PropertyValue::Int(1)]).unwrap();
        reader.count_indexed_nodes(1, &[PropertyValue::from("a")]).unwrap();
        reader
            .count_indexed_nodes(1, &[PropertyValue::Int(1), PropertyValue::from("a")])
            .unwrap();
        assert_eq!(
            *log.borrow(),
            vec!["boost.count", "fallback.count", "fallback.count"]
        );
    }

    #[test]
    fn query_routes_on_all_predicate_values() {
        let log = Log::default();
        let reader = dual(&log);
        let mut c = reader
            .query(&[IndexQuery::Range {
                lower: Bound::Included(PropertyValue::Int(1)),
                upper: Bound::Unbounded,
            }])
            .unwrap();
        c.close().unwrap();
        let mut c = reader
            .query(&[IndexQuery::StringPrefix("x".into())])
            .unwrap();
        c.close().unwrap();
        assert_eq!(*log.borrow(), vec!["boost.query", "fallback.query"]);
    }

    #[test]
    fn valueless_predicates_fail_fast_as_unsupported() {
        let log = Log::default();
        let reader = dual(&log);
        assert!(reader.query(&[IndexQuery::Exists]).err().unwrap().is_unsupported());
        assert!(reader.query(&[]).err().unwrap().is_unsupported());
        let open_range = IndexQuery::Range {
            lower: Bound::Unbounded,
            upper: Bound::Unbounded,
        };
        assert!(reader.query(&[open_range]).err().unwrap().is_unsupported());
        assert!(log.borrow().is_empty());
    }

    #[test]
    fn close_attempts_fallback_after_boost_failure() {
        let log = Log::default();
        let mut boost = StubReader::boxed("boost", ValueGroupSet::NUMBER, &log);
        boost.fail_close = true;
        let mut fallback = StubReader::boxed("fallback", ValueGroupSet::ALL, &log);
        fallback.fail_close = true;
        let mut reader = DualIndexReader::new(boost, fallback);

        let err = reader.close().unwrap_err();
        assert!(matches!(err, Error::CloseFailed(ref which) if which == "boost"));
        assert_eq!(*log.borrow(), vec!["boost.close", "fallback.close"]);

        // Idempotent.
        reader.close().unwrap();
        assert_eq!(log.borrow().len(), 2);
    }

    #[test]
    fn sampler_sums_both_readers_and_closes_both() {
        let log = Log::default();
        let mut boost = StubReader::boxed("boost", ValueGroupSet::NUMBER, &log);
        boost.sample = IndexSample::new(4, 2, 4);
        let mut fallback = StubReader::boxed("fallback", ValueGroupSet::ALL, &log);
        fallback.sample = IndexSample::new(3, 3, 3);
        let reader = DualIndexReader::new(boost, fallback);

        let mut sampler = reader.create_sampler().unwrap();
        assert_eq!(sampler.sample().unwrap(), IndexSample::new(7, 5, 7));
        sampler.close().unwrap();
        assert_eq!(
            *log.borrow(),
            vec!["boost.sampler.close", "fallback.sampler.close"]
        );
    }

    #[test]
    fn reports_full_number_precision() {
        let log = Log::default();
        let reader = dual(&log);
        assert!(reader.has_full_number_precision());
        assert!(reader.supported_groups().contains(ValueGroup::Map));
    }
}

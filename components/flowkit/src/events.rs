use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;

use crossbeam_channel::{bounded, Sender};
use flow_codec::{Address, Value};
use flow_gateway::{BlockEvents, Event, Gateway, ACCOUNT_CREATED_EVENT};

use crate::utils::Context;
use crate::FlowkitError;

pub const DEFAULT_WORKER_COUNT: usize = 1;
pub const DEFAULT_BLOCKS_PER_WORKER: u64 = 250;

/// How an event range is split and fetched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventWorker {
    /// Queries in flight at once.
    pub count: usize,
    /// Width of the block range covered by a single query.
    pub blocks_per_worker: u64,
}

impl Default for EventWorker {
    fn default() -> Self {
        EventWorker {
            count: DEFAULT_WORKER_COUNT,
            blocks_per_worker: DEFAULT_BLOCKS_PER_WORKER,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventQuery {
    pub event_type: String,
    pub start: u64,
    pub end: u64,
}

/// One query per event type for every `blocks_per_worker` wide slice of
/// `start..=end`.
pub fn event_queries(names: &[String], start: u64, end: u64, blocks_per_worker: u64) -> Vec<EventQuery> {
    let mut queries = vec![];
    if blocks_per_worker == 0 || end < start {
        return queries;
    }
    let mut height = start;
    loop {
        let slice_end = height.saturating_add(blocks_per_worker - 1).min(end);
        for name in names {
            queries.push(EventQuery {
                event_type: name.clone(),
                start: height,
                end: slice_end,
            });
        }
        if slice_end >= end {
            break;
        }
        height = slice_end + 1;
    }
    queries
}

/// Fetches `names` events over `start..=end` with `worker.count` concurrent
/// workers. Results come back in completion order; the first failure wins.
pub fn scan_events(
    gateway: &dyn Gateway,
    names: &[String],
    start: u64,
    end: u64,
    worker: &EventWorker,
    ctx: &Context,
) -> Result<Vec<BlockEvents>, FlowkitError> {
    if end < start {
        return Err(FlowkitError::RangeInvalid { start, end });
    }
    if worker.blocks_per_worker == 0 {
        return Err(FlowkitError::Message(
            "blocks per worker must be greater than zero".into(),
        ));
    }
    let queries = event_queries(names, start, end, worker.blocks_per_worker);
    let workers = worker.count.max(1);
    ctx.try_log(|logger| {
        slog::debug!(
            logger,
            "scanning events";
            "queries" => queries.len(),
            "workers" => workers,
            "start" => start,
            "end" => end
        )
    });

    let failed = AtomicBool::new(false);
    let (query_tx, query_rx) = bounded::<EventQuery>(workers);
    let (result_tx, result_rx) = bounded::<Result<Vec<BlockEvents>, FlowkitError>>(workers);

    thread::scope(|scope| {
        let failed = &failed;
        scope.spawn(move || {
            for query in queries {
                if failed.load(Ordering::SeqCst) || query_tx.send(query).is_err() {
                    break;
                }
            }
        });

        for _ in 0..workers {
            let query_rx = query_rx.clone();
            let result_tx: Sender<_> = result_tx.clone();
            scope.spawn(move || {
                for query in query_rx.iter() {
                    if failed.load(Ordering::SeqCst) {
                        continue;
                    }
                    let result = if ctx.is_cancelled() {
                        Err(FlowkitError::Cancelled)
                    } else {
                        gateway
                            .get_events(&query.event_type, query.start, query.end)
                            .map_err(FlowkitError::from)
                    };
                    if result.is_err() {
                        failed.store(true, Ordering::SeqCst);
                    }
                    if result_tx.send(result).is_err() {
                        break;
                    }
                }
            });
        }
        drop(query_rx);
        drop(result_tx);

        let mut events = vec![];
        let mut first_error = None;
        for result in result_rx.iter() {
            match result {
                Ok(mut block_events) => events.append(&mut block_events),
                Err(e) => {
                    if first_error.is_none() {
                        ctx.try_log(|logger| slog::warn!(logger, "event query failed: {}", e));
                        first_error = Some(e);
                    }
                }
            }
        }
        match first_error {
            Some(e) => Err(e),
            None => Ok(events),
        }
    })
}

/// Flattened events of one or more blocks.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EventList(pub Vec<Event>);

impl EventList {
    pub fn new(events: Vec<Event>) -> EventList {
        EventList(events)
    }

    pub fn from_block_events(blocks: &[BlockEvents]) -> EventList {
        EventList(blocks.iter().flat_map(|b| b.events.iter().cloned()).collect())
    }

    pub fn by_type(&self, event_type: &str) -> Vec<&Event> {
        self.0.iter().filter(|e| e.event_type == event_type).collect()
    }

    /// Addresses announced by account creation events.
    pub fn created_addresses(&self) -> Vec<Address> {
        self.by_type(ACCOUNT_CREATED_EVENT)
            .into_iter()
            .filter_map(|event| match event.field("address") {
                Some(Value::Address(address)) => Some(*address),
                _ => None,
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flow_codec::{Composite, CompositeKind, Identifier};

    fn names() -> Vec<String> {
        vec!["first".to_string(), "second".to_string()]
    }

    fn query(event_type: &str, start: u64, end: u64) -> EventQuery {
        EventQuery {
            event_type: event_type.into(),
            start,
            end,
        }
    }

    #[test]
    fn splits_ranges_per_event_type() {
        assert_eq!(
            event_queries(&names(), 0, 400, 250),
            vec![
                query("first", 0, 249),
                query("second", 0, 249),
                query("first", 250, 400),
                query("second", 250, 400),
            ]
        );
    }

    #[test]
    fn ranges_cover_every_height_once() {
        for (start, end, width) in [(0, 0, 1), (5, 5, 250), (10, 1000, 7), (0, 499, 250)] {
            let queries = event_queries(&["e".to_string()], start, end, width);
            let mut expected = start;
            for q in &queries {
                assert_eq!(q.start, expected);
                assert!(q.end >= q.start && q.end - q.start < width);
                expected = q.end + 1;
            }
            assert_eq!(expected, end + 1);
        }
        assert!(event_queries(&names(), u64::MAX - 1, u64::MAX, 250).len() == 2);
    }

    #[test]
    fn created_addresses_come_from_account_created_events() {
        let event = Event {
            event_type: ACCOUNT_CREATED_EVENT.into(),
            transaction_id: Identifier::EMPTY,
            transaction_index: 0,
            event_index: 0,
            value: Value::Composite(Composite {
                kind: CompositeKind::Event,
                id: ACCOUNT_CREATED_EVENT.into(),
                fields: vec![(
                    "address".into(),
                    Value::Address(Address::from_hex("05").unwrap()),
                )],
            }),
        };
        let other = Event {
            event_type: "A.01.Token.Deposit".into(),
            ..event.clone()
        };
        let list = EventList::new(vec![other, event]);
        assert_eq!(list.created_addresses(), vec![Address::from_hex("05").unwrap()]);
        assert_eq!(list.by_type("A.01.Token.Deposit").len(), 1);
    }
}

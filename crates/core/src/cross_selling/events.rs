//! Extension points around cross-selling resolution.
//!
//! Subscribers run synchronously in registration order. Criteria handed to the
//! criteria hooks are the ones executed afterwards, so subscribers may add,
//! remove or replace filters, sortings and limits.

use std::sync::{Arc, Mutex};

use crate::criteria::Criteria;
use crate::domain::cross_selling::{CrossSellingDefinition, CrossSellingElementCollection};
use crate::domain::sales_channel::SalesChannelContext;

pub struct StreamCriteriaEvent<'a> {
    pub cross_selling: &'a CrossSellingDefinition,
    pub criteria: &'a mut Criteria,
    pub context: &'a SalesChannelContext,
}

pub struct IdsCriteriaEvent<'a> {
    pub cross_selling: &'a CrossSellingDefinition,
    pub criteria: &'a mut Criteria,
    pub context: &'a SalesChannelContext,
}

pub struct CrossSellingsLoadedEvent<'a> {
    pub elements: &'a CrossSellingElementCollection,
    pub context: &'a SalesChannelContext,
}

pub trait CrossSellingSubscriber: Send + Sync {
    fn on_stream_criteria(&self, _event: &mut StreamCriteriaEvent<'_>) {}

    fn on_ids_criteria(&self, _event: &mut IdsCriteriaEvent<'_>) {}

    fn on_cross_sellings_loaded(&self, _event: &CrossSellingsLoadedEvent<'_>) {}
}

#[derive(Clone, Default)]
pub struct CrossSellingEventDispatcher {
    subscribers: Vec<Arc<dyn CrossSellingSubscriber>>,
}

impl CrossSellingEventDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&mut self, subscriber: Arc<dyn CrossSellingSubscriber>) {
        self.subscribers.push(subscriber);
    }

    pub fn with_subscriber(mut self, subscriber: Arc<dyn CrossSellingSubscriber>) -> Self {
        self.subscribe(subscriber);
        self
    }

    pub fn len(&self) -> usize {
        self.subscribers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.subscribers.is_empty()
    }

    pub fn dispatch_stream_criteria(&self, event: &mut StreamCriteriaEvent<'_>) {
        for subscriber in &self.subscribers {
            subscriber.on_stream_criteria(event);
        }
    }

    pub fn dispatch_ids_criteria(&self, event: &mut IdsCriteriaEvent<'_>) {
        for subscriber in &self.subscribers {
            subscriber.on_ids_criteria(event);
        }
    }

    pub fn dispatch_cross_sellings_loaded(&self, event: &CrossSellingsLoadedEvent<'_>) {
        for subscriber in &self.subscribers {
            subscriber.on_cross_sellings_loaded(event);
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum RecordedHook {
    StreamCriteria { cross_selling: String, criteria: Criteria },
    IdsCriteria { cross_selling: String, criteria: Criteria },
    CrossSellingsLoaded { cross_sellings: Vec<String> },
}

/// Subscriber that keeps a copy of every hook it saw.
#[derive(Clone, Default)]
pub struct InMemoryHookRecorder {
    hooks: Arc<Mutex<Vec<RecordedHook>>>,
}

impl InMemoryHookRecorder {
    pub fn hooks(&self) -> Vec<RecordedHook> {
        match self.hooks.lock() {
            Ok(hooks) => hooks.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    fn push(&self, hook: RecordedHook) {
        match self.hooks.lock() {
            Ok(mut hooks) => hooks.push(hook),
            Err(poisoned) => poisoned.into_inner().push(hook),
        }
    }
}

impl CrossSellingSubscriber for InMemoryHookRecorder {
    fn on_stream_criteria(&self, event: &mut StreamCriteriaEvent<'_>) {
        self.push(RecordedHook::StreamCriteria {
            cross_selling: event.cross_selling.id.0.clone(),
            criteria: event.criteria.clone(),
        });
    }

    fn on_ids_criteria(&self, event: &mut IdsCriteriaEvent<'_>) {
        self.push(RecordedHook::IdsCriteria {
            cross_selling: event.cross_selling.id.0.clone(),
            criteria: event.criteria.clone(),
        });
    }

    fn on_cross_sellings_loaded(&self, event: &CrossSellingsLoadedEvent<'_>) {
        self.push(RecordedHook::CrossSellingsLoaded {
            cross_sellings: event
                .elements
                .iter()
                .map(|element| element.cross_selling.id.0.clone())
                .collect(),
        });
    }
}

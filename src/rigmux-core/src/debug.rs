// SPDX-FileCopyrightText: 2026 Stan Grams <sjg@haxx.space>
//
// SPDX-License-Identifier: BSD-2-Clause

use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

/// One bounded-ring entry: a tagged, timestamped event with free-form
/// string fields (command text, decoded semantics, RPRT code — whatever a
/// later diagnosis needs; see §7's logging requirement).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DebugEvent {
    pub ts_seconds: u64,
    pub kind: String,
    pub fields: Vec<(String, String)>,
}

fn now_seconds() -> u64 {
    SystemTime::now().duration_since(UNIX_EPOCH).map(|d| d.as_secs()).unwrap_or(0)
}

/// A fixed-capacity, oldest-evicted event ring. `add` is O(1) under a
/// coarse lock; `snapshot` returns an oldest-first copy.
pub struct DebugRing {
    capacity: usize,
    events: Mutex<VecDeque<DebugEvent>>,
}

impl DebugRing {
    pub fn new(capacity: usize) -> Self {
        DebugRing { capacity, events: Mutex::new(VecDeque::with_capacity(capacity)) }
    }

    pub fn add(&self, kind: impl Into<String>, fields: Vec<(String, String)>) {
        let event = DebugEvent { ts_seconds: now_seconds(), kind: kind.into(), fields };
        let mut events = self.events.lock().expect("debug ring lock poisoned");
        if events.len() == self.capacity {
            events.pop_front();
        }
        events.push_back(event);
    }

    pub fn snapshot(&self) -> Vec<DebugEvent> {
        self.events.lock().expect("debug ring lock poisoned").iter().cloned().collect()
    }
}

/// Owns the one server-wide ring plus one ring per configured rig. Resized
/// in place when the rig list is resized (§4.2): growth appends empty
/// rings, shrink drops tail rings.
pub struct DebugStore {
    pub server: std::sync::Arc<DebugRing>,
    rigs: Mutex<Vec<std::sync::Arc<DebugRing>>>,
    rig_capacity: usize,
}

impl DebugStore {
    pub fn new(rig_count: usize, rig_capacity: usize, server_capacity: usize) -> Self {
        let rigs = (0..rig_count).map(|_| std::sync::Arc::new(DebugRing::new(rig_capacity))).collect();
        DebugStore { server: std::sync::Arc::new(DebugRing::new(server_capacity)), rigs: Mutex::new(rigs), rig_capacity }
    }

    pub fn ensure_rigs(&self, rig_count: usize) {
        let mut rigs = self.rigs.lock().expect("debug store lock poisoned");
        match rig_count.cmp(&rigs.len()) {
            std::cmp::Ordering::Greater => {
                while rigs.len() < rig_count {
                    rigs.push(std::sync::Arc::new(DebugRing::new(self.rig_capacity)));
                }
            }
            std::cmp::Ordering::Less => rigs.truncate(rig_count),
            std::cmp::Ordering::Equal => {}
        }
    }

    pub fn rig(&self, index: usize) -> Option<std::sync::Arc<DebugRing>> {
        self.rigs.lock().expect("debug store lock poisoned").get(index).cloned()
    }
}
